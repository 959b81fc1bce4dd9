//! Error types for schema loading, editing and profile rewriting.

use std::path::PathBuf;

use thiserror::Error;

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, QuickEditError>;

/// Everything that can go wrong between loading a plugin and writing its profile.
///
/// Load errors are scoped to one plugin and write errors to one field, so a
/// session keeps going after any of them except [`QuickEditError::UnknownField`].
#[derive(Debug, Error)]
pub enum QuickEditError {
    /// No plugin declaration answers to the identifier.
    #[error("plugin `{plugin}` could not be resolved: {reason}")]
    PluginResolution { plugin: String, reason: String },

    /// The plugin exists but its schema could not be built from disk.
    #[error("schema for plugin `{plugin}` could not be constructed: {reason}")]
    SchemaConstruction { plugin: String, reason: String },

    /// The presentation layer referenced a field that was never loaded.
    #[error("unknown field `{name}` for plugin `{plugin}`")]
    UnknownField { plugin: String, name: String },

    /// The profile file vanished between load and commit.
    #[error("profile file not found: {}", path.display())]
    ProfileFileNotFound { path: PathBuf },

    /// No record line starts with the field name and a tab.
    #[error("field `{name}` not found in {}", path.display())]
    FieldNotFound { name: String, path: PathBuf },

    /// A value that cannot be written as the field's kind, e.g. text for a number.
    #[error("field `{name}` expects a {expected}, got `{value}`")]
    InvalidValue {
        name: String,
        expected: &'static str,
        value: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl QuickEditError {
    pub fn plugin_resolution(plugin: &str, reason: impl ToString) -> Self {
        Self::PluginResolution {
            plugin: plugin.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn schema_construction(plugin: &str, reason: impl ToString) -> Self {
        Self::SchemaConstruction {
            plugin: plugin.to_string(),
            reason: reason.to_string(),
        }
    }
}
