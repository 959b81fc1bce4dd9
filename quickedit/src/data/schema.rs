use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::{
    data::{
        profile::{ProfileLocator, find_record},
        setting::{Schema, Setting, SettingValue},
    },
    error::{QuickEditError, Result},
};

/// Anything that can produce the current schema of a plugin.
pub trait SchemaProvider {
    /// Load the schema of `plugin` with values read from its active profile.
    ///
    /// # Errors
    ///
    /// [`QuickEditError::PluginResolution`] when nothing answers to `plugin`,
    /// [`QuickEditError::SchemaConstruction`] when its profile is missing or corrupt.
    fn load(&self, plugin: &str) -> Result<Schema>;
}

impl<F> SchemaProvider for F
where
    F: Fn(&str) -> Result<Schema>,
{
    fn load(&self, plugin: &str) -> Result<Schema> {
        self(plugin)
    }
}

#[derive(Debug, Deserialize)]
struct PluginDeclaration {
    title: Option<String>,
    #[serde(default)]
    preferences: Vec<PreferenceDeclaration>,
}

#[derive(Debug, Deserialize)]
struct PreferenceDeclaration {
    name: String,
    default: toml::Value,
}

/// Plugin declarations stored as `<root>/<plugin>.toml`.
///
/// ```toml
/// title = "Cool"
///
/// [[preferences]]
/// name = "Activate Cool"
/// default = true
///
/// [[preferences]]
/// name = "Minimum Layer Time (seconds):"
/// default = 60.0
/// ```
///
/// The type of each `default` fixes the setting kind. Values found in the
/// plugin's profile file override the defaults.
pub struct PluginRegistry<L> {
    root: PathBuf,
    locator: L,
}

impl<L: ProfileLocator> PluginRegistry<L> {
    pub fn new(root: impl Into<PathBuf>, locator: L) -> Self {
        Self {
            root: root.into(),
            locator,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn locator(&self) -> &L {
        &self.locator
    }

    fn declaration_path(&self, plugin: &str) -> Result<PathBuf> {
        if plugin.is_empty() || plugin.contains(['/', '\\']) || plugin.starts_with('.') {
            return Err(QuickEditError::plugin_resolution(plugin, "invalid plugin id"));
        }
        Ok(self.root.join(format!("{plugin}.toml")))
    }

    fn declaration(&self, plugin: &str) -> Result<PluginDeclaration> {
        let path = self.declaration_path(plugin)?;
        let content = fs::read_to_string(&path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                QuickEditError::plugin_resolution(
                    plugin,
                    format!("no declaration at {}", path.display()),
                )
            } else {
                QuickEditError::plugin_resolution(plugin, e)
            }
        })?;
        toml::from_str(&content).map_err(|e| {
            QuickEditError::schema_construction(plugin, format!("{}: {e}", path.display()))
        })
    }
}

impl<L: ProfileLocator> SchemaProvider for PluginRegistry<L> {
    fn load(&self, plugin: &str) -> Result<Schema> {
        let decl = self.declaration(plugin)?;

        let profile_path = self.locator.profile_path(plugin);
        let content = fs::read(&profile_path).map_err(|e| {
            QuickEditError::schema_construction(
                plugin,
                format!("cannot read profile {}: {e}", profile_path.display()),
            )
        })?;

        let mut settings = Vec::with_capacity(decl.preferences.len());
        for pref in decl.preferences {
            let default = SettingValue::try_from(&pref.default).map_err(|e| {
                QuickEditError::schema_construction(plugin, format!("`{}`: {e}", pref.name))
            })?;

            let value = match find_record(&content, &pref.name) {
                Some(text) => SettingValue::parse_as(default.kind(), &text).ok_or_else(|| {
                    QuickEditError::schema_construction(
                        plugin,
                        format!(
                            "corrupt value `{text}` for `{}` in {}",
                            pref.name,
                            profile_path.display()
                        ),
                    )
                })?,
                None => {
                    debug!("{plugin}: `{}` not in profile, using default", pref.name);
                    default
                }
            };
            settings.push(Setting::new(pref.name, value));
        }

        debug!("{plugin}: loaded {} settings", settings.len());
        let schema = Schema::new(plugin, settings);
        Ok(match decl.title {
            Some(title) => schema.with_title(title),
            None => schema,
        })
    }
}
