//! Settings data structures and the synchronization engine.
//!
//! ## Architecture
//!
//! - [`setting`] - Tagged values, settings and schemas
//! - [`schema`] - Schema providers and plugin declarations
//! - [`visible`] - Allow-list of user editable fields
//! - [`session`] - Working set, delta computation and commit
//! - [`profile`] - Profile file records and the atomic writer

/// Tagged setting values, settings and schemas.
pub mod setting;

/// Schema providers and the declaration based plugin registry.
pub mod schema;

/// Allow-list of user editable fields per plugin.
pub mod visible;

/// Edit session: working set, delta and commit.
pub mod session;

/// Profile file records, location and rewriting.
pub mod profile;

pub use profile::{ChangeReport, ProfileDirectory, ProfileFileWriter, ProfileLocator};
pub use schema::{PluginRegistry, SchemaProvider};
pub use session::{CommitReport, DeltaEntry, EditSession, FieldState};
pub use setting::{FieldKey, Schema, Setting, SettingKind, SettingValue};
pub use visible::VisibleFieldMap;
