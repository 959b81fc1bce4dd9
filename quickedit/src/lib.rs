//! # quickedit
//!
//! Settings synchronization engine for multi-plugin slicing profiles.
//!
//! Each plugin declares an ordered schema of typed settings and stores its
//! values in a tab separated profile file. `quickedit` loads those schemas,
//! narrows them to an allow-list of human relevant fields, tracks edits and
//! writes back only the records that really changed.
//!
//! ## Features
//!
//! - Explicit `Bool | Number | Text` value tags
//! - Type-aware change detection (`1.50` is not a change from `1.5`)
//! - Line preserving, atomic rewrite of single records
//! - Per-plugin and per-field failure isolation
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use quickedit::data::{
//!     EditSession, PluginRegistry, ProfileDirectory, ProfileFileWriter, VisibleFieldMap,
//! };
//!
//! let profile = ProfileDirectory::resolve("profiles", "extrusion", None).unwrap();
//! let registry = PluginRegistry::new("plugins", profile.clone());
//! let visible = VisibleFieldMap::builtin();
//!
//! let mut session = EditSession::open_visible(&registry, &visible);
//! session
//!     .set_current_text("cool", "Minimum Layer Time (seconds):", "7")
//!     .unwrap();
//!
//! let report = session.commit(&ProfileFileWriter::new(profile));
//! for change in report.changes() {
//!     println!("{} = {} (was: {})", change.name, change.new_value, change.old_value);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`data`] - Settings, schemas, sessions and profile files
//! - [`error`] - Error types and result definitions

#[macro_use]
extern crate log;

/// Settings, schemas, edit sessions and profile files.
pub mod data;

/// Error types and result definitions.
pub mod error;

pub use error::{QuickEditError, Result};
