//! # quickedit-cli
//!
//! Quick edit front ends for the human relevant settings of a slicing
//! profile, built on the [`quickedit`] engine.
//!
//! ## Modules
//!
//! - [`ctx`] - Application context and `.quickedit.toml` configuration
//! - [`form`] - Non-interactive `show` and `set` commands
//! - [`menuconfig`] - TUI quick edit dialog
//! - [`utils`] - Path and placeholder helpers

/// Application context and configuration.
pub mod ctx;

/// Non-interactive form commands.
pub mod form;

/// TUI quick edit dialog.
///
/// Shows the allow-listed fields of every plugin in one scrollable dialog
/// with Save and Cancel buttons.
pub mod menuconfig;

/// Path and placeholder helpers.
pub mod utils;

#[macro_use]
extern crate log;
#[macro_use]
extern crate anyhow;

pub use quickedit;
