//! Application context and configuration.
//!
//! Configuration is read from `.quickedit.toml`:
//!
//! ```toml
//! profiles_root = "${env:HOME}/.skeinforge/profiles"
//! plugins_root = "plugins"
//! craft_type = "extrusion"
//! # profile = "ABS"
//! strict_visible_fields = false
//!
//! [visible_fields]
//! cool = ["Activate Cool", "Minimum Layer Time (seconds):"]
//! ```

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use quickedit::data::{
    EditSession, PluginRegistry, ProfileDirectory, ProfileFileWriter, ProfileLocator,
    VisibleFieldMap,
};
use serde::{Deserialize, Serialize};

use crate::utils::expand_path;

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE: &str = ".quickedit.toml";

/// Contents of `.quickedit.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QuickEditConfig {
    /// Root of the profile tree, supports `${env:VAR}` and `~`.
    pub profiles_root: String,
    /// Directory holding `<plugin>.toml` declarations.
    pub plugins_root: String,
    /// Craft type whose active profile is edited.
    pub craft_type: String,
    /// Profile name, overriding the craft type's selection.
    pub profile: Option<String>,
    /// Fail a plugin whose schema lacks an allow-listed field.
    pub strict_visible_fields: bool,
    /// Replaces the built-in allow-list when present.
    pub visible_fields: Option<BTreeMap<String, Vec<String>>>,
}

impl Default for QuickEditConfig {
    fn default() -> Self {
        Self {
            profiles_root: "${env:HOME}/.skeinforge/profiles".to_string(),
            plugins_root: "plugins".to_string(),
            craft_type: "extrusion".to_string(),
            profile: None,
            strict_visible_fields: false,
            visible_fields: None,
        }
    }
}

impl QuickEditConfig {
    /// Load the configuration.
    ///
    /// An explicit path must exist. Without one, [`CONFIG_FILE`] in `workdir`
    /// is used when present, defaults otherwise.
    pub fn load(explicit: Option<&Path>, workdir: &Path) -> anyhow::Result<(Self, PathBuf)> {
        let path = match explicit {
            Some(p) => p.to_path_buf(),
            None => {
                let p = workdir.join(CONFIG_FILE);
                if !p.exists() {
                    debug!("{} not found, using defaults", p.display());
                    return Ok((Self::default(), workdir.to_path_buf()));
                }
                p
            }
        };

        let content = fs::read_to_string(&path)
            .with_context(|| format!("can not open config file: {}", path.display()))?;
        let config = toml::from_str(&content)
            .with_context(|| format!("invalid config file: {}", path.display()))?;
        let base = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| workdir.to_path_buf());
        info!("Using config {}", path.display());
        Ok((config, base))
    }

    /// Allow-list from the config, or the built-in one.
    pub fn visible_field_map(&self) -> VisibleFieldMap {
        let map = match &self.visible_fields {
            Some(fields) => VisibleFieldMap::from_entries(fields.clone()),
            None => VisibleFieldMap::builtin(),
        };
        map.strict(self.strict_visible_fields)
    }
}

/// Resolved locations of plugin declarations and profiles.
#[derive(Debug, Clone)]
pub struct PathConfig {
    /// Directory relative config paths are resolved against.
    pub base: PathBuf,
    pub plugins_root: PathBuf,
    pub profiles_root: PathBuf,
}

/// Everything a command needs to open and commit a session.
pub struct AppContext {
    pub paths: PathConfig,
    pub config: QuickEditConfig,
    pub profile: ProfileDirectory,
    pub visible: VisibleFieldMap,
}

impl AppContext {
    /// Resolve paths and the active profile from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the craft type's profile selection cannot be read.
    pub fn new(config: QuickEditConfig, base: PathBuf) -> anyhow::Result<Self> {
        let paths = PathConfig {
            plugins_root: expand_path(&config.plugins_root, &base),
            profiles_root: expand_path(&config.profiles_root, &base),
            base,
        };

        let profile = ProfileDirectory::resolve(
            &paths.profiles_root,
            &config.craft_type,
            config.profile.as_deref(),
        )
        .with_context(|| {
            format!(
                "failed to resolve the active `{}` profile under {}",
                config.craft_type,
                paths.profiles_root.display()
            )
        })?;
        debug!("profile directory: {}", profile.dir().display());

        Ok(Self {
            visible: config.visible_field_map(),
            paths,
            config,
            profile,
        })
    }

    pub fn profile_name(&self) -> &str {
        self.profile.profile_name()
    }

    /// Dialog and report title.
    pub fn title(&self) -> String {
        format!("Quick Edit Profile: {}", self.profile_name())
    }

    pub fn registry(&self) -> PluginRegistry<ProfileDirectory> {
        PluginRegistry::new(&self.paths.plugins_root, self.profile.clone())
    }

    pub fn writer(&self) -> ProfileFileWriter {
        ProfileFileWriter::new(self.profile.clone())
    }

    /// Open a session over every allow-listed plugin.
    pub fn open_session(&self) -> EditSession {
        EditSession::open_visible(&self.registry(), &self.visible)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_and_overrides() {
        let config: QuickEditConfig = toml::from_str(
            r#"
plugins_root = "decl"
profile = "PLA"

[visible_fields]
cool = ["Activate Cool"]
"#,
        )
        .unwrap();
        assert_eq!(config.craft_type, "extrusion");
        assert_eq!(config.profile.as_deref(), Some("PLA"));

        let map = config.visible_field_map();
        assert_eq!(map.plugins().collect::<Vec<_>>(), ["cool"]);
        assert!(!map.is_strict());
    }

    #[test]
    fn test_context_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            "profiles_root = \"profiles\"\nstrict_visible_fields = true\n",
        )
        .unwrap();
        fs::create_dir_all(dir.path().join("profiles")).unwrap();
        fs::write(
            dir.path().join("profiles").join("extrusion.csv"),
            "Profile Selection:\tABS\n",
        )
        .unwrap();

        let (config, base) = QuickEditConfig::load(None, dir.path()).unwrap();
        let ctx = AppContext::new(config, base).unwrap();
        assert_eq!(ctx.paths.plugins_root, dir.path().join("plugins"));
        assert_eq!(ctx.profile_name(), "ABS");
        assert_eq!(ctx.title(), "Quick Edit Profile: ABS");
        assert!(ctx.visible.is_strict());
    }

    #[test]
    fn test_explicit_config_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(QuickEditConfig::load(Some(&missing), dir.path()).is_err());
    }
}
