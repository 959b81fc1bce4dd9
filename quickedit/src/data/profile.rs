use std::{
    borrow::Cow,
    fs::{self, File},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use serde::Serialize;

use crate::{
    data::setting::{SettingKind, SettingValue},
    error::{QuickEditError, Result},
};

/// Separator between the key and value segments of a record line.
pub const FIELD_SEPARATOR: u8 = b'\t';

/// Extension of per-plugin profile files.
pub const PROFILE_EXTENSION: &str = "csv";

/// Record holding the active profile name in the craft type file.
pub const PROFILE_SELECTION_KEY: &str = "Profile Selection:";

/// Profile used when the craft type file does not name one.
pub const DEFAULT_PROFILE_NAME: &str = "default";

fn split_field(line: &[u8]) -> Option<(&[u8], &[u8])> {
    let at = line.iter().position(|&b| b == FIELD_SEPARATOR)?;
    Some((&line[..at], &line[at + 1..]))
}

/// Iterate the `(key, value)` records of raw profile content.
///
/// Lines without a separator are comments or headers and are skipped. No
/// encoding is assumed, so opaque lines may hold arbitrary bytes.
pub fn records(content: &[u8]) -> impl Iterator<Item = (&[u8], &[u8])> {
    content.split(|&b| b == b'\n').filter_map(|line| {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        split_field(line)
    })
}

/// Value of the first record whose key is exactly `name`.
///
/// Invalid UTF-8 in the value is replaced, the key must match byte for byte.
pub fn find_record<'a>(content: &'a [u8], name: &str) -> Option<Cow<'a, str>> {
    records(content)
        .find(|(key, _)| *key == name.as_bytes())
        .map(|(_, v)| String::from_utf8_lossy(v))
}

/// Replace the value segment of the first record keyed `name`.
///
/// Every other byte, including line terminators, blank lines and comments,
/// is carried over unchanged. Returns `None` if no record matches.
pub fn rewrite_record(content: &[u8], name: &str, value: &str) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(content.len() + value.len());
    let mut replaced = false;

    for line in content.split_inclusive(|&b| b == b'\n') {
        if !replaced {
            let (body, ending) = split_line_ending(line);
            if let Some((key, _)) = split_field(body)
                && key == name.as_bytes()
            {
                out.extend_from_slice(key);
                out.push(FIELD_SEPARATOR);
                out.extend_from_slice(value.as_bytes());
                out.extend_from_slice(ending);
                replaced = true;
                continue;
            }
        }
        out.extend_from_slice(line);
    }

    replaced.then_some(out)
}

fn split_line_ending(line: &[u8]) -> (&[u8], &[u8]) {
    if let Some(body) = line.strip_suffix(b"\r\n") {
        (body, &b"\r\n"[..])
    } else if let Some(body) = line.strip_suffix(b"\n") {
        (body, &b"\n"[..])
    } else {
        (line, &b""[..])
    }
}

/// Replace `path` with `content` so that readers see either the old or the
/// new file, never a partial one.
///
/// The permissions of an existing file carry over to the replacement.
pub fn write_atomic(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(".{file_name}.tmp"));
    let permissions = match fs::metadata(path) {
        Ok(meta) => Some(meta.permissions()),
        Err(e) if e.kind() == ErrorKind::NotFound => None,
        Err(e) => return Err(e),
    };

    let res = (|| {
        let mut f = File::create(&tmp)?;
        f.write_all(content)?;
        if let Some(permissions) = permissions {
            f.set_permissions(permissions)?;
        }
        f.sync_all()?;
        fs::rename(&tmp, path)?;
        sync_parent(path)
    })();

    if res.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    res
}

#[cfg(unix)]
fn sync_parent(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => File::open(dir)?.sync_all(),
        _ => Ok(()),
    }
}

#[cfg(not(unix))]
fn sync_parent(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

/// Resolves the on-disk profile file of a plugin.
pub trait ProfileLocator {
    fn profile_path(&self, plugin: &str) -> PathBuf;

    /// Name of the active profile, used for titles and messages.
    fn profile_name(&self) -> &str;
}

/// Profiles laid out as `<root>/<craft_type>/<profile>/<plugin>.csv`.
#[derive(Debug, Clone)]
pub struct ProfileDirectory {
    pub root: PathBuf,
    pub craft_type: String,
    pub profile: String,
}

impl ProfileDirectory {
    pub fn new(
        root: impl Into<PathBuf>,
        craft_type: impl Into<String>,
        profile: impl Into<String>,
    ) -> Self {
        Self {
            root: root.into(),
            craft_type: craft_type.into(),
            profile: profile.into(),
        }
    }

    /// Build a directory for the active profile of `craft_type`.
    ///
    /// An explicit `profile` wins; otherwise the `Profile Selection:` record
    /// of `<root>/<craft_type>.csv` is used, then [`DEFAULT_PROFILE_NAME`].
    pub fn resolve(
        root: impl Into<PathBuf>,
        craft_type: &str,
        profile: Option<&str>,
    ) -> Result<Self> {
        let root = root.into();
        if let Some(profile) = profile {
            return Ok(Self::new(root, craft_type, profile));
        }

        let selection = root.join(format!("{craft_type}.{PROFILE_EXTENSION}"));
        let profile = match fs::read(&selection) {
            Ok(content) => match find_record(&content, PROFILE_SELECTION_KEY) {
                Some(name) if !name.trim().is_empty() => name.trim().to_string(),
                _ => {
                    warn!(
                        "no profile selected in {}, using `{DEFAULT_PROFILE_NAME}`",
                        selection.display()
                    );
                    DEFAULT_PROFILE_NAME.to_string()
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("{} missing, using `{DEFAULT_PROFILE_NAME}`", selection.display());
                DEFAULT_PROFILE_NAME.to_string()
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self::new(root, craft_type, profile))
    }

    pub fn dir(&self) -> PathBuf {
        self.root.join(&self.craft_type).join(&self.profile)
    }
}

impl ProfileLocator for ProfileDirectory {
    fn profile_path(&self, plugin: &str) -> PathBuf {
        self.dir().join(format!("{plugin}.{PROFILE_EXTENSION}"))
    }

    fn profile_name(&self) -> &str {
        &self.profile
    }
}

/// Audit record of one rewritten field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeReport {
    pub plugin: String,
    pub name: String,
    pub old_value: String,
    pub new_value: String,
    pub path: PathBuf,
}

/// Rewrites single records of plugin profile files.
pub struct ProfileFileWriter {
    locator: Box<dyn ProfileLocator>,
}

impl ProfileFileWriter {
    pub fn new(locator: impl ProfileLocator + 'static) -> Self {
        Self {
            locator: Box::new(locator),
        }
    }

    pub fn locator(&self) -> &dyn ProfileLocator {
        self.locator.as_ref()
    }

    /// Rewrite the record `name` of `plugin`'s profile with `new`.
    ///
    /// The kind of `old` decides how `new` is serialized: numbers are
    /// canonicalized so an unchanged value writes back the same text.
    ///
    /// # Errors
    ///
    /// [`QuickEditError::ProfileFileNotFound`] when the file is gone,
    /// [`QuickEditError::FieldNotFound`] when no record matches, and
    /// [`QuickEditError::InvalidValue`] when `new` does not fit the kind.
    pub fn write(
        &self,
        plugin: &str,
        name: &str,
        old: &SettingValue,
        new: &SettingValue,
    ) -> Result<ChangeReport> {
        let path = self.locator.profile_path(plugin);
        let new_text = serialize_as(old.kind(), name, new)?;

        let content = match fs::read(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(QuickEditError::ProfileFileNotFound { path });
            }
            Err(e) => return Err(e.into()),
        };

        let rewritten = rewrite_record(&content, name, &new_text).ok_or_else(|| {
            QuickEditError::FieldNotFound {
                name: name.to_string(),
                path: path.clone(),
            }
        })?;

        if rewritten != content {
            write_atomic(&path, &rewritten)?;
        }

        let report = ChangeReport {
            plugin: plugin.to_string(),
            name: name.to_string(),
            old_value: old.to_profile_text(),
            new_value: new_text,
            path,
        };
        debug!(
            "{plugin}: wrote {} = {} (was: {})",
            report.name, report.new_value, report.old_value
        );
        Ok(report)
    }
}

fn serialize_as(kind: SettingKind, name: &str, value: &SettingValue) -> Result<String> {
    let invalid = |expected| QuickEditError::InvalidValue {
        name: name.to_string(),
        expected,
        value: value.to_profile_text(),
    };
    match kind {
        SettingKind::Number => match value {
            SettingValue::Bool(_) => Err(invalid("number")),
            _ => {
                let text = value.numeric_text();
                text.parse::<f64>()
                    .map(|_| text)
                    .map_err(|_| invalid("number"))
            }
        },
        SettingKind::Bool => value
            .truth()
            .map(|b| SettingValue::Bool(b).to_profile_text())
            .ok_or_else(|| invalid("boolean")),
        SettingKind::Text => {
            let text = value.to_profile_text();
            if text.contains(['\n', '\r']) {
                Err(invalid("single line text"))
            } else {
                Ok(text)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COOL: &str = "Format is tab separated preferences.\n_Name\tValue\nActivate Cool\tTrue\nMinimum Layer Time (seconds):\t5\n";

    #[test]
    fn test_records_skip_opaque_lines() {
        let found: Vec<_> = records(b"# comment\n\nA\t1\r\nB\t\n").collect();
        assert_eq!(found, vec![(&b"A"[..], &b"1"[..]), (&b"B"[..], &b""[..])]);
    }

    #[test]
    fn test_rewrite_only_first_match() {
        let out = rewrite_record(b"A\t1\nA\t2\n", "A", "9").unwrap();
        assert_eq!(out, b"A\t9\nA\t2\n");
    }

    #[test]
    fn test_rewrite_keeps_crlf_and_missing_newline() {
        assert_eq!(
            rewrite_record(b"x\r\nA\t1\r\n", "A", "2").unwrap(),
            b"x\r\nA\t2\r\n"
        );
        assert_eq!(rewrite_record(b"A\t1", "A", "2").unwrap(), b"A\t2");
    }

    #[test]
    fn test_rewrite_requires_exact_key() {
        assert_eq!(rewrite_record(b"Activate Cool:\tTrue\n", "Activate Cool", "False"), None);
        assert_eq!(rewrite_record(b"Activate Cool True\n", "Activate Cool", "False"), None);
    }

    #[test]
    fn test_rewrite_copies_non_utf8_lines() {
        let content = b"# temp in \xb0C\nMinimum Layer Time (seconds):\t5\n";
        assert_eq!(
            find_record(content, "Minimum Layer Time (seconds):").as_deref(),
            Some("5")
        );
        assert_eq!(
            rewrite_record(content, "Minimum Layer Time (seconds):", "7").unwrap(),
            b"# temp in \xb0C\nMinimum Layer Time (seconds):\t7\n"
        );
    }

    #[test]
    fn test_write_canonicalizes_numbers() {
        let dir = tempfile::tempdir().unwrap();
        let profile = ProfileDirectory::new(dir.path(), "extrusion", "ABS");
        fs::create_dir_all(profile.dir()).unwrap();
        let path = profile.profile_path("cool");
        fs::write(&path, COOL).unwrap();

        let writer = ProfileFileWriter::new(profile);
        let report = writer
            .write(
                "cool",
                "Minimum Layer Time (seconds):",
                &SettingValue::Number(5.0),
                &SettingValue::Text("7.0".into()),
            )
            .unwrap();
        assert_eq!(report.old_value, "5");
        assert_eq!(report.new_value, "7");
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            COOL.replace("seconds):\t5", "seconds):\t7")
        );
    }

    #[test]
    fn test_write_rejects_bad_number() {
        let dir = tempfile::tempdir().unwrap();
        let profile = ProfileDirectory::new(dir.path(), "extrusion", "ABS");
        fs::create_dir_all(profile.dir()).unwrap();
        fs::write(profile.profile_path("cool"), COOL).unwrap();

        let writer = ProfileFileWriter::new(profile.clone());
        let err = writer
            .write(
                "cool",
                "Minimum Layer Time (seconds):",
                &SettingValue::Number(5.0),
                &SettingValue::Text("fast".into()),
            )
            .unwrap_err();
        assert!(matches!(err, QuickEditError::InvalidValue { .. }));
        assert_eq!(fs::read_to_string(profile.profile_path("cool")).unwrap(), COOL);
    }

    #[test]
    fn test_write_rejects_multiline_text() {
        let content = "Cool Type:\tSlow Down\nActivate Cool\tTrue\n";
        let dir = tempfile::tempdir().unwrap();
        let profile = ProfileDirectory::new(dir.path(), "extrusion", "ABS");
        fs::create_dir_all(profile.dir()).unwrap();
        fs::write(profile.profile_path("cool"), content).unwrap();

        let writer = ProfileFileWriter::new(profile.clone());
        for injected in ["Orbit\nActivate Cool\tFalse", "Orbit\rActivate Cool\tFalse"] {
            let err = writer
                .write(
                    "cool",
                    "Cool Type:",
                    &SettingValue::Text("Slow Down".into()),
                    &SettingValue::Text(injected.into()),
                )
                .unwrap_err();
            assert!(matches!(err, QuickEditError::InvalidValue { .. }));
        }
        assert_eq!(fs::read_to_string(profile.profile_path("cool")).unwrap(), content);
    }

    #[test]
    fn test_write_keeps_non_utf8_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let profile = ProfileDirectory::new(dir.path(), "extrusion", "ABS");
        fs::create_dir_all(profile.dir()).unwrap();
        let path = profile.profile_path("cool");
        fs::write(&path, b"# temp in \xb0C\nMinimum Layer Time (seconds):\t5\n").unwrap();

        ProfileFileWriter::new(profile)
            .write(
                "cool",
                "Minimum Layer Time (seconds):",
                &SettingValue::Number(5.0),
                &SettingValue::Number(7.0),
            )
            .unwrap();
        assert_eq!(
            fs::read(&path).unwrap(),
            b"# temp in \xb0C\nMinimum Layer Time (seconds):\t7\n"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_write_keeps_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let profile = ProfileDirectory::new(dir.path(), "extrusion", "ABS");
        fs::create_dir_all(profile.dir()).unwrap();
        let path = profile.profile_path("cool");
        fs::write(&path, COOL).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o600)).unwrap();

        ProfileFileWriter::new(profile)
            .write(
                "cool",
                "Minimum Layer Time (seconds):",
                &SettingValue::Number(5.0),
                &SettingValue::Number(7.0),
            )
            .unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    struct Capture(std::sync::Mutex<Vec<(log::Level, String)>>);

    impl log::Log for Capture {
        fn enabled(&self, _: &log::Metadata) -> bool {
            true
        }

        fn log(&self, record: &log::Record) {
            if let Ok(mut records) = self.0.lock() {
                records.push((record.level(), record.args().to_string()));
            }
        }

        fn flush(&self) {}
    }

    static CAPTURE: Capture = Capture(std::sync::Mutex::new(Vec::new()));

    #[test]
    fn test_write_logs_below_info() {
        let _ = log::set_logger(&CAPTURE);
        log::set_max_level(log::LevelFilter::Trace);

        let dir = tempfile::tempdir().unwrap();
        let profile = ProfileDirectory::new(dir.path(), "extrusion", "ABS");
        fs::create_dir_all(profile.dir()).unwrap();
        fs::write(profile.profile_path("cool"), COOL).unwrap();

        ProfileFileWriter::new(profile)
            .write(
                "cool",
                "Minimum Layer Time (seconds):",
                &SettingValue::Number(5.0),
                &SettingValue::Number(9.0),
            )
            .unwrap();

        let records = CAPTURE.0.lock().unwrap();
        let written: Vec<_> = records
            .iter()
            .filter(|(_, msg)| msg.contains("Minimum Layer Time (seconds): = 9"))
            .collect();
        assert!(!written.is_empty());
        assert!(written.iter().all(|(level, _)| *level == log::Level::Debug));
    }

    #[test]
    fn test_resolve_active_profile() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("extrusion.csv"),
            "Format is tab separated preferences.\nProfile Selection:\tPLA\n",
        )
        .unwrap();

        let profile = ProfileDirectory::resolve(dir.path(), "extrusion", None).unwrap();
        assert_eq!(profile.profile_name(), "PLA");
        assert_eq!(
            profile.profile_path("carve"),
            dir.path().join("extrusion").join("PLA").join("carve.csv")
        );

        let forced = ProfileDirectory::resolve(dir.path(), "extrusion", Some("ABS")).unwrap();
        assert_eq!(forced.profile_name(), "ABS");

        let missing = ProfileDirectory::resolve(dir.path(), "milling", None).unwrap();
        assert_eq!(missing.profile_name(), DEFAULT_PROFILE_NAME);
    }
}
