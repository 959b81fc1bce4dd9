use std::fmt;

use serde::Serialize;

/// Value kind of a setting, fixed when the schema is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingKind {
    Bool,
    Number,
    Text,
}

/// Tagged setting value.
///
/// Comparison, canonicalization and widget choice all switch on this tag
/// instead of guessing from the text stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl SettingValue {
    pub fn kind(&self) -> SettingKind {
        match self {
            SettingValue::Bool(_) => SettingKind::Bool,
            SettingValue::Number(_) => SettingKind::Number,
            SettingValue::Text(_) => SettingKind::Text,
        }
    }

    /// Parse profile or widget text as a value of `kind`.
    ///
    /// Returns `None` when the text does not fit the kind.
    pub fn parse_as(kind: SettingKind, text: &str) -> Option<Self> {
        match kind {
            SettingKind::Bool => parse_bool(text).map(SettingValue::Bool),
            SettingKind::Number => text.trim().parse::<f64>().ok().map(SettingValue::Number),
            SettingKind::Text => Some(SettingValue::Text(text.to_string())),
        }
    }

    /// Text written into a profile record.
    pub fn to_profile_text(&self) -> String {
        match self {
            SettingValue::Bool(true) => "True".to_string(),
            SettingValue::Bool(false) => "False".to_string(),
            SettingValue::Number(n) => canonical_number(*n),
            SettingValue::Text(s) => s.clone(),
        }
    }

    /// Truth value, if this value can be read as one.
    pub fn truth(&self) -> Option<bool> {
        match self {
            SettingValue::Bool(b) => Some(*b),
            SettingValue::Number(n) => Some(*n != 0.0),
            SettingValue::Text(s) => parse_bool(s),
        }
    }

    /// Canonical numeric text, falling back to the literal text when the
    /// value is not a number.
    pub fn numeric_text(&self) -> String {
        match self {
            SettingValue::Number(n) => canonical_number(*n),
            SettingValue::Text(s) => canonical_number_text(s).unwrap_or_else(|| s.clone()),
            SettingValue::Bool(_) => self.to_profile_text(),
        }
    }

    /// Type-aware equality driven by the kind of `self`.
    ///
    /// Booleans compare by truth value, numbers by canonical text, and
    /// everything else by literal text.
    pub fn same_as(&self, other: &SettingValue) -> bool {
        match self {
            SettingValue::Bool(b) => other.truth() == Some(*b),
            SettingValue::Number(n) => canonical_number(*n) == other.numeric_text(),
            SettingValue::Text(s) => *s == other.to_profile_text(),
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_profile_text())
    }
}

impl TryFrom<&toml::Value> for SettingValue {
    type Error = String;

    fn try_from(value: &toml::Value) -> Result<Self, Self::Error> {
        match value {
            toml::Value::Boolean(b) => Ok(SettingValue::Bool(*b)),
            toml::Value::Integer(i) => Ok(SettingValue::Number(*i as f64)),
            toml::Value::Float(f) => Ok(SettingValue::Number(*f)),
            toml::Value::String(s) => Ok(SettingValue::Text(s.clone())),
            other => Err(format!("unsupported default `{other}`")),
        }
    }
}

/// Shortest text that reads back as the same `f64`, without trailing zeros.
///
/// `5.0` becomes `5`, `1.50` becomes `1.5`.
pub fn canonical_number(n: f64) -> String {
    if n == 0.0 {
        // drops the sign of -0
        return "0".to_string();
    }
    format!("{n}")
}

/// Canonicalize numeric text, or `None` when it is not a number.
pub fn canonical_number_text(text: &str) -> Option<String> {
    text.trim().parse::<f64>().ok().map(canonical_number)
}

/// Lenient boolean parsing for profile records and widget input.
pub fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

/// Identity of a field: plugin id and setting name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FieldKey {
    pub plugin: String,
    pub name: String,
}

impl FieldKey {
    pub fn new(plugin: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            plugin: plugin.into(),
            name: name.into(),
        }
    }

    /// Parse the `plugin.name` form used by widget names and the CLI.
    ///
    /// Only the first dot separates, setting names may contain dots.
    pub fn parse_dotted(s: &str) -> Option<Self> {
        let (plugin, name) = s.split_once('.')?;
        if plugin.is_empty() || name.is_empty() {
            return None;
        }
        Some(Self::new(plugin, name))
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.plugin, self.name)
    }
}

/// A named, typed setting as declared by a plugin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Setting {
    pub name: String,
    pub value: SettingValue,
}

impl Setting {
    pub fn new(name: impl Into<String>, value: SettingValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    pub fn kind(&self) -> SettingKind {
        self.value.kind()
    }
}

/// Ordered settings of one plugin, in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Schema {
    pub plugin: String,
    /// Display label of the plugin.
    pub title: String,
    pub settings: Vec<Setting>,
}

impl Schema {
    pub fn new(plugin: impl Into<String>, settings: Vec<Setting>) -> Self {
        let plugin = plugin.into();
        Self {
            title: capitalize(&plugin),
            plugin,
            settings,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn get(&self, name: &str) -> Option<&Setting> {
        self.settings.iter().find(|s| s.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.settings.iter().map(|s| s.name.as_str())
    }
}

pub(crate) fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
