use std::collections::BTreeMap;

use crate::{
    data::setting::Schema,
    error::{QuickEditError, Result},
};

/// Plugins and fields shown by the stock quick edit dialog.
const BUILTIN: &[(&str, &[&str])] = &[
    (
        "bottom",
        &["Activate Bottom", "Additional Height over Layer Thickness (ratio):"],
    ),
    (
        "carve",
        &["Layer Thickness (mm):", "Perimeter Width over Thickness (ratio):"],
    ),
    ("cool", &["Activate Cool", "Minimum Layer Time (seconds):"]),
    (
        "dimension",
        &[
            "Extruder Retraction Speed (mm/s):",
            "Retraction Distance (millimeters):",
        ],
    ),
    (
        "fill",
        &[
            "Activate Fill:",
            "Extra Shells on Alternating Solid Layer (layers):",
            "Extra Shells on Base (layers):",
            "Extra Shells on Sparse Layer (layers):",
            "Infill Solidity (ratio):",
            "Solid Surface Thickness (layers):",
        ],
    ),
    (
        "multiply",
        &[
            "Activate Multiply:",
            "Center X (mm):",
            "Center Y (mm):",
            "Number of Columns (integer):",
            "Number of Rows (integer):",
        ],
    ),
    (
        "raft",
        &[
            "Activate Raft",
            "Add Raft, Elevate Nozzle, Orbit:",
            "Object First Layer Feed Rate Infill Multiplier (ratio):",
            "Object First Layer Feed Rate Perimeter Multiplier (ratio):",
            "Object First Layer Flow Rate Infill Multiplier (ratio):",
            "Object First Layer Flow Rate Perimeter Multiplier (ratio):",
        ],
    ),
    (
        "speed",
        &[
            "Activate Speed:",
            "Add Flow Rate:",
            "Feed Rate (mm/s):",
            "Flow Rate Setting (float):",
            "Perimeter Feed Rate over Operating Feed Rate (ratio):",
            "Perimeter Flow Rate over Operating Flow Rate (ratio):",
            "Travel Feed Rate (mm/s):",
        ],
    ),
];

/// Allow-list of user editable fields per plugin.
///
/// Plugins are kept in lexicographic order so every consumer groups them the
/// same way.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisibleFieldMap {
    plugins: BTreeMap<String, Vec<String>>,
    strict: bool,
}

impl VisibleFieldMap {
    /// Allow-list of the stock quick edit dialog.
    pub fn builtin() -> Self {
        Self::from_entries(
            BUILTIN
                .iter()
                .map(|(plugin, names)| (plugin.to_string(), names.iter().map(|n| n.to_string()))),
        )
    }

    pub fn from_entries<P, N, I>(iter: I) -> Self
    where
        I: IntoIterator<Item = (P, N)>,
        P: Into<String>,
        N: IntoIterator,
        N::Item: Into<String>,
    {
        let mut plugins: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (plugin, names) in iter {
            let entry = plugins.entry(plugin.into()).or_default();
            for name in names {
                let name = name.into();
                if !entry.contains(&name) {
                    entry.push(name);
                }
            }
        }
        Self {
            plugins,
            strict: false,
        }
    }

    /// Treat allow-listed names missing from a schema as errors instead of warnings.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Plugin ids in lexicographic order.
    pub fn plugins(&self) -> impl Iterator<Item = &str> {
        self.plugins.keys().map(String::as_str)
    }

    /// Allow-listed names of `plugin`; empty for unknown plugins.
    pub fn visible_names(&self, plugin: &str) -> &[String] {
        self.plugins.get(plugin).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_visible(&self, plugin: &str, name: &str) -> bool {
        self.visible_names(plugin).iter().any(|n| n == name)
    }

    /// Keep only the allow-listed settings of `schema`, in schema order.
    ///
    /// Allow-listed names that the schema does not declare are logged and
    /// dropped, or rejected in strict mode.
    pub fn filter(&self, mut schema: Schema, plugin: &str) -> Result<Schema> {
        let missing: Vec<&str> = self
            .visible_names(plugin)
            .iter()
            .map(String::as_str)
            .filter(|name| schema.get(name).is_none())
            .collect();

        if !missing.is_empty() {
            if self.strict {
                return Err(QuickEditError::schema_construction(
                    plugin,
                    format!("allow-listed fields not declared: {}", missing.join(", ")),
                ));
            }
            for name in &missing {
                warn!("{plugin}: allow-listed field `{name}` is not in the schema, skipping");
            }
        }

        schema.settings.retain(|s| self.is_visible(plugin, &s.name));
        Ok(schema)
    }
}
