use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::{
    data::{
        profile::{ChangeReport, ProfileFileWriter},
        schema::SchemaProvider,
        setting::{FieldKey, Setting, SettingKind, SettingValue, parse_bool},
        visible::VisibleFieldMap,
    },
    error::{QuickEditError, Result},
};

/// Lifecycle of a field within one session.
///
/// `Loaded` and `Edited` are live; the others are terminal for the current
/// round of edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldState {
    Loaded,
    Edited,
    Committed,
    Unchanged,
    Discarded,
}

/// One visible field: the value loaded from disk and the value being edited.
#[derive(Debug, Clone, Serialize)]
pub struct WorkingEntry {
    original: Setting,
    current: SettingValue,
    state: FieldState,
}

impl WorkingEntry {
    fn new(original: Setting) -> Self {
        Self {
            current: original.value.clone(),
            original,
            state: FieldState::Loaded,
        }
    }

    pub fn name(&self) -> &str {
        &self.original.name
    }

    pub fn kind(&self) -> SettingKind {
        self.original.kind()
    }

    pub fn original(&self) -> &SettingValue {
        &self.original.value
    }

    pub fn current(&self) -> &SettingValue {
        &self.current
    }

    pub fn state(&self) -> FieldState {
        self.state
    }

    /// Whether the current value differs from the original under type-aware
    /// comparison.
    pub fn is_changed(&self) -> bool {
        !self.original.value.same_as(&self.current)
    }
}

/// Visible fields of one plugin, in schema order.
#[derive(Debug, Clone, Serialize)]
pub struct PluginSection {
    pub plugin: String,
    pub title: String,
    pub fields: Vec<WorkingEntry>,
}

impl PluginSection {
    fn field_mut(&mut self, name: &str) -> Option<&mut WorkingEntry> {
        self.fields.iter_mut().find(|f| f.name() == name)
    }
}

/// A field whose value differs from the one loaded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeltaEntry {
    pub key: FieldKey,
    pub original: SettingValue,
    pub current: SettingValue,
}

/// A plugin that could not be loaded into the session.
#[derive(Debug)]
pub struct LoadFailure {
    pub plugin: String,
    pub error: QuickEditError,
}

/// Result of writing one field.
#[derive(Debug)]
pub struct FieldOutcome {
    pub key: FieldKey,
    pub result: Result<ChangeReport>,
}

/// Per-field results of a commit, in delta order.
#[derive(Debug, Default)]
pub struct CommitReport {
    pub outcomes: Vec<FieldOutcome>,
}

impl CommitReport {
    pub fn changes(&self) -> impl Iterator<Item = &ChangeReport> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = (&FieldKey, &QuickEditError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (&o.key, e)))
    }

    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

/// In-memory working set of the visible fields of several plugins.
///
/// Nothing touches the disk before [`EditSession::commit`], so dropping or
/// discarding a session is always safe.
#[derive(Debug, Default)]
pub struct EditSession {
    sections: BTreeMap<String, PluginSection>,
    load_errors: Vec<LoadFailure>,
}

impl EditSession {
    /// Load, filter and seed the working set for `plugins`.
    ///
    /// A plugin that fails to load is recorded in [`EditSession::load_errors`]
    /// and does not affect the others.
    pub fn open<I, S>(provider: &dyn SchemaProvider, visible: &VisibleFieldMap, plugins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let plugins: BTreeSet<String> = plugins
            .into_iter()
            .map(|p| p.as_ref().to_string())
            .collect();

        let mut session = Self::default();
        for plugin in plugins {
            match provider
                .load(&plugin)
                .and_then(|schema| visible.filter(schema, &plugin))
            {
                Ok(schema) => {
                    debug!("{plugin}: {} visible fields", schema.settings.len());
                    session.sections.insert(
                        plugin.clone(),
                        PluginSection {
                            plugin,
                            title: schema.title,
                            fields: schema.settings.into_iter().map(WorkingEntry::new).collect(),
                        },
                    );
                }
                Err(error) => {
                    warn!("skipping plugin `{plugin}`: {error}");
                    session.load_errors.push(LoadFailure { plugin, error });
                }
            }
        }
        session
    }

    /// Open a session for every plugin of the allow-list.
    pub fn open_visible(provider: &dyn SchemaProvider, visible: &VisibleFieldMap) -> Self {
        Self::open(provider, visible, visible.plugins())
    }

    /// Loaded plugins in lexicographic order of plugin id.
    pub fn sections(&self) -> impl Iterator<Item = &PluginSection> {
        self.sections.values()
    }

    pub fn section(&self, plugin: &str) -> Option<&PluginSection> {
        self.sections.get(plugin)
    }

    pub fn load_errors(&self) -> &[LoadFailure] {
        &self.load_errors
    }

    pub fn get(&self, plugin: &str, name: &str) -> Option<&WorkingEntry> {
        self.sections
            .get(plugin)?
            .fields
            .iter()
            .find(|f| f.name() == name)
    }

    fn entry_mut(&mut self, plugin: &str, name: &str) -> Result<&mut WorkingEntry> {
        self.sections
            .get_mut(plugin)
            .and_then(|s| s.field_mut(name))
            .ok_or_else(|| QuickEditError::UnknownField {
                plugin: plugin.to_string(),
                name: name.to_string(),
            })
    }

    /// Replace the current value of a loaded field.
    ///
    /// # Errors
    ///
    /// [`QuickEditError::UnknownField`] when the field was never loaded; the
    /// working set is left untouched.
    pub fn set_current(&mut self, plugin: &str, name: &str, value: SettingValue) -> Result<()> {
        let entry = self.entry_mut(plugin, name)?;
        if entry.current != value {
            entry.state = FieldState::Edited;
            entry.current = value;
        }
        Ok(())
    }

    /// Replace the current value from widget text.
    ///
    /// Boolean text becomes a boolean when it parses as one. Numbers keep
    /// their literal text so the comparison and the writer see exactly what
    /// the user typed.
    pub fn set_current_text(&mut self, plugin: &str, name: &str, text: &str) -> Result<()> {
        let kind = self
            .get(plugin, name)
            .map(WorkingEntry::kind)
            .ok_or_else(|| QuickEditError::UnknownField {
                plugin: plugin.to_string(),
                name: name.to_string(),
            })?;

        let value = match kind {
            SettingKind::Bool => parse_bool(text)
                .map(SettingValue::Bool)
                .unwrap_or_else(|| SettingValue::Text(text.to_string())),
            SettingKind::Number | SettingKind::Text => SettingValue::Text(text.to_string()),
        };
        self.set_current(plugin, name, value)
    }

    /// Pending changes in plugin order, then schema order.
    ///
    /// Fields already committed are not listed again.
    pub fn compute_delta(&self) -> Vec<DeltaEntry> {
        self.sections
            .values()
            .flat_map(|section| {
                section
                    .fields
                    .iter()
                    .filter(|f| f.state != FieldState::Committed && f.is_changed())
                    .map(|f| DeltaEntry {
                        key: FieldKey::new(&section.plugin, f.name()),
                        original: f.original.value.clone(),
                        current: f.current.clone(),
                    })
            })
            .collect()
    }

    /// Write every pending change, one field at a time.
    ///
    /// A failed write does not stop or undo the others. Failed fields stay
    /// `Edited`, so calling `commit` again retries only them.
    pub fn commit(&mut self, writer: &ProfileFileWriter) -> CommitReport {
        let mut report = CommitReport::default();

        for delta in self.compute_delta() {
            let result = writer.write(
                &delta.key.plugin,
                &delta.key.name,
                &delta.original,
                &delta.current,
            );
            match &result {
                Ok(_) => {
                    if let Ok(entry) = self.entry_mut(&delta.key.plugin, &delta.key.name) {
                        entry.state = FieldState::Committed;
                    }
                }
                Err(e) => warn!("failed to save {}: {e}", delta.key),
            }
            report.outcomes.push(FieldOutcome {
                key: delta.key,
                result,
            });
        }

        for entry in self.sections.values_mut().flat_map(|s| s.fields.iter_mut()) {
            if matches!(entry.state, FieldState::Loaded | FieldState::Edited) && !entry.is_changed()
            {
                entry.state = FieldState::Unchanged;
            }
        }

        report
    }

    /// Write a single field, e.g. to retry a failed commit.
    ///
    /// Returns `Ok(None)` when the field has nothing to write.
    pub fn commit_field(
        &mut self,
        writer: &ProfileFileWriter,
        plugin: &str,
        name: &str,
    ) -> Result<Option<ChangeReport>> {
        let entry = self.entry_mut(plugin, name)?;
        if entry.state == FieldState::Committed {
            return Ok(None);
        }
        if !entry.is_changed() {
            entry.state = FieldState::Unchanged;
            return Ok(None);
        }

        let report = writer.write(plugin, name, &entry.original.value, &entry.current)?;
        entry.state = FieldState::Committed;
        Ok(Some(report))
    }

    /// Current state of every field.
    pub fn states(&self) -> Vec<(FieldKey, FieldState)> {
        self.sections
            .values()
            .flat_map(|s| {
                s.fields
                    .iter()
                    .map(|f| (FieldKey::new(&s.plugin, f.name()), f.state))
            })
            .collect()
    }

    /// Drop the working set without writing anything.
    ///
    /// Returns the final state of every field; everything not yet committed
    /// ends as `Discarded`.
    pub fn discard(mut self) -> Vec<(FieldKey, FieldState)> {
        let mut pending = 0;
        for entry in self.sections.values_mut().flat_map(|s| s.fields.iter_mut()) {
            if entry.state != FieldState::Committed {
                if entry.is_changed() {
                    pending += 1;
                }
                entry.state = FieldState::Discarded;
            }
        }
        if pending > 0 {
            info!("discarded {pending} pending edits");
        }
        self.states()
    }
}
