//! Non-interactive form: print the visible fields or apply edits given on
//! the command line.

use anyhow::{Context, anyhow};
use colored::Colorize;
use quickedit::data::{
    CommitReport, EditSession, FieldKey, SettingKind, session::PluginSection,
};
use serde::Serialize;

use crate::ctx::AppContext;

#[derive(Serialize)]
struct FormView<'a> {
    profile: &'a str,
    sections: Vec<&'a PluginSection>,
    errors: Vec<ErrorView>,
}

#[derive(Serialize)]
struct ErrorView {
    target: String,
    error: String,
}

/// Print the filtered form grouped by plugin.
pub fn show(ctx: &AppContext, json: bool) -> anyhow::Result<()> {
    let session = ctx.open_session();

    if json {
        let view = FormView {
            profile: ctx.profile_name(),
            sections: session.sections().collect(),
            errors: session
                .load_errors()
                .iter()
                .map(|f| ErrorView {
                    target: f.plugin.clone(),
                    error: f.error.to_string(),
                })
                .collect(),
        };
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    println!("{}", ctx.title().bold());
    for section in session.sections() {
        println!("\n{}", section.title.cyan().bold());
        let width = section
            .fields
            .iter()
            .map(|f| f.name().chars().count())
            .max()
            .unwrap_or(0);
        for field in &section.fields {
            let value = field.current().to_string();
            let value = match field.kind() {
                SettingKind::Bool => value.yellow(),
                SettingKind::Number => value.green(),
                SettingKind::Text => value.normal(),
            };
            println!("  {:width$}  {}", field.name(), value);
        }
    }
    print_load_errors(&session);
    Ok(())
}

/// Parse a `plugin.Setting Name=value` edit.
pub fn parse_edit(edit: &str) -> anyhow::Result<(FieldKey, String)> {
    let (field, value) = edit
        .split_once('=')
        .ok_or_else(|| anyhow!("expected `plugin.name=value`, got `{edit}`"))?;
    let key = FieldKey::parse_dotted(field)
        .ok_or_else(|| anyhow!("expected `plugin.name` before `=`, got `{field}`"))?;
    Ok((key, value.to_string()))
}

/// Apply `edits` to a fresh session and commit.
///
/// Returns whether every changed field was written.
pub fn set(ctx: &AppContext, edits: &[String], json: bool) -> anyhow::Result<bool> {
    let edits = edits
        .iter()
        .map(|e| parse_edit(e))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let mut session = ctx.open_session();
    if !json {
        print_load_errors(&session);
    }
    for (key, value) in &edits {
        session
            .set_current_text(&key.plugin, &key.name, value)
            .with_context(|| format!("cannot edit {key}"))?;
    }

    let report = session.commit(&ctx.writer());
    if json {
        print_report_json(&report)?;
    } else {
        print_report(&report);
    }
    Ok(report.is_success())
}

/// Print one line per written or failed field.
pub fn print_report(report: &CommitReport) {
    if report.is_empty() {
        println!("No settings changed.");
        return;
    }
    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(change) => println!(
                "Saved: {} = {} (was: {})",
                change.name,
                change.new_value.green(),
                change.old_value
            ),
            Err(e) => println!("{} {}: {e}", "Failed:".red().bold(), outcome.key),
        }
    }
    if report.is_success() {
        println!("{}", "Settings have been saved.".green());
    }
}

fn print_report_json(report: &CommitReport) -> anyhow::Result<()> {
    let saved: Vec<_> = report.changes().collect();
    let failed: Vec<_> = report
        .failures()
        .map(|(key, e)| ErrorView {
            target: key.to_string(),
            error: e.to_string(),
        })
        .collect();
    let value = serde_json::json!({ "saved": saved, "failed": failed });
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn print_load_errors(session: &EditSession) {
    for failure in session.load_errors() {
        eprintln!("{} {}", "skipped:".yellow(), failure.error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_edit() {
        let (key, value) = parse_edit("speed.Feed Rate (mm/s):=40").unwrap();
        assert_eq!(key, FieldKey::new("speed", "Feed Rate (mm/s):"));
        assert_eq!(value, "40");

        let (key, value) = parse_edit("raft.Add Raft, Elevate Nozzle, Orbit:=").unwrap();
        assert_eq!(key.name, "Add Raft, Elevate Nozzle, Orbit:");
        assert_eq!(value, "");

        assert!(parse_edit("speed").is_err());
        assert!(parse_edit("speed=40").is_err());
    }
}
