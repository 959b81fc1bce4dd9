//! TUI quick edit dialog.
//!
//! One panel per plugin, a checkbox for boolean fields and a text field for
//! everything else. Save commits the session after the terminal is
//! restored, so the per-field report is printed normally.

use cursive::{
    Cursive, CursiveExt,
    event::Key,
    view::{Nameable, Resizable, Scrollable},
    views::{Checkbox, Dialog, EditView, LinearLayout, Panel, TextView},
};
use quickedit::data::{EditSession, FieldKey, SettingKind, SettingValue};

use crate::{ctx::AppContext, form::print_report};

/// What the dialog was closed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Save,
    Cancel,
}

/// Widget keys and the texts they held when Save was pressed.
struct DialogData {
    fields: Vec<(FieldKey, SettingKind)>,
    values: Vec<(FieldKey, String)>,
    action: Action,
}

fn form_view(session: &EditSession) -> LinearLayout {
    let mut form = LinearLayout::vertical();

    for section in session.sections() {
        let mut rows = LinearLayout::vertical();
        for field in &section.fields {
            let id = FieldKey::new(&section.plugin, field.name()).to_string();
            let label = TextView::new(field.name()).full_width();
            let row = match field.kind() {
                SettingKind::Bool => LinearLayout::horizontal().child(label).child(
                    Checkbox::new()
                        .with_checked(field.current().truth().unwrap_or(false))
                        .with_name(id),
                ),
                SettingKind::Number | SettingKind::Text => {
                    LinearLayout::horizontal().child(label).child(
                        EditView::new()
                            .content(field.current().to_string())
                            .with_name(id)
                            .fixed_width(12),
                    )
                }
            };
            rows.add_child(row);
        }
        form.add_child(Panel::new(rows).title(section.title.clone()));
    }

    if session.sections().next().is_none() {
        form.add_child(TextView::new("No editable settings found."));
    }
    form
}

fn on_save(siv: &mut Cursive) {
    let fields = siv
        .with_user_data(|data: &mut DialogData| data.fields.clone())
        .unwrap_or_default();

    let mut values = Vec::with_capacity(fields.len());
    for (key, kind) in fields {
        let id = key.to_string();
        let text = match kind {
            SettingKind::Bool => siv.call_on_name(&id, |c: &mut Checkbox| {
                SettingValue::Bool(c.is_checked()).to_profile_text()
            }),
            SettingKind::Number | SettingKind::Text => {
                siv.call_on_name(&id, |e: &mut EditView| e.get_content().to_string())
            }
        };
        if let Some(text) = text {
            values.push((key, text));
        }
    }

    siv.with_user_data(|data: &mut DialogData| {
        data.values = values;
        data.action = Action::Save;
    });
    siv.quit();
}

fn on_cancel(siv: &mut Cursive) {
    siv.with_user_data(|data: &mut DialogData| data.action = Action::Cancel);
    siv.quit();
}

/// Run the dialog and commit or discard the session it edited.
///
/// # Errors
///
/// Returns an error only if the dialog state is lost or a submitted field
/// was never loaded.
pub fn run(ctx: &AppContext) -> anyhow::Result<()> {
    let mut session = ctx.open_session();

    let fields = session
        .sections()
        .flat_map(|s| {
            s.fields
                .iter()
                .map(|f| (FieldKey::new(&s.plugin, f.name()), f.kind()))
        })
        .collect();

    let mut siv = Cursive::default();
    siv.set_user_data(DialogData {
        fields,
        values: Vec::new(),
        action: Action::Cancel,
    });
    siv.add_global_callback(Key::Esc, on_cancel);
    siv.add_layer(
        Dialog::around(form_view(&session).scrollable())
            .title(ctx.title())
            .button("Save", on_save)
            .button("Cancel", on_cancel)
            .max_height(40),
    );

    siv.run();

    let data = siv
        .take_user_data::<DialogData>()
        .ok_or_else(|| anyhow!("dialog state lost"))?;

    for failure in session.load_errors() {
        warn!("skipped {}: {}", failure.plugin, failure.error);
    }

    match data.action {
        Action::Cancel => {
            session.discard();
            println!("No settings saved.");
        }
        Action::Save => {
            for (key, text) in &data.values {
                session.set_current_text(&key.plugin, &key.name, text)?;
            }
            print_report(&session.commit(&ctx.writer()));
        }
    }
    Ok(())
}
