use std::fs;

use quickedit_cli::{
    ctx::{AppContext, CONFIG_FILE, QuickEditConfig},
    form,
};

fn workspace() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    fs::write(
        root.join(CONFIG_FILE),
        r#"
profiles_root = "profiles"
plugins_root = "plugins"

[visible_fields]
speed = ["Activate Speed:", "Feed Rate (mm/s):"]
"#,
    )
    .unwrap();

    fs::create_dir_all(root.join("plugins")).unwrap();
    fs::write(
        root.join("plugins").join("speed.toml"),
        r#"
[[preferences]]
name = "Activate Speed:"
default = true

[[preferences]]
name = "Feed Rate (mm/s):"
default = 16.0

[[preferences]]
name = "Orbital Feed Rate over Operating Feed Rate (ratio):"
default = 0.5
"#,
    )
    .unwrap();

    let profile = root.join("profiles").join("extrusion");
    fs::create_dir_all(profile.join("PLA")).unwrap();
    fs::write(
        root.join("profiles").join("extrusion.csv"),
        "Format is tab separated preferences.\nProfile Selection:\tPLA\n",
    )
    .unwrap();
    fs::write(
        profile.join("PLA").join("speed.csv"),
        "Format is tab separated preferences.\n_Name\tValue\nActivate Speed:\tTrue\nFeed Rate (mm/s):\t16.0\nOrbital Feed Rate over Operating Feed Rate (ratio):\t0.5\n",
    )
    .unwrap();
    dir
}

fn context(dir: &tempfile::TempDir) -> AppContext {
    let (config, base) = QuickEditConfig::load(None, dir.path()).unwrap();
    AppContext::new(config, base).unwrap()
}

#[test]
fn set_writes_only_changed_records() {
    let dir = workspace();
    let ctx = context(&dir);
    let speed = dir.path().join("profiles/extrusion/PLA/speed.csv");

    let ok = form::set(
        &ctx,
        &[
            "speed.Feed Rate (mm/s):=20.0".to_string(),
            "speed.Activate Speed:=True".to_string(),
        ],
        false,
    )
    .unwrap();
    assert!(ok);
    assert_eq!(
        fs::read_to_string(&speed).unwrap(),
        "Format is tab separated preferences.\n_Name\tValue\nActivate Speed:\tTrue\nFeed Rate (mm/s):\t20\nOrbital Feed Rate over Operating Feed Rate (ratio):\t0.5\n"
    );
}

#[test]
fn set_rejects_hidden_fields() {
    let dir = workspace();
    let ctx = context(&dir);

    let err = form::set(
        &ctx,
        &["speed.Orbital Feed Rate over Operating Feed Rate (ratio):=1".to_string()],
        false,
    );
    assert!(err.is_err());
}

#[test]
fn set_reports_bad_numbers() {
    let dir = workspace();
    let ctx = context(&dir);

    let ok = form::set(&ctx, &["speed.Feed Rate (mm/s):=fast".to_string()], true).unwrap();
    assert!(!ok);
}

#[test]
fn show_lists_visible_fields() {
    let dir = workspace();
    let ctx = context(&dir);
    let session = ctx.open_session();

    let speed = session.section("speed").unwrap();
    let names: Vec<_> = speed.fields.iter().map(|f| f.name()).collect();
    assert_eq!(names, ["Activate Speed:", "Feed Rate (mm/s):"]);
    assert!(form::show(&ctx, true).is_ok());
}
