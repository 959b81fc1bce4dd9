use std::path::PathBuf;

use clap::{Parser, Subcommand};
use quickedit_cli::{
    ctx::{AppContext, QuickEditConfig},
    form, menuconfig,
};

/// Quick edit the most important settings of the active profile.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Configuration file, defaults to `.quickedit.toml` in the working directory.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Root directory of the profile tree.
    #[arg(long, global = true)]
    profiles_root: Option<String>,
    /// Directory holding plugin declarations.
    #[arg(long, global = true)]
    plugins_root: Option<String>,
    /// Craft type whose profile is edited.
    #[arg(long, global = true)]
    craft_type: Option<String>,
    /// Profile to edit instead of the selected one.
    #[arg(short, long, global = true)]
    profile: Option<String>,
    /// Fail a plugin when an allow-listed field is not declared.
    #[arg(long, global = true)]
    strict: bool,
    #[command(subcommand)]
    command: Option<SubCommands>,
}

#[derive(Subcommand, Debug)]
enum SubCommands {
    /// Open the quick edit dialog (default).
    Edit,
    /// Print the editable fields.
    Show {
        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Set fields and save, e.g. `"cool.Minimum Layer Time (seconds):=7"`.
    Set {
        /// Edits as `plugin.name=value`.
        #[arg(required = true)]
        edits: Vec<String>,
        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let workdir = std::env::current_dir()?;
    let (mut config, base) = QuickEditConfig::load(cli.config.as_deref(), &workdir)?;

    if let Some(root) = cli.profiles_root {
        config.profiles_root = root;
    }
    if let Some(root) = cli.plugins_root {
        config.plugins_root = root;
    }
    if let Some(craft) = cli.craft_type {
        config.craft_type = craft;
    }
    if cli.profile.is_some() {
        config.profile = cli.profile;
    }
    config.strict_visible_fields |= cli.strict;

    let ctx = AppContext::new(config, base)?;

    match cli.command.unwrap_or(SubCommands::Edit) {
        SubCommands::Edit => menuconfig::run(&ctx)?,
        SubCommands::Show { json } => form::show(&ctx, json)?,
        SubCommands::Set { edits, json } => {
            if !form::set(&ctx, &edits, json)? {
                std::process::exit(1);
            }
        }
    }
    Ok(())
}
