#![forbid(unsafe_code)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use pss_settings::config::migration;
use pss_settings::config::store::read_document;
use pss_settings::{logging, ConfigStore, StoreOptions};

/// Inspect and edit the PSS settings file
#[derive(Debug, Parser)]
#[command(name = "pss-settings", version)]
struct Cli {
    /// Settings file (overrides PSS_SETTINGS_FILE and the default locations)
    #[arg(long, global = true)]
    file: Option<PathBuf>,

    /// Project root searched for config/app_settings.json
    #[arg(long, global = true)]
    project_root: Option<PathBuf>,

    /// Debug logging (otherwise LOG_LEVEL, default info)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Section {
    Current,
    Defaults,
    Metadata,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print a section of the document (all of it by default)
    Show {
        #[arg(long, value_enum)]
        section: Option<Section>,
    },
    /// Print the value at a dotted path
    Get { path: String },
    /// Set a dotted path to a JSON value (bare words are stored as strings)
    Set {
        path: String,
        value: String,
        /// Keep the change in memory only (useful with `--verbose` to preview)
        #[arg(long)]
        no_save: bool,
    },
    /// Restore current settings (or one category) from the defaults snapshot
    Reset { category: Option<String> },
    /// Store current settings (or one category) as the new defaults
    SaveDefaults { category: Option<String> },
    /// List categories present in current settings
    Categories,
    /// Run the unit migration on a file
    Migrate {
        file: PathBuf,
        /// Print the result without writing it back
        #[arg(long)]
        dry_run: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose).context("Failed to install tracing subscriber")?;

    match cli.command {
        Command::Migrate { file, dry_run } => run_migrate(&file, dry_run),
        command => {
            let options = StoreOptions {
                explicit_path: cli.file,
                project_root: cli.project_root,
                ..StoreOptions::default()
            };
            let mut store = ConfigStore::load(&options).context("Failed to load settings")?;
            run(&mut store, command)
        }
    }
}

fn run(store: &mut ConfigStore, command: Command) -> Result<()> {
    match command {
        Command::Show { section } => {
            let document = store.document();
            let value = match section {
                None => document.to_value(),
                Some(Section::Current) => Value::Object(document.current),
                Some(Section::Defaults) => Value::Object(document.defaults_snapshot),
                Some(Section::Metadata) => Value::Object(document.metadata),
            };
            print_json(&value)?;
        }
        Command::Get { path } => {
            let value = store.get(&path, Value::Null);
            if value.is_null() {
                warn!(path = %path, "No value at path");
            }
            print_json(&value)?;
        }
        Command::Set { path, value, no_save } => {
            // Accept bare words so `set graphics.mode night` works without quoting
            let parsed = serde_json::from_str(&value).unwrap_or(Value::String(value));
            store
                .set(&path, parsed, !no_save)
                .with_context(|| format!("Failed to set '{path}'"))?;
            info!(path = %path, saved = !no_save, "Value set");
        }
        Command::Reset { category } => {
            store
                .reset_to_defaults(category.as_deref())
                .context("Failed to reset settings")?;
        }
        Command::SaveDefaults { category } => {
            store
                .save_current_as_defaults(category.as_deref())
                .context("Failed to save defaults")?;
        }
        Command::Categories => {
            for name in store.categories() {
                println!("{name}");
            }
        }
        Command::Migrate { file, dry_run } => run_migrate(&file, dry_run)?,
    }

    Ok(())
}

fn run_migrate(file: &Path, dry_run: bool) -> Result<()> {
    if !dry_run {
        // Loading migrates and persists in one step
        let store = ConfigStore::open(file)
            .with_context(|| format!("Failed to migrate {}", file.display()))?;
        for conversion in &store.last_migration().conversions {
            println!("{conversion}");
        }
        return Ok(());
    }

    let document = read_document(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let (migrated, report) = migration::migrate(document);
    for conversion in &report.conversions {
        println!("{conversion}");
    }
    if !report.changed {
        println!("already at current units version");
    }
    print_json(&migrated.to_value())
}

fn print_json(value: &Value) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to format JSON")?;
    println!("{text}");
    Ok(())
}
