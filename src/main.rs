//! Quill - A terminal rich-text document editor.
//!
//! # Usage
//!
//! ```bash
//! quill notes.json
//! quill --landscape notes.json
//! quill --margin wide --save-delay-ms 500 notes.json
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use quill::app::App;
use quill::config::{
    ConfigFlags, MarginMode, clear_config_flags, global_config_path, load_config_flags,
    local_override_path, parse_flag_tokens, save_config_flags,
};
use quill::persist::{ClearOutcome, SnapshotStore};

/// A terminal rich-text document editor with autosave
#[derive(Parser, Debug)]
#[command(name = "quill", version, about, long_about = None)]
struct Cli {
    /// Snapshot file to edit (created on first save)
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Start in landscape page orientation
    #[arg(long)]
    landscape: bool,

    /// Page margin width
    #[arg(long, value_enum)]
    margin: Option<MarginMode>,

    /// Autosave delay in milliseconds
    #[arg(long, value_name = "MS")]
    save_delay_ms: Option<u64>,

    /// Disable debounced autosave (Ctrl+S still saves)
    #[arg(long)]
    no_autosave: bool,

    /// Discard the stored snapshot and start with an empty document
    #[arg(long)]
    new: bool,

    /// Save current command-line flags as defaults in .quillrc
    #[arg(long)]
    save: bool,

    /// Clear saved defaults in .quillrc
    #[arg(long)]
    clear: bool,
}

const DEFAULT_STORE: &str = "quill.json";

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let raw_args = std::env::args().collect::<Vec<_>>();
    let cli = Cli::parse();
    let global_path = global_config_path();
    let local_path = local_override_path();
    let cli_flags = parse_flag_tokens(&raw_args);

    if cli.clear {
        clear_config_flags(&global_path)?;
    }
    if cli.save {
        save_config_flags(&global_path, &cli_flags)?;
    }

    let file_flags = if cli.clear {
        ConfigFlags::default()
    } else {
        let global_flags = load_config_flags(&global_path)?;
        let local_flags = load_config_flags(&local_path)?;
        global_flags.union(&local_flags)
    };
    let effective = file_flags.union(&cli_flags);

    let store_path = cli
        .file
        .or_else(|| effective.store.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE));

    if cli.new
        && let ClearOutcome::Failed(err) = SnapshotStore::new(&store_path).clear()
    {
        return Err(err).context("Failed to discard the stored snapshot");
    }

    // Run the application
    let mut app = App::new(store_path)
        .with_landscape(effective.landscape)
        .with_margin(effective.margin.map(MarginMode::to_page_margin))
        .with_save_delay_ms(effective.save_delay_ms)
        .with_autosave(!cli.no_autosave)
        .with_config_paths(
            Some(global_path.clone()),
            if local_path.exists() {
                Some(local_path.clone())
            } else {
                None
            },
        );

    app.run().context("Application error")
}
