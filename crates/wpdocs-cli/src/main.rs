//! wpdocs-cli: CLI entry point for wpdocs.

mod commands_config;
mod commands_index;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use wpdocs_core::WpdocsConfig;

#[derive(Parser)]
#[command(
    name = "wpdocs",
    about = "Build a cross-referenced symbol catalogue from WordPress sources"
)]
#[command(version, propagate_version = true)]
struct Cli {
    /// Config file (defaults to ~/.wpdocs/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the source files that would be queued for extraction
    Files {
        /// Path to a local WordPress checkout
        #[arg(short, long)]
        source: PathBuf,

        /// Version tag; `latest` reads it from wp-includes/version.php
        #[arg(short, long, default_value = "latest")]
        tag: String,

        /// Skip PHP files
        #[arg(long)]
        skip_php: bool,

        /// Skip JS/TS files
        #[arg(long)]
        skip_js: bool,
    },

    /// Ingest extraction records and resolve cross-references
    Resolve {
        /// Directory of JSON extraction records
        #[arg(short, long)]
        records: PathBuf,

        /// Number of parallel workers
        #[arg(short, long)]
        workers: Option<usize>,

        /// Stop claiming new files after this many seconds
        #[arg(long)]
        deadline_secs: Option<u64>,

        /// Override detection depth: ancestors or immediate
        #[arg(long)]
        override_scope: Option<String>,

        /// Write the resolved symbols as JSON to this file
        #[arg(long)]
        dump: Option<PathBuf>,

        /// Show per-file failures
        #[arg(short, long)]
        verbose: bool,
    },

    /// Read or modify configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Print one value by dotted key (e.g. index.workers)
    Get { key: String },
    /// Set one value by dotted key and save
    Set { key: String, value: String },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("wpdocs=info".parse().expect("valid tracing directive")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(WpdocsConfig::default_path);

    match cli.command {
        Commands::Files {
            source,
            tag,
            skip_php,
            skip_js,
        } => {
            let config = WpdocsConfig::load_or_default(&config_path)?;
            commands_index::cmd_files(&config, &source, &tag, skip_php, skip_js)?;
        }
        Commands::Resolve {
            records,
            workers,
            deadline_secs,
            override_scope,
            dump,
            verbose,
        } => {
            let mut config = WpdocsConfig::load_or_default(&config_path)?;
            if let Some(w) = workers {
                config.index.workers = w;
            }
            if deadline_secs.is_some() {
                config.index.deadline_secs = deadline_secs;
            }
            if let Some(scope) = override_scope {
                config.resolver.override_scope = scope.parse()?;
            }
            commands_index::cmd_resolve(&config, &records, dump.as_deref(), verbose)?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => commands_config::cmd_config_show(&config_path)?,
            ConfigAction::Get { key } => commands_config::cmd_config_get(&config_path, &key)?,
            ConfigAction::Set { key, value } => {
                commands_config::cmd_config_set(&config_path, &key, &value)?
            }
        },
    }

    Ok(())
}
