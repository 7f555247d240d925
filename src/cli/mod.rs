use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use once_cell::sync::OnceCell;
use time::UtcOffset;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{parse_offset_with, ConfigLoader};
use crate::prefs::{self, SelectionPrefs};

pub mod commands;

use self::commands::{FormatArgs, SelectCommand, TimelineArgs};

#[derive(Parser, Debug)]
#[command(
    name = "kafuffle",
    version,
    about = "Kafuffle chat client utilities"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Override the config file location (takes precedence over KAFUFFLE_CONFIG)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the data directory (takes precedence over KAFUFFLE_DATA)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render a zone's messages with day dividers
    Timeline(TimelineArgs),
    /// Print the label for a single timestamp
    Format(FormatArgs),
    /// Show or change the remembered space/zone selection
    #[command(subcommand)]
    Select(SelectCommand),
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // Ask for the local offset while the process is still single-threaded.
    let local_offset = UtcOffset::current_local_offset().ok();

    if let Some(path) = &cli.config {
        env::set_var("KAFUFFLE_CONFIG", path);
    }
    if let Some(path) = &cli.data_dir {
        env::set_var("KAFUFFLE_DATA", path);
    }

    init_tracing(&cli.log_level)
        .with_context(|| format!("initialising logging at level {}", cli.log_level))?;
    let loader = ConfigLoader::discover()?;
    let config = loader.load_or_init()?;
    let paths = loader.paths().clone();

    let resolve = |flag: Option<&str>| -> Result<UtcOffset> {
        match flag {
            Some(raw) => parse_offset_with(raw, local_offset),
            None => config.display.resolve_offset_with(local_offset),
        }
    };

    match cli.command {
        Commands::Timeline(args) => {
            let offset = resolve(args.offset.as_deref())?;
            commands::print_timeline(&args, offset)
        }
        Commands::Format(args) => {
            let offset = resolve(args.offset.as_deref())?;
            commands::print_label(&args, offset)
        }
        Commands::Select(command) => {
            let store = prefs::open_store(&config.preferences, &paths)
                .context("opening preference store")?;
            commands::handle_select(&SelectionPrefs::new(store), command)
        }
    }
}

fn init_tracing(level: &str) -> Result<()> {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_try_init(|| {
        let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));
        fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
        Ok(())
    })
    .map(|_| ())
}
