use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

use crate::app::App;
use crate::config::ConfigLoader;
use crate::gateway::HttpGateway;

pub mod commands;

use self::commands::{AddArgs, DeleteArgs, EditArgs, GridArgs, ListArgs, TagArgs};

#[derive(Parser, Debug)]
#[command(
    name = "dunbar",
    version,
    about = "Keep track of the people you know, grouped by tag"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (or directory holding config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Base URL of the contacts server (overrides server.base_url)
    #[arg(long)]
    pub server: Option<String>,

    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print contacts as a table, newest first
    List(ListArgs),
    /// Print contacts grouped by tag
    Grid(GridArgs),
    /// Create a contact
    Add(AddArgs),
    /// Change a contact's date or tag, or rename it
    Edit(EditArgs),
    /// Delete a contact
    Delete(DeleteArgs),
    /// Manage tags
    Tags(TagArgs),
}

pub fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level)
        .with_context(|| format!("initialising logging at level {}", cli.log_level))?;

    let loader = ConfigLoader::discover(cli.config.clone())?;
    let mut config = loader.load()?;
    if let Some(server) = &cli.server {
        config.override_server(server)?;
    }
    tracing::debug!(server = %config.server.base_url, "configuration loaded");

    let gateway = HttpGateway::new(&config.server)?;
    let mut app = App::new(Arc::new(config), Arc::new(gateway));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("starting async runtime")?;
    let mut stdout = io::stdout();
    let succeeded = runtime.block_on(commands::dispatch(&mut app, cli.command, &mut stdout))?;
    Ok(if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn init_tracing(level: &str) -> Result<()> {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_try_init(|| {
        let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
        fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
        Ok(())
    })
    .map(|_| ())
}
