mod commands;
mod config;
mod span;

use std::path::PathBuf;

use anyhow::{Context, Result};
use calview_caldav::CalDavClient;
use calview_core::{CalendarRef, QueryWindow};
use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::span::Span;

#[derive(Parser)]
#[command(name = "calview")]
#[command(about = "Print upcoming events from your CalDAV calendars")]
struct Cli {
    /// Configuration file (TOML or JSON)
    #[arg(long, value_name = "FILE")]
    config: Option<String>,

    /// Display event descriptions (calendar descriptions with --list)
    #[arg(short, long)]
    verbose: bool,

    /// List the calendars on the server and exit
    #[arg(long)]
    list: bool,

    /// Time interval of interest: day, week, month, year, or a number of days
    #[arg(short, long, default_value = "week")]
    duration: Span,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config_path = match &cli.config {
        Some(path) => PathBuf::from(shellexpand::tilde(path).into_owned()),
        None => Config::default_path()?,
    };
    let config = Config::load(&config_path)?;
    let endpoint = config.endpoint(&config_path)?;

    let client = CalDavClient::new(endpoint, config.credentials(), config.timeout())?;

    if cli.list {
        let calendars = client
            .discover_calendars()
            .await
            .context("Failed to discover calendars")?;
        return commands::list::run(&client, &calendars, cli.verbose);
    }

    let calendars = resolve_calendars(&client, &config).await?;
    let window = QueryWindow::from_now(cli.duration.duration());
    tracing::debug!(span = %cli.duration, calendars = calendars.len(), "querying");

    commands::events::run(&client, &calendars, &window, cli.verbose, config.concurrency).await
}

/// Configured calendars, or every calendar the server reports when none are configured.
async fn resolve_calendars(client: &CalDavClient, config: &Config) -> Result<Vec<CalendarRef>> {
    if !config.calendars.is_empty() {
        return Ok(config.calendars.iter().map(CalendarRef::from_path).collect());
    }

    client
        .discover_calendars()
        .await
        .context("Failed to discover calendars")
}
