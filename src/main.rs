// src/main.rs
use anyhow::{Context, Result};
use autoapply::browser::chrome::{ChromeBrowser, ChromeOptions};
use autoapply::browser::Browser;
use autoapply::cli::{Cli, Command};
use autoapply::console::TerminalConsole;
use autoapply::distance::{DistanceResolver, GoogleDistanceResolver, NoDistance};
use autoapply::notify::DesktopNotifier;
use autoapply::{discovery, BotConfig, RunContext};
use clap::Parser;
use std::fs::OpenOptions;
use std::sync::Arc;
use tracing::{info, warn};

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

fn init_logging(cli: &Cli) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level()));

    let file_layer = match &cli.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .json()
                    .with_writer(file)
                    .with_current_span(false)
                    .with_span_list(false),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(file_layer)
        .init();
    Ok(())
}

fn print_config(config: &BotConfig) -> Result<()> {
    let mut shown = config.clone();
    if shown.google_api_key.is_some() {
        shown.google_api_key = Some("********".to_string());
    }
    println!("{}", serde_json::to_string_pretty(&shown)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    let config = BotConfig::load(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    let config = cli.apply_overrides(config);

    if cli.command == Some(Command::CheckConfig) {
        print_config(&config)?;
        info!("Configuration is valid");
        return Ok(());
    }

    let chrome = Arc::new(
        ChromeBrowser::launch(&ChromeOptions {
            headless: config.headless,
            user_data_dir: config.user_data_dir.clone(),
            user_agent: config.user_agent.clone(),
        })
        .await
        .context("Failed to launch the browser")?,
    );

    let distance: Box<dyn DistanceResolver> = if config.user_address.is_some() {
        Box::new(GoogleDistanceResolver::new(config.google_api_key.clone()))
    } else {
        Box::new(NoDistance)
    };

    let browser: Arc<dyn Browser> = chrome.clone();
    let mut ctx = RunContext::build(
        config,
        browser,
        Box::new(TerminalConsole),
        Box::new(DesktopNotifier),
        distance,
        cli.queue_only,
    )
    .await
    .context("Failed to open the run stores")?;

    let outcome = discovery::run(&mut ctx).await;
    drop(ctx);

    match Arc::try_unwrap(chrome) {
        Ok(chrome) => chrome.shutdown().await,
        Err(_) => warn!("Browser still in use at exit, leaving it to the OS"),
    }

    let summary = outcome.context("Run aborted")?;
    println!(
        "Done: {} applied, {} skipped, {} errors, {} queued",
        summary.applied, summary.skipped, summary.errors, summary.queued
    );
    Ok(())
}
