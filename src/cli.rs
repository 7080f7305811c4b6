// src/cli.rs
use crate::config::{BotConfig, DEFAULT_CONFIG_PATH};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "autoapply")]
#[command(about = "Search job boards and submit quick-apply applications")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Configuration file (.json, .yaml or .toml)
    #[arg(long, short, default_value = DEFAULT_CONFIG_PATH, global = true)]
    pub config: PathBuf,

    /// Collect matching jobs into the queue file without applying
    #[arg(long)]
    pub queue_only: bool,

    /// Run the browser without a window
    #[arg(long)]
    pub headless: bool,

    /// Also write JSON logs to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Debug logging
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Validate the configuration and print it
    CheckConfig,
}

impl Cli {
    /// Apply flags that override the file.
    pub fn apply_overrides(&self, config: BotConfig) -> BotConfig {
        if self.headless {
            config.with_headless(true)
        } else {
            config
        }
    }

    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}
