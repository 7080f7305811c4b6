// src/config.rs
use crate::error::{BotError, BotResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

pub const DEFAULT_CONFIG_PATH: &str = "config.json";
pub const DEFAULT_SITE_URL: &str = "https://www.indeed.com";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/117 Safari/537.36";

/// Run configuration, read once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotConfig {
    pub locations: Vec<String>,

    #[serde(alias = "max_applications", default = "default_max_applications")]
    pub max_applications: usize,

    #[serde(alias = "min_salary")]
    pub min_salary: f64,

    #[serde(alias = "resume_path")]
    pub resume_path: PathBuf,

    #[serde(alias = "user_address", default)]
    pub user_address: Option<String>,

    #[serde(alias = "google_api_key", default)]
    pub google_api_key: Option<String>,

    #[serde(alias = "log_path", default = "default_log_path")]
    pub log_path: PathBuf,

    #[serde(alias = "cookies_path", default = "default_cookies_path")]
    pub cookies_path: PathBuf,

    #[serde(alias = "applied_jobs_path", default = "default_applied_jobs_path")]
    pub applied_jobs_path: PathBuf,

    #[serde(alias = "job_queue_path", default = "default_job_queue_path")]
    pub job_queue_path: PathBuf,

    #[serde(alias = "site_url", default = "default_site_url")]
    pub site_url: String,

    #[serde(alias = "filter_by_location", default = "default_true")]
    pub filter_by_location: bool,

    #[serde(alias = "delay_min_ms", default = "default_delay_min_ms")]
    pub delay_min_ms: u64,

    #[serde(alias = "delay_max_ms", default = "default_delay_max_ms")]
    pub delay_max_ms: u64,

    #[serde(alias = "wait_timeout_secs", default = "default_wait_timeout_secs")]
    pub wait_timeout_secs: u64,

    #[serde(alias = "navigation_timeout_secs", default = "default_navigation_timeout_secs")]
    pub navigation_timeout_secs: u64,

    #[serde(alias = "placeholder_phone", default = "default_placeholder_phone")]
    pub placeholder_phone: String,

    #[serde(alias = "placeholder_text", default = "default_placeholder_text")]
    pub placeholder_text: String,

    #[serde(default)]
    pub headless: bool,

    #[serde(alias = "user_data_dir", default)]
    pub user_data_dir: Option<PathBuf>,

    #[serde(alias = "user_agent", default = "default_user_agent")]
    pub user_agent: String,
}

fn default_max_applications() -> usize {
    50
}

fn default_log_path() -> PathBuf {
    PathBuf::from("applied_jobs_log.csv")
}

fn default_cookies_path() -> PathBuf {
    PathBuf::from("cookies.json")
}

fn default_applied_jobs_path() -> PathBuf {
    PathBuf::from("applied_jobs.txt")
}

fn default_job_queue_path() -> PathBuf {
    PathBuf::from("job_queue.json")
}

fn default_site_url() -> String {
    DEFAULT_SITE_URL.to_string()
}

fn default_true() -> bool {
    true
}

fn default_delay_min_ms() -> u64 {
    1000
}

fn default_delay_max_ms() -> u64 {
    3000
}

fn default_wait_timeout_secs() -> u64 {
    10
}

fn default_navigation_timeout_secs() -> u64 {
    15
}

fn default_placeholder_phone() -> String {
    "555-555-5555".to_string()
}

fn default_placeholder_text() -> String {
    "N/A".to_string()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    Json,
    Yaml,
    Toml,
}

impl ConfigFormat {
    fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
            .as_deref()
        {
            Some("yaml") | Some("yml") => Self::Yaml,
            Some("toml") => Self::Toml,
            _ => Self::Json,
        }
    }
}

impl BotConfig {
    /// Load and validate configuration. A missing file is fatal.
    pub fn load(path: &Path) -> BotResult<Self> {
        info!("Loading configuration from {}", path.display());

        if !path.exists() {
            return Err(BotError::Configuration(format!(
                "{} not found. The bot cannot start without configuration.",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            BotError::Configuration(format!("failed to read {}: {}", path.display(), e))
        })?;

        let mut config = Self::parse(&content, ConfigFormat::from_path(path))
            .map_err(|e| BotError::Configuration(format!("failed to parse {}: {}", path.display(), e)))?;

        if config.google_api_key.is_none() {
            config.google_api_key = std::env::var("GOOGLE_API_KEY").ok();
        }
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    fn parse(content: &str, format: ConfigFormat) -> Result<Self, String> {
        match format {
            ConfigFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
            ConfigFormat::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string()),
            ConfigFormat::Toml => toml::from_str(content).map_err(|e| e.to_string()),
        }
    }

    fn normalize(&mut self) {
        self.locations = self
            .locations
            .iter()
            .map(|loc| loc.trim().to_string())
            .filter(|loc| !loc.is_empty())
            .collect();

        // Blank strings in hand-edited files mean "not configured".
        for field in [&mut self.user_address, &mut self.google_api_key] {
            if field.as_deref().map(str::trim).is_some_and(str::is_empty) {
                *field = None;
            }
        }
    }

    pub fn validate(&self) -> BotResult<()> {
        if self.locations.is_empty() {
            return Err(BotError::Configuration(
                "at least one location is required".to_string(),
            ));
        }

        if !self.min_salary.is_finite() || self.min_salary < 0.0 {
            return Err(BotError::Configuration(format!(
                "minSalary must be a non-negative number, got {}",
                self.min_salary
            )));
        }

        if self.delay_min_ms > self.delay_max_ms {
            return Err(BotError::Configuration(format!(
                "delayMinMs ({}) exceeds delayMaxMs ({})",
                self.delay_min_ms, self.delay_max_ms
            )));
        }

        if self.wait_timeout_secs == 0 || self.navigation_timeout_secs == 0 {
            return Err(BotError::Configuration(
                "timeouts must be at least one second".to_string(),
            ));
        }

        if !self.resume_path.is_file() {
            return Err(BotError::Configuration(format!(
                "resume not found: {}",
                self.resume_path.display()
            )));
        }

        url::Url::parse(&self.site_url).map_err(|e| {
            BotError::Configuration(format!("siteUrl {} is not a valid URL: {}", self.site_url, e))
        })?;

        Ok(())
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.wait_timeout_secs)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }
}
