// src/error.rs
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Soft failures raised while talking to a browser page.
///
/// These never end the run: the state machine turns them into an `Error`
/// outcome for the job at hand, the discovery loop into a skipped location.
#[derive(Debug, Clone, Error)]
pub enum PageFault {
    #[error("timed out after {}s waiting for {what}", .after.as_secs())]
    Timeout { what: String, after: Duration },

    #[error("no element matches {0}")]
    MissingElement(String),

    #[error("browser command failed: {0}")]
    Command(String),
}

impl PageFault {
    pub fn timeout(what: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            what: what.into(),
            after,
        }
    }

    pub fn command(err: impl std::fmt::Display) -> Self {
        Self::Command(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum BotError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("failed to persist {what} at {}: {source}", .path.display())]
    Persistence {
        what: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write run log {}: {source}", .path.display())]
    RunLog {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("browser unavailable: {0}")]
    Browser(String),

    #[error(transparent)]
    Page(#[from] PageFault),
}

impl BotError {
    pub fn persistence(what: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Persistence {
            what,
            path: path.into(),
            source,
        }
    }
}

pub type BotResult<T> = std::result::Result<T, BotError>;
