// src/session.rs
use crate::core::FsOps;
use crate::error::{BotError, BotResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Browser cookie as persisted between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    #[serde(default = "root_path")]
    pub path: String,
    #[serde(default)]
    pub expires: Option<f64>,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default)]
    pub secure: bool,
}

fn root_path() -> String {
    "/".to_string()
}

/// Authenticated browser state, cookies grouped by domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub saved_at: DateTime<Utc>,
    pub cookies: BTreeMap<String, Vec<StoredCookie>>,
}

impl SessionState {
    pub fn from_cookies(cookies: Vec<StoredCookie>) -> Self {
        let mut by_domain: BTreeMap<String, Vec<StoredCookie>> = BTreeMap::new();
        for cookie in cookies {
            by_domain.entry(cookie.domain.clone()).or_default().push(cookie);
        }
        Self {
            saved_at: Utc::now(),
            cookies: by_domain,
        }
    }

    pub fn all_cookies(&self) -> Vec<StoredCookie> {
        self.cookies.values().flatten().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.values().all(Vec::is_empty)
    }
}

/// Durable authentication state and the set of job ids already applied to.
pub struct SessionStore {
    cookies_path: PathBuf,
    seen_path: PathBuf,
    seen: HashSet<String>,
}

impl SessionStore {
    /// Open the store and load the seen-set. Unreadable seen files are fatal.
    pub async fn open(cookies_path: impl Into<PathBuf>, seen_path: impl Into<PathBuf>) -> BotResult<Self> {
        let mut store = Self {
            cookies_path: cookies_path.into(),
            seen_path: seen_path.into(),
            seen: HashSet::new(),
        };
        store.seen = store.load_seen_set().await?;
        info!(
            "Loaded {} previously applied job ids from {}",
            store.seen.len(),
            store.seen_path.display()
        );
        Ok(store)
    }

    pub fn cookies_path(&self) -> &Path {
        &self.cookies_path
    }

    pub fn has_saved_session(&self) -> bool {
        self.cookies_path.exists()
    }

    /// Saved session, or `None` when there is nothing usable on disk.
    pub async fn load(&self) -> BotResult<Option<SessionState>> {
        let content = match FsOps::read_optional(&self.cookies_path).await {
            Ok(Some(content)) => content,
            Ok(None) => return Ok(None),
            Err(e) => {
                warn!("Failed to read {}: {}", self.cookies_path.display(), e);
                return Ok(None);
            }
        };

        match serde_json::from_str::<SessionState>(&content) {
            Ok(state) if !state.is_empty() => Ok(Some(state)),
            Ok(_) => Ok(None),
            Err(e) => {
                warn!(
                    "Ignoring malformed session file {}: {}",
                    self.cookies_path.display(),
                    e
                );
                Ok(None)
            }
        }
    }

    pub async fn save(&self, state: &SessionState) -> BotResult<()> {
        let body = serde_json::to_string_pretty(state)
            .map_err(|e| BotError::persistence("session", &self.cookies_path, e.into()))?;
        FsOps::write_replace(&self.cookies_path, &body)
            .await
            .map_err(|e| BotError::persistence("session", &self.cookies_path, e))?;
        debug!(
            "Saved {} cookies to {}",
            state.cookies.values().map(Vec::len).sum::<usize>(),
            self.cookies_path.display()
        );
        Ok(())
    }

    pub async fn load_seen_set(&self) -> BotResult<HashSet<String>> {
        let content = FsOps::read_optional(&self.seen_path)
            .await
            .map_err(|e| BotError::persistence("seen set", &self.seen_path, e))?;

        Ok(content
            .map(|text| {
                text.lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }

    pub fn seen(&self) -> &HashSet<String> {
        &self.seen
    }

    pub fn contains(&self, job_id: &str) -> bool {
        self.seen.contains(job_id)
    }

    /// Mark a job as applied. Returns once the id is on disk; repeats are no-ops.
    pub async fn record_applied(&mut self, job_id: &str) -> BotResult<()> {
        if self.seen.contains(job_id) {
            debug!(job_id, "Job already recorded as applied");
            return Ok(());
        }

        FsOps::append_line_durable(&self.seen_path, job_id)
            .await
            .map_err(|e| BotError::persistence("seen set", &self.seen_path, e))?;
        self.seen.insert(job_id.to_string());
        Ok(())
    }
}
