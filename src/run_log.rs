// src/run_log.rs
use crate::error::{BotError, BotResult};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::path::PathBuf;

/// One CSV row per attempted job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunLogRecord {
    pub timestamp: String,
    pub job_title: String,
    pub company: String,
    pub city: String,
    pub distance: Option<f64>,
    pub status: String,
}

impl RunLogRecord {
    pub fn now(
        job_title: &str,
        company: &str,
        city: &str,
        distance: Option<f64>,
        status: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            job_title: job_title.to_string(),
            company: company.to_string(),
            city: city.to_string(),
            distance,
            status: status.into(),
        }
    }
}

/// Append-only audit trail. Not authoritative for deduplication.
pub struct RunLog {
    path: PathBuf,
}

impl RunLog {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Write one row and flush it; the header goes in only when the file is new.
    pub fn append(&self, record: &RunLogRecord) -> BotResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| BotError::persistence("run log", &self.path, e))?;
            }
        }

        let needs_header = std::fs::metadata(&self.path)
            .map(|meta| meta.len() == 0)
            .unwrap_or(true);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| BotError::persistence("run log", &self.path, e))?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        writer.serialize(record).map_err(|source| BotError::RunLog {
            path: self.path.clone(),
            source,
        })?;
        writer
            .flush()
            .map_err(|e| BotError::persistence("run log", &self.path, e))?;
        Ok(())
    }

    #[cfg(test)]
    pub fn read_all(&self) -> Vec<RunLogRecord> {
        let Ok(mut reader) = csv::Reader::from_path(&self.path) else {
            return Vec::new();
        };
        reader.deserialize().filter_map(Result::ok).collect()
    }
}
