// src/job_queue.rs
//! Queue-only mode: candidates are parked in a JSON file for a later pass
//! instead of being applied to.

use crate::core::FsOps;
use crate::error::{BotError, BotResult};
use crate::extract::JobCandidate;
use std::path::PathBuf;
use tracing::warn;

pub struct JobQueue {
    path: PathBuf,
    jobs: Vec<JobCandidate>,
}

impl JobQueue {
    pub async fn open(path: impl Into<PathBuf>) -> BotResult<Self> {
        let path = path.into();
        let content = FsOps::read_optional(&path)
            .await
            .map_err(|e| BotError::persistence("job queue", &path, e))?;

        let jobs = match content {
            Some(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
                warn!("Starting a fresh queue, {} is malformed: {}", path.display(), e);
                Vec::new()
            }),
            None => Vec::new(),
        };
        Ok(Self { path, jobs })
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn jobs(&self) -> &[JobCandidate] {
        &self.jobs
    }

    /// Add a job unless its id is already queued. Returns whether it was added.
    pub async fn enqueue(&mut self, job: &JobCandidate) -> BotResult<bool> {
        if self.jobs.iter().any(|queued| queued.id == job.id) {
            return Ok(false);
        }
        self.jobs.push(job.clone());

        let body = serde_json::to_string_pretty(&self.jobs)
            .map_err(|e| BotError::persistence("job queue", &self.path, e.into()))?;
        FsOps::write_replace(&self.path, &body)
            .await
            .map_err(|e| BotError::persistence("job queue", &self.path, e))?;
        Ok(true)
    }
}
