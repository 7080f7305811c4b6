// src/context.rs
use crate::autofill::FillDefaults;
use crate::browser::Browser;
use crate::config::BotConfig;
use crate::console::Console;
use crate::distance::DistanceResolver;
use crate::error::BotResult;
use crate::job_queue::JobQueue;
use crate::notify::Notifier;
use crate::pacing::Pacer;
use crate::run_log::RunLog;
use crate::session::SessionStore;
use std::sync::Arc;

/// Everything one run needs, built once at startup and dropped at exit.
pub struct RunContext {
    pub config: BotConfig,
    pub browser: Arc<dyn Browser>,
    pub console: Box<dyn Console>,
    pub notifier: Box<dyn Notifier>,
    pub distance: Box<dyn DistanceResolver>,
    pub session: SessionStore,
    pub run_log: RunLog,
    pub job_queue: Option<JobQueue>,
    pub pacer: Pacer,
}

impl RunContext {
    /// Open the persistent stores named by `config` and wire the collaborators.
    pub async fn build(
        config: BotConfig,
        browser: Arc<dyn Browser>,
        console: Box<dyn Console>,
        notifier: Box<dyn Notifier>,
        distance: Box<dyn DistanceResolver>,
        queue_only: bool,
    ) -> BotResult<Self> {
        let session = SessionStore::open(&config.cookies_path, &config.applied_jobs_path).await?;
        let run_log = RunLog::open(&config.log_path);
        let job_queue = if queue_only {
            Some(JobQueue::open(&config.job_queue_path).await?)
        } else {
            None
        };
        let pacer = Pacer::from_millis(config.delay_min_ms, config.delay_max_ms);

        Ok(Self {
            config,
            browser,
            console,
            notifier,
            distance,
            session,
            run_log,
            job_queue,
            pacer,
        })
    }

    pub fn fill_defaults(&self) -> FillDefaults {
        FillDefaults {
            phone: self.config.placeholder_phone.clone(),
            text: self.config.placeholder_text.clone(),
        }
    }
}
