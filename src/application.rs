// src/application.rs
//! One job application, from opening the posting to a terminal outcome.

use crate::autofill::{self, FillDefaults};
use crate::browser::JobPage;
use crate::config::BotConfig;
use crate::context::RunContext;
use crate::distance::DistanceResolver;
use crate::eligibility;
use crate::error::{BotResult, PageFault};
use crate::extract::{self, JobCandidate};
use crate::notify;
use crate::pacing::Pacer;
use crate::run_log::RunLogRecord;
use std::fmt;
use tracing::{debug, info, warn};

const APPLY_LABELS: [&str; 2] = ["Apply", "Submit"];
const SUBMIT_LABELS: [&str; 1] = ["Submit"];
const NOTIFICATION_TITLE: &str = "Application Sent";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicationState {
    Opened,
    Validating,
    Filling,
    Submitting,
    Applied,
    Skipped,
    Error,
}

impl ApplicationState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Applied | Self::Skipped | Self::Error)
    }

    fn stage(self) -> &'static str {
        match self {
            Self::Opened => "opening posting",
            Self::Validating => "reading posting",
            Self::Filling => "opening application form",
            Self::Submitting => "submitting application",
            Self::Applied | Self::Skipped | Self::Error => "finishing",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicationStatus {
    Skipped,
    Applied,
    Error,
}

impl ApplicationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Skipped => "Skipped",
            Self::Applied => "Applied",
            Self::Error => "Error",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApplicationOutcome {
    pub status: ApplicationStatus,
    pub distance: Option<f64>,
    pub reason: String,
}

impl ApplicationOutcome {
    pub fn error(reason: impl Into<String>) -> Self {
        Self {
            status: ApplicationStatus::Error,
            distance: None,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Default)]
struct Progress {
    distance: Option<f64>,
    reason: Option<String>,
}

pub struct ApplicationMachine<'a> {
    config: &'a BotConfig,
    distance: &'a dyn DistanceResolver,
    pacer: Pacer,
    fill_defaults: FillDefaults,
}

impl<'a> ApplicationMachine<'a> {
    pub fn new(ctx: &'a RunContext) -> Self {
        Self {
            config: &ctx.config,
            distance: ctx.distance.as_ref(),
            pacer: ctx.pacer,
            fill_defaults: ctx.fill_defaults(),
        }
    }

    /// Run the state machine to a terminal state. Never fails; faults become `Error`.
    pub async fn drive(&self, page: &dyn JobPage, job: &JobCandidate) -> ApplicationOutcome {
        info!(job_id = %job.id, "Evaluating: {} at {}", job.title, job.company);

        let mut state = ApplicationState::Opened;
        let mut progress = Progress::default();

        while !state.is_terminal() {
            let next = match state {
                ApplicationState::Opened => self.open(page, job).await,
                ApplicationState::Validating => self.validate(page, job, &mut progress).await,
                ApplicationState::Filling => self.fill(page).await,
                ApplicationState::Submitting => self.submit(page).await,
                ApplicationState::Applied | ApplicationState::Skipped | ApplicationState::Error => break,
            };

            state = match next {
                Ok(next) => next,
                Err(fault) => {
                    progress.reason = Some(format!("{} failed: {}", state.stage(), fault));
                    ApplicationState::Error
                }
            };
            debug!(job_id = %job.id, ?state, "Application state changed");
        }

        let status = match state {
            ApplicationState::Applied => ApplicationStatus::Applied,
            ApplicationState::Skipped => ApplicationStatus::Skipped,
            _ => ApplicationStatus::Error,
        };
        let reason = progress.reason.unwrap_or_else(|| match status {
            ApplicationStatus::Applied => "application submitted".to_string(),
            _ => "unknown".to_string(),
        });

        ApplicationOutcome {
            status,
            distance: progress.distance,
            reason,
        }
    }

    async fn open(&self, page: &dyn JobPage, job: &JobCandidate) -> Result<ApplicationState, PageFault> {
        page.goto(&job.link, self.config.navigation_timeout()).await?;
        self.pacer.pause().await;
        if let Err(e) = page.scroll_by(self.pacer.scroll_offset()).await {
            debug!("Scroll gesture failed: {}", e);
        }
        Ok(ApplicationState::Validating)
    }

    async fn validate(
        &self,
        page: &dyn JobPage,
        job: &JobCandidate,
        progress: &mut Progress,
    ) -> Result<ApplicationState, PageFault> {
        let html = page.html().await?;
        let details = extract::parse_job_details(&html);
        let decision = eligibility::evaluate(
            details.salary_text.as_deref(),
            details.job_type_text.as_deref(),
            self.config.min_salary,
        );

        if let Some(reason) = decision.rejection_reason() {
            progress.reason = Some(reason);
            return Ok(ApplicationState::Skipped);
        }

        if let Some(origin) = self.config.user_address.as_deref() {
            let destination = details.location.as_deref().unwrap_or(&job.location);
            progress.distance = self.distance.resolve(origin, destination).await;
            if let Some(miles) = progress.distance {
                info!("Distance to job: {} mi", miles);
            }
        }

        info!(
            "Criteria met (salary {:?}, {}), applying now",
            decision.min_salary, decision.job_type
        );
        Ok(ApplicationState::Filling)
    }

    async fn fill(&self, page: &dyn JobPage) -> Result<ApplicationState, PageFault> {
        page.click_button(&APPLY_LABELS, self.config.wait_timeout()).await?;
        self.pacer.pause().await;

        match page.upload_file(&self.config.resume_path).await {
            Ok(true) => {
                info!("Uploaded resume {}", self.config.resume_path.display());
                self.pacer.pause().await;
            }
            Ok(false) => debug!("No file upload control on form"),
            Err(e) => warn!("Resume upload failed: {}", e),
        }

        autofill::autofill(page, &self.pacer, &self.fill_defaults).await;
        Ok(ApplicationState::Submitting)
    }

    async fn submit(&self, page: &dyn JobPage) -> Result<ApplicationState, PageFault> {
        self.pacer.pause().await;
        page.click_button(&SUBMIT_LABELS, self.config.wait_timeout()).await?;

        // Confirmation of the transition is advisory only.
        if let Err(e) = page.wait_for_navigation(self.config.navigation_timeout()).await {
            debug!("No page transition after submit: {}", e);
        }
        Ok(ApplicationState::Applied)
    }
}

/// Apply to one job on its own page and record the outcome.
///
/// Only persistence faults come back as `Err`; everything else is folded into
/// the returned outcome.
pub async fn attempt(ctx: &mut RunContext, job: &JobCandidate, city: &str) -> BotResult<ApplicationOutcome> {
    let outcome = match ctx.browser.new_page().await {
        Ok(page) => {
            let outcome = ApplicationMachine::new(ctx).drive(page.as_ref(), job).await;
            if let Err(e) = page.close().await {
                warn!(job_id = %job.id, "Failed to close application page: {}", e);
            }
            outcome
        }
        Err(e) => ApplicationOutcome::error(format!("could not open a page: {}", e)),
    };

    match outcome.status {
        ApplicationStatus::Applied => {
            info!(job_id = %job.id, "Application sent: {} at {}", job.title, job.company)
        }
        ApplicationStatus::Skipped => info!(job_id = %job.id, "Skipping job - {}", outcome.reason),
        ApplicationStatus::Error => warn!(job_id = %job.id, "Application failed - {}", outcome.reason),
    }

    // The seen-set entry must be durable before anything else is recorded.
    if outcome.status == ApplicationStatus::Applied {
        ctx.session.record_applied(&job.id).await?;
    }

    ctx.run_log.append(&RunLogRecord::now(
        &job.title,
        &job.company,
        city,
        outcome.distance,
        outcome.status.as_str(),
    ))?;

    if outcome.status == ApplicationStatus::Applied {
        let message = notify::application_message(&job.title, &job.company, outcome.distance);
        if let Err(e) = ctx.notifier.notify(NOTIFICATION_TITLE, &message).await {
            warn!("Notification failed: {}", e);
        }
    }

    Ok(outcome)
}
