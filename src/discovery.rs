// src/discovery.rs
//! The outer loop: sign in once, search each configured location, and hand
//! every new quick-apply posting to the application machine until the quota
//! is reached.

use crate::application::{self, ApplicationStatus};
use crate::browser::{poll_until, JobPage, POLL_INTERVAL};
use crate::context::RunContext;
use crate::error::{BotError, BotResult, PageFault};
use crate::extract::{self, JobCandidate};
use crate::run_log::RunLogRecord;
use crate::session::SessionState;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

const WHERE_INPUT: &str = "#text-input-where";
const RESULTS_CONTAINER: &str = "#resultsCol";
const QUEUED_STATUS: &str = "Queued";
/// Reads per location: the first page plus one scrolled re-read.
const RESULT_PASSES: usize = 2;
const RESULTS_SCROLL_STEP: i64 = 2000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub applied: usize,
    pub skipped: usize,
    pub errors: usize,
    pub queued: usize,
}

impl RunSummary {
    fn record(&mut self, status: ApplicationStatus) {
        match status {
            ApplicationStatus::Applied => self.applied += 1,
            ApplicationStatus::Skipped => self.skipped += 1,
            ApplicationStatus::Error => self.errors += 1,
        }
    }
}

/// Run every configured location. Returns only on fatal faults or when done.
pub async fn run(ctx: &mut RunContext) -> BotResult<RunSummary> {
    let page = ctx
        .browser
        .new_page()
        .await
        .map_err(|e| BotError::Browser(format!("could not open discovery page: {}", e)))?;

    let result = run_with_page(ctx, page.as_ref()).await;

    if let Err(e) = page.close().await {
        warn!("Failed to close discovery page: {}", e);
    }
    result
}

async fn run_with_page(ctx: &mut RunContext, page: &dyn JobPage) -> BotResult<RunSummary> {
    authenticate(ctx, page).await?;

    let max = ctx.config.max_applications;
    let locations = ctx.config.locations.clone();
    let mut attempted: HashSet<String> = HashSet::new();
    let mut summary = RunSummary::default();

    for city in &locations {
        if summary.applied >= max {
            info!("Reached the maximum of {} applications", max);
            break;
        }

        info!(city = %city, "Searching for jobs in {}", city);
        let mut found = match search_location(ctx, page, city).await {
            Ok(found) => found,
            Err(fault) => {
                warn!(city = %city, "Skipping location {}: {}", city, fault);
                continue;
            }
        };

        let mut pass = 1;
        loop {
            let candidates = select_candidates(
                found,
                ctx.session.seen(),
                &attempted,
                city,
                ctx.config.filter_by_location,
            );
            if candidates.is_empty() && pass > 1 {
                break;
            }
            info!(city = %city, pass, "Found {} new quick-apply jobs", candidates.len());

            process_candidates(ctx, city, candidates, &mut attempted, &mut summary).await?;

            if pass >= RESULT_PASSES || summary.applied >= max {
                break;
            }
            pass += 1;
            found = match read_more_results(ctx, page, city).await {
                Ok(found) => found,
                Err(fault) => {
                    debug!(city = %city, "No further results: {}", fault);
                    break;
                }
            };
        }
    }

    info!(
        "Run finished: {} applied, {} skipped, {} errors, {} queued",
        summary.applied, summary.skipped, summary.errors, summary.queued
    );
    Ok(summary)
}

async fn process_candidates(
    ctx: &mut RunContext,
    city: &str,
    candidates: Vec<JobCandidate>,
    attempted: &mut HashSet<String>,
    summary: &mut RunSummary,
) -> BotResult<()> {
    let max = ctx.config.max_applications;

    for job in candidates {
        if summary.applied >= max {
            break;
        }
        attempted.insert(job.id.clone());

        if let Some(queue) = ctx.job_queue.as_mut() {
            if queue.enqueue(&job).await? {
                summary.queued += 1;
                ctx.run_log
                    .append(&RunLogRecord::now(&job.title, &job.company, city, None, QUEUED_STATUS))?;
                info!(job_id = %job.id, "Queued {} at {}", job.title, job.company);
            }
            continue;
        }

        let outcome = application::attempt(ctx, &job, city).await?;
        summary.record(outcome.status);
        info!(
            status = %outcome.status,
            remaining = max.saturating_sub(summary.applied),
            "{} applications remaining",
            max.saturating_sub(summary.applied)
        );
        ctx.pacer.pause().await;
    }
    Ok(())
}

/// Restore the saved session if the operator wants it, otherwise log in by
/// hand and save the fresh cookies. Returns whether the sign-in link went
/// away within the wait timeout.
pub async fn authenticate(ctx: &RunContext, page: &dyn JobPage) -> BotResult<bool> {
    let site = ctx.config.site_url.as_str();
    let timeout = ctx.config.navigation_timeout();

    let mut restored = false;
    if ctx.session.has_saved_session() && ctx.console.offer_saved_session().await {
        match ctx.session.load().await? {
            Some(state) => restored = restore_session(page, site, timeout, &state).await,
            None => warn!("Saved session is empty or unreadable, logging in manually"),
        }
    }

    if !restored {
        if let Err(e) = page.goto(site, timeout).await {
            warn!("Could not open {} for login: {}", site, e);
        }
        ctx.console.await_manual_login().await;

        match page.cookies().await {
            Ok(cookies) => {
                ctx.session.save(&SessionState::from_cookies(cookies)).await?;
                info!("Saved session to {}", ctx.session.cookies_path().display());
            }
            Err(e) => warn!("Could not read cookies after login: {}", e),
        }
    }

    let signed_in = poll_until(
        "sign-in link to disappear",
        ctx.config.wait_timeout(),
        POLL_INTERVAL,
        || async move { Ok(!extract::has_sign_in_link(&page.html().await?)) },
    )
    .await;

    match signed_in {
        Ok(()) => {
            info!("Session looks authenticated");
            Ok(true)
        }
        Err(e) => {
            warn!("The session may not be authenticated: {}", e);
            Ok(false)
        }
    }
}

async fn restore_session(page: &dyn JobPage, site: &str, timeout: Duration, state: &SessionState) -> bool {
    let installed = async {
        page.goto(site, timeout).await?;
        page.set_cookies(&state.all_cookies()).await?;
        page.reload(timeout).await
    }
    .await;

    match installed {
        Ok(()) => {
            info!("Restored saved session from {}", state.saved_at);
            true
        }
        Err(e) => {
            warn!("Could not restore saved session: {}", e);
            false
        }
    }
}

/// Search one location and read the quick-apply cards off the results page.
pub async fn search_location(
    ctx: &RunContext,
    page: &dyn JobPage,
    city: &str,
) -> Result<Vec<JobCandidate>, PageFault> {
    let site = ctx.config.site_url.as_str();

    page.goto(site, ctx.config.navigation_timeout()).await?;
    page.wait_for_selector(WHERE_INPUT, ctx.config.wait_timeout()).await?;
    ctx.pacer.pause().await;
    page.submit_text(WHERE_INPUT, city).await?;

    if let Err(e) = page
        .wait_for_selector(RESULTS_CONTAINER, ctx.config.wait_timeout())
        .await
    {
        warn!(city, "Results list did not appear: {}", e);
    }
    ctx.pacer.pause().await;

    read_results(ctx, page, city).await
}

/// Scroll the results list so lazily loaded cards render, then read again.
async fn read_more_results(
    ctx: &RunContext,
    page: &dyn JobPage,
    city: &str,
) -> Result<Vec<JobCandidate>, PageFault> {
    page.scroll_by(RESULTS_SCROLL_STEP).await?;
    ctx.pacer.pause().await;
    read_results(ctx, page, city).await
}

async fn read_results(ctx: &RunContext, page: &dyn JobPage, city: &str) -> Result<Vec<JobCandidate>, PageFault> {
    let base = Url::parse(&ctx.config.site_url).map_err(PageFault::command)?;
    let html = page.html().await?;
    if extract::looks_like_captcha(&html) {
        warn!(city, "CAPTCHA detected, skipping location");
        return Ok(Vec::new());
    }
    Ok(extract::parse_search_results(&html, &base))
}

/// Drop jobs already applied to, already attempted this run, or listed
/// outside `city`. Empty location text always passes.
pub fn select_candidates(
    candidates: Vec<JobCandidate>,
    seen: &HashSet<String>,
    attempted: &HashSet<String>,
    city: &str,
    filter_by_location: bool,
) -> Vec<JobCandidate> {
    let city_lower = city.to_lowercase();
    candidates
        .into_iter()
        .filter(|job| {
            if seen.contains(&job.id) {
                debug!(job_id = %job.id, "Already applied");
                return false;
            }
            if attempted.contains(&job.id) {
                debug!(job_id = %job.id, "Already attempted this run");
                return false;
            }
            if filter_by_location
                && !job.location.trim().is_empty()
                && !job.location.to_lowercase().contains(&city_lower)
            {
                info!(job_id = %job.id, "Skipping job outside {}: {}", city, job.location);
                return false;
            }
            true
        })
        .collect()
}
