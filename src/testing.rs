// src/testing.rs
//! In-memory fakes for the browser, console, notifier and distance seams.

use crate::autofill::{ControlId, FillAction, FormControl};
use crate::browser::{Browser, JobPage};
use crate::config::BotConfig;
use crate::console::Console;
use crate::context::RunContext;
use crate::distance::DistanceResolver;
use crate::error::PageFault;
use crate::extract::JobCandidate;
use crate::notify::{NotifyError, Notifier};
use crate::session::StoredCookie;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const BLANK_PAGE: &str = "<html><head></head><body></body></html>";

#[derive(Default)]
struct FakeBrowserState {
    pages: HashMap<String, String>,
    results: HashMap<String, String>,
    more_results: HashMap<String, String>,
    forms: HashMap<String, Vec<FormControl>>,
    hidden_buttons: HashSet<String>,
    missing_selectors: HashSet<String>,
    failing_controls: HashSet<ControlId>,
    failing_navigation: HashSet<String>,
    no_transitions: bool,
    no_file_input: bool,
    jar: Vec<StoredCookie>,
    installed_cookies: Vec<StoredCookie>,
    visited: Vec<String>,
    searches: Vec<String>,
    clicked: Vec<String>,
    applied: Vec<FillAction>,
    uploads: Vec<PathBuf>,
    open_pages: usize,
}

/// Scriptable browser. Clones share state.
#[derive(Clone)]
pub struct FakeBrowser {
    inner: Arc<Mutex<FakeBrowserState>>,
}

impl Default for FakeBrowser {
    fn default() -> Self {
        let state = FakeBrowserState {
            jar: vec![StoredCookie {
                name: "CTK".to_string(),
                value: "logged-in".to_string(),
                domain: ".indeed.com".to_string(),
                path: "/".to_string(),
                expires: None,
                http_only: true,
                secure: true,
            }],
            ..FakeBrowserState::default()
        };
        Self {
            inner: Arc::new(Mutex::new(state)),
        }
    }
}

impl FakeBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// HTML served for a job detail (or any other) URL.
    pub fn set_detail(&self, url: &str, html: &str) {
        self.inner.lock().pages.insert(url.to_string(), html.to_string());
    }

    /// Results page shown after searching for `city`.
    pub fn set_results(&self, city: &str, html: &str) {
        self.inner.lock().results.insert(city.to_string(), html.to_string());
    }

    /// Results page shown once the results for `city` are scrolled.
    pub fn set_more_results(&self, city: &str, html: &str) {
        self.inner.lock().more_results.insert(city.to_string(), html.to_string());
    }

    pub fn set_form(&self, url: &str, controls: Vec<FormControl>) {
        self.inner.lock().forms.insert(url.to_string(), controls);
    }

    pub fn hide_button(&self, label: &str) {
        self.inner.lock().hidden_buttons.insert(label.to_string());
    }

    pub fn hide_selector(&self, selector: &str) {
        self.inner.lock().missing_selectors.insert(selector.to_string());
    }

    pub fn fail_control(&self, control: ControlId) {
        self.inner.lock().failing_controls.insert(control);
    }

    pub fn fail_navigation(&self, url: &str) {
        self.inner.lock().failing_navigation.insert(url.to_string());
    }

    pub fn suppress_transitions(&self) {
        self.inner.lock().no_transitions = true;
    }

    pub fn remove_file_input(&self) {
        self.inner.lock().no_file_input = true;
    }

    pub fn visited(&self) -> Vec<String> {
        self.inner.lock().visited.clone()
    }

    pub fn searches(&self) -> Vec<String> {
        self.inner.lock().searches.clone()
    }

    pub fn clicked_buttons(&self) -> Vec<String> {
        self.inner.lock().clicked.clone()
    }

    /// Fill actions that succeeded.
    pub fn applied_actions(&self) -> Vec<FillAction> {
        self.inner.lock().applied.clone()
    }

    pub fn uploads(&self) -> Vec<PathBuf> {
        self.inner.lock().uploads.clone()
    }

    pub fn installed_cookies(&self) -> Vec<StoredCookie> {
        self.inner.lock().installed_cookies.clone()
    }

    pub fn open_pages(&self) -> usize {
        self.inner.lock().open_pages
    }
}

#[async_trait]
impl Browser for FakeBrowser {
    async fn new_page(&self) -> Result<Box<dyn JobPage>, PageFault> {
        self.inner.lock().open_pages += 1;
        Ok(Box::new(FakePage {
            inner: Arc::clone(&self.inner),
            url: Mutex::new(String::new()),
            overlay: Mutex::new(None),
            searched: Mutex::new(None),
        }))
    }
}

struct FakePage {
    inner: Arc<Mutex<FakeBrowserState>>,
    url: Mutex<String>,
    /// Document replacing the URL's page after a search submit.
    overlay: Mutex<Option<String>>,
    searched: Mutex<Option<String>>,
}

#[async_trait]
impl JobPage for FakePage {
    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), PageFault> {
        let mut state = self.inner.lock();
        state.visited.push(url.to_string());
        if state.failing_navigation.contains(url) {
            return Err(PageFault::timeout(format!("navigation to {}", url), timeout));
        }
        *self.url.lock() = url.to_string();
        *self.overlay.lock() = None;
        *self.searched.lock() = None;
        Ok(())
    }

    async fn reload(&self, _timeout: Duration) -> Result<(), PageFault> {
        *self.overlay.lock() = None;
        Ok(())
    }

    async fn html(&self) -> Result<String, PageFault> {
        if let Some(html) = self.overlay.lock().clone() {
            return Ok(html);
        }
        let url = self.url.lock().clone();
        Ok(self
            .inner
            .lock()
            .pages
            .get(&url)
            .cloned()
            .unwrap_or_else(|| BLANK_PAGE.to_string()))
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<(), PageFault> {
        if self.inner.lock().missing_selectors.contains(selector) {
            return Err(PageFault::timeout(selector, timeout));
        }
        Ok(())
    }

    async fn submit_text(&self, selector: &str, text: &str) -> Result<(), PageFault> {
        let mut state = self.inner.lock();
        if state.missing_selectors.contains(selector) {
            return Err(PageFault::MissingElement(selector.to_string()));
        }
        state.searches.push(text.to_string());
        let results = state
            .results
            .get(text)
            .cloned()
            .unwrap_or_else(|| BLANK_PAGE.to_string());
        *self.overlay.lock() = Some(results);
        *self.searched.lock() = Some(text.to_string());
        Ok(())
    }

    async fn click_button(&self, labels: &[&str], timeout: Duration) -> Result<(), PageFault> {
        let mut state = self.inner.lock();
        let Some(label) = labels
            .iter()
            .find(|label| !state.hidden_buttons.contains(**label))
        else {
            return Err(PageFault::timeout(format!("button {:?}", labels), timeout));
        };
        let label = label.to_string();
        state.clicked.push(label);
        Ok(())
    }

    async fn upload_file(&self, path: &Path) -> Result<bool, PageFault> {
        let mut state = self.inner.lock();
        if state.no_file_input {
            return Ok(false);
        }
        state.uploads.push(path.to_path_buf());
        Ok(true)
    }

    async fn form_controls(&self) -> Result<Vec<FormControl>, PageFault> {
        let url = self.url.lock().clone();
        Ok(self.inner.lock().forms.get(&url).cloned().unwrap_or_default())
    }

    async fn apply(&self, action: &FillAction) -> Result<(), PageFault> {
        let mut state = self.inner.lock();
        if state.failing_controls.contains(&action.control()) {
            return Err(PageFault::MissingElement(format!("control {}", action.control().0)));
        }
        state.applied.push(action.clone());
        Ok(())
    }

    async fn wait_for_navigation(&self, timeout: Duration) -> Result<(), PageFault> {
        if self.inner.lock().no_transitions {
            return Err(PageFault::timeout("navigation", timeout));
        }
        Ok(())
    }

    async fn scroll_by(&self, _dy: i64) -> Result<(), PageFault> {
        let Some(city) = self.searched.lock().clone() else {
            return Ok(());
        };
        if let Some(more) = self.inner.lock().more_results.get(&city).cloned() {
            *self.overlay.lock() = Some(more);
        }
        Ok(())
    }

    async fn cookies(&self) -> Result<Vec<StoredCookie>, PageFault> {
        Ok(self.inner.lock().jar.clone())
    }

    async fn set_cookies(&self, cookies: &[StoredCookie]) -> Result<(), PageFault> {
        self.inner.lock().installed_cookies.extend_from_slice(cookies);
        Ok(())
    }

    async fn close(&self) -> Result<(), PageFault> {
        let mut state = self.inner.lock();
        state.open_pages = state.open_pages.saturating_sub(1);
        Ok(())
    }
}

#[derive(Default)]
struct FakeConsoleState {
    offers: usize,
    logins: usize,
}

/// Console that answers the saved-session offer with a fixed choice.
#[derive(Clone, Default)]
pub struct FakeConsole {
    reuse_saved: bool,
    inner: Arc<Mutex<FakeConsoleState>>,
}

impl FakeConsole {
    pub fn reusing_saved_session() -> Self {
        Self {
            reuse_saved: true,
            ..Self::default()
        }
    }

    pub fn offers(&self) -> usize {
        self.inner.lock().offers
    }

    pub fn logins(&self) -> usize {
        self.inner.lock().logins
    }
}

#[async_trait]
impl Console for FakeConsole {
    async fn offer_saved_session(&self) -> bool {
        self.inner.lock().offers += 1;
        self.reuse_saved
    }

    async fn await_manual_login(&self) {
        self.inner.lock().logins += 1;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyCall {
    pub title: String,
    pub message: String,
}

#[derive(Clone, Default)]
pub struct FakeNotifier {
    calls: Arc<Mutex<Vec<NotifyCall>>>,
}

impl FakeNotifier {
    pub fn calls(&self) -> Vec<NotifyCall> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Notifier for FakeNotifier {
    async fn notify(&self, title: &str, message: &str) -> Result<(), NotifyError> {
        self.calls.lock().push(NotifyCall {
            title: title.to_string(),
            message: message.to_string(),
        });
        Ok(())
    }
}

/// Returns a fixed distance and records each lookup.
#[derive(Clone, Default)]
pub struct FakeDistance {
    miles: Option<f64>,
    queries: Arc<Mutex<Vec<(String, String)>>>,
}

#[async_trait]
impl DistanceResolver for FakeDistance {
    async fn resolve(&self, origin: &str, destination: &str) -> Option<f64> {
        self.queries
            .lock()
            .push((origin.to_string(), destination.to_string()));
        self.miles
    }
}

/// Temp directory, fakes, and a config pointing into the directory.
pub struct TestHarness {
    pub dir: TempDir,
    pub browser: FakeBrowser,
    pub console: FakeConsole,
    pub notifier: FakeNotifier,
    pub distance: FakeDistance,
}

impl TestHarness {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        std::fs::write(dir.path().join("resume.pdf"), b"%PDF-1.4").expect("write resume");
        Self {
            dir,
            browser: FakeBrowser::new(),
            console: FakeConsole::default(),
            notifier: FakeNotifier::default(),
            distance: FakeDistance::default(),
        }
    }

    pub fn with_distance(mut self, miles: Option<f64>) -> Self {
        self.distance.miles = miles;
        self
    }

    pub fn with_console(mut self, console: FakeConsole) -> Self {
        self.console = console;
        self
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn config(&self) -> BotConfig {
        let config: BotConfig = serde_json::from_value(serde_json::json!({
            "locations": ["Austin"],
            "max_applications": 50,
            "minSalary": 15,
            "resumePath": self.path("resume.pdf"),
            "logPath": self.path("applied_jobs_log.csv"),
            "cookiesPath": self.path("cookies.json"),
            "appliedJobsPath": self.path("applied_jobs.txt"),
            "jobQueuePath": self.path("job_queue.json"),
            "delayMinMs": 0,
            "delayMaxMs": 0,
            "waitTimeoutSecs": 1,
            "navigationTimeoutSecs": 1,
        }))
        .expect("test config");
        config.validate().expect("valid test config");
        config
    }

    pub async fn context(&self) -> RunContext {
        self.context_with(|_| {}).await
    }

    pub async fn context_with(&self, edit: impl FnOnce(&mut BotConfig)) -> RunContext {
        self.build(edit, false).await
    }

    pub async fn queue_only_context(&self) -> RunContext {
        self.build(|_| {}, true).await
    }

    async fn build(&self, edit: impl FnOnce(&mut BotConfig), queue_only: bool) -> RunContext {
        let mut config = self.config();
        edit(&mut config);
        RunContext::build(
            config,
            Arc::new(self.browser.clone()),
            Box::new(self.console.clone()),
            Box::new(self.notifier.clone()),
            Box::new(self.distance.clone()),
            queue_only,
        )
        .await
        .expect("run context")
    }

    pub fn notifications(&self) -> Vec<NotifyCall> {
        self.notifier.calls()
    }

    pub fn distance_queries(&self) -> Vec<(String, String)> {
        self.distance.queries.lock().clone()
    }
}

pub fn job(id: &str, location: &str) -> JobCandidate {
    JobCandidate {
        id: id.to_string(),
        link: format!("https://www.indeed.com/viewjob?jk={}", id),
        title: "Warehouse Associate".to_string(),
        company: "Acme".to_string(),
        location: location.to_string(),
    }
}

/// Search results page listing `jobs` as quick-apply cards.
pub fn results_html(jobs: &[&JobCandidate]) -> String {
    let cards: String = jobs
        .iter()
        .map(|job| {
            format!(
                r#"<li><div class="job_seen_beacon">
                     <a data-jk="{}" href="{}"><span class="jobTitle">{}</span></a>
                     <span class="companyName">{}</span>
                     <div class="companyLocation">{}</div>
                     <span class="iaLabel">Easily apply</span>
                   </div></li>"#,
                job.id, job.link, job.title, job.company, job.location
            )
        })
        .collect();
    format!(
        r#"<html><body><div id="resultsCol"><ul>{}</ul></div></body></html>"#,
        cards
    )
}

pub fn detail_html(salary: &str, job_type: &str) -> String {
    format!(
        r#"<html><body>
             <div class="jobsearch-JobInfoHeader-subtitle"><div>Austin, TX 78701</div></div>
             <span class="salary-snippet">{}</span>
             <div><b>Job Type</b><span>{}</span></div>
           </body></html>"#,
        salary, job_type
    )
}

pub fn qualifying_detail_html() -> String {
    detail_html("$18 - $20 an hour", "Full-time")
}
