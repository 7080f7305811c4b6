// src/browser/mod.rs
//! Browser automation boundary.
//!
//! The engine only talks to these traits. `ChromeBrowser` drives a real
//! Chromium over CDP; tests use an in-memory fake.

use crate::autofill::{FillAction, FormControl};
use crate::error::PageFault;
use crate::session::StoredCookie;
use async_trait::async_trait;
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

pub mod chrome;

pub use chrome::ChromeBrowser;

pub const POLL_INTERVAL: Duration = Duration::from_millis(250);

#[async_trait]
pub trait Browser: Send + Sync {
    /// Open a fresh tab. Each job application gets its own.
    async fn new_page(&self) -> Result<Box<dyn JobPage>, PageFault>;
}

#[async_trait]
pub trait JobPage: Send + Sync {
    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), PageFault>;

    async fn reload(&self, timeout: Duration) -> Result<(), PageFault>;

    /// Current document as HTML.
    async fn html(&self) -> Result<String, PageFault>;

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<(), PageFault>;

    /// Type into the first element matching `selector` and press Enter.
    async fn submit_text(&self, selector: &str, text: &str) -> Result<(), PageFault>;

    /// Click the first button whose text contains any of `labels`.
    async fn click_button(&self, labels: &[&str], timeout: Duration) -> Result<(), PageFault>;

    /// Attach a file to the first file input. `Ok(false)` when there is none.
    async fn upload_file(&self, path: &Path) -> Result<bool, PageFault>;

    async fn form_controls(&self) -> Result<Vec<FormControl>, PageFault>;

    async fn apply(&self, action: &FillAction) -> Result<(), PageFault>;

    async fn wait_for_navigation(&self, timeout: Duration) -> Result<(), PageFault>;

    async fn scroll_by(&self, dy: i64) -> Result<(), PageFault>;

    async fn cookies(&self) -> Result<Vec<StoredCookie>, PageFault>;

    async fn set_cookies(&self, cookies: &[StoredCookie]) -> Result<(), PageFault>;

    async fn close(&self) -> Result<(), PageFault>;
}

/// Re-run `check` every `interval` until it reports `true` or `timeout` runs
/// out. A failed check counts as "not yet", since pages fault while they
/// navigate.
pub async fn poll_until<F, Fut>(
    what: &str,
    timeout: Duration,
    interval: Duration,
    mut check: F,
) -> Result<(), PageFault>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, PageFault>>,
{
    let deadline = Instant::now() + timeout;
    loop {
        match check().await {
            Ok(true) => return Ok(()),
            Ok(false) => {}
            Err(e) => debug!("Still waiting for {}: {}", what, e),
        }
        if Instant::now() >= deadline {
            return Err(PageFault::timeout(what, timeout));
        }
        tokio::time::sleep(interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_poll_survives_faults_until_found() {
        let calls = AtomicUsize::new(0);
        let result = poll_until("button", Duration::from_secs(2), Duration::from_millis(5), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                match n {
                    0 => Err(PageFault::command("execution context was destroyed")),
                    1 => Ok(false),
                    _ => Ok(true),
                }
            }
        })
        .await;

        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_poll_times_out_on_persistent_fault() {
        let result = poll_until("submit button", Duration::from_millis(30), Duration::from_millis(5), || async {
            Err(PageFault::command("no document"))
        })
        .await;

        assert!(matches!(result, Err(PageFault::Timeout { ref what, .. }) if what == "submit button"));
    }
}
