// src/notify.rs
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("send failed: {0}")]
    SendFailed(String),
}

/// Where "application sent" messages go.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, title: &str, message: &str) -> Result<(), NotifyError>;
}

/// Desktop toast through notify-rust.
#[derive(Clone, Copy, Debug, Default)]
pub struct DesktopNotifier;

#[async_trait]
impl Notifier for DesktopNotifier {
    async fn notify(&self, title: &str, message: &str) -> Result<(), NotifyError> {
        let title = title.to_string();
        let message = message.to_string();
        // show() blocks on some platforms.
        tokio::task::spawn_blocking(move || {
            notify_rust::Notification::new()
                .summary(&title)
                .body(&message)
                .timeout(notify_rust::Timeout::Milliseconds(5000))
                .show()
                .map(|_| ())
                .map_err(|e| NotifyError::SendFailed(e.to_string()))
        })
        .await
        .map_err(|e| NotifyError::SendFailed(e.to_string()))?
    }
}

/// Notification body for a submitted application.
pub fn application_message(title: &str, company: &str, distance: Option<f64>) -> String {
    match distance {
        Some(miles) => format!("{} at {} - {} mi away", title, company, miles),
        None => format!("{} at {}", title, company),
    }
}
