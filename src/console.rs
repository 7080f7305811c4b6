// src/console.rs
use async_trait::async_trait;
use dialoguer::Input;
use tracing::warn;

/// Blocking operator prompts. Used once to offer the saved session and once
/// to wait for a manual login.
#[async_trait]
pub trait Console: Send + Sync {
    /// `true` when the operator wants to reuse the saved session.
    async fn offer_saved_session(&self) -> bool;

    async fn await_manual_login(&self);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TerminalConsole;

impl TerminalConsole {
    async fn ask(prompt: &'static str) -> Option<String> {
        let answer = tokio::task::spawn_blocking(move || {
            Input::<String>::new()
                .with_prompt(prompt)
                .allow_empty(true)
                .interact_text()
        })
        .await;

        match answer {
            Ok(Ok(text)) => Some(text),
            Ok(Err(e)) => {
                warn!("Console prompt failed: {}", e);
                None
            }
            Err(e) => {
                warn!("Console prompt task failed: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl Console for TerminalConsole {
    async fn offer_saved_session(&self) -> bool {
        Self::ask("Press Enter to load saved cookies, or type 'login' to sign in manually")
            .await
            .is_some_and(|answer| answer.trim().is_empty())
    }

    async fn await_manual_login(&self) {
        let _ = Self::ask("Log in using the opened browser window, then press Enter").await;
    }
}
