// src/lib.rs
pub mod application;
pub mod autofill;
pub mod browser;
pub mod cli;
pub mod config;
pub mod console;
pub mod context;
pub mod core;
pub mod discovery;
pub mod distance;
pub mod eligibility;
pub mod error;
pub mod extract;
pub mod job_queue;
pub mod notify;
pub mod pacing;
pub mod run_log;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use application::{ApplicationOutcome, ApplicationStatus};
pub use config::BotConfig;
pub use context::RunContext;
pub use discovery::RunSummary;
pub use error::{BotError, BotResult, PageFault};
