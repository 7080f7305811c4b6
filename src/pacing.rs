// src/pacing.rs
use rand::Rng;
use std::time::Duration;
use tracing::trace;

/// Random pauses between interactive actions so the session reads as human.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacer {
    min: Duration,
    max: Duration,
}

impl Pacer {
    /// `min` and `max` are swapped if given in the wrong order.
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    pub fn from_millis(min_ms: u64, max_ms: u64) -> Self {
        Self::new(Duration::from_millis(min_ms), Duration::from_millis(max_ms))
    }

    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    pub fn next_delay(&self) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        let millis = rand::thread_rng().gen_range(self.min.as_millis()..=self.max.as_millis());
        Duration::from_millis(millis as u64)
    }

    pub async fn pause(&self) {
        let delay = self.next_delay();
        if delay.is_zero() {
            return;
        }
        trace!("Pausing for {}ms", delay.as_millis());
        tokio::time::sleep(delay).await;
    }

    /// Random vertical scroll offset for the "glance at the page" gesture.
    pub fn scroll_offset(&self) -> i64 {
        if self.max.is_zero() {
            return 0;
        }
        rand::thread_rng().gen_range(0..=300)
    }
}
