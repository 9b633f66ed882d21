//! Configuration types.

use std::time::Duration;

use crate::error::ConfigError;

/// Tunables for the subject/participant heuristic matching layer.
///
/// The window and overlap floor are deployment knobs, not fixed constants.
#[derive(Debug, Clone)]
pub struct ThreadingConfig {
    /// Recency window for heuristic matching, in days. Threads with no
    /// activity inside the window are never heuristic candidates.
    pub window_days: u32,
    /// Minimum Jaccard overlap between the payload's participant set and a
    /// candidate thread's participant set.
    pub min_participant_overlap: f32,
}

impl Default for ThreadingConfig {
    fn default() -> Self {
        Self {
            window_days: 30,
            min_participant_overlap: 0.5,
        }
    }
}

/// Retry policy for the ingest worker.
///
/// Failed events are retried on a fixed backoff schedule; after
/// `max_attempts` the event is marked failed and surfaced, never dropped.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Backoff schedule. Attempt N waits `delays[min(N, len - 1)]`.
    pub delays: Vec<Duration>,
    /// Maximum number of processing attempts per event.
    pub max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            delays: vec![
                Duration::from_secs(30),
                Duration::from_secs(300),
                Duration::from_secs(1800),
            ],
            max_attempts: 3,
        }
    }
}

impl RetryConfig {
    /// Delay before the next attempt, given how many attempts have already
    /// been made. The schedule saturates at its last entry.
    pub fn delay_for(&self, attempts_so_far: u32) -> Duration {
        let idx = (attempts_so_far as usize).min(self.delays.len().saturating_sub(1));
        self.delays.get(idx).copied().unwrap_or(Duration::ZERO)
    }
}

/// Top-level service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub threading: ThreadingConfig,
    pub retry: RetryConfig,
    /// How often the ingest worker drains the event queue, in seconds.
    pub ingest_interval_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            threading: ThreadingConfig::default(),
            retry: RetryConfig::default(),
            ingest_interval_secs: 5,
        }
    }
}

impl AppConfig {
    /// Build config from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let window_days: u32 = std::env::var("TAXMAIL_THREAD_WINDOW_DAYS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        let min_participant_overlap: f32 = std::env::var("TAXMAIL_MIN_PARTICIPANT_OVERLAP")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.5);

        let ingest_interval_secs: u64 = std::env::var("TAXMAIL_INGEST_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);

        Self {
            threading: ThreadingConfig {
                window_days,
                min_participant_overlap,
            },
            retry: RetryConfig::default(),
            ingest_interval_secs,
        }
    }

    /// Reject out-of-range tunables before wiring anything up.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.threading.window_days == 0 {
            return Err(ConfigError::InvalidValue {
                key: "TAXMAIL_THREAD_WINDOW_DAYS".into(),
                message: "must be at least 1".into(),
            });
        }
        if !(0.0..=1.0).contains(&self.threading.min_participant_overlap) {
            return Err(ConfigError::InvalidValue {
                key: "TAXMAIL_MIN_PARTICIPANT_OVERLAP".into(),
                message: "must be within [0, 1]".into(),
            });
        }
        Ok(())
    }
}
