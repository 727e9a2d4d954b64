//! Per-player submission rate limiting.
//!
//! Fixed-window semantics: a window opens on the first attempt and closes
//! `window` later. Up to `max_attempts` attempts are admitted in a window;
//! further attempts are rejected (and not counted) until the window closes.
//! A burst straddling a window boundary can therefore be admitted up to
//! `2 * max_attempts` times in a short span.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::debug;

use crate::state::{game::PlayerId, quiz::QuizError};

/// Limits applied by the submission gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    /// Attempts admitted per window.
    pub max_attempts: u32,
    /// Window length.
    pub window: Duration,
}

impl Default for RateLimit {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            window: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    opened_at: Instant,
    attempts: u32,
}

/// Admission control in front of answer submissions.
#[derive(Debug)]
pub struct SubmissionGate {
    limit: RateLimit,
    windows: DashMap<PlayerId, Window>,
}

impl SubmissionGate {
    /// Gate enforcing `limit`.
    pub fn new(limit: RateLimit) -> Self {
        Self {
            limit,
            windows: DashMap::new(),
        }
    }

    /// Record an attempt from `player` at `now`, or reject it with
    /// [`QuizError::RateLimited`] carrying the time until the window closes.
    pub fn admit(&self, player: &PlayerId, now: Instant) -> Result<(), QuizError> {
        let mut entry = self.windows.entry(player.clone()).or_insert(Window {
            opened_at: now,
            attempts: 0,
        });
        let window = entry.value_mut();

        let elapsed = now.saturating_duration_since(window.opened_at);
        if elapsed >= self.limit.window {
            *window = Window {
                opened_at: now,
                attempts: 0,
            };
        }

        if window.attempts >= self.limit.max_attempts {
            let retry_after = self
                .limit
                .window
                .saturating_sub(now.saturating_duration_since(window.opened_at));
            debug!(player = %player, ?retry_after, "submission rate limited");
            return Err(QuizError::RateLimited { retry_after });
        }

        window.attempts += 1;
        Ok(())
    }

    /// Forget windows that closed before `now`. Returns how many were dropped.
    pub fn sweep(&self, now: Instant) -> usize {
        let before = self.windows.len();
        let window = self.limit.window;
        self.windows
            .retain(|_, entry| now.saturating_duration_since(entry.opened_at) < window);
        before.saturating_sub(self.windows.len())
    }

    /// Number of players currently tracked.
    pub fn tracked(&self) -> usize {
        self.windows.len()
    }
}
