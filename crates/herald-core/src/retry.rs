//! Rate-limit backoff policy.

use std::time::Duration;

/// Delay strategy between rate-limited attempts.
///
/// The wrapped APIs signal rate limiting with HTTP 429; the default reaction
/// is a fixed pause, matching their documented guidance. An exponential
/// variant is available for callers that prefer ramping pauses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// Same delay before every reattempt.
    Fixed { delay: Duration },
    /// `base * (factor ^ attempt)`, capped at `max`, with optional +/- 50%
    /// random jitter.
    Exponential {
        base: Duration,
        factor: f64,
        max: Duration,
        jitter: bool,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Fixed {
            delay: Duration::from_secs(1),
        }
    }
}

impl Backoff {
    /// Delay before reattempt number `attempt` (0-based).
    pub fn delay(self, attempt: u32) -> Duration {
        match self {
            Self::Fixed { delay } => delay,
            Self::Exponential {
                base,
                factor,
                max,
                jitter,
            } => {
                let scale = factor.powi(attempt as i32);
                let seconds = (base.as_secs_f64() * scale).min(max.as_secs_f64());
                let mut delay = Duration::from_secs_f64(seconds);

                if jitter {
                    let jitter_ms = (delay.as_millis() as f64 * 0.5) as u64;
                    let offset = fastrand::u64(0..=(jitter_ms * 2));
                    let total_ms = delay.as_millis() as i64 + (offset as i64 - jitter_ms as i64);
                    delay = Duration::from_millis(total_ms.max(0) as u64);
                }

                delay
            }
        }
    }
}

/// Bound on the 429 retry loop.
///
/// Total attempts for one logical call never exceed `max_retry_rounds + 1`;
/// exhausting the bound surfaces as [`crate::Error::MaxRetriesReached`]
/// instead of a silent hang.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_retry_rounds: u32,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retry_rounds: 10,
            backoff: Backoff::default(),
        }
    }
}

impl RetryPolicy {
    /// Fixed pause between reattempts.
    pub fn fixed(delay: Duration, max_retry_rounds: u32) -> Self {
        Self {
            max_retry_rounds,
            backoff: Backoff::Fixed { delay },
        }
    }

    /// Single attempt, no reattempt on 429.
    pub fn none() -> Self {
        Self {
            max_retry_rounds: 0,
            ..Self::default()
        }
    }
}
