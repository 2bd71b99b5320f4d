//! Request pacing and cooperative cancellation for remote lookups

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Interval, MissedTickBehavior, interval};

/// Shared gate enforcing an aggregate requests-per-second ceiling.
///
/// Tokens are spaced `1 / rps` apart; the first one is available immediately.
/// All clones share the same schedule.
#[derive(Clone)]
pub struct RateLimiter {
    ticker: Option<Arc<Mutex<Interval>>>,
    spacing: Option<Duration>,
}

/// Upper bound on token spacing; slower rates are clamped to one token a day.
pub const MAX_SPACING: Duration = Duration::from_secs(86_400);

impl RateLimiter {
    /// `requests_per_second <= 0` (or non-finite) disables pacing.
    /// Must be called from within a tokio runtime.
    pub fn per_second(requests_per_second: f64) -> Self {
        if !(requests_per_second.is_finite() && requests_per_second > 0.0) {
            return Self::unlimited();
        }
        let spacing = match Duration::try_from_secs_f64(1.0 / requests_per_second) {
            Ok(spacing) if spacing <= MAX_SPACING => spacing.max(Duration::from_nanos(1)),
            _ => {
                tracing::warn!(
                    "Rate of {} requests/s is below one a day, clamping to {:?} spacing",
                    requests_per_second,
                    MAX_SPACING
                );
                MAX_SPACING
            }
        };
        let mut ticker = interval(spacing);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            ticker: Some(Arc::new(Mutex::new(ticker))),
            spacing: Some(spacing),
        }
    }

    pub fn unlimited() -> Self {
        Self {
            ticker: None,
            spacing: None,
        }
    }

    pub fn is_limited(&self) -> bool {
        self.ticker.is_some()
    }

    /// Time between consecutive tokens, `None` when unlimited.
    pub fn spacing(&self) -> Option<Duration> {
        self.spacing
    }

    /// Wait for the next request slot.
    pub async fn acquire(&self) {
        if let Some(ticker) = &self.ticker {
            ticker.lock().await.tick().await;
        }
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("limited", &self.is_limited())
            .finish()
    }
}

/// Cooperative stop flag. Once raised, no new lookups are issued; lookups
/// already in flight run to completion or timeout.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
