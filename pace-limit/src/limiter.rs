use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use quanta::Clock;
use tokio::time::sleep;

use crate::ConfigError;
use crate::PermitsPerSecond;
use crate::Reason;
use crate::SmoothRate;
use crate::Strategy;

/// Suspends callers until a [`Strategy`] admits them.
///
/// Cloning is cheap and every clone shares the same pacing state, so a single
/// limiter bounds the rate across all of the tasks holding it.
#[derive(Debug)]
pub struct RateLimiter<S = SmoothRate>
where
    S: ?Sized,
{
    strategy: Arc<S>,
}

impl<S> Clone for RateLimiter<S>
where
    S: ?Sized,
{
    fn clone(&self) -> Self {
        Self {
            strategy: Arc::clone(&self.strategy),
        }
    }
}

impl RateLimiter<SmoothRate> {
    /// Create a smoothed limiter admitting `permits_per_second` callers per second.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidRate`] if the rate is zero, negative or not
    /// finite. No limiter state is created in that case.
    pub fn configure(permits_per_second: f64) -> Result<Self, ConfigError> {
        let rate = PermitsPerSecond::try_from(permits_per_second)?;
        Ok(Self::from_strategy(Arc::new(SmoothRate::new(rate))))
    }

    /// Like [`RateLimiter::configure`], reading time from `clock`.
    pub fn with_clock(permits_per_second: f64, clock: Clock) -> Result<Self, ConfigError> {
        let rate = PermitsPerSecond::try_from(permits_per_second)?;
        Ok(Self::from_strategy(Arc::new(SmoothRate::with_clock(rate, clock))))
    }

    pub fn rate(&self) -> PermitsPerSecond {
        self.strategy.rate()
    }
}

impl<S> RateLimiter<S>
where
    S: Strategy + ?Sized,
{
    pub fn from_strategy(strategy: Arc<S>) -> Self {
        Self { strategy }
    }

    /// Wait until it is safe to proceed under the rate limit.
    pub async fn acquire(&self) {
        // An unbounded reservation is never refused.
        let _ = self.acquire_within(None).await;
    }

    /// Wait for a permit, but no longer than `max_wait`.
    ///
    /// If the next free slot is further away than `max_wait` the limiter is
    /// left untouched and the caller is told how far over budget it was.
    /// Otherwise the slot is reserved, the caller sleeps until it arrives,
    /// and the time spent waiting is returned.
    ///
    /// Dropping the returned future while it sleeps gives up the reserved
    /// slot; later callers are still spaced after it.
    pub async fn acquire_within(&self, max_wait: Option<Duration>) -> ControlFlow<Reason, Duration> {
        let wait = self.strategy.reserve(max_wait)?;
        if !wait.is_zero() {
            sleep(wait).await;
        }
        ControlFlow::Continue(wait)
    }
}
