//! # pace-limit
//!
//! `pace-limit` spaces outbound calls evenly at a configured rate.
//!
//! ## Core Philosophy
//!
//! Remote registries usually enforce their own rate policy and reject bursts.
//! A classic token bucket lets a client save up idle capacity and then spend it
//! all at once, which is exactly what such a registry punishes. `pace-limit`
//! instead hands out admission slots exactly `1 / rate` apart, no matter how
//! many tasks are asking at the same time.
//!
//! ## Key Concepts
//!
//! * **Lock-Free**: The only shared state is one atomic "next free slot"
//!   timestamp, advanced with Compare-And-Swap.
//! * **Reserve, then wait**: A [`Strategy`] only *reserves* a slot and reports
//!   how long the caller has to wait for it. [`RateLimiter`] does the waiting.
//! * **Refuse without side effects**: A reservation bounded by a maximum wait
//!   either succeeds or leaves the limiter untouched.
//!
//! ## Example
//!
//! ```rust
//! use pace_limit::RateLimiter;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), pace_limit::ConfigError> {
//! let limiter = RateLimiter::configure(10.0)?;
//!
//! // Returns immediately the first time, then every 100ms.
//! limiter.acquire().await;
//! # Ok(())
//! # }
//! ```

use std::fmt::Debug;
use std::ops::ControlFlow;
use std::time::Duration;

mod limiter;
mod rate;
mod smooth_rate;

pub use limiter::RateLimiter;
pub use rate::ConfigError;
pub use rate::PermitsPerSecond;
pub use smooth_rate::SmoothRate;

/// Reasons why a reservation might be refused by a strategy.
#[derive(Debug, PartialEq)]
pub enum Reason {
    /// The next free slot is further away than the caller is prepared to wait.
    Overloaded { retry_after: Duration },
}

/// The core trait for pacing algorithms.
///
/// Strategies must be `Send` and `Sync` to allow sharing across thread boundaries
/// via `Arc`.
pub trait Strategy: Debug + Send + Sync {
    /// Attempts to reserve the next admission slot.
    ///
    /// On success the slot belongs to the caller, and the returned duration is
    /// how long the caller must wait before using it (zero when the slot is free
    /// right now).
    ///
    /// # Errors
    ///
    /// Returns `Reason` if reaching the next slot would take longer than
    /// `max_wait`. Nothing is reserved in that case.
    fn reserve(&self, max_wait: Option<Duration>) -> ControlFlow<Reason, Duration>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_shareable<T: Send + Sync + ?Sized>() {}

    #[test]
    fn strategies_can_cross_threads() {
        assert_shareable::<dyn Strategy>();
        assert_shareable::<SmoothRate>();
        assert_shareable::<RateLimiter>();
        assert_shareable::<RateLimiter<dyn Strategy>>();
    }
}
