use std::ops::ControlFlow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use quanta::Clock;
use quanta::Instant;

use crate::PermitsPerSecond;
use crate::Reason;
use crate::Strategy;

/// Generic Cell Rate Algorithm with zero burst tolerance.
///
/// Every admission pushes the next free slot one emission interval further
/// out, measured from whichever is later: now, or the previous slot. Unused
/// time is never banked, so a quiet period does not turn into a burst.
///
/// Slots are tracked in `u64` nanoseconds. At absurdly low rates the next
/// slot saturates at the end of that range (about 584 years out) instead of
/// wrapping around.
#[derive(Debug)]
pub struct SmoothRate {
    /// Next free slot, in nanoseconds since `anchor`.
    next_free: AtomicU64,
    emission_interval_ns: u64,
    rate: PermitsPerSecond,
    clock: Clock,
    /// A fixed point in time (TSC tick) to calculate deltas from.
    anchor: Instant,
}

impl SmoothRate {
    pub fn new(rate: PermitsPerSecond) -> Self {
        Self::with_clock(rate, Clock::new())
    }

    pub fn with_clock(rate: PermitsPerSecond, clock: Clock) -> Self {
        let anchor = clock.now();

        Self {
            next_free: AtomicU64::new(0),
            emission_interval_ns: rate.interval().as_nanos() as u64,
            rate,
            clock,
            anchor,
        }
    }

    pub fn rate(&self) -> PermitsPerSecond {
        self.rate
    }

    fn elapsed_ns(&self) -> u64 {
        self.clock.now().duration_since(self.anchor).as_nanos() as u64
    }

    #[cfg(test)]
    pub(crate) fn next_free_ns(&self) -> u64 {
        self.next_free.load(Ordering::Acquire)
    }
}

impl Strategy for SmoothRate {
    #[inline]
    fn reserve(&self, max_wait: Option<Duration>) -> ControlFlow<Reason, Duration> {
        let now = self.elapsed_ns();

        loop {
            let next_free = self.next_free.load(Ordering::Acquire);

            let slot = next_free.max(now);
            let wait_ns = slot - now;

            if let Some(max_wait) = max_wait {
                let max_wait_ns = u64::try_from(max_wait.as_nanos()).unwrap_or(u64::MAX);
                if wait_ns > max_wait_ns {
                    return ControlFlow::Break(Reason::Overloaded {
                        retry_after: Duration::from_nanos(wait_ns - max_wait_ns),
                    });
                }
            }

            if self
                .next_free
                .compare_exchange_weak(
                    next_free,
                    slot.saturating_add(self.emission_interval_ns),
                    Ordering::AcqRel,
                    Ordering::Relaxed,
                )
                .is_ok()
            {
                return ControlFlow::Continue(Duration::from_nanos(wait_ns));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::Barrier;
    use std::thread;

    use more_asserts::assert_ge;

    use super::*;

    fn rate(value: f64) -> PermitsPerSecond {
        PermitsPerSecond::try_from(value).unwrap()
    }

    #[test]
    fn first_reservation_is_immediate() {
        let (clock, _mock) = Clock::mock();
        let rl = SmoothRate::with_clock(rate(1.0), clock);

        assert_eq!(rl.reserve(None), ControlFlow::Continue(Duration::ZERO));
    }

    #[test]
    fn back_to_back_reservations_are_spaced_by_the_interval() {
        let (clock, _mock) = Clock::mock();
        let rl = SmoothRate::with_clock(rate(10.0), clock);

        // Time is frozen, so each reservation lands one interval after the last.
        for k in 0..5u64 {
            assert_eq!(
                rl.reserve(None),
                ControlFlow::Continue(Duration::from_millis(100 * k))
            );
        }
    }

    #[test]
    fn idle_time_is_not_banked() {
        let (clock, mock) = Clock::mock();
        let rl = SmoothRate::with_clock(rate(10.0), clock);

        assert!(rl.reserve(None).is_continue());

        // A long quiet period...
        mock.increment(Duration::from_secs(5));

        // ...buys exactly one immediate slot, not fifty.
        assert_eq!(rl.reserve(None), ControlFlow::Continue(Duration::ZERO));
        assert_eq!(
            rl.reserve(None),
            ControlFlow::Continue(Duration::from_millis(100))
        );
    }

    #[test]
    fn partially_elapsed_interval_shortens_the_wait() {
        let (clock, mock) = Clock::mock();
        let rl = SmoothRate::with_clock(rate(4.0), clock);

        assert!(rl.reserve(None).is_continue());
        mock.increment(Duration::from_millis(100));

        assert_eq!(
            rl.reserve(None),
            ControlFlow::Continue(Duration::from_millis(150))
        );
    }

    #[test]
    fn refused_reservation_leaves_state_untouched() {
        let (clock, _mock) = Clock::mock();
        let rl = SmoothRate::with_clock(rate(2.0), clock);

        assert!(rl.reserve(None).is_continue());
        let before = rl.next_free_ns();

        // Next slot is 500ms away.
        assert_eq!(
            rl.reserve(Some(Duration::from_millis(200))),
            ControlFlow::Break(Reason::Overloaded {
                retry_after: Duration::from_millis(300)
            })
        );
        assert_eq!(rl.next_free_ns(), before);

        // A generous enough budget still gets the very same slot.
        assert_eq!(
            rl.reserve(Some(Duration::from_millis(500))),
            ControlFlow::Continue(Duration::from_millis(500))
        );
    }

    #[test]
    fn tiny_rates_saturate_instead_of_wrapping() {
        let (clock, _mock) = Clock::mock();
        let tiny = rate(1e-10);
        let rl = SmoothRate::with_clock(tiny, clock);

        assert_eq!(rl.reserve(None), ControlFlow::Continue(Duration::ZERO));
        assert_eq!(rl.reserve(None), ControlFlow::Continue(tiny.interval()));

        // Two intervals no longer fit in u64 nanoseconds.
        assert_eq!(rl.next_free_ns(), u64::MAX);
        assert_eq!(
            rl.reserve(None),
            ControlFlow::Continue(Duration::from_nanos(u64::MAX))
        );
        assert_eq!(rl.next_free_ns(), u64::MAX);

        // Here the interval itself is already past the end of the range.
        let (clock, _mock) = Clock::mock();
        let rl = SmoothRate::with_clock(rate(1e-11), clock);
        assert_eq!(rl.reserve(None), ControlFlow::Continue(Duration::ZERO));
        assert_eq!(
            rl.reserve(None),
            ControlFlow::Continue(Duration::from_nanos(u64::MAX))
        );
    }

    #[test]
    fn huge_budgets_are_not_truncated() {
        let (clock, _mock) = Clock::mock();
        let rl = SmoothRate::with_clock(rate(1.0), clock);

        assert!(rl.reserve(None).is_continue());

        // Just past u64::MAX nanoseconds.
        assert_eq!(
            rl.reserve(Some(Duration::from_secs(18_446_744_074))),
            ControlFlow::Continue(Duration::from_secs(1))
        );
        assert_eq!(
            rl.reserve(Some(Duration::MAX)),
            ControlFlow::Continue(Duration::from_secs(2))
        );
    }

    #[test]
    fn concurrent_reservations_respect_global_spacing() {
        let (clock, _mock) = Clock::mock();
        let permits = 8.0;
        let rl = Arc::new(SmoothRate::with_clock(rate(permits), clock));

        let callers = 32;
        let barrier = Arc::new(Barrier::new(callers));

        let handles: Vec<_> = (0..callers)
            .map(|_| {
                let rl = rl.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    match rl.reserve(None) {
                        ControlFlow::Continue(wait) => wait,
                        ControlFlow::Break(reason) => panic!("unbounded reserve refused: {reason:?}"),
                    }
                })
            })
            .collect();

        // All callers arrive at the same (frozen) instant T, so a grant lands at T + wait.
        let mut grants: Vec<Duration> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        grants.sort();

        for (k, grant) in grants.iter().enumerate() {
            let earliest = k as f64 / permits;
            assert_ge!(grant.as_secs_f64(), earliest, "grant #{k} came too early");
        }

        // No two callers were handed the same slot.
        grants.dedup();
        assert_eq!(grants.len(), callers);
    }
}
