use std::ops::Deref;
use std::time::Duration;

/// Errors raised while configuring a limiter.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// The requested rate is zero, negative or not a finite number.
    #[error("rate must be a positive, finite number of permits per second, got {0}")]
    InvalidRate(f64),
}

/// A validated, strictly positive admission rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PermitsPerSecond(f64);

impl PermitsPerSecond {
    /// Spacing between two consecutive admissions.
    ///
    /// Rounded up to whole nanoseconds so that the spacing is never shorter
    /// than `1 / rate`, and never below one nanosecond.
    pub fn interval(&self) -> Duration {
        let nanos = (1_000_000_000f64 / self.0).ceil();
        Duration::from_nanos((nanos as u64).max(1))
    }
}

impl TryFrom<f64> for PermitsPerSecond {
    type Error = ConfigError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if value.is_finite() && value > 0f64 {
            Ok(Self(value))
        } else {
            Err(ConfigError::InvalidRate(value))
        }
    }
}

impl Deref for PermitsPerSecond {
    type Target = f64;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
