use rand::{Rng, SeedableRng, rngs::SmallRng};
use std::time::Duration;

use crate::types::JITTER_RATIO;

/// Capped exponential backoff with multiplicative jitter.
///
/// The base delay for attempt `n` is `min(initial * 2^n, max)`; the jittered
/// delay lands in `[0.8 * base, 1.2 * base]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self { initial, max }
    }

    pub fn from_millis(initial_ms: u64, max_ms: u64) -> Self {
        Self::new(
            Duration::from_millis(initial_ms),
            Duration::from_millis(max_ms),
        )
    }

    /// Delay before jitter for the given attempt number
    pub fn base_delay(&self, attempt: u32) -> Duration {
        // 2^32 already overflows any sane initial delay, cap the shift there
        let factor = 1u64.checked_shl(attempt.min(32)).unwrap_or(u64::MAX);
        let initial_ms = self.initial.as_millis().min(u64::MAX as u128) as u64;
        let scaled = initial_ms.saturating_mul(factor);
        Duration::from_millis(scaled).min(self.max)
    }

    /// Jittered delay for the given attempt number
    pub fn next_delay(&self, attempt: u32) -> Duration {
        let mut rng = SmallRng::from_entropy();
        apply_jitter(self.base_delay(attempt), rng.r#gen::<f64>())
    }
}

/// Scale `base` by `1 - JITTER_RATIO + unit * 2 * JITTER_RATIO`.
///
/// `unit` is a uniform sample in `[0, 1)`; values outside are clamped.
pub fn apply_jitter(base: Duration, unit: f64) -> Duration {
    if base.is_zero() {
        return base;
    }
    let unit = if unit.is_finite() {
        unit.clamp(0.0, 1.0)
    } else {
        0.5
    };
    let factor = (1.0 - JITTER_RATIO) + unit * (2.0 * JITTER_RATIO);
    let nanos = (base.as_nanos() as f64 * factor) as u128;
    Duration::from_nanos(nanos.min(u64::MAX as u128) as u64)
}

impl Default for Backoff {
    fn default() -> Self {
        Self::from_millis(
            crate::types::DEFAULT_INITIAL_DELAY,
            crate::types::DEFAULT_MAX_DELAY,
        )
    }
}
