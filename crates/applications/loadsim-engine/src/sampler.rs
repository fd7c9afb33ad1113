//! Exponential variate sampling
//!
//! Interarrival and service durations are drawn from the standard
//! exponential distribution and scaled by the rate parameter:
//!
//! ```text
//! x ~ Exp(1),   interval = x / rate   (seconds)
//! ```
//!
//! The fractional seconds are then converted to a [`Duration`] one unit at a
//! time (seconds → milliseconds → microseconds → nanoseconds), each finer
//! unit taking the truncated fractional remainder of the coarser one.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::Exp1;
use std::time::Duration;

/// Draw one exponentially distributed interval for the given rate
///
/// `rate` must be positive; configuration validation guarantees this for
/// every rate that reaches the engine.
pub fn sample_interval<R: Rng + ?Sized>(rng: &mut R, rate: f64) -> Duration {
    let x: f64 = rng.sample(Exp1);
    secs_to_duration(x / rate)
}

/// Convert fractional seconds into a duration, truncating below one nanosecond
///
/// Non-positive and NaN inputs map to zero.
pub fn secs_to_duration(seconds: f64) -> Duration {
    if seconds.is_nan() || seconds <= 0.0 {
        return Duration::ZERO;
    }

    let (secs, rest) = (seconds.trunc(), seconds.fract());
    let (millis, rest) = split_unit(rest);
    let (micros, rest) = split_unit(rest);
    let (nanos, _) = split_unit(rest);

    Duration::from_secs(secs as u64)
        .saturating_add(Duration::from_millis(millis as u64))
        .saturating_add(Duration::from_micros(micros as u64))
        .saturating_add(Duration::from_nanos(nanos as u64))
}

/// Scale a fractional remainder into the next finer unit
fn split_unit(fraction: f64) -> (f64, f64) {
    let scaled = fraction * 1000.0;
    (scaled.trunc(), scaled.fract())
}

/// Stateful sampler bound to one rate parameter
///
/// Each concurrent task owns its own sampler; the default RNG is seeded from
/// OS entropy so runs are not reproducible.
pub struct VariateSampler<R = StdRng> {
    rate: f64,
    rng: R,
}

impl VariateSampler<StdRng> {
    /// Create an entropy-seeded sampler
    pub fn new(rate: f64) -> Self {
        Self::with_rng(rate, StdRng::from_entropy())
    }
}

impl<R: Rng> VariateSampler<R> {
    /// Create a sampler over a caller-provided RNG
    pub fn with_rng(rate: f64, rng: R) -> Self {
        VariateSampler { rate, rng }
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Draw the next interval
    pub fn sample_interval(&mut self) -> Duration {
        sample_interval(&mut self.rng, self.rate)
    }
}
