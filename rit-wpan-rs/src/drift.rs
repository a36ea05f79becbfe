//! Clock skew and scheduling jitter applied to RIT instants.
//!
//! Both appliers are pure functions of their inputs and their seeded RNG
//! streams, so scenario runs reproduce exactly for a given node/run id.

use rand::{rngs::SmallRng, Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

use crate::time::{Duration, TICKS_PER_SECOND};

/// Default skew range in parts per million.
pub const DEFAULT_MIN_SKEW_PPM: f64 = -250.0;
pub const DEFAULT_MAX_SKEW_PPM: f64 = 250.0;

/// Default random-walk noise coefficient, in seconds.
pub const DEFAULT_NOISE_COEFFICIENT: f64 = 1e-9;

const SKEW_STREAM_BASE: u64 = 1000;
const NOISE_STREAM_BASE: u64 = 2000;
const JITTER_STREAM_BASE: u64 = 3000;

fn duration_from_signed_seconds(seconds: f64) -> Duration {
    Duration::from_ticks((seconds * TICKS_PER_SECOND as f64) as i64)
}

/// Applies a per-node constant clock skew plus random-walk noise to a
/// scheduled interval: `apply(t) = max(0, t·(1+δ) + ε)` with
/// `δ ~ U(min_ppm, max_ppm)` drawn once per node and `ε ~ N(0, K·t)`.
#[derive(Debug, Clone)]
pub struct ClockDriftApplier {
    skew: f64,
    noise_coefficient: f64,
    noise: SmallRng,
}

impl ClockDriftApplier {
    /// Skew is drawn from a stream seeded by the node id; noise from a stream
    /// seeded by the run id, so parallel scenario runs stay reproducible.
    pub fn new(node_id: u32, run_id: u32) -> Self {
        Self::with_skew_range(node_id, run_id, DEFAULT_MIN_SKEW_PPM, DEFAULT_MAX_SKEW_PPM)
    }

    pub fn with_skew_range(node_id: u32, run_id: u32, min_ppm: f64, max_ppm: f64) -> Self {
        let mut skew_stream = SmallRng::seed_from_u64(SKEW_STREAM_BASE + node_id as u64);
        let ppm = skew_stream.gen_range(min_ppm..max_ppm);

        Self {
            skew: ppm / 1e6,
            noise_coefficient: DEFAULT_NOISE_COEFFICIENT,
            noise: SmallRng::seed_from_u64(NOISE_STREAM_BASE + run_id as u64),
        }
    }

    pub fn set_skew_ppm(&mut self, ppm: f64) {
        self.skew = ppm / 1e6;
    }

    pub fn set_noise_coefficient(&mut self, k: f64) {
        self.noise_coefficient = k;
    }

    pub fn skew_ppm(&self) -> f64 {
        self.skew * 1e6
    }

    pub fn apply(&mut self, interval: Duration) -> Duration {
        let seconds = interval.as_secs_f64();
        let variance = self.noise_coefficient * seconds;

        let noise = match Normal::new(0.0, libm::sqrt(variance)) {
            Ok(distribution) => distribution.sample(&mut self.noise),
            Err(_) => 0.0,
        };

        let adjusted = seconds * (1.0 + self.skew) + noise;
        if adjusted <= 0.0 {
            Duration::ZERO
        } else {
            duration_from_signed_seconds(adjusted)
        }
    }
}

/// Applies bounded uniform jitter around a scheduled interval:
/// `apply_by_ratio(t, r) = t + U(-t·r/100, +t·r/100)`.
#[derive(Debug, Clone)]
pub struct TimeDriftApplier {
    drift_ratio: f64,
    jitter: SmallRng,
}

impl TimeDriftApplier {
    pub fn new(node_id: u32) -> Self {
        Self {
            drift_ratio: 0.0,
            jitter: SmallRng::seed_from_u64(JITTER_STREAM_BASE + node_id as u64),
        }
    }

    /// The ratio is a percentage and must lie in `0..=100`.
    pub fn set_drift_ratio(&mut self, drift_ratio: f64) {
        assert!(
            (0.0..=100.0).contains(&drift_ratio),
            "drift ratio must be a percentage in 0..=100"
        );
        self.drift_ratio = drift_ratio;
    }

    pub fn apply(&mut self, interval: Duration) -> Duration {
        let ratio = self.drift_ratio;
        self.apply_by_ratio(interval, ratio)
    }

    pub fn apply_by_ratio(&mut self, interval: Duration, drift_ratio: f64) -> Duration {
        assert!(
            (0.0..=100.0).contains(&drift_ratio),
            "drift ratio must be a percentage in 0..=100"
        );

        let seconds = interval.as_secs_f64();
        let bound = seconds * drift_ratio / 100.0;
        if bound <= 0.0 {
            return interval;
        }

        let delta = self.jitter.gen_range(-bound..=bound);
        interval + duration_from_signed_seconds(delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skew_is_stable_per_node() {
        let a = ClockDriftApplier::new(1, 1);
        let b = ClockDriftApplier::new(1, 99);
        let c = ClockDriftApplier::new(2, 1);

        assert_eq!(a.skew_ppm(), b.skew_ppm());
        assert_ne!(a.skew_ppm(), c.skew_ppm());
        assert!(a.skew_ppm() >= DEFAULT_MIN_SKEW_PPM);
        assert!(a.skew_ppm() <= DEFAULT_MAX_SKEW_PPM);
    }

    #[test]
    fn applied_interval_stays_close_to_nominal() {
        let mut applier = ClockDriftApplier::new(3, 1);
        let nominal = Duration::from_seconds(1);

        for _ in 0..1000 {
            let adjusted = applier.apply(nominal);
            // 250 ppm of a second is 250 µs; the noise term is orders of
            // magnitude smaller at K = 1e-9
            let deviation = (adjusted - nominal).abs();
            assert!(deviation < Duration::from_micros(500), "deviation {deviation}");
        }
    }

    #[test]
    fn negative_results_clamp_to_zero() {
        let mut applier = ClockDriftApplier::new(1, 1);
        applier.set_skew_ppm(-2_000_000.0);
        assert_eq!(applier.apply(Duration::from_seconds(1)), Duration::ZERO);
    }

    #[test]
    fn jitter_respects_bounds_and_mean() {
        let mut applier = TimeDriftApplier::new(1);
        let nominal = Duration::from_millis(5);
        let lower = Duration::from_micros(2500);
        let upper = Duration::from_micros(7500);

        let mut sum = 0i64;
        const SAMPLES: i64 = 10_000;
        for _ in 0..SAMPLES {
            let jittered = applier.apply_by_ratio(nominal, 50.0);
            assert!(jittered >= lower && jittered <= upper, "out of bounds: {jittered}");
            sum += jittered.ticks();
        }

        let mean = Duration::from_ticks(sum / SAMPLES);
        let error = (mean - nominal).abs();
        assert!(error < nominal / 20, "mean error {error}");
    }

    #[test]
    fn zero_ratio_is_identity() {
        let mut applier = TimeDriftApplier::new(5);
        let nominal = Duration::from_millis(7);
        assert_eq!(applier.apply_by_ratio(nominal, 0.0), nominal);
    }

    #[test]
    #[should_panic]
    fn ratio_above_hundred_is_a_configuration_error() {
        let mut applier = TimeDriftApplier::new(0);
        applier.set_drift_ratio(150.0);
    }
}
