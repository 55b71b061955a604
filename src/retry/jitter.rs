//! Jitter sources feeding [`RetrySchedule::jittered`](crate::retry::RetrySchedule::jittered).

// crates.io
use rand::Rng;
// self
use crate::_prelude::*;

/// Produces jitter samples in `[-1, 1]`.
pub trait JitterSource
where
	Self: Send + Sync,
{
	/// Draws one sample.
	fn sample(&self) -> f64;
}

/// Uniform jitter drawn from the thread-local RNG.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadRngJitter;
impl JitterSource for ThreadRngJitter {
	fn sample(&self) -> f64 {
		rand::rng().random_range(-1.0..=1.0)
	}
}

/// Constant jitter sample, for deterministic schedules.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FixedJitter(f64);
impl FixedJitter {
	/// Creates a source that always returns `sample`, clamped to `[-1, 1]`.
	pub fn new(sample: f64) -> Self {
		Self(if sample.is_nan() { 0. } else { sample.clamp(-1., 1.) })
	}
}
impl JitterSource for FixedJitter {
	fn sample(&self) -> f64 {
		self.0
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn thread_rng_samples_stay_in_range() {
		for _ in 0..1_000 {
			let sample = ThreadRngJitter.sample();

			assert!((-1.0..=1.0).contains(&sample));
		}
	}

	#[test]
	fn fixed_jitter_is_clamped() {
		assert_eq!(FixedJitter::new(3.).sample(), 1.);
		assert_eq!(FixedJitter::new(f64::NAN).sample(), 0.);
	}
}
