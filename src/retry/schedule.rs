//! Exponential backoff schedule with symmetric jitter.

// self
use crate::{_prelude::*, config::duration_ms, error::ConfigError};

/// Numeric retry budget and delay curve.
///
/// Delays are tracked at millisecond precision. The base delay starts at `initial_delay` and is
/// multiplied by `multiplier` after every retry, never exceeding `max_delay`; each sleep perturbs
/// the base by up to `jitter * base` in either direction and is clamped to `max_delay` again.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySchedule {
	/// Retries allowed after the first attempt.
	pub max_retries: u32,
	/// Base delay before the first retry.
	#[serde(with = "duration_ms")]
	pub initial_delay: Duration,
	/// Ceiling for base and jittered delays.
	#[serde(with = "duration_ms")]
	pub max_delay: Duration,
	/// Growth factor applied to the base delay after each retry.
	pub multiplier: f64,
	/// Fraction of the base delay used as the jitter amplitude.
	pub jitter: f64,
}
impl RetrySchedule {
	/// Default retry budget.
	pub const DEFAULT_MAX_RETRIES: u32 = 3;
	/// Default first delay.
	pub const DEFAULT_INITIAL_DELAY: Duration = Duration::milliseconds(1_000);
	/// Default delay ceiling.
	pub const DEFAULT_MAX_DELAY: Duration = Duration::milliseconds(10_000);
	/// Default growth factor.
	pub const DEFAULT_MULTIPLIER: f64 = 2.;
	/// Default jitter amplitude (±10%).
	pub const DEFAULT_JITTER: f64 = 0.1;

	/// Creates a schedule with the default multiplier and jitter.
	pub const fn new(max_retries: u32, initial_delay: Duration, max_delay: Duration) -> Self {
		Self {
			max_retries,
			initial_delay,
			max_delay,
			multiplier: Self::DEFAULT_MULTIPLIER,
			jitter: Self::DEFAULT_JITTER,
		}
	}

	/// Returns a builder seeded with the defaults.
	pub fn builder() -> RetryScheduleBuilder {
		RetryScheduleBuilder::default()
	}

	/// Parses and validates a JSON document; absent fields keep their defaults.
	pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
		let schedule: Self = crate::config::from_json_str(json)?;

		schedule.validate()?;

		Ok(schedule)
	}

	/// Checks the invariants enforced by [`RetryScheduleBuilder::build`].
	pub fn validate(&self) -> Result<(), ConfigError> {
		if !self.initial_delay.is_positive() {
			return invalid("initial_delay", "must be positive");
		}
		if self.max_delay < self.initial_delay {
			return invalid("max_delay", "must not be shorter than initial_delay");
		}
		if !self.multiplier.is_finite() || self.multiplier < 1. {
			return invalid("multiplier", "must be a finite number of at least 1");
		}
		if !(0. ..=1.).contains(&self.jitter) {
			return invalid("jitter", "must lie between 0 and 1");
		}

		Ok(())
	}

	/// Base (un-jittered) delay before retry number `attempt + 1`.
	pub fn base_delay(&self, attempt: u32) -> Duration {
		let mut delay = self.clamp(self.initial_delay);

		for _ in 0..attempt {
			let next = self.next_base(delay);

			if next == delay {
				break;
			}

			delay = next;
		}

		delay
	}

	/// Grows a base delay by one step.
	pub fn next_base(&self, base: Duration) -> Duration {
		self.clamp_millis(millis(base) * self.multiplier)
	}

	/// Applies a jitter sample in `[-1, 1]` to a base delay.
	pub fn jittered(&self, base: Duration, sample: f64) -> Duration {
		let base_ms = millis(base);
		let offset = base_ms * self.jitter * sample.clamp(-1., 1.);

		self.clamp_millis(base_ms + offset)
	}

	fn clamp(&self, delay: Duration) -> Duration {
		delay.clamp(Duration::ZERO, self.max_delay.max(Duration::ZERO))
	}

	fn clamp_millis(&self, value: f64) -> Duration {
		let ceiling = millis(self.max_delay).max(0.);
		let value = if value.is_nan() { ceiling } else { value.clamp(0., ceiling) };

		Duration::milliseconds(value.round() as i64)
	}
}
impl Default for RetrySchedule {
	fn default() -> Self {
		Self::new(Self::DEFAULT_MAX_RETRIES, Self::DEFAULT_INITIAL_DELAY, Self::DEFAULT_MAX_DELAY)
	}
}

fn millis(duration: Duration) -> f64 {
	duration.whole_milliseconds() as f64
}

fn invalid(field: &'static str, reason: &'static str) -> Result<(), ConfigError> {
	Err(ConfigError::InvalidSchedule { field, reason })
}

/// Builder for [`RetrySchedule`] values.
#[derive(Clone, Debug, Default)]
pub struct RetryScheduleBuilder {
	schedule: RetrySchedule,
}
impl RetryScheduleBuilder {
	/// Sets the retry budget.
	pub fn max_retries(mut self, max_retries: u32) -> Self {
		self.schedule.max_retries = max_retries;

		self
	}

	/// Sets the first delay.
	pub fn initial_delay(mut self, delay: Duration) -> Self {
		self.schedule.initial_delay = delay;

		self
	}

	/// Sets the delay ceiling.
	pub fn max_delay(mut self, delay: Duration) -> Self {
		self.schedule.max_delay = delay;

		self
	}

	/// Sets the growth factor.
	pub fn multiplier(mut self, multiplier: f64) -> Self {
		self.schedule.multiplier = multiplier;

		self
	}

	/// Sets the jitter amplitude.
	pub fn jitter(mut self, jitter: f64) -> Self {
		self.schedule.jitter = jitter;

		self
	}

	/// Validates and returns the schedule.
	pub fn build(self) -> Result<RetrySchedule, ConfigError> {
		self.schedule.validate()?;

		Ok(self.schedule)
	}
}
