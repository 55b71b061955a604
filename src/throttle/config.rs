//! Throttle tuning knobs, validated builder, and lockout escalation math.

// self
use crate::{_prelude::*, config::duration_ms, error::ConfigError};

/// Tuning parameters for [`AttemptThrottle`](crate::throttle::AttemptThrottle).
///
/// Durations serialize as whole milliseconds so the struct can be embedded in host
/// configuration files; use [`ThrottleConfig::from_json_str`] to load and validate in one step.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrottleConfig {
	/// Failures tolerated inside one window before a lockout is issued.
	pub max_attempts: u32,
	/// Window during which failures accumulate.
	#[serde(with = "duration_ms")]
	pub window: Duration,
	/// Lockout applied the first time the threshold is reached.
	#[serde(with = "duration_ms")]
	pub initial_lockout: Duration,
	/// Upper bound for escalated lockouts.
	#[serde(with = "duration_ms")]
	pub max_lockout: Duration,
	/// Growth factor applied per additional threshold crossing.
	pub lockout_multiplier: u32,
	/// Period between background sweeps.
	#[serde(with = "duration_ms")]
	pub sweep_interval: Duration,
}
impl ThrottleConfig {
	/// Default failures per window.
	pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
	/// Default attempt window.
	pub const DEFAULT_WINDOW: Duration = Duration::minutes(15);
	/// Default first lockout.
	pub const DEFAULT_INITIAL_LOCKOUT: Duration = Duration::seconds(60);
	/// Default lockout ceiling.
	pub const DEFAULT_MAX_LOCKOUT: Duration = Duration::minutes(15);
	/// Default lockout growth factor.
	pub const DEFAULT_LOCKOUT_MULTIPLIER: u32 = 2;
	/// Default sweep period.
	pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::seconds(60);

	/// Returns a builder seeded with the defaults.
	pub fn builder() -> ThrottleConfigBuilder {
		ThrottleConfigBuilder::default()
	}

	/// Parses and validates a JSON document; absent fields keep their defaults.
	pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
		let config: Self = crate::config::from_json_str(json)?;

		config.validate()?;

		Ok(config)
	}

	/// Checks the invariants enforced by [`ThrottleConfigBuilder::build`].
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.max_attempts == 0 {
			return invalid("max_attempts", "must be at least 1");
		}
		if !self.window.is_positive() {
			return invalid("window", "must be positive");
		}
		if !self.initial_lockout.is_positive() {
			return invalid("initial_lockout", "must be positive");
		}
		if self.max_lockout < self.initial_lockout {
			return invalid("max_lockout", "must not be shorter than initial_lockout");
		}
		if self.lockout_multiplier == 0 {
			return invalid("lockout_multiplier", "must be at least 1");
		}
		if !self.sweep_interval.is_positive() {
			return invalid("sweep_interval", "must be positive");
		}

		Ok(())
	}

	/// Lockout owed once `count` failures accumulated in the current window, if any.
	///
	/// The duration is `initial_lockout * multiplier^(floor(count / max_attempts) - 1)`, capped at
	/// `max_lockout`, so every further multiple of the threshold escalates the penalty.
	pub fn lockout_for(&self, count: u32) -> Option<Duration> {
		self.escalated_lockout_for(count, 0)
	}

	/// Like [`lockout_for`](Self::lockout_for), with `escalation` extra steps carried over from
	/// earlier windows added to the exponent.
	pub fn escalated_lockout_for(&self, count: u32, escalation: u32) -> Option<Duration> {
		let max_attempts = self.max_attempts.max(1);

		if count < max_attempts {
			return None;
		}

		let exponent = (count / max_attempts - 1).saturating_add(escalation);
		let multiplier = i32::try_from(self.lockout_multiplier).unwrap_or(i32::MAX);
		let mut lockout = self.initial_lockout.min(self.max_lockout);

		if multiplier <= 1 {
			return Some(lockout);
		}

		for _ in 0..exponent {
			lockout = match lockout.checked_mul(multiplier) {
				Some(next) if next < self.max_lockout => next,
				_ => return Some(self.max_lockout),
			};
		}

		Some(lockout)
	}
}
impl Default for ThrottleConfig {
	fn default() -> Self {
		Self {
			max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
			window: Self::DEFAULT_WINDOW,
			initial_lockout: Self::DEFAULT_INITIAL_LOCKOUT,
			max_lockout: Self::DEFAULT_MAX_LOCKOUT,
			lockout_multiplier: Self::DEFAULT_LOCKOUT_MULTIPLIER,
			sweep_interval: Self::DEFAULT_SWEEP_INTERVAL,
		}
	}
}

fn invalid(field: &'static str, reason: &'static str) -> Result<(), ConfigError> {
	Err(ConfigError::InvalidThrottle { field, reason })
}

/// Builder for [`ThrottleConfig`] values.
#[derive(Clone, Debug, Default)]
pub struct ThrottleConfigBuilder {
	config: ThrottleConfig,
}
impl ThrottleConfigBuilder {
	/// Sets the failures tolerated per window.
	pub fn max_attempts(mut self, max_attempts: u32) -> Self {
		self.config.max_attempts = max_attempts;

		self
	}

	/// Sets the attempt window.
	pub fn window(mut self, window: Duration) -> Self {
		self.config.window = window;

		self
	}

	/// Sets the first lockout duration.
	pub fn initial_lockout(mut self, lockout: Duration) -> Self {
		self.config.initial_lockout = lockout;

		self
	}

	/// Sets the lockout ceiling.
	pub fn max_lockout(mut self, lockout: Duration) -> Self {
		self.config.max_lockout = lockout;

		self
	}

	/// Sets the lockout growth factor.
	pub fn lockout_multiplier(mut self, multiplier: u32) -> Self {
		self.config.lockout_multiplier = multiplier;

		self
	}

	/// Sets the background sweep period.
	pub fn sweep_interval(mut self, interval: Duration) -> Self {
		self.config.sweep_interval = interval;

		self
	}

	/// Validates and returns the configuration.
	pub fn build(self) -> Result<ThrottleConfig, ConfigError> {
		self.config.validate()?;

		Ok(self.config)
	}
}
