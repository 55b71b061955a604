//! Per-key attempt records and the status values derived from them.

// self
use crate::{_prelude::*, throttle::ThrottleConfig};

/// Failed-attempt bookkeeping for one throttle key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
	/// Failures observed inside the current window.
	pub count: u32,
	/// Instant of the first failure in the current window.
	pub window_start: OffsetDateTime,
	/// End of the active lockout, if one was issued.
	pub locked_until: Option<OffsetDateTime>,
	/// Lockouts issued since the record was created.
	pub lockouts: u32,
	/// Escalation steps carried over from earlier windows.
	#[serde(default)]
	pub escalation: u32,
}
impl AttemptRecord {
	/// Opens a fresh window with a single failure.
	pub fn first_failure(now: OffsetDateTime) -> Self {
		Self { count: 1, window_start: now, locked_until: None, lockouts: 0, escalation: 0 }
	}

	/// Returns `true` once more than `window` has elapsed since the window opened.
	pub fn window_expired_at(&self, now: OffsetDateTime, window: Duration) -> bool {
		now - self.window_start > window
	}

	/// Returns `true` while the lockout instant lies in the future.
	pub fn is_locked_at(&self, now: OffsetDateTime) -> bool {
		self.locked_until.is_some_and(|until| until > now)
	}

	/// Returns `true` when both the window and any lockout have lapsed.
	pub fn is_reclaimable_at(&self, now: OffsetDateTime, window: Duration) -> bool {
		self.window_expired_at(now, window) && !self.is_locked_at(now)
	}

	/// Computes the record that results from one more failure at `now`.
	///
	/// An expired window restarts the count at one instead of compounding. The threshold
	/// multiples reached in the old window are folded into `escalation`, so the next lockout
	/// resumes from the old severity instead of `initial_lockout`. An active lockout survives
	/// the restart so a failure can never shorten a penalty.
	pub fn after_failure(
		current: Option<&Self>,
		now: OffsetDateTime,
		config: &ThrottleConfig,
	) -> Self {
		let mut next = match current {
			Some(record) if !record.window_expired_at(now, config.window) => {
				let mut next = record.clone();

				next.count = next.count.saturating_add(1);

				next
			},
			Some(record) => Self {
				locked_until: record.locked_until.filter(|until| *until > now),
				lockouts: record.lockouts,
				escalation: record
					.escalation
					.saturating_add(record.count / config.max_attempts.max(1)),
				..Self::first_failure(now)
			},
			None => Self::first_failure(now),
		};

		if let Some(lockout) = config.escalated_lockout_for(next.count, next.escalation) {
			next.locked_until = Some(now + lockout);
			next.lockouts = next.lockouts.saturating_add(1);
		}

		next
	}

	/// Evaluates whether a new attempt may proceed at `now`.
	pub fn admission_at(&self, now: OffsetDateTime, config: &ThrottleConfig) -> Admission {
		if let Some(until) = self.locked_until.filter(|until| *until > now) {
			return Admission::denied(until, until - now);
		}
		if self.window_expired_at(now, config.window) {
			return Admission::full(config);
		}

		Admission::allowed(config.max_attempts.saturating_sub(self.count))
	}

	/// Summarizes this (freshly updated) record for the caller that recorded the failure.
	pub fn failure_outcome_at(
		&self,
		now: OffsetDateTime,
		config: &ThrottleConfig,
	) -> FailureOutcome {
		match self.locked_until.filter(|until| *until > now) {
			Some(until) => FailureOutcome {
				locked: true,
				remaining_attempts: 0,
				locked_until: Some(until),
				lockout_duration: Some(until - now),
			},
			None => FailureOutcome {
				locked: false,
				remaining_attempts: config.max_attempts.saturating_sub(self.count),
				locked_until: None,
				lockout_duration: None,
			},
		}
	}
}

/// Admission decision returned by
/// [`AttemptThrottle::check_admission`](crate::throttle::AttemptThrottle::check_admission).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Admission {
	/// Whether the attempt may proceed.
	pub allowed: bool,
	/// Failures left before the next lockout.
	pub remaining_attempts: u32,
	/// End of the active lockout.
	pub locked_until: Option<OffsetDateTime>,
	/// Time left until the lockout ends.
	pub retry_after: Option<Duration>,
}
impl Admission {
	/// Full allowance for keys without an active window.
	pub fn full(config: &ThrottleConfig) -> Self {
		Self::allowed(config.max_attempts)
	}

	/// Allowance with the given number of attempts left.
	pub fn allowed(remaining_attempts: u32) -> Self {
		Self { allowed: true, remaining_attempts, locked_until: None, retry_after: None }
	}

	/// Denial until the provided instant.
	pub fn denied(locked_until: OffsetDateTime, retry_after: Duration) -> Self {
		Self {
			allowed: false,
			remaining_attempts: 0,
			locked_until: Some(locked_until),
			retry_after: Some(retry_after),
		}
	}

	/// Lockout end as unix epoch milliseconds.
	pub fn locked_until_ms(&self) -> Option<i64> {
		self.locked_until.map(unix_millis)
	}

	/// Remaining lockout in milliseconds.
	pub fn retry_after_ms(&self) -> Option<i64> {
		self.retry_after.map(whole_millis)
	}
}

/// Lockout state reported by
/// [`AttemptThrottle::record_failure`](crate::throttle::AttemptThrottle::record_failure).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FailureOutcome {
	/// Whether the key is now locked out.
	pub locked: bool,
	/// Failures left before the next lockout.
	pub remaining_attempts: u32,
	/// End of the active lockout.
	pub locked_until: Option<OffsetDateTime>,
	/// Length of the active lockout measured from the failure.
	pub lockout_duration: Option<Duration>,
}
impl FailureOutcome {
	/// Lockout end as unix epoch milliseconds.
	pub fn locked_until_ms(&self) -> Option<i64> {
		self.locked_until.map(unix_millis)
	}

	/// Lockout length in milliseconds.
	pub fn lockout_duration_ms(&self) -> Option<i64> {
		self.lockout_duration.map(whole_millis)
	}
}

fn unix_millis(instant: OffsetDateTime) -> i64 {
	i64::try_from(instant.unix_timestamp_nanos() / 1_000_000).unwrap_or(i64::MAX)
}

fn whole_millis(duration: Duration) -> i64 {
	i64::try_from(duration.whole_milliseconds()).unwrap_or(i64::MAX)
}
