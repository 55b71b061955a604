//! Optional observability helpers for throttle and retry operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit spans named `resilience_layer.op` with `op` and `stage` fields, plus
//!   `warn`/`debug` events for lockouts, scheduled retries, and store failures.
//! - Enable `metrics` to increment `resilience_layer_throttle_total` (labeled by `event`) and
//!   `resilience_layer_retry_total` (labeled by `policy` + `outcome`).

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Throttle events observed on the authentication path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ThrottleEvent {
	/// Admission check let the attempt through.
	Admitted,
	/// Admission check rejected the attempt because of an active lockout.
	Denied,
	/// A failed attempt was recorded without triggering a lockout.
	Failure,
	/// A failed attempt triggered (or extended) a lockout.
	LockedOut,
	/// A successful authentication cleared the key.
	Cleared,
	/// A sweep reclaimed expired records.
	Swept,
	/// The attempt store failed and the throttle fell back to a closed decision.
	StoreFailure,
}
impl ThrottleEvent {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			ThrottleEvent::Admitted => "admitted",
			ThrottleEvent::Denied => "denied",
			ThrottleEvent::Failure => "failure",
			ThrottleEvent::LockedOut => "locked_out",
			ThrottleEvent::Cleared => "cleared",
			ThrottleEvent::Swept => "swept",
			ThrottleEvent::StoreFailure => "store_failure",
		}
	}
}
impl Display for ThrottleEvent {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each retried call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RetryOutcome {
	/// The unit of work eventually succeeded.
	Success,
	/// A failure was classified as retryable and another attempt was scheduled.
	Retry,
	/// The retry budget ran out; the last error was propagated.
	Exhausted,
	/// The predicate refused to retry; the error was propagated.
	Rejected,
}
impl RetryOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RetryOutcome::Success => "success",
			RetryOutcome::Retry => "retry",
			RetryOutcome::Exhausted => "exhausted",
			RetryOutcome::Rejected => "rejected",
		}
	}
}
impl Display for RetryOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
