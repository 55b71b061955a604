//! Crate-level error types shared across the throttle, retry, and store layers.
//!
//! Lockout denials are status values and retried operations surface their own error type
//! unchanged, so the variants below only cover the crate's own failure surfaces.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Throttle key could not be derived from the request identity.
	#[error(transparent)]
	Key(#[from] crate::throttle::KeyError),
}

/// Configuration and validation failures raised while building throttles or retry schedules.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Throttle configuration failed validation.
	#[error("Throttle setting `{field}` is invalid: {reason}.")]
	InvalidThrottle {
		/// Offending configuration field.
		field: &'static str,
		/// Validation rule that was violated.
		reason: &'static str,
	},
	/// Retry schedule failed validation.
	#[error("Retry setting `{field}` is invalid: {reason}.")]
	InvalidSchedule {
		/// Offending configuration field.
		field: &'static str,
		/// Validation rule that was violated.
		reason: &'static str,
	},
	/// Configuration document could not be parsed.
	#[error("Configuration is malformed at `{}`.", source.path())]
	Parse {
		/// Structured parsing failure, including the offending field path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}
