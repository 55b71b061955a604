//! Storage contracts and the built-in in-process store for throttle attempt records.
//!
//! The throttle never touches a map directly; it reads and writes through [`AttemptStore`] so a
//! shared cache can replace [`MemoryAttemptStore`] without changing throttle semantics. Writes
//! are compare-and-swap so concurrent failures on one key cannot overwrite each other.

pub mod memory;

pub use memory::MemoryAttemptStore;

// self
use crate::{
	_prelude::*,
	throttle::{AttemptRecord, ThrottleKey},
};

/// Storage backend contract implemented by attempt stores.
///
/// Calls are synchronous: throttle operations sit on the request path and never suspend.
pub trait AttemptStore
where
	Self: Send + Sync,
{
	/// Fetches the record associated with the key, if present.
	fn fetch(&self, key: &ThrottleKey) -> Result<Option<AttemptRecord>, StoreError>;

	/// Replaces the record only if the stored value still equals `expected`.
	///
	/// `expected = None` means the key must be absent, which turns the call into an insert.
	fn compare_and_swap(
		&self,
		key: &ThrottleKey,
		expected: Option<&AttemptRecord>,
		replacement: AttemptRecord,
	) -> Result<CompareAndSwapOutcome, StoreError>;

	/// Deletes the record, returning whether one existed.
	fn remove(&self, key: &ThrottleKey) -> Result<bool, StoreError>;

	/// Deletes every record whose window and lockout have both lapsed at `now`.
	///
	/// Returns the number of reclaimed records.
	fn sweep(&self, now: OffsetDateTime, window: Duration) -> Result<usize, StoreError>;
}

/// Result of an attempt-record compare-and-swap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareAndSwapOutcome {
	/// The stored value matched and was replaced.
	Updated,
	/// Another writer changed the record first.
	Conflict,
}

/// Error type produced by [`AttemptStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
