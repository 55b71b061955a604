//! Thread-safe in-memory [`AttemptStore`] implementation for single-process deployments.

// self
use crate::{
	_prelude::*,
	store::{AttemptStore, CompareAndSwapOutcome, StoreError},
	throttle::{AttemptRecord, ThrottleKey},
};

type StoreMap = Arc<RwLock<HashMap<String, AttemptRecord>>>;

/// Process-local attempt store keyed by throttle-key fingerprints.
#[derive(Clone, Debug, Default)]
pub struct MemoryAttemptStore(StoreMap);
impl MemoryAttemptStore {
	/// Number of tracked keys.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when no key is tracked.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}
}
impl AttemptStore for MemoryAttemptStore {
	fn fetch(&self, key: &ThrottleKey) -> Result<Option<AttemptRecord>, StoreError> {
		Ok(self.0.read().get(key.fingerprint()).cloned())
	}

	fn compare_and_swap(
		&self,
		key: &ThrottleKey,
		expected: Option<&AttemptRecord>,
		replacement: AttemptRecord,
	) -> Result<CompareAndSwapOutcome, StoreError> {
		let mut guard = self.0.write();

		if guard.get(key.fingerprint()) != expected {
			return Ok(CompareAndSwapOutcome::Conflict);
		}

		guard.insert(key.fingerprint().to_owned(), replacement);

		Ok(CompareAndSwapOutcome::Updated)
	}

	fn remove(&self, key: &ThrottleKey) -> Result<bool, StoreError> {
		Ok(self.0.write().remove(key.fingerprint()).is_some())
	}

	fn sweep(&self, now: OffsetDateTime, window: Duration) -> Result<usize, StoreError> {
		let mut guard = self.0.write();
		let before = guard.len();

		guard.retain(|_, record| !record.is_reclaimable_at(now, window));

		Ok(before - guard.len())
	}
}
