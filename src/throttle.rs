//! Login-attempt throttle with progressive lockout.
//!
//! The authentication route asks [`AttemptThrottle::check_admission`] before verifying
//! credentials, reports mismatches through [`AttemptThrottle::record_failure`], and calls
//! [`AttemptThrottle::clear`] once a login succeeds. Each [`ThrottleKey`] owns an independent
//! [`AttemptRecord`]: failures accumulate inside a window, the threshold issues a lockout, and
//! every further multiple of the threshold inside the same window escalates it (capped).
//!
//! Records live behind an [`AttemptStore`]. Failures are applied with a compare-and-swap loop, so
//! two concurrent failures on the same key are both counted. Expired records are reclaimed by
//! [`AttemptThrottle::sweep`], either called directly or driven by a [`Sweeper`] task.

pub mod config;
pub mod key;
pub mod record;
#[cfg(feature = "tokio")] pub mod sweeper;

pub use config::*;
pub use key::*;
pub use record::*;
#[cfg(feature = "tokio")] pub use sweeper::Sweeper;

// self
use crate::{
	_prelude::*,
	clock::{Clock, SystemClock},
	ext::{AuditEvent, AuditSink},
	obs::{self, OpKind, OpSpan, ThrottleEvent},
	store::{AttemptStore, CompareAndSwapOutcome, MemoryAttemptStore, StoreError},
};

/// Upper bound on compare-and-swap rounds before a failure is treated as a store fault.
const MAX_CAS_ROUNDS: usize = 64;

/// Tracks failed authentication attempts per key and decides admission.
///
/// Operations are synchronous and never return errors: store faults are logged and answered
/// with a closed decision (deny, or lock for `initial_lockout`).
pub struct AttemptThrottle {
	config: ThrottleConfig,
	store: Arc<dyn AttemptStore>,
	clock: Arc<dyn Clock>,
	audit: Option<Arc<dyn AuditSink>>,
}
impl AttemptThrottle {
	/// Creates a throttle backed by an in-process store and the system clock.
	pub fn new(config: ThrottleConfig) -> Self {
		Self::with_store(config, Arc::new(MemoryAttemptStore::default()), Arc::new(SystemClock))
	}

	/// Validates `config`, then creates a throttle like [`new`](Self::new).
	pub fn try_new(config: ThrottleConfig) -> Result<Self> {
		config.validate()?;

		Ok(Self::new(config))
	}

	/// Creates a throttle that reuses the caller-provided store + clock pair.
	pub fn with_store(
		config: ThrottleConfig,
		store: Arc<dyn AttemptStore>,
		clock: Arc<dyn Clock>,
	) -> Self {
		Self { config, store, clock, audit: None }
	}

	/// Attaches an audit sink that receives lockout and clear events.
	pub fn with_audit(mut self, sink: Arc<dyn AuditSink>) -> Self {
		self.audit = Some(sink);

		self
	}

	/// Active configuration.
	pub fn config(&self) -> &ThrottleConfig {
		&self.config
	}

	/// Reports whether an attempt for `key` may proceed. Never mutates state.
	pub fn check_admission(&self, key: &ThrottleKey) -> Admission {
		let _span = OpSpan::new(OpKind::Throttle, "check_admission", None).entered();
		let now = self.clock.now();
		let admission = match self.store.fetch(key) {
			Ok(Some(record)) => record.admission_at(now, &self.config),
			Ok(None) => Admission::full(&self.config),
			Err(err) => {
				self.report_store_failure("check_admission", &err);

				return Admission::denied(
					now + self.config.initial_lockout,
					self.config.initial_lockout,
				);
			},
		};

		obs::record_throttle_event(if admission.allowed {
			ThrottleEvent::Admitted
		} else {
			ThrottleEvent::Denied
		});

		admission
	}

	/// Records a failed attempt for `key` and returns the resulting lockout state.
	pub fn record_failure(&self, key: &ThrottleKey) -> FailureOutcome {
		let _span = OpSpan::new(OpKind::Throttle, "record_failure", None).entered();
		let now = self.clock.now();
		let (previous, next) = match self.apply_failure(key, now) {
			Ok(transition) => transition,
			Err(err) => {
				self.report_store_failure("record_failure", &err);

				return FailureOutcome {
					locked: true,
					remaining_attempts: 0,
					locked_until: Some(now + self.config.initial_lockout),
					lockout_duration: Some(self.config.initial_lockout),
				};
			},
		};
		let outcome = next.failure_outcome_at(now, &self.config);
		let issued_lockout = next.lockouts > previous.map_or(0, |record| record.lockouts);

		match (issued_lockout, outcome.locked_until, outcome.lockout_duration) {
			(true, Some(locked_until), Some(lockout)) => {
				obs::record_throttle_event(ThrottleEvent::LockedOut);
				obs::log_lockout(key.client(), key.fingerprint(), next.count, lockout);

				self.emit(AuditEvent::LockedOut {
					key: key.clone(),
					failures: next.count,
					locked_until,
					lockout,
				});
			},
			_ => obs::record_throttle_event(ThrottleEvent::Failure),
		}

		outcome
	}

	/// Forgets every failure recorded for `key`; call after a verified login.
	///
	/// Returns `true` when a record existed.
	pub fn clear(&self, key: &ThrottleKey) -> bool {
		let _span = OpSpan::new(OpKind::Throttle, "clear", None).entered();

		match self.store.remove(key) {
			Ok(true) => {
				obs::record_throttle_event(ThrottleEvent::Cleared);
				self.emit(AuditEvent::Cleared { key: key.clone() });

				true
			},
			Ok(false) => false,
			Err(err) => {
				self.report_store_failure("clear", &err);

				false
			},
		}
	}

	/// Reclaims records whose window and lockout have both expired.
	///
	/// Returns the number of reclaimed records.
	pub fn sweep(&self) -> usize {
		let _span = OpSpan::new(OpKind::Throttle, "sweep", None).entered();

		match self.store.sweep(self.clock.now(), self.config.window) {
			Ok(reclaimed) => {
				if reclaimed > 0 {
					obs::record_throttle_event(ThrottleEvent::Swept);
				}

				reclaimed
			},
			Err(err) => {
				self.report_store_failure("sweep", &err);

				0
			},
		}
	}

	/// Spawns a background [`Sweeper`] for this throttle on the current tokio runtime.
	#[cfg(feature = "tokio")]
	pub fn start_sweeper(self: &Arc<Self>) -> Sweeper {
		Sweeper::start(self.clone())
	}

	fn apply_failure(
		&self,
		key: &ThrottleKey,
		now: OffsetDateTime,
	) -> Result<(Option<AttemptRecord>, AttemptRecord), StoreError> {
		let mut current = self.store.fetch(key)?;

		for _ in 0..MAX_CAS_ROUNDS {
			let next = AttemptRecord::after_failure(current.as_ref(), now, &self.config);

			match self.store.compare_and_swap(key, current.as_ref(), next.clone())? {
				CompareAndSwapOutcome::Updated => return Ok((current, next)),
				CompareAndSwapOutcome::Conflict => current = self.store.fetch(key)?,
			}
		}

		Err(StoreError::Backend {
			message: format!("record contention exceeded {MAX_CAS_ROUNDS} compare-and-swap rounds"),
		})
	}

	fn report_store_failure(&self, stage: &'static str, err: &StoreError) {
		obs::record_throttle_event(ThrottleEvent::StoreFailure);
		obs::log_store_failure(stage, err);
	}

	fn emit(&self, event: AuditEvent) {
		if let Some(sink) = &self.audit {
			sink.record(event);
		}
	}
}
impl Debug for AttemptThrottle {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AttemptThrottle")
			.field("config", &self.config)
			.field("audit_set", &self.audit.is_some())
			.finish()
	}
}
