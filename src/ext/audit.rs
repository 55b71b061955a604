//! Audit contracts that let hosts persist lockouts and retry decisions without coupling the
//! throttle or executor to a storage engine.

// self
use crate::{_prelude::*, throttle::ThrottleKey};

/// Receiver for audit events.
///
/// Implementations run inline on the request path, so they must not block; a sink that needs
/// I/O should enqueue the event and return. Sinks cannot fail the primary operation.
pub trait AuditSink
where
	Self: Send + Sync,
{
	/// Accepts one audit event.
	fn record(&self, event: AuditEvent);
}

/// Audit-worthy decisions emitted by the throttle and the retry executor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuditEvent {
	/// A key crossed the failure threshold and was locked out.
	LockedOut {
		/// Key that was locked.
		key: ThrottleKey,
		/// Failures counted in the current window.
		failures: u32,
		/// End of the lockout.
		locked_until: OffsetDateTime,
		/// Length of the lockout.
		lockout: Duration,
	},
	/// A successful authentication cleared the key.
	Cleared {
		/// Key that was cleared.
		key: ThrottleKey,
	},
	/// A failed call will be retried after a delay.
	RetryScheduled {
		/// Retry policy label.
		policy: &'static str,
		/// Caller-supplied operation name, if any.
		operation: Option<String>,
		/// Retry number (1-based).
		attempt: u32,
		/// Delay before the retry.
		delay: Duration,
	},
	/// A retried call ran out of budget and surfaced its last error.
	RetriesExhausted {
		/// Retry policy label.
		policy: &'static str,
		/// Caller-supplied operation name, if any.
		operation: Option<String>,
		/// Total attempts made.
		attempts: u32,
	},
}

/// Sink that keeps events in memory, for tests and local inspection.
#[derive(Debug, Default)]
pub struct MemoryAuditSink(Mutex<Vec<AuditEvent>>);
impl MemoryAuditSink {
	/// Returns a copy of the recorded events.
	pub fn events(&self) -> Vec<AuditEvent> {
		self.0.lock().clone()
	}

	/// Removes and returns the recorded events.
	pub fn drain(&self) -> Vec<AuditEvent> {
		std::mem::take(&mut *self.0.lock())
	}
}
impl AuditSink for MemoryAuditSink {
	fn record(&self, event: AuditEvent) {
		self.0.lock().push(event);
	}
}
