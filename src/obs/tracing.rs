// self
use crate::_prelude::*;

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedOp<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedOp<F> = F;

/// Operation families traced by [`OpSpan`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpKind {
	/// Login-attempt throttle calls, traced at `debug`.
	Throttle,
	/// Retried upstream calls; traced at `info`.
	Retry,
}
impl OpKind {
	/// Returns the `op` field value.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpKind::Throttle => "throttle",
			OpKind::Retry => "retry",
		}
	}
}

/// A span builder used by throttle and retry operations.
#[derive(Clone, Debug)]
pub struct OpSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl OpSpan {
	/// Creates a span for one `stage` of a `kind` operation, optionally labeled with the
	/// caller's operation name.
	pub fn new(kind: OpKind, stage: &'static str, operation: Option<&str>) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = match kind {
				OpKind::Throttle => tracing::debug_span!(
					"resilience_layer.op",
					op = kind.as_str(),
					stage,
					operation = tracing::field::Empty
				),
				OpKind::Retry => tracing::info_span!(
					"resilience_layer.op",
					op = kind.as_str(),
					stage,
					operation = tracing::field::Empty
				),
			};

			if let Some(operation) = operation {
				span.record("operation", operation);
			}

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage, operation);

			Self {}
		}
	}

	/// Enters the span for synchronous sections.
	pub fn entered(self) -> OpSpanGuard {
		#[cfg(feature = "tracing")]
		{
			OpSpanGuard { guard: self.span.entered() }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = self;

			OpSpanGuard {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedOp<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// RAII guard returned by [`OpSpan::entered`].
pub struct OpSpanGuard {
	#[cfg(feature = "tracing")]
	#[allow(dead_code)]
	guard: tracing::span::EnteredSpan,
}
impl Debug for OpSpanGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("OpSpanGuard(..)")
	}
}

/// Emits a warning for a freshly issued lockout.
pub(crate) fn log_lockout(client: &str, fingerprint: &str, failures: u32, lockout: Duration) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(
			client,
			key = fingerprint,
			failures,
			lockout_ms = lockout.whole_milliseconds() as i64,
			"Login attempts locked out."
		);
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (client, fingerprint, failures, lockout);
	}
}

/// Emits a warning when the attempt store fails and the throttle falls back.
pub(crate) fn log_store_failure(stage: &'static str, error: &dyn Display) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(stage, error = %error, "Attempt store failed; failing closed.");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (stage, error);
	}
}

/// Emits a debug event for a scheduled retry.
pub(crate) fn log_retry(attempt: u32, delay: Duration, error: &dyn Display) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(
			attempt,
			delay_ms = delay.whole_milliseconds() as i64,
			error = %error,
			"Retrying after transient failure."
		);
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (attempt, delay, error);
	}
}

/// Emits a warning when a retried call gives up.
pub(crate) fn log_give_up(attempts: u32, exhausted: bool, error: &dyn Display) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(attempts, exhausted, error = %error, "Giving up on retried call.");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (attempts, exhausted, error);
	}
}
