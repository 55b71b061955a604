//! Retry-with-backoff executor for calls to external services.
//!
//! [`RetryExecutor::execute`] runs a unit of work, consults the caller's retryability predicate
//! after each failure, and sleeps along a jittered exponential [`RetrySchedule`] between
//! attempts. Errors are never wrapped: whether the budget ran out or the predicate refused, the
//! caller receives the operation's own error. [`RetryPolicy`] bundles the fixed schedules and
//! classifiers used for payment-provider and outbound-email calls.

pub mod classify;
pub mod jitter;
pub mod policy;
pub mod schedule;
pub mod sleep;

pub use classify::*;
pub use jitter::*;
pub use policy::*;
pub use schedule::*;
pub use sleep::*;

// self
use crate::{
	_prelude::*,
	ext::{AuditEvent, AuditSink},
	obs::{self, OpKind, OpSpan, RetryOutcome},
};

type Predicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;
type RetryCallback<E> = Arc<dyn Fn(&RetryContext<'_, E>) + Send + Sync>;

/// State of one `execute` call at the moment a retry is scheduled.
#[derive(Debug)]
pub struct RetryContext<'a, E> {
	/// Retry number about to run (1-based).
	pub attempt: u32,
	/// Jittered delay that precedes the retry.
	pub delay: Duration,
	/// Error returned by the attempt that just failed.
	pub error: &'a E,
}

/// Per-call retry configuration.
pub struct RetryOptions<E> {
	/// Delay curve and budget.
	pub schedule: RetrySchedule,
	policy: &'static str,
	operation: Option<String>,
	predicate: Predicate<E>,
	on_retry: Option<RetryCallback<E>>,
}
impl<E> RetryOptions<E> {
	/// Creates options with the default schedule and the provided retryability predicate.
	pub fn new<F>(predicate: F) -> Self
	where
		F: 'static + Send + Sync + Fn(&E) -> bool,
	{
		Self {
			schedule: RetrySchedule::default(),
			policy: "custom",
			operation: None,
			predicate: Arc::new(predicate),
			on_retry: None,
		}
	}

	/// Replaces the retryability predicate.
	pub fn retry_if<F>(mut self, predicate: F) -> Self
	where
		F: 'static + Send + Sync + Fn(&E) -> bool,
	{
		self.predicate = Arc::new(predicate);

		self
	}

	/// Installs a callback invoked before every retry sleep.
	pub fn on_retry<F>(mut self, callback: F) -> Self
	where
		F: 'static + Send + Sync + Fn(&RetryContext<'_, E>),
	{
		self.on_retry = Some(Arc::new(callback));

		self
	}

	/// Replaces the whole schedule.
	pub fn with_schedule(mut self, schedule: RetrySchedule) -> Self {
		self.schedule = schedule;

		self
	}

	/// Overrides the retry budget.
	pub fn with_max_retries(mut self, max_retries: u32) -> Self {
		self.schedule.max_retries = max_retries;

		self
	}

	/// Overrides the first delay.
	pub fn with_initial_delay(mut self, delay: Duration) -> Self {
		self.schedule.initial_delay = delay;

		self
	}

	/// Overrides the delay ceiling.
	pub fn with_max_delay(mut self, delay: Duration) -> Self {
		self.schedule.max_delay = delay;

		self
	}

	/// Overrides the growth factor.
	pub fn with_multiplier(mut self, multiplier: f64) -> Self {
		self.schedule.multiplier = multiplier;

		self
	}

	/// Labels the call for diagnostics; the name never influences retry decisions.
	pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
		self.operation = Some(operation.into());

		self
	}

	/// Sets the policy label used by metrics and audit events.
	pub fn with_policy_name(mut self, policy: &'static str) -> Self {
		self.policy = policy;

		self
	}

	/// Policy label.
	pub fn policy_name(&self) -> &'static str {
		self.policy
	}

	/// Operation label, if any.
	pub fn operation(&self) -> Option<&str> {
		self.operation.as_deref()
	}

	/// Applies the retryability predicate.
	pub fn is_retryable(&self, err: &E) -> bool {
		(self.predicate)(err)
	}
}
impl<E> Default for RetryOptions<E>
where
	E: 'static + DescribeFailure,
{
	fn default() -> Self {
		Self::new(|err: &E| is_transient(&err.describe()))
	}
}
impl<E> Clone for RetryOptions<E> {
	fn clone(&self) -> Self {
		Self {
			schedule: self.schedule,
			policy: self.policy,
			operation: self.operation.clone(),
			predicate: self.predicate.clone(),
			on_retry: self.on_retry.clone(),
		}
	}
}
impl<E> Debug for RetryOptions<E> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RetryOptions")
			.field("schedule", &self.schedule)
			.field("policy", &self.policy)
			.field("operation", &self.operation)
			.field("on_retry_set", &self.on_retry.is_some())
			.finish()
	}
}

/// Runs fallible async work with retries.
///
/// The executor holds only shared, immutable collaborators, so one instance can serve any
/// number of concurrent calls; each `execute` keeps its own attempt counter and delay.
#[derive(Clone)]
pub struct RetryExecutor {
	sleeper: Arc<dyn Sleeper>,
	jitter: Arc<dyn JitterSource>,
	audit: Option<Arc<dyn AuditSink>>,
}
impl RetryExecutor {
	/// Creates an executor that sleeps on the tokio timer.
	#[cfg(feature = "tokio")]
	pub fn new() -> Self {
		Self::with_sleeper(Arc::new(TokioSleeper))
	}

	/// Creates an executor that reuses the caller-provided sleep primitive.
	pub fn with_sleeper(sleeper: Arc<dyn Sleeper>) -> Self {
		Self { sleeper, jitter: Arc::new(ThreadRngJitter), audit: None }
	}

	/// Replaces the jitter source.
	pub fn with_jitter_source(mut self, jitter: Arc<dyn JitterSource>) -> Self {
		self.jitter = jitter;

		self
	}

	/// Attaches an audit sink that receives retry and exhaustion events.
	pub fn with_audit(mut self, sink: Arc<dyn AuditSink>) -> Self {
		self.audit = Some(sink);

		self
	}

	/// Runs `work` until it succeeds, the predicate refuses, or the budget is spent.
	///
	/// The first success is returned immediately. The final error is returned unchanged.
	pub async fn execute<T, E, F, Fut>(&self, mut work: F, options: RetryOptions<E>) -> Result<T, E>
	where
		E: Display,
		F: FnMut() -> Fut,
		Fut: Future<Output = Result<T, E>>,
	{
		let span = OpSpan::new(OpKind::Retry, options.policy, options.operation());

		span.instrument(async move {
			let schedule = options.schedule;
			let mut attempt = 0_u32;
			let mut base = schedule.base_delay(0);

			loop {
				let err = match work().await {
					Ok(value) => {
						obs::record_retry_outcome(options.policy, RetryOutcome::Success);

						return Ok(value);
					},
					Err(err) => err,
				};

				if attempt >= schedule.max_retries {
					self.give_up(&options, attempt + 1, true, &err);

					return Err(err);
				}
				if !options.is_retryable(&err) {
					self.give_up(&options, attempt + 1, false, &err);

					return Err(err);
				}

				attempt += 1;

				let delay = schedule.jittered(base, self.jitter.sample());

				self.schedule_retry(&options, RetryContext { attempt, delay, error: &err });
				self.sleeper.sleep(delay).await;

				base = schedule.next_base(base);
			}
		})
		.await
	}

	/// Runs `work` under a named [`RetryPolicy`], labeling diagnostics with `operation`.
	pub async fn run_policy<T, E, F, Fut>(
		&self,
		policy: &RetryPolicy,
		operation: &str,
		work: F,
	) -> Result<T, E>
	where
		E: 'static + Display + DescribeFailure,
		F: FnMut() -> Fut,
		Fut: Future<Output = Result<T, E>>,
	{
		self.execute(work, policy.options().with_operation(operation)).await
	}

	fn schedule_retry<E>(&self, options: &RetryOptions<E>, ctx: RetryContext<'_, E>)
	where
		E: Display,
	{
		obs::record_retry_outcome(options.policy, RetryOutcome::Retry);
		obs::log_retry(ctx.attempt, ctx.delay, ctx.error);

		if let Some(callback) = &options.on_retry {
			callback(&ctx);
		}
		if let Some(sink) = &self.audit {
			sink.record(AuditEvent::RetryScheduled {
				policy: options.policy,
				operation: options.operation.clone(),
				attempt: ctx.attempt,
				delay: ctx.delay,
			});
		}
	}

	fn give_up<E>(&self, options: &RetryOptions<E>, attempts: u32, exhausted: bool, err: &E)
	where
		E: Display,
	{
		let outcome = if exhausted { RetryOutcome::Exhausted } else { RetryOutcome::Rejected };

		obs::record_retry_outcome(options.policy, outcome);
		obs::log_give_up(attempts, exhausted, err);

		if !exhausted {
			return;
		}
		if let Some(sink) = &self.audit {
			sink.record(AuditEvent::RetriesExhausted {
				policy: options.policy,
				operation: options.operation.clone(),
				attempts,
			});
		}
	}
}
#[cfg(feature = "tokio")]
impl Default for RetryExecutor {
	fn default() -> Self {
		Self::new()
	}
}
impl Debug for RetryExecutor {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RetryExecutor").field("audit_set", &self.audit.is_some()).finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::_preludet::{UpstreamError, recording_executor};

	#[tokio::test]
	async fn first_success_skips_callbacks_and_sleeps() {
		let (executor, sleeper) = recording_executor(0.);
		let retries = Arc::new(Mutex::new(0_u32));
		let observed = retries.clone();
		let options = RetryOptions::<UpstreamError>::default().on_retry(move |_| {
			*observed.lock() += 1;
		});
		let value = executor.execute(|| async { Ok::<_, UpstreamError>(7) }, options).await;

		assert_eq!(value, Ok(7));
		assert_eq!(*retries.lock(), 0);
		assert!(sleeper.delays().is_empty());
	}

	#[tokio::test]
	async fn zero_retry_budget_runs_once() {
		let (executor, sleeper) = recording_executor(0.);
		let calls = Mutex::new(0_u32);
		let result = executor
			.execute(
				|| {
					*calls.lock() += 1;

					async { Err::<(), _>(UpstreamError::network("reset")) }
				},
				RetryOptions::default().with_max_retries(0),
			)
			.await;

		assert_eq!(result, Err(UpstreamError::network("reset")));
		assert_eq!(*calls.lock(), 1);
		assert!(sleeper.delays().is_empty());
	}

	#[tokio::test]
	async fn default_predicate_skips_client_errors() {
		let (executor, _) = recording_executor(0.);
		let calls = Mutex::new(0_u32);
		let result = executor
			.execute(
				|| {
					*calls.lock() += 1;

					async { Err::<(), _>(UpstreamError::status("not-found", 404)) }
				},
				RetryOptions::default(),
			)
			.await;

		assert_eq!(result, Err(UpstreamError::status("not-found", 404)));
		assert_eq!(*calls.lock(), 1);
	}
}
