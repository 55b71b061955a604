//! Named retry policies tuned for the payment-provider and outbound-email call sites.

// self
use crate::{
	_prelude::*,
	retry::{DescribeFailure, FailureContext, FailureKind, RetryOptions, RetrySchedule},
};

/// Provider error code returned when an idempotency key is still being processed.
pub const IDEMPOTENCY_KEY_IN_USE: &str = "idempotency_key_in_use";

/// Fixed retry schedule paired with a fixed classifier.
#[derive(Clone, Copy)]
pub struct RetryPolicy {
	/// Stable label used in spans, metrics, and audit events.
	pub name: &'static str,
	/// Delay curve and budget.
	pub schedule: RetrySchedule,
	/// Retryability test applied to each failure.
	pub classify: fn(&FailureContext) -> bool,
}
impl RetryPolicy {
	/// Payment-provider calls: 3 retries, 500 ms doubling up to 5 s.
	pub const PAYMENT: Self = Self {
		name: "payment",
		schedule: RetrySchedule::new(3, Duration::milliseconds(500), Duration::milliseconds(5_000)),
		classify: is_payment_retryable,
	};
	/// Outbound email: 3 retries, 1 s doubling up to 10 s.
	pub const EMAIL: Self = Self {
		name: "email",
		schedule: RetrySchedule::new(
			3,
			Duration::milliseconds(1_000),
			Duration::milliseconds(10_000),
		),
		classify: is_email_retryable,
	};

	/// Builds per-call options for errors that can describe themselves.
	pub fn options<E>(&self) -> RetryOptions<E>
	where
		E: 'static + DescribeFailure,
	{
		let classify = self.classify;

		RetryOptions::new(move |err: &E| classify(&err.describe()))
			.with_schedule(self.schedule)
			.with_policy_name(self.name)
	}

	/// Applies the classifier to an error.
	pub fn is_retryable<E>(&self, err: &E) -> bool
	where
		E: DescribeFailure,
	{
		(self.classify)(&err.describe())
	}
}
impl Debug for RetryPolicy {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RetryPolicy")
			.field("name", &self.name)
			.field("schedule", &self.schedule)
			.finish()
	}
}

/// Payment classifier: rate limits, connection failures, provider 5xx, and idempotency conflicts.
pub fn is_payment_retryable(ctx: &FailureContext) -> bool {
	ctx.kind == FailureKind::RateLimited
		|| ctx.http_status == Some(429)
		|| ctx.kind.is_connection()
		|| ctx.is_server_error()
		|| ctx.code.as_deref() == Some(IDEMPOTENCY_KEY_IN_USE)
}

/// Email classifier: SMTP 4xx replies plus connection resets, timeouts, and refusals.
pub fn is_email_retryable(ctx: &FailureContext) -> bool {
	ctx.is_smtp_transient()
		|| matches!(
			ctx.kind,
			FailureKind::ConnectionReset | FailureKind::TimedOut | FailureKind::ConnectionRefused
		)
}
