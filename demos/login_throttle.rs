//! Walks a credential endpoint through a brute-force burst, then sends a confirmation email
//! through the email retry policy against a flaky transport.

// std
use std::{
	io::{Error as IoError, ErrorKind as IoErrorKind},
	sync::{
		Arc,
		atomic::{AtomicU32, Ordering},
	},
};
// crates.io
use color_eyre::Result;
use time::{Duration, OffsetDateTime};
// self
use resilience_layer::{
	clock::ManualClock,
	ext::MemoryAuditSink,
	retry::{RetryExecutor, RetryPolicy},
	store::MemoryAttemptStore,
	throttle::{AttemptThrottle, ThrottleConfig, ThrottleKey},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let clock = ManualClock::new(OffsetDateTime::now_utc());
	let audit = Arc::new(MemoryAuditSink::default());
	let throttle = AttemptThrottle::with_store(
		ThrottleConfig::default(),
		Arc::new(MemoryAttemptStore::default()),
		Arc::new(clock.clone()),
	)
	.with_audit(audit.clone());
	let key = ThrottleKey::new("203.0.113.7", "user@x.com")?;

	for attempt in 1..=6 {
		let admission = throttle.check_admission(&key);

		if !admission.allowed {
			println!(
				"attempt {attempt}: denied, retry after {} ms",
				admission.retry_after_ms().unwrap_or_default()
			);

			continue;
		}

		let outcome = throttle.record_failure(&key);

		println!(
			"attempt {attempt}: wrong password, locked={} remaining={}",
			outcome.locked, outcome.remaining_attempts
		);
	}

	clock.advance(Duration::seconds(60));
	println!("after 60 s: allowed={}", throttle.check_admission(&key).allowed);

	throttle.clear(&key);
	println!("audit trail: {:#?}", audit.drain());

	let executor = RetryExecutor::new();
	let sends = AtomicU32::new(0);
	let receipt = executor
		.run_policy(&RetryPolicy::EMAIL, "confirmation_email", || {
			let send = sends.fetch_add(1, Ordering::SeqCst);

			async move {
				if send == 0 {
					Err(IoError::new(IoErrorKind::ConnectionReset, "smtp relay reset"))
				} else {
					Ok(format!("queued after {} attempts", send + 1))
				}
			}
		})
		.await?;

	println!("email: {receipt}");

	Ok(())
}
