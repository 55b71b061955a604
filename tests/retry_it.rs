// std
use std::{
	io::{Error as IoError, ErrorKind as IoErrorKind},
	sync::{
		Arc,
		atomic::{AtomicU32, Ordering},
	},
};
// crates.io
use parking_lot::Mutex;
use time::Duration;
// self
use resilience_layer::{
	ext::{AuditEvent, MemoryAuditSink},
	retry::{
		FailureContext, FailureKind, FixedJitter, IDEMPOTENCY_KEY_IN_USE, RecordingSleeper,
		RetryExecutor, RetryOptions, RetryPolicy, RetrySchedule,
	},
};

fn recording_executor(jitter: f64) -> (RetryExecutor, Arc<RecordingSleeper>) {
	let sleeper = Arc::new(RecordingSleeper::default());
	let executor = RetryExecutor::with_sleeper(sleeper.clone())
		.with_jitter_source(Arc::new(FixedJitter::new(jitter)));

	(executor, sleeper)
}

fn connection_reset() -> IoError {
	IoError::new(IoErrorKind::ConnectionReset, "connection reset by peer")
}

fn within(delay: Duration, base_ms: i64) -> bool {
	let tolerance = base_ms / 10;
	let delay = delay.whole_milliseconds() as i64;

	(base_ms - tolerance..=base_ms + tolerance).contains(&delay)
}

#[tokio::test]
async fn always_failing_work_runs_budget_plus_one_times() {
	for max_retries in [0_u32, 1, 3, 5] {
		let (executor, sleeper) = recording_executor(0.);
		let calls = AtomicU32::new(0);
		let result = executor
			.execute(
				|| {
					calls.fetch_add(1, Ordering::SeqCst);

					async { Err::<(), _>(connection_reset()) }
				},
				RetryOptions::default()
					.with_max_retries(max_retries)
					.with_initial_delay(Duration::milliseconds(10))
					.with_max_delay(Duration::milliseconds(100)),
			)
			.await;
		let err = result.expect_err("Work that always fails should surface its error.");

		assert_eq!(err.kind(), IoErrorKind::ConnectionReset);
		assert_eq!(calls.load(Ordering::SeqCst), max_retries + 1);
		assert_eq!(sleeper.delays().len(), max_retries as usize);
	}
}

#[tokio::test]
async fn delays_double_with_bounded_jitter() {
	for sample in [-1., -0.3, 0., 0.7, 1.] {
		let (executor, sleeper) = recording_executor(sample);
		let attempts = Arc::new(Mutex::new(Vec::new()));
		let observed = attempts.clone();
		let options = RetryOptions::<IoError>::default()
			.with_schedule(RetrySchedule::new(
				3,
				Duration::milliseconds(1_000),
				Duration::milliseconds(10_000),
			))
			.on_retry(move |ctx| observed.lock().push((ctx.attempt, ctx.delay)));
		let _ = executor.execute(|| async { Err::<(), _>(connection_reset()) }, options).await;
		let delays = sleeper.delays();

		assert_eq!(delays.len(), 3);
		assert!(within(delays[0], 1_000), "First delay out of range: {:?}.", delays[0]);
		assert!(within(delays[1], 2_000), "Second delay out of range: {:?}.", delays[1]);
		assert!(within(delays[2], 4_000), "Third delay out of range: {:?}.", delays[2]);
		assert_eq!(
			*attempts.lock(),
			delays.iter().copied().enumerate().map(|(i, d)| (i as u32 + 1, d)).collect::<Vec<_>>(),
			"Callbacks must observe the delays that were slept."
		);
	}
}

#[tokio::test]
async fn delays_never_exceed_the_ceiling() {
	let (executor, sleeper) = recording_executor(1.);
	let options = RetryOptions::default()
		.with_max_retries(8)
		.with_initial_delay(Duration::milliseconds(100))
		.with_max_delay(Duration::milliseconds(500));
	let _ = executor.execute(|| async { Err::<(), _>(connection_reset()) }, options).await;

	assert_eq!(sleeper.delays().len(), 8);
	assert!(sleeper.delays().iter().all(|delay| *delay <= Duration::milliseconds(500)));
	assert_eq!(sleeper.delays().last(), Some(&Duration::milliseconds(500)));
}

#[tokio::test]
async fn recovers_once_the_upstream_heals() {
	let (executor, sleeper) = recording_executor(0.);
	let calls = AtomicU32::new(0);
	let value = executor
		.execute(
			|| {
				let call = calls.fetch_add(1, Ordering::SeqCst);

				async move { if call < 2 { Err(connection_reset()) } else { Ok("sent") } }
			},
			RetryOptions::default(),
		)
		.await
		.expect("Third attempt should succeed.");

	assert_eq!(value, "sent");
	assert_eq!(calls.load(Ordering::SeqCst), 3);
	assert_eq!(sleeper.delays(), vec![Duration::seconds(1), Duration::seconds(2)]);
}

#[tokio::test]
async fn custom_predicate_stops_after_one_attempt() {
	let (executor, sleeper) = recording_executor(0.);
	let calls = AtomicU32::new(0);
	let err = executor
		.execute(
			|| {
				calls.fetch_add(1, Ordering::SeqCst);

				async { Err::<(), _>(connection_reset()) }
			},
			RetryOptions::new(|_: &IoError| false),
		)
		.await
		.expect_err("Rejected errors should surface immediately.");

	assert_eq!(err.to_string(), "connection reset by peer");
	assert_eq!(calls.load(Ordering::SeqCst), 1);
	assert!(sleeper.delays().is_empty());
}

#[tokio::test]
async fn payment_policy_retries_rate_limits_but_not_declines() {
	let (executor, sleeper) = recording_executor(0.);
	let calls = AtomicU32::new(0);
	let value = executor
		.run_policy(&RetryPolicy::PAYMENT, "charge", || {
			let call = calls.fetch_add(1, Ordering::SeqCst);

			async move {
				match call {
					0 => Err(FailureContext::new(FailureKind::RateLimited)),
					1 => Err(FailureContext::default()
						.with_http_status(409)
						.with_code(IDEMPOTENCY_KEY_IN_USE)),
					_ => Ok(42),
				}
			}
		})
		.await
		.expect("Payment call should recover.");

	assert_eq!(value, 42);
	assert_eq!(sleeper.delays(), vec![Duration::milliseconds(500), Duration::seconds(1)]);

	let (executor, sleeper) = recording_executor(0.);
	let declined = executor
		.run_policy(&RetryPolicy::PAYMENT, "charge", || async {
			Err::<(), _>(FailureContext::default().with_http_status(402).with_code("card_declined"))
		})
		.await
		.expect_err("Card declines are final.");

	assert_eq!(declined.code.as_deref(), Some("card_declined"));
	assert!(sleeper.delays().is_empty());
}

#[tokio::test]
async fn email_policy_gives_up_after_three_retries_and_audits() {
	let audit = Arc::new(MemoryAuditSink::default());
	let (executor, sleeper) = recording_executor(0.);
	let executor = executor.with_audit(audit.clone());
	let calls = AtomicU32::new(0);
	let err = executor
		.run_policy(&RetryPolicy::EMAIL, "welcome_email", || {
			calls.fetch_add(1, Ordering::SeqCst);

			async { Err::<(), _>(FailureContext::default().with_smtp_code(421)) }
		})
		.await
		.expect_err("Mailbox stayed unavailable.");

	assert_eq!(err.smtp_code, Some(421));
	assert_eq!(calls.load(Ordering::SeqCst), 4);
	assert_eq!(
		sleeper.delays(),
		vec![Duration::seconds(1), Duration::seconds(2), Duration::seconds(4)]
	);

	let events = audit.events();

	assert_eq!(events.len(), 4);
	assert_eq!(
		events.last(),
		Some(&AuditEvent::RetriesExhausted {
			policy: "email",
			operation: Some("welcome_email".into()),
			attempts: 4,
		})
	);
}

#[tokio::test]
async fn email_policy_does_not_retry_permanent_rejections() {
	let (executor, _) = recording_executor(0.);
	let calls = AtomicU32::new(0);
	let _ = executor
		.run_policy(&RetryPolicy::EMAIL, "welcome_email", || {
			calls.fetch_add(1, Ordering::SeqCst);

			async { Err::<(), _>(FailureContext::default().with_smtp_code(550)) }
		})
		.await;

	assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn one_executor_serves_concurrent_calls() {
	let (executor, sleeper) = recording_executor(0.);
	let executor = Arc::new(executor);
	let tasks = (0..8)
		.map(|_| {
			let executor = executor.clone();

			tokio::spawn(async move {
				let calls = AtomicU32::new(0);

				executor
					.execute(
						|| {
							let call = calls.fetch_add(1, Ordering::SeqCst);

							async move {
								if call == 0 { Err(connection_reset()) } else { Ok(call) }
							}
						},
						RetryOptions::default(),
					)
					.await
					.map_err(|err| err.to_string())
			})
		})
		.collect::<Vec<_>>();

	for task in tasks {
		let value = task.await.expect("Retry task should not panic.");

		assert_eq!(value, Ok(1), "Every call keeps its own attempt counter.");
	}

	assert_eq!(sleeper.delays().len(), 8);
	assert!(sleeper.delays().iter().all(|delay| *delay == Duration::seconds(1)));
}

#[test]
fn schedules_load_from_json() {
	let schedule = RetrySchedule::from_json_str(r#"{ "max_retries": 5, "initial_delay": 250 }"#)
		.expect("Partial schedule should parse.");

	assert_eq!(schedule.max_retries, 5);
	assert_eq!(schedule.initial_delay, Duration::milliseconds(250));
	assert_eq!(schedule.max_delay, RetrySchedule::DEFAULT_MAX_DELAY);
	assert!(RetrySchedule::from_json_str(r#"{ "jitter": 2.0 }"#).is_err());
}
