//! In-process resilience primitives: progressive login throttling with escalating lockouts, plus
//! jittered retry policies for flaky upstream calls.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod clock;
pub mod config;
pub mod error;
pub mod ext;
pub mod obs;
pub mod retry;
pub mod store;
pub mod throttle;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and fixtures for tests; enabled via `cfg(test)` or the `test` crate
	//! feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		clock::ManualClock,
		ext::MemoryAuditSink,
		retry::{
			DescribeFailure, FailureContext, FailureKind, FixedJitter, RecordingSleeper,
			RetryExecutor,
		},
		store::MemoryAttemptStore,
		throttle::{AttemptThrottle, ThrottleConfig, ThrottleKey},
	};

	/// Fixed starting instant shared by clock-driven fixtures.
	pub const EPOCH: OffsetDateTime = time::macros::datetime!(2025-11-10 12:00 UTC);

	/// Throttle wired to a manual clock, an in-memory store, and a recording audit sink.
	#[derive(Debug)]
	pub struct ThrottleFixture {
		/// Throttle under test.
		pub throttle: AttemptThrottle,
		/// Clock driving every throttle decision.
		pub clock: ManualClock,
		/// Backing store, exposed for record inspection.
		pub store: Arc<MemoryAttemptStore>,
		/// Audit sink capturing lockout and clear events.
		pub audit: Arc<MemoryAuditSink>,
	}

	/// Builds a [`ThrottleFixture`] for the provided configuration starting at [`EPOCH`].
	pub fn throttle_fixture(config: ThrottleConfig) -> ThrottleFixture {
		let clock = ManualClock::new(EPOCH);
		let store = Arc::new(MemoryAttemptStore::default());
		let audit = Arc::new(MemoryAuditSink::default());
		let throttle = AttemptThrottle::with_store(config, store.clone(), Arc::new(clock.clone()))
			.with_audit(audit.clone());

		ThrottleFixture { throttle, clock, store, audit }
	}

	/// Builds a throttle key, panicking on invalid fixtures.
	pub fn key(client: &str, account: &str) -> ThrottleKey {
		ThrottleKey::new(client, account).expect("Throttle key fixture should be valid.")
	}

	/// Builds an executor that never suspends and applies a fixed jitter sample.
	pub fn recording_executor(jitter: f64) -> (RetryExecutor, Arc<RecordingSleeper>) {
		let sleeper = Arc::new(RecordingSleeper::default());
		let executor = RetryExecutor::with_sleeper(sleeper.clone())
			.with_jitter_source(Arc::new(FixedJitter::new(jitter)));

		(executor, sleeper)
	}

	/// Minimal upstream failure used to exercise retry classifiers.
	#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
	#[error("Upstream failed: {label}.")]
	pub struct UpstreamError {
		/// Human-readable tag that identifies the failure in assertions.
		pub label: &'static str,
		/// Classification exposed through [`DescribeFailure`].
		pub kind: FailureKind,
		/// HTTP status, when the failure came from an HTTP upstream.
		pub http_status: Option<u16>,
	}
	impl UpstreamError {
		/// Network-level failure that default predicates retry.
		pub fn network(label: &'static str) -> Self {
			Self { label, kind: FailureKind::Connection, http_status: None }
		}

		/// HTTP failure carrying the provided status.
		pub fn status(label: &'static str, status: u16) -> Self {
			Self { label, kind: FailureKind::Other, http_status: Some(status) }
		}
	}
	impl DescribeFailure for UpstreamError {
		fn describe(&self) -> FailureContext {
			let ctx = FailureContext::new(self.kind);

			match self.http_status {
				Some(status) => ctx.with_http_status(status),
				None => ctx,
			}
		}
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};

	pub use crate::error::{Error, Result};
}

#[cfg(test)] use color_eyre as _;
