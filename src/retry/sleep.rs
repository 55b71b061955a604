//! Sleep primitives used between retries.

// self
use crate::_prelude::*;

/// Boxed future returned by [`Sleeper::sleep`].
pub type SleepFuture<'a> = Pin<Box<dyn Future<Output = ()> + 'a + Send>>;

/// Suspends the calling task for a delay.
pub trait Sleeper
where
	Self: Send + Sync,
{
	/// Resolves once `delay` has elapsed.
	fn sleep(&self, delay: Duration) -> SleepFuture<'_>;
}

/// Sleeper backed by the tokio timer.
#[cfg(feature = "tokio")]
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioSleeper;
#[cfg(feature = "tokio")]
impl Sleeper for TokioSleeper {
	fn sleep(&self, delay: Duration) -> SleepFuture<'_> {
		Box::pin(tokio::time::sleep(delay.unsigned_abs()))
	}
}

/// Sleeper that records requested delays and resolves immediately.
///
/// Useful for tests and dry runs where the retry curve matters but wall time does not.
#[derive(Debug, Default)]
pub struct RecordingSleeper(Mutex<Vec<Duration>>);
impl RecordingSleeper {
	/// Delays requested so far, in order.
	pub fn delays(&self) -> Vec<Duration> {
		self.0.lock().clone()
	}

	/// Sum of the requested delays.
	pub fn total(&self) -> Duration {
		self.0.lock().iter().copied().sum()
	}
}
impl Sleeper for RecordingSleeper {
	fn sleep(&self, delay: Duration) -> SleepFuture<'_> {
		self.0.lock().push(delay);

		Box::pin(async {})
	}
}
