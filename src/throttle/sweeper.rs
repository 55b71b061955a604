//! Background lifecycle object that periodically reclaims expired attempt records.

// std
use std::time::Duration as StdDuration;
// crates.io
use tokio::{
	sync::Notify,
	task::JoinHandle,
	time::{self, MissedTickBehavior},
};
// self
use crate::{_prelude::*, throttle::AttemptThrottle};

/// Periodic sweep task bound to one [`AttemptThrottle`].
///
/// The task runs every `sweep_interval` on the tokio runtime that started it. [`Sweeper::stop`]
/// shuts it down gracefully; dropping the handle aborts it.
#[derive(Debug)]
pub struct Sweeper {
	shutdown: Arc<Notify>,
	task: Option<JoinHandle<()>>,
}
impl Sweeper {
	const MIN_PERIOD: StdDuration = StdDuration::from_millis(1);

	/// Spawns the sweep loop. Must be called from within a tokio runtime.
	pub fn start(throttle: Arc<AttemptThrottle>) -> Self {
		let period = throttle.config().sweep_interval.unsigned_abs().max(Self::MIN_PERIOD);
		let shutdown = Arc::new(Notify::new());
		let signal = shutdown.clone();
		let task = tokio::spawn(async move {
			let mut ticker = time::interval(period);

			ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
			// The first tick resolves immediately.
			ticker.tick().await;

			loop {
				tokio::select! {
					_ = signal.notified() => break,
					_ = ticker.tick() => {
						throttle.sweep();
					},
				}
			}
		});

		Self { shutdown, task: Some(task) }
	}

	/// Returns `true` while the sweep loop is alive.
	pub fn is_running(&self) -> bool {
		self.task.as_ref().is_some_and(|task| !task.is_finished())
	}

	/// Signals the loop to exit and waits for it to finish.
	pub async fn stop(mut self) {
		self.shutdown.notify_one();

		if let Some(task) = self.task.take() {
			let _ = task.await;
		}
	}
}
impl Drop for Sweeper {
	fn drop(&mut self) {
		if let Some(task) = self.task.take() {
			task.abort();
		}
	}
}
