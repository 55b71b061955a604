// self
use crate::obs::{RetryOutcome, ThrottleEvent};

/// Records a throttle event via the global metrics recorder (when enabled).
pub fn record_throttle_event(event: ThrottleEvent) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("resilience_layer_throttle_total", "event" => event.as_str())
			.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = event;
	}
}

/// Records a retry outcome for the named policy via the global metrics recorder (when enabled).
pub fn record_retry_outcome(policy: &'static str, outcome: RetryOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"resilience_layer_retry_total",
			"policy" => policy,
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (policy, outcome);
	}
}
