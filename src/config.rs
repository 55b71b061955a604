//! Shared configuration helpers: JSON loading with field paths and millisecond durations.

// crates.io
use serde::{Deserializer, Serializer, de::DeserializeOwned};
// self
use crate::{_prelude::*, error::ConfigError};

/// Parses a JSON configuration document, reporting the failing field path on error.
pub fn from_json_str<T>(json: &str) -> Result<T, ConfigError>
where
	T: DeserializeOwned,
{
	let mut deserializer = serde_json::Deserializer::from_str(json);

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| ConfigError::Parse { source })
}

/// Serde adapter encoding [`Duration`] values as whole milliseconds.
pub mod duration_ms {
	// self
	use super::*;

	/// Serializes a duration as a signed millisecond count.
	pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		let millis = i64::try_from(value.whole_milliseconds()).unwrap_or(i64::MAX);

		serializer.serialize_i64(millis)
	}

	/// Deserializes a signed millisecond count into a duration.
	pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
	where
		D: Deserializer<'de>,
	{
		<i64 as Deserialize>::deserialize(deserializer).map(Duration::milliseconds)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[derive(Debug, Deserialize, Serialize)]
	struct Probe {
		#[serde(with = "duration_ms")]
		delay: Duration,
	}

	#[test]
	fn durations_travel_as_milliseconds() {
		let probe: Probe =
			from_json_str(r#"{ "delay": 1500 }"#).expect("Millisecond payload should parse.");

		assert_eq!(probe.delay, Duration::milliseconds(1_500));
		assert_eq!(
			serde_json::to_string(&probe).expect("Probe should serialize to JSON."),
			r#"{"delay":1500}"#
		);
	}

	#[test]
	fn parse_errors_report_the_field_path() {
		let err = from_json_str::<Probe>(r#"{ "delay": "soon" }"#)
			.expect_err("A string delay should be rejected.");

		assert_eq!(err.to_string(), "Configuration is malformed at `delay`.");
	}
}
