//! Composite throttle keys scoped to a client identity and a normalized account identity.

// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD_NO_PAD};
use sha2::{Digest, Sha256};
// self
use crate::_prelude::*;

const COMPONENT_MAX_LEN: usize = 512;

/// Error returned when a throttle key cannot be derived.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum KeyError {
	/// The component was empty after trimming.
	#[error("{component} identity cannot be empty.")]
	Empty {
		/// Which component failed (client, account).
		component: &'static str,
	},
	/// The component exceeded the allowed length.
	#[error("{component} identity exceeds {max} bytes.")]
	TooLong {
		/// Which component failed (client, account).
		component: &'static str,
		/// Maximum permitted byte length.
		max: usize,
	},
}

/// Identity used to scope failed-attempt counting.
///
/// The client component (typically a network address) is trimmed; the account component is
/// trimmed and lower-cased so `User@X.com ` and `user@x.com` share one record. Stores index
/// records by [`fingerprint`](Self::fingerprint), a base64 (no padding) SHA-256 digest of both
/// components, so backends never need to persist raw account identifiers.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ThrottleKey {
	client: String,
	account: String,
	fingerprint: String,
}
impl ThrottleKey {
	/// Derives a key from the raw client and account identities.
	pub fn new(client: impl AsRef<str>, account: impl AsRef<str>) -> Result<Self, KeyError> {
		let client = normalize_component("Client", client.as_ref(), false)?;
		let account = normalize_component("Account", account.as_ref(), true)?;
		let fingerprint = fingerprint(&client, &account);

		Ok(Self { client, account, fingerprint })
	}

	/// Normalized client identity.
	pub fn client(&self) -> &str {
		&self.client
	}

	/// Normalized account identity.
	pub fn account(&self) -> &str {
		&self.account
	}

	/// Stable digest used as the storage key.
	pub fn fingerprint(&self) -> &str {
		&self.fingerprint
	}
}
impl Debug for ThrottleKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "ThrottleKey({}:{})", self.client, self.account)
	}
}
impl Display for ThrottleKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{}:{}", self.client, self.account)
	}
}

fn normalize_component(
	component: &'static str,
	raw: &str,
	lowercase: bool,
) -> Result<String, KeyError> {
	let view = raw.trim();

	if view.is_empty() {
		return Err(KeyError::Empty { component });
	}
	if view.len() > COMPONENT_MAX_LEN {
		return Err(KeyError::TooLong { component, max: COMPONENT_MAX_LEN });
	}

	Ok(if lowercase { view.to_lowercase() } else { view.to_owned() })
}

fn fingerprint(client: &str, account: &str) -> String {
	let mut hasher = Sha256::new();

	// Length prefix keeps `ab` + `c` and `a` + `bc` apart.
	hasher.update((client.len() as u64).to_be_bytes());
	hasher.update(client.as_bytes());
	hasher.update(account.as_bytes());

	STANDARD_NO_PAD.encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn account_identity_is_trimmed_and_lowercased() {
		let key = ThrottleKey::new(" 10.0.0.1 ", "  User@X.com ")
			.expect("Padded identities should normalize.");

		assert_eq!(key.client(), "10.0.0.1");
		assert_eq!(key.account(), "user@x.com");
		assert_eq!(key.to_string(), "10.0.0.1:user@x.com");
		assert_eq!(
			key,
			ThrottleKey::new("10.0.0.1", "user@x.com").expect("Plain identities should be valid.")
		);
	}

	#[test]
	fn client_and_account_scope_independent_records() {
		let base = ThrottleKey::new("ip1", "user@x.com").expect("Base key should be valid.");
		let other_account =
			ThrottleKey::new("ip1", "admin@x.com").expect("Second account key should be valid.");
		let other_client =
			ThrottleKey::new("ip2", "user@x.com").expect("Second client key should be valid.");

		assert_ne!(base.fingerprint(), other_account.fingerprint());
		assert_ne!(base.fingerprint(), other_client.fingerprint());
	}

	#[test]
	fn fingerprint_does_not_collide_on_component_boundaries() {
		let left = ThrottleKey::new("ab", "c").expect("Left key should be valid.");
		let right = ThrottleKey::new("a", "bc").expect("Right key should be valid.");

		assert_ne!(left.fingerprint(), right.fingerprint());
		assert!(!left.fingerprint().contains('='));
	}

	#[test]
	fn empty_and_oversized_components_are_rejected() {
		assert_eq!(ThrottleKey::new("   ", "user"), Err(KeyError::Empty { component: "Client" }));
		assert_eq!(ThrottleKey::new("ip", ""), Err(KeyError::Empty { component: "Account" }));

		let too_long = "a".repeat(COMPONENT_MAX_LEN + 1);

		assert!(matches!(
			ThrottleKey::new("ip", &too_long),
			Err(KeyError::TooLong { component: "Account", .. })
		));
		ThrottleKey::new("ip", "a".repeat(COMPONENT_MAX_LEN))
			.expect("Exact length should be accepted.");
	}
}
