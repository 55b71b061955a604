//! Client-agnostic failure descriptions consumed by retryability predicates.
//!
//! Errors from any transport (HTTP SDKs, SMTP clients, raw sockets) describe themselves through
//! [`DescribeFailure`]. The resulting [`FailureContext`] only carries primitive data, so
//! predicates stay decoupled from the concrete client types.

// std
use std::io::{Error as IoError, ErrorKind as IoErrorKind};
// self
use crate::_prelude::*;

/// Coarse failure categories shared by every classifier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FailureKind {
	/// Nothing transport-specific is known.
	#[default]
	Other,
	/// Generic network or connection failure.
	Connection,
	/// The peer reset the connection.
	ConnectionReset,
	/// The peer refused the connection.
	ConnectionRefused,
	/// The call timed out.
	TimedOut,
	/// The call was aborted before completing.
	Aborted,
	/// The upstream reported a rate limit.
	RateLimited,
}
impl FailureKind {
	/// Returns `true` for every connection-level kind.
	pub const fn is_connection(self) -> bool {
		matches!(
			self,
			FailureKind::Connection | FailureKind::ConnectionReset | FailureKind::ConnectionRefused
		)
	}
}

/// Primitive description of a failed call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FailureContext {
	/// Failure category.
	pub kind: FailureKind,
	/// HTTP status returned by the upstream, when available.
	pub http_status: Option<u16>,
	/// SMTP reply code returned by the mail server, when available.
	pub smtp_code: Option<u16>,
	/// Upstream-specific error code (e.g., a payment provider's `code` field).
	pub code: Option<String>,
}
impl FailureContext {
	/// Creates a context of the provided kind.
	pub fn new(kind: FailureKind) -> Self {
		Self { kind, ..Default::default() }
	}

	/// Adds an HTTP status code.
	pub fn with_http_status(mut self, status: u16) -> Self {
		self.http_status = Some(status);

		self
	}

	/// Adds an SMTP reply code.
	pub fn with_smtp_code(mut self, code: u16) -> Self {
		self.smtp_code = Some(code);

		self
	}

	/// Adds an upstream error code.
	pub fn with_code(mut self, code: impl Into<String>) -> Self {
		self.code = Some(code.into());

		self
	}

	/// Returns `true` when the HTTP status is a 5xx.
	pub fn is_server_error(&self) -> bool {
		self.http_status.is_some_and(|status| (500..600).contains(&status))
	}

	/// Returns `true` when the SMTP reply is a transient (4xx) negative completion.
	pub fn is_smtp_transient(&self) -> bool {
		self.smtp_code.is_some_and(|code| (400..500).contains(&code))
	}
}

impl Display for FailureContext {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{:?} failure", self.kind)?;

		if let Some(status) = self.http_status {
			write!(f, ", HTTP {status}")?;
		}
		if let Some(code) = self.smtp_code {
			write!(f, ", SMTP {code}")?;
		}
		if let Some(code) = &self.code {
			write!(f, ", code `{code}`")?;
		}

		Ok(())
	}
}

/// Errors that can describe themselves to retryability predicates.
pub trait DescribeFailure {
	/// Summarizes the failure.
	fn describe(&self) -> FailureContext;
}
impl DescribeFailure for FailureContext {
	fn describe(&self) -> FailureContext {
		self.clone()
	}
}
impl DescribeFailure for IoError {
	fn describe(&self) -> FailureContext {
		let kind = match self.kind() {
			IoErrorKind::ConnectionReset => FailureKind::ConnectionReset,
			IoErrorKind::ConnectionRefused => FailureKind::ConnectionRefused,
			IoErrorKind::ConnectionAborted | IoErrorKind::BrokenPipe =>
				FailureKind::Connection,
			IoErrorKind::NotConnected | IoErrorKind::AddrNotAvailable => FailureKind::Connection,
			IoErrorKind::TimedOut => FailureKind::TimedOut,
			IoErrorKind::Interrupted => FailureKind::Aborted,
			_ => FailureKind::Other,
		};

		FailureContext::new(kind)
	}
}

/// Default retryability test: network failures, timeouts, aborts, and HTTP 5xx responses.
pub fn is_transient(ctx: &FailureContext) -> bool {
	ctx.kind.is_connection()
		|| matches!(ctx.kind, FailureKind::TimedOut | FailureKind::Aborted)
		|| ctx.is_server_error()
}
