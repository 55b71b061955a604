//! Public extension contracts.
//!
//! The crate keeps audit persistence out of its core: hosts attach an [`AuditSink`] to forward
//! lockouts and retry decisions to whatever store they already use for audit trails.

pub mod audit;

pub use audit::*;
