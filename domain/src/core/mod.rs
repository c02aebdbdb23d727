//! Core domain concepts shared across all subdomains.
//!
//! - [`identity::AgentId`] / [`identity::TraceId`] - peer and correlation identifiers
//! - [`error::DomainError`] - domain-level errors

pub mod error;
pub mod identity;
