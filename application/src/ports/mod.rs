//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod audit_logger;
pub mod cascade_store;
pub mod clock;
pub mod knowledge_store;
pub mod transport;
