//! Infrastructure layer for agora
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, plus configuration file loading.

pub mod config;
pub mod logging;
pub mod store;
pub mod transport;

// Re-export commonly used types
pub use config::{
    ConfigLoader, FileCascadeConfig, FileConfig, FileGovernanceConfig, FileIdentityConfig,
    FileLoggingConfig, FileOutputConfig, FileStorageConfig,
};
pub use logging::JsonlAuditLogger;
pub use store::LocalStore;
pub use transport::{BroadcastTransport, BusMessage, JsonlOutboxTransport};
