//! Storage configuration from TOML (`[storage]` section)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where node state and side channels live.
///
/// Without `state_file` the store is in-memory. Without `outbox_file`
/// envelopes are dropped, and without `audit_file` no audit trail is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileStorageConfig {
    pub state_file: Option<PathBuf>,
    pub outbox_file: Option<PathBuf>,
    pub audit_file: Option<PathBuf>,
}
