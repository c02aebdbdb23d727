//! Cascade configuration from TOML (`[cascade]` section)

use agora_domain::CascadePolicy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileCascadeConfig {
    /// Failed self-tests a task may retry before it is failed
    pub max_retries: u32,
}

impl Default for FileCascadeConfig {
    fn default() -> Self {
        Self {
            max_retries: CascadePolicy::default().max_retries,
        }
    }
}

impl FileCascadeConfig {
    pub fn to_policy(&self) -> CascadePolicy {
        CascadePolicy::default().with_max_retries(self.max_retries)
    }
}
