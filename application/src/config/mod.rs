//! Application-level configuration.
//!
//! - [`AgoraConfig`] - identity, governance policy and cascade policy for one node

pub mod agora_config;

pub use agora_config::{AgoraConfig, DEFAULT_GROUP, DEFAULT_PRESENCE_WINDOW};
