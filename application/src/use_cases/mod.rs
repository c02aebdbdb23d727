//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod cascade;
pub mod cast_vote;
pub mod evaluate;
pub mod governance;
pub mod ingest;
pub mod presence;
pub mod propose;
pub mod queries;
