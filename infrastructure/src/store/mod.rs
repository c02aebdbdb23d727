//! Storage adapters for the knowledge and cascade store ports.

mod local_store;
mod state;

pub use local_store::LocalStore;
