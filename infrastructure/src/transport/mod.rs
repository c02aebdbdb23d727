//! Transport adapters

mod broadcast;
mod outbox;

pub use broadcast::{BroadcastTransport, BusMessage};
pub use outbox::JsonlOutboxTransport;
