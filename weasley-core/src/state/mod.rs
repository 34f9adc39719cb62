//! Runtime state
//!
//! Inbound events and the per-hand state the dispatcher keeps between them.

pub mod events;
pub mod hand;

pub use events::{ClockEvent, HandCommand, LinkEvent, LocationUpdate};
pub use hand::{Hand, HandTable};
