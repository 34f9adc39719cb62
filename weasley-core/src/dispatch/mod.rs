//! Update dispatch
//!
//! Turns inbound events into hand commands and announce requests.

pub mod dispatcher;
pub mod link;

pub use dispatcher::{Dispatcher, Reaction};
pub use link::LinkMonitor;
