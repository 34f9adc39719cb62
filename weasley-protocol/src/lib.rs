//! Location clock message protocol
//!
//! This crate defines the publish/subscribe messages exchanged between
//! location sources (phone trackers, home automation, scripts) and the clock.
//! The transport itself (broker connection, TLS, reconnects) lives outside
//! the clock; this crate only turns topics and payloads into validated
//! reports, and builds the one outbound message the clock ever sends.
//!
//! # Message Overview
//!
//! ```text
//! topic:   <prefix>/<person>          e.g. weasleyclock/susan
//! payload: {"state": "work", "distance": 4.2}
//!
//! topic:   <prefix>/UPDATE            announce request (clock → sources)
//! payload: {"update":"true"}
//! ```
//!
//! `distance` is in miles from Home. Reports that only carry `latitude` and
//! `longitude` get a great-circle distance from the configured Home instead.
//! Either way the distance is normalized against [`MAX_DISTANCE_MILES`]
//! before it reaches the position resolver.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

extern crate alloc;

pub mod geo;
pub mod messages;
pub mod topic;

pub use geo::Coordinates;
pub use messages::{
    AnnounceRequest, LocationReport, MessageError, DISTANCE_FULL_SCALE, MAX_DISTANCE_MILES,
    MAX_PAYLOAD_LEN, MAX_STATE_LEN,
};
pub use topic::{Topic, DEFAULT_PREFIX, MAX_NAME_LEN, MAX_TOPIC_LEN, UPDATE_TOPIC};
