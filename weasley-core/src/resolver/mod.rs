//! Position resolution
//!
//! Turns a location update into a target face angle. Resolution is a pure
//! function of the update, the sector and the hand's slot, so the same input
//! always puts a hand in the same place.

pub mod log_scale;
pub mod position;

pub use log_scale::log_scale;
pub use position::{place, resolve, resolve_in, subdivision, EDGE_MARGIN_PPM};
