//! Board-agnostic core logic for the location clock
//!
//! This crate contains all application logic that does not depend on
//! specific hardware implementations:
//!
//! - Fixed-point units (face angles, normalized distance)
//! - Clock face geometry (sectors) and the hand roster
//! - Angle → pulse width calibration tables
//! - Position resolution (distance-scaled, subdivision, midpoint)
//! - Motion smoothing plans
//! - Per-hand state and the update dispatcher
//! - Hardware abstraction traits (pulse bus, hand actuator)

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

#[macro_use]
mod fmt;

pub mod config;
pub mod dispatch;
pub mod error;
pub mod motion;
pub mod resolver;
pub mod state;
pub mod traits;
pub mod units;

pub use error::ClockError;
pub use units::{Angle, Distance};
