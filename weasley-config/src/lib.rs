//! Clock configuration
//!
//! Loads the clock face, hand roster, servo calibration and actuator settings
//! from TOML, and merges calibration tables stored by the calibration
//! utility.
//!
//! ```toml
//! [[sector]]
//! id = "home"
//! start_deg = 0
//! end_deg = 360
//! strategy = "midpoint"
//!
//! [[hand]]
//! id = 0
//! owner = "arthur"
//! channel = 0
//! ```

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

extern crate alloc;

#[macro_use]
mod fmt;

mod error;
mod loader;
mod raw;

pub use error::LoadError;
pub use loader::{
    load, load_bytes, CalibrationTable, ClockConfig, EMBEDDED_CONFIG,
    MAX_PREFIX_LEN, MAX_TOML_SIZE,
};
