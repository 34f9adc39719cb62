//! Hardware driver implementations
//!
//! This crate provides concrete implementations of the traits defined
//! in weasley-core:
//!
//! - PCA9685 16-channel I²C PWM controller ([`servo::Pca9685`])
//! - Async hand actuator with bus exclusivity, smoothing, retries and
//!   per-hand recovery ([`actuator::HandActuatorDriver`])

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

#[macro_use]
mod fmt;

pub mod actuator;
pub mod servo;

pub use actuator::{ActuatorConfig, DriveOutcome, HandActuatorDriver, HandStatus, RetryPolicy};
pub use servo::{Pca9685, Pca9685Error};
