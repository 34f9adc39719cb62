//! PWM controllers for hand servos

pub mod pca9685;

pub use pca9685::{Pca9685, Pca9685Config, Pca9685Error};
