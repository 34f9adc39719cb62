//! Motion planning
//!
//! Splits large hand moves into evenly spaced intermediate steps.

pub mod planner;

pub use planner::{MotionPlan, SmoothingConfig};
