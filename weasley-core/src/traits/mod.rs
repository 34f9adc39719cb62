//! Hardware abstraction traits
//!
//! These traits define the interface between the application logic
//! and hardware-specific implementations.

pub mod actuator;
pub mod servo;

pub use actuator::HandActuator;
pub use servo::PulseBus;
