//! Hand actuator trait
//!
//! The dispatcher hands resolved commands to an actuator and moves on. The
//! actuator validates the command synchronously and performs the move
//! asynchronously.

use crate::error::ClockError;
use crate::state::HandCommand;

/// Accepts commands for hands
pub trait HandActuator {
    /// Validate and queue a command
    ///
    /// Fails without side effects if the hand is unknown, unavailable, or the
    /// target is outside its calibration. A queued command supersedes any
    /// move still in flight for the same hand.
    fn submit(&self, command: HandCommand) -> Result<(), ClockError>;
}

impl<T: HandActuator + ?Sized> HandActuator for &T {
    fn submit(&self, command: HandCommand) -> Result<(), ClockError> {
        T::submit(self, command)
    }
}
