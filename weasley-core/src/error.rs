//! Per-update error taxonomy
//!
//! Every kind is recoverable at the level of a single update: the affected
//! hand stays at its last good position and other hands are unaffected.

/// Errors raised while resolving or actuating one update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockError {
    /// Update names a sector that is not on the clock face
    UnknownSector,
    /// No hand is bound to the update's owner
    UnboundOwner,
    /// Target angle lies outside the calibrated pulse range
    OutOfRange,
    /// Hand's actuator failed past its retry budget
    ActuatorUnavailable,
    /// Command names a hand the actuator driver does not know
    UnknownHand,
}

impl ClockError {
    /// Returns true if this points at a configuration or calibration defect
    /// rather than at the incoming data or the hardware
    pub fn is_configuration_defect(&self) -> bool {
        matches!(self, ClockError::OutOfRange | ClockError::UnknownHand)
    }

    /// Returns true if the hardware is at fault
    pub fn is_hardware_fault(&self) -> bool {
        matches!(self, ClockError::ActuatorUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(ClockError::OutOfRange.is_configuration_defect());
        assert!(ClockError::UnknownHand.is_configuration_defect());
        assert!(!ClockError::UnknownSector.is_configuration_defect());
        assert!(!ClockError::UnboundOwner.is_configuration_defect());
        assert!(ClockError::ActuatorUnavailable.is_hardware_fault());
        assert!(!ClockError::OutOfRange.is_hardware_fault());
    }
}
