//! Configuration types
//!
//! Clock face geometry, hand roster and pulse calibration. All of these are
//! validated once at startup and are read-only afterwards.

pub mod calibration;
pub mod roster;
pub mod sector;

pub use calibration::*;
pub use roster::*;
pub use sector::*;

/// Configuration validation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Identifier exceeds its fixed capacity
    IdTooLong,
    /// Label exceeds its fixed capacity
    LabelTooLong,
    /// Sector range has zero or negative width
    EmptyRange,
    /// Sector range extends past 360°
    RangeOutOfBounds,
    /// Near-home threshold is zero or not below full scale
    InvalidNearHome,
    /// Two sectors share an identifier
    DuplicateSector,
    /// More sectors than [`MAX_SECTORS`]
    TooManySectors,
    /// No sectors at all
    EmptySectorMap,
    /// Sectors leave part of the circle uncovered
    Gap,
    /// Two sectors overlap
    Overlap,
    /// Two hands share an owner
    DuplicateOwner,
    /// Two hands share an identifier
    DuplicateHand,
    /// Two hands share an actuator channel
    DuplicateChannel,
    /// Actuator channel outside the controller's channel count
    ChannelOutOfRange,
    /// More hands than [`MAX_HANDS`]
    TooManyHands,
    /// No hands at all
    EmptyRoster,
    /// Calibration needs at least two points
    TooFewCalibrationPoints,
    /// More points than [`MAX_CALIBRATION_POINTS`]
    TooManyCalibrationPoints,
    /// Calibration angles or pulses are not strictly monotonic
    NonMonotonicCalibration,
    /// Calibration point with a 0 µs pulse
    ZeroPulse,
    /// Servo range cannot cover the full clock face
    InvalidServoRange,
}
