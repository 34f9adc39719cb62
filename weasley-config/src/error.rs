//! Configuration load errors

use weasley_core::config::{BlobError, ConfigError};

/// Errors raised while loading a clock configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LoadError {
    /// Not valid UTF-8
    InvalidUtf8,
    /// TOML syntax error, unknown key or wrong value type
    Parse,
    /// Angle or distance that is negative, not finite or past its range
    InvalidNumber,
    /// Calibration entry gives both points and a servo range
    ConflictingCalibration,
    /// Topic prefix too long or empty
    InvalidPrefix,
    /// Home position incomplete or out of range
    InvalidHome,
    /// Values parsed but failed validation
    Config(ConfigError),
    /// Stored calibration blob was rejected
    Blob(BlobError),
}

impl From<ConfigError> for LoadError {
    fn from(e: ConfigError) -> Self {
        LoadError::Config(e)
    }
}

impl From<BlobError> for LoadError {
    fn from(e: BlobError) -> Self {
        LoadError::Blob(e)
    }
}
