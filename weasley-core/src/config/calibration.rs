//! Angle → pulse width calibration
//!
//! Each hand's servo gets a table of (face angle, pulse width) points. Pulse
//! widths between points are linearly interpolated. Angles outside the table
//! are rejected instead of clamped, so a bad table never drives a hand to the
//! wrong place.

use heapless::Vec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::error::ClockError;
use crate::units::Angle;

/// Maximum points in one calibration table
pub const MAX_CALIBRATION_POINTS: usize = 16;

/// A single calibration point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CalibrationPoint {
    /// Face angle
    pub angle: Angle,
    /// Pulse width in microseconds
    pub pulse_us: u16,
}

impl CalibrationPoint {
    /// Create a calibration point
    pub const fn new(angle: Angle, pulse_us: u16) -> Self {
        Self { angle, pulse_us }
    }
}

/// Validated calibration table, strictly increasing in angle
///
/// Pulses must be strictly monotonic but may run in either direction, since
/// a servo may be mounted so that a longer pulse turns the hand backwards.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PulseCalibration {
    points: Vec<CalibrationPoint, MAX_CALIBRATION_POINTS>,
}

impl PulseCalibration {
    /// Build a table from points sorted by angle
    pub fn new(points: &[CalibrationPoint]) -> Result<Self, ConfigError> {
        if points.len() < 2 {
            return Err(ConfigError::TooFewCalibrationPoints);
        }

        let points: Vec<CalibrationPoint, MAX_CALIBRATION_POINTS> =
            Vec::from_slice(points).map_err(|_| ConfigError::TooManyCalibrationPoints)?;

        // 0 µs means "never written" to the actuator driver
        if points.iter().any(|p| p.pulse_us == 0) {
            return Err(ConfigError::ZeroPulse);
        }

        let rising = points[1].pulse_us > points[0].pulse_us;
        for pair in points.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if b.angle <= a.angle {
                return Err(ConfigError::NonMonotonicCalibration);
            }
            let ok = if rising {
                b.pulse_us > a.pulse_us
            } else {
                b.pulse_us < a.pulse_us
            };
            if !ok {
                return Err(ConfigError::NonMonotonicCalibration);
            }
        }

        Ok(Self { points })
    }

    /// Derive a two-point table from a servo's pulse range and gearing
    pub fn from_servo_range(range: &ServoRange) -> Result<Self, ConfigError> {
        let start = range.servo_pulse(Angle::ZERO)?;
        let end = range.servo_pulse(Angle::FULL)?;
        Self::new(&[
            CalibrationPoint::new(Angle::ZERO, start),
            CalibrationPoint::new(Angle::FULL, end),
        ])
    }

    /// Pulse width for a face angle
    ///
    /// Returns `OutOfRange` if the angle is outside the calibrated span.
    pub fn pulse_for(&self, angle: Angle) -> Result<u16, ClockError> {
        if !self.contains(angle) {
            return Err(ClockError::OutOfRange);
        }

        for pair in self.points.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if angle <= b.angle {
                return Ok(interpolate(a, b, angle));
            }
        }

        Err(ClockError::OutOfRange)
    }

    /// Lowest calibrated angle
    pub fn min_angle(&self) -> Angle {
        self.points[0].angle
    }

    /// Highest calibrated angle
    pub fn max_angle(&self) -> Angle {
        self.points[self.points.len() - 1].angle
    }

    /// Check if an angle is inside the calibrated span
    pub fn contains(&self, angle: Angle) -> bool {
        angle >= self.min_angle() && angle <= self.max_angle()
    }

    /// Table points
    pub fn points(&self) -> &[CalibrationPoint] {
        &self.points
    }
}

fn interpolate(a: CalibrationPoint, b: CalibrationPoint, angle: Angle) -> u16 {
    let span = (b.angle.centidegrees() - a.angle.centidegrees()) as i64;
    let offset = (angle.centidegrees() - a.angle.centidegrees()) as i64;
    let delta = b.pulse_us as i64 - a.pulse_us as i64;

    let num = delta * offset;
    let step = if num >= 0 {
        (num + span / 2) / span
    } else {
        (num - span / 2) / span
    };

    (a.pulse_us as i64 + step) as u16
}

/// Servo pulse range and gearing between servo shaft and clock hand
///
/// The shaft angle is `face · gear_ratio + offset_deg`; the shaft sweeps
/// `actuation_range_deg` over `pulse_min_us..=pulse_max_us`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ServoRange {
    /// Pulse width at shaft angle 0
    pub pulse_min_us: u16,
    /// Pulse width at full actuation
    pub pulse_max_us: u16,
    /// Shaft travel in degrees
    pub actuation_range_deg: u16,
    /// Shaft degrees per face degree
    pub gear_ratio: u16,
    /// Shaft angle of face 0°
    pub offset_deg: u16,
}

impl Default for ServoRange {
    /// Six-turn sail winch servo on a 2:1 gear, centred in its travel
    fn default() -> Self {
        Self {
            pulse_min_us: 685,
            pulse_max_us: 2070,
            actuation_range_deg: 2160,
            gear_ratio: 2,
            offset_deg: 720,
        }
    }
}

impl ServoRange {
    /// Pulse width for a face angle, before any table is built
    fn servo_pulse(&self, face: Angle) -> Result<u16, ConfigError> {
        if self.pulse_min_us >= self.pulse_max_us || self.actuation_range_deg == 0 {
            return Err(ConfigError::InvalidServoRange);
        }
        if self.gear_ratio == 0 {
            return Err(ConfigError::InvalidServoRange);
        }

        // Shaft angle in centidegrees
        let shaft = face.centidegrees() as u64 * self.gear_ratio as u64
            + self.offset_deg as u64 * 100;
        let travel = self.actuation_range_deg as u64 * 100;
        if shaft > travel {
            return Err(ConfigError::InvalidServoRange);
        }

        let span = (self.pulse_max_us - self.pulse_min_us) as u64;
        let pulse = self.pulse_min_us as u64 + (span * shaft + travel / 2) / travel;
        Ok(pulse as u16)
    }
}

#[cfg(feature = "serde")]
pub use blob::*;

#[cfg(feature = "serde")]
mod blob {
    //! Persisted calibration blob
    //!
    //! Layout: postcard-encoded [`CalibrationBlob`] followed by a
    //! little-endian CRC32 of the encoded bytes.

    use heapless::Vec;
    use serde::{Deserialize, Serialize};

    use super::{CalibrationPoint, PulseCalibration, MAX_CALIBRATION_POINTS};
    use crate::config::{ConfigError, MAX_CHANNELS};

    /// Magic number to identify valid calibration data
    pub const CALIBRATION_MAGIC: u32 = 0x5743_414C; // "WCAL"

    /// Current calibration data version
    pub const CALIBRATION_VERSION: u8 = 1;

    /// Largest encoded blob (header, every channel full, CRC)
    pub const MAX_BLOB_LEN: usize = 16 + MAX_CHANNELS as usize * (2 + MAX_CALIBRATION_POINTS * 8);

    /// Blob decode/encode errors
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub enum BlobError {
        /// Output buffer too small or input truncated
        Truncated,
        /// CRC mismatch
        Crc,
        /// Wrong magic number
        Magic,
        /// Unsupported version
        Version,
        /// Postcard could not encode or decode the body
        Encoding,
        /// Decoded table failed validation
        Invalid(ConfigError),
        /// More channels than the controller has
        TooManyChannels,
    }

    impl From<ConfigError> for BlobError {
        fn from(e: ConfigError) -> Self {
            BlobError::Invalid(e)
        }
    }

    /// Calibration table for one channel
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct ChannelCalibration {
        /// PWM channel
        pub channel: u8,
        /// Raw table points
        pub points: Vec<CalibrationPoint, MAX_CALIBRATION_POINTS>,
    }

    impl ChannelCalibration {
        /// Capture a validated table
        pub fn new(channel: u8, calibration: &PulseCalibration) -> Self {
            let mut points = Vec::new();
            for point in calibration.points() {
                // Capacities match, so this never drops a point
                let _ = points.push(*point);
            }
            Self { channel, points }
        }

        /// Rebuild and validate the table
        pub fn calibration(&self) -> Result<PulseCalibration, ConfigError> {
            PulseCalibration::new(&self.points)
        }
    }

    /// Calibration data for every channel, as stored in flash
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct CalibrationBlob {
        /// Magic number for validation
        pub magic: u32,
        /// Data format version
        pub version: u8,
        /// Per-channel tables
        pub channels: Vec<ChannelCalibration, { MAX_CHANNELS as usize }>,
    }

    impl Default for CalibrationBlob {
        fn default() -> Self {
            Self::new()
        }
    }

    impl CalibrationBlob {
        /// Create an empty blob
        pub const fn new() -> Self {
            Self {
                magic: CALIBRATION_MAGIC,
                version: CALIBRATION_VERSION,
                channels: Vec::new(),
            }
        }

        /// Set the table for a channel, replacing any previous one
        pub fn set(&mut self, channel: u8, calibration: &PulseCalibration) -> Result<(), BlobError> {
            if channel >= MAX_CHANNELS {
                return Err(BlobError::TooManyChannels);
            }
            let entry = ChannelCalibration::new(channel, calibration);
            if let Some(slot) = self.channels.iter_mut().find(|c| c.channel == channel) {
                *slot = entry;
                return Ok(());
            }
            self.channels
                .push(entry)
                .map_err(|_| BlobError::TooManyChannels)
        }

        /// Validated table for a channel, if present
        pub fn get(&self, channel: u8) -> Option<Result<PulseCalibration, ConfigError>> {
            self.channels
                .iter()
                .find(|c| c.channel == channel)
                .map(ChannelCalibration::calibration)
        }

        /// Encode into `buf`, returning the used prefix
        pub fn encode<'a>(&self, buf: &'a mut [u8]) -> Result<&'a [u8], BlobError> {
            let body_len = postcard::to_slice(self, buf)
                .map_err(|e| match e {
                    postcard::Error::SerializeBufferFull => BlobError::Truncated,
                    _ => BlobError::Encoding,
                })?
                .len();

            let crc = crc32(&buf[..body_len]);
            let total = body_len + 4;
            if buf.len() < total {
                return Err(BlobError::Truncated);
            }
            buf[body_len..total].copy_from_slice(&crc.to_le_bytes());
            Ok(&buf[..total])
        }

        /// Decode and validate a stored blob
        pub fn decode(bytes: &[u8]) -> Result<Self, BlobError> {
            if bytes.len() < 4 {
                return Err(BlobError::Truncated);
            }
            let (body, crc_bytes) = bytes.split_at(bytes.len() - 4);
            let stored = u32::from_le_bytes([crc_bytes[0], crc_bytes[1], crc_bytes[2], crc_bytes[3]]);
            if crc32(body) != stored {
                return Err(BlobError::Crc);
            }

            let blob: Self = postcard::from_bytes(body).map_err(|_| BlobError::Encoding)?;
            if blob.magic != CALIBRATION_MAGIC {
                return Err(BlobError::Magic);
            }
            if blob.version != CALIBRATION_VERSION {
                return Err(BlobError::Version);
            }
            for entry in blob.channels.iter() {
                if entry.channel >= MAX_CHANNELS {
                    return Err(BlobError::TooManyChannels);
                }
                entry.calibration()?;
            }

            Ok(blob)
        }
    }

    /// CRC32 (IEEE 802.3 polynomial)
    pub fn crc32(data: &[u8]) -> u32 {
        const POLY: u32 = 0xEDB88320;
        let mut crc: u32 = 0xFFFF_FFFF;

        for &byte in data {
            crc ^= byte as u32;
            for _ in 0..8 {
                if crc & 1 != 0 {
                    crc = (crc >> 1) ^ POLY;
                } else {
                    crc >>= 1;
                }
            }
        }

        !crc
    }
}
