//! Fixed-point units
//!
//! Face angles are stored in centidegrees and distances in parts per
//! million so that resolution is exact integer math and identical inputs
//! always give identical angles.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Centidegrees in a full turn of the clock face
pub const FULL_CIRCLE_CD: u32 = 36_000;

/// Full-scale normalized distance (1.0)
pub const DISTANCE_FULL_SCALE: u32 = weasley_protocol::DISTANCE_FULL_SCALE;

/// Angle on the clock face, in centidegrees (0.01°)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Angle(u32);

impl Angle {
    /// 0°
    pub const ZERO: Self = Self(0);

    /// 360°
    pub const FULL: Self = Self(FULL_CIRCLE_CD);

    /// Create from centidegrees
    pub const fn from_centidegrees(cd: u32) -> Self {
        Self(cd)
    }

    /// Create from whole degrees
    pub const fn from_degrees(degrees: u16) -> Self {
        Self(degrees as u32 * 100)
    }

    /// Value in centidegrees
    pub const fn centidegrees(self) -> u32 {
        self.0
    }

    /// Value truncated to whole degrees
    pub const fn whole_degrees(self) -> u32 {
        self.0 / 100
    }

    /// Absolute difference in centidegrees
    pub const fn abs_diff(self, other: Self) -> u32 {
        self.0.abs_diff(other.0)
    }
}

/// Normalized distance from Home: 0 = at Home, [`Distance::FAR`] = maximally far
///
/// Stored as parts per million so that one mile (1/10 000 of full scale)
/// still resolves to a visible hand movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Distance(u32);

impl Distance {
    /// At Home
    pub const ZERO: Self = Self(0);

    /// Maximally far (1.0)
    pub const FAR: Self = Self(DISTANCE_FULL_SCALE);

    /// Create from parts per million, clamping to [`Distance::FAR`]
    pub const fn from_ppm(ppm: u32) -> Self {
        if ppm > DISTANCE_FULL_SCALE {
            Self(DISTANCE_FULL_SCALE)
        } else {
            Self(ppm)
        }
    }

    /// Create from a value in thousandths (0..=1000)
    pub const fn from_permille(permille: u16) -> Self {
        Self::from_ppm(permille as u32 * 1000)
    }

    /// Create from miles away from Home
    pub fn from_miles(miles: f32) -> Self {
        Self::from_ppm(weasley_protocol::messages::miles_to_ppm(miles))
    }

    /// Value in parts per million
    pub const fn ppm(self) -> u32 {
        self.0
    }
}
