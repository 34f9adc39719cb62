//! Clock face geometry
//!
//! A clock face is a set of named sectors that partition the full circle.
//! Each sector carries the strategy used to place a hand inside it.

use heapless::{String, Vec};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::units::{Angle, Distance};

/// Maximum sectors on one face
pub const MAX_SECTORS: usize = 16;

/// Maximum sector identifier length (matches the message `state` field)
pub const MAX_SECTOR_ID_LEN: usize = weasley_protocol::MAX_STATE_LEN;

/// Maximum sector label length
pub const MAX_SECTOR_LABEL_LEN: usize = 24;

/// Sector identifier as carried by location messages (e.g. "work")
pub type SectorId = String<MAX_SECTOR_ID_LEN>;

/// Which edge of a distance-scaled sector is closest to Home
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum HomeEdge {
    /// Angle grows with distance
    #[default]
    Start,
    /// Angle shrinks with distance
    End,
}

/// Hand placement strategy within a sector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Strategy {
    /// Position follows a log-compressed distance from Home
    DistanceScaled {
        /// Edge of the sector that represents "at Home"
        home_edge: HomeEdge,
        /// Below this distance, hands are placed by subdivision instead
        near_home: Option<Distance>,
    },
    /// Sector split into one slot per hand
    FixedSubdivision,
    /// Always the sector's midpoint
    Midpoint,
}

impl Strategy {
    /// Distance-scaled with no near-home fallback
    pub const fn distance(home_edge: HomeEdge) -> Self {
        Strategy::DistanceScaled {
            home_edge,
            near_home: None,
        }
    }
}

/// One named region of the clock face, covering `[start, end)`
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Sector {
    /// Identifier used by location messages
    pub id: SectorId,
    /// Display name (e.g. "In Transit")
    pub label: String<MAX_SECTOR_LABEL_LEN>,
    /// Inclusive start angle
    pub start: Angle,
    /// Exclusive end angle
    pub end: Angle,
    /// Placement strategy
    pub strategy: Strategy,
}

impl Sector {
    /// Create a validated sector
    pub fn new(
        id: &str,
        label: &str,
        start: Angle,
        end: Angle,
        strategy: Strategy,
    ) -> Result<Self, ConfigError> {
        if start >= end {
            return Err(ConfigError::EmptyRange);
        }
        if end > Angle::FULL {
            return Err(ConfigError::RangeOutOfBounds);
        }
        if let Strategy::DistanceScaled {
            near_home: Some(threshold),
            ..
        } = strategy
        {
            if threshold == Distance::ZERO || threshold >= Distance::FAR {
                return Err(ConfigError::InvalidNearHome);
            }
        }

        Ok(Self {
            id: String::try_from(id).map_err(|_| ConfigError::IdTooLong)?,
            label: String::try_from(label).map_err(|_| ConfigError::LabelTooLong)?,
            start,
            end,
            strategy,
        })
    }

    /// Width in centidegrees
    pub fn width(&self) -> u32 {
        self.end.centidegrees() - self.start.centidegrees()
    }

    /// Angular midpoint
    pub fn midpoint(&self) -> Angle {
        Angle::from_centidegrees(self.start.centidegrees() + self.width() / 2)
    }

    /// Check if an angle falls inside `[start, end)`
    pub fn contains(&self, angle: Angle) -> bool {
        angle >= self.start && angle < self.end
    }
}

/// Validated set of sectors partitioning 0..360°
///
/// Sectors are kept sorted by start angle.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SectorMap {
    sectors: Vec<Sector, MAX_SECTORS>,
}

impl SectorMap {
    /// Build a map, checking that the sectors cover the circle exactly once
    pub fn new<I>(sectors: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = Sector>,
    {
        let mut list: Vec<Sector, MAX_SECTORS> = Vec::new();
        for sector in sectors {
            if list.iter().any(|s| s.id == sector.id) {
                return Err(ConfigError::DuplicateSector);
            }
            list.push(sector).map_err(|_| ConfigError::TooManySectors)?;
        }

        if list.is_empty() {
            return Err(ConfigError::EmptySectorMap);
        }

        list.sort_unstable_by_key(|s| s.start);

        let mut cursor = Angle::ZERO;
        for sector in list.iter() {
            if sector.start < cursor {
                return Err(ConfigError::Overlap);
            }
            if sector.start > cursor {
                return Err(ConfigError::Gap);
            }
            cursor = sector.end;
        }
        if cursor != Angle::FULL {
            return Err(ConfigError::Gap);
        }

        Ok(Self { sectors: list })
    }

    /// Look up a sector by identifier
    pub fn get(&self, id: &str) -> Option<&Sector> {
        self.sectors.iter().find(|s| s.id.as_str() == id)
    }

    /// Sector containing a face angle
    pub fn sector_at(&self, angle: Angle) -> Option<&Sector> {
        self.sectors.iter().find(|s| s.contains(angle))
    }

    /// Iterate sectors in angular order
    pub fn iter(&self) -> impl Iterator<Item = &Sector> {
        self.sectors.iter()
    }

    /// Number of sectors
    pub fn len(&self) -> usize {
        self.sectors.len()
    }

    /// Always false for a validated map
    pub fn is_empty(&self) -> bool {
        self.sectors.is_empty()
    }
}
