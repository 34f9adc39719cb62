//! Events flowing into and out of the dispatcher

use heapless::String;
use weasley_protocol::{Coordinates, LocationReport};

use crate::config::{HandId, OwnerId, SectorId};
use crate::error::ClockError;
use crate::units::{Angle, Distance};

/// A validated location update for one person
///
/// Built by the messaging boundary and consumed once by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LocationUpdate {
    /// Person the update is about
    pub owner: OwnerId,
    /// Sector identifier (e.g. "work")
    pub sector: SectorId,
    /// Normalized distance from Home, absent for fixed-place sectors
    pub distance: Option<Distance>,
    /// Receipt time in milliseconds since boot
    pub received_ms: u64,
}

impl LocationUpdate {
    /// Create an update with no distance, received at time zero
    ///
    /// An owner name that no roster could hold is reported as
    /// `UnboundOwner`; an over-long sector name as `UnknownSector`.
    pub fn new(owner: &str, sector: &str) -> Result<Self, ClockError> {
        Ok(Self {
            owner: String::try_from(owner).map_err(|_| ClockError::UnboundOwner)?,
            sector: String::try_from(sector).map_err(|_| ClockError::UnknownSector)?,
            distance: None,
            received_ms: 0,
        })
    }

    /// Set the distance
    pub fn with_distance(mut self, distance: Distance) -> Self {
        self.distance = Some(distance);
        self
    }

    /// Set the receipt time
    pub fn at(mut self, received_ms: u64) -> Self {
        self.received_ms = received_ms;
        self
    }

    /// Convert a decoded message into an update
    ///
    /// With a `home` position, reports that carry coordinates but no
    /// (or a zero) distance are placed by their great-circle distance.
    pub fn from_report(
        report: &LocationReport,
        home: Option<&Coordinates>,
        received_ms: u64,
    ) -> Self {
        Self {
            owner: report.person.clone(),
            sector: report.state.clone(),
            distance: report.distance_ppm_from(home).map(Distance::from_ppm),
            received_ms,
        }
    }
}

/// Resolved command for one hand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HandCommand {
    /// Target hand
    pub hand: HandId,
    /// Target face angle
    pub target: Angle,
    /// Maximum face angle per smoothing step, overriding the driver default
    pub max_step: Option<Angle>,
}

impl HandCommand {
    /// Command with the driver's default smoothing
    pub const fn new(hand: HandId, target: Angle) -> Self {
        Self {
            hand,
            target,
            max_step: None,
        }
    }
}

/// Messaging link transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkEvent {
    /// Link to the broker is up
    Connected,
    /// Link to the broker went down
    Disconnected,
}

/// Everything the dispatcher reacts to
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockEvent {
    /// A person's location changed
    Location(LocationUpdate),
    /// Messaging link state changed
    Link(LinkEvent),
}

impl From<LocationUpdate> for ClockEvent {
    fn from(update: LocationUpdate) -> Self {
        ClockEvent::Location(update)
    }
}

impl From<LinkEvent> for ClockEvent {
    fn from(event: LinkEvent) -> Self {
        ClockEvent::Link(event)
    }
}
