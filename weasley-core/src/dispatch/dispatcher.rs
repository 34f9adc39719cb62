//! Update dispatcher
//!
//! Single consumer of inbound events. Each location update is resolved
//! against the sector map, handed to the actuator, and recorded on the hand
//! only once the actuator has accepted it.

use weasley_protocol::AnnounceRequest;

use super::link::LinkMonitor;
use crate::config::{HandId, Roster, SectorMap};
use crate::error::ClockError;
use crate::resolver;
use crate::state::{ClockEvent, Hand, HandCommand, HandTable, LinkEvent, LocationUpdate};
use crate::traits::HandActuator;
use crate::units::Angle;

/// Outcome of processing one event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Reaction {
    /// A command was accepted by the actuator
    Commanded(HandCommand),
    /// The update was dropped; the hand keeps its last position
    Rejected(ClockError),
    /// The messaging boundary should publish an announce request
    Announce(AnnounceRequest),
    /// Nothing to do
    Idle,
}

/// Routes location updates to hands
pub struct Dispatcher<'a, A> {
    sectors: &'a SectorMap,
    hands: HandTable,
    link: LinkMonitor,
    actuator: A,
}

impl<'a, A: HandActuator> Dispatcher<'a, A> {
    /// Create a dispatcher with every hand parked at `park`
    pub fn new(sectors: &'a SectorMap, roster: &Roster, park: Angle, actuator: A) -> Self {
        Self {
            sectors,
            hands: HandTable::new(roster, park),
            link: LinkMonitor::new(),
            actuator,
        }
    }

    /// Resolve an update into a command without touching any state
    pub fn resolve(&self, update: &LocationUpdate) -> Result<HandCommand, ClockError> {
        let hand = self
            .hands
            .iter()
            .find(|h| h.config.owner == update.owner)
            .ok_or(ClockError::UnboundOwner)?;

        let count = self.hands.len() as u8;
        let target = resolver::resolve_in(self.sectors, update, hand.slot, count)?;

        Ok(HandCommand {
            hand: hand.id(),
            target,
            max_step: hand.config.max_step,
        })
    }

    /// Resolve an update, submit it, and record the new angle
    ///
    /// On error the hand's angle and timestamp are left untouched.
    pub fn dispatch(&mut self, update: &LocationUpdate) -> Result<HandCommand, ClockError> {
        let result = self
            .resolve(update)
            .and_then(|command| self.actuator.submit(command).map(|()| command));

        match result {
            Ok(command) => {
                if let Some(hand) = self.hands.by_owner_mut(&update.owner) {
                    hand.apply(command.target, update.received_ms);
                }
                debug!(
                    "{} -> {} at {} cd",
                    update.owner.as_str(),
                    update.sector.as_str(),
                    command.target.centidegrees()
                );
                Ok(command)
            }
            Err(e) => {
                match e {
                    ClockError::UnknownSector => {
                        warn!(
                            "{}: unknown sector {}",
                            update.owner.as_str(),
                            update.sector.as_str()
                        );
                    }
                    ClockError::UnboundOwner => {
                        warn!("no hand for {}", update.owner.as_str());
                    }
                    other => {
                        error!("{}: command rejected: {}", update.owner.as_str(), other);
                    }
                }
                Err(e)
            }
        }
    }

    /// Track a link transition, returning the announce to publish, if any
    pub fn on_link(&mut self, event: LinkEvent) -> Option<AnnounceRequest> {
        self.link.on_event(event)
    }

    /// Process one inbound event
    pub fn process(&mut self, event: ClockEvent) -> Reaction {
        match event {
            ClockEvent::Location(update) => match self.dispatch(&update) {
                Ok(command) => Reaction::Commanded(command),
                Err(e) => Reaction::Rejected(e),
            },
            ClockEvent::Link(link) => match self.on_link(link) {
                Some(announce) => Reaction::Announce(announce),
                None => Reaction::Idle,
            },
        }
    }

    /// Hand by identifier
    pub fn hand(&self, id: HandId) -> Option<&Hand> {
        self.hands.get(id)
    }

    /// All hands in roster order
    pub fn hands(&self) -> impl Iterator<Item = &Hand> {
        self.hands.iter()
    }

    /// Link state
    pub fn link(&self) -> &LinkMonitor {
        &self.link
    }

    /// The wrapped actuator
    pub fn actuator(&self) -> &A {
        &self.actuator
    }
}
