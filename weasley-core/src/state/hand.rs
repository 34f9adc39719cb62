//! Per-hand logical state

use heapless::Vec;

use crate::config::{HandConfig, HandId, Roster, MAX_HANDS};
use crate::units::Angle;

/// One hand as the dispatcher sees it
///
/// `angle` is the last successfully commanded angle, not the physical
/// position; the actuator driver tracks the latter.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Hand {
    /// Static configuration
    pub config: HandConfig,
    /// Position in the roster
    pub slot: u8,
    /// Last commanded angle (park angle until the first update)
    pub angle: Angle,
    /// Receipt time of the last applied update
    pub updated_ms: Option<u64>,
}

impl Hand {
    /// Hand identifier
    pub fn id(&self) -> HandId {
        self.config.id
    }

    /// Returns true until the first update has been applied
    pub fn is_parked(&self) -> bool {
        self.updated_ms.is_none()
    }

    /// Record a successfully commanded angle
    pub fn apply(&mut self, angle: Angle, received_ms: u64) {
        self.angle = angle;
        self.updated_ms = Some(received_ms);
    }
}

/// All hands, in roster order
#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HandTable {
    hands: Vec<Hand, MAX_HANDS>,
}

impl HandTable {
    /// Create one parked hand per roster entry
    pub fn new(roster: &Roster, park: Angle) -> Self {
        let mut hands = Vec::new();
        for (slot, config) in roster.iter().enumerate() {
            // Roster and table share a capacity
            let _ = hands.push(Hand {
                config: config.clone(),
                slot: slot as u8,
                angle: park,
                updated_ms: None,
            });
        }
        Self { hands }
    }

    /// Hand following `owner`
    pub fn by_owner_mut(&mut self, owner: &str) -> Option<&mut Hand> {
        self.hands
            .iter_mut()
            .find(|h| h.config.owner.as_str() == owner)
    }

    /// Hand by identifier
    pub fn get(&self, id: HandId) -> Option<&Hand> {
        self.hands.iter().find(|h| h.id() == id)
    }

    /// Iterate hands in slot order
    pub fn iter(&self) -> impl Iterator<Item = &Hand> {
        self.hands.iter()
    }

    /// Number of hands
    pub fn len(&self) -> usize {
        self.hands.len()
    }

    /// Returns true if there are no hands
    pub fn is_empty(&self) -> bool {
        self.hands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> Roster {
        Roster::new([
            HandConfig::new(0, "bill", 0).unwrap(),
            HandConfig::new(1, "charlie", 1).unwrap(),
        ])
        .unwrap()
    }

    #[test]
    fn test_table_starts_parked() {
        let table = HandTable::new(&roster(), Angle::from_degrees(350));
        assert_eq!(table.len(), 2);
        for (slot, hand) in table.iter().enumerate() {
            assert_eq!(hand.slot as usize, slot);
            assert_eq!(hand.angle, Angle::from_degrees(350));
            assert!(hand.is_parked());
        }
    }

    #[test]
    fn test_apply_updates_owner_only() {
        let mut table = HandTable::new(&roster(), Angle::ZERO);
        table
            .by_owner_mut("charlie")
            .unwrap()
            .apply(Angle::from_degrees(90), 7);

        let charlie = table.get(HandId(1)).unwrap();
        assert_eq!(charlie.angle, Angle::from_degrees(90));
        assert_eq!(charlie.updated_ms, Some(7));

        let bill = table.get(HandId(0)).unwrap();
        assert!(bill.is_parked());
        assert!(table.by_owner_mut("percy").is_none());
    }
}
