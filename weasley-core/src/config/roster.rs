//! Hand roster
//!
//! Binds each physical hand to an actuator channel and to the person it
//! follows. Roster order defines each hand's slot, which keeps subdivision
//! placement stable across restarts.

use heapless::{String, Vec};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::units::Angle;

/// Maximum hands on one clock
pub const MAX_HANDS: usize = 8;

/// Channels available on the PWM controller
pub const MAX_CHANNELS: u8 = 16;

/// Maximum owner (person) identifier length
pub const MAX_OWNER_LEN: usize = weasley_protocol::MAX_NAME_LEN;

/// Person identifier as carried by message topics
pub type OwnerId = String<MAX_OWNER_LEN>;

/// Hand identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct HandId(pub u8);

/// Static configuration of one hand
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HandConfig {
    /// Hand identifier
    pub id: HandId,
    /// Person this hand follows
    pub owner: OwnerId,
    /// PWM channel driving the hand's servo
    pub channel: u8,
    /// Per-hand smoothing override (maximum face angle per step)
    pub max_step: Option<Angle>,
}

impl HandConfig {
    /// Create a hand config
    pub fn new(id: u8, owner: &str, channel: u8) -> Result<Self, ConfigError> {
        Ok(Self {
            id: HandId(id),
            owner: String::try_from(owner).map_err(|_| ConfigError::IdTooLong)?,
            channel,
            max_step: None,
        })
    }

    /// Set the smoothing override
    pub fn with_max_step(mut self, max_step: Angle) -> Self {
        self.max_step = Some(max_step);
        self
    }
}

/// Validated list of hands
#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Roster {
    hands: Vec<HandConfig, MAX_HANDS>,
}

impl Roster {
    /// Build a roster, rejecting shared owners, identifiers or channels
    pub fn new<I>(hands: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = HandConfig>,
    {
        let mut list: Vec<HandConfig, MAX_HANDS> = Vec::new();
        for hand in hands {
            if hand.channel >= MAX_CHANNELS {
                return Err(ConfigError::ChannelOutOfRange);
            }
            for existing in list.iter() {
                if existing.id == hand.id {
                    return Err(ConfigError::DuplicateHand);
                }
                if existing.owner == hand.owner {
                    return Err(ConfigError::DuplicateOwner);
                }
                if existing.channel == hand.channel {
                    return Err(ConfigError::DuplicateChannel);
                }
            }
            list.push(hand).map_err(|_| ConfigError::TooManyHands)?;
        }

        if list.is_empty() {
            return Err(ConfigError::EmptyRoster);
        }

        Ok(Self { hands: list })
    }

    /// Find the hand following `owner`, with its slot index
    pub fn find_by_owner(&self, owner: &str) -> Option<(u8, &HandConfig)> {
        self.hands
            .iter()
            .enumerate()
            .find(|(_, h)| h.owner.as_str() == owner)
            .map(|(slot, h)| (slot as u8, h))
    }

    /// Find a hand by identifier
    pub fn get(&self, id: HandId) -> Option<&HandConfig> {
        self.hands.iter().find(|h| h.id == id)
    }

    /// Iterate hands in slot order
    pub fn iter(&self) -> impl Iterator<Item = &HandConfig> {
        self.hands.iter()
    }

    /// Number of hands
    pub fn len(&self) -> usize {
        self.hands.len()
    }

    /// Always false for a validated roster
    pub fn is_empty(&self) -> bool {
        self.hands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roster_slots_follow_order() {
        let roster = Roster::new([
            HandConfig::new(0, "arthur", 0).unwrap(),
            HandConfig::new(1, "molly", 1).unwrap(),
            HandConfig::new(2, "ginny", 4).unwrap(),
        ])
        .unwrap();

        let (slot, hand) = roster.find_by_owner("ginny").unwrap();
        assert_eq!(slot, 2);
        assert_eq!(hand.channel, 4);
        assert!(roster.find_by_owner("percy").is_none());
        assert_eq!(roster.get(HandId(1)).unwrap().owner.as_str(), "molly");
        assert_eq!(roster.len(), 3);
    }

    #[test]
    fn test_roster_rejects_shared_resources() {
        let dup_owner = Roster::new([
            HandConfig::new(0, "fred", 0).unwrap(),
            HandConfig::new(1, "fred", 1).unwrap(),
        ]);
        assert_eq!(dup_owner.unwrap_err(), ConfigError::DuplicateOwner);

        let dup_channel = Roster::new([
            HandConfig::new(0, "fred", 3).unwrap(),
            HandConfig::new(1, "george", 3).unwrap(),
        ]);
        assert_eq!(dup_channel.unwrap_err(), ConfigError::DuplicateChannel);

        let dup_id = Roster::new([
            HandConfig::new(0, "fred", 0).unwrap(),
            HandConfig::new(0, "george", 1).unwrap(),
        ]);
        assert_eq!(dup_id.unwrap_err(), ConfigError::DuplicateHand);
    }

    #[test]
    fn test_roster_rejects_bad_channel_and_empty() {
        let result = Roster::new([HandConfig::new(0, "bill", MAX_CHANNELS).unwrap()]);
        assert_eq!(result.unwrap_err(), ConfigError::ChannelOutOfRange);

        let result = Roster::new(core::iter::empty());
        assert_eq!(result.unwrap_err(), ConfigError::EmptyRoster);
    }

    #[test]
    fn test_max_step_override() {
        let hand = HandConfig::new(0, "charlie", 0)
            .unwrap()
            .with_max_step(Angle::from_degrees(2));
        assert_eq!(hand.max_step, Some(Angle::from_degrees(2)));
    }
}
