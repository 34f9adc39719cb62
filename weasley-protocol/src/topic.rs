//! Topic routing
//!
//! Every location message is published on `<prefix>/<person>`. The clock
//! subscribes to `<prefix>/#` and therefore also receives its own announce
//! requests on `<prefix>/UPDATE`, which must be ignored.

use heapless::String;

use crate::messages::MessageError;

/// Default topic prefix
pub const DEFAULT_PREFIX: &str = "weasleyclock";

/// Topic suffix reserved for announce requests
pub const UPDATE_TOPIC: &str = "UPDATE";

/// Maximum person name length
pub const MAX_NAME_LEN: usize = 16;

/// Maximum full topic length
pub const MAX_TOPIC_LEN: usize = 64;

/// A routed topic
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Topic {
    /// Location message for one person
    Person(String<MAX_NAME_LEN>),
    /// Announce request echo (ignored by the clock)
    UpdateRequest,
}

impl Topic {
    /// Parse a topic published under `prefix`
    ///
    /// Everything after the first `/` is the person name, matching how
    /// location sources publish (`weasleyclock/susan`).
    pub fn parse(topic: &str, prefix: &str) -> Result<Self, MessageError> {
        let (head, name) = topic.split_once('/').ok_or(MessageError::MalformedTopic)?;

        if head != prefix {
            return Err(MessageError::ForeignTopic);
        }
        if name.is_empty() {
            return Err(MessageError::MalformedTopic);
        }
        if name == UPDATE_TOPIC {
            return Ok(Topic::UpdateRequest);
        }

        let name = String::try_from(name).map_err(|_| MessageError::NameTooLong)?;
        Ok(Topic::Person(name))
    }

    /// Person name, if this is a location topic
    pub fn person(&self) -> Option<&str> {
        match self {
            Topic::Person(name) => Some(name.as_str()),
            Topic::UpdateRequest => None,
        }
    }

    /// Returns true for the announce echo
    pub fn is_update_request(&self) -> bool {
        matches!(self, Topic::UpdateRequest)
    }

    /// Build the full topic string for a person
    pub fn for_person(prefix: &str, name: &str) -> Result<String<MAX_TOPIC_LEN>, MessageError> {
        join(prefix, name)
    }
}

/// Join prefix and suffix with a `/`
pub(crate) fn join(prefix: &str, suffix: &str) -> Result<String<MAX_TOPIC_LEN>, MessageError> {
    let mut topic = String::new();
    topic
        .push_str(prefix)
        .map_err(|_| MessageError::MalformedTopic)?;
    topic.push('/').map_err(|_| MessageError::MalformedTopic)?;
    topic
        .push_str(suffix)
        .map_err(|_| MessageError::MalformedTopic)?;
    Ok(topic)
}
