//! Message payloads
//!
//! Message types are divided into two directions:
//! - Source → Clock: location reports (JSON)
//! - Clock → Sources: announce request asking every source to resend state

use core::fmt;

use heapless::String;
use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;

use crate::geo::Coordinates;
use crate::topic::{join, Topic, MAX_NAME_LEN, MAX_TOPIC_LEN, UPDATE_TOPIC};

/// Maximum accepted payload size in bytes
pub const MAX_PAYLOAD_LEN: usize = 512;

/// Maximum state (sector identifier) length
pub const MAX_STATE_LEN: usize = 16;

/// Distance treated as "maximally far" (miles)
pub const MAX_DISTANCE_MILES: f32 = 10_000.0;

/// Full-scale value of a normalized distance (parts per million)
pub const DISTANCE_FULL_SCALE: u32 = 1_000_000;

/// Announce request payload
const ANNOUNCE_PAYLOAD: &[u8] = br#"{"update":"true"}"#;

/// Errors raised while decoding a message at the boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MessageError {
    /// Topic has no `/` separator or an empty name
    MalformedTopic,
    /// Topic does not start with the configured prefix
    ForeignTopic,
    /// Person name exceeds [`MAX_NAME_LEN`]
    NameTooLong,
    /// Payload exceeds [`MAX_PAYLOAD_LEN`]
    PayloadTooLarge,
    /// Payload is not a JSON object of the expected shape
    InvalidJson,
    /// Payload has no `state` field
    MissingState,
    /// Distance is negative or not finite
    InvalidDistance,
    /// Latitude/longitude out of range or not finite
    InvalidCoordinate,
}

#[derive(Deserialize)]
struct RawReport {
    state: Option<String<MAX_STATE_LEN>>,
    #[serde(default, deserialize_with = "number_or_string")]
    distance: Option<f32>,
    #[serde(default, deserialize_with = "number_or_string")]
    latitude: Option<f32>,
    #[serde(default, deserialize_with = "number_or_string")]
    longitude: Option<f32>,
}

/// Accept `4.2`, `"4.2"` or `null`
///
/// Shell and home-automation publishers often quote every value.
fn number_or_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f32>, D::Error> {
    struct Lenient;

    impl<'de> Visitor<'de> for Lenient {
        type Value = Option<f32>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a number or a numeric string")
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
            Ok(Some(v as f32))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            Ok(Some(v as f32))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            Ok(Some(v as f32))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            v.trim()
                .parse::<f32>()
                .map(Some)
                .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }
    }

    deserializer.deserialize_any(Lenient)
}

/// A validated location report for one person
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LocationReport {
    /// Person the report is about (from the topic)
    pub person: String<MAX_NAME_LEN>,
    /// Sector identifier (e.g. "work", "lost")
    pub state: String<MAX_STATE_LEN>,
    /// Distance from Home in miles
    pub distance_miles: Option<f32>,
    /// Reported latitude in degrees
    pub latitude: Option<f32>,
    /// Reported longitude in degrees
    pub longitude: Option<f32>,
}

impl LocationReport {
    /// Decode a report from a topic and JSON payload
    ///
    /// Returns `Ok(None)` for the announce echo topic, which carries no
    /// location.
    pub fn decode(topic: &str, prefix: &str, payload: &[u8]) -> Result<Option<Self>, MessageError> {
        match Topic::parse(topic, prefix)? {
            Topic::UpdateRequest => Ok(None),
            Topic::Person(person) => Self::from_json(person, payload).map(Some),
        }
    }

    /// Decode the JSON payload for a known person
    pub fn from_json(person: String<MAX_NAME_LEN>, payload: &[u8]) -> Result<Self, MessageError> {
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(MessageError::PayloadTooLarge);
        }

        let raw: RawReport =
            serde_json::from_slice(payload).map_err(|_| MessageError::InvalidJson)?;

        let state = raw.state.ok_or(MessageError::MissingState)?;
        if state.is_empty() {
            return Err(MessageError::MissingState);
        }

        if let Some(miles) = raw.distance {
            if !miles.is_finite() || miles < 0.0 {
                return Err(MessageError::InvalidDistance);
            }
        }

        // Each axis is checked on its own; a lone latitude is still validated
        Coordinates::new(raw.latitude.unwrap_or(0.0), raw.longitude.unwrap_or(0.0))?;

        Ok(Self {
            person,
            state,
            distance_miles: raw.distance,
            latitude: raw.latitude,
            longitude: raw.longitude,
        })
    }

    /// Normalized distance in parts per million of [`MAX_DISTANCE_MILES`]
    ///
    /// Distances beyond the maximum clamp to full scale.
    pub fn distance_ppm(&self) -> Option<u32> {
        self.distance_miles.map(miles_to_ppm)
    }

    /// Reported position, if both coordinates are present
    pub fn coordinates(&self) -> Option<Coordinates> {
        Some(Coordinates {
            latitude: self.latitude?,
            longitude: self.longitude?,
        })
    }

    /// Normalized distance, falling back to the great-circle distance from
    /// `home` when the report gives no distance or a distance of zero
    ///
    /// An explicit non-zero distance always wins over coordinates.
    pub fn distance_ppm_from(&self, home: Option<&Coordinates>) -> Option<u32> {
        match self.distance_miles {
            Some(miles) if miles > 0.0 => Some(miles_to_ppm(miles)),
            explicit => match (home, self.coordinates()) {
                (Some(home), Some(here)) => Some(miles_to_ppm(home.great_circle_miles(&here))),
                _ => explicit.map(miles_to_ppm),
            },
        }
    }
}

/// Convert miles to a normalized distance (0..=[`DISTANCE_FULL_SCALE`])
pub fn miles_to_ppm(miles: f32) -> u32 {
    if !(miles > 0.0) {
        return 0;
    }
    let scaled = miles * (DISTANCE_FULL_SCALE as f32 / MAX_DISTANCE_MILES) + 0.5;
    if scaled >= DISTANCE_FULL_SCALE as f32 {
        DISTANCE_FULL_SCALE
    } else {
        scaled as u32
    }
}

/// Request asking every location source to resend its current state
///
/// Hand positions are not persisted, so the clock emits one of these after
/// each successful (re)connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AnnounceRequest;

impl AnnounceRequest {
    /// Delivery QoS level
    pub const QOS: u8 = 0;

    /// Retain flag
    pub const RETAIN: bool = false;

    /// Topic to publish on
    pub fn topic(&self, prefix: &str) -> Result<String<MAX_TOPIC_LEN>, MessageError> {
        join(prefix, UPDATE_TOPIC)
    }

    /// JSON payload bytes
    pub fn payload(&self) -> &'static [u8] {
        ANNOUNCE_PAYLOAD
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topic::DEFAULT_PREFIX;
    use proptest::prelude::*;

    fn person(name: &str) -> String<MAX_NAME_LEN> {
        String::try_from(name).unwrap()
    }

    #[test]
    fn test_decode_state_and_distance() {
        let report = LocationReport::decode(
            "weasleyclock/susan",
            DEFAULT_PREFIX,
            br#"{"state": "work", "distance": 4.2}"#,
        )
        .unwrap()
        .unwrap();

        assert_eq!(report.person.as_str(), "susan");
        assert_eq!(report.state.as_str(), "work");
        assert_eq!(report.distance_ppm(), Some(420));
    }

    #[test]
    fn test_decode_update_echo_is_skipped() {
        let result =
            LocationReport::decode("weasleyclock/UPDATE", DEFAULT_PREFIX, br#"{"update":"true"}"#);
        assert_eq!(result, Ok(None));
    }

    #[test]
    fn test_distance_absent() {
        let report = LocationReport::from_json(person("ron"), br#"{"state":"school"}"#).unwrap();
        assert_eq!(report.distance_miles, None);
        assert_eq!(report.distance_ppm(), None);
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let report = LocationReport::from_json(
            person("ron"),
            br#"{"state":"home","battery":87,"source":"gps"}"#,
        )
        .unwrap();
        assert_eq!(report.state.as_str(), "home");
    }

    #[test]
    fn test_missing_state() {
        assert_eq!(
            LocationReport::from_json(person("ron"), br#"{"distance": 3}"#),
            Err(MessageError::MissingState)
        );
        assert_eq!(
            LocationReport::from_json(person("ron"), br#"{"state": ""}"#),
            Err(MessageError::MissingState)
        );
    }

    #[test]
    fn test_invalid_json() {
        assert_eq!(
            LocationReport::from_json(person("ron"), b"state=work"),
            Err(MessageError::InvalidJson)
        );
        assert_eq!(
            LocationReport::from_json(person("ron"), br#"{"state": 5}"#),
            Err(MessageError::InvalidJson)
        );
    }

    #[test]
    fn test_quoted_numbers_accepted() {
        let report = LocationReport::from_json(
            person("percy"),
            br#"{"state":"lost","distance":"42.5","latitude":" 51.5","longitude":"-0.12"}"#,
        )
        .unwrap();
        assert_eq!(report.distance_miles, Some(42.5));
        assert_eq!(report.distance_ppm(), Some(4_250));
        assert_eq!(report.latitude, Some(51.5));
        assert_eq!(report.longitude, Some(-0.12));

        let report =
            LocationReport::from_json(person("percy"), br#"{"state":"lost","distance":null}"#)
                .unwrap();
        assert_eq!(report.distance_miles, None);

        assert_eq!(
            LocationReport::from_json(person("percy"), br#"{"state":"lost","distance":"far"}"#),
            Err(MessageError::InvalidJson)
        );
        assert_eq!(
            LocationReport::from_json(person("percy"), br#"{"state":"lost","distance":"-3"}"#),
            Err(MessageError::InvalidDistance)
        );
    }

    #[test]
    fn test_negative_distance_rejected() {
        assert_eq!(
            LocationReport::from_json(person("ron"), br#"{"state":"lost","distance":-1}"#),
            Err(MessageError::InvalidDistance)
        );
    }

    #[test]
    fn test_coordinates_validated() {
        let ok = LocationReport::from_json(
            person("ginny"),
            br#"{"state":"intransit","latitude":51.5,"longitude":-0.12}"#,
        )
        .unwrap();
        assert_eq!(ok.latitude, Some(51.5));

        assert_eq!(
            LocationReport::from_json(person("ginny"), br#"{"state":"lost","latitude":91.0}"#),
            Err(MessageError::InvalidCoordinate)
        );
    }

    #[test]
    fn test_distance_from_coordinates() {
        let home = Coordinates::new(51.5074, -0.1278).unwrap();

        // Paris is about 213.5 miles from London
        let paris = LocationReport::from_json(
            person("fleur"),
            br#"{"state":"intransit","latitude":48.8566,"longitude":2.3522}"#,
        )
        .unwrap();
        assert_eq!(paris.distance_ppm(), None);
        let ppm = paris.distance_ppm_from(Some(&home)).unwrap();
        assert!((21_300..=21_400).contains(&ppm));
        assert_eq!(paris.distance_ppm_from(None), None);

        // A zero distance defers to coordinates, as does an absent one
        let zero = LocationReport::from_json(
            person("fleur"),
            br#"{"state":"intransit","distance":0,"latitude":48.8566,"longitude":2.3522}"#,
        )
        .unwrap();
        assert_eq!(zero.distance_ppm_from(Some(&home)), Some(ppm));
        assert_eq!(zero.distance_ppm_from(None), Some(0));

        let explicit = LocationReport::from_json(
            person("fleur"),
            br#"{"state":"intransit","distance":5,"latitude":48.8566,"longitude":2.3522}"#,
        )
        .unwrap();
        assert_eq!(explicit.distance_ppm_from(Some(&home)), Some(500));

        let lone = LocationReport::from_json(person("fleur"), br#"{"state":"lost","latitude":48.8}"#)
            .unwrap();
        assert_eq!(lone.coordinates(), None);
        assert_eq!(lone.distance_ppm_from(Some(&home)), None);
    }

    #[test]
    fn test_payload_too_large() {
        let payload = [b' '; MAX_PAYLOAD_LEN + 1];
        assert_eq!(
            LocationReport::from_json(person("ron"), &payload),
            Err(MessageError::PayloadTooLarge)
        );
    }

    #[test]
    fn test_miles_to_ppm_scale() {
        assert_eq!(miles_to_ppm(0.0), 0);
        assert_eq!(miles_to_ppm(1.0), 100);
        assert_eq!(miles_to_ppm(5_000.0), 500_000);
        assert_eq!(miles_to_ppm(10_000.0), DISTANCE_FULL_SCALE);
        assert_eq!(miles_to_ppm(25_000.0), DISTANCE_FULL_SCALE);
    }

    #[test]
    fn test_announce_request() {
        let announce = AnnounceRequest;
        assert_eq!(
            announce.topic(DEFAULT_PREFIX).unwrap().as_str(),
            "weasleyclock/UPDATE"
        );
        assert_eq!(announce.payload(), br#"{"update":"true"}"#);

        // The clock must ignore its own announce when it comes back
        let topic = Topic::parse(announce.topic(DEFAULT_PREFIX).unwrap().as_str(), DEFAULT_PREFIX)
            .unwrap();
        assert!(topic.is_update_request());
    }

    proptest! {
        #[test]
        fn prop_miles_to_ppm_monotonic(a in 0.0f32..20_000.0, b in 0.0f32..20_000.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let (p_lo, p_hi) = (miles_to_ppm(lo), miles_to_ppm(hi));
            prop_assert!(p_lo <= p_hi);
            prop_assert!(p_hi <= DISTANCE_FULL_SCALE);
        }
    }
}
