//! TOML document shape
//!
//! Mirrors the file layout one-to-one. Nothing here is validated; see
//! [`crate::loader`] for the conversion into core types.

use alloc::string::String;
use alloc::vec::Vec;

use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawConfig {
    #[serde(default)]
    pub clock: RawClock,
    #[serde(default)]
    pub smoothing: RawSmoothing,
    #[serde(default)]
    pub retry: RawRetry,
    #[serde(default)]
    pub servo: RawServoRange,
    #[serde(default, rename = "sector")]
    pub sectors: Vec<RawSector>,
    #[serde(default, rename = "hand")]
    pub hands: Vec<RawHand>,
    #[serde(default, rename = "calibration")]
    pub calibrations: Vec<RawCalibration>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawClock {
    pub prefix: Option<String>,
    pub park_deg: Option<f64>,
    pub home_latitude: Option<f32>,
    pub home_longitude: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawSmoothing {
    /// 0 disables smoothing
    pub max_step_deg: Option<f64>,
    pub max_steps: Option<u16>,
    pub step_interval_ms: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawRetry {
    pub attempts: Option<u8>,
    pub backoff_ms: Option<u32>,
    pub recovery_interval_ms: Option<u32>,
}

#[derive(Debug, Default, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawServoRange {
    pub pulse_min_us: Option<u16>,
    pub pulse_max_us: Option<u16>,
    pub actuation_range_deg: Option<u16>,
    pub gear_ratio: Option<u16>,
    pub offset_deg: Option<u16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum RawStrategy {
    Distance,
    Subdivision,
    Midpoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum RawHomeEdge {
    Start,
    End,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawSector {
    pub id: String,
    pub label: Option<String>,
    pub start_deg: f64,
    pub end_deg: f64,
    pub strategy: RawStrategy,
    pub home_edge: Option<RawHomeEdge>,
    pub near_home_miles: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawHand {
    pub id: u8,
    pub owner: String,
    pub channel: u8,
    pub max_step_deg: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawCalibration {
    pub channel: u8,
    /// `[[angle_deg, pulse_us], ...]`
    pub points: Option<Vec<(f64, u16)>>,
    pub servo: Option<RawServoRange>,
}
