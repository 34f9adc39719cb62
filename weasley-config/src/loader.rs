//! Clock configuration loading
//!
//! Parses TOML with `toml` + `serde`, then builds validated core types. All
//! validation errors surface here, once, at startup.

use core::str;

use heapless::{String, Vec};

use weasley_core::config::{
    CalibrationBlob, CalibrationPoint, ConfigError, HandConfig, HomeEdge, PulseCalibration,
    Roster, Sector, SectorMap, ServoRange, Strategy, MAX_CALIBRATION_POINTS, MAX_CHANNELS,
};
use weasley_core::motion::SmoothingConfig;
use weasley_core::{Angle, Distance};
use weasley_drivers::{ActuatorConfig, RetryPolicy};
use weasley_protocol::{Coordinates, DEFAULT_PREFIX};

use crate::error::LoadError;
use crate::raw::{
    RawCalibration, RawConfig, RawHand, RawHomeEdge, RawSector, RawServoRange, RawStrategy,
};

/// Maximum topic prefix length
pub const MAX_PREFIX_LEN: usize = 32;

/// Maximum TOML config size
pub const MAX_TOML_SIZE: usize = 8192;

/// Built-in clock layout
pub const EMBEDDED_CONFIG: &str = include_str!("../clock.toml");

/// Per-channel calibration overrides
pub type CalibrationTable = Vec<(u8, PulseCalibration), { MAX_CHANNELS as usize }>;

/// Fully validated clock configuration
#[derive(Debug, Clone)]
pub struct ClockConfig {
    /// Topic prefix location messages are published under
    pub prefix: String<MAX_PREFIX_LEN>,
    /// Clock face layout
    pub sectors: SectorMap,
    /// Hands and their owners
    pub roster: Roster,
    /// Servo range used by channels without an override
    pub servo: ServoRange,
    /// Channels with their own calibration
    pub calibrations: CalibrationTable,
    /// Actuator driver settings, including the park angle
    pub actuator: ActuatorConfig,
    /// Where Home is, for reports that only carry coordinates
    pub home: Option<Coordinates>,
}

impl ClockConfig {
    /// The built-in nine-sector face with four hands
    pub fn default_face() -> Result<Self, LoadError> {
        load(EMBEDDED_CONFIG)
    }

    /// Startup ("unknown") hand angle
    pub fn park(&self) -> Angle {
        self.actuator.park
    }

    /// Calibration for a channel: its override, or the shared servo range
    pub fn calibration_for(&self, channel: u8) -> Result<PulseCalibration, ConfigError> {
        match self.calibrations.iter().find(|(c, _)| *c == channel) {
            Some((_, calibration)) => Ok(calibration.clone()),
            None => PulseCalibration::from_servo_range(&self.servo),
        }
    }

    /// Merge calibration tables persisted by the calibration utility
    ///
    /// Stored tables replace overrides from the TOML file. The blob is
    /// applied whole or not at all: if any merged table leaves a hand unable
    /// to reach the park angle, the configuration is left unchanged.
    pub fn apply_blob(&mut self, blob: &CalibrationBlob) -> Result<(), LoadError> {
        let mut staged = self.calibrations.clone();
        for entry in blob.channels.iter() {
            let calibration = entry.calibration()?;
            set_calibration(&mut staged, entry.channel, calibration, true)?;
        }

        let previous = core::mem::replace(&mut self.calibrations, staged);
        if let Err(e) = self.check_hands() {
            warn!("stored calibration rejected: {}", e);
            self.calibrations = previous;
            return Err(e);
        }

        info!("applied {} stored calibrations", blob.channels.len());
        Ok(())
    }

    /// Every hand must be drivable, and able to park
    fn check_hands(&self) -> Result<(), LoadError> {
        for hand in self.roster.iter() {
            let calibration = self.calibration_for(hand.channel)?;
            if !calibration.contains(self.park()) {
                return Err(LoadError::Config(ConfigError::InvalidServoRange));
            }
        }
        Ok(())
    }

    /// Decode a stored blob and merge it
    pub fn apply_blob_bytes(&mut self, bytes: &[u8]) -> Result<(), LoadError> {
        let blob = CalibrationBlob::decode(bytes)?;
        self.apply_blob(&blob)
    }
}

/// Load configuration from TOML text
pub fn load(toml: &str) -> Result<ClockConfig, LoadError> {
    let raw: RawConfig = toml::from_str(toml).map_err(|_| {
        warn!("TOML parse error");
        LoadError::Parse
    })?;

    let config = build(raw)?;
    log_config_summary(&config);
    Ok(config)
}

/// Load configuration from raw bytes (e.g. read back from flash)
pub fn load_bytes(bytes: &[u8]) -> Result<ClockConfig, LoadError> {
    if bytes.len() > MAX_TOML_SIZE {
        return Err(LoadError::Parse);
    }
    let toml = str::from_utf8(bytes).map_err(|_| LoadError::InvalidUtf8)?;
    load(toml)
}

fn build(raw: RawConfig) -> Result<ClockConfig, LoadError> {
    let prefix = match raw.clock.prefix.as_deref() {
        None => DEFAULT_PREFIX,
        Some("") => return Err(LoadError::InvalidPrefix),
        Some(p) if p.contains('/') => return Err(LoadError::InvalidPrefix),
        Some(p) => p,
    };
    let prefix = String::try_from(prefix).map_err(|_| LoadError::InvalidPrefix)?;

    let home = match (raw.clock.home_latitude, raw.clock.home_longitude) {
        (Some(lat), Some(lon)) => {
            Some(Coordinates::new(lat, lon).map_err(|_| LoadError::InvalidHome)?)
        }
        (None, None) => None,
        _ => return Err(LoadError::InvalidHome),
    };

    let mut sectors: Vec<Sector, { weasley_core::config::MAX_SECTORS }> = Vec::new();
    for s in raw.sectors.iter() {
        sectors
            .push(build_sector(s)?)
            .map_err(|_| ConfigError::TooManySectors)?;
    }
    let sectors = SectorMap::new(sectors)?;

    let mut hands: Vec<HandConfig, { weasley_core::config::MAX_HANDS }> = Vec::new();
    for h in raw.hands.iter() {
        hands.push(build_hand(h)?).map_err(|_| ConfigError::TooManyHands)?;
    }
    let roster = Roster::new(hands)?;

    let servo = servo_range(&raw.servo, ServoRange::default());
    PulseCalibration::from_servo_range(&servo)?;

    let mut calibrations = CalibrationTable::new();
    for c in raw.calibrations.iter() {
        let calibration = build_calibration(c, servo)?;
        set_calibration(&mut calibrations, c.channel, calibration, false)?;
    }

    let smoothing = SmoothingConfig {
        max_step: match raw.smoothing.max_step_deg {
            Some(deg) if deg == 0.0 => None,
            Some(deg) => Some(degrees(deg)?),
            None => SmoothingConfig::default().max_step,
        },
        max_steps: raw
            .smoothing
            .max_steps
            .unwrap_or(SmoothingConfig::default().max_steps),
        step_interval_ms: raw
            .smoothing
            .step_interval_ms
            .unwrap_or(SmoothingConfig::default().step_interval_ms),
    };

    let defaults = ActuatorConfig::default();
    let actuator = ActuatorConfig {
        smoothing,
        retry: RetryPolicy {
            attempts: raw.retry.attempts.unwrap_or(defaults.retry.attempts),
            backoff_ms: raw.retry.backoff_ms.unwrap_or(defaults.retry.backoff_ms),
        },
        recovery_interval_ms: raw
            .retry
            .recovery_interval_ms
            .unwrap_or(defaults.recovery_interval_ms),
        park: match raw.clock.park_deg {
            Some(deg) => degrees(deg)?,
            None => defaults.park,
        },
    };

    let config = ClockConfig {
        prefix,
        sectors,
        roster,
        servo,
        calibrations,
        actuator,
        home,
    };

    config.check_hands()?;
    Ok(config)
}

fn build_sector(raw: &RawSector) -> Result<Sector, LoadError> {
    let strategy = match raw.strategy {
        RawStrategy::Midpoint => Strategy::Midpoint,
        RawStrategy::Subdivision => Strategy::FixedSubdivision,
        RawStrategy::Distance => Strategy::DistanceScaled {
            home_edge: match raw.home_edge {
                Some(RawHomeEdge::End) => HomeEdge::End,
                Some(RawHomeEdge::Start) | None => HomeEdge::Start,
            },
            near_home: match raw.near_home_miles {
                Some(miles) if !miles.is_finite() || miles <= 0.0 => {
                    return Err(ConfigError::InvalidNearHome.into())
                }
                Some(miles) => Some(Distance::from_miles(miles)),
                None => None,
            },
        },
    };

    let label = raw.label.as_deref().unwrap_or(raw.id.as_str());
    let sector = Sector::new(
        &raw.id,
        label,
        degrees(raw.start_deg)?,
        degrees(raw.end_deg)?,
        strategy,
    )?;
    Ok(sector)
}

fn build_hand(raw: &RawHand) -> Result<HandConfig, LoadError> {
    let mut hand = HandConfig::new(raw.id, &raw.owner, raw.channel)?;
    if let Some(deg) = raw.max_step_deg {
        hand = hand.with_max_step(degrees(deg)?);
    }
    Ok(hand)
}

fn build_calibration(raw: &RawCalibration, base: ServoRange) -> Result<PulseCalibration, LoadError> {
    match (&raw.points, &raw.servo) {
        (Some(_), Some(_)) => Err(LoadError::ConflictingCalibration),
        (Some(points), None) => {
            let mut table: Vec<CalibrationPoint, MAX_CALIBRATION_POINTS> = Vec::new();
            for &(deg, pulse_us) in points.iter() {
                table
                    .push(CalibrationPoint::new(degrees(deg)?, pulse_us))
                    .map_err(|_| ConfigError::TooManyCalibrationPoints)?;
            }
            Ok(PulseCalibration::new(&table)?)
        }
        (None, Some(servo)) => Ok(PulseCalibration::from_servo_range(&servo_range(servo, base))?),
        (None, None) => Ok(PulseCalibration::from_servo_range(&base)?),
    }
}

fn set_calibration(
    table: &mut CalibrationTable,
    channel: u8,
    calibration: PulseCalibration,
    replace: bool,
) -> Result<(), ConfigError> {
    if channel >= MAX_CHANNELS {
        return Err(ConfigError::ChannelOutOfRange);
    }
    if let Some(slot) = table.iter_mut().find(|(c, _)| *c == channel) {
        if !replace {
            return Err(ConfigError::DuplicateChannel);
        }
        slot.1 = calibration;
        return Ok(());
    }
    table
        .push((channel, calibration))
        .map_err(|_| ConfigError::ChannelOutOfRange)
}

fn servo_range(raw: &RawServoRange, base: ServoRange) -> ServoRange {
    ServoRange {
        pulse_min_us: raw.pulse_min_us.unwrap_or(base.pulse_min_us),
        pulse_max_us: raw.pulse_max_us.unwrap_or(base.pulse_max_us),
        actuation_range_deg: raw.actuation_range_deg.unwrap_or(base.actuation_range_deg),
        gear_ratio: raw.gear_ratio.unwrap_or(base.gear_ratio),
        offset_deg: raw.offset_deg.unwrap_or(base.offset_deg),
    }
}

/// Decimal degrees (0..=360) to a face angle, rounded to centidegrees
fn degrees(value: f64) -> Result<Angle, LoadError> {
    if !value.is_finite() || !(0.0..=360.0).contains(&value) {
        return Err(LoadError::InvalidNumber);
    }
    Ok(Angle::from_centidegrees((value * 100.0 + 0.5) as u32))
}

/// Log a summary of the loaded configuration
fn log_config_summary(config: &ClockConfig) {
    info!("Configuration loaded successfully");
    debug!("  {} sectors", config.sectors.len());
    debug!("  {} hands", config.roster.len());
    debug!("  {} calibration overrides", config.calibrations.len());
    if config.home.is_none() {
        debug!("  no home position; coordinate-only reports use the sector midpoint");
    }
}
