//! Hand actuator driver
//!
//! Owns the PWM bus shared by every hand. All writes go through one async
//! mutex that is held for exactly one write, so a smoothed move on one hand
//! interleaves step by step with moves on the others and no write is ever
//! split.
//!
//! Each hand has:
//! - a mailbox (latest command wins) drained by its [`HandActuatorDriver::run`] loop
//! - a generation counter; a newer command abandons the remaining steps of
//!   an older move
//! - an availability flag, set after the retry budget is exhausted and
//!   cleared by the next successful write

use core::convert::Infallible;

use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::mutex::Mutex;
use embassy_sync::signal::Signal;
use embedded_hal_async::delay::DelayNs;
use heapless::Vec;
use portable_atomic::{AtomicBool, AtomicU16, AtomicU32, Ordering};

use weasley_core::config::{ConfigError, HandConfig, HandId, PulseCalibration, Roster, MAX_HANDS};
use weasley_core::motion::SmoothingConfig;
use weasley_core::state::HandCommand;
use weasley_core::traits::{HandActuator, PulseBus};
use weasley_core::{Angle, ClockError};

/// Stored position meaning "no successful write yet"
const POSITION_UNKNOWN: u32 = u32::MAX;

/// Stored pulse meaning "no successful write yet"
const PULSE_UNKNOWN: u16 = 0;

/// Bus write retry settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RetryPolicy {
    /// Total write attempts before a hand is marked unavailable
    pub attempts: u8,
    /// Delay before the first retry; doubles after each failure
    pub backoff_ms: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff_ms: 20,
        }
    }
}

/// Actuator driver settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ActuatorConfig {
    /// Default motion smoothing
    pub smoothing: SmoothingConfig,
    /// Write retries
    pub retry: RetryPolicy,
    /// How often recovery of an unavailable hand is attempted
    pub recovery_interval_ms: u32,
    /// Startup angle used by [`HandActuatorDriver::park`]
    pub park: Angle,
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self {
            smoothing: SmoothingConfig::default(),
            retry: RetryPolicy::default(),
            recovery_interval_ms: 5_000,
            park: Angle::ZERO,
        }
    }
}

/// How a drive ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DriveOutcome {
    /// The hand reached the target
    Completed,
    /// A newer command took over before the move finished
    Superseded,
}

/// Snapshot of one hand's physical state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HandStatus {
    /// False while the hand is marked unavailable
    pub available: bool,
    /// Angle of the last successful write
    pub position: Option<Angle>,
    /// Pulse width of the last successful write
    pub last_pulse_us: Option<u16>,
}

/// Per-hand runtime state
struct HandChannel<M: RawMutex> {
    id: HandId,
    channel: u8,
    calibration: PulseCalibration,
    generation: AtomicU32,
    unavailable: AtomicBool,
    position: AtomicU32,
    last_pulse: AtomicU16,
    mailbox: Signal<M, HandCommand>,
}

impl<M: RawMutex> HandChannel<M> {
    fn new(config: &HandConfig, calibration: PulseCalibration) -> Self {
        Self {
            id: config.id,
            channel: config.channel,
            calibration,
            generation: AtomicU32::new(0),
            unavailable: AtomicBool::new(false),
            position: AtomicU32::new(POSITION_UNKNOWN),
            last_pulse: AtomicU16::new(PULSE_UNKNOWN),
            mailbox: Signal::new(),
        }
    }

    fn is_unavailable(&self) -> bool {
        self.unavailable.load(Ordering::Acquire)
    }

    fn position(&self) -> Option<Angle> {
        match self.position.load(Ordering::Acquire) {
            POSITION_UNKNOWN => None,
            cd => Some(Angle::from_centidegrees(cd)),
        }
    }

    fn last_pulse(&self) -> Option<u16> {
        match self.last_pulse.load(Ordering::Acquire) {
            PULSE_UNKNOWN => None,
            pulse => Some(pulse),
        }
    }

    /// Claim a new generation, invalidating any move in flight
    fn claim(&self) -> u32 {
        self.generation.fetch_add(1, Ordering::AcqRel).wrapping_add(1)
    }

    fn is_current(&self, generation: u32) -> bool {
        self.generation.load(Ordering::Acquire) == generation
    }

    /// Reject commands that could never be executed
    fn validate(&self, command: &HandCommand) -> Result<(), ClockError> {
        if self.is_unavailable() {
            return Err(ClockError::ActuatorUnavailable);
        }
        self.calibration.pulse_for(command.target)?;
        Ok(())
    }
}

/// Drives every hand over one shared PWM bus
pub struct HandActuatorDriver<M: RawMutex, B> {
    bus: Mutex<M, B>,
    hands: Vec<HandChannel<M>, MAX_HANDS>,
    config: ActuatorConfig,
}

impl<M: RawMutex, B: PulseBus> HandActuatorDriver<M, B> {
    /// Create a driver with no hands
    pub fn new(bus: B, config: ActuatorConfig) -> Self {
        Self {
            bus: Mutex::new(bus),
            hands: Vec::new(),
            config,
        }
    }

    /// Create a driver for every hand in a roster
    pub fn from_roster<F>(
        bus: B,
        roster: &Roster,
        config: ActuatorConfig,
        mut calibration_for: F,
    ) -> Result<Self, ConfigError>
    where
        F: FnMut(&HandConfig) -> Result<PulseCalibration, ConfigError>,
    {
        let mut driver = Self::new(bus, config);
        for hand in roster.iter() {
            driver.add_hand(hand, calibration_for(hand)?)?;
        }
        Ok(driver)
    }

    /// Register a hand
    pub fn add_hand(
        &mut self,
        hand: &HandConfig,
        calibration: PulseCalibration,
    ) -> Result<(), ConfigError> {
        if self.hands.iter().any(|h| h.id == hand.id) {
            return Err(ConfigError::DuplicateHand);
        }
        if self.hands.iter().any(|h| h.channel == hand.channel) {
            return Err(ConfigError::DuplicateChannel);
        }
        self.hands
            .push(HandChannel::new(hand, calibration))
            .map_err(|_| ConfigError::TooManyHands)
    }

    /// Driver settings
    pub fn config(&self) -> &ActuatorConfig {
        &self.config
    }

    /// Release the bus
    pub fn into_bus(self) -> B {
        self.bus.into_inner()
    }

    /// Move a hand to the command's target, smoothing as configured
    ///
    /// Returns `Superseded` if another command for the same hand arrives
    /// before the move finishes. Out-of-range targets fail before any write.
    pub async fn drive<D: DelayNs>(
        &self,
        command: HandCommand,
        delay: &mut D,
    ) -> Result<DriveOutcome, ClockError> {
        let hand = self.hand(command.hand)?;
        hand.validate(&command)?;
        let generation = hand.claim();
        self.execute(hand, command, generation, delay).await
    }

    /// Per-hand actuation loop
    ///
    /// Drains the hand's mailbox, executing the newest command each time,
    /// and retries recovery every `recovery_interval_ms` while the hand is
    /// unavailable. Only returns if the hand is unknown.
    pub async fn run<D: DelayNs>(&self, id: HandId, delay: &mut D) -> Result<Infallible, ClockError> {
        let hand = self.hand(id)?;
        let interval = self.config.recovery_interval_ms.max(1);
        info!("hand {} actuation loop started", id);

        loop {
            let event = select(hand.mailbox.wait(), delay.delay_ms(interval)).await;

            match event {
                Either::First(command) => {
                    if hand.is_unavailable() {
                        warn!("hand {} unavailable, dropping command", id);
                        continue;
                    }
                    let generation = hand.generation.load(Ordering::Acquire);
                    match self.execute(hand, command, generation, delay).await {
                        Ok(DriveOutcome::Completed) => {
                            trace!("hand {} at {} cd", id, command.target.centidegrees())
                        }
                        Ok(DriveOutcome::Superseded) => debug!("hand {} move superseded", id),
                        Err(e) => error!("hand {} move failed: {}", id, e),
                    }
                }
                Either::Second(()) => {
                    if hand.is_unavailable() {
                        match self.recover(id).await {
                            Ok(()) | Err(ClockError::ActuatorUnavailable) => {}
                            Err(e) => error!("hand {} cannot recover: {}", id, e),
                        }
                    }
                }
            }
        }
    }

    /// Re-write the last good pulse of an unavailable hand
    ///
    /// A single attempt; success clears the unavailable flag. A hand that
    /// never had a successful write is retried with its park pulse.
    pub async fn recover(&self, id: HandId) -> Result<(), ClockError> {
        let hand = self.hand(id)?;
        if !hand.is_unavailable() {
            return Ok(());
        }

        let pulse = match hand.last_pulse() {
            Some(pulse) => pulse,
            None => hand.calibration.pulse_for(self.config.park)?,
        };

        let result = {
            let mut bus = self.bus.lock().await;
            bus.set_pulse(hand.channel, pulse).await
        };

        match result {
            Ok(()) => {
                hand.last_pulse.store(pulse, Ordering::Release);
                hand.unavailable.store(false, Ordering::Release);
                info!("hand {} recovered", id);
                Ok(())
            }
            Err(_) => {
                debug!("hand {} still unavailable", id);
                Err(ClockError::ActuatorUnavailable)
            }
        }
    }

    /// Drive a hand to the configured park angle
    pub async fn park<D: DelayNs>(
        &self,
        id: HandId,
        delay: &mut D,
    ) -> Result<DriveOutcome, ClockError> {
        self.drive(HandCommand::new(id, self.config.park), delay).await
    }

    /// Current physical state of a hand
    pub fn status(&self, id: HandId) -> Result<HandStatus, ClockError> {
        let hand = self.hand(id)?;
        Ok(HandStatus {
            available: !hand.is_unavailable(),
            position: hand.position(),
            last_pulse_us: hand.last_pulse(),
        })
    }

    fn hand(&self, id: HandId) -> Result<&HandChannel<M>, ClockError> {
        self.hands
            .iter()
            .find(|h| h.id == id)
            .ok_or(ClockError::UnknownHand)
    }

    async fn execute<D: DelayNs>(
        &self,
        hand: &HandChannel<M>,
        command: HandCommand,
        generation: u32,
        delay: &mut D,
    ) -> Result<DriveOutcome, ClockError> {
        let plan = self
            .config
            .smoothing
            .plan(hand.position(), command.target, command.max_step);

        for (i, angle) in plan.iter().enumerate() {
            if i > 0 {
                delay.delay_ms(self.config.smoothing.step_interval_ms).await;
            }
            if !hand.is_current(generation) {
                return Ok(DriveOutcome::Superseded);
            }

            let pulse = hand.calibration.pulse_for(angle)?;
            self.write(hand, pulse, delay).await?;
            hand.position.store(angle.centidegrees(), Ordering::Release);
        }

        Ok(DriveOutcome::Completed)
    }

    /// One logical write with bounded retries
    async fn write<D: DelayNs>(
        &self,
        hand: &HandChannel<M>,
        pulse: u16,
        delay: &mut D,
    ) -> Result<(), ClockError> {
        let attempts = self.config.retry.attempts.max(1);
        let mut backoff = self.config.retry.backoff_ms;

        for attempt in 1..=attempts {
            let result = {
                let mut bus = self.bus.lock().await;
                bus.set_pulse(hand.channel, pulse).await
            };

            if result.is_ok() {
                hand.last_pulse.store(pulse, Ordering::Release);
                if hand.unavailable.swap(false, Ordering::AcqRel) {
                    info!("hand {} recovered", hand.id);
                }
                return Ok(());
            }

            warn!(
                "hand {} write failed (attempt {}/{})",
                hand.id, attempt, attempts
            );
            if attempt < attempts {
                delay.delay_ms(backoff).await;
                backoff = backoff.saturating_mul(2);
            }
        }

        hand.unavailable.store(true, Ordering::Release);
        error!("hand {} marked unavailable", hand.id);
        Err(ClockError::ActuatorUnavailable)
    }
}

impl<M: RawMutex, B: PulseBus> HandActuator for HandActuatorDriver<M, B> {
    fn submit(&self, command: HandCommand) -> Result<(), ClockError> {
        let hand = self.hand(command.hand)?;
        hand.validate(&command)?;
        hand.claim();
        hand.mailbox.signal(command);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use core::cell::{Cell, RefCell};

    use embassy_futures::join::join;
    use embassy_futures::{block_on, yield_now};
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;
    use weasley_core::config::CalibrationPoint;

    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum BusEvent {
        Begin(u8, u16),
        End(u8),
        Failed(u8),
    }

    /// Records writes; fails while `failures` is non-zero for `fail_channel`
    struct MockBus<'a> {
        log: &'a RefCell<heapless::Vec<BusEvent, 256>>,
        failures: &'a Cell<u8>,
        fail_channel: Option<u8>,
        yield_mid_write: bool,
    }

    impl PulseBus for MockBus<'_> {
        type Error = ();

        async fn set_pulse(&mut self, channel: u8, pulse_us: u16) -> Result<(), ()> {
            let targeted = self.fail_channel.map_or(true, |c| c == channel);
            if targeted && self.failures.get() > 0 {
                self.failures.set(self.failures.get() - 1);
                self.log.borrow_mut().push(BusEvent::Failed(channel)).unwrap();
                return Err(());
            }

            self.log
                .borrow_mut()
                .push(BusEvent::Begin(channel, pulse_us))
                .unwrap();
            if self.yield_mid_write {
                yield_now().await;
            }
            self.log.borrow_mut().push(BusEvent::End(channel)).unwrap();
            Ok(())
        }
    }

    #[derive(Default)]
    struct MockDelay {
        total_ms: u64,
    }

    impl DelayNs for MockDelay {
        async fn delay_ns(&mut self, ns: u32) {
            self.total_ms += ns as u64 / 1_000_000;
            yield_now().await;
        }
    }

    struct Fixture {
        log: RefCell<heapless::Vec<BusEvent, 256>>,
        failures: Cell<u8>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                log: RefCell::new(heapless::Vec::new()),
                failures: Cell::new(0),
            }
        }

        fn bus(&self, fail_channel: Option<u8>, yield_mid_write: bool) -> MockBus<'_> {
            MockBus {
                log: &self.log,
                failures: &self.failures,
                fail_channel,
                yield_mid_write,
            }
        }

        fn writes(&self) -> usize {
            self.log
                .borrow()
                .iter()
                .filter(|e| matches!(e, BusEvent::End(_)))
                .count()
        }
    }

    fn calibration() -> PulseCalibration {
        PulseCalibration::new(&[
            CalibrationPoint::new(Angle::from_degrees(10), 1_000),
            CalibrationPoint::new(Angle::from_degrees(350), 2_000),
        ])
        .unwrap()
    }

    fn driver<'a>(
        bus: MockBus<'a>,
        config: ActuatorConfig,
    ) -> HandActuatorDriver<NoopRawMutex, MockBus<'a>> {
        let roster = Roster::new([
            HandConfig::new(0, "fred", 0).unwrap(),
            HandConfig::new(1, "george", 1).unwrap(),
        ])
        .unwrap();
        HandActuatorDriver::from_roster(bus, &roster, config, |_| Ok(calibration())).unwrap()
    }

    fn direct() -> ActuatorConfig {
        ActuatorConfig {
            smoothing: SmoothingConfig::direct(),
            park: Angle::from_degrees(180),
            ..ActuatorConfig::default()
        }
    }

    #[test]
    fn test_out_of_range_never_writes() {
        let fx = Fixture::new();
        let driver = driver(fx.bus(None, false), direct());
        let mut delay = MockDelay::default();

        let command = HandCommand::new(HandId(0), Angle::from_degrees(5));
        assert_eq!(block_on(driver.drive(command, &mut delay)), Err(ClockError::OutOfRange));
        assert_eq!(driver.submit(command), Err(ClockError::OutOfRange));
        assert!(fx.log.borrow().is_empty());
        assert_eq!(driver.status(HandId(0)).unwrap().position, None);
    }

    #[test]
    fn test_unknown_hand() {
        let fx = Fixture::new();
        let driver = driver(fx.bus(None, false), direct());
        let command = HandCommand::new(HandId(7), Angle::from_degrees(90));
        assert_eq!(driver.submit(command), Err(ClockError::UnknownHand));
        assert_eq!(driver.status(HandId(7)), Err(ClockError::UnknownHand));
    }

    #[test]
    fn test_drive_converts_angle_to_pulse() {
        let fx = Fixture::new();
        let driver = driver(fx.bus(None, false), direct());
        let mut delay = MockDelay::default();

        let command = HandCommand::new(HandId(1), Angle::from_degrees(180));
        assert_eq!(
            block_on(driver.drive(command, &mut delay)),
            Ok(DriveOutcome::Completed)
        );
        assert_eq!(
            fx.log.borrow().as_slice(),
            &[BusEvent::Begin(1, 1_500), BusEvent::End(1)]
        );

        let status = driver.status(HandId(1)).unwrap();
        assert!(status.available);
        assert_eq!(status.position, Some(Angle::from_degrees(180)));
        assert_eq!(status.last_pulse_us, Some(1_500));
    }

    #[test]
    fn test_smoothing_splits_large_moves() {
        let fx = Fixture::new();
        let config = ActuatorConfig {
            smoothing: SmoothingConfig {
                max_step: Some(Angle::from_degrees(3)),
                max_steps: 120,
                step_interval_ms: 30,
            },
            ..ActuatorConfig::default()
        };
        let driver = driver(fx.bus(None, false), config);
        let mut delay = MockDelay::default();

        // Unknown position: jump straight there
        block_on(driver.drive(HandCommand::new(HandId(0), Angle::from_degrees(20)), &mut delay))
            .unwrap();
        assert_eq!(fx.writes(), 1);
        assert_eq!(delay.total_ms, 0);

        block_on(driver.drive(HandCommand::new(HandId(0), Angle::from_degrees(50)), &mut delay))
            .unwrap();
        assert_eq!(fx.writes(), 11);
        assert_eq!(delay.total_ms, 9 * 30);

        // Command rate overrides the default
        let fast = HandCommand {
            max_step: Some(Angle::from_degrees(15)),
            ..HandCommand::new(HandId(0), Angle::from_degrees(20))
        };
        block_on(driver.drive(fast, &mut delay)).unwrap();
        assert_eq!(fx.writes(), 13);

        let pulses: heapless::Vec<u16, 16> = fx
            .log
            .borrow()
            .iter()
            .filter_map(|e| match e {
                BusEvent::Begin(_, p) => Some(*p),
                _ => None,
            })
            .collect();
        assert!(pulses[1..11].windows(2).all(|w| w[0] < w[1]));
        assert_eq!(driver.status(HandId(0)).unwrap().position, Some(Angle::from_degrees(20)));
    }

    #[test]
    fn test_retry_exhaustion_marks_unavailable_then_recovers() {
        let fx = Fixture::new();
        let driver = driver(fx.bus(None, false), direct());
        let mut delay = MockDelay::default();

        block_on(driver.drive(HandCommand::new(HandId(0), Angle::from_degrees(100)), &mut delay))
            .unwrap();
        let good_pulse = driver.status(HandId(0)).unwrap().last_pulse_us;

        fx.failures.set(3);
        let command = HandCommand::new(HandId(0), Angle::from_degrees(200));
        assert_eq!(
            block_on(driver.drive(command, &mut delay)),
            Err(ClockError::ActuatorUnavailable)
        );
        // 20 ms then 40 ms of backoff between the three attempts
        assert_eq!(delay.total_ms, 60);

        let status = driver.status(HandId(0)).unwrap();
        assert!(!status.available);
        assert_eq!(status.position, Some(Angle::from_degrees(100)));
        assert_eq!(driver.submit(command), Err(ClockError::ActuatorUnavailable));
        assert_eq!(
            block_on(driver.drive(command, &mut delay)),
            Err(ClockError::ActuatorUnavailable)
        );

        // Other hands are unaffected
        assert!(driver.submit(HandCommand::new(HandId(1), Angle::from_degrees(90))).is_ok());

        fx.log.borrow_mut().clear();
        assert_eq!(block_on(driver.recover(HandId(0))), Ok(()));
        assert_eq!(
            fx.log.borrow().first(),
            Some(&BusEvent::Begin(0, good_pulse.unwrap()))
        );
        assert!(driver.status(HandId(0)).unwrap().available);
        assert!(driver.submit(command).is_ok());
    }

    #[test]
    fn test_recover_failure_keeps_unavailable() {
        let fx = Fixture::new();
        let driver = driver(fx.bus(None, false), direct());
        let mut delay = MockDelay::default();

        fx.failures.set(4);
        let command = HandCommand::new(HandId(1), Angle::from_degrees(100));
        assert!(block_on(driver.drive(command, &mut delay)).is_err());

        // Never written: retried with the park pulse
        assert_eq!(
            block_on(driver.recover(HandId(1))),
            Err(ClockError::ActuatorUnavailable)
        );
        assert!(!driver.status(HandId(1)).unwrap().available);

        assert_eq!(block_on(driver.recover(HandId(1))), Ok(()));
        assert_eq!(driver.status(HandId(1)).unwrap().last_pulse_us, Some(1_500));
    }

    #[test]
    fn test_failure_isolated_to_one_hand() {
        let fx = Fixture::new();
        let driver = driver(fx.bus(Some(1), false), direct());
        let mut d0 = MockDelay::default();
        let mut d1 = MockDelay::default();

        fx.failures.set(10);
        let (a, b) = block_on(join(
            driver.drive(HandCommand::new(HandId(0), Angle::from_degrees(90)), &mut d0),
            driver.drive(HandCommand::new(HandId(1), Angle::from_degrees(90)), &mut d1),
        ));
        assert_eq!(a, Ok(DriveOutcome::Completed));
        assert_eq!(b, Err(ClockError::ActuatorUnavailable));
        assert!(driver.status(HandId(0)).unwrap().available);
    }

    #[test]
    fn test_bus_writes_never_interleave() {
        let fx = Fixture::new();
        let config = ActuatorConfig {
            smoothing: SmoothingConfig {
                max_step: Some(Angle::from_degrees(5)),
                max_steps: 120,
                step_interval_ms: 10,
            },
            ..ActuatorConfig::default()
        };
        let driver = driver(fx.bus(None, true), config);
        let mut d0 = MockDelay::default();
        let mut d1 = MockDelay::default();

        block_on(driver.drive(HandCommand::new(HandId(0), Angle::from_degrees(20)), &mut d0))
            .unwrap();
        block_on(driver.drive(HandCommand::new(HandId(1), Angle::from_degrees(300)), &mut d1))
            .unwrap();

        let (a, b) = block_on(join(
            driver.drive(HandCommand::new(HandId(0), Angle::from_degrees(60)), &mut d0),
            driver.drive(HandCommand::new(HandId(1), Angle::from_degrees(260)), &mut d1),
        ));
        assert_eq!(a, Ok(DriveOutcome::Completed));
        assert_eq!(b, Ok(DriveOutcome::Completed));

        let log = fx.log.borrow();
        for pair in log.chunks(2) {
            match pair {
                [BusEvent::Begin(c, _), BusEvent::End(e)] => assert_eq!(c, e),
                other => panic!("interleaved write: {:?}", other),
            }
        }
        // Both hands made progress in the same window
        let channels: heapless::Vec<u8, 64> = log
            .iter()
            .skip(4)
            .filter_map(|e| match e {
                BusEvent::Begin(c, _) => Some(*c),
                _ => None,
            })
            .collect();
        assert!(channels.windows(2).any(|w| w[0] != w[1]));
        assert_eq!(driver.status(HandId(0)).unwrap().position, Some(Angle::from_degrees(60)));
        assert_eq!(driver.status(HandId(1)).unwrap().position, Some(Angle::from_degrees(260)));
    }

    #[test]
    fn test_newer_command_supersedes_move() {
        let fx = Fixture::new();
        let config = ActuatorConfig {
            smoothing: SmoothingConfig {
                max_step: Some(Angle::from_degrees(3)),
                max_steps: 120,
                step_interval_ms: 30,
            },
            ..ActuatorConfig::default()
        };
        let driver = driver(fx.bus(None, false), config);
        let mut d0 = MockDelay::default();
        let mut d1 = MockDelay::default();

        block_on(driver.drive(HandCommand::new(HandId(0), Angle::from_degrees(20)), &mut d0))
            .unwrap();

        let (first, second) = block_on(join(
            driver.drive(HandCommand::new(HandId(0), Angle::from_degrees(80)), &mut d0),
            async {
                yield_now().await;
                driver
                    .drive(HandCommand::new(HandId(0), Angle::from_degrees(15)), &mut d1)
                    .await
            },
        ));

        assert_eq!(first, Ok(DriveOutcome::Superseded));
        assert_eq!(second, Ok(DriveOutcome::Completed));
        assert_eq!(driver.status(HandId(0)).unwrap().position, Some(Angle::from_degrees(15)));
        // Far fewer than the 20 steps the first move needed
        assert!(fx.writes() < 12);
    }

    #[test]
    fn test_run_executes_submitted_commands() {
        let fx = Fixture::new();
        let driver = driver(fx.bus(None, false), direct());
        let mut delay = MockDelay::default();
        let target = Angle::from_degrees(270);

        block_on(select(driver.run(HandId(0), &mut delay), async {
            driver.submit(HandCommand::new(HandId(0), target)).unwrap();
            for _ in 0..50 {
                if driver.status(HandId(0)).unwrap().position == Some(target) {
                    break;
                }
                yield_now().await;
            }
        }));

        assert_eq!(driver.status(HandId(0)).unwrap().position, Some(target));
        assert_eq!(fx.writes(), 1);
    }

    #[test]
    fn test_run_retries_recovery() {
        let fx = Fixture::new();
        let config = ActuatorConfig {
            recovery_interval_ms: 100,
            ..direct()
        };
        let driver = driver(fx.bus(None, false), config);
        let mut delay = MockDelay::default();

        fx.failures.set(3);
        let command = HandCommand::new(HandId(0), Angle::from_degrees(90));
        assert!(block_on(driver.drive(command, &mut delay)).is_err());
        assert!(!driver.status(HandId(0)).unwrap().available);

        let mut run_delay = MockDelay::default();
        block_on(select(driver.run(HandId(0), &mut run_delay), async {
            for _ in 0..50 {
                if driver.status(HandId(0)).unwrap().available {
                    break;
                }
                yield_now().await;
            }
        }));

        assert!(driver.status(HandId(0)).unwrap().available);
        assert!(run_delay.total_ms >= 100);
    }

    #[test]
    fn test_recover_needs_reachable_park_pulse() {
        let fx = Fixture::new();
        let config = ActuatorConfig {
            recovery_interval_ms: 100,
            park: Angle::ZERO,
            ..direct()
        };
        let driver = driver(fx.bus(None, false), config);
        let mut delay = MockDelay::default();

        fx.failures.set(3);
        let command = HandCommand::new(HandId(0), Angle::from_degrees(90));
        assert!(block_on(driver.drive(command, &mut delay)).is_err());
        fx.log.borrow_mut().clear();

        // No good pulse yet and park sits outside the calibrated span
        assert_eq!(block_on(driver.recover(HandId(0))), Err(ClockError::OutOfRange));
        assert!(fx.log.borrow().is_empty());

        // The loop keeps retrying instead of giving up
        let mut run_delay = MockDelay::default();
        let outcome = block_on(select(driver.run(HandId(0), &mut run_delay), async {
            for _ in 0..20 {
                yield_now().await;
            }
        }));
        assert!(matches!(outcome, Either::Second(())));
        assert!(run_delay.total_ms >= 200);
        assert!(!driver.status(HandId(0)).unwrap().available);
        assert!(fx.log.borrow().is_empty());
    }

    #[test]
    fn test_run_unknown_hand_returns() {
        let fx = Fixture::new();
        let driver = driver(fx.bus(None, false), direct());
        let mut delay = MockDelay::default();
        assert_eq!(
            block_on(driver.run(HandId(9), &mut delay)),
            Err(ClockError::UnknownHand)
        );
    }

    #[test]
    fn test_park() {
        let fx = Fixture::new();
        let driver = driver(fx.bus(None, false), direct());
        let mut delay = MockDelay::default();
        assert_eq!(block_on(driver.park(HandId(0), &mut delay)), Ok(DriveOutcome::Completed));
        assert_eq!(driver.status(HandId(0)).unwrap().position, Some(Angle::from_degrees(180)));
    }

    #[test]
    fn test_add_hand_rejects_duplicates() {
        let fx = Fixture::new();
        let mut driver: HandActuatorDriver<NoopRawMutex, _> =
            HandActuatorDriver::new(fx.bus(None, false), direct());
        let hand = HandConfig::new(0, "bill", 0).unwrap();
        driver.add_hand(&hand, calibration()).unwrap();
        assert_eq!(
            driver.add_hand(&hand, calibration()),
            Err(ConfigError::DuplicateHand)
        );
        let other = HandConfig::new(1, "charlie", 0).unwrap();
        assert_eq!(
            driver.add_hand(&other, calibration()),
            Err(ConfigError::DuplicateChannel)
        );
    }
}
