//! PCA9685 16-channel PWM controller (I²C)
//!
//! Each channel has a 12-bit counter running at `osc / (4096 · (prescale + 1))`.
//! A servo pulse is programmed as ON at tick 0 and OFF at the tick matching
//! the pulse width.
//!
//! # Write Format
//!
//! ```text
//! [LEDn_ON_L] [ON_L] [ON_H] [OFF_L] [OFF_H]     (auto-increment enabled)
//! ```

use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;

use weasley_core::config::MAX_CHANNELS;
use weasley_core::traits::PulseBus;

/// PCA9685 register addresses
pub mod reg {
    /// Mode register 1
    pub const MODE1: u8 = 0x00;
    /// Mode register 2
    pub const MODE2: u8 = 0x01;
    /// Channel 0 ON low byte (each channel occupies 4 registers)
    pub const LED0_ON_L: u8 = 0x06;
    /// PWM frequency prescaler
    pub const PRESCALE: u8 = 0xFE;
}

/// MODE1 bits
pub mod mode1 {
    /// Restart enabled
    pub const RESTART: u8 = 0x80;
    /// Register auto-increment
    pub const AI: u8 = 0x20;
    /// Low power mode, oscillator off
    pub const SLEEP: u8 = 0x10;
    /// Respond to the all-call address
    pub const ALLCALL: u8 = 0x01;
}

/// Default 7-bit I²C address (A0..A5 low)
pub const DEFAULT_ADDRESS: u8 = 0x40;

/// Internal oscillator frequency
pub const OSC_HZ: u32 = 25_000_000;

/// Counter resolution
const TICKS_PER_PERIOD: u32 = 4096;

/// Oscillator start-up time after leaving sleep
const WAKE_DELAY_US: u32 = 500;

/// PCA9685 errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Pca9685Error<E> {
    /// I²C transfer failed
    I2c(E),
    /// Channel outside 0..16
    InvalidChannel,
    /// Frequency outside what the prescaler can produce
    InvalidFrequency,
}

/// PCA9685 configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Pca9685Config {
    /// 7-bit I²C address
    pub address: u8,
    /// PWM frame rate in Hz (servos expect 50)
    pub frequency_hz: u16,
}

impl Default for Pca9685Config {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS,
            frequency_hz: 50,
        }
    }
}

impl Pca9685Config {
    /// Prescale value for the configured frequency
    ///
    /// `round(osc / (4096 · f)) − 1`, valid between 3 and 255.
    pub fn prescale(&self) -> Option<u8> {
        if self.frequency_hz == 0 {
            return None;
        }
        let divisor = TICKS_PER_PERIOD * self.frequency_hz as u32;
        let value = (OSC_HZ + divisor / 2) / divisor;
        match value.checked_sub(1) {
            Some(p) if (3..=255).contains(&p) => Some(p as u8),
            _ => None,
        }
    }

    /// PWM period in microseconds
    pub fn period_us(&self) -> u32 {
        1_000_000 / self.frequency_hz.max(1) as u32
    }

    /// Counter ticks for a pulse width, clamped to one full period
    pub fn pulse_to_ticks(&self, pulse_us: u16) -> u16 {
        let ticks = pulse_us as u32 * TICKS_PER_PERIOD / self.period_us();
        ticks.min(TICKS_PER_PERIOD - 1) as u16
    }
}

/// Build the register write for one channel: ON at 0, OFF at `off_ticks`
pub fn build_channel_write(channel: u8, off_ticks: u16) -> [u8; 5] {
    let [off_l, off_h] = off_ticks.to_le_bytes();
    [reg::LED0_ON_L + 4 * channel, 0, 0, off_l, off_h & 0x0F]
}

/// PCA9685 driver
pub struct Pca9685<I2C> {
    i2c: I2C,
    config: Pca9685Config,
}

impl<I2C: I2c> Pca9685<I2C> {
    /// Create a driver; call [`Pca9685::init`] before the first pulse
    pub fn new(i2c: I2C, config: Pca9685Config) -> Self {
        Self { i2c, config }
    }

    /// Program the prescaler and start the oscillator
    ///
    /// The prescaler can only be written while asleep, so the sequence is
    /// sleep, prescale, wake, wait for the oscillator, restart.
    pub async fn init<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), Pca9685Error<I2C::Error>> {
        let prescale = self
            .config
            .prescale()
            .ok_or(Pca9685Error::InvalidFrequency)?;

        self.write_reg(reg::MODE1, mode1::SLEEP | mode1::ALLCALL).await?;
        self.write_reg(reg::PRESCALE, prescale).await?;
        self.write_reg(reg::MODE1, mode1::AI | mode1::ALLCALL).await?;
        delay.delay_us(WAKE_DELAY_US).await;
        self.write_reg(reg::MODE1, mode1::RESTART | mode1::AI | mode1::ALLCALL)
            .await?;

        debug!("pca9685 ready, prescale {}", prescale);
        Ok(())
    }

    /// Write a pulse width to one channel
    pub async fn write_pulse(&mut self, channel: u8, pulse_us: u16) -> Result<(), Pca9685Error<I2C::Error>> {
        if channel >= MAX_CHANNELS {
            return Err(Pca9685Error::InvalidChannel);
        }
        let ticks = self.config.pulse_to_ticks(pulse_us);
        let frame = build_channel_write(channel, ticks);
        self.i2c
            .write(self.config.address, &frame)
            .await
            .map_err(Pca9685Error::I2c)
    }

    /// Get the configuration
    pub fn config(&self) -> &Pca9685Config {
        &self.config
    }

    /// Release the underlying bus
    pub fn into_inner(self) -> I2C {
        self.i2c
    }

    async fn write_reg(&mut self, register: u8, value: u8) -> Result<(), Pca9685Error<I2C::Error>> {
        self.i2c
            .write(self.config.address, &[register, value])
            .await
            .map_err(Pca9685Error::I2c)
    }
}

impl<I2C: I2c> PulseBus for Pca9685<I2C> {
    type Error = Pca9685Error<I2C::Error>;

    async fn set_pulse(&mut self, channel: u8, pulse_us: u16) -> Result<(), Self::Error> {
        self.write_pulse(channel, pulse_us).await
    }
}
