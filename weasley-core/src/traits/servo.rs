//! Servo bus trait
//!
//! One bus carries the PWM outputs for every hand. Implementations do a
//! single register write per call; retries and exclusivity are handled by
//! the caller.

/// Shared PWM bus driving all hand servos
#[allow(async_fn_in_trait)]
pub trait PulseBus {
    /// Bus-specific error
    type Error;

    /// Set the pulse width of one channel in microseconds
    async fn set_pulse(&mut self, channel: u8, pulse_us: u16) -> Result<(), Self::Error>;
}

impl<T: PulseBus + ?Sized> PulseBus for &mut T {
    type Error = T::Error;

    async fn set_pulse(&mut self, channel: u8, pulse_us: u16) -> Result<(), Self::Error> {
        T::set_pulse(self, channel, pulse_us).await
    }
}
