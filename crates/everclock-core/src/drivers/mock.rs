use core::convert::Infallible;

use log::debug;

use super::{Beeper, ButtonInput, ButtonLevels, IndicatorLed};

/// No-hardware button source used during bring-up; every line reads released.
#[derive(Default, Debug, Clone, Copy)]
pub struct MockButtons;

impl MockButtons {
    pub const fn new() -> Self {
        Self
    }
}

impl ButtonInput for MockButtons {
    type Error = Infallible;

    fn read(&mut self) -> Result<ButtonLevels, Self::Error> {
        Ok(ButtonLevels::default())
    }
}

/// Beeper stand-in that only logs.
#[derive(Default, Debug, Clone, Copy)]
pub struct MockBeeper;

impl Beeper for MockBeeper {
    type Error = Infallible;

    fn enable(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn disable(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_volume(&mut self, volume: u8) -> Result<(), Self::Error> {
        debug!("mock beeper volume {volume}");
        Ok(())
    }

    fn beep(&mut self, freq_hz: u16, duration_ms: u16) -> Result<(), Self::Error> {
        debug!("mock beep {freq_hz} Hz for {duration_ms} ms");
        Ok(())
    }
}

/// Indicator stand-in for boards without the LED fitted.
#[derive(Default, Debug, Clone, Copy)]
pub struct MockLed;

impl IndicatorLed for MockLed {
    fn set_on(&mut self, _on: bool) {}
}
