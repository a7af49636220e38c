//! Piezo buzzer driven as a bit-banged square wave.
//!
//! Volume maps to duty: full volume is a 50 percent square wave, lower
//! settings shrink the on time. Blocking is fine here, tones are short.

use core::convert::Infallible;

use esp_hal::{delay::Delay, gpio::Output};
use everclock_core::{drivers::Beeper, settings::BUZZER_VOLUME_MAX};

pub struct PiezoBuzzer {
    pin: Output<'static>,
    delay: Delay,
    volume: u8,
    enabled: bool,
}

impl PiezoBuzzer {
    pub fn new(pin: Output<'static>) -> Self {
        Self {
            pin,
            delay: Delay::new(),
            volume: BUZZER_VOLUME_MAX,
            enabled: false,
        }
    }
}

impl Beeper for PiezoBuzzer {
    type Error = Infallible;

    fn enable(&mut self) -> Result<(), Self::Error> {
        self.enabled = true;
        Ok(())
    }

    fn disable(&mut self) -> Result<(), Self::Error> {
        self.pin.set_low();
        self.enabled = false;
        Ok(())
    }

    fn set_volume(&mut self, volume: u8) -> Result<(), Self::Error> {
        self.volume = volume.min(BUZZER_VOLUME_MAX);
        Ok(())
    }

    fn beep(&mut self, freq_hz: u16, duration_ms: u16) -> Result<(), Self::Error> {
        if !self.enabled || self.volume == 0 || freq_hz == 0 {
            self.delay.delay_millis(duration_ms as u32);
            return Ok(());
        }

        let period_us = 1_000_000 / freq_hz as u32;
        let high_us = period_us * self.volume as u32 / (2 * BUZZER_VOLUME_MAX as u32);
        let cycles = duration_ms as u32 * 1_000 / period_us.max(1);

        for _ in 0..cycles {
            self.pin.set_high();
            self.delay.delay_micros(high_us);
            self.pin.set_low();
            self.delay.delay_micros(period_us - high_us);
        }
        Ok(())
    }
}
