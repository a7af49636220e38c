//! Status LED, driven high to light.

use esp_hal::gpio::Output;
use everclock_core::drivers::IndicatorLed;

pub struct StatusLed {
    pin: Output<'static>,
}

impl StatusLed {
    pub fn new(pin: Output<'static>) -> Self {
        Self { pin }
    }
}

impl IndicatorLed for StatusLed {
    fn set_on(&mut self, on: bool) {
        if on {
            self.pin.set_high();
        } else {
            self.pin.set_low();
        }
    }
}
