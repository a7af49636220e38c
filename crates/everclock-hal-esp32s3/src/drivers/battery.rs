//! Battery rail measurement through ADC1 and a resistive divider.

use esp_hal::{
    Blocking,
    analog::adc::{Adc, AdcCalCurve, AdcConfig, AdcPin, Attenuation},
    peripherals::{ADC1, GPIO7},
};
use everclock_core::drivers::BatteryMonitor;

/// The divider halves the rail so a full cell stays inside the attenuated
/// input range.
const DIVIDER_RATIO: f32 = 2.0;

type BatteryCal<'d> = AdcCalCurve<ADC1<'d>>;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum BatteryError {
    AdcRead,
}

pub struct AdcBattery<'d> {
    adc: Adc<'d, ADC1<'d>, Blocking>,
    pin: AdcPin<GPIO7<'d>, ADC1<'d>, BatteryCal<'d>>,
    vref_offset_mv: i16,
}

impl<'d> AdcBattery<'d> {
    pub fn new(adc: ADC1<'d>, pin: GPIO7<'d>) -> Self {
        let mut config = AdcConfig::new();
        let pin = config.enable_pin_with_cal::<_, BatteryCal<'d>>(pin, Attenuation::_11dB);
        Self {
            adc: Adc::new(adc, config),
            pin,
            vref_offset_mv: 0,
        }
    }
}

impl BatteryMonitor for AdcBattery<'_> {
    type Error = BatteryError;

    fn battery_volts(&mut self) -> Result<f32, Self::Error> {
        let mv =
            nb::block!(self.adc.read_oneshot(&mut self.pin)).map_err(|_| BatteryError::AdcRead)?;
        let mv = mv as i32 + self.vref_offset_mv as i32;
        Ok(mv as f32 / 1000.0 * DIVIDER_RATIO)
    }

    fn set_vref_offset(&mut self, offset: i16) -> Result<(), Self::Error> {
        self.vref_offset_mv = offset;
        Ok(())
    }
}
