//! Trait seams for the peripheral drivers the wake cycle composes.
//!
//! The drivers themselves (register maps, bus protocols, pixel pushing) live
//! in the HAL crate; the cycle only ever sees these narrow contracts.

pub mod mock;

use crate::lunar::LunarDate;

/// Full RTC time/date record.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RtcTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    /// 1 = Monday .. 7 = Sunday.
    pub weekday: u8,
    pub hours: u8,
    pub minutes: u8,
    pub seconds: u8,
    pub twelve_hour: bool,
    pub pm: bool,
}

/// Time written after a clock fault. 2020-10-01 was a Thursday.
pub const DEFAULT_TIME: RtcTime = RtcTime {
    year: 2020,
    month: 10,
    day: 1,
    weekday: 4,
    hours: 0,
    minutes: 0,
    seconds: 0,
    twelve_hour: false,
    pm: false,
};

pub trait RtcClock {
    type Error;

    fn time(&mut self) -> Result<RtcTime, Self::Error>;
    fn set_time(&mut self, time: &RtcTime) -> Result<(), Self::Error>;
    /// True when the oscillator stopped since the flag was last cleared,
    /// meaning the kept time is not trustworthy.
    fn oscillator_stop_fault(&mut self) -> Result<bool, Self::Error>;
    fn periodic_alarm_fired(&mut self) -> Result<bool, Self::Error>;
    fn clear_periodic_alarm(&mut self) -> Result<(), Self::Error>;
    /// Arms the once-per-minute alarm interrupt that wakes the device.
    fn arm_periodic_alarm(&mut self) -> Result<(), Self::Error>;
    fn set_aging_offset(&mut self, offset: i8) -> Result<(), Self::Error>;
    /// Die temperature, degrees C.
    fn temperature(&mut self) -> Result<f32, Self::Error>;
    /// Restores every register, including the kept time, to defaults.
    fn reset_to_defaults(&mut self) -> Result<(), Self::Error>;
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ThReading {
    pub celsius: f32,
    pub humidity: f32,
}

pub trait ThSensor {
    type Error;

    /// Single-shot, checksummed high-accuracy measurement.
    fn read(&mut self) -> Result<ThReading, Self::Error>;
    fn soft_reset(&mut self) -> Result<(), Self::Error>;
    fn set_offsets(&mut self, temperature: f32, humidity: f32) -> Result<(), Self::Error>;
}

pub trait BatteryMonitor {
    type Error;

    /// Calibrated battery rail voltage.
    fn battery_volts(&mut self) -> Result<f32, Self::Error>;
    fn set_vref_offset(&mut self, offset: i16) -> Result<(), Self::Error>;
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ButtonLevels {
    pub up: bool,
    pub down: bool,
    pub set: bool,
}

/// Raw instantaneous line levels; debouncing is the wake cycle's job.
pub trait ButtonInput {
    type Error;

    fn read(&mut self) -> Result<ButtonLevels, Self::Error>;
}

pub trait Beeper {
    type Error;

    fn enable(&mut self) -> Result<(), Self::Error>;
    fn disable(&mut self) -> Result<(), Self::Error>;
    fn set_volume(&mut self, volume: u8) -> Result<(), Self::Error>;
    /// Blocking tone for `duration_ms`.
    fn beep(&mut self, freq_hz: u16, duration_ms: u16) -> Result<(), Self::Error>;
}

pub trait IndicatorLed {
    fn set_on(&mut self, on: bool);
}

/// Everything one refresh paints.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClockView {
    pub time: RtcTime,
    pub lunar: Option<LunarDate>,
    pub sensor: Option<ThReading>,
    pub battery_volts: Option<f32>,
    pub low_battery_warning: bool,
}

/// What an interactive menu session touched.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct MenuOutcome {
    pub settings_changed: bool,
    pub time_changed: bool,
}

/// Frame-level display surface. Pixel composition, busy polling, and the
/// interactive menu all stay behind this seam.
pub trait WakeUi {
    type Error;

    fn show_clock(&mut self, view: &ClockView) -> Result<(), Self::Error>;
    fn show_guide(&mut self) -> Result<(), Self::Error>;
    fn show_low_battery(&mut self) -> Result<(), Self::Error>;
    /// Runs the interactive settings menu. Edits land in the two records;
    /// persisting them is the caller's job.
    fn run_menu(
        &mut self,
        settings: &mut crate::settings::SettingsRecord,
        time: &mut RtcTime,
    ) -> Result<MenuOutcome, Self::Error>;
    fn sleep_panel(&mut self) -> Result<(), Self::Error>;
}
