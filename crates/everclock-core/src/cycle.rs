//! One wake cycle: boot dispatch, calibration, safety checks, refresh, sleep.

use core::fmt::{Debug, Write};

use heapless::String;
use log::{info, warn};

use crate::{
    boot::{self, BootAction, BootInputs, ResetCause},
    drivers::{
        BatteryMonitor, Beeper, ButtonInput, ButtonLevels, ClockView, DEFAULT_TIME, IndicatorLed,
        RtcClock, RtcTime, ThReading, ThSensor, WakeUi,
    },
    lunar,
    power::{PowerPlatform, SleepController},
    scratch::{BackupRegisters, ScratchStore},
    settings::{ByteStore, SettingsRecord, SettingsStore},
};

/// Stable-read interval for the fixed-duration button re-check.
pub const DEBOUNCE_INTERVAL_MS: u32 = 10;

/// Confirmation tone sequence played around a full reinitialization.
const REINIT_BEEP_HZ: u16 = 1_000;
const REINIT_BEEP_MS: u16 = 49;
const REINIT_BEEP_GAP_MS: u32 = 49;
const REINIT_DONE_BEEP_MS: u16 = 199;
const REINIT_BEEP_VOLUME: u8 = 5;

/// Low-battery lockout blink cadence.
const LOCKOUT_BLINK_ON_MS: u32 = 100;
const LOCKOUT_LIGHT_SLEEP_MS: u32 = 2_000;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WakeOutcome {
    /// Cycle complete; the caller enters standby.
    ReadyForStandby,
    /// Battery below the stop threshold; the caller enters the lockout loop.
    LowBatteryLockout,
}

/// Context bundle for one wake cycle. Built fresh after every reset; nothing
/// in here outlives the cycle except through the two stores.
pub struct WakeCycle<RTC, SEN, BAT, BTN, BZR, UI, LED, EE, BK, PWR>
where
    RTC: RtcClock,
    SEN: ThSensor,
    BAT: BatteryMonitor,
    BTN: ButtonInput,
    BZR: Beeper,
    UI: WakeUi,
    LED: IndicatorLed,
    EE: ByteStore,
    BK: BackupRegisters,
    PWR: PowerPlatform,
{
    pub rtc: RTC,
    pub sensor: SEN,
    pub battery: BAT,
    pub buttons: BTN,
    pub buzzer: BZR,
    pub ui: UI,
    pub led: LED,
    pub settings: SettingsStore<EE>,
    pub scratch: ScratchStore<BK>,
    pub power: SleepController<PWR>,
}

impl<RTC, SEN, BAT, BTN, BZR, UI, LED, EE, BK, PWR>
    WakeCycle<RTC, SEN, BAT, BTN, BZR, UI, LED, EE, BK, PWR>
where
    RTC: RtcClock,
    RTC::Error: Debug,
    SEN: ThSensor,
    SEN::Error: Debug,
    BAT: BatteryMonitor,
    BAT::Error: Debug,
    BTN: ButtonInput,
    BTN::Error: Debug,
    BZR: Beeper,
    BZR::Error: Debug,
    UI: WakeUi,
    UI::Error: Debug,
    LED: IndicatorLed,
    EE: ByteStore,
    EE::Error: Debug,
    BK: BackupRegisters,
    BK::Error: Debug,
    PWR: PowerPlatform,
{
    /// Executes one wake cycle and reports how it should end. The caller owns
    /// the two non-returning tails (`enter_deep_sleep`,
    /// `low_battery_lockout`) so this stays testable.
    pub fn run(&mut self, cause: ResetCause) -> WakeOutcome {
        let buttons = self.read_buttons_debounced();
        let inputs = BootInputs {
            cause,
            oscillator_stop_fault: self.rtc.oscillator_stop_fault().unwrap_or_else(|err| {
                // A flaky bus must not wipe the device; treat as no fault.
                warn!("oscillator flag read failed: {err:?}");
                false
            }),
            periodic_alarm_fired: self.rtc.periodic_alarm_fired().unwrap_or_else(|err| {
                warn!("alarm flag read failed: {err:?}");
                false
            }),
            up_pressed: buttons.up,
            down_pressed: buttons.down,
            set_pressed: buttons.set,
            reset_requested: self.scratch.read_reset_request().unwrap_or_else(|err| {
                warn!("reset request read failed: {err:?}");
                false
            }),
        };

        let action = boot::decide(&inputs);
        info!("wake cause {:?} -> {:?}", inputs.cause, action);

        let mut settings = self.settings.load().unwrap_or_else(|err| {
            warn!("settings load failed: {err:?}, using defaults this cycle");
            SettingsRecord::DEFAULT
        });

        match action {
            BootAction::NormalBoot => {}
            BootAction::FullReinitThenGuide => {
                self.full_reinit();
                settings = SettingsRecord::DEFAULT;
                if let Err(err) = self.ui.show_guide() {
                    warn!("guide screen failed: {err:?}");
                }
            }
            BootAction::WakeRefresh => {
                if inputs.periodic_alarm_fired
                    && let Err(err) = self.rtc.clear_periodic_alarm()
                {
                    warn!("alarm clear failed: {err:?}");
                }
            }
            BootAction::EnterMenu => {
                self.wait_set_release();
                self.run_menu(&mut settings);
            }
        }

        self.apply_calibration(&settings);

        // Safety check before any further panel work. The cached reading is
        // preferred when plausible; a fresh sample is always taken so it can
        // be re-cached before sleep.
        let cached = self.scratch.read_cached_battery().unwrap_or_else(|err| {
            warn!("cached battery read failed: {err:?}");
            None
        });
        let fresh = match self.battery.battery_volts() {
            Ok(volts) => Some(volts),
            Err(err) => {
                warn!("battery sample failed: {err:?}");
                None
            }
        };
        let volts = cached.or(fresh);
        if let Some(volts) = volts
            && volts < settings.battery_stop_volts
        {
            warn!(
                "battery {volts:.2} V below stop threshold {:.2} V",
                settings.battery_stop_volts
            );
            if let Err(err) = self.ui.show_low_battery() {
                warn!("low battery screen failed: {err:?}");
            }
            return WakeOutcome::LowBatteryLockout;
        }

        self.refresh_display(&settings, volts);

        if let Some(volts) = fresh
            && let Err(err) = self.scratch.write_cached_battery(volts)
        {
            warn!("battery cache write failed: {err:?}");
        }
        if let Err(err) = self.ui.sleep_panel() {
            warn!("panel sleep failed: {err:?}");
        }
        WakeOutcome::ReadyForStandby
    }

    /// Permanent low-battery stop: blink and doze until an external reset or
    /// power cycle. Writing to the panel or the stores in this state risks
    /// corrupting them.
    pub fn low_battery_lockout(&mut self) -> ! {
        loop {
            self.led.set_on(true);
            self.power.delay_ms(LOCKOUT_BLINK_ON_MS);
            self.led.set_on(false);
            self.power.enter_timed_light_sleep(LOCKOUT_LIGHT_SLEEP_MS);
        }
    }

    fn refresh_display(&mut self, settings: &SettingsRecord, battery_volts: Option<f32>) {
        let time = match self.rtc.time() {
            Ok(time) => time,
            Err(err) => {
                warn!("rtc read failed: {err:?}");
                DEFAULT_TIME
            }
        };
        let lunar = match lunar::solar_to_lunar(time.year, time.month, time.day) {
            Ok(date) => Some(date),
            Err(err) => {
                warn!(
                    "no lunar date for {}-{:02}-{:02}: {err:?}",
                    time.year, time.month, time.day
                );
                None
            }
        };
        let sensor = match self.sensor.read() {
            Ok(reading) => Some(reading),
            Err(err) => {
                warn!("sensor read failed: {err:?}");
                None
            }
        };
        self.log_status(&time, sensor.as_ref(), battery_volts);

        let view = ClockView {
            time,
            lunar,
            sensor,
            battery_volts,
            low_battery_warning: battery_volts.is_some_and(|v| v < settings.battery_warn_volts),
        };
        if let Err(err) = self.ui.show_clock(&view) {
            warn!("clock refresh failed: {err:?}");
        }
        if let Err(err) = self.rtc.arm_periodic_alarm() {
            warn!("alarm arm failed: {err:?}");
        }
    }

    /// Per-cycle serial dump of the readings.
    fn log_status(&mut self, time: &RtcTime, sensor: Option<&ThReading>, battery: Option<f32>) {
        let mut line: String<96> = String::new();
        let _ = write!(
            line,
            "RTC: {:04}-{:02}-{:02} w{} {:02}:{:02}:{:02}",
            time.year, time.month, time.day, time.weekday, time.hours, time.minutes, time.seconds
        );
        if let Ok(celsius) = self.rtc.temperature() {
            let _ = write!(line, " TEMP:{celsius:5.2}");
        }
        info!("{line}");
        if let Some(reading) = sensor {
            info!("TH : TEMP:{:5.2} RH:{:5.2}", reading.celsius, reading.humidity);
        }
        if let Some(volts) = battery {
            info!("ADC: BAT:{volts:5.2}");
        }
    }

    fn run_menu(&mut self, settings: &mut SettingsRecord) {
        let mut time = match self.rtc.time() {
            Ok(time) => time,
            Err(err) => {
                warn!("rtc read failed: {err:?}");
                DEFAULT_TIME
            }
        };
        match self.ui.run_menu(settings, &mut time) {
            Ok(outcome) => {
                if outcome.time_changed
                    && let Err(err) = self.rtc.set_time(&time)
                {
                    warn!("time update failed: {err:?}");
                }
                if outcome.settings_changed
                    && let Err(err) = self.settings.save(settings)
                {
                    warn!("settings save failed: {err:?}");
                }
            }
            Err(err) => warn!("menu failed: {err:?}"),
        }
    }

    fn apply_calibration(&mut self, settings: &SettingsRecord) {
        if let Err(err) = self
            .sensor
            .set_offsets(settings.temperature_offset, settings.humidity_offset)
        {
            warn!("sensor calibration failed: {err:?}");
        }
        if let Err(err) = self.battery.set_vref_offset(settings.vref_offset) {
            warn!("vref calibration failed: {err:?}");
        }
        if let Err(err) = self.rtc.set_aging_offset(settings.rtc_aging_offset) {
            warn!("aging calibration failed: {err:?}");
        }
    }

    /// Read, wait, re-read. A line counts as pressed only when both reads
    /// agree, so a bouncing edge cannot trigger a reinit or a menu.
    fn read_buttons_debounced(&mut self) -> ButtonLevels {
        let first = match self.buttons.read() {
            Ok(levels) => levels,
            Err(err) => {
                warn!("button read failed: {err:?}");
                return ButtonLevels::default();
            }
        };
        self.power.delay_ms(DEBOUNCE_INTERVAL_MS);
        let second = match self.buttons.read() {
            Ok(levels) => levels,
            Err(err) => {
                warn!("button read failed: {err:?}");
                return ButtonLevels::default();
            }
        };
        ButtonLevels {
            up: first.up && second.up,
            down: first.down && second.down,
            set: first.set && second.set,
        }
    }

    /// The set line is usually still held from the press that woke the
    /// device; the menu should start with a clean input state.
    fn wait_set_release(&mut self) {
        loop {
            match self.buttons.read() {
                Ok(levels) if !levels.set => break,
                Ok(_) => self.power.delay_ms(DEBOUNCE_INTERVAL_MS),
                Err(err) => {
                    warn!("button read failed: {err:?}");
                    break;
                }
            }
        }
    }

    fn full_reinit(&mut self) {
        info!("begin full data reset");
        if let Err(err) = self.buzzer.enable() {
            warn!("buzzer enable failed: {err:?}");
        }
        if let Err(err) = self.buzzer.set_volume(REINIT_BEEP_VOLUME) {
            warn!("buzzer volume failed: {err:?}");
        }
        for _ in 0..3 {
            if let Err(err) = self.buzzer.beep(REINIT_BEEP_HZ, REINIT_BEEP_MS) {
                warn!("confirmation beep failed: {err:?}");
            }
            self.power.delay_ms(REINIT_BEEP_GAP_MS);
        }

        match self.rtc.reset_to_defaults() {
            Ok(()) => info!("rtc reset done"),
            Err(err) => warn!("rtc reset failed: {err:?}"),
        }
        match self.sensor.soft_reset() {
            Ok(()) => info!("sensor reset done"),
            Err(err) => warn!("sensor reset failed: {err:?}"),
        }
        // Also consumes a pending reset request.
        match self.scratch.reset_all() {
            Ok(()) => info!("scratch reset done"),
            Err(err) => warn!("scratch reset failed: {err:?}"),
        }
        match self.settings.save(&SettingsRecord::DEFAULT) {
            Ok(()) => info!("settings reset done"),
            Err(err) => warn!("settings reset failed: {err:?}"),
        }

        if let Err(err) = self.buzzer.beep(REINIT_BEEP_HZ, REINIT_DONE_BEEP_MS) {
            warn!("completion beep failed: {err:?}");
        }
        if let Err(err) = self.buzzer.disable() {
            warn!("buzzer disable failed: {err:?}");
        }
    }
}
