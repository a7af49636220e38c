#![no_std]
#![no_main]
#![deny(clippy::large_stack_frames)]

use core::cell::RefCell;

use embedded_hal_bus::{i2c::RefCellDevice, spi::ExclusiveDevice};
use esp_hal::{
    clock::CpuClock,
    delay::Delay,
    gpio::{Input, InputConfig, Level, Output, OutputConfig, Pull},
    i2c::master::{Config as I2cConfig, I2c},
    main,
    rtc_cntl::{SocResetReason, reset_reason, wakeup_cause},
    spi::master::{Config as SpiConfig, Spi},
    system::Cpu,
    time::Rate,
};
use everclock_core::{
    boot::ResetCause,
    cycle::{WakeCycle, WakeOutcome},
    power::SleepController,
    scratch::ScratchStore,
    settings::SettingsStore,
};
use everclock_hal_esp32s3::{
    drivers::{
        battery::AdcBattery,
        buttons::{GpioButtons, SharedButtons},
        buzzer::PiezoBuzzer,
        ds3231::Ds3231,
        led::StatusLed,
        sht30::Sht30,
    },
    power::Esp32LowPower,
    storage::{backup::RtcStoreRegisters, eeprom::FlashByteStore},
};
use log::{LevelFilter, error, info};

#[path = "main/ui.rs"]
mod ui;

use ui::EpdUi;

const I2C_FREQ_KHZ: u32 = 400;
const DISPLAY_SPI_HZ: u32 = 4_000_000;

#[panic_handler]
fn panic(_: &core::panic::PanicInfo) -> ! {
    loop {}
}

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

fn classify_reset(reason: Option<SocResetReason>) -> ResetCause {
    match reason {
        Some(SocResetReason::CoreDeepSleep) => ResetCause::WakeFromStandby,
        Some(SocResetReason::ChipPowerOn) | None => ResetCause::PowerOn,
        _ => ResetCause::NormalReset,
    }
}

/// Terminal state for hardware that cannot be brought up at all. Nothing to
/// retry against; a power cycle is the only way out.
fn halt() -> ! {
    loop {}
}

#[main]
fn main() -> ! {
    esp_println::logger::init_logger(LevelFilter::Info);

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    let boot_reset_reason = reset_reason(Cpu::ProCpu);
    let boot_wakeup_cause = wakeup_cause();
    info!(
        "boot reset_reason={:?} wakeup_cause={:?}",
        boot_reset_reason, boot_wakeup_cause
    );
    let cause = classify_reset(boot_reset_reason);

    // I2C bus shared by the clock and the sensor:
    // SDA=GPIO8 SCL=GPIO9, DS3231 INT=GPIO1.
    let i2c_cfg = I2cConfig::default().with_frequency(Rate::from_khz(I2C_FREQ_KHZ));
    let i2c = match I2c::new(peripherals.I2C0, i2c_cfg) {
        Ok(i2c) => i2c.with_sda(peripherals.GPIO8).with_scl(peripherals.GPIO9),
        Err(err) => {
            error!("i2c init failed: {:?}", err);
            halt();
        }
    };
    let i2c_bus = RefCell::new(i2c);
    let rtc = Ds3231::new(RefCellDevice::new(&i2c_bus));
    let sensor = Sht30::new(RefCellDevice::new(&i2c_bus));

    let battery = AdcBattery::new(peripherals.ADC1, peripherals.GPIO7);

    // Buttons: UP=GPIO2 DOWN=GPIO3 SET=GPIO4, active low.
    let input_cfg = InputConfig::default().with_pull(Pull::Up);
    let buttons = RefCell::new(GpioButtons::new(
        Input::new(peripherals.GPIO2, input_cfg),
        Input::new(peripherals.GPIO3, input_cfg),
        Input::new(peripherals.GPIO4, input_cfg),
    ));
    // The alarm line is only sampled by the wake logic in deep sleep, but it
    // needs its pull-up while awake so a firing alarm is a clean edge.
    let _alarm_line = Input::new(peripherals.GPIO1, input_cfg);

    let buzzer = PiezoBuzzer::new(Output::new(
        peripherals.GPIO5,
        Level::Low,
        OutputConfig::default(),
    ));
    let led = StatusLed::new(Output::new(
        peripherals.GPIO6,
        Level::Low,
        OutputConfig::default(),
    ));

    // Panel wiring: SCK=GPIO12 MOSI=GPIO11 CS=GPIO10 DC=GPIO13 RST=GPIO14
    // BUSY=GPIO15.
    let spi_cfg = SpiConfig::default().with_frequency(Rate::from_hz(DISPLAY_SPI_HZ));
    let spi = match Spi::new(peripherals.SPI2, spi_cfg) {
        Ok(spi) => spi
            .with_sck(peripherals.GPIO12)
            .with_mosi(peripherals.GPIO11),
        Err(err) => {
            error!("spi init failed: {:?}", err);
            halt();
        }
    };
    let panel_cs = Output::new(peripherals.GPIO10, Level::High, OutputConfig::default());
    let spi_dev = match ExclusiveDevice::new(spi, panel_cs, Delay::new()) {
        Ok(dev) => dev,
        Err(err) => {
            error!("spi device init failed: {:?}", err);
            halt();
        }
    };
    let panel_busy = Input::new(peripherals.GPIO15, InputConfig::default());
    let panel_dc = Output::new(peripherals.GPIO13, Level::Low, OutputConfig::default());
    let panel_rst = Output::new(peripherals.GPIO14, Level::High, OutputConfig::default());

    let ui = match EpdUi::new(
        spi_dev,
        panel_busy,
        panel_dc,
        panel_rst,
        SharedButtons::new(&buttons),
    ) {
        Ok(ui) => ui,
        Err(err) => {
            error!("panel init failed: {:?}", err);
            halt();
        }
    };

    let settings_flash = match FlashByteStore::new() {
        Ok(store) => store,
        Err(err) => {
            error!("settings flash unavailable: {:?}", err);
            halt();
        }
    };

    let mut cycle = WakeCycle {
        rtc,
        sensor,
        battery,
        buttons: SharedButtons::new(&buttons),
        buzzer,
        ui,
        led,
        settings: SettingsStore::new(settings_flash),
        scratch: ScratchStore::new(RtcStoreRegisters::new()),
        power: SleepController::new(Esp32LowPower::new()),
    };

    match cycle.run(cause) {
        WakeOutcome::ReadyForStandby => cycle.power.enter_deep_sleep(),
        WakeOutcome::LowBatteryLockout => cycle.low_battery_lockout(),
    }
}
