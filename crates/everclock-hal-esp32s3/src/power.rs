//! Standby and reset primitives for the esp32s3.

use esp_hal::{
    delay::Delay,
    gpio::RtcPin,
    peripherals::{GPIO1, GPIO2, GPIO3, GPIO4, LPWR},
    rtc_cntl::{
        Rtc,
        sleep::{RtcioWakeupSource, TimerWakeupSource, WakeupLevel},
    },
    system::software_reset,
};
use everclock_core::power::PowerPlatform;

/// Deep sleep with the RTC alarm line and all three buttons as wake sources.
/// Wake pins match the wiring in the binary crate: alarm on GPIO1, buttons
/// on GPIO2-4, all active low.
pub struct Esp32LowPower {
    delay: Delay,
}

impl Esp32LowPower {
    pub fn new() -> Self {
        Self {
            delay: Delay::new(),
        }
    }
}

impl PowerPlatform for Esp32LowPower {
    fn try_enter_standby(&mut self) {
        // The wake pins are inputs owned by the running cycle; by the time we
        // are here nothing reads them again before the chip powers down.
        let mut alarm = unsafe { GPIO1::steal() };
        let mut up = unsafe { GPIO2::steal() };
        let mut down = unsafe { GPIO3::steal() };
        let mut set = unsafe { GPIO4::steal() };
        let mut wake_pins: [(&mut dyn RtcPin, WakeupLevel); 4] = [
            (&mut alarm, WakeupLevel::Low),
            (&mut up, WakeupLevel::Low),
            (&mut down, WakeupLevel::Low),
            (&mut set, WakeupLevel::Low),
        ];
        let wake_source = RtcioWakeupSource::new(&mut wake_pins);

        let mut rtc = Rtc::new(unsafe { LPWR::steal() });
        rtc.sleep_deep(&[&wake_source]);
    }

    fn light_sleep_ms(&mut self, ms: u32) {
        let timer = TimerWakeupSource::new(core::time::Duration::from_millis(ms as u64));
        let mut rtc = Rtc::new(unsafe { LPWR::steal() });
        rtc.sleep_light(&[&timer]);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delay.delay_millis(ms);
    }

    fn system_reset(&mut self) -> ! {
        software_reset()
    }
}
