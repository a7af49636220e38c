//! Bounded, fail-safe transitions into the low-power states.

use log::{debug, warn};

/// Platform primitives driven by the controller. `try_enter_standby` only
/// ever returns when the hardware refused to enter standby (a pending
/// interrupt or a peripheral holding the core awake).
pub trait PowerPlatform {
    fn try_enter_standby(&mut self);
    fn light_sleep_ms(&mut self, ms: u32);
    fn delay_ms(&mut self, ms: u32);
    fn system_reset(&mut self) -> !;
}

/// Two tries, then reset. A persistently failing part must not spin forever
/// drawing power instead of sleeping, and there is no supervisor above the
/// firmware to escalate to. Empirical constants from the source hardware.
pub const STANDBY_ATTEMPTS: u32 = 2;
pub const STANDBY_RETRY_DELAY_MS: u32 = 1_000;

pub struct SleepController<P: PowerPlatform> {
    platform: P,
}

impl<P: PowerPlatform> SleepController<P> {
    pub fn new(platform: P) -> Self {
        Self { platform }
    }

    /// On success control resumes only through a wake reset at the top of the
    /// next cycle. Both attempts failing forces a full system reset.
    pub fn enter_deep_sleep(&mut self) -> ! {
        for attempt in 1..=STANDBY_ATTEMPTS {
            debug!("entering standby, attempt {attempt}");
            self.platform.try_enter_standby();
            warn!("standby entry failed, attempt {attempt}");
            if attempt < STANDBY_ATTEMPTS {
                self.platform.delay_ms(STANDBY_RETRY_DELAY_MS);
            }
        }
        warn!("standby unavailable, forcing system reset");
        self.platform.system_reset()
    }

    /// Bounded lighter sleep used to wait out slow peripherals; always
    /// returns once the timeout elapses.
    pub fn enter_timed_light_sleep(&mut self, ms: u32) {
        self.platform.light_sleep_ms(ms);
    }

    pub fn delay_ms(&mut self, ms: u32) {
        self.platform.delay_ms(ms);
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use core::sync::atomic::{AtomicU32, Ordering};
    use std::panic::{AssertUnwindSafe, catch_unwind};

    static STANDBY_CALLS: AtomicU32 = AtomicU32::new(0);
    static DELAY_CALLS: AtomicU32 = AtomicU32::new(0);
    static LAST_DELAY_MS: AtomicU32 = AtomicU32::new(0);
    static RESET_CALLS: AtomicU32 = AtomicU32::new(0);

    /// Standby entry always fails; reset unwinds so the test regains control.
    struct FailingStandby;

    impl PowerPlatform for FailingStandby {
        fn try_enter_standby(&mut self) {
            STANDBY_CALLS.fetch_add(1, Ordering::SeqCst);
        }

        fn light_sleep_ms(&mut self, _ms: u32) {}

        fn delay_ms(&mut self, ms: u32) {
            DELAY_CALLS.fetch_add(1, Ordering::SeqCst);
            LAST_DELAY_MS.store(ms, Ordering::SeqCst);
        }

        fn system_reset(&mut self) -> ! {
            RESET_CALLS.fetch_add(1, Ordering::SeqCst);
            panic!("system reset");
        }
    }

    #[test]
    fn failed_standby_retries_once_then_resets() {
        STANDBY_CALLS.store(0, Ordering::SeqCst);
        DELAY_CALLS.store(0, Ordering::SeqCst);
        RESET_CALLS.store(0, Ordering::SeqCst);

        let result = catch_unwind(AssertUnwindSafe(|| {
            let mut sleep = SleepController::new(FailingStandby);
            sleep.enter_deep_sleep();
        }));

        assert!(result.is_err());
        assert_eq!(STANDBY_CALLS.load(Ordering::SeqCst), 2);
        assert_eq!(DELAY_CALLS.load(Ordering::SeqCst), 1);
        assert_eq!(LAST_DELAY_MS.load(Ordering::SeqCst), STANDBY_RETRY_DELAY_MS);
        assert_eq!(RESET_CALLS.load(Ordering::SeqCst), 1);
    }

    #[derive(Default)]
    struct CountingPlatform {
        light_sleeps: u32,
        last_light_sleep_ms: u32,
    }

    impl PowerPlatform for &mut CountingPlatform {
        fn try_enter_standby(&mut self) {}

        fn light_sleep_ms(&mut self, ms: u32) {
            self.light_sleeps += 1;
            self.last_light_sleep_ms = ms;
        }

        fn delay_ms(&mut self, _ms: u32) {}

        fn system_reset(&mut self) -> ! {
            unreachable!("not exercised");
        }
    }

    #[test]
    fn timed_light_sleep_passes_through_and_returns() {
        let mut platform = CountingPlatform::default();
        let mut sleep = SleepController::new(&mut platform);
        sleep.enter_timed_light_sleep(250);
        sleep.enter_timed_light_sleep(2_000);

        assert_eq!(platform.light_sleeps, 2);
        assert_eq!(platform.last_light_sleep_ms, 2_000);
    }
}
