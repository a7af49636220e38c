//! Scratch dwords in the RTC_CNTL store registers.
//!
//! The store registers sit in the always-on RTC power domain, so their
//! contents survive deep sleep and software resets but not a power cycle.
//! Nothing else in this firmware claims them.

use everclock_core::scratch::BackupRegisters;

/// RTC_CNTL_STORE0_REG on the esp32s3; STORE1 follows at +4.
const RTC_STORE_BASE: usize = 0x6000_80B0;
const RTC_STORE_COUNT: u8 = 2;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum BackupError {
    IndexOutOfRange,
}

/// Owns the store register block. Construct exactly one.
#[derive(Debug, Default)]
pub struct RtcStoreRegisters;

impl RtcStoreRegisters {
    pub const fn new() -> Self {
        Self
    }

    fn reg(index: u8) -> Result<*mut u32, BackupError> {
        if index >= RTC_STORE_COUNT {
            return Err(BackupError::IndexOutOfRange);
        }
        Ok((RTC_STORE_BASE + 4 * index as usize) as *mut u32)
    }
}

impl BackupRegisters for RtcStoreRegisters {
    type Error = BackupError;

    fn read_dword(&mut self, index: u8) -> Result<u32, Self::Error> {
        let reg = Self::reg(index)?;
        Ok(unsafe { reg.read_volatile() })
    }

    fn write_dword(&mut self, index: u8, value: u32) -> Result<(), Self::Error> {
        let reg = Self::reg(index)?;
        unsafe { reg.write_volatile(value) };
        Ok(())
    }

    fn reset_all(&mut self) -> Result<(), Self::Error> {
        for index in 0..RTC_STORE_COUNT {
            self.write_dword(index, 0)?;
        }
        Ok(())
    }
}
