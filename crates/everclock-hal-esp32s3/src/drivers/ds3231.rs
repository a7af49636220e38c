//! DS3231 real-time clock over I2C.
//!
//! Alarm 2 is programmed with all mask bits set, which makes it fire at
//! second 00 of every minute; INT stays routed to the interrupt output so the
//! falling edge can wake the chip from deep sleep.

use embedded_hal::i2c::I2c;
use everclock_core::drivers::{DEFAULT_TIME, RtcClock, RtcTime};

pub const DS3231_ADDR: u8 = 0x68;

const REG_SECONDS: u8 = 0x00;
const REG_ALARM2_MINUTES: u8 = 0x0B;
const REG_CONTROL: u8 = 0x0E;
const REG_STATUS: u8 = 0x0F;
const REG_AGING: u8 = 0x10;
const REG_TEMP_MSB: u8 = 0x11;

const CONTROL_A2IE: u8 = 0x02;
const CONTROL_INTCN: u8 = 0x04;
const STATUS_A2F: u8 = 0x02;
const STATUS_OSF: u8 = 0x80;

const HOUR_12H_MODE: u8 = 0x40;
const HOUR_PM: u8 = 0x20;
const MONTH_CENTURY: u8 = 0x80;

/// Alarm 2 minute/hour/day registers with every mask bit set.
const ALARM2_EVERY_MINUTE: [u8; 3] = [0x80, 0x80, 0x80];

pub struct Ds3231<I2C> {
    i2c: I2C,
}

impl<I2C: I2c> Ds3231<I2C> {
    pub fn new(i2c: I2C) -> Self {
        Self { i2c }
    }

    fn read_reg(&mut self, reg: u8) -> Result<u8, I2C::Error> {
        let mut buf = [0u8; 1];
        self.i2c.write_read(DS3231_ADDR, &[reg], &mut buf)?;
        Ok(buf[0])
    }

    fn write_reg(&mut self, reg: u8, value: u8) -> Result<(), I2C::Error> {
        self.i2c.write(DS3231_ADDR, &[reg, value])
    }
}

impl<I2C: I2c> RtcClock for Ds3231<I2C> {
    type Error = I2C::Error;

    fn time(&mut self) -> Result<RtcTime, Self::Error> {
        let mut buf = [0u8; 7];
        self.i2c.write_read(DS3231_ADDR, &[REG_SECONDS], &mut buf)?;

        let twelve_hour = buf[2] & HOUR_12H_MODE != 0;
        let (hours, pm) = if twelve_hour {
            (bcd_decode(buf[2] & 0x1F), buf[2] & HOUR_PM != 0)
        } else {
            (bcd_decode(buf[2] & 0x3F), false)
        };
        let century = buf[5] & MONTH_CENTURY != 0;
        let year = 2000 + bcd_decode(buf[6]) as u16 + if century { 100 } else { 0 };

        Ok(RtcTime {
            year,
            month: bcd_decode(buf[5] & 0x1F),
            day: bcd_decode(buf[4] & 0x3F),
            weekday: bcd_decode(buf[3] & 0x07),
            hours,
            minutes: bcd_decode(buf[1] & 0x7F),
            seconds: bcd_decode(buf[0] & 0x7F),
            twelve_hour,
            pm,
        })
    }

    fn set_time(&mut self, time: &RtcTime) -> Result<(), Self::Error> {
        let century = time.year >= 2100;
        let year = (time.year % 100) as u8;
        let hour_reg = if time.twelve_hour {
            HOUR_12H_MODE | if time.pm { HOUR_PM } else { 0 } | bcd_encode(time.hours)
        } else {
            bcd_encode(time.hours)
        };
        let month_reg = bcd_encode(time.month) | if century { MONTH_CENTURY } else { 0 };

        self.i2c.write(
            DS3231_ADDR,
            &[
                REG_SECONDS,
                bcd_encode(time.seconds),
                bcd_encode(time.minutes),
                hour_reg,
                bcd_encode(time.weekday),
                bcd_encode(time.day),
                month_reg,
                bcd_encode(year),
            ],
        )
    }

    fn oscillator_stop_fault(&mut self) -> Result<bool, Self::Error> {
        Ok(self.read_reg(REG_STATUS)? & STATUS_OSF != 0)
    }

    fn periodic_alarm_fired(&mut self) -> Result<bool, Self::Error> {
        Ok(self.read_reg(REG_STATUS)? & STATUS_A2F != 0)
    }

    fn clear_periodic_alarm(&mut self) -> Result<(), Self::Error> {
        let status = self.read_reg(REG_STATUS)?;
        self.write_reg(REG_STATUS, status & !STATUS_A2F)
    }

    fn arm_periodic_alarm(&mut self) -> Result<(), Self::Error> {
        self.i2c.write(
            DS3231_ADDR,
            &[
                REG_ALARM2_MINUTES,
                ALARM2_EVERY_MINUTE[0],
                ALARM2_EVERY_MINUTE[1],
                ALARM2_EVERY_MINUTE[2],
            ],
        )?;
        self.write_reg(REG_CONTROL, CONTROL_INTCN | CONTROL_A2IE)
    }

    fn set_aging_offset(&mut self, offset: i8) -> Result<(), Self::Error> {
        self.write_reg(REG_AGING, offset as u8)
    }

    fn temperature(&mut self) -> Result<f32, Self::Error> {
        let mut buf = [0u8; 2];
        self.i2c.write_read(DS3231_ADDR, &[REG_TEMP_MSB], &mut buf)?;
        Ok(buf[0] as i8 as f32 + (buf[1] >> 6) as f32 * 0.25)
    }

    fn reset_to_defaults(&mut self) -> Result<(), Self::Error> {
        self.set_time(&DEFAULT_TIME)?;
        self.arm_periodic_alarm()?;
        self.set_aging_offset(0)?;
        // Clearing the whole status register also drops the stop fault.
        self.write_reg(REG_STATUS, 0)
    }
}

fn bcd_decode(value: u8) -> u8 {
    (value >> 4) * 10 + (value & 0x0F)
}

fn bcd_encode(value: u8) -> u8 {
    (value / 10) << 4 | (value % 10)
}
