//! SHT30 temperature and humidity sensor, single-shot mode.

use embedded_hal::i2c::I2c;
use esp_hal::delay::Delay;
use everclock_core::drivers::{ThReading, ThSensor};

pub const SHT30_ADDR: u8 = 0x44;

/// Single-shot, high repeatability, no clock stretching.
const CMD_MEASURE: [u8; 2] = [0x24, 0x00];
const CMD_SOFT_RESET: [u8; 2] = [0x30, 0xA2];

/// High repeatability worst case per datasheet is 15 ms.
const MEASUREMENT_DELAY_MS: u32 = 16;
const SOFT_RESET_DELAY_MS: u32 = 2;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Sht30Error<E> {
    Bus(E),
    Checksum,
}

pub struct Sht30<I2C> {
    i2c: I2C,
    delay: Delay,
    temperature_offset: f32,
    humidity_offset: f32,
}

impl<I2C: I2c> Sht30<I2C> {
    pub fn new(i2c: I2C) -> Self {
        Self {
            i2c,
            delay: Delay::new(),
            temperature_offset: 0.0,
            humidity_offset: 0.0,
        }
    }
}

impl<I2C: I2c> ThSensor for Sht30<I2C> {
    type Error = Sht30Error<I2C::Error>;

    fn read(&mut self) -> Result<ThReading, Self::Error> {
        self.i2c
            .write(SHT30_ADDR, &CMD_MEASURE)
            .map_err(Sht30Error::Bus)?;
        self.delay.delay_millis(MEASUREMENT_DELAY_MS);

        let mut buf = [0u8; 6];
        self.i2c.read(SHT30_ADDR, &mut buf).map_err(Sht30Error::Bus)?;
        if crc8(&buf[0..2]) != buf[2] || crc8(&buf[3..5]) != buf[5] {
            return Err(Sht30Error::Checksum);
        }

        let raw_t = u16::from_be_bytes([buf[0], buf[1]]) as f32;
        let raw_rh = u16::from_be_bytes([buf[3], buf[4]]) as f32;
        Ok(ThReading {
            celsius: -45.0 + 175.0 * raw_t / 65535.0 + self.temperature_offset,
            humidity: (100.0 * raw_rh / 65535.0 + self.humidity_offset).clamp(0.0, 100.0),
        })
    }

    fn soft_reset(&mut self) -> Result<(), Self::Error> {
        self.i2c
            .write(SHT30_ADDR, &CMD_SOFT_RESET)
            .map_err(Sht30Error::Bus)?;
        self.delay.delay_millis(SOFT_RESET_DELAY_MS);
        Ok(())
    }

    fn set_offsets(&mut self, temperature: f32, humidity: f32) -> Result<(), Self::Error> {
        self.temperature_offset = temperature;
        self.humidity_offset = humidity;
        Ok(())
    }
}

/// CRC-8 with polynomial 0x31, init 0xFF, as the datasheet specifies.
fn crc8(data: &[u8]) -> u8 {
    let mut crc = 0xFFu8;
    for byte in data {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ 0x31
            } else {
                crc << 1
            };
        }
    }
    crc
}
