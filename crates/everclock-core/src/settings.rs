//! Fixed-layout device settings persisted in a wear-limited byte store.

use log::warn;

/// Byte-addressable non-volatile backing store. Writes are assumed to cost
/// endurance budget; reads are free.
pub trait ByteStore {
    type Error;

    fn read_byte(&mut self, addr: u32) -> Result<u8, Self::Error>;
    fn write_byte(&mut self, addr: u32, value: u8) -> Result<(), Self::Error>;
}

/// Sentinel distinguishing an initialized record from blank or corrupted
/// storage. Anything else at the marker offset discards the whole record.
pub const SETTINGS_MARKER: u8 = 0x5A;
/// Base offset of the settings record inside the byte store's region.
pub const SETTINGS_BASE_ADDR: u32 = 0;
/// Encoded record size, marker included.
pub const SETTINGS_RECORD_LEN: usize = 22;

pub const BUZZER_VOLUME_MAX: u8 = 10;

const DEFAULT_BUZZER_VOLUME: u8 = 5;
const DEFAULT_BATTERY_WARN_VOLTS: f32 = 2.6;
const DEFAULT_BATTERY_STOP_VOLTS: f32 = 2.4;

/// User-tunable settings that survive deep sleep and power loss.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SettingsRecord {
    pub buzzer_enabled: bool,
    /// 1..=BUZZER_VOLUME_MAX.
    pub buzzer_volume: u8,
    pub battery_warn_volts: f32,
    pub battery_stop_volts: f32,
    /// Applied to the humidity sensor's temperature output, degrees C.
    pub temperature_offset: f32,
    /// Applied to the humidity sensor's RH output, percent.
    pub humidity_offset: f32,
    /// Signed trim steps for the ADC reference voltage.
    pub vref_offset: i16,
    /// Signed aging trim written to the RTC.
    pub rtc_aging_offset: i8,
}

impl SettingsRecord {
    /// Factory defaults; the single source of truth for a full reset.
    pub const DEFAULT: Self = Self {
        buzzer_enabled: true,
        buzzer_volume: DEFAULT_BUZZER_VOLUME,
        battery_warn_volts: DEFAULT_BATTERY_WARN_VOLTS,
        battery_stop_volts: DEFAULT_BATTERY_STOP_VOLTS,
        temperature_offset: 0.0,
        humidity_offset: 0.0,
        vref_offset: 0,
        rtc_aging_offset: 0,
    };

    fn encode(&self) -> [u8; SETTINGS_RECORD_LEN] {
        let mut buf = [0u8; SETTINGS_RECORD_LEN];
        buf[0] = SETTINGS_MARKER;
        buf[1] = self.buzzer_enabled as u8;
        buf[2] = self.buzzer_volume;
        buf[3..7].copy_from_slice(&self.battery_warn_volts.to_le_bytes());
        buf[7..11].copy_from_slice(&self.battery_stop_volts.to_le_bytes());
        buf[11..15].copy_from_slice(&self.temperature_offset.to_le_bytes());
        buf[15..19].copy_from_slice(&self.humidity_offset.to_le_bytes());
        buf[19..21].copy_from_slice(&self.vref_offset.to_le_bytes());
        buf[21] = self.rtc_aging_offset as u8;
        buf
    }

    fn decode(buf: &[u8; SETTINGS_RECORD_LEN]) -> Self {
        Self {
            buzzer_enabled: buf[1] != 0,
            buzzer_volume: buf[2].clamp(1, BUZZER_VOLUME_MAX),
            battery_warn_volts: f32::from_le_bytes([buf[3], buf[4], buf[5], buf[6]]),
            battery_stop_volts: f32::from_le_bytes([buf[7], buf[8], buf[9], buf[10]]),
            temperature_offset: f32::from_le_bytes([buf[11], buf[12], buf[13], buf[14]]),
            humidity_offset: f32::from_le_bytes([buf[15], buf[16], buf[17], buf[18]]),
            vref_offset: i16::from_le_bytes([buf[19], buf[20]]),
            rtc_aging_offset: buf[21] as i8,
        }
    }
}

/// Sole owner of the settings region of the byte store.
pub struct SettingsStore<S: ByteStore> {
    store: S,
}

impl<S: ByteStore> SettingsStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Reads the record. A marker mismatch discards the whole record and
    /// persists the factory defaults instead; there is no per-field recovery.
    pub fn load(&mut self) -> Result<SettingsRecord, S::Error> {
        let marker = self.store.read_byte(SETTINGS_BASE_ADDR)?;
        if marker != SETTINGS_MARKER {
            warn!("settings marker 0x{marker:02X} invalid, restoring defaults");
            self.save(&SettingsRecord::DEFAULT)?;
            return Ok(SettingsRecord::DEFAULT);
        }

        let mut buf = [0u8; SETTINGS_RECORD_LEN];
        for (i, slot) in buf.iter_mut().enumerate() {
            *slot = self.store.read_byte(SETTINGS_BASE_ADDR + i as u32)?;
        }
        Ok(SettingsRecord::decode(&buf))
    }

    /// Byte-wise compare-then-write: unchanged bytes cost no write cycles.
    /// A torn write on power loss leaves a mixed record; the marker check in
    /// `load` is the only recovery for that.
    pub fn save(&mut self, record: &SettingsRecord) -> Result<(), S::Error> {
        let encoded = record.encode();
        for (i, byte) in encoded.iter().enumerate() {
            let addr = SETTINGS_BASE_ADDR + i as u32;
            if self.store.read_byte(addr)? != *byte {
                self.store.write_byte(addr, *byte)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;

    /// In-memory byte store that counts write operations.
    struct MemoryStore {
        bytes: [u8; 64],
        writes: usize,
    }

    impl MemoryStore {
        fn blank() -> Self {
            Self {
                bytes: [0xFF; 64],
                writes: 0,
            }
        }
    }

    impl ByteStore for &mut MemoryStore {
        type Error = Infallible;

        fn read_byte(&mut self, addr: u32) -> Result<u8, Self::Error> {
            Ok(self.bytes[addr as usize])
        }

        fn write_byte(&mut self, addr: u32, value: u8) -> Result<(), Self::Error> {
            self.bytes[addr as usize] = value;
            self.writes += 1;
            Ok(())
        }
    }

    fn sample_record() -> SettingsRecord {
        SettingsRecord {
            buzzer_enabled: false,
            buzzer_volume: 8,
            battery_warn_volts: 2.8,
            battery_stop_volts: 2.5,
            temperature_offset: -1.25,
            humidity_offset: 3.5,
            vref_offset: -12,
            rtc_aging_offset: 7,
        }
    }

    #[test]
    fn save_then_load_round_trips() {
        let mut backing = MemoryStore::blank();
        let mut store = SettingsStore::new(&mut backing);
        let record = sample_record();
        store.save(&record).unwrap();
        assert_eq!(store.load().unwrap(), record);
    }

    #[test]
    fn corrupted_marker_restores_defaults() {
        let mut backing = MemoryStore::blank();
        let mut store = SettingsStore::new(&mut backing);
        store.save(&sample_record()).unwrap();
        store.store.bytes[SETTINGS_BASE_ADDR as usize] = 0x00;

        assert_eq!(store.load().unwrap(), SettingsRecord::DEFAULT);
        // The defaults were persisted, not just returned.
        assert_eq!(
            store.store.bytes[SETTINGS_BASE_ADDR as usize],
            SETTINGS_MARKER
        );
        assert_eq!(store.load().unwrap(), SettingsRecord::DEFAULT);
    }

    #[test]
    fn any_non_sentinel_marker_is_rejected() {
        for bad_marker in [0x00, 0xFF, SETTINGS_MARKER ^ 0x01] {
            let mut backing = MemoryStore::blank();
            let mut store = SettingsStore::new(&mut backing);
            store.save(&sample_record()).unwrap();
            store.store.bytes[SETTINGS_BASE_ADDR as usize] = bad_marker;
            assert_eq!(store.load().unwrap(), SettingsRecord::DEFAULT);
        }
    }

    #[test]
    fn identical_resave_issues_zero_writes() {
        let mut backing = MemoryStore::blank();
        let mut store = SettingsStore::new(&mut backing);
        let record = sample_record();
        store.save(&record).unwrap();

        let writes_after_first = store.store.writes;
        store.save(&record).unwrap();
        assert_eq!(store.store.writes, writes_after_first);
    }

    #[test]
    fn single_field_change_touches_only_its_bytes() {
        let mut backing = MemoryStore::blank();
        let mut store = SettingsStore::new(&mut backing);
        let mut record = SettingsRecord::DEFAULT;
        store.save(&record).unwrap();

        let writes_before = store.store.writes;
        record.buzzer_volume = 9;
        store.save(&record).unwrap();
        assert_eq!(store.store.writes, writes_before + 1);
    }
}
