//! Byte-addressable settings storage on the last sector of a data partition.
//!
//! NOR flash programs bits one way (1 -> 0). A byte write that only clears
//! bits is programmed in place; anything else forces a read-modify-erase
//! cycle of the record area. The record is small and rewritten rarely, so the
//! sector sees very few erases.

use embedded_storage::{ReadStorage, Storage};
use esp_bootloader_esp_idf::partitions::{
    DataPartitionSubType, PARTITION_TABLE_MAX_LEN, PartitionType, read_partition_table,
};
use esp_rom_sys::rom::spiflash::{
    ESP_ROM_SPIFLASH_RESULT_OK, esp_rom_spiflash_erase_sector, esp_rom_spiflash_read,
    esp_rom_spiflash_unlock, esp_rom_spiflash_write,
};
use everclock_core::settings::{ByteStore, SETTINGS_RECORD_LEN};
use log::warn;

const FLASH_SECTOR_SIZE: u32 = 4096;
const DEFAULT_FLASH_CAPACITY_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum FlashStoreError {
    PartitionTable,
    SettingsPartitionMissing,
    PartitionTooSmall,
    FlashOpFailed(i32),
    OutOfBounds,
    Unsupported,
}

#[derive(Debug)]
struct RawFlash;

impl RawFlash {
    fn new() -> Result<Self, FlashStoreError> {
        let rc = unsafe { esp_rom_spiflash_unlock() };
        if rc != ESP_ROM_SPIFLASH_RESULT_OK {
            return Err(FlashStoreError::FlashOpFailed(rc));
        }
        Ok(Self)
    }

    fn erase_sector(&mut self, sector_addr: u32) -> Result<(), FlashStoreError> {
        if !sector_addr.is_multiple_of(FLASH_SECTOR_SIZE) {
            return Err(FlashStoreError::Unsupported);
        }

        let sector = sector_addr / FLASH_SECTOR_SIZE;
        let rc = unsafe { esp_rom_spiflash_erase_sector(sector) };
        if rc != ESP_ROM_SPIFLASH_RESULT_OK {
            return Err(FlashStoreError::FlashOpFailed(rc));
        }
        Ok(())
    }

    fn read_word(&mut self, addr: u32) -> Result<u32, FlashStoreError> {
        if !addr.is_multiple_of(4) {
            return Err(FlashStoreError::Unsupported);
        }

        let mut word = 0u32;
        let rc = unsafe { esp_rom_spiflash_read(addr, &mut word as *mut u32 as *const u32, 4) };
        if rc != ESP_ROM_SPIFLASH_RESULT_OK {
            return Err(FlashStoreError::FlashOpFailed(rc));
        }
        Ok(word)
    }

    fn write_word(&mut self, addr: u32, word: u32) -> Result<(), FlashStoreError> {
        if !addr.is_multiple_of(4) {
            return Err(FlashStoreError::Unsupported);
        }

        let rc = unsafe { esp_rom_spiflash_write(addr, &word as *const u32, 4) };
        if rc != ESP_ROM_SPIFLASH_RESULT_OK {
            return Err(FlashStoreError::FlashOpFailed(rc));
        }
        Ok(())
    }

    /// `addr` must be word aligned.
    fn read_bytes(&mut self, addr: u32, out: &mut [u8]) -> Result<(), FlashStoreError> {
        for (i, chunk) in out.chunks_mut(4).enumerate() {
            let word = self.read_word(addr + 4 * i as u32)?;
            let bytes = word.to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
        Ok(())
    }

    /// `addr` must be word aligned and the destination freshly erased. A
    /// trailing partial word is padded with 0xFF so the spare bytes stay
    /// programmable.
    fn write_erased_bytes(&mut self, addr: u32, data: &[u8]) -> Result<(), FlashStoreError> {
        for (i, chunk) in data.chunks(4).enumerate() {
            let mut bytes = [0xFFu8; 4];
            bytes[..chunk.len()].copy_from_slice(chunk);
            self.write_word(addr + 4 * i as u32, u32::from_le_bytes(bytes))?;
        }
        Ok(())
    }
}

impl ReadStorage for RawFlash {
    type Error = FlashStoreError;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        self.read_bytes(offset, bytes)
    }

    fn capacity(&self) -> usize {
        DEFAULT_FLASH_CAPACITY_BYTES
    }
}

impl Storage for RawFlash {
    fn write(&mut self, _offset: u32, _bytes: &[u8]) -> Result<(), Self::Error> {
        Err(FlashStoreError::Unsupported)
    }
}

/// [`ByteStore`] backed by the last sector of the first writable data
/// partition. Byte addresses are relative to the sector start; only the
/// settings record lives there.
#[derive(Debug)]
pub struct FlashByteStore {
    flash: RawFlash,
    sector_addr: u32,
}

impl FlashByteStore {
    pub fn new() -> Result<Self, FlashStoreError> {
        let mut flash = RawFlash::new()?;

        let mut table_buf = [0u8; PARTITION_TABLE_MAX_LEN];
        let table = read_partition_table(&mut flash, &mut table_buf)
            .map_err(|_| FlashStoreError::PartitionTable)?;

        // Prefer an undefined data partition; fall back to the first NVS one.
        let mut undefined: Option<(u32, u32)> = None;
        let mut nvs: Option<(u32, u32)> = None;
        for entry in table.iter() {
            if entry.is_read_only() {
                continue;
            }
            match entry.partition_type() {
                PartitionType::Data(DataPartitionSubType::Undefined) => {
                    undefined = Some((entry.offset(), entry.len()));
                    break;
                }
                PartitionType::Data(DataPartitionSubType::Nvs) if nvs.is_none() => {
                    nvs = Some((entry.offset(), entry.len()));
                }
                _ => {}
            }
        }
        let (offset, len) = match (undefined, nvs) {
            (Some(part), _) => part,
            (None, Some(part)) => {
                warn!("no undefined data partition, settings land in the NVS partition");
                part
            }
            (None, None) => return Err(FlashStoreError::SettingsPartitionMissing),
        };
        if len < FLASH_SECTOR_SIZE {
            return Err(FlashStoreError::PartitionTooSmall);
        }

        Ok(Self {
            flash,
            sector_addr: offset + len - FLASH_SECTOR_SIZE,
        })
    }

    fn byte_addr(&self, addr: u32) -> Result<u32, FlashStoreError> {
        if addr as usize >= SETTINGS_RECORD_LEN {
            return Err(FlashStoreError::OutOfBounds);
        }
        Ok(self.sector_addr + addr)
    }
}

impl ByteStore for FlashByteStore {
    type Error = FlashStoreError;

    fn read_byte(&mut self, addr: u32) -> Result<u8, Self::Error> {
        let abs = self.byte_addr(addr)?;
        let word = self.flash.read_word(abs & !0b11)?;
        Ok(word.to_le_bytes()[(abs & 0b11) as usize])
    }

    fn write_byte(&mut self, addr: u32, value: u8) -> Result<(), Self::Error> {
        let abs = self.byte_addr(addr)?;
        let current = self.read_byte(addr)?;
        if current == value {
            return Ok(());
        }

        if current & value == value {
            // Only clearing bits; program the containing word in place.
            let word_addr = abs & !0b11;
            let mut bytes = self.flash.read_word(word_addr)?.to_le_bytes();
            bytes[(abs & 0b11) as usize] = value;
            return self.flash.write_word(word_addr, u32::from_le_bytes(bytes));
        }

        // Setting a bit needs an erase. Rewrite the whole record area.
        let mut record = [0u8; SETTINGS_RECORD_LEN];
        self.flash.read_bytes(self.sector_addr, &mut record)?;
        record[addr as usize] = value;
        self.flash.erase_sector(self.sector_addr)?;
        self.flash.write_erased_bytes(self.sector_addr, &record)
    }
}
