pub mod backup;
pub mod eeprom;
