pub mod battery;
pub mod buttons;
pub mod buzzer;
pub mod ds3231;
pub mod led;
pub mod sht30;
