//! esp32s3 implementations of the peripheral seams in `everclock-core`.

#![no_std]

pub mod drivers;
pub mod power;
pub mod storage;
