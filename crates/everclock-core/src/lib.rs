//! Hardware-independent core of the clock firmware.
//!
//! Everything in here runs on the host for testing. The orchestration in
//! [`cycle`] drives peripherals through the trait seams in [`drivers`],
//! [`settings`], [`scratch`] and [`power`]; the esp32s3 crate provides the
//! real implementations.

#![no_std]

pub mod boot;
pub mod cycle;
pub mod drivers;
pub mod lunar;
pub mod power;
pub mod scratch;
pub mod settings;
