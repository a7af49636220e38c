//! Battery-backed scratch registers that survive standby but not power loss.

/// Always-powered register block, addressed as 32-bit slots.
pub trait BackupRegisters {
    type Error;

    fn read_dword(&mut self, index: u8) -> Result<u32, Self::Error>;
    fn write_dword(&mut self, index: u8, value: u32) -> Result<(), Self::Error>;
    fn reset_all(&mut self) -> Result<(), Self::Error>;
}

/// Register slot assignments.
const REG_RESET_REQUEST: u8 = 0;
const REG_BATTERY_BITS: u8 = 1;

/// The registers come up as zero after a true power-on, so the request flag
/// needs a distinctive set pattern rather than a plain 1-vs-0 bit.
const RESET_REQUEST_MAGIC: u32 = 0x5245_5354;

/// Plausibility window for the cached battery voltage. Readings outside it
/// mean backup power was lost and the slot holds an arbitrary pattern; there
/// is no spare validity bit. Empirical hardware constants, kept as named
/// values rather than re-derived.
pub const BATTERY_PLAUSIBLE_MIN_VOLTS: f32 = 0.1;
pub const BATTERY_PLAUSIBLE_MAX_VOLTS: f32 = 3.6;

/// Sole owner of the backup register block.
pub struct ScratchStore<R: BackupRegisters> {
    regs: R,
}

impl<R: BackupRegisters> ScratchStore<R> {
    pub fn new(regs: R) -> Self {
        Self { regs }
    }

    pub fn read_reset_request(&mut self) -> Result<bool, R::Error> {
        Ok(self.regs.read_dword(REG_RESET_REQUEST)? == RESET_REQUEST_MAGIC)
    }

    pub fn write_reset_request(&mut self, requested: bool) -> Result<(), R::Error> {
        let value = if requested { RESET_REQUEST_MAGIC } else { 0 };
        self.regs.write_dword(REG_RESET_REQUEST, value)
    }

    /// Returns `None` when the stored pattern does not decode to a plausible
    /// voltage, which is how a lost backup supply is detected.
    pub fn read_cached_battery(&mut self) -> Result<Option<f32>, R::Error> {
        Ok(decode_battery_bits(self.regs.read_dword(REG_BATTERY_BITS)?))
    }

    pub fn write_cached_battery(&mut self, volts: f32) -> Result<(), R::Error> {
        self.regs.write_dword(REG_BATTERY_BITS, encode_battery_bits(volts))
    }

    /// Clears every field. Called during full reinitialization and nowhere
    /// else; this is also what consumes a pending reset request.
    pub fn reset_all(&mut self) -> Result<(), R::Error> {
        self.regs.reset_all()
    }
}

/// The register block stores raw bit patterns, so the float is carried as its
/// IEEE-754 encoding through this single conversion pair.
fn encode_battery_bits(volts: f32) -> u32 {
    volts.to_bits()
}

fn decode_battery_bits(bits: u32) -> Option<f32> {
    let volts = f32::from_bits(bits);
    if volts.is_finite()
        && (BATTERY_PLAUSIBLE_MIN_VOLTS..=BATTERY_PLAUSIBLE_MAX_VOLTS).contains(&volts)
    {
        Some(volts)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;

    #[derive(Default)]
    struct MemoryRegisters {
        slots: [u32; 4],
        resets: usize,
    }

    impl BackupRegisters for &mut MemoryRegisters {
        type Error = Infallible;

        fn read_dword(&mut self, index: u8) -> Result<u32, Self::Error> {
            Ok(self.slots[index as usize])
        }

        fn write_dword(&mut self, index: u8, value: u32) -> Result<(), Self::Error> {
            self.slots[index as usize] = value;
            Ok(())
        }

        fn reset_all(&mut self) -> Result<(), Self::Error> {
            self.slots = [0; 4];
            self.resets += 1;
            Ok(())
        }
    }

    #[test]
    fn reset_request_round_trips_and_clears() {
        let mut regs = MemoryRegisters::default();
        let mut scratch = ScratchStore::new(&mut regs);

        assert!(!scratch.read_reset_request().unwrap());
        scratch.write_reset_request(true).unwrap();
        assert!(scratch.read_reset_request().unwrap());
        scratch.write_reset_request(false).unwrap();
        assert!(!scratch.read_reset_request().unwrap());
    }

    #[test]
    fn zeroed_registers_mean_no_request_and_no_reading() {
        let mut regs = MemoryRegisters::default();
        let mut scratch = ScratchStore::new(&mut regs);

        assert!(!scratch.read_reset_request().unwrap());
        assert_eq!(scratch.read_cached_battery().unwrap(), None);
    }

    #[test]
    fn plausible_battery_reading_round_trips() {
        let mut regs = MemoryRegisters::default();
        let mut scratch = ScratchStore::new(&mut regs);

        scratch.write_cached_battery(2.95).unwrap();
        assert_eq!(scratch.read_cached_battery().unwrap(), Some(2.95));
    }

    #[test]
    fn implausible_patterns_read_as_absent() {
        let patterns = [
            0.05f32.to_bits(),
            4.2f32.to_bits(),
            (-1.0f32).to_bits(),
            f32::NAN.to_bits(),
            f32::INFINITY.to_bits(),
            0xDEAD_BEEF,
        ];
        for bits in patterns {
            let mut regs = MemoryRegisters::default();
            regs.slots[REG_BATTERY_BITS as usize] = bits;
            let mut scratch = ScratchStore::new(&mut regs);
            assert_eq!(scratch.read_cached_battery().unwrap(), None, "{bits:#X}");
        }
    }

    #[test]
    fn window_edges_are_inclusive() {
        for volts in [BATTERY_PLAUSIBLE_MIN_VOLTS, BATTERY_PLAUSIBLE_MAX_VOLTS] {
            let mut regs = MemoryRegisters::default();
            let mut scratch = ScratchStore::new(&mut regs);
            scratch.write_cached_battery(volts).unwrap();
            assert_eq!(scratch.read_cached_battery().unwrap(), Some(volts));
        }
    }

    #[test]
    fn reset_all_clears_every_field() {
        let mut regs = MemoryRegisters::default();
        let mut scratch = ScratchStore::new(&mut regs);
        scratch.write_reset_request(true).unwrap();
        scratch.write_cached_battery(3.0).unwrap();

        scratch.reset_all().unwrap();
        assert!(!scratch.read_reset_request().unwrap());
        assert_eq!(scratch.read_cached_battery().unwrap(), None);
        assert_eq!(regs.resets, 1);
    }
}
