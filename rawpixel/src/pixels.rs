//! Containers for pixel digits and per-chip decoded data.

use std::fmt;

/// Identity of one interaction: LHC orbit plus bunch crossing.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InteractionRecord {
    /// Orbit counter.
    pub orbit: u32,
    /// Bunch crossing within the orbit.
    pub bc: u16,
}

impl InteractionRecord {
    /// Creates an interaction record.
    pub const fn new(orbit: u32, bc: u16) -> Self {
        Self { orbit, bc }
    }
}

impl fmt::Display for InteractionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "orb:{} bc:{}", self.orbit, self.bc)
    }
}

/// One fired pixel of one chip, as delivered by the digitizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Digit {
    /// Global software chip id.
    pub chip_id: u16,
    /// Pixel row on the sensor.
    pub row: u16,
    /// Pixel column on the sensor.
    pub col: u16,
}

/// One fired pixel within a chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PixelHit {
    /// Pixel row on the sensor.
    pub row: u16,
    /// Pixel column on the sensor.
    pub col: u16,
}

/// Pixel data of a single chip for a single trigger.
///
/// During encoding `chip_id` is the chip id *within the RU*; during decoding
/// it starts out as the chip-on-module id shipped in the ALPIDE chip header
/// and is translated to the global software id by the mapping layer before
/// the container reaches the caller.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ChipPixelData {
    /// Chip identifier, see the container docs for which namespace applies.
    pub chip_id: u16,
    /// Interaction the hits belong to.
    pub ir: InteractionRecord,
    /// Trigger-type mask of the trigger that produced the hits.
    pub trigger: u32,
    /// Readout flags from the ALPIDE chip trailer.
    pub ro_flags: u8,
    /// The fired pixels.
    pub hits: Vec<PixelHit>,
}

impl ChipPixelData {
    /// Drops all hits and resets the readout flags, keeping the allocation.
    pub fn clear(&mut self) {
        self.hits.clear();
        self.ro_flags = 0;
    }

    /// Swaps contents with `other`; used to hand decoded data to the caller
    /// without copying the hit vector.
    pub fn swap(&mut self, other: &mut Self) {
        std::mem::swap(self, other);
    }
}
