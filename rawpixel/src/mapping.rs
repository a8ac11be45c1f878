//! Mapping between software chip identifiers and hardware addresses.
//!
//! The codec is generic over a [ChipMapping]: a pure, table-driven
//! translation between the global software chip id and the
//! `(RU, cable, chip-on-module)` coordinates that appear on the wire. One
//! implementation exists per detector: [ChipMappingIts](its::ChipMappingIts)
//! and [ChipMappingMft](mft::ChipMappingMft). All lookups are total over
//! their declared domains and fail with [InvalidMapping] outside them.

pub mod its;
pub mod mft;

use thiserror::Error;

/// A lookup fell outside the mapping's domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid {detector} mapping lookup: {entity} {value} out of domain")]
pub struct InvalidMapping {
    /// Which detector mapping rejected the lookup.
    pub detector: &'static str,
    /// What kind of identifier was looked up.
    pub entity: &'static str,
    /// The rejected value.
    pub value: u32,
}

/// Static description of one readout unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuInfo {
    /// Sequential software id, `0..n_rus`.
    pub id_sw: u16,
    /// Hardware id (the FEE id with the link bits cleared).
    pub id_hw: u16,
    /// Readout-unit type, indexing the per-type tables.
    pub ru_type: u8,
    /// Cables (lanes) the RU reads out.
    pub n_cables: u8,
    /// Chips served by the RU.
    pub n_chips: u16,
    /// Global software id of the RU's first chip.
    pub first_chip_sw: u16,
}

/// Position of one chip within its readout unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChipOnRuInfo {
    /// Chip index within the RU, `0..n_chips`.
    pub id_on_ru: u16,
    /// Module the chip sits on.
    pub module: u8,
    /// Hardware chip id within the module, as shipped in ALPIDE headers.
    pub chip_on_module_hw: u8,
    /// Software cable index, `0..n_cables`.
    pub cable_sw: u8,
    /// Hardware cable id, as embedded in GBT data-word flag bytes.
    pub cable_hw: u8,
}

/// Full coordinates of one chip, resolved from its global software id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChipInfo {
    /// Global software chip id.
    pub chip_sw: u16,
    /// Software id of the owning RU.
    pub ru_sw: u16,
    /// Type of the owning RU.
    pub ru_type: u8,
    /// Position within the RU.
    pub on_ru: ChipOnRuInfo,
}

/// Capability interface between the codec and a detector's cabling tables.
///
/// Implementations are read-only after construction and freely shareable.
pub trait ChipMapping {
    /// Detector name, for diagnostics.
    fn name(&self) -> &'static str;

    /// Number of readout units.
    fn n_rus(&self) -> u16;

    /// Number of chips in the detector.
    fn n_chips(&self) -> u16;

    /// Describes the RU with the given software id.
    fn ru_info_sw(&self, ru_sw: u16) -> Result<&RuInfo, InvalidMapping>;

    /// Resolves an RDH FEE id to the software id of the RU that owns it.
    fn fee_id_to_ru_sw(&self, fee_id: u16) -> Result<u16, InvalidMapping>;

    /// Builds the FEE id announcing `ru_sw` on GBT link `link_id`.
    fn ru_sw_to_fee_id(&self, ru_sw: u16, link_id: u8) -> Result<u16, InvalidMapping>;

    /// Translates a hardware cable id to the software cable index.
    fn cable_hw_to_sw(&self, ru_type: u8, cable_hw: u8) -> Result<u8, InvalidMapping>;

    /// Describes the chip with index `chip_on_ru` on an RU of type `ru_type`.
    fn chip_on_ru_info(&self, ru_type: u8, chip_on_ru: u16)
        -> Result<&ChipOnRuInfo, InvalidMapping>;

    /// Resolves a global software chip id to its full hardware coordinates.
    fn chip_info_sw(&self, chip_sw: u16) -> Result<ChipInfo, InvalidMapping>;

    /// Recovers the global software chip id from what the wire delivers:
    /// the chip-on-module id of the ALPIDE header plus the cable it came on.
    fn global_chip_id(
        &self,
        chip_on_module_hw: u8,
        cable_hw: u8,
        ru: &RuInfo,
    ) -> Result<u16, InvalidMapping>;

    /// Bit mask of the lanes an RU of the given type exposes.
    fn cables_on_ru_type(&self, ru_type: u8) -> u32;

    /// Number of chips an RU of the given type serves.
    fn n_chips_on_ru_type(&self, ru_type: u8) -> u16;

    /// The flag byte (byte 9) of a GBT data word carrying this cable.
    fn cable_flag(&self, ru_type: u8, cable_hw: u8) -> u8;

    /// The value the encoder writes into the RDH `detectorField`.
    fn detector_field(&self) -> u16;
}
