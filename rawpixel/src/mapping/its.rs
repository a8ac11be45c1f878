//! Cabling tables of the ITS: 7 layers, 192 staves, 24120 chips.
//!
//! Three RU flavors exist. Inner-barrel staves carry 9 chips, each on its
//! own cable. Middle/outer-barrel staves carry modules of 14 chips split
//! into two 7-chip lanes, 8 modules (16 cables) in the middle barrel and
//! 14 modules (28 cables) in the outer barrel.
//!
//! The FEE id packs `layer << 12 | link << 8 | stave`; the RU hardware id is
//! the FEE id of link 0.

use super::{ChipInfo, ChipMapping, ChipOnRuInfo, InvalidMapping, RuInfo};
use ru_protocol::gbt::{FLAG_DATA_IB, FLAG_DATA_OB};

const N_LAYERS: usize = 7;
const STAVES_PER_LAYER: [u16; N_LAYERS] = [12, 16, 20, 24, 30, 42, 48];
const LAYER_RU_TYPE: [u8; N_LAYERS] = [0, 0, 0, 1, 1, 2, 2];

/// Inner barrel RU type.
pub const RU_TYPE_IB: u8 = 0;
/// Middle barrel RU type.
pub const RU_TYPE_MB: u8 = 1;
/// Outer barrel RU type.
pub const RU_TYPE_OB: u8 = 2;

const N_RU_TYPES: usize = 3;
const TYPE_N_CHIPS: [u16; N_RU_TYPES] = [9, 112, 196];
const TYPE_N_CABLES: [u8; N_RU_TYPES] = [9, 16, 28];
const TYPE_N_MODULES: [u8; N_RU_TYPES] = [1, 8, 14];
const CHIPS_PER_MODULE_OB: u16 = 14;
const CHIPS_PER_LANE_OB: u16 = 7;

/// The ITS chip mapping.
#[derive(Debug, Clone)]
pub struct ChipMappingIts {
    rus: Vec<RuInfo>,
    chip_on_ru: [Vec<ChipOnRuInfo>; N_RU_TYPES],
    first_ru_of_layer: [u16; N_LAYERS],
    first_chip_of_ru: Vec<u16>,
    n_chips: u16,
}

impl Default for ChipMappingIts {
    fn default() -> Self {
        Self::new()
    }
}

impl ChipMappingIts {
    /// Builds the (static) tables.
    pub fn new() -> Self {
        let mut rus = Vec::with_capacity(192);
        let mut first_ru_of_layer = [0u16; N_LAYERS];
        let mut first_chip_of_ru = Vec::with_capacity(192);
        let mut ru_sw: u16 = 0;
        let mut chip_sw: u16 = 0;
        for (layer, &n_staves) in STAVES_PER_LAYER.iter().enumerate() {
            first_ru_of_layer[layer] = ru_sw;
            let ru_type = LAYER_RU_TYPE[layer];
            for stave in 0..n_staves {
                first_chip_of_ru.push(chip_sw);
                rus.push(RuInfo {
                    id_sw: ru_sw,
                    id_hw: hw_id(layer as u8, stave),
                    ru_type,
                    n_cables: TYPE_N_CABLES[ru_type as usize],
                    n_chips: TYPE_N_CHIPS[ru_type as usize],
                    first_chip_sw: chip_sw,
                });
                ru_sw += 1;
                chip_sw += TYPE_N_CHIPS[ru_type as usize];
            }
        }

        let chip_on_ru = [
            build_chip_table(RU_TYPE_IB),
            build_chip_table(RU_TYPE_MB),
            build_chip_table(RU_TYPE_OB),
        ];

        Self {
            rus,
            chip_on_ru,
            first_ru_of_layer,
            first_chip_of_ru,
            n_chips: chip_sw,
        }
    }

    fn err(&self, entity: &'static str, value: u32) -> InvalidMapping {
        InvalidMapping {
            detector: self.name(),
            entity,
            value,
        }
    }
}

fn hw_id(layer: u8, stave: u16) -> u16 {
    ((layer as u16) << 12) | stave
}

fn build_chip_table(ru_type: u8) -> Vec<ChipOnRuInfo> {
    let n = TYPE_N_CHIPS[ru_type as usize];
    (0..n)
        .map(|id_on_ru| {
            if ru_type == RU_TYPE_IB {
                // one chip per cable, identity wiring
                ChipOnRuInfo {
                    id_on_ru,
                    module: 0,
                    chip_on_module_hw: id_on_ru as u8,
                    cable_sw: id_on_ru as u8,
                    cable_hw: id_on_ru as u8,
                }
            } else {
                let module = (id_on_ru / CHIPS_PER_MODULE_OB) as u8;
                let chip_on_module = (id_on_ru % CHIPS_PER_MODULE_OB) as u8;
                let half = (chip_on_module as u16 >= CHIPS_PER_LANE_OB) as u8;
                ChipOnRuInfo {
                    id_on_ru,
                    module,
                    chip_on_module_hw: chip_on_module,
                    cable_sw: module * 2 + half,
                    cable_hw: pack_cable_hw(ru_type, module, half),
                }
            }
        })
        .collect()
}

// Middle barrel packs the half-module bit above 3 module bits, outer barrel
// above 4.
fn pack_cable_hw(ru_type: u8, module: u8, half: u8) -> u8 {
    if ru_type == RU_TYPE_MB {
        (half << 3) | module
    } else {
        (half << 4) | module
    }
}

fn unpack_cable_hw(ru_type: u8, cable_hw: u8) -> (u8, u8) {
    if ru_type == RU_TYPE_MB {
        (cable_hw & 0x07, (cable_hw >> 3) & 1)
    } else {
        (cable_hw & 0x0F, (cable_hw >> 4) & 1)
    }
}

impl ChipMapping for ChipMappingIts {
    fn name(&self) -> &'static str {
        "ITS"
    }

    fn n_rus(&self) -> u16 {
        self.rus.len() as u16
    }

    fn n_chips(&self) -> u16 {
        self.n_chips
    }

    fn ru_info_sw(&self, ru_sw: u16) -> Result<&RuInfo, InvalidMapping> {
        self.rus
            .get(ru_sw as usize)
            .ok_or_else(|| self.err("RU software id", ru_sw as u32))
    }

    fn fee_id_to_ru_sw(&self, fee_id: u16) -> Result<u16, InvalidMapping> {
        let layer = ((fee_id >> 12) & 0x7) as usize;
        let stave = fee_id & 0x3F;
        if layer >= N_LAYERS || stave >= STAVES_PER_LAYER[layer] {
            return Err(self.err("FEE id", fee_id as u32));
        }
        Ok(self.first_ru_of_layer[layer] + stave)
    }

    fn ru_sw_to_fee_id(&self, ru_sw: u16, link_id: u8) -> Result<u16, InvalidMapping> {
        if link_id >= crate::codec::MAX_LINKS_PER_RU as u8 {
            return Err(self.err("link id", link_id as u32));
        }
        let ru = self.ru_info_sw(ru_sw)?;
        Ok(ru.id_hw | ((link_id as u16) << 8))
    }

    fn cable_hw_to_sw(&self, ru_type: u8, cable_hw: u8) -> Result<u8, InvalidMapping> {
        match ru_type {
            RU_TYPE_IB if cable_hw < TYPE_N_CABLES[0] => Ok(cable_hw),
            RU_TYPE_MB | RU_TYPE_OB => {
                let (module, half) = unpack_cable_hw(ru_type, cable_hw);
                if module >= TYPE_N_MODULES[ru_type as usize] {
                    return Err(self.err("cable hardware id", cable_hw as u32));
                }
                Ok(module * 2 + half)
            }
            _ => Err(self.err("cable hardware id", cable_hw as u32)),
        }
    }

    fn chip_on_ru_info(
        &self,
        ru_type: u8,
        chip_on_ru: u16,
    ) -> Result<&ChipOnRuInfo, InvalidMapping> {
        self.chip_on_ru
            .get(ru_type as usize)
            .and_then(|tab| tab.get(chip_on_ru as usize))
            .ok_or_else(|| self.err("chip id on RU", chip_on_ru as u32))
    }

    fn chip_info_sw(&self, chip_sw: u16) -> Result<ChipInfo, InvalidMapping> {
        if chip_sw >= self.n_chips {
            return Err(self.err("chip software id", chip_sw as u32));
        }
        // binary search over the per-RU first-chip table
        let ru_sw = match self.first_chip_of_ru.binary_search(&chip_sw) {
            Ok(i) => i,
            Err(i) => i - 1,
        } as u16;
        let ru = &self.rus[ru_sw as usize];
        let id_on_ru = chip_sw - ru.first_chip_sw;
        Ok(ChipInfo {
            chip_sw,
            ru_sw,
            ru_type: ru.ru_type,
            on_ru: self.chip_on_ru[ru.ru_type as usize][id_on_ru as usize],
        })
    }

    fn global_chip_id(
        &self,
        chip_on_module_hw: u8,
        cable_hw: u8,
        ru: &RuInfo,
    ) -> Result<u16, InvalidMapping> {
        match ru.ru_type {
            RU_TYPE_IB => {
                if chip_on_module_hw >= TYPE_N_CHIPS[0] as u8 {
                    return Err(self.err("chip id on module", chip_on_module_hw as u32));
                }
                Ok(ru.first_chip_sw + chip_on_module_hw as u16)
            }
            RU_TYPE_MB | RU_TYPE_OB => {
                let (module, _half) = unpack_cable_hw(ru.ru_type, cable_hw);
                if module >= TYPE_N_MODULES[ru.ru_type as usize]
                    || chip_on_module_hw as u16 >= CHIPS_PER_MODULE_OB
                {
                    return Err(self.err("chip id on module", chip_on_module_hw as u32));
                }
                Ok(ru.first_chip_sw
                    + module as u16 * CHIPS_PER_MODULE_OB
                    + chip_on_module_hw as u16)
            }
            _ => Err(self.err("RU type", ru.ru_type as u32)),
        }
    }

    fn cables_on_ru_type(&self, ru_type: u8) -> u32 {
        (1u32 << TYPE_N_CABLES[ru_type as usize]) - 1
    }

    fn n_chips_on_ru_type(&self, ru_type: u8) -> u16 {
        TYPE_N_CHIPS[ru_type as usize]
    }

    fn cable_flag(&self, ru_type: u8, cable_hw: u8) -> u8 {
        if ru_type == RU_TYPE_IB {
            FLAG_DATA_IB | cable_hw
        } else {
            FLAG_DATA_OB | cable_hw
        }
    }

    fn detector_field(&self) -> u16 {
        0x0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn totals() {
        let map = ChipMappingIts::new();
        assert_eq!(map.n_rus(), 192);
        assert_eq!(map.n_chips(), 24120);
    }

    #[test]
    fn fee_id_roundtrip_over_all_rus_and_links() {
        let map = ChipMappingIts::new();
        for ru in 0..map.n_rus() {
            for link in 0..3u8 {
                let fee = map.ru_sw_to_fee_id(ru, link).unwrap();
                assert_eq!(map.fee_id_to_ru_sw(fee).unwrap(), ru);
            }
        }
        assert!(map.fee_id_to_ru_sw(0x7F3F).is_err());
        assert!(map.ru_sw_to_fee_id(0, 3).is_err());
    }

    #[test]
    fn chip_info_is_injective_and_invertible() {
        let map = ChipMappingIts::new();
        for chip in 0..map.n_chips() {
            let info = map.chip_info_sw(chip).unwrap();
            let ru = map.ru_info_sw(info.ru_sw).unwrap();
            let back = map
                .global_chip_id(info.on_ru.chip_on_module_hw, info.on_ru.cable_hw, ru)
                .unwrap();
            assert_eq!(back, chip);
            assert_eq!(
                map.cable_hw_to_sw(info.ru_type, info.on_ru.cable_hw).unwrap(),
                info.on_ru.cable_sw
            );
        }
        assert!(map.chip_info_sw(24120).is_err());
    }

    #[test]
    fn outer_barrel_stave_17() {
        let map = ChipMappingIts::new();
        // chip 17 sits on layer 0, stave 1 (inner barrel, 9 chips per stave)
        let info = map.chip_info_sw(17).unwrap();
        assert_eq!(info.ru_sw, 1);
        assert_eq!(info.ru_type, RU_TYPE_IB);
        assert_eq!(info.on_ru.cable_sw, 8);

        // first outer-barrel chip
        let first_ob = 432 + 54 * 112;
        let info = map.chip_info_sw(first_ob).unwrap();
        assert_eq!(info.ru_type, RU_TYPE_OB);
        assert_eq!(info.on_ru.module, 0);
        assert_eq!(info.on_ru.cable_sw, 0);
    }

    #[test]
    fn lane_masks() {
        let map = ChipMappingIts::new();
        assert_eq!(map.cables_on_ru_type(RU_TYPE_IB), 0x1FF);
        assert_eq!(map.cables_on_ru_type(RU_TYPE_MB), 0xFFFF);
        assert_eq!(map.cables_on_ru_type(RU_TYPE_OB), 0x0FFF_FFFF);
    }

    #[test]
    fn cable_flags_carry_the_hw_id() {
        let map = ChipMappingIts::new();
        assert_eq!(map.cable_flag(RU_TYPE_IB, 5), 0x25);
        assert_eq!(map.cable_flag(RU_TYPE_OB, 0x1B), 0x5B);
    }
}
