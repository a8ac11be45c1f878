//! Cabling tables of the MFT: 2 halves, 5 disks, 2 faces, 4 zones per face.
//!
//! Every zone is read out by one RU in inner-barrel fashion: one chip per
//! cable, the chip-on-module id equal to the cable index. Zone sizes grow
//! with the disk radius; RU types are keyed by the zone's cable count so the
//! per-type tables stay total.
//!
//! The RU hardware id packs `half << 7 | disk << 4 | face << 3 | zone`; the
//! FEE id adds the GBT link in bits 8-9.

use super::{ChipInfo, ChipMapping, ChipOnRuInfo, InvalidMapping, RuInfo};
use ru_protocol::gbt::FLAG_DATA_IB;

const N_HALVES: u16 = 2;
const N_DISKS: u16 = 5;
const N_FACES: u16 = 2;
const N_ZONES: u16 = 4;

/// Chips (= cables) per zone, by disk.
const ZONE_CHIPS: [[u8; N_ZONES as usize]; N_DISKS as usize] = [
    [10, 10, 11, 11],
    [10, 10, 11, 11],
    [11, 11, 12, 12],
    [12, 12, 13, 13],
    [13, 13, 14, 14],
];

// RU types are the distinct cable counts, 10..=14 mapped to 0..=4.
const MIN_ZONE_CHIPS: u8 = 10;
const N_RU_TYPES: usize = 5;

/// The MFT chip mapping.
#[derive(Debug, Clone)]
pub struct ChipMappingMft {
    rus: Vec<RuInfo>,
    chip_on_ru: [Vec<ChipOnRuInfo>; N_RU_TYPES],
    first_chip_of_ru: Vec<u16>,
    n_chips: u16,
}

impl Default for ChipMappingMft {
    fn default() -> Self {
        Self::new()
    }
}

impl ChipMappingMft {
    /// Builds the (static) tables.
    pub fn new() -> Self {
        let mut rus = Vec::with_capacity((N_HALVES * N_DISKS * N_FACES * N_ZONES) as usize);
        let mut first_chip_of_ru = Vec::with_capacity(rus.capacity());
        let mut chip_sw: u16 = 0;
        let mut ru_sw: u16 = 0;
        for half in 0..N_HALVES {
            for disk in 0..N_DISKS {
                for face in 0..N_FACES {
                    for zone in 0..N_ZONES {
                        let n_cables = ZONE_CHIPS[disk as usize][zone as usize];
                        first_chip_of_ru.push(chip_sw);
                        rus.push(RuInfo {
                            id_sw: ru_sw,
                            id_hw: hw_id(half, disk, face, zone),
                            ru_type: n_cables - MIN_ZONE_CHIPS,
                            n_cables,
                            n_chips: n_cables as u16,
                            first_chip_sw: chip_sw,
                        });
                        ru_sw += 1;
                        chip_sw += n_cables as u16;
                    }
                }
            }
        }

        let chip_on_ru: [Vec<ChipOnRuInfo>; N_RU_TYPES] =
            std::array::from_fn(|t| build_chip_table(MIN_ZONE_CHIPS + t as u8));

        Self {
            rus,
            chip_on_ru,
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

fn hw_id(half: u16, disk: u16, face: u16, zone: u16) -> u16 {
    (half << 7) | (disk << 4) | (face << 3) | zone
}

fn build_chip_table(n_cables: u8) -> Vec<ChipOnRuInfo> {
    (0..n_cables as u16)
        .map(|id_on_ru| ChipOnRuInfo {
            id_on_ru,
            module: 0,
            chip_on_module_hw: id_on_ru as u8,
            cable_sw: id_on_ru as u8,
            cable_hw: id_on_ru as u8,
        })
        .collect()
}

impl ChipMapping for ChipMappingMft {
    fn name(&self) -> &'static str {
        "MFT"
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
        let id_hw = fee_id & 0xFF;
        let half = (id_hw >> 7) & 1;
        let disk = (id_hw >> 4) & 0x7;
        let face = (id_hw >> 3) & 1;
        let zone = id_hw & 0x7;
        if disk >= N_DISKS || zone >= N_ZONES {
            return Err(self.err("FEE id", fee_id as u32));
        }
        Ok(((half * N_DISKS + disk) * N_FACES + face) * N_ZONES + zone)
    }

    fn ru_sw_to_fee_id(&self, ru_sw: u16, link_id: u8) -> Result<u16, InvalidMapping> {
        if link_id >= crate::codec::MAX_LINKS_PER_RU as u8 {
            return Err(self.err("link id", link_id as u32));
        }
        let ru = self.ru_info_sw(ru_sw)?;
        Ok(ru.id_hw | ((link_id as u16) << 8))
    }

    fn cable_hw_to_sw(&self, ru_type: u8, cable_hw: u8) -> Result<u8, InvalidMapping> {
        if (ru_type as usize) < N_RU_TYPES && cable_hw < MIN_ZONE_CHIPS + ru_type {
            Ok(cable_hw)
        } else {
            Err(self.err("cable hardware id", cable_hw as u32))
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
        let _ = cable_hw;
        if chip_on_module_hw >= ru.n_cables {
            return Err(self.err("chip id on module", chip_on_module_hw as u32));
        }
        Ok(ru.first_chip_sw + chip_on_module_hw as u16)
    }

    fn cables_on_ru_type(&self, ru_type: u8) -> u32 {
        (1u32 << (MIN_ZONE_CHIPS + ru_type)) - 1
    }

    fn n_chips_on_ru_type(&self, ru_type: u8) -> u16 {
        (MIN_ZONE_CHIPS + ru_type) as u16
    }

    fn cable_flag(&self, _ru_type: u8, cable_hw: u8) -> u8 {
        FLAG_DATA_IB | cable_hw
    }

    fn detector_field(&self) -> u16 {
        0x1
    }
}
