//! Well-formed [Rdh] values for tests and benchmarks.

use super::*;

/// First page of a two-page physics trigger on FEE `0x502A`, link 0.
pub fn correct_rdh_page0() -> Rdh {
    Rdh {
        rdh0: Rdh0 {
            version: RDH_VERSION,
            header_size: RDH_SIZE_BYTES as u8,
            block_length: 0xFFFF,
            fee_id: FeeId(0x502A),
            priority: 0,
            reserved0: 0,
        },
        rdh1: Rdh1 {
            offset_to_next: 8192,
            memory_size: 8192,
            link_id: 0,
            packet_counter: 0,
            cruid_dw: CruidDw(0x018),
        },
        rdh2: Rdh2 {
            trigger_orbit: 0x0B7D_D575,
            heartbeat_orbit: 0x0B7D_D575,
        },
        reserved1: 0,
        rdh3: Rdh3::new(0x1A3, 0x1A3, crate::trigger::PHT),
        reserved2: 0,
        rdh4: Rdh4 {
            detector_field: 0,
            par: 0,
            stop: 0,
            page_cnt: 0,
            reserved6: 0,
        },
        reserved3: 0,
    }
}

/// Continuation page of [correct_rdh_page0], closing the trigger.
pub fn correct_rdh_page1() -> Rdh {
    let mut rdh = correct_rdh_page0();
    rdh.rdh1.memory_size = 224;
    rdh.rdh1.offset_to_next = 224;
    rdh.rdh1.packet_counter = 1;
    rdh.rdh4.page_cnt = 1;
    rdh.rdh4.stop = 1;
    rdh
}
