//! Definition of the [Rdh]: the fixed 64-byte Raw Data Header preceding every CRU page.
//!
//! Byte layout (all multi-byte fields little-endian):
//!
//! | bytes | field |
//! |-------|-------|
//! | 0     | `version` |
//! | 1     | `header_size` (always 64) |
//! | 2-3   | `block_length` |
//! | 4-5   | `fee_id` |
//! | 6     | `priority` |
//! | 7     | `reserved0` (must be zero) |
//! | 8-9   | `offset_to_next` |
//! | 10-11 | `memory_size` |
//! | 12    | `link_id` |
//! | 13    | `packet_counter` |
//! | 14-15 | `cru_id` \[11:0\], `dw` \[15:12\] |
//! | 16-19 | `trigger_orbit` |
//! | 20-23 | `heartbeat_orbit` |
//! | 24-31 | `reserved1` (must be zero) |
//! | 32-39 | `trigger_bc` \[11:0\], zero \[15:12\], `heartbeat_bc` \[27:16\], zero \[31:28\], `trigger_type` \[63:32\] |
//! | 40-47 | `reserved2` (must be zero) |
//! | 48-49 | `detector_field` |
//! | 50-51 | `par` |
//! | 52    | `stop` |
//! | 53-54 | `page_cnt` |
//! | 55    | `reserved6` (must be zero) |
//! | 56-63 | `reserved3` |
//!
//! The must-be-zero fields double as the plausibility heuristic
//! ([Rdh::is_plausible]) that the decoder uses to find the next genuine
//! header after a framing loss. `reserved3` is deliberately not part of the
//! heuristic.

pub mod rdh0;
pub mod rdh1;
pub mod rdh2;
pub mod rdh3;
pub mod rdh4;
pub mod test_data;

pub use rdh0::FeeId;
pub use rdh0::Rdh0;
pub use rdh1::CruidDw;
pub use rdh1::Rdh1;
pub use rdh2::Rdh2;
pub use rdh3::Rdh3;
pub use rdh4::Rdh4;

use byteorder::{ByteOrder, LittleEndian};
use std::fmt::{self, Display};

/// Size of a serialized [Rdh] in bytes.
pub const RDH_SIZE_BYTES: usize = 64;

/// Header version emitted by the encoder.
pub const RDH_VERSION: u8 = 4;

/// The Raw Data Header of one CRU page.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Rdh {
    /// Bytes 0-7: version, header size, block length, FEE id, priority.
    pub rdh0: Rdh0,
    /// Bytes 8-15: offset to next page, memory size, link id, packet counter, CRU id.
    pub rdh1: Rdh1,
    /// Bytes 16-23: trigger and heartbeat orbits.
    pub rdh2: Rdh2,
    /// Bytes 24-31, must be zero.
    pub reserved1: u64,
    /// Bytes 32-39: trigger/heartbeat bunch crossings and trigger type.
    pub rdh3: Rdh3,
    /// Bytes 40-47, must be zero.
    pub reserved2: u64,
    /// Bytes 48-55: detector field, pause-and-reset, stop bit, page counter.
    pub rdh4: Rdh4,
    /// Bytes 56-63, reserved but not part of the heuristic.
    pub reserved3: u64,
}

impl Rdh {
    /// Deserializes an [Rdh] from the first [RDH_SIZE_BYTES] of `buf`.
    pub fn from_buf(buf: &[u8]) -> Result<Self, std::io::Error> {
        if buf.len() < RDH_SIZE_BYTES {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "buffer too short for RDH",
            ));
        }
        Ok(Self {
            rdh0: Rdh0::from_buf(&buf[0..8]),
            rdh1: Rdh1::from_buf(&buf[8..16]),
            rdh2: Rdh2::from_buf(&buf[16..24]),
            reserved1: LittleEndian::read_u64(&buf[24..32]),
            rdh3: Rdh3::from_buf(&buf[32..40]),
            reserved2: LittleEndian::read_u64(&buf[40..48]),
            rdh4: Rdh4::from_buf(&buf[48..56]),
            reserved3: LittleEndian::read_u64(&buf[56..64]),
        })
    }

    /// Deserializes an [Rdh] from a reader.
    pub fn load<R: std::io::Read>(reader: &mut R) -> Result<Self, std::io::Error> {
        let mut buf = [0u8; RDH_SIZE_BYTES];
        reader.read_exact(&mut buf)?;
        Self::from_buf(&buf)
    }

    /// Serializes the header into the first [RDH_SIZE_BYTES] of `buf`.
    ///
    /// # Panics
    /// Panics if `buf` is shorter than [RDH_SIZE_BYTES].
    pub fn write_to(&self, buf: &mut [u8]) {
        self.rdh0.write_to(&mut buf[0..8]);
        self.rdh1.write_to(&mut buf[8..16]);
        self.rdh2.write_to(&mut buf[16..24]);
        LittleEndian::write_u64(&mut buf[24..32], self.reserved1);
        self.rdh3.write_to(&mut buf[32..40]);
        LittleEndian::write_u64(&mut buf[40..48], self.reserved2);
        self.rdh4.write_to(&mut buf[48..56]);
        LittleEndian::write_u64(&mut buf[56..64], self.reserved3);
    }

    /// Serializes the header into a fresh byte array.
    pub fn to_bytes(&self) -> [u8; RDH_SIZE_BYTES] {
        let mut buf = [0u8; RDH_SIZE_BYTES];
        self.write_to(&mut buf);
        buf
    }

    /// Heuristic check that a byte window really holds an [Rdh]: the header
    /// size must match and every reserved-zero field must be zero.
    pub fn is_plausible(&self) -> bool {
        self.rdh0.header_size == RDH_SIZE_BYTES as u8
            && self.rdh0.reserved0 == 0
            && self.reserved1 == 0
            && self.rdh3.reserved_bits() == 0
            && self.reserved2 == 0
            && self.rdh4.reserved6 == 0
    }

    /// Checks whether `self` continues the multi-page data described by
    /// `prev`: a non-zero page counter on the same FEE, the same trigger and
    /// heartbeat interaction, and at least one shared trigger-type bit.
    pub fn continues(&self, prev: &Rdh) -> bool {
        self.rdh4.page_cnt != 0
            && self.rdh0.fee_id == prev.rdh0.fee_id
            && self.rdh2.trigger_orbit == prev.rdh2.trigger_orbit
            && self.rdh3.trigger_bc() == prev.rdh3.trigger_bc()
            && self.rdh2.heartbeat_orbit == prev.rdh2.heartbeat_orbit
            && self.rdh3.heartbeat_bc() == prev.rdh3.heartbeat_bc()
            && (self.rdh3.trigger_type() & prev.rdh3.trigger_type()) != 0
    }

    /// The FEE id of the RU/link that produced this page.
    #[inline]
    pub fn fee_id(&self) -> u16 {
        self.rdh0.fee_id.0
    }

    /// The GBT link the page arrived on.
    #[inline]
    pub fn link_id(&self) -> u8 {
        self.rdh1.link_id
    }

    /// Bytes of header plus payload actually used in the page.
    #[inline]
    pub fn memory_size(&self) -> u16 {
        self.rdh1.memory_size
    }

    /// Distance in bytes from this header to the next one.
    #[inline]
    pub fn offset_to_next(&self) -> u16 {
        self.rdh1.offset_to_next
    }

    /// Page counter within one trigger, starting at 0.
    #[inline]
    pub fn page_cnt(&self) -> u16 {
        self.rdh4.page_cnt
    }

    /// Stop bit: set on the closing page of a trigger.
    #[inline]
    pub fn stop(&self) -> u8 {
        self.rdh4.stop
    }

    /// Trigger type bit mask, see [trigger](crate::trigger).
    #[inline]
    pub fn trigger_type(&self) -> u32 {
        self.rdh3.trigger_type()
    }
}

impl Display for Rdh {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "RDH v{ver} fee:{fee:#06x} lnk:{lnk} mem:{mem:<5} offs:{offs:<5} orb:{orb:<10} bc:{bc:<4} trg:{trg:#x} page:{page} stop:{stop}",
            ver = self.rdh0.version,
            fee = self.fee_id(),
            lnk = self.link_id(),
            mem = self.memory_size(),
            offs = self.offset_to_next(),
            orb = self.rdh2.trigger_orbit,
            bc = self.rdh3.trigger_bc(),
            trg = self.trigger_type(),
            page = self.page_cnt(),
            stop = self.stop(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::test_data::*;
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn roundtrip_through_bytes() {
        let rdh = correct_rdh_page0();
        let bytes = rdh.to_bytes();
        let back = Rdh::from_buf(&bytes).unwrap();
        assert_eq!(rdh, back);
    }

    #[test]
    fn heuristic_accepts_correct_header() {
        assert!(correct_rdh_page0().is_plausible());
        assert!(correct_rdh_page1().is_plausible());
    }

    #[test]
    fn heuristic_rejects_wrong_header_size() {
        let mut rdh = correct_rdh_page0();
        rdh.rdh0.header_size = 0x20;
        assert!(!rdh.is_plausible());
    }

    #[test]
    fn heuristic_rejects_dirty_reserved() {
        let mut rdh = correct_rdh_page0();
        rdh.reserved2 = 1;
        assert!(!rdh.is_plausible());

        let mut rdh = correct_rdh_page0();
        rdh.rdh4.reserved6 = 0xFF;
        assert!(!rdh.is_plausible());
    }

    #[test]
    fn continuation_predicate() {
        let first = correct_rdh_page0();
        let second = correct_rdh_page1();
        assert!(second.continues(&first));
        // A page 0 never continues anything
        assert!(!first.continues(&second));
        // Different FEE breaks the chain
        let mut other_fee = second;
        other_fee.rdh0.fee_id = FeeId(0x1234);
        assert!(!other_fee.continues(&first));
        // Disjoint trigger types break the chain
        let mut other_trg = second;
        other_trg.rdh3 = Rdh3::new(
            second.rdh3.trigger_bc(),
            second.rdh3.heartbeat_bc(),
            crate::trigger::SOT,
        );
        assert!(!other_trg.continues(&first));
    }

    #[test]
    fn display_is_one_line() {
        let printed = format!("{}", correct_rdh_page0());
        assert!(!printed.contains('\n'));
    }
}
