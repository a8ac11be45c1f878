//! Struct definition of the [Rdh] subword [Rdh0] (bytes 0-7).
//!
//! [Rdh]: super::Rdh

use byteorder::{ByteOrder, LittleEndian};
use std::fmt::{self, Debug};

/// The composite `FEE ID` field. A newtype because the detector mapping packs
/// several sub-fields into the 16 bits (for ITS: layer \[14:12\], GBT link
/// \[9:8\], stave \[5:0\]) and extracting them is the mapping layer's job.
#[derive(PartialEq, Eq, Default, Clone, Copy)]
pub struct FeeId(pub u16);

impl Debug for FeeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

/// First 64 bits of the RDH: identification of header and sender.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Rdh0 {
    /// Header format version.
    pub version: u8,
    /// Size of the header in bytes, always 64.
    pub header_size: u8,
    /// Legacy payload length field, kept dummy by the RU firmware.
    pub block_length: u16,
    /// Identifies the RU and link to the mapping layer.
    pub fee_id: FeeId,
    /// Priority bit.
    pub priority: u8,
    /// Must be zero; part of the RDH heuristic.
    pub reserved0: u8,
}

impl Rdh0 {
    pub(crate) fn from_buf(buf: &[u8]) -> Self {
        Self {
            version: buf[0],
            header_size: buf[1],
            block_length: LittleEndian::read_u16(&buf[2..4]),
            fee_id: FeeId(LittleEndian::read_u16(&buf[4..6])),
            priority: buf[6],
            reserved0: buf[7],
        }
    }

    pub(crate) fn write_to(&self, buf: &mut [u8]) {
        buf[0] = self.version;
        buf[1] = self.header_size;
        LittleEndian::write_u16(&mut buf[2..4], self.block_length);
        LittleEndian::write_u16(&mut buf[4..6], self.fee_id.0);
        buf[6] = self.priority;
        buf[7] = self.reserved0;
    }
}
