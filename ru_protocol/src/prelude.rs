//! Convenience re-exports of the types virtually every user of the crate needs.

pub use crate::gbt::{
    GbtDataHeader, GbtDataTrailer, PacketState, GBT_DATA_BYTES, GBT_PADDED_WORD_LEN, GBT_WORD_LEN,
    MAX_STATE_COMBINATIONS,
};
pub use crate::payload::PayloadBuffer;
pub use crate::rdh::{FeeId, Rdh, RDH_SIZE_BYTES, RDH_VERSION};
pub use crate::trigger;
