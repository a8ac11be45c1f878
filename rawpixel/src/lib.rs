#![warn(unused_extern_crates)]
#![warn(missing_docs)]
#![warn(missing_copy_implementations)]
// Readability lints
#![warn(
    clippy::option_filter_map,
    clippy::manual_filter_map,
    clippy::if_not_else,
    clippy::nonminimal_bool,
    clippy::single_match_else,
    clippy::range_plus_one,
    clippy::int_plus_one,
    clippy::needless_range_loop,
    clippy::needless_continue
)]
// Performance lints
#![warn(variant_size_differences)]
#![warn(
    clippy::needless_pass_by_value,
    clippy::unnecessary_wraps,
    clippy::mutex_integer,
    clippy::mem_forget,
    clippy::maybe_infinite_iter
)]
// Safety lints
#![warn(unused_results)]
#![warn(unused_import_braces)]
#![warn(trivial_casts, trivial_numeric_casts)]

//! Bidirectional codec between ALPIDE pixel digits and the CRU raw page
//! stream of the ITS and MFT readout units.
//!
//! The encode path turns a sorted digit list into framed link data:
//! digits → group by RU → per cable ALPIDE stream → GBT pages → link buffer
//! → superpage flush. The decode path runs it backwards with full format
//! validation: byte stream → page scan → per-link cache keyed by
//! (RU, trigger) → GBT unpacking → ALPIDE decoding → per-chip pixel data.
//!
//! # Encoding one trigger
//! ```
//! use rawpixel::codec::RawPixelCodec;
//! use rawpixel::mapping::its::ChipMappingIts;
//! use rawpixel::pixels::{Digit, InteractionRecord};
//! use ru_protocol::payload::PayloadBuffer;
//!
//! let mut codec = RawPixelCodec::new(ChipMappingIts::new());
//! let digits = vec![Digit { chip_id: 17, row: 3, col: 5 }];
//! let ir = InteractionRecord::new(100, 42);
//! codec.digits_to_raw(&digits, ir, 0, u16::MAX).unwrap();
//!
//! let mut sink = PayloadBuffer::new();
//! let pages = codec.flush_superpages(256, &mut sink);
//! assert!(pages > 0);
//! ```
//!
//! # Decoding it back
//! ```
//! # use rawpixel::codec::RawPixelCodec;
//! # use rawpixel::mapping::its::ChipMappingIts;
//! # use rawpixel::pixels::{ChipPixelData, Digit, InteractionRecord};
//! # use ru_protocol::payload::PayloadBuffer;
//! # let mut codec = RawPixelCodec::new(ChipMappingIts::new());
//! # let digits = vec![Digit { chip_id: 17, row: 3, col: 5 }];
//! # let ir = InteractionRecord::new(100, 42);
//! # codec.digits_to_raw(&digits, ir, 0, u16::MAX).unwrap();
//! # let mut sink = PayloadBuffer::new();
//! # codec.flush_superpages(256, &mut sink);
//! let mut decoder = RawPixelCodec::new(ChipMappingIts::new());
//! decoder.set_raw_input(sink.as_slice());
//! let mut chip = ChipPixelData::default();
//! while decoder.next_chip_data(&mut chip).unwrap() {
//!     println!("chip {} fired {} pixels", chip.chip_id, chip.hits.len());
//! }
//! ```

pub mod alpide;
pub mod cli;
pub mod codec;
pub mod mapping;
pub mod pixels;
pub mod stats;

/// Write an error message to stderr through the log facade.
#[inline]
pub fn display_error(err_msg: &str) {
    log::error!("{}", owo_colors::OwoColorize::red(&err_msg));
}
