#![forbid(unused_extern_crates)]
#![deny(missing_docs)]
#![warn(missing_debug_implementations)]
#![warn(missing_copy_implementations)]
#![warn(trivial_casts, trivial_numeric_casts)]
#![warn(unused_results)]
#![warn(unused_import_braces)]
#![warn(variant_size_differences)]
#![warn(
    clippy::option_filter_map,
    clippy::manual_filter_map,
    clippy::if_not_else,
    clippy::nonminimal_bool
)]
// Performance lints
#![warn(
    clippy::needless_pass_by_value,
    clippy::unnecessary_wraps,
    clippy::mutex_integer,
    clippy::mem_forget,
    clippy::maybe_infinite_iter
)]

//! Wire format of the ALPIDE Readout Unit (RU) links.
//!
//! This crate knows nothing about detectors or pixels; it defines the three
//! layers of framing that every CRU byte stream is built from, plus the byte
//! buffer the codec layers run on:
//!
//! * [rdh]: the fixed 64-byte Raw Data Header preceding every CRU page,
//!   with the plausibility heuristic used to re-synchronize on corrupt input.
//! * [gbt]: the 80-bit GBT words (optionally padded to 128 bits) that make
//!   up a page payload, from the data header through the data words with
//!   embedded cable id to the data trailer carrying lane-stop and
//!   lane-timeout masks.
//! * [trigger]: the trigger-type bit assignments shared by the RDH and the
//!   hosts interpreting it.
//! * [payload]: [PayloadBuffer](payload::PayloadBuffer), an owned byte
//!   container with an explicit read cursor, used for raw input buffering,
//!   per-cable ALPIDE streams and per-link page caches alike.
//!
//! All multi-byte fields on the wire are little-endian. Serialization is
//! explicit, field by field; no struct is ever reinterpreted from raw bytes.

pub mod gbt;
pub mod payload;
pub mod prelude;
pub mod rdh;
pub mod trigger;
