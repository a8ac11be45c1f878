//! Command-line configuration of the `rawpixel` binary.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Read, check and rewrite ALPIDE raw pixel data.
#[derive(Parser, Debug)]
#[command(name = "rawpixel", version, about, long_about = None)]
pub struct Cfg {
    /// Input raw data file.
    pub input: PathBuf,

    /// Detector whose cabling tables to use.
    #[arg(short, long, value_enum, default_value_t = Detector::Its)]
    pub detector: Detector,

    /// Verbosity; repeat for more detail (-v pages, -vv GBT words).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Pages use compact 80-bit GBT words instead of 128-bit padded ones.
    #[arg(long)]
    pub compact_words: bool,

    /// What to do with the input.
    #[command(subcommand)]
    pub command: Command,
}

/// Selects the chip mapping.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detector {
    /// Inner Tracking System.
    Its,
    /// Muon Forward Tracker.
    Mft,
}

/// The operations the binary offers.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Rewrite padded fixed-size pages as compact 80-bit words with true
    /// page sizes.
    Skim {
        /// Where to write the skimmed stream.
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Decode all triggers, print per-chip summaries and statistics.
    Decode,
}

/// Starts the stderr logger; codec verbosity rides on the same flag.
pub fn init_error_logger(cfg: &Cfg) {
    stderrlog::new()
        .module("rawpixel")
        .module("ru_protocol")
        .verbosity(cfg.verbose as usize + 2)
        .init()
        .expect("Failed to initialize logger");
}
