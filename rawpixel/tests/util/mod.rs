//! Shared helpers for the codec integration tests.
#![allow(dead_code)] // not every test binary uses every helper

use rawpixel::codec::RawPixelCodec;
use rawpixel::mapping::ChipMapping;
use rawpixel::pixels::{ChipPixelData, Digit, InteractionRecord};
use ru_protocol::payload::PayloadBuffer;

/// Deterministic linear congruential generator, so tests need no RNG crate.
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Lcg(seed)
    }

    pub fn next_u32(&mut self) -> u32 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (self.0 >> 33) as u32
    }

    pub fn below(&mut self, bound: u32) -> u32 {
        self.next_u32() % bound
    }
}

/// Generates `n` unique digits on chips `chip_lo..chip_hi`, sorted by chip.
pub fn gen_digits(seed: u64, n: usize, chip_lo: u16, chip_hi: u16) -> Vec<Digit> {
    let mut rng = Lcg::new(seed);
    let mut digits: Vec<Digit> = (0..n)
        .map(|_| Digit {
            chip_id: chip_lo + rng.below((chip_hi - chip_lo) as u32) as u16,
            row: rng.below(512) as u16,
            col: rng.below(1024) as u16,
        })
        .collect();
    digits.sort_unstable();
    digits.dedup();
    digits
}

/// Encodes the given triggers for the RU range and returns the flushed
/// superpage stream.
pub fn encode_triggers<M: ChipMapping>(
    codec: &mut RawPixelCodec<M>,
    triggers: &[(InteractionRecord, Vec<Digit>)],
    ru_sw_min: u16,
    ru_sw_max: u16,
) -> Vec<u8> {
    for (ir, digits) in triggers {
        let _ = codec
            .digits_to_raw(digits, *ir, ru_sw_min, ru_sw_max)
            .expect("encoding failed");
    }
    let mut sink = PayloadBuffer::new();
    while codec.flush_superpages(256, &mut sink) > 0 {}
    sink.as_slice().to_vec()
}

/// Decodes every chip of the stream, returning `(chip, ir)` pairs in yield
/// order.
pub fn collect_chips<M: ChipMapping>(
    codec: &mut RawPixelCodec<M>,
    raw: &[u8],
) -> Vec<ChipPixelData> {
    codec.set_raw_input(raw);
    let mut chips = Vec::new();
    let mut chip = ChipPixelData::default();
    while codec.next_chip_data(&mut chip).expect("decoding failed") {
        chips.push(chip.clone());
    }
    chips
}

/// Flattens decoded chips to a sorted `(chip, orbit, bc, row, col)` list for
/// multiset comparison.
pub fn flatten_hits(chips: &[ChipPixelData]) -> Vec<(u16, u32, u16, u16, u16)> {
    let mut flat: Vec<(u16, u32, u16, u16, u16)> = chips
        .iter()
        .flat_map(|c| {
            c.hits
                .iter()
                .map(move |h| (c.chip_id, c.ir.orbit, c.ir.bc, h.row, h.col))
        })
        .collect();
    flat.sort_unstable();
    flat
}

/// Flattens digit lists the same way for comparison with [flatten_hits].
pub fn flatten_digits(triggers: &[(InteractionRecord, Vec<Digit>)]) -> Vec<(u16, u32, u16, u16, u16)> {
    let mut flat: Vec<(u16, u32, u16, u16, u16)> = triggers
        .iter()
        .flat_map(|(ir, digits)| {
            digits
                .iter()
                .map(move |d| (d.chip_id, ir.orbit, ir.bc, d.row, d.col))
        })
        .collect();
    flat.sort_unstable();
    flat
}

/// Sum of all per-RU error counters of every RU the codec has seen.
pub fn total_ru_errors<M: ChipMapping>(codec: &RawPixelCodec<M>) -> u64 {
    (0..codec.mapping().n_rus())
        .filter_map(|ru| codec.ru_stats_sw(ru))
        .map(|s| s.n_errors())
        .sum()
}
