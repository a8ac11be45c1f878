//! Skim-mode properties: padding equivalence and idempotence, plus
//! file-backed decoding.

mod util;

use rawpixel::codec::RawPixelCodec;
use rawpixel::mapping::its::ChipMappingIts;
use rawpixel::pixels::InteractionRecord;
use ru_protocol::payload::PayloadBuffer;
use util::*;

fn skim_stream<MakesPadded: Fn(&mut RawPixelCodec<ChipMappingIts>)>(
    raw: &[u8],
    configure: MakesPadded,
) -> Vec<u8> {
    let mut codec = RawPixelCodec::new(ChipMappingIts::new());
    configure(&mut codec);
    codec.set_raw_input(raw);
    let mut out = PayloadBuffer::new();
    while codec.skim_next_ru_data(&mut out).expect("skim failed") {}
    assert_eq!(total_ru_errors(&codec), 0);
    out.as_slice().to_vec()
}

#[test]
fn skim_equals_padded_decode_and_is_idempotent() {
    let triggers = vec![
        (InteractionRecord::new(11, 100), gen_digits(21, 300, 0, 36)),
        (InteractionRecord::new(11, 900), gen_digits(22, 250, 0, 36)),
    ];
    let mut encoder = RawPixelCodec::new(ChipMappingIts::new());
    let padded = encode_triggers(&mut encoder, &triggers, 0, 3);

    // reference: decode the padded stream directly
    let mut decoder = RawPixelCodec::new(ChipMappingIts::new());
    let reference = collect_chips(&mut decoder, &padded);
    assert_eq!(total_ru_errors(&decoder), 0);

    // skim the padded fixed-size pages into compact true-size ones
    let skimmed = skim_stream(&padded, |_| {});
    assert!(skimmed.len() < padded.len());

    // the compact stream decodes to the same chips
    let mut compact_decoder = RawPixelCodec::new(ChipMappingIts::new());
    compact_decoder.set_padding_128(false);
    let from_skim = collect_chips(&mut compact_decoder, &skimmed);
    assert_eq!(flatten_hits(&from_skim), flatten_hits(&reference));
    assert_eq!(total_ru_errors(&compact_decoder), 0);

    // skimming a skimmed stream is the identity
    let twice = skim_stream(&skimmed, |codec| codec.set_padding_128(false));
    assert_eq!(twice, skimmed);
}

#[test]
fn skim_covers_multi_page_triggers() {
    let triggers = vec![(
        InteractionRecord::new(4, 4),
        gen_digits(1717, 2000, 6480, 6676),
    )];
    let mut encoder = RawPixelCodec::new(ChipMappingIts::new());
    let padded = encode_triggers(&mut encoder, &triggers, 102, 102);

    let mut decoder = RawPixelCodec::new(ChipMappingIts::new());
    let reference = collect_chips(&mut decoder, &padded);

    let skimmed = skim_stream(&padded, |_| {});
    let mut compact_decoder = RawPixelCodec::new(ChipMappingIts::new());
    compact_decoder.set_padding_128(false);
    let from_skim = collect_chips(&mut compact_decoder, &skimmed);
    assert_eq!(flatten_hits(&from_skim), flatten_hits(&reference));
}

#[test]
fn decode_from_file_input() {
    let triggers = vec![
        (InteractionRecord::new(200, 5), gen_digits(31, 300, 0, 36)),
        (InteractionRecord::new(201, 6), gen_digits(32, 300, 0, 36)),
    ];
    let mut encoder = RawPixelCodec::new(ChipMappingIts::new());
    let raw = encode_triggers(&mut encoder, &triggers, 0, 3);

    let tmp = temp_dir::TempDir::new().unwrap();
    let path = tmp.child("pixels.raw");
    std::fs::write(&path, &raw).unwrap();

    let mut codec = RawPixelCodec::new(ChipMappingIts::new());
    codec.open_input(&path).unwrap();
    let mut chips = Vec::new();
    let mut chip = rawpixel::pixels::ChipPixelData::default();
    while codec.next_chip_data(&mut chip).unwrap() {
        chips.push(chip.clone());
    }
    assert_eq!(flatten_hits(&chips), flatten_digits(&triggers));
    assert_eq!(total_ru_errors(&codec), 0);
}
