//! Encode-then-decode round trips and the page-level boundary scenarios.

mod util;

use rawpixel::codec::{RawPixelCodec, MAX_GBT_PACKET_BYTES};
use rawpixel::mapping::its::ChipMappingIts;
use rawpixel::mapping::mft::ChipMappingMft;
use rawpixel::pixels::{Digit, InteractionRecord};
use ru_protocol::gbt;
use ru_protocol::rdh::{Rdh, RDH_SIZE_BYTES};
use util::*;

#[test]
fn roundtrip_inner_barrel_multi_trigger() {
    let triggers = vec![
        (InteractionRecord::new(1000, 7), gen_digits(1, 400, 0, 36)),
        (InteractionRecord::new(1000, 1500), gen_digits(2, 300, 0, 36)),
        (InteractionRecord::new(1001, 12), gen_digits(3, 350, 0, 36)),
    ];
    let mut encoder = RawPixelCodec::new(ChipMappingIts::new());
    let raw = encode_triggers(&mut encoder, &triggers, 0, 3);

    let mut decoder = RawPixelCodec::new(ChipMappingIts::new());
    let chips = collect_chips(&mut decoder, &raw);

    assert_eq!(flatten_hits(&chips), flatten_digits(&triggers));
    assert_eq!(total_ru_errors(&decoder), 0);
    assert_eq!(decoder.decoding_stats().n_rdh_recoveries, 0);
    assert_eq!(
        decoder.decoding_stats().n_hits_decoded,
        flatten_digits(&triggers).len() as u64
    );
}

#[test]
fn roundtrip_outer_barrel() {
    // layer 5 stave 0 owns chips 6480..6676
    let triggers = vec![(
        InteractionRecord::new(5, 100),
        gen_digits(42, 600, 6480, 6676),
    )];
    let mut encoder = RawPixelCodec::new(ChipMappingIts::new());
    let raw = encode_triggers(&mut encoder, &triggers, 102, 102);

    let mut decoder = RawPixelCodec::new(ChipMappingIts::new());
    let chips = collect_chips(&mut decoder, &raw);
    assert_eq!(flatten_hits(&chips), flatten_digits(&triggers));
    assert_eq!(total_ru_errors(&decoder), 0);
}

#[test]
fn roundtrip_mft() {
    let triggers = vec![
        (InteractionRecord::new(77, 3), gen_digits(9, 200, 0, 84)),
        (InteractionRecord::new(77, 99), gen_digits(10, 150, 0, 84)),
    ];
    let mut encoder = RawPixelCodec::new(ChipMappingMft::new());
    let raw = encode_triggers(&mut encoder, &triggers, 0, 7);

    let mut decoder = RawPixelCodec::new(ChipMappingMft::new());
    let chips = collect_chips(&mut decoder, &raw);
    assert_eq!(flatten_hits(&chips), flatten_digits(&triggers));
    assert_eq!(total_ru_errors(&decoder), 0);
}

#[test]
fn chips_are_yielded_in_trigger_then_ru_order() {
    let triggers = vec![
        (InteractionRecord::new(10, 1), gen_digits(5, 200, 0, 36)),
        (InteractionRecord::new(10, 2), gen_digits(6, 200, 0, 36)),
    ];
    let mut encoder = RawPixelCodec::new(ChipMappingIts::new());
    let raw = encode_triggers(&mut encoder, &triggers, 0, 3);

    let mut decoder = RawPixelCodec::new(ChipMappingIts::new());
    let chips = collect_chips(&mut decoder, &raw);

    // triggers come out in input order, chips ascending within one trigger
    let split = chips
        .iter()
        .position(|c| c.ir.bc == 2)
        .expect("second trigger decoded");
    assert!(chips[..split].iter().all(|c| c.ir.bc == 1));
    assert!(chips[split..].iter().all(|c| c.ir.bc == 2));
    for window in chips[..split].windows(2) {
        assert!(window[0].chip_id < window[1].chip_id);
    }
}

#[test]
fn empty_trigger_is_one_stopped_page() {
    let ir = InteractionRecord::new(500, 11);
    let mut encoder = RawPixelCodec::new(ChipMappingIts::new());
    let raw = encode_triggers(&mut encoder, &[(ir, Vec::new())], 3, 3);

    // exactly one fixed-size page
    assert_eq!(raw.len(), MAX_GBT_PACKET_BYTES);
    let rdh = Rdh::from_buf(&raw).unwrap();
    assert_eq!(rdh.page_cnt(), 0);
    assert_eq!(rdh.stop(), 1);
    assert_eq!(rdh.memory_size() as usize, RDH_SIZE_BYTES + 2 * 16);

    // data header with no active lanes, then the stopping trailer
    let header = &raw[RDH_SIZE_BYTES..RDH_SIZE_BYTES + 16];
    assert!(gbt::is_data_header(header));
    assert_eq!(gbt::GbtDataHeader::from_word(header).active_lanes, 0);
    let trailer = &raw[RDH_SIZE_BYTES + 16..RDH_SIZE_BYTES + 32];
    assert!(gbt::is_data_trailer(trailer));
    let trailer = gbt::GbtDataTrailer::from_word(trailer);
    assert_eq!(trailer.lanes_stop, 0); // lanesStop == lanesActive
    assert_eq!(trailer.state_combination(), 1 << gbt::PacketState::PacketDone as u8);

    let mut decoder = RawPixelCodec::new(ChipMappingIts::new());
    let chips = collect_chips(&mut decoder, &raw);
    assert!(chips.is_empty());
    assert_eq!(total_ru_errors(&decoder), 0);
    assert_eq!(decoder.decoding_stats().n_pages_processed, 1);
}

#[test]
fn single_pixel_roundtrip() {
    let ir = InteractionRecord::new(100, 42);
    let digits = vec![Digit {
        chip_id: 17,
        row: 3,
        col: 5,
    }];
    let mut encoder = RawPixelCodec::new(ChipMappingIts::new());
    let raw = encode_triggers(&mut encoder, &[(ir, digits)], 1, 1);
    assert_eq!(raw.len(), MAX_GBT_PACKET_BYTES); // exactly one page

    let mut decoder = RawPixelCodec::new(ChipMappingIts::new());
    let chips = collect_chips(&mut decoder, &raw);
    assert_eq!(chips.len(), 1);
    assert_eq!(chips[0].chip_id, 17);
    assert_eq!(chips[0].ir, ir);
    assert_eq!(chips[0].hits.len(), 1);
    assert_eq!((chips[0].hits[0].row, chips[0].hits[0].col), (3, 5));
    assert_eq!(total_ru_errors(&decoder), 0);
}

#[test]
fn multi_page_trigger_has_monotonic_counters_and_one_stop() {
    // enough pixels over all cables of one outer-barrel RU to force >= 2 pages
    let triggers = vec![(
        InteractionRecord::new(9, 9),
        gen_digits(1234, 2000, 6480, 6676),
    )];
    let mut encoder = RawPixelCodec::new(ChipMappingIts::new());
    let raw = encode_triggers(&mut encoder, &triggers, 102, 102);

    let n_pages = raw.len() / MAX_GBT_PACKET_BYTES;
    assert!(n_pages >= 2, "expected a multi-page trigger, got {n_pages}");
    for page in 0..n_pages {
        let rdh = Rdh::from_buf(&raw[page * MAX_GBT_PACKET_BYTES..]).unwrap();
        assert_eq!(rdh.page_cnt() as usize, page);
        let expect_stop = u8::from(page == n_pages - 1);
        assert_eq!(rdh.stop(), expect_stop, "page {page}");
    }

    let mut decoder = RawPixelCodec::new(ChipMappingIts::new());
    let chips = collect_chips(&mut decoder, &raw);
    assert_eq!(flatten_hits(&chips), flatten_digits(&triggers));
    assert_eq!(total_ru_errors(&decoder), 0);
}

#[test]
fn compact_words_and_true_size_pages_roundtrip() {
    let triggers = vec![(InteractionRecord::new(3, 3), gen_digits(77, 250, 0, 36))];
    let mut encoder = RawPixelCodec::new(ChipMappingIts::new());
    encoder.set_padding_128(false);
    encoder.impose_max_page(false);
    let raw = encode_triggers(&mut encoder, &triggers, 0, 3);

    // true-size pages: the stream is smaller than one fixed page per RU
    assert!(raw.len() < 4 * MAX_GBT_PACKET_BYTES);

    let mut decoder = RawPixelCodec::new(ChipMappingIts::new());
    decoder.set_padding_128(false);
    decoder.impose_max_page(false);
    let chips = collect_chips(&mut decoder, &raw);
    assert_eq!(flatten_hits(&chips), flatten_digits(&triggers));
    assert_eq!(total_ru_errors(&decoder), 0);
}
