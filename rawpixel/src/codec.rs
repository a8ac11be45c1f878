//! The raw pixel codec: pixel digits in, CRU superpages out, and back.
//!
//! One [RawPixelCodec] instance owns all per-RU and per-link buffers and is
//! strictly single-threaded. Encoding groups digits by RU, serializes each
//! cable's ALPIDE stream, frames GBT packets into RDH pages and flushes
//! complete superpages. Decoding scans RDH pages from a raw byte stream,
//! caches them per link until every link holds enough triggers for complete
//! RU assembly, then pops one trigger at a time and yields per-chip pixel
//! data.
//!
//! Per-link assembly of one trigger walks three states: idle until a page-0
//! RDH arrives, assembling while the continuation predicate
//! ([Rdh::continues]) holds, complete on a stop page or a foreign page.
//! A failed RDH plausibility check drops to recovery: [find_next_rdh]
//! advances one padded word at a time until a plausible header is found.
//!
//! [find_next_rdh]: RawPixelCodec::find_next_rdh

use crate::alpide;
use crate::mapping::{ChipMapping, InvalidMapping, RuInfo};
use crate::pixels::{ChipPixelData, Digit, InteractionRecord, PixelHit};
use crate::stats::{DecodingError, RawDecodingStats, RuDecodingStats};
use byteorder::{ByteOrder, LittleEndian};
use ru_protocol::gbt::{
    self, GbtDataHeader, GbtDataTrailer, PacketState, GBT_DATA_BYTES, GBT_PADDED_WORD_LEN,
    GBT_WORD_LEN,
};
use ru_protocol::payload::PayloadBuffer;
use ru_protocol::rdh::{FeeId, Rdh, Rdh3, RDH_SIZE_BYTES, RDH_VERSION};
use ru_protocol::trigger;
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use thiserror::Error;

/// Max number of GBT links per RU.
pub const MAX_LINKS_PER_RU: usize = 3;
/// Max number of cables an RU can read out.
pub const MAX_CABLES_PER_RU: usize = 28;
/// Max number of chips an RU can read out.
pub const MAX_CHIPS_PER_RU: usize = 196;
/// Max size of a GBT packet (one CRU page) in bytes.
pub const MAX_GBT_PACKET_BYTES: usize = 8 * 1024;
/// Number of CRU pages per superpage.
pub const PAGES_PER_SUPERPAGE: usize = 256;

// read-ahead policy of the raw input buffer
const RAW_BUFFER_MARGIN: usize = 5_000_000;
const RAW_BUFFER_SIZE: usize = 10_000_000 + 2 * RAW_BUFFER_MARGIN;
const _: () = assert!(
    RAW_BUFFER_MARGIN > MAX_GBT_PACKET_BYTES * 100 && RAW_BUFFER_SIZE > 3 * RAW_BUFFER_MARGIN,
    "raw buffer size is too small"
);

/// Errors that abort a codec call. Wire-format violations are *not* errors
/// in this sense; they are counted in [RuDecodingStats] and decoding
/// continues.
#[derive(Debug, Error)]
pub enum CodecError {
    /// A software id, FEE id or hardware address fell outside the mapping.
    #[error(transparent)]
    Mapping(#[from] InvalidMapping),
    /// The underlying byte source failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result alias for codec calls.
pub type CodecResult<T> = Result<T, CodecError>;

/// Per-link cache: raw pages plus the bookkeeping to pop whole triggers.
#[derive(Debug, Default)]
pub struct RuLink {
    /// Cached raw pages, contiguous, with `offsetToNext` rewritten to the
    /// stored page size.
    pub data: PayloadBuffer,
    /// Size of the most recently appended page: the offset from the buffer
    /// end back to its RDH.
    pub last_page_size: usize,
    /// Number of triggers cached (encode side counts pages, not triggers).
    pub n_triggers: u32,
    /// Lanes served by this link (encode side only).
    pub lanes: u32,
}

/// Decode state of one RU: per-cable streams, decoded chips, link caches.
#[derive(Debug)]
pub struct RuDecodeData {
    /// Per-cable compressed ALPIDE data of the current trigger.
    pub cable_data: Vec<PayloadBuffer>,
    /// Hardware cable id occupying each slot of `cable_data`.
    pub cable_hw_id: [u8; MAX_CABLES_PER_RU],
    /// Decoded chips of the current trigger, `..n_chips_fired` valid.
    pub chips_data: Vec<ChipPixelData>,
    /// Per-link page caches, created lazily.
    pub links: [Option<Box<RuLink>>; MAX_LINKS_PER_RU],
    /// Decoding statistics, persisting across triggers.
    pub stats: RuDecodingStats,
    /// Cables participating in the current trigger.
    pub n_cables: usize,
    /// Chips with data decoded for the current trigger.
    pub n_chips_fired: usize,
    /// Chips already handed out by the streaming API.
    pub last_chip_checked: usize,
    /// Static description of the RU.
    pub ru_info: RuInfo,
}

impl RuDecodeData {
    fn new(ru_info: RuInfo) -> Self {
        Self {
            cable_data: vec![PayloadBuffer::new(); MAX_CABLES_PER_RU],
            cable_hw_id: [0; MAX_CABLES_PER_RU],
            chips_data: vec![ChipPixelData::default(); MAX_CHIPS_PER_RU],
            links: Default::default(),
            stats: RuDecodingStats::default(),
            n_cables: 0,
            n_chips_fired: 0,
            last_chip_checked: 0,
            ru_info,
        }
    }

    /// Drops the per-trigger cable buffers.
    pub fn clear_trigger(&mut self) {
        for cable in self.cable_data.iter_mut().take(self.n_cables) {
            cable.clear();
        }
        self.n_cables = 0;
    }

    /// Drops everything, statistics included.
    pub fn clear(&mut self) {
        self.clear_trigger();
        self.stats.clear();
        self.n_chips_fired = 0;
        self.last_chip_checked = 0;
        for link in self.links.iter_mut().flatten() {
            link.data.clear();
            link.last_page_size = 0;
            link.n_triggers = 0;
        }
    }
}

/// The codec orchestrator, generic over the detector's [ChipMapping].
pub struct RawPixelCodec<M: ChipMapping> {
    mapping: M,
    verbosity: u8,

    io: Option<BufReader<File>>,
    raw_buffer: PayloadBuffer,

    ru_decode: Vec<RuDecodeData>,
    ru_entry: Vec<Option<usize>>,
    n_links: usize,

    cur_ru_sw: Option<u16>,
    min_triggers_to_cache: u32,
    min_triggers_cached: u32,

    stats: RawDecodingStats,

    padding_128: bool,
    impose_max_page: bool,
    gbt_word_size: usize,

    interaction_record: InteractionRecord,
    interaction_record_hb: InteractionRecord,
    trigger: u32,
}

impl<M: ChipMapping> RawPixelCodec<M> {
    /// Creates a codec for the given detector mapping. GBT words default to
    /// 128-bit padding and pages to fixed 8 KB slots, as the CRU writes them.
    pub fn new(mapping: M) -> Self {
        let n_rus = mapping.n_rus() as usize;
        Self {
            mapping,
            verbosity: 0,
            io: None,
            raw_buffer: PayloadBuffer::new(),
            ru_decode: Vec::new(),
            ru_entry: vec![None; n_rus],
            n_links: 0,
            cur_ru_sw: None,
            min_triggers_to_cache: PAGES_PER_SUPERPAGE as u32 + 10,
            min_triggers_cached: 0,
            stats: RawDecodingStats::default(),
            padding_128: true,
            impose_max_page: true,
            gbt_word_size: GBT_PADDED_WORD_LEN,
            interaction_record: InteractionRecord::default(),
            interaction_record_hb: InteractionRecord::default(),
            trigger: 0,
        }
    }

    /// Are GBT words interpreted as padded to 128 bits?
    pub fn is_padding_128(&self) -> bool {
        self.padding_128
    }

    /// Chooses between 128-bit padded and compact 80-bit GBT words.
    pub fn set_padding_128(&mut self, padded: bool) {
        self.padding_128 = padded;
        self.gbt_word_size = if padded {
            GBT_PADDED_WORD_LEN
        } else {
            GBT_WORD_LEN
        };
    }

    /// Assumed GBT word size in bytes, padding included.
    pub fn gbt_word_size(&self) -> usize {
        self.gbt_word_size
    }

    /// Are CRU pages written/padded as fixed 8 KB slots?
    pub fn is_max_page_imposed(&self) -> bool {
        self.impose_max_page
    }

    /// Chooses between true-size pages and fixed 8 KB slots.
    pub fn impose_max_page(&mut self, impose: bool) {
        self.impose_max_page = impose;
    }

    /// Sets the minimum number of triggers to cache per link, floored at one
    /// more than the pages of a superpage so a full superpage can never
    /// straddle the cache.
    pub fn set_min_triggers_to_cache(&mut self, n: u32) {
        self.min_triggers_to_cache = n.max(PAGES_PER_SUPERPAGE as u32 + 1);
    }

    /// Minimum number of triggers cached per link before decoding starts.
    pub fn min_triggers_to_cache(&self) -> u32 {
        self.min_triggers_to_cache
    }

    /// Verbosity: 1 logs pages, 2 also logs GBT words.
    pub fn set_verbosity(&mut self, verbosity: u8) {
        self.verbosity = verbosity;
    }

    /// Current verbosity level.
    pub fn verbosity(&self) -> u8 {
        self.verbosity
    }

    /// The detector mapping in use.
    pub fn mapping(&self) -> &M {
        &self.mapping
    }

    /// Global decoding statistics.
    pub fn decoding_stats(&self) -> &RawDecodingStats {
        &self.stats
    }

    /// Statistics of the RU with the given software id, if it was ever seen.
    pub fn ru_stats_sw(&self, ru_sw: u16) -> Option<&RuDecodingStats> {
        let idx = (*self.ru_entry.get(ru_sw as usize)?)?;
        Some(&self.ru_decode[idx].stats)
    }

    /// Statistics of the RU owning the given FEE id, if it was ever seen.
    pub fn ru_stats_hw(&self, fee_id: u16) -> CodecResult<Option<&RuDecodingStats>> {
        let ru_sw = self.mapping.fee_id_to_ru_sw(fee_id)?;
        Ok(self.ru_stats_sw(ru_sw))
    }

    /// Decode container of the RU with the given software id, if any.
    pub fn ru_decode(&self, ru_sw: u16) -> Option<&RuDecodeData> {
        let idx = (*self.ru_entry.get(ru_sw as usize)?)?;
        Some(&self.ru_decode[idx])
    }

    /// Number of GBT links seen so far.
    pub fn n_links(&self) -> usize {
        self.n_links
    }

    /// Number of RUs seen so far.
    pub fn n_rus(&self) -> usize {
        self.ru_decode.len()
    }

    /// Interaction record of the trigger currently being yielded.
    pub fn interaction_record(&self) -> InteractionRecord {
        self.interaction_record
    }

    /// Heartbeat interaction record of the trigger currently being yielded.
    pub fn interaction_record_hb(&self) -> InteractionRecord {
        self.interaction_record_hb
    }

    /// Trigger-type mask of the trigger currently being yielded.
    pub fn trigger(&self) -> u32 {
        self.trigger
    }

    /// Resets all state: buffers, statistics, RU containers and the input.
    pub fn clear(&mut self) {
        self.stats.clear();
        self.ru_decode.clear();
        self.ru_entry = vec![None; self.mapping.n_rus() as usize];
        self.n_links = 0;
        self.io = None;
        self.raw_buffer.clear();
        self.cur_ru_sw = None;
        self.min_triggers_cached = 0;
    }

    fn get_create_ru_decode(&mut self, ru_sw: u16) -> CodecResult<usize> {
        if let Some(idx) = self.ru_entry[ru_sw as usize] {
            return Ok(idx);
        }
        let ru_info = *self.mapping.ru_info_sw(ru_sw)?;
        let idx = self.ru_decode.len();
        self.ru_decode.push(RuDecodeData::new(ru_info));
        self.ru_entry[ru_sw as usize] = Some(idx);
        log::info!("defining container for RU {ru_sw} at slot {idx}");
        Ok(idx)
    }

    // ================================ encoding ================================

    /// Converts the digits of one trigger to raw pages in the link buffers.
    ///
    /// `digits` must be sorted by chip id ascending; chips outside
    /// `ru_sw_min..=ru_sw_max` are ignored. Chip-empty markers are stamped
    /// for chip ids skipped between fired chips of the same RU. Returns the
    /// number of pages in the link with the smallest amount of pages.
    pub fn digits_to_raw(
        &mut self,
        digits: &[Digit],
        ir: InteractionRecord,
        ru_sw_min: u16,
        ru_sw_max: u16,
    ) -> CodecResult<u32> {
        debug_assert!(digits.windows(2).all(|w| w[0].chip_id <= w[1].chip_id));
        let ru_sw_max = ru_sw_max.min(self.mapping.n_rus() - 1);
        self.interaction_record = ir;
        self.interaction_record_hb = ir;

        // book containers and impose single-link readout where none is known
        for ru_sw in ru_sw_min..=ru_sw_max {
            let idx = self.get_create_ru_decode(ru_sw)?;
            let ru = &mut self.ru_decode[idx];
            if ru.links.iter().all(|l| l.is_none()) {
                log::info!("imposing single link readout for RU {ru_sw}");
                let link = RuLink {
                    lanes: self.mapping.cables_on_ru_type(ru.ru_info.ru_type),
                    ..Default::default()
                };
                ru.links[0] = Some(Box::new(link));
                self.n_links += 1;
            }
        }

        // distribute digits into per-chip containers of their RUs
        let mut cur_chip: Option<(u16, usize)> = None; // (global chip id, RU slot)
        for digit in digits {
            if !matches!(cur_chip, Some((id, _)) if id == digit.chip_id) {
                let info = self.mapping.chip_info_sw(digit.chip_id)?;
                if info.ru_sw < ru_sw_min || info.ru_sw > ru_sw_max {
                    cur_chip = None;
                    continue;
                }
                let idx = self.ru_entry[info.ru_sw as usize].expect("RU container booked above");
                let ru = &mut self.ru_decode[idx];
                let chip = &mut ru.chips_data[ru.n_chips_fired];
                chip.clear();
                chip.chip_id = info.on_ru.id_on_ru;
                ru.n_chips_fired += 1;
                cur_chip = Some((digit.chip_id, idx));
            }
            if let Some((_, idx)) = cur_chip {
                let ru = &mut self.ru_decode[idx];
                let fired = ru.n_chips_fired;
                ru.chips_data[fired - 1].hits.push(PixelHit {
                    row: digit.row,
                    col: digit.col,
                });
            }
        }

        // serialize per cable and flush to the link buffers
        let mut min_pages = u32::MAX;
        for ru_sw in ru_sw_min..=ru_sw_max {
            let idx = self.ru_entry[ru_sw as usize].expect("RU container booked above");
            let mut prev_fired: Option<u16> = None;
            for ich in 0..self.ru_decode[idx].n_chips_fired {
                let chip_on_ru = self.ru_decode[idx].chips_data[ich].chip_id;
                if let Some(prev) = prev_fired {
                    self.convert_empty_chips(idx, prev + 1, chip_on_ru, ir.bc)?;
                }
                prev_fired = Some(chip_on_ru);
                self.convert_chip(idx, ich, ir.bc)?;
            }
            let min_pages_ru = self.fill_ru_links(idx, ir)?;
            min_pages = min_pages.min(min_pages_ru);
        }

        Ok(if min_pages == u32::MAX { 0 } else { min_pages })
    }

    /// Serializes the hits of one fired chip into its cable buffer.
    fn convert_chip(&mut self, ru_idx: usize, chip_idx: usize, bc: u16) -> CodecResult<()> {
        let ru_type = self.ru_decode[ru_idx].ru_info.ru_type;
        let chip_on_ru = self.ru_decode[ru_idx].chips_data[chip_idx].chip_id;
        let on_ru = *self.mapping.chip_on_ru_info(ru_type, chip_on_ru)?;
        let ru = &mut self.ru_decode[ru_idx];
        ru.cable_hw_id[on_ru.cable_sw as usize] = on_ru.cable_hw;
        ru.n_cables = ru.ru_info.n_cables as usize;
        ru.chips_data[chip_idx].hits.sort_unstable();
        let n_hits = ru.chips_data[chip_idx].hits.len();
        ru.cable_data[on_ru.cable_sw as usize].reserve(40 * (2 + n_hits));
        alpide::encode_chip(
            &mut ru.cable_data[on_ru.cable_sw as usize],
            &ru.chips_data[chip_idx],
            on_ru.chip_on_module_hw,
            bc,
        );
        ru.chips_data[chip_idx].clear();
        Ok(())
    }

    /// Stamps chip-empty markers for every chip id in `from..upto`.
    fn convert_empty_chips(
        &mut self,
        ru_idx: usize,
        from: u16,
        upto: u16,
        bc: u16,
    ) -> CodecResult<()> {
        let ru_type = self.ru_decode[ru_idx].ru_info.ru_type;
        for chip_on_ru in from..upto {
            let on_ru = *self.mapping.chip_on_ru_info(ru_type, chip_on_ru)?;
            let ru = &mut self.ru_decode[ru_idx];
            ru.cable_hw_id[on_ru.cable_sw as usize] = on_ru.cable_hw;
            ru.n_cables = ru.ru_info.n_cables as usize;
            alpide::add_empty_chip(
                &mut ru.cable_data[on_ru.cable_sw as usize],
                on_ru.chip_on_module_hw,
                bc,
            );
        }
        Ok(())
    }

    /// Frames the RU's cable data into RDH pages on its link buffers,
    /// returning the page count of the emptiest link.
    fn fill_ru_links(&mut self, ru_idx: usize, ir: InteractionRecord) -> CodecResult<u32> {
        let word = self.gbt_word_size;
        let impose_max_page = self.impose_max_page;
        let max_words_per_packet = (MAX_GBT_PACKET_BYTES - RDH_SIZE_BYTES) / word - 2;
        let ru_sw = self.ru_decode[ru_idx].ru_info.id_sw;
        let ru_type = self.ru_decode[ru_idx].ru_info.ru_type;
        let n_cables = self.ru_decode[ru_idx].ru_info.n_cables as usize;
        self.ru_decode[ru_idx].n_cables = n_cables;

        let mut rdh = Rdh::default();
        rdh.rdh0.version = RDH_VERSION;
        rdh.rdh0.header_size = RDH_SIZE_BYTES as u8;
        rdh.rdh0.block_length = 0xFFFF; // kept dummy
        rdh.rdh2.trigger_orbit = ir.orbit;
        rdh.rdh2.heartbeat_orbit = ir.orbit;
        rdh.rdh3 = Rdh3::new(ir.bc, ir.bc, trigger::PHT);
        rdh.rdh4.detector_field = self.mapping.detector_field();

        let mut fee_ids = [0u16; MAX_LINKS_PER_RU];
        for (il, fee) in fee_ids.iter_mut().enumerate() {
            *fee = self.mapping.ru_sw_to_fee_id(ru_sw, il as u8)?;
        }
        let mut cable_flags = [0u8; MAX_CABLES_PER_RU];
        for (icab, flag) in cable_flags.iter_mut().enumerate().take(n_cables) {
            *flag = self
                .mapping
                .cable_flag(ru_type, self.ru_decode[ru_idx].cable_hw_id[icab]);
        }

        let mut min_pages = u32::MAX;
        {
            let ru = &mut self.ru_decode[ru_idx];
            let RuDecodeData {
                links, cable_data, ..
            } = ru;

            for (il, link_opt) in links.iter_mut().enumerate() {
                let Some(link) = link_opt.as_deref_mut() else {
                    continue;
                };

                // lanes that actually carry payload this trigger
                let mut lanes_active = 0u32;
                let mut words_needed = 0usize;
                for (icab, cable) in cable_data.iter().enumerate().take(n_cables) {
                    if link.lanes & (1 << icab) != 0 {
                        let nb = cable.unread_len();
                        if nb > 0 {
                            lanes_active |= 1 << icab;
                            words_needed += 1 + (nb - 1) / GBT_DATA_BYTES;
                        }
                    }
                }

                rdh.rdh0.fee_id = FeeId(fee_ids[il]);
                rdh.rdh1.link_id = il as u8;
                rdh.rdh4.page_cnt = 0;
                rdh.rdh4.stop = 0;
                set_page_geometry(&mut rdh, words_needed, word, impose_max_page);

                link.data.reserve(MAX_GBT_PACKET_BYTES);
                let mut page_rdh_at = link.data.len();
                link.data.push_slice(&rdh.to_bytes());
                link.n_triggers += 1; // pages are counted here, not triggers

                let mut gbt_header = GbtDataHeader::new(rdh.page_cnt(), lanes_active);
                link.data.push_slice(&gbt_header.to_word()[..word]);

                // round-robin over the lanes, 9 bytes per visit, until drained
                let mut words_in_packet = 0usize;
                while words_needed > 0 {
                    for icab in 0..n_cables {
                        if link.lanes & (1 << icab) == 0 {
                            continue;
                        }
                        let avail = cable_data[icab].unread_len();
                        if avail == 0 {
                            continue;
                        }
                        let nb = avail.min(GBT_DATA_BYTES);
                        let word_start = link.data.len();
                        link.data.push_slice(&cable_data[icab].unread()[..nb]);
                        link.data.push_fill(0, word - nb);
                        link.data.as_mut_slice()[word_start + 9] = cable_flags[icab];
                        cable_data[icab].advance(nb);
                        words_needed -= 1;
                        words_in_packet += 1;
                        if words_in_packet == max_words_per_packet {
                            break;
                        }
                    }

                    if words_needed > 0 && words_in_packet >= max_words_per_packet {
                        // page full: close it with an empty trailer, open the next
                        let trailer = GbtDataTrailer::default();
                        link.data.push_slice(&trailer.to_word()[..word]);
                        rdh.rdh4.page_cnt += 1;
                        set_page_geometry(&mut rdh, words_needed, word, impose_max_page);
                        link.data.reserve(MAX_GBT_PACKET_BYTES);
                        page_rdh_at = link.data.len();
                        link.data.push_slice(&rdh.to_bytes());
                        link.n_triggers += 1;
                        gbt_header.packet_idx = rdh.page_cnt();
                        link.data.push_slice(&gbt_header.to_word()[..word]);
                        words_in_packet = 0;
                    }
                }

                let mut trailer = GbtDataTrailer {
                    lanes_stop: lanes_active,
                    ..Default::default()
                };
                trailer.set_state(PacketState::PacketDone);
                link.data.push_slice(&trailer.to_word()[..word]);

                // the closing page of the trigger carries the stop bit
                rdh.rdh4.stop = 1;
                rdh.write_to(
                    &mut link.data.as_mut_slice()[page_rdh_at..page_rdh_at + RDH_SIZE_BYTES],
                );

                min_pages = min_pages.min(link.n_triggers);
            }
        }

        let ru = &mut self.ru_decode[ru_idx];
        ru.clear_trigger();
        ru.n_chips_fired = 0;
        Ok(if min_pages == u32::MAX { 0 } else { min_pages })
    }

    /// Copies up to `max_pages` complete pages of every link into `sink`,
    /// zero-padding each page to [MAX_GBT_PACKET_BYTES] when fixed pages are
    /// imposed. Returns the total number of pages flushed.
    pub fn flush_superpages(&mut self, max_pages: usize, sink: &mut PayloadBuffer) -> usize {
        let mut total = 0;
        for ru in self.ru_decode.iter_mut() {
            for link in ru.links.iter_mut().flatten() {
                if link.data.is_drained() {
                    continue;
                }
                sink.reserve(MAX_GBT_PACKET_BYTES * max_pages.min(link.n_triggers as usize));
                let mut pages = 0;
                while pages < max_pages && !link.data.is_drained() {
                    let Ok(rdh) = Rdh::from_buf(link.data.unread()) else {
                        break;
                    };
                    let mem = rdh.memory_size() as usize;
                    sink.push_slice(&link.data.unread()[..mem]);
                    if self.impose_max_page {
                        sink.push_fill(0, MAX_GBT_PACKET_BYTES - mem);
                    }
                    link.data.advance(mem);
                    link.n_triggers = link.n_triggers.saturating_sub(1); // pages, not triggers
                    pages += 1;
                }
                total += pages;
                link.data.compact();
            }
        }
        total
    }

    // ================================ decoding ================================

    /// Opens a raw data file for decoding.
    pub fn open_input<P: AsRef<Path>>(&mut self, path: P) -> CodecResult<()> {
        log::info!("opening raw data input {}", path.as_ref().display());
        self.io = Some(BufReader::new(File::open(path)?));
        self.raw_buffer.clear();
        self.raw_buffer.reserve(RAW_BUFFER_SIZE);
        Ok(())
    }

    /// Decodes from an in-memory byte stream instead of a file.
    pub fn set_raw_input(&mut self, bytes: &[u8]) {
        self.io = None;
        self.raw_buffer.clear();
        self.raw_buffer.push_slice(bytes);
    }

    /// Refills the raw buffer when the unread backlog drops below the
    /// margin. Returns the number of bytes read.
    fn load_input(&mut self) -> CodecResult<usize> {
        let Some(reader) = self.io.as_mut() else {
            return Ok(0);
        };
        if self.raw_buffer.unread_len() > RAW_BUFFER_MARGIN {
            return Ok(0);
        }
        self.raw_buffer.compact();
        let want = RAW_BUFFER_SIZE - self.raw_buffer.unread_len();
        let got = self.raw_buffer.refill_from(reader, want)?;
        Ok(got)
    }

    /// Skips one padded GBT word at a time until a plausible RDH is found.
    /// Returns false if the input drained first.
    fn find_next_rdh(&mut self) -> CodecResult<bool> {
        let mut skipped = 0usize;
        let found = loop {
            self.raw_buffer.advance(GBT_PADDED_WORD_LEN);
            skipped += 1;
            if self.raw_buffer.unread_len() < RDH_SIZE_BYTES {
                let _ = self.load_input()?;
            }
            if self.raw_buffer.unread_len() < RDH_SIZE_BYTES {
                break false;
            }
            let rdh = Rdh::from_buf(self.raw_buffer.unread())?;
            if rdh.is_plausible() {
                break true;
            }
        };
        log::info!(
            "pointer recovery skipped {skipped} GBT words, RDH {}",
            if found { "found" } else { "not found" }
        );
        Ok(found)
    }

    /// Distributes pages from the raw buffer among the link caches until
    /// every known link holds at least the wanted number of triggers or the
    /// input drains. Returns the number of bytes read from the input.
    pub fn cache_links_data(&mut self) -> CodecResult<usize> {
        log::debug!(
            "caching links data, currently cached: {} triggers",
            self.min_triggers_cached
        );
        let mut n_read = self.load_input()?;
        let mut links_enough: HashSet<(usize, usize)> = HashSet::new();

        while !self.raw_buffer.is_drained() {
            if self.raw_buffer.unread_len() < RDH_SIZE_BYTES {
                if self.load_input()? == 0 {
                    break; // partial tail, drop it
                }
                continue;
            }
            let rdh = Rdh::from_buf(self.raw_buffer.unread())?;
            if !rdh.is_plausible() {
                self.stats.n_rdh_recoveries += 1;
                if !self.find_next_rdh()? {
                    break;
                }
                continue;
            }

            let ru_sw = self.mapping.fee_id_to_ru_sw(rdh.fee_id())?;
            let ru_idx = self.get_create_ru_decode(ru_sw)?;
            let link_id = (rdh.link_id() as usize).min(MAX_LINKS_PER_RU - 1);

            let mem = (rdh.memory_size() as usize).clamp(RDH_SIZE_BYTES, MAX_GBT_PACKET_BYTES);
            if self.raw_buffer.unread_len() < mem {
                let _ = self.load_input()?;
                if self.raw_buffer.unread_len() < mem {
                    break; // truncated final page
                }
            }

            let ru = &mut self.ru_decode[ru_idx];
            let mut new_trigger = true;
            if let Some(link) = ru.links[link_id].as_deref() {
                if link.last_page_size > 0 && link.data.len() >= link.last_page_size {
                    let tail = link.data.len() - link.last_page_size;
                    let prev = Rdh::from_buf(&link.data.as_slice()[tail..])?;
                    if rdh.continues(&prev) {
                        new_trigger = false;
                    }
                }
            } else {
                ru.links[link_id] = Some(Box::default());
                self.n_links += 1;
            }
            let link = ru.links[link_id].as_deref_mut().expect("link just created");

            // cache the used part of the page; the zero tail of fixed-size
            // pages is dropped, so the stored offset must point to the next
            // stored page
            link.data.push_slice(&self.raw_buffer.unread()[..mem]);
            link.last_page_size = mem;
            let stored_at = link.data.len() - mem;
            LittleEndian::write_u16(
                &mut link.data.as_mut_slice()[stored_at + 8..stored_at + 10],
                mem as u16,
            );

            if new_trigger {
                link.n_triggers += 1;
                if link.n_triggers >= self.min_triggers_to_cache {
                    let _ = links_enough.insert((ru_idx, link_id));
                }
            }

            self.stats.n_bytes_processed += mem as u64;
            self.stats.n_pages_processed += 1;

            let offset = rdh.offset_to_next() as usize;
            self.raw_buffer.advance(if offset == 0 { mem } else { offset });
            if self.raw_buffer.unread_len() < MAX_GBT_PACKET_BYTES {
                n_read += self.load_input()?;
            }

            if self.n_links > 0 && links_enough.len() == self.n_links {
                break;
            }
        }

        if self.n_links > 0 && links_enough.len() == self.n_links {
            self.min_triggers_cached = self.min_triggers_to_cache;
        } else {
            let mut min_cached = u32::MAX;
            for ru in &self.ru_decode {
                for link in ru.links.iter().flatten() {
                    min_cached = min_cached.min(link.n_triggers);
                }
            }
            self.min_triggers_cached = if min_cached == u32::MAX { 0 } else { min_cached };
        }
        log::debug!(
            "cached at least {} triggers on {} links of {} RUs",
            self.min_triggers_cached,
            self.n_links,
            self.ru_decode.len()
        );
        Ok(n_read)
    }

    /// Pops one trigger from every link cache and decodes it into per-chip
    /// data. Returns the number of links decoded, 0 when nothing is cached.
    pub fn decode_next_trigger(&mut self) -> CodecResult<usize> {
        if self.min_triggers_cached < 1 {
            return Ok(0);
        }
        // the trigger identity comes from the first pending RDH, scanning
        // RUs in software-id order
        'ir: for ru_sw in 0..self.mapping.n_rus() {
            let Some(idx) = self.ru_entry[ru_sw as usize] else {
                continue;
            };
            for link in self.ru_decode[idx].links.iter().flatten() {
                if !link.data.is_drained() {
                    let rdh = Rdh::from_buf(link.data.unread())?;
                    self.interaction_record =
                        InteractionRecord::new(rdh.rdh2.trigger_orbit, rdh.rdh3.trigger_bc());
                    self.interaction_record_hb =
                        InteractionRecord::new(rdh.rdh2.heartbeat_orbit, rdh.rdh3.heartbeat_bc());
                    self.trigger = rdh.trigger_type();
                    break 'ir;
                }
            }
        }

        let mut n_links_decoded = 0;
        for ru_sw in 0..self.mapping.n_rus() {
            let Some(idx) = self.ru_entry[ru_sw as usize] else {
                continue;
            };
            n_links_decoded += self.decode_ru_data(idx)?;
            self.stats.n_rus_processed += 1;
        }
        self.cur_ru_sw = Some(0);
        self.min_triggers_cached -= 1;
        Ok(n_links_decoded)
    }

    /// Decodes one trigger of a single RU: pops one trigger's pages from
    /// each link, then decodes the assembled cable streams.
    fn decode_ru_data(&mut self, ru_idx: usize) -> CodecResult<usize> {
        let mut links_done = 0;
        {
            let ru = &mut self.ru_decode[ru_idx];
            ru.clear_trigger();
            ru.n_cables = ru.ru_info.n_cables as usize;
            let RuDecodeData {
                links,
                cable_data,
                cable_hw_id,
                stats: ru_stats,
                ru_info,
                ..
            } = ru;
            for link_opt in links.iter_mut() {
                let Some(link) = link_opt.as_deref_mut() else {
                    continue;
                };
                if link.data.is_drained() {
                    continue;
                }
                let _aborted = decode_link_pages(
                    link,
                    cable_data,
                    cable_hw_id,
                    ru_stats,
                    ru_info,
                    &self.mapping,
                    self.gbt_word_size,
                    self.verbosity,
                );
                link.n_triggers = link.n_triggers.saturating_sub(1);
                links_done += 1;
                if link.data.is_drained() {
                    link.data.clear();
                    link.last_page_size = 0;
                }
            }
        }
        if self.ru_decode[ru_idx].n_cables > 0 {
            self.decode_alpide_data(ru_idx)?;
        }
        Ok(links_done)
    }

    /// Decodes the assembled ALPIDE cable streams of one RU trigger.
    fn decode_alpide_data(&mut self, ru_idx: usize) -> CodecResult<()> {
        let ir = self.interaction_record;
        let trigger_mask = self.trigger;
        let ru = &mut self.ru_decode[ru_idx];
        ru.n_chips_fired = 0;
        ru.last_chip_checked = 0;
        let RuDecodeData {
            cable_data,
            cable_hw_id,
            chips_data,
            stats: ru_stats,
            ru_info,
            n_cables,
            n_chips_fired,
            ..
        } = ru;

        for icab in 0..*n_cables {
            match cable_data[icab].peek_byte() {
                None => continue,
                Some(head) if !alpide::is_chip_header_or_empty(head) => {
                    log::error!(
                        "FEE {:#06x} cable {icab}: data does not start with chip header or chip empty",
                        ru_info.id_hw
                    );
                    ru_stats.count(DecodingError::CableDataHeadWrong);
                    continue; // this cable cannot be trusted, skip it
                }
                Some(_) => {}
            }

            while *n_chips_fired < MAX_CHIPS_PER_RU {
                let res = alpide::decode_chip(&mut chips_data[*n_chips_fired], &mut cable_data[icab]);
                if res == 0 {
                    break;
                }
                if res < 0 {
                    // the malformed record was consumed and logged, keep scanning
                    continue;
                }
                let chip = &mut chips_data[*n_chips_fired];
                let mut chip_on_module = chip.chip_id as u8;
                if ru_info.ru_type == 0 && chip_on_module as usize != icab {
                    log::error!(
                        "FEE {:#06x} IB cable {icab} shipped chip id {chip_on_module}",
                        ru_info.id_hw
                    );
                    ru_stats.count(DecodingError::IbChipLaneMismatch);
                    chip_on_module = icab as u8; // trust the lane, not the tag
                }
                match self
                    .mapping
                    .global_chip_id(chip_on_module, cable_hw_id[icab], ru_info)
                {
                    Ok(global_id) => {
                        chip.chip_id = global_id;
                        chip.ir = ir;
                        chip.trigger = trigger_mask;
                        self.stats.n_non_empty_chips += 1;
                        self.stats.n_hits_decoded += chip.hits.len() as u64;
                        *n_chips_fired += 1;
                    }
                    Err(e) => {
                        // a chip id the cabling cannot host; drop the chip
                        log::error!("dropping chip with unmappable id: {e}");
                        chip.clear();
                    }
                }
            }
        }
        Ok(())
    }

    /// Yields the next non-empty chip across all RUs of the current trigger,
    /// caching and decoding more triggers as needed. Returns false when the
    /// input is fully drained.
    pub fn next_chip_data(&mut self, out: &mut ChipPixelData) -> CodecResult<bool> {
        loop {
            if let Some(start_ru) = self.cur_ru_sw {
                for ru_sw in start_ru..self.mapping.n_rus() {
                    self.cur_ru_sw = Some(ru_sw);
                    let Some(idx) = self.ru_entry[ru_sw as usize] else {
                        continue;
                    };
                    let ru = &mut self.ru_decode[idx];
                    if ru.last_chip_checked < ru.n_chips_fired {
                        out.swap(&mut ru.chips_data[ru.last_chip_checked]);
                        ru.last_chip_checked += 1;
                        return Ok(true);
                    }
                }
            }
            // the current trigger is exhausted; the last cached trigger might
            // be incomplete, so top the cache up before decoding the next one
            if self.min_triggers_cached < 2 {
                let _ = self.cache_links_data()?;
            }
            if self.min_triggers_cached < 1 || self.decode_next_trigger()? == 0 {
                self.cur_ru_sw = None;
                return Ok(false);
            }
        }
    }

    // ================================ skimming ================================

    /// Skims the next RU trigger from the raw input into `out`: the same
    /// logical content, but compact 80-bit GBT words and page sizes shrunk
    /// to the real payload. Returns false when the input is drained.
    pub fn skim_next_ru_data(&mut self, out: &mut PayloadBuffer) -> CodecResult<bool> {
        if self.io.is_some() {
            let _ = self.load_input()?;
        }
        if self.raw_buffer.unread_len() < RDH_SIZE_BYTES {
            self.raw_buffer.clear();
            return Ok(false);
        }
        let aborted = self.skim_padded_ru_data(out)?;
        if aborted {
            // resync is only possible on padded word boundaries
            if !self.find_next_rdh()? {
                self.raw_buffer.clear();
                return Ok(false);
            }
        } else if self.raw_buffer.is_drained() {
            self.raw_buffer.clear();
        }
        Ok(true)
    }

    /// Skims the consecutive pages of one RU trigger, rewriting page
    /// geometry for compact words. Returns true if a page was aborted and
    /// the output rewound.
    fn skim_padded_ru_data(&mut self, out: &mut PayloadBuffer) -> CodecResult<bool> {
        let in_word = self.gbt_word_size;
        let out_word = GBT_WORD_LEN;

        let mut rdh = Rdh::from_buf(self.raw_buffer.unread())?;
        if !rdh.is_plausible() {
            log::error!("page does not start with RDH");
            self.stats.n_rdh_recoveries += 1;
            return Ok(true);
        }

        let ru_sw = self.mapping.fee_id_to_ru_sw(rdh.fee_id())?;
        let ru_idx = self.get_create_ru_decode(ru_sw)?;
        let ru_info = self.ru_decode[ru_idx].ru_info;

        self.interaction_record =
            InteractionRecord::new(rdh.rdh2.trigger_orbit, rdh.rdh3.trigger_bc());
        self.interaction_record_hb =
            InteractionRecord::new(rdh.rdh2.heartbeat_orbit, rdh.rdh3.heartbeat_bc());
        self.trigger = rdh.trigger_type();

        self.ru_decode[ru_idx].stats.n_packets += 1;
        self.stats.n_rus_processed += 1;

        let out_start = out.len();

        loop {
            self.stats.n_pages_processed += 1;
            self.stats.n_bytes_processed += rdh.memory_size() as u64;

            let page_start = self.raw_buffer.read_pos();
            let mem = (rdh.memory_size() as usize).clamp(RDH_SIZE_BYTES, MAX_GBT_PACKET_BYTES);
            if self.verbosity > 0 {
                log::debug!("skimming page {rdh}");
            }
            if self.raw_buffer.unread_len() < mem {
                let _ = self.load_input()?;
                if self.raw_buffer.unread_len() < mem {
                    out.truncate(out_start);
                    return Ok(true); // truncated page
                }
            }
            self.raw_buffer.advance(RDH_SIZE_BYTES);

            let n_words = ((mem - RDH_SIZE_BYTES) / in_word).saturating_sub(2);

            if self.raw_buffer.unread_len() < in_word {
                self.ru_decode[ru_idx]
                    .stats
                    .count(DecodingError::MissingGbtHeader);
                out.truncate(out_start);
                return Ok(true);
            }
            let header_word = &self.raw_buffer.unread()[..in_word];
            if !gbt::is_data_header(header_word) {
                log::error!(
                    "FEE {:#06x}: GBT payload header was expected, abort page",
                    rdh.fee_id()
                );
                self.ru_decode[ru_idx]
                    .stats
                    .count(DecodingError::MissingGbtHeader);
                out.truncate(out_start);
                return Ok(true);
            }
            let gbt_header = GbtDataHeader::from_word(header_word);
            {
                let ru_stats = &mut self.ru_decode[ru_idx].stats;
                if gbt_header.packet_idx != rdh.page_cnt() {
                    log::error!(
                        "FEE {:#06x}: GBT header counter {} differs from RDH page counter {}",
                        rdh.fee_id(),
                        gbt_header.packet_idx,
                        rdh.page_cnt()
                    );
                    ru_stats.count(DecodingError::RdhVsGbtHeaderPageCnt);
                }
                if ru_stats.lanes_active == ru_stats.lanes_stop && rdh.page_cnt() != 0 {
                    log::error!(
                        "FEE {:#06x}: non-zero page counter ({}) while all lanes were stopped",
                        rdh.fee_id(),
                        rdh.page_cnt()
                    );
                    ru_stats.count(DecodingError::NonZeroPageAfterStop);
                }
                ru_stats.lanes_active = gbt_header.active_lanes;
                if rdh.page_cnt() == 0 {
                    ru_stats.lanes_stop = 0;
                    ru_stats.lanes_with_data = 0;
                }
            }

            // write the skimmed page: RDH copy (geometry patched below),
            // then the GBT words without their padding
            let out_rdh_at = out.len();
            out.reserve(MAX_GBT_PACKET_BYTES);
            out.push_slice(&rdh.to_bytes());
            {
                let header_word = &self.raw_buffer.unread()[..in_word];
                out.push_slice(&header_word[..out_word]);
            }
            self.raw_buffer.advance(in_word);

            let mut words_seen = 0usize;
            for iw in 0..n_words {
                let data_word = &self.raw_buffer.unread()[..in_word];
                if gbt::is_data_trailer(data_word) {
                    // the word count from the page geometry overestimated
                    words_seen = iw;
                    break;
                }
                words_seen = iw + 1;
                if self.verbosity > 1 {
                    log::trace!("data word {:02x?}", &data_word[..GBT_WORD_LEN]);
                }
                let cable_hw = gbt::cable_id(data_word);
                let cable_sw = self.mapping.cable_hw_to_sw(ru_info.ru_type, cable_hw);
                out.push_slice(&data_word[..out_word]);
                if let Ok(cable_sw) = cable_sw {
                    let ru_stats = &mut self.ru_decode[ru_idx].stats;
                    ru_stats.lanes_with_data |= 1 << cable_sw;
                    if ru_stats.lanes_stop & (1 << cable_sw) != 0 {
                        log::error!(
                            "FEE {:#06x}: data received for stopped lane {cable_hw} (sw {cable_sw})",
                            rdh.fee_id()
                        );
                        ru_stats.count(DecodingError::DataForStoppedLane);
                    }
                }
                self.raw_buffer.advance(in_word);
            }

            let trailer_word = &self.raw_buffer.unread()[..in_word];
            if !gbt::is_data_trailer(trailer_word) {
                log::error!(
                    "FEE {:#06x}: GBT payload trailer was expected, abort page",
                    rdh.fee_id()
                );
                self.ru_decode[ru_idx]
                    .stats
                    .count(DecodingError::MissingGbtTrailer);
                out.truncate(out_start);
                return Ok(true);
            }
            let gbt_trailer = GbtDataTrailer::from_word(trailer_word);
            {
                let ru_stats = &mut self.ru_decode[ru_idx].stats;
                ru_stats.lanes_timeout |= gbt_trailer.lanes_timeout;
                ru_stats.lanes_stop |= gbt_trailer.lanes_stop;
            }
            out.push_slice(&trailer_word[..out_word]);
            self.raw_buffer.advance(in_word);

            // shrink the stored page geometry to the compact payload
            let skimmed_mem = (RDH_SIZE_BYTES + (2 + words_seen) * out_word) as u16;
            LittleEndian::write_u16(
                &mut out.as_mut_slice()[out_rdh_at + 8..out_rdh_at + 10],
                skimmed_mem,
            );
            LittleEndian::write_u16(
                &mut out.as_mut_slice()[out_rdh_at + 10..out_rdh_at + 12],
                skimmed_mem,
            );

            // jump to the next page of the input
            let offset = rdh.offset_to_next() as usize;
            let step = if offset == 0 { mem } else { offset };
            let target = (page_start + step).min(self.raw_buffer.len());
            self.raw_buffer.set_read_pos(target);
            if offset == 0 {
                break;
            }

            if self.raw_buffer.unread_len() < RDH_SIZE_BYTES {
                let _ = self.load_input()?;
            }
            let trigger_over = if self.raw_buffer.unread_len() < RDH_SIZE_BYTES {
                true
            } else {
                let next = Rdh::from_buf(self.raw_buffer.unread())?;
                if next.continues(&rdh) {
                    if next.page_cnt() != rdh.page_cnt() + 1 {
                        log::error!(
                            "FEE {:#06x}: page counter discontinuity, old {} new {}",
                            rdh.fee_id(),
                            rdh.page_cnt(),
                            next.page_cnt()
                        );
                        self.ru_decode[ru_idx]
                            .stats
                            .count(DecodingError::PageCounterDiscontinuity);
                    }
                    rdh = next;
                    false
                } else {
                    true
                }
            };

            if trigger_over {
                end_of_trigger_checks(
                    &mut self.ru_decode[ru_idx].stats,
                    rdh.fee_id(),
                    rdh.trigger_type(),
                    &gbt_trailer,
                );
                break;
            }
        }

        Ok(false)
    }
}

/// Sets `memory_size` and `offset_to_next` for a page that still owes
/// `words_needed` payload words.
fn set_page_geometry(rdh: &mut Rdh, words_needed: usize, word: usize, impose_max_page: bool) {
    let mut mem = RDH_SIZE_BYTES + (words_needed + 2) * word;
    if mem > MAX_GBT_PACKET_BYTES {
        mem = MAX_GBT_PACKET_BYTES;
    }
    rdh.rdh1.memory_size = mem as u16;
    rdh.rdh1.offset_to_next = if impose_max_page {
        MAX_GBT_PACKET_BYTES as u16
    } else {
        mem as u16
    };
}

/// End-of-trigger invariants: all active lanes stopped and all active lanes
/// not in timeout delivered data, both waived for SOT triggers; the trailer
/// state histogram is fed either way.
fn end_of_trigger_checks(
    ru_stats: &mut RuDecodingStats,
    fee_id: u16,
    trigger_type: u32,
    trailer: &GbtDataTrailer,
) {
    if trigger_type & trigger::SOT == 0 {
        if ru_stats.lanes_active != ru_stats.lanes_stop {
            log::error!("FEE {fee_id:#06x}: end of FEE data but not all lanes received stop");
            ru_stats.count(DecodingError::UnstoppedLanes);
        }
        if ru_stats.lanes_active & !ru_stats.lanes_timeout & !ru_stats.lanes_with_data != 0 {
            log::error!("FEE {fee_id:#06x}: lanes not in time-out but without data");
            ru_stats.count(DecodingError::NoDataForActiveLane);
        }
    }
    ru_stats.packet_states[trailer.state_combination()] += 1;
}

/// Pops the pages of one trigger from a link cache into the per-cable
/// buffers, running every per-page format check. Returns true if the page
/// structure forced an abort.
#[allow(clippy::too_many_arguments)]
fn decode_link_pages<M: ChipMapping>(
    link: &mut RuLink,
    cable_data: &mut [PayloadBuffer],
    cable_hw_id: &mut [u8; MAX_CABLES_PER_RU],
    ru_stats: &mut RuDecodingStats,
    ru_info: &RuInfo,
    mapping: &M,
    word: usize,
    verbosity: u8,
) -> bool {
    ru_stats.n_packets += 1;
    let buf_len = link.data.len();

    let mut rdh = match Rdh::from_buf(link.data.unread()) {
        Ok(rdh) if rdh.is_plausible() => rdh,
        _ => {
            log::error!("cached page does not start with RDH");
            link.data.advance(word);
            return true;
        }
    };

    loop {
        let page_start = link.data.read_pos();
        let mem = (rdh.memory_size() as usize).clamp(RDH_SIZE_BYTES, MAX_GBT_PACKET_BYTES);
        if verbosity > 0 {
            log::debug!("decoding page {rdh}");
        }
        link.data.advance(RDH_SIZE_BYTES);

        let n_words = ((mem - RDH_SIZE_BYTES) / word).saturating_sub(2);

        if link.data.unread_len() < word {
            ru_stats.count(DecodingError::MissingGbtHeader);
            return true;
        }
        let header_word = &link.data.unread()[..word];
        if !gbt::is_data_header(header_word) {
            log::error!(
                "FEE {:#06x}: GBT payload header was expected, abort page",
                rdh.fee_id()
            );
            ru_stats.count(DecodingError::MissingGbtHeader);
            return true;
        }
        let gbt_header = GbtDataHeader::from_word(header_word);
        if gbt_header.packet_idx != rdh.page_cnt() {
            log::error!(
                "FEE {:#06x}: GBT header counter {} differs from RDH page counter {}",
                rdh.fee_id(),
                gbt_header.packet_idx,
                rdh.page_cnt()
            );
            ru_stats.count(DecodingError::RdhVsGbtHeaderPageCnt);
        }
        if ru_stats.lanes_active == ru_stats.lanes_stop && rdh.page_cnt() != 0 {
            log::error!(
                "FEE {:#06x}: non-zero page counter ({}) while all lanes were stopped",
                rdh.fee_id(),
                rdh.page_cnt()
            );
            ru_stats.count(DecodingError::NonZeroPageAfterStop);
        }
        ru_stats.lanes_active = gbt_header.active_lanes;
        if rdh.page_cnt() == 0 {
            ru_stats.lanes_stop = 0;
            ru_stats.lanes_with_data = 0;
        }
        link.data.advance(word);

        // payload words until the trailer; the count derived from the page
        // geometry is an upper bound, a trailer word ends the payload early
        for _ in 0..n_words {
            if link.data.unread_len() < word {
                ru_stats.count(DecodingError::MissingGbtTrailer);
                return true;
            }
            let data_word = &link.data.unread()[..word];
            if gbt::is_data_trailer(data_word) {
                break;
            }
            if verbosity > 1 {
                log::trace!("data word {:02x?}", &data_word[..GBT_WORD_LEN]);
            }
            let cable_hw = gbt::cable_id(data_word);
            let payload: [u8; GBT_DATA_BYTES] = data_word[..GBT_DATA_BYTES]
                .try_into()
                .expect("data word is at least 9 bytes");
            match mapping.cable_hw_to_sw(ru_info.ru_type, cable_hw) {
                Ok(cable_sw) => {
                    cable_data[cable_sw as usize].push_slice(&payload);
                    cable_hw_id[cable_sw as usize] = cable_hw;
                    ru_stats.lanes_with_data |= 1 << cable_sw;
                    if ru_stats.lanes_stop & (1 << cable_sw) != 0 {
                        log::error!(
                            "FEE {:#06x}: data received for stopped lane {cable_hw} (sw {cable_sw})",
                            rdh.fee_id()
                        );
                        ru_stats.count(DecodingError::DataForStoppedLane);
                    }
                }
                Err(e) => log::error!("skipping data word with unmapped cable: {e}"),
            }
            link.data.advance(word);
        }

        if link.data.unread_len() < word {
            ru_stats.count(DecodingError::MissingGbtTrailer);
            return true;
        }
        let trailer_word = &link.data.unread()[..word];
        if !gbt::is_data_trailer(trailer_word) {
            log::error!(
                "FEE {:#06x}: GBT payload trailer was expected, abort page",
                rdh.fee_id()
            );
            ru_stats.count(DecodingError::MissingGbtTrailer);
            return true;
        }
        let gbt_trailer = GbtDataTrailer::from_word(trailer_word);
        ru_stats.lanes_timeout |= gbt_trailer.lanes_timeout;
        ru_stats.lanes_stop |= gbt_trailer.lanes_stop;
        link.data.advance(word);

        // cached pages store their real size in offsetToNext
        link.data.set_read_pos((page_start + mem).min(buf_len));

        let trigger_over = if rdh.stop() != 0 || buf_len - link.data.read_pos() < RDH_SIZE_BYTES {
            true
        } else {
            match Rdh::from_buf(link.data.unread()) {
                Ok(next) if next.continues(&rdh) => {
                    if next.page_cnt() != rdh.page_cnt() + 1 {
                        log::error!(
                            "FEE {:#06x}: page counter discontinuity, old {} new {}",
                            rdh.fee_id(),
                            rdh.page_cnt(),
                            next.page_cnt()
                        );
                        ru_stats.count(DecodingError::PageCounterDiscontinuity);
                    }
                    rdh = next;
                    false
                }
                _ => true,
            }
        };

        if trigger_over {
            end_of_trigger_checks(ru_stats, rdh.fee_id(), rdh.trigger_type(), &gbt_trailer);
            return false;
        }
    }
}
