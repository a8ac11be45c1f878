//! Decoding statistics: per-RU format-check counters and the global tallies.

use ru_protocol::gbt::MAX_STATE_COMBINATIONS;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// Format-check violations counted per RU while unpacking pages, see the
/// decode checks in [codec](crate::codec).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecodingError {
    /// RDH page counters for the same RU/trigger are not continuous.
    PageCounterDiscontinuity = 0,
    /// RDH and GBT header page counters are not consistent.
    RdhVsGbtHeaderPageCnt,
    /// GBT payload header was expected but not found.
    MissingGbtHeader,
    /// GBT payload trailer was expected but not found.
    MissingGbtTrailer,
    /// All lanes were stopped but the page counter is not 0.
    NonZeroPageAfterStop,
    /// End of FEE data reached while not all lanes received stop.
    UnstoppedLanes,
    /// Data was received for a stopped lane.
    DataForStoppedLane,
    /// No data was seen for a lane that was not in timeout.
    NoDataForActiveLane,
    /// Chip id on module differs from the lane id on an inner-barrel stave.
    IbChipLaneMismatch,
    /// Cable data does not start with a chip header or an empty chip.
    CableDataHeadWrong,
}

/// Number of defined [DecodingError] kinds.
pub const N_DECODING_ERRORS: usize = 10;

impl DecodingError {
    /// All defined kinds, in counter order.
    pub const ALL: [DecodingError; N_DECODING_ERRORS] = [
        DecodingError::PageCounterDiscontinuity,
        DecodingError::RdhVsGbtHeaderPageCnt,
        DecodingError::MissingGbtHeader,
        DecodingError::MissingGbtTrailer,
        DecodingError::NonZeroPageAfterStop,
        DecodingError::UnstoppedLanes,
        DecodingError::DataForStoppedLane,
        DecodingError::NoDataForActiveLane,
        DecodingError::IbChipLaneMismatch,
        DecodingError::CableDataHeadWrong,
    ];

    /// Human-readable description of the violation.
    pub fn description(self) -> &'static str {
        match self {
            DecodingError::PageCounterDiscontinuity => {
                "RDH page counters for the same RU/trigger are not continuous"
            }
            DecodingError::RdhVsGbtHeaderPageCnt => {
                "RDH and GBT header page counters are not consistent"
            }
            DecodingError::MissingGbtHeader => "GBT payload header was expected but not found",
            DecodingError::MissingGbtTrailer => "GBT payload trailer was expected but not found",
            DecodingError::NonZeroPageAfterStop => {
                "All lanes were stopped but the page counter is not 0"
            }
            DecodingError::UnstoppedLanes => {
                "End of FEE data reached while not all lanes received stop"
            }
            DecodingError::DataForStoppedLane => "Data was received for stopped lane",
            DecodingError::NoDataForActiveLane => {
                "No data was seen for lane (which was not in timeout)"
            }
            DecodingError::IbChipLaneMismatch => {
                "Chip ID on module was different from the lane ID on the IB stave"
            }
            DecodingError::CableDataHeadWrong => {
                "Cable data does not start with ChipHeader or ChipEmpty"
            }
        }
    }
}

impl Display for DecodingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Per-RU decoding statistics: lane bookkeeping of the trigger in flight,
/// error counters and the packet-state histogram. Persists for the lifetime
/// of the codec instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuDecodingStats {
    /// Lanes declared by the payload header.
    pub lanes_active: u32,
    /// Lanes that delivered a stop in the payload trailer.
    pub lanes_stop: u32,
    /// Lanes that reported a timeout.
    pub lanes_timeout: u32,
    /// Lanes that actually transmitted data.
    pub lanes_with_data: u32,
    /// Total GBT packets seen for this RU.
    pub n_packets: u32,
    /// Counters indexed by [DecodingError] discriminant.
    pub error_counts: [u32; N_DECODING_ERRORS],
    /// Histogram over trailer packet-state combinations.
    pub packet_states: [u32; MAX_STATE_COMBINATIONS],
}

impl Default for RuDecodingStats {
    fn default() -> Self {
        Self {
            lanes_active: 0,
            lanes_stop: 0,
            lanes_timeout: 0,
            lanes_with_data: 0,
            n_packets: 0,
            error_counts: [0; N_DECODING_ERRORS],
            packet_states: [0; MAX_STATE_COMBINATIONS],
        }
    }
}

impl RuDecodingStats {
    /// Counts one violation.
    #[inline]
    pub fn count(&mut self, err: DecodingError) {
        self.error_counts[err as usize] += 1;
    }

    /// Number of violations of one kind counted so far.
    #[inline]
    pub fn count_of(&self, err: DecodingError) -> u32 {
        self.error_counts[err as usize]
    }

    /// Sum over all error counters.
    pub fn n_errors(&self) -> u64 {
        self.error_counts.iter().map(|&c| c as u64).sum()
    }

    /// Resets every counter and mask.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

impl Display for RuDecodingStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Decoding errors: {}", self.n_errors())?;
        for err in DecodingError::ALL {
            let count = self.count_of(err);
            if count > 0 {
                writeln!(f, "{:<70}: {}", err.description(), count)?;
            }
        }
        writeln!(f, "Packet states (total packets: {})", self.n_packets)?;
        for (state, &count) in self.packet_states.iter().enumerate() {
            if count > 0 {
                writeln!(f, "counts for state B[{state:04b}] : {count}")?;
            }
        }
        Ok(())
    }
}

/// Global decoding statistics of one codec instance.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDecodingStats {
    /// Total pages processed.
    pub n_pages_processed: u64,
    /// Total RU triggers processed (one RU trigger may span several pages).
    pub n_rus_processed: u64,
    /// Total bytes (`memorySize` sums) processed.
    pub n_bytes_processed: u64,
    /// Non-empty chips decoded.
    pub n_non_empty_chips: u64,
    /// Pixel hits decoded.
    pub n_hits_decoded: u64,
    /// RDH heuristic failures that forced a resync scan.
    pub n_rdh_recoveries: u64,
}

impl RawDecodingStats {
    /// Resets every counter.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

impl Display for RawDecodingStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} bytes for {} RUs processed in {} pages ({} resyncs)",
            self.n_bytes_processed, self.n_rus_processed, self.n_pages_processed, self.n_rdh_recoveries
        )?;
        writeln!(
            f,
            "{} hits found in {} non-empty chips",
            self.n_hits_decoded, self.n_non_empty_chips
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn counters_index_by_kind() {
        let mut stats = RuDecodingStats::default();
        stats.count(DecodingError::MissingGbtTrailer);
        stats.count(DecodingError::MissingGbtTrailer);
        stats.count(DecodingError::CableDataHeadWrong);
        assert_eq!(stats.count_of(DecodingError::MissingGbtTrailer), 2);
        assert_eq!(stats.count_of(DecodingError::CableDataHeadWrong), 1);
        assert_eq!(stats.n_errors(), 3);
        stats.clear();
        assert_eq!(stats.n_errors(), 0);
    }

    #[test]
    fn every_error_has_a_description() {
        for err in DecodingError::ALL {
            assert!(!err.description().is_empty());
        }
    }
}
