// src/hal/protocol.rs
//! Two-byte sample framing protocol
//!
//! Each sample travels as a frame byte (high bit set) carrying the upper 7 bits
//! of a 14-bit unsigned value, followed by a data byte (high bit clear)
//! carrying the lower 7 bits. The decoded value is re-centered around zero by
//! subtracting [`BIAS_OFFSET`].
//!
//! The stream has no framing boundary aligned to read calls, so the decoder
//! carries an incomplete frame over to the next [`ProtocolDecoder::feed`].
//! Malformed input is never an error: stray data bytes are skipped one at a
//! time and a frame byte followed by another frame byte drops both.

use crate::config::constants::protocol::*;
use tracing::trace;

/// Running decoder counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderStats {
    pub samples_decoded: u64,
    /// Data bytes found where a frame byte was expected
    pub bytes_discarded: u64,
    /// Frame bytes followed by another frame byte (both dropped)
    pub frames_rejected: u64,
}

/// Incremental decoder with partial-frame carryover
#[derive(Debug, Default)]
pub struct ProtocolDecoder {
    pending: Vec<u8>,
    stats: DecoderStats,
}

impl ProtocolDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode newly arrived bytes, returning the samples they complete
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<i32> {
        let mut samples = Vec::with_capacity((self.pending.len() + bytes.len()) / 2);
        self.feed_into(bytes, &mut samples);
        samples
    }

    /// Decode newly arrived bytes, appending samples to `out`.
    ///
    /// Returns the number of samples appended.
    pub fn feed_into(&mut self, bytes: &[u8], out: &mut Vec<i32>) -> usize {
        self.pending.extend_from_slice(bytes);

        let before = out.len();
        let buf = &self.pending;
        let mut i = 0;

        while buf.len() - i >= 2 {
            let first = buf[i];
            if first & FRAME_MARKER == 0 {
                self.stats.bytes_discarded += 1;
                i += 1;
                continue;
            }

            let second = buf[i + 1];
            i += 2;
            match decode_frame(first, second) {
                Some(sample) => out.push(sample),
                None => {
                    self.stats.frames_rejected += 1;
                    trace!(first, second, "Frame byte followed by frame byte, dropping both");
                }
            }
        }

        self.pending.drain(..i);

        let decoded = out.len() - before;
        self.stats.samples_decoded += decoded as u64;
        decoded
    }

    /// Bytes carried over to the next call (at most one)
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    pub fn stats(&self) -> DecoderStats {
        self.stats
    }

    /// Forget carried-over bytes and counters
    pub fn reset(&mut self) {
        self.pending.clear();
        self.stats = DecoderStats::default();
    }
}

/// Decode one frame; `None` when `second` is itself a frame byte.
///
/// `first` is assumed to carry the frame marker.
pub fn decode_frame(first: u8, second: u8) -> Option<i32> {
    if second & FRAME_MARKER != 0 {
        return None;
    }
    let raw = (((first & PAYLOAD_MASK) as i32) << PAYLOAD_BITS) | (second & PAYLOAD_MASK) as i32;
    Some(raw - BIAS_OFFSET)
}

/// Inverse framing rule used by simulators and tests.
///
/// Values outside the 14-bit centered range are clamped.
pub fn encode_sample(value: i32) -> [u8; 2] {
    let raw = (value.clamp(SAMPLE_MIN, SAMPLE_MAX) + BIAS_OFFSET) as u32;
    [
        FRAME_MARKER | (raw >> PAYLOAD_BITS) as u8,
        (raw as u8) & PAYLOAD_MASK,
    ]
}

/// Encode a whole sequence
pub fn encode_samples(values: &[i32]) -> Vec<u8> {
    values.iter().flat_map(|&v| encode_sample(v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_extremes() {
        assert_eq!(decode_frame(0x80, 0x00), Some(SAMPLE_MIN));
        assert_eq!(decode_frame(0xFF, 0x7F), Some(SAMPLE_MAX));
        assert_eq!(decode_frame(0xC0, 0x00), Some(0));
    }

    #[test]
    fn test_encode_matches_framing_rule() {
        assert_eq!(encode_sample(0), [0xC0, 0x00]);
        assert_eq!(encode_sample(-8192), [0x80, 0x00]);
        assert_eq!(encode_sample(8191), [0xFF, 0x7F]);
        // Clamped
        assert_eq!(encode_sample(10_000), encode_sample(SAMPLE_MAX));
    }

    #[test]
    fn test_stray_bytes_skipped() {
        let mut decoder = ProtocolDecoder::new();
        let mut bytes = vec![0x01, 0x02];
        bytes.extend_from_slice(&encode_sample(123));

        assert_eq!(decoder.feed(&bytes), vec![123]);
        assert_eq!(decoder.stats().bytes_discarded, 2);
        assert!(decoder.pending().is_empty());
    }

    #[test]
    fn test_double_frame_byte_drops_pair() {
        let mut decoder = ProtocolDecoder::new();
        let mut bytes = vec![0x85, 0x91];
        bytes.extend_from_slice(&encode_sample(-42));

        assert_eq!(decoder.feed(&bytes), vec![-42]);
        assert_eq!(decoder.stats().frames_rejected, 1);
    }

    #[test]
    fn test_partial_frame_carried_over() {
        let mut decoder = ProtocolDecoder::new();
        let [first, second] = encode_sample(777);

        assert!(decoder.feed(&[first]).is_empty());
        assert_eq!(decoder.pending(), &[first]);
        assert_eq!(decoder.feed(&[second]), vec![777]);
        assert!(decoder.pending().is_empty());
    }

    #[test]
    fn test_empty_feed() {
        let mut decoder = ProtocolDecoder::new();
        assert!(decoder.feed(&[]).is_empty());
        assert_eq!(decoder.stats(), DecoderStats::default());
    }

    #[test]
    fn test_reset_clears_pending() {
        let mut decoder = ProtocolDecoder::new();
        decoder.feed(&[0x90]);
        decoder.reset();
        assert!(decoder.pending().is_empty());
        assert_eq!(decoder.feed(&encode_sample(5)), vec![5]);
    }
}
