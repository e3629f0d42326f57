// tests/protocol_properties.rs
//! Property tests for the two-byte framing decoder

use emg_acquire::hal::protocol::{encode_sample, encode_samples, ProtocolDecoder};
use proptest::prelude::*;

fn sample() -> impl Strategy<Value = i32> {
    -8192i32..=8191
}

/// Feed `bytes` in pieces whose lengths cycle through `splits`
fn feed_split(decoder: &mut ProtocolDecoder, bytes: &[u8], splits: &[usize]) -> Vec<i32> {
    let mut out = Vec::new();
    let mut offset = 0;
    let mut k = 0;
    while offset < bytes.len() {
        let len = splits.get(k % splits.len().max(1)).copied().unwrap_or(1).max(1);
        let end = (offset + len).min(bytes.len());
        out.extend(decoder.feed(&bytes[offset..end]));
        offset = end;
        k += 1;
    }
    out
}

proptest! {
    #[test]
    fn roundtrip_survives_arbitrary_splits(
        values in prop::collection::vec(sample(), 0..400),
        splits in prop::collection::vec(1usize..40, 1..20),
    ) {
        let bytes = encode_samples(&values);
        let mut decoder = ProtocolDecoder::new();
        let decoded = feed_split(&mut decoder, &bytes, &splits);

        prop_assert_eq!(decoded, values);
        prop_assert!(decoder.pending().is_empty());
    }

    #[test]
    fn well_formed_pairs_decode_one_sample_each(
        pairs in prop::collection::vec((0x80u8..=0xFF, 0x00u8..=0x7F), 0..300),
    ) {
        let bytes: Vec<u8> = pairs.iter().flat_map(|&(a, b)| [a, b]).collect();
        let decoded = ProtocolDecoder::new().feed(&bytes);

        prop_assert_eq!(decoded.len(), pairs.len());
        for v in decoded {
            prop_assert!((-8192..=8191).contains(&v));
        }
    }

    #[test]
    fn double_frame_byte_only_loses_its_pair(
        before in prop::collection::vec(sample(), 0..50),
        after in prop::collection::vec(sample(), 0..50),
        first in 0x80u8..=0xFF,
        second in 0x80u8..=0xFF,
    ) {
        let mut bytes = encode_samples(&before);
        bytes.extend_from_slice(&[first, second]);
        bytes.extend(encode_samples(&after));

        let mut decoder = ProtocolDecoder::new();
        let decoded = decoder.feed(&bytes);

        let expected: Vec<i32> = before.iter().chain(after.iter()).copied().collect();
        prop_assert_eq!(decoded, expected);
        prop_assert_eq!(decoder.stats().frames_rejected, 1);
    }

    #[test]
    fn split_frame_decodes_like_whole_frame(value in sample()) {
        let [first, second] = encode_sample(value);

        let mut whole = ProtocolDecoder::new();
        let mut split = ProtocolDecoder::new();

        let expected = whole.feed(&[first, second]);
        let mut got = split.feed(&[first]);
        got.extend(split.feed(&[second]));

        prop_assert_eq!(got, expected);
    }

    #[test]
    fn arbitrary_bytes_are_fully_accounted(
        bytes in prop::collection::vec(any::<u8>(), 0..1000),
        splits in prop::collection::vec(1usize..17, 1..8),
    ) {
        let mut decoder = ProtocolDecoder::new();
        let decoded = feed_split(&mut decoder, &bytes, &splits);
        let stats = decoder.stats();

        prop_assert!(decoder.pending().len() <= 1);
        prop_assert_eq!(stats.samples_decoded, decoded.len() as u64);
        prop_assert_eq!(
            stats.samples_decoded * 2 + stats.frames_rejected * 2 + stats.bytes_discarded
                + decoder.pending().len() as u64,
            bytes.len() as u64
        );
    }
}

#[test]
fn stray_data_byte_before_frame_is_skipped() {
    let mut bytes = vec![0x3F];
    bytes.extend_from_slice(&encode_sample(-1));
    bytes.extend_from_slice(&encode_sample(1));

    let mut decoder = ProtocolDecoder::new();
    assert_eq!(decoder.feed(&bytes), vec![-1, 1]);
    assert_eq!(decoder.stats().bytes_discarded, 1);
}
