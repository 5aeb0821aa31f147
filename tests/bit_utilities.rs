//! Property tests for the allocation-free bit primitives in `bits` (§8).

use proptest::prelude::*;
use sonde_decode::bits::{bitcpy, bitmerge, bitpack};

proptest! {
    /// `bitpack` followed by `bitcpy` reproduces the source bits exactly,
    /// for any offset/length that fits inside the destination buffer.
    #[test]
    fn bitpack_bitcpy_roundtrip(
        src_bits in prop::collection::vec(prop::bool::ANY, 1..200),
        offset in 0usize..16,
    ) {
        let nbits = src_bits.len();
        let total_bits = offset + nbits;
        // Pad a byte past the last bit written: bitcpy's unaligned path reads
        // one byte ahead of the final chunk it emits.
        let mut dst = vec![0u8; (total_bits + 7) / 8 + 1];
        bitpack(&mut dst, &src_bits, offset, nbits);

        let mut recovered = vec![0u8; (nbits + 7) / 8 + 1];
        bitcpy(&mut recovered, &dst, offset, nbits);

        let recovered_bits: Vec<bool> = (0..nbits)
            .map(|i| (recovered[i / 8] >> (7 - i % 8)) & 1 == 1)
            .collect();
        prop_assert_eq!(recovered_bits, src_bits);
    }

    /// `bitmerge(src, n)` is the integer formed by the first `n` bits of
    /// `src`, read MSB-first, for every `n` in `1..=64`.
    #[test]
    fn bitmerge_matches_msb_first_reading(raw in prop::collection::vec(any::<u8>(), 8), n in 1u32..=64) {
        let merged = bitmerge(&raw, n);

        let mut expected: u64 = 0;
        for i in 0..n as usize {
            let byte = raw[i / 8];
            let bit = (byte >> (7 - i % 8)) & 1;
            expected = (expected << 1) | bit as u64;
        }
        prop_assert_eq!(merged, expected);
    }
}
