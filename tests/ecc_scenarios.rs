//! End-to-end ECC scenarios (§8) exercised only through public APIs.

use sonde_decode::ecc::hamming;

/// Flipping a single bit inside an otherwise-clean DFM09 PTU block byte is
/// corrected in place and the restored byte matches the original.
#[test]
fn dfm_hamming_correction_restores_a_flipped_ptu_byte() {
    // A clean Hamming(8,4) codeword: all zero satisfies every parity check.
    let clean_ptu_block: [u8; 7] = [0; 7];
    let mut corrupted = clean_ptu_block;
    corrupted[2] ^= 0b0010_0000; // single bit flip in byte 2

    let corrected_bits = hamming::correct_block(&mut corrupted);
    assert_eq!(corrected_bits, Some(1));
    assert_eq!(corrupted, clean_ptu_block);
}

/// A clean block with no bit errors reports zero corrections and is
/// returned unchanged.
#[test]
fn clean_block_passes_through_untouched() {
    let mut block: [u8; 7] = [0; 7];
    let corrected_bits = hamming::correct_block(&mut block);
    assert_eq!(corrected_bits, Some(0));
    assert_eq!(block, [0; 7]);
}

/// A two-bit error within a single byte of the block is detected and the
/// whole block is reported uncorrectable.
#[test]
fn two_bit_error_in_one_byte_makes_the_block_uncorrectable() {
    let mut block: [u8; 7] = [0; 7];
    block[4] = 0b0000_0011;
    assert_eq!(hamming::correct_block(&mut block), None);
}
