//! Frame synchronization (§4.4): demodulates a continuous bitstream, locates
//! the sync word with a [`Correlator`], and re-emits each frame realigned to
//! bit 0 with polarity normalized.
//!
//! The reference implementation keeps a packed byte buffer and a running bit
//! offset into it (`READ_PRE` / `READ` / `REALIGN`), shuffling already-read
//! bits down with `bitcpy` at the start of every frame. Here the carried-over
//! bits live in a `Vec<bool>` instead, so "shuffle the leftover bits down" is
//! just `Vec::drain` and there is no separate `READ_PRE` state to fall
//! through from.

use crate::correlator::Correlator;
use crate::dsp::{AfskDemod, GfskDemod};
use crate::record::ParserStatus;

enum Demod {
    Gfsk(GfskDemod),
    Afsk(AfskDemod),
}

impl Demod {
    fn demod(&mut self, input: &[f32], cursor: &mut usize, bits: &mut Vec<bool>, want_bits: usize) -> ParserStatus {
        match self {
            Demod::Gfsk(g) => g.demod(input, cursor, bits, want_bits),
            Demod::Afsk(a) => a.demod(input, cursor, bits, want_bits),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FramerState {
    Read,
    Realign,
}

/// Synchronizes a continuous demodulated bitstream onto protocol frame
/// boundaries.
pub struct Framer {
    demod: Demod,
    corr: Correlator,
    state: FramerState,
    bits: Vec<bool>,
    framelen_bits: usize,
    sync_offset: usize,
    inverted: bool,
}

impl Framer {
    pub fn new_gfsk(sample_rate: f32, baud: f32, syncword: u64, sync_len_bytes: usize, framelen_bits: usize) -> Self {
        Self {
            demod: Demod::Gfsk(GfskDemod::new(sample_rate, baud)),
            corr: Correlator::new(syncword, sync_len_bytes),
            state: FramerState::Read,
            bits: Vec::new(),
            framelen_bits,
            sync_offset: 0,
            inverted: false,
        }
    }

    pub fn new_afsk(
        sample_rate: f32,
        baud: f32,
        f_mark: f32,
        f_space: f32,
        syncword: u64,
        sync_len_bytes: usize,
        framelen_bits: usize,
    ) -> Self {
        Self {
            demod: Demod::Afsk(AfskDemod::new(sample_rate, baud, f_mark, f_space)),
            corr: Correlator::new(syncword, sync_len_bytes),
            state: FramerState::Read,
            bits: Vec::new(),
            framelen_bits,
            sync_offset: 0,
            inverted: false,
        }
    }

    /// Reads and aligns one frame's worth of bits. On [`ParserStatus::Parsed`],
    /// `out` holds `ceil(framelen_bits/8)` bytes, packed MSB-first, realigned
    /// to the frame boundary with polarity normalized. `out` must be at least
    /// that long.
    pub fn read(&mut self, out: &mut [u8], input: &[f32], cursor: &mut usize) -> ParserStatus {
        loop {
            match self.state {
                FramerState::Read => {
                    let sync_len_bits = 8 * self.corr.sync_len_bytes();
                    let want = self.framelen_bits + sync_len_bits;
                    if self.demod.demod(input, cursor, &mut self.bits, want) == ParserStatus::Proceed {
                        return ParserStatus::Proceed;
                    }

                    let window_len = want.min(self.bits.len());
                    let window = pack_bits(&self.bits[..window_len]);
                    let correlation = self.corr.correlate(&window);
                    self.sync_offset = correlation.offset_bits;
                    self.inverted = correlation.inverted;
                    self.state = FramerState::Realign;
                }
                FramerState::Realign => {
                    let sync_len_bits = 8 * self.corr.sync_len_bytes();
                    if self.sync_offset > sync_len_bits {
                        let want = self.framelen_bits + self.sync_offset;
                        if self.demod.demod(input, cursor, &mut self.bits, want) == ParserStatus::Proceed {
                            return ParserStatus::Proceed;
                        }
                    }

                    let end = self.sync_offset + self.framelen_bits;
                    let mut packed = pack_bits(&self.bits[self.sync_offset..end]);
                    self.bits.drain(0..end);

                    if self.inverted {
                        for byte in packed.iter_mut() {
                            *byte ^= 0xFF;
                        }
                    }
                    out[..packed.len()].copy_from_slice(&packed);

                    self.state = FramerState::Read;
                    return ParserStatus::Parsed;
                }
            }
        }
    }
}

fn pack_bits(bits: &[bool]) -> Vec<u8> {
    let mut out = vec![0u8; (bits.len() + 7) / 8];
    for (i, &b) in bits.iter().enumerate() {
        if b {
            out[i / 8] |= 1 << (7 - i % 8);
        }
    }
    out
}
