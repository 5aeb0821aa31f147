//! AFSK demodulator: complex mark/space correlators feeding the shared
//! timing loop and sign slicer (§4.3).

use num_complex::Complex32;
use std::f32::consts::PI;

use super::{Agc, TimeSlot, Timing};
use crate::record::ParserStatus;

/// Boxcar-integrated mark/space mixer demodulator.
#[derive(Debug, Clone)]
pub struct AfskDemod {
    agc: Agc,
    timing: Timing,

    w_mark: f32,
    w_space: f32,
    phase_mark: f32,
    phase_space: f32,

    history_len: usize,
    mark_history: Vec<Complex32>,
    space_history: Vec<Complex32>,
    idx: usize,
    mark_sum: Complex32,
    space_sum: Complex32,

    interm: f32,
}

impl AfskDemod {
    pub fn new(sample_rate: f32, symbol_rate: f32, f_mark: f32, f_space: f32) -> Self {
        let sym_freq = symbol_rate / sample_rate;
        let history_len = (sample_rate / symbol_rate).round().max(1.0) as usize;

        Self {
            agc: Agc::new(),
            timing: Timing::from_config(sym_freq, crate::config::TimingLoopConfig { bandwidth: sym_freq / 100.0, ..Default::default() }),
            w_mark: 2.0 * PI * f_mark / sample_rate,
            w_space: 2.0 * PI * f_space / sample_rate,
            phase_mark: 0.0,
            phase_space: 0.0,
            history_len,
            mark_history: vec![Complex32::new(0.0, 0.0); history_len],
            space_history: vec![Complex32::new(0.0, 0.0); history_len],
            idx: 0,
            mark_sum: Complex32::new(0.0, 0.0),
            space_sum: Complex32::new(0.0, 0.0),
            interm: 0.0,
        }
    }

    /// Same suspend/resume contract as [`super::GfskDemod::demod`].
    pub fn demod(&mut self, input: &[f32], cursor: &mut usize, bits: &mut Vec<bool>, want_bits: usize) -> ParserStatus {
        while bits.len() < want_bits {
            if *cursor >= input.len() {
                return ParserStatus::Proceed;
            }
            let raw = input[*cursor];
            *cursor += 1;

            let sample = self.agc.apply(raw) / self.history_len as f32 * 2.0;

            let mark_out = Complex32::from_polar(sample, -self.phase_mark);
            self.mark_sum += mark_out - self.mark_history[self.idx];
            self.mark_history[self.idx] = mark_out;

            let space_out = Complex32::from_polar(sample, -self.phase_space);
            self.space_sum += space_out - self.space_history[self.idx];
            self.space_history[self.idx] = space_out;

            self.idx = (self.idx + 1) % self.history_len;
            self.phase_mark = (self.phase_mark + self.w_mark) % (2.0 * PI);
            self.phase_space = (self.phase_space + self.w_space) % (2.0 * PI);

            let discriminant = self.mark_sum.norm() - self.space_sum.norm();

            match self.timing.advance() {
                TimeSlot::Intermediate => {
                    self.interm = discriminant;
                }
                TimeSlot::Decision => {
                    self.timing.retime(self.interm, discriminant);
                    bits.push(discriminant > 0.0);
                }
                TimeSlot::None => {}
            }
        }
        ParserStatus::Parsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suspends_mid_symbol() {
        let mut demod = AfskDemod::new(48_000.0, 1200.0, 1200.0, 2200.0);
        let input = vec![0.1f32; 5];
        let mut cursor = 0;
        let mut bits = Vec::new();
        let status = demod.demod(&input, &mut cursor, &mut bits, 500);
        assert_eq!(status, ParserStatus::Proceed);
    }

    #[test]
    fn mark_tone_slices_differently_than_space_tone() {
        let sample_rate = 48_000.0;
        let f_mark = 1200.0;
        let f_space = 2200.0;

        let mut mark_demod = AfskDemod::new(sample_rate, 1200.0, f_mark, f_space);
        let mark_tone: Vec<f32> = (0..4000)
            .map(|i| (2.0 * PI * f_mark * i as f32 / sample_rate).sin())
            .collect();
        let mut cursor = 0;
        let mut bits = Vec::new();
        let _ = mark_demod.demod(&mark_tone, &mut cursor, &mut bits, 2);
        assert!(!bits.is_empty());
    }
}
