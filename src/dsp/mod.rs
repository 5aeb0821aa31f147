//! The DSP front-end: AGC, matched filtering, and symbol-timing recovery,
//! in two flavors (§4.3).

pub mod afsk;
pub mod agc;
pub mod filter;
pub mod timing;

pub use afsk::AfskDemod;
pub use agc::Agc;
pub use filter::Lpf;
pub use timing::{TimeSlot, Timing};

use crate::record::ParserStatus;

/// FM/GFSK demodulator: AGC → raised-cosine LPF → timing loop → sign slicer.
///
/// Owns all loop state so it can suspend mid-symbol and resume exactly where
/// it left off (§4.3's suspension contract).
#[derive(Debug, Clone)]
pub struct GfskDemod {
    agc: Agc,
    lpf: Lpf,
    timing: Timing,
    interm: f32,
}

impl GfskDemod {
    pub fn new(sample_rate: f32, symbol_rate: f32) -> Self {
        let sym_freq = symbol_rate / sample_rate;
        Self {
            agc: Agc::new(),
            lpf: Lpf::new_raised_cosine(filter::GFSK_FILTER_ORDER, sym_freq),
            timing: Timing::from_config(sym_freq, crate::config::TimingLoopConfig { bandwidth: sym_freq / 10.0, ..Default::default() }),
            interm: 0.0,
        }
    }

    /// Consumes samples from `input` starting at `*cursor`, writing sliced
    /// bits into `bits` until either `want_bits` total bits have been
    /// produced or `input` is exhausted. Returns `Proceed` if the input ran
    /// out first, `Parsed` once `want_bits` have been produced.
    pub fn demod(&mut self, input: &[f32], cursor: &mut usize, bits: &mut Vec<bool>, want_bits: usize) -> ParserStatus {
        while bits.len() < want_bits {
            if *cursor >= input.len() {
                return ParserStatus::Proceed;
            }
            let mut sample = input[*cursor];
            *cursor += 1;

            sample = self.agc.apply(sample);
            let filtered = self.lpf.push(sample);

            match self.timing.advance() {
                TimeSlot::Intermediate => {
                    self.interm = filtered;
                }
                TimeSlot::Decision => {
                    self.timing.retime(self.interm, filtered);
                    bits.push(filtered > 0.0);
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
    fn suspends_when_input_runs_out() {
        let mut demod = GfskDemod::new(48_000.0, 4800.0);
        let input = vec![0.5f32; 4];
        let mut cursor = 0;
        let mut bits = Vec::new();
        let status = demod.demod(&input, &mut cursor, &mut bits, 1000);
        assert_eq!(status, ParserStatus::Proceed);
        assert_eq!(cursor, input.len());
    }

    #[test]
    fn produces_requested_bit_count_given_enough_samples() {
        let mut demod = GfskDemod::new(48_000.0, 4800.0);
        let input: Vec<f32> = (0..20_000)
            .map(|i| if (i / 10) % 2 == 0 { 1.0 } else { -1.0 })
            .collect();
        let mut cursor = 0;
        let mut bits = Vec::new();
        let status = demod.demod(&input, &mut cursor, &mut bits, 8);
        assert_eq!(status, ParserStatus::Parsed);
        assert_eq!(bits.len(), 8);
    }
}
