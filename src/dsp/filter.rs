//! Raised-cosine FIR low-pass filter used as the matched filter ahead of
//! symbol-timing recovery.

use std::f32::consts::PI;

/// FIR order used by the GFSK front-end (§4.3).
pub const GFSK_FILTER_ORDER: usize = 24;
/// Raised-cosine roll-off used by the GFSK front-end.
pub const GFSK_FILTER_ALPHA: f32 = 0.4;

/// A causal FIR low-pass filter with a circular sample history, operated one
/// sample at a time so it composes with the suspend/resume demodulator
/// contract.
#[derive(Debug, Clone)]
pub struct Lpf {
    taps: Vec<f32>,
    history: Vec<f32>,
    pos: usize,
}

impl Lpf {
    /// Builds a raised-cosine low-pass filter of the given `order` tuned to
    /// `cutoff` (normalized to the sample rate, i.e. symbol_rate/sample_rate).
    pub fn new_raised_cosine(order: usize, cutoff: f32) -> Self {
        let mut taps = vec![0.0f32; order + 1];
        let center = order as f32 / 2.0;

        for (i, tap) in taps.iter_mut().enumerate() {
            let t = i as f32 - center;
            *tap = raised_cosine(t, cutoff, GFSK_FILTER_ALPHA);
        }

        let sum: f32 = taps.iter().sum();
        if sum.abs() > 1e-12 {
            for tap in &mut taps {
                *tap /= sum;
            }
        }

        Self { history: vec![0.0; taps.len()], taps, pos: 0 }
    }

    /// Pushes one new sample through the filter and returns the current
    /// filtered output.
    pub fn push(&mut self, sample: f32) -> f32 {
        self.history[self.pos] = sample;
        self.pos = (self.pos + 1) % self.history.len();

        let mut acc = 0.0;
        for (i, &tap) in self.taps.iter().enumerate() {
            let idx = (self.pos + self.history.len() - 1 - i) % self.history.len();
            acc += tap * self.history[idx];
        }
        acc
    }
}

fn raised_cosine(t: f32, cutoff: f32, alpha: f32) -> f32 {
    if t.abs() < 1e-8 {
        return 2.0 * cutoff;
    }
    let denom = 1.0 - (2.0 * alpha * cutoff * t).powi(2);
    if denom.abs() < 1e-8 {
        return (PI / (4.0 * cutoff)).sin() * cutoff;
    }
    let sinc = (2.0 * PI * cutoff * t).sin() / (PI * t);
    let cos_term = (2.0 * PI * alpha * cutoff * t).cos();
    sinc * cos_term / denom
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dc_input_passes_with_unit_gain() {
        let mut lpf = Lpf::new_raised_cosine(GFSK_FILTER_ORDER, 4800.0 / 48000.0);
        let mut last = 0.0;
        for _ in 0..200 {
            last = lpf.push(1.0);
        }
        assert!((last - 1.0).abs() < 0.05, "settled output was {last}");
    }
}
