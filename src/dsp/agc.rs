//! Automatic gain control: DC-bias removal plus a target-magnitude gain loop.

use crate::config::AgcConfig;

/// Single-pole DC-bias tracker feeding a single-pole gain-control loop.
///
/// Each instance is owned by exactly one demodulator; there is no global or
/// shared AGC state (unlike the reference implementation's file-scope
/// statics).
#[derive(Debug, Clone, Copy)]
pub struct Agc {
    gain: f32,
    bias: f32,
    target_magnitude: f32,
    bias_pole: f32,
    gain_pole: f32,
}

impl Default for Agc {
    fn default() -> Self {
        Self::from_config(AgcConfig::default())
    }
}

impl Agc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(cfg: AgcConfig) -> Self {
        Self {
            gain: 1.0,
            bias: 0.0,
            target_magnitude: cfg.target_magnitude,
            bias_pole: cfg.bias_pole,
            gain_pole: cfg.gain_pole,
        }
    }

    /// Removes the tracked DC bias and rescales towards the target
    /// magnitude, updating both running estimates.
    pub fn apply(&mut self, sample: f32) -> f32 {
        self.bias = self.bias * (1.0 - self.bias_pole) + self.bias_pole * sample;
        let mut sample = sample - self.bias;

        sample *= self.gain;
        self.gain += self.gain_pole * (self.target_magnitude - sample.abs());
        self.gain = self.gain.max(0.0);

        sample
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }
}
