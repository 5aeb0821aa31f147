//! Configuration types for the radiosonde decoding pipeline (§9A).
//!
//! Every tunable named in §4 gets a `serde`-derived struct with a `Default`
//! impl baking in the real protocol constants, plus named per-protocol
//! constructors (`DecoderConfig::rs41()`, `BchParams::ims100()`, ...) rather
//! than leaving callers to hand-assemble magic numbers.

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Demodulator front-end parameters for one protocol decoder (§4.2-§4.4).
///
/// Constructed once at decoder-open time and immutable thereafter — no
/// protocol decoder re-tunes its own sync word or baud rate mid-stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecoderConfig {
    pub sample_rate: f32,
    pub baud_rate: f32,
    /// `Some` selects AFSK (mark/space tones); `None` selects GFSK.
    pub mark_space_hz: Option<(f32, f32)>,
    pub syncword: u64,
    pub sync_len_bytes: usize,
    pub framelen_bits: usize,
}

impl DecoderConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.baud_rate <= 0.0 {
            return Err(ConfigError::InvalidBaudRate { baud: self.baud_rate as f64 });
        }
        let sync_bits = self.sync_len_bytes as u32 * 8;
        if sync_bits > 64 {
            return Err(ConfigError::SyncWordTooLong { bits: sync_bits });
        }
        if let Some((mark, space)) = self.mark_space_hz {
            if mark == space {
                return Err(ConfigError::DegenerateMarkSpace { mark_hz: mark as f64, space_hz: space as f64 });
            }
        }
        Ok(())
    }

    pub fn rs41(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            baud_rate: 4_800.0,
            mark_space_hz: None,
            syncword: 0x086d_5388_4469_481f,
            sync_len_bytes: 8,
            // SYNC(8) + RS parity(48) + flag(1) + data(263) + xdata(198), bits.
            framelen_bits: (8 + 48 + 1 + 263 + 198) * 8,
        }
    }

    pub fn dfm(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            baud_rate: 2_500.0,
            mark_space_hz: None,
            syncword: 0x9a99_5a55,
            sync_len_bytes: 4,
            framelen_bits: 560,
        }
    }

    pub fn m10(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            baud_rate: 9_600.0,
            mark_space_hz: None,
            syncword: 0x6666_6666_b366,
            sync_len_bytes: 6,
            framelen_bits: 1664,
        }
    }

    pub fn ims100(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            baud_rate: 2_400.0,
            mark_space_hz: None,
            syncword: 0xaaa5_6a65_9a99_559a,
            sync_len_bytes: 8,
            framelen_bits: 2400,
        }
    }

    pub fn imet4(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            baud_rate: 1_200.0,
            mark_space_hz: Some((1_200.0, 2_200.0)),
            syncword: 0xffff_a024,
            sync_len_bytes: 4,
            framelen_bits: 600,
        }
    }

    pub fn mrz(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            baud_rate: 2_400.0,
            mark_space_hz: None,
            syncword: 0x6666_6666_5555_a599,
            sync_len_bytes: 8,
            framelen_bits: 102 * 8,
        }
    }
}

/// Reed-Solomon construction parameters over GF(2^8) (§4.5).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RsParams {
    pub n: usize,
    pub k: usize,
    pub gen_poly: u32,
    pub first_root: u8,
    pub root_skip: usize,
}

impl RsParams {
    /// RS41's `(n=255, k=231)` code over `0x11D`.
    pub fn rs41() -> Self {
        Self { n: 255, k: 231, gen_poly: 0x11D, first_root: 0, root_skip: 1 }
    }
}

/// Shortened-BCH construction parameters over GF(2^8) (§4.5).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BchParams {
    pub n: usize,
    pub k: usize,
    pub gen_poly: u32,
    pub roots: Vec<u8>,
}

impl BchParams {
    /// iMS-100's shortened BCH(63,51) with explicit roots.
    pub fn ims100() -> Self {
        Self {
            n: 63,
            k: 51,
            gen_poly: 0x11D,
            roots: vec![2, 4, 8, 15, 16, 26, 33, 39, 42, 45, 52, 62],
        }
    }
}

/// Second-order symbol-timing loop parameters (§4.3): damping ζ and
/// bandwidth BW, in the standard PLL parameterization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimingLoopConfig {
    pub damping: f32,
    pub bandwidth: f32,
}

impl Default for TimingLoopConfig {
    fn default() -> Self {
        Self { damping: std::f32::consts::FRAC_1_SQRT_2, bandwidth: 0.01 }
    }
}

/// Automatic gain control parameters (§4.2): target peak magnitude and the
/// bias/gain tracking poles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgcConfig {
    pub target_magnitude: f32,
    pub bias_pole: f32,
    pub gain_pole: f32,
}

impl Default for AgcConfig {
    fn default() -> Self {
        Self { target_magnitude: 1_024.0, bias_pole: 0.01, gain_pole: 0.001 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rs41_decoder_config_is_valid() {
        assert!(DecoderConfig::rs41(48_000.0).validate().is_ok());
    }

    #[test]
    fn zero_baud_rate_is_rejected() {
        let mut cfg = DecoderConfig::rs41(48_000.0);
        cfg.baud_rate = 0.0;
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidBaudRate { .. })));
    }

    #[test]
    fn oversized_sync_word_is_rejected() {
        let mut cfg = DecoderConfig::rs41(48_000.0);
        cfg.sync_len_bytes = 9;
        assert!(matches!(cfg.validate(), Err(ConfigError::SyncWordTooLong { .. })));
    }

    #[test]
    fn degenerate_afsk_tones_are_rejected() {
        let mut cfg = DecoderConfig::imet4(48_000.0);
        cfg.mark_space_hz = Some((1_200.0, 1_200.0));
        assert!(matches!(cfg.validate(), Err(ConfigError::DegenerateMarkSpace { .. })));
    }

    #[test]
    fn rs41_rs_params_match_the_shared_decoder() {
        let params = RsParams::rs41();
        assert_eq!(params.n, 255);
        assert_eq!(params.k, 231);
    }

    #[test]
    fn ims100_bch_params_match_the_shared_decoder() {
        let params = BchParams::ims100();
        assert_eq!(params.n, 63);
        assert_eq!(params.roots.len(), 12);
    }
}
