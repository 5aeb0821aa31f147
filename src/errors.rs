//! Layered error types.
//!
//! On-air corruption (bad CRC, uncorrectable ECC, sync not found) is never
//! surfaced as an `Err` — it is absorbed into the `ParserStatus`/bitmask
//! contract described in `record.rs`, per the "frame lost" policy. These
//! types cover construction-time misconfiguration and internal invariant
//! breaches only.

use thiserror::Error;

/// Top-level error type for all decoder construction and internal-invariant
/// failures.
#[derive(Debug, Error)]
pub enum SondeError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("DSP error: {0}")]
    Dsp(#[from] DspError),

    #[error("framer error: {0}")]
    Frame(#[from] FrameError),

    #[error("ECC error: {0}")]
    Ecc(#[from] EccError),
}

/// Invalid `DecoderConfig` / protocol constant-table construction parameters.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("sync word is {bits} bits, but the correlator supports at most 64")]
    SyncWordTooLong { bits: u32 },

    #[error("baud rate must be positive, got {baud}")]
    InvalidBaudRate { baud: f64 },

    #[error("AFSK mark/space frequencies must differ: mark={mark_hz}, space={space_hz}")]
    DegenerateMarkSpace { mark_hz: f64, space_hz: f64 },
}

/// DSP front-end misconfiguration or malformed sample input.
#[derive(Debug, Error)]
pub enum DspError {
    #[error("non-finite sample encountered at index {index}")]
    NonFiniteSample { index: usize },

    #[error("invalid timing-loop parameters: damping={damping}, bandwidth={bandwidth}")]
    InvalidTimingParams { damping: f32, bandwidth: f32 },
}

/// Internal framer invariant violations — never raised by ordinary frame
/// loss, which is handled silently per §7.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame buffer shorter than required {required} bits (have {available})")]
    BufferTooShort { required: usize, available: usize },

    #[error("realignment offset {offset} bits exceeds buffer length {len} bits")]
    RealignOutOfBounds { offset: usize, len: usize },
}

/// Reed-Solomon / BCH construction-time parameter errors.
#[derive(Debug, Error)]
pub enum EccError {
    #[error("RS/BCH block size n={n} exceeds the GF(2^8) limit of 255")]
    BlockTooLarge { n: usize },

    #[error("invalid code rate: k={k} must not exceed n={n}")]
    InvalidCodeRate { n: usize, k: usize },

    #[error("n-k must be even for n={n}, k={k}")]
    OddParity { n: usize, k: usize },
}
