//! Per-protocol decoders (§4.6). Each owns one [`crate::framer::Framer`] and
//! whatever ECC/calibration state it needs, and exposes the same contract.

pub mod dfm;
pub mod imet4;
pub mod ims100;
pub mod m10;
pub mod mrz;
pub mod rs41;

use crate::record::{ParserStatus, SondeData};

/// Common contract every protocol decoder implements (§4.6).
///
/// Returning `Parsed` means either a record was populated (`out.fields`
/// non-zero) or a frame boundary was reached with nothing to report
/// (`out.fields` empty) — on-air corruption never surfaces as `Err`.
pub trait SondeDecoder {
    fn decode(&mut self, out: &mut SondeData, samples: &[f32]) -> ParserStatus;
}
