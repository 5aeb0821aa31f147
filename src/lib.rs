//! Multi-protocol radiosonde decoding core.
//!
//! This crate turns demodulated audio samples from six on-air radiosonde
//! protocols (RS41, DFM09/DFM06, M10/M20, iMS-100/RS-11G, iMet-4, MRZ-N1)
//! into a uniform telemetry record. See [`supervisor::Supervisor`] for the
//! top-level entry point; individual protocol decoders in [`protocols`]
//! implement the same [`protocols::SondeDecoder`] contract and can be used
//! directly when the protocol is already known.

pub mod bits;
pub mod calibration;
pub mod config;
pub mod correlator;
pub mod dsp;
pub mod ecc;
pub mod errors;
pub mod framer;
pub mod gps;
pub mod logging;
pub mod manchester;
pub mod protocols;
pub mod record;
pub mod supervisor;
pub mod xdata;

pub use protocols::SondeDecoder;
pub use record::{DataBitmask, ParserStatus, SondeData, SondeXdata};
pub use supervisor::{Mode, Supervisor};
