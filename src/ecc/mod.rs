//! Forward error correction: Reed-Solomon/BCH, Hamming(8,4), and checksums
//! (§4.5, §4.6.2).

pub mod crc;
pub mod hamming;
pub mod rs;

pub use rs::{Correction, RsDecoder};
