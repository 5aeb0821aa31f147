//! Meteo-Radiy MRZ-N1 decoder (§4.6.6). Not present in the reference
//! implementation's distilled sonde table, but named by the supervisor enum;
//! grounded on the RS41 ECEF convention and the shared CRC16-MODBUS helper.

use crate::config::DecoderConfig;
use crate::ecc::crc::crc16_modbus;
use crate::framer::Framer;
use crate::gps::{ecef_to_lla, ecef_to_spd_hdg};
use crate::record::{DataBitmask, ParserStatus, SondeData};

use super::SondeDecoder;

const BAUDRATE: f32 = 2400.0;
const SYNCWORD: u64 = 0x6666_6666_5555_a599;
const SYNC_LEN: usize = 8;
const FRAME_LEN_BYTES: usize = 102;
const FRAME_LEN_BITS: usize = FRAME_LEN_BYTES * 8;

fn i32_be(b: &[u8]) -> i32 {
    i32::from_be_bytes(b.try_into().unwrap())
}
fn i16_be(b: &[u8]) -> i16 {
    i16::from_be_bytes(b.try_into().unwrap())
}

/// Decoder for the Meteo-Radiy MRZ-N1.
pub struct MrzDecoder {
    framer: Framer,
    raw: Vec<u8>,
}

impl MrzDecoder {
    pub fn new(sample_rate: f32) -> Self {
        let cfg = DecoderConfig::mrz(sample_rate);
        debug_assert!(cfg.validate().is_ok(), "static MRZ-N1 decoder config is valid");
        debug_assert_eq!(cfg.baud_rate, BAUDRATE);
        debug_assert_eq!(cfg.syncword, SYNCWORD);
        debug_assert_eq!(cfg.sync_len_bytes, SYNC_LEN);
        debug_assert_eq!(cfg.framelen_bits, FRAME_LEN_BITS);

        Self {
            framer: Framer::new_gfsk(sample_rate, cfg.baud_rate, cfg.syncword, cfg.sync_len_bytes, cfg.framelen_bits),
            raw: vec![0u8; FRAME_LEN_BYTES],
        }
    }
}

impl SondeDecoder for MrzDecoder {
    fn decode(&mut self, out: &mut SondeData, samples: &[f32]) -> ParserStatus {
        out.fields = DataBitmask::empty();

        let mut cursor = 0;
        let mut raw = std::mem::take(&mut self.raw);
        let status = self.framer.read(&mut raw, samples, &mut cursor);
        self.raw = raw;
        if status == ParserStatus::Proceed {
            return ParserStatus::Proceed;
        }

        let frame = &self.raw[SYNC_LEN..];
        let expected = (frame[frame.len() - 2] as u16) << 8 | frame[frame.len() - 1] as u16;
        if crc16_modbus(&frame[..frame.len() - 2]) != expected {
            return ParserStatus::Parsed;
        }

        let seq = u16::from_be_bytes([frame[0], frame[1]]);
        out.fields |= DataBitmask::SEQ;
        out.seq = seq as u32;

        let header_a = frame[2];
        let header_b = u16::from_be_bytes([frame[3], frame[4]]);
        out.fields |= DataBitmask::SERIAL;
        out.serial = format!("MRZ-H1{:02}{:05}", header_a, header_b);

        let x = i32_be(&frame[6..10]) as f32 / 100.0;
        let y = i32_be(&frame[10..14]) as f32 / 100.0;
        let z = i32_be(&frame[14..18]) as f32 / 100.0;
        let dx = i32_be(&frame[18..22]) as f32 / 100.0;
        let dy = i32_be(&frame[22..26]) as f32 / 100.0;
        let dz = i32_be(&frame[26..30]) as f32 / 100.0;

        if let Some((lat, lon, alt)) = ecef_to_lla(x, y, z) {
            let (speed, heading, climb) = ecef_to_spd_hdg(lat, lon, dx, dy, dz);
            out.fields |= DataBitmask::POS | DataBitmask::SPEED;
            out.lat = lat;
            out.lon = lon;
            out.alt = alt;
            out.speed = speed;
            out.heading = heading;
            out.climb = climb;
        }

        let temp = i16_be(&frame[30..32]) as f32 / 100.0;
        let rh = i16_be(&frame[32..34]) as f32 / 100.0;
        out.fields |= DataBitmask::PTU;
        out.temp = temp;
        out.rh = rh.clamp(0.0, 100.0);
        out.calibrated = true;

        ParserStatus::Parsed
    }
}
