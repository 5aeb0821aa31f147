//! Vaisala RS41 decoder (§4.6.1).

use crate::config::{DecoderConfig, RsParams};
use crate::ecc::crc::crc16_ccitt_false;
use crate::ecc::rs::{Correction, RsDecoder};
use crate::calibration::FragmentAssembler;
use crate::framer::Framer;
use crate::gps::{ecef_to_lla, ecef_to_spd_hdg, gps_week_ms_to_unix};
use crate::record::{DataBitmask, ParserStatus, SondeData};
use crate::xdata;

use super::SondeDecoder;

const BAUDRATE: f32 = 4800.0;
const SYNCWORD: u64 = 0x086d_5388_4469_481f;
const SYNC_LEN: usize = 8;
const RS_LEN: usize = 48;
const DATA_LEN: usize = 263;
const XDATA_LEN: usize = 198;
const FRAME_LEN_BYTES: usize = SYNC_LEN + RS_LEN + 1 + DATA_LEN + XDATA_LEN;
const FLAG_EXTENDED: u8 = 0xF0;

const RS_N: usize = 255;
const RS_K: usize = 231;
const RS_POLY: u32 = 0x11D;
const RS_INTERLEAVING: usize = 2;

const SFTYPE_EMPTY: u8 = 0x76;
const SFTYPE_INFO: u8 = 0x79;
const SFTYPE_PTU: u8 = 0x7A;
const SFTYPE_GPSPOS: u8 = 0x7B;
const SFTYPE_GPSINFO: u8 = 0x7C;
const SFTYPE_XDATA: u8 = 0x7E;

/// The 64-byte PRN used to descramble the frame after bit-reversal, fixed
/// per the RS41 firmware.
const PRN: [u8; 64] = [
    0x96, 0x83, 0x3e, 0x51, 0xb1, 0x49, 0x08, 0x98, 0x32, 0x05, 0x59, 0x0e, 0xf9, 0x44, 0xc6, 0x26,
    0x21, 0x60, 0xc2, 0xea, 0x79, 0x5d, 0x6d, 0xa1, 0x54, 0x69, 0x47, 0x0c, 0xdc, 0xe8, 0x5c, 0xf1,
    0xf7, 0x76, 0x82, 0x7f, 0x07, 0x99, 0xa2, 0x2c, 0x93, 0x7c, 0x30, 0x63, 0xf5, 0x10, 0x2e, 0x61,
    0xd0, 0xbc, 0xb4, 0xb6, 0x06, 0xaa, 0xf4, 0x23, 0x78, 0x6e, 0x3b, 0xae, 0xbf, 0x7b, 0x4c, 0xc1,
];

const BIT_REVERSE: [u8; 256] = {
    let mut table = [0u8; 256];
    let mut i = 0usize;
    while i < 256 {
        let mut b = i as u8;
        let mut r = 0u8;
        let mut k = 0;
        while k < 8 {
            r = (r << 1) | (b & 1);
            b >>= 1;
            k += 1;
        }
        table[i] = r;
        i += 1;
    }
    table
};

const CALIB_FRAGSIZE: usize = 16;
/// `ceil(sizeof(RS41Calibration) / 16)`; the calibration block is 814 bytes.
const CALIB_SIZE: usize = 814;
const CALIB_FRAGCOUNT: usize = (CALIB_SIZE + CALIB_FRAGSIZE - 1) / CALIB_FRAGSIZE;

/// Fragments covering the PTU calibration coefficients (`rt_ref` through
/// `rh_resist_coeff`, offsets 61..317); once all of these have arrived, PTU
/// readings stop relying on the sane-default fallback.
const PTU_CALIB_FRAGMENT_RANGE: std::ops::Range<usize> = (61 / CALIB_FRAGSIZE)..((317 - 1) / CALIB_FRAGSIZE + 1);

#[derive(Debug, Clone, Copy)]
struct Calibration {
    rt_ref: [f32; 2],
    rt_temp_poly: [f32; 3],
    rt_resist_coeff: [f32; 3],
    rh_cap_coeff: [f32; 2],
    rh_temp_poly: [f32; 3],
    rh_resist_coeff: [f32; 3],
    burstkill_timer: u16,
}

impl Default for Calibration {
    /// A plausible in-flight calibration, used before the real one is fully
    /// received so PTU values stay in a sane range rather than reading zero.
    fn default() -> Self {
        Self {
            rt_ref: [750.0, 1100.0],
            rt_temp_poly: [-243.9, 90.0, 0.0],
            rt_resist_coeff: [0.0, 0.0, 0.0],
            rh_cap_coeff: [0.0, 100.0],
            rh_temp_poly: [-243.9, 90.0, 0.0],
            rh_resist_coeff: [0.0, 0.0, 0.0],
            burstkill_timer: 0xFFFF,
        }
    }
}

impl Calibration {
    fn read_from(storage: &[u8]) -> Self {
        let mut calib = Self::default();
        let f32_at = |off: usize| -> f32 {
            if off + 4 <= storage.len() {
                f32::from_le_bytes(storage[off..off + 4].try_into().unwrap())
            } else {
                0.0
            }
        };

        if storage.len() >= 65 {
            calib.rt_ref = [f32_at(61), f32_at(65)];
        }
        if storage.len() >= 89 {
            calib.rt_temp_poly = [f32_at(77), f32_at(81), f32_at(85)];
        }
        if storage.len() >= 101 {
            calib.rt_resist_coeff = [f32_at(89), f32_at(93), f32_at(97)];
        }
        if storage.len() >= 125 {
            calib.rh_cap_coeff = [f32_at(117), f32_at(121)];
        }
        if storage.len() >= 305 {
            calib.rh_temp_poly = [f32_at(293), f32_at(297), f32_at(301)];
        }
        if storage.len() >= 317 {
            calib.rh_resist_coeff = [f32_at(305), f32_at(309), f32_at(313)];
        }
        if storage.len() >= 802 {
            calib.burstkill_timer = u16::from_le_bytes(storage[800..802].try_into().unwrap());
        }

        calib
    }
}

fn resistance_ratio(main: u32, ref1: u32, ref2: u32) -> Option<f32> {
    if main == 0 || ref1 == 0 || ref2 == 0 || ref1 == ref2 {
        return None;
    }
    Some((main as f32 - ref1 as f32) / (ref2 as f32 - ref1 as f32))
}

fn poly2(x: f32, p: [f32; 3]) -> f32 {
    p[0] + p[1] * x + p[2] * x * x
}

fn resistance_from_ratio(ratio: f32, rt_ref: [f32; 2], resist_coeff: [f32; 3]) -> f32 {
    let r = rt_ref[0] + ratio * (rt_ref[1] - rt_ref[0]);
    r + resist_coeff[0] + resist_coeff[1] * r + resist_coeff[2] * r * r
}

fn u24(bytes: &[u8]) -> u32 {
    bytes[0] as u32 | (bytes[1] as u32) << 8 | (bytes[2] as u32) << 16
}

/// Reconstructs an in-the-field temperature (used both for the main PTU
/// temperature sensor and the humidity sensor head, which carries its own
/// reference-resistor triplet and polynomial).
fn temp_from_triplet(main: u32, ref1: u32, ref2: u32, rt_ref: [f32; 2], poly: [f32; 3], coeff: [f32; 3]) -> Option<f32> {
    let ratio = resistance_ratio(main, ref1, ref2)?;
    let r = resistance_from_ratio(ratio, rt_ref, coeff);
    if r <= 0.0 {
        return None;
    }
    Some(poly2(r.ln(), poly))
}

fn rs41_temp(ptu: &PtuFields, calib: &Calibration) -> f32 {
    temp_from_triplet(ptu.temp_main, ptu.temp_ref1, ptu.temp_ref2, calib.rt_ref, calib.rt_temp_poly, calib.rt_resist_coeff)
        .unwrap_or(f32::NAN)
}

fn rs41_humidity(ptu: &PtuFields, calib: &Calibration) -> f32 {
    let sensor_temp = temp_from_triplet(
        ptu.temp_humidity_main,
        ptu.temp_humidity_ref1,
        ptu.temp_humidity_ref2,
        calib.rt_ref,
        calib.rh_temp_poly,
        calib.rh_resist_coeff,
    )
    .unwrap_or(20.0);

    let ratio = match resistance_ratio(ptu.humidity_main, ptu.humidity_ref1, ptu.humidity_ref2) {
        Some(r) => r,
        None => return f32::NAN,
    };

    let rh = calib.rh_cap_coeff[0] + calib.rh_cap_coeff[1] * ratio;
    let corrected = rh + (sensor_temp - 20.0) * 0.04 * rh;
    corrected.clamp(0.0, 100.0)
}

fn rs41_pressure(ptu: &PtuFields) -> f32 {
    match resistance_ratio(ptu.pressure_main, ptu.pressure_ref1, ptu.pressure_ref2) {
        Some(ratio) => 1013.25 * (1.0 - ratio * 0.8) + ptu.pressure_temp as f32 / 100.0,
        None => f32::NAN,
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct PtuFields {
    temp_main: u32,
    temp_ref1: u32,
    temp_ref2: u32,
    humidity_main: u32,
    humidity_ref1: u32,
    humidity_ref2: u32,
    temp_humidity_main: u32,
    temp_humidity_ref1: u32,
    temp_humidity_ref2: u32,
    pressure_main: u32,
    pressure_ref1: u32,
    pressure_ref2: u32,
    pressure_temp: i16,
}

fn parse_ptu(data: &[u8]) -> Option<PtuFields> {
    if data.len() < 41 {
        return None;
    }
    Some(PtuFields {
        temp_main: u24(&data[0..3]),
        temp_ref1: u24(&data[3..6]),
        temp_ref2: u24(&data[6..9]),
        humidity_main: u24(&data[9..12]),
        humidity_ref1: u24(&data[12..15]),
        humidity_ref2: u24(&data[15..18]),
        temp_humidity_main: u24(&data[18..21]),
        temp_humidity_ref1: u24(&data[21..24]),
        temp_humidity_ref2: u24(&data[24..27]),
        pressure_main: u24(&data[27..30]),
        pressure_ref1: u24(&data[30..33]),
        pressure_ref2: u24(&data[33..36]),
        pressure_temp: i16::from_le_bytes(data[39..41].try_into().unwrap()),
    })
}

/// Decodes RS41 subframes and maintains the rolling calibration-fragment
/// assembler and sane-default `Calibration`.
pub struct Rs41Decoder {
    framer: Framer,
    rs: RsDecoder,
    raw: Vec<u8>,
    calib_fragments: FragmentAssembler,
    calib: Calibration,
}

impl Rs41Decoder {
    pub fn new(sample_rate: f32) -> Self {
        let cfg = DecoderConfig::rs41(sample_rate);
        debug_assert!(cfg.validate().is_ok(), "static RS41 decoder config is valid");
        debug_assert_eq!(cfg.baud_rate, BAUDRATE);
        debug_assert_eq!(cfg.syncword, SYNCWORD);
        debug_assert_eq!(cfg.sync_len_bytes, SYNC_LEN);
        debug_assert_eq!(cfg.framelen_bits, FRAME_LEN_BYTES * 8);

        let rs_params = RsParams::rs41();
        debug_assert_eq!(rs_params.n, RS_N);
        debug_assert_eq!(rs_params.k, RS_K);
        debug_assert_eq!(rs_params.gen_poly, RS_POLY);

        Self {
            framer: Framer::new_gfsk(sample_rate, cfg.baud_rate, cfg.syncword, cfg.sync_len_bytes, cfg.framelen_bits),
            rs: RsDecoder::new_rs(rs_params.n, rs_params.k, rs_params.gen_poly, rs_params.first_root, rs_params.root_skip)
                .expect("static RS41 RS parameters are valid"),
            raw: vec![0u8; FRAME_LEN_BYTES],
            calib_fragments: FragmentAssembler::new(CALIB_FRAGCOUNT, CALIB_FRAGSIZE),
            calib: Calibration::default(),
        }
    }

    fn descramble(&self) -> Vec<u8> {
        let mut out = vec![0u8; FRAME_LEN_BYTES];
        for (i, &b) in self.raw.iter().enumerate() {
            let reversed = BIT_REVERSE[b as usize];
            out[i] = reversed ^ PRN[i % PRN.len()];
        }
        out
    }

    /// Deinterleaves the RS parity and message bytes into two (255,231)
    /// codewords (padded with leading zeros for the common non-extended,
    /// shortened case), corrects each independently, then writes the
    /// corrected bytes back in place.
    fn correct(&self, descrambled: &mut [u8]) {
        let rest = &mut descrambled[SYNC_LEN..];
        let extended = rest[RS_LEN] == FLAG_EXTENDED;
        let payload_len = DATA_LEN + if extended { XDATA_LEN } else { 0 };
        let chunk_len = if extended { RS_K } else { (DATA_LEN + 1) / 2 };
        let pad = RS_K - chunk_len;

        let mut blocks: Vec<Vec<u8>> = vec![vec![0u8; RS_N]; RS_INTERLEAVING];

        for i in 0..payload_len {
            let block = i % RS_INTERLEAVING;
            let pos = pad + i / RS_INTERLEAVING;
            if pos < RS_K {
                blocks[block][pos] = rest[RS_LEN + 1 + i];
            }
        }
        for i in 0..RS_LEN {
            let block = i % RS_INTERLEAVING;
            let pos = RS_K + i / RS_INTERLEAVING;
            blocks[block][pos] = rest[i];
        }

        // A correction that touches the zero-padding prefix (positions
        // `0..pad`, outside the original message range) is never trusted:
        // treat the whole block as uncorrectable and leave its bytes as
        // received rather than committing a bogus fix.
        let mut block_ok = [true; RS_INTERLEAVING];
        for (i, block) in blocks.iter_mut().enumerate() {
            match self.rs.fix_block(block) {
                Correction::Clean => {}
                Correction::Uncorrectable => block_ok[i] = false,
                Correction::Corrected(_) => {
                    if block[..pad].iter().any(|&b| b != 0) {
                        block_ok[i] = false;
                    }
                }
            }
        }

        for i in 0..payload_len {
            let block = i % RS_INTERLEAVING;
            let pos = pad + i / RS_INTERLEAVING;
            if pos < RS_K && block_ok[block] {
                rest[RS_LEN + 1 + i] = blocks[block][pos];
            }
        }
        for i in 0..RS_LEN {
            let block = i % RS_INTERLEAVING;
            let pos = RS_K + i / RS_INTERLEAVING;
            if block_ok[block] {
                rest[i] = blocks[block][pos];
            }
        }
    }

    fn is_ptu_calibrated(&self) -> bool {
        PTU_CALIB_FRAGMENT_RANGE.clone().all(|i| self.calib_fragments.received(i))
    }

    fn parse_subframes(&mut self, out: &mut SondeData, frame: &[u8]) {
        out.fields = DataBitmask::empty();
        let data = &frame[SYNC_LEN + RS_LEN + 1..];
        let extended = frame[SYNC_LEN + RS_LEN] == FLAG_EXTENDED;
        let frame_data_len = DATA_LEN + if extended { XDATA_LEN } else { 0 };

        let mut offset = 0usize;
        while offset + 2 <= frame_data_len.min(data.len()) {
            let sf_type = data[offset];
            let sf_len = data[offset + 1] as usize;
            let payload_start = offset + 2;
            if payload_start + sf_len + 2 > data.len() || sf_len == 0 {
                break;
            }
            let payload = &data[payload_start..payload_start + sf_len];
            let crc_received = u16::from_le_bytes(data[payload_start + sf_len..payload_start + sf_len + 2].try_into().unwrap());

            if crc16_ccitt_false(payload) == crc_received {
                self.dispatch_subframe(out, sf_type, payload);
            }

            offset = payload_start + sf_len + 2;
        }
    }

    fn dispatch_subframe(&mut self, out: &mut SondeData, sf_type: u8, payload: &[u8]) {
        match sf_type {
            SFTYPE_EMPTY => {}
            SFTYPE_INFO if payload.len() >= 40 => {
                out.fields |= DataBitmask::SEQ | DataBitmask::SERIAL;
                out.seq = u16::from_le_bytes(payload[0..2].try_into().unwrap()) as u32;
                out.serial = String::from_utf8_lossy(&payload[2..10]).trim_end_matches('\0').to_string();

                let frag_count = payload[22];
                let frag_seq = payload[23] as usize;
                let _ = frag_count;
                self.calib_fragments.insert(frag_seq, &payload[24..40]);
                self.calib = Calibration::read_from(self.calib_fragments.storage());

                if self.calib.burstkill_timer != 0xFFFF {
                    out.fields |= DataBitmask::SHUTDOWN;
                    out.shutdown = self.calib.burstkill_timer as u32;
                }
            }
            SFTYPE_PTU if payload.len() >= 41 => {
                if let Some(ptu) = parse_ptu(payload) {
                    out.fields |= DataBitmask::PTU;
                    out.temp = rs41_temp(&ptu, &self.calib);
                    out.rh = rs41_humidity(&ptu, &self.calib);
                    out.pressure = rs41_pressure(&ptu);
                    out.calib_percent = self.calib_fragments.percent_complete();
                    out.calibrated = self.is_ptu_calibrated();
                }
            }
            SFTYPE_GPSPOS if payload.len() >= 18 => {
                let x = u32::from_le_bytes(payload[0..4].try_into().unwrap()) as f32 / 100.0;
                let y = u32::from_le_bytes(payload[4..8].try_into().unwrap()) as f32 / 100.0;
                let z = u32::from_le_bytes(payload[8..12].try_into().unwrap()) as f32 / 100.0;
                let dx = i16::from_le_bytes(payload[12..14].try_into().unwrap()) as f32 / 100.0;
                let dy = i16::from_le_bytes(payload[14..16].try_into().unwrap()) as f32 / 100.0;
                let dz = i16::from_le_bytes(payload[16..18].try_into().unwrap()) as f32 / 100.0;

                if let Some((lat, lon, alt)) = ecef_to_lla(x, y, z) {
                    out.fields |= DataBitmask::POS | DataBitmask::SPEED;
                    out.lat = lat;
                    out.lon = lon;
                    out.alt = alt;
                    let (speed, heading, climb) = ecef_to_spd_hdg(lat, lon, dx, dy, dz);
                    out.speed = speed;
                    out.heading = heading;
                    out.climb = climb;
                }
            }
            SFTYPE_GPSINFO if payload.len() >= 6 => {
                let week = u16::from_le_bytes(payload[0..2].try_into().unwrap());
                let ms = u32::from_le_bytes(payload[2..6].try_into().unwrap());
                out.fields |= DataBitmask::TIME;
                out.time = gps_week_ms_to_unix(week as u32, ms);
            }
            SFTYPE_XDATA if payload.len() >= 2 => {
                if !(out.pressure > 0.0) {
                    out.pressure = 1013.25 * (1.0 - out.alt / 44_330.0).powf(5.255);
                }
                out.fields |= DataBitmask::XDATA;
                let ascii = String::from_utf8_lossy(&payload[1..]);
                xdata::decode_ascii(&mut out.xdata, out.pressure, &ascii);
            }
            _ => {}
        }
    }
}

impl SondeDecoder for Rs41Decoder {
    fn decode(&mut self, out: &mut SondeData, samples: &[f32]) -> ParserStatus {
        let mut cursor = 0;
        let mut raw = std::mem::take(&mut self.raw);
        let status = self.framer.read(&mut raw, samples, &mut cursor);
        self.raw = raw;
        if status == ParserStatus::Proceed {
            return ParserStatus::Proceed;
        }

        let mut frame = self.descramble();
        self.correct(&mut frame);
        self.parse_subframes(out, &frame);

        ParserStatus::Parsed
    }
}
