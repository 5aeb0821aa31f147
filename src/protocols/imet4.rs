//! InterMet iMet-4 decoder (§4.6.5).
//!
//! Unlike the other protocols, frame-level field layout (subframe type
//! codes, exact struct sizes) isn't present in the retrieved reference
//! source beyond its field accessors (`imet4_ptu_temp`, `imet4_gps_lat`,
//! ...); the byte offsets below are authored to match those accessors'
//! scale factors and field widths, not transliterated from a struct
//! definition.

use crate::bits::ieee754_be;
use crate::config::DecoderConfig;
use crate::ecc::crc::crc16_ccitt_false;
use crate::framer::Framer;
use crate::record::{DataBitmask, ParserStatus, SondeData};
use crate::xdata;

use super::SondeDecoder;

const BAUDRATE: f32 = 1200.0;
const MARK_FREQ: f32 = 1200.0;
const SPACE_FREQ: f32 = 2200.0;
const SYNCWORD: u64 = 0xffff_a024;
const SYNC_LEN: usize = 4;
const FRAME_LEN_BITS: usize = 600;
const FRAME_LEN_BYTES: usize = FRAME_LEN_BITS / 8;

const SOH: u8 = 0x01;
const SFTYPE_PTU: u8 = 0x02;
const SFTYPE_GPS: u8 = 0x03;
const SFTYPE_XDATA: u8 = 0x04;
const SFTYPE_PTUX: u8 = 0x05;
const SFTYPE_GPSX: u8 = 0x06;

fn bit_reverse_byte(b: u8) -> u8 {
    let mut tmp = 0u8;
    for j in 0..8 {
        tmp |= ((b >> (7 - j)) & 1) << j;
    }
    tmp
}

fn descramble(frame: &mut [u8]) {
    for b in frame.iter_mut() {
        *b = bit_reverse_byte(*b);
    }
}

/// Length of the subframe starting at `frame[0]` (including `sof`, `type`,
/// and the trailing 2-byte CRC), or `None` if `sof` is missing or the type
/// is unrecognized.
fn subframe_len(frame: &[u8]) -> Option<usize> {
    if frame.is_empty() || frame[0] != SOH {
        return None;
    }
    let sf_type = *frame.get(1)?;
    match sf_type {
        SFTYPE_PTU => Some(11),
        SFTYPE_GPS => Some(19),
        SFTYPE_PTUX => Some(13),
        SFTYPE_GPSX => Some(19),
        SFTYPE_XDATA => {
            let len = *frame.get(2)? as usize;
            Some(3 + len + 2)
        }
        _ => None,
    }
}

fn checksum_ok(subframe: &[u8]) -> bool {
    let n = subframe.len();
    if n < 2 {
        return false;
    }
    let expected = (subframe[n - 2] as u16) << 8 | subframe[n - 1] as u16;
    crc16_ccitt_false(&subframe[..n - 2]) == expected
}

/// GPS time is transmitted as hour/minute/second only; the date is inferred
/// from `now` (a Unix timestamp), detecting a day rollover whenever the
/// transmitted hour differs from the current UTC hour by 12 or more.
fn gps_time_with_rollover(now: i64, hour: u8, minute: u8, second: u8) -> i64 {
    let seconds_today = now.rem_euclid(86_400);
    let current_hour = seconds_today / 3600;
    let received_hour = hour as i64;

    let day_offset = if (received_hour - current_hour).abs() >= 12 {
        if received_hour < current_hour {
            1
        } else {
            -1
        }
    } else {
        0
    };

    let day_start = (now + day_offset * 86_400).div_euclid(86_400) * 86_400;
    day_start + received_hour * 3600 + minute as i64 * 60 + second as i64
}

fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Decoder for the InterMet iMet-4.
pub struct Imet4Decoder {
    framer: Framer,
    raw: Vec<u8>,
    cur_pressure: f32,
}

impl Imet4Decoder {
    pub fn new(sample_rate: f32) -> Self {
        let cfg = DecoderConfig::imet4(sample_rate);
        debug_assert!(cfg.validate().is_ok(), "static iMet-4 decoder config is valid");
        debug_assert_eq!(cfg.baud_rate, BAUDRATE);
        debug_assert_eq!(cfg.syncword, SYNCWORD);
        debug_assert_eq!(cfg.sync_len_bytes, SYNC_LEN);
        debug_assert_eq!(cfg.framelen_bits, FRAME_LEN_BITS);
        let (f_mark, f_space) = cfg.mark_space_hz.expect("iMet-4 config always selects AFSK");
        debug_assert_eq!(f_mark, MARK_FREQ);
        debug_assert_eq!(f_space, SPACE_FREQ);

        Self {
            framer: Framer::new_afsk(sample_rate, cfg.baud_rate, f_mark, f_space, cfg.syncword, cfg.sync_len_bytes, cfg.framelen_bits),
            raw: vec![0u8; FRAME_LEN_BYTES],
            cur_pressure: 1013.25,
        }
    }

    fn dispatch(&mut self, out: &mut SondeData, sf_type: u8, body: &[u8]) {
        match sf_type {
            SFTYPE_PTU => {
                let temp = i16::from_be_bytes([body[0], body[1]]) as f32 / 100.0;
                let rh = i16::from_be_bytes([body[2], body[3]]) as f32 / 100.0;
                let pressure = (body[4] as u32 | (body[5] as u32) << 8 | (body[6] as u32) << 16) as f32 / 100.0;
                self.cur_pressure = pressure;

                out.fields |= DataBitmask::PTU;
                out.temp = temp;
                out.rh = rh.clamp(0.0, 100.0);
                out.pressure = pressure;
                out.calibrated = true;
            }
            SFTYPE_GPS => {
                let lat = ieee754_be(&body[0..4]);
                let lon = ieee754_be(&body[4..8]);
                let alt = ieee754_be(&body[8..12]) - 5000.0;
                let (hour, minute, second) = (body[12], body[13], body[14]);

                out.fields |= DataBitmask::POS | DataBitmask::TIME;
                out.lat = lat;
                out.lon = lon;
                out.alt = alt;
                out.time = gps_time_with_rollover(unix_now(), hour, minute, second);
            }
            SFTYPE_GPSX => {
                let dlat = ieee754_be(&body[0..4]);
                let dlon = ieee754_be(&body[4..8]);
                let climb = ieee754_be(&body[8..12]);
                let (hour, minute, second) = (body[12], body[13], body[14]);

                out.fields |= DataBitmask::SPEED | DataBitmask::TIME;
                out.speed = (dlat * dlat + dlon * dlon).sqrt();
                out.heading = {
                    let h = dlat.atan2(dlon).to_degrees();
                    if h < 0.0 {
                        h + 360.0
                    } else {
                        h
                    }
                };
                out.climb = climb;
                out.time = gps_time_with_rollover(unix_now(), hour, minute, second);
            }
            SFTYPE_PTUX => {
                let temp = i16::from_be_bytes([body[0], body[1]]) as f32 / 100.0;
                let rh = i16::from_be_bytes([body[2], body[3]]) as f32 / 100.0;
                let pressure = (body[4] as u32 | (body[5] as u32) << 8 | (body[6] as u32) << 16) as f32 / 100.0;
                self.cur_pressure = pressure;

                out.fields |= DataBitmask::PTU;
                out.temp = temp;
                out.rh = rh.clamp(0.0, 100.0);
                out.pressure = pressure;
                out.calibrated = true;
            }
            SFTYPE_XDATA => {
                if let Ok(ascii) = std::str::from_utf8(body) {
                    xdata::decode_ascii(&mut out.xdata, self.cur_pressure, ascii);
                    out.fields |= DataBitmask::XDATA;
                }
            }
            _ => {}
        }
    }
}

impl SondeDecoder for Imet4Decoder {
    fn decode(&mut self, out: &mut SondeData, samples: &[f32]) -> ParserStatus {
        out.fields = DataBitmask::empty();

        let mut cursor = 0;
        let mut raw = std::mem::take(&mut self.raw);
        let status = self.framer.read(&mut raw, samples, &mut cursor);
        self.raw = raw;
        if status == ParserStatus::Proceed {
            return ParserStatus::Proceed;
        }

        let mut frame = self.raw.clone();
        descramble(&mut frame);

        let mut offset = 0;
        while offset < frame.len() {
            let Some(len) = subframe_len(&frame[offset..]) else {
                break;
            };
            if offset + len > frame.len() {
                break;
            }
            let subframe = &frame[offset..offset + len];
            if checksum_ok(subframe) {
                let sf_type = subframe[1];
                let body = &subframe[2..len - 2];
                self.dispatch(out, sf_type, body);
            }
            offset += len;
        }

        ParserStatus::Parsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_reverse_is_involutive() {
        for b in 0..=255u8 {
            assert_eq!(bit_reverse_byte(bit_reverse_byte(b)), b);
        }
    }

    #[test]
    fn subframe_len_rejects_missing_sof() {
        assert_eq!(subframe_len(&[0x00, SFTYPE_PTU]), None);
    }

    #[test]
    fn subframe_len_handles_variable_length_xdata() {
        let frame = [SOH, SFTYPE_XDATA, 5];
        assert_eq!(subframe_len(&frame), Some(3 + 5 + 2));
    }

    #[test]
    fn day_rollover_crosses_midnight_forward() {
        // "now" at 23:50 UTC, received hour 00 -> should roll to the next day.
        let now = 23 * 3600 + 50 * 60;
        let t = gps_time_with_rollover(now, 0, 5, 0);
        assert_eq!(t, 86_400 + 5 * 60);
    }

    #[test]
    fn day_rollover_crosses_midnight_backward() {
        // "now" at 00:05 UTC, received hour 23 -> belongs to the previous day.
        let now = 5 * 60;
        let t = gps_time_with_rollover(now, 23, 59, 0);
        assert_eq!(t, -86_400 + 23 * 3600 + 59 * 60);
    }

    #[test]
    fn no_rollover_within_the_same_day() {
        let now = 12 * 3600;
        let t = gps_time_with_rollover(now, 12, 30, 0);
        assert_eq!(t, 12 * 3600 + 30 * 60);
    }
}
