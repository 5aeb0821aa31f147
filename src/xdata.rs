//! XDATA auxiliary-instrument telemetry (§4.6.1): an ASCII hex-TLV stream
//! piggybacked on the RS41 and iMet-4 subframes, currently supporting the
//! En-Sci ozone sonde.

use crate::record::SondeXdata;

const ENSCI_OZONE_INSTRUMENT_ID: u32 = 0x05;
const DEFAULT_O3_FLOWRATE: f32 = 30.0;

/// Pressure-dependent O3 correction factors, from the En-Sci flight
/// preparation manual. Indexed in parallel with `CF_PRESSURE`; the first
/// threshold the measured pressure is below selects the factor.
const CF_PRESSURE: [f32; 12] = [3.0, 5.0, 7.0, 10.0, 15.0, 20.0, 30.0, 50.0, 70.0, 100.0, 150.0, 200.0];
const CF_FACTOR: [f32; 12] = [
    1.24, 1.124, 1.087, 1.066, 1.048, 1.041, 1.029, 1.018, 1.013, 1.007, 1.002, 1.000,
];

fn o3_correction_factor(pressure: f32) -> f32 {
    for (&threshold, &factor) in CF_PRESSURE.iter().zip(CF_FACTOR.iter()) {
        if pressure < threshold {
            return factor;
        }
    }
    1.0
}

/// Ozone partial pressure, in mPa, from raw cell current/flowrate/pump
/// temperature.
pub fn ozone_mpa(o3_current_ua: f32, o3_flowrate_s: f32, pump_temp_k: f32) -> f32 {
    4.307e-3 * o3_current_ua * pump_temp_k * o3_flowrate_s
}

/// Converts an ozone partial pressure (mPa) to a concentration in ppb at the
/// given ambient pressure (hPa).
pub fn ozone_mpa_to_ppb(o3_mpa: f32, pressure_hpa: f32) -> f32 {
    o3_mpa * o3_correction_factor(pressure_hpa) * 1000.0 / pressure_hpa
}

/// Ozone concentration in ppb, given the raw cell current and pump
/// temperature, assuming the sonde's default flow rate.
pub fn ozone_concentration(pressure_hpa: f32, pump_temp_k: f32, o3_current_ua: f32) -> f32 {
    let mpa = ozone_mpa(o3_current_ua, DEFAULT_O3_FLOWRATE, pump_temp_k);
    ozone_mpa_to_ppb(mpa, pressure_hpa)
}

/// Parses one XDATA ASCII record (a concatenation of 4-hex-digit
/// `instrument_id:instrument_num` headers each followed by an
/// instrument-specific hex payload) and folds any recognized measurements
/// into `xdata`. Unrecognized instrument IDs, and malformed payloads, are
/// skipped rather than treated as a decode failure.
pub fn decode_ascii(xdata: &mut SondeXdata, cur_pressure: f32, ascii: &str) {
    let bytes = ascii.as_bytes();
    let mut pos = 0;

    while pos + 4 <= bytes.len() {
        let header = match std::str::from_utf8(&bytes[pos..pos + 4]).ok().and_then(|s| u32::from_str_radix(s, 16).ok()) {
            Some(h) => h,
            None => break,
        };
        pos += 4;
        let instrument_id = header >> 8;

        match instrument_id {
            ENSCI_OZONE_INSTRUMENT_ID => {
                if pos + 16 > bytes.len() {
                    break;
                }
                let field = std::str::from_utf8(&bytes[pos..pos + 16]).unwrap_or("");
                if let Some((pump_temp, o3_current)) = parse_ensci_ozone_field(field) {
                    xdata.o3_ppb = ozone_concentration(cur_pressure, pump_temp, o3_current);
                }
                pos += 16;
            }
            _ => {
                // Unknown instrument: nothing in the stream tells us its
                // payload length, so there is nothing safe to skip past.
                break;
            }
        }
    }
}

fn parse_ensci_ozone_field(field: &str) -> Option<(f32, f32)> {
    if field.len() < 9 {
        return None;
    }
    let raw_pump_temp = u32::from_str_radix(&field[0..4], 16).ok()?;
    let raw_o3_current = u32::from_str_radix(&field[4..9], 16).ok()?;

    let sign = if raw_pump_temp & 0x8000 != 0 { -1.0 } else { 1.0 };
    let pump_temp = sign * 0.001 * (raw_pump_temp & 0x7FFF) as f32 + 273.15;
    let o3_current = raw_o3_current as f32 * 1e-5;

    Some((pump_temp, o3_current))
}
