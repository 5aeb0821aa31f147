//! XDATA En-Sci ozone decoding scenario (§8): a known pump-temperature and
//! cell-current raw field decodes to the expected partial-pressure-derived
//! concentration.

use sonde_decode::record::SondeXdata;
use sonde_decode::xdata::{decode_ascii, ozone_concentration};

#[test]
fn known_raw_field_decodes_to_expected_o3_ppb() {
    let mut xdata = SondeXdata::default();
    // instrument 0x05 (En-Sci ozone), instrument num 0x01, then pump_temp
    // raw 0x07DC and o3_current raw 0x0029A, zero-padded to 16 hex digits.
    decode_ascii(&mut xdata, 50.0, "050107DC0029A0000000");

    assert!((xdata.o3_ppb - 4.797).abs() < 0.01, "got {}", xdata.o3_ppb);
}

#[test]
fn ozone_concentration_matches_the_same_raw_scale_factors() {
    let pump_temp_k = 0.001 * 0x07DC as f32 + 273.15;
    let o3_current_ua = 0x0029A as f32 * 1e-5;

    let ppb = ozone_concentration(50.0, pump_temp_k, o3_current_ua);
    assert!((ppb - 4.797).abs() < 0.01, "got {}", ppb);
}
