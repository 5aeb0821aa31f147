//! WGS-84 ECEF <-> geodetic conversions (§4.6, GPS subframe reconstruction).

use std::f32::consts::PI;

const WGS84_A: f32 = 6_378_137.0;
const WGS84_F: f32 = 1.0 / 298.257_223_563;
const WGS84_B: f32 = WGS84_A * (1.0 - WGS84_F);

fn wgs84_e_sqr() -> f32 {
    (WGS84_A * WGS84_A - WGS84_B * WGS84_B) / (WGS84_A * WGS84_A)
}

fn wgs84_e_prime_sqr() -> f32 {
    (WGS84_A * WGS84_A - WGS84_B * WGS84_B) / (WGS84_B * WGS84_B)
}

/// Converts ECEF `(x, y, z)` meters to `(lat, lon)` degrees and altitude
/// meters above the WGS-84 ellipsoid, via Bowring's closed-form iteration.
/// Returns `None` if any input coordinate is exactly zero (degenerate fix).
pub fn ecef_to_lla(x: f32, y: f32, z: f32) -> Option<(f32, f32, f32)> {
    if x == 0.0 || y == 0.0 || z == 0.0 {
        return None;
    }

    let e_sqr = wgs84_e_sqr();
    let e_prime_sqr = wgs84_e_prime_sqr();

    let lambda = y.atan2(x);
    let p = (x * x + y * y).sqrt();
    let theta = (z * WGS84_A).atan2(p * WGS84_B);
    let sintheta = theta.sin();
    let costheta = theta.cos();

    let phi = (z + e_prime_sqr * WGS84_B * sintheta.powi(3))
        .atan2(p - e_sqr * WGS84_A * costheta.powi(3));
    let sinphi = phi.sin();
    let n = WGS84_A / (1.0 - e_sqr * sinphi * sinphi).sqrt();
    let h = p / phi.cos() - n;

    Some((phi * 180.0 / PI, lambda * 180.0 / PI, h))
}

/// Converts an ECEF velocity vector `(dx, dy, dz)` at geodetic `(lat, lon)`
/// to ground speed, heading (degrees, 0..360), and climb rate, all m/s.
/// Returns `(0, 0, 0)` for a zero velocity vector, matching a stationary fix.
pub fn ecef_to_spd_hdg(lat: f32, lon: f32, dx: f32, dy: f32, dz: f32) -> (f32, f32, f32) {
    if dx == 0.0 && dy == 0.0 && dz == 0.0 {
        return (0.0, 0.0, 0.0);
    }

    let lat = lat * PI / 180.0;
    let lon = lon * PI / 180.0;

    let v_climb = dx * lat.cos() * lon.cos() + dy * lat.cos() * lon.sin() + dz * lat.sin();
    let v_north = -dx * lat.sin() * lon.cos() - dy * lat.sin() * lon.sin() + dz * lat.cos();
    let v_east = -dx * lon.sin() + dy * lon.cos();

    let speed = (v_north * v_north + v_east * v_east).sqrt();
    let mut heading = v_east.atan2(v_north) * 180.0 / PI;
    if heading < 0.0 {
        heading += 360.0;
    }

    (speed, heading, v_climb)
}

/// Converts ground speed, heading, and climb rate back to an ECEF velocity
/// vector `(dx, dy, dz)` at geodetic `(lat, lon)` — the inverse of
/// [`ecef_to_spd_hdg`]. The forward transform's rotation matrix has
/// orthonormal rows (local up/north/east expressed in ECEF axes), so the
/// inverse is just that matrix's transpose applied to `(climb, speed*cos
/// heading, speed*sin heading)`.
pub fn spd_hdg_to_ecef_velocity(lat: f32, lon: f32, speed: f32, heading_deg: f32, climb: f32) -> (f32, f32, f32) {
    let lat = lat * PI / 180.0;
    let lon = lon * PI / 180.0;
    let heading = heading_deg * PI / 180.0;

    let v_north = speed * heading.cos();
    let v_east = speed * heading.sin();

    let dx = climb * lat.cos() * lon.cos() - v_north * lat.sin() * lon.cos() - v_east * lon.sin();
    let dy = climb * lat.cos() * lon.sin() - v_north * lat.sin() * lon.sin() + v_east * lon.cos();
    let dz = climb * lat.sin() + v_north * lat.cos();

    (dx, dy, dz)
}

/// Converts geodetic `(lat, lon, alt)` degrees/meters to ECEF `(x, y, z)`
/// meters, the inverse of [`ecef_to_lla`].
pub fn lla_to_ecef(lat: f32, lon: f32, alt: f32) -> (f32, f32, f32) {
    let e_sqr = wgs84_e_sqr();
    let lat = lat * PI / 180.0;
    let lon = lon * PI / 180.0;

    let sinphi = lat.sin();
    let n = WGS84_A / (1.0 - e_sqr * sinphi * sinphi).sqrt();

    let x = (n + alt) * lat.cos() * lon.cos();
    let y = (n + alt) * lat.cos() * lon.sin();
    let z = (1.0 - e_sqr) * (n + alt) * lat.sin();

    (x, y, z)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_through_ecef() {
        let (lat, lon, alt) = (47.123_f32, 8.456_f32, 412.0_f32);
        let (x, y, z) = lla_to_ecef(lat, lon, alt);
        let (lat2, lon2, alt2) = ecef_to_lla(x, y, z).expect("non-degenerate fix");
        // f32's ~7 significant digits at ECEF's ~6.378e6 m magnitude bottom
        // out well above the cm scale; 1e-4 deg (~11 m on the ground) is the
        // tightest bound this representation can reliably clear.
        assert!((lat - lat2).abs() < 1e-4, "lat {lat} vs {lat2}");
        assert!((lon - lon2).abs() < 1e-4, "lon {lon} vs {lon2}");
        assert!((alt - alt2).abs() < 1.0, "alt {alt} vs {alt2}");
    }

    #[test]
    fn velocity_roundtrips_through_spd_hdg() {
        let (lat, lon) = (47.123_f32, 8.456_f32);
        let (dx, dy, dz) = (12.5_f32, -4.25_f32, 7.0_f32);
        let (speed, heading, climb) = ecef_to_spd_hdg(lat, lon, dx, dy, dz);
        let (dx2, dy2, dz2) = spd_hdg_to_ecef_velocity(lat, lon, speed, heading, climb);
        assert!((dx - dx2).abs() < 1e-3, "dx {dx} vs {dx2}");
        assert!((dy - dy2).abs() < 1e-3, "dy {dy} vs {dy2}");
        assert!((dz - dz2).abs() < 1e-3, "dz {dz} vs {dz2}");
    }

    #[test]
    fn degenerate_coordinates_report_none() {
        assert!(ecef_to_lla(0.0, 1.0, 1.0).is_none());
    }

    #[test]
    fn zero_velocity_is_stationary() {
        assert_eq!(ecef_to_spd_hdg(47.0, 8.0, 0.0, 0.0, 0.0), (0.0, 0.0, 0.0));
    }

    #[test]
    fn heading_is_normalized_to_0_360() {
        let (_, heading, _) = ecef_to_spd_hdg(0.0, 0.0, 0.0, -1.0, 0.0);
        assert!(heading >= 0.0 && heading < 360.0);
    }
}
