//! The uniform telemetry record yielded by every protocol decoder.

use bitflags::bitflags;

bitflags! {
    /// Indicates which members of [`SondeData`] were populated this frame.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct DataBitmask: u32 {
        const SEQ      = 1 << 0;
        const SERIAL   = 1 << 1;
        const POS      = 1 << 2;
        const SPEED    = 1 << 3;
        const TIME     = 1 << 4;
        const PTU      = 1 << 5;
        const XDATA    = 1 << 6;
        const SHUTDOWN = 1 << 7;
    }
}

/// ENSCI ozone-instrument auxiliary data (§4.6.1).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SondeXdata {
    /// Ozone partial-pressure-derived concentration, in ppb.
    pub o3_ppb: f32,
}

/// One decoded telemetry frame.
///
/// Only the members flagged in `fields` are meaningful; a freshly
/// constructed record ([`SondeData::default`]) has an empty bitmask and all
/// numeric fields at zero.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SondeData {
    pub fields: DataBitmask,

    pub seq: u32,
    pub serial: String,

    /// Degrees North (+) / South (-).
    pub lat: f32,
    /// Degrees East (+) / West (-).
    pub lon: f32,
    /// Meters above MSL.
    pub alt: f32,
    /// Horizontal speed, m/s.
    pub speed: f32,
    /// Climb rate, m/s, positive up.
    pub climb: f32,
    /// Heading, degrees 0..360.
    pub heading: f32,

    /// Seconds since the Unix epoch, UTC.
    pub time: i64,

    pub calibrated: bool,
    pub calib_percent: f32,
    pub temp: f32,
    pub rh: f32,
    pub pressure: f32,

    pub xdata: SondeXdata,

    /// Seconds until burst-kill, if advertised by the sonde.
    pub shutdown: u32,
}

impl SondeData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has(&self, mask: DataBitmask) -> bool {
        self.fields.contains(mask)
    }
}

/// Outcome of one `decode` call (§3, §5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserStatus {
    /// The sample slice was exhausted before a full frame was produced;
    /// call again with more samples.
    Proceed,
    /// A frame boundary was reached. `SondeData.fields` may still be empty
    /// if the frame carried nothing reportable (corrupt, or a subframe type
    /// this decoder doesn't surface).
    Parsed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_record_has_empty_bitmask() {
        let data = SondeData::new();
        assert!(data.fields.is_empty());
        assert!(!data.has(DataBitmask::POS));
    }

    #[test]
    fn bitmask_combines_flags() {
        let mask = DataBitmask::SEQ | DataBitmask::SERIAL;
        assert!(mask.contains(DataBitmask::SEQ));
        assert!(mask.contains(DataBitmask::SERIAL));
        assert!(!mask.contains(DataBitmask::POS));
    }
}
