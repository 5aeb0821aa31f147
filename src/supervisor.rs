//! Top-level decoder supervisor (§4.7).
//!
//! This is the only way samples flow into a protocol decoder: callers
//! never touch a [`crate::protocols::SondeDecoder`] directly. In `Auto`
//! mode every decoder runs speculatively against the same samples; the
//! first one to populate a record latches its protocol for subsequent
//! calls. Fixed modes skip the speculation and just run that one decoder.

use crate::protocols::dfm::DfmDecoder;
use crate::protocols::imet4::Imet4Decoder;
use crate::protocols::ims100::Ims100Decoder;
use crate::protocols::m10::M10Decoder;
use crate::protocols::mrz::MrzDecoder;
use crate::protocols::rs41::Rs41Decoder;
use crate::protocols::SondeDecoder;
use crate::record::{DataBitmask, ParserStatus, SondeData};

/// Which protocol the supervisor is currently decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Auto,
    Rs41,
    Dfm,
    Ims100,
    M10,
    Imet4,
    Mrz,
}

/// Supervises every protocol decoder and the double-buffered output record.
///
/// Mirrors the reference `decode()`/`set_active_decoder()` pair: `Auto`
/// probes every decoder each call, and [`Supervisor::set_mode`] latches a
/// fixed protocol and resets the double buffer, matching `decoder_changed`.
pub struct Supervisor {
    mode: Mode,
    rs41: Rs41Decoder,
    dfm: DfmDecoder,
    ims100: Ims100Decoder,
    m10: M10Decoder,
    imet4: Imet4Decoder,
    mrz: MrzDecoder,

    working: SondeData,
    buffer: [SondeData; 2],
    active_slot: usize,
    has_data: bool,
}

impl Supervisor {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            mode: Mode::Auto,
            rs41: Rs41Decoder::new(sample_rate),
            dfm: DfmDecoder::new(sample_rate),
            ims100: Ims100Decoder::new(sample_rate),
            m10: M10Decoder::new(sample_rate),
            imet4: Imet4Decoder::new(sample_rate),
            mrz: MrzDecoder::new(sample_rate),

            working: SondeData::new(),
            buffer: [SondeData::new(), SondeData::new()],
            active_slot: 1,
            has_data: false,
        }
    }

    pub fn active_mode(&self) -> Mode {
        self.mode
    }

    /// Latches a fixed protocol (or re-enters `Auto`), resetting the
    /// double buffer. Does not reset decoder-internal state, matching the
    /// reference's `set_active_decoder` (only `decoder_changed`/buffer are
    /// cleared, not the decoder contexts themselves).
    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
        self.working = SondeData::new();
        self.buffer = [SondeData::new(), SondeData::new()];
        self.active_slot = 1;
        self.has_data = false;
    }

    /// The most recently completed record.
    pub fn data(&self) -> &SondeData {
        let idx = (self.active_slot + 1) % self.buffer.len();
        &self.buffer[idx]
    }

    fn merge(&mut self, frame: &SondeData) {
        if frame.fields.is_empty() {
            return;
        }
        self.has_data = true;
        self.working.fields |= frame.fields;
        if frame.fields.contains(DataBitmask::SEQ) {
            self.working.seq = frame.seq;
        }
        if frame.fields.contains(DataBitmask::SERIAL) {
            self.working.serial = frame.serial.clone();
        }
        if frame.fields.contains(DataBitmask::POS) {
            self.working.lat = frame.lat;
            self.working.lon = frame.lon;
            self.working.alt = frame.alt;
            self.working.climb = frame.climb;
            self.working.heading = frame.heading;
        }
        if frame.fields.contains(DataBitmask::SPEED) {
            self.working.speed = frame.speed;
        }
        if frame.fields.contains(DataBitmask::TIME) {
            self.working.time = frame.time;
        }
        if frame.fields.contains(DataBitmask::PTU) {
            self.working.calibrated = frame.calibrated;
            self.working.calib_percent = frame.calib_percent;
            self.working.temp = frame.temp;
            self.working.rh = frame.rh;
            self.working.pressure = frame.pressure;
        }
        if frame.fields.contains(DataBitmask::XDATA) {
            self.working.xdata = frame.xdata;
        }
        if frame.fields.contains(DataBitmask::SHUTDOWN) {
            self.working.shutdown = frame.shutdown;
        }
    }

    fn swap_buffers(&mut self) {
        if self.has_data {
            let idx = (self.active_slot + 1) % self.buffer.len();
            self.buffer[idx] = self.working.clone();
            self.active_slot = idx;
            self.has_data = false;
        }
        self.working = SondeData::new();
    }

    /// Decodes one chunk of samples. Returns `Parsed` once a frame
    /// boundary is reached across every active decoder (even if nothing
    /// was reportable), matching each decoder's own contract.
    pub fn decode(&mut self, samples: &[f32]) -> ParserStatus {
        match self.mode {
            Mode::Auto => {
                let mut any_proceed = false;
                let mut latched = None;

                any_proceed |= Self::probe(&mut self.rs41, samples, Mode::Rs41, &mut latched);
                any_proceed |= Self::probe(&mut self.dfm, samples, Mode::Dfm, &mut latched);
                any_proceed |= Self::probe(&mut self.m10, samples, Mode::M10, &mut latched);
                any_proceed |= Self::probe(&mut self.ims100, samples, Mode::Ims100, &mut latched);
                any_proceed |= Self::probe(&mut self.imet4, samples, Mode::Imet4, &mut latched);
                any_proceed |= Self::probe(&mut self.mrz, samples, Mode::Mrz, &mut latched);

                if let Some(mode) = latched {
                    self.set_mode(mode);
                    return ParserStatus::Parsed;
                }

                if any_proceed {
                    return ParserStatus::Proceed;
                }

                self.swap_buffers();
                ParserStatus::Parsed
            }
            Mode::Rs41 => self.run_fixed(samples, |d, out, s| d.rs41.decode(out, s)),
            Mode::Dfm => self.run_fixed(samples, |d, out, s| d.dfm.decode(out, s)),
            Mode::M10 => self.run_fixed(samples, |d, out, s| d.m10.decode(out, s)),
            Mode::Ims100 => self.run_fixed(samples, |d, out, s| d.ims100.decode(out, s)),
            Mode::Imet4 => self.run_fixed(samples, |d, out, s| d.imet4.decode(out, s)),
            Mode::Mrz => self.run_fixed(samples, |d, out, s| d.mrz.decode(out, s)),
        }
    }

    /// Runs a single probe in `Auto` mode: once some decoder has already
    /// latched this call, the rest are skipped (matching the reference's
    /// early exit once `decoder_changed` fires). Returns `true` if the
    /// decoder wants more samples.
    fn probe<D: SondeDecoder>(decoder: &mut D, samples: &[f32], mode: Mode, latched: &mut Option<Mode>) -> bool {
        if latched.is_some() {
            return false;
        }
        let mut candidate = SondeData::new();
        match decoder.decode(&mut candidate, samples) {
            ParserStatus::Proceed => true,
            ParserStatus::Parsed => {
                if !candidate.fields.is_empty() {
                    *latched = Some(mode);
                }
                false
            }
        }
    }

    fn run_fixed<F>(&mut self, samples: &[f32], f: F) -> ParserStatus
    where
        F: FnOnce(&mut Self, &mut SondeData, &[f32]) -> ParserStatus,
    {
        let mut frame = SondeData::new();
        let status = f(self, &mut frame, samples);
        if status == ParserStatus::Proceed {
            return ParserStatus::Proceed;
        }
        self.merge(&frame);
        self.swap_buffers();
        ParserStatus::Parsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_in_auto_mode() {
        let sup = Supervisor::new(48_000.0);
        assert_eq!(sup.active_mode(), Mode::Auto);
    }

    #[test]
    fn set_mode_resets_the_double_buffer() {
        let mut sup = Supervisor::new(48_000.0);
        sup.working.fields = DataBitmask::POS;
        sup.has_data = true;
        sup.set_mode(Mode::Rs41);
        assert_eq!(sup.active_mode(), Mode::Rs41);
        assert!(sup.working.fields.is_empty());
        assert!(!sup.has_data);
    }

    #[test]
    fn merge_only_touches_flagged_fields() {
        let mut sup = Supervisor::new(48_000.0);
        let mut frame = SondeData::new();
        frame.fields = DataBitmask::PTU;
        frame.temp = 12.5;
        frame.lat = 999.0; // not flagged POS; must not propagate
        sup.merge(&frame);
        assert_eq!(sup.working.temp, 12.5);
        assert_eq!(sup.working.lat, 0.0);
    }

    #[test]
    fn swap_buffers_is_a_no_op_without_data() {
        let mut sup = Supervisor::new(48_000.0);
        let before = sup.active_slot;
        sup.swap_buffers();
        assert_eq!(sup.active_slot, before);
    }
}
