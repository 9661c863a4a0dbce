//! Biquad sections and the per-profile cascade.
//!
//! Coefficients come precomputed from the host application, normalized so
//! `a0 = 1`. The device never derives them from frequency, gain or Q; those
//! three are carried only so the host can display them again.
//!
//! Each section runs Direct Form II Transposed:
//!
//! ```text
//! y  = b0·x + s1
//! s1 = b1·x − a1·y + s2
//! s2 = b2·x − a2·y
//! ```

use crate::profile::{EqProfile, MAX_FILTERS};

/// −5 dB pre-attenuation, matching the fixed-point EQ headroom.
pub const PRE_ATTENUATION: f32 = 0.562_341_3;

/// 24-bit full scale.
const SAMPLE_SCALE: f32 = 8_388_608.0;
const SAMPLE_MAX: f32 = 8_388_607.0;
const SAMPLE_MIN: f32 = -8_388_608.0;

/// Filter shape tag. Informational except for [`FilterType::Off`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum FilterType {
    /// Section skipped.
    #[default]
    Off = 0,
    /// Peaking bell.
    Bell = 1,
    /// Low shelf.
    LowShelf = 2,
    /// High shelf.
    HighShelf = 3,
    /// Low pass.
    LowPass = 4,
    /// High pass.
    HighPass = 5,
}

impl FilterType {
    /// Decode the stored type byte. Unknown codes map to `Off`.
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            1 => Self::Bell,
            2 => Self::LowShelf,
            3 => Self::HighShelf,
            4 => Self::LowPass,
            5 => Self::HighPass,
            _ => Self::Off,
        }
    }

    /// Stored type byte.
    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

/// One biquad section plus its display parameters.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BiquadFilter {
    /// Feed-forward coefficient b0.
    pub b0: f32,
    /// Feed-forward coefficient b1.
    pub b1: f32,
    /// Feed-forward coefficient b2.
    pub b2: f32,
    /// Feedback coefficient a1.
    pub a1: f32,
    /// Feedback coefficient a2.
    pub a2: f32,
    /// Centre or corner frequency (Hz), display only.
    pub freq_hz: f32,
    /// Gain (dB), display only.
    pub gain_db: f32,
    /// Quality factor, display only.
    pub q: f32,
    /// Shape tag.
    pub filter_type: FilterType,
    /// Bypass switch.
    pub enabled: bool,
}

impl BiquadFilter {
    /// Zeroed, disabled section.
    pub const DISABLED: Self = Self {
        b0: 0.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
        freq_hz: 0.0,
        gain_db: 0.0,
        q: 0.0,
        filter_type: FilterType::Off,
        enabled: false,
    };

    /// Does this section touch the signal at all?
    pub fn is_active(&self) -> bool {
        self.enabled && self.filter_type != FilterType::Off
    }

    /// Run one sample through the section.
    #[inline]
    pub fn tick(&self, state: &mut BiquadState, x: f32) -> f32 {
        let y = self.b0 * x + state.s1;
        state.s1 = self.b1 * x - self.a1 * y + state.s2;
        state.s2 = self.b2 * x - self.a2 * y;
        y
    }
}

/// DF2T delay registers for one section on one channel.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BiquadState {
    /// First delay register.
    pub s1: f32,
    /// Second delay register.
    pub s2: f32,
}

impl BiquadState {
    /// Both registers zero.
    pub const ZERO: Self = Self { s1: 0.0, s2: 0.0 };
}

/// Delay state for every (section, channel) pair of a cascade.
#[derive(Debug, Clone, PartialEq)]
pub struct CascadeState {
    sections: [[BiquadState; 2]; MAX_FILTERS],
}

impl Default for CascadeState {
    fn default() -> Self {
        Self::new()
    }
}

impl CascadeState {
    /// Zeroed state.
    pub const fn new() -> Self {
        Self {
            sections: [[BiquadState::ZERO; 2]; MAX_FILTERS],
        }
    }

    /// Zero every register.
    pub fn reset(&mut self) {
        self.sections = [[BiquadState::ZERO; 2]; MAX_FILTERS];
    }

    /// True when every register is zero.
    pub fn is_zeroed(&self) -> bool {
        self.sections.iter().flatten().all(|s| *s == BiquadState::ZERO)
    }

    /// State of one section, `channel` 0 = left.
    pub fn section(&self, index: usize, channel: usize) -> Option<&BiquadState> {
        self.sections.get(index).and_then(|s| s.get(channel))
    }

    /// Run `profile` over an interleaved stereo buffer in place.
    ///
    /// Samples are normalized to ±1.0, pushed through every active section
    /// in order, then scaled by the pre-attenuation and `volume_scale / 256`
    /// and clamped back to 24 bits. Disabled sections keep their state
    /// untouched.
    pub fn process(&mut self, profile: &EqProfile, buf: &mut [i32], volume_scale: u16) {
        let gain = PRE_ATTENUATION * f32::from(volume_scale) * (1.0 / 256.0) * SAMPLE_SCALE;

        for frame in buf.chunks_exact_mut(2) {
            for (sample, channel) in frame.iter_mut().zip(0..2) {
                // 24-bit values are exact in f32
                #[allow(clippy::cast_precision_loss)]
                let mut x = *sample as f32 * (1.0 / SAMPLE_SCALE);

                for (filter, states) in profile.filters().iter().zip(self.sections.iter_mut()) {
                    if !filter.is_active() {
                        continue;
                    }
                    if let Some(st) = states.get_mut(channel) {
                        x = filter.tick(st, x);
                    }
                }

                // clamped to the 24-bit range first; `as` truncates toward zero
                #[allow(clippy::cast_possible_truncation)]
                {
                    *sample = (x * gain).clamp(SAMPLE_MIN, SAMPLE_MAX) as i32;
                }
            }
        }
    }
}
