//! Two-band fixed-point EQ (bass punch + treble shelf).
//!
//! Runs on interleaved stereo `i32` buffers carrying 24-bit samples. All
//! coefficients are Q12 (4096 = 1.0) tuned for 48 kHz:
//!
//! ```text
//!  in ─► ×0.562 ─┬─► HP 50 Hz ─► LP 180 Hz ─► LP 180 Hz ─► ×gain ─► ± ─┬─► ...
//!                └──────────────────────────────────────────────────────┘
//!  ... ─┬─► (in − LP 1700 Hz) ─► ×gain ─► ± ─► clamp 24-bit ─► ×volume ─► out
//!       └────────────────────────────────────┘
//! ```
//!
//! The user bass level carries a +1 offset, so "0" is already a mild boost
//! and −1 is the true bypass point.

/// −5 dB pre-attenuation (0.562 in Q12).
pub const PREATTENUATION_Q12: i32 = 2303;

/// Lowest user level for either band.
pub const BAND_MIN: i8 = -6;
/// Highest user level for either band.
pub const BAND_MAX: i8 = 6;

const Q12_ONE: i32 = 4096;

const BASS_HP_ALPHA: i32 = 27; // ~50 Hz
const BASS_HP_BETA: i32 = Q12_ONE - BASS_HP_ALPHA;
const BASS_LP_ALPHA: i32 = 95; // ~180 Hz
const BASS_LP_BETA: i32 = Q12_ONE - BASS_LP_ALPHA;
const TREBLE_LP_ALPHA: i32 = 817; // ~1700 Hz
const TREBLE_LP_BETA: i32 = Q12_ONE - TREBLE_LP_ALPHA;

/// Boost/cut depth per absolute level, Q12. Index 7 exists for the bass offset.
const GAIN_TABLE: [i32; 8] = [0, 683, 1365, 2048, 2731, 3413, 4096, 4779];

const SAMPLE_MAX: i32 = 8_388_607;
const SAMPLE_MIN: i32 = -8_388_608;

/// Unity volume scale.
pub const VOLUME_UNITY: u16 = 256;

/// `(a * b) >> 12` without a 64-bit intermediate.
///
/// `a` is split into a signed high part and an unsigned low byte so each
/// partial product of a 24-bit sample and a Q12 gain fits in 32 bits. Error
/// is at most ±1 LSB.
#[inline]
#[must_use]
pub fn mul_q12(a: i32, b: i32) -> i32 {
    let hi = a >> 8;
    let lo = a & 0xFF;
    ((hi.wrapping_mul(b)) >> 4).wrapping_add(lo.wrapping_mul(b) >> 12)
}

/// EQ band selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Band {
    /// 50–180 Hz punch band.
    Bass,
    /// First-order shelf above ~1.7 kHz.
    Treble,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct ChannelState {
    bass_hp_lp: i32,
    bass_lp1: i32,
    bass_lp2: i32,
    treble_lp: i32,
}

/// Two-band fixed-point EQ with per-channel filter memory.
#[derive(Debug, Clone)]
pub struct LegacyEq {
    bass: i8,
    treble: i8,
    enabled: bool,
    channels: [ChannelState; 2],
}

impl Default for LegacyEq {
    fn default() -> Self {
        Self::new()
    }
}

impl LegacyEq {
    /// Both bands at 0, enabled, zeroed state.
    pub const fn new() -> Self {
        Self {
            bass: 0,
            treble: 0,
            enabled: true,
            channels: [ChannelState {
                bass_hp_lp: 0,
                bass_lp1: 0,
                bass_lp2: 0,
                treble_lp: 0,
            }; 2],
        }
    }

    /// Set a band level, clamped to −6..=6.
    pub fn set_band(&mut self, band: Band, level: i8) {
        let level = level.clamp(BAND_MIN, BAND_MAX);
        match band {
            Band::Bass => self.bass = level,
            Band::Treble => self.treble = level,
        }
    }

    /// Current user level of a band.
    pub fn band(&self, band: Band) -> i8 {
        match band {
            Band::Bass => self.bass,
            Band::Treble => self.treble,
        }
    }

    /// Enable or bypass filtering. Disabling also clears filter memory.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.reset_state();
        }
    }

    /// Filtering enabled?
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Zero all filter memory (stream start).
    pub fn reset_state(&mut self) {
        self.channels = [ChannelState::default(); 2];
    }

    /// True when processing reduces to pre-attenuation and volume only.
    pub fn is_bypassed(&self) -> bool {
        !self.enabled || (self.bass == -1 && self.treble == 0)
    }

    /// Process an interleaved stereo buffer in place.
    ///
    /// `volume_scale` is 0..=256 (256 = unity).
    pub fn process(&mut self, buf: &mut [i32], volume_scale: u16) {
        let vol = i32::from(volume_scale);

        if self.is_bypassed() {
            for s in buf.iter_mut() {
                *s = mul_q12(*s, PREATTENUATION_Q12).wrapping_mul(vol) >> 8;
            }
            return;
        }

        // bass -6..=6 plus offset gives -5..=7, treble -6..=6: both index GAIN_TABLE
        #[allow(clippy::arithmetic_side_effects)]
        let effective_bass = self.bass + 1;
        let bass_gain = gain_for(effective_bass).wrapping_mul(3);
        let treble_gain = {
            let g = gain_for(self.treble);
            g.wrapping_add(g >> 2)
        };

        for frame in buf.chunks_exact_mut(2) {
            for (sample, st) in frame.iter_mut().zip(self.channels.iter_mut()) {
                let mut out = mul_q12(*sample, PREATTENUATION_Q12);

                if effective_bass != 0 {
                    let input = out;
                    st.bass_hp_lp = lowpass(st.bass_hp_lp, input, BASS_HP_ALPHA, BASS_HP_BETA);
                    let hp = input.wrapping_sub(st.bass_hp_lp);
                    st.bass_lp1 = lowpass(st.bass_lp1, hp, BASS_LP_ALPHA, BASS_LP_BETA);
                    st.bass_lp2 = lowpass(st.bass_lp2, st.bass_lp1, BASS_LP_ALPHA, BASS_LP_BETA);
                    out = boost_or_cut(input, mul_q12(st.bass_lp2, bass_gain), effective_bass);
                }

                if self.treble != 0 {
                    let input = out;
                    st.treble_lp = lowpass(st.treble_lp, input, TREBLE_LP_ALPHA, TREBLE_LP_BETA);
                    let hp = input.wrapping_sub(st.treble_lp);
                    out = boost_or_cut(input, mul_q12(hp, treble_gain), self.treble);
                }

                out = out.clamp(SAMPLE_MIN, SAMPLE_MAX);
                if volume_scale < VOLUME_UNITY {
                    out = out.wrapping_mul(vol) >> 8;
                }
                *sample = out;
            }
        }
    }
}

fn gain_for(level: i8) -> i32 {
    GAIN_TABLE
        .get(usize::from(level.unsigned_abs()))
        .copied()
        .unwrap_or(0)
}

#[inline]
fn lowpass(state: i32, input: i32, alpha: i32, beta: i32) -> i32 {
    mul_q12(input, alpha).wrapping_add(mul_q12(state, beta))
}

#[inline]
fn boost_or_cut(input: i32, band: i32, level: i8) -> i32 {
    if level > 0 {
        input.wrapping_add(band)
    } else {
        input.wrapping_sub(band)
    }
}
