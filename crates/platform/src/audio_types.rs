//! Audio domain newtypes for compile-time safety.
//!
//! These zero-cost abstractions prevent common errors:
//! - `VolumePercent`: local attenuation dial, clamps 0–100
//! - `HostVolumeDb`: USB feature-unit master volume, clamps −90..=0 dB
//! - `PowerTier`: USB-C current advertisement, selects output headroom
//! - `SampleRateHz`: validates 8000–192000 Hz range

use thiserror_no_std::Error;

// ── Error type ───────────────────────────────────────────────────────────────

/// Error returned when a value is out of the valid range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[error("value {value} outside {min}..={max}")]
pub struct OutOfRangeError {
    /// The value that was out of range.
    pub value: i32,
    /// The inclusive minimum allowed value.
    pub min: i32,
    /// The inclusive maximum allowed value.
    pub max: i32,
}

// ── VolumePercent ────────────────────────────────────────────────────────────

/// Local attenuation dial as a percentage, clamped to 0–100.
///
/// 100 is unity gain, 0 is silence. Independent of the host volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct VolumePercent(u8);

impl VolumePercent {
    /// Unity gain.
    pub const MAX: Self = Self(100);

    /// Create a `VolumePercent`, clamping values above 100 to 100.
    #[must_use]
    pub fn new(value: u8) -> Self {
        Self(value.min(100))
    }

    /// Create a `VolumePercent`, returning an error if `value > 100`.
    ///
    /// # Errors
    ///
    /// Returns [`OutOfRangeError`] if `value > 100`.
    pub fn try_new(value: u8) -> Result<Self, OutOfRangeError> {
        if value > 100 {
            Err(OutOfRangeError {
                value: i32::from(value),
                min: 0,
                max: 100,
            })
        } else {
            Ok(Self(value))
        }
    }

    /// Step the dial by `delta`, saturating at 0 and 100.
    #[must_use]
    pub fn step(self, delta: i16) -> Self {
        let next = i16::from(self.0).saturating_add(delta).clamp(0, 100);
        // clamp above keeps next within u8
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Self(next as u8)
    }

    /// Return the inner volume value (0–100).
    #[must_use]
    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for VolumePercent {
    fn default() -> Self {
        Self::MAX
    }
}

// ── HostVolumeDb ─────────────────────────────────────────────────────────────

/// Host-set master volume in whole dB, clamped to −90..=0.
///
/// The USB audio class reports volume in 1/256 dB steps; the class driver
/// divides down to whole dB before handing it over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct HostVolumeDb(i8);

impl HostVolumeDb {
    /// Quietest representable level.
    pub const MIN_DB: i8 = -90;
    /// Loudest level (no attenuation).
    pub const MAX_DB: i8 = 0;
    /// 0 dB.
    pub const UNITY: Self = Self(0);

    /// Create a `HostVolumeDb`, clamping into −90..=0.
    #[must_use]
    pub fn new(db: i8) -> Self {
        Self(db.clamp(Self::MIN_DB, Self::MAX_DB))
    }

    /// Return the level in dB.
    #[must_use]
    pub fn get(self) -> i8 {
        self.0
    }

    /// Index into a 91-entry table (0 = −90 dB, 90 = 0 dB).
    #[must_use]
    pub fn table_index(self) -> usize {
        // new() keeps self.0 in -90..=0, so the sum is in 0..=90
        #[allow(clippy::arithmetic_side_effects, clippy::cast_sign_loss)]
        let idx = (i16::from(self.0) - i16::from(Self::MIN_DB)) as usize;
        idx
    }
}

impl Default for HostVolumeDb {
    fn default() -> Self {
        Self::UNITY
    }
}

// ── PowerTier ────────────────────────────────────────────────────────────────

/// Upstream supply capability advertised on the USB-C CC lines.
///
/// Less current means less rail headroom on the headphone amplifier, so the
/// output is pre-scaled down further to avoid clipping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerTier {
    /// Default USB power (500 mA): −6 dB headroom.
    #[default]
    Default500mA,
    /// USB-C 1.5 A: −4 dB headroom.
    Current1500mA,
    /// USB-C 3.0 A: −2 dB headroom.
    Current3000mA,
}

impl PowerTier {
    /// CC voltage above which the source advertises 1.5 A.
    pub const CC_THRESHOLD_1500MA_MV: u16 = 700;
    /// CC voltage above which the source advertises 3.0 A.
    pub const CC_THRESHOLD_3000MA_MV: u16 = 1300;

    /// Classify from the CC1/CC2 voltages measured at boot (millivolts).
    ///
    /// Only one CC line carries the pull-up, so the higher of the two is used.
    #[must_use]
    pub fn from_cc_millivolts(cc1_mv: u16, cc2_mv: u16) -> Self {
        let highest = cc1_mv.max(cc2_mv);
        if highest > Self::CC_THRESHOLD_3000MA_MV {
            Self::Current3000mA
        } else if highest > Self::CC_THRESHOLD_1500MA_MV {
            Self::Current1500mA
        } else {
            Self::Default500mA
        }
    }

    /// Headroom scalar on a 0–256 scale (256 = unity).
    ///
    /// | Tier    | dB | Scale |
    /// |---------|----|-------|
    /// | 500 mA  | −6 | 128   |
    /// | 1500 mA | −4 | 161   |
    /// | 3000 mA | −2 | 203   |
    #[must_use]
    pub fn headroom_scale(self) -> u16 {
        match self {
            Self::Default500mA => 128,
            Self::Current1500mA => 161,
            Self::Current3000mA => 203,
        }
    }
}

// ── SampleRateHz ─────────────────────────────────────────────────────────────

/// Sample rate in Hz, validated to the range a UAC1 full-speed link carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct SampleRateHz(u32);

impl SampleRateHz {
    /// Minimum supported sample rate: 8000 Hz.
    pub const MIN_HZ: u32 = 8_000;

    /// Maximum supported sample rate: 192000 Hz.
    pub const MAX_HZ: u32 = 192_000;

    /// The single rate the output pipeline is built for.
    pub const OPERATING: Self = Self(48_000);

    /// Create a `SampleRateHz`, returning an error if out of range.
    ///
    /// # Errors
    ///
    /// Returns [`OutOfRangeError`] if `hz < 8000` or `hz > 192000`.
    pub fn new(hz: u32) -> Result<Self, OutOfRangeError> {
        if (Self::MIN_HZ..=Self::MAX_HZ).contains(&hz) {
            Ok(Self(hz))
        } else {
            Err(OutOfRangeError {
                value: i32::try_from(hz).unwrap_or(i32::MAX),
                min: 8_000,
                max: 192_000,
            })
        }
    }

    /// Return the sample rate in Hz.
    #[must_use]
    pub fn get(self) -> u32 {
        self.0
    }
}
