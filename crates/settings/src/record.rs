//! Settings values and their 16-byte flash record.
//!
//! ```text
//! 0     1       2      3     4       5           6        7       8..15  15
//! magic volume  muted  bass  treble  brightness  timeout  active  0x00   xor(0..15)
//! ```
//!
//! The magic byte tells a written record apart from erased (0xFF) cells.

use equalizer::legacy::{BAND_MAX, BAND_MIN};
use equalizer::{MAX_PROFILES, PROFILE_OFF};

/// First byte of every written record.
pub const RECORD_MAGIC: u8 = 0xA6;
/// Serialized record size.
pub const RECORD_LEN: usize = 16;
/// Highest display brightness level (0 = low, 1 = mid, 2 = high).
pub const BRIGHTNESS_MAX: u8 = 2;
/// Highest display timeout level (0 = never, 1 = 2 s, 2 = 5 s, 3 = 10 s).
pub const TIMEOUT_MAX: u8 = 3;

const CHECKSUM_AT: usize = RECORD_LEN - 1;

/// User settings that survive a power cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Settings {
    /// Local attenuation dial, 0..=100.
    pub local_volume: u8,
    /// Local mute.
    pub local_muted: bool,
    /// Two-band EQ bass, -6..=6.
    pub bass: i8,
    /// Two-band EQ treble, -6..=6.
    pub treble: i8,
    /// Display brightness level.
    pub brightness: u8,
    /// Display timeout level.
    pub display_timeout: u8,
    /// Active EQ profile slot, or [`PROFILE_OFF`].
    pub active_profile: u8,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            local_volume: 100,
            local_muted: false,
            bass: 0,
            treble: 0,
            brightness: 1,
            display_timeout: 0,
            active_profile: PROFILE_OFF,
        }
    }
}

impl Settings {
    /// Force every field into its valid range.
    ///
    /// An out-of-range profile id becomes [`PROFILE_OFF`].
    #[must_use]
    pub fn clamped(self) -> Self {
        let profile_ok = usize::from(self.active_profile) < MAX_PROFILES;
        Self {
            local_volume: self.local_volume.min(100),
            local_muted: self.local_muted,
            bass: self.bass.clamp(BAND_MIN, BAND_MAX),
            treble: self.treble.clamp(BAND_MIN, BAND_MAX),
            brightness: self.brightness.min(BRIGHTNESS_MAX),
            display_timeout: self.display_timeout.min(TIMEOUT_MAX),
            active_profile: if profile_ok { self.active_profile } else { PROFILE_OFF },
        }
    }

    /// Serialize into a record, checksum included.
    pub fn encode(&self) -> [u8; RECORD_LEN] {
        let mut rec = [0u8; RECORD_LEN];
        let fields = [
            RECORD_MAGIC,
            self.local_volume,
            u8::from(self.local_muted),
            self.bass.to_le_bytes()[0],
            self.treble.to_le_bytes()[0],
            self.brightness,
            self.display_timeout,
            self.active_profile,
        ];
        for (dst, src) in rec.iter_mut().zip(fields) {
            *dst = src;
        }
        let sum = checksum(&rec);
        if let Some(last) = rec.get_mut(CHECKSUM_AT) {
            *last = sum;
        }
        rec
    }

    /// Parse a record. `None` unless magic and checksum match; values are
    /// clamped into range.
    pub fn decode(rec: &[u8; RECORD_LEN]) -> Option<Self> {
        let [magic, volume, muted, bass, treble, brightness, timeout, active, ..] = *rec;
        if magic != RECORD_MAGIC || rec.get(CHECKSUM_AT).copied() != Some(checksum(rec)) {
            return None;
        }
        Some(
            Self {
                local_volume: volume,
                local_muted: muted != 0,
                bass: i8::from_le_bytes([bass]),
                treble: i8::from_le_bytes([treble]),
                brightness,
                display_timeout: timeout,
                active_profile: active,
            }
            .clamped(),
        )
    }
}

/// XOR of bytes `0..15`.
pub fn checksum(rec: &[u8; RECORD_LEN]) -> u8 {
    rec.get(..CHECKSUM_AT)
        .unwrap_or(&[])
        .iter()
        .fold(0, |acc, &b| acc ^ b)
}

/// Every byte still erased?
pub fn is_erased(rec: &[u8; RECORD_LEN]) -> bool {
    rec.iter().all(|&b| b == 0xFF)
}
