//! Output gain computation.
//!
//! Three independent controls multiply into one 0–256 scale (256 = unity)
//! handed to the EQ stage:
//!
//! ```text
//! scale = table[host_db + 90] × headroom[power] >> 8      host × supply
//!       = scale × (local² × 256 / 10000) >> 8             × local dial
//! ```
//!
//! Either mute forces the scale to 0.

use platform::audio_types::{HostVolumeDb, PowerTier, VolumePercent};

/// Unity gain on the 0–256 scale.
pub const UNITY_SCALE: u16 = 256;

/// Host volume curve: `round(256 * (i / 90)^5)` for `i` = dB + 90.
///
/// The fifth-power curve spreads the audible range over the whole host
/// slider instead of bunching it into the top few dB.
pub const HOST_VOLUME_TABLE: [u16; 91] = [
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, //
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, //
    0, 0, 0, 0, 0, 0, 1, 1, 1, 1, //
    1, 1, 2, 2, 2, 2, 3, 3, 3, 4, //
    5, 5, 6, 7, 8, 8, 9, 10, 11, 12, //
    14, 15, 17, 19, 20, 22, 24, 26, 29, 32, //
    34, 37, 40, 43, 47, 51, 55, 59, 64, 69, //
    72, 78, 84, 90, 97, 103, 110, 118, 126, 135, //
    142, 151, 161, 171, 181, 192, 204, 216, 229, 243, //
    256,
];

/// Host volume on the 0–256 scale.
pub fn host_scale(db: HostVolumeDb) -> u16 {
    HOST_VOLUME_TABLE
        .get(db.table_index())
        .copied()
        .unwrap_or(UNITY_SCALE)
}

/// Local dial on the 0–256 scale: `vol² × 256 / 10000`.
///
/// | dial | scale |
/// |------|-------|
/// | 50   | 64    |
/// | 75   | 144   |
/// | 100  | 256   |
pub fn local_scale(volume: VolumePercent) -> u16 {
    let v = u32::from(volume.get());
    // v <= 100, so v² × 256 <= 2_560_000 and the quotient <= 256
    #[allow(clippy::arithmetic_side_effects, clippy::cast_possible_truncation)]
    let scale = (v * v * 256 / 10_000) as u16;
    scale
}

/// Combine host volume, supply headroom and the local dial.
pub fn combined_scale(host: HostVolumeDb, power: PowerTier, local: VolumePercent) -> u16 {
    let mut scale = u32::from(host_scale(host));
    // every factor is <= 256, so each product fits easily and the result <= 256
    #[allow(clippy::arithmetic_side_effects)]
    {
        scale = (scale * u32::from(power.headroom_scale())) >> 8;
        scale = (scale * u32::from(local_scale(local))) >> 8;
    }
    u16::try_from(scale).unwrap_or(UNITY_SCALE)
}

/// Device-side gain controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct VolumeState {
    /// Local attenuation dial (rotary encoder).
    pub local: VolumePercent,
    /// Local mute (encoder push).
    pub local_muted: bool,
    /// Host mute (USB feature unit).
    pub host_muted: bool,
    /// Supply headroom tier detected at boot.
    pub power: PowerTier,
}

impl VolumeState {
    /// Either mute active?
    pub fn is_muted(&self) -> bool {
        self.local_muted || self.host_muted
    }

    /// Scale for the current host volume; 0 while muted.
    pub fn scale(&self, host: HostVolumeDb) -> u16 {
        if self.is_muted() {
            0
        } else {
            combined_scale(host, self.power, self.local)
        }
    }
}
