//! Engine selection for the audio fill path.
//!
//! Exactly one EQ runs on each buffer: the active parametric profile if
//! there is one, the two-band EQ otherwise. The choice is made once per fill
//! from the active-profile state, so the two engines can never disagree
//! about who owns the buffer.

use embedded_storage::nor_flash::NorFlash;

use crate::biquad::CascadeState;
use crate::engine::ParametricEq;
use crate::legacy::LegacyEq;
use crate::profile::EqProfile;

/// The EQ selected for one buffer fill.
pub enum ActiveEq<'a> {
    /// Two-band fixed-point EQ.
    Legacy(&'a mut LegacyEq),
    /// Biquad cascade of the active profile.
    Parametric {
        /// Active profile.
        profile: &'a EqProfile,
        /// Its filter state.
        state: &'a mut CascadeState,
    },
}

impl<'a> ActiveEq<'a> {
    /// Pick the parametric engine when a non-empty profile is active.
    pub fn select<F: NorFlash>(legacy: &'a mut LegacyEq, parametric: &'a mut ParametricEq<F>) -> Self {
        match parametric.active_stage() {
            Some((profile, state)) => Self::Parametric { profile, state },
            None => Self::Legacy(legacy),
        }
    }

    /// Is the parametric engine selected?
    pub fn is_parametric(&self) -> bool {
        matches!(self, Self::Parametric { .. })
    }

    /// Process an interleaved stereo buffer in place with volume applied.
    pub fn process(&mut self, buf: &mut [i32], volume_scale: u16) {
        match self {
            Self::Legacy(eq) => eq.process(buf, volume_scale),
            Self::Parametric { profile, state } => state.process(*profile, buf, volume_scale),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biquad::{BiquadFilter, FilterType};
    use crate::engine::PROFILE_OFF;
    use crate::flash::REGION_LEN;
    use platform::mocks::MockFlash;

    #[test]
    fn selection_follows_active_profile() {
        let mut legacy = LegacyEq::new();
        let mut eq = ParametricEq::new(MockFlash::<16, REGION_LEN>::new(REGION_LEN), 0);
        let _ = eq.init();

        assert!(!ActiveEq::select(&mut legacy, &mut eq).is_parametric());

        let f = BiquadFilter {
            b0: 1.0,
            filter_type: FilterType::Bell,
            enabled: true,
            ..BiquadFilter::DISABLED
        };
        eq.set(0, &EqProfile::new("Unity", &[f])).unwrap();
        eq.set_active(0);
        assert!(ActiveEq::select(&mut legacy, &mut eq).is_parametric());

        eq.set_active(PROFILE_OFF);
        assert!(!ActiveEq::select(&mut legacy, &mut eq).is_parametric());
    }

    #[test]
    fn legacy_path_always_mutates_buffer() {
        let mut legacy = LegacyEq::new();
        legacy.set_enabled(false);
        let mut eq = ParametricEq::new(MockFlash::<16, REGION_LEN>::new(REGION_LEN), 0);
        let _ = eq.init();

        let mut buf = [4096, 4096];
        ActiveEq::select(&mut legacy, &mut eq).process(&mut buf, 256);
        assert_eq!(buf, [2303, 2303]);
    }
}
