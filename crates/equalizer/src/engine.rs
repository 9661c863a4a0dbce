//! Parametric EQ engine: profile CRUD, active selection, persistence and
//! the biquad cascade for the active profile.
//!
//! All mutation happens in RAM. Flash is read once in [`ParametricEq::init`]
//! and written back only through [`ParametricEq::start_flash_save`] followed
//! by repeated [`ParametricEq::flash_task`] calls.

use embedded_storage::nor_flash::NorFlash;
use heapless::Vec;
use thiserror_no_std::Error;

use crate::biquad::CascadeState;
use crate::flash::{FlashStatus, FlashWriter, SaveError};
use crate::profile::{DecodeError, EqProfile, ProfileName, MAX_PROFILES};
use crate::store::{ProfileStore, STORE_LEN};

/// Active-profile value meaning "use the two-band EQ instead".
pub const PROFILE_OFF: u8 = 0xFF;

/// Name reported when no profile is active.
pub const OFF_NAME: &str = "OFF";

/// Rejected CRUD request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProfileError {
    /// Slot id outside 0..10.
    #[error("profile id {0} out of range")]
    InvalidId(u8),
    /// A flash save is serializing the store; slots are read-only until it
    /// finishes.
    #[error("profile store locked by flash save")]
    Busy,
}

/// Why [`ParametricEq::init`] fell back to an empty store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LoadError {
    /// The flash region could not be read.
    #[error("profile region unreadable")]
    Read,
    /// The image failed validation.
    #[error("profile store invalid: {0}")]
    Invalid(DecodeError),
}

/// Profile engine over a flash region.
pub struct ParametricEq<F> {
    flash: F,
    store: ProfileStore,
    active: Option<u8>,
    state: CascadeState,
    writer: FlashWriter,
    base: u32,
}

impl<F: NorFlash> ParametricEq<F> {
    /// Engine with an empty store, nothing active. Call [`Self::init`] next.
    ///
    /// `base` is the offset of the profile region inside `flash`.
    pub fn new(flash: F, base: u32) -> Self {
        Self {
            flash,
            store: ProfileStore::new(),
            active: None,
            state: CascadeState::new(),
            writer: FlashWriter::new(base),
            base,
        }
    }

    /// Load the store from flash.
    ///
    /// On any failure the engine falls back to an empty store with no active
    /// profile. The error is returned for logging only; both outcomes leave
    /// the engine fully usable. Filter state is cleared either way.
    pub fn init(&mut self) -> Result<u8, LoadError> {
        self.state.reset();

        let mut image = [0u8; STORE_LEN];
        let loaded = self
            .flash
            .read(self.base, &mut image)
            .map_err(|_| LoadError::Read)
            .and_then(|()| ProfileStore::decode(&image).map_err(LoadError::Invalid));

        match loaded {
            Ok(store) => {
                self.store = store;
                info!("loaded {} profiles from flash", self.store.profile_count);
                Ok(self.store.profile_count)
            }
            Err(e) => {
                match e {
                    LoadError::Invalid(DecodeError::ChecksumMismatch { .. }) => {
                        warn!("profile store CRC mismatch, using defaults");
                    }
                    _ => warn!("no valid profile store in flash"),
                }
                self.store = ProfileStore::new();
                self.active = None;
                Err(e)
            }
        }
    }

    /// Profile in slot `id`, or `None` if out of range or empty.
    pub fn get(&self, id: u8) -> Option<&EqProfile> {
        self.store
            .profiles
            .get(usize::from(id))
            .filter(|p| !p.is_empty())
    }

    /// Overwrite slot `id`. The name is NUL-terminated and the filter count
    /// clamped before storing.
    ///
    /// Rejected with [`ProfileError::Busy`] while a save is being written.
    pub fn set(&mut self, id: u8, profile: &EqProfile) -> Result<(), ProfileError> {
        self.ensure_unlocked()?;
        let slot = self
            .store
            .profiles
            .get_mut(usize::from(id))
            .ok_or(ProfileError::InvalidId(id))?;
        *slot = profile.clone();
        slot.sanitize();
        self.store.recount();
        Ok(())
    }

    /// Clear slot `id`. Deleting the active profile turns profiles off.
    ///
    /// Rejected with [`ProfileError::Busy`] while a save is being written.
    pub fn delete(&mut self, id: u8) -> Result<(), ProfileError> {
        self.ensure_unlocked()?;
        let slot = self
            .store
            .profiles
            .get_mut(usize::from(id))
            .ok_or(ProfileError::InvalidId(id))?;
        *slot = EqProfile::EMPTY;
        self.store.recount();
        if self.active == Some(id) {
            self.active = None;
        }
        Ok(())
    }

    /// The writer serializes the live store on every step, so the slots must
    /// match the sealed checksum until the last unit is programmed.
    fn ensure_unlocked(&self) -> Result<(), ProfileError> {
        if self.is_saving() {
            debug!("profile change rejected, save in progress");
            return Err(ProfileError::Busy);
        }
        Ok(())
    }

    /// A save is being written to flash.
    pub fn is_saving(&self) -> bool {
        self.writer.status() == FlashStatus::Busy
    }

    /// Non-empty slots.
    pub fn profile_count(&self) -> u8 {
        self.store.profile_count
    }

    /// `(id, name)` of every non-empty slot, in slot order.
    pub fn list(&self) -> Vec<(u8, &ProfileName), MAX_PROFILES> {
        let mut out = Vec::new();
        for (id, p) in (0u8..).zip(self.store.profiles.iter()) {
            if !p.is_empty() {
                // at most MAX_PROFILES entries
                let _ = out.push((id, &p.name));
            }
        }
        out
    }

    /// Select the profile driving audio. [`PROFILE_OFF`] selects the
    /// two-band EQ; an out-of-range or empty slot is ignored.
    ///
    /// Filter state is NOT cleared; call [`Self::reset_state`] to avoid a
    /// transient from the previous profile's delay registers.
    pub fn set_active(&mut self, id: u8) {
        if id == PROFILE_OFF {
            self.active = None;
        } else if self.get(id).is_some() {
            self.active = Some(id);
        }
    }

    /// Active slot, `None` when profiles are off.
    pub fn get_active(&self) -> Option<u8> {
        self.active
    }

    /// Active slot as its wire byte ([`PROFILE_OFF`] when off).
    pub fn active_id_byte(&self) -> u8 {
        self.active.unwrap_or(PROFILE_OFF)
    }

    /// Active profile, if it is set and non-empty.
    pub fn active_profile(&self) -> Option<&EqProfile> {
        self.active.and_then(|id| self.get(id))
    }

    /// Name of the active profile or `"OFF"`.
    pub fn active_name(&self) -> &str {
        self.active_profile().map_or(OFF_NAME, |p| p.name.as_str())
    }

    /// Active profile together with the filter state it runs on.
    pub fn active_stage(&mut self) -> Option<(&EqProfile, &mut CascadeState)> {
        let id = self.active?;
        let profile = self
            .store
            .profiles
            .get(usize::from(id))
            .filter(|p| !p.is_empty())?;
        Some((profile, &mut self.state))
    }

    /// Run the active profile over an interleaved stereo buffer.
    ///
    /// Leaves `buf` untouched when no profile is active; in that case the
    /// caller is expected to run the two-band EQ instead.
    pub fn process(&mut self, buf: &mut [i32], volume_scale: u16) {
        if let Some((profile, state)) = self.active_stage() {
            state.process(profile, buf, volume_scale);
        }
    }

    /// Zero every biquad delay register.
    pub fn reset_state(&mut self) {
        self.state.reset();
    }

    /// Filter state (read-only).
    pub fn state(&self) -> &CascadeState {
        &self.state
    }

    /// Seal the store, erase the region and arm the incremental writer.
    ///
    /// Returns [`SaveError::Busy`] without touching flash if a save is in
    /// progress. An erase failure also leaves [`FlashStatus::DoneErr`] for
    /// [`Self::flash_status`].
    pub fn start_flash_save(&mut self) -> Result<(), SaveError> {
        if self.is_saving() {
            return Err(SaveError::Busy);
        }
        self.store.seal();
        self.writer.begin(&mut self.flash, STORE_LEN)
    }

    /// Advance a pending save by one bounded step. Safe to call when idle.
    pub fn flash_task(&mut self) -> FlashStatus {
        let store = &self.store;
        self.writer
            .step(&mut self.flash, |offset, buf| store.encode_window(offset, buf))
    }

    /// Save status; a terminal value is returned once, then `Idle`.
    pub fn flash_status(&mut self) -> FlashStatus {
        self.writer.take_status()
    }

    /// RAM store (read-only).
    pub fn store(&self) -> &ProfileStore {
        &self.store
    }

    /// Flash device (read-only), e.g. to inspect a mock.
    pub fn flash(&self) -> &F {
        &self.flash
    }

    /// Flash device, e.g. to inject faults into a mock.
    pub fn flash_mut(&mut self) -> &mut F {
        &mut self.flash
    }

    /// Give the flash device back.
    pub fn release(self) -> F {
        self.flash
    }
}
