//! Sequential-record settings page.
//!
//! Records are appended one after another into a single erase page; the
//! newest valid record wins. The page is erased only when every slot has
//! been used, so a page of 128 records takes 128 saves per erase cycle.
//!
//! ```text
//! page: [rec 0][rec 1][rec 2][FF..FF][FF..FF] ...
//!                         ▲      ▲
//!                  load() │      │ save() appends here
//! ```

use embedded_storage::nor_flash::NorFlash;
use platform::IntegrityFault;
use thiserror_no_std::Error;

use crate::record::{is_erased, Settings, RECORD_LEN};

/// Erase page size.
pub const PAGE_LEN: usize = 2048;
/// Record slots per page.
pub const RECORDS_PER_PAGE: usize = PAGE_LEN / RECORD_LEN;

/// Settings flash failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SettingsError {
    /// Reading the page failed.
    #[error("settings page read failed")]
    Read,
    /// Erasing the page failed.
    #[error("settings page erase failed")]
    Erase,
    /// Programming the record failed.
    #[error("settings record write failed")]
    Program,
}

/// Settings page at `base` inside `flash`.
pub struct SettingsStore<F> {
    flash: F,
    base: u32,
}

impl<F: NorFlash> SettingsStore<F> {
    /// Bind the page. `base` must be page-aligned.
    pub fn new(flash: F, base: u32) -> Self {
        Self { flash, base }
    }

    fn slot_addr(&self, slot: usize) -> u32 {
        // slot < RECORDS_PER_PAGE keeps the offset inside the page
        #[allow(clippy::arithmetic_side_effects)]
        let offset = slot * RECORD_LEN;
        self.base
            .saturating_add(u32::try_from(offset).unwrap_or(u32::MAX))
    }

    fn read_slot(&mut self, slot: usize) -> Result<[u8; RECORD_LEN], SettingsError> {
        let mut rec = [0u8; RECORD_LEN];
        let addr = self.slot_addr(slot);
        self.flash
            .read(addr, &mut rec)
            .map_err(|_| SettingsError::Read)?;
        Ok(rec)
    }

    fn erase_page(&mut self) -> Result<(), SettingsError> {
        let end = self
            .base
            .saturating_add(u32::try_from(PAGE_LEN).unwrap_or(u32::MAX));
        self.flash
            .erase(self.base, end)
            .map_err(|_| SettingsError::Erase)
    }

    /// Newest valid record, or `None` (use defaults).
    ///
    /// A read error, or an ECC fault latched in `fault` while scanning, means
    /// the page cannot be trusted: it is erased and `None` returned.
    pub fn load(&mut self, fault: &IntegrityFault) -> Option<Settings> {
        let mut found = Ok(None);
        for slot in (0..RECORDS_PER_PAGE).rev() {
            match self.read_slot(slot) {
                Ok(rec) => {
                    if let Some(settings) = Settings::decode(&rec) {
                        found = Ok(Some(settings));
                        break;
                    }
                }
                Err(e) => {
                    found = Err(e);
                    break;
                }
            }
        }

        if fault.take() || found.is_err() {
            warn!("settings page unreadable, erasing");
            if self.erase_page().is_err() {
                error!("settings page erase failed");
            }
            return None;
        }

        match found {
            Ok(Some(settings)) => {
                info!("settings loaded");
                Some(settings)
            }
            _ => {
                info!("no valid settings, using defaults");
                None
            }
        }
    }

    /// First fully erased slot.
    fn next_free_slot(&mut self) -> Result<Option<usize>, SettingsError> {
        for slot in 0..RECORDS_PER_PAGE {
            if is_erased(&self.read_slot(slot)?) {
                return Ok(Some(slot));
            }
        }
        Ok(None)
    }

    /// Append `settings`, erasing the page first if it is full.
    pub fn save(&mut self, settings: &Settings) -> Result<(), SettingsError> {
        let slot = if let Some(slot) = self.next_free_slot()? {
            slot
        } else {
            debug!("settings page full, erasing");
            self.erase_page()?;
            0
        };

        let addr = self.slot_addr(slot);
        self.flash
            .write(addr, &settings.encode())
            .map_err(|_| SettingsError::Program)?;
        debug!("settings saved to slot {}", slot);
        Ok(())
    }

    /// The flash device.
    pub fn flash(&self) -> &F {
        &self.flash
    }

    /// The flash device, mutably.
    pub fn flash_mut(&mut self) -> &mut F {
        &mut self.flash
    }

    /// Give the flash device back.
    pub fn release(self) -> F {
        self.flash
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use platform::mocks::MockFlash;

    type Flash = MockFlash<2, PAGE_LEN>;

    fn settings(volume: u8) -> Settings {
        Settings {
            local_volume: volume,
            ..Settings::default()
        }
    }

    #[test]
    fn records_per_page() {
        assert_eq!(RECORDS_PER_PAGE, 128);
    }

    #[test]
    fn blank_page_loads_nothing() {
        let mut store = SettingsStore::new(Flash::new(PAGE_LEN), 0);
        assert_eq!(store.load(&IntegrityFault::new()), None);
        assert_eq!(store.flash().erase_count, 0);
    }

    #[test]
    fn newest_record_wins() {
        let mut store = SettingsStore::new(Flash::new(PAGE_LEN), 0);
        for v in [10, 20, 30] {
            store.save(&settings(v)).unwrap();
        }
        assert_eq!(store.load(&IntegrityFault::new()), Some(settings(30)));
        assert_eq!(store.flash().erase_count, 0);
    }

    #[test]
    fn corrupt_newest_falls_back_to_previous() {
        let mut store = SettingsStore::new(Flash::new(PAGE_LEN), 0);
        store.save(&settings(10)).unwrap();
        store.save(&settings(20)).unwrap();
        // flip the volume byte of the newest record without touching its checksum
        store.flash_mut().poke(RECORD_LEN + 1, &[0x00]);
        assert_eq!(store.load(&IntegrityFault::new()), Some(settings(10)));
    }

    #[test]
    fn full_page_is_erased_before_append() {
        let mut store = SettingsStore::new(Flash::new(PAGE_LEN), 0);
        for i in 0..RECORDS_PER_PAGE {
            store.save(&settings((i % 100) as u8)).unwrap();
        }
        assert_eq!(store.flash().erase_count, 0);

        store.save(&settings(77)).unwrap();
        assert_eq!(store.flash().erase_count, 1);
        assert_eq!(store.load(&IntegrityFault::new()), Some(settings(77)));
        assert!(store.flash().contents()[RECORD_LEN..].iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn integrity_fault_erases_page() {
        let mut store = SettingsStore::new(Flash::new(PAGE_LEN), 0);
        store.save(&settings(55)).unwrap();

        let fault = IntegrityFault::new();
        fault.signal();
        assert_eq!(store.load(&fault), None);
        assert!(!fault.is_pending());
        assert_eq!(store.flash().erase_count, 1);
        assert_eq!(store.load(&fault), None);
    }

    #[test]
    fn read_error_erases_page() {
        let mut store = SettingsStore::new(Flash::new(PAGE_LEN), 0);
        store.save(&settings(55)).unwrap();
        store.flash_mut().fail_read = true;
        assert_eq!(store.load(&IntegrityFault::new()), None);
        assert_eq!(store.flash().erase_count, 1);
    }

    #[test]
    fn erase_failure_is_reported() {
        let mut store = SettingsStore::new(Flash::new(PAGE_LEN), 0);
        for _ in 0..RECORDS_PER_PAGE {
            store.save(&settings(1)).unwrap();
        }
        store.flash_mut().fail_erase = true;
        assert_eq!(store.save(&settings(2)), Err(SettingsError::Erase));
    }

    #[test]
    fn program_failure_is_reported() {
        let mut store = SettingsStore::new(Flash::new(PAGE_LEN), 0);
        store.flash_mut().fail_write_at = Some(0);
        assert_eq!(store.save(&settings(2)), Err(SettingsError::Program));
    }
}
