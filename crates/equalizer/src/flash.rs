//! Non-blocking flash save.
//!
//! Erasing the profile sector takes a few milliseconds and is done up front.
//! Programming the ~3.8 KB image in one go would stall the audio fill loop for
//! far longer, so the writer programs at most [`CHUNKS_PER_TICK`] program
//! units per [`FlashWriter::step`] and is driven from the main loop.
//!
//! ```text
//!        begin() ok              last chunk written
//! Idle ─────────────► Busy ─────────────────────────► DoneOk ─┐
//!   ▲                  │ program error                        │
//!   │                  ▼                                      │
//!   │   begin() erase  DoneErr ───────────────────────────────┤
//!   │   error ───────►   │                                    │
//!   └────────────────────┴──── take_status() ─────────────────┘
//! ```

use embedded_storage::nor_flash::NorFlash;
use thiserror_no_std::Error;

/// Program unit of the profile sector (one quad-word).
pub const PROGRAM_UNIT: usize = 16;
/// Program units written per [`FlashWriter::step`] call (~1 ms of work).
pub const CHUNKS_PER_TICK: usize = 32;
/// Value of an erased flash byte; pads the final partial unit.
pub const ERASED_BYTE: u8 = 0xFF;
/// Size of the erase region reserved for the profile store.
pub const REGION_LEN: usize = 8192;

/// Round `len` up to a whole number of program units.
#[allow(clippy::arithmetic_side_effects)] // image sizes are a few KB
pub const fn padded_len(len: usize) -> usize {
    len.div_ceil(PROGRAM_UNIT) * PROGRAM_UNIT
}

/// Progress of a save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlashStatus {
    /// Nothing in progress.
    #[default]
    Idle,
    /// Erase done, programming in progress.
    Busy,
    /// Last save completed.
    DoneOk,
    /// Last save failed (erase or program). Flash contents are undefined.
    DoneErr,
}

impl FlashStatus {
    /// `DoneOk` or `DoneErr`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::DoneOk | Self::DoneErr)
    }
}

/// Why a save could not be started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SaveError {
    /// A save is already being written.
    #[error("flash save already in progress")]
    Busy,
    /// Sector erase reported failure; status is now `DoneErr`.
    #[error("flash erase failed")]
    EraseFailed,
}

/// Resumable erase-then-program cursor over one flash region.
#[derive(Debug)]
pub struct FlashWriter {
    base: u32,
    status: FlashStatus,
    offset: usize,
    len: usize,
}

impl FlashWriter {
    /// Idle writer for the region starting at `base`.
    pub const fn new(base: u32) -> Self {
        Self {
            base,
            status: FlashStatus::Idle,
            offset: 0,
            len: 0,
        }
    }

    /// Current status without consuming a terminal state.
    pub fn status(&self) -> FlashStatus {
        self.status
    }

    /// Current status; a terminal state is reported once and then reset to
    /// `Idle`.
    pub fn take_status(&mut self) -> FlashStatus {
        let status = self.status;
        if status.is_terminal() {
            self.status = FlashStatus::Idle;
        }
        status
    }

    /// Bytes programmed so far in the current save.
    pub fn progress(&self) -> usize {
        self.offset
    }

    /// Erase the region and arm the writer for an image of `len` bytes.
    ///
    /// Blocks for the duration of the erase only.
    pub fn begin<F: NorFlash>(&mut self, flash: &mut F, len: usize) -> Result<(), SaveError> {
        if self.status == FlashStatus::Busy {
            return Err(SaveError::Busy);
        }

        let region = u32::try_from(REGION_LEN).unwrap_or(u32::MAX);
        if flash.erase(self.base, self.base.saturating_add(region)).is_err() {
            error!("flash erase failed");
            self.status = FlashStatus::DoneErr;
            return Err(SaveError::EraseFailed);
        }

        self.offset = 0;
        self.len = len;
        self.status = FlashStatus::Busy;
        debug!("flash erased, {} bytes to write", padded_len(len));
        Ok(())
    }

    /// Program up to [`CHUNKS_PER_TICK`] units. No-op unless busy.
    ///
    /// `fill(offset, buf)` must serialize image bytes starting at `offset`
    /// into `buf` and return how many it produced; the rest of `buf` is
    /// written as [`ERASED_BYTE`].
    pub fn step<F, S>(&mut self, flash: &mut F, mut fill: S) -> FlashStatus
    where
        F: NorFlash,
        S: FnMut(usize, &mut [u8]) -> usize,
    {
        if self.status != FlashStatus::Busy {
            return self.status;
        }

        let total = padded_len(self.len);
        let remaining = total.saturating_sub(self.offset);
        let span = remaining.min(PROGRAM_UNIT * CHUNKS_PER_TICK);

        let mut window = [ERASED_BYTE; PROGRAM_UNIT * CHUNKS_PER_TICK];
        let image_left = self.len.saturating_sub(self.offset);
        if let Some(dst) = window.get_mut(..span.min(image_left)) {
            let produced = fill(self.offset, dst);
            if let Some(tail) = dst.get_mut(produced..) {
                tail.fill(ERASED_BYTE);
            }
        }

        for chunk in window.get(..span).unwrap_or(&[]).chunks_exact(PROGRAM_UNIT) {
            let addr = self
                .base
                .saturating_add(u32::try_from(self.offset).unwrap_or(u32::MAX));
            if flash.write(addr, chunk).is_err() {
                error!("flash write failed at offset {}", self.offset);
                self.status = FlashStatus::DoneErr;
                return self.status;
            }
            self.offset = self.offset.saturating_add(PROGRAM_UNIT);
        }

        if self.offset >= total {
            info!("flash save complete ({} bytes)", total);
            self.status = FlashStatus::DoneOk;
        }
        self.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform::mocks::MockFlash;

    type Flash = MockFlash<PROGRAM_UNIT, REGION_LEN>;

    fn counting_fill(offset: usize, buf: &mut [u8]) -> usize {
        for (i, b) in buf.iter_mut().enumerate() {
            *b = ((offset + i) % 251) as u8;
        }
        buf.len()
    }

    #[test]
    fn padded_len_rounds_up() {
        assert_eq!(padded_len(3816), 3824);
        assert_eq!(padded_len(32), 32);
        assert_eq!(padded_len(0), 0);
    }

    #[test]
    fn step_when_idle_is_noop() {
        let mut flash = Flash::new(REGION_LEN);
        let mut w = FlashWriter::new(0);
        assert_eq!(w.step(&mut flash, counting_fill), FlashStatus::Idle);
        assert_eq!(flash.bytes_written, 0);
    }

    #[test]
    fn writes_in_bounded_ticks_and_pads_tail() {
        let mut flash = Flash::new(REGION_LEN);
        let mut w = FlashWriter::new(0);
        w.begin(&mut flash, 1000).unwrap();

        assert_eq!(w.step(&mut flash, counting_fill), FlashStatus::Busy);
        assert_eq!(flash.bytes_written, PROGRAM_UNIT * CHUNKS_PER_TICK);

        assert_eq!(w.step(&mut flash, counting_fill), FlashStatus::DoneOk);
        assert_eq!(flash.bytes_written, 1008);
        assert_eq!(flash.contents()[999], (999 % 251) as u8);
        assert!(flash.contents()[1000..1008].iter().all(|&b| b == ERASED_BYTE));
    }

    #[test]
    fn short_fill_is_padded_with_erased_bytes() {
        let mut flash = Flash::new(REGION_LEN);
        let mut w = FlashWriter::new(0);
        w.begin(&mut flash, 32).unwrap();
        let status = w.step(&mut flash, |_, buf: &mut [u8]| {
            buf.fill(0);
            buf.len() / 2
        });
        assert_eq!(status, FlashStatus::DoneOk);
        assert!(flash.contents()[..16].iter().all(|&b| b == 0));
        assert!(flash.contents()[16..32].iter().all(|&b| b == ERASED_BYTE));
    }

    #[test]
    fn terminal_status_is_reported_once() {
        let mut flash = Flash::new(REGION_LEN);
        let mut w = FlashWriter::new(0);
        w.begin(&mut flash, 16).unwrap();
        w.step(&mut flash, counting_fill);
        assert_eq!(w.take_status(), FlashStatus::DoneOk);
        assert_eq!(w.take_status(), FlashStatus::Idle);
    }

    #[test]
    fn begin_while_busy_is_rejected_without_erasing() {
        let mut flash = Flash::new(REGION_LEN);
        let mut w = FlashWriter::new(0);
        w.begin(&mut flash, 4096).unwrap();
        assert_eq!(w.begin(&mut flash, 4096), Err(SaveError::Busy));
        assert_eq!(flash.erase_count, 1);
    }

    #[test]
    fn erase_failure_is_terminal() {
        let mut flash = Flash::new(REGION_LEN);
        flash.fail_erase = true;
        let mut w = FlashWriter::new(0);
        assert_eq!(w.begin(&mut flash, 100), Err(SaveError::EraseFailed));
        assert_eq!(w.step(&mut flash, counting_fill), FlashStatus::DoneErr);
        assert_eq!(flash.bytes_written, 0);
        assert_eq!(w.take_status(), FlashStatus::DoneErr);
        assert_eq!(w.take_status(), FlashStatus::Idle);
    }

    #[test]
    fn program_failure_stops_immediately() {
        let mut flash = Flash::new(REGION_LEN);
        flash.fail_write_at = Some(48);
        let mut w = FlashWriter::new(0);
        w.begin(&mut flash, 1000).unwrap();
        assert_eq!(w.step(&mut flash, counting_fill), FlashStatus::DoneErr);
        assert_eq!(flash.bytes_written, 48);
        assert_eq!(w.progress(), 48);
    }
}
