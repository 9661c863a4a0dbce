//! Double-buffer handoff between the I2S DMA interrupt and the main loop.
//!
//! The circular transfer raises two notifications per period:
//!
//! ```text
//!  buffer: [ half 0 | half 1 ]
//!             ↑          ↑
//!      half-complete  transfer-complete
//!      (half 0 sent,  (half 1 sent,
//!       refill it)     refill it)
//! ```
//!
//! Each half owns one flag. The ISR is the only writer of `true`; the fill
//! routine is the only writer of `false`. Neither side ever does a
//! read-modify-write, so plain atomic loads and stores are enough, and the
//! type works on Cortex-M0 which has no CAS instructions.

use core::sync::atomic::{AtomicBool, Ordering};

/// One half of the audio double buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Half {
    /// Samples `[0, N/2)`, freed by the half-complete notification.
    First,
    /// Samples `[N/2, N)`, freed by the transfer-complete notification.
    Second,
}

impl Half {
    /// Both halves in transfer order.
    pub const BOTH: [Half; 2] = [Half::First, Half::Second];

    /// Index of this half (0 or 1).
    pub const fn index(self) -> usize {
        match self {
            Half::First => 0,
            Half::Second => 1,
        }
    }
}

/// Per-half "needs fill" flags shared with the DMA interrupt.
///
/// Intended to live in a `static` so the interrupt handler can reach it:
///
/// ```rust
/// use platform::dma::{Half, HalfFillFlags};
///
/// static AUDIO_FLAGS: HalfFillFlags = HalfFillFlags::new();
///
/// // I2S DMA half-transfer interrupt:
/// AUDIO_FLAGS.on_half_complete();
///
/// // main loop:
/// if AUDIO_FLAGS.needs_fill(Half::First) {
///     // ... write fresh samples into half 0 ...
///     AUDIO_FLAGS.mark_filled(Half::First);
/// }
/// ```
pub struct HalfFillFlags {
    first: AtomicBool,
    second: AtomicBool,
}

impl HalfFillFlags {
    /// Both halves clean.
    pub const fn new() -> Self {
        Self {
            first: AtomicBool::new(false),
            second: AtomicBool::new(false),
        }
    }

    fn flag(&self, half: Half) -> &AtomicBool {
        match half {
            Half::First => &self.first,
            Half::Second => &self.second,
        }
    }

    /// ISR: first half has been shifted out.
    pub fn on_half_complete(&self) {
        self.first.store(true, Ordering::Release);
    }

    /// ISR: second half has been shifted out.
    pub fn on_transfer_complete(&self) {
        self.second.store(true, Ordering::Release);
    }

    /// Main loop: does `half` need fresh samples?
    pub fn needs_fill(&self, half: Half) -> bool {
        self.flag(half).load(Ordering::Acquire)
    }

    /// Main loop: `half` has been written (fresh or held data).
    pub fn mark_filled(&self, half: Half) {
        self.flag(half).store(false, Ordering::Release);
    }

    /// Main loop: drop any pending requests. Only valid while the transfer is
    /// stopped (no ISR can race the store).
    pub fn clear(&self) {
        self.first.store(false, Ordering::Release);
        self.second.store(false, Ordering::Release);
    }
}

impl Default for HalfFillFlags {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_start_clean() {
        let flags = HalfFillFlags::new();
        assert!(!flags.needs_fill(Half::First));
        assert!(!flags.needs_fill(Half::Second));
    }

    #[test]
    fn half_complete_only_touches_first_half() {
        let flags = HalfFillFlags::new();
        flags.on_half_complete();
        assert!(flags.needs_fill(Half::First));
        assert!(!flags.needs_fill(Half::Second));
    }

    #[test]
    fn transfer_complete_only_touches_second_half() {
        let flags = HalfFillFlags::new();
        flags.on_transfer_complete();
        assert!(!flags.needs_fill(Half::First));
        assert!(flags.needs_fill(Half::Second));
    }

    #[test]
    fn mark_filled_clears_one_half() {
        let flags = HalfFillFlags::new();
        flags.on_half_complete();
        flags.on_transfer_complete();
        flags.mark_filled(Half::First);
        assert!(!flags.needs_fill(Half::First));
        assert!(flags.needs_fill(Half::Second));
    }

    #[test]
    fn half_indices_are_distinct() {
        assert_eq!(Half::First.index(), 0);
        assert_eq!(Half::Second.index(), 1);
    }
}
