//! Flash ECC fault latch.
//!
//! A double-bit ECC error while reading flash raises an NMI. The handler
//! cannot do anything useful with the data, so it only latches the fault.
//! The main loop checks the latch after any flash scan; if set, the scanned
//! region is treated as garbage, erased, and defaults substituted.

use core::sync::atomic::{AtomicBool, Ordering};

/// Single-shot fault latch written from NMI context.
pub struct IntegrityFault {
    pending: AtomicBool,
}

impl IntegrityFault {
    /// No fault pending.
    pub const fn new() -> Self {
        Self {
            pending: AtomicBool::new(false),
        }
    }

    /// NMI: an uncorrectable memory read was detected.
    pub fn signal(&self) {
        self.pending.store(true, Ordering::Release);
    }

    /// Main loop: was a fault raised since the last call? Clears the latch.
    pub fn take(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }

    /// Peek without clearing.
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }
}

impl Default for IntegrityFault {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_is_one_shot() {
        let fault = IntegrityFault::new();
        assert!(!fault.take());
        fault.signal();
        assert!(fault.is_pending());
        assert!(fault.take());
        assert!(!fault.take());
    }

    #[test]
    fn signal_from_other_thread_is_seen_once() {
        let fault = IntegrityFault::new();
        std::thread::scope(|s| {
            s.spawn(|| fault.signal());
        });
        assert!(fault.take());
        assert!(!fault.is_pending());
        assert!(!fault.take());
    }
}
