//! I2S DMA double buffer.

use platform::dma::Half;

use crate::convert::HALFWORDS_PER_HALF;

/// Total half-words in the circular buffer (both halves).
pub const BUFFER_HALFWORDS: usize = HALFWORDS_PER_HALF * 2;

/// Circular transfer buffer, split into two independently refilled halves.
///
/// The DMA engine reads the whole slice in a loop; the main loop writes one
/// half at a time, only after the matching [`platform::HalfFillFlags`] flag
/// says the hardware has finished with it.
#[repr(C, align(4))]
pub struct DoubleBuffer {
    halfwords: [u16; BUFFER_HALFWORDS],
}

impl Default for DoubleBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl DoubleBuffer {
    /// Silent buffer.
    pub const fn new() -> Self {
        Self {
            halfwords: [0; BUFFER_HALFWORDS],
        }
    }

    /// Overwrite both halves with silence.
    pub fn clear(&mut self) {
        self.halfwords.fill(0);
    }

    /// One half, for refilling.
    pub fn half_mut(&mut self, half: Half) -> &mut [u16] {
        let (first, second) = self.halfwords.split_at_mut(HALFWORDS_PER_HALF);
        match half {
            Half::First => first,
            Half::Second => second,
        }
    }

    /// One half, read-only.
    pub fn half(&self, half: Half) -> &[u16] {
        let (first, second) = self.halfwords.split_at(HALFWORDS_PER_HALF);
        match half {
            Half::First => first,
            Half::Second => second,
        }
    }

    /// Whole buffer, as handed to the transmitter.
    pub fn as_slice(&self) -> &[u16] {
        &self.halfwords
    }

    /// Every half-word zero?
    pub fn is_silent(&self) -> bool {
        self.halfwords.iter().all(|&w| w == 0)
    }
}
