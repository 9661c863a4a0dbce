//! Audio collaborator abstractions
//!
//! The audio core never touches USB endpoints, SPI/I2S registers or GPIO
//! directly. It talks to three collaborators:
//!
//! - a [`UsbAudioSource`] (the USB audio class FIFO and feature-unit state),
//! - an [`I2sTransmitter`] (circular DMA feeding the DAC),
//! - an [`OutputControl`] (DAC soft-mute line and headphone amplifier enable).

use embedded_hal::digital::OutputPin;

use crate::audio_types::HostVolumeDb;

/// USB audio streaming source (isochronous OUT endpoint FIFO).
///
/// Samples arrive packed: 3 bytes little-endian per channel sample, two
/// channels interleaved (6 bytes per stereo frame).
pub trait UsbAudioSource {
    /// Number of bytes currently buffered in the FIFO.
    fn available(&self) -> usize;

    /// Read up to `buf.len()` bytes from the FIFO.
    ///
    /// Returns the number of bytes actually copied. Never blocks.
    fn read(&mut self, buf: &mut [u8]) -> usize;

    /// Master-channel volume set by the host.
    fn volume(&self) -> HostVolumeDb;

    /// Master-channel mute set by the host.
    fn is_muted(&self) -> bool;

    /// Sample rate set by the host (reported only; the pipeline runs at 48 kHz).
    fn sample_rate(&self) -> u32;
}

/// Circular I2S DMA transmitter.
///
/// Once started the transfer loops over `frames` forever, raising a
/// half-complete notification after the first half and a transfer-complete
/// notification after the second. Those notifications are delivered to
/// [`crate::dma::HalfFillFlags`] from interrupt context.
pub trait I2sTransmitter {
    /// Error type
    type Error: core::fmt::Debug;

    /// Start a continuous transfer over `frames` (both halves).
    fn start(&mut self, frames: &[u16]) -> Result<(), Self::Error>;

    /// Halt the transfer.
    fn stop(&mut self) -> Result<(), Self::Error>;
}

/// Analog output stage: DAC soft-mute line and headphone amplifier enable.
pub trait OutputControl {
    /// Drive the DAC mute line active.
    fn mute_dac(&mut self);

    /// Release the DAC mute line.
    fn unmute_dac(&mut self);

    /// Power up the headphone amplifier.
    fn enable_amplifier(&mut self);

    /// Power down the headphone amplifier.
    fn disable_amplifier(&mut self);
}

/// [`OutputControl`] over two GPIO pins.
///
/// - `dac_mute`: active-low (low = muted, high = playing).
/// - `amp_enable`: active-high.
///
/// Pin errors are swallowed: on the target these are infallible GPIO writes,
/// and the audio core has no recovery path for a stuck pin anyway.
pub struct PinOutputControl<M, A> {
    dac_mute: M,
    amp_enable: A,
}

impl<M: OutputPin, A: OutputPin> PinOutputControl<M, A> {
    /// Wrap the two control pins.
    pub fn new(dac_mute: M, amp_enable: A) -> Self {
        Self {
            dac_mute,
            amp_enable,
        }
    }

    /// Release the pins.
    pub fn release(self) -> (M, A) {
        (self.dac_mute, self.amp_enable)
    }
}

impl<M: OutputPin, A: OutputPin> OutputControl for PinOutputControl<M, A> {
    fn mute_dac(&mut self) {
        let _ = self.dac_mute.set_low();
    }

    fn unmute_dac(&mut self) {
        let _ = self.dac_mute.set_high();
    }

    fn enable_amplifier(&mut self) {
        let _ = self.amp_enable.set_high();
    }

    fn disable_amplifier(&mut self) {
        let _ = self.amp_enable.set_low();
    }
}
