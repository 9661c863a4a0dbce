//! Mock implementations for testing
//!
//! This module provides mock implementations of all platform traits
//! for use in unit and integration tests.

#![cfg(any(test, feature = "std"))]
// host-only test doubles
#![allow(clippy::arithmetic_side_effects, clippy::indexing_slicing)]

use std::collections::VecDeque;

use embedded_hal::delay::DelayNs;
use embedded_storage::nor_flash::{
    ErrorType as FlashErrorType, NorFlash, NorFlashError, NorFlashErrorKind, ReadNorFlash,
};

use crate::*;

// ── USB audio source ─────────────────────────────────────────────────────────

/// Mock USB audio FIFO with host-controlled volume and mute.
pub struct MockUsbSource {
    fifo: VecDeque<u8>,
    /// Host master volume reported to the pipeline.
    pub volume: HostVolumeDb,
    /// Host master mute reported to the pipeline.
    pub muted: bool,
    /// Host sample rate reported to the pipeline.
    pub sample_rate: u32,
}

impl MockUsbSource {
    /// Empty FIFO, 0 dB, unmuted, 48 kHz.
    pub fn new() -> Self {
        Self {
            fifo: VecDeque::new(),
            volume: HostVolumeDb::UNITY,
            muted: false,
            sample_rate: SampleRateHz::OPERATING.get(),
        }
    }

    /// Queue raw packed bytes as if received from the host.
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.fifo.extend(bytes.iter().copied());
    }

    /// Queue stereo frames as packed 24-bit little-endian samples.
    pub fn push_frames(&mut self, frames: &[(i32, i32)]) {
        for &(l, r) in frames {
            self.fifo.extend(l.to_le_bytes().into_iter().take(3));
            self.fifo.extend(r.to_le_bytes().into_iter().take(3));
        }
    }

    /// Drop everything queued.
    pub fn clear(&mut self) {
        self.fifo.clear();
    }
}

impl Default for MockUsbSource {
    fn default() -> Self {
        Self::new()
    }
}

impl UsbAudioSource for MockUsbSource {
    fn available(&self) -> usize {
        self.fifo.len()
    }

    fn read(&mut self, buf: &mut [u8]) -> usize {
        let n = buf.len().min(self.fifo.len());
        for (dst, src) in buf.iter_mut().zip(self.fifo.drain(..n)) {
            *dst = src;
        }
        n
    }

    fn volume(&self) -> HostVolumeDb {
        self.volume
    }

    fn is_muted(&self) -> bool {
        self.muted
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

// ── I2S transmitter ──────────────────────────────────────────────────────────

/// Mock circular I2S DMA.
///
/// Snapshots the buffer handed to every `start` so tests can check what the
/// transfer was restarted against.
#[derive(Default)]
pub struct MockI2s {
    /// Transfer currently running.
    pub running: bool,
    /// Number of `start` calls.
    pub start_count: usize,
    /// Number of `stop` calls.
    pub stop_count: usize,
    /// Copy of the buffer passed to the latest `start`.
    pub last_start: Vec<u16>,
    /// Make every `stop` fail with [`MockI2sError`].
    pub fail_stop: bool,
}

/// Injected transmitter failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockI2sError;

impl MockI2s {
    /// Idle transmitter.
    pub fn new() -> Self {
        Self::default()
    }
}

impl I2sTransmitter for MockI2s {
    type Error = MockI2sError;

    fn start(&mut self, frames: &[u16]) -> Result<(), Self::Error> {
        self.running = true;
        self.start_count += 1;
        self.last_start = frames.to_vec();
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Self::Error> {
        self.stop_count += 1;
        if self.fail_stop {
            return Err(MockI2sError);
        }
        self.running = false;
        Ok(())
    }
}

// ── Output control ───────────────────────────────────────────────────────────

/// One call recorded by [`MockOutputControl`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputEvent {
    /// `mute_dac`
    MuteDac,
    /// `unmute_dac`
    UnmuteDac,
    /// `enable_amplifier`
    EnableAmplifier,
    /// `disable_amplifier`
    DisableAmplifier,
}

/// Mock DAC mute line and amplifier enable.
#[derive(Default)]
pub struct MockOutputControl {
    /// DAC mute line currently asserted.
    pub dac_muted: bool,
    /// Amplifier currently powered.
    pub amp_enabled: bool,
    /// Every call in order.
    pub events: Vec<OutputEvent>,
}

impl MockOutputControl {
    /// Amplifier off, DAC unmuted, no history.
    pub fn new() -> Self {
        Self::default()
    }
}

impl OutputControl for MockOutputControl {
    fn mute_dac(&mut self) {
        self.dac_muted = true;
        self.events.push(OutputEvent::MuteDac);
    }

    fn unmute_dac(&mut self) {
        self.dac_muted = false;
        self.events.push(OutputEvent::UnmuteDac);
    }

    fn enable_amplifier(&mut self) {
        self.amp_enabled = true;
        self.events.push(OutputEvent::EnableAmplifier);
    }

    fn disable_amplifier(&mut self) {
        self.amp_enabled = false;
        self.events.push(OutputEvent::DisableAmplifier);
    }
}

// ── NOR flash ────────────────────────────────────────────────────────────────

/// Error reported by [`MockFlash`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFlashError {
    /// Offset or length not a multiple of the program/erase unit.
    NotAligned,
    /// Access past the end of the region.
    OutOfBounds,
    /// Programming over cells that are not erased.
    NotErased,
    /// Fault injected by the test.
    Injected,
}

impl NorFlashError for MockFlashError {
    fn kind(&self) -> NorFlashErrorKind {
        match self {
            Self::NotAligned => NorFlashErrorKind::NotAligned,
            Self::OutOfBounds => NorFlashErrorKind::OutOfBounds,
            Self::NotErased | Self::Injected => NorFlashErrorKind::Other,
        }
    }
}

/// RAM-backed NOR flash region.
///
/// `WRITE` is the program unit and `ERASE` the page size. Cells start erased
/// (`0xFF`) and may only be programmed while still erased, like the STM32
/// flash controller.
pub struct MockFlash<const WRITE: usize, const ERASE: usize> {
    data: Vec<u8>,
    /// Fail every erase.
    pub fail_erase: bool,
    /// Fail the program operation that covers this byte offset.
    pub fail_write_at: Option<u32>,
    /// Fail every read.
    pub fail_read: bool,
    /// Bytes successfully programmed since creation.
    pub bytes_written: usize,
    /// Successful erase operations since creation.
    pub erase_count: usize,
}

impl<const WRITE: usize, const ERASE: usize> MockFlash<WRITE, ERASE> {
    /// Fully erased region of `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            data: std::vec![0xFF; capacity],
            fail_erase: false,
            fail_write_at: None,
            fail_read: false,
            bytes_written: 0,
            erase_count: 0,
        }
    }

    /// Raw contents.
    pub fn contents(&self) -> &[u8] {
        &self.data
    }

    /// Overwrite raw contents directly, bypassing NOR rules (corruption tests).
    pub fn poke(&mut self, offset: usize, bytes: &[u8]) {
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    fn range(&self, offset: u32, len: usize) -> Result<core::ops::Range<usize>, MockFlashError> {
        let start = offset as usize;
        let end = start.checked_add(len).ok_or(MockFlashError::OutOfBounds)?;
        if end > self.data.len() {
            return Err(MockFlashError::OutOfBounds);
        }
        Ok(start..end)
    }
}

impl<const WRITE: usize, const ERASE: usize> FlashErrorType for MockFlash<WRITE, ERASE> {
    type Error = MockFlashError;
}

impl<const WRITE: usize, const ERASE: usize> ReadNorFlash for MockFlash<WRITE, ERASE> {
    const READ_SIZE: usize = 1;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        if self.fail_read {
            return Err(MockFlashError::Injected);
        }
        let range = self.range(offset, bytes.len())?;
        bytes.copy_from_slice(&self.data[range]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.data.len()
    }
}

impl<const WRITE: usize, const ERASE: usize> NorFlash for MockFlash<WRITE, ERASE> {
    const WRITE_SIZE: usize = WRITE;
    const ERASE_SIZE: usize = ERASE;

    fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        if from as usize % ERASE != 0 || to as usize % ERASE != 0 || to < from {
            return Err(MockFlashError::NotAligned);
        }
        if self.fail_erase {
            return Err(MockFlashError::Injected);
        }
        let range = self.range(from, (to - from) as usize)?;
        self.data[range].fill(0xFF);
        self.erase_count += 1;
        Ok(())
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        if offset as usize % WRITE != 0 || bytes.len() % WRITE != 0 {
            return Err(MockFlashError::NotAligned);
        }
        let range = self.range(offset, bytes.len())?;
        if let Some(at) = self.fail_write_at {
            if range.contains(&(at as usize)) {
                return Err(MockFlashError::Injected);
            }
        }
        if self.data[range.clone()].iter().any(|&b| b != 0xFF) {
            return Err(MockFlashError::NotErased);
        }
        self.data[range].copy_from_slice(bytes);
        self.bytes_written += bytes.len();
        Ok(())
    }
}

// ── Control channel ──────────────────────────────────────────────────────────

/// Mock USB CDC byte channel.
///
/// Bytes queued with [`MockSerial::feed`] are returned by `read`; everything
/// written is collected in `tx`.
#[derive(Default)]
pub struct MockSerial {
    rx: VecDeque<u8>,
    /// Bytes written by the device.
    pub tx: Vec<u8>,
    /// Number of upcoming `write` calls that fail with [`MockIoError`].
    pub fail_writes: usize,
}

impl MockSerial {
    /// Empty channel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes from the host.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes.iter().copied());
    }

    /// Take everything written so far.
    pub fn take_tx(&mut self) -> Vec<u8> {
        core::mem::take(&mut self.tx)
    }
}

/// Injected serial failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockIoError;

impl embedded_io::Error for MockIoError {
    fn kind(&self) -> embedded_io::ErrorKind {
        embedded_io::ErrorKind::Other
    }
}

impl embedded_io::ErrorType for MockSerial {
    type Error = MockIoError;
}

impl embedded_io::Read for MockSerial {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let n = buf.len().min(self.rx.len());
        for (dst, src) in buf.iter_mut().zip(self.rx.drain(..n)) {
            *dst = src;
        }
        Ok(n)
    }
}

impl embedded_io::ReadReady for MockSerial {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.rx.is_empty())
    }
}

impl embedded_io::Write for MockSerial {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        if self.fail_writes > 0 {
            self.fail_writes -= 1;
            return Err(MockIoError);
        }
        self.tx.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

// ── System ───────────────────────────────────────────────────────────────────

/// Records update-mode requests instead of rebooting.
#[derive(Default)]
pub struct MockUpdateTrigger {
    /// Number of reboot requests.
    pub requests: usize,
}

impl UpdateModeTrigger for MockUpdateTrigger {
    fn enter_update_mode(&mut self) {
        self.requests += 1;
    }
}

/// Delay that returns immediately and tallies the requested time.
#[derive(Default)]
pub struct NoopDelay {
    elapsed_ns: u64,
}

impl NoopDelay {
    /// Zero elapsed time.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total requested delay in milliseconds.
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ns / 1_000_000
    }
}

impl DelayNs for NoopDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.elapsed_ns += u64::from(ns);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_io::{Read, ReadReady, Write};

    #[test]
    fn test_mock_usb_source_packs_frames() {
        let mut usb = MockUsbSource::new();
        usb.push_frames(&[(0x12_3456, -1)]);
        assert_eq!(usb.available(), 6);

        let mut buf = [0u8; 8];
        assert_eq!(usb.read(&mut buf), 6);
        assert_eq!(&buf[..6], &[0x56, 0x34, 0x12, 0xFF, 0xFF, 0xFF]);
        assert_eq!(usb.available(), 0);
    }

    #[test]
    fn test_mock_flash_nor_rules() {
        let mut flash: MockFlash<16, 2048> = MockFlash::new(4096);
        flash.write(0, &[0u8; 16]).unwrap();
        assert_eq!(flash.write(0, &[0u8; 16]), Err(MockFlashError::NotErased));
        assert_eq!(flash.write(3, &[0u8; 16]), Err(MockFlashError::NotAligned));

        flash.erase(0, 2048).unwrap();
        assert!(flash.contents()[..16].iter().all(|&b| b == 0xFF));
        assert_eq!(flash.erase(0, 100), Err(MockFlashError::NotAligned));
    }

    #[test]
    fn test_mock_flash_fault_injection() {
        let mut flash: MockFlash<2, 2048> = MockFlash::new(2048);
        flash.fail_write_at = Some(4);
        flash.write(0, &[1, 2]).unwrap();
        assert_eq!(flash.write(4, &[1, 2]), Err(MockFlashError::Injected));
        assert_eq!(flash.bytes_written, 2);

        flash.fail_read = true;
        let mut buf = [0u8; 2];
        assert!(flash.read(0, &mut buf).is_err());
    }

    #[test]
    fn test_mock_serial_loopback() {
        let mut serial = MockSerial::new();
        assert!(!serial.read_ready().unwrap());
        serial.feed(&[1, 2, 3]);
        assert!(serial.read_ready().unwrap());

        let mut buf = [0u8; 2];
        assert_eq!(serial.read(&mut buf).unwrap(), 2);
        assert_eq!(buf, [1, 2]);

        serial.write_all(&[9, 8]).unwrap();
        assert_eq!(serial.take_tx(), std::vec![9, 8]);

        serial.fail_writes = 1;
        assert_eq!(serial.write(&[7]), Err(MockIoError));
        serial.write_all(&[6]).unwrap();
        assert_eq!(serial.take_tx(), std::vec![6]);
    }

    #[test]
    fn test_noop_delay_tallies() {
        let mut delay = NoopDelay::new();
        delay.delay_ms(500);
        assert_eq!(delay.elapsed_ms(), 500);
    }
}
