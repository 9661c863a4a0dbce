//! USB → EQ → I2S streaming state machine.
//!
//! `AudioOutput` owns the DMA double buffer, the typed staging buffers and the
//! gain controls. It borrows the hardware collaborators and the
//! [`HalfFillFlags`] the DMA interrupt writes to.
//!
//! ```text
//!            start_streaming()        FIFO ≥ prebuffer threshold
//!  Stopped ───────────────────► Prebuffering ─────────────────────► Streaming
//!     ▲                                                                │
//!     └──────────────────────── stop_streaming() ◄─────────────────────┘
//! ```
//!
//! While stopped the transfer keeps running over silence, so the DAC always
//! has a defined input. Every refill request is answered with a whole half of
//! samples, degrading from a full fill to a partial fill padded with the last
//! sample pair, down to a full hold when the FIFO is dry.

use embedded_hal::delay::DelayNs;
use equalizer::ActiveEq;
use platform::{
    Half, HalfFillFlags, HostVolumeDb, I2sTransmitter, OutputControl, PowerTier, UsbAudioSource,
    VolumePercent,
};

use crate::convert::{
    fill_hold, pack_samples, swap_channels, unpack_samples, BYTES_PER_FRAME, FRAMES_PER_HALF,
    HALFWORDS_PER_FRAME, SAMPLES_PER_HALF, USB_BYTES_PER_HALF,
};
use crate::double_buffer::DoubleBuffer;
use crate::volume::VolumeState;

/// Amplifier settle time after the DAC starts outputting silence.
pub const AMP_SETTLE_MS: u32 = 500;

/// Streaming state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StreamState {
    /// Host is not streaming; the transfer loops over silence.
    #[default]
    Stopped,
    /// Waiting for the FIFO to reach the prebuffer threshold.
    Prebuffering,
    /// Refilling halves on demand.
    Streaming,
}

/// Board-level pipeline options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OutputConfig {
    /// Exchange left and right before processing (board wiring).
    pub swap_channels: bool,
    /// Buffer halves of FIFO data to wait for before the first fill.
    pub prebuffer_halves: u8,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            swap_channels: true,
            prebuffer_halves: 3,
        }
    }
}

impl OutputConfig {
    /// FIFO bytes required to leave prebuffering.
    pub fn prebuffer_threshold(&self) -> usize {
        USB_BYTES_PER_HALF.saturating_mul(usize::from(self.prebuffer_halves))
    }
}

/// How one half was refilled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FillKind {
    /// Every frame came from the FIFO.
    Full,
    /// Some frames came from the FIFO, the rest hold the last pair.
    Partial,
    /// The whole half holds the last pair.
    Underrun,
}

/// Refill counters since the last [`AudioOutput::take_stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FillStats {
    /// Halves filled entirely from the FIFO.
    pub full_fills: u32,
    /// Halves padded with the held pair.
    pub partial_fills: u32,
    /// Halves filled entirely with the held pair.
    pub underruns: u32,
}

impl FillStats {
    fn record(&mut self, kind: FillKind) {
        let counter = match kind {
            FillKind::Full => &mut self.full_fills,
            FillKind::Partial => &mut self.partial_fills,
            FillKind::Underrun => &mut self.underruns,
        };
        *counter = counter.saturating_add(1);
    }
}

/// The audio output stage.
pub struct AudioOutput<'a, T, C> {
    i2s: T,
    control: C,
    flags: &'a HalfFillFlags,
    config: OutputConfig,
    state: StreamState,
    dma_running: bool,
    buffer: DoubleBuffer,
    usb_scratch: [u8; USB_BYTES_PER_HALF],
    samples: [i32; SAMPLES_PER_HALF],
    last_sample: (i32, i32),
    volume: VolumeState,
    stats: FillStats,
}

impl<'a, T, C> AudioOutput<'a, T, C>
where
    T: I2sTransmitter,
    C: OutputControl,
{
    /// Wrap the collaborators. Nothing is driven until [`init`](Self::init).
    pub fn new(i2s: T, control: C, flags: &'a HalfFillFlags, config: OutputConfig) -> Self {
        Self {
            i2s,
            control,
            flags,
            config,
            state: StreamState::Stopped,
            dma_running: false,
            buffer: DoubleBuffer::new(),
            usb_scratch: [0; USB_BYTES_PER_HALF],
            samples: [0; SAMPLES_PER_HALF],
            last_sample: (0, 0),
            volume: VolumeState::default(),
            stats: FillStats::default(),
        }
    }

    /// Pop-free power-up.
    ///
    /// 1. mute the DAC and power the amplifier down
    /// 2. start the transfer over silence
    /// 3. unmute the DAC so it outputs a clean zero
    /// 4. wait [`AMP_SETTLE_MS`], then power the amplifier up
    ///
    /// The DAC mute line is high-impedance rather than grounded, so the
    /// amplifier must only see the DAC once it is driving defined silence.
    ///
    /// # Errors
    ///
    /// Returns the transmitter error if the transfer could not be started;
    /// the DAC stays muted and the amplifier off.
    pub fn init<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), T::Error> {
        self.buffer.clear();
        self.last_sample = (0, 0);

        self.control.mute_dac();
        self.control.disable_amplifier();

        self.i2s.start(self.buffer.as_slice())?;
        self.dma_running = true;

        self.control.unmute_dac();
        delay.delay_ms(AMP_SETTLE_MS);
        self.control.enable_amplifier();
        info!("audio output up");
        Ok(())
    }

    /// Host opened the streaming interface. No-op unless stopped.
    ///
    /// The transfer keeps playing the silent buffer; it is restarted against
    /// real data once prebuffering completes.
    pub fn start_streaming(&mut self) {
        if self.state != StreamState::Stopped {
            return;
        }
        self.buffer.clear();
        self.last_sample = (0, 0);
        self.state = StreamState::Prebuffering;
        info!("stream start, prebuffering");
    }

    /// Host closed the streaming interface.
    ///
    /// Mutes, halts the transfer, silences the buffer and restarts the
    /// transfer over silence before releasing the mute again.
    ///
    /// # Errors
    ///
    /// Returns the transmitter error if halting or the silent restart failed.
    /// The DAC is left muted in that case; the buffer and refill flags are
    /// cleared either way.
    pub fn stop_streaming(&mut self) -> Result<(), T::Error> {
        self.state = StreamState::Stopped;
        self.control.mute_dac();

        let halted = if self.dma_running {
            self.dma_running = false;
            self.i2s.stop()
        } else {
            Ok(())
        };
        self.buffer.clear();
        self.flags.clear();
        halted?;

        self.i2s.start(self.buffer.as_slice())?;
        self.dma_running = true;
        self.update_mute_state();
        info!("stream stop");
        Ok(())
    }

    /// Main-loop tick: track host mute and service refill requests.
    pub fn task<S: UsbAudioSource>(&mut self, source: &mut S, eq: &mut ActiveEq<'_>) {
        if source.is_muted() != self.volume.host_muted {
            self.set_host_mute(source.is_muted());
        }

        match self.state {
            StreamState::Stopped => {}
            StreamState::Prebuffering => self.prebuffer(source, eq),
            StreamState::Streaming => {
                for half in Half::BOTH {
                    if self.flags.needs_fill(half) {
                        self.refill(half, source, eq);
                        self.flags.mark_filled(half);
                    }
                }
            }
        }
    }

    fn prebuffer<S: UsbAudioSource>(&mut self, source: &mut S, eq: &mut ActiveEq<'_>) {
        if source.available() < self.config.prebuffer_threshold() {
            return;
        }

        self.refill(Half::First, source, eq);
        if source.available() >= USB_BYTES_PER_HALF {
            self.refill(Half::Second, source, eq);
        }
        self.state = StreamState::Streaming;

        // any request raised by the silent loop refers to the old contents
        if self.dma_running {
            self.dma_running = false;
            if self.i2s.stop().is_err() {
                error!("I2S stop failed");
            }
        }
        self.flags.clear();
        if self.i2s.start(self.buffer.as_slice()).is_ok() {
            self.dma_running = true;
            info!("prebuffer complete, streaming");
        } else {
            error!("I2S restart failed");
        }
    }

    /// Refill one half from the FIFO, padding with the held pair as needed.
    fn refill<S: UsbAudioSource>(
        &mut self,
        half: Half,
        source: &mut S,
        eq: &mut ActiveEq<'_>,
    ) -> FillKind {
        let available = source.available();
        let frames = if available >= BYTES_PER_FRAME {
            self.read_frames(half, source, eq, available.min(USB_BYTES_PER_HALF))
        } else {
            0
        };

        // frames <= FRAMES_PER_HALF, so the offset stays inside the half
        #[allow(clippy::arithmetic_side_effects)]
        let held_from = frames * HALFWORDS_PER_FRAME;
        let last = self.last_sample;
        if let Some(rest) = self.buffer.half_mut(half).get_mut(held_from..) {
            fill_hold(rest, last);
        }

        let kind = if frames == FRAMES_PER_HALF {
            FillKind::Full
        } else if frames > 0 {
            debug!("partial fill: {} bytes, {} frames", available, frames);
            FillKind::Partial
        } else {
            debug!("underrun");
            FillKind::Underrun
        };
        self.stats.record(kind);
        kind
    }

    /// Read up to `max_bytes` of whole frames, process and pack them into the
    /// start of `half`. Returns the number of frames written.
    fn read_frames<S: UsbAudioSource>(
        &mut self,
        half: Half,
        source: &mut S,
        eq: &mut ActiveEq<'_>,
        max_bytes: usize,
    ) -> usize {
        // BYTES_PER_FRAME is non-zero
        #[allow(clippy::arithmetic_side_effects)]
        let want = max_bytes - max_bytes % BYTES_PER_FRAME;
        let Some(raw) = self.usb_scratch.get_mut(..want) else {
            return 0;
        };
        let got = source.read(raw);
        let raw = raw.get(..got).unwrap_or(&[]);

        #[allow(clippy::arithmetic_side_effects)]
        let frames = got / BYTES_PER_FRAME;
        #[allow(clippy::arithmetic_side_effects)]
        let sample_count = frames * 2;
        let Some(samples) = self.samples.get_mut(..sample_count) else {
            return 0;
        };
        if frames == 0 {
            return 0;
        }

        unpack_samples(raw, samples);
        if self.config.swap_channels {
            swap_channels(samples);
        }
        eq.process(samples, self.volume.scale(source.volume()));

        if let [.., left, right] = samples {
            self.last_sample = (*left, *right);
        }
        pack_samples(samples, self.buffer.half_mut(half));
        frames
    }

    fn update_mute_state(&mut self) {
        if self.volume.is_muted() {
            self.control.mute_dac();
        } else if self.dma_running {
            self.control.unmute_dac();
        }
    }

    /// Host (USB feature unit) mute.
    pub fn set_host_mute(&mut self, muted: bool) {
        self.volume.host_muted = muted;
        self.update_mute_state();
    }

    /// Host mute as last applied.
    pub fn is_host_muted(&self) -> bool {
        self.volume.host_muted
    }

    /// Local attenuation dial, clamped to 100.
    pub fn set_local_volume(&mut self, percent: u8) {
        self.volume.local = VolumePercent::new(percent);
    }

    /// Local attenuation dial.
    pub fn local_volume(&self) -> VolumePercent {
        self.volume.local
    }

    /// Toggle the local mute and update the DAC mute line.
    pub fn toggle_local_mute(&mut self) {
        self.set_local_mute(!self.volume.local_muted);
    }

    /// Set the local mute and update the DAC mute line.
    pub fn set_local_mute(&mut self, muted: bool) {
        self.volume.local_muted = muted;
        self.update_mute_state();
    }

    /// Local mute.
    pub fn is_local_muted(&self) -> bool {
        self.volume.local_muted
    }

    /// Supply headroom tier, normally set once at boot.
    pub fn set_power_tier(&mut self, tier: PowerTier) {
        self.volume.power = tier;
    }

    /// Gain scale the next fill will apply for host volume `host`.
    pub fn volume_scale(&self, host: HostVolumeDb) -> u16 {
        self.volume.scale(host)
    }

    /// Current streaming state.
    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Transfer running?
    pub fn is_transfer_running(&self) -> bool {
        self.dma_running
    }

    /// Pipeline options.
    pub fn config(&self) -> &OutputConfig {
        &self.config
    }

    /// The DMA buffer.
    pub fn buffer(&self) -> &DoubleBuffer {
        &self.buffer
    }

    /// Pair used to pad partial fills and underruns.
    pub fn last_sample(&self) -> (i32, i32) {
        self.last_sample
    }

    /// Refill counters since the previous call; resets them.
    pub fn take_stats(&mut self) -> FillStats {
        core::mem::take(&mut self.stats)
    }

    /// Analog control collaborator.
    pub fn control(&self) -> &C {
        &self.control
    }

    /// Transmitter collaborator.
    pub fn transmitter(&self) -> &T {
        &self.i2s
    }

    /// Transmitter collaborator, e.g. to inject faults into a mock.
    pub fn transmitter_mut(&mut self) -> &mut T {
        &mut self.i2s
    }

    /// Give the collaborators back.
    pub fn release(self) -> (T, C) {
        (self.i2s, self.control)
    }
}
