//! Cooperative main loop.
//!
//! Everything runs from [`Firmware::poll`] on the single main thread. The only
//! state shared with interrupts is the DMA half flags, the encoder accumulator
//! and the ECC fault latch, all owned by `platform`.

use control::ControlChannel;
use embedded_io::{Read, ReadReady, Write};
use embedded_storage::nor_flash::NorFlash;
use equalizer::{ActiveEq, Band, LegacyEq, ParametricEq};
use platform::{
    I2sTransmitter, OutputControl, RotationAccumulator, UpdateModeTrigger, UsbAudioSource,
};
use playback::AudioOutput;
use settings::record::{BRIGHTNESS_MAX, TIMEOUT_MAX};
use settings::{SaveDebounce, Settings, SettingsStore};

/// Display preferences persisted alongside the audio settings.
///
/// The display itself lives outside this crate; these values are only
/// carried through the settings record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DisplayPrefs {
    /// 0 = low, 1 = mid, 2 = high.
    pub brightness: u8,
    /// 0 = never, 1 = 2 s, 2 = 5 s, 3 = 10 s.
    pub timeout: u8,
}

/// The whole device: output pipeline, both EQ engines, control channel and
/// settings persistence.
pub struct Firmware<'a, T, C, F, S, IO> {
    pub(crate) output: AudioOutput<'a, T, C>,
    pub(crate) legacy: LegacyEq,
    pub(crate) parametric: ParametricEq<F>,
    pub(crate) control: ControlChannel<IO>,
    pub(crate) settings: SettingsStore<S>,
    pub(crate) debounce: SaveDebounce,
    pub(crate) encoder: &'a RotationAccumulator,
    pub(crate) display: DisplayPrefs,
    /// Settings as of the last change seen by `poll`.
    pub(crate) observed: Settings,
}

impl<'a, T, C, F, S, IO> Firmware<'a, T, C, F, S, IO>
where
    T: I2sTransmitter,
    C: OutputControl,
    F: NorFlash,
    S: NorFlash,
    IO: Read + ReadReady + Write,
{
    /// One main-loop iteration at tick `now_ms`.
    ///
    /// Runs, in order: audio refill, control protocol, one flash write step,
    /// encoder drain, settings persistence.
    pub fn poll<U, M>(&mut self, now_ms: u32, usb: &mut U, update: &mut M)
    where
        U: UsbAudioSource,
        M: UpdateModeTrigger,
    {
        let mut eq = ActiveEq::select(&mut self.legacy, &mut self.parametric);
        self.output.task(usb, &mut eq);

        if self.control.poll(&mut self.parametric, update).is_err() {
            warn!("control channel I/O error");
        }

        self.parametric.flash_task();

        let steps = self.encoder.drain();
        if steps != 0 {
            let volume = self.output.local_volume().step(steps);
            self.output.set_local_volume(volume.get());
        }

        self.persist(now_ms);
    }

    /// Mark settings dirty on any change and write them once they settle.
    fn persist(&mut self, now_ms: u32) {
        let current = self.snapshot();
        if current != self.observed {
            self.observed = current;
            self.debounce.mark(now_ms);
        }

        if self.debounce.poll(now_ms) {
            if let Err(e) = self.settings.save(&current) {
                error!("settings save failed: {}", e);
            }
        }
    }

    /// Live state in persisted form.
    pub fn snapshot(&self) -> Settings {
        Settings {
            local_volume: self.output.local_volume().get(),
            local_muted: self.output.is_local_muted(),
            bass: self.legacy.band(Band::Bass),
            treble: self.legacy.band(Band::Treble),
            brightness: self.display.brightness,
            display_timeout: self.display.timeout,
            active_profile: self.parametric.active_id_byte(),
        }
    }

    /// Host opened the streaming interface.
    pub fn on_stream_started(&mut self) {
        self.legacy.reset_state();
        self.parametric.reset_state();
        self.output.start_streaming();
    }

    /// Host closed the streaming interface.
    pub fn on_stream_stopped(&mut self) {
        if self.output.stop_streaming().is_err() {
            error!("output restart on silence failed");
        }
    }

    /// Encoder push: toggle the local mute.
    pub fn toggle_mute(&mut self) {
        self.output.toggle_local_mute();
    }

    /// Move a two-band EQ level by `delta` detents (clamped).
    pub fn adjust_band(&mut self, band: Band, delta: i8) {
        let level = self.legacy.band(band).saturating_add(delta);
        self.legacy.set_band(band, level);
    }

    /// Change the persisted display preferences (clamped).
    pub fn set_display_prefs(&mut self, prefs: DisplayPrefs) {
        self.display = DisplayPrefs {
            brightness: prefs.brightness.min(BRIGHTNESS_MAX),
            timeout: prefs.timeout.min(TIMEOUT_MAX),
        };
    }

    /// Current display preferences.
    pub fn display_prefs(&self) -> DisplayPrefs {
        self.display
    }

    /// A settings write is pending.
    pub fn settings_dirty(&self) -> bool {
        self.debounce.is_dirty()
    }

    /// Output pipeline.
    pub fn output(&self) -> &AudioOutput<'a, T, C> {
        &self.output
    }

    /// Two-band EQ.
    pub fn legacy_eq(&self) -> &LegacyEq {
        &self.legacy
    }

    /// Parametric EQ engine.
    pub fn parametric_eq(&self) -> &ParametricEq<F> {
        &self.parametric
    }

    /// Control channel.
    pub fn control(&self) -> &ControlChannel<IO> {
        &self.control
    }

    /// Control channel, mutably (host tests feed the stream through it).
    pub fn control_mut(&mut self) -> &mut ControlChannel<IO> {
        &mut self.control
    }

    /// Settings page.
    pub fn settings_store(&self) -> &SettingsStore<S> {
        &self.settings
    }
}
