//! Boot sequence.
//!
//! Order matters:
//!   1. Load persisted settings (erasing the page on an ECC fault)
//!   2. Restore both EQ engines (two-band levels, parametric store from flash)
//!   3. Preset local volume so the first audible sample is already attenuated
//!   4. Anti-pop output power-up (mute, start on silence, settle, amp on)
//!   5. Re-apply local mute (power-up always ends unmuted)

use control::ControlChannel;
use embedded_hal::delay::DelayNs;
use embedded_io::{Read, ReadReady, Write};
use embedded_storage::nor_flash::NorFlash;
use equalizer::{Band, LegacyEq, ParametricEq};
use platform::{
    config, HalfFillFlags, I2sTransmitter, IntegrityFault, OutputControl, PowerTier,
    RotationAccumulator,
};
use playback::{AudioOutput, OutputConfig};
use settings::{SaveDebounce, Settings, SettingsStore};

use crate::app::{DisplayPrefs, Firmware};

/// Everything the board support code hands over at boot.
pub struct Parts<'a, T, C, F, S, IO> {
    /// Circular I2S DMA feeding the DAC.
    pub i2s: T,
    /// DAC mute line and amplifier enable.
    pub output_control: C,
    /// Half-complete flags set by the DMA interrupt.
    pub half_flags: &'a HalfFillFlags,
    /// Output pipeline tuning.
    pub output_config: OutputConfig,
    /// Flash holding the EQ profile store.
    pub eq_flash: F,
    /// Offset of the profile store region in `eq_flash`.
    pub eq_base: u32,
    /// Flash holding the settings page.
    pub settings_flash: S,
    /// Offset of the settings page in `settings_flash`.
    pub settings_base: u32,
    /// CDC byte stream carrying the control protocol.
    pub control_io: IO,
    /// Encoder accumulator fed from the EXTI interrupt.
    pub encoder: &'a RotationAccumulator,
    /// ECC fault latch set by the NMI handler.
    pub integrity_fault: &'a IntegrityFault,
    /// Supply tier read from the USB-C CC lines.
    pub power: PowerTier,
}

impl<'a, T, C, F, S, IO> Firmware<'a, T, C, F, S, IO>
where
    T: I2sTransmitter,
    C: OutputControl,
    F: NorFlash,
    S: NorFlash,
    IO: Read + ReadReady + Write,
{
    /// Bring the device up from `parts`.
    ///
    /// # Errors
    ///
    /// Returns the transmitter error if the output transfer could not be
    /// started; the DAC stays muted and the amplifier off.
    pub fn boot<D: DelayNs>(
        parts: Parts<'a, T, C, F, S, IO>,
        delay: &mut D,
    ) -> Result<Self, T::Error> {
        let Parts {
            i2s,
            output_control,
            half_flags,
            output_config,
            eq_flash,
            eq_base,
            settings_flash,
            settings_base,
            control_io,
            encoder,
            integrity_fault,
            power,
        } = parts;
        info!(
            "{} firmware {}.{}.{} booting",
            config::DEVICE_NAME,
            config::FW_VERSION_MAJOR,
            config::FW_VERSION_MINOR,
            config::FW_VERSION_PATCH
        );

        let mut settings = SettingsStore::new(settings_flash, settings_base);
        let saved = settings.load(integrity_fault).unwrap_or_default();

        let mut legacy = LegacyEq::new();
        legacy.set_band(Band::Bass, saved.bass);
        legacy.set_band(Band::Treble, saved.treble);

        let mut parametric = ParametricEq::new(eq_flash, eq_base);
        // a missing or corrupt store leaves every slot empty
        let _ = parametric.init();
        parametric.set_active(saved.active_profile);

        let mut output = AudioOutput::new(i2s, output_control, half_flags, output_config);
        output.set_power_tier(power);
        output.set_local_volume(saved.local_volume);
        output.init(delay)?;
        output.set_local_mute(saved.local_muted);

        let display = DisplayPrefs {
            brightness: saved.brightness,
            timeout: saved.display_timeout,
        };

        let mut fw = Self {
            output,
            legacy,
            parametric,
            control: ControlChannel::new(control_io),
            settings,
            debounce: SaveDebounce::new(),
            encoder,
            display,
            observed: Settings::default(),
        };
        fw.observed = fw.snapshot();
        info!(
            "boot complete: volume {}, profile {}",
            fw.observed.local_volume,
            fw.observed.active_profile
        );
        Ok(fw)
    }
}
