//! Hardware Abstraction Layer (HAL) for the DA15 USB DAC / headphone amplifier
//!
//! This crate provides trait-based abstractions for every hardware
//! collaborator the audio core talks to, enabling development and testing
//! without physical hardware.
//!
//! # Architecture Layers
//!
//! ```text
//! Application Layer (firmware crate)
//!         ↓
//! Feature Layers (playback, equalizer, control, settings)
//!         ↓
//! Platform HAL (this crate - trait abstractions + ISR handoff primitives)
//!         ↓
//! Hardware Layer (HAL + PAC, USB class driver, I2S DMA)
//! ```
//!
//! # Abstraction Levels
//!
//! ## Collaborator traits
//! - [`UsbAudioSource`] - isochronous PCM FIFO + host volume/mute
//! - [`I2sTransmitter`] - circular DMA transfer into the DAC
//! - [`OutputControl`] - DAC mute line and headphone amplifier enable
//! - [`UpdateModeTrigger`] - reboot into the hardware update (DFU) mode
//! - Flash regions use [`embedded_storage::nor_flash::NorFlash`]
//! - The control channel uses [`embedded_io`] byte streams
//!
//! ## Interrupt handoff primitives
//! - [`dma::HalfFillFlags`] - per-half "needs fill" flags (DMA ISR → main loop)
//! - [`encoder::RotationAccumulator`] - quadrature edge accumulator (EXTI ISR → main loop)
//! - [`fault::IntegrityFault`] - flash ECC fault latch (NMI → main loop)
//!
//! # Features
//!
//! - `std`: Enable mocks outside of `cfg(test)` (for downstream tests)
//! - `defmt`: Enable defmt::Format derives

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(clippy::unreachable)] // no unreachable!() that isn't documented
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
#![allow(clippy::doc_markdown)] // register and pin names in doc comments
#![allow(clippy::must_use_candidate)] // hardware accessors, callers decide
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod audio;
pub mod audio_types;
pub mod config;
pub mod dma;
pub mod encoder;
pub mod fault;
pub mod system;

#[cfg(any(test, feature = "std"))]
pub mod mocks;

// Re-export main collaborator traits
pub use audio::{I2sTransmitter, OutputControl, PinOutputControl, UsbAudioSource};
pub use system::UpdateModeTrigger;

// Re-export domain newtypes
pub use audio_types::{HostVolumeDb, OutOfRangeError, PowerTier, SampleRateHz, VolumePercent};

// Re-export handoff primitives
pub use dma::{Half, HalfFillFlags};
pub use encoder::RotationAccumulator;
pub use fault::IntegrityFault;
