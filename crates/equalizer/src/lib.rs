//! Equalizer for the DA15 USB DAC
//!
//! Two EQ engines share the audio fill path, selected per buffer by
//! [`ActiveEq::select`]:
//!
//! - [`LegacyEq`] - fixed-point bass/treble, tuned for 48 kHz, integer-only
//! - [`ParametricEq`] - up to 10 stored profiles of up to 10 biquad sections,
//!   single-precision DF2T, persisted to a dedicated flash sector
//!
//! # Persistence
//!
//! The profile store lives in RAM once loaded. [`ParametricEq::start_flash_save`]
//! erases the sector and [`ParametricEq::flash_task`] then programs the image
//! a bounded number of quad-words per main-loop pass:
//!
//! ```text
//! start_flash_save() ──► erase (blocking, ~2 ms)
//! flash_task()       ──► 32 × 16 B ──► 32 × 16 B ──► ... ──► DoneOk
//! flash_status()     ──► DoneOk (once), then Idle
//! ```
//!
//! # Features
//!
//! - `defmt`: Enable defmt logging and `defmt::Format` derives
//! - `tracing`: Log through `tracing` (host builds)

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(unused_must_use)]
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]

#[macro_use]
mod fmt;

pub mod biquad;
pub mod dispatch;
pub mod engine;
pub mod flash;
pub mod legacy;
pub mod profile;
pub mod store;

pub use biquad::{BiquadFilter, BiquadState, CascadeState, FilterType};
pub use dispatch::ActiveEq;
pub use engine::{LoadError, ParametricEq, ProfileError, OFF_NAME, PROFILE_OFF};
pub use flash::{FlashStatus, FlashWriter, SaveError};
pub use legacy::{Band, LegacyEq};
pub use profile::{DecodeError, EqProfile, ProfileName, MAX_FILTERS, MAX_PROFILES};
pub use store::ProfileStore;
