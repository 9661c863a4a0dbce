//! Persistent user settings for the DA15 USB DAC
//!
//! Local volume, mute, two-band EQ, display preferences and the active EQ
//! profile live in one dedicated flash page as a log of 16-byte records.
//! [`SettingsStore`] appends and recovers them; [`SaveDebounce`] decides when
//! a change is worth writing.
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

pub mod debounce;
pub mod record;
pub mod store;

pub use debounce::{SaveDebounce, SAVE_DELAY_MS};
pub use record::{Settings, RECORD_LEN, RECORD_MAGIC};
pub use store::{SettingsError, SettingsStore, PAGE_LEN, RECORDS_PER_PAGE};
