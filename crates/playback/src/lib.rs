//! Audio output pipeline for the DA15 USB DAC
//!
//! Moves packed 24-bit PCM from the USB audio FIFO through the active EQ into
//! a circular I2S DMA buffer, one buffer half per refill request:
//!
//! ```text
//! USB FIFO ──read──► [u8; 1440] ──unpack──► [i32; 480] ──swap L/R──►
//!     ActiveEq::process(volume) ──► last pair held ──pack──► [u16; 960] half
//! ```
//!
//! - [`engine::AudioOutput`] - stopped / prebuffering / streaming state machine
//! - [`volume`] - host dB curve × supply headroom × local dial
//! - [`convert`] - wire format ↔ I2S frame conversion
//! - [`double_buffer::DoubleBuffer`] - the DMA buffer
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

pub mod convert;
pub mod double_buffer;
pub mod engine;
pub mod volume;

pub use double_buffer::DoubleBuffer;
pub use engine::{AudioOutput, FillKind, FillStats, OutputConfig, StreamState};
pub use volume::{combined_scale, VolumeState};
