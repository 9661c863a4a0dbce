//! DA15 USB DAC firmware core
//!
//! Wires the workspace crates into one device:
//!
//! ```text
//!   USB audio FIFO ──► playback::AudioOutput ──► I2S DMA ──► DAC
//!                            ▲
//!                  equalizer::ActiveEq (two-band or parametric)
//!                            ▲
//!   CDC serial ────► control::ControlChannel ──► equalizer::ParametricEq ──► flash
//!   encoder ISR ───► platform::RotationAccumulator ──► local volume
//!                                                   └─► settings::SettingsStore ──► flash
//! ```
//!
//! The board support package (clocks, USB stack, DMA and EXTI interrupts)
//! builds a [`Parts`] and then calls [`Firmware::boot`] once and
//! [`Firmware::poll`] forever.
//!
//! # Features
//!
//! - `defmt`: Enable defmt logging on every crate (hardware builds)
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
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]

#[macro_use]
mod fmt;

pub mod app;
pub mod boot;

pub use app::{DisplayPrefs, Firmware};
pub use boot::Parts;
