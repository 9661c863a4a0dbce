//! Control protocol for the DA15 USB DAC
//!
//! A host application manages EQ profiles over a CDC serial port with a small
//! framed binary protocol:
//!
//! ```text
//! request:  [cmd] [len lo] [len hi] [payload; len] [crc8]
//! response: [cmd|0x80] [len lo] [len hi] [status] [payload; len-1] [crc8]
//! ```
//!
//! | cmd  | request          | response payload                          |
//! |------|------------------|-------------------------------------------|
//! | 0x01 | -                | major, minor, patch, 10, 10, active id    |
//! | 0x02 | -                | count, then (id, name[16]) per profile    |
//! | 0x03 | id               | 380-byte profile record                   |
//! | 0x04 | id, record       | -                                         |
//! | 0x05 | id               | -                                         |
//! | 0x06 | id (0xFF = off)  | -                                         |
//! | 0x07 | -                | - (writes continue in the flash task)     |
//! | 0x08 | -                | - (device reboots into update mode)       |
//!
//! Frames with a bad CRC get no answer at all.
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

pub mod channel;
pub mod command;
pub mod crc8;
pub mod frame;
pub mod handler;
pub mod response;

pub use channel::ControlChannel;
pub use command::{Command, Status, UnknownCommand};
pub use frame::{Frame, FrameParser, MAX_PAYLOAD};
pub use handler::{handle, FollowUp};
pub use response::Response;
