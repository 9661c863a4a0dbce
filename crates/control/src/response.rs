//! Response frame builder.
//!
//! ```text
//! ┌────────────┬────────┬────────┬────────┬────────────┬──────┐
//! │ cmd | 0x80 │ len lo │ len hi │ status │ payload... │ crc8 │
//! └────────────┴────────┴────────┴────────┴────────────┴──────┘
//!                len = 1 + payload length
//! ```

use heapless::Vec;

use crate::command::Status;
use crate::crc8;
use crate::frame::{HEADER_LEN, MAX_PAYLOAD};

/// Marker set on the command byte of every response.
pub const RESPONSE_FLAG: u8 = 0x80;
/// Largest response frame: header, status, payload, CRC.
pub const MAX_RESPONSE_LEN: usize = HEADER_LEN + 1 + MAX_PAYLOAD + 1;

/// One response frame, built in place.
pub struct Response {
    buf: Vec<u8, MAX_RESPONSE_LEN>,
    sealed: bool,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    /// Empty builder.
    pub const fn new() -> Self {
        Self {
            buf: Vec::new(),
            sealed: false,
        }
    }

    /// Start a response to `command` with `status` and no payload yet.
    pub fn begin(&mut self, command: u8, status: Status) {
        self.buf.clear();
        self.sealed = false;
        for b in [command | RESPONSE_FLAG, 0, 0, u8::from(status)] {
            let _ = self.buf.push(b);
        }
    }

    /// Start an error response (status only).
    pub fn error(&mut self, command: u8, status: Status) {
        self.begin(command, status);
    }

    /// Append payload bytes. Payloads are bounded by construction; anything
    /// past [`MAX_PAYLOAD`] is dropped.
    pub fn extend(&mut self, bytes: &[u8]) {
        let room = MAX_RESPONSE_LEN.saturating_sub(1).saturating_sub(self.buf.len());
        let take = bytes.len().min(room);
        if take < bytes.len() {
            warn!("response payload truncated by {} bytes", bytes.len().saturating_sub(take));
        }
        let _ = self.buf.extend_from_slice(bytes.get(..take).unwrap_or(&[]));
    }

    /// Append one payload byte.
    pub fn push(&mut self, byte: u8) {
        self.extend(&[byte]);
    }

    /// Fill in the length and CRC. Idempotent.
    pub fn seal(&mut self) -> &[u8] {
        if !self.sealed && self.buf.len() > HEADER_LEN {
            let len = u16::try_from(self.buf.len().saturating_sub(HEADER_LEN)).unwrap_or(u16::MAX);
            if let Some(field) = self.buf.get_mut(1..HEADER_LEN) {
                field.copy_from_slice(&len.to_le_bytes());
            }
            let crc = crc8::crc8(&self.buf);
            let _ = self.buf.push(crc);
            self.sealed = true;
        }
        &self.buf
    }

    /// Sealed frame bytes; empty until [`Self::seal`].
    pub fn as_bytes(&self) -> &[u8] {
        if self.sealed {
            &self.buf
        } else {
            &[]
        }
    }

    /// Status byte of the frame being built.
    pub fn status(&self) -> Option<u8> {
        self.buf.get(HEADER_LEN).copied()
    }
}
