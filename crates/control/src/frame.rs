//! Request frame reassembly.
//!
//! ```text
//! ┌─────┬────────┬────────┬──────────────┬──────┐
//! │ cmd │ len lo │ len hi │ payload[len] │ crc8 │   crc8 over cmd..payload
//! └─────┴────────┴────────┴──────────────┴──────┘
//! ```
//!
//! Bytes are pushed one at a time, so frames may arrive split across any
//! number of reads. There is no timeout: a frame that stalls mid-payload
//! simply completes when the rest arrives.
//!
//! A declared length above [`MAX_PAYLOAD`] abandons the frame at once and the
//! next byte is taken as a new command. A CRC mismatch drops the frame
//! silently; the host is expected to time out and retry.

use crate::crc8;

/// Largest accepted payload.
pub const MAX_PAYLOAD: usize = 512;
/// Command byte plus the 16-bit length.
pub const HEADER_LEN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum RxState {
    Command,
    LenLo,
    LenHi,
    Payload,
    Crc,
}

/// A validated request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    /// Raw command byte.
    pub command: u8,
    /// Payload bytes (possibly empty).
    pub payload: &'a [u8],
}

/// Frames thrown away since construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DropCounters {
    /// Trailing byte did not match the CRC.
    pub bad_crc: u32,
    /// Declared length above [`MAX_PAYLOAD`].
    pub oversized: u32,
}

/// Byte-at-a-time frame assembler.
pub struct FrameParser {
    state: RxState,
    command: u8,
    len: u16,
    pos: usize,
    payload: [u8; MAX_PAYLOAD],
    drops: DropCounters,
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameParser {
    /// Parser waiting for a command byte.
    pub const fn new() -> Self {
        Self {
            state: RxState::Command,
            command: 0,
            len: 0,
            pos: 0,
            payload: [0; MAX_PAYLOAD],
            drops: DropCounters {
                bad_crc: 0,
                oversized: 0,
            },
        }
    }

    /// Forget any partial frame.
    pub fn reset(&mut self) {
        self.state = RxState::Command;
        self.pos = 0;
    }

    /// Waiting for the first byte of a frame?
    pub fn is_idle(&self) -> bool {
        self.state == RxState::Command
    }

    /// Dropped-frame counters.
    pub fn drops(&self) -> DropCounters {
        self.drops
    }

    /// Feed one byte. Returns the frame when `byte` completes a valid one.
    pub fn push(&mut self, byte: u8) -> Option<Frame<'_>> {
        match self.state {
            RxState::Command => {
                self.command = byte;
                self.state = RxState::LenLo;
            }
            RxState::LenLo => {
                self.len = u16::from(byte);
                self.state = RxState::LenHi;
            }
            RxState::LenHi => {
                self.len |= u16::from(byte) << 8;
                self.pos = 0;
                self.state = if self.len == 0 {
                    RxState::Crc
                } else if usize::from(self.len) > MAX_PAYLOAD {
                    debug!("frame length {} over limit, resync", self.len);
                    self.drops.oversized = self.drops.oversized.saturating_add(1);
                    RxState::Command
                } else {
                    RxState::Payload
                };
            }
            RxState::Payload => {
                if let Some(slot) = self.payload.get_mut(self.pos) {
                    *slot = byte;
                }
                self.pos = self.pos.saturating_add(1);
                if self.pos >= usize::from(self.len) {
                    self.state = RxState::Crc;
                }
            }
            RxState::Crc => {
                self.state = RxState::Command;
                let payload = self.payload.get(..usize::from(self.len)).unwrap_or(&[]);
                let [lo, hi] = self.len.to_le_bytes();
                let expected = crc8::update(crc8::crc8(&[self.command, lo, hi]), payload);
                if expected != byte {
                    debug!("frame crc mismatch: got {}, want {}", byte, expected);
                    self.drops.bad_crc = self.drops.bad_crc.saturating_add(1);
                    return None;
                }
                return Some(Frame {
                    command: self.command,
                    payload,
                });
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(cmd: u8, payload: &[u8]) -> Vec<u8> {
        let len = payload.len() as u16;
        let mut out = vec![cmd, len as u8, (len >> 8) as u8];
        out.extend_from_slice(payload);
        out.push(crc8::crc8(&out));
        out
    }

    fn feed(parser: &mut FrameParser, bytes: &[u8]) -> Vec<(u8, Vec<u8>)> {
        let mut frames = Vec::new();
        for &b in bytes {
            if let Some(f) = parser.push(b) {
                frames.push((f.command, f.payload.to_vec()));
            }
        }
        frames
    }

    #[test]
    fn zero_length_frame_skips_payload() {
        let mut p = FrameParser::new();
        let got = feed(&mut p, &frame(0x01, &[]));
        assert_eq!(got, vec![(0x01, vec![])]);
        assert!(p.is_idle());
    }

    #[test]
    fn payload_frame_is_reassembled() {
        let mut p = FrameParser::new();
        let got = feed(&mut p, &frame(0x03, &[7]));
        assert_eq!(got, vec![(0x03, vec![7])]);
    }

    #[test]
    fn bad_crc_is_dropped_and_parser_resyncs() {
        let mut p = FrameParser::new();
        let mut bad = frame(0x01, &[]);
        *bad.last_mut().unwrap() ^= 0xFF;
        bad.extend(frame(0x02, &[]));

        let got = feed(&mut p, &bad);
        assert_eq!(got, vec![(0x02, vec![])]);
        assert_eq!(p.drops().bad_crc, 1);
    }

    #[test]
    fn oversized_length_aborts_immediately() {
        let mut p = FrameParser::new();
        // 513-byte declared length, then a valid frame right behind it
        let mut bytes = vec![0x04, 0x01, 0x02];
        bytes.extend(frame(0x01, &[]));

        let got = feed(&mut p, &bytes);
        assert_eq!(got, vec![(0x01, vec![])]);
        assert_eq!(p.drops().oversized, 1);
    }

    #[test]
    fn max_payload_is_accepted() {
        let mut p = FrameParser::new();
        let payload = vec![0xA5; MAX_PAYLOAD];
        let got = feed(&mut p, &frame(0x04, &payload));
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].1.len(), MAX_PAYLOAD);
    }

    #[test]
    fn reset_discards_partial_frame() {
        let mut p = FrameParser::new();
        feed(&mut p, &[0x03, 0x05, 0x00, 1, 2]);
        assert!(!p.is_idle());
        p.reset();
        assert_eq!(feed(&mut p, &frame(0x01, &[])).len(), 1);
    }
}
