//! EQ profile records and their fixed little-endian byte layout.
//!
//! The same layout is used in flash and on the control channel, so the host
//! application can read and write profiles without a separate codec.
//!
//! ```text
//! Filter (36 bytes)                 Profile (380 bytes)
//! ┌────────┬────────────────┐       ┌────────┬──────────────────┐
//! │ 0..20  │ b0 b1 b2 a1 a2 │ f32   │ 0..16  │ name, NUL-padded │
//! │ 20..32 │ freq gain q    │ f32   │ 16     │ filter count     │
//! │ 32     │ type           │ u8    │ 17..20 │ padding          │
//! │ 33     │ enabled        │ u8    │ 20..   │ 10 × filter      │
//! │ 34..36 │ padding        │       └────────┴──────────────────┘
//! └────────┴────────────────┘
//! ```

use thiserror_no_std::Error;

use crate::biquad::{BiquadFilter, FilterType};

/// Profile slots in the store.
pub const MAX_PROFILES: usize = 10;
/// Biquad sections per profile.
pub const MAX_FILTERS: usize = 10;
/// Name field width including the terminating NUL.
pub const NAME_LEN: usize = 16;

/// Serialized size of one [`BiquadFilter`].
pub const FILTER_RECORD_LEN: usize = 36;
/// Serialized size of one [`EqProfile`].
pub const PROFILE_RECORD_LEN: usize = 20 + MAX_FILTERS * FILTER_RECORD_LEN;

/// Byte-level decode failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeError {
    /// Fewer bytes than the fixed record size.
    #[error("record truncated: {got} of {need} bytes")]
    Truncated {
        /// Bytes supplied.
        got: usize,
        /// Bytes required.
        need: usize,
    },
    /// Store magic word did not match.
    #[error("bad magic {0:#010x}")]
    BadMagic(u32),
    /// Store layout version not understood.
    #[error("unsupported version {0}")]
    UnsupportedVersion(u8),
    /// CRC32 over the profile records did not match the header.
    #[error("checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch {
        /// CRC from the header.
        stored: u32,
        /// CRC recomputed from the records.
        computed: u32,
    },
}

/// Fixed-width NUL-terminated profile name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProfileName([u8; NAME_LEN]);

impl ProfileName {
    /// All-zero (empty) name.
    pub const EMPTY: Self = Self([0; NAME_LEN]);

    /// Wrap raw bytes, forcing the last byte to NUL.
    pub fn from_bytes(mut bytes: [u8; NAME_LEN]) -> Self {
        if let Some(last) = bytes.last_mut() {
            *last = 0;
        }
        Self(bytes)
    }

    /// Copy a string in, truncated to 15 bytes on a character boundary.
    pub fn new(name: &str) -> Self {
        let mut end = name.len().min(NAME_LEN.saturating_sub(1));
        while !name.is_char_boundary(end) {
            end = end.saturating_sub(1);
        }
        let mut bytes = [0u8; NAME_LEN];
        if let (Some(dst), Some(src)) = (bytes.get_mut(..end), name.as_bytes().get(..end)) {
            dst.copy_from_slice(src);
        }
        Self(bytes)
    }

    /// Raw field bytes.
    pub fn as_bytes(&self) -> &[u8; NAME_LEN] {
        &self.0
    }

    /// Text up to the first NUL, or `""` if it is not UTF-8.
    pub fn as_str(&self) -> &str {
        let len = self.0.iter().position(|&b| b == 0).unwrap_or(NAME_LEN);
        self.0
            .get(..len)
            .and_then(|b| core::str::from_utf8(b).ok())
            .unwrap_or("")
    }

    /// First byte is NUL.
    pub fn is_empty(&self) -> bool {
        self.0.first().map_or(true, |&b| b == 0)
    }
}

/// A named cascade of up to [`MAX_FILTERS`] biquad sections.
#[derive(Debug, Clone, PartialEq)]
pub struct EqProfile {
    /// Display name.
    pub name: ProfileName,
    /// Number of leading `filters` in use, 0..=10.
    pub filter_count: u8,
    /// Section storage; entries past `filter_count` are ignored.
    pub filters: [BiquadFilter; MAX_FILTERS],
}

impl Default for EqProfile {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl EqProfile {
    /// Empty slot.
    pub const EMPTY: Self = Self {
        name: ProfileName::EMPTY,
        filter_count: 0,
        filters: [BiquadFilter::DISABLED; MAX_FILTERS],
    };

    /// Build a profile from a name and a list of sections (extra ones dropped).
    pub fn new(name: &str, sections: &[BiquadFilter]) -> Self {
        let mut profile = Self {
            name: ProfileName::new(name),
            ..Self::EMPTY
        };
        for (dst, src) in profile.filters.iter_mut().zip(sections) {
            *dst = *src;
        }
        // bounded by MAX_FILTERS
        #[allow(clippy::cast_possible_truncation)]
        {
            profile.filter_count = sections.len().min(MAX_FILTERS) as u8;
        }
        profile
    }

    /// A slot is empty when it has no name or no sections.
    pub fn is_empty(&self) -> bool {
        self.name.is_empty() || self.filter_count == 0
    }

    /// Sections in use, in processing order.
    pub fn filters(&self) -> &[BiquadFilter] {
        let n = usize::from(self.filter_count).min(MAX_FILTERS);
        self.filters.get(..n).unwrap_or(&[])
    }

    /// Enforce the stored invariants: NUL-terminated name, count ≤ 10.
    pub fn sanitize(&mut self) {
        self.name = ProfileName::from_bytes(self.name.0);
        // MAX_FILTERS fits in u8
        #[allow(clippy::cast_possible_truncation)]
        let max = MAX_FILTERS as u8;
        self.filter_count = self.filter_count.min(max);
    }

    /// Serialize into the 380-byte record layout.
    pub fn encode(&self, out: &mut [u8; PROFILE_RECORD_LEN]) {
        out.fill(0);
        let (head, body) = out.split_at_mut(20);
        if let Some(name) = head.get_mut(..NAME_LEN) {
            name.copy_from_slice(&self.name.0);
        }
        if let Some(count) = head.get_mut(NAME_LEN) {
            *count = self.filter_count;
        }
        for (filter, chunk) in self.filters.iter().zip(body.chunks_exact_mut(FILTER_RECORD_LEN)) {
            encode_filter(filter, chunk);
        }
    }

    /// Parse a 380-byte record. Names and counts are taken as stored.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() < PROFILE_RECORD_LEN {
            return Err(DecodeError::Truncated {
                got: bytes.len(),
                need: PROFILE_RECORD_LEN,
            });
        }
        let mut name = [0u8; NAME_LEN];
        if let Some(src) = bytes.get(..NAME_LEN) {
            name.copy_from_slice(src);
        }
        let mut profile = Self {
            name: ProfileName(name),
            filter_count: bytes.get(NAME_LEN).copied().unwrap_or(0),
            ..Self::EMPTY
        };
        let body = bytes.get(20..PROFILE_RECORD_LEN).unwrap_or(&[]);
        for (filter, chunk) in profile.filters.iter_mut().zip(body.chunks_exact(FILTER_RECORD_LEN)) {
            *filter = decode_filter(chunk);
        }
        Ok(profile)
    }
}

fn encode_filter(filter: &BiquadFilter, out: &mut [u8]) {
    let words = [
        filter.b0,
        filter.b1,
        filter.b2,
        filter.a1,
        filter.a2,
        filter.freq_hz,
        filter.gain_db,
        filter.q,
    ];
    for (word, dst) in words.iter().zip(out.chunks_exact_mut(4)) {
        dst.copy_from_slice(&word.to_le_bytes());
    }
    if let Some(tail) = out.get_mut(32..36) {
        tail.copy_from_slice(&[filter.filter_type.as_byte(), u8::from(filter.enabled), 0, 0]);
    }
}

fn decode_filter(bytes: &[u8]) -> BiquadFilter {
    let word = |i: usize| -> f32 {
        let mut raw = [0u8; 4];
        if let Some(src) = bytes.get(i * 4..i * 4 + 4) {
            raw.copy_from_slice(src);
        }
        f32::from_le_bytes(raw)
    };
    BiquadFilter {
        b0: word(0),
        b1: word(1),
        b2: word(2),
        a1: word(3),
        a2: word(4),
        freq_hz: word(5),
        gain_db: word(6),
        q: word(7),
        filter_type: FilterType::from_byte(bytes.get(32).copied().unwrap_or(0)),
        enabled: bytes.get(33).is_some_and(|&b| b != 0),
    }
}
