//! In-RAM profile store and its flash image.
//!
//! ```text
//! offset  size  field
//! 0       4     magic 0xEA150F1E (LE)
//! 4       1     version
//! 5       1     profile count
//! 6       2     reserved
//! 8       4     CRC32 of bytes 16..3816 (LE)
//! 12      4     reserved
//! 16      3800  10 × profile record
//! ```
//!
//! The CRC covers only the profile records. A header damaged in a way that
//! still passes the magic/version checks is not detected.

use crc32fast::Hasher;

use crate::profile::{DecodeError, EqProfile, MAX_PROFILES, PROFILE_RECORD_LEN};

/// Store magic word.
pub const STORE_MAGIC: u32 = 0xEA15_0F1E;
/// Store layout version.
pub const STORE_VERSION: u8 = 1;
/// Header bytes before the first profile record.
pub const HEADER_LEN: usize = 16;
/// Serialized store size.
pub const STORE_LEN: usize = HEADER_LEN + MAX_PROFILES * PROFILE_RECORD_LEN;

/// All profile slots plus header bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileStore {
    /// Non-empty slots, as of the last mutation (or as loaded).
    pub profile_count: u8,
    /// CRC32 of the serialized records, updated when a save starts.
    pub checksum: u32,
    /// Slot storage.
    pub profiles: [EqProfile; MAX_PROFILES],
}

impl Default for ProfileStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileStore {
    /// Empty, valid-shaped store.
    pub const fn new() -> Self {
        Self {
            profile_count: 0,
            checksum: 0,
            profiles: [EqProfile::EMPTY; MAX_PROFILES],
        }
    }

    /// Recount non-empty slots.
    pub fn recount(&mut self) {
        let n = self.profiles.iter().filter(|p| !p.is_empty()).count();
        // at most MAX_PROFILES
        #[allow(clippy::cast_possible_truncation)]
        {
            self.profile_count = n as u8;
        }
    }

    /// CRC32 (reflected 0xEDB88320, zlib) over the serialized records.
    pub fn compute_checksum(&self) -> u32 {
        let mut hasher = Hasher::new();
        let mut record = [0u8; PROFILE_RECORD_LEN];
        for profile in &self.profiles {
            profile.encode(&mut record);
            hasher.update(&record);
        }
        hasher.finalize()
    }

    /// Store `compute_checksum()` in the header.
    pub fn seal(&mut self) {
        self.checksum = self.compute_checksum();
    }

    fn encode_header(&self) -> [u8; HEADER_LEN] {
        let mut h = [0u8; HEADER_LEN];
        let magic = STORE_MAGIC.to_le_bytes();
        let crc = self.checksum.to_le_bytes();
        let fields: [(usize, &[u8]); 4] = [
            (0, &magic),
            (4, &[STORE_VERSION]),
            (5, &[self.profile_count]),
            (8, &crc),
        ];
        for (at, bytes) in fields {
            if let Some(dst) = h.get_mut(at..at.saturating_add(bytes.len())) {
                dst.copy_from_slice(bytes);
            }
        }
        h
    }

    /// Serialize the image bytes `[offset, offset + out.len())`.
    ///
    /// Returns how many bytes were produced; anything past [`STORE_LEN`] is
    /// left untouched. Only the records overlapping the window are encoded.
    pub fn encode_window(&self, offset: usize, out: &mut [u8]) -> usize {
        let end = offset.saturating_add(out.len()).min(STORE_LEN);
        if offset >= end {
            return 0;
        }

        let header = self.encode_header();
        copy_overlap(&header, 0, offset, end, out);

        let mut record = [0u8; PROFILE_RECORD_LEN];
        for (i, profile) in self.profiles.iter().enumerate() {
            // i < MAX_PROFILES keeps this inside STORE_LEN
            #[allow(clippy::arithmetic_side_effects)]
            let start = HEADER_LEN + i * PROFILE_RECORD_LEN;
            #[allow(clippy::arithmetic_side_effects)]
            let stop = start + PROFILE_RECORD_LEN;
            if stop <= offset || start >= end {
                continue;
            }
            profile.encode(&mut record);
            copy_overlap(&record, start, offset, end, out);
        }

        // offset < end checked above
        #[allow(clippy::arithmetic_side_effects)]
        let produced = end - offset;
        produced
    }

    /// Serialize the whole store.
    pub fn encode(&self, out: &mut [u8; STORE_LEN]) {
        self.encode_window(0, out);
    }

    /// Parse and validate a store image: magic, version, then CRC.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() < STORE_LEN {
            return Err(DecodeError::Truncated {
                got: bytes.len(),
                need: STORE_LEN,
            });
        }
        let word = |at: usize| -> u32 {
            let mut raw = [0u8; 4];
            if let Some(src) = bytes.get(at..at.saturating_add(4)) {
                raw.copy_from_slice(src);
            }
            u32::from_le_bytes(raw)
        };

        let magic = word(0);
        if magic != STORE_MAGIC {
            return Err(DecodeError::BadMagic(magic));
        }
        let version = bytes.get(4).copied().unwrap_or(0);
        if version != STORE_VERSION {
            return Err(DecodeError::UnsupportedVersion(version));
        }

        let records = bytes.get(HEADER_LEN..STORE_LEN).unwrap_or(&[]);
        let stored = word(8);
        let computed = crc32fast::hash(records);
        if stored != computed {
            return Err(DecodeError::ChecksumMismatch { stored, computed });
        }

        let mut store = Self {
            profile_count: bytes.get(5).copied().unwrap_or(0),
            checksum: stored,
            ..Self::new()
        };
        for (slot, chunk) in store
            .profiles
            .iter_mut()
            .zip(records.chunks_exact(PROFILE_RECORD_LEN))
        {
            *slot = EqProfile::decode(chunk)?;
        }
        Ok(store)
    }
}

/// Copy the part of `src` (placed at image offset `src_at`) that falls in the
/// window `[win_start, win_end)` into `out` (which starts at `win_start`).
fn copy_overlap(src: &[u8], src_at: usize, win_start: usize, win_end: usize, out: &mut [u8]) {
    let lo = src_at.max(win_start);
    let hi = src_at.saturating_add(src.len()).min(win_end);
    if lo >= hi {
        return;
    }
    // lo >= both bases and hi > lo, so every subtraction is non-negative
    #[allow(clippy::arithmetic_side_effects)]
    let (s, d, n) = (lo - src_at, lo - win_start, hi - lo);
    if let (Some(dst), Some(from)) = (out.get_mut(d..d.saturating_add(n)), src.get(s..s.saturating_add(n))) {
        dst.copy_from_slice(from);
    }
}
