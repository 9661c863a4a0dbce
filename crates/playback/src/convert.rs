//! Sample format conversion between the USB wire format and I2S frames.
//!
//! ```text
//! USB (6 bytes / frame)          I2S (4 half-words / frame)
//! ┌────┬────┬────┐┌────┬────┬────┐   ┌────────┬────────┬────────┬────────┐
//! │ L0 │ L1 │ L2 ││ R0 │ R1 │ R2 │   │ L[23:8]│L[7:0]<<8│R[23:8]│R[7:0]<<8│
//! └────┴────┴────┘└────┴────┴────┘   └────────┴────────┴────────┴────────┘
//!  24-bit LE, signed                  32-bit slot, sample left-justified
//! ```

/// Stereo frames per buffer half (5 ms at 48 kHz).
pub const FRAMES_PER_HALF: usize = 240;
/// Packed USB bytes per stereo frame (2 × 3).
pub const BYTES_PER_FRAME: usize = 6;
/// Packed USB bytes needed to fill one buffer half.
pub const USB_BYTES_PER_HALF: usize = FRAMES_PER_HALF * BYTES_PER_FRAME;
/// Channel samples (L + R) per buffer half.
pub const SAMPLES_PER_HALF: usize = FRAMES_PER_HALF * 2;
/// I2S half-words per stereo frame (two 32-bit slots).
pub const HALFWORDS_PER_FRAME: usize = 4;
/// I2S half-words per buffer half.
pub const HALFWORDS_PER_HALF: usize = FRAMES_PER_HALF * HALFWORDS_PER_FRAME;

/// Decode one 24-bit little-endian sample, sign-extended.
#[inline]
pub fn unpack_sample(bytes: [u8; 3]) -> i32 {
    // shift the sample into the top 24 bits, then arithmetic-shift back down
    i32::from_le_bytes([0, bytes[0], bytes[1], bytes[2]]) >> 8
}

/// Unpack whole samples from `raw` into `out`; returns how many were written.
///
/// A trailing partial sample in `raw` is ignored.
pub fn unpack_samples(raw: &[u8], out: &mut [i32]) -> usize {
    let mut n = 0usize;
    for (dst, src) in out.iter_mut().zip(raw.chunks_exact(3)) {
        if let &[b0, b1, b2] = src {
            *dst = unpack_sample([b0, b1, b2]);
            n = n.saturating_add(1);
        }
    }
    n
}

/// Exchange left and right in an interleaved stereo buffer.
pub fn swap_channels(samples: &mut [i32]) {
    for pair in samples.chunks_exact_mut(2) {
        pair.swap(0, 1);
    }
}

/// One 24-bit sample as its two I2S half-words `[bits 23..8, bits 7..0 << 8]`.
#[inline]
pub fn pack_sample(sample: i32) -> [u16; 2] {
    // both masks keep the values inside u16
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let hi = ((sample >> 8) & 0xFFFF) as u16;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let lo = ((sample & 0xFF) << 8) as u16;
    [hi, lo]
}

/// Pack samples into I2S half-words; `dst` needs two half-words per sample.
pub fn pack_samples(samples: &[i32], dst: &mut [u16]) {
    for (&s, slot) in samples.iter().zip(dst.chunks_exact_mut(2)) {
        slot.copy_from_slice(&pack_sample(s));
    }
}

/// Fill every whole frame of `dst` with the same stereo pair.
pub fn fill_hold(dst: &mut [u16], (left, right): (i32, i32)) {
    let [l_hi, l_lo] = pack_sample(left);
    let [r_hi, r_lo] = pack_sample(right);
    for frame in dst.chunks_exact_mut(HALFWORDS_PER_FRAME) {
        frame.copy_from_slice(&[l_hi, l_lo, r_hi, r_lo]);
    }
}
