//! Rotary encoder quadrature accumulator.
//!
//! Both encoder channels raise an EXTI interrupt on either edge (4× decoding).
//! The ISR looks the `(previous, current)` AB state pair up in a transition
//! table and adds ±1 to a shared accumulator. Contact bounce between two
//! adjacent states produces alternating +1/−1 that cancel, so no debounce
//! timer is needed for rotation.
//!
//! The main loop drains whole detents and leaves the sub-detent remainder in
//! place. The accumulator is a multi-bit value updated with read-modify-write
//! from both contexts, so every access happens inside a critical section.

use core::cell::Cell;

use critical_section::Mutex;

/// Quadrature edges per mechanical detent (one full Gray-code cycle).
pub const COUNTS_PER_DETENT: i16 = 4;

/// Transition table indexed by `(prev_ab << 2) | curr_ab` where `ab = (A << 1) | B`.
///
/// CW:  00 → 01 → 11 → 10 → 00
/// CCW: 00 → 10 → 11 → 01 → 00
///
/// Invalid (double-step) and no-change transitions map to 0.
const QDEC_TABLE: [i8; 16] = [
    0, 1, -1, 0, //
    -1, 0, 0, 1, //
    1, 0, 0, -1, //
    0, -1, 1, 0, //
];

#[derive(Clone, Copy)]
struct State {
    accum: i16,
    prev_ab: u8,
}

/// ISR-fed quadrature accumulator with whole-detent draining.
///
/// ```rust
/// use platform::encoder::RotationAccumulator;
///
/// static ENCODER: RotationAccumulator = RotationAccumulator::new();
///
/// // EXTI handler for either encoder pin:
/// ENCODER.on_edge(true, false);
///
/// // main loop:
/// let steps = ENCODER.drain();
/// ```
pub struct RotationAccumulator {
    state: Mutex<Cell<State>>,
}

impl RotationAccumulator {
    /// Zeroed accumulator, both pins assumed low.
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(Cell::new(State {
                accum: 0,
                prev_ab: 0,
            })),
        }
    }

    /// Seed the previous pin state (call once after GPIO init).
    pub fn init(&self, a: bool, b: bool) {
        critical_section::with(|cs| {
            self.state.borrow(cs).set(State {
                accum: 0,
                prev_ab: ab(a, b),
            });
        });
    }

    /// ISR: an edge was seen on either pin; `a`/`b` are the sampled levels.
    pub fn on_edge(&self, a: bool, b: bool) {
        critical_section::with(|cs| {
            let cell = self.state.borrow(cs);
            let mut st = cell.get();
            let curr = ab(a, b);
            let dir = transition(st.prev_ab, curr);
            // negated so physical clockwise counts up
            st.accum = st.accum.saturating_sub(i16::from(dir));
            st.prev_ab = curr;
            cell.set(st);
        });
    }

    /// Add raw counts directly (tests and simulated input).
    pub fn add_counts(&self, counts: i16) {
        critical_section::with(|cs| {
            let cell = self.state.borrow(cs);
            let mut st = cell.get();
            st.accum = st.accum.saturating_add(counts);
            cell.set(st);
        });
    }

    /// Main loop: take all whole detents, keep the remainder.
    ///
    /// Positive = clockwise.
    pub fn drain(&self) -> i16 {
        critical_section::with(|cs| {
            let cell = self.state.borrow(cs);
            let mut st = cell.get();
            let (steps, rest) = split_detents(st.accum);
            st.accum = rest;
            cell.set(st);
            steps
        })
    }

    /// Raw count currently held (including the sub-detent remainder).
    pub fn pending_counts(&self) -> i16 {
        critical_section::with(|cs| {
            self.state.borrow(cs).get().accum
        })
    }
}

impl Default for RotationAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

fn ab(a: bool, b: bool) -> u8 {
    (u8::from(a) << 1) | u8::from(b)
}

fn transition(prev_ab: u8, curr_ab: u8) -> i8 {
    let idx = usize::from(((prev_ab & 0b11) << 2) | (curr_ab & 0b11));
    QDEC_TABLE.get(idx).copied().unwrap_or(0)
}

/// Split a raw count into whole detents (truncated toward zero) and remainder.
pub fn split_detents(accum: i16) -> (i16, i16) {
    // COUNTS_PER_DETENT is a non-zero constant; i16::MIN / 4 cannot overflow
    #[allow(clippy::arithmetic_side_effects)]
    let steps = accum / COUNTS_PER_DETENT;
    #[allow(clippy::arithmetic_side_effects)]
    let rest = accum % COUNTS_PER_DETENT;
    (steps, rest)
}
