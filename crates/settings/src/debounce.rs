//! Deferred settings save.
//!
//! Every change restarts a quiet period; the store is written once the user
//! has stopped touching the controls for [`SAVE_DELAY_MS`]. A volume sweep on
//! the encoder therefore costs one flash record instead of dozens.

/// Quiet period before a pending change is written.
pub const SAVE_DELAY_MS: u32 = 2000;

/// Tracks whether settings changed and when.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SaveDebounce {
    dirty_since: Option<u32>,
}

impl SaveDebounce {
    /// Nothing pending.
    pub const fn new() -> Self {
        Self { dirty_since: None }
    }

    /// Record a change at `now_ms`, restarting the quiet period.
    pub fn mark(&mut self, now_ms: u32) {
        self.dirty_since = Some(now_ms);
    }

    /// `true` exactly once, when the quiet period after the last change has
    /// elapsed. Tolerates `now_ms` wrapping.
    pub fn poll(&mut self, now_ms: u32) -> bool {
        match self.dirty_since {
            Some(since) if now_ms.wrapping_sub(since) >= SAVE_DELAY_MS => {
                self.dirty_since = None;
                true
            }
            _ => false,
        }
    }

    /// A change is waiting to be written.
    pub fn is_dirty(&self) -> bool {
        self.dirty_since.is_some()
    }
}
