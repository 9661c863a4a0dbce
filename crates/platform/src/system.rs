//! System-level collaborators.

/// Reboots the MCU into its hardware update (DFU) mode.
///
/// On the target this writes a magic word to the top of RAM and requests a
/// system reset, so a successful call never returns. Host implementations
/// just record the request.
pub trait UpdateModeTrigger {
    /// Request the reboot. Anything still queued on the USB stack may be lost.
    fn enter_update_mode(&mut self);
}
