//! Device identity constants
//!
//! Everything the host application can learn about the firmware through the
//! control channel lives here, so the protocol and the boot banner agree.

/// Product name
pub const DEVICE_NAME: &str = "DA15";

/// Firmware version reported over the control channel: major.
pub const FW_VERSION_MAJOR: u8 = 2;

/// Firmware version reported over the control channel: minor.
pub const FW_VERSION_MINOR: u8 = 0;

/// Firmware version reported over the control channel: patch.
pub const FW_VERSION_PATCH: u8 = 0;

/// Crate version (synchronized with Cargo.toml)
pub const CRATE_VERSION: &str = env!("CARGO_PKG_VERSION");
