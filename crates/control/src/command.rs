//! Command and status codes.

use thiserror_no_std::Error;

/// Request command codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Command {
    /// Firmware version, capacity limits, active profile.
    GetDeviceInfo = 0x01,
    /// Ids and names of every non-empty slot.
    GetProfileList = 0x02,
    /// One full profile record.
    GetProfile = 0x03,
    /// Overwrite one slot in RAM.
    SetProfile = 0x04,
    /// Clear one slot in RAM.
    DeleteProfile = 0x05,
    /// Select the active profile (0xFF = off).
    SetActive = 0x06,
    /// Persist the store to flash.
    SaveToFlash = 0x07,
    /// Reboot into the hardware update mode.
    EnterUpdateMode = 0x08,
}

/// Command byte not in the command set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[error("unknown command {0:#04x}")]
pub struct UnknownCommand(pub u8);

impl TryFrom<u8> for Command {
    type Error = UnknownCommand;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        Ok(match byte {
            0x01 => Self::GetDeviceInfo,
            0x02 => Self::GetProfileList,
            0x03 => Self::GetProfile,
            0x04 => Self::SetProfile,
            0x05 => Self::DeleteProfile,
            0x06 => Self::SetActive,
            0x07 => Self::SaveToFlash,
            0x08 => Self::EnterUpdateMode,
            other => return Err(UnknownCommand(other)),
        })
    }
}

impl From<Command> for u8 {
    fn from(cmd: Command) -> Self {
        cmd as u8
    }
}

/// Response status byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Status {
    /// Request carried out.
    Ok = 0x00,
    /// Command byte not recognised.
    InvalidCommand = 0x01,
    /// Payload too short or id out of range.
    InvalidParam = 0x02,
    /// Flash save could not be started, or a save in progress locks the slots.
    FlashError = 0x03,
}

impl From<Status> for u8 {
    fn from(status: Status) -> Self {
        status as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip() {
        for byte in 0x01..=0x08u8 {
            let cmd = Command::try_from(byte).unwrap();
            assert_eq!(u8::from(cmd), byte);
        }
    }

    #[test]
    fn unknown_codes_rejected() {
        assert_eq!(Command::try_from(0x00), Err(UnknownCommand(0x00)));
        assert_eq!(Command::try_from(0x09), Err(UnknownCommand(0x09)));
        assert_eq!(Command::try_from(0x81), Err(UnknownCommand(0x81)));
    }

    #[test]
    fn status_codes() {
        assert_eq!(u8::from(Status::Ok), 0);
        assert_eq!(u8::from(Status::InvalidCommand), 1);
        assert_eq!(u8::from(Status::InvalidParam), 2);
        assert_eq!(u8::from(Status::FlashError), 3);
    }
}
