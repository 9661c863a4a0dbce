//! Command handlers.
//!
//! Each handler turns one validated [`Frame`] into a [`Response`] against the
//! parametric engine. Nothing here touches the byte stream, so handlers are
//! tested directly.

use embedded_storage::nor_flash::NorFlash;
use equalizer::profile::PROFILE_RECORD_LEN;
use equalizer::{EqProfile, ParametricEq, ProfileError, MAX_FILTERS, MAX_PROFILES};
use platform::config::{FW_VERSION_MAJOR, FW_VERSION_MINOR, FW_VERSION_PATCH};

use crate::command::{Command, Status};
use crate::frame::Frame;
use crate::response::Response;

/// Side effect to run after the response has been sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FollowUp {
    /// Nothing further.
    None,
    /// Reboot into the hardware update mode.
    EnterUpdateMode,
}

/// Execute `frame` and build its response in `out`.
pub fn handle<F: NorFlash>(
    frame: &Frame<'_>,
    eq: &mut ParametricEq<F>,
    out: &mut Response,
) -> FollowUp {
    let Ok(command) = Command::try_from(frame.command) else {
        debug!("unknown command {}", frame.command);
        out.error(frame.command, Status::InvalidCommand);
        return FollowUp::None;
    };

    let payload = frame.payload;
    let code = u8::from(command);
    let result = match command {
        Command::GetDeviceInfo => {
            device_info(eq, out);
            Ok(())
        }
        Command::GetProfileList => {
            profile_list(eq, out);
            Ok(())
        }
        Command::GetProfile => get_profile(payload, eq, out),
        Command::SetProfile => set_profile(payload, eq, out),
        Command::DeleteProfile => delete_profile(payload, eq, out),
        Command::SetActive => set_active(payload, eq, out),
        Command::SaveToFlash => save_to_flash(eq, out),
        Command::EnterUpdateMode => {
            info!("update mode requested");
            out.begin(code, Status::Ok);
            return FollowUp::EnterUpdateMode;
        }
    };

    if let Err(status) = result {
        out.error(code, status);
    }
    FollowUp::None
}

fn first_byte(payload: &[u8]) -> Result<u8, Status> {
    payload.first().copied().ok_or(Status::InvalidParam)
}

/// Slot changes during a save fail the same way a save that cannot start does.
fn slot_status(e: ProfileError) -> Status {
    match e {
        ProfileError::InvalidId(_) => Status::InvalidParam,
        ProfileError::Busy => Status::FlashError,
    }
}

/// `[major, minor, patch, max_profiles, max_filters, active_id]`
fn device_info<F: NorFlash>(eq: &ParametricEq<F>, out: &mut Response) {
    // both capacities are 10
    #[allow(clippy::cast_possible_truncation)]
    let limits = [MAX_PROFILES as u8, MAX_FILTERS as u8];
    out.begin(Command::GetDeviceInfo.into(), Status::Ok);
    out.extend(&[FW_VERSION_MAJOR, FW_VERSION_MINOR, FW_VERSION_PATCH]);
    out.extend(&limits);
    out.push(eq.active_id_byte());
}

/// `[count]` then `[id, name[16]]` per non-empty slot.
fn profile_list<F: NorFlash>(eq: &ParametricEq<F>, out: &mut Response) {
    let list = eq.list();
    out.begin(Command::GetProfileList.into(), Status::Ok);
    // at most MAX_PROFILES entries
    #[allow(clippy::cast_possible_truncation)]
    out.push(list.len() as u8);
    for (id, name) in &list {
        out.push(*id);
        out.extend(name.as_bytes());
    }
}

fn get_profile<F: NorFlash>(
    payload: &[u8],
    eq: &ParametricEq<F>,
    out: &mut Response,
) -> Result<(), Status> {
    let id = first_byte(payload)?;
    let profile = eq.get(id).ok_or(Status::InvalidParam)?;
    let mut record = [0u8; PROFILE_RECORD_LEN];
    profile.encode(&mut record);
    out.begin(Command::GetProfile.into(), Status::Ok);
    out.extend(&record);
    Ok(())
}

/// `[id]` followed by one profile record.
fn set_profile<F: NorFlash>(
    payload: &[u8],
    eq: &mut ParametricEq<F>,
    out: &mut Response,
) -> Result<(), Status> {
    let (&id, record) = payload.split_first().ok_or(Status::InvalidParam)?;
    let profile = EqProfile::decode(record).map_err(|_| Status::InvalidParam)?;
    eq.set(id, &profile).map_err(slot_status)?;
    debug!("profile {} written", id);
    out.begin(Command::SetProfile.into(), Status::Ok);
    Ok(())
}

fn delete_profile<F: NorFlash>(
    payload: &[u8],
    eq: &mut ParametricEq<F>,
    out: &mut Response,
) -> Result<(), Status> {
    let id = first_byte(payload)?;
    eq.delete(id).map_err(slot_status)?;
    out.begin(Command::DeleteProfile.into(), Status::Ok);
    Ok(())
}

/// Always OK once an id is present; invalid ids are ignored by the engine.
fn set_active<F: NorFlash>(
    payload: &[u8],
    eq: &mut ParametricEq<F>,
    out: &mut Response,
) -> Result<(), Status> {
    let id = first_byte(payload)?;
    eq.set_active(id);
    out.begin(Command::SetActive.into(), Status::Ok);
    Ok(())
}

fn save_to_flash<F: NorFlash>(eq: &mut ParametricEq<F>, out: &mut Response) -> Result<(), Status> {
    eq.start_flash_save().map_err(|e| {
        warn!("save rejected: {}", e);
        Status::FlashError
    })?;
    out.begin(Command::SaveToFlash.into(), Status::Ok);
    Ok(())
}
