//! Control protocol over a mock serial stream.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use control::crc8::crc8;
use control::{ControlChannel, MAX_PAYLOAD};
use equalizer::flash::REGION_LEN;
use equalizer::profile::PROFILE_RECORD_LEN;
use equalizer::{BiquadFilter, EqProfile, FilterType, FlashStatus, ParametricEq};
use platform::mocks::{MockFlash, MockIoError, MockSerial, MockUpdateTrigger};
use proptest::prelude::*;

type Flash = MockFlash<16, REGION_LEN>;

struct Device {
    channel: ControlChannel<MockSerial>,
    eq: ParametricEq<Flash>,
    update: MockUpdateTrigger,
}

impl Device {
    fn new() -> Self {
        let mut eq = ParametricEq::new(Flash::new(REGION_LEN), 0);
        let _ = eq.init();
        Self {
            channel: ControlChannel::new(MockSerial::new()),
            eq,
            update: MockUpdateTrigger::default(),
        }
    }

    /// Deliver `bytes` and return everything the device wrote back.
    fn exchange(&mut self, bytes: &[u8]) -> Vec<u8> {
        self.channel.io_mut().feed(bytes);
        self.channel.poll(&mut self.eq, &mut self.update).unwrap();
        self.channel.io_mut().take_tx()
    }
}

fn request(cmd: u8, payload: &[u8]) -> Vec<u8> {
    let len = u16::try_from(payload.len()).unwrap().to_le_bytes();
    let mut out = vec![cmd, len[0], len[1]];
    out.extend_from_slice(payload);
    out.push(crc8(&out));
    out
}

fn bass_boost() -> EqProfile {
    let f = BiquadFilter {
        b0: 1.02,
        b1: -1.97,
        b2: 0.95,
        a1: -1.97,
        a2: 0.97,
        freq_hz: 80.0,
        gain_db: 6.0,
        q: 0.7,
        filter_type: FilterType::LowShelf,
        enabled: true,
    };
    EqProfile::new("Bass Boost", &[f])
}

#[test]
fn device_info_exact_bytes() {
    let mut dev = Device::new();
    let req = [0x01, 0x00, 0x00, crc8(&[0x01, 0x00, 0x00])];
    let resp = dev.exchange(&req);

    let body = [0x81, 0x07, 0x00, 0x00, 2, 0, 0, 10, 10, 0xFF];
    let mut expect = body.to_vec();
    expect.push(crc8(&body));
    assert_eq!(resp, expect);
}

#[test]
fn bad_crc_gets_no_response_and_next_frame_parses() {
    let mut dev = Device::new();
    let mut bad = request(0x01, &[]);
    *bad.last_mut().unwrap() ^= 0x5A;

    assert!(dev.exchange(&bad).is_empty());
    assert!(dev.channel.parser().is_idle());
    assert_eq!(dev.channel.parser().drops().bad_crc, 1);

    let resp = dev.exchange(&request(0x01, &[]));
    assert_eq!(resp[0], 0x81);
}

#[test]
fn frame_split_across_polls() {
    let mut dev = Device::new();
    let req = request(0x02, &[]);
    for &b in &req[..req.len() - 1] {
        assert!(dev.exchange(&[b]).is_empty());
    }
    let resp = dev.exchange(&req[req.len() - 1..]);
    assert_eq!(&resp[..5], &[0x82, 0x02, 0x00, 0x00, 0x00]);
}

#[test]
fn back_to_back_frames_each_answered() {
    let mut dev = Device::new();
    let mut bytes = request(0x06, &[0xFF]);
    bytes.extend(request(0x7E, &[]));
    bytes.extend(request(0x01, &[]));

    let resp = dev.exchange(&bytes);
    assert_eq!(&resp[..5], &[0x86, 0x01, 0x00, 0x00, crc8(&[0x86, 0x01, 0x00, 0x00])]);
    assert_eq!(&resp[5..9], &[0xFE, 0x01, 0x00, 0x01]);
    assert_eq!(resp[10], 0x81);
}

#[test]
fn failed_write_still_answers_rest_of_chunk() {
    let mut dev = Device::new();
    dev.eq.set(2, &bass_boost()).unwrap();
    let mut bytes = request(0x01, &[]);
    bytes.extend(request(0x06, &[2]));

    dev.channel.io_mut().fail_writes = 1;
    dev.channel.io_mut().feed(&bytes);
    assert_eq!(
        dev.channel.poll(&mut dev.eq, &mut dev.update),
        Err(MockIoError)
    );

    assert_eq!(dev.eq.get_active(), Some(2));
    let resp = dev.channel.io_mut().take_tx();
    assert_eq!(&resp[..4], &[0x86, 0x01, 0x00, 0x00]);
    assert_eq!(resp.len(), 5);
    assert!(dev.channel.parser().is_idle());

    assert_eq!(dev.exchange(&request(0x01, &[]))[9], 2);
}

#[test]
fn profile_upload_activate_and_save() {
    let mut dev = Device::new();
    let profile = bass_boost();
    let mut record = [0u8; PROFILE_RECORD_LEN];
    profile.encode(&mut record);

    let mut payload = vec![6];
    payload.extend_from_slice(&record);
    assert_eq!(dev.exchange(&request(0x04, &payload))[3], 0x00);
    assert_eq!(dev.exchange(&request(0x06, &[6]))[3], 0x00);
    assert_eq!(dev.eq.get_active(), Some(6));
    assert_eq!(dev.eq.active_name(), "Bass Boost");

    let got = dev.exchange(&request(0x03, &[6]));
    assert_eq!(&got[4..4 + PROFILE_RECORD_LEN], &record[..]);

    assert_eq!(dev.exchange(&request(0x07, &[]))[3], 0x00);
    let mut ticks = 0;
    while dev.eq.flash_task() == FlashStatus::Busy {
        ticks += 1;
        assert!(ticks < 100);
    }
    assert_eq!(dev.eq.flash_status(), FlashStatus::DoneOk);

    // reload from the same flash
    let flash = dev.eq.release();
    let mut reloaded = ParametricEq::new(flash, 0);
    assert_eq!(reloaded.init(), Ok(1));
    assert_eq!(reloaded.get(6), Some(&profile));
}

#[test]
fn save_with_failing_erase_reports_flash_error() {
    let mut dev = Device::new();
    dev.eq.flash_mut().fail_erase = true;
    let resp = dev.exchange(&request(0x07, &[]));
    assert_eq!(&resp[..4], &[0x87, 0x01, 0x00, 0x03]);
}

#[test]
fn update_mode_sends_ok_then_triggers() {
    let mut dev = Device::new();
    let resp = dev.exchange(&request(0x08, &[]));
    assert_eq!(&resp[..4], &[0x88, 0x01, 0x00, 0x00]);
    assert_eq!(dev.update.requests, 1);
}

#[test]
fn oversized_frame_is_abandoned() {
    let mut dev = Device::new();
    let len = u16::try_from(MAX_PAYLOAD + 1).unwrap().to_le_bytes();
    let mut bytes = vec![0x04, len[0], len[1]];
    bytes.extend(request(0x01, &[]));
    let resp = dev.exchange(&bytes);
    assert_eq!(resp[0], 0x81);
    assert_eq!(dev.channel.parser().drops().oversized, 1);
}

proptest! {
    /// Any well-formed frame is answered exactly once, however it is split.
    #[test]
    fn prop_valid_frames_answered_once(
        cmd in 0x09u8..0x7F,
        payload in proptest::collection::vec(any::<u8>(), 0..=64),
        split in 0usize..70,
    ) {
        let mut dev = Device::new();
        let req = request(cmd, &payload);
        let split = split.min(req.len());
        let mut resp = dev.exchange(&req[..split]);
        resp.extend(dev.exchange(&req[split..]));

        // unknown command: status-only error frame
        prop_assert_eq!(resp.len(), 5);
        prop_assert_eq!(resp[0], cmd | 0x80);
        prop_assert_eq!(resp[3], 0x01);
    }

    /// Any corruption of the CRC byte silences the device.
    #[test]
    fn prop_corrupt_crc_never_answered(
        payload in proptest::collection::vec(any::<u8>(), 0..=32),
        flip in 1u8..=255,
    ) {
        let mut dev = Device::new();
        let mut req = request(0x01, &payload);
        *req.last_mut().unwrap() ^= flip;
        prop_assert!(dev.exchange(&req).is_empty());
        prop_assert!(dev.channel.parser().is_idle());
    }
}
