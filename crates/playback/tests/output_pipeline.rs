//! End-to-end refill behaviour of the output stage against mock hardware.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use equalizer::{ActiveEq, LegacyEq};
use platform::mocks::{
    MockI2s, MockI2sError, MockOutputControl, MockUsbSource, NoopDelay, OutputEvent,
};
use platform::{Half, HalfFillFlags, UsbAudioSource};
use playback::convert::{pack_sample, FRAMES_PER_HALF, HALFWORDS_PER_HALF, USB_BYTES_PER_HALF};
use playback::{AudioOutput, FillStats, OutputConfig, StreamState};
use proptest::prelude::*;

type Output<'a> = AudioOutput<'a, MockI2s, MockOutputControl>;

fn output(flags: &HalfFillFlags, config: OutputConfig) -> Output<'_> {
    let mut out = AudioOutput::new(MockI2s::new(), MockOutputControl::new(), flags, config);
    out.init(&mut NoopDelay::new()).unwrap();
    out
}

/// A ramp that never repeats its final pair, so holds are distinguishable.
fn ramp(frames: usize, start: i32) -> Vec<(i32, i32)> {
    (0..frames)
        .map(|i| {
            let v = (start + i as i32) << 8;
            (v, -v)
        })
        .collect()
}

/// Bring `out` to `Streaming` with an empty FIFO and clean counters.
fn stream(out: &mut Output<'_>, usb: &mut MockUsbSource, legacy: &mut LegacyEq) {
    out.start_streaming();
    usb.push_frames(&ramp(FRAMES_PER_HALF * 3, 1));
    out.task(usb, &mut ActiveEq::Legacy(legacy));
    assert_eq!(out.state(), StreamState::Streaming);
    usb.clear();
    out.take_stats();
}

fn assert_held(half: &[u16], pair: (i32, i32)) {
    let [l_hi, l_lo] = pack_sample(pair.0);
    let [r_hi, r_lo] = pack_sample(pair.1);
    for frame in half.chunks_exact(4) {
        assert_eq!(frame, &[l_hi, l_lo, r_hi, r_lo]);
    }
}

#[test]
fn init_powers_up_without_pop() {
    let flags = HalfFillFlags::new();
    let mut out = AudioOutput::new(MockI2s::new(), MockOutputControl::new(), &flags, OutputConfig::default());
    let mut delay = NoopDelay::new();
    out.init(&mut delay).unwrap();

    assert_eq!(
        out.control().events,
        [
            OutputEvent::MuteDac,
            OutputEvent::DisableAmplifier,
            OutputEvent::UnmuteDac,
            OutputEvent::EnableAmplifier,
        ]
    );
    assert_eq!(delay.elapsed_ms(), 500);
    assert_eq!(out.transmitter().start_count, 1);
    assert!(out.transmitter().last_start.iter().all(|&w| w == 0));
}

#[test]
fn prebuffering_waits_for_threshold_then_restarts_transfer() {
    let flags = HalfFillFlags::new();
    let mut out = output(&flags, OutputConfig::default());
    let mut legacy = LegacyEq::new();
    let mut usb = MockUsbSource::new();

    out.start_streaming();
    usb.push_bytes(&vec![0x11; USB_BYTES_PER_HALF * 3 - 6]);
    out.task(&mut usb, &mut ActiveEq::Legacy(&mut legacy));
    assert_eq!(out.state(), StreamState::Prebuffering);
    assert_eq!(out.transmitter().start_count, 1);

    usb.push_bytes(&[0x11; 6]);
    flags.on_half_complete();
    out.task(&mut usb, &mut ActiveEq::Legacy(&mut legacy));
    assert_eq!(out.state(), StreamState::Streaming);
    assert_eq!(usb.available(), USB_BYTES_PER_HALF);
    assert_eq!(out.transmitter().stop_count, 1);
    assert_eq!(out.transmitter().start_count, 2);
    assert_eq!(out.transmitter().last_start, out.buffer().as_slice());
    assert!(!flags.needs_fill(Half::First));
}

#[test]
fn exactly_one_half_is_a_full_fill() {
    let flags = HalfFillFlags::new();
    let mut out = output(&flags, OutputConfig::default());
    let mut legacy = LegacyEq::new();
    let mut usb = MockUsbSource::new();
    stream(&mut out, &mut usb, &mut legacy);

    usb.push_frames(&ramp(FRAMES_PER_HALF, 100));
    flags.on_half_complete();
    out.task(&mut usb, &mut ActiveEq::Legacy(&mut legacy));

    assert_eq!(
        out.take_stats(),
        FillStats {
            full_fills: 1,
            partial_fills: 0,
            underruns: 0
        }
    );
    assert_eq!(usb.available(), 0);
    assert!(!flags.needs_fill(Half::First));
}

#[test]
fn less_than_one_frame_is_a_full_hold() {
    for bytes in 1..6 {
        let flags = HalfFillFlags::new();
        let mut out = output(&flags, OutputConfig::default());
        let mut legacy = LegacyEq::new();
        let mut usb = MockUsbSource::new();
        stream(&mut out, &mut usb, &mut legacy);
        let held = out.last_sample();

        usb.push_bytes(&vec![0x7F; bytes]);
        flags.on_transfer_complete();
        out.task(&mut usb, &mut ActiveEq::Legacy(&mut legacy));

        assert_eq!(out.take_stats().underruns, 1, "{bytes} bytes");
        assert_eq!(usb.available(), bytes, "partial frame must stay queued");
        assert_held(out.buffer().half(Half::Second), held);
    }
}

#[test]
fn partial_fill_pads_with_last_real_pair() {
    let flags = HalfFillFlags::new();
    let mut out = output(&flags, OutputConfig::default());
    let mut legacy = LegacyEq::new();
    let mut usb = MockUsbSource::new();
    stream(&mut out, &mut usb, &mut legacy);
    let before = out.last_sample();

    // 10 whole frames plus a stray byte
    usb.push_frames(&ramp(10, 5000));
    usb.push_bytes(&[0x55]);
    flags.on_half_complete();
    out.task(&mut usb, &mut ActiveEq::Legacy(&mut legacy));

    assert_eq!(out.take_stats().partial_fills, 1);
    assert_eq!(usb.available(), 1);

    let held = out.last_sample();
    assert_ne!(held, before);
    let half = out.buffer().half(Half::First);
    assert_eq!(&half[36..40], {
        let [l_hi, l_lo] = pack_sample(held.0);
        let [r_hi, r_lo] = pack_sample(held.1);
        &[l_hi, l_lo, r_hi, r_lo][..]
    });
    assert_held(&half[40..], held);
}

#[test]
fn underrun_holds_last_pair_not_silence() {
    let flags = HalfFillFlags::new();
    let mut out = output(&flags, OutputConfig::default());
    let mut legacy = LegacyEq::new();
    let mut usb = MockUsbSource::new();
    stream(&mut out, &mut usb, &mut legacy);

    let held = out.last_sample();
    assert_ne!(held, (0, 0));

    flags.on_half_complete();
    flags.on_transfer_complete();
    out.task(&mut usb, &mut ActiveEq::Legacy(&mut legacy));

    assert_eq!(out.take_stats().underruns, 2);
    assert_held(out.buffer().half(Half::First), held);
    assert_held(out.buffer().half(Half::Second), held);
    assert_eq!(out.last_sample(), held);
}

#[test]
fn channel_swap_follows_config() {
    // 0x10000 × 2303/4096 = 36848, × 128/256 (500 mA headroom) = 18424
    let frame = [(0x1_0000, -0x1_0000)];

    for (swap, expect) in [(true, (-18_424, 18_424)), (false, (18_424, -18_424))] {
        let flags = HalfFillFlags::new();
        let config = OutputConfig {
            swap_channels: swap,
            prebuffer_halves: 1,
        };
        let mut out = output(&flags, config);
        let mut legacy = LegacyEq::new();
        legacy.set_enabled(false);
        let mut usb = MockUsbSource::new();

        out.start_streaming();
        usb.push_frames(&vec![frame[0]; FRAMES_PER_HALF]);
        out.task(&mut usb, &mut ActiveEq::Legacy(&mut legacy));
        assert_eq!(out.last_sample(), expect, "swap = {swap}");
    }
}

#[test]
fn host_mute_is_tracked_from_source() {
    let flags = HalfFillFlags::new();
    let mut out = output(&flags, OutputConfig::default());
    let mut legacy = LegacyEq::new();
    let mut usb = MockUsbSource::new();

    usb.muted = true;
    out.task(&mut usb, &mut ActiveEq::Legacy(&mut legacy));
    assert!(out.is_host_muted());
    assert!(out.control().dac_muted);
    assert_eq!(out.volume_scale(usb.volume), 0);

    usb.muted = false;
    out.task(&mut usb, &mut ActiveEq::Legacy(&mut legacy));
    assert!(!out.control().dac_muted);
}

#[test]
fn stop_restarts_transfer_on_silence() {
    let flags = HalfFillFlags::new();
    let mut out = output(&flags, OutputConfig::default());
    let mut legacy = LegacyEq::new();
    let mut usb = MockUsbSource::new();
    stream(&mut out, &mut usb, &mut legacy);
    flags.on_half_complete();

    let events_before = out.control().events.len();
    out.stop_streaming().unwrap();

    assert_eq!(out.state(), StreamState::Stopped);
    assert!(out.buffer().is_silent());
    assert!(out.transmitter().running);
    assert!(out.transmitter().last_start.iter().all(|&w| w == 0));
    assert!(!flags.needs_fill(Half::First));
    assert_eq!(
        out.control().events[events_before..],
        [OutputEvent::MuteDac, OutputEvent::UnmuteDac]
    );
}

#[test]
fn failed_halt_still_clears_buffer_and_flags() {
    let flags = HalfFillFlags::new();
    let mut out = output(&flags, OutputConfig::default());
    let mut legacy = LegacyEq::new();
    let mut usb = MockUsbSource::new();
    stream(&mut out, &mut usb, &mut legacy);
    flags.on_half_complete();
    assert!(!out.buffer().is_silent());

    out.transmitter_mut().fail_stop = true;
    assert_eq!(out.stop_streaming(), Err(MockI2sError));

    assert_eq!(out.state(), StreamState::Stopped);
    assert!(out.buffer().is_silent());
    assert!(!flags.needs_fill(Half::First));
    assert!(!out.is_transfer_running());
    assert!(out.control().dac_muted);

    out.transmitter_mut().fail_stop = false;
    out.stop_streaming().unwrap();
    assert!(out.transmitter().running);
    assert!(!out.control().dac_muted);
}

#[test]
fn stop_leaves_dac_muted_while_locally_muted() {
    let flags = HalfFillFlags::new();
    let mut out = output(&flags, OutputConfig::default());
    out.set_local_mute(true);
    out.stop_streaming().unwrap();
    assert!(out.control().dac_muted);
}

#[test]
fn restart_after_stop_prebuffers_again() {
    let flags = HalfFillFlags::new();
    let mut out = output(&flags, OutputConfig::default());
    let mut legacy = LegacyEq::new();
    let mut usb = MockUsbSource::new();
    stream(&mut out, &mut usb, &mut legacy);

    out.stop_streaming().unwrap();
    out.start_streaming();
    assert_eq!(out.state(), StreamState::Prebuffering);
    assert_eq!(out.last_sample(), (0, 0));
}

proptest! {
    /// Every refill writes a whole half and consumes only whole frames.
    #[test]
    fn prop_refill_consumes_whole_frames(bytes in 0usize..3000) {
        let flags = HalfFillFlags::new();
        let mut out = output(&flags, OutputConfig::default());
        let mut legacy = LegacyEq::new();
        let mut usb = MockUsbSource::new();
        stream(&mut out, &mut usb, &mut legacy);

        usb.push_bytes(&vec![0x42; bytes]);
        flags.on_half_complete();
        out.task(&mut usb, &mut ActiveEq::Legacy(&mut legacy));

        let consumed = bytes - usb.available();
        prop_assert_eq!(consumed % 6, 0);
        prop_assert_eq!(consumed, (bytes - bytes % 6).min(USB_BYTES_PER_HALF));
        prop_assert_eq!(out.buffer().half(Half::First).len(), HALFWORDS_PER_HALF);

        let stats = out.take_stats();
        prop_assert_eq!(stats.full_fills + stats.partial_fills + stats.underruns, 1);
        prop_assert!(!flags.needs_fill(Half::First));
    }
}
