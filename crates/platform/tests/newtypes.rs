//! Type system enforcement tests for audio domain newtypes.
//! These newtypes keep out-of-range volume, power and rate values from ever
//! reaching the gain math.

// ── VolumePercent ────────────────────────────────────────────────────────────

#[test]
fn volume_percent_new_clamps_over_100() {
    use platform::audio_types::VolumePercent;
    let v = VolumePercent::new(150);
    assert_eq!(v.get(), 100, "VolumePercent::new(150) should clamp to 100");
}

#[test]
fn volume_percent_defaults_to_unity() {
    use platform::audio_types::VolumePercent;
    assert_eq!(VolumePercent::default().get(), 100);
}

#[test]
fn volume_percent_try_new_rejects_over_100() {
    use platform::audio_types::VolumePercent;
    assert!(VolumePercent::try_new(101).is_err());
    assert!(VolumePercent::try_new(255).is_err());
}

#[test]
fn volume_percent_try_new_accepts_valid_range() {
    use platform::audio_types::VolumePercent;
    assert!(VolumePercent::try_new(0).is_ok());
    assert!(VolumePercent::try_new(50).is_ok());
    assert!(VolumePercent::try_new(100).is_ok());
}

#[test]
fn volume_percent_step_saturates_at_both_ends() {
    use platform::audio_types::VolumePercent;
    assert_eq!(VolumePercent::new(98).step(5).get(), 100);
    assert_eq!(VolumePercent::new(2).step(-5).get(), 0);
    assert_eq!(VolumePercent::new(50).step(i16::MIN).get(), 0);
}

#[test]
fn volume_percent_is_one_byte() {
    use platform::audio_types::VolumePercent;
    assert_eq!(core::mem::size_of::<VolumePercent>(), 1);
}

// ── HostVolumeDb ─────────────────────────────────────────────────────────────

#[test]
fn host_volume_clamps_into_range() {
    use platform::audio_types::HostVolumeDb;
    assert_eq!(HostVolumeDb::new(6).get(), 0);
    assert_eq!(HostVolumeDb::new(-127).get(), -90);
}

#[test]
fn host_volume_table_index_spans_table() {
    use platform::audio_types::HostVolumeDb;
    assert_eq!(HostVolumeDb::new(-90).table_index(), 0);
    assert_eq!(HostVolumeDb::new(-45).table_index(), 45);
    assert_eq!(HostVolumeDb::UNITY.table_index(), 90);
}

// ── PowerTier ────────────────────────────────────────────────────────────────

#[test]
fn power_tier_thresholds() {
    use platform::audio_types::PowerTier;
    assert_eq!(PowerTier::from_cc_millivolts(0, 0), PowerTier::Default500mA);
    assert_eq!(PowerTier::from_cc_millivolts(700, 0), PowerTier::Default500mA);
    assert_eq!(PowerTier::from_cc_millivolts(701, 0), PowerTier::Current1500mA);
    assert_eq!(PowerTier::from_cc_millivolts(0, 1300), PowerTier::Current1500mA);
    assert_eq!(PowerTier::from_cc_millivolts(0, 1301), PowerTier::Current3000mA);
}

#[test]
fn power_tier_headroom_increases_with_current() {
    use platform::audio_types::PowerTier;
    assert_eq!(PowerTier::Default500mA.headroom_scale(), 128);
    assert_eq!(PowerTier::Current1500mA.headroom_scale(), 161);
    assert_eq!(PowerTier::Current3000mA.headroom_scale(), 203);
    assert_eq!(PowerTier::default(), PowerTier::Default500mA);
}

// ── SampleRateHz ─────────────────────────────────────────────────────────────

#[test]
fn sample_rate_rejects_out_of_range() {
    use platform::audio_types::SampleRateHz;
    assert!(SampleRateHz::new(7_999).is_err());
    assert!(SampleRateHz::new(192_001).is_err());
    assert_eq!(SampleRateHz::new(48_000).map(SampleRateHz::get), Ok(48_000));
}

#[test]
fn sample_rate_error_reports_bounds() {
    use platform::audio_types::SampleRateHz;
    let err = SampleRateHz::new(4_000).unwrap_err();
    assert_eq!((err.value, err.min, err.max), (4_000, 8_000, 192_000));
}
