use std::fmt::Debug;

use andor::{
    AuxiliaryOutSource, Binning, Camera, CycleMode, FanSpeed, Feature, IOSelector, PixelEncoding,
    PixelReadoutRate, Shutter, SimplePreAmp, SymbolicValue, TemperatureStatus, TriggerMode,
    mock::{MockSdk, MockValue},
    sdk::AT_ERR_READONLY,
};
use test_log::test;

fn check_family<T: SymbolicValue + PartialEq + Debug>(
    sdk: &MockSdk,
    cam: &Camera,
) -> anyhow::Result<()> {
    for v in T::variants() {
        sdk.with_device(0, |d| d.set(T::FEATURE, MockValue::symbolic(*v)));
        assert_eq!(cam.symbolic::<T>()?, *v);
    }
    for bad in [-1, T::COUNT, T::COUNT + 5] {
        sdk.with_device(0, |d| {
            d.set(
                T::FEATURE,
                MockValue::Enum {
                    index: bad,
                    options: vec![],
                },
            )
        });
        let err = cam.symbolic::<T>().unwrap_err();
        assert!(err.is_protocol(), "{err}");
        assert!(err.to_string().contains(T::FEATURE.native_key()));
    }
    Ok(())
}

#[test]
fn every_family_validates_range() -> anyhow::Result<()> {
    let sdk = MockSdk::with_cameras(1);
    let cam = Camera::open(&sdk, 0)?;
    check_family::<Shutter>(&sdk, &cam)?;
    check_family::<TriggerMode>(&sdk, &cam)?;
    check_family::<Binning>(&sdk, &cam)?;
    check_family::<CycleMode>(&sdk, &cam)?;
    check_family::<FanSpeed>(&sdk, &cam)?;
    check_family::<AuxiliaryOutSource>(&sdk, &cam)?;
    check_family::<SimplePreAmp>(&sdk, &cam)?;
    check_family::<PixelEncoding>(&sdk, &cam)?;
    check_family::<TemperatureStatus>(&sdk, &cam)?;
    check_family::<IOSelector>(&sdk, &cam)?;
    check_family::<PixelReadoutRate>(&sdk, &cam)?;
    Ok(())
}

#[test]
fn named_wrappers() -> anyhow::Result<()> {
    let sdk = MockSdk::with_cameras(1);
    let cam = Camera::open(&sdk, 0)?;
    assert_eq!(cam.shutter()?, Shutter::Rolling);
    assert_eq!(cam.trigger_mode()?, TriggerMode::Internal);
    assert_eq!(cam.binning()?, Binning::Bin1x1);
    assert_eq!(cam.cycle_mode()?, CycleMode::Fixed);
    assert_eq!(cam.fan_speed()?, FanSpeed::On);
    assert_eq!(cam.auxiliary_out_source()?, AuxiliaryOutSource::FireAny);
    assert_eq!(cam.simple_pre_amp()?, SimplePreAmp::LowNoise12Bit);
    assert_eq!(cam.pixel_encoding()?, PixelEncoding::Mono12);
    assert_eq!(cam.temperature_status()?, TemperatureStatus::CoolerOff);
    assert_eq!(cam.io_selector()?, IOSelector::Fire1);
    assert_eq!(cam.pixel_readout_rate()?, PixelReadoutRate::Rate100MHz);
    Ok(())
}

#[test]
fn setters_write_index() -> anyhow::Result<()> {
    let sdk = MockSdk::with_cameras(1);
    let cam = Camera::open(&sdk, 0)?;
    cam.set_trigger_mode(TriggerMode::Software)?;
    assert_eq!(cam.feature_enum_index(Feature::TriggerMode)?, 4);
    assert_eq!(cam.feature_enum_string(Feature::TriggerMode)?, "Software");

    cam.set_shutter(Shutter::Global)?;
    assert_eq!(
        cam.feature_enum_string(Feature::ElectronicShutteringMode)?,
        "Global"
    );

    cam.set_binning(Binning::Bin4x4)?;
    assert_eq!(cam.binning()?, Binning::Bin4x4);
    assert_eq!(cam.feature_enum_string(Feature::AOIBinning)?, "4x4");

    cam.set_simple_pre_amp(SimplePreAmp::LowNoiseHighCapacity16Bit)?;
    assert_eq!(
        cam.feature_enum_string(Feature::SimplePreAmpGainControl)?,
        "16-bit (low noise & high well capacity)"
    );
    Ok(())
}

#[test]
fn read_only_families() -> anyhow::Result<()> {
    let sdk = MockSdk::with_cameras(1);
    let cam = Camera::open(&sdk, 0)?;
    let err = cam.symbolic_set(PixelEncoding::Mono16).unwrap_err();
    assert_eq!(err.device_code(), Some(AT_ERR_READONLY));
    let err = cam.symbolic_set(TemperatureStatus::Stabilized).unwrap_err();
    assert_eq!(err.device_code(), Some(AT_ERR_READONLY));
    Ok(())
}

#[test]
fn display_names_match_device() -> anyhow::Result<()> {
    let sdk = MockSdk::with_cameras(1);
    let cam = Camera::open(&sdk, 0)?;
    for (i, name) in cam
        .feature_enum_strings(Feature::PixelReadoutRate)?
        .iter()
        .enumerate()
    {
        let rate = PixelReadoutRate::from_index(i as i32).unwrap();
        assert_eq!(rate.to_string(), *name);
        assert_eq!(PixelReadoutRate::from_name(name), Some(rate));
    }
    Ok(())
}
