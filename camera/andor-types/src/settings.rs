use serde::{Deserialize, Serialize};

use crate::{
    AuxiliaryOutSource, Binning, CycleMode, FanSpeed, PixelReadoutRate, Shutter, SimplePreAmp,
    TriggerMode,
};

/// Area of interest on the sensor, in binned pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aoi {
    pub left: i64,
    pub top: i64,
    pub width: i64,
    pub height: i64,
}

/// A set of camera settings, typically stored as a TOML file.
///
/// Every field is optional. Fields which are `None` are left unchanged when
/// the settings are applied to a camera.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CameraSettings {
    /// seconds
    pub exposure_time: Option<f64>,
    /// frames per second
    pub frame_rate: Option<f64>,
    pub frame_count: Option<i64>,
    pub accumulate_count: Option<i64>,
    pub cycle_mode: Option<CycleMode>,
    pub trigger_mode: Option<TriggerMode>,
    pub shutter: Option<Shutter>,
    pub binning: Option<Binning>,
    pub simple_pre_amp: Option<SimplePreAmp>,
    pub pixel_readout_rate: Option<PixelReadoutRate>,
    pub fan_speed: Option<FanSpeed>,
    pub auxiliary_out_source: Option<AuxiliaryOutSource>,
    pub sensor_cooling: Option<bool>,
    pub overlap: Option<bool>,
    pub spurious_noise_filter: Option<bool>,
    pub metadata_enable: Option<bool>,
    pub aoi: Option<Aoi>,
}

impl CameraSettings {
    /// True if no field is set.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_toml() {
        let buf = r#"
exposure_time = 0.01
trigger_mode = "Software"
binning = "Bin2x2"
sensor_cooling = true

[aoi]
left = 1
top = 1
width = 512
height = 256
"#;
        let settings: CameraSettings = toml::from_str(buf).unwrap();
        assert_eq!(settings.exposure_time, Some(0.01));
        assert_eq!(settings.trigger_mode, Some(TriggerMode::Software));
        assert_eq!(settings.binning, Some(Binning::Bin2x2));
        assert_eq!(settings.sensor_cooling, Some(true));
        assert_eq!(
            settings.aoi,
            Some(Aoi {
                left: 1,
                top: 1,
                width: 512,
                height: 256
            })
        );
        assert_eq!(settings.shutter, None);
        assert!(!settings.is_empty());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result: Result<CameraSettings, _> = toml::from_str("exposure = 1.0");
        assert!(result.is_err());
    }

    #[test]
    fn empty_settings() {
        let settings: CameraSettings = toml::from_str("").unwrap();
        assert!(settings.is_empty());
    }
}
