use andor_types::{Aoi, CameraSettings, Feature, SymbolicValue};

use crate::{Camera, error::Result};

impl<'lib> Camera<'lib> {
    /// Write every field present in `settings` to the camera.
    ///
    /// Binning is set before the AOI geometry, AOI width and left before
    /// height and top, and exposure time before frame rate, since the
    /// allowed range of each depends on the former.
    pub fn apply_settings(&self, settings: &CameraSettings) -> Result<()> {
        if let Some(v) = settings.binning {
            self.set_binning(v)?;
        }
        if let Some(aoi) = &settings.aoi {
            self.feature_int_set(Feature::AOIWidth, aoi.width)?;
            self.feature_int_set(Feature::AOILeft, aoi.left)?;
            self.feature_int_set(Feature::AOIHeight, aoi.height)?;
            self.feature_int_set(Feature::AOITop, aoi.top)?;
        }
        if let Some(v) = settings.shutter {
            self.set_shutter(v)?;
        }
        if let Some(v) = settings.simple_pre_amp {
            self.set_simple_pre_amp(v)?;
        }
        if let Some(v) = settings.pixel_readout_rate {
            self.set_pixel_readout_rate(v)?;
        }
        if let Some(v) = settings.trigger_mode {
            self.set_trigger_mode(v)?;
        }
        if let Some(v) = settings.cycle_mode {
            self.set_cycle_mode(v)?;
        }
        if let Some(v) = settings.frame_count {
            self.feature_int_set(Feature::FrameCount, v)?;
        }
        if let Some(v) = settings.accumulate_count {
            self.feature_int_set(Feature::AccumulateCount, v)?;
        }
        if let Some(v) = settings.exposure_time {
            self.feature_float_set(Feature::ExposureTime, v)?;
        }
        if let Some(v) = settings.frame_rate {
            self.feature_float_set(Feature::FrameRate, v)?;
        }
        if let Some(v) = settings.fan_speed {
            self.set_fan_speed(v)?;
        }
        if let Some(v) = settings.sensor_cooling {
            self.feature_bool_set(Feature::SensorCooling, v)?;
        }
        if let Some(v) = settings.overlap {
            self.feature_bool_set(Feature::Overlap, v)?;
        }
        if let Some(v) = settings.spurious_noise_filter {
            self.feature_bool_set(Feature::SpuriousNoiseFilter, v)?;
        }
        if let Some(v) = settings.metadata_enable {
            self.feature_bool_set(Feature::MetadataEnable, v)?;
        }
        if let Some(v) = settings.auxiliary_out_source {
            self.set_auxiliary_out_source(v)?;
        }
        Ok(())
    }

    /// Read the current value of every setting the camera implements.
    pub fn read_settings(&self) -> Result<CameraSettings> {
        let aoi = if self.has(Feature::AOIWidth)? {
            Some(Aoi {
                left: self.feature_int(Feature::AOILeft)?,
                top: self.feature_int(Feature::AOITop)?,
                width: self.feature_int(Feature::AOIWidth)?,
                height: self.feature_int(Feature::AOIHeight)?,
            })
        } else {
            None
        };
        Ok(CameraSettings {
            exposure_time: self.read_if(Feature::ExposureTime, Self::feature_float)?,
            frame_rate: self.read_if(Feature::FrameRate, Self::feature_float)?,
            frame_count: self.read_if(Feature::FrameCount, Self::feature_int)?,
            accumulate_count: self.read_if(Feature::AccumulateCount, Self::feature_int)?,
            cycle_mode: self.read_symbolic_if()?,
            trigger_mode: self.read_symbolic_if()?,
            shutter: self.read_symbolic_if()?,
            binning: self.read_symbolic_if()?,
            simple_pre_amp: self.read_symbolic_if()?,
            pixel_readout_rate: self.read_symbolic_if()?,
            fan_speed: self.read_symbolic_if()?,
            auxiliary_out_source: self.read_symbolic_if()?,
            sensor_cooling: self.read_if(Feature::SensorCooling, Self::feature_bool)?,
            overlap: self.read_if(Feature::Overlap, Self::feature_bool)?,
            spurious_noise_filter: self.read_if(Feature::SpuriousNoiseFilter, Self::feature_bool)?,
            metadata_enable: self.read_if(Feature::MetadataEnable, Self::feature_bool)?,
            aoi,
        })
    }

    fn has(&self, feature: Feature) -> Result<bool> {
        Ok(self.is_implemented(feature)? && self.is_readable(feature)?)
    }

    fn read_if<T>(
        &self,
        feature: Feature,
        read: fn(&Self, Feature) -> Result<T>,
    ) -> Result<Option<T>> {
        if self.has(feature)? {
            Ok(Some(read(self, feature)?))
        } else {
            Ok(None)
        }
    }

    fn read_symbolic_if<T: SymbolicValue>(&self) -> Result<Option<T>> {
        if self.has(T::FEATURE)? {
            Ok(Some(self.symbolic()?))
        } else {
            Ok(None)
        }
    }
}
