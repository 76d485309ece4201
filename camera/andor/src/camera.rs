use std::{os::raw::c_int, sync::Arc};

use andor_types::{
    AuxiliaryOutSource, Binning, CycleMode, FanSpeed, Feature, IOSelector, PixelEncoding,
    PixelReadoutRate, Shutter, SimplePreAmp, SymbolicValue, TemperatureStatus, TriggerMode,
};

use crate::{
    buffer::HostLock,
    callback::SessionShared,
    error::{Error, Result, status_name},
    sdk::{AT_FALSE, AT_TRUE, AtBool, AtH, AtWc, Sdk},
    wide::{from_wide, to_wide},
};

/// Size, in wide characters, of the buffers used to read strings.
const STRING_BUFFER_LEN: usize = 256;

/// An open Andor SDK3 device.
///
/// A `Camera` is the single owner of its SDK handle. The handle is closed by
/// [Camera::close] or, failing that, when the `Camera` is dropped.
pub struct Camera<'lib> {
    pub(crate) sdk: &'lib dyn Sdk,
    device_index: i32,
    pub(crate) shared: Arc<SessionShared>,
    is_open: bool,
    pub(crate) host_lock: Option<Arc<dyn HostLock>>,
}

fn _test_camera_is_send() {
    // Compile-time test to ensure Camera implements Send trait.
    fn implements<T: Send>() {}
    implements::<Camera>();
}

impl<'lib> std::fmt::Debug for Camera<'lib> {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::result::Result<(), std::fmt::Error> {
        fmt.debug_struct("Camera")
            .field("device_index", &self.device_index)
            .field("handle", &self.shared.handle)
            .field("is_open", &self.is_open)
            .finish_non_exhaustive()
    }
}

fn to_bool(value: AtBool) -> bool {
    value != AT_FALSE
}

impl<'lib> Camera<'lib> {
    /// Open the device with index `device_index`.
    pub fn open(sdk: &'lib dyn Sdk, device_index: i32) -> Result<Self> {
        let mut handle: AtH = crate::sdk::AT_HANDLE_UNINITIALISED;
        at_call!(
            sdk.open(device_index, &mut handle),
            "Failed to open Andor device with index {device_index}."
        )?;
        let result = Self {
            sdk,
            device_index,
            shared: Arc::new(SessionShared::new(handle)),
            is_open: true,
            host_lock: None,
        };
        tracing::debug!("opening {:?}", result);
        Ok(result)
    }

    /// Close the device, reporting a failure to do so.
    ///
    /// The handle is given up even if the SDK reports an error.
    pub fn close(mut self) -> Result<()> {
        if self.is_open {
            self.is_open = false; // prevent closing again on drop
            let device_index = self.device_index;
            at_call!(
                self.sdk.close(self.handle()),
                "Failed to close Andor device with index {device_index}."
            )?;
            self.shared.release_callbacks();
        }
        Ok(())
    }

    pub fn handle(&self) -> AtH {
        self.shared.handle
    }

    pub fn device_index(&self) -> i32 {
        self.device_index
    }

    /// Use `lock` as the host execution lock, released while blocked in
    /// [Camera::wait_buffer].
    pub fn set_host_lock(&mut self, lock: Arc<dyn HostLock>) {
        self.host_lock = Some(lock);
    }

    pub fn is_implemented(&self, feature: Feature) -> Result<bool> {
        let key = feature.native_key();
        let mut value: AtBool = AT_FALSE;
        at_call!(
            self.sdk.is_implemented(self.handle(), key, &mut value),
            "AT_IsImplemented for feature \"{key}\" failed."
        )?;
        Ok(to_bool(value))
    }

    pub fn is_readable(&self, feature: Feature) -> Result<bool> {
        let key = feature.native_key();
        let mut value: AtBool = AT_FALSE;
        at_call!(
            self.sdk.is_readable(self.handle(), key, &mut value),
            "AT_IsReadable for feature \"{key}\" failed."
        )?;
        Ok(to_bool(value))
    }

    pub fn is_writable(&self, feature: Feature) -> Result<bool> {
        let key = feature.native_key();
        let mut value: AtBool = AT_FALSE;
        at_call!(
            self.sdk.is_writable(self.handle(), key, &mut value),
            "AT_IsWritable for feature \"{key}\" failed."
        )?;
        Ok(to_bool(value))
    }

    pub fn is_read_only(&self, feature: Feature) -> Result<bool> {
        let key = feature.native_key();
        let mut value: AtBool = AT_FALSE;
        at_call!(
            self.sdk.is_read_only(self.handle(), key, &mut value),
            "AT_IsReadOnly for feature \"{key}\" failed."
        )?;
        Ok(to_bool(value))
    }

    pub fn feature_int(&self, feature: Feature) -> Result<i64> {
        let key = feature.native_key();
        let mut value = 0;
        at_call!(
            self.sdk.get_int(self.handle(), key, &mut value),
            "AT_GetInt for feature \"{key}\" failed."
        )?;
        Ok(value)
    }

    pub fn feature_int_set(&self, feature: Feature, value: i64) -> Result<()> {
        let key = feature.native_key();
        at_call!(
            self.sdk.set_int(self.handle(), key, value),
            "AT_SetInt with value {value} for feature \"{key}\" failed."
        )?;
        Ok(())
    }

    pub fn feature_int_min(&self, feature: Feature) -> Result<i64> {
        let key = feature.native_key();
        let mut value = 0;
        at_call!(
            self.sdk.get_int_min(self.handle(), key, &mut value),
            "AT_GetIntMin for feature \"{key}\" failed."
        )?;
        Ok(value)
    }

    pub fn feature_int_max(&self, feature: Feature) -> Result<i64> {
        let key = feature.native_key();
        let mut value = 0;
        at_call!(
            self.sdk.get_int_max(self.handle(), key, &mut value),
            "AT_GetIntMax for feature \"{key}\" failed."
        )?;
        Ok(value)
    }

    /// The allowed `(min, max)` values of an integer feature.
    pub fn feature_int_range(&self, feature: Feature) -> Result<(i64, i64)> {
        Ok((self.feature_int_min(feature)?, self.feature_int_max(feature)?))
    }

    pub fn feature_float(&self, feature: Feature) -> Result<f64> {
        let key = feature.native_key();
        let mut value = 0.0;
        at_call!(
            self.sdk.get_float(self.handle(), key, &mut value),
            "AT_GetFloat for feature \"{key}\" failed."
        )?;
        Ok(value)
    }

    pub fn feature_float_set(&self, feature: Feature, value: f64) -> Result<()> {
        let key = feature.native_key();
        at_call!(
            self.sdk.set_float(self.handle(), key, value),
            "AT_SetFloat with value {value} for feature \"{key}\" failed."
        )?;
        Ok(())
    }

    pub fn feature_float_min(&self, feature: Feature) -> Result<f64> {
        let key = feature.native_key();
        let mut value = 0.0;
        at_call!(
            self.sdk.get_float_min(self.handle(), key, &mut value),
            "AT_GetFloatMin for feature \"{key}\" failed."
        )?;
        Ok(value)
    }

    pub fn feature_float_max(&self, feature: Feature) -> Result<f64> {
        let key = feature.native_key();
        let mut value = 0.0;
        at_call!(
            self.sdk.get_float_max(self.handle(), key, &mut value),
            "AT_GetFloatMax for feature \"{key}\" failed."
        )?;
        Ok(value)
    }

    /// The allowed `(min, max)` values of a float feature.
    pub fn feature_float_range(&self, feature: Feature) -> Result<(f64, f64)> {
        Ok((
            self.feature_float_min(feature)?,
            self.feature_float_max(feature)?,
        ))
    }

    pub fn feature_bool(&self, feature: Feature) -> Result<bool> {
        let key = feature.native_key();
        let mut value: AtBool = AT_FALSE;
        at_call!(
            self.sdk.get_bool(self.handle(), key, &mut value),
            "AT_GetBool for feature \"{key}\" failed."
        )?;
        Ok(to_bool(value))
    }

    pub fn feature_bool_set(&self, feature: Feature, value: bool) -> Result<()> {
        let key = feature.native_key();
        let raw = if value { AT_TRUE } else { AT_FALSE };
        at_call!(
            self.sdk.set_bool(self.handle(), key, raw),
            "AT_SetBool with value {value} for feature \"{key}\" failed."
        )?;
        Ok(())
    }

    pub fn feature_enum_index(&self, feature: Feature) -> Result<i32> {
        let key = feature.native_key();
        let mut value: c_int = 0;
        at_call!(
            self.sdk.get_enum_index(self.handle(), key, &mut value),
            "AT_GetEnumIndex for feature \"{key}\" failed."
        )?;
        Ok(value)
    }

    pub fn feature_enum_index_set(&self, feature: Feature, value: i32) -> Result<()> {
        let key = feature.native_key();
        at_call!(
            self.sdk.set_enum_index(self.handle(), key, value),
            "AT_SetEnumIndex with value {value} for feature \"{key}\" failed."
        )?;
        Ok(())
    }

    pub fn feature_enum_string_set(&self, feature: Feature, value: &str) -> Result<()> {
        let key = feature.native_key();
        // The SDK would silently stop reading at an interior nul.
        to_wide(value)?;
        at_call!(
            self.sdk.set_enum_string(self.handle(), key, value),
            "AT_SetEnumString with value \"{value}\" for feature \"{key}\" failed."
        )?;
        Ok(())
    }

    /// Number of entries of an enumerated feature.
    pub fn feature_enum_count(&self, feature: Feature) -> Result<i32> {
        let key = feature.native_key();
        let mut count: c_int = 0;
        at_call!(
            self.sdk.get_enum_count(self.handle(), key, &mut count),
            "AT_GetEnumCount for feature \"{key}\" failed."
        )?;
        Ok(count)
    }

    pub fn is_enum_index_available(&self, feature: Feature, index: i32) -> Result<bool> {
        let key = feature.native_key();
        let mut value: AtBool = AT_FALSE;
        at_call!(
            self.sdk
                .is_enum_index_available(self.handle(), key, index, &mut value),
            "AT_IsEnumIndexAvailable with index {index} for feature \"{key}\" failed."
        )?;
        Ok(to_bool(value))
    }

    pub fn is_enum_index_implemented(&self, feature: Feature, index: i32) -> Result<bool> {
        let key = feature.native_key();
        let mut value: AtBool = AT_FALSE;
        at_call!(
            self.sdk
                .is_enum_index_implemented(self.handle(), key, index, &mut value),
            "AT_IsEnumIndexImplemented with index {index} for feature \"{key}\" failed."
        )?;
        Ok(to_bool(value))
    }

    /// The display string of entry `index` of an enumerated feature.
    pub fn feature_enum_string_by_index(&self, feature: Feature, index: i32) -> Result<String> {
        let key = feature.native_key();
        let mut buf = [0 as AtWc; STRING_BUFFER_LEN];
        at_call!(
            self.sdk
                .get_enum_string_by_index(self.handle(), key, index, &mut buf),
            "AT_GetEnumStringByIndex with index {index} for feature \"{key}\" failed."
        )?;
        buf[STRING_BUFFER_LEN - 1] = 0;
        Ok(from_wide(&buf))
    }

    /// The display string of the current entry of an enumerated feature.
    pub fn feature_enum_string(&self, feature: Feature) -> Result<String> {
        let index = self.feature_enum_index(feature)?;
        self.feature_enum_string_by_index(feature, index)
    }

    /// The display strings of all entries of an enumerated feature.
    pub fn feature_enum_strings(&self, feature: Feature) -> Result<Vec<String>> {
        let count = self.feature_enum_count(feature)?;
        (0..count)
            .map(|i| self.feature_enum_string_by_index(feature, i))
            .collect()
    }

    /// Run a command feature such as [Feature::AcquisitionStart].
    pub fn command(&self, feature: Feature) -> Result<()> {
        let key = feature.native_key();
        at_call!(
            self.sdk.command(self.handle(), key),
            "AT_Command for feature \"{key}\" failed."
        )?;
        Ok(())
    }

    pub fn feature_string(&self, feature: Feature) -> Result<String> {
        let key = feature.native_key();
        let mut buf = [0 as AtWc; STRING_BUFFER_LEN];
        at_call!(
            self.sdk.get_string(self.handle(), key, &mut buf),
            "AT_GetString for feature \"{key}\" failed."
        )?;
        // The SDK does not terminate a string which fills the buffer.
        buf[STRING_BUFFER_LEN - 1] = 0;
        Ok(from_wide(&buf))
    }

    pub fn feature_string_set(&self, feature: Feature, value: &str) -> Result<()> {
        let key = feature.native_key();
        // The SDK would silently stop reading at an interior nul.
        to_wide(value)?;
        at_call!(
            self.sdk.set_string(self.handle(), key, value),
            "AT_SetString with value \"{value}\" for feature \"{key}\" failed."
        )?;
        Ok(())
    }

    pub fn feature_string_max_length(&self, feature: Feature) -> Result<i32> {
        let key = feature.native_key();
        let mut value: c_int = 0;
        at_call!(
            self.sdk.get_string_max_length(self.handle(), key, &mut value),
            "AT_GetStringMaxLength for feature \"{key}\" failed."
        )?;
        Ok(value)
    }

    /// Read an enumerated feature as its symbolic value.
    ///
    /// An index outside the range known for `T` is a protocol error.
    pub fn symbolic<T: SymbolicValue>(&self) -> Result<T> {
        let index = self.feature_enum_index(T::FEATURE)?;
        T::from_index(index).ok_or_else(|| {
            Error::protocol(format!(
                "Feature \"{}\" has enumerated index {index}, outside the known range 0..{}.",
                T::FEATURE.native_key(),
                T::COUNT
            ))
        })
    }

    pub fn symbolic_set<T: SymbolicValue>(&self, value: T) -> Result<()> {
        self.feature_enum_index_set(T::FEATURE, value.index())
    }
}

macro_rules! symbolic_accessors {
    ($($get:ident, $set:ident: $ty:ty;)*) => {
        impl<'lib> Camera<'lib> {
            $(
                pub fn $get(&self) -> Result<$ty> {
                    self.symbolic()
                }

                pub fn $set(&self, value: $ty) -> Result<()> {
                    self.symbolic_set(value)
                }
            )*
        }
    };
}

symbolic_accessors! {
    shutter, set_shutter: Shutter;
    trigger_mode, set_trigger_mode: TriggerMode;
    binning, set_binning: Binning;
    cycle_mode, set_cycle_mode: CycleMode;
    fan_speed, set_fan_speed: FanSpeed;
    auxiliary_out_source, set_auxiliary_out_source: AuxiliaryOutSource;
    simple_pre_amp, set_simple_pre_amp: SimplePreAmp;
    io_selector, set_io_selector: IOSelector;
    pixel_readout_rate, set_pixel_readout_rate: PixelReadoutRate;
}

impl<'lib> Camera<'lib> {
    /// Pixel encoding of acquired buffers. This follows from the pre-amp
    /// setting and cannot be set.
    pub fn pixel_encoding(&self) -> Result<PixelEncoding> {
        self.symbolic()
    }

    pub fn temperature_status(&self) -> Result<TemperatureStatus> {
        self.symbolic()
    }
}

impl<'lib> Drop for Camera<'lib> {
    fn drop(&mut self) {
        if self.is_open {
            self.is_open = false;
            let errcode = at_call_no_err!(self.sdk.close(self.handle()));
            if errcode == crate::sdk::AT_SUCCESS {
                self.shared.release_callbacks();
            } else {
                tracing::warn!(
                    "Failed to close Andor device with index {}: error #{errcode} ({}).",
                    self.device_index,
                    status_name(errcode)
                );
            }
        }
    }
}
