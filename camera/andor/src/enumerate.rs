use andor_types::Feature;

use crate::{
    Camera,
    error::{DeviceError, Error, Result},
    sdk::{AT_HANDLE_SYSTEM, Sdk},
};

/// The model names of all attached devices, in device index order.
///
/// Each device is opened briefly to read its model name. A failure on any
/// device aborts the enumeration; the device being queried is closed before
/// the error is returned.
pub fn list_device_names(sdk: &dyn Sdk) -> Result<Vec<String>> {
    let key = Feature::DeviceCount.native_key();
    let mut count = 0;
    at_call!(
        sdk.get_int(AT_HANDLE_SYSTEM, key, &mut count),
        "Failed to get Andor device count."
    )?;
    if count < 0 {
        return Err(Error::protocol(format!(
            "Andor SDK3 reported a negative device count ({count})."
        )));
    }
    let count = i32::try_from(count).map_err(|_| {
        Error::protocol(format!("Andor SDK3 reported {count} devices."))
    })?;
    tracing::debug!("{count} Andor devices attached");

    let mut result = Vec::new();
    for device_index in 0..count {
        let cam = Camera::open(sdk, device_index)?;
        let name = cam.feature_string(Feature::CameraModel).map_err(|e| match e {
            Error::Device { source } => Error::from(DeviceError::new(
                format!(
                    "Failed to read model name of Andor device with index {device_index}: {}",
                    source.description
                ),
                source.code,
            )),
            e => e,
        })?;
        cam.close()?;
        result.push(name);
    }
    Ok(result)
}
