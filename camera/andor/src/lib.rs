//! Rust bindings for Andor SDK3 cameras.
//!
//! The SDK is reached through the [Sdk] trait. [AndorLibrary] implements it
//! by loading `atcore` at runtime and, with the `mock` feature,
//! [mock::MockSdk] implements it in memory.
//!
//! ```no_run
//! # fn main() -> andor::Result<()> {
//! use andor::{AndorLibrary, Camera, Feature};
//!
//! let lib = AndorLibrary::new()?;
//! for name in andor::list_device_names(&lib)? {
//!     println!("{name}");
//! }
//! let cam = Camera::open(&lib, 0)?;
//! cam.feature_float_set(Feature::ExposureTime, 0.01)?;
//! println!("trigger mode: {}", cam.trigger_mode()?);
//! cam.close()?;
//! # Ok(())
//! # }
//! ```

macro_rules! at_call_no_err {
    ($expr: expr) => {{
        tracing::debug!("calling: {} {}:{}", stringify!($expr), file!(), line!());
        $expr
    }};
}

/// Call into the SDK, turning a failure status into a
/// [crate::error::DeviceError] described by the trailing format arguments.
macro_rules! at_call {
    ($expr: expr, $($describe: tt)+) => {{
        let errcode = at_call_no_err!($expr);
        tracing::debug!("  errcode: {}", errcode);
        $crate::error::at_err(errcode, || format!($($describe)+))
    }};
}

mod buffer;
mod callback;
mod camera;
mod enumerate;
mod error;
mod library;
#[cfg(feature = "mock")]
pub mod mock;
pub mod sdk;
mod settings;
pub mod wide;

pub use andor_types::{
    Aoi, AuxiliaryOutSource, Binning, CameraSettings, CycleMode, FanSpeed, Feature, FeatureKind,
    IOSelector, PixelEncoding, PixelReadoutRate, Shutter, SimplePreAmp, SymbolicValue,
    TemperatureStatus, TriggerMode, keys_match,
};

pub use buffer::{HostLock, WaitTimeout};
pub use callback::{CALLBACK_FAILED, CALLBACK_PROTOCOL_ERROR, CallbackToken};
pub use camera::Camera;
pub use enumerate::list_device_names;
pub use error::{AT_ERR_HARDWARE_OVERFLOW, DeviceError, Error, Result, status_name};
pub use library::AndorLibrary;
pub use sdk::{AT_INFINITE, Sdk};
