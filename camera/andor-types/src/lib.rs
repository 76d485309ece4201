//! Feature registry and symbolic value types for Andor SDK3 cameras.
//!
//! This crate holds only static data: the closed set of [Feature]s with
//! their native string keys, the enumerated value families layered over
//! those features, and the serializable [CameraSettings] record. It has no
//! dependency on the SDK itself.

mod feature;
mod settings;
mod values;

pub use feature::{Feature, FeatureKind, keys_match};
pub use settings::{Aoi, CameraSettings};
pub use values::{
    AuxiliaryOutSource, Binning, CycleMode, FanSpeed, IOSelector, PixelEncoding,
    PixelReadoutRate, Shutter, SimplePreAmp, SymbolicValue, TemperatureStatus, TriggerMode,
};
