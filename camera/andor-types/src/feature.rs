use serde::{Deserialize, Serialize};

/// The native value type of a feature.
///
/// This determines which family of `AT_Get*`/`AT_Set*` calls is valid for
/// the feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureKind {
    Int,
    Float,
    Bool,
    Enum,
    String,
    Command,
}

impl std::fmt::Display for FeatureKind {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::result::Result<(), std::fmt::Error> {
        std::fmt::Debug::fmt(self, fmt)
    }
}

macro_rules! define_features {
    ($($variant:ident => ($key:expr, $kind:ident),)*) => {
        /// Every camera feature known to this binding.
        ///
        /// The ordinal of each variant indexes the static native key table,
        /// so the variants are contiguous, starting at zero.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[repr(usize)]
        pub enum Feature {
            $($variant,)*
        }

        static NATIVE_KEYS: [&str; Feature::COUNT] = [$($key,)*];
        static KINDS: [FeatureKind; Feature::COUNT] = [$(FeatureKind::$kind,)*];

        impl Feature {
            /// All features in ordinal order.
            pub const ALL: &'static [Feature] = &[$(Feature::$variant,)*];
        }
    };
}

define_features! {
    AccumulateCount => ("Accumulate Count", Int),
    AcquisitionStart => ("Acquisition Start", Command),
    AcquisitionStop => ("Acquisition Stop", Command),
    AOIBinning => ("AOI Binning", Enum),
    AOIHBin => ("AOIHBin", Int),
    AOIHeight => ("AOI Height", Int),
    AOILeft => ("AOI Left", Int),
    AOIStride => ("AOI Stride", Int),
    AOITop => ("AOI Top", Int),
    AOIVBin => ("AOIVBin", Int),
    AOIWidth => ("AOI Width", Int),
    AuxiliaryOutSource => ("Auxiliary Out Source", Enum),
    BaselineLevel => ("Baseline Level", Int),
    BitDepth => ("Bit Depth", Enum),
    BufferOverflowEvent => ("Buffer Overflow Event", Int),
    BytesPerPixel => ("Bytes Per Pixel", Float),
    CameraAcquiring => ("Camera Acquiring", Bool),
    CameraDump => ("Camera Dump", Command),
    CameraModel => ("Camera Model", String),
    CameraName => ("Camera Name", String),
    ControllerID => ("Controller ID", String),
    CycleMode => ("Cycle Mode", Enum),
    DeviceCount => ("Device Count", Int),
    DeviceVideoIndex => ("Device Video Index", Int),
    ElectronicShutteringMode => ("Electronic Shuttering Mode", Enum),
    EventEnable => ("Event Enable", Bool),
    EventsMissedEvent => ("Events Missed Event", Int),
    EventSelector => ("Event Selector", Enum),
    ExposureTime => ("Exposure Time", Float),
    ExposureEndEvent => ("Exposure End Event", Int),
    ExposureStartEvent => ("Exposure Start Event", Int),
    FanSpeed => ("Fan Speed", Enum),
    FirmwareVersion => ("Firmware Version", String),
    FrameCount => ("Frame Count", Int),
    FrameRate => ("Frame Rate", Float),
    FullAOIControl => ("Full AOIControl", Bool),
    ImageSizeBytes => ("Image Size Bytes", Int),
    InterfaceType => ("Interface Type", String),
    IOInvert => ("IO Invert", Bool),
    IOSelector => ("IO Selector", Enum),
    LUTIndex => ("LUT Index", Int),
    LUTValue => ("LUT Value", Int),
    MaxInterfaceTransferRate => ("Max Interface Transfer Rate", Float),
    MetadataEnable => ("Metadata Enable", Bool),
    MetadataFrame => ("Metadata Frame", Bool),
    MetadataTimestamp => ("Metadata Timestamp", Bool),
    Overlap => ("Overlap", Bool),
    PixelCorrection => ("Pixel Correction", Enum),
    PixelEncoding => ("Pixel Encoding", Enum),
    PixelHeight => ("Pixel Height", Float),
    PixelReadoutRate => ("Pixel Readout Rate", Enum),
    PixelWidth => ("Pixel Width", Float),
    PreAmpGain => ("Pre Amp Gain", Enum),
    PreAmpGainChannel => ("Pre Amp Gain Channel", Enum),
    PreAmpGainControl => ("Pre Amp Gain Control", Enum),
    PreAmpGainSelector => ("Pre Amp Gain Selector", Enum),
    ReadoutTime => ("Readout Time", Float),
    RollingShutterGlobalClear => ("Rolling Shutter Global Clear", Bool),
    RowNExposureEndEvent => ("Row N Exposure End Event", Int),
    RowNExposureStartEvent => ("Row N Exposure Start Event", Int),
    SensorCooling => ("Sensor Cooling", Bool),
    SensorHeight => ("Sensor Height", Int),
    SensorTemperature => ("Sensor Temperature", Float),
    SensorWidth => ("Sensor Width", Int),
    SerialNumber => ("Serial Number", String),
    SimplePreAmpGainControl => ("Simple Pre Amp Gain Control", Enum),
    SoftwareTrigger => ("Software Trigger", Command),
    SoftwareVersion => ("Software Version", String),
    SpuriousNoiseFilter => ("Spurious Noise Filter", Bool),
    SynchronousTriggering => ("Synchronous Triggering", Bool),
    TargetSensorTemperature => ("Target Sensor Temperature", Float),
    TemperatureControl => ("Temperature Control", Enum),
    TemperatureStatus => ("Temperature Status", Enum),
    TimestampClock => ("Timestamp Clock", Int),
    TimestampClockFrequency => ("Timestamp Clock Frequency", Int),
    TimestampClockReset => ("Timestamp Clock Reset", Command),
    TriggerMode => ("Trigger Mode", Enum),
    VerticallyCenterAOI => ("Vertically Center AOI", Bool),
}

impl Feature {
    /// Number of features in the registry.
    pub const COUNT: usize = Feature::VerticallyCenterAOI as usize + 1;

    /// The string key the SDK uses for this feature.
    #[inline]
    pub fn native_key(self) -> &'static str {
        NATIVE_KEYS[self as usize]
    }

    #[inline]
    pub fn kind(self) -> FeatureKind {
        KINDS[self as usize]
    }

    #[inline]
    pub fn ordinal(self) -> usize {
        self as usize
    }

    pub fn from_ordinal(ordinal: usize) -> Option<Self> {
        Self::ALL.get(ordinal).copied()
    }

    /// Find the feature whose native key matches `key`.
    ///
    /// Matching ignores whitespace: the driver reports some names with and
    /// some without interior spaces.
    pub fn from_native_key(key: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|f| keys_match(f.native_key(), key))
    }
}

impl std::fmt::Display for Feature {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::result::Result<(), std::fmt::Error> {
        fmt.write_str(self.native_key())
    }
}

/// Compare two feature names, ignoring all whitespace.
pub fn keys_match(a: &str, b: &str) -> bool {
    let a = a.chars().filter(|c| !c.is_whitespace());
    let b = b.chars().filter(|c| !c.is_whitespace());
    a.eq(b)
}
