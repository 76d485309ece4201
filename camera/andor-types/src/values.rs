//! Symbolic values for enumerated features.
//!
//! The SDK exposes enumerated features as raw indices. Each type here is a
//! closed family of such indices with display names matching the strings the
//! SDK reports for them. An index outside `0..COUNT` cannot be represented.

use serde::{Deserialize, Serialize};

use crate::Feature;

/// A closed family of values of an enumerated feature.
pub trait SymbolicValue: Sized + Copy + 'static {
    /// The feature whose enumerated index this family describes.
    const FEATURE: Feature;
    /// Number of values in the family. Valid indices are `0..COUNT`.
    const COUNT: i32;

    /// All values, in index order.
    fn variants() -> &'static [Self];
    fn from_index(index: i32) -> Option<Self>;
    fn index(self) -> i32;
    /// Display name, as reported by the SDK's enum string for this index.
    fn name(self) -> &'static str;

    /// Look up a value by its display name, ignoring whitespace and case.
    fn from_name(name: &str) -> Option<Self> {
        Self::variants()
            .iter()
            .copied()
            .find(|v| names_match(v.name(), name))
    }
}

fn names_match(a: &str, b: &str) -> bool {
    let a = a
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase);
    let b = b
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase);
    a.eq(b)
}

macro_rules! symbolic_value {
    (
        $(#[$meta:meta])*
        $name:ident for $feature:ident {
            $($variant:ident => $display:expr,)*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[repr(i32)]
        pub enum $name {
            $($variant,)*
        }

        impl SymbolicValue for $name {
            const FEATURE: Feature = Feature::$feature;
            const COUNT: i32 = [$($name::$variant,)*].len() as i32;

            fn variants() -> &'static [Self] {
                &[$($name::$variant,)*]
            }

            fn from_index(index: i32) -> Option<Self> {
                if (0..Self::COUNT).contains(&index) {
                    Some(Self::variants()[index as usize])
                } else {
                    None
                }
            }

            #[inline]
            fn index(self) -> i32 {
                self as i32
            }

            fn name(self) -> &'static str {
                match self {
                    $($name::$variant => $display,)*
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::result::Result<(), std::fmt::Error> {
                fmt.write_str(self.name())
            }
        }
    };
}

symbolic_value! {
    /// Gain and dynamic range preset.
    SimplePreAmp for SimplePreAmpGainControl {
        HighCapacity12Bit => "12-bit (high well capacity)",
        LowNoise12Bit => "12-bit (low noise)",
        LowNoiseHighCapacity16Bit => "16-bit (low noise & high well capacity)",
    }
}

symbolic_value! {
    /// Electronic shuttering mode.
    Shutter for ElectronicShutteringMode {
        Rolling => "Rolling",
        Global => "Global",
    }
}

symbolic_value! {
    TriggerMode for TriggerMode {
        Internal => "Internal",
        ExternalLevelTransition => "External Level Transition",
        ExternalStart => "External Start",
        ExternalExposure => "External Exposure",
        Software => "Software",
        Advanced => "Advanced",
        External => "External",
    }
}

symbolic_value! {
    /// Sensor cooling state. Read-only.
    TemperatureStatus for TemperatureStatus {
        CoolerOff => "Cooler Off",
        Stabilized => "Stabilised",
        Cooling => "Cooling",
        Drift => "Drift",
        NotStabilized => "Not Stabilised",
        Fault => "Fault",
    }
}

symbolic_value! {
    /// Symmetric pixel binning.
    Binning for AOIBinning {
        Bin1x1 => "1x1",
        Bin2x2 => "2x2",
        Bin3x3 => "3x3",
        Bin4x4 => "4x4",
        Bin8x8 => "8x8",
    }
}

symbolic_value! {
    AuxiliaryOutSource for AuxiliaryOutSource {
        FireRow1 => "FireRow1",
        FireRowN => "FireRowN",
        FireAll => "FireAll",
        FireAny => "FireAny",
    }
}

symbolic_value! {
    CycleMode for CycleMode {
        Fixed => "Fixed",
        Continuous => "Continuous",
    }
}

symbolic_value! {
    FanSpeed for FanSpeed {
        Off => "Off",
        On => "On",
    }
}

symbolic_value! {
    /// Pixel data layout of acquired buffers. Read-only; it follows from
    /// the pre-amp setting.
    PixelEncoding for PixelEncoding {
        Mono12 => "Mono12",
        Mono12Packed => "Mono12Packed",
        Mono16 => "Mono16",
        RGB8Packed => "RGB8Packed",
        Mono12Coded => "Mono12Coded",
        Mono12CodedPacked => "Mono12CodedPacked",
        Mono22Parallel => "Mono22Parallel",
        Mono22PackedParallel => "Mono22PackedParallel",
        Mono8 => "Mono8",
        Mono32 => "Mono32",
    }
}

symbolic_value! {
    IOSelector for IOSelector {
        Fire1 => "Fire 1",
        FireN => "Fire N",
        AuxOut1 => "Aux Out 1",
        Arm => "Arm",
        AuxOut2 => "Aux Out 2",
        SpareInput => "Spare Input",
        ExternalTrigger => "External Trigger",
        FireNand1 => "Fire N and 1",
    }
}

symbolic_value! {
    PixelReadoutRate for PixelReadoutRate {
        Rate10MHz => "10 MHz",
        Rate100MHz => "100 MHz",
        Rate200MHz => "200 MHz",
        Rate300MHz => "300 MHz",
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn check_family<T: SymbolicValue + std::fmt::Debug + PartialEq>() {
        assert_eq!(T::variants().len() as i32, T::COUNT);
        for (i, v) in T::variants().iter().enumerate() {
            assert_eq!(v.index(), i as i32);
            assert_eq!(T::from_index(i as i32), Some(*v));
            assert_eq!(T::from_name(v.name()), Some(*v));
        }
        assert_eq!(T::from_index(-1), None);
        assert_eq!(T::from_index(T::COUNT), None);
        assert_eq!(T::from_index(i32::MAX), None);
    }

    #[test]
    fn families_are_contiguous() {
        check_family::<SimplePreAmp>();
        check_family::<Shutter>();
        check_family::<TriggerMode>();
        check_family::<TemperatureStatus>();
        check_family::<Binning>();
        check_family::<AuxiliaryOutSource>();
        check_family::<CycleMode>();
        check_family::<FanSpeed>();
        check_family::<PixelEncoding>();
        check_family::<IOSelector>();
        check_family::<PixelReadoutRate>();
    }

    #[test]
    fn family_sizes() {
        assert_eq!(Shutter::COUNT, 2);
        assert_eq!(TriggerMode::COUNT, 7);
        assert_eq!(Binning::COUNT, 5);
        assert_eq!(CycleMode::COUNT, 2);
        assert_eq!(PixelEncoding::COUNT, 10);
    }

    #[test]
    fn bound_features() {
        assert_eq!(Shutter::FEATURE, Feature::ElectronicShutteringMode);
        assert_eq!(Binning::FEATURE, Feature::AOIBinning);
        assert_eq!(SimplePreAmp::FEATURE, Feature::SimplePreAmpGainControl);
        assert_eq!(TriggerMode::FEATURE, Feature::TriggerMode);
    }

    #[test]
    fn names() {
        assert_eq!(TriggerMode::ExternalStart.to_string(), "External Start");
        assert_eq!(
            TriggerMode::from_name("externalstart"),
            Some(TriggerMode::ExternalStart)
        );
        assert_eq!(Binning::from_name("16x16"), None);
    }
}
