use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser};
use tracing::{info, warn};

use andor::{Camera, Feature, FeatureKind, Sdk, WaitTimeout};

#[derive(Debug, Args)]
struct DeviceArgs {
    /// index of the device to open
    #[arg(short, long, default_value = "0")]
    index: i32,
}

#[derive(Debug, Args)]
struct Grab {
    #[command(flatten)]
    device: DeviceArgs,

    /// number of buffers to acquire
    #[arg(short, long, default_value = "10")]
    count: usize,

    /// timeout for each buffer, in milliseconds. 0 waits forever.
    #[arg(short, long, default_value = "5000")]
    timeout_ms: u32,
}

/// Andor SDK3 camera utilities
#[derive(Debug, Parser)]
#[command(name = "andor", author, version)]
struct Cli {
    /// use this many simulated cameras instead of the Andor SDK
    #[arg(long, global = true)]
    mock: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, clap::Subcommand)]
enum Command {
    /// list attached cameras
    List,

    /// show model, sensor and acquisition settings of a camera
    Info(DeviceArgs),

    /// read a feature
    Get {
        #[command(flatten)]
        device: DeviceArgs,
        /// feature name, e.g. "Exposure Time"
        feature: String,
    },

    /// write a feature
    Set {
        #[command(flatten)]
        device: DeviceArgs,
        /// feature name, e.g. "Exposure Time"
        feature: String,
        value: String,
    },

    /// apply a TOML settings file
    Apply {
        #[command(flatten)]
        device: DeviceArgs,
        settings: PathBuf,
    },

    /// acquire buffers and report their addresses
    Grab(Grab),
}

fn parse_feature(name: &str) -> anyhow::Result<Feature> {
    Feature::from_native_key(name).with_context(|| format!("unknown feature \"{name}\""))
}

fn list(sdk: &dyn Sdk) -> anyhow::Result<()> {
    for (i, name) in andor::list_device_names(sdk)?.iter().enumerate() {
        println!("{i}: {name}");
    }
    Ok(())
}

fn info(sdk: &dyn Sdk, args: DeviceArgs) -> anyhow::Result<()> {
    let cam = Camera::open(sdk, args.index)?;
    for feature in [
        Feature::CameraModel,
        Feature::SerialNumber,
        Feature::FirmwareVersion,
        Feature::InterfaceType,
    ] {
        if cam.is_implemented(feature)? {
            println!("{feature}: {}", cam.feature_string(feature)?);
        }
    }
    println!(
        "Sensor: {}x{}",
        cam.feature_int(Feature::SensorWidth)?,
        cam.feature_int(Feature::SensorHeight)?
    );
    if cam.is_implemented(Feature::PixelEncoding)? {
        println!("Pixel Encoding: {}", cam.pixel_encoding()?);
    }
    if cam.is_implemented(Feature::TemperatureStatus)? {
        println!(
            "Sensor Temperature: {} ({})",
            cam.feature_float(Feature::SensorTemperature)?,
            cam.temperature_status()?
        );
    }
    let settings = cam.read_settings()?;
    print!("{}", toml::to_string(&settings)?);
    cam.close()?;
    Ok(())
}

fn get(sdk: &dyn Sdk, args: DeviceArgs, name: &str) -> anyhow::Result<()> {
    let feature = parse_feature(name)?;
    let cam = Camera::open(sdk, args.index)?;
    let value = match feature.kind() {
        FeatureKind::Int => cam.feature_int(feature)?.to_string(),
        FeatureKind::Float => cam.feature_float(feature)?.to_string(),
        FeatureKind::Bool => cam.feature_bool(feature)?.to_string(),
        FeatureKind::Enum => cam.feature_enum_string(feature)?,
        FeatureKind::String => cam.feature_string(feature)?,
        FeatureKind::Command => anyhow::bail!("\"{feature}\" is a command"),
    };
    println!("{value}");
    cam.close()?;
    Ok(())
}

fn set(sdk: &dyn Sdk, args: DeviceArgs, name: &str, value: &str) -> anyhow::Result<()> {
    let feature = parse_feature(name)?;
    let cam = Camera::open(sdk, args.index)?;
    match feature.kind() {
        FeatureKind::Int => cam.feature_int_set(feature, value.parse()?)?,
        FeatureKind::Float => cam.feature_float_set(feature, value.parse()?)?,
        FeatureKind::Bool => cam.feature_bool_set(feature, value.parse()?)?,
        FeatureKind::Enum => cam.feature_enum_string_set(feature, value)?,
        FeatureKind::String => cam.feature_string_set(feature, value)?,
        FeatureKind::Command => cam.command(feature)?,
    }
    cam.close()?;
    Ok(())
}

fn apply(sdk: &dyn Sdk, args: DeviceArgs, path: &std::path::Path) -> anyhow::Result<()> {
    let buf = std::fs::read_to_string(path)
        .with_context(|| format!("reading settings file {}", path.display()))?;
    let settings: andor::CameraSettings =
        toml::from_str(&buf).with_context(|| format!("parsing {}", path.display()))?;
    let cam = Camera::open(sdk, args.index)?;
    cam.apply_settings(&settings)?;
    info!("applied {}", path.display());
    cam.close()?;
    Ok(())
}

fn grab(sdk: &dyn Sdk, args: Grab) -> anyhow::Result<()> {
    // Declared before the camera so that it outlives the camera's handle.
    let mut buffers: Vec<Vec<u8>> = Vec::with_capacity(args.count);
    let cam = Camera::open(sdk, args.device.index)?;
    let image_size = usize::try_from(cam.feature_int(Feature::ImageSizeBytes)?)?;
    let timeout = match args.timeout_ms {
        0 => WaitTimeout::Infinite,
        ms => WaitTimeout::Millis(ms),
    };

    buffers.resize_with(args.count, || vec![0; image_size]);
    for buf in buffers.iter_mut() {
        unsafe { cam.queue_buffer(buf.as_mut_ptr(), buf.len())? };
    }

    cam.command(Feature::AcquisitionStart)?;
    let mut result = Ok(());
    for i in 0..args.count {
        match cam.wait_buffer(timeout) {
            Ok(ptr) => info!("buffer {i}: {ptr:p}"),
            Err(e) => {
                result = Err(e);
                break;
            }
        }
    }
    if let Err(e) = cam.command(Feature::AcquisitionStop) {
        warn!("{e}");
    }
    cam.flush()?;
    cam.close()?;
    Ok(result?)
}

fn main() -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("andor=info,warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    let lib;
    let mock;
    let sdk: &dyn Sdk = match cli.mock {
        Some(n) => {
            mock = andor::mock::MockSdk::with_cameras(n);
            &mock
        }
        None => {
            lib = andor::AndorLibrary::new()?;
            &lib
        }
    };

    match cli.command {
        Command::List => list(sdk)?,
        Command::Info(args) => info(sdk, args)?,
        Command::Get { device, feature } => get(sdk, device, &feature)?,
        Command::Set {
            device,
            feature,
            value,
        } => set(sdk, device, &feature, &value)?,
        Command::Apply { device, settings } => apply(sdk, device, &settings)?,
        Command::Grab(args) => grab(sdk, args)?,
    };

    Ok(())
}
