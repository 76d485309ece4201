//! An in-memory [Sdk] for testing without hardware.
//!
//! [MockSdk] holds a list of [MockDevice]s with scripted feature values. It
//! counts calls by their SDK function name, can be told to fail calls, keeps
//! registered callbacks so notifications can be fired on demand, and queues
//! buffers per handle.

use std::{
    collections::{HashMap, HashSet, VecDeque},
    os::raw::{c_int, c_void},
};

use andor_types::{
    AuxiliaryOutSource, Binning, CycleMode, FanSpeed, Feature, IOSelector, PixelEncoding,
    PixelReadoutRate, Shutter, SimplePreAmp, SymbolicValue, TemperatureStatus, TriggerMode,
};
use parking_lot::Mutex;

use crate::{
    sdk::*,
    wide::{copy_to_buf, to_wide},
};

/// The value of one feature of a [MockDevice].
#[derive(Debug, Clone, PartialEq)]
pub enum MockValue {
    Int { value: i64, min: i64, max: i64 },
    Float { value: f64, min: f64, max: f64 },
    Bool(bool),
    /// `index` is returned as is, even when outside `options`.
    Enum { index: i32, options: Vec<String> },
    String(String),
    Command,
}

impl MockValue {
    pub fn int(value: i64, min: i64, max: i64) -> Self {
        MockValue::Int { value, min, max }
    }

    pub fn float(value: f64, min: f64, max: f64) -> Self {
        MockValue::Float { value, min, max }
    }

    /// An enumerated feature with the display names of `T`.
    pub fn symbolic<T: SymbolicValue>(value: T) -> Self {
        MockValue::Enum {
            index: value.index(),
            options: T::variants().iter().map(|v| v.name().to_string()).collect(),
        }
    }
}

fn normalize(key: &str) -> String {
    key.chars().filter(|c| !c.is_whitespace()).collect()
}

/// A simulated camera.
#[derive(Debug, Clone)]
pub struct MockDevice {
    features: HashMap<String, MockValue>,
    read_only: HashSet<String>,
}

impl MockDevice {
    /// A device with no features except its model name.
    pub fn empty(model: &str) -> Self {
        let mut result = Self {
            features: HashMap::new(),
            read_only: HashSet::new(),
        };
        result.set_read_only(Feature::CameraModel, MockValue::String(model.into()));
        result
    }

    /// A device resembling a 2560x2160 sCMOS camera.
    pub fn new(model: &str) -> Self {
        let mut d = Self::empty(model);
        d.set_read_only(Feature::CameraName, MockValue::String(format!("{model} (mock)")));
        d.set_read_only(Feature::SerialNumber, MockValue::String("MOCK-0001".into()));
        d.set_read_only(Feature::FirmwareVersion, MockValue::String("1.0.0".into()));
        d.set_read_only(Feature::InterfaceType, MockValue::String("Mock".into()));
        d.set_read_only(Feature::SensorWidth, MockValue::int(2560, 2560, 2560));
        d.set_read_only(Feature::SensorHeight, MockValue::int(2160, 2160, 2160));
        d.set_read_only(Feature::ImageSizeBytes, MockValue::int(4096, 0, i64::MAX));
        d.set_read_only(Feature::SensorTemperature, MockValue::float(-0.5, -100.0, 50.0));
        d.set_read_only(Feature::CameraAcquiring, MockValue::Bool(false));
        d.set_read_only(Feature::PixelEncoding, MockValue::symbolic(PixelEncoding::Mono12));
        d.set_read_only(
            Feature::TemperatureStatus,
            MockValue::symbolic(TemperatureStatus::CoolerOff),
        );
        d.set(Feature::ExposureTime, MockValue::float(0.01, 1e-5, 30.0));
        d.set(Feature::FrameRate, MockValue::float(10.0, 0.1, 100.0));
        d.set(Feature::FrameCount, MockValue::int(1, 1, 1 << 20));
        d.set(Feature::AccumulateCount, MockValue::int(1, 1, 1 << 20));
        d.set(Feature::AOIWidth, MockValue::int(2560, 1, 2560));
        d.set(Feature::AOIHeight, MockValue::int(2160, 1, 2160));
        d.set(Feature::AOILeft, MockValue::int(1, 1, 2560));
        d.set(Feature::AOITop, MockValue::int(1, 1, 2160));
        d.set(Feature::ElectronicShutteringMode, MockValue::symbolic(Shutter::Rolling));
        d.set(Feature::TriggerMode, MockValue::symbolic(TriggerMode::Internal));
        d.set(Feature::AOIBinning, MockValue::symbolic(Binning::Bin1x1));
        d.set(Feature::CycleMode, MockValue::symbolic(CycleMode::Fixed));
        d.set(Feature::FanSpeed, MockValue::symbolic(FanSpeed::On));
        d.set(
            Feature::AuxiliaryOutSource,
            MockValue::symbolic(AuxiliaryOutSource::FireAny),
        );
        d.set(
            Feature::SimplePreAmpGainControl,
            MockValue::symbolic(SimplePreAmp::LowNoise12Bit),
        );
        d.set(
            Feature::PixelReadoutRate,
            MockValue::symbolic(PixelReadoutRate::Rate100MHz),
        );
        d.set(Feature::IOSelector, MockValue::symbolic(IOSelector::Fire1));
        d.set(Feature::SensorCooling, MockValue::Bool(false));
        d.set(Feature::Overlap, MockValue::Bool(false));
        d.set(Feature::SpuriousNoiseFilter, MockValue::Bool(true));
        d.set(Feature::MetadataEnable, MockValue::Bool(false));
        d.set(Feature::AcquisitionStart, MockValue::Command);
        d.set(Feature::AcquisitionStop, MockValue::Command);
        d.set(Feature::SoftwareTrigger, MockValue::Command);
        d
    }

    pub fn set(&mut self, feature: Feature, value: MockValue) {
        self.set_key(feature.native_key(), value);
    }

    pub fn set_read_only(&mut self, feature: Feature, value: MockValue) {
        let key = normalize(feature.native_key());
        self.read_only.insert(key.clone());
        self.features.insert(key, value);
    }

    /// Set a feature by its raw key, which need not be in the registry.
    pub fn set_key(&mut self, key: &str, value: MockValue) {
        let key = normalize(key);
        self.read_only.remove(&key);
        self.features.insert(key, value);
    }

    pub fn remove(&mut self, feature: Feature) {
        let key = normalize(feature.native_key());
        self.read_only.remove(&key);
        self.features.remove(&key);
    }

    pub fn get(&self, feature: Feature) -> Option<&MockValue> {
        self.features.get(&normalize(feature.native_key()))
    }

    fn value(&self, key: &str) -> Result<&MockValue, c_int> {
        self.features
            .get(&normalize(key))
            .ok_or(AT_ERR_NOTIMPLEMENTED)
    }

    fn writable(&mut self, key: &str) -> Result<&mut MockValue, c_int> {
        let key = normalize(key);
        if self.read_only.contains(&key) {
            return Err(AT_ERR_READONLY);
        }
        self.features.get_mut(&key).ok_or(AT_ERR_NOTIMPLEMENTED)
    }
}

struct MockCallback {
    handle: AtH,
    key: String,
    callback: FeatureCallback,
    // Stored as an address so the state is `Send`.
    context: usize,
}

struct Failure {
    call: &'static str,
    feature: Option<String>,
    code: c_int,
}

#[derive(Default)]
struct MockState {
    devices: Vec<MockDevice>,
    device_count: Option<i64>,
    next_handle: AtH,
    open: HashMap<AtH, usize>,
    calls: HashMap<&'static str, usize>,
    failures: Vec<Failure>,
    open_failures: HashMap<i32, c_int>,
    callbacks: Vec<MockCallback>,
    queues: HashMap<AtH, VecDeque<(usize, c_int)>>,
    zero_size_waits: usize,
}

impl MockState {
    fn begin(&mut self, call: &'static str, feature: Option<&str>) -> Result<(), c_int> {
        *self.calls.entry(call).or_insert(0) += 1;
        let failure = self.failures.iter().find(|f| {
            f.call == call
                && match (&f.feature, feature) {
                    (None, _) => true,
                    (Some(a), Some(b)) => normalize(a) == normalize(b),
                    (Some(_), None) => false,
                }
        });
        match failure {
            Some(f) => Err(f.code),
            None => Ok(()),
        }
    }

    fn device(&mut self, handle: AtH) -> Result<&mut MockDevice, c_int> {
        let index = *self.open.get(&handle).ok_or(AT_ERR_INVALIDHANDLE)?;
        Ok(&mut self.devices[index])
    }
}

fn status(result: Result<(), c_int>) -> c_int {
    match result {
        Ok(()) => AT_SUCCESS,
        Err(code) => code,
    }
}

fn at_bool(value: bool) -> AtBool {
    if value { AT_TRUE } else { AT_FALSE }
}

/// An in-memory [Sdk].
pub struct MockSdk {
    state: Mutex<MockState>,
}

impl Default for MockSdk {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl MockSdk {
    pub fn new(devices: Vec<MockDevice>) -> Self {
        Self {
            state: Mutex::new(MockState {
                devices,
                // Distinct from AT_HANDLE_SYSTEM.
                next_handle: 100,
                ..Default::default()
            }),
        }
    }

    /// `n` devices with models "Mock 0", "Mock 1", ...
    pub fn with_cameras(n: usize) -> Self {
        Self::new((0..n).map(|i| MockDevice::new(&format!("Mock {i}"))).collect())
    }

    /// Report `count` from "Device Count" regardless of the device list.
    pub fn set_device_count(&self, count: i64) {
        self.state.lock().device_count = Some(count);
    }

    /// Modify device `index`.
    pub fn with_device<R>(&self, index: usize, f: impl FnOnce(&mut MockDevice) -> R) -> R {
        f(&mut self.state.lock().devices[index])
    }

    /// Number of calls to the SDK function `call`, e.g. `"AT_Open"`.
    pub fn call_count(&self, call: &str) -> usize {
        self.state.lock().calls.get(call).copied().unwrap_or(0)
    }

    /// Make every call to `call` fail with `code`.
    pub fn fail(&self, call: &'static str, code: c_int) {
        self.state.lock().failures.push(Failure {
            call,
            feature: None,
            code,
        });
    }

    /// Make calls to `call` for `feature` fail with `code`.
    pub fn fail_for_feature(&self, call: &'static str, feature: Feature, code: c_int) {
        self.state.lock().failures.push(Failure {
            call,
            feature: Some(feature.native_key().to_string()),
            code,
        });
    }

    /// Make opening device `device_index` fail with `code`.
    pub fn fail_open(&self, device_index: i32, code: c_int) {
        self.state.lock().open_failures.insert(device_index, code);
    }

    pub fn clear_failures(&self) {
        let mut state = self.state.lock();
        state.failures.clear();
        state.open_failures.clear();
    }

    pub fn open_handles(&self) -> usize {
        self.state.lock().open.len()
    }

    pub fn registered_callbacks(&self) -> usize {
        self.state.lock().callbacks.len()
    }

    pub fn queued_buffers(&self, handle: AtH) -> usize {
        self.state
            .lock()
            .queues
            .get(&handle)
            .map(VecDeque::len)
            .unwrap_or(0)
    }

    /// Make the next `n` successful waits report a buffer size of zero.
    pub fn report_zero_size_waits(&self, n: usize) {
        self.state.lock().zero_size_waits = n;
    }

    /// Notify every callback registered for `feature` on `handle`, as the
    /// SDK does when the feature changes. Returns the callbacks' statuses.
    pub fn fire(&self, handle: AtH, feature: &str) -> Vec<c_int> {
        self.fire_as(handle, feature, handle, feature)
    }

    /// Notify the callbacks registered for `feature` on `handle`, but
    /// reporting `reported_handle` and `reported_feature` to them.
    pub fn fire_as(
        &self,
        handle: AtH,
        feature: &str,
        reported_handle: AtH,
        reported_feature: &str,
    ) -> Vec<c_int> {
        let key = normalize(feature);
        let targets: Vec<(FeatureCallback, usize)> = self
            .state
            .lock()
            .callbacks
            .iter()
            .filter(|cb| cb.handle == handle && cb.key == key)
            .map(|cb| (cb.callback, cb.context))
            .collect();
        let Ok(reported) = to_wide(reported_feature) else {
            return Vec::new();
        };
        // The state lock is not held here, callbacks may call back in.
        targets
            .into_iter()
            .map(|(callback, context)| unsafe {
                callback(reported_handle, reported.as_ptr(), context as *mut c_void)
            })
            .collect()
    }

    fn read<R>(
        &self,
        call: &'static str,
        handle: AtH,
        feature: &str,
        f: impl FnOnce(&MockValue) -> Result<R, c_int>,
    ) -> Result<R, c_int> {
        let mut state = self.state.lock();
        state.begin(call, Some(feature))?;
        let device = state.device(handle)?;
        f(device.value(feature)?)
    }

    fn query(
        &self,
        call: &'static str,
        handle: AtH,
        feature: &str,
        out: &mut AtBool,
        f: impl FnOnce(&MockDevice, &str) -> bool,
    ) -> c_int {
        let mut state = self.state.lock();
        let result = state.begin(call, Some(feature)).and_then(|()| {
            let device: &MockDevice = state.device(handle)?;
            *out = at_bool(f(device, &normalize(feature)));
            Ok(())
        });
        status(result)
    }

    /// Change a writable feature, then notify its callbacks.
    fn write(
        &self,
        call: &'static str,
        handle: AtH,
        feature: &str,
        f: impl FnOnce(&mut MockValue) -> Result<(), c_int>,
    ) -> c_int {
        let result = {
            let mut state = self.state.lock();
            state.begin(call, Some(feature)).and_then(|()| {
                let device = state.device(handle)?;
                f(device.writable(feature)?)
            })
        };
        if result.is_ok() {
            self.fire(handle, feature);
        }
        status(result)
    }
}

/// Strings with an interior nul cannot be passed to the SDK. Fail them with
/// the status [crate::AndorLibrary] gives for them.
fn reject_nul(value: &str) -> Result<(), c_int> {
    if value.contains('\0') {
        Err(AT_ERR_NOTIMPLEMENTED)
    } else {
        Ok(())
    }
}

impl Sdk for MockSdk {
    fn open(&self, device_index: c_int, handle: &mut AtH) -> c_int {
        let mut state = self.state.lock();
        let result = state.begin("AT_Open", None).and_then(|()| {
            if let Some(code) = state.open_failures.get(&device_index) {
                return Err(*code);
            }
            let index = usize::try_from(device_index)
                .ok()
                .filter(|i| *i < state.devices.len())
                .ok_or(AT_ERR_OUTOFRANGE)?;
            if state.open.values().any(|i| *i == index) {
                return Err(AT_ERR_DEVICEINUSE);
            }
            let h = state.next_handle;
            state.next_handle += 1;
            state.open.insert(h, index);
            *handle = h;
            Ok(())
        });
        status(result)
    }

    fn close(&self, handle: AtH) -> c_int {
        let mut state = self.state.lock();
        let result = state.begin("AT_Close", None).and_then(|()| {
            state.open.remove(&handle).ok_or(AT_ERR_INVALIDHANDLE)?;
            state.callbacks.retain(|cb| cb.handle != handle);
            state.queues.remove(&handle);
            Ok(())
        });
        status(result)
    }

    unsafe fn register_feature_callback(
        &self,
        handle: AtH,
        feature: &str,
        callback: FeatureCallback,
        context: *mut c_void,
    ) -> c_int {
        let result = {
            let mut state = self.state.lock();
            state
                .begin("AT_RegisterFeatureCallback", Some(feature))
                .and_then(|()| {
                    state.device(handle)?.value(feature)?;
                    state.callbacks.push(MockCallback {
                        handle,
                        key: normalize(feature),
                        callback,
                        context: context as usize,
                    });
                    Ok(())
                })
        };
        if result.is_ok() {
            // The SDK calls every new callback once during registration.
            if let Ok(key) = to_wide(feature) {
                unsafe { callback(handle, key.as_ptr(), context) };
            }
        }
        status(result)
    }

    unsafe fn unregister_feature_callback(
        &self,
        handle: AtH,
        feature: &str,
        callback: FeatureCallback,
        context: *mut c_void,
    ) -> c_int {
        let mut state = self.state.lock();
        let result = state
            .begin("AT_UnregisterFeatureCallback", Some(feature))
            .and_then(|()| {
                let key = normalize(feature);
                let pos = state
                    .callbacks
                    .iter()
                    .position(|cb| {
                        cb.handle == handle
                            && cb.key == key
                            && cb.callback as usize == callback as usize
                            && cb.context == context as usize
                    })
                    .ok_or(AT_ERR_INVALIDHANDLE)?;
                state.callbacks.remove(pos);
                Ok(())
            });
        status(result)
    }

    fn is_implemented(&self, handle: AtH, feature: &str, value: &mut AtBool) -> c_int {
        self.query("AT_IsImplemented", handle, feature, value, |d, k| {
            d.features.contains_key(k)
        })
    }

    fn is_readable(&self, handle: AtH, feature: &str, value: &mut AtBool) -> c_int {
        self.query("AT_IsReadable", handle, feature, value, |d, k| {
            matches!(d.features.get(k), Some(v) if *v != MockValue::Command)
        })
    }

    fn is_writable(&self, handle: AtH, feature: &str, value: &mut AtBool) -> c_int {
        self.query("AT_IsWritable", handle, feature, value, |d, k| {
            d.features.contains_key(k) && !d.read_only.contains(k)
        })
    }

    fn is_read_only(&self, handle: AtH, feature: &str, value: &mut AtBool) -> c_int {
        self.query("AT_IsReadOnly", handle, feature, value, |d, k| {
            d.read_only.contains(k)
        })
    }

    fn set_int(&self, handle: AtH, feature: &str, new: i64) -> c_int {
        self.write("AT_SetInt", handle, feature, |v| match v {
            MockValue::Int { value, min, max } => {
                if new < *min || new > *max {
                    return Err(AT_ERR_OUTOFRANGE);
                }
                *value = new;
                Ok(())
            }
            _ => Err(AT_ERR_NOTIMPLEMENTED),
        })
    }

    fn get_int(&self, handle: AtH, feature: &str, value: &mut i64) -> c_int {
        if handle == AT_HANDLE_SYSTEM {
            let mut state = self.state.lock();
            let result = state.begin("AT_GetInt", Some(feature)).and_then(|()| {
                if normalize(feature) != normalize(Feature::DeviceCount.native_key()) {
                    return Err(AT_ERR_NOTIMPLEMENTED);
                }
                *value = state
                    .device_count
                    .unwrap_or(state.devices.len() as i64);
                Ok(())
            });
            return status(result);
        }
        status(
            self.read("AT_GetInt", handle, feature, |v| match v {
                MockValue::Int { value, .. } => Ok(*value),
                _ => Err(AT_ERR_NOTIMPLEMENTED),
            })
            .map(|v| *value = v),
        )
    }

    fn get_int_max(&self, handle: AtH, feature: &str, value: &mut i64) -> c_int {
        status(
            self.read("AT_GetIntMax", handle, feature, |v| match v {
                MockValue::Int { max, .. } => Ok(*max),
                _ => Err(AT_ERR_NOTIMPLEMENTED),
            })
            .map(|v| *value = v),
        )
    }

    fn get_int_min(&self, handle: AtH, feature: &str, value: &mut i64) -> c_int {
        status(
            self.read("AT_GetIntMin", handle, feature, |v| match v {
                MockValue::Int { min, .. } => Ok(*min),
                _ => Err(AT_ERR_NOTIMPLEMENTED),
            })
            .map(|v| *value = v),
        )
    }

    fn set_float(&self, handle: AtH, feature: &str, new: f64) -> c_int {
        self.write("AT_SetFloat", handle, feature, |v| match v {
            MockValue::Float { value, min, max } => {
                if new < *min || new > *max {
                    return Err(AT_ERR_OUTOFRANGE);
                }
                *value = new;
                Ok(())
            }
            _ => Err(AT_ERR_NOTIMPLEMENTED),
        })
    }

    fn get_float(&self, handle: AtH, feature: &str, value: &mut f64) -> c_int {
        status(
            self.read("AT_GetFloat", handle, feature, |v| match v {
                MockValue::Float { value, .. } => Ok(*value),
                _ => Err(AT_ERR_NOTIMPLEMENTED),
            })
            .map(|v| *value = v),
        )
    }

    fn get_float_max(&self, handle: AtH, feature: &str, value: &mut f64) -> c_int {
        status(
            self.read("AT_GetFloatMax", handle, feature, |v| match v {
                MockValue::Float { max, .. } => Ok(*max),
                _ => Err(AT_ERR_NOTIMPLEMENTED),
            })
            .map(|v| *value = v),
        )
    }

    fn get_float_min(&self, handle: AtH, feature: &str, value: &mut f64) -> c_int {
        status(
            self.read("AT_GetFloatMin", handle, feature, |v| match v {
                MockValue::Float { min, .. } => Ok(*min),
                _ => Err(AT_ERR_NOTIMPLEMENTED),
            })
            .map(|v| *value = v),
        )
    }

    fn set_bool(&self, handle: AtH, feature: &str, new: AtBool) -> c_int {
        self.write("AT_SetBool", handle, feature, |v| match v {
            MockValue::Bool(value) => {
                *value = new != AT_FALSE;
                Ok(())
            }
            _ => Err(AT_ERR_NOTIMPLEMENTED),
        })
    }

    fn get_bool(&self, handle: AtH, feature: &str, value: &mut AtBool) -> c_int {
        status(
            self.read("AT_GetBool", handle, feature, |v| match v {
                MockValue::Bool(b) => Ok(at_bool(*b)),
                _ => Err(AT_ERR_NOTIMPLEMENTED),
            })
            .map(|v| *value = v),
        )
    }

    fn set_enum_index(&self, handle: AtH, feature: &str, new: c_int) -> c_int {
        self.write("AT_SetEnumIndex", handle, feature, |v| match v {
            MockValue::Enum { index, options } => {
                if usize::try_from(new).map_or(true, |i| i >= options.len()) {
                    return Err(AT_ERR_INDEXNOTAVAILABLE);
                }
                *index = new;
                Ok(())
            }
            _ => Err(AT_ERR_NOTIMPLEMENTED),
        })
    }

    fn set_enum_string(&self, handle: AtH, feature: &str, new: &str) -> c_int {
        self.write("AT_SetEnumString", handle, feature, |v| match v {
            MockValue::Enum { index, options } => {
                reject_nul(new)?;
                let pos = options
                    .iter()
                    .position(|o| o == new)
                    .ok_or(AT_ERR_STRINGNOTAVAILABLE)?;
                *index = pos as i32;
                Ok(())
            }
            _ => Err(AT_ERR_NOTIMPLEMENTED),
        })
    }

    fn get_enum_index(&self, handle: AtH, feature: &str, value: &mut c_int) -> c_int {
        status(
            self.read("AT_GetEnumIndex", handle, feature, |v| match v {
                MockValue::Enum { index, .. } => Ok(*index),
                _ => Err(AT_ERR_NOTIMPLEMENTED),
            })
            .map(|v| *value = v),
        )
    }

    fn get_enum_count(&self, handle: AtH, feature: &str, count: &mut c_int) -> c_int {
        status(
            self.read("AT_GetEnumCount", handle, feature, |v| match v {
                MockValue::Enum { options, .. } => Ok(options.len() as c_int),
                _ => Err(AT_ERR_NOTIMPLEMENTED),
            })
            .map(|v| *count = v),
        )
    }

    fn is_enum_index_available(
        &self,
        handle: AtH,
        feature: &str,
        index: c_int,
        available: &mut AtBool,
    ) -> c_int {
        status(
            self.read("AT_IsEnumIndexAvailable", handle, feature, |v| {
                enum_option(v, index).map(|_| AT_TRUE)
            })
            .map(|v| *available = v),
        )
    }

    fn is_enum_index_implemented(
        &self,
        handle: AtH,
        feature: &str,
        index: c_int,
        implemented: &mut AtBool,
    ) -> c_int {
        status(
            self.read("AT_IsEnumIndexImplemented", handle, feature, |v| {
                enum_option(v, index).map(|_| AT_TRUE)
            })
            .map(|v| *implemented = v),
        )
    }

    fn get_enum_string_by_index(
        &self,
        handle: AtH,
        feature: &str,
        index: c_int,
        buf: &mut [AtWc],
    ) -> c_int {
        status(self.read("AT_GetEnumStringByIndex", handle, feature, |v| {
            copy_to_buf(enum_option(v, index)?, buf);
            Ok(())
        }))
    }

    fn command(&self, handle: AtH, feature: &str) -> c_int {
        let result = {
            let mut state = self.state.lock();
            state.begin("AT_Command", Some(feature)).and_then(|()| {
                let device = state.device(handle)?;
                if device.value(feature)? != &MockValue::Command {
                    return Err(AT_ERR_NOTIMPLEMENTED);
                }
                let key = normalize(feature);
                let acquiring = if key == normalize(Feature::AcquisitionStart.native_key()) {
                    Some(true)
                } else if key == normalize(Feature::AcquisitionStop.native_key()) {
                    Some(false)
                } else {
                    None
                };
                if let Some(acquiring) = acquiring {
                    let key = normalize(Feature::CameraAcquiring.native_key());
                    device.features.insert(key, MockValue::Bool(acquiring));
                }
                Ok(())
            })
        };
        status(result)
    }

    fn set_string(&self, handle: AtH, feature: &str, new: &str) -> c_int {
        self.write("AT_SetString", handle, feature, |v| match v {
            MockValue::String(value) => {
                reject_nul(new)?;
                *value = new.to_string();
                Ok(())
            }
            _ => Err(AT_ERR_NOTIMPLEMENTED),
        })
    }

    fn get_string(&self, handle: AtH, feature: &str, buf: &mut [AtWc]) -> c_int {
        status(self.read("AT_GetString", handle, feature, |v| match v {
            MockValue::String(value) => {
                copy_to_buf(value, buf);
                Ok(())
            }
            _ => Err(AT_ERR_NOTIMPLEMENTED),
        }))
    }

    fn get_string_max_length(&self, handle: AtH, feature: &str, max_length: &mut c_int) -> c_int {
        status(
            self.read("AT_GetStringMaxLength", handle, feature, |v| match v {
                MockValue::String(value) => Ok((value.chars().count() as c_int + 1).max(64)),
                _ => Err(AT_ERR_NOTIMPLEMENTED),
            })
            .map(|v| *max_length = v),
        )
    }

    unsafe fn queue_buffer(&self, handle: AtH, ptr: *mut u8, size: c_int) -> c_int {
        let mut state = self.state.lock();
        let result = state.begin("AT_QueueBuffer", None).and_then(|()| {
            state.device(handle)?;
            if size <= 0 || ptr.is_null() {
                return Err(AT_ERR_INVALIDSIZE);
            }
            state
                .queues
                .entry(handle)
                .or_default()
                .push_back((ptr as usize, size));
            Ok(())
        });
        status(result)
    }

    fn wait_buffer(
        &self,
        handle: AtH,
        ptr: &mut *mut u8,
        size: &mut c_int,
        _timeout: u32,
    ) -> c_int {
        let mut state = self.state.lock();
        let result = state.begin("AT_WaitBuffer", None).and_then(|()| {
            state.device(handle)?;
            // Filled buffers are returned in queue order and the mock never
            // blocks: an empty queue times out at once.
            let (addr, len) = state
                .queues
                .get_mut(&handle)
                .and_then(VecDeque::pop_front)
                .ok_or(AT_ERR_TIMEDOUT)?;
            *ptr = addr as *mut u8;
            *size = if state.zero_size_waits > 0 {
                state.zero_size_waits -= 1;
                0
            } else {
                len
            };
            Ok(())
        });
        status(result)
    }

    fn flush(&self, handle: AtH) -> c_int {
        let mut state = self.state.lock();
        let result = state.begin("AT_Flush", None).and_then(|()| {
            state.device(handle)?;
            state.queues.remove(&handle);
            Ok(())
        });
        status(result)
    }
}

fn enum_option(value: &MockValue, index: c_int) -> Result<&str, c_int> {
    match value {
        MockValue::Enum { options, .. } => usize::try_from(index)
            .ok()
            .and_then(|i| options.get(i))
            .map(String::as_str)
            .ok_or(AT_ERR_OUTOFRANGE),
        _ => Err(AT_ERR_NOTIMPLEMENTED),
    }
}
