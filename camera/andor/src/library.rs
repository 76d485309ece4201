use std::os::raw::{c_int, c_void};

use crate::{
    error::{DeviceError, Error, Result, status_name},
    sdk::{AT_SUCCESS, AtBool, AtH, AtWc, FeatureCallback, Sdk},
    wide::to_wide,
};

type FnOpen = unsafe extern "system" fn(c_int, *mut AtH) -> c_int;
type FnHandle = unsafe extern "system" fn(AtH) -> c_int;
type FnVoid = unsafe extern "system" fn() -> c_int;
type FnCallback =
    unsafe extern "system" fn(AtH, *const AtWc, FeatureCallback, *mut c_void) -> c_int;
type FnBoolQuery = unsafe extern "system" fn(AtH, *const AtWc, *mut AtBool) -> c_int;
type FnSetInt = unsafe extern "system" fn(AtH, *const AtWc, i64) -> c_int;
type FnGetInt = unsafe extern "system" fn(AtH, *const AtWc, *mut i64) -> c_int;
type FnSetFloat = unsafe extern "system" fn(AtH, *const AtWc, f64) -> c_int;
type FnGetFloat = unsafe extern "system" fn(AtH, *const AtWc, *mut f64) -> c_int;
type FnSetCInt = unsafe extern "system" fn(AtH, *const AtWc, c_int) -> c_int;
type FnGetCInt = unsafe extern "system" fn(AtH, *const AtWc, *mut c_int) -> c_int;
type FnIndexQuery = unsafe extern "system" fn(AtH, *const AtWc, c_int, *mut AtBool) -> c_int;
type FnIndexString = unsafe extern "system" fn(AtH, *const AtWc, c_int, *mut AtWc, c_int) -> c_int;
type FnSetString = unsafe extern "system" fn(AtH, *const AtWc, *const AtWc) -> c_int;
type FnGetString = unsafe extern "system" fn(AtH, *const AtWc, *mut AtWc, c_int) -> c_int;
type FnFeature = unsafe extern "system" fn(AtH, *const AtWc) -> c_int;
type FnQueueBuffer = unsafe extern "system" fn(AtH, *mut u8, c_int) -> c_int;
type FnWaitBuffer = unsafe extern "system" fn(AtH, *mut *mut u8, *mut c_int, u32) -> c_int;

/// Function pointers resolved from `atcore`.
///
/// These are valid for as long as the library they were loaded from.
struct AtCore {
    initialise_library: FnVoid,
    finalise_library: FnVoid,
    open: FnOpen,
    close: FnHandle,
    register_feature_callback: FnCallback,
    unregister_feature_callback: FnCallback,
    is_implemented: FnBoolQuery,
    is_readable: FnBoolQuery,
    is_writable: FnBoolQuery,
    is_read_only: FnBoolQuery,
    set_int: FnSetInt,
    get_int: FnGetInt,
    get_int_max: FnGetInt,
    get_int_min: FnGetInt,
    set_float: FnSetFloat,
    get_float: FnGetFloat,
    get_float_max: FnGetFloat,
    get_float_min: FnGetFloat,
    set_bool: FnSetCInt,
    get_bool: FnGetCInt,
    set_enum_index: FnSetCInt,
    set_enum_string: FnSetString,
    get_enum_index: FnGetCInt,
    get_enum_count: FnGetCInt,
    is_enum_index_available: FnIndexQuery,
    is_enum_index_implemented: FnIndexQuery,
    get_enum_string_by_index: FnIndexString,
    command: FnFeature,
    set_string: FnSetString,
    get_string: FnGetString,
    get_string_max_length: FnGetCInt,
    queue_buffer: FnQueueBuffer,
    wait_buffer: FnWaitBuffer,
    flush: FnHandle,
}

fn load_sym<T: Copy>(
    lib: &libloading::Library,
    path: &std::path::Path,
    name: &'static str,
) -> Result<T> {
    let symbol_name = format!("{name}\0");
    let sym = unsafe { lib.get::<T>(symbol_name.as_bytes()) }.map_err(|source| {
        Error::MissingSymbol {
            symbol: name,
            source,
            path: path.to_path_buf(),
        }
    })?;
    Ok(*sym)
}

impl AtCore {
    fn load(lib: &libloading::Library, path: &std::path::Path) -> Result<Self> {
        Ok(Self {
            initialise_library: load_sym(lib, path, "AT_InitialiseLibrary")?,
            finalise_library: load_sym(lib, path, "AT_FinaliseLibrary")?,
            open: load_sym(lib, path, "AT_Open")?,
            close: load_sym(lib, path, "AT_Close")?,
            register_feature_callback: load_sym(lib, path, "AT_RegisterFeatureCallback")?,
            unregister_feature_callback: load_sym(lib, path, "AT_UnregisterFeatureCallback")?,
            is_implemented: load_sym(lib, path, "AT_IsImplemented")?,
            is_readable: load_sym(lib, path, "AT_IsReadable")?,
            is_writable: load_sym(lib, path, "AT_IsWritable")?,
            is_read_only: load_sym(lib, path, "AT_IsReadOnly")?,
            set_int: load_sym(lib, path, "AT_SetInt")?,
            get_int: load_sym(lib, path, "AT_GetInt")?,
            get_int_max: load_sym(lib, path, "AT_GetIntMax")?,
            get_int_min: load_sym(lib, path, "AT_GetIntMin")?,
            set_float: load_sym(lib, path, "AT_SetFloat")?,
            get_float: load_sym(lib, path, "AT_GetFloat")?,
            get_float_max: load_sym(lib, path, "AT_GetFloatMax")?,
            get_float_min: load_sym(lib, path, "AT_GetFloatMin")?,
            set_bool: load_sym(lib, path, "AT_SetBool")?,
            get_bool: load_sym(lib, path, "AT_GetBool")?,
            set_enum_index: load_sym(lib, path, "AT_SetEnumIndex")?,
            set_enum_string: load_sym(lib, path, "AT_SetEnumString")?,
            get_enum_index: load_sym(lib, path, "AT_GetEnumIndex")?,
            get_enum_count: load_sym(lib, path, "AT_GetEnumCount")?,
            is_enum_index_available: load_sym(lib, path, "AT_IsEnumIndexAvailable")?,
            is_enum_index_implemented: load_sym(lib, path, "AT_IsEnumIndexImplemented")?,
            get_enum_string_by_index: load_sym(lib, path, "AT_GetEnumStringByIndex")?,
            command: load_sym(lib, path, "AT_Command")?,
            set_string: load_sym(lib, path, "AT_SetString")?,
            get_string: load_sym(lib, path, "AT_GetString")?,
            get_string_max_length: load_sym(lib, path, "AT_GetStringMaxLength")?,
            queue_buffer: load_sym(lib, path, "AT_QueueBuffer")?,
            wait_buffer: load_sym(lib, path, "AT_WaitBuffer")?,
            flush: load_sym(lib, path, "AT_Flush")?,
        })
    }
}

/// The loaded and initialised `atcore` library.
///
/// `AT_InitialiseLibrary` is called on construction and
/// `AT_FinaliseLibrary` when this is dropped. All cameras opened through it
/// must be dropped first, which the `'lib` lifetime of [crate::Camera]
/// enforces.
pub struct AndorLibrary {
    fns: AtCore,
    initialised: bool,
    // Keep the library loaded while `fns` is in use.
    _lib: libloading::Library,
}

impl AndorLibrary {
    /// Load the library from `$ANDOR_SDK3_ROOT` or the platform default
    /// location.
    pub fn new() -> Result<Self> {
        let lib_name = libloading::library_filename("atcore");
        let path = match std::env::var_os("ANDOR_SDK3_ROOT") {
            Some(root) => std::path::PathBuf::from(root).join(lib_name),
            None => {
                #[cfg(target_os = "windows")]
                let path = std::path::PathBuf::from(r#"C:\Program Files\Andor SDK3"#).join(lib_name);

                #[cfg(not(target_os = "windows"))]
                let path = std::path::PathBuf::from("/usr/local/lib").join(lib_name);

                path
            }
        };
        Self::from_dynamic_lib_path(path)
    }

    pub fn from_dynamic_lib_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let lib = unsafe { libloading::Library::new(path) }.map_err(|source| {
            Error::LibLoading {
                source,
                path: path.to_path_buf(),
            }
        })?;
        let fns = AtCore::load(&lib, path)?;
        tracing::debug!("loaded Andor SDK3 from {}", path.display());

        let errcode = unsafe { (fns.initialise_library)() };
        if errcode != AT_SUCCESS {
            return Err(DeviceError::new("Failed to initialise Andor SDK3 library.", errcode).into());
        }
        Ok(Self {
            fns,
            initialised: true,
            _lib: lib,
        })
    }
}

impl Drop for AndorLibrary {
    fn drop(&mut self) {
        if self.initialised {
            let errcode = unsafe { (self.fns.finalise_library)() };
            if errcode != AT_SUCCESS {
                tracing::warn!(
                    "AT_FinaliseLibrary failed with error #{errcode} ({}).",
                    status_name(errcode)
                );
            }
            self.initialised = false;
        }
    }
}

/// Convert the feature name, or return the SDK's own status for a feature
/// name it could not accept.
macro_rules! wide_or_return {
    ($s:expr) => {
        match to_wide($s) {
            Ok(w) => w,
            Err(_) => return crate::sdk::AT_ERR_NOTIMPLEMENTED,
        }
    };
}

fn buf_len(buf: &[AtWc]) -> c_int {
    c_int::try_from(buf.len()).unwrap_or(c_int::MAX)
}

impl Sdk for AndorLibrary {
    fn open(&self, device_index: c_int, handle: &mut AtH) -> c_int {
        unsafe { (self.fns.open)(device_index, handle) }
    }

    fn close(&self, handle: AtH) -> c_int {
        unsafe { (self.fns.close)(handle) }
    }

    unsafe fn register_feature_callback(
        &self,
        handle: AtH,
        feature: &str,
        callback: FeatureCallback,
        context: *mut c_void,
    ) -> c_int {
        let f = wide_or_return!(feature);
        unsafe { (self.fns.register_feature_callback)(handle, f.as_ptr(), callback, context) }
    }

    unsafe fn unregister_feature_callback(
        &self,
        handle: AtH,
        feature: &str,
        callback: FeatureCallback,
        context: *mut c_void,
    ) -> c_int {
        let f = wide_or_return!(feature);
        unsafe { (self.fns.unregister_feature_callback)(handle, f.as_ptr(), callback, context) }
    }

    fn is_implemented(&self, handle: AtH, feature: &str, value: &mut AtBool) -> c_int {
        let f = wide_or_return!(feature);
        unsafe { (self.fns.is_implemented)(handle, f.as_ptr(), value) }
    }

    fn is_readable(&self, handle: AtH, feature: &str, value: &mut AtBool) -> c_int {
        let f = wide_or_return!(feature);
        unsafe { (self.fns.is_readable)(handle, f.as_ptr(), value) }
    }

    fn is_writable(&self, handle: AtH, feature: &str, value: &mut AtBool) -> c_int {
        let f = wide_or_return!(feature);
        unsafe { (self.fns.is_writable)(handle, f.as_ptr(), value) }
    }

    fn is_read_only(&self, handle: AtH, feature: &str, value: &mut AtBool) -> c_int {
        let f = wide_or_return!(feature);
        unsafe { (self.fns.is_read_only)(handle, f.as_ptr(), value) }
    }

    fn set_int(&self, handle: AtH, feature: &str, value: i64) -> c_int {
        let f = wide_or_return!(feature);
        unsafe { (self.fns.set_int)(handle, f.as_ptr(), value) }
    }

    fn get_int(&self, handle: AtH, feature: &str, value: &mut i64) -> c_int {
        let f = wide_or_return!(feature);
        unsafe { (self.fns.get_int)(handle, f.as_ptr(), value) }
    }

    fn get_int_max(&self, handle: AtH, feature: &str, value: &mut i64) -> c_int {
        let f = wide_or_return!(feature);
        unsafe { (self.fns.get_int_max)(handle, f.as_ptr(), value) }
    }

    fn get_int_min(&self, handle: AtH, feature: &str, value: &mut i64) -> c_int {
        let f = wide_or_return!(feature);
        unsafe { (self.fns.get_int_min)(handle, f.as_ptr(), value) }
    }

    fn set_float(&self, handle: AtH, feature: &str, value: f64) -> c_int {
        let f = wide_or_return!(feature);
        unsafe { (self.fns.set_float)(handle, f.as_ptr(), value) }
    }

    fn get_float(&self, handle: AtH, feature: &str, value: &mut f64) -> c_int {
        let f = wide_or_return!(feature);
        unsafe { (self.fns.get_float)(handle, f.as_ptr(), value) }
    }

    fn get_float_max(&self, handle: AtH, feature: &str, value: &mut f64) -> c_int {
        let f = wide_or_return!(feature);
        unsafe { (self.fns.get_float_max)(handle, f.as_ptr(), value) }
    }

    fn get_float_min(&self, handle: AtH, feature: &str, value: &mut f64) -> c_int {
        let f = wide_or_return!(feature);
        unsafe { (self.fns.get_float_min)(handle, f.as_ptr(), value) }
    }

    fn set_bool(&self, handle: AtH, feature: &str, value: AtBool) -> c_int {
        let f = wide_or_return!(feature);
        unsafe { (self.fns.set_bool)(handle, f.as_ptr(), value) }
    }

    fn get_bool(&self, handle: AtH, feature: &str, value: &mut AtBool) -> c_int {
        let f = wide_or_return!(feature);
        unsafe { (self.fns.get_bool)(handle, f.as_ptr(), value) }
    }

    fn set_enum_index(&self, handle: AtH, feature: &str, value: c_int) -> c_int {
        let f = wide_or_return!(feature);
        unsafe { (self.fns.set_enum_index)(handle, f.as_ptr(), value) }
    }

    fn set_enum_string(&self, handle: AtH, feature: &str, value: &str) -> c_int {
        let f = wide_or_return!(feature);
        let v = wide_or_return!(value);
        unsafe { (self.fns.set_enum_string)(handle, f.as_ptr(), v.as_ptr()) }
    }

    fn get_enum_index(&self, handle: AtH, feature: &str, value: &mut c_int) -> c_int {
        let f = wide_or_return!(feature);
        unsafe { (self.fns.get_enum_index)(handle, f.as_ptr(), value) }
    }

    fn get_enum_count(&self, handle: AtH, feature: &str, count: &mut c_int) -> c_int {
        let f = wide_or_return!(feature);
        unsafe { (self.fns.get_enum_count)(handle, f.as_ptr(), count) }
    }

    fn is_enum_index_available(
        &self,
        handle: AtH,
        feature: &str,
        index: c_int,
        available: &mut AtBool,
    ) -> c_int {
        let f = wide_or_return!(feature);
        unsafe { (self.fns.is_enum_index_available)(handle, f.as_ptr(), index, available) }
    }

    fn is_enum_index_implemented(
        &self,
        handle: AtH,
        feature: &str,
        index: c_int,
        implemented: &mut AtBool,
    ) -> c_int {
        let f = wide_or_return!(feature);
        unsafe { (self.fns.is_enum_index_implemented)(handle, f.as_ptr(), index, implemented) }
    }

    fn get_enum_string_by_index(
        &self,
        handle: AtH,
        feature: &str,
        index: c_int,
        buf: &mut [AtWc],
    ) -> c_int {
        let f = wide_or_return!(feature);
        let len = buf_len(buf);
        unsafe {
            (self.fns.get_enum_string_by_index)(handle, f.as_ptr(), index, buf.as_mut_ptr(), len)
        }
    }

    fn command(&self, handle: AtH, feature: &str) -> c_int {
        let f = wide_or_return!(feature);
        unsafe { (self.fns.command)(handle, f.as_ptr()) }
    }

    fn set_string(&self, handle: AtH, feature: &str, value: &str) -> c_int {
        let f = wide_or_return!(feature);
        let v = wide_or_return!(value);
        unsafe { (self.fns.set_string)(handle, f.as_ptr(), v.as_ptr()) }
    }

    fn get_string(&self, handle: AtH, feature: &str, buf: &mut [AtWc]) -> c_int {
        let f = wide_or_return!(feature);
        let len = buf_len(buf);
        unsafe { (self.fns.get_string)(handle, f.as_ptr(), buf.as_mut_ptr(), len) }
    }

    fn get_string_max_length(&self, handle: AtH, feature: &str, max_length: &mut c_int) -> c_int {
        let f = wide_or_return!(feature);
        unsafe { (self.fns.get_string_max_length)(handle, f.as_ptr(), max_length) }
    }

    unsafe fn queue_buffer(&self, handle: AtH, ptr: *mut u8, size: c_int) -> c_int {
        unsafe { (self.fns.queue_buffer)(handle, ptr, size) }
    }

    fn wait_buffer(
        &self,
        handle: AtH,
        ptr: &mut *mut u8,
        size: &mut c_int,
        timeout: u32,
    ) -> c_int {
        unsafe { (self.fns.wait_buffer)(handle, ptr, size, timeout) }
    }

    fn flush(&self, handle: AtH) -> c_int {
        unsafe { (self.fns.flush)(handle) }
    }
}
