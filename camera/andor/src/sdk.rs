//! The boundary to the Andor SDK3 `atcore` C API.
//!
//! [Sdk] mirrors the C functions one-to-one, keeping their status-code
//! returns and out-parameters, but with feature names as `&str`.
//! [crate::AndorLibrary] implements it over the dynamically loaded library
//! and [crate::mock::MockSdk] implements it in memory.

use std::os::raw::{c_int, c_void};

/// Device handle (`AT_H`).
pub type AtH = c_int;
/// Boolean as used by the SDK (`AT_BOOL`).
pub type AtBool = c_int;
/// Wide character (`AT_WC`).
pub type AtWc = libc::wchar_t;

/// Signature of a feature change callback (`FeatureCallback`).
pub type FeatureCallback =
    unsafe extern "system" fn(handle: AtH, feature: *const AtWc, context: *mut c_void) -> c_int;

pub const AT_SUCCESS: c_int = 0;
pub const AT_TRUE: AtBool = 1;
pub const AT_FALSE: AtBool = 0;
pub const AT_HANDLE_UNINITIALISED: AtH = -1;
pub const AT_HANDLE_SYSTEM: AtH = 1;
/// Timeout value for [Sdk::wait_buffer] meaning "wait forever".
pub const AT_INFINITE: u32 = 0xFFFF_FFFF;

pub const AT_ERR_NOTIMPLEMENTED: c_int = 2;
pub const AT_ERR_READONLY: c_int = 3;
pub const AT_ERR_OUTOFRANGE: c_int = 6;
pub const AT_ERR_INDEXNOTAVAILABLE: c_int = 7;
pub const AT_ERR_EXCEEDEDMAXSTRINGLENGTH: c_int = 9;
pub const AT_ERR_NODATA: c_int = 11;
pub const AT_ERR_INVALIDHANDLE: c_int = 12;
pub const AT_ERR_TIMEDOUT: c_int = 13;
pub const AT_ERR_INVALIDSIZE: c_int = 15;
pub const AT_ERR_STRINGNOTAVAILABLE: c_int = 18;
pub const AT_ERR_DEVICEINUSE: c_int = 38;

/// The `atcore` API.
///
/// Every method returns the raw SDK status; `AT_SUCCESS` means the
/// out-parameters were written.
pub trait Sdk: Send + Sync {
    fn open(&self, device_index: c_int, handle: &mut AtH) -> c_int;
    fn close(&self, handle: AtH) -> c_int;

    /// # Safety
    ///
    /// `context` is handed back to `callback`, possibly from another
    /// thread, until the callback is unregistered. It must stay valid for
    /// that long.
    unsafe fn register_feature_callback(
        &self,
        handle: AtH,
        feature: &str,
        callback: FeatureCallback,
        context: *mut c_void,
    ) -> c_int;
    /// # Safety
    ///
    /// `callback` and `context` must match a previous registration.
    unsafe fn unregister_feature_callback(
        &self,
        handle: AtH,
        feature: &str,
        callback: FeatureCallback,
        context: *mut c_void,
    ) -> c_int;

    fn is_implemented(&self, handle: AtH, feature: &str, value: &mut AtBool) -> c_int;
    fn is_readable(&self, handle: AtH, feature: &str, value: &mut AtBool) -> c_int;
    fn is_writable(&self, handle: AtH, feature: &str, value: &mut AtBool) -> c_int;
    fn is_read_only(&self, handle: AtH, feature: &str, value: &mut AtBool) -> c_int;

    fn set_int(&self, handle: AtH, feature: &str, value: i64) -> c_int;
    fn get_int(&self, handle: AtH, feature: &str, value: &mut i64) -> c_int;
    fn get_int_max(&self, handle: AtH, feature: &str, value: &mut i64) -> c_int;
    fn get_int_min(&self, handle: AtH, feature: &str, value: &mut i64) -> c_int;

    fn set_float(&self, handle: AtH, feature: &str, value: f64) -> c_int;
    fn get_float(&self, handle: AtH, feature: &str, value: &mut f64) -> c_int;
    fn get_float_max(&self, handle: AtH, feature: &str, value: &mut f64) -> c_int;
    fn get_float_min(&self, handle: AtH, feature: &str, value: &mut f64) -> c_int;

    fn set_bool(&self, handle: AtH, feature: &str, value: AtBool) -> c_int;
    fn get_bool(&self, handle: AtH, feature: &str, value: &mut AtBool) -> c_int;

    fn set_enum_index(&self, handle: AtH, feature: &str, value: c_int) -> c_int;
    fn set_enum_string(&self, handle: AtH, feature: &str, value: &str) -> c_int;
    fn get_enum_index(&self, handle: AtH, feature: &str, value: &mut c_int) -> c_int;
    fn get_enum_count(&self, handle: AtH, feature: &str, count: &mut c_int) -> c_int;
    fn is_enum_index_available(
        &self,
        handle: AtH,
        feature: &str,
        index: c_int,
        available: &mut AtBool,
    ) -> c_int;
    fn is_enum_index_implemented(
        &self,
        handle: AtH,
        feature: &str,
        index: c_int,
        implemented: &mut AtBool,
    ) -> c_int;
    /// Writes at most `buf.len()` wide characters into `buf`.
    fn get_enum_string_by_index(
        &self,
        handle: AtH,
        feature: &str,
        index: c_int,
        buf: &mut [AtWc],
    ) -> c_int;

    fn command(&self, handle: AtH, feature: &str) -> c_int;

    fn set_string(&self, handle: AtH, feature: &str, value: &str) -> c_int;
    /// Writes at most `buf.len()` wide characters into `buf`.
    fn get_string(&self, handle: AtH, feature: &str, buf: &mut [AtWc]) -> c_int;
    fn get_string_max_length(&self, handle: AtH, feature: &str, max_length: &mut c_int) -> c_int;

    /// # Safety
    ///
    /// `ptr` must point to `size` writable bytes which stay valid until the
    /// buffer is returned by [Sdk::wait_buffer] or discarded by [Sdk::flush].
    unsafe fn queue_buffer(&self, handle: AtH, ptr: *mut u8, size: c_int) -> c_int;
    fn wait_buffer(&self, handle: AtH, ptr: &mut *mut u8, size: &mut c_int, timeout: u32)
    -> c_int;
    fn flush(&self, handle: AtH) -> c_int;
}
