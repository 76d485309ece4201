use crate::sdk::AT_SUCCESS;

// Note: this table follows the status codes in atcore.h and must be updated
// along with the SDK.
static STATUS_NAMES: [&str; 39] = [
    "AT_SUCCESS",
    "AT_ERR_NOTINITIALISED",
    "AT_ERR_NOTIMPLEMENTED",
    "AT_ERR_READONLY",
    "AT_ERR_NOTREADABLE",
    "AT_ERR_NOTWRITABLE",
    "AT_ERR_OUTOFRANGE",
    "AT_ERR_INDEXNOTAVAILABLE",
    "AT_ERR_INDEXNOTIMPLEMENTED",
    "AT_ERR_EXCEEDEDMAXSTRINGLENGTH",
    "AT_ERR_CONNECTION",
    "AT_ERR_NODATA",
    "AT_ERR_INVALIDHANDLE",
    "AT_ERR_TIMEDOUT",
    "AT_ERR_BUFFERFULL",
    "AT_ERR_INVALIDSIZE",
    "AT_ERR_INVALIDALIGNMENT",
    "AT_ERR_COMM",
    "AT_ERR_STRINGNOTAVAILABLE",
    "AT_ERR_STRINGNOTIMPLEMENTED",
    "AT_ERR_NULL_FEATURE",
    "AT_ERR_NULL_HANDLE",
    "AT_ERR_NULL_IMPLEMENTED_VAR",
    "AT_ERR_NULL_READABLE_VAR",
    "AT_ERR_NULL_READONLY_VAR",
    "AT_ERR_NULL_WRITABLE_VAR",
    "AT_ERR_NULL_MINVALUE",
    "AT_ERR_NULL_MAXVALUE",
    "AT_ERR_NULL_VALUE",
    "AT_ERR_NULL_STRING",
    "AT_ERR_NULL_COUNT_VAR",
    "AT_ERR_NULL_ISAVAILABLE_VAR",
    "AT_ERR_NULL_MAXSTRINGLENGTH",
    "AT_ERR_NULL_EVCALLBACK",
    "AT_ERR_NULL_QUEUE_PTR",
    "AT_ERR_NULL_WAIT_PTR",
    "AT_ERR_NULL_PTRSIZE",
    "AT_ERR_NOMEMORY",
    "AT_ERR_DEVICEINUSE",
];

pub const AT_ERR_HARDWARE_OVERFLOW: i32 = 100;

/// Symbolic name of an SDK status code.
///
/// Codes without a known name map to `"UNKNOWN ERROR CODE"`.
pub fn status_name(code: i32) -> &'static str {
    match usize::try_from(code).ok().and_then(|i| STATUS_NAMES.get(i)) {
        Some(name) => name,
        None if code == AT_ERR_HARDWARE_OVERFLOW => "AT_ERR_HARDWARE_OVERFLOW",
        None => "UNKNOWN ERROR CODE",
    }
}

/// A call into the SDK returned a status other than `AT_SUCCESS`.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{description} (Andor SDK3 error {code}: {name})")]
pub struct DeviceError {
    pub code: i32,
    pub name: &'static str,
    pub description: String,
}

impl DeviceError {
    pub fn new<S: Into<String>>(description: S, code: i32) -> Self {
        Self {
            code,
            name: status_name(code),
            description: description.into(),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{source}")]
    Device {
        #[from]
        source: DeviceError,
    },
    /// An internal consistency check failed. No SDK status code is
    /// available for these.
    #[error("protocol error: {msg}")]
    Protocol { msg: String },
    #[error("Loading library at {path}")]
    LibLoading {
        source: libloading::Error,
        path: std::path::PathBuf,
    },
    #[error("Library at {path} has no symbol {symbol}")]
    MissingSymbol {
        symbol: &'static str,
        source: libloading::Error,
        path: std::path::PathBuf,
    },
    #[error("string {value:?} contains an interior nul")]
    InteriorNul { value: String },
    #[error("buffer of {size} bytes is too large for the SDK")]
    InvalidBufferSize { size: usize },
}

impl Error {
    pub(crate) fn protocol<S: Into<String>>(msg: S) -> Self {
        Error::Protocol { msg: msg.into() }
    }

    /// The SDK status code, if this error came from a failed SDK call.
    pub fn device_code(&self) -> Option<i32> {
        match self {
            Error::Device { source } => Some(source.code),
            _ => None,
        }
    }

    pub fn is_protocol(&self) -> bool {
        matches!(self, Error::Protocol { .. })
    }
}

fn _test_error_is_send() {
    // Compile-time test to ensure Error implements Send trait.
    fn implements<T: Send + Sync>() {}
    implements::<Error>();
}

pub type Result<T> = std::result::Result<T, Error>;

/// Convert an SDK status into a result, describing the attempted operation
/// only on failure.
pub(crate) fn at_err<F>(errcode: i32, describe: F) -> std::result::Result<(), DeviceError>
where
    F: FnOnce() -> String,
{
    if errcode == AT_SUCCESS {
        Ok(())
    } else {
        Err(DeviceError::new(describe(), errcode))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn status_names() {
        assert_eq!(status_name(0), "AT_SUCCESS");
        assert_eq!(status_name(12), "AT_ERR_INVALIDHANDLE");
        assert_eq!(status_name(13), "AT_ERR_TIMEDOUT");
        assert_eq!(status_name(14), "AT_ERR_BUFFERFULL");
        assert_eq!(status_name(38), "AT_ERR_DEVICEINUSE");
        assert_eq!(status_name(100), "AT_ERR_HARDWARE_OVERFLOW");
    }

    #[test]
    fn unknown_codes_do_not_fail() {
        for code in [39, 99, 101, 999, -1, i32::MIN, i32::MAX] {
            assert_eq!(status_name(code), "UNKNOWN ERROR CODE");
        }
    }

    #[test]
    fn device_error_display() {
        let e = DeviceError::new("AT_Flush failed.", 13);
        assert_eq!(e.name, "AT_ERR_TIMEDOUT");
        assert_eq!(
            e.to_string(),
            "AT_Flush failed. (Andor SDK3 error 13: AT_ERR_TIMEDOUT)"
        );
        let e: Error = e.into();
        assert_eq!(e.device_code(), Some(13));
        assert!(!e.is_protocol());
    }

    #[test]
    fn at_err_only_describes_failures() {
        assert!(at_err(0, || unreachable!()).is_ok());
        let e = at_err(2, || "AT_Command failed.".into()).unwrap_err();
        assert_eq!(e.code, 2);
        assert_eq!(e.name, "AT_ERR_NOTIMPLEMENTED");
    }
}
