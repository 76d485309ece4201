use std::os::raw::c_int;

use crate::{
    Camera,
    error::{Error, Result},
    sdk::AT_INFINITE,
};

/// How long [Camera::wait_buffer] blocks for a filled buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitTimeout {
    Infinite,
    Millis(u32),
}

impl WaitTimeout {
    /// The timeout in the form taken by `AT_WaitBuffer`.
    pub fn as_millis(self) -> u32 {
        match self {
            WaitTimeout::Infinite => AT_INFINITE,
            WaitTimeout::Millis(ms) => ms.min(AT_INFINITE - 1),
        }
    }
}

impl From<std::time::Duration> for WaitTimeout {
    fn from(dur: std::time::Duration) -> Self {
        let ms = u32::try_from(dur.as_millis()).unwrap_or(u32::MAX);
        if ms >= AT_INFINITE {
            WaitTimeout::Infinite
        } else {
            WaitTimeout::Millis(ms)
        }
    }
}

impl std::fmt::Display for WaitTimeout {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::result::Result<(), std::fmt::Error> {
        match self {
            WaitTimeout::Infinite => write!(fmt, "infinite"),
            WaitTimeout::Millis(ms) => write!(fmt, "{ms} ms"),
        }
    }
}

/// A lock serializing the host's threads, such as an embedding
/// interpreter's global lock.
///
/// It is released while the calling thread is blocked in the SDK so that
/// other host threads can run.
pub trait HostLock: Send + Sync {
    fn release(&self);
    fn reacquire(&self);
}

/// Holds a [HostLock] released until dropped.
struct ReleasedHostLock<'a> {
    lock: Option<&'a dyn HostLock>,
}

impl<'a> ReleasedHostLock<'a> {
    fn new(lock: Option<&'a dyn HostLock>) -> Self {
        if let Some(lock) = lock {
            lock.release();
        }
        Self { lock }
    }
}

impl Drop for ReleasedHostLock<'_> {
    fn drop(&mut self) {
        if let Some(lock) = self.lock {
            lock.reacquire();
        }
    }
}

impl<'lib> Camera<'lib> {
    /// Add a buffer to the acquisition queue.
    ///
    /// # Safety
    ///
    /// `ptr` must point to `len` writable bytes which stay valid, and are
    /// not otherwise accessed, until the buffer is returned by
    /// [Camera::wait_buffer], [Camera::flush] is called or the camera is
    /// closed.
    pub unsafe fn queue_buffer(&self, ptr: *mut u8, len: usize) -> Result<()> {
        let size =
            c_int::try_from(len).map_err(|_| Error::InvalidBufferSize { size: len })?;
        at_call!(
            unsafe { self.sdk.queue_buffer(self.handle(), ptr, size) },
            "AT_QueueBuffer with buffer size {len} failed."
        )?;
        Ok(())
    }

    /// Block until a queued buffer has been filled and return its address.
    ///
    /// The configured [HostLock], if any, is released while waiting.
    pub fn wait_buffer(&self, timeout: WaitTimeout) -> Result<*mut u8> {
        let mut ptr: *mut u8 = std::ptr::null_mut();
        let mut size: c_int = 0;
        {
            let _released = ReleasedHostLock::new(self.host_lock.as_deref());
            at_call!(
                self.sdk
                    .wait_buffer(self.handle(), &mut ptr, &mut size, timeout.as_millis()),
                "AT_WaitBuffer with timeout {timeout} failed."
            )?;
        }
        if size <= 0 {
            return Err(Error::protocol(format!(
                "AT_WaitBuffer succeeded but returned buffer size {size}."
            )));
        }
        Ok(ptr)
    }

    /// Discard all queued buffers.
    pub fn flush(&self) -> Result<()> {
        at_call!(self.sdk.flush(self.handle()), "AT_Flush failed.")?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn timeouts() {
        assert_eq!(WaitTimeout::Infinite.as_millis(), AT_INFINITE);
        assert_eq!(WaitTimeout::Millis(500).as_millis(), 500);
        assert_eq!(WaitTimeout::Millis(u32::MAX).as_millis(), AT_INFINITE - 1);
        assert_eq!(
            WaitTimeout::from(std::time::Duration::from_secs(2)),
            WaitTimeout::Millis(2000)
        );
        assert_eq!(
            WaitTimeout::from(std::time::Duration::from_secs(u64::MAX)),
            WaitTimeout::Infinite
        );
        assert_eq!(WaitTimeout::Millis(20).to_string(), "20 ms");
    }
}
