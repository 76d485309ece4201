use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use andor::{Camera, Error, HostLock, WaitTimeout, mock::MockSdk, sdk::*};
use test_log::test;

#[derive(Default)]
struct CountingLock {
    held: AtomicBool,
    releases: AtomicUsize,
    reacquires: AtomicUsize,
}

impl CountingLock {
    fn new() -> Arc<Self> {
        let result = Self::default();
        result.held.store(true, Ordering::SeqCst);
        Arc::new(result)
    }
}

impl HostLock for CountingLock {
    fn release(&self) {
        assert!(self.held.swap(false, Ordering::SeqCst));
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
    fn reacquire(&self) {
        assert!(!self.held.swap(true, Ordering::SeqCst));
        self.reacquires.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn filled_buffers_in_queue_order() -> anyhow::Result<()> {
    let sdk = MockSdk::with_cameras(1);
    let cam = Camera::open(&sdk, 0)?;
    let mut bufs = vec![vec![0u8; 64]; 3];
    let ptrs: Vec<*mut u8> = bufs.iter_mut().map(|b| b.as_mut_ptr()).collect();
    for buf in bufs.iter_mut() {
        unsafe { cam.queue_buffer(buf.as_mut_ptr(), buf.len())? };
    }
    assert_eq!(sdk.queued_buffers(cam.handle()), 3);
    for expected in ptrs {
        assert_eq!(cam.wait_buffer(WaitTimeout::Millis(100))?, expected);
    }
    Ok(())
}

#[test]
fn wait_times_out() -> anyhow::Result<()> {
    let sdk = MockSdk::with_cameras(1);
    let cam = Camera::open(&sdk, 0)?;
    let err = cam.wait_buffer(WaitTimeout::Millis(100)).unwrap_err();
    assert_eq!(err.device_code(), Some(AT_ERR_TIMEDOUT));
    assert!(
        err.to_string()
            .contains("AT_WaitBuffer with timeout 100 ms failed.")
    );
    assert!(err.to_string().contains("AT_ERR_TIMEDOUT"));
    Ok(())
}

#[test]
fn zero_size_is_protocol_error() -> anyhow::Result<()> {
    let sdk = MockSdk::with_cameras(1);
    let cam = Camera::open(&sdk, 0)?;
    let mut buf = vec![0u8; 64];
    unsafe { cam.queue_buffer(buf.as_mut_ptr(), buf.len())? };
    sdk.report_zero_size_waits(1);
    let err = cam.wait_buffer(WaitTimeout::Infinite).unwrap_err();
    assert!(err.is_protocol());
    assert_eq!(err.device_code(), None);
    Ok(())
}

#[test]
fn flush_discards_queue() -> anyhow::Result<()> {
    let sdk = MockSdk::with_cameras(1);
    let cam = Camera::open(&sdk, 0)?;
    let mut bufs = vec![vec![0u8; 64]; 2];
    for buf in bufs.iter_mut() {
        unsafe { cam.queue_buffer(buf.as_mut_ptr(), buf.len())? };
    }
    cam.flush()?;
    assert_eq!(sdk.queued_buffers(cam.handle()), 0);
    let err = cam.wait_buffer(WaitTimeout::Millis(0)).unwrap_err();
    assert_eq!(err.device_code(), Some(AT_ERR_TIMEDOUT));
    Ok(())
}

#[test]
fn flush_failure() -> anyhow::Result<()> {
    let sdk = MockSdk::with_cameras(1);
    let cam = Camera::open(&sdk, 0)?;
    sdk.fail("AT_Flush", AT_ERR_INVALIDHANDLE);
    let err = cam.flush().unwrap_err();
    assert_eq!(err.device_code(), Some(AT_ERR_INVALIDHANDLE));
    assert!(err.to_string().starts_with("AT_Flush failed."));
    Ok(())
}

#[test]
fn invalid_buffer_sizes() -> anyhow::Result<()> {
    let sdk = MockSdk::with_cameras(1);
    let cam = Camera::open(&sdk, 0)?;
    let mut buf = vec![0u8; 8];
    let err = unsafe { cam.queue_buffer(buf.as_mut_ptr(), 0) }.unwrap_err();
    assert_eq!(err.device_code(), Some(AT_ERR_INVALIDSIZE));
    assert!(
        err.to_string()
            .contains("AT_QueueBuffer with buffer size 0 failed.")
    );

    let err = unsafe { cam.queue_buffer(buf.as_mut_ptr(), usize::MAX) }.unwrap_err();
    assert!(matches!(err, Error::InvalidBufferSize { size } if size == usize::MAX));
    assert_eq!(sdk.call_count("AT_QueueBuffer"), 1);
    Ok(())
}

#[test]
fn host_lock_released_while_waiting() -> anyhow::Result<()> {
    let sdk = MockSdk::with_cameras(1);
    let mut cam = Camera::open(&sdk, 0)?;
    let lock = CountingLock::new();
    cam.set_host_lock(lock.clone());

    let mut buf = vec![0u8; 64];
    unsafe { cam.queue_buffer(buf.as_mut_ptr(), buf.len())? };
    cam.wait_buffer(WaitTimeout::Millis(10))?;
    assert_eq!(lock.releases.load(Ordering::SeqCst), 1);
    assert_eq!(lock.reacquires.load(Ordering::SeqCst), 1);

    // Timed out.
    cam.wait_buffer(WaitTimeout::Millis(10)).unwrap_err();
    assert_eq!(lock.releases.load(Ordering::SeqCst), 2);
    assert_eq!(lock.reacquires.load(Ordering::SeqCst), 2);

    // Protocol error.
    unsafe { cam.queue_buffer(buf.as_mut_ptr(), buf.len())? };
    sdk.report_zero_size_waits(1);
    assert!(cam.wait_buffer(WaitTimeout::Infinite).unwrap_err().is_protocol());
    assert_eq!(lock.releases.load(Ordering::SeqCst), 3);
    assert_eq!(lock.reacquires.load(Ordering::SeqCst), 3);
    assert!(lock.held.load(Ordering::SeqCst));

    // Other calls leave the lock alone.
    cam.flush()?;
    assert_eq!(lock.releases.load(Ordering::SeqCst), 3);
    Ok(())
}

#[test]
fn close_discards_queue() -> anyhow::Result<()> {
    let sdk = MockSdk::with_cameras(1);
    let cam = Camera::open(&sdk, 0)?;
    let handle = cam.handle();
    let mut buf = vec![0u8; 64];
    unsafe { cam.queue_buffer(buf.as_mut_ptr(), buf.len())? };
    cam.close()?;
    assert_eq!(sdk.queued_buffers(handle), 0);
    Ok(())
}
