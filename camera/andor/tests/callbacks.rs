use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use andor::{
    CALLBACK_FAILED, CALLBACK_PROTOCOL_ERROR, Camera, Feature, mock::MockSdk, sdk::*,
};
use test_log::test;

fn counter() -> (Arc<AtomicUsize>, impl Fn(Feature) -> bool + Send + Sync + 'static) {
    let count = Arc::new(AtomicUsize::new(0));
    let count2 = count.clone();
    let callback = move |_feature: Feature| {
        count2.fetch_add(1, Ordering::SeqCst);
        true
    };
    (count, callback)
}

const EXPOSURE: &str = "Exposure Time";

#[test]
fn precall_is_absorbed() -> anyhow::Result<()> {
    let sdk = MockSdk::with_cameras(1);
    let cam = Camera::open(&sdk, 0)?;
    let (count, callback) = counter();
    let token = cam.register_feature_callback(Feature::ExposureTime, callback)?;
    assert!(token.is_precalled());
    assert_eq!(token.feature(), Feature::ExposureTime);
    assert_eq!(count.load(Ordering::SeqCst), 0);

    assert_eq!(sdk.fire(cam.handle(), EXPOSURE), vec![AT_SUCCESS]);
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert_eq!(sdk.fire(cam.handle(), EXPOSURE), vec![AT_SUCCESS]);
    assert_eq!(count.load(Ordering::SeqCst), 2);
    Ok(())
}

#[test]
fn setter_notifies() -> anyhow::Result<()> {
    let sdk = MockSdk::with_cameras(1);
    let cam = Camera::open(&sdk, 0)?;
    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let seen2 = seen.clone();
    let _token = cam.register_feature_callback(Feature::ExposureTime, move |f| {
        seen2.lock().push(f);
        true
    })?;
    cam.feature_float_set(Feature::ExposureTime, 0.5)?;
    cam.feature_float_set(Feature::FrameRate, 5.0)?;
    assert_eq!(*seen.lock(), vec![Feature::ExposureTime]);
    Ok(())
}

#[test]
fn false_is_reported_to_sdk() -> anyhow::Result<()> {
    let sdk = MockSdk::with_cameras(1);
    let cam = Camera::open(&sdk, 0)?;
    let _token = cam.register_feature_callback(Feature::ExposureTime, |_| false)?;
    assert_eq!(sdk.fire(cam.handle(), EXPOSURE), vec![CALLBACK_FAILED]);
    Ok(())
}

#[test]
fn reported_name_ignores_whitespace() -> anyhow::Result<()> {
    let sdk = MockSdk::with_cameras(1);
    let cam = Camera::open(&sdk, 0)?;
    let (count, callback) = counter();
    let token = cam.register_feature_callback(Feature::ExposureTime, callback)?;
    let h = cam.handle();
    assert_eq!(sdk.fire_as(h, EXPOSURE, h, "ExposureTime"), vec![AT_SUCCESS]);
    assert_eq!(sdk.fire_as(h, EXPOSURE, h, " Exposure  Time "), vec![AT_SUCCESS]);
    assert_eq!(count.load(Ordering::SeqCst), 2);
    assert!(token.dispatch(h, "ExposureTime")?);
    assert_eq!(count.load(Ordering::SeqCst), 3);
    Ok(())
}

#[test]
fn other_feature_is_protocol_error() -> anyhow::Result<()> {
    let sdk = MockSdk::with_cameras(1);
    let cam = Camera::open(&sdk, 0)?;
    let (count, callback) = counter();
    let token = cam.register_feature_callback(Feature::ExposureTime, callback)?;
    let h = cam.handle();
    assert_eq!(
        sdk.fire_as(h, EXPOSURE, h, "Frame Rate"),
        vec![CALLBACK_PROTOCOL_ERROR]
    );
    assert!(token.dispatch(h, "Frame Rate").unwrap_err().is_protocol());
    assert_eq!(count.load(Ordering::SeqCst), 0);
    Ok(())
}

#[test]
fn other_handle_is_protocol_error() -> anyhow::Result<()> {
    let sdk = MockSdk::with_cameras(1);
    let cam = Camera::open(&sdk, 0)?;
    let (count, callback) = counter();
    let token = cam.register_feature_callback(Feature::ExposureTime, callback)?;
    let h = cam.handle();
    assert_eq!(
        sdk.fire_as(h, EXPOSURE, h + 1, EXPOSURE),
        vec![CALLBACK_PROTOCOL_ERROR]
    );
    assert!(token.dispatch(h + 1, EXPOSURE).unwrap_err().is_protocol());
    assert_eq!(count.load(Ordering::SeqCst), 0);
    Ok(())
}

#[test]
fn same_feature_twice() -> anyhow::Result<()> {
    let sdk = MockSdk::with_cameras(1);
    let cam = Camera::open(&sdk, 0)?;
    let (count1, callback1) = counter();
    let (count2, callback2) = counter();
    let token1 = cam.register_feature_callback(Feature::ExposureTime, callback1)?;
    let _token2 = cam.register_feature_callback(Feature::ExposureTime, callback2)?;
    assert_eq!(sdk.registered_callbacks(), 2);
    assert_eq!(sdk.fire(cam.handle(), EXPOSURE).len(), 2);
    assert_eq!(count1.load(Ordering::SeqCst), 1);
    assert_eq!(count2.load(Ordering::SeqCst), 1);

    cam.unregister_feature_callback(&token1)?;
    sdk.fire(cam.handle(), EXPOSURE);
    assert_eq!(count1.load(Ordering::SeqCst), 1);
    assert_eq!(count2.load(Ordering::SeqCst), 2);
    Ok(())
}

#[test]
fn double_unregister() -> anyhow::Result<()> {
    let sdk = MockSdk::with_cameras(1);
    let cam = Camera::open(&sdk, 0)?;
    let (_count, callback) = counter();
    let token = cam.register_feature_callback(Feature::FrameRate, callback)?;
    cam.unregister_feature_callback(&token)?;
    assert_eq!(sdk.registered_callbacks(), 0);
    let err = cam.unregister_feature_callback(&token).unwrap_err();
    assert!(err.is_protocol());
    assert_eq!(sdk.call_count("AT_UnregisterFeatureCallback"), 1);
    Ok(())
}

#[test]
fn unregister_on_other_camera() -> anyhow::Result<()> {
    let sdk = MockSdk::with_cameras(2);
    let cam0 = Camera::open(&sdk, 0)?;
    let cam1 = Camera::open(&sdk, 1)?;
    let (_count, callback) = counter();
    let token = cam0.register_feature_callback(Feature::FrameRate, callback)?;
    let err = cam1.unregister_feature_callback(&token).unwrap_err();
    assert!(err.is_protocol());
    assert_eq!(sdk.call_count("AT_UnregisterFeatureCallback"), 0);
    cam0.unregister_feature_callback(&token)?;
    Ok(())
}

#[test]
fn failed_registration_keeps_nothing() -> anyhow::Result<()> {
    let sdk = MockSdk::with_cameras(1);
    let cam = Camera::open(&sdk, 0)?;
    sdk.fail("AT_RegisterFeatureCallback", AT_ERR_NOTIMPLEMENTED);
    let (count, callback) = counter();
    let err = cam
        .register_feature_callback(Feature::ExposureTime, callback)
        .unwrap_err();
    assert_eq!(err.device_code(), Some(AT_ERR_NOTIMPLEMENTED));
    assert!(
        err.to_string()
            .contains("AT_RegisterFeatureCallback for feature \"Exposure Time\" failed.")
    );
    assert_eq!(sdk.registered_callbacks(), 0);
    // The closure was dropped along with the token.
    assert_eq!(Arc::strong_count(&count), 1);
    Ok(())
}

#[test]
fn failed_unregistration_forgets_token() -> anyhow::Result<()> {
    let sdk = MockSdk::with_cameras(1);
    let cam = Camera::open(&sdk, 0)?;
    let (_count, callback) = counter();
    let token = cam.register_feature_callback(Feature::ExposureTime, callback)?;
    sdk.fail("AT_UnregisterFeatureCallback", AT_ERR_INVALIDHANDLE);
    let err = cam.unregister_feature_callback(&token).unwrap_err();
    assert_eq!(err.device_code(), Some(AT_ERR_INVALIDHANDLE));
    sdk.clear_failures();
    let err = cam.unregister_feature_callback(&token).unwrap_err();
    assert!(err.is_protocol());
    Ok(())
}

#[test]
fn token_references() -> anyhow::Result<()> {
    let sdk = MockSdk::with_cameras(1);
    let cam = Camera::open(&sdk, 0)?;
    let (_count, callback) = counter();
    let token = cam.register_feature_callback(Feature::ExposureTime, callback)?;
    // Ours, the camera's and the SDK registration's.
    assert_eq!(Arc::strong_count(&token), 3);
    cam.unregister_feature_callback(&token)?;
    assert_eq!(Arc::strong_count(&token), 1);

    let (_count, callback) = counter();
    let token = cam.register_feature_callback(Feature::ExposureTime, callback)?;
    let handle = cam.handle();
    cam.close()?;
    assert_eq!(Arc::strong_count(&token), 1);
    // The device is gone, later notifications are ignored.
    assert!(token.dispatch(handle, EXPOSURE)?);
    Ok(())
}

#[test]
fn other_handle_after_close_is_protocol_error() -> anyhow::Result<()> {
    let sdk = MockSdk::with_cameras(1);
    let cam = Camera::open(&sdk, 0)?;
    let (count, callback) = counter();
    let token = cam.register_feature_callback(Feature::ExposureTime, callback)?;
    let handle = cam.handle();
    cam.close()?;

    let err = token.dispatch(handle + 42, EXPOSURE).unwrap_err();
    assert!(err.is_protocol(), "{err}");
    assert!(err.to_string().contains(&format!("handle {}", handle + 42)));
    let err = token.dispatch(handle, "Frame Rate").unwrap_err();
    assert!(err.is_protocol(), "{err}");
    assert_eq!(count.load(Ordering::SeqCst), 0);
    Ok(())
}

#[test]
fn notification_from_sdk_thread() -> anyhow::Result<()> {
    let sdk = MockSdk::with_cameras(1);
    let cam = Camera::open(&sdk, 0)?;
    let (count, callback) = counter();
    let _token = cam.register_feature_callback(Feature::ExposureTime, callback)?;
    let handle = cam.handle();
    std::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                for _ in 0..10 {
                    assert_eq!(sdk.fire(handle, EXPOSURE), vec![AT_SUCCESS]);
                }
            });
        }
    });
    assert_eq!(count.load(Ordering::SeqCst), 40);
    Ok(())
}
