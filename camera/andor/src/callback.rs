//! Feature change notification.
//!
//! The SDK invokes [feature_trampoline] on its own thread with the context
//! pointer given at registration. The context is a strong reference to a
//! [CallbackToken] owned by the SDK registration and released once the SDK
//! has let go of it (after unregistration or after the device is closed).

use std::{
    os::raw::{c_int, c_void},
    panic::AssertUnwindSafe,
    sync::{
        Arc, Weak,
        atomic::{AtomicBool, Ordering},
    },
};

use andor_types::{Feature, keys_match};
use parking_lot::Mutex;

use crate::{
    Camera,
    error::{Error, Result},
    sdk::{AT_SUCCESS, AtH, AtWc},
    wide::from_wide_ptr,
};

/// Status returned to the SDK when a callback returns `false`.
pub const CALLBACK_FAILED: c_int = 0x0A7D_0C0F;

/// Status returned to the SDK when a notification does not match the
/// registration it was delivered to.
pub const CALLBACK_PROTOCOL_ERROR: c_int = 0x0A7D_0C0E;

type BoxedCallback = Box<dyn Fn(Feature) -> bool + Send + Sync>;

/// State of an open device shared with its callback tokens.
pub(crate) struct SessionShared {
    pub(crate) handle: AtH,
    /// Live registrations. Each entry holds one reference on behalf of the
    /// SDK.
    callbacks: Mutex<Vec<Arc<CallbackToken>>>,
}

impl SessionShared {
    pub(crate) fn new(handle: AtH) -> Self {
        Self {
            handle,
            callbacks: Mutex::new(Vec::new()),
        }
    }

    fn contains(&self, token: &CallbackToken) -> bool {
        self.callbacks
            .lock()
            .iter()
            .any(|t| std::ptr::eq(Arc::as_ptr(t), token))
    }

    fn remove(&self, token: &CallbackToken) -> Option<Arc<CallbackToken>> {
        let mut callbacks = self.callbacks.lock();
        let pos = callbacks
            .iter()
            .position(|t| std::ptr::eq(Arc::as_ptr(t), token))?;
        Some(callbacks.remove(pos))
    }

    /// Drop all registrations once the device is closed and the SDK will not
    /// call back any more.
    pub(crate) fn release_callbacks(&self) {
        let drained: Vec<_> = self.callbacks.lock().drain(..).collect();
        for token in drained {
            tracing::debug!("releasing callback for \"{}\"", token.feature);
            // Safety: every live token carries one reference handed to the
            // SDK at registration.
            unsafe { token.release_sdk_reference() };
        }
    }
}

/// One feature change subscription, returned by
/// [Camera::register_feature_callback].
///
/// Registering the same feature twice gives two independent tokens.
pub struct CallbackToken {
    session: Weak<SessionShared>,
    handle: AtH,
    feature: Feature,
    callback: BoxedCallback,
    precalled: AtomicBool,
}

impl std::fmt::Debug for CallbackToken {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::result::Result<(), std::fmt::Error> {
        fmt.debug_struct("CallbackToken")
            .field("feature", &self.feature)
            .field("precalled", &self.is_precalled())
            .finish_non_exhaustive()
    }
}

impl CallbackToken {
    pub fn feature(&self) -> Feature {
        self.feature
    }

    /// Whether the SDK's initial call made during registration has been
    /// absorbed.
    pub fn is_precalled(&self) -> bool {
        self.precalled.load(Ordering::SeqCst)
    }

    fn context(&self) -> *mut c_void {
        self as *const CallbackToken as *mut c_void
    }

    /// # Safety
    ///
    /// Must be called once for each reference made by [Arc::into_raw] at
    /// registration, after the SDK stopped using it.
    unsafe fn release_sdk_reference(&self) {
        unsafe { drop(Arc::from_raw(self as *const CallbackToken)) };
    }

    /// Handle a notification from the SDK reporting a change of `reported`
    /// on device `handle`.
    ///
    /// Returns the value of the user callback, or `true` when the
    /// notification is absorbed. A notification for another feature or
    /// another device is a protocol error.
    pub fn dispatch(&self, handle: AtH, reported: &str) -> Result<bool> {
        let key = self.feature.native_key();
        if !keys_match(reported, key) {
            return Err(Error::protocol(format!(
                "Callback registered for feature \"{key}\" was called for feature \"{reported}\"."
            )));
        }
        if handle != self.handle {
            return Err(Error::protocol(format!(
                "Callback for feature \"{key}\" registered on handle {} was called with handle {handle}.",
                self.handle
            )));
        }
        let Some(session) = self.session.upgrade() else {
            tracing::debug!("ignoring \"{key}\" callback for a closed device");
            return Ok(true);
        };
        if !session.contains(self) {
            tracing::debug!("ignoring \"{key}\" callback after unregistration");
            return Ok(true);
        }
        if !self.precalled.swap(true, Ordering::SeqCst) {
            tracing::debug!("absorbed initial \"{key}\" callback");
            return Ok(true);
        }
        Ok((self.callback)(self.feature))
    }
}

/// The `FeatureCallback` handed to the SDK for every registration.
pub(crate) unsafe extern "system" fn feature_trampoline(
    handle: AtH,
    feature: *const AtWc,
    context: *mut c_void,
) -> c_int {
    let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
        // Safety: the SDK holds a reference to the token for as long as it
        // may call with this context.
        let token = unsafe { &*(context as *const CallbackToken) };
        let reported = unsafe { from_wide_ptr(feature) };
        token.dispatch(handle, &reported)
    }));
    match result {
        Ok(Ok(true)) => AT_SUCCESS,
        Ok(Ok(false)) => CALLBACK_FAILED,
        Ok(Err(e)) => {
            tracing::error!("{e}");
            CALLBACK_PROTOCOL_ERROR
        }
        Err(_) => {
            tracing::error!("panic in feature callback");
            CALLBACK_FAILED
        }
    }
}

impl<'lib> Camera<'lib> {
    /// Call `callback` whenever `feature` changes.
    ///
    /// The callback runs on a thread owned by the SDK. Its return value
    /// reports success to the SDK. The SDK calls back once during
    /// registration; that call is absorbed and does not reach `callback`.
    pub fn register_feature_callback<F>(
        &self,
        feature: Feature,
        callback: F,
    ) -> Result<Arc<CallbackToken>>
    where
        F: Fn(Feature) -> bool + Send + Sync + 'static,
    {
        let token = Arc::new(CallbackToken {
            session: Arc::downgrade(&self.shared),
            handle: self.handle(),
            feature,
            callback: Box::new(callback),
            precalled: AtomicBool::new(false),
        });
        // The reference owned by the SDK registration.
        let context = Arc::into_raw(token.clone()) as *mut c_void;
        self.shared.callbacks.lock().push(token.clone());

        let key = feature.native_key();
        let result = at_call!(
            unsafe {
                self.sdk
                    .register_feature_callback(self.handle(), key, feature_trampoline, context)
            },
            "AT_RegisterFeatureCallback for feature \"{key}\" failed."
        );
        if let Err(e) = result {
            if let Some(token) = self.shared.remove(&token) {
                // Safety: the SDK did not keep the registration.
                unsafe { token.release_sdk_reference() };
            }
            return Err(e.into());
        }
        Ok(token)
    }

    /// Remove a registration made by
    /// [Camera::register_feature_callback] on this camera.
    ///
    /// The token is forgotten even if the SDK then fails to unregister it.
    pub fn unregister_feature_callback(&self, token: &Arc<CallbackToken>) -> Result<()> {
        let key = token.feature.native_key();
        if !std::ptr::eq(token.session.as_ptr(), Arc::as_ptr(&self.shared)) {
            return Err(Error::protocol(format!(
                "Callback for feature \"{key}\" belongs to a different device."
            )));
        }
        let Some(token) = self.shared.remove(token) else {
            return Err(Error::protocol(format!(
                "Callback for feature \"{key}\" is not registered."
            )));
        };

        let result = at_call!(
            unsafe {
                self.sdk.unregister_feature_callback(
                    self.handle(),
                    key,
                    feature_trampoline,
                    token.context(),
                )
            },
            "AT_UnregisterFeatureCallback for feature \"{key}\" failed."
        );
        match result {
            Ok(()) => {
                // Safety: the SDK no longer holds the registration.
                unsafe { token.release_sdk_reference() };
                Ok(())
            }
            Err(e) => {
                // The SDK may still call with this context, so its reference
                // is kept.
                tracing::warn!("{e}");
                Err(e.into())
            }
        }
    }
}
