//! Recording GATT transport for tests.
//!
//! # Why a recording transport?
//!
//! A real BLE stack needs an adapter, a paired central, and an encrypted
//! link before a single notification goes out.  None of that can be observed
//! from test code.  `RecordingGattTransport` replaces it with in-memory
//! bookkeeping:
//!
//! - Every created service, characteristic, and descriptor is recorded.
//! - Every `notify` call is recorded with its timestamp, whether or not
//!   anyone is subscribed (sessions are expected not to call it then).
//! - Tests drive the "remote" side with [`RecordingGattTransport::subscribe`]
//!   and [`RecordingGattTransport::write_control_point`].
//!
//! # Usage in tests
//!
//! ```ignore
//! let transport = Arc::new(RecordingGattTransport::new());
//! let keyboard = KeyboardSession::keyboard(transport.clone());
//! keyboard.initialize().await?;
//! transport.subscribe(keyboard.service().unwrap());
//!
//! keyboard.press_key(KEY_A);
//! assert_eq!(transport.reports_for(keyboard.service().unwrap()).len(), 1);
//! ```
//!
//! # `should_fail` flag
//!
//! Set `should_fail = true` to make `create_service` fail, which exercises
//! the session's fatal setup path.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use async_trait::async_trait;
use blehid_core::DeviceProfile;

use crate::application::gatt::{
    CharacteristicHandle, CharacteristicSpec, DescriptorSpec, GattError, GattObserver,
    GattTransport, ServiceHandle, SubscriberId,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One recorded `notify` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedNotification {
    pub service: ServiceHandle,
    pub report: Vec<u8>,
    pub at: Instant,
}

/// A transport that records every call without touching a radio.
#[derive(Default)]
pub struct RecordingGattTransport {
    /// `(handle, profile)` per `create_service` call.
    pub services: Mutex<Vec<(ServiceHandle, DeviceProfile)>>,
    /// `(service, spec)` per `add_characteristic` call.
    pub characteristics: Mutex<Vec<(ServiceHandle, CharacteristicSpec)>>,
    /// `(characteristic, spec)` per `add_descriptor` call.
    pub descriptors: Mutex<Vec<(CharacteristicHandle, DescriptorSpec)>>,
    /// `(service, started)` per advertising change.
    pub advertising: Mutex<Vec<(ServiceHandle, bool)>>,
    /// Every `notify` call, in order.
    pub notifications: Mutex<Vec<RecordedNotification>>,
    /// When `true`, `create_service` returns [`GattError::Refused`].
    pub should_fail: bool,
    observers: Mutex<HashMap<ServiceHandle, Arc<dyn GattObserver>>>,
    next_handle: AtomicU32,
}

impl RecordingGattTransport {
    /// Creates a transport with empty records and `should_fail = false`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transport whose `create_service` always fails.
    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    fn next_handle(&self) -> u32 {
        self.next_handle.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn observer(&self, service: ServiceHandle) -> Option<Arc<dyn GattObserver>> {
        lock(&self.observers).get(&service).cloned()
    }

    /// Announces `subscribers` as the full subscriber set of `service`.
    pub fn set_subscribers(&self, service: ServiceHandle, subscribers: &[SubscriberId]) {
        if let Some(observer) = self.observer(service) {
            observer.on_subscribers_changed(subscribers);
        }
    }

    /// Subscribes one new central to `service` and returns its id.
    pub fn subscribe(&self, service: ServiceHandle) -> SubscriberId {
        let id = SubscriberId::new();
        self.set_subscribers(service, &[id]);
        id
    }

    /// Simulates a central writing the HID Control Point.
    pub fn write_control_point(&self, service: ServiceHandle, value: &[u8]) {
        if let Some(observer) = self.observer(service) {
            observer.on_control_point_write(value);
        }
    }

    /// All reports notified on `service`, in order.
    pub fn reports_for(&self, service: ServiceHandle) -> Vec<Vec<u8>> {
        lock(&self.notifications)
            .iter()
            .filter(|n| n.service == service)
            .map(|n| n.report.clone())
            .collect()
    }

    pub fn notification_count(&self) -> usize {
        lock(&self.notifications).len()
    }
}

#[async_trait]
impl GattTransport for RecordingGattTransport {
    async fn create_service(&self, profile: DeviceProfile) -> Result<ServiceHandle, GattError> {
        if self.should_fail {
            return Err(GattError::Refused {
                attribute: "HID service",
                reason: "mock failure".into(),
            });
        }
        let handle = ServiceHandle(self.next_handle());
        lock(&self.services).push((handle, profile));
        Ok(handle)
    }

    async fn add_characteristic(
        &self,
        service: ServiceHandle,
        spec: CharacteristicSpec,
    ) -> Result<CharacteristicHandle, GattError> {
        let handle = CharacteristicHandle(self.next_handle());
        lock(&self.characteristics).push((service, spec));
        Ok(handle)
    }

    async fn add_descriptor(
        &self,
        characteristic: CharacteristicHandle,
        spec: DescriptorSpec,
    ) -> Result<(), GattError> {
        lock(&self.descriptors).push((characteristic, spec));
        Ok(())
    }

    fn register_observer(&self, service: ServiceHandle, observer: Arc<dyn GattObserver>) {
        lock(&self.observers).insert(service, observer);
    }

    fn start_advertising(&self, service: ServiceHandle) -> Result<(), GattError> {
        lock(&self.advertising).push((service, true));
        Ok(())
    }

    fn stop_advertising(&self, service: ServiceHandle) -> Result<(), GattError> {
        lock(&self.advertising).push((service, false));
        Ok(())
    }

    fn notify(&self, service: ServiceHandle, report: &[u8]) -> Result<(), GattError> {
        lock(&self.notifications).push(RecordedNotification {
            service,
            report: report.to_vec(),
            at: Instant::now(),
        });
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
