//! In-process simulated BLE GATT stack.
//!
//! Keeps the HID service tables in memory and "delivers" notifications by
//! logging them from a background task.  With `simulated_subscriber` enabled
//! a central subscribes the moment advertising starts, so every command
//! travels the full path from frame to notification.
//!
//! Notifications go through one bounded `mpsc` queue.  `notify` only does a
//! `try_send`, so it never blocks the command loop, and a single consumer
//! keeps per-subscriber order equal to submission order.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use blehid_core::report::hex_string;
use blehid_core::DeviceProfile;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info};

use crate::application::gatt::{
    CharacteristicHandle, CharacteristicSpec, DescriptorSpec, GattError, GattObserver,
    GattTransport, ServiceHandle, SubscriberId,
};
use crate::infrastructure::storage::config::TransportConfig;

/// Outbound queue depth.  At one report per command this is far more than a
/// controller can have in flight.
pub const DEFAULT_QUEUE_DEPTH: usize = 256;

/// One queued notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub service: ServiceHandle,
    pub device: &'static str,
    pub subscribers: Vec<SubscriberId>,
    pub report: Vec<u8>,
}

struct SimulatedService {
    profile: DeviceProfile,
    advertising: bool,
    subscribers: Vec<SubscriberId>,
    observer: Option<Arc<dyn GattObserver>>,
    characteristics: Vec<(CharacteristicHandle, CharacteristicSpec)>,
    descriptors: Vec<(CharacteristicHandle, DescriptorSpec)>,
}

#[derive(Default)]
struct SimulatedState {
    services: HashMap<ServiceHandle, SimulatedService>,
    characteristic_owner: HashMap<CharacteristicHandle, ServiceHandle>,
}

/// A GATT transport that needs no Bluetooth hardware.
pub struct SimulatedGattTransport {
    device_name: String,
    auto_subscribe: bool,
    state: Mutex<SimulatedState>,
    next_handle: AtomicU32,
    outbound: mpsc::Sender<Delivery>,
}

impl SimulatedGattTransport {
    /// Creates the transport and the receiving end of its delivery queue.
    ///
    /// The caller must drain the receiver, normally with [`run_delivery`].
    pub fn new(
        device_name: impl Into<String>,
        auto_subscribe: bool,
        queue_depth: usize,
    ) -> (Self, mpsc::Receiver<Delivery>) {
        let (outbound, rx) = mpsc::channel(queue_depth);
        let transport = Self {
            device_name: device_name.into(),
            auto_subscribe,
            state: Mutex::new(SimulatedState::default()),
            next_handle: AtomicU32::new(0),
            outbound,
        };
        (transport, rx)
    }

    /// Creates the transport and spawns its delivery task on the current
    /// Tokio runtime.
    pub fn spawn(device_name: impl Into<String>, config: &TransportConfig) -> Arc<Self> {
        let (transport, rx) = Self::new(device_name, config.simulated_subscriber, DEFAULT_QUEUE_DEPTH);
        tokio::spawn(run_delivery(rx));
        Arc::new(transport)
    }

    fn lock(&self) -> MutexGuard<'_, SimulatedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_handle(&self) -> u32 {
        self.next_handle.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Replaces `service`'s subscriber set and tells its observer.
    pub fn set_subscribers(&self, service: ServiceHandle, subscribers: Vec<SubscriberId>) {
        let observer = {
            let mut state = self.lock();
            let Some(svc) = state.services.get_mut(&service) else {
                return;
            };
            svc.subscribers = subscribers.clone();
            svc.observer.clone()
        };
        if let Some(observer) = observer {
            observer.on_subscribers_changed(&subscribers);
        }
    }

    /// Simulates a central writing the HID Control Point of `service`.
    pub fn write_control_point(&self, service: ServiceHandle, value: &[u8]) {
        let observer = self
            .lock()
            .services
            .get(&service)
            .and_then(|svc| svc.observer.clone());
        if let Some(observer) = observer {
            observer.on_control_point_write(value);
        }
    }

    /// Number of attributes (characteristics plus descriptors) on `service`.
    pub fn attribute_count(&self, service: ServiceHandle) -> usize {
        self.lock()
            .services
            .get(&service)
            .map_or(0, |svc| svc.characteristics.len() + svc.descriptors.len())
    }

    pub fn is_advertising(&self, service: ServiceHandle) -> bool {
        self.lock()
            .services
            .get(&service)
            .is_some_and(|svc| svc.advertising)
    }
}

#[async_trait]
impl GattTransport for SimulatedGattTransport {
    async fn create_service(&self, profile: DeviceProfile) -> Result<ServiceHandle, GattError> {
        let handle = ServiceHandle(self.next_handle());
        self.lock().services.insert(
            handle,
            SimulatedService {
                profile,
                advertising: false,
                subscribers: Vec::new(),
                observer: None,
                characteristics: Vec::new(),
                descriptors: Vec::new(),
            },
        );
        debug!("created {} service {handle}", profile.name());
        Ok(handle)
    }

    async fn add_characteristic(
        &self,
        service: ServiceHandle,
        spec: CharacteristicSpec,
    ) -> Result<CharacteristicHandle, GattError> {
        let handle = CharacteristicHandle(self.next_handle());
        let mut state = self.lock();
        let svc = state
            .services
            .get_mut(&service)
            .ok_or(GattError::UnknownService(service))?;
        debug!("{service}: characteristic 0x{:04X}", spec.uuid);
        svc.characteristics.push((handle, spec));
        state.characteristic_owner.insert(handle, service);
        Ok(handle)
    }

    async fn add_descriptor(
        &self,
        characteristic: CharacteristicHandle,
        spec: DescriptorSpec,
    ) -> Result<(), GattError> {
        let mut state = self.lock();
        let service = *state
            .characteristic_owner
            .get(&characteristic)
            .ok_or_else(|| GattError::Refused {
                attribute: "descriptor",
                reason: format!("unknown characteristic {characteristic:?}"),
            })?;
        let svc = state
            .services
            .get_mut(&service)
            .ok_or(GattError::UnknownService(service))?;
        debug!("{service}: descriptor 0x{:04X} = {}", spec.uuid, hex_string(&spec.value));
        svc.descriptors.push((characteristic, spec));
        Ok(())
    }

    fn register_observer(&self, service: ServiceHandle, observer: Arc<dyn GattObserver>) {
        if let Some(svc) = self.lock().services.get_mut(&service) {
            svc.observer = Some(observer);
        }
    }

    fn start_advertising(&self, service: ServiceHandle) -> Result<(), GattError> {
        let auto_subscribed = {
            let mut state = self.lock();
            let svc = state
                .services
                .get_mut(&service)
                .ok_or(GattError::UnknownService(service))?;
            svc.advertising = true;
            info!(
                "advertising {} service {service} as {:?}",
                svc.profile.name(),
                self.device_name
            );
            self.auto_subscribe && svc.subscribers.is_empty()
        };

        if auto_subscribed {
            let central = SubscriberId::new();
            info!("simulated central {central} subscribed to {service}");
            self.set_subscribers(service, vec![central]);
        }
        Ok(())
    }

    fn stop_advertising(&self, service: ServiceHandle) -> Result<(), GattError> {
        let mut state = self.lock();
        let svc = state
            .services
            .get_mut(&service)
            .ok_or(GattError::UnknownService(service))?;
        svc.advertising = false;
        svc.subscribers.clear();
        Ok(())
    }

    fn notify(&self, service: ServiceHandle, report: &[u8]) -> Result<(), GattError> {
        let delivery = {
            let state = self.lock();
            let svc = state
                .services
                .get(&service)
                .ok_or(GattError::UnknownService(service))?;
            if svc.subscribers.is_empty() {
                return Ok(());
            }
            Delivery {
                service,
                device: svc.profile.name(),
                subscribers: svc.subscribers.clone(),
                report: report.to_vec(),
            }
        };

        self.outbound.try_send(delivery).map_err(|e| match e {
            TrySendError::Full(_) => GattError::QueueFull,
            TrySendError::Closed(_) => GattError::Closed,
        })
    }
}

/// Drains the delivery queue, logging each report per subscriber.
pub async fn run_delivery(mut rx: mpsc::Receiver<Delivery>) {
    while let Some(delivery) = rx.recv().await {
        let hex = hex_string(&delivery.report);
        for subscriber in &delivery.subscribers {
            debug!("{} notify -> {subscriber}: {hex}", delivery.device);
        }
    }
    debug!("simulated delivery queue closed");
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::session::{KeyboardSession, MouseSession, SubmitOutcome};
    use blehid_core::PointerProfile;
    use std::time::Duration;

    #[tokio::test]
    async fn test_auto_subscribe_on_advertising_start() {
        // Arrange
        let (transport, mut rx) = SimulatedGattTransport::new("Pad", true, 8);
        let transport = Arc::new(transport);
        let keyboard = KeyboardSession::keyboard(transport.clone());
        keyboard.initialize().await.unwrap();

        // Act
        keyboard.enable().unwrap();
        let outcome = keyboard.press_key(0x04);

        // Assert
        assert_eq!(keyboard.subscriber_count(), 1);
        assert_eq!(outcome, SubmitOutcome::Sent);
        let delivery = rx.recv().await.unwrap();
        assert_eq!(delivery.device, "keyboard");
        assert_eq!(delivery.report, vec![0, 0, 0x04, 0, 0, 0, 0, 0]);
    }

    #[tokio::test]
    async fn test_without_auto_subscribe_nothing_is_queued() {
        let (transport, mut rx) = SimulatedGattTransport::new("Pad", false, 8);
        let transport = Arc::new(transport);
        let mouse = MouseSession::mouse(transport.clone(), PointerProfile::Basic, Duration::ZERO);
        mouse.initialize().await.unwrap();
        mouse.enable().unwrap();

        assert_eq!(mouse.move_pointer(1, 1, 0), SubmitOutcome::NoSubscribers);
        // The transport itself also drops reports for an empty subscriber set.
        transport.notify(mouse.service().unwrap(), &[0, 1, 1]).unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_full_queue_is_reported() {
        let (transport, _rx) = SimulatedGattTransport::new("Pad", true, 1);
        let transport = Arc::new(transport);
        let keyboard = KeyboardSession::keyboard(transport.clone());
        keyboard.initialize().await.unwrap();
        keyboard.enable().unwrap();

        assert_eq!(keyboard.press_key(0x04), SubmitOutcome::Sent);
        assert_eq!(keyboard.press_key(0x05), SubmitOutcome::Rejected);
    }

    #[tokio::test]
    async fn test_deliveries_preserve_submission_order() {
        let (transport, mut rx) = SimulatedGattTransport::new("Pad", true, 16);
        let transport = Arc::new(transport);
        let mouse = MouseSession::mouse(transport.clone(), PointerProfile::Basic, Duration::ZERO);
        mouse.initialize().await.unwrap();
        mouse.enable().unwrap();

        for dx in 1..=5 {
            mouse.move_pointer(dx, 0, 0);
        }

        for dx in 1..=5u8 {
            assert_eq!(rx.recv().await.unwrap().report[1], dx);
        }
    }

    #[tokio::test]
    async fn test_layout_and_advertising_bookkeeping() {
        let (transport, _rx) = SimulatedGattTransport::new("Pad", false, 8);
        let transport = Arc::new(transport);
        let keyboard = KeyboardSession::keyboard(transport.clone());
        keyboard.initialize().await.unwrap();
        let service = keyboard.service().unwrap();

        // Four characteristics plus the report reference descriptor.
        assert_eq!(transport.attribute_count(service), 5);
        keyboard.enable().unwrap();
        assert!(transport.is_advertising(service));
        keyboard.disable().unwrap();
        assert!(!transport.is_advertising(service));
    }

    #[tokio::test]
    async fn test_unknown_handles_are_rejected() {
        let (transport, _rx) = SimulatedGattTransport::new("Pad", false, 8);

        assert_eq!(
            transport.notify(ServiceHandle(42), &[0]),
            Err(GattError::UnknownService(ServiceHandle(42)))
        );
        assert!(transport
            .add_descriptor(CharacteristicHandle(7), DescriptorSpec { uuid: 0x2908, value: vec![] })
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_manual_subscribe_and_control_point() {
        let (transport, _rx) = SimulatedGattTransport::new("Pad", false, 8);
        let transport = Arc::new(transport);
        let keyboard = KeyboardSession::keyboard(transport.clone());
        keyboard.initialize().await.unwrap();
        let service = keyboard.service().unwrap();

        transport.set_subscribers(service, vec![SubscriberId::new(), SubscriberId::new()]);
        transport.write_control_point(service, &[0x00]);

        assert_eq!(keyboard.subscriber_count(), 2);
    }

    #[tokio::test]
    async fn test_run_delivery_finishes_when_sender_dropped() {
        let (transport, rx) = SimulatedGattTransport::new("Pad", true, 8);
        let task = tokio::spawn(run_delivery(rx));

        drop(transport);

        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("delivery task ends")
            .unwrap();
    }
}
