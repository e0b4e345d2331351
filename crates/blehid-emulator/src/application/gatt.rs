//! The narrow capability the emulator needs from a BLE GATT peripheral stack.
//!
//! Sessions never talk to a radio directly.  They describe the attributes
//! they need ([`CharacteristicSpec`], [`DescriptorSpec`]) and hand report
//! bytes to a [`GattTransport`] implementation that is injected at
//! construction time.  Concrete transports live in the infrastructure layer.
//!
//! # Threading contract
//!
//! - Service construction is `async` because a real stack answers over IPC.
//! - `notify`, `start_advertising`, and `stop_advertising` must not block:
//!   they are called from the command loop while a controller is waiting
//!   for its `OK`.
//! - `notify` must preserve submission order per subscriber.
//! - Observer callbacks may arrive on any thread, including from inside a
//!   `start_advertising` call.  Implementations must not hold their own
//!   internal locks while invoking an observer.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use blehid_core::report::descriptor::{
    DeviceProfile, HID_CONTROL_POINT_UUID, HID_INFORMATION, HID_INFORMATION_UUID,
    REPORT_MAP_UUID, REPORT_REFERENCE_UUID, REPORT_UUID,
};
use thiserror::Error;
use uuid::Uuid;

/// Errors reported by a GATT transport.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GattError {
    /// The stack refused to create an attribute.
    #[error("transport refused to create {attribute}: {reason}")]
    Refused {
        attribute: &'static str,
        reason: String,
    },

    /// A handle that this transport never issued.
    #[error("unknown service handle {0}")]
    UnknownService(ServiceHandle),

    /// The outbound notification queue is full.
    #[error("notification queue full")]
    QueueFull,

    /// The transport has shut down.
    #[error("transport closed")]
    Closed,
}

// ── Handles and identifiers ───────────────────────────────────────────────────

/// Opaque handle to a service created by a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServiceHandle(pub u32);

/// Opaque handle to a characteristic created by a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CharacteristicHandle(pub u32);

impl fmt::Display for ServiceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "svc#{}", self.0)
    }
}

/// Identifies one subscribed remote central.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(pub Uuid);

impl SubscriberId {
    /// Creates a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ── Attribute specs ───────────────────────────────────────────────────────────

/// GATT characteristic properties the HID service uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CharacteristicProperties {
    pub read: bool,
    pub notify: bool,
    pub write_without_response: bool,
    /// Reads and notifications require an encrypted link.
    pub encrypted: bool,
}

/// One characteristic to add to a service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacteristicSpec {
    /// 16-bit assigned number.
    pub uuid: u16,
    pub properties: CharacteristicProperties,
    /// Constant value served on read, if any.
    pub static_value: Option<Vec<u8>>,
}

impl CharacteristicSpec {
    /// The input Report characteristic (read + notify, encrypted).
    pub fn report() -> Self {
        Self {
            uuid: REPORT_UUID,
            properties: CharacteristicProperties {
                read: true,
                notify: true,
                encrypted: true,
                ..Default::default()
            },
            static_value: None,
        }
    }

    /// The Report Map characteristic carrying `profile`'s descriptor.
    pub fn report_map(profile: DeviceProfile) -> Self {
        Self {
            uuid: REPORT_MAP_UUID,
            properties: CharacteristicProperties {
                read: true,
                encrypted: true,
                ..Default::default()
            },
            static_value: Some(profile.report_map().to_vec()),
        }
    }

    /// The HID Information characteristic.
    pub fn hid_information() -> Self {
        Self {
            uuid: HID_INFORMATION_UUID,
            properties: CharacteristicProperties {
                read: true,
                encrypted: true,
                ..Default::default()
            },
            static_value: Some(HID_INFORMATION.to_vec()),
        }
    }

    /// The HID Control Point characteristic (write without response).
    pub fn control_point() -> Self {
        Self {
            uuid: HID_CONTROL_POINT_UUID,
            properties: CharacteristicProperties {
                write_without_response: true,
                encrypted: true,
                ..Default::default()
            },
            static_value: None,
        }
    }
}

/// One descriptor to attach to a characteristic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorSpec {
    pub uuid: u16,
    pub value: Vec<u8>,
}

impl DescriptorSpec {
    /// The Report Reference descriptor for `profile`'s input report.
    pub fn report_reference(profile: DeviceProfile) -> Self {
        Self {
            uuid: REPORT_REFERENCE_UUID,
            value: profile.report_reference().to_vec(),
        }
    }
}

// ── Collaborator traits ───────────────────────────────────────────────────────

/// Receives events a transport raises for one service.
pub trait GattObserver: Send + Sync {
    /// The full set of subscribed centrals after a change.
    fn on_subscribers_changed(&self, subscribers: &[SubscriberId]);

    /// A central wrote the HID Control Point (suspend / exit suspend).
    fn on_control_point_write(&self, value: &[u8]);
}

/// A BLE GATT peripheral stack.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GattTransport: Send + Sync {
    /// Creates an empty primary HID service for `profile`.
    async fn create_service(&self, profile: DeviceProfile) -> Result<ServiceHandle, GattError>;

    /// Adds a characteristic to `service`.
    async fn add_characteristic(
        &self,
        service: ServiceHandle,
        spec: CharacteristicSpec,
    ) -> Result<CharacteristicHandle, GattError>;

    /// Adds a descriptor to `characteristic`.
    async fn add_descriptor(
        &self,
        characteristic: CharacteristicHandle,
        spec: DescriptorSpec,
    ) -> Result<(), GattError>;

    /// Registers the observer that receives `service`'s events.
    fn register_observer(&self, service: ServiceHandle, observer: Arc<dyn GattObserver>);

    /// Starts advertising `service`.
    fn start_advertising(&self, service: ServiceHandle) -> Result<(), GattError>;

    /// Stops advertising `service`.
    fn stop_advertising(&self, service: ServiceHandle) -> Result<(), GattError>;

    /// Queues `report` for every current subscriber of `service`.
    ///
    /// Returns once the report is queued, not once it is delivered.
    fn notify(&self, service: ServiceHandle, report: &[u8]) -> Result<(), GattError>;
}

// ── Tests ─────────────────────────────────────────────────────────────────────
