//! HidPeripheralSession: one virtual HID device exposed over GATT.
//!
//! A session owns a report-state object (keyboard or pointer), the handle of
//! the GATT service it created, and the set of currently subscribed
//! centrals.  It is the only place where encoded reports meet the transport.
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialized ──initialize()──► Initializing ──ok──► Ready ──enable()──► Enabled
//!                                      │                              ◄──disable()──┘
//!                                      └──error──► Failed           (Enabled ⇄ Disabled)
//! ```
//!
//! # Why two locks? (for beginners)
//!
//! The command loop is the only caller that changes report state, but the
//! transport may call back from its own thread whenever a central
//! subscribes or unsubscribes.  The small `SessionShared` block (phase,
//! service handle, subscribers) is therefore behind its own
//! `std::sync::Mutex`, separate from the report state.  Neither lock is ever
//! held across an `.await` or across a call into the transport.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use blehid_core::report::hex_string;
use blehid_core::report::pointer::PointerButton;
use blehid_core::{DeviceProfile, KeyboardReportState, PointerProfile, PointerReportState, ReportError};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

use crate::application::gatt::{
    CharacteristicSpec, DescriptorSpec, GattError, GattObserver, GattTransport, ServiceHandle,
    SubscriberId,
};

/// Gap between the press and release halves of a click unless configured.
pub const DEFAULT_CLICK_GAP: Duration = Duration::from_millis(40);

/// Error type for session lifecycle operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The transport refused part of the HID service during `initialize()`.
    #[error("{profile} session setup failed: {source}")]
    Setup {
        profile: &'static str,
        #[source]
        source: GattError,
    },

    /// `enable()` was called before `initialize()` finished.
    #[error("{0} session is not ready")]
    NotReady(&'static str),

    /// `initialize()` was called a second time.
    #[error("{0} session is already initialized")]
    AlreadyInitialized(&'static str),

    /// A previous `initialize()` failed; the session is unusable.
    #[error("{0} session failed during setup and cannot be used")]
    Failed(&'static str),

    /// The transport refused to start or stop advertising.
    #[error("{profile} advertising change failed: {source}")]
    Advertising {
        profile: &'static str,
        #[source]
        source: GattError,
    },
}

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Uninitialized,
    Initializing,
    Ready,
    Enabled,
    Disabled,
    Failed,
}

impl SessionPhase {
    /// `true` once the GATT service exists and reports may be sent.
    pub fn is_past_setup(self) -> bool {
        matches!(
            self,
            SessionPhase::Ready | SessionPhase::Enabled | SessionPhase::Disabled
        )
    }
}

/// What happened to one submitted report.
///
/// None of these are errors: a report that cannot be delivered is dropped,
/// never queued for later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Setup has not finished (or failed); report dropped.
    NotReady,
    /// Nobody is subscribed; report dropped.
    NoSubscribers,
    /// The transport refused to queue the report; report dropped.
    Rejected,
    /// Handed to the transport.
    Sent,
}

// ── Shared state and observer ─────────────────────────────────────────────────

#[derive(Debug)]
struct SessionShared {
    phase: SessionPhase,
    service: Option<ServiceHandle>,
    subscribers: Vec<SubscriberId>,
}

struct SessionCore {
    profile: DeviceProfile,
    shared: Mutex<SessionShared>,
    subscribers_tx: watch::Sender<Vec<SubscriberId>>,
}

impl SessionCore {
    fn lock(&self) -> MutexGuard<'_, SessionShared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores and broadcasts a new subscriber set.  Both happen under the
    /// shared lock so the watch channel never lags behind `shared`.
    fn publish_subscribers(&self, subscribers: &[SubscriberId]) {
        let previous = {
            let mut shared = self.lock();
            let previous = std::mem::replace(&mut shared.subscribers, subscribers.to_vec());
            self.subscribers_tx.send_replace(subscribers.to_vec());
            previous.len()
        };
        if previous != subscribers.len() {
            info!(
                "{} subscribers changed: {previous} -> {}",
                self.profile.name(),
                subscribers.len()
            );
        }
    }
}

/// The session's face towards the transport.
struct SessionObserver {
    core: Arc<SessionCore>,
}

impl GattObserver for SessionObserver {
    fn on_subscribers_changed(&self, subscribers: &[SubscriberId]) {
        self.core.publish_subscribers(subscribers);
    }

    fn on_control_point_write(&self, value: &[u8]) {
        // Suspend / exit-suspend; nothing to do for a virtual device.
        debug!(
            "{} control point write ignored: {}",
            self.core.profile.name(),
            hex_string(value)
        );
    }
}

// ── Session ───────────────────────────────────────────────────────────────────

/// One virtual HID device: report state plus its GATT service.
pub struct HidPeripheralSession<S> {
    core: Arc<SessionCore>,
    transport: Arc<dyn GattTransport>,
    state: Mutex<S>,
    click_gap: Duration,
}

/// The keyboard session.
pub type KeyboardSession = HidPeripheralSession<KeyboardReportState>;

/// The mouse session.
pub type MouseSession = HidPeripheralSession<PointerReportState>;

impl<S> HidPeripheralSession<S> {
    fn with_state(profile: DeviceProfile, transport: Arc<dyn GattTransport>, state: S) -> Self {
        let (subscribers_tx, _) = watch::channel(Vec::new());
        Self {
            core: Arc::new(SessionCore {
                profile,
                shared: Mutex::new(SessionShared {
                    phase: SessionPhase::Uninitialized,
                    service: None,
                    subscribers: Vec::new(),
                }),
                subscribers_tx,
            }),
            transport,
            state: Mutex::new(state),
            click_gap: DEFAULT_CLICK_GAP,
        }
    }

    /// The device profile this session exposes.
    pub fn profile(&self) -> DeviceProfile {
        self.core.profile
    }

    pub fn phase(&self) -> SessionPhase {
        self.core.lock().phase
    }

    /// The GATT service handle, once setup has succeeded.
    pub fn service(&self) -> Option<ServiceHandle> {
        self.core.lock().service
    }

    pub fn subscriber_count(&self) -> usize {
        self.core.lock().subscribers.len()
    }

    /// A receiver that observes every change to the subscriber set.
    pub fn watch_subscribers(&self) -> watch::Receiver<Vec<SubscriberId>> {
        self.core.subscribers_tx.subscribe()
    }

    fn lock_state(&self) -> MutexGuard<'_, S> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Creates the HID service and its attributes.
    ///
    /// # Errors
    ///
    /// - [`SessionError::AlreadyInitialized`] if called more than once.
    /// - [`SessionError::Failed`] if an earlier call failed.
    /// - [`SessionError::Setup`] if the transport refuses any attribute.  The
    ///   session moves to [`SessionPhase::Failed`] and stays there.
    pub async fn initialize(&self) -> Result<(), SessionError> {
        let name = self.core.profile.name();
        {
            let mut shared = self.core.lock();
            match shared.phase {
                SessionPhase::Uninitialized => shared.phase = SessionPhase::Initializing,
                SessionPhase::Failed => return Err(SessionError::Failed(name)),
                _ => return Err(SessionError::AlreadyInitialized(name)),
            }
        }

        match self.build_service().await {
            Ok(service) => {
                {
                    let mut shared = self.core.lock();
                    shared.service = Some(service);
                    shared.phase = SessionPhase::Ready;
                }
                info!("{name} HID service ready ({service})");
                Ok(())
            }
            Err(source) => {
                self.core.lock().phase = SessionPhase::Failed;
                Err(SessionError::Setup {
                    profile: name,
                    source,
                })
            }
        }
    }

    async fn build_service(&self) -> Result<ServiceHandle, GattError> {
        let profile = self.core.profile;
        let transport = &self.transport;

        let service = transport.create_service(profile).await?;

        let report = transport
            .add_characteristic(service, CharacteristicSpec::report())
            .await?;
        transport
            .add_descriptor(report, DescriptorSpec::report_reference(profile))
            .await?;
        transport
            .add_characteristic(service, CharacteristicSpec::report_map(profile))
            .await?;
        transport
            .add_characteristic(service, CharacteristicSpec::hid_information())
            .await?;
        transport
            .add_characteristic(service, CharacteristicSpec::control_point())
            .await?;

        transport.register_observer(
            service,
            Arc::new(SessionObserver {
                core: Arc::clone(&self.core),
            }),
        );
        Ok(service)
    }

    /// Starts advertising.  Enabling an enabled session is a no-op.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotReady`] before setup has finished,
    /// [`SessionError::Failed`] after a failed setup, or
    /// [`SessionError::Advertising`] if the transport refuses.
    pub fn enable(&self) -> Result<(), SessionError> {
        let name = self.core.profile.name();
        let service = {
            let shared = self.core.lock();
            match (shared.phase, shared.service) {
                (SessionPhase::Enabled, _) => return Ok(()),
                (SessionPhase::Failed, _) => return Err(SessionError::Failed(name)),
                (SessionPhase::Ready | SessionPhase::Disabled, Some(service)) => service,
                _ => return Err(SessionError::NotReady(name)),
            }
        };

        // The transport may call the observer from inside this call, so no
        // lock is held here.
        self.transport
            .start_advertising(service)
            .map_err(|source| SessionError::Advertising {
                profile: name,
                source,
            })?;

        self.core.lock().phase = SessionPhase::Enabled;
        info!("{name} advertising started");
        Ok(())
    }

    /// Stops advertising and reports "no subscribers".
    ///
    /// Safe to call in any phase; only an enabled session changes state.
    ///
    /// # Errors
    ///
    /// [`SessionError::Advertising`] if the transport refuses.  The session is
    /// still marked disabled so a later `enable()` can retry.
    pub fn disable(&self) -> Result<(), SessionError> {
        let name = self.core.profile.name();
        let service = {
            let mut shared = self.core.lock();
            match (shared.phase, shared.service) {
                (SessionPhase::Enabled, Some(service)) => {
                    shared.phase = SessionPhase::Disabled;
                    service
                }
                _ => return Ok(()),
            }
        };

        let result = self.transport.stop_advertising(service);
        self.core.publish_subscribers(&[]);
        info!("{name} advertising stopped");

        result.map_err(|source| SessionError::Advertising {
            profile: name,
            source,
        })
    }

    /// Hands `report` to the transport if anyone can receive it.
    ///
    /// Never waits for delivery.
    pub fn submit(&self, report: &[u8]) -> SubmitOutcome {
        let name = self.core.profile.name();
        let service = {
            let shared = self.core.lock();
            match shared.service {
                Some(service) if shared.phase.is_past_setup() => {
                    if shared.subscribers.is_empty() {
                        trace!("{name} report dropped, no subscribers: {}", hex_string(report));
                        return SubmitOutcome::NoSubscribers;
                    }
                    service
                }
                _ => {
                    trace!("{name} report dropped, session not ready: {}", hex_string(report));
                    return SubmitOutcome::NotReady;
                }
            }
        };

        debug!("{name} report: {}", hex_string(report));
        match self.transport.notify(service, report) {
            Ok(()) => SubmitOutcome::Sent,
            Err(e) => {
                warn!("{name} report not queued: {e}");
                SubmitOutcome::Rejected
            }
        }
    }
}

impl<S: Clone> HidPeripheralSession<S> {
    /// A copy of the current report state.
    pub fn snapshot(&self) -> S {
        self.lock_state().clone()
    }
}

// ── Keyboard operations ───────────────────────────────────────────────────────

impl HidPeripheralSession<KeyboardReportState> {
    /// Creates an uninitialized keyboard session.
    pub fn keyboard(transport: Arc<dyn GattTransport>) -> Self {
        Self::with_state(DeviceProfile::Keyboard, transport, KeyboardReportState::new())
    }

    /// Presses `usage` and sends the resulting report.
    pub fn press_key(&self, usage: u8) -> SubmitOutcome {
        let report = {
            let mut state = self.lock_state();
            state.press(usage);
            state.encode()
        };
        self.submit(&report)
    }

    /// Releases `usage` and sends the resulting report.
    pub fn release_key(&self, usage: u8) -> SubmitOutcome {
        let report = {
            let mut state = self.lock_state();
            state.release(usage);
            state.encode()
        };
        self.submit(&report)
    }

    /// Sends a caller-encoded 8-byte report verbatim.
    ///
    /// The tracked key state is neither read nor changed.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::InvalidReportSize`] unless `bytes` is exactly
    /// eight bytes long; nothing is sent in that case.
    pub fn send_raw_report(&self, bytes: &[u8]) -> Result<SubmitOutcome, ReportError> {
        let report = KeyboardReportState::direct_set(bytes)?;
        Ok(self.submit(&report))
    }
}

// ── Mouse operations ──────────────────────────────────────────────────────────

impl HidPeripheralSession<PointerReportState> {
    /// Creates an uninitialized mouse session.
    pub fn mouse(
        transport: Arc<dyn GattTransport>,
        pointer: PointerProfile,
        click_gap: Duration,
    ) -> Self {
        let mut session = Self::with_state(
            DeviceProfile::Mouse(pointer),
            transport,
            PointerReportState::new(pointer),
        );
        session.click_gap = click_gap;
        session
    }

    pub fn click_gap(&self) -> Duration {
        self.click_gap
    }

    /// Sends relative motion.  Held buttons stay held.
    pub fn move_pointer(&self, dx: i32, dy: i32, wheel: i32) -> SubmitOutcome {
        let report = self.lock_state().move_by(dx, dy, wheel);
        self.submit(&report)
    }

    /// Latches `button` down and sends the resulting report.
    pub fn press_button(&self, button: PointerButton) -> SubmitOutcome {
        let report = self.lock_state().press(button);
        self.submit(&report)
    }

    /// Releases `button` and sends the resulting report.
    pub fn release_button(&self, button: PointerButton) -> SubmitOutcome {
        let report = self.lock_state().release(button);
        self.submit(&report)
    }

    /// Releases both buttons and sends the resulting report.
    pub fn release_buttons(&self) -> SubmitOutcome {
        let report = self.lock_state().release_all();
        self.submit(&report)
    }

    /// Presses `button`, waits the click gap, then releases it.
    ///
    /// Always two separate reports, never one combined report.
    pub async fn click(&self, button: PointerButton) -> [SubmitOutcome; 2] {
        let [down, up] = self.lock_state().click(button);
        let pressed = self.submit(&down);
        tokio::time::sleep(self.click_gap).await;
        let released = self.submit(&up);
        [pressed, released]
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::gatt::{CharacteristicHandle, MockGattTransport};
    use mockall::predicate::eq;
    use std::time::Instant;

    type ObserverSlot = Arc<Mutex<Option<Arc<dyn GattObserver>>>>;

    /// A mock that accepts every setup call and captures the observer.
    fn accepting_mock(slot: ObserverSlot) -> MockGattTransport {
        let mut mock = MockGattTransport::new();
        mock.expect_create_service()
            .returning(|_| Ok(ServiceHandle(1)));
        let mut next = 10;
        mock.expect_add_characteristic().returning(move |_, _| {
            next += 1;
            Ok(CharacteristicHandle(next))
        });
        mock.expect_add_descriptor().returning(|_, _| Ok(()));
        mock.expect_register_observer()
            .returning(move |_, observer| *slot.lock().unwrap() = Some(observer));
        mock
    }

    fn subscribe_one(slot: &ObserverSlot) {
        let observer = slot.lock().unwrap().clone().expect("observer registered");
        observer.on_subscribers_changed(&[SubscriberId::new()]);
    }

    // ── Setup ─────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_initialize_creates_attributes_in_order() {
        // Arrange
        let slot = ObserverSlot::default();
        let mut mock = MockGattTransport::new();
        let mut seq = mockall::Sequence::new();
        mock.expect_create_service()
            .with(eq(DeviceProfile::Keyboard))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(ServiceHandle(7)));
        mock.expect_add_characteristic()
            .withf(|s, spec| *s == ServiceHandle(7) && *spec == CharacteristicSpec::report())
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(CharacteristicHandle(1)));
        mock.expect_add_descriptor()
            .withf(|c, spec| {
                *c == CharacteristicHandle(1) && spec.uuid == 0x2908 && spec.value == [0x01, 0x01]
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        for expected in [
            CharacteristicSpec::report_map(DeviceProfile::Keyboard),
            CharacteristicSpec::hid_information(),
            CharacteristicSpec::control_point(),
        ] {
            mock.expect_add_characteristic()
                .withf(move |_, spec| *spec == expected)
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_, _| Ok(CharacteristicHandle(2)));
        }
        let captured = Arc::clone(&slot);
        mock.expect_register_observer()
            .times(1)
            .in_sequence(&mut seq)
            .returning(move |_, observer| *captured.lock().unwrap() = Some(observer));

        let session = KeyboardSession::keyboard(Arc::new(mock));

        // Act
        session.initialize().await.expect("setup succeeds");

        // Assert
        assert_eq!(session.phase(), SessionPhase::Ready);
        assert_eq!(session.service(), Some(ServiceHandle(7)));
        assert!(slot.lock().unwrap().is_some());
    }

    #[tokio::test]
    async fn test_setup_failure_is_fatal() {
        // Arrange – the descriptor step fails; nothing after it may be called.
        let mut mock = MockGattTransport::new();
        mock.expect_create_service()
            .returning(|_| Ok(ServiceHandle(1)));
        mock.expect_add_characteristic()
            .times(1)
            .returning(|_, _| Ok(CharacteristicHandle(1)));
        mock.expect_add_descriptor().times(1).returning(|_, _| {
            Err(GattError::Refused {
                attribute: "report reference",
                reason: "out of handles".into(),
            })
        });
        mock.expect_notify().never();
        let session = KeyboardSession::keyboard(Arc::new(mock));

        // Act
        let err = session.initialize().await.unwrap_err();

        // Assert
        assert!(matches!(err, SessionError::Setup { profile: "keyboard", .. }));
        assert_eq!(session.phase(), SessionPhase::Failed);
        assert_eq!(session.press_key(0x04), SubmitOutcome::NotReady);
        assert!(matches!(session.initialize().await, Err(SessionError::Failed(_))));
        assert!(matches!(session.enable(), Err(SessionError::Failed(_))));
    }

    #[tokio::test]
    async fn test_initialize_twice_is_rejected() {
        let session = KeyboardSession::keyboard(Arc::new(accepting_mock(ObserverSlot::default())));
        session.initialize().await.unwrap();

        assert!(matches!(
            session.initialize().await,
            Err(SessionError::AlreadyInitialized("keyboard"))
        ));
    }

    #[test]
    fn test_enable_before_initialize_is_not_ready() {
        let session = KeyboardSession::keyboard(Arc::new(MockGattTransport::new()));
        assert!(matches!(session.enable(), Err(SessionError::NotReady(_))));
    }

    #[test]
    fn test_disable_before_initialize_is_a_no_op() {
        // A bare mock panics on any call, proving nothing reaches the transport.
        let session = KeyboardSession::keyboard(Arc::new(MockGattTransport::new()));
        assert!(session.disable().is_ok());
        assert_eq!(session.phase(), SessionPhase::Uninitialized);
    }

    // ── Advertising ───────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_enable_disable_cycle_clears_subscribers() {
        // Arrange
        let slot = ObserverSlot::default();
        let mut mock = accepting_mock(Arc::clone(&slot));
        mock.expect_start_advertising().times(2).returning(|_| Ok(()));
        mock.expect_stop_advertising().times(1).returning(|_| Ok(()));
        let session = KeyboardSession::keyboard(Arc::new(mock));
        session.initialize().await.unwrap();
        let mut rx = session.watch_subscribers();

        // Act
        session.enable().unwrap();
        session.enable().unwrap(); // no second start_advertising call
        subscribe_one(&slot);
        assert_eq!(session.subscriber_count(), 1);
        session.disable().unwrap();

        // Assert
        assert_eq!(session.phase(), SessionPhase::Disabled);
        assert_eq!(session.subscriber_count(), 0);
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_empty());

        // Re-enabling after disable is legal.
        session.enable().unwrap();
        assert_eq!(session.phase(), SessionPhase::Enabled);
    }

    #[tokio::test]
    async fn test_advertising_refusal_is_reported() {
        let mut mock = accepting_mock(ObserverSlot::default());
        mock.expect_start_advertising()
            .returning(|_| Err(GattError::Closed));
        let session = KeyboardSession::keyboard(Arc::new(mock));
        session.initialize().await.unwrap();

        let err = session.enable().unwrap_err();

        assert!(matches!(err, SessionError::Advertising { source: GattError::Closed, .. }));
        assert_eq!(session.phase(), SessionPhase::Ready);
    }

    // ── Submit ────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_submit_without_subscribers_drops_report_but_keeps_state() {
        // Arrange
        let mut mock = accepting_mock(ObserverSlot::default());
        mock.expect_notify().never();
        let session = KeyboardSession::keyboard(Arc::new(mock));
        session.initialize().await.unwrap();

        // Act
        let outcome = session.press_key(0x04);

        // Assert
        assert_eq!(outcome, SubmitOutcome::NoSubscribers);
        assert!(session.snapshot().is_pressed(0x04));
    }

    #[tokio::test]
    async fn test_press_key_notifies_encoded_report() {
        // Arrange
        let slot = ObserverSlot::default();
        let mut mock = accepting_mock(Arc::clone(&slot));
        mock.expect_notify()
            .withf(|_, report| report == [0x02, 0, 0x04, 0, 0, 0, 0, 0])
            .times(1)
            .returning(|_, _| Ok(()));
        mock.expect_notify()
            .withf(|_, report| report == [0x02, 0, 0, 0, 0, 0, 0, 0])
            .times(1)
            .returning(|_, _| Ok(()));
        let session = KeyboardSession::keyboard(Arc::new(mock));
        session.initialize().await.unwrap();
        assert_eq!(session.press_key(0xE1), SubmitOutcome::NoSubscribers);
        subscribe_one(&slot);

        // Act
        let pressed = session.press_key(0x04);
        let released = session.release_key(0x04);

        // Assert
        assert_eq!(pressed, SubmitOutcome::Sent);
        assert_eq!(released, SubmitOutcome::Sent);
    }

    #[tokio::test]
    async fn test_oversized_raw_report_is_rejected_without_notify() {
        let slot = ObserverSlot::default();
        let mut mock = accepting_mock(Arc::clone(&slot));
        mock.expect_notify().never();
        let session = KeyboardSession::keyboard(Arc::new(mock));
        session.initialize().await.unwrap();
        subscribe_one(&slot);

        let result = session.send_raw_report(&[0; 9]);

        assert!(matches!(result, Err(ReportError::InvalidReportSize { actual: 9, .. })));
    }

    #[tokio::test]
    async fn test_queue_full_is_reported_as_rejected() {
        let slot = ObserverSlot::default();
        let mut mock = accepting_mock(Arc::clone(&slot));
        mock.expect_notify().returning(|_, _| Err(GattError::QueueFull));
        let session = KeyboardSession::keyboard(Arc::new(mock));
        session.initialize().await.unwrap();
        subscribe_one(&slot);

        assert_eq!(session.press_key(0x04), SubmitOutcome::Rejected);
    }

    // ── Mouse ─────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_click_sends_two_reports_separated_by_gap() {
        // Arrange
        let slot = ObserverSlot::default();
        let stamps: Arc<Mutex<Vec<(Vec<u8>, Instant)>>> = Arc::default();
        let recorder = Arc::clone(&stamps);
        let mut mock = accepting_mock(Arc::clone(&slot));
        mock.expect_notify().times(2).returning(move |_, report| {
            recorder.lock().unwrap().push((report.to_vec(), Instant::now()));
            Ok(())
        });
        let session = MouseSession::mouse(
            Arc::new(mock),
            PointerProfile::Basic,
            Duration::from_millis(40),
        );
        session.initialize().await.unwrap();
        subscribe_one(&slot);

        // Act
        let outcomes = session.click(PointerButton::Left).await;

        // Assert
        assert_eq!(outcomes, [SubmitOutcome::Sent, SubmitOutcome::Sent]);
        let stamps = stamps.lock().unwrap();
        assert_eq!(stamps[0].0, vec![0x01, 0, 0]);
        assert_eq!(stamps[1].0, vec![0x00, 0, 0]);
        assert!(stamps[1].1 - stamps[0].1 >= Duration::from_millis(40));
    }

    #[tokio::test]
    async fn test_move_re_asserts_held_button() {
        let slot = ObserverSlot::default();
        let mut mock = accepting_mock(Arc::clone(&slot));
        mock.expect_notify()
            .withf(|_, report| report == [0x02, 0x7F, 0x81, 0x00])
            .times(1)
            .returning(|_, _| Ok(()));
        let session = MouseSession::mouse(Arc::new(mock), PointerProfile::Wheel, DEFAULT_CLICK_GAP);
        session.initialize().await.unwrap();
        // Pressed before anyone subscribed: latched but not sent.
        assert_eq!(session.press_button(PointerButton::Right), SubmitOutcome::NoSubscribers);
        subscribe_one(&slot);

        assert_eq!(session.move_pointer(300, -300, 0), SubmitOutcome::Sent);
        assert_eq!(session.snapshot().buttons(), (false, true));
    }

    #[test]
    fn test_control_point_write_is_accepted() {
        let core = Arc::new(SessionCore {
            profile: DeviceProfile::Keyboard,
            shared: Mutex::new(SessionShared {
                phase: SessionPhase::Ready,
                service: Some(ServiceHandle(1)),
                subscribers: Vec::new(),
            }),
            subscribers_tx: watch::channel(Vec::new()).0,
        });
        let observer = SessionObserver { core: Arc::clone(&core) };

        observer.on_control_point_write(&[0x00]);

        assert_eq!(core.lock().phase, SessionPhase::Ready);
    }

    #[test]
    fn test_concurrent_subscriber_changes_leave_watch_in_step() {
        // Arrange
        let (subscribers_tx, rx) = watch::channel(Vec::new());
        let core = Arc::new(SessionCore {
            profile: DeviceProfile::Keyboard,
            shared: Mutex::new(SessionShared {
                phase: SessionPhase::Enabled,
                service: Some(ServiceHandle(1)),
                subscribers: Vec::new(),
            }),
            subscribers_tx,
        });

        // Act – several callback threads flip between different sets.
        let handles: Vec<_> = (0..4)
            .map(|n| {
                let observer = SessionObserver { core: Arc::clone(&core) };
                std::thread::spawn(move || {
                    let set: Vec<SubscriberId> = (0..=n).map(|_| SubscriberId::new()).collect();
                    for i in 0..500 {
                        if i % 2 == 0 {
                            observer.on_subscribers_changed(&set);
                        } else {
                            observer.on_subscribers_changed(&[]);
                        }
                    }
                    observer.on_subscribers_changed(&set);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // Assert
        assert_eq!(*rx.borrow(), core.lock().subscribers);
    }
}
