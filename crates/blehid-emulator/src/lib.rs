//! blehid-emulator library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does the emulator do? (for beginners)
//!
//! It makes this machine look like a Bluetooth keyboard and mouse to a
//! paired phone or PC, and lets another local program "type" and "move the
//! mouse" on that remote device:
//!
//! 1. At startup each virtual device (keyboard, mouse) builds a standard
//!    HID-over-GATT service: a Report characteristic, the report map that
//!    describes the report layout, HID Information, and a Control Point.
//! 2. The devices start advertising.  When a remote host subscribes to the
//!    Report characteristic, reports start flowing.
//! 3. A controller connects to the local command port and sends framed
//!    `AT+` commands such as `AT+BLEHIDMOUSEMOVE=10,0`.
//! 4. Each command updates the in-memory device state, is encoded into an
//!    input report, and is handed to the GATT transport for notification.
//!    The controller gets `OK\n` back.

/// Application layer: device sessions, the GATT collaborator contract, and
/// command dispatch.
pub mod application;

/// Infrastructure layer: GATT transports, the command server, and config.
pub mod infrastructure;
