//! Application layer for the emulator.
//!
//! # What lives here?
//!
//! - **`gatt`** – The [`GattTransport`](gatt::GattTransport) trait a BLE stack
//!   must implement, the observer callback trait, and the attribute specs
//!   that make up a HID service.
//!
//! - **`session`** – `HidPeripheralSession`: one virtual device.  It builds
//!   its GATT service, tracks lifecycle and subscribers, and turns key or
//!   pointer actions into notified reports.
//!
//! - **`dispatch`** – `CommandDispatcher`: maps each parsed `AT+` command to
//!   session calls and produces the textual reply.
//!
//! Nothing in this layer opens a socket or reads a file.

pub mod dispatch;
pub mod gatt;
pub mod session;
