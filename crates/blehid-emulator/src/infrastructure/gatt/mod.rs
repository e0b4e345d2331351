//! GATT transport implementations.
//!
//! - **`simulated`** – An in-process stand-in for a BLE stack.  It keeps the
//!   service table in memory, queues notifications on a bounded channel, and
//!   logs each delivery.  The binary uses it so the full command path can be
//!   exercised on a machine without a Bluetooth adapter.
//! - **`mock`** – A recording transport for tests.  Every call is pushed into
//!   a `Mutex<Vec<...>>` so assertions can inspect exactly what the sessions
//!   asked for and in what order.
//!
//! A platform BLE backend would live here as a third sibling module
//! implementing the same [`GattTransport`](crate::application::gatt::GattTransport)
//! trait.

pub mod mock;
pub mod simulated;
