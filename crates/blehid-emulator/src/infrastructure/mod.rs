//! Infrastructure layer for the emulator.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `blehid_core`, but MUST NOT be imported by the `application` layer.
//!
//! # Sub-modules
//!
//! - **`gatt`** – Implementations of `GattTransport`: an in-process simulated
//!   stack used by the binary, and a recording transport for tests.
//!
//! - **`network`** – The TCP command server that reads length-prefixed
//!   frames and writes the dispatcher's responses.
//!
//! - **`storage`** – TOML configuration loading and saving.

pub mod gatt;
pub mod network;
pub mod storage;
