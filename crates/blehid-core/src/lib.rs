//! # blehid-core
//!
//! Shared library for the BLE HID emulator containing the HID report state
//! machines, the static report descriptors, and the framed text command
//! protocol spoken by the local automation client.
//!
//! This crate has zero dependencies on sockets, async runtimes, or any
//! Bluetooth stack.  Everything here is deterministic and unit-testable.
//!
//! # Architecture overview (for beginners)
//!
//! The emulator pretends to be a Bluetooth Low Energy keyboard and mouse.  A
//! controlling process sends short ASCII commands (`AT+BLEHIDMOUSEMOVE=5,0`),
//! and the emulator turns each one into a binary *HID input report* that a
//! paired phone or PC understands as "the mouse moved 5 units to the right".
//!
//! This crate is the shared foundation.  It defines:
//!
//! - **`report`** – The in-memory pressed-key / held-button state of each
//!   virtual device, and the byte-exact encoding of that state into the
//!   8-byte keyboard report and the 3- or 4-byte pointer report.  It also
//!   holds the fixed report descriptors that tell the remote host how to
//!   interpret those bytes.
//!
//! - **`keymap`** – USB HID usage constants for the Keyboard/Keypad page,
//!   including the modifier-key bit table.
//!
//! - **`protocol`** – How commands travel from the controller: a 4-byte
//!   little-endian length prefix followed by ASCII text, and the small fixed
//!   grammar of `AT+...` commands carried inside those frames.

pub mod keymap;
pub mod protocol;
pub mod report;

// Re-export the most-used types at the crate root so callers can write
// `blehid_core::KeyboardReportState` instead of the full module path.
pub use protocol::command::{parse_command, ButtonAction, Command, CommandError, PointerButton};
pub use protocol::frame::{decode_frame, encode_frame, FrameError};
pub use report::descriptor::DeviceProfile;
pub use report::keyboard::{KeyboardReportState, ReportError, KEYBOARD_REPORT_SIZE};
pub use report::pointer::{PointerProfile, PointerReportState};
