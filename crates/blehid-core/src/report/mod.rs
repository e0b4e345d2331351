//! HID report state machines and the static descriptors that describe them.
//!
//! - [`keyboard`] – pressed-key tracking and the 8-byte keyboard input report.
//! - [`pointer`] – latched button state and the 3/4-byte pointer input report.
//! - [`descriptor`] – report maps and GATT attribute values per device profile.

pub mod descriptor;
pub mod keyboard;
pub mod pointer;

/// Formats report bytes as space-separated upper-case hex (`"05 00 1E"`).
///
/// Used in log lines so that a report can be compared by eye against a
/// protocol analyzer capture.
pub fn hex_string(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}
