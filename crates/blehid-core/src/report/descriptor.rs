//! Static HID-over-GATT attribute values for the two device profiles.
//!
//! None of this is user-configurable.  The remote host reads the *report map*
//! once after pairing and uses it to interpret every notification that
//! follows, so the bytes here must agree exactly with the encoders in
//! [`super::keyboard`] and [`super::pointer`].

use crate::report::keyboard::KEYBOARD_REPORT_SIZE;
use crate::report::pointer::PointerProfile;

// ── GATT assigned numbers ─────────────────────────────────────────────────────

/// Human Interface Device service.
pub const HID_SERVICE_UUID: u16 = 0x1812;
/// HID Information characteristic.
pub const HID_INFORMATION_UUID: u16 = 0x2A4A;
/// Report Map characteristic.
pub const REPORT_MAP_UUID: u16 = 0x2A4B;
/// HID Control Point characteristic.
pub const HID_CONTROL_POINT_UUID: u16 = 0x2A4C;
/// Report characteristic.
pub const REPORT_UUID: u16 = 0x2A4D;
/// Report Reference descriptor.
pub const REPORT_REFERENCE_UUID: u16 = 0x2908;

/// Report Reference "report type" value for input reports.
pub const REPORT_TYPE_INPUT: u8 = 0x01;

/// HID Information value: bcdHID 1.11, country code 0, remote wake capable.
pub const HID_INFORMATION: [u8; 4] = [
    0x11, 0x01, // HID Version: 1101
    0x00, //       Country Code: 0
    0x01, //       Flags: RemoteWake
];

// ── Report maps ───────────────────────────────────────────────────────────────

/// Report id carried by keyboard input reports.
pub const KEYBOARD_REPORT_ID: u8 = 0x01;
/// Report id carried by mouse input reports.
pub const MOUSE_REPORT_ID: u8 = 0x02;

/// Boot-compatible keyboard: 8 modifier bits, 1 reserved byte, 6 key slots.
pub const KEYBOARD_REPORT_MAP: &[u8] = &[
    0x05, 0x01, //       Usage Page (Generic Desktop)
    0x09, 0x06, //       Usage (Keyboard)
    0xA1, 0x01, //       Collection (Application)
    0x85, KEYBOARD_REPORT_ID, //   Report ID (1)
    0x05, 0x07, //         Usage Page (Keyboard/Keypad)
    0x19, 0xE0, //         Usage Minimum (Left Ctrl)
    0x29, 0xE7, //         Usage Maximum (Right GUI)
    0x15, 0x00, //         Logical Minimum (0)
    0x25, 0x01, //         Logical Maximum (1)
    0x95, 0x08, //         Report Count (8)
    0x75, 0x01, //         Report Size (1)
    0x81, 0x02, //         Input (Data, Var, Abs)        modifier bits
    0x95, 0x01, //         Report Count (1)
    0x75, 0x08, //         Report Size (8)
    0x81, 0x01, //         Input (Const)                 reserved byte
    0x05, 0x07, //         Usage Page (Keyboard/Keypad)
    0x19, 0x00, //         Usage Minimum (0)
    0x2A, 0xFF, 0x00, //   Usage Maximum (255)
    0x15, 0x00, //         Logical Minimum (0)
    0x26, 0xFF, 0x00, //   Logical Maximum (255)
    0x95, 0x06, //         Report Count (6)
    0x75, 0x08, //         Report Size (8)
    0x81, 0x00, //         Input (Data, Array, Abs)      key slots
    0xC0, //             End Collection
];

/// Two-button relative mouse: buttons, X, Y.
pub const MOUSE_REPORT_MAP: &[u8] = &[
    0x05, 0x01, //       Usage Page (Generic Desktop)
    0x09, 0x02, //       Usage (Mouse)
    0xA1, 0x01, //       Collection (Application)
    0x85, MOUSE_REPORT_ID, //   Report ID (2)
    0x09, 0x01, //         Usage (Pointer)
    0xA1, 0x00, //         Collection (Physical)
    0x05, 0x09, //           Usage Page (Button)
    0x19, 0x01, //           Usage Minimum (Button 1)
    0x29, 0x02, //           Usage Maximum (Button 2)
    0x15, 0x00, //           Logical Minimum (0)
    0x25, 0x01, //           Logical Maximum (1)
    0x75, 0x01, //           Report Size (1)
    0x95, 0x02, //           Report Count (2)
    0x81, 0x02, //           Input (Data, Var, Abs)      buttons
    0x95, 0x06, //           Report Count (6)
    0x81, 0x03, //           Input (Const, Var, Abs)     padding
    0x05, 0x01, //           Usage Page (Generic Desktop)
    0x09, 0x30, //           Usage (X)
    0x09, 0x31, //           Usage (Y)
    0x15, 0x81, //           Logical Minimum (-127)
    0x25, 0x7F, //           Logical Maximum (127)
    0x75, 0x08, //           Report Size (8)
    0x95, 0x02, //           Report Count (2)
    0x81, 0x06, //           Input (Data, Var, Rel)
    0xC0, //               End Collection
    0xC0, //             End Collection
];

/// Two-button relative mouse with a vertical wheel: buttons, X, Y, wheel.
pub const MOUSE_WHEEL_REPORT_MAP: &[u8] = &[
    0x05, 0x01, //       Usage Page (Generic Desktop)
    0x09, 0x02, //       Usage (Mouse)
    0xA1, 0x01, //       Collection (Application)
    0x85, MOUSE_REPORT_ID, //   Report ID (2)
    0x09, 0x01, //         Usage (Pointer)
    0xA1, 0x00, //         Collection (Physical)
    0x05, 0x09, //           Usage Page (Button)
    0x19, 0x01, //           Usage Minimum (Button 1)
    0x29, 0x02, //           Usage Maximum (Button 2)
    0x15, 0x00, //           Logical Minimum (0)
    0x25, 0x01, //           Logical Maximum (1)
    0x75, 0x01, //           Report Size (1)
    0x95, 0x02, //           Report Count (2)
    0x81, 0x02, //           Input (Data, Var, Abs)      buttons
    0x95, 0x06, //           Report Count (6)
    0x81, 0x03, //           Input (Const, Var, Abs)     padding
    0x05, 0x01, //           Usage Page (Generic Desktop)
    0x09, 0x30, //           Usage (X)
    0x09, 0x31, //           Usage (Y)
    0x09, 0x38, //           Usage (Wheel)
    0x15, 0x81, //           Logical Minimum (-127)
    0x25, 0x7F, //           Logical Maximum (127)
    0x75, 0x08, //           Report Size (8)
    0x95, 0x03, //           Report Count (3)
    0x81, 0x06, //           Input (Data, Var, Rel)
    0xC0, //               End Collection
    0xC0, //             End Collection
];

// ── Device profile ────────────────────────────────────────────────────────────

/// The two kinds of virtual device the emulator can expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceProfile {
    Keyboard,
    Mouse(PointerProfile),
}

impl DeviceProfile {
    /// Short lowercase name used in log lines.
    pub fn name(self) -> &'static str {
        match self {
            DeviceProfile::Keyboard => "keyboard",
            DeviceProfile::Mouse(_) => "mouse",
        }
    }

    /// Report id announced in the Report Reference descriptor.
    pub fn report_id(self) -> u8 {
        match self {
            DeviceProfile::Keyboard => KEYBOARD_REPORT_ID,
            DeviceProfile::Mouse(_) => MOUSE_REPORT_ID,
        }
    }

    /// Value of the Report Reference descriptor: `[report id, report type]`.
    pub fn report_reference(self) -> [u8; 2] {
        [self.report_id(), REPORT_TYPE_INPUT]
    }

    /// The static report map for this profile.
    pub fn report_map(self) -> &'static [u8] {
        match self {
            DeviceProfile::Keyboard => KEYBOARD_REPORT_MAP,
            DeviceProfile::Mouse(PointerProfile::Basic) => MOUSE_REPORT_MAP,
            DeviceProfile::Mouse(PointerProfile::Wheel) => MOUSE_WHEEL_REPORT_MAP,
        }
    }

    /// Size in bytes of one input report (excluding the report id).
    pub fn input_report_len(self) -> usize {
        match self {
            DeviceProfile::Keyboard => KEYBOARD_REPORT_SIZE,
            DeviceProfile::Mouse(pointer) => pointer.report_len(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
