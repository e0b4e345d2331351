//! USB HID Usage IDs (page 0x07, Keyboard/Keypad page) and the modifier bit table.
//!
//! Reference: USB HID Usage Tables 1.3, Section 10 (Keyboard/Keypad page 0x07).
//!
//! # What is a HID Usage ID? (for beginners)
//!
//! The **USB Human Interface Device (HID)** standard assigns a unique number to
//! every key on a keyboard.  These numbers are called *Usage IDs*.  For example:
//!
//! | Key          | HID Usage ID |
//! |--------------|-------------|
//! | Letter A     | 0x04        |
//! | Letter B     | 0x05        |
//! | Digit 1      | 0x1E        |
//! | Enter        | 0x28        |
//! | Left Ctrl    | 0xE0        |
//!
//! # Modifier keys
//!
//! The eight modifier keys (0xE0–0xE7) are special: the keyboard report does
//! not list them in its six key slots.  Instead each one owns a single bit of
//! the report's first byte.  Left Ctrl is bit 0, Left Shift bit 1, and so on
//! up to Right GUI at bit 7.

/// Letter A.
pub const KEY_A: u8 = 0x04;
/// Letter B.
pub const KEY_B: u8 = 0x05;
/// Digit 1 / `!`.
pub const KEY_1: u8 = 0x1E;
/// Enter / Return.
pub const KEY_ENTER: u8 = 0x28;

/// The eight modifier keys, in bit order.
///
/// The discriminant of each variant is its HID Usage ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Modifier {
    LeftCtrl = 0xE0,
    LeftShift = 0xE1,
    LeftAlt = 0xE2,
    LeftGui = 0xE3,
    RightCtrl = 0xE4,
    RightShift = 0xE5,
    RightAlt = 0xE6,
    RightGui = 0xE7,
}

impl Modifier {
    /// All modifiers ordered by their bit position in the report.
    pub const ALL: [Modifier; 8] = [
        Modifier::LeftCtrl,
        Modifier::LeftShift,
        Modifier::LeftAlt,
        Modifier::LeftGui,
        Modifier::RightCtrl,
        Modifier::RightShift,
        Modifier::RightAlt,
        Modifier::RightGui,
    ];

    /// Returns the modifier for `usage`, or `None` for any non-modifier usage.
    pub fn from_usage(usage: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|m| *m as u8 == usage)
    }

    /// Returns the HID Usage ID of this modifier.
    pub fn usage(self) -> u8 {
        self as u8
    }

    /// Returns the single bit this modifier occupies in report byte 0.
    pub fn flag(self) -> u8 {
        1 << (self as u8 - Modifier::LeftCtrl as u8)
    }
}

/// Returns `true` if `usage` is one of the eight modifier keys (0xE0–0xE7).
pub fn is_modifier(usage: u8) -> bool {
    Modifier::from_usage(usage).is_some()
}

/// Returns the modifier bit for `usage`, or `0` if it is not a modifier.
///
/// ```rust
/// use blehid_core::keymap::modifier_flag;
///
/// assert_eq!(modifier_flag(0xE1), 0b0000_0010); // Left Shift
/// assert_eq!(modifier_flag(0x04), 0);           // Letter A
/// ```
pub fn modifier_flag(usage: u8) -> u8 {
    Modifier::from_usage(usage).map_or(0, Modifier::flag)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
