//! Pointer (mouse) report state and the HID pointer input report.
//!
//! Layout:
//! ```text
//! Byte 0: Buttons (bit 0 = left, bit 1 = right, bits 2-7 = 0)
//! Byte 1: X delta, signed, clamped to [-127, 127]
//! Byte 2: Y delta, signed, clamped to [-127, 127]
//! Byte 3: Wheel delta, signed, clamped to [-127, 127]  (wheel profile only)
//! ```
//!
//! Motion is relative and transient: a move produces one report and leaves no
//! trace.  Buttons are latched: once pressed, every later report (including
//! pure moves) re-asserts the button until it is released.

use serde::{Deserialize, Serialize};

/// Largest magnitude a single delta byte can carry.
pub const MAX_DELTA: i32 = 127;

/// Shape of the pointer report, selected per device at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerProfile {
    /// Buttons + X + Y (3 bytes).
    #[default]
    Basic,
    /// Buttons + X + Y + wheel (4 bytes).
    Wheel,
}

impl PointerProfile {
    /// Number of bytes in one report of this profile.
    pub fn report_len(self) -> usize {
        match self {
            PointerProfile::Basic => 3,
            PointerProfile::Wheel => 4,
        }
    }
}

/// A pointer button that can be latched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerButton {
    Left,
    Right,
}

impl PointerButton {
    fn flag(self) -> u8 {
        match self {
            PointerButton::Left => 1 << 0,
            PointerButton::Right => 1 << 1,
        }
    }
}

/// Latched button state of one virtual mouse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PointerReportState {
    profile: PointerProfile,
    left_down: bool,
    right_down: bool,
}

impl PointerReportState {
    /// Creates a state with both buttons up.
    pub fn new(profile: PointerProfile) -> Self {
        Self {
            profile,
            left_down: false,
            right_down: false,
        }
    }

    /// The report shape this state encodes to.
    pub fn profile(&self) -> PointerProfile {
        self.profile
    }

    /// Returns the latched `(left, right)` button state.
    pub fn buttons(&self) -> (bool, bool) {
        (self.left_down, self.right_down)
    }

    /// Replaces the latched button state.
    pub fn set_buttons(&mut self, left: bool, right: bool) {
        self.left_down = left;
        self.right_down = right;
    }

    /// Latches `button` down and returns the report announcing it.
    pub fn press(&mut self, button: PointerButton) -> Vec<u8> {
        self.set_button(button, true);
        self.encode_current(0, 0, 0)
    }

    /// Releases `button` and returns the report announcing it.
    pub fn release(&mut self, button: PointerButton) -> Vec<u8> {
        self.set_button(button, false);
        self.encode_current(0, 0, 0)
    }

    /// Releases both buttons and returns the report announcing it.
    pub fn release_all(&mut self) -> Vec<u8> {
        self.set_buttons(false, false);
        self.encode_current(0, 0, 0)
    }

    /// Returns the press and release reports of a click on `button`.
    ///
    /// The two reports must be sent with a real time gap between them; the
    /// caller owns that delay.  Afterwards `button` is latched up.
    pub fn click(&mut self, button: PointerButton) -> [Vec<u8>; 2] {
        let down = self.press(button);
        let up = self.release(button);
        [down, up]
    }

    /// Returns a report carrying the given motion and the latched buttons.
    ///
    /// Button state is not changed.
    pub fn move_by(&self, dx: i32, dy: i32, wheel: i32) -> Vec<u8> {
        self.encode_current(dx, dy, wheel)
    }

    fn set_button(&mut self, button: PointerButton, down: bool) {
        match button {
            PointerButton::Left => self.left_down = down,
            PointerButton::Right => self.right_down = down,
        }
    }

    fn encode_current(&self, dx: i32, dy: i32, wheel: i32) -> Vec<u8> {
        encode(self.profile, self.left_down, self.right_down, dx, dy, wheel)
    }
}

/// Encodes one pointer report.
///
/// Deltas are clamped into `[-127, 127]` before being written as two's
/// complement bytes; they never wrap.  The wheel delta is dropped for the
/// [`PointerProfile::Basic`] profile.
///
/// ```rust
/// use blehid_core::report::pointer::{encode, PointerProfile};
///
/// assert_eq!(encode(PointerProfile::Basic, true, false, -10, 500, 0), vec![0x01, 0xF6, 0x7F]);
/// ```
pub fn encode(
    profile: PointerProfile,
    left: bool,
    right: bool,
    dx: i32,
    dy: i32,
    wheel: i32,
) -> Vec<u8> {
    let mut buttons = 0u8;
    if left {
        buttons |= PointerButton::Left.flag();
    }
    if right {
        buttons |= PointerButton::Right.flag();
    }

    let mut report = Vec::with_capacity(profile.report_len());
    report.push(buttons);
    report.push(clamp_delta(dx));
    report.push(clamp_delta(dy));
    if profile == PointerProfile::Wheel {
        report.push(clamp_delta(wheel));
    }
    report
}

fn clamp_delta(value: i32) -> u8 {
    value.clamp(-MAX_DELTA, MAX_DELTA) as i8 as u8
}

// ── Tests ─────────────────────────────────────────────────────────────────────
