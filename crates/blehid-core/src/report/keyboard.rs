//! Keyboard report state and the 8-byte HID keyboard input report.
//!
//! Layout (8 bytes):
//! ```text
//! Byte 0:   Modifier keys (bitfield)
//!           Bit 0 = Left Ctrl,  Bit 1 = Left Shift,
//!           Bit 2 = Left Alt,   Bit 3 = Left GUI,
//!           Bit 4 = Right Ctrl, Bit 5 = Right Shift,
//!           Bit 6 = Right Alt,  Bit 7 = Right GUI
//! Byte 1:   Reserved (0x00)
//! Byte 2-7: Up to 6 simultaneous non-modifier usage codes, zero padded
//! ```
//!
//! The report is never cached: [`KeyboardReportState::encode`] rebuilds it
//! from the depressed-key sets every time, and every state change is sent
//! even if the resulting bytes equal the previous report.

use std::collections::BTreeSet;

use thiserror::Error;
use tracing::warn;

use crate::keymap::usage::{is_modifier, modifier_flag};

/// Keyboard report size in bytes.
pub const KEYBOARD_REPORT_SIZE: usize = 8;

/// Number of non-modifier key slots in the report.
pub const KEY_SLOTS: usize = 6;

/// Errors raised while building a report.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReportError {
    /// A caller-supplied report does not have the size the profile requires.
    #[error("invalid report size: expected {expected} bytes, got {actual}")]
    InvalidReportSize { expected: usize, actual: usize },
}

/// Currently depressed keys of one virtual keyboard.
///
/// Modifiers and ordinary keys are tracked in two separate sets.  A usage
/// code is classified once by [`is_modifier`], so it can never be a member
/// of both sets.
///
/// Ordinary keys keep their press order: when more than six are held, the
/// six pressed earliest are the ones that appear in the report.  The others
/// are still tracked and can be released normally.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyboardReportState {
    modifiers: BTreeSet<u8>,
    keys: Vec<u8>,
}

impl KeyboardReportState {
    /// Creates a state with nothing pressed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `usage` as pressed.
    ///
    /// Pressing a key that is already down leaves the sets unchanged.  Usage
    /// 0x00 means "no key" and is never tracked.
    pub fn press(&mut self, usage: u8) {
        if usage == 0 {
            return;
        }
        if is_modifier(usage) {
            self.modifiers.insert(usage);
        } else if !self.keys.contains(&usage) {
            self.keys.push(usage);
        }
    }

    /// Marks `usage` as released.  Releasing a key that is not down is a no-op.
    pub fn release(&mut self, usage: u8) {
        if is_modifier(usage) {
            self.modifiers.remove(&usage);
        } else {
            self.keys.retain(|k| *k != usage);
        }
    }

    /// Releases every key and modifier.
    pub fn clear(&mut self) {
        self.modifiers.clear();
        self.keys.clear();
    }

    /// Returns `true` if `usage` is currently held.
    pub fn is_pressed(&self, usage: u8) -> bool {
        self.modifiers.contains(&usage) || self.keys.contains(&usage)
    }

    /// Depressed modifier usages, ascending.
    pub fn depressed_modifiers(&self) -> impl Iterator<Item = u8> + '_ {
        self.modifiers.iter().copied()
    }

    /// Depressed non-modifier usages, in press order.
    pub fn depressed_keys(&self) -> &[u8] {
        &self.keys
    }

    /// Encodes the current state into an 8-byte keyboard input report.
    ///
    /// If more than [`KEY_SLOTS`] ordinary keys are held, the extra keys are
    /// left out of the report and a warning is logged.
    pub fn encode(&self) -> [u8; KEYBOARD_REPORT_SIZE] {
        let mut report = [0u8; KEYBOARD_REPORT_SIZE];

        report[0] = self
            .modifiers
            .iter()
            .fold(0u8, |acc, usage| acc | modifier_flag(*usage));

        if self.keys.len() > KEY_SLOTS {
            warn!(
                "{} keys depressed, only {KEY_SLOTS} fit into the keyboard report; truncating",
                self.keys.len()
            );
        }
        for (slot, usage) in report[2..].iter_mut().zip(&self.keys) {
            *slot = *usage;
        }

        report
    }

    /// Validates a caller-supplied report for verbatim transmission.
    ///
    /// The tracked key sets are neither read nor modified.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::InvalidReportSize`] unless `bytes` is exactly
    /// [`KEYBOARD_REPORT_SIZE`] long.
    pub fn direct_set(bytes: &[u8]) -> Result<[u8; KEYBOARD_REPORT_SIZE], ReportError> {
        bytes
            .try_into()
            .map_err(|_| ReportError::InvalidReportSize {
                expected: KEYBOARD_REPORT_SIZE,
                actual: bytes.len(),
            })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
