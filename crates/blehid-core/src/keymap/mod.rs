//! USB HID usage tables for the keyboard profile.
//!
//! The canonical key representation everywhere in the emulator is the raw
//! HID Usage ID byte from the Keyboard/Keypad page (0x07).  The controller
//! sends these bytes directly, so no platform translation is needed.

pub mod usage;

pub use usage::{is_modifier, modifier_flag, Modifier};
