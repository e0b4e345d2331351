//! CommandDispatcher: turns one command frame into session calls and a reply.
//!
//! The dispatcher is the only code that knows what each `AT+` command means.
//! It parses the frame text, routes the command to the keyboard or mouse
//! session, and returns the response frames to write back, one frame body
//! per `String`.
//!
//! # Which failures reach the controller?
//!
//! Almost none.  Unknown commands, reports with nobody subscribed, a disabled
//! device, and a wrongly-sized raw report are all answered with `OK\n` and
//! logged.  Only *malformed arguments* to a known command produce a
//! [`DispatchError`]; the server then drops the connection.

use std::sync::Arc;

use blehid_core::protocol::command::{parse_command, ButtonAction, Command, CommandError, OK_RESPONSE};
use thiserror::Error;
use tracing::{debug, warn};

use crate::application::session::{KeyboardSession, MouseSession};

/// Error type for command dispatch.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    /// A recognised command carried arguments that do not parse.
    #[error(transparent)]
    Malformed(#[from] CommandError),
}

/// Routes parsed commands to the device sessions.
pub struct CommandDispatcher {
    device_name: String,
    keyboard: Option<Arc<KeyboardSession>>,
    mouse: Option<Arc<MouseSession>>,
}

impl CommandDispatcher {
    /// Creates a dispatcher.  A `None` session means that device is disabled;
    /// commands for it are acknowledged and ignored.
    pub fn new(
        device_name: impl Into<String>,
        keyboard: Option<Arc<KeyboardSession>>,
        mouse: Option<Arc<MouseSession>>,
    ) -> Self {
        Self {
            device_name: device_name.into(),
            keyboard,
            mouse,
        }
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Handles one frame body and returns the response frame bodies.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Malformed`] if a recognised command has
    /// unparsable arguments.  No state is changed in that case.
    pub async fn dispatch(&self, text: &str) -> Result<Vec<String>, DispatchError> {
        let command = parse_command(text)?;
        debug!("dispatching {command:?}");
        Ok(self.execute(command).await)
    }

    /// Runs an already-parsed command.
    pub async fn execute(&self, command: Command) -> Vec<String> {
        match command {
            Command::QueryDeviceName => {
                return vec![format!("{}\n", self.device_name), OK_RESPONSE.to_string()];
            }

            Command::MouseMove { dx, dy, wheel } => {
                if let Some(mouse) = self.mouse_or_log() {
                    mouse.move_pointer(dx, dy, wheel);
                }
            }

            Command::MouseButton { button, action } => {
                if let Some(mouse) = self.mouse_or_log() {
                    match (button, action) {
                        (Some(b), ButtonAction::Press) => {
                            mouse.press_button(b);
                        }
                        (Some(b), ButtonAction::Click) => {
                            mouse.click(b).await;
                        }
                        (Some(b), ButtonAction::Release) => {
                            mouse.release_button(b);
                        }
                        (None, _) => {
                            mouse.release_buttons();
                        }
                    }
                }
            }

            Command::KeyboardRawReport { bytes } => {
                if let Some(keyboard) = self.keyboard_or_log() {
                    if let Err(e) = keyboard.send_raw_report(&bytes) {
                        warn!("raw keyboard report rejected: {e}");
                    }
                }
            }

            Command::KeyDown { usage } => {
                if let Some(keyboard) = self.keyboard_or_log() {
                    keyboard.press_key(usage);
                }
            }

            Command::KeyUp { usage } => {
                if let Some(keyboard) = self.keyboard_or_log() {
                    keyboard.release_key(usage);
                }
            }

            Command::Unknown { raw } => {
                // Acknowledged so the controller does not stall waiting for a reply.
                debug!("unknown command {raw:?} acknowledged");
            }
        }
        vec![OK_RESPONSE.to_string()]
    }

    fn keyboard_or_log(&self) -> Option<&KeyboardSession> {
        if self.keyboard.is_none() {
            debug!("keyboard disabled; command ignored");
        }
        self.keyboard.as_deref()
    }

    fn mouse_or_log(&self) -> Option<&MouseSession> {
        if self.mouse.is_none() {
            debug!("mouse disabled; command ignored");
        }
        self.mouse.as_deref()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
