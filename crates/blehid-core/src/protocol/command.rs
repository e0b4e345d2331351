//! The `AT+` command grammar carried inside command-channel frames.
//!
//! The grammar is a small fixed set of prefixes:
//!
//! | Frame text                            | Parsed as                      |
//! |---------------------------------------|--------------------------------|
//! | `AT+BLECURRENTDEVICENAME\r\n`         | [`Command::QueryDeviceName`]   |
//! | `AT+BLEHIDMOUSEMOVE=dx,dy[,wheel]`    | [`Command::MouseMove`]         |
//! | `AT+BLEHIDMOUSEBUTTON=l,press`        | [`Command::MouseButton`]       |
//! | `AT+BLEHIDMOUSEBUTTON=r,click`        | [`Command::MouseButton`]       |
//! | `AT+BLEHIDMOUSEBUTTON=0`              | [`Command::MouseButton`] (release all) |
//! | `AT+BLEKEYBOARDCODE=hh-hh-...`        | [`Command::KeyboardRawReport`] |
//! | `AT+BLEKEYBOARDKEYDOWN=hh`            | [`Command::KeyDown`]           |
//! | `AT+BLEKEYBOARDKEYUP=hh`              | [`Command::KeyUp`]             |
//! | anything else                         | [`Command::Unknown`]           |
//!
//! The device-name query is matched byte-for-byte, including its `\r\n`.
//! For every other prefix trailing whitespace (usually `\r\n`) is ignored.
//!
//! # Unknown versus malformed
//!
//! Text that does not start with a known prefix is *unknown* and is still
//! acknowledged by the dispatcher.  Text that starts with a known prefix but
//! carries arguments that do not parse is *malformed* and produces a
//! [`CommandError`], because it means the controller speaks a different
//! protocol version than we do.

use thiserror::Error;

use crate::report::keyboard::KEYBOARD_REPORT_SIZE;
pub use crate::report::pointer::PointerButton;

/// Acknowledgement sent for every successfully handled command.
pub const OK_RESPONSE: &str = "OK\n";

/// The device-name query, matched exactly.
pub const DEVICE_NAME_QUERY: &str = "AT+BLECURRENTDEVICENAME\r\n";

const MOUSE_MOVE: &str = "AT+BLEHIDMOUSEMOVE=";
const MOUSE_BUTTON: &str = "AT+BLEHIDMOUSEBUTTON=";
const KEYBOARD_CODE: &str = "AT+BLEKEYBOARDCODE=";
const KEYBOARD_KEY_DOWN: &str = "AT+BLEKEYBOARDKEYDOWN=";
const KEYBOARD_KEY_UP: &str = "AT+BLEKEYBOARDKEYUP=";

/// Errors produced while parsing a recognised command's arguments.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    /// The command prefix was recognised but its arguments were not.
    #[error("malformed arguments for {command}: {detail}")]
    MalformedArguments {
        command: &'static str,
        detail: String,
    },
}

impl CommandError {
    fn malformed(command: &'static str, detail: impl Into<String>) -> Self {
        CommandError::MalformedArguments {
            command,
            detail: detail.into(),
        }
    }
}

/// What to do with a pointer button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonAction {
    /// Latch the button down.
    Press,
    /// Press, wait briefly, then release.
    Click,
    /// Release the button (or every button when no button is named).
    Release,
}

/// One parsed command frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Ask for the advertised device name.
    QueryDeviceName,

    /// Relative pointer motion.  Values are clamped when encoded, not here.
    MouseMove { dx: i32, dy: i32, wheel: i32 },

    /// A button change.  `button` is `None` only for "release all".
    MouseButton {
        button: Option<PointerButton>,
        action: ButtonAction,
    },

    /// A caller-encoded keyboard report.  Shorter inputs are zero-padded to
    /// eight bytes; longer inputs are kept as-is so the session can reject
    /// them.
    KeyboardRawReport { bytes: Vec<u8> },

    /// Press a single key by HID usage.
    KeyDown { usage: u8 },

    /// Release a single key by HID usage.
    KeyUp { usage: u8 },

    /// Anything else.  Acknowledged but otherwise ignored.
    Unknown { raw: String },
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Parses one frame body into a [`Command`].
///
/// # Errors
///
/// Returns [`CommandError::MalformedArguments`] when the text starts with a
/// known prefix but its arguments are missing, non-numeric, or of the wrong
/// arity.
///
/// # Examples
///
/// ```rust
/// use blehid_core::protocol::command::{parse_command, Command};
///
/// let cmd = parse_command("AT+BLEHIDMOUSEMOVE=-10,-10\r\n").unwrap();
/// assert_eq!(cmd, Command::MouseMove { dx: -10, dy: -10, wheel: 0 });
///
/// let cmd = parse_command("AT+SOMETHINGELSE").unwrap();
/// assert!(matches!(cmd, Command::Unknown { .. }));
/// ```
pub fn parse_command(text: &str) -> Result<Command, CommandError> {
    if text == DEVICE_NAME_QUERY {
        return Ok(Command::QueryDeviceName);
    }

    let line = text.trim_end();

    if let Some(args) = line.strip_prefix(MOUSE_MOVE) {
        parse_mouse_move(args)
    } else if let Some(args) = line.strip_prefix(MOUSE_BUTTON) {
        parse_mouse_button(args)
    } else if let Some(args) = line.strip_prefix(KEYBOARD_CODE) {
        parse_keyboard_code(args)
    } else if let Some(args) = line.strip_prefix(KEYBOARD_KEY_DOWN) {
        parse_hex_byte(KEYBOARD_KEY_DOWN, args).map(|usage| Command::KeyDown { usage })
    } else if let Some(args) = line.strip_prefix(KEYBOARD_KEY_UP) {
        parse_hex_byte(KEYBOARD_KEY_UP, args).map(|usage| Command::KeyUp { usage })
    } else {
        Ok(Command::Unknown {
            raw: text.to_string(),
        })
    }
}

// ── Argument parsers ──────────────────────────────────────────────────────────

fn parse_mouse_move(args: &str) -> Result<Command, CommandError> {
    let values = args
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<i32>()
                .map_err(|e| CommandError::malformed(MOUSE_MOVE, format!("{part:?}: {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    match values[..] {
        [dx, dy] => Ok(Command::MouseMove { dx, dy, wheel: 0 }),
        [dx, dy, wheel] => Ok(Command::MouseMove { dx, dy, wheel }),
        _ => Err(CommandError::malformed(
            MOUSE_MOVE,
            format!("expected 2 or 3 values, got {}", values.len()),
        )),
    }
}

fn parse_mouse_button(args: &str) -> Result<Command, CommandError> {
    if args == "0" {
        return Ok(Command::MouseButton {
            button: None,
            action: ButtonAction::Release,
        });
    }

    let Some((button, action)) = args.split_once(',') else {
        return Err(CommandError::malformed(
            MOUSE_BUTTON,
            format!("expected `button,action` or `0`, got {args:?}"),
        ));
    };

    let button = match button {
        "l" => PointerButton::Left,
        "r" => PointerButton::Right,
        other => {
            return Err(CommandError::malformed(
                MOUSE_BUTTON,
                format!("unknown button {other:?}"),
            ))
        }
    };
    let action = match action {
        "press" => ButtonAction::Press,
        "click" => ButtonAction::Click,
        "release" => ButtonAction::Release,
        other => {
            return Err(CommandError::malformed(
                MOUSE_BUTTON,
                format!("unknown action {other:?}"),
            ))
        }
    };

    Ok(Command::MouseButton {
        button: Some(button),
        action,
    })
}

fn parse_keyboard_code(args: &str) -> Result<Command, CommandError> {
    let mut bytes = args
        .split('-')
        .map(|pair| parse_hex_byte(KEYBOARD_CODE, pair))
        .collect::<Result<Vec<_>, _>>()?;

    if bytes.len() < KEYBOARD_REPORT_SIZE {
        bytes.resize(KEYBOARD_REPORT_SIZE, 0);
    }
    Ok(Command::KeyboardRawReport { bytes })
}

/// One or two hex digits.  Signs are rejected even though `from_str_radix`
/// would accept a leading `+`.
fn parse_hex_byte(command: &'static str, text: &str) -> Result<u8, CommandError> {
    let text = text.trim();
    if text.is_empty() || text.len() > 2 || !text.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(CommandError::malformed(
            command,
            format!("expected a hex byte, got {text:?}"),
        ));
    }
    u8::from_str_radix(text, 16)
        .map_err(|e| CommandError::malformed(command, format!("{text:?}: {e}")))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_name_query_requires_exact_text() {
        assert_eq!(
            parse_command("AT+BLECURRENTDEVICENAME\r\n").unwrap(),
            Command::QueryDeviceName
        );
        // Without the line terminator it is not the query.
        assert!(matches!(
            parse_command("AT+BLECURRENTDEVICENAME").unwrap(),
            Command::Unknown { .. }
        ));
    }

    #[test]
    fn test_mouse_move_two_values_defaults_wheel() {
        assert_eq!(
            parse_command("AT+BLEHIDMOUSEMOVE=5,-3\r\n").unwrap(),
            Command::MouseMove { dx: 5, dy: -3, wheel: 0 }
        );
    }

    #[test]
    fn test_mouse_move_three_values() {
        assert_eq!(
            parse_command("AT+BLEHIDMOUSEMOVE=0,0,-2").unwrap(),
            Command::MouseMove { dx: 0, dy: 0, wheel: -2 }
        );
    }

    #[test]
    fn test_mouse_move_out_of_range_values_are_kept_for_clamping() {
        assert_eq!(
            parse_command("AT+BLEHIDMOUSEMOVE=500,-500").unwrap(),
            Command::MouseMove { dx: 500, dy: -500, wheel: 0 }
        );
    }

    #[test]
    fn test_mouse_move_non_numeric_is_malformed() {
        let err = parse_command("AT+BLEHIDMOUSEMOVE=abc,1\r\n").unwrap_err();
        assert!(matches!(err, CommandError::MalformedArguments { command, .. } if command == MOUSE_MOVE));
    }

    #[test]
    fn test_mouse_move_wrong_arity_is_malformed() {
        assert!(parse_command("AT+BLEHIDMOUSEMOVE=1").is_err());
        assert!(parse_command("AT+BLEHIDMOUSEMOVE=1,2,3,4").is_err());
        assert!(parse_command("AT+BLEHIDMOUSEMOVE=").is_err());
    }

    #[test]
    fn test_mouse_button_variants() {
        // Arrange
        let cases = [
            ("AT+BLEHIDMOUSEBUTTON=l,press\r\n", Some(PointerButton::Left), ButtonAction::Press),
            ("AT+BLEHIDMOUSEBUTTON=l,click\r\n", Some(PointerButton::Left), ButtonAction::Click),
            ("AT+BLEHIDMOUSEBUTTON=r,press", Some(PointerButton::Right), ButtonAction::Press),
            ("AT+BLEHIDMOUSEBUTTON=r,click", Some(PointerButton::Right), ButtonAction::Click),
            ("AT+BLEHIDMOUSEBUTTON=l,release", Some(PointerButton::Left), ButtonAction::Release),
            ("AT+BLEHIDMOUSEBUTTON=0\r\n", None, ButtonAction::Release),
        ];

        for (text, button, action) in cases {
            // Act
            let cmd = parse_command(text).unwrap();

            // Assert
            assert_eq!(cmd, Command::MouseButton { button, action }, "{text:?}");
        }
    }

    #[test]
    fn test_mouse_button_unknown_button_is_malformed() {
        assert!(parse_command("AT+BLEHIDMOUSEBUTTON=m,press").is_err());
        assert!(parse_command("AT+BLEHIDMOUSEBUTTON=l,hold").is_err());
        assert!(parse_command("AT+BLEHIDMOUSEBUTTON=1").is_err());
    }

    #[test]
    fn test_keyboard_code_full_report() {
        assert_eq!(
            parse_command("AT+BLEKEYBOARDCODE=05-00-00-00-00-00-00-00\r\n").unwrap(),
            Command::KeyboardRawReport { bytes: vec![0x05, 0, 0, 0, 0, 0, 0, 0] }
        );
    }

    #[test]
    fn test_keyboard_code_short_report_is_zero_padded() {
        assert_eq!(
            parse_command("AT+BLEKEYBOARDCODE=02-00-04").unwrap(),
            Command::KeyboardRawReport { bytes: vec![0x02, 0, 0x04, 0, 0, 0, 0, 0] }
        );
    }

    #[test]
    fn test_keyboard_code_long_report_is_passed_through() {
        let Command::KeyboardRawReport { bytes } =
            parse_command("AT+BLEKEYBOARDCODE=00-00-04-05-06-07-08-09-0A").unwrap()
        else {
            panic!("expected a raw report");
        };
        assert_eq!(bytes.len(), 9);
        assert_eq!(bytes[8], 0x0A);
    }

    #[test]
    fn test_keyboard_code_bad_hex_is_malformed() {
        assert!(parse_command("AT+BLEKEYBOARDCODE=0G-00").is_err());
        assert!(parse_command("AT+BLEKEYBOARDCODE=123-00").is_err());
        assert!(parse_command("AT+BLEKEYBOARDCODE=05--00").is_err());
    }

    #[test]
    fn test_key_down_and_up() {
        assert_eq!(
            parse_command("AT+BLEKEYBOARDKEYDOWN=e1\r\n").unwrap(),
            Command::KeyDown { usage: 0xE1 }
        );
        assert_eq!(
            parse_command("AT+BLEKEYBOARDKEYUP=04").unwrap(),
            Command::KeyUp { usage: 0x04 }
        );
    }

    #[test]
    fn test_unknown_and_empty_frames_are_not_errors() {
        assert_eq!(
            parse_command("").unwrap(),
            Command::Unknown { raw: String::new() }
        );
        assert_eq!(
            parse_command("AT+GMR\r\n").unwrap(),
            Command::Unknown { raw: "AT+GMR\r\n".to_string() }
        );
    }

    #[test]
    fn test_prefix_match_is_case_exact() {
        assert!(matches!(
            parse_command("at+blehidmousemove=1,1").unwrap(),
            Command::Unknown { .. }
        ));
    }

    #[test]
    fn test_signed_hex_bytes_are_malformed() {
        for text in [
            "AT+BLEKEYBOARDKEYDOWN=+F",
            "AT+BLEKEYBOARDKEYUP=-1",
            "AT+BLEKEYBOARDCODE=5-+0",
        ] {
            assert!(
                matches!(parse_command(text), Err(CommandError::MalformedArguments { .. })),
                "{text} must be rejected"
            );
        }
    }

    #[test]
    fn test_single_digit_hex_byte_is_accepted() {
        assert_eq!(
            parse_command("AT+BLEKEYBOARDKEYDOWN=F").unwrap(),
            Command::KeyDown { usage: 0x0F }
        );
    }
}
