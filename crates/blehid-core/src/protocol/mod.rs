//! Protocol module containing the command-channel framing and the `AT+`
//! command grammar.

pub mod command;
pub mod frame;

pub use command::{parse_command, ButtonAction, Command, CommandError, OK_RESPONSE};
pub use frame::{decode_frame, encode_frame, FrameError, DEFAULT_MAX_FRAME_LEN, FRAME_HEADER_SIZE};
