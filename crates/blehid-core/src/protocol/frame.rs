//! Length-prefixed ASCII framing for the local command channel.
//!
//! Wire format:
//! ```text
//! [len:4][text:len]
//! ```
//! `len` is an unsigned 32-bit little-endian integer.  The text is plain
//! ASCII and is not NUL-terminated.  Requests and responses use the same
//! framing.

use thiserror::Error;

/// Size of the length prefix in bytes.
pub const FRAME_HEADER_SIZE: usize = 4;

/// Upper bound on an inbound frame body unless the configuration says
/// otherwise.  Real commands are a few dozen bytes.
pub const DEFAULT_MAX_FRAME_LEN: usize = 4096;

/// Errors produced while encoding or decoding a frame.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    /// The declared (or requested) body length exceeds the allowed maximum.
    #[error("frame too large: {len} bytes exceeds limit of {max}")]
    FrameTooLarge { len: usize, max: usize },

    /// The body contains a byte outside the 7-bit ASCII range.
    #[error("frame body is not ASCII: byte 0x{byte:02X} at offset {offset}")]
    InvalidEncoding { byte: u8, offset: usize },
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes `text` as one frame.
///
/// # Errors
///
/// Returns [`FrameError::InvalidEncoding`] if `text` is not ASCII, or
/// [`FrameError::FrameTooLarge`] if it does not fit a 32-bit length.
///
/// # Examples
///
/// ```rust
/// use blehid_core::protocol::encode_frame;
///
/// let bytes = encode_frame("OK\n").unwrap();
/// assert_eq!(bytes, vec![3, 0, 0, 0, b'O', b'K', b'\n']);
/// ```
pub fn encode_frame(text: &str) -> Result<Vec<u8>, FrameError> {
    check_ascii(text.as_bytes())?;
    let len = u32::try_from(text.len()).map_err(|_| FrameError::FrameTooLarge {
        len: text.len(),
        max: u32::MAX as usize,
    })?;

    let mut buf = Vec::with_capacity(FRAME_HEADER_SIZE + text.len());
    buf.extend_from_slice(&len.to_le_bytes());
    buf.extend_from_slice(text.as_bytes());
    Ok(buf)
}

/// Reads the body length out of a frame header, enforcing `max_len`.
///
/// # Errors
///
/// Returns [`FrameError::FrameTooLarge`] if the declared length exceeds
/// `max_len`.
pub fn body_len(header: [u8; FRAME_HEADER_SIZE], max_len: usize) -> Result<usize, FrameError> {
    let len = u32::from_le_bytes(header) as usize;
    if len > max_len {
        return Err(FrameError::FrameTooLarge { len, max: max_len });
    }
    Ok(len)
}

/// Converts a frame body into text.
///
/// # Errors
///
/// Returns [`FrameError::InvalidEncoding`] on the first non-ASCII byte.
pub fn decode_body(body: &[u8]) -> Result<String, FrameError> {
    check_ascii(body)?;
    // All bytes are ASCII, so this cannot fail; the lossy form avoids a
    // second error path.
    Ok(String::from_utf8_lossy(body).into_owned())
}

/// Decodes one frame from the start of `bytes`.
///
/// Returns `Ok(None)` when `bytes` does not yet hold a complete frame, or
/// `Ok(Some((text, consumed)))` so the caller can advance its read cursor.
///
/// # Errors
///
/// Returns [`FrameError`] if the declared length exceeds `max_len` or the
/// body is not ASCII.
///
/// # Examples
///
/// ```rust
/// use blehid_core::protocol::{decode_frame, encode_frame, DEFAULT_MAX_FRAME_LEN};
///
/// let bytes = encode_frame("AT+BLEHIDMOUSEMOVE=1,2").unwrap();
/// let (text, n) = decode_frame(&bytes, DEFAULT_MAX_FRAME_LEN).unwrap().unwrap();
/// assert_eq!(text, "AT+BLEHIDMOUSEMOVE=1,2");
/// assert_eq!(n, bytes.len());
///
/// // A truncated frame is simply "not ready yet".
/// assert!(decode_frame(&bytes[..6], DEFAULT_MAX_FRAME_LEN).unwrap().is_none());
/// ```
pub fn decode_frame(bytes: &[u8], max_len: usize) -> Result<Option<(String, usize)>, FrameError> {
    let Some(header) = bytes.get(..FRAME_HEADER_SIZE) else {
        return Ok(None);
    };
    let mut raw = [0u8; FRAME_HEADER_SIZE];
    raw.copy_from_slice(header);
    let len = body_len(raw, max_len)?;

    let end = FRAME_HEADER_SIZE + len;
    let Some(body) = bytes.get(FRAME_HEADER_SIZE..end) else {
        return Ok(None);
    };
    Ok(Some((decode_body(body)?, end)))
}

// ── Private helpers ───────────────────────────────────────────────────────────

fn check_ascii(bytes: &[u8]) -> Result<(), FrameError> {
    match bytes.iter().position(|b| !b.is_ascii()) {
        Some(offset) => Err(FrameError::InvalidEncoding {
            byte: bytes[offset],
            offset,
        }),
        None => Ok(()),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
