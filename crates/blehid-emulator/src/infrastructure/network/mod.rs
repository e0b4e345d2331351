//! Network infrastructure: the local command channel.
//!
//! `CommandProtocolServer` listens on a TCP port (loopback by default) and
//! serves exactly one controller connection at a time:
//!
//! ```text
//!  Listening ──accept──► Connected ──EOF / truncated frame──► Listening
//!                            │
//!                            └──malformed command / I/O error──► Listening
//! ```
//!
//! Each connection is a strict request/response loop: read one frame, hand
//! its text to the [`CommandDispatcher`], write the response frames, repeat.
//! Commands are never executed in parallel.
//!
//! Closing a connection discards only that connection's buffers.  Device
//! state (held keys and buttons) survives and is visible to the next
//! controller.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use blehid_core::protocol::frame::{body_len, decode_body, encode_frame, FrameError, FRAME_HEADER_SIZE};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::application::dispatch::{CommandDispatcher, DispatchError};

/// Errors that can occur in the command server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listening socket could not be bound.
    #[error("failed to bind command server to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// An I/O error on an established connection.
    #[error("connection I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A frame violated the framing rules.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// The command inside a frame could not be handled.
    #[error("dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
}

// ── Framing over async streams ────────────────────────────────────────────────

/// Reads one frame body from `reader`.
///
/// Returns `Ok(None)` when the stream ends, including in the middle of a
/// header or body; the peer is treated as having disconnected.
///
/// # Errors
///
/// [`ServerError::Frame`] if the declared length exceeds `max_len` or the body
/// is not ASCII; [`ServerError::Io`] for other read failures.
pub async fn read_frame<R>(reader: &mut R, max_len: usize) -> Result<Option<String>, ServerError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; FRAME_HEADER_SIZE];
    if !read_exact_or_eof(reader, &mut header).await? {
        return Ok(None);
    }
    let len = body_len(header, max_len)?;

    let mut body = vec![0u8; len];
    if !read_exact_or_eof(reader, &mut body).await? {
        debug!("peer closed mid-frame ({len} byte body expected)");
        return Ok(None);
    }
    Ok(Some(decode_body(&body)?))
}

/// Writes `text` as one frame and flushes.
///
/// # Errors
///
/// [`ServerError::Frame`] if `text` is not ASCII; [`ServerError::Io`] if the
/// write fails.
pub async fn write_frame<W>(writer: &mut W, text: &str) -> Result<(), ServerError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&encode_frame(text)?).await?;
    writer.flush().await?;
    Ok(())
}

/// `read_exact` that reports end-of-stream as `Ok(false)` instead of an error.
async fn read_exact_or_eof<R>(reader: &mut R, buf: &mut [u8]) -> Result<bool, std::io::Error>
where
    R: AsyncRead + Unpin,
{
    match reader.read_exact(buf).await {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e),
    }
}

/// First delay after a failed `accept`.
pub const ACCEPT_RETRY_MIN: Duration = Duration::from_millis(50);

/// Longest delay between `accept` retries.
pub const ACCEPT_RETRY_MAX: Duration = Duration::from_secs(1);

// ── Server ────────────────────────────────────────────────────────────────────

/// Serves the framed command protocol to one controller at a time.
pub struct CommandProtocolServer {
    listener: TcpListener,
    dispatcher: Arc<CommandDispatcher>,
    max_frame_len: usize,
}

impl CommandProtocolServer {
    /// Binds the listening socket.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the address is unavailable.
    pub async fn bind(
        addr: &str,
        dispatcher: Arc<CommandDispatcher>,
        max_frame_len: usize,
    ) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        Ok(Self {
            listener,
            dispatcher,
            max_frame_len,
        })
    }

    /// The address actually bound (useful with port 0).
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Io`] if the socket has no local address.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts and serves connections forever, one at a time.
    ///
    /// A failing connection is logged and closed; the server keeps listening.
    pub async fn run(&self) {
        if let Ok(addr) = self.listener.local_addr() {
            info!("command server listening on {addr}");
        }
        let mut retry_delay = None;
        loop {
            let (stream, peer) = match self.listener.accept().await {
                Ok(accepted) => {
                    retry_delay = None;
                    accepted
                }
                Err(e) => {
                    // Errors such as EMFILE repeat until something is closed.
                    let delay = next_accept_delay(retry_delay);
                    warn!("accept failed, retrying in {delay:?}: {e}");
                    retry_delay = Some(delay);
                    tokio::time::sleep(delay).await;
                    continue;
                }
            };
            info!("controller connected from {peer}");

            match serve_connection(stream, &self.dispatcher, self.max_frame_len).await {
                Ok(()) => info!("controller {peer} disconnected"),
                Err(e) => warn!("controller {peer} dropped: {e}"),
            }
        }
    }
}

/// Backoff after a failed `accept`: starts at [`ACCEPT_RETRY_MIN`] and
/// doubles up to [`ACCEPT_RETRY_MAX`].
fn next_accept_delay(previous: Option<Duration>) -> Duration {
    match previous {
        None => ACCEPT_RETRY_MIN,
        Some(delay) => (delay * 2).min(ACCEPT_RETRY_MAX),
    }
}

/// Runs the request/response loop on one connection until it closes.
///
/// # Errors
///
/// Any [`ServerError`] ends the connection.  A clean or mid-frame EOF is
/// `Ok(())`.
pub async fn serve_connection<S>(
    mut stream: S,
    dispatcher: &CommandDispatcher,
    max_frame_len: usize,
) -> Result<(), ServerError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    while let Some(text) = read_frame(&mut stream, max_frame_len).await? {
        debug!("command frame {text:?}");
        for response in dispatcher.dispatch(&text).await? {
            write_frame(&mut stream, &response).await?;
        }
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
