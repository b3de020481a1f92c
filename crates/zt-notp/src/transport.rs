// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pluggable wire transport contract (`spec.md` §4.3: "The core is given two
//! closures: `send(packet) -> err` and `recv() -> packet|err`, plus a
//! timeout").
//!
//! Neither this trait nor the state machines built on top of it know
//! anything about TLS or TCP; a concrete transport (process stdio, a TCP
//! socket, an in-memory channel pair) wraps whatever byte stream it owns and
//! implements deadline propagation itself.

use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use thiserror::Error;

use crate::frame::{Frame, FrameError};

/// Default NOTP receive timeout (`spec.md` §4.3/§5: 30 s).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(zt_core::NOTP_DEFAULT_TIMEOUT_SECS);

/// Errors a [`Transport`] implementation can raise.
#[derive(Debug, Error)]
pub enum TransportError {
    /// No frame arrived before the deadline (`spec.md` §4.3: "Any `recv`
    /// that exceeds `DefaultTimeout`... transitions to `Error`").
    #[error("recv timed out after {0:?}")]
    Timeout(Duration),
    /// The peer closed the stream.
    #[error("transport closed")]
    Closed,
    /// A frame arrived but failed to parse.
    #[error("frame decode error: {0}")]
    Frame(#[from] FrameError),
    /// The underlying byte stream failed.
    #[error("transport I/O error: {0}")]
    Io(String),
}

/// A full-duplex byte transport carrying NOTP frames.
///
/// Implementors own send/receive deadline handling; the state machines in
/// [`crate::fsm`] only ever see [`TransportError::Timeout`] as a uniform
/// signal to transition to `Error` (`spec.md` §4.3, §5).
pub trait Transport {
    /// Send one frame. Errors propagate as a protocol-terminating failure.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] on any send failure.
    fn send(&mut self, frame: &Frame) -> Result<(), TransportError>;

    /// Receive one frame, waiting at most `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Timeout`] if no frame arrives in time,
    /// [`TransportError::Closed`] if the peer hung up, or another
    /// [`TransportError`] on a lower-level failure.
    fn recv(&mut self, timeout: Duration) -> Result<Frame, TransportError>;
}

/// One end of an in-process, channel-backed duplex [`Transport`] pair.
///
/// The reference transport: used by tests and by a single-process
/// workspace-to-PAP shortcut. Production deployments plug in a transport
/// backed by a real byte stream (TCP, a process's stdio, ...) instead.
pub struct ChannelTransport {
    tx: Sender<Vec<u8>>,
    rx: Receiver<Vec<u8>>,
}

impl ChannelTransport {
    /// Build a connected pair: frames sent on one end arrive on the other.
    #[must_use]
    pub fn pair() -> (Self, Self) {
        let (tx_a, rx_a) = std::sync::mpsc::channel();
        let (tx_b, rx_b) = std::sync::mpsc::channel();
        (
            Self { tx: tx_a, rx: rx_b },
            Self { tx: tx_b, rx: rx_a },
        )
    }
}

impl Transport for ChannelTransport {
    fn send(&mut self, frame: &Frame) -> Result<(), TransportError> {
        self.tx
            .send(frame.encode())
            .map_err(|_| TransportError::Closed)
    }

    fn recv(&mut self, timeout: Duration) -> Result<Frame, TransportError> {
        match self.rx.recv_timeout(timeout) {
            Ok(bytes) => Ok(Frame::decode(&bytes)?),
            Err(RecvTimeoutError::Timeout) => Err(TransportError::Timeout(timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(TransportError::Closed),
        }
    }
}
