// SPDX-License-Identifier: MIT OR Apache-2.0
//! NOTP wire frame: magic/version/kind/flags/streamID/packetID/length/payload
//! (`spec.md` §4.3, §6).
//!
//! ```text
//! Frame := magic:u16=0x4E54 | version:u8=1 | kind:u8 | flags:u16
//!        | streamID:u64 | packetID:u64 | length:u32 | payload:length
//! ```

use thiserror::Error;
use zt_core::{NOTP_MAGIC, NOTP_PROTOCOL_VERSION};

/// Fixed header length in bytes: `2+1+1+2+8+8+4`.
pub const FRAME_HEADER_LEN: usize = 26;

/// Errors raised while encoding or decoding a [`Frame`].
#[derive(Debug, Error)]
pub enum FrameError {
    /// Input was shorter than [`FRAME_HEADER_LEN`].
    #[error("truncated frame header: need at least {FRAME_HEADER_LEN} bytes, got {0}")]
    TruncatedHeader(usize),
    /// The wire magic did not match [`NOTP_MAGIC`].
    #[error("bad NOTP magic: expected {expected:#06x}, got {got:#06x}")]
    BadMagic {
        /// Expected magic value.
        expected: u16,
        /// Magic value actually present on the wire.
        got: u16,
    },
    /// The wire protocol version did not match [`NOTP_PROTOCOL_VERSION`].
    #[error("unsupported NOTP protocol version: {0}")]
    UnsupportedVersion(u8),
    /// `kind` byte did not match any known [`PacketKind`].
    #[error("unknown NOTP packet kind: {0}")]
    UnknownKind(u8),
    /// The declared `length` did not match the bytes actually present.
    #[error("payload length mismatch: header declares {declared}, body has {actual}")]
    PayloadLengthMismatch {
        /// Length declared in the header.
        declared: u32,
        /// Length of the bytes actually following the header.
        actual: usize,
    },
}

/// NOTP packet classes (`spec.md` §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketKind {
    /// Protocol version/capability handshake.
    Hello = 0,
    /// Negotiated session parameters.
    Negotiate = 1,
    /// Leader or Follower advertising its current ref OID.
    RefAdvertise = 2,
    /// Leader advertising OIDs reachable from its ref that the Follower may lack.
    ObjectAdvertise = 3,
    /// Follower requesting specific OIDs it needs.
    ObjectRequest = 4,
    /// Leader streaming the bytes of a requested object.
    ObjectData = 5,
    /// Sender has finished its side of the flow.
    Done = 6,
    /// Protocol violation or transport failure.
    Error = 7,
}

impl PacketKind {
    /// Decode from the wire's `u8` representation.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::UnknownKind`] for any value outside `0..=7`.
    pub fn from_u8(v: u8) -> Result<Self, FrameError> {
        match v {
            0 => Ok(Self::Hello),
            1 => Ok(Self::Negotiate),
            2 => Ok(Self::RefAdvertise),
            3 => Ok(Self::ObjectAdvertise),
            4 => Ok(Self::ObjectRequest),
            5 => Ok(Self::ObjectData),
            6 => Ok(Self::Done),
            7 => Ok(Self::Error),
            other => Err(FrameError::UnknownKind(other)),
        }
    }

    /// The wire `u8` representation.
    #[must_use]
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Frame flag bits, packed into the wire's `flags:u16` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameFlags {
    /// This is the last packet of its logical stream.
    pub end_of_stream: bool,
    /// Sender expects a protocol-level acknowledgement.
    pub requires_ack: bool,
}

const FLAG_END_OF_STREAM: u16 = 0b0000_0001;
const FLAG_REQUIRES_ACK: u16 = 0b0000_0010;

impl FrameFlags {
    /// Decode from the wire's packed `u16`.
    #[must_use]
    pub fn from_u16(v: u16) -> Self {
        Self {
            end_of_stream: v & FLAG_END_OF_STREAM != 0,
            requires_ack: v & FLAG_REQUIRES_ACK != 0,
        }
    }

    /// Pack into the wire's `u16`.
    #[must_use]
    pub fn as_u16(self) -> u16 {
        let mut v = 0u16;
        if self.end_of_stream {
            v |= FLAG_END_OF_STREAM;
        }
        if self.requires_ack {
            v |= FLAG_REQUIRES_ACK;
        }
        v
    }
}

/// A parsed NOTP frame (`spec.md` §3: "after framing parse").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Packet class.
    pub kind: PacketKind,
    /// Packed flag bits.
    pub flags: FrameFlags,
    /// Groups packets belonging to one logical flow.
    pub stream_id: u64,
    /// Monotonic per-stream counter for retransmit identification.
    pub packet_id: u64,
    /// Frame payload, opaque to the framing layer.
    pub payload: Vec<u8>,
}

impl Frame {
    /// Build a new frame.
    #[must_use]
    pub fn new(kind: PacketKind, flags: FrameFlags, stream_id: u64, packet_id: u64, payload: Vec<u8>) -> Self {
        Self {
            kind,
            flags,
            stream_id,
            packet_id,
            payload,
        }
    }

    /// Encode this frame into its on-wire byte representation.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(FRAME_HEADER_LEN + self.payload.len());
        buf.extend_from_slice(&NOTP_MAGIC.to_be_bytes());
        buf.push(NOTP_PROTOCOL_VERSION);
        buf.push(self.kind.as_u8());
        buf.extend_from_slice(&self.flags.as_u16().to_be_bytes());
        buf.extend_from_slice(&self.stream_id.to_be_bytes());
        buf.extend_from_slice(&self.packet_id.to_be_bytes());
        buf.extend_from_slice(&(self.payload.len() as u32).to_be_bytes());
        buf.extend_from_slice(&self.payload);
        buf
    }

    /// Decode a frame from its on-wire byte representation.
    ///
    /// # Errors
    ///
    /// See [`FrameError`].
    pub fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        if bytes.len() < FRAME_HEADER_LEN {
            return Err(FrameError::TruncatedHeader(bytes.len()));
        }
        let magic = u16::from_be_bytes([bytes[0], bytes[1]]);
        if magic != NOTP_MAGIC {
            return Err(FrameError::BadMagic {
                expected: NOTP_MAGIC,
                got: magic,
            });
        }
        let version = bytes[2];
        if version != NOTP_PROTOCOL_VERSION {
            return Err(FrameError::UnsupportedVersion(version));
        }
        let kind = PacketKind::from_u8(bytes[3])?;
        let flags = FrameFlags::from_u16(u16::from_be_bytes([bytes[4], bytes[5]]));
        let stream_id = u64::from_be_bytes(bytes[6..14].try_into().expect("8 bytes"));
        let packet_id = u64::from_be_bytes(bytes[14..22].try_into().expect("8 bytes"));
        let length = u32::from_be_bytes(bytes[22..26].try_into().expect("4 bytes")) as usize;
        let body = &bytes[26..];
        if body.len() != length {
            return Err(FrameError::PayloadLengthMismatch {
                declared: length as u32,
                actual: body.len(),
            });
        }
        Ok(Self {
            kind,
            flags,
            stream_id,
            packet_id,
            payload: body.to_vec(),
        })
    }
}
