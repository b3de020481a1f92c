// SPDX-License-Identifier: MIT OR Apache-2.0
//! Typed NOTP packet bodies, carried as JSON inside a [`Frame`](crate::frame::Frame)'s
//! payload (`spec.md` §4.3: "`{ data: bytes }` on the wire").

use serde::{Deserialize, Serialize};
use thiserror::Error;
use zt_core::Oid;

use crate::frame::{Frame, FrameFlags, PacketKind};

/// Errors raised while encoding or decoding a [`Packet`] body.
#[derive(Debug, Error)]
pub enum PacketError {
    /// The frame's `kind` did not match the body being decoded.
    #[error("packet kind mismatch: expected {expected:?}, got {got:?}")]
    KindMismatch {
        /// Kind the decoder expected.
        expected: PacketKind,
        /// Kind actually present on the frame.
        got: PacketKind,
    },
    /// The payload did not deserialize as the expected JSON shape.
    #[error("packet payload decode error: {0}")]
    Json(#[from] serde_json::Error),
    /// The frame itself was malformed.
    #[error(transparent)]
    Frame(#[from] crate::frame::FrameError),
}

/// Protocol version/capability handshake body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hello {
    /// NOTP protocol version the sender speaks.
    pub protocol_version: u8,
    /// Capability tokens the sender supports (flow kinds, compression, ...).
    pub capabilities: Vec<String>,
}

/// Advertises a peer's current ref OID (`spec.md` §4.3: `Negotiate->AdvertiseRef`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefAdvertise {
    /// The advertising peer's current ref OID.
    pub ref_oid: Oid,
}

/// Leader's list of OIDs reachable from its ref that the Follower may lack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ObjectAdvertise {
    /// Candidate OIDs, in no particular order.
    pub oids: Vec<Oid>,
}

/// Follower's list of OIDs it actually needs (its store lacks them).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ObjectRequest {
    /// Requested OIDs.
    pub oids: Vec<Oid>,
}

/// One object's bytes, asserting the OID the sender computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectData {
    /// OID the sender claims these bytes hash to.
    pub oid: Oid,
    /// The object's full wire-encoded bytes (`zt_objectstore::encode_object` output).
    pub bytes: Vec<u8>,
}

/// Sender has finished its side of the flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Done {
    /// The final ref OID this side is now at (Leader: its own; Follower: what it adopted).
    pub ref_oid: Option<Oid>,
}

/// Protocol violation or transport failure surfaced to the peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Stable error code (mirrors `zt_error::ErrorCode::code()`).
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

/// Decode a frame's JSON payload, checking its kind first.
fn decode_body<T: for<'de> Deserialize<'de>>(frame: &Frame, expected: PacketKind) -> Result<T, PacketError> {
    if frame.kind != expected {
        return Err(PacketError::KindMismatch {
            expected,
            got: frame.kind,
        });
    }
    Ok(serde_json::from_slice(&frame.payload)?)
}

fn encode_frame<T: Serialize>(
    kind: PacketKind,
    flags: FrameFlags,
    stream_id: u64,
    packet_id: u64,
    body: &T,
) -> Frame {
    let payload = serde_json::to_vec(body).expect("packet bodies are always serializable");
    Frame::new(kind, flags, stream_id, packet_id, payload)
}

impl Hello {
    /// Encode as a [`PacketKind::Hello`] frame.
    #[must_use]
    pub fn into_frame(self, stream_id: u64, packet_id: u64) -> Frame {
        encode_frame(PacketKind::Hello, FrameFlags::default(), stream_id, packet_id, &self)
    }

    /// Decode from a [`PacketKind::Hello`] frame.
    pub fn from_frame(frame: &Frame) -> Result<Self, PacketError> {
        decode_body(frame, PacketKind::Hello)
    }
}

impl RefAdvertise {
    /// Encode as a [`PacketKind::RefAdvertise`] frame.
    #[must_use]
    pub fn into_frame(self, stream_id: u64, packet_id: u64) -> Frame {
        encode_frame(PacketKind::RefAdvertise, FrameFlags::default(), stream_id, packet_id, &self)
    }

    /// Decode from a [`PacketKind::RefAdvertise`] frame.
    pub fn from_frame(frame: &Frame) -> Result<Self, PacketError> {
        decode_body(frame, PacketKind::RefAdvertise)
    }
}

impl ObjectAdvertise {
    /// Encode as a [`PacketKind::ObjectAdvertise`] frame.
    #[must_use]
    pub fn into_frame(self, stream_id: u64, packet_id: u64, end_of_stream: bool) -> Frame {
        encode_frame(
            PacketKind::ObjectAdvertise,
            FrameFlags {
                end_of_stream,
                requires_ack: false,
            },
            stream_id,
            packet_id,
            &self,
        )
    }

    /// Decode from a [`PacketKind::ObjectAdvertise`] frame.
    pub fn from_frame(frame: &Frame) -> Result<Self, PacketError> {
        decode_body(frame, PacketKind::ObjectAdvertise)
    }
}

impl ObjectRequest {
    /// Encode as a [`PacketKind::ObjectRequest`] frame.
    #[must_use]
    pub fn into_frame(self, stream_id: u64, packet_id: u64) -> Frame {
        encode_frame(PacketKind::ObjectRequest, FrameFlags::default(), stream_id, packet_id, &self)
    }

    /// Decode from a [`PacketKind::ObjectRequest`] frame.
    pub fn from_frame(frame: &Frame) -> Result<Self, PacketError> {
        decode_body(frame, PacketKind::ObjectRequest)
    }
}

impl ObjectData {
    /// Encode as a [`PacketKind::ObjectData`] frame.
    #[must_use]
    pub fn into_frame(self, stream_id: u64, packet_id: u64, end_of_stream: bool) -> Frame {
        encode_frame(
            PacketKind::ObjectData,
            FrameFlags {
                end_of_stream,
                requires_ack: false,
            },
            stream_id,
            packet_id,
            &self,
        )
    }

    /// Decode from a [`PacketKind::ObjectData`] frame.
    pub fn from_frame(frame: &Frame) -> Result<Self, PacketError> {
        decode_body(frame, PacketKind::ObjectData)
    }
}

impl Done {
    /// Encode as a [`PacketKind::Done`] frame.
    #[must_use]
    pub fn into_frame(self, stream_id: u64, packet_id: u64) -> Frame {
        encode_frame(
            PacketKind::Done,
            FrameFlags {
                end_of_stream: true,
                requires_ack: true,
            },
            stream_id,
            packet_id,
            &self,
        )
    }

    /// Decode from a [`PacketKind::Done`] frame.
    pub fn from_frame(frame: &Frame) -> Result<Self, PacketError> {
        decode_body(frame, PacketKind::Done)
    }
}

impl ErrorBody {
    /// Encode as a [`PacketKind::Error`] frame.
    #[must_use]
    pub fn into_frame(self, stream_id: u64, packet_id: u64) -> Frame {
        encode_frame(PacketKind::Error, FrameFlags::default(), stream_id, packet_id, &self)
    }

    /// Decode from a [`PacketKind::Error`] frame.
    pub fn from_frame(frame: &Frame) -> Result<Self, PacketError> {
        decode_body(frame, PacketKind::Error)
    }
}
