// SPDX-License-Identifier: MIT OR Apache-2.0
//! Object wire codec (`spec.md` §4.1, §6).
//!
//! ```text
//! Object := magic:u16=0x5A54 | version:u8=1 | codeTypeID:u16 | languageID:u16
//!         | payloadLen:u32 | payload:bytes
//! ```
//!
//! `oid = SHA256(header ∥ payload)`, i.e. the SHA256 of the *entire* encoded
//! byte string including the magic/version/type prefix — recomputing it on
//! read is how [`decode_object`] validates integrity.

use thiserror::Error;
use zt_core::{CodeTypeId, CoreError, Object, ObjectHeader, ObjectInfo, Oid, OBJECT_MAGIC, OBJECT_WIRE_VERSION};

/// Errors raised while encoding or decoding the object wire format.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Input was shorter than the fixed 11-byte header.
    #[error("truncated object header: need at least 11 bytes, got {0}")]
    TruncatedHeader(usize),
    /// The wire magic did not match [`OBJECT_MAGIC`].
    #[error("bad object magic: expected {expected:#06x}, got {got:#06x}")]
    BadMagic {
        /// Expected magic value.
        expected: u16,
        /// Magic value actually present on the wire.
        got: u16,
    },
    /// The wire version did not match [`OBJECT_WIRE_VERSION`].
    #[error("unsupported object wire version: {0}")]
    UnsupportedVersion(u8),
    /// `codeTypeID` did not match any known object kind — `spec.md` §4.1
    /// calls this "a fatal decode error reported as corruption".
    #[error("object corruption: {0}")]
    Corrupt(#[from] CoreError),
    /// The declared `payloadLen` did not match the bytes actually present.
    #[error("payload length mismatch: header declares {declared}, body has {actual}")]
    PayloadLengthMismatch {
        /// Length declared in the header.
        declared: u32,
        /// Length of the bytes actually following the header.
        actual: usize,
    },
}

/// Serialize a header and payload into the on-wire object byte string.
///
/// The returned bytes are exactly what [`zt_core::Oid::of`] should be applied
/// to in order to obtain the object's OID.
#[must_use]
pub fn encode_object(header: &ObjectHeader, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(11 + payload.len());
    buf.extend_from_slice(&OBJECT_MAGIC.to_be_bytes());
    buf.push(header.version);
    buf.extend_from_slice(&header.code_type_id.as_u16().to_be_bytes());
    buf.extend_from_slice(&header.language_id.to_be_bytes());
    buf.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    buf.extend_from_slice(payload);
    buf
}

/// Build a header/payload pair and encode it in one step, returning the
/// resulting [`Object`] with its OID computed from the encoded bytes.
#[must_use]
pub fn build_object(code_type_id: CodeTypeId, language_id: u16, payload: Vec<u8>) -> Object {
    let header = ObjectHeader {
        version: OBJECT_WIRE_VERSION,
        code_type_id,
        language_id,
    };
    let bytes = encode_object(&header, &payload);
    Object {
        oid: Oid::of(&bytes),
        header,
        payload,
    }
}

/// Decode a wire-format byte string into an [`Object`], computing its OID as
/// `SHA256(bytes)` (`spec.md` §3 invariant).
///
/// # Errors
///
/// Returns [`CodecError`] if the bytes are truncated, carry a bad magic or
/// version, declare an unknown `codeTypeID`, or the declared payload length
/// doesn't match the trailing bytes.
pub fn decode_object(bytes: &[u8]) -> Result<Object, CodecError> {
    if bytes.len() < 11 {
        return Err(CodecError::TruncatedHeader(bytes.len()));
    }
    let magic = u16::from_be_bytes([bytes[0], bytes[1]]);
    if magic != OBJECT_MAGIC {
        return Err(CodecError::BadMagic {
            expected: OBJECT_MAGIC,
            got: magic,
        });
    }
    let version = bytes[2];
    if version != OBJECT_WIRE_VERSION {
        return Err(CodecError::UnsupportedVersion(version));
    }
    let code_type_id = CodeTypeId::from_u16(u16::from_be_bytes([bytes[3], bytes[4]]))?;
    let language_id = u16::from_be_bytes([bytes[5], bytes[6]]);
    let payload_len = u32::from_be_bytes([bytes[7], bytes[8], bytes[9], bytes[10]]) as usize;
    let body = &bytes[11..];
    if body.len() != payload_len {
        return Err(CodecError::PayloadLengthMismatch {
            declared: payload_len as u32,
            actual: body.len(),
        });
    }
    Ok(Object {
        oid: Oid::of(bytes),
        header: ObjectHeader {
            version,
            code_type_id,
            language_id,
        },
        payload: body.to_vec(),
    })
}

/// Decode an object and check whether its recomputed OID matches `claimed`.
///
/// Used by the NOTP follower path, where an `ObjectData` packet asserts an
/// OID up front and the receiver must reject mismatches (`spec.md` §4.3:
/// "Follower verifies each packet by recomputing SHA256").
///
/// Returns `Ok((object, true))` when `object.oid == *claimed`, or
/// `Ok((object, false))` on a mismatch — callers turn the `false` case into
/// their own protocol error rather than have this layer invent one.
///
/// # Errors
///
/// As [`decode_object`].
pub fn decode_and_check(bytes: &[u8], claimed: &Oid) -> Result<(Object, bool), CodecError> {
    let obj = decode_object(bytes)?;
    let matches = obj.oid == *claimed;
    Ok((obj, matches))
}

/// Project an [`Object`] into the lightweight [`ObjectInfo`] description used
/// as the value type in [`zt_core::PolicyStore::schemas`]/`policies`.
#[must_use]
pub fn get_object_info(obj: &Object) -> ObjectInfo {
    ObjectInfo {
        oid: obj.oid.clone(),
        header: obj.header,
        instance_bytes: obj.payload.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_header_and_payload() {
        let obj = build_object(CodeTypeId::Policy, 1, b"permit(principal, action, resource);".to_vec());
        let bytes = encode_object(&obj.header, &obj.payload);
        let decoded = decode_object(&bytes).unwrap();
        assert_eq!(decoded.oid, obj.oid);
        assert_eq!(decoded.header, obj.header);
        assert_eq!(decoded.payload, obj.payload);
    }

    #[test]
    fn oid_is_sha256_of_full_wire_bytes() {
        let obj = build_object(CodeTypeId::Schema, 1, b"schema".to_vec());
        let bytes = encode_object(&obj.header, &obj.payload);
        assert_eq!(obj.oid, Oid::of(&bytes));
    }

    #[test]
    fn rejects_truncated_header() {
        assert!(matches!(
            decode_object(&[0x5A, 0x54, 1]),
            Err(CodecError::TruncatedHeader(3))
        ));
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = encode_object(
            &ObjectHeader {
                version: OBJECT_WIRE_VERSION,
                code_type_id: CodeTypeId::RawBlob,
                language_id: 0,
            },
            b"x",
        );
        bytes[0] = 0;
        assert!(matches!(decode_object(&bytes), Err(CodecError::BadMagic { .. })));
    }

    #[test]
    fn rejects_unknown_code_type_id() {
        let mut bytes = encode_object(
            &ObjectHeader {
                version: OBJECT_WIRE_VERSION,
                code_type_id: CodeTypeId::RawBlob,
                language_id: 0,
            },
            b"x",
        );
        // code_type_id occupies bytes[3..5]
        bytes[3] = 0xFF;
        bytes[4] = 0xFF;
        assert!(matches!(decode_object(&bytes), Err(CodecError::Corrupt(_))));
    }

    #[test]
    fn rejects_payload_length_mismatch() {
        let mut bytes = encode_object(
            &ObjectHeader {
                version: OBJECT_WIRE_VERSION,
                code_type_id: CodeTypeId::RawBlob,
                language_id: 0,
            },
            b"hello",
        );
        // Declare a longer payload than actually present.
        bytes[7..11].copy_from_slice(&999u32.to_be_bytes());
        assert!(matches!(
            decode_object(&bytes),
            Err(CodecError::PayloadLengthMismatch { .. })
        ));
    }

    #[test]
    fn tamper_changes_oid() {
        let obj = build_object(CodeTypeId::Policy, 1, b"permit(principal, action, resource);".to_vec());
        let mut bytes = encode_object(&obj.header, &obj.payload);
        let original_oid = Oid::of(&bytes);
        *bytes.last_mut().unwrap() ^= 0xFF;
        let tampered_oid = Oid::of(&bytes);
        assert_ne!(original_oid, tampered_oid);
    }
}
