// SPDX-License-Identifier: MIT OR Apache-2.0
//! Commit binary codec (`spec.md` §4.1, §6).
//!
//! ```text
//! Commit := tree:OID(32B raw) | parentCount:u8 | parent*parentCount
//!         | tsNanos:i64 | metaLen:u32 | meta:bytes
//! ```
//!
//! `meta` is the commit's free-form [`CommitMetaInfo`], serialized as JSON —
//! opaque to the graph layer, which only needs to round-trip it.

use zt_core::{Commit, CommitMetaInfo, Oid};

use crate::GraphError;

/// Serialize a [`Commit`] to its on-wire binary layout.
///
/// # Errors
///
/// Returns [`GraphError::MultiParentUnsupported`] if `commit.parents.len() >
/// 1` (`spec.md` §9 open question: merges are undefined behavior until a
/// merge flow is specified; this encoder rejects them outright rather than
/// emit a commit no decoder can later interpret).
pub fn encode_commit(commit: &Commit) -> Result<Vec<u8>, GraphError> {
    if commit.parents.len() > 1 {
        return Err(GraphError::MultiParentUnsupported(commit.parents.len()));
    }
    let meta_bytes =
        serde_json::to_vec(&commit.meta).map_err(|e| GraphError::MetaEncoding(e.to_string()))?;

    let mut buf = Vec::with_capacity(32 + 1 + commit.parents.len() * 32 + 8 + 4 + meta_bytes.len());
    buf.extend_from_slice(
        &commit
            .tree
            .to_bytes32()
            .map_err(|e| GraphError::BadOid(e.to_string()))?,
    );
    buf.push(commit.parents.len() as u8);
    for parent in &commit.parents {
        buf.extend_from_slice(
            &parent
                .to_bytes32()
                .map_err(|e| GraphError::BadOid(e.to_string()))?,
        );
    }
    buf.extend_from_slice(&commit.timestamp_nanos.to_be_bytes());
    buf.extend_from_slice(&(meta_bytes.len() as u32).to_be_bytes());
    buf.extend_from_slice(&meta_bytes);
    Ok(buf)
}

/// Deserialize a [`Commit`] from its on-wire binary layout.
///
/// # Errors
///
/// Returns [`GraphError::Truncated`] on a short buffer,
/// [`GraphError::MultiParentUnsupported`] if the declared `parentCount`
/// exceeds 1, or [`GraphError::MetaEncoding`] if the trailing `meta` bytes
/// aren't valid JSON.
pub fn decode_commit(bytes: &[u8]) -> Result<Commit, GraphError> {
    if bytes.len() < 32 + 1 {
        return Err(GraphError::Truncated("commit: missing tree/parentCount"));
    }
    let mut offset = 0usize;
    let tree = Oid::from_bytes32(bytes[offset..offset + 32].try_into().unwrap());
    offset += 32;

    let parent_count = bytes[offset] as usize;
    offset += 1;
    if parent_count > 1 {
        return Err(GraphError::MultiParentUnsupported(parent_count));
    }
    if bytes.len() < offset + parent_count * 32 + 8 + 4 {
        return Err(GraphError::Truncated("commit: missing parents/timestamp/metaLen"));
    }
    let mut parents = Vec::with_capacity(parent_count);
    for _ in 0..parent_count {
        parents.push(Oid::from_bytes32(bytes[offset..offset + 32].try_into().unwrap()));
        offset += 32;
    }

    let timestamp_nanos = i64::from_be_bytes(bytes[offset..offset + 8].try_into().unwrap());
    offset += 8;

    let meta_len = u32::from_be_bytes(bytes[offset..offset + 4].try_into().unwrap()) as usize;
    offset += 4;
    if bytes.len() < offset + meta_len {
        return Err(GraphError::Truncated("commit: meta shorter than declared"));
    }
    let meta_bytes = &bytes[offset..offset + meta_len];
    let meta: CommitMetaInfo =
        serde_json::from_slice(meta_bytes).map_err(|e| GraphError::MetaEncoding(e.to_string()))?;

    Ok(Commit {
        tree,
        parents,
        meta,
        timestamp_nanos,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn sample(parents: Vec<Oid>) -> Commit {
        let mut meta = BTreeMap::new();
        meta.insert("author".to_string(), "alice".to_string());
        Commit {
            tree: Oid::of(b"tree"),
            parents,
            meta: CommitMetaInfo(meta),
            timestamp_nanos: 1_700_000_000_000_000_000,
        }
    }

    #[test]
    fn root_commit_roundtrips() {
        let commit = sample(vec![]);
        let bytes = encode_commit(&commit).unwrap();
        let decoded = decode_commit(&bytes).unwrap();
        assert_eq!(decoded, commit);
    }

    #[test]
    fn linear_commit_roundtrips() {
        let commit = sample(vec![Oid::of(b"parent")]);
        let bytes = encode_commit(&commit).unwrap();
        let decoded = decode_commit(&bytes).unwrap();
        assert_eq!(decoded, commit);
    }

    #[test]
    fn encoder_rejects_multi_parent() {
        let commit = sample(vec![Oid::of(b"p1"), Oid::of(b"p2")]);
        assert!(matches!(
            encode_commit(&commit),
            Err(GraphError::MultiParentUnsupported(2))
        ));
    }

    #[test]
    fn decoder_rejects_multi_parent_on_wire() {
        // Hand-craft bytes declaring parentCount=2 to ensure the decoder
        // itself enforces the invariant, not just the encoder.
        let mut buf = Vec::new();
        buf.extend_from_slice(&Oid::of(b"tree").to_bytes32().unwrap());
        buf.push(2);
        buf.extend_from_slice(&Oid::of(b"p1").to_bytes32().unwrap());
        buf.extend_from_slice(&Oid::of(b"p2").to_bytes32().unwrap());
        buf.extend_from_slice(&0i64.to_be_bytes());
        buf.extend_from_slice(&0u32.to_be_bytes());
        assert!(matches!(
            decode_commit(&buf),
            Err(GraphError::MultiParentUnsupported(2))
        ));
    }

    #[test]
    fn decoder_rejects_truncated_input() {
        assert!(matches!(decode_commit(&[0u8; 10]), Err(GraphError::Truncated(_))));
    }
}
