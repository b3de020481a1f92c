// SPDX-License-Identifier: MIT OR Apache-2.0
//! Tree binary codec (`spec.md` §4.1, §6).
//!
//! ```text
//! Tree  := entryCount:u32 | entry*entryCount
//! Entry := oid:OID | codeTypeID:u16 | languageID:u16 | nameLen:u16 | name:bytes
//!        | codeIDLen:u16 | codeID:bytes
//! ```

use zt_core::{CodeTypeId, Oid, Tree, TreeEntry, TreeEntryType};

use crate::GraphError;

/// Serialize a [`Tree`] to its on-wire binary layout.
///
/// Entries are written in [`Tree::canonical_entries`] order (lexicographic
/// by `name`) rather than their in-memory order, stabilizing the resulting
/// OID for equivalent content (`spec.md` §9 open question: tree entry
/// ordering — this is the encoder half of that resolution; the decoder
/// below makes no such assumption on read).
///
/// # Errors
///
/// Returns [`GraphError::DuplicateEntryName`] if two entries share a `name`
/// (`spec.md` §3 invariant: "entry names within a tree are unique").
pub fn encode_tree(tree: &Tree) -> Result<Vec<u8>, GraphError> {
    let ordered = tree.canonical_entries();
    let mut seen = std::collections::HashSet::with_capacity(ordered.len());
    for e in &ordered {
        if !seen.insert(e.name.as_str()) {
            return Err(GraphError::DuplicateEntryName(e.name.clone()));
        }
    }

    let mut buf = Vec::new();
    buf.extend_from_slice(&(ordered.len() as u32).to_be_bytes());
    for entry in ordered {
        encode_entry(&mut buf, entry)?;
    }
    Ok(buf)
}

fn encode_entry(buf: &mut Vec<u8>, entry: &TreeEntry) -> Result<(), GraphError> {
    buf.extend_from_slice(
        &entry
            .oid
            .to_bytes32()
            .map_err(|e| GraphError::BadOid(e.to_string()))?,
    );
    buf.extend_from_slice(&entry.code_type_id.as_u16().to_be_bytes());
    buf.extend_from_slice(&entry.language_id.to_be_bytes());
    let name_bytes = entry.name.as_bytes();
    buf.extend_from_slice(&(name_bytes.len() as u16).to_be_bytes());
    buf.extend_from_slice(name_bytes);
    let code_id_bytes = entry.code_id.as_bytes();
    buf.extend_from_slice(&(code_id_bytes.len() as u16).to_be_bytes());
    buf.extend_from_slice(code_id_bytes);
    Ok(())
}

/// Deserialize a [`Tree`] from its on-wire binary layout.
///
/// Accepts entries in whatever order they appear on the wire — historical
/// trees written before entries were canonically ordered must still decode.
///
/// # Errors
///
/// Returns [`GraphError::Truncated`] on a short buffer, or
/// [`GraphError::Corrupt`] if an entry's `codeTypeID` isn't `Schema` or
/// `Policy` (`spec.md` §4.2 step 3: "tree contains only schemas and
/// policies in this release").
pub fn decode_tree(bytes: &[u8]) -> Result<Tree, GraphError> {
    if bytes.len() < 4 {
        return Err(GraphError::Truncated("tree: missing entryCount"));
    }
    let entry_count = u32::from_be_bytes(bytes[0..4].try_into().unwrap()) as usize;
    let mut offset = 4usize;
    let mut entries = Vec::with_capacity(entry_count);
    for _ in 0..entry_count {
        let (entry, consumed) = decode_entry(&bytes[offset..])?;
        entries.push(entry);
        offset += consumed;
    }
    Ok(Tree { entries })
}

fn decode_entry(bytes: &[u8]) -> Result<(TreeEntry, usize), GraphError> {
    if bytes.len() < 32 + 2 + 2 + 2 {
        return Err(GraphError::Truncated("tree entry: missing fixed fields"));
    }
    let mut offset = 0usize;
    let oid = Oid::from_bytes32(bytes[offset..offset + 32].try_into().unwrap());
    offset += 32;

    let code_type_id = CodeTypeId::from_u16(u16::from_be_bytes(bytes[offset..offset + 2].try_into().unwrap()))
        .map_err(GraphError::Corrupt)?;
    offset += 2;

    let entry_type = match code_type_id {
        CodeTypeId::Schema => TreeEntryType::Schema,
        CodeTypeId::Policy => TreeEntryType::Policy,
        other => return Err(GraphError::UnexpectedEntryType(other)),
    };

    let language_id = u16::from_be_bytes(bytes[offset..offset + 2].try_into().unwrap());
    offset += 2;

    let name_len = u16::from_be_bytes(bytes[offset..offset + 2].try_into().unwrap()) as usize;
    offset += 2;
    if bytes.len() < offset + name_len + 2 {
        return Err(GraphError::Truncated("tree entry: name or codeIDLen truncated"));
    }
    let name = String::from_utf8(bytes[offset..offset + name_len].to_vec())
        .map_err(|e| GraphError::BadUtf8(e.to_string()))?;
    offset += name_len;

    let code_id_len = u16::from_be_bytes(bytes[offset..offset + 2].try_into().unwrap()) as usize;
    offset += 2;
    if bytes.len() < offset + code_id_len {
        return Err(GraphError::Truncated("tree entry: codeID truncated"));
    }
    let code_id = String::from_utf8(bytes[offset..offset + code_id_len].to_vec())
        .map_err(|e| GraphError::BadUtf8(e.to_string()))?;
    offset += code_id_len;

    Ok((
        TreeEntry {
            oid,
            entry_type,
            name,
            code_id,
            code_type_id,
            language_id,
        },
        offset,
    ))
}
