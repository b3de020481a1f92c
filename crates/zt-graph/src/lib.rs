// SPDX-License-Identifier: MIT OR Apache-2.0
//! Commit/tree graph and policy-store assembler (`spec.md` §4.2, L2-L3).
//!
//! Walks a ledger ref to its commit, the commit's tree, and materializes a
//! [`PolicyStore`] from the tree's schema/policy entries.
#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Commit binary codec.
pub mod commit;
/// Tree binary codec.
pub mod tree;

pub use commit::{decode_commit, encode_commit};
pub use tree::{decode_tree, encode_tree};

use thiserror::Error;
use tracing::debug;
use zt_core::{CodeTypeId, Oid, PolicyStore, Tree};
use zt_objectstore::ObjectStore;

/// Errors raised while walking the commit/tree graph or assembling a policy
/// store.
#[derive(Debug, Error)]
pub enum GraphError {
    /// The ledger reference was the all-zero sentinel (`spec.md` §4.2 step
    /// 1: "invalid ledger reference").
    #[error("invalid ledger reference: ref is the zero OID")]
    ZeroRef,
    /// An object referenced by the graph could not be loaded.
    #[error("object store error: {0}")]
    Store(#[from] zt_objectstore::ObjectStoreError),
    /// An object's bytes did not decode as a well-formed wire object.
    #[error("object decode error: {0}")]
    Codec(#[from] zt_objectstore::CodecError),
    /// Input was shorter than a fixed-layout field requires.
    #[error("truncated binary record: {0}")]
    Truncated(&'static str),
    /// `codeTypeID` did not match any known object kind.
    #[error(transparent)]
    Corrupt(#[from] zt_core::CoreError),
    /// A tree entry's `codeTypeID` was neither `Schema` nor `Policy`
    /// (`spec.md` §4.2 step 3: "tree contains only schemas and policies in
    /// this release").
    #[error("unexpected tree entry codeTypeID: {0:?}")]
    UnexpectedEntryType(CodeTypeId),
    /// The commit's `parentCount` exceeded 1 (`spec.md` §9: merges are
    /// undefined behavior).
    #[error("multi-parent commits are unsupported: parentCount={0}")]
    MultiParentUnsupported(usize),
    /// A tree had two entries sharing the same `name`.
    #[error("duplicate tree entry name: {0}")]
    DuplicateEntryName(String),
    /// A referenced object's decoded type did not match what the graph
    /// expected at that position (e.g. a ref pointed at a Policy, not a
    /// Commit).
    #[error("object {oid} was not a {expected}: codeTypeID={actual:?}")]
    TypeMismatch {
        /// The object's OID.
        oid: Oid,
        /// What the graph expected to find there.
        expected: &'static str,
        /// What was actually decoded.
        actual: CodeTypeId,
    },
    /// An OID string failed to parse/encode as 32 raw bytes.
    #[error("bad OID: {0}")]
    BadOid(String),
    /// Commit `meta` bytes did not decode as the expected JSON shape.
    #[error("commit meta encoding error: {0}")]
    MetaEncoding(String),
    /// A tree entry's `name`/`codeID` bytes were not valid UTF-8.
    #[error("bad UTF-8 in tree entry: {0}")]
    BadUtf8(String),
}

impl From<GraphError> for zt_error::ZtError {
    fn from(e: GraphError) -> Self {
        zt_error::ZtError::new(zt_error::ErrorCode::StorageEntityMapping, e.to_string())
    }
}

/// Load and decode the commit object at `oid`.
///
/// # Errors
///
/// See [`GraphError`].
pub fn read_commit(store: &dyn ObjectStore, oid: &Oid) -> Result<zt_core::Commit, GraphError> {
    let bytes = store.get(oid)?;
    let obj = zt_objectstore::decode_object(&bytes)?;
    if obj.header.code_type_id != CodeTypeId::Commit {
        return Err(GraphError::TypeMismatch {
            oid: oid.clone(),
            expected: "Commit",
            actual: obj.header.code_type_id,
        });
    }
    decode_commit(&obj.payload)
}

/// Load commit `ref_oid`, then load and decode its tree (`spec.md` §4.2:
/// `readTree`).
///
/// # Errors
///
/// Fails if either object is missing, mistyped, or corrupt.
pub fn read_tree(store: &dyn ObjectStore, ref_oid: &Oid) -> Result<Tree, GraphError> {
    let commit = read_commit(store, ref_oid)?;
    let bytes = store.get(&commit.tree)?;
    let obj = zt_objectstore::decode_object(&bytes)?;
    if obj.header.code_type_id != CodeTypeId::Tree {
        return Err(GraphError::TypeMismatch {
            oid: commit.tree.clone(),
            expected: "Tree",
            actual: obj.header.code_type_id,
        });
    }
    decode_tree(&obj.payload)
}

/// Materialize a [`PolicyStore`] from a ledger ref (`spec.md` §4.2:
/// `assemblePolicyStore`).
///
/// 1. Rejects the zero OID.
/// 2. Walks `ref -> commit -> tree`.
/// 3. Loads and classifies each tree entry's object into `schemas` or
///    `policies`; any other `codeTypeID` is a hard failure.
///
/// Pure function of the object store's contents (`spec.md` §8 property 3):
/// two calls with identical store contents and the same `ref_oid` produce
/// policy stores with equal `(version, schemas keyset, policies keyset)`.
///
/// # Errors
///
/// See [`GraphError`].
pub fn assemble_policy_store(
    store: &dyn ObjectStore,
    ref_oid: &Oid,
) -> Result<PolicyStore, GraphError> {
    if ref_oid.is_zero() {
        return Err(GraphError::ZeroRef);
    }
    let tree = read_tree(store, ref_oid)?;
    let mut policy_store = PolicyStore::new(ref_oid.clone());

    for entry in &tree.entries {
        let bytes = store.get(&entry.oid)?;
        let obj = zt_objectstore::decode_object(&bytes)?;
        let info = zt_objectstore::get_object_info(&obj);
        match obj.header.code_type_id {
            CodeTypeId::Schema => {
                policy_store.schemas.insert(info.oid.clone(), info);
            }
            CodeTypeId::Policy => {
                policy_store.policies.insert(info.oid.clone(), info);
            }
            other => return Err(GraphError::UnexpectedEntryType(other)),
        }
    }

    debug!(
        target: "zt.graph",
        version = %policy_store.version,
        schemas = policy_store.schemas.len(),
        policies = policy_store.policies.len(),
        "policy store assembled"
    );
    Ok(policy_store)
}
