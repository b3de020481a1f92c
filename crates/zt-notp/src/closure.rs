// SPDX-License-Identifier: MIT OR Apache-2.0
//! Reachable-closure walk: the set of OIDs a ledger ref transitively depends
//! on (its commit, that commit's parent chain, each commit's tree, and each
//! tree's entries) — what a Leader advertises and a Follower must fully hold
//! before it can adopt the ref (`spec.md` §4.3: `AdvertiseRef->AdvertiseObjects`,
//! `TransferObjects->Finalize`).

use std::collections::BTreeSet;

use zt_core::{CodeTypeId, Oid};
use zt_graph::GraphError;
use zt_objectstore::ObjectStore;

/// Walk `ref_oid`'s one-parent commit chain back to the root, collecting
/// every commit, tree, and tree-entry OID along the way.
///
/// Returns `Ok(BTreeSet::new())` for [`Oid::zero`] (an empty ref has an
/// empty closure — `spec.md` §3: `ZeroOID` means "no object / empty ref").
///
/// # Errors
///
/// Returns [`GraphError`] if any object in the chain is missing, mistyped,
/// or declares more than one parent.
pub fn reachable_closure(store: &dyn ObjectStore, ref_oid: &Oid) -> Result<BTreeSet<Oid>, GraphError> {
    let mut closure = BTreeSet::new();
    if ref_oid.is_zero() {
        return Ok(closure);
    }

    let mut cursor = ref_oid.clone();
    loop {
        closure.insert(cursor.clone());
        let commit = zt_graph::read_commit(store, &cursor)?;
        closure.insert(commit.tree.clone());

        let tree_bytes = store.get(&commit.tree)?;
        let tree_obj = zt_objectstore::decode_object(&tree_bytes)?;
        if tree_obj.header.code_type_id != CodeTypeId::Tree {
            return Err(GraphError::TypeMismatch {
                oid: commit.tree.clone(),
                expected: "Tree",
                actual: tree_obj.header.code_type_id,
            });
        }
        let tree = zt_graph::decode_tree(&tree_obj.payload)?;
        for entry in &tree.entries {
            closure.insert(entry.oid.clone());
        }

        match commit.parents.len() {
            0 => break,
            1 => cursor = commit.parents[0].clone(),
            n => return Err(GraphError::MultiParentUnsupported(n)),
        }
    }

    Ok(closure)
}

/// Return the subset of `closure` not already present in `store`
/// (`spec.md` §4.3: "Follower replies with `ObjectRequest` packets
/// enumerating OIDs it actually needs").
pub fn missing_from(
    store: &dyn ObjectStore,
    closure: &BTreeSet<Oid>,
) -> Result<Vec<Oid>, zt_objectstore::ObjectStoreError> {
    let mut missing = Vec::new();
    for oid in closure {
        if !store.has(oid)? {
            missing.push(oid.clone());
        }
    }
    Ok(missing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use zt_core::{Commit, CommitMetaInfo, ObjectHeader, Tree, TreeEntry, TreeEntryType, OBJECT_WIRE_VERSION};
    use zt_objectstore::{build_object, InMemoryObjectStore};

    fn put_typed(store: &InMemoryObjectStore, code_type_id: CodeTypeId, payload: Vec<u8>) -> Oid {
        let obj = build_object(code_type_id, 1, payload);
        store
            .put(&zt_objectstore::encode_object(&obj.header, &obj.payload))
            .unwrap()
    }

    fn seed_single_commit() -> (InMemoryObjectStore, Oid) {
        let store = InMemoryObjectStore::new();
        let schema_oid = put_typed(&store, CodeTypeId::Schema, b"{}".to_vec());
        let policy_oid = put_typed(&store, CodeTypeId::Policy, b"permit(principal, action, resource);".to_vec());

        let tree = Tree {
            entries: vec![
                TreeEntry {
                    oid: schema_oid.clone(),
                    entry_type: TreeEntryType::Schema,
                    name: "s".into(),
                    code_id: "S1".into(),
                    code_type_id: CodeTypeId::Schema,
                    language_id: 1,
                },
                TreeEntry {
                    oid: policy_oid.clone(),
                    entry_type: TreeEntryType::Policy,
                    name: "p".into(),
                    code_id: "P1".into(),
                    code_type_id: CodeTypeId::Policy,
                    language_id: 1,
                },
            ],
        };
        let tree_bytes = zt_graph::encode_tree(&tree).unwrap();
        let tree_header = ObjectHeader {
            version: OBJECT_WIRE_VERSION,
            code_type_id: CodeTypeId::Tree,
            language_id: 0,
        };
        let tree_oid = store
            .put(&zt_objectstore::encode_object(&tree_header, &tree_bytes))
            .unwrap();

        let commit = Commit {
            tree: tree_oid.clone(),
            parents: vec![],
            meta: CommitMetaInfo::default(),
            timestamp_nanos: 0,
        };
        let commit_bytes = zt_graph::encode_commit(&commit).unwrap();
        let commit_header = ObjectHeader {
            version: OBJECT_WIRE_VERSION,
            code_type_id: CodeTypeId::Commit,
            language_id: 0,
        };
        let commit_oid = store
            .put(&zt_objectstore::encode_object(&commit_header, &commit_bytes))
            .unwrap();

        (store, commit_oid)
    }

    #[test]
    fn zero_ref_has_empty_closure() {
        let store = InMemoryObjectStore::new();
        let closure = reachable_closure(&store, &Oid::zero()).unwrap();
        assert!(closure.is_empty());
    }

    #[test]
    fn closure_includes_commit_tree_and_entries() {
        let (store, ref_oid) = seed_single_commit();
        let closure = reachable_closure(&store, &ref_oid).unwrap();
        assert!(closure.contains(&ref_oid));
        assert_eq!(closure.len(), 4); // commit + tree + schema + policy
    }

    #[test]
    fn missing_from_reports_absent_objects() {
        let (store, ref_oid) = seed_single_commit();
        let closure = reachable_closure(&store, &ref_oid).unwrap();
        let empty_follower = InMemoryObjectStore::new();
        let missing = missing_from(&empty_follower, &closure).unwrap();
        assert_eq!(missing.len(), closure.len());
    }

    #[test]
    fn missing_from_is_empty_once_all_present() {
        let (store, ref_oid) = seed_single_commit();
        let closure = reachable_closure(&store, &ref_oid).unwrap();
        let missing = missing_from(&store, &closure).unwrap();
        assert!(missing.is_empty());
    }
}
