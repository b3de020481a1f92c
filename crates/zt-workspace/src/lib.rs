// SPDX-License-Identifier: MIT OR Apache-2.0
//! The Workspace tool (`spec.md` §1, §2): a local working-directory workflow
//! — clone, diff, plan, apply, pull, push — targeting a remote ledger,
//! analogous to a distributed version control client.
//!
//! This crate only consumes/produces `(refs, commit_id)` pairs (`spec.md`
//! §3: "Workspace refs... an external collaborator's concern; the core only
//! consumes/produces `(refs, commit_id)` pairs") and drives [`zt_notp`]
//! state machines against the local [`zt_objectstore::ObjectStore`]. It
//! does not stage a working directory or write policy/schema files to
//! disk — `spec.md` §1 explicitly excludes "workspace file-system helpers
//! (mkdir/write/lock wrappers)" from the core.
#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Offline `diff()`/`plan()`/`apply()` over two reachable-OID closures.
pub mod diff;
/// Local `refs.toml` persistence (`RefsConfig`).
pub mod refs;
/// `pull()`/`push()` — drive a `zt-notp` FSM and persist the resulting ref.
pub mod sync;

pub use diff::{apply, diff, plan, DiffSummary, Plan};
pub use refs::{RefsConfig, RefsError};
pub use sync::{pull, push, SyncError};

use std::time::Duration;

use zt_notp::{HostHandler, Transport, DEFAULT_TIMEOUT};
use zt_objectstore::ObjectStore;

/// Clone a ledger into a fresh, unsynced workspace: build a [`RefsConfig`]
/// pointed at `remote`/`zone_id`/`ledger_id`/`refs` with `commit_id` at the
/// zero OID, then immediately [`pull`] to populate the local object store
/// and adopt the remote's current head (`spec.md` §2: "Data flow for a
/// pull: workspace -> ... construct Follower FSM -> drive flow FlowPull").
///
/// Equivalent to `RefsConfig::new(..)` followed by `pull(..)`, provided as
/// a single entry point because a clone's distinguishing property — that
/// it starts from the zero OID — is easy to get wrong by hand.
///
/// # Errors
///
/// Returns [`SyncError`] if the underlying NOTP pull flow fails.
pub fn clone<H: HostHandler>(
    transport: &mut dyn Transport,
    store: &dyn ObjectStore,
    remote: impl Into<String>,
    zone_id: i64,
    ledger_id: impl Into<String>,
    refs_name: impl Into<String>,
    stream_id: u64,
    handler: &mut H,
) -> Result<RefsConfig, SyncError> {
    let mut cfg = RefsConfig::new(remote, zone_id, ledger_id, refs_name);
    pull(transport, store, &mut cfg, stream_id, handler, DEFAULT_TIMEOUT)?;
    Ok(cfg)
}

/// Clone with an explicit `recv` timeout, for callers that can't accept the
/// `spec.md` §4.3 default of 30s (e.g. tests against a slow in-memory
/// transport, or a deployment with a tighter SLA).
///
/// # Errors
///
/// As [`clone`].
pub fn clone_with_timeout<H: HostHandler>(
    transport: &mut dyn Transport,
    store: &dyn ObjectStore,
    remote: impl Into<String>,
    zone_id: i64,
    ledger_id: impl Into<String>,
    refs_name: impl Into<String>,
    stream_id: u64,
    handler: &mut H,
    timeout: Duration,
) -> Result<RefsConfig, SyncError> {
    let mut cfg = RefsConfig::new(remote, zone_id, ledger_id, refs_name);
    pull(transport, store, &mut cfg, stream_id, handler, timeout)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use zt_core::{CodeTypeId, Commit, CommitMetaInfo, ObjectHeader, Tree, TreeEntry, TreeEntryType, OBJECT_WIRE_VERSION};
    use zt_notp::{run_leader, ChannelTransport, Flow, NoopHandler};
    use zt_objectstore::{build_object, encode_object, InMemoryObjectStore};

    fn seed(store: &InMemoryObjectStore) -> zt_core::Oid {
        let obj = build_object(CodeTypeId::Policy, 1, b"permit(principal, action, resource);".to_vec());
        let policy_oid = store.put(&encode_object(&obj.header, &obj.payload)).unwrap();
        let tree = Tree {
            entries: vec![TreeEntry {
                oid: policy_oid,
                entry_type: TreeEntryType::Policy,
                name: "p.cedar".into(),
                code_id: "P1".into(),
                code_type_id: CodeTypeId::Policy,
                language_id: 1,
            }],
        };
        let tree_bytes = zt_graph::encode_tree(&tree).unwrap();
        let tree_oid = store
            .put(&encode_object(
                &ObjectHeader {
                    version: OBJECT_WIRE_VERSION,
                    code_type_id: CodeTypeId::Tree,
                    language_id: 0,
                },
                &tree_bytes,
            ))
            .unwrap();
        let commit = Commit {
            tree: tree_oid,
            parents: vec![],
            meta: CommitMetaInfo::default(),
            timestamp_nanos: 0,
        };
        let commit_bytes = zt_graph::encode_commit(&commit).unwrap();
        store
            .put(&encode_object(
                &ObjectHeader {
                    version: OBJECT_WIRE_VERSION,
                    code_type_id: CodeTypeId::Commit,
                    language_id: 0,
                },
                &commit_bytes,
            ))
            .unwrap()
    }

    #[test]
    fn clone_starts_from_zero_and_adopts_remote_head() {
        let remote_store = InMemoryObjectStore::new();
        let remote_ref = seed(&remote_store);
        let local_store = InMemoryObjectStore::new();

        let (mut remote_t, mut local_t) = ChannelTransport::pair();
        let timeout = Duration::from_secs(2);

        let remote_ref_clone = remote_ref.clone();
        let leader_handle = thread::spawn(move || {
            run_leader(
                &mut remote_t,
                &remote_store,
                Flow::Pull,
                1,
                &remote_ref_clone,
                &mut NoopHandler,
                timeout,
            )
        });

        let cfg = clone_with_timeout(
            &mut local_t,
            &local_store,
            "pap.example.com:8443",
            10,
            "L1",
            "main",
            1,
            &mut NoopHandler,
            timeout,
        )
        .unwrap();
        leader_handle.join().unwrap().unwrap();

        assert_eq!(cfg.commit_id, remote_ref);
        assert!(local_store.has(&remote_ref).unwrap());
    }

    #[test]
    fn diff_plan_apply_roundtrip_after_clone() {
        let store = InMemoryObjectStore::new();
        let head = seed(&store);

        // A workspace that has already cloned `head` diffs empty against
        // itself, and a plan/apply cycle is a no-op.
        let summary = diff::diff(&store, &head, &head).unwrap();
        assert!(summary.is_empty());
        let plan = diff::plan(&store, &head, &head).unwrap();
        let applied = diff::apply(&store, &head, &plan).unwrap();
        assert_eq!(applied, head);
    }
}
