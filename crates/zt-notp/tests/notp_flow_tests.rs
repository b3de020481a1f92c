// SPDX-License-Identifier: MIT OR Apache-2.0
//! Integration coverage for the Leader/Follower pull flow driven over a
//! real [`ChannelTransport`] pair on separate threads.

use std::thread;
use std::time::Duration;

use zt_core::{CodeTypeId, Commit, CommitMetaInfo, ObjectHeader, Oid, Tree, TreeEntry, TreeEntryType, OBJECT_WIRE_VERSION};
use zt_notp::{run_follower, run_leader, ChannelTransport, Flow, NoopHandler, NotpError, NotpState};
use zt_objectstore::{build_object, InMemoryObjectStore, ObjectStore};

fn put_typed(store: &InMemoryObjectStore, code_type_id: CodeTypeId, payload: Vec<u8>) -> Oid {
    let obj = build_object(code_type_id, 1, payload);
    store
        .put(&zt_objectstore::encode_object(&obj.header, &obj.payload))
        .unwrap()
}

fn seed_ledger(store: &InMemoryObjectStore) -> Oid {
    let schema_oid = put_typed(store, CodeTypeId::Schema, b"{}".to_vec());
    let policy_oid = put_typed(
        store,
        CodeTypeId::Policy,
        b"permit(principal, action, resource);".to_vec(),
    );
    let tree = Tree {
        entries: vec![
            TreeEntry {
                oid: schema_oid,
                entry_type: TreeEntryType::Schema,
                name: "schema.cedarschema".into(),
                code_id: "S1".into(),
                code_type_id: CodeTypeId::Schema,
                language_id: 1,
            },
            TreeEntry {
                oid: policy_oid,
                entry_type: TreeEntryType::Policy,
                name: "policy.cedar".into(),
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
        tree: tree_oid,
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
    store
        .put(&zt_objectstore::encode_object(&commit_header, &commit_bytes))
        .unwrap()
}

/// S6 — Follower's local ref already equals Leader's: no `ObjectData`
/// packets, ref unchanged, no objects transferred (`spec.md` §8 S6).
#[test]
fn s6_pull_no_op_when_ref_already_current() {
    let leader_store = InMemoryObjectStore::new();
    let leader_ref = seed_ledger(&leader_store);
    let follower_store = InMemoryObjectStore::new();
    // Follower already has the same objects as the leader, at the same ref.
    seed_ledger(&follower_store);

    let (mut leader_t, mut follower_t) = ChannelTransport::pair();
    let timeout = Duration::from_secs(2);
    let leader_ref_clone = leader_ref.clone();

    let leader_handle = thread::spawn(move || {
        run_leader(
            &mut leader_t,
            &leader_store,
            Flow::Pull,
            1,
            &leader_ref_clone,
            &mut NoopHandler,
            timeout,
        )
    });

    let follower_outcome = run_follower(
        &mut follower_t,
        &follower_store,
        Flow::Pull,
        1,
        &leader_ref,
        &mut NoopHandler,
        timeout,
    )
    .unwrap();

    let leader_outcome = leader_handle.join().unwrap().unwrap();

    assert_eq!(follower_outcome.final_state, NotpState::Done);
    assert_eq!(leader_outcome.final_state, NotpState::Done);
    assert_eq!(follower_outcome.objects_transferred, 0);
    assert_eq!(leader_outcome.objects_transferred, 0);
    assert_eq!(follower_outcome.ref_oid, leader_ref);
}

/// A full pull from an empty follower transfers every reachable object and
/// the follower ends up able to resolve the whole closure locally
/// (`spec.md` §8 property 6: "NOTP round-trip").
#[test]
fn pull_from_empty_follower_transfers_full_closure() {
    let leader_store = InMemoryObjectStore::new();
    let leader_ref = seed_ledger(&leader_store);
    let follower_store = InMemoryObjectStore::new();

    let (mut leader_t, mut follower_t) = ChannelTransport::pair();
    let timeout = Duration::from_secs(2);
    let leader_ref_clone = leader_ref.clone();

    let leader_handle = thread::spawn(move || {
        run_leader(
            &mut leader_t,
            &leader_store,
            Flow::Pull,
            2,
            &leader_ref_clone,
            &mut NoopHandler,
            timeout,
        )
    });

    let follower_outcome = run_follower(
        &mut follower_t,
        &follower_store,
        Flow::Pull,
        2,
        &Oid::zero(),
        &mut NoopHandler,
        timeout,
    )
    .unwrap();
    leader_handle.join().unwrap().unwrap();

    assert_eq!(follower_outcome.ref_oid, leader_ref);
    assert_eq!(follower_outcome.objects_transferred, 4);
    let policy_store = zt_graph::assemble_policy_store(&follower_store, &leader_ref).unwrap();
    assert_eq!(policy_store.schemas.len(), 1);
    assert_eq!(policy_store.policies.len(), 1);
}

/// Push flow is the same state graph with roles reversed: the workspace
/// leads, PAP follows (`spec.md` §4.3: "Each flow... has a shared state
/// graph").
#[test]
fn push_flow_transfers_workspace_history_to_pap() {
    let workspace_store = InMemoryObjectStore::new();
    let workspace_ref = seed_ledger(&workspace_store);
    let pap_store = InMemoryObjectStore::new();

    let (mut workspace_t, mut pap_t) = ChannelTransport::pair();
    let timeout = Duration::from_secs(2);
    let ref_clone = workspace_ref.clone();

    let workspace_handle = thread::spawn(move || {
        run_leader(
            &mut workspace_t,
            &workspace_store,
            Flow::Push,
            3,
            &ref_clone,
            &mut NoopHandler,
            timeout,
        )
    });

    let pap_outcome = run_follower(
        &mut pap_t,
        &pap_store,
        Flow::Push,
        3,
        &Oid::zero(),
        &mut NoopHandler,
        timeout,
    )
    .unwrap();
    workspace_handle.join().unwrap().unwrap();

    assert_eq!(pap_outcome.ref_oid, workspace_ref);
    assert!(pap_store.has(&workspace_ref).unwrap());
}

/// A corrupted `ObjectData` payload (bytes mutated after the sender claimed
/// an OID) must be rejected rather than silently accepted (`spec.md` §4.3:
/// "Follower verifies each packet by recomputing SHA256").
#[test]
fn tampered_object_bytes_are_rejected() {
    let leader_store = InMemoryObjectStore::new();
    let leader_ref = seed_ledger(&leader_store);
    let follower_store = InMemoryObjectStore::new();

    let (mut leader_t, mut follower_t) = ChannelTransport::pair();
    let timeout = Duration::from_secs(2);

    // Drive the leader manually far enough to inject a tampered packet.
    let leader_handle = thread::spawn(move || {
        use zt_notp::frame::PacketKind;
        use zt_notp::packet::{Hello, ObjectAdvertise, ObjectData, ObjectRequest, RefAdvertise};
        use zt_notp::Transport;

        let hello = Hello {
            protocol_version: zt_core::NOTP_PROTOCOL_VERSION,
            capabilities: vec!["pull".into()],
        };
        leader_t.send(&hello.clone().into_frame(9, 0)).unwrap();
        let _peer_hello = leader_t.recv(timeout).unwrap();

        leader_t
            .send(
                &RefAdvertise {
                    ref_oid: leader_ref.clone(),
                }
                .into_frame(9, 1),
            )
            .unwrap();
        let _peer_ref = leader_t.recv(timeout).unwrap();

        let closure = zt_notp::reachable_closure(&leader_store, &leader_ref).unwrap();
        leader_t
            .send(
                &ObjectAdvertise {
                    oids: closure.into_iter().collect(),
                }
                .into_frame(9, 2, true),
            )
            .unwrap();
        let req_frame = leader_t.recv(timeout).unwrap();
        assert_eq!(req_frame.kind, PacketKind::ObjectRequest);
        let requested = ObjectRequest::from_frame(&req_frame).unwrap().oids;

        for (i, oid) in requested.iter().enumerate() {
            let mut bytes = leader_store.get(oid).unwrap();
            if i == 0 {
                *bytes.last_mut().unwrap() ^= 0xFF;
            }
            leader_t
                .send(
                    &ObjectData {
                        oid: oid.clone(),
                        bytes,
                    }
                    .into_frame(9, 3 + i as u64, i + 1 == requested.len()),
                )
                .unwrap();
        }
    });

    let result = run_follower(
        &mut follower_t,
        &follower_store,
        Flow::Pull,
        9,
        &Oid::zero(),
        &mut NoopHandler,
        timeout,
    );
    assert!(matches!(result, Err(NotpError::IntegrityMismatch { .. })));
    leader_handle.join().unwrap();
}
