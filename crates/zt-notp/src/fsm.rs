// SPDX-License-Identifier: MIT OR Apache-2.0
//! Leader/Follower state machines driving NOTP pull/push flows (`spec.md`
//! §4.3).
//!
//! ```text
//! Init -> Negotiate -> AdvertiseRef -> AdvertiseObjects -> TransferObjects
//!      -> Finalize -> Done
//! ```
//! with an orthogonal `Error` sink reachable from any state on protocol
//! violation or transport error. Each flow (`Pull`, `Push`) shares this
//! graph; only which side plays Leader differs (PAP is Leader for a pull,
//! the workspace is Leader for a push).

use std::collections::BTreeSet;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};
use zt_core::{Oid, NOTP_PROTOCOL_VERSION};
use zt_error::{ErrorCode, ZtError};
use zt_objectstore::ObjectStore;

use crate::closure::{missing_from, reachable_closure};
use crate::frame::PacketKind;
use crate::handler::{Bag, HostHandler};
use crate::packet::{Done, ErrorBody, Hello, ObjectAdvertise, ObjectData, ObjectRequest, PacketError, RefAdvertise};
use crate::transport::{Transport, TransportError};

/// A state in the NOTP flow graph (`spec.md` §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotpState {
    /// Flow just constructed; no packets exchanged yet.
    Init,
    /// Hello exchange: protocol version and capabilities.
    Negotiate,
    /// Both peers have exchanged their current ref OID.
    AdvertiseRef,
    /// Leader has advertised candidate OIDs; Follower has requested what it needs.
    AdvertiseObjects,
    /// Leader is streaming requested object bytes.
    TransferObjects,
    /// Follower is validating the full closure and adopting the new ref.
    Finalize,
    /// Both sides have returned control to the host.
    Done,
    /// Terminal failure sink, reachable from any other state.
    Error,
}

/// Which synchronization flow this FSM instance is driving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Workspace (Follower) catching up from PAP (Leader).
    Pull,
    /// Workspace (Leader) pushing local history to PAP (Follower).
    Push,
}

impl Flow {
    fn capability(self) -> &'static str {
        match self {
            Self::Pull => "pull",
            Self::Push => "push",
        }
    }
}

/// Errors raised while driving a NOTP flow. Every variant maps to
/// [`ErrorCode::ServerInfrastructure`] at the `zt_error` boundary
/// (`spec.md` §7: "NOTP protocol-violation errors... surfaced as
/// `ErrServerInfrastructure`").
#[derive(Debug, Error)]
pub enum NotpError {
    /// The transport failed to send or receive a frame.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// A received frame didn't decode as the expected packet.
    #[error(transparent)]
    Packet(#[from] PacketError),
    /// The commit/tree graph couldn't be walked (missing/corrupt object).
    #[error(transparent)]
    Graph(#[from] zt_graph::GraphError),
    /// The object store backend failed.
    #[error(transparent)]
    Store(#[from] zt_objectstore::ObjectStoreError),
    /// The host handler raised an error from its callback.
    #[error("host handler error: {0}")]
    Handler(ZtError),
    /// Peers advertised incompatible protocol versions.
    #[error("protocol version mismatch: local={local}, remote={remote}")]
    VersionMismatch {
        /// This side's protocol version.
        local: u8,
        /// The peer's advertised protocol version.
        remote: u8,
    },
    /// An `ObjectData` packet's bytes didn't hash to the OID it claimed.
    #[error("object integrity check failed: claimed {claimed}, computed {computed}")]
    IntegrityMismatch {
        /// OID the sender claimed.
        claimed: Oid,
        /// OID actually computed from the received bytes.
        computed: Oid,
    },
    /// After transfer, the Follower's store still lacks objects the
    /// adopted ref transitively requires.
    #[error("incomplete closure after transfer: {missing} object(s) still missing")]
    IncompleteClosure {
        /// How many closure members remain absent.
        missing: usize,
    },
    /// The peer sent an `Error` packet.
    #[error("peer reported protocol error: [{code}] {message}")]
    PeerError {
        /// The peer's reported error code.
        code: String,
        /// The peer's reported error message.
        message: String,
    },
}

impl From<NotpError> for ZtError {
    fn from(e: NotpError) -> Self {
        ZtError::new(ErrorCode::ServerInfrastructure, e.to_string())
    }
}

fn run_handler<H: HostHandler>(handler: &mut H, state: NotpState, bag: &mut Bag) -> Result<Option<NotpState>, NotpError> {
    let outcome = handler.on(state, bag).map_err(NotpError::Handler)?;
    bag.extend(outcome.bag_updates);
    Ok(outcome.next_state_hint)
}

/// Outcome of a completed Leader run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderOutcome {
    /// The state the flow terminated in (`Done` on success).
    pub final_state: NotpState,
    /// The ref OID the Leader advertised.
    pub ref_oid: Oid,
    /// How many objects were transferred to the Follower.
    pub objects_transferred: usize,
}

/// Outcome of a completed Follower run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowerOutcome {
    /// The state the flow terminated in (`Done` on success).
    pub final_state: NotpState,
    /// The ref OID the Follower adopted (equals the Leader's advertised ref
    /// on success; the caller is responsible for persisting it — `spec.md`
    /// §3 treats workspace refs as an external collaborator's concern).
    pub ref_oid: Oid,
    /// How many objects were received and stored.
    pub objects_transferred: usize,
}

/// Drive a flow as the Leader: the source of truth (PAP for a pull,
/// workspace for a push).
///
/// # Errors
///
/// Returns [`NotpError`] on any transport, protocol, or handler failure.
pub fn run_leader<H: HostHandler>(
    transport: &mut dyn Transport,
    store: &dyn ObjectStore,
    flow: Flow,
    stream_id: u64,
    leader_ref: &Oid,
    handler: &mut H,
    timeout: Duration,
) -> Result<LeaderOutcome, NotpError> {
    let mut bag = Bag::new();
    let mut packet_id: u64 = 0;
    let mut next_id = || {
        let id = packet_id;
        packet_id += 1;
        id
    };

    run_handler(handler, NotpState::Init, &mut bag)?;

    // Negotiate
    transport.send(
        &Hello {
            protocol_version: NOTP_PROTOCOL_VERSION,
            capabilities: vec![flow.capability().to_string()],
        }
        .into_frame(stream_id, next_id()),
    )?;
    let peer_hello = recv_expect(transport, timeout, PacketKind::Hello)?;
    let peer_hello = Hello::from_frame(&peer_hello)?;
    if peer_hello.protocol_version != NOTP_PROTOCOL_VERSION {
        return Err(NotpError::VersionMismatch {
            local: NOTP_PROTOCOL_VERSION,
            remote: peer_hello.protocol_version,
        });
    }
    run_handler(handler, NotpState::Negotiate, &mut bag)?;

    // AdvertiseRef
    transport.send(
        &RefAdvertise {
            ref_oid: leader_ref.clone(),
        }
        .into_frame(stream_id, next_id()),
    )?;
    let follower_ref_frame = recv_expect(transport, timeout, PacketKind::RefAdvertise)?;
    let follower_ref = RefAdvertise::from_frame(&follower_ref_frame)?.ref_oid;
    bag.insert(
        "remote_ref".to_string(),
        serde_json::Value::String(follower_ref.as_str().to_string()),
    );
    run_handler(handler, NotpState::AdvertiseRef, &mut bag)?;

    if follower_ref == *leader_ref {
        debug!(target: "zt.notp", %stream_id, "empty delta, short-circuiting to Finalize");
        run_handler(handler, NotpState::Finalize, &mut bag)?;
        transport.send(
            &Done {
                ref_oid: Some(leader_ref.clone()),
            }
            .into_frame(stream_id, next_id()),
        )?;
        recv_expect(transport, timeout, PacketKind::Done)?;
        run_handler(handler, NotpState::Done, &mut bag)?;
        return Ok(LeaderOutcome {
            final_state: NotpState::Done,
            ref_oid: leader_ref.clone(),
            objects_transferred: 0,
        });
    }

    // AdvertiseObjects
    let closure = reachable_closure(store, leader_ref)?;
    transport.send(
        &ObjectAdvertise {
            oids: closure.into_iter().collect(),
        }
        .into_frame(stream_id, next_id(), true),
    )?;
    let requested_frame = recv_expect(transport, timeout, PacketKind::ObjectRequest)?;
    let requested = ObjectRequest::from_frame(&requested_frame)?.oids;
    run_handler(handler, NotpState::AdvertiseObjects, &mut bag)?;

    // TransferObjects
    let total = requested.len();
    for (i, oid) in requested.iter().enumerate() {
        let bytes = store.get(oid)?;
        transport.send(
            &ObjectData {
                oid: oid.clone(),
                bytes,
            }
            .into_frame(stream_id, next_id(), i + 1 == total),
        )?;
    }
    run_handler(handler, NotpState::TransferObjects, &mut bag)?;

    transport.send(
        &Done {
            ref_oid: Some(leader_ref.clone()),
        }
        .into_frame(stream_id, next_id()),
    )?;
    recv_expect(transport, timeout, PacketKind::Done)?;

    run_handler(handler, NotpState::Finalize, &mut bag)?;
    run_handler(handler, NotpState::Done, &mut bag)?;

    Ok(LeaderOutcome {
        final_state: NotpState::Done,
        ref_oid: leader_ref.clone(),
        objects_transferred: total,
    })
}

/// Drive a flow as the Follower: the catching-up peer (workspace for a
/// pull, PAP for a push).
///
/// # Errors
///
/// Returns [`NotpError`] on any transport, protocol, integrity, or handler
/// failure.
pub fn run_follower<H: HostHandler>(
    transport: &mut dyn Transport,
    store: &dyn ObjectStore,
    flow: Flow,
    stream_id: u64,
    local_ref: &Oid,
    handler: &mut H,
    timeout: Duration,
) -> Result<FollowerOutcome, NotpError> {
    let mut bag = Bag::new();
    let mut packet_id: u64 = 0;
    let mut next_id = || {
        let id = packet_id;
        packet_id += 1;
        id
    };

    run_handler(handler, NotpState::Init, &mut bag)?;

    // Negotiate
    let peer_hello_frame = recv_expect(transport, timeout, PacketKind::Hello)?;
    let peer_hello = Hello::from_frame(&peer_hello_frame)?;
    if peer_hello.protocol_version != NOTP_PROTOCOL_VERSION {
        return Err(NotpError::VersionMismatch {
            local: NOTP_PROTOCOL_VERSION,
            remote: peer_hello.protocol_version,
        });
    }
    transport.send(
        &Hello {
            protocol_version: NOTP_PROTOCOL_VERSION,
            capabilities: vec![flow.capability().to_string()],
        }
        .into_frame(stream_id, next_id()),
    )?;
    run_handler(handler, NotpState::Negotiate, &mut bag)?;

    // AdvertiseRef
    let leader_ref_frame = recv_expect(transport, timeout, PacketKind::RefAdvertise)?;
    let leader_ref = RefAdvertise::from_frame(&leader_ref_frame)?.ref_oid;
    transport.send(
        &RefAdvertise {
            ref_oid: local_ref.clone(),
        }
        .into_frame(stream_id, next_id()),
    )?;
    bag.insert(
        "remote_ref".to_string(),
        serde_json::Value::String(leader_ref.as_str().to_string()),
    );
    run_handler(handler, NotpState::AdvertiseRef, &mut bag)?;

    if leader_ref == *local_ref {
        debug!(target: "zt.notp", %stream_id, "empty delta, short-circuiting to Finalize");
        recv_expect(transport, timeout, PacketKind::Done)?;
        run_handler(handler, NotpState::Finalize, &mut bag)?;
        transport.send(
            &Done {
                ref_oid: Some(leader_ref.clone()),
            }
            .into_frame(stream_id, next_id()),
        )?;
        run_handler(handler, NotpState::Done, &mut bag)?;
        return Ok(FollowerOutcome {
            final_state: NotpState::Done,
            ref_oid: leader_ref,
            objects_transferred: 0,
        });
    }

    // AdvertiseObjects
    let advertise_frame = recv_expect(transport, timeout, PacketKind::ObjectAdvertise)?;
    let candidates: BTreeSet<Oid> = ObjectAdvertise::from_frame(&advertise_frame)?.oids.into_iter().collect();
    let needed = missing_from(store, &candidates)?;
    let needed_count = needed.len();
    transport.send(
        &ObjectRequest {
            oids: needed,
        }
        .into_frame(stream_id, next_id()),
    )?;
    run_handler(handler, NotpState::AdvertiseObjects, &mut bag)?;

    // TransferObjects — store each object as it arrives; verify integrity
    // before accepting (`spec.md` §4.3: "Follower verifies each packet by
    // recomputing SHA256 and either stores it or emits an Error").
    let mut received = 0usize;
    while received < needed_count {
        let frame = transport.recv(timeout)?;
        match frame.kind {
            PacketKind::ObjectData => {
                let data = ObjectData::from_frame(&frame)?;
                let (_obj, matches) = zt_objectstore::decode_and_check(&data.bytes, &data.oid)?;
                if !matches {
                    let computed = zt_core::Oid::of(&data.bytes);
                    warn!(target: "zt.notp", claimed = %data.oid, %computed, "object integrity mismatch");
                    return Err(NotpError::IntegrityMismatch {
                        claimed: data.oid,
                        computed,
                    });
                }
                store.put(&data.bytes)?;
                received += 1;
            }
            PacketKind::Error => {
                let err = ErrorBody::from_frame(&frame)?;
                return Err(NotpError::PeerError {
                    code: err.code,
                    message: err.message,
                });
            }
            other => {
                return Err(NotpError::Packet(PacketError::KindMismatch {
                    expected: PacketKind::ObjectData,
                    got: other,
                }))
            }
        }
    }
    run_handler(handler, NotpState::TransferObjects, &mut bag)?;

    let done_frame = recv_expect(transport, timeout, PacketKind::Done)?;
    Done::from_frame(&done_frame)?;

    // Finalize — the closure must be fully present before adopting the ref
    // (`spec.md` §4.3: "Follower must not acknowledge commit/tree objects
    // until all objects they transitively reference have been stored").
    let closure = reachable_closure(store, &leader_ref).map_err(|_| NotpError::IncompleteClosure { missing: 1 })?;
    let still_missing = missing_from(store, &closure)?;
    if !still_missing.is_empty() {
        return Err(NotpError::IncompleteClosure {
            missing: still_missing.len(),
        });
    }
    run_handler(handler, NotpState::Finalize, &mut bag)?;

    transport.send(
        &Done {
            ref_oid: Some(leader_ref.clone()),
        }
        .into_frame(stream_id, next_id()),
    )?;
    run_handler(handler, NotpState::Done, &mut bag)?;

    Ok(FollowerOutcome {
        final_state: NotpState::Done,
        ref_oid: leader_ref,
        objects_transferred: received,
    })
}

fn recv_expect(
    transport: &mut dyn Transport,
    timeout: Duration,
    expected: PacketKind,
) -> Result<crate::frame::Frame, NotpError> {
    let frame = transport.recv(timeout)?;
    if frame.kind == PacketKind::Error {
        let err = ErrorBody::from_frame(&frame)?;
        return Err(NotpError::PeerError {
            code: err.code,
            message: err.message,
        });
    }
    if frame.kind != expected {
        return Err(NotpError::Packet(PacketError::KindMismatch {
            expected,
            got: frame.kind,
        }));
    }
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::NoopHandler;
    use crate::transport::ChannelTransport;
    use std::thread;
    use zt_core::{Commit, CommitMetaInfo, ObjectHeader, Tree, TreeEntry, TreeEntryType, CodeTypeId, OBJECT_WIRE_VERSION};
    use zt_objectstore::{build_object, InMemoryObjectStore};

    fn put_typed(store: &InMemoryObjectStore, code_type_id: CodeTypeId, payload: Vec<u8>) -> Oid {
        let obj = build_object(code_type_id, 1, payload);
        store
            .put(&zt_objectstore::encode_object(&obj.header, &obj.payload))
            .unwrap()
    }

    fn seed_ledger(store: &InMemoryObjectStore) -> Oid {
        let schema_oid = put_typed(store, CodeTypeId::Schema, b"{}".to_vec());
        let policy_oid = put_typed(store, CodeTypeId::Policy, b"permit(principal, action, resource);".to_vec());
        let tree = Tree {
            entries: vec![
                TreeEntry {
                    oid: schema_oid,
                    entry_type: TreeEntryType::Schema,
                    name: "s".into(),
                    code_id: "S1".into(),
                    code_type_id: CodeTypeId::Schema,
                    language_id: 1,
                },
                TreeEntry {
                    oid: policy_oid,
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

    #[test]
    fn pull_transfers_full_closure_to_empty_follower() {
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
            &Oid::zero(),
            &mut NoopHandler,
            timeout,
        )
        .unwrap();

        let leader_outcome = leader_handle.join().unwrap().unwrap();

        assert_eq!(follower_outcome.final_state, NotpState::Done);
        assert_eq!(follower_outcome.ref_oid, leader_ref);
        assert_eq!(follower_outcome.objects_transferred, 4);
        assert_eq!(leader_outcome.ref_oid, leader_ref);

        let closure = reachable_closure(&follower_store, &leader_ref).unwrap();
        for oid in &closure {
            assert!(follower_store.has(oid).unwrap());
        }
    }

    #[test]
    fn pull_no_op_when_refs_already_match() {
        let leader_store = InMemoryObjectStore::new();
        let leader_ref = seed_ledger(&leader_store);

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

        let follower_store = InMemoryObjectStore::new();
        let follower_outcome = run_follower(
            &mut follower_t,
            &follower_store,
            Flow::Pull,
            2,
            &leader_ref,
            &mut NoopHandler,
            timeout,
        )
        .unwrap();

        leader_handle.join().unwrap().unwrap();
        assert_eq!(follower_outcome.objects_transferred, 0);
        assert!(follower_store.is_empty());
    }

    #[test]
    fn version_mismatch_is_rejected() {
        let (mut a, mut b) = ChannelTransport::pair();
        a.send(
            &Hello {
                protocol_version: 99,
                capabilities: vec![],
            }
            .into_frame(1, 0),
        )
        .unwrap();
        let store = InMemoryObjectStore::new();
        let result = run_follower(
            &mut b,
            &store,
            Flow::Pull,
            1,
            &Oid::zero(),
            &mut NoopHandler,
            Duration::from_millis(200),
        );
        assert!(matches!(result, Err(NotpError::VersionMismatch { .. })));
    }
}
