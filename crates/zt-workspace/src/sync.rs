// SPDX-License-Identifier: MIT OR Apache-2.0
//! `pull()`/`push()` — drive a `zt-notp` FSM against a remote PAP and
//! persist the resulting ref (`SPEC_FULL.md` §12: "a `pull()`/`push()`
//! operation that drives a `zt-notp` FSM and persists the resulting ref").

use std::time::Duration;

use tracing::debug;
use zt_notp::{run_follower, run_leader, Flow, HostHandler, NotpError, Transport};
use zt_objectstore::ObjectStore;

use crate::refs::RefsConfig;

/// Errors from a pull or push operation.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The underlying NOTP flow failed.
    #[error("notp flow failed: {0}")]
    Notp(#[from] NotpError),
}

/// Pull: the workspace is the Follower; the remote PAP is the Leader
/// (`spec.md` §2: "Data flow for a pull: workspace -> ... construct
/// Follower FSM -> drive flow FlowPull").
///
/// On success, `refs.commit_id` is updated in place to the newly adopted
/// ref. The caller is responsible for persisting `refs` afterward (e.g. via
/// [`RefsConfig::save`]) — the FSM itself never touches the filesystem.
pub fn pull<H: HostHandler>(
    transport: &mut dyn Transport,
    store: &dyn ObjectStore,
    refs: &mut RefsConfig,
    stream_id: u64,
    handler: &mut H,
    timeout: Duration,
) -> Result<usize, SyncError> {
    debug!(target: "zt.workspace", stream_id, remote = %refs.remote, "pull starting");
    let outcome = run_follower(
        transport,
        store,
        Flow::Pull,
        stream_id,
        &refs.commit_id,
        handler,
        timeout,
    )?;
    debug!(
        target: "zt.workspace",
        stream_id,
        new_ref = %outcome.ref_oid,
        objects_transferred = outcome.objects_transferred,
        "pull complete"
    );
    refs.commit_id = outcome.ref_oid;
    Ok(outcome.objects_transferred)
}

/// Push: the workspace is the Leader; the remote PAP is the Follower.
/// `refs.commit_id` names the local head that becomes the new remote ref on
/// success.
pub fn push<H: HostHandler>(
    transport: &mut dyn Transport,
    store: &dyn ObjectStore,
    refs: &RefsConfig,
    stream_id: u64,
    handler: &mut H,
    timeout: Duration,
) -> Result<usize, SyncError> {
    debug!(target: "zt.workspace", stream_id, remote = %refs.remote, local_ref = %refs.commit_id, "push starting");
    let outcome = run_leader(
        transport,
        store,
        Flow::Push,
        stream_id,
        &refs.commit_id,
        handler,
        timeout,
    )?;
    debug!(
        target: "zt.workspace",
        stream_id,
        objects_transferred = outcome.objects_transferred,
        "push complete"
    );
    Ok(outcome.objects_transferred)
}
