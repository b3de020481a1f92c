// SPDX-License-Identifier: MIT OR Apache-2.0
//! `diff()`/`plan()` — compute what a pull (or push) would change, without
//! performing any NOTP exchange, by comparing two reachable-OID closures
//! already present in the local object store.
//!
//! Surfaces `CliWorkspaceInvalidHead` (`08111`) when the workspace's own
//! head OID cannot be resolved locally — `spec.md` §6 names the code but
//! leaves it unelaborated; `SPEC_FULL.md` §12 grounds it in `permguard`'s
//! usage: it fires when a workspace ref points at a commit the local
//! object store cannot resolve, prompting a pull.

use std::collections::BTreeSet;

use zt_core::Oid;
use zt_error::{ErrorCode, ZtError};
use zt_objectstore::ObjectStore;

/// The set of object additions/removals between the workspace's current
/// head and a candidate ref, in terms of content-addressed OIDs (there are
/// no file paths in this core — `spec.md` §1 scopes working-directory
/// file helpers out).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffSummary {
    /// OIDs reachable from the candidate ref but not from the current head.
    pub additions: BTreeSet<Oid>,
    /// OIDs reachable from the current head but not from the candidate ref.
    pub removals: BTreeSet<Oid>,
}

impl DiffSummary {
    /// `true` if applying this diff would be a no-op.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.additions.is_empty() && self.removals.is_empty()
    }
}

/// Compare the workspace's current head against `candidate`, both already
/// resolvable in `store`.
///
/// # Errors
///
/// Returns [`ZtError`] with [`ErrorCode::CliWorkspaceInvalidHead`] if
/// `current_head` is non-zero but unresolvable in `store` (the workspace is
/// out of sync with its own recorded state and needs a pull before any
/// local diff/plan is meaningful).
pub fn diff(store: &dyn ObjectStore, current_head: &Oid, candidate: &Oid) -> Result<DiffSummary, ZtError> {
    let current_closure = resolvable_closure(store, current_head)?;
    let candidate_closure = zt_notp::reachable_closure(store, candidate).map_err(|e| {
        ZtError::new(ErrorCode::AuthzInternalError, format!("candidate ref unreadable: {e}"))
    })?;

    Ok(DiffSummary {
        additions: candidate_closure.difference(&current_closure).cloned().collect(),
        removals: current_closure.difference(&candidate_closure).cloned().collect(),
    })
}

/// A plan is just the diff rendered for human review before `apply()` — the
/// core does not stage a working directory, so there is nothing more to
/// compute (`spec.md` §1 explicitly excludes "workspace file-system
/// helpers").
pub type Plan = DiffSummary;

/// Build the pull/push plan for `candidate` against the workspace's current
/// head.
pub fn plan(store: &dyn ObjectStore, current_head: &Oid, candidate: &Oid) -> Result<Plan, ZtError> {
    diff(store, current_head, candidate)
}

/// Apply a previously computed [`Plan`] by adopting `candidate` as the new
/// head. All the objects the plan names must already exist in `store` —
/// `apply()` never fetches over the network; that is `pull`'s job.
pub fn apply(store: &dyn ObjectStore, candidate: &Oid, plan: &Plan) -> Result<Oid, ZtError> {
    for oid in &plan.additions {
        if !store.has(oid).unwrap_or(false) {
            return Err(ZtError::new(
                ErrorCode::AuthzInternalError,
                format!("plan addition {oid} is not present locally; pull first"),
            ));
        }
    }
    Ok(candidate.clone())
}

fn resolvable_closure(store: &dyn ObjectStore, head: &Oid) -> Result<BTreeSet<Oid>, ZtError> {
    if head.is_zero() {
        return Ok(BTreeSet::new());
    }
    zt_notp::reachable_closure(store, head).map_err(|_| {
        ZtError::from_code(ErrorCode::CliWorkspaceInvalidHead)
            .with_context("head", head.to_string())
    })
}
