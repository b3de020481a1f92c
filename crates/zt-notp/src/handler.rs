// SPDX-License-Identifier: MIT OR Apache-2.0
//! Host handler: per-state callbacks letting the application inject side
//! effects (persist a new ref, query which OIDs it has) without the FSM
//! knowing the storage layout (`spec.md` §4.3, §9: "Cyclic references
//! between object store and FSM host handler").

use std::collections::BTreeMap;

use zt_error::ZtError;

use crate::fsm::NotpState;

/// Free-form side-channel data the FSM and host exchange at each state,
/// keyed the way the original implementation's callback bag was (e.g.
/// `LocalCodeCommitIDKey`, `RemoteCommitIDKey`).
pub type Bag = BTreeMap<String, serde_json::Value>;

/// What a [`HostHandler`] callback asks the FSM to do next.
#[derive(Debug, Default)]
pub struct HandlerOutcome {
    /// Advisory next-state hint (e.g. "empty delta, skip straight to
    /// Finalize" — `spec.md` §4.3). The FSM honors this only for advisory
    /// branching; it never uses it to skip a required protocol exchange.
    pub next_state_hint: Option<NotpState>,
    /// Key/value pairs to merge into the shared [`Bag`] after this callback
    /// returns.
    pub bag_updates: Bag,
}

impl HandlerOutcome {
    /// No hint, no bag updates — the common case.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Merge-only outcome with no state hint.
    #[must_use]
    pub fn with_bag(bag_updates: Bag) -> Self {
        Self {
            next_state_hint: None,
            bag_updates,
        }
    }
}

/// Host-provided callback, invoked once per state the FSM strictly
/// monotonically passes through (`spec.md` §5: "the host handler sees
/// states in strict monotonic order").
///
/// A one-way interface: the handler may hold a store reference, but the
/// store itself is oblivious to handlers (`spec.md` §9 design note).
pub trait HostHandler {
    /// Called on entry to `state`, with the bag accumulated so far.
    ///
    /// # Errors
    ///
    /// Any error returned here is treated as a protocol-terminating
    /// failure; the FSM transitions to [`NotpState::Error`].
    fn on(&mut self, state: NotpState, bag: &Bag) -> Result<HandlerOutcome, ZtError>;
}

/// A [`HostHandler`] that does nothing at every state — useful for flows
/// that need no side effects beyond what the FSM itself performs (tests,
/// dry-run negotiation).
#[derive(Debug, Default)]
pub struct NoopHandler;

impl HostHandler for NoopHandler {
    fn on(&mut self, _state: NotpState, _bag: &Bag) -> Result<HandlerOutcome, ZtError> {
        Ok(HandlerOutcome::none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_handler_never_hints() {
        let mut h = NoopHandler;
        let out = h.on(NotpState::Init, &Bag::new()).unwrap();
        assert!(out.next_state_hint.is_none());
        assert!(out.bag_updates.is_empty());
    }
}
