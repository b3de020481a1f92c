// SPDX-License-Identifier: MIT OR Apache-2.0
//! The authorization decision pipeline (`spec.md` §4.4, L6-L7): given an
//! `AuthorizationRequest`, expand it into evaluations, load the policy
//! store named by the target ledger, delegate each evaluation to a policy
//! evaluator ([`zt_eval`]), and aggregate the results with user-vs-admin
//! reasoning.
//!
//! [`Pdp`] is the entry point; [`ledger::LedgerRepository`] is the one
//! external collaborator the pipeline needs beyond the object store and
//! evaluator already built by lower layers.
#![deny(unsafe_code)]
#![warn(missing_docs)]

/// `buildContext` mapping from evaluator outcomes to response reasons.
pub mod context;
/// The ledger lookup collaborator (`spec.md` §4.4 step 1).
pub mod ledger;
/// `AuthorizationCheck` itself.
pub mod pipeline;

pub use context::{build_error_context, build_eval_context};
pub use ledger::{InMemoryLedgerRepository, LedgerLookupError, LedgerRepository};
pub use pipeline::Pdp;
