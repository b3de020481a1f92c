// SPDX-License-Identifier: MIT OR Apache-2.0
//! `AuthorizationCheck` — the decision pipeline itself (`spec.md` §4.4,
//! L6-L7): ledger lookup, ref validation, policy-store assembly, evaluator
//! binding, per-evaluation loop, aggregation.

use std::time::Duration;

use zt_core::{AuthorizationRequest, AuthorizationResponse, ContextResponse, EvaluationResponse};
use zt_error::ErrorCode;

use crate::context::{build_error_context, build_eval_context};
use crate::ledger::LedgerRepository;

/// Dependencies an `AuthorizationCheck` call is threaded through. Built once
/// per process (or once per request if the caller prefers a fresh evaluator
/// handle) and passed by reference — no global state (`spec.md` §9: "thread
/// an explicit context struct").
pub struct Pdp<'a> {
    /// Ledger lookup collaborator.
    pub ledgers: &'a dyn LedgerRepository,
    /// Content-addressed object store backing the policy-store assembler.
    pub store: &'a dyn zt_objectstore::ObjectStore,
    /// Policy-language evaluator binding (Cedar in this release).
    pub evaluator: &'a dyn zt_eval::PolicyEvaluator,
    /// Ambient deadline for a whole `authorization_check` call, normally
    /// sourced from `zt_config::PdpConfig::deadline()` (`spec.md` §5).
    deadline: Duration,
}

/// Fallback ambient deadline used by [`Pdp::new`] when no caller-supplied
/// value is available, mirroring `zt_config::PdpConfig::default().deadline_ms`.
const DEFAULT_DEADLINE: Duration = Duration::from_secs(5);

impl<'a> Pdp<'a> {
    /// Construct a decision pipeline over the given collaborators, with the
    /// default 5-second ambient deadline.
    #[must_use]
    pub fn new(
        ledgers: &'a dyn LedgerRepository,
        store: &'a dyn zt_objectstore::ObjectStore,
        evaluator: &'a dyn zt_eval::PolicyEvaluator,
    ) -> Self {
        Self::with_deadline(ledgers, store, evaluator, DEFAULT_DEADLINE)
    }

    /// Construct a decision pipeline with an explicit ambient deadline,
    /// typically `zt_config::PdpConfig::deadline()` threaded in by the
    /// embedding process (`spec.md` §9: no process-wide singleton).
    #[must_use]
    pub fn with_deadline(
        ledgers: &'a dyn LedgerRepository,
        store: &'a dyn zt_objectstore::ObjectStore,
        evaluator: &'a dyn zt_eval::PolicyEvaluator,
        deadline: Duration,
    ) -> Self {
        Self {
            ledgers,
            store,
            evaluator,
            deadline,
        }
    }

    /// Run `AuthorizationCheck` against `request`, bounded by `deadline`
    /// (`spec.md` §5: "The top-level decision call carries an ambient
    /// deadline"). Infallible: every failure mode maps to an
    /// [`AuthorizationResponse`] with `decision=false` and populated
    /// reasons rather than a `Result` error (`spec.md` §4.4, §8 property
    /// 5).
    pub async fn authorization_check(&self, request: &AuthorizationRequest) -> AuthorizationResponse {
        match tokio::time::timeout(self.deadline, self.run(request)).await {
            Ok(response) => response,
            Err(_elapsed) => error_response(build_error_context(
                ErrorCode::AuthzInternalError,
                "authorization check exceeded its ambient deadline",
            )),
        }
    }

    async fn run(&self, request: &AuthorizationRequest) -> AuthorizationResponse {
        let model = &request.authorization_model;

        // Step 1: ledger lookup. Anything other than exactly one row is a
        // bad request (spec.md §4.4 step 1, §8 S4).
        let ledgers = match self
            .ledgers
            .find_ledgers(model.zone_id, &model.policy_store.id)
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                return error_response(build_error_context(
                    ErrorCode::AuthzBadRequest,
                    format!("ledger lookup failed: {e}"),
                ))
            }
        };
        let ledger = match ledgers.as_slice() {
            [single] => single,
            other => {
                return error_response(build_error_context(
                    ErrorCode::AuthzBadRequest,
                    format!(
                        "expected exactly one ledger for zone {} store {:?}, found {}",
                        model.zone_id,
                        model.policy_store.id,
                        other.len()
                    ),
                ))
            }
        };

        // Steps 2-3: ref validation + policy-store assembly. zt_graph folds
        // the zero-ref check into assemble_policy_store itself.
        let policy_store = match zt_graph::assemble_policy_store(self.store, &ledger.reference) {
            Ok(store) => store,
            Err(zt_graph::GraphError::ZeroRef) => {
                return error_response(build_error_context(
                    ErrorCode::AuthzInternalError,
                    "ledger ref is the zero OID",
                ))
            }
            Err(e) => {
                return error_response(build_error_context(
                    ErrorCode::AuthzInternalError,
                    format!("policy store assembly failed: {e}"),
                ))
            }
        };

        // Step 4: evaluator binding is just `self.evaluator`, already
        // constructed by the caller; there is no fallible handshake here.

        // Step 5: per-evaluation loop.
        let evaluations = request.expand();
        let mut responses = Vec::with_capacity(evaluations.len());
        for eval in &evaluations {
            let response = self.evaluate_one(&policy_store, model, eval).await;
            responses.push(response);
        }

        // Step 6: aggregation.
        aggregate(responses)
    }

    async fn evaluate_one(
        &self,
        policy_store: &zt_core::PolicyStore,
        model: &zt_core::AuthorizationModel,
        eval: &zt_core::EvaluationRequest,
    ) -> EvaluationResponse {
        // Evaluator invocation is CPU-bound and may be long for large
        // policy sets; spec.md §5 calls it out as a suspension point
        // "treated as blocking for the calling task".
        match self.evaluator.authorization_check(policy_store, model, eval) {
            Ok(decision) => {
                tracing::debug!(
                    target: "zt.pdp",
                    context_id = %decision.id,
                    allowed = decision.allowed,
                    "evaluation complete"
                );
                EvaluationResponse {
                    request_id: eval.request_id.clone(),
                    decision: decision.allowed,
                    context: build_eval_context(decision.id, decision.allowed, decision.admin_reason),
                }
            }
            Err(e) => {
                tracing::warn!(target: "zt.pdp", error = %e, "evaluator failure");
                EvaluationResponse {
                    request_id: eval.request_id.clone(),
                    decision: false,
                    context: build_error_context(ErrorCode::AuthzInternalError, e.to_string()),
                }
            }
        }
    }
}

fn error_response(context: ContextResponse) -> AuthorizationResponse {
    AuthorizationResponse {
        request_id: None,
        decision: false,
        context,
        evaluations: Vec::new(),
    }
}

/// Aggregate per-evaluation responses into the top-level response
/// (`spec.md` §4.4 step 6, §8 property 4).
fn aggregate(evaluations: Vec<EvaluationResponse>) -> AuthorizationResponse {
    let decision = !evaluations.is_empty() && evaluations.iter().all(|e| e.decision);
    if let [single] = evaluations.as_slice() {
        return AuthorizationResponse {
            request_id: single.request_id.clone(),
            decision: single.decision,
            context: single.context.clone(),
            evaluations,
        };
    }
    AuthorizationResponse {
        request_id: None,
        decision,
        context: ContextResponse::default(),
        evaluations,
    }
}
