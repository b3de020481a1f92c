// SPDX-License-Identifier: MIT OR Apache-2.0
//! Uniform authorization evaluator adapter over a policy language (`spec.md`
//! §4.4, L6). This release binds to Cedar; the [`PolicyEvaluator`] trait is
//! the seam a future language binding would implement instead.
#![deny(unsafe_code)]
#![warn(missing_docs)]

use std::collections::HashSet;
use std::str::FromStr;

use cedar_policy::{
    Authorizer, Context, Decision as CedarDecision, Entities, EntityUid, Policy, PolicySet,
    Request as CedarRequest, Schema,
};
use serde::{Deserialize, Serialize};
use zt_core::{ActionRef, AuthorizationModel, EntityRef, EvaluationRequest, PolicyStore};

/// Errors raised while binding a [`PolicyStore`] and an [`EvaluationRequest`]
/// to Cedar, or while Cedar itself rejects malformed input (`spec.md` §7:
/// "Evaluator errors... are `ErrLanguageSemantic`").
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    /// The policy store's schema text failed to parse as a Cedar schema.
    #[error("invalid Cedar schema: {0}")]
    SchemaParse(String),

    /// A stored policy document failed to parse as Cedar policy source.
    #[error("invalid Cedar policy {oid}: {detail}")]
    PolicyParse {
        /// OID of the offending policy object.
        oid: String,
        /// Cedar's parse error detail.
        detail: String,
    },

    /// The request's inline entities failed to parse as Cedar entity JSON.
    #[error("invalid entities: {0}")]
    EntitiesParse(String),

    /// A subject/resource/action triple could not be converted into a
    /// Cedar `EntityUid` or `Context`.
    #[error("invalid evaluation request: {0}")]
    RequestConstruction(String),
}

impl From<EvalError> for zt_error::ZtError {
    fn from(err: EvalError) -> Self {
        zt_error::ZtError::new(zt_error::ErrorCode::LanguageSemantic, err.to_string())
    }
}

/// Outcome of evaluating a single [`EvaluationRequest`] against a policy
/// store. `admin_reason` carries a Cedar-originated diagnostic on denial and
/// is `None` on allow; the pipeline (L7) is responsible for ensuring no
/// equivalent detail ever reaches the user-facing reason (`spec.md` §4.4
/// design invariant).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalDecision {
    /// Opaque correlation id, forwarded from `EvaluationRequest.context_id`
    /// untouched (`spec.md` §3, `ContextID` in `pdp_check.go`).
    pub id: String,
    /// Whether the evaluation was allowed.
    pub allowed: bool,
    /// Admin-facing diagnostic, present whenever `allowed` is `false`.
    pub admin_reason: Option<String>,
}

/// Uniform interface a language binding implements (`spec.md` §4.4 step 4:
/// "Construct a language-abstraction handle").
pub trait PolicyEvaluator {
    /// Evaluate one request against the given policy store and model.
    fn authorization_check(
        &self,
        store: &PolicyStore,
        model: &AuthorizationModel,
        eval: &EvaluationRequest,
    ) -> Result<EvalDecision, EvalError>;
}

/// The Cedar-backed [`PolicyEvaluator`]. Stateless: policies, schema, and
/// entities are rebuilt from the supplied [`PolicyStore`] and
/// [`AuthorizationModel`] on every call, matching `spec.md`'s "`PolicyStore`
/// is built per request, never shared" lifetime.
#[derive(Debug, Default, Clone, Copy)]
pub struct CedarEvaluator;

impl CedarEvaluator {
    /// Construct a new Cedar evaluator handle. Takes no state: Cedar's
    /// `Authorizer` is itself stateless and is constructed per call.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn build_policy_set(store: &PolicyStore) -> Result<PolicySet, EvalError> {
        let mut set = PolicySet::new();
        for info in store.policies.values() {
            let text = String::from_utf8_lossy(&info.instance_bytes);
            let policy = Policy::from_str(&text).map_err(|e| EvalError::PolicyParse {
                oid: info.oid.to_string(),
                detail: e.to_string(),
            })?;
            set.add(policy).map_err(|e| EvalError::PolicyParse {
                oid: info.oid.to_string(),
                detail: e.to_string(),
            })?;
        }
        Ok(set)
    }

    fn build_schema(
        store: &PolicyStore,
        model: &AuthorizationModel,
    ) -> Result<Option<Schema>, EvalError> {
        let inline = model
            .entities
            .as_ref()
            .and_then(|e| e.schema.as_deref());
        let text = if let Some(inline) = inline {
            Some(inline.to_string())
        } else if let Some(info) = store.schemas.values().next() {
            Some(String::from_utf8_lossy(&info.instance_bytes).into_owned())
        } else {
            None
        };
        match text {
            None => Ok(None),
            Some(text) => {
                let (schema, warnings) =
                    Schema::from_cedarschema_str(&text).map_err(|e| EvalError::SchemaParse(e.to_string()))?;
                for w in warnings {
                    tracing::debug!(target: "zt.eval", warning = %w, "cedar schema warning");
                }
                Ok(Some(schema))
            }
        }
    }

    fn build_entities(
        model: &AuthorizationModel,
        schema: Option<&Schema>,
    ) -> Result<Entities, EvalError> {
        let items = model
            .entities
            .as_ref()
            .map(|e| e.items.clone())
            .unwrap_or_default();
        let json = serde_json::Value::Array(items);
        Entities::from_json_value(json, schema).map_err(|e| EvalError::EntitiesParse(e.to_string()))
    }

    fn entity_uid(entity: &EntityRef) -> Result<EntityUid, EvalError> {
        let src = format!("{}::{:?}", entity.entity_type, entity.id);
        EntityUid::from_str(&src).map_err(|e| EvalError::RequestConstruction(e.to_string()))
    }

    fn action_uid(action: &ActionRef) -> Result<EntityUid, EvalError> {
        let src = format!("Action::{:?}", action.name);
        EntityUid::from_str(&src).map_err(|e| EvalError::RequestConstruction(e.to_string()))
    }
}

impl PolicyEvaluator for CedarEvaluator {
    fn authorization_check(
        &self,
        store: &PolicyStore,
        model: &AuthorizationModel,
        eval: &EvaluationRequest,
    ) -> Result<EvalDecision, EvalError> {
        let id = eval.context_id.clone().unwrap_or_default();

        let policy_set = Self::build_policy_set(store)?;
        let schema = Self::build_schema(store, model)?;
        let entities = Self::build_entities(model, schema.as_ref())?;

        let principal = Self::entity_uid(&eval.subject)?;
        let action = Self::action_uid(&eval.action)?;
        let resource = Self::entity_uid(&eval.resource)?;
        let context = Context::from_json_value(eval.context.clone(), schema.as_ref().map(|s| (s, &action)))
            .map_err(|e| EvalError::RequestConstruction(e.to_string()))?;

        let request = CedarRequest::new(
            principal,
            action,
            resource,
            context,
            schema.as_ref(),
        )
        .map_err(|e| EvalError::RequestConstruction(e.to_string()))?;

        let authorizer = Authorizer::new();
        let response = authorizer.is_authorized(&request, &policy_set, &entities);

        let allowed = matches!(response.decision(), CedarDecision::Allow);
        let admin_reason = if allowed {
            None
        } else {
            let reasons: HashSet<String> = response
                .diagnostics()
                .reason()
                .map(|id| id.to_string())
                .collect();
            let errors: Vec<String> = response
                .diagnostics()
                .errors()
                .map(|e| e.to_string())
                .collect();
            Some(if reasons.is_empty() && errors.is_empty() {
                "denied: no policy satisfied the request".to_string()
            } else {
                format!(
                    "denied: satisfied_policies={reasons:?} errors={errors:?}"
                )
            })
        };

        tracing::debug!(
            target: "zt.eval",
            context_id = %id,
            allowed,
            "cedar authorization_check"
        );

        Ok(EvalDecision {
            id,
            allowed,
            admin_reason,
        })
    }
}
