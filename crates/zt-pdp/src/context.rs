// SPDX-License-Identifier: MIT OR Apache-2.0
//! `buildContext` — maps a per-evaluation outcome to a [`ContextResponse`]
//! (`spec.md` §4.4 step 5). Isolated in its own module because it encodes
//! the single most load-bearing invariant in the whole pipeline: the user
//! channel never carries diagnostic detail (`spec.md` §4.4 design
//! invariant, §7).

use zt_core::ContextResponse;
use zt_error::{ErrorCode, Reason};

/// Build the per-evaluation [`ContextResponse`] from a Cedar outcome.
///
/// - `id` becomes the response's `id` verbatim.
/// - `admin_reason`, when present, becomes `reason_admin` tagged with the
///   `LanguageSemantic` code family — a Cedar-originated diagnostic, per
///   `spec.md` §8 S2 ("`reasonAdmin.code != 0` with a Cedar-originated
///   diagnostic").
/// - Absent an explicit admin reason, a `false` decision still produces a
///   fallback `reason_admin` tagged `AuthzInternalError` (`spec.md` §4.4:
///   "else if decision == false -> reasonAdmin = {Internal, ...}").
/// - `reason_user` is always the fixed opaque `AuthzInternalError` reason on
///   denial, and absent on allow — never the admin diagnostic.
pub fn build_eval_context(id: String, decision: bool, admin_reason: Option<String>) -> ContextResponse {
    if decision {
        return ContextResponse {
            id,
            reason_admin: None,
            reason_user: None,
        };
    }
    let reason_admin = Some(match admin_reason {
        Some(detail) => Reason::from_code_with_message(ErrorCode::LanguageSemantic, detail),
        None => Reason::from_code(ErrorCode::AuthzInternalError),
    });
    ContextResponse {
        id,
        reason_admin,
        reason_user: Some(Reason::internal_user()),
    }
}

/// Build a top-level error [`ContextResponse`] for failures that
/// short-circuit before any evaluation runs (ledger lookup, ref validation,
/// store assembly). `admin_code` carries the diagnostic-bearing code;
/// `admin_detail` is appended to its canonical message. The user reason is
/// always the fixed opaque constant, except for `spec.md` §8 S4 (missing
/// ledger), where the user channel intentionally carries the same
/// `AuthzBadRequest` code as the admin channel — a client error has nothing
/// internal to hide.
pub fn build_error_context(admin_code: ErrorCode, admin_detail: impl Into<String>) -> ContextResponse {
    let admin_detail = admin_detail.into();
    let reason_admin = Reason::from_code_with_message(admin_code, admin_detail);
    let reason_user = if admin_code == ErrorCode::AuthzBadRequest {
        Reason::from_code(ErrorCode::AuthzBadRequest)
    } else {
        Reason::internal_user()
    };
    ContextResponse {
        id: String::new(),
        reason_admin: Some(reason_admin),
        reason_user: Some(reason_user),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_has_no_reasons() {
        let ctx = build_eval_context("ctx-1".into(), true, None);
        assert!(ctx.reason_admin.is_none());
        assert!(ctx.reason_user.is_none());
    }

    #[test]
    fn deny_with_admin_diagnostic_carries_language_code() {
        let ctx = build_eval_context("ctx-1".into(), false, Some("no policy satisfied".into()));
        let admin = ctx.reason_admin.unwrap();
        assert_eq!(admin.code, ErrorCode::LanguageSemantic.code());
        let user = ctx.reason_user.unwrap();
        assert_eq!(user.code, ErrorCode::AuthzInternalError.code());
    }

    #[test]
    fn deny_without_admin_diagnostic_falls_back_to_internal() {
        let ctx = build_eval_context("ctx-1".into(), false, None);
        assert_eq!(ctx.reason_admin.unwrap().code, ErrorCode::AuthzInternalError.code());
    }

    #[test]
    fn bad_request_error_uses_same_code_for_both_channels() {
        let ctx = build_error_context(ErrorCode::AuthzBadRequest, "expected exactly one ledger, got 0");
        assert_eq!(ctx.reason_admin.unwrap().code, ErrorCode::AuthzBadRequest.code());
        assert_eq!(ctx.reason_user.unwrap().code, ErrorCode::AuthzBadRequest.code());
    }

    #[test]
    fn internal_error_hides_detail_from_user_channel() {
        let ctx = build_error_context(ErrorCode::AuthzInternalError, "ledger ref is the zero OID");
        assert_eq!(ctx.reason_admin.unwrap().message, "ledger ref is the zero OID");
        assert_eq!(ctx.reason_user.unwrap().message, zt_error::AUTHZ_INTERNAL_ERROR_MESSAGE);
    }
}
