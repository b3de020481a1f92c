//! Unified error taxonomy with stable 5-digit codes for the ZTAuth* core.
//!
//! Every core error carries an [`ErrorCode`] (a machine-readable, numeric tag
//! stable across releases), a human-readable message, an optional cause
//! chain, and arbitrary key-value context. Use the builder returned by
//! [`ZtError::new`] to construct errors fluently.
//!
//! The code space is classified by the first digit: `0` system/implementation,
//! `01` config, `04` client, `05` server/storage, `06` language/policy, `08`
//! CLI/workspace, `09` plugin — see [`ErrorCategory`].

#![deny(unsafe_code)]
#![warn(missing_docs)]

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// ErrorCategory
// ---------------------------------------------------------------------------

/// Broad family that an [`ErrorCode`] belongs to, keyed by the first digit(s)
/// of its numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// `00xxx` — unknown / not-implemented system errors.
    System,
    /// `01xxx` — configuration errors.
    Config,
    /// `04xxx` — client parameter/entity errors.
    Client,
    /// `05xxx` — server and storage errors.
    Server,
    /// `06xxx` — policy-language errors (file/syntax/semantic).
    Language,
    /// `08xxx` — CLI and workspace errors.
    Workspace,
    /// `09xxx` — plugin errors.
    Plugin,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::System => "system",
            Self::Config => "config",
            Self::Client => "client",
            Self::Server => "server",
            Self::Language => "language",
            Self::Workspace => "workspace",
            Self::Plugin => "plugin",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// ErrorCode
// ---------------------------------------------------------------------------

/// Machine-readable, stable 5-digit error code.
///
/// The numeric value (see [`ErrorCode::code`]) is the contract; variant names
/// are a Rust-idiomatic rendering of the original taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// `00000` generic unknown error.
    Unknown,
    /// `00101` feature not implemented.
    NotImplemented,

    /// `01000` generic configuration error.
    ConfigurationGeneric,

    /// `04000` generic client error.
    ClientGeneric,
    /// `04100` invalid client parameter.
    ClientParameter,
    /// `04101` invalid pagination parameter.
    ClientPagination,
    /// `04110` invalid entity.
    ClientEntity,
    /// `04111` invalid ID.
    ClientId,
    /// `04112` invalid UUID.
    ClientUuid,
    /// `04113` invalid name.
    ClientName,
    /// `04114` entity not found.
    ClientNotFound,
    /// `04115` update conflict.
    ClientUpdateConflict,
    /// `04116` invalid SHA256 hash.
    ClientSha256,

    /// `05000` generic server error.
    ServerGeneric,
    /// `05001` infrastructure error.
    ServerInfrastructure,
    /// `05100` generic storage error.
    StorageGeneric,
    /// `05101` storage entity mapping error.
    StorageEntityMapping,
    /// `05110` storage constraint error.
    StorageConstraint,
    /// `05111` storage foreign-key constraint violation.
    StorageConstraintForeignKey,
    /// `05112` storage unique constraint violation.
    StorageConstraintUnique,
    /// `05120` entity not found in storage.
    StorageNotFound,

    /// `06000` generic language error.
    LanguageGeneric,
    /// `06100` generic language file error.
    LanguageFile,
    /// `06200` generic language syntax error.
    LanguageSyntax,
    /// `06300` generic language semantic error.
    LanguageSemantic,

    /// `08000` generic CLI error.
    CliGeneric,
    /// `08001` invalid CLI arguments.
    CliArguments,
    /// `08002` invalid CLI input.
    CliInput,
    /// `08003` not a ZTAuth* workspace directory.
    CliWorkspaceDir,
    /// `08004` record already exists.
    CliRecordExists,
    /// `08005` record not found.
    CliRecordNotFound,
    /// `08006` record is malformed.
    CliRecordMalformed,
    /// `08100` CLI file-system error.
    CliFileSystem,
    /// `08101` directory operation failed.
    CliDirectoryOperation,
    /// `08102` file operation failed.
    CliFileOperation,
    /// `08110` workspace operation failed.
    CliWorkspace,
    /// `08111` workspace ref points to an unresolvable head (pull required).
    CliWorkspaceInvalidHead,

    /// `09000` generic plugin error.
    PluginGeneric,

    // -- ZTAuth* decision-boundary codes (spec.md §6, §7) --
    /// Malformed authorization request, or an ambiguous policy-store lookup.
    AuthzBadRequest,
    /// Opaque internal-error code/message surfaced to the user channel
    /// whenever storage, decoding, or evaluator detail must not leak.
    AuthzInternalError,
}

impl ErrorCode {
    /// The stable numeric code, as used by `errorCodes` lookup tables.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unknown => "00000",
            Self::NotImplemented => "00101",
            Self::ConfigurationGeneric => "01000",
            Self::ClientGeneric => "04000",
            Self::ClientParameter => "04100",
            Self::ClientPagination => "04101",
            Self::ClientEntity => "04110",
            Self::ClientId => "04111",
            Self::ClientUuid => "04112",
            Self::ClientName => "04113",
            Self::ClientNotFound => "04114",
            Self::ClientUpdateConflict => "04115",
            Self::ClientSha256 => "04116",
            Self::ServerGeneric => "05000",
            Self::ServerInfrastructure => "05001",
            Self::StorageGeneric => "05100",
            Self::StorageEntityMapping => "05101",
            Self::StorageConstraint => "05110",
            Self::StorageConstraintForeignKey => "05111",
            Self::StorageConstraintUnique => "05112",
            Self::StorageNotFound => "05120",
            Self::LanguageGeneric => "06000",
            Self::LanguageFile => "06100",
            Self::LanguageSyntax => "06200",
            Self::LanguageSemantic => "06300",
            Self::CliGeneric => "08000",
            Self::CliArguments => "08001",
            Self::CliInput => "08002",
            Self::CliWorkspaceDir => "08003",
            Self::CliRecordExists => "08004",
            Self::CliRecordNotFound => "08005",
            Self::CliRecordMalformed => "08006",
            Self::CliFileSystem => "08100",
            Self::CliDirectoryOperation => "08101",
            Self::CliFileOperation => "08102",
            Self::CliWorkspace => "08110",
            Self::CliWorkspaceInvalidHead => "08111",
            Self::PluginGeneric => "09000",
            // Decision-boundary codes are not part of the 5-digit table;
            // they're the two fixed codes the PDP contract exposes externally.
            Self::AuthzBadRequest => "AUTHZ_BAD_REQUEST",
            Self::AuthzInternalError => "AUTHZ_INTERNAL_ERROR",
        }
    }

    /// Fixed human-readable message for this code, matching the taxonomy's
    /// canonical description.
    pub fn message(&self) -> &'static str {
        match self {
            Self::Unknown => "core: unknown error",
            Self::NotImplemented => "code: feature not implemented",
            Self::ConfigurationGeneric => "config: generic error",
            Self::ClientGeneric => "client: generic error",
            Self::ClientParameter => "client: invalid client parameter",
            Self::ClientPagination => "client: invalid pagination parameter",
            Self::ClientEntity => "client: invalid entity",
            Self::ClientId => "client: invalid ID",
            Self::ClientUuid => "client: invalid UUID",
            Self::ClientName => "client: invalid name",
            Self::ClientNotFound => "client: entity not found",
            Self::ClientUpdateConflict => "client: update conflict",
            Self::ClientSha256 => "client: invalid SHA256 hash",
            Self::ServerGeneric => "server: generic error",
            Self::ServerInfrastructure => "server: infrastructure error",
            Self::StorageGeneric => "storage: generic error",
            Self::StorageEntityMapping => "storage: entity mapping error",
            Self::StorageConstraint => "storage: constraint error",
            Self::StorageConstraintForeignKey => "storage: foreign key constraint violation",
            Self::StorageConstraintUnique => "storage: unique constraint violation",
            Self::StorageNotFound => "storage: entity not found in storage",
            Self::LanguageGeneric => "language: generic error",
            Self::LanguageFile => "language: generic file error",
            Self::LanguageSyntax => "language: generic syntax error",
            Self::LanguageSemantic => "language: generic semantic error",
            Self::CliGeneric => "cli: generic error",
            Self::CliArguments => "cli: invalid arguments",
            Self::CliInput => "cli: invalid input",
            Self::CliWorkspaceDir => "cli: not a ztauth workspace directory",
            Self::CliRecordExists => "cli: record already exists",
            Self::CliRecordNotFound => "cli: record not found",
            Self::CliRecordMalformed => "cli: record is malformed",
            Self::CliFileSystem => "cli: file system error",
            Self::CliDirectoryOperation => "cli: operation on directory failed",
            Self::CliFileOperation => "cli: operation on file failed",
            Self::CliWorkspace => "cli: workspace operation failed",
            Self::CliWorkspaceInvalidHead => "cli: workspace invalid head",
            Self::PluginGeneric => "plugin: generic error",
            Self::AuthzBadRequest => "authorization check failed for the request",
            Self::AuthzInternalError => "authorization check failed for an internal reason",
        }
    }

    /// Returns the broad [`ErrorCategory`] this code belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Unknown | Self::NotImplemented => ErrorCategory::System,
            Self::ConfigurationGeneric => ErrorCategory::Config,
            Self::ClientGeneric
            | Self::ClientParameter
            | Self::ClientPagination
            | Self::ClientEntity
            | Self::ClientId
            | Self::ClientUuid
            | Self::ClientName
            | Self::ClientNotFound
            | Self::ClientUpdateConflict
            | Self::ClientSha256
            | Self::AuthzBadRequest => ErrorCategory::Client,
            Self::ServerGeneric
            | Self::ServerInfrastructure
            | Self::StorageGeneric
            | Self::StorageEntityMapping
            | Self::StorageConstraint
            | Self::StorageConstraintForeignKey
            | Self::StorageConstraintUnique
            | Self::StorageNotFound
            | Self::AuthzInternalError => ErrorCategory::Server,
            Self::LanguageGeneric
            | Self::LanguageFile
            | Self::LanguageSyntax
            | Self::LanguageSemantic => ErrorCategory::Language,
            Self::CliGeneric
            | Self::CliArguments
            | Self::CliInput
            | Self::CliWorkspaceDir
            | Self::CliRecordExists
            | Self::CliRecordNotFound
            | Self::CliRecordMalformed
            | Self::CliFileSystem
            | Self::CliDirectoryOperation
            | Self::CliFileOperation
            | Self::CliWorkspace
            | Self::CliWorkspaceInvalidHead => ErrorCategory::Workspace,
            Self::PluginGeneric => ErrorCategory::Plugin,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Fixed message returned to user-facing reason slots whenever internal
/// detail must not leak (`spec.md` §4.4, §7).
pub const AUTHZ_INTERNAL_ERROR_MESSAGE: &str = "invalid state";

// ---------------------------------------------------------------------------
// ZtError
// ---------------------------------------------------------------------------

/// Unified core error.
///
/// Carries a stable [`ErrorCode`], a human-readable message, an optional
/// underlying cause, and arbitrary structured context.
///
/// # Builder usage
///
/// ```
/// use zt_error::{ZtError, ErrorCode};
///
/// let err = ZtError::new(ErrorCode::StorageNotFound, "object missing")
///     .with_context("oid", "a1b2")
///     .with_context("attempt", 1);
/// ```
pub struct ZtError {
    /// Machine-readable error code.
    pub code: ErrorCode,
    /// Human-readable description.
    pub message: String,
    /// Optional underlying cause.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
    /// Arbitrary structured context for diagnostics.
    pub context: BTreeMap<String, serde_json::Value>,
}

impl ZtError {
    /// Create a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
            context: BTreeMap::new(),
        }
    }

    /// Create an error using the code's canonical fixed message.
    pub fn from_code(code: ErrorCode) -> Self {
        let message = code.message().to_string();
        Self::new(code, message)
    }

    /// Attach a key-value pair to the diagnostic context.
    ///
    /// The value is converted via [`serde_json::to_value`]; if serialisation
    /// fails, the entry is silently skipped.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    /// Attach an underlying cause.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Shorthand for `self.code.category()`.
    pub fn category(&self) -> ErrorCategory {
        self.code.category()
    }
}

impl fmt::Debug for ZtError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("ZtError");
        d.field("code", &self.code);
        d.field("message", &self.message);
        if let Some(ref src) = self.source {
            d.field("source", &src.to_string());
        }
        if !self.context.is_empty() {
            d.field("context", &self.context);
        }
        d.finish()
    }
}

impl fmt::Display for ZtError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.code(), self.message)?;
        if !self.context.is_empty() {
            // Deterministic output thanks to BTreeMap.
            if let Ok(ctx) = serde_json::to_string(&self.context) {
                write!(f, " {ctx}")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ZtError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// A `(code, message)` reason pair, the payload of `reasonAdmin`/`reasonUser`
/// in a `ContextResponse` (`spec.md` §3, §4.4).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reason {
    /// Reason code (stable string).
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

impl Reason {
    /// Build a reason from an [`ErrorCode`], using its canonical message.
    pub fn from_code(code: ErrorCode) -> Self {
        Self {
            code: code.code().to_string(),
            message: code.message().to_string(),
        }
    }

    /// Build a reason from an [`ErrorCode`] with a custom message (used for
    /// admin reasons, which append diagnostic detail to the fixed message).
    pub fn from_code_with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.code().to_string(),
            message: message.into(),
        }
    }

    /// The fixed internal reason exposed to the user channel
    /// (`AuthzErrInternalError`, `spec.md` §4.4/§7): never carries diagnostic
    /// detail.
    pub fn internal_user() -> Self {
        Self::from_code_with_message(
            ErrorCode::AuthzInternalError,
            AUTHZ_INTERNAL_ERROR_MESSAGE,
        )
    }
}

// ---------------------------------------------------------------------------
// Serialization support
// ---------------------------------------------------------------------------

/// Serialisable snapshot of a [`ZtError`] (without the opaque source).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ZtErrorDto {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
    /// Structured context.
    pub context: BTreeMap<String, serde_json::Value>,
    /// String representation of the source error, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_message: Option<String>,
}

impl From<&ZtError> for ZtErrorDto {
    fn from(err: &ZtError) -> Self {
        Self {
            code: err.code,
            message: err.message.clone(),
            context: err.context.clone(),
            source_message: err.source.as_ref().map(|s| s.to_string()),
        }
    }
}

impl From<ZtErrorDto> for ZtError {
    fn from(dto: ZtErrorDto) -> Self {
        Self {
            code: dto.code,
            message: dto.message,
            source: None,
            context: dto.context,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn basic_construction() {
        let err = ZtError::new(ErrorCode::Unknown, "boom");
        assert_eq!(err.code, ErrorCode::Unknown);
        assert_eq!(err.message, "boom");
        assert!(err.source.is_none());
        assert!(err.context.is_empty());
    }

    #[test]
    fn display_without_context() {
        let err = ZtError::new(ErrorCode::StorageNotFound, "no such object");
        assert_eq!(err.to_string(), "[05120] no such object");
    }

    #[test]
    fn display_with_context() {
        let err =
            ZtError::new(ErrorCode::ServerInfrastructure, "timed out").with_context("ms", 5000);
        let s = err.to_string();
        assert!(s.starts_with("[05001] timed out"));
        assert!(s.contains("5000"));
    }

    #[test]
    fn codes_match_taxonomy() {
        assert_eq!(ErrorCode::ClientEntity.code(), "04110");
        assert_eq!(ErrorCode::StorageEntityMapping.code(), "05101");
        assert_eq!(ErrorCode::LanguageSemantic.code(), "06300");
        assert_eq!(ErrorCode::CliWorkspaceInvalidHead.code(), "08111");
    }

    #[test]
    fn categories_match_first_digit() {
        assert_eq!(ErrorCode::ConfigurationGeneric.category(), ErrorCategory::Config);
        assert_eq!(ErrorCode::ClientUuid.category(), ErrorCategory::Client);
        assert_eq!(ErrorCode::StorageGeneric.category(), ErrorCategory::Server);
        assert_eq!(ErrorCode::LanguageSyntax.category(), ErrorCategory::Language);
        assert_eq!(
            ErrorCode::CliWorkspaceInvalidHead.category(),
            ErrorCategory::Workspace
        );
        assert_eq!(ErrorCode::PluginGeneric.category(), ErrorCategory::Plugin);
    }

    #[test]
    fn from_code_uses_canonical_message() {
        let err = ZtError::from_code(ErrorCode::StorageGeneric);
        assert_eq!(err.message, "storage: generic error");
    }

    #[test]
    fn builder_with_source() {
        let src = io::Error::new(io::ErrorKind::NotFound, "file missing");
        let err = ZtError::new(ErrorCode::CliFileSystem, "fs error").with_source(src);
        assert!(err.source.is_some());
        assert_eq!(err.source.as_ref().unwrap().to_string(), "file missing");
    }

    #[test]
    fn reason_internal_user_is_opaque() {
        let r = Reason::internal_user();
        assert_eq!(r.code, "AUTHZ_INTERNAL_ERROR");
        assert_eq!(r.message, AUTHZ_INTERNAL_ERROR_MESSAGE);
    }

    #[test]
    fn reason_admin_carries_diagnostic() {
        let r = Reason::from_code_with_message(
            ErrorCode::StorageEntityMapping,
            "invalid state because of an invalid object reference",
        );
        assert_eq!(r.code, "05101");
        assert!(r.message.contains("invalid object reference"));
    }

    #[test]
    fn dto_roundtrip_without_source() {
        let err = ZtError::new(ErrorCode::CliRecordMalformed, "bad record")
            .with_context("field", "name");
        let dto: ZtErrorDto = (&err).into();
        let json = serde_json::to_string(&dto).unwrap();
        let back: ZtErrorDto = serde_json::from_str(&json).unwrap();
        assert_eq!(dto, back);
        assert!(back.source_message.is_none());
    }

    #[test]
    fn dto_roundtrip_with_source() {
        let src = io::Error::new(io::ErrorKind::BrokenPipe, "pipe broke");
        let err = ZtError::new(ErrorCode::ServerInfrastructure, "crash").with_source(src);
        let dto: ZtErrorDto = (&err).into();
        assert_eq!(dto.source_message.as_deref(), Some("pipe broke"));
    }

    #[test]
    fn error_code_serde_roundtrip() {
        let code = ErrorCode::StorageNotFound;
        let json = serde_json::to_string(&code).unwrap();
        let back: ErrorCode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, code);
    }

    #[test]
    fn std_error_source_chain() {
        let inner = io::Error::new(io::ErrorKind::NotFound, "not found");
        let err = ZtError::new(ErrorCode::CliWorkspace, "workspace op failed").with_source(inner);
        let src = std::error::Error::source(&err).unwrap();
        assert_eq!(src.to_string(), "not found");
    }
}
