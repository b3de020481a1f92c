// SPDX-License-Identifier: MIT OR Apache-2.0
//! Stable data-model types for the ZTAuth* core: object identifiers, the
//! content-addressed object graph (commit/tree/blob), the in-memory policy
//! store, and the authorization request/response contract.
//!
//! If you only take one dependency from this workspace, take this one.
#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Core data-model errors (`Oid` parsing, header decoding).
pub mod error;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

pub use error::CoreError;

/// Wire format version for the object codec (`spec.md` §6: `version:u8=1`).
pub const OBJECT_WIRE_VERSION: u8 = 1;

/// Magic bytes identifying an object on the wire (`spec.md` §6: `0x5A54`).
pub const OBJECT_MAGIC: u16 = 0x5A54;

/// Magic bytes identifying a NOTP frame (`spec.md` §4.3/§6: `0x4E54`, `"NT"`).
pub const NOTP_MAGIC: u16 = 0x4E54;

/// NOTP protocol version (`spec.md` §6).
pub const NOTP_PROTOCOL_VERSION: u8 = 1;

/// Default NOTP receive timeout (`spec.md` §4.3/§5).
pub const NOTP_DEFAULT_TIMEOUT_SECS: u64 = 30;

// ---------------------------------------------------------------------------
// Oid
// ---------------------------------------------------------------------------

/// A SHA256 object identifier: 64 lowercase hex characters in APIs, 32 raw
/// bytes on the wire (`spec.md` §3, §6).
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct Oid(String);

impl Oid {
    /// The all-zero sentinel OID meaning "no object / empty ref".
    pub fn zero() -> Self {
        Self("0".repeat(64))
    }

    /// Returns `true` if this is the [`Oid::zero`] sentinel.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.bytes().all(|b| b == b'0')
    }

    /// Parse and validate a 64-char lowercase hex OID string.
    pub fn parse(s: impl Into<String>) -> Result<Self, CoreError> {
        let s = s.into();
        if s.len() != 64 || !s.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase()) {
            return Err(CoreError::InvalidOid {
                len: s.len(),
                input: s.chars().take(16).collect(),
            });
        }
        Ok(Self(s))
    }

    /// Compute the OID of a byte string directly (`spec.md` §4.1: `put`).
    #[must_use]
    pub fn of(bytes: &[u8]) -> Self {
        Self(sha256_hex(bytes))
    }

    /// Render as a `&str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode to the 32 raw bytes used on the wire.
    pub fn to_bytes32(&self) -> Result<[u8; 32], CoreError> {
        let mut out = [0u8; 32];
        for (i, chunk) in self.0.as_bytes().chunks(2).enumerate() {
            let hi = hex_val(chunk[0]).ok_or_else(|| CoreError::InvalidOid {
                len: self.0.len(),
                input: self.0.clone(),
            })?;
            let lo = hex_val(chunk[1]).ok_or_else(|| CoreError::InvalidOid {
                len: self.0.len(),
                input: self.0.clone(),
            })?;
            out[i] = (hi << 4) | lo;
        }
        Ok(out)
    }

    /// Encode from the 32 raw wire bytes.
    #[must_use]
    pub fn from_bytes32(bytes: &[u8; 32]) -> Self {
        let mut s = String::with_capacity(64);
        for b in bytes {
            s.push_str(&format!("{b:02x}"));
        }
        Self(s)
    }
}

fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        _ => None,
    }
}

impl fmt::Debug for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Oid({})", &self.0[..8])
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Oid {
    type Error = CoreError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

// ---------------------------------------------------------------------------
// CodeTypeId / ObjectHeader / Object
// ---------------------------------------------------------------------------

/// The typed classification of an object's payload (`spec.md` §4.1, §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[repr(u16)]
pub enum CodeTypeId {
    /// A Cedar schema blob.
    Schema = 1,
    /// A Cedar policy blob.
    Policy = 2,
    /// A commit record.
    Commit = 10,
    /// A tree record.
    Tree = 11,
    /// An untyped raw blob.
    RawBlob = 20,
}

impl CodeTypeId {
    /// Decode from the wire's `u16` representation.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownCodeTypeId`] for any value outside
    /// `{1, 2, 10, 11, 20}` — `spec.md` §4.1 calls this "a fatal decode error
    /// reported as corruption".
    pub fn from_u16(v: u16) -> Result<Self, CoreError> {
        match v {
            1 => Ok(Self::Schema),
            2 => Ok(Self::Policy),
            10 => Ok(Self::Commit),
            11 => Ok(Self::Tree),
            20 => Ok(Self::RawBlob),
            other => Err(CoreError::UnknownCodeTypeId(other)),
        }
    }

    /// The wire `u16` representation.
    #[must_use]
    pub fn as_u16(self) -> u16 {
        self as u16
    }
}

/// Fixed-layout header preceding every object's payload on the wire
/// (`spec.md` §4.1, §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ObjectHeader {
    /// Wire format version (`spec.md` §6: always `1`).
    pub version: u8,
    /// Typed classification of the payload.
    pub code_type_id: CodeTypeId,
    /// Policy/schema language identifier (opaque small integer; interpreted
    /// by the evaluator layer, not the object store).
    pub language_id: u16,
}

/// A content-addressed object: its identifier, header, and raw payload.
///
/// Invariant (`spec.md` §3): `oid == SHA256(header ∥ payload)`; recomputation
/// on read validates integrity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Object {
    /// Content-addressed identifier.
    pub oid: Oid,
    /// Typed header.
    pub header: ObjectHeader,
    /// Raw payload bytes.
    pub payload: Vec<u8>,
}

/// The decoded inner instance of an object's payload, tagged by
/// [`CodeTypeId`] (`spec.md` §9 design note: "Heterogeneous object
/// payloads").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectPayload {
    /// A Cedar schema document.
    Schema(Vec<u8>),
    /// A Cedar policy document.
    Policy(Vec<u8>),
    /// A decoded commit record.
    Commit(Commit),
    /// A decoded tree record.
    Tree(Tree),
    /// An untyped raw blob.
    Raw(Vec<u8>),
}

/// Lightweight, serializable description of an object, used as the value
/// type in [`PolicyStore::schemas`]/[`PolicyStore::policies`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ObjectInfo {
    /// The object's content-addressed identifier.
    pub oid: Oid,
    /// The object's header.
    pub header: ObjectHeader,
    /// The raw instance bytes (schema text or policy text), excluding the
    /// wire header.
    pub instance_bytes: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Commit / Tree
// ---------------------------------------------------------------------------

/// Free-form commit metadata, serialized as JSON inside the commit's
/// `meta` wire field (`spec.md` §3: `metaInfo: CommitMetaInfo`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct CommitMetaInfo(pub BTreeMap<String, String>);

/// A commit in the policy history graph (`spec.md` §3, §6).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Commit {
    /// The tree this commit points to. Never zero for a non-empty ledger.
    pub tree: Oid,
    /// Parent commits: `0` (root) or `1` (linear history). `>1` is rejected
    /// by the decoder (`spec.md` §9: merges are undefined behavior).
    pub parents: Vec<Oid>,
    /// Free-form commit metadata.
    pub meta: CommitMetaInfo,
    /// Commit timestamp, nanoseconds since the Unix epoch.
    pub timestamp_nanos: i64,
}

/// The type of a [`TreeEntry`]'s referenced object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TreeEntryType {
    /// A Cedar schema.
    Schema,
    /// A Cedar policy.
    Policy,
}

/// A single entry in a [`Tree`] (`spec.md` §3, §6).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TreeEntry {
    /// The OID of the referenced object.
    pub oid: Oid,
    /// Whether the entry is a schema or a policy.
    pub entry_type: TreeEntryType,
    /// Entry name. Unique within a tree (`spec.md` §3 invariant).
    pub name: String,
    /// Opaque code identifier carried alongside the name.
    pub code_id: String,
    /// The referenced object's code-type id (redundant with `entry_type`,
    /// kept to mirror the wire layout exactly).
    pub code_type_id: CodeTypeId,
    /// The referenced object's language id.
    pub language_id: u16,
}

/// A tree of policy/schema entries (`spec.md` §3, §6).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Tree {
    /// Entries, in wire order.
    pub entries: Vec<TreeEntry>,
}

impl Tree {
    /// Return entries sorted lexicographically by `name`.
    ///
    /// Used by the tree *encoder* to stabilize OIDs for equivalent content
    /// going forward (`spec.md` §9 open question: tree entry ordering). The
    /// *decoder* does not assume this ordering on read.
    #[must_use]
    pub fn canonical_entries(&self) -> Vec<&TreeEntry> {
        let mut v: Vec<&TreeEntry> = self.entries.iter().collect();
        v.sort_by(|a, b| a.name.cmp(&b.name));
        v
    }
}

// ---------------------------------------------------------------------------
// PolicyStore / Ledger
// ---------------------------------------------------------------------------

/// In-memory aggregate of schemas and policies materialized from a ledger
/// ref (`spec.md` §3, §4.2).
///
/// Constructed at the start of an `AuthorizationCheck` and discarded when it
/// returns; never shared, never mutated after construction (`spec.md` §5).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyStore {
    /// The ledger ref OID that produced this store.
    pub version: Oid,
    /// Schema objects, keyed by OID.
    pub schemas: BTreeMap<Oid, ObjectInfo>,
    /// Policy objects, keyed by OID.
    pub policies: BTreeMap<Oid, ObjectInfo>,
}

impl PolicyStore {
    /// Construct an empty store for the given version.
    #[must_use]
    pub fn new(version: Oid) -> Self {
        Self {
            version,
            schemas: BTreeMap::new(),
            policies: BTreeMap::new(),
        }
    }
}

/// The kind of ledger (policy repository).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum LedgerKind {
    /// A primary policy ledger.
    Primary,
    /// A satellite/linked ledger.
    Satellite,
}

/// A named, versioned policy repository (`spec.md` §3). An out-of-scope
/// table row in its persisted form; the core only reads `ref`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Ledger {
    /// Unique ledger identifier.
    pub ledger_id: Uuid,
    /// Owning zone.
    pub zone_id: i64,
    /// Ledger kind.
    pub kind: LedgerKind,
    /// Human-readable name.
    pub name: String,
    /// Head commit OID of the ledger's policy history.
    pub reference: Oid,
}

// ---------------------------------------------------------------------------
// Authorization request/response contract (spec.md §3, §4.4, §6)
// ---------------------------------------------------------------------------

/// Identifies which policy store a request targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PolicyStoreRef {
    /// Policy store kind (opaque, forwarded as-is).
    #[serde(default)]
    pub kind: Option<String>,
    /// Policy store (ledger) identifier.
    pub id: String,
}

/// Inline entity definitions supplied alongside a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EntitiesInput {
    /// Optional schema document overriding the policy store's schema.
    #[serde(default)]
    pub schema: Option<String>,
    /// Raw entity items, opaque to the core.
    #[serde(default)]
    pub items: Vec<serde_json::Value>,
}

/// The zone/policy-store/entities context shared by all evaluations in one
/// request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AuthorizationModel {
    /// Owning zone.
    pub zone_id: i64,
    /// Target policy store.
    pub policy_store: PolicyStoreRef,
    /// Optional principal descriptor, forwarded as-is.
    #[serde(default)]
    pub principal: Option<serde_json::Value>,
    /// Optional inline entities.
    #[serde(default)]
    pub entities: Option<EntitiesInput>,
}

/// A subject/resource/action triple, identical shape for subject and
/// resource (`spec.md` §3).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EntityRef {
    /// Entity type.
    #[serde(rename = "type")]
    pub entity_type: String,
    /// Entity id.
    pub id: String,
    /// Optional identity source (subject-only in practice, harmless on
    /// resource).
    #[serde(default)]
    pub source: Option<String>,
    /// Arbitrary properties.
    #[serde(default)]
    pub properties: serde_json::Value,
}

/// The action of an evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ActionRef {
    /// Action name.
    pub name: String,
    /// Arbitrary properties.
    #[serde(default)]
    pub properties: serde_json::Value,
}

/// One evaluation within an [`AuthorizationRequest`] (`spec.md` §3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EvaluationRequest {
    /// Caller-supplied identifier, echoed back in the response.
    #[serde(default)]
    pub request_id: Option<String>,
    /// Subject of the evaluation.
    pub subject: EntityRef,
    /// Resource of the evaluation.
    pub resource: EntityRef,
    /// Action of the evaluation.
    pub action: ActionRef,
    /// Arbitrary context passed to the evaluator.
    #[serde(default)]
    pub context: serde_json::Value,
    /// Opaque correlation id forwarded to the evaluator untouched
    /// (`pdp_check.go`'s `ContextID`).
    #[serde(default)]
    pub context_id: Option<String>,
}

/// Top-level authorization request (`spec.md` §3).
///
/// When `evaluations` is absent or a singleton, the top-level
/// subject/resource/action/context form one implicit evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AuthorizationRequest {
    /// Zone/policy-store/entities context.
    pub authorization_model: AuthorizationModel,
    /// Implicit top-level subject (used when `evaluations` is absent).
    #[serde(default)]
    pub subject: Option<EntityRef>,
    /// Implicit top-level resource.
    #[serde(default)]
    pub resource: Option<EntityRef>,
    /// Implicit top-level action.
    #[serde(default)]
    pub action: Option<ActionRef>,
    /// Implicit top-level context.
    #[serde(default)]
    pub context: serde_json::Value,
    /// Explicit multi-evaluation list.
    #[serde(default)]
    pub evaluations: Vec<EvaluationRequest>,
}

impl AuthorizationRequest {
    /// Expand this request into its concrete evaluation list
    /// (`spec.md` §4.4: "request expansion, one request -> many
    /// evaluations").
    ///
    /// If `evaluations` is non-empty it is returned as-is; otherwise a
    /// single implicit evaluation is built from the top-level
    /// subject/resource/action/context fields.
    #[must_use]
    pub fn expand(&self) -> Vec<EvaluationRequest> {
        if !self.evaluations.is_empty() {
            return self.evaluations.clone();
        }
        vec![EvaluationRequest {
            request_id: None,
            subject: self.subject.clone().unwrap_or_default(),
            resource: self.resource.clone().unwrap_or_default(),
            action: self.action.clone().unwrap_or_default(),
            context: self.context.clone(),
            context_id: None,
        }]
    }
}

/// A `(code, message)` admin/user reason pair.
pub type ReasonResponse = zt_error::Reason;

/// Per-evaluation diagnostic envelope (`spec.md` §3).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ContextResponse {
    /// Decision id, opaque, set from the evaluator's decision id.
    #[serde(default)]
    pub id: String,
    /// Admin-facing reason (diagnostic detail allowed).
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub reason_admin: Option<ReasonResponse>,
    /// User-facing reason (opaque on internal failures).
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub reason_user: Option<ReasonResponse>,
}

/// The response to a single [`EvaluationRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EvaluationResponse {
    /// Echoes the request's `request_id`.
    #[serde(default)]
    pub request_id: Option<String>,
    /// `true` if the evaluation was allowed.
    pub decision: bool,
    /// Diagnostic context.
    pub context: ContextResponse,
}

/// Top-level response to an [`AuthorizationRequest`] (`spec.md` §3, §4.4,
/// §6).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AuthorizationResponse {
    /// Equals the single evaluation's `request_id` when exactly one
    /// evaluation exists; unset for zero or multiple evaluations.
    #[serde(default)]
    pub request_id: Option<String>,
    /// `true` iff every evaluation's decision is `true` and at least one
    /// evaluation exists (`spec.md` §6, §8 property 4).
    pub decision: bool,
    /// Top-level diagnostic context (mirrors the single evaluation's, or
    /// the empty default for zero/multiple evaluations).
    pub context: ContextResponse,
    /// Per-evaluation responses, in input order.
    pub evaluations: Vec<EvaluationResponse>,
}

impl AuthorizationResponse {
    /// An empty, denied response with no evaluations — the zero value every
    /// early-return error path in the decision pipeline starts from
    /// (`pdp_check.go`).
    #[must_use]
    pub fn empty_denied() -> Self {
        Self {
            request_id: None,
            decision: false,
            context: ContextResponse::default(),
            evaluations: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Hashing / canonicalization helpers
// ---------------------------------------------------------------------------

/// Compute the hex-encoded SHA-256 digest of `bytes`.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Serialize `value` to a canonical (non-pretty) JSON string.
///
/// # Errors
///
/// Returns a [`serde_json::Error`] if `value` cannot be serialized.
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let v = serde_json::to_value(value)?;
    serde_json::to_string(&v)
}
