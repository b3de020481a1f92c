// SPDX-License-Identifier: MIT OR Apache-2.0
//! Local workspace ref persistence (`spec.md` §3 "Workspace refs"; the
//! `ExecPull`/`ExecCheckoutRepo` bag-key shape supplemented into
//! `SPEC_FULL.md` §12).
//!
//! The core only consumes/produces `(refs, commit_id)` pairs; everything
//! about *where* `refs.toml` lives and how it's locked is this crate's
//! concern, not the FSM's (`spec.md` §3: "an external collaborator's
//! concern").

use std::path::Path;

use serde::{Deserialize, Serialize};
use zt_core::Oid;

/// Errors loading or saving a workspace's ref file.
#[derive(Debug, thiserror::Error)]
pub enum RefsError {
    /// The ref file was not found.
    #[error("refs file not found: {path}")]
    NotFound {
        /// Path that was requested.
        path: String,
    },
    /// The file could not be read or written.
    #[error("I/O error on {path}: {reason}")]
    Io {
        /// Path involved.
        path: String,
        /// Underlying error detail.
        reason: String,
    },
    /// The file's contents were not valid TOML, or a required field was
    /// malformed.
    #[error("malformed refs file: {0}")]
    Malformed(String),
}

/// A local workspace's pointer into a remote ledger (`SPEC_FULL.md` §12:
/// `RefsConfig{remote, zone_id, ledger_id, refs, commit_id}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefsConfig {
    /// Remote PAP endpoint this workspace tracks (opaque to the core; a
    /// URL or host:port string interpreted by the transport the caller
    /// constructs).
    pub remote: String,
    /// Zone owning the tracked ledger.
    pub zone_id: i64,
    /// Tracked ledger identifier.
    pub ledger_id: String,
    /// Named ref within the ledger (e.g. `"main"`); the core treats this as
    /// an opaque label.
    pub refs: String,
    /// The local head commit OID, updated on every successful pull/push.
    pub commit_id: Oid,
}

impl RefsConfig {
    /// Build a fresh, unsynced `RefsConfig` (as produced by `clone`, before
    /// any objects have been pulled).
    #[must_use]
    pub fn new(remote: impl Into<String>, zone_id: i64, ledger_id: impl Into<String>, refs: impl Into<String>) -> Self {
        Self {
            remote: remote.into(),
            zone_id,
            ledger_id: ledger_id.into(),
            refs: refs.into(),
            commit_id: Oid::zero(),
        }
    }

    /// Load a `RefsConfig` from a TOML file (conventionally `refs.toml` at
    /// the workspace root).
    pub fn load(path: &Path) -> Result<Self, RefsError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                RefsError::NotFound {
                    path: path.display().to_string(),
                }
            } else {
                RefsError::Io {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                }
            }
        })?;
        toml::from_str(&text).map_err(|e| RefsError::Malformed(e.to_string()))
    }

    /// Persist this `RefsConfig` as TOML to `path`, overwriting any
    /// existing file.
    pub fn save(&self, path: &Path) -> Result<(), RefsError> {
        let text = toml::to_string_pretty(self).map_err(|e| RefsError::Malformed(e.to_string()))?;
        std::fs::write(path, text).map_err(|e| RefsError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }
}
