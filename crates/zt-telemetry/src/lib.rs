// SPDX-License-Identifier: MIT OR Apache-2.0
//! Structured logging setup and per-layer `tracing` target conventions for
//! the ZTAuth* core (`spec.md` §5: object store reads, evaluator
//! invocation, and NOTP send/recv are the named suspension points; every
//! one of them emits a correlated `tracing` event).
//!
//! A thin, dependency-light crate: it installs a [`tracing_subscriber::fmt`]
//! layer with an [`tracing_subscriber::EnvFilter`] and nothing else. It does
//! not itself emit events — those live at each layer's call sites, tagged
//! with one of the [`targets`] constants so operators can filter per layer
//! (e.g. `RUST_LOG=zt.notp=debug,zt.pdp=info`).
#![deny(unsafe_code)]
#![warn(missing_docs)]

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// `tracing` target conventions, one per core layer (`spec.md` §2).
///
/// Using these (rather than the default `module_path!()` target) keeps log
/// filtering stable across internal refactors — a caller configuring
/// `RUST_LOG` names the layer, not a Rust module path.
pub mod targets {
    /// Object codec and object store (L0-L1).
    pub const OBJECTSTORE: &str = "zt.objectstore";
    /// Tree/commit graph and policy-store assembler (L2-L3).
    pub const GRAPH: &str = "zt.graph";
    /// NOTP packet/transport and state machines (L4-L5).
    pub const NOTP: &str = "zt.notp";
    /// Authorization evaluator adapter (L6).
    pub const EVAL: &str = "zt.eval";
    /// Decision pipeline (L7).
    pub const PDP: &str = "zt.pdp";
    /// Workspace clone/diff/plan/apply/pull/push.
    pub const WORKSPACE: &str = "zt.workspace";
}

/// Telemetry configuration: which filter directives to install.
///
/// Threaded explicitly into [`init_tracing`] rather than read from a
/// process-wide singleton (`spec.md` §9 design note: "Global CLI/config
/// state... thread an explicit context struct").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// `EnvFilter`-syntax directive string, e.g. `"zt.pdp=debug,warn"`.
    /// Defaults to `"info"` when empty.
    pub filter: String,
    /// Emit logs as JSON lines instead of the default human-readable format.
    pub json: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: false,
        }
    }
}

/// Error installing the global tracing subscriber.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// A subscriber was already installed (e.g. a second call in-process,
    /// or a test harness that installed one first).
    #[error("tracing subscriber already set")]
    AlreadySet,
}

/// Install a global [`tracing_subscriber::fmt`] subscriber honoring
/// `config.filter`, falling back to the `RUST_LOG` environment variable and
/// then `"info"` if both are empty.
///
/// Idempotent-safe to call once at process start; a second call (e.g. in a
/// test binary that links multiple crates each calling this) returns
/// [`TelemetryError::AlreadySet`] rather than panicking.
///
/// # Errors
///
/// Returns [`TelemetryError::AlreadySet`] if a global subscriber is already
/// installed.
pub fn init_tracing(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = if config.filter.is_empty() {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    } else {
        EnvFilter::try_new(&config.filter).unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let result = if config.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .try_init()
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).try_init()
    };

    result.map_err(|_| TelemetryError::AlreadySet)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_info_filter() {
        let cfg = TelemetryConfig::default();
        assert_eq!(cfg.filter, "info");
        assert!(!cfg.json);
    }

    #[test]
    fn targets_are_dot_namespaced() {
        for t in [
            targets::OBJECTSTORE,
            targets::GRAPH,
            targets::NOTP,
            targets::EVAL,
            targets::PDP,
            targets::WORKSPACE,
        ] {
            assert!(t.starts_with("zt."));
        }
    }

    #[test]
    fn config_roundtrips_through_serde() {
        let cfg = TelemetryConfig {
            filter: "zt.pdp=debug".into(),
            json: true,
        };
        let json = serde_json::to_string(&cfg).unwrap();
        let back: TelemetryConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.filter, "zt.pdp=debug");
        assert!(back.json);
    }
}
