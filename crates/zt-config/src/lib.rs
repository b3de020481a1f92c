// SPDX-License-Identifier: MIT OR Apache-2.0
//! TOML configuration loading for the ZTAuth* core, with an environment
//! variable overlay of the form `ZTAUTH_<SECTION>_<KEY>` (`SPEC_FULL.md`
//! §11.3).
//!
//! [`ZtConfig`] is a plain struct, loaded once by a binary's `main` and
//! threaded explicitly into constructors — there is no process-wide
//! singleton (`spec.md` §9: "Global CLI/config state... thread an explicit
//! context struct").
#![deny(unsafe_code)]
#![warn(missing_docs)]

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Errors that can occur loading or overlaying configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The requested configuration file was not found.
    #[error("config file not found: {path}")]
    FileNotFound {
        /// Path that was requested.
        path: String,
    },

    /// The file could not be read.
    #[error("failed to read config file {path}: {reason}")]
    ReadError {
        /// Path that was requested.
        path: String,
        /// Underlying I/O error detail.
        reason: String,
    },

    /// The file could not be parsed as valid TOML.
    #[error("failed to parse config: {reason}")]
    ParseError {
        /// Human-readable parse error detail.
        reason: String,
    },

    /// An environment variable overlay carried a value that could not be
    /// coerced into the field's type.
    #[error("invalid override {var}={value}: {reason}")]
    InvalidOverride {
        /// Environment variable name, e.g. `ZTAUTH_NOTP_DEFAULT_TIMEOUT_SECS`.
        var: String,
        /// The offending raw value.
        value: String,
        /// Why the value was rejected.
        reason: String,
    },
}

impl From<ConfigError> for zt_error::ZtError {
    fn from(err: ConfigError) -> Self {
        zt_error::ZtError::new(zt_error::ErrorCode::ConfigurationGeneric, err.to_string())
    }
}

/// Object store backend selection (`spec.md` §2 L0-L1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ObjectStoreBackend {
    /// Volatile, process-lifetime store (default; suitable for tests and
    /// the PDP's working set when fronted by a persistent PAP).
    Memory,
    /// Durable `sled`-backed store.
    Sled,
}

impl Default for ObjectStoreBackend {
    fn default() -> Self {
        Self::Memory
    }
}

/// Object store section.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ObjectStoreConfig {
    /// Which backend to construct.
    pub backend: ObjectStoreBackend,
    /// Filesystem path for the `sled` backend. Ignored for `memory`.
    pub path: String,
}

impl Default for ObjectStoreConfig {
    fn default() -> Self {
        Self {
            backend: ObjectStoreBackend::default(),
            path: "./ztauth-data/objects".to_string(),
        }
    }
}

/// NOTP transport section (`spec.md` §4.3/§5).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NotpConfig {
    /// Default per-recv timeout in seconds, mirroring
    /// `zt_core::NOTP_DEFAULT_TIMEOUT_SECS`.
    pub default_timeout_secs: u64,
}

impl Default for NotpConfig {
    fn default() -> Self {
        Self {
            default_timeout_secs: zt_core::NOTP_DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl NotpConfig {
    /// The configured default timeout as a [`Duration`].
    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.default_timeout_secs)
    }
}

/// Authorization decision pipeline section (`spec.md` §4.4, L7).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PdpConfig {
    /// Ambient deadline in milliseconds applied to a whole
    /// `AuthorizationCheck()` call (ledger lookup through aggregation).
    pub deadline_ms: u64,
}

impl Default for PdpConfig {
    fn default() -> Self {
        Self { deadline_ms: 5_000 }
    }
}

impl PdpConfig {
    /// The configured ambient deadline as a [`Duration`].
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }
}

/// Telemetry section, mirrored into `zt_telemetry::TelemetryConfig` at
/// process start by the binary crate that owns this config.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TelemetryConfig {
    /// `EnvFilter`-syntax directive string.
    pub filter: String,
    /// Emit logs as JSON lines.
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

/// Top-level ZTAuth* runtime configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ZtConfig {
    /// Object store settings.
    #[serde(default)]
    pub objectstore: ObjectStoreConfig,
    /// NOTP transport settings.
    #[serde(default)]
    pub notp: NotpConfig,
    /// Decision pipeline settings.
    #[serde(default)]
    pub pdp: PdpConfig,
    /// Telemetry settings.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl ZtConfig {
    /// Load configuration from a TOML file at `path`, then apply
    /// `ZTAUTH_<SECTION>_<KEY>` environment variable overrides on top.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                ConfigError::ReadError {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                }
            }
        })?;
        Self::parse(&text)
    }

    /// Parse configuration from an in-memory TOML document, then apply the
    /// environment overlay. Exposed separately from [`Self::load`] so
    /// callers (and tests) can supply TOML without touching the filesystem.
    pub fn parse(toml_text: &str) -> Result<Self, ConfigError> {
        let mut cfg: ZtConfig = toml::from_str(toml_text).map_err(|e| ConfigError::ParseError {
            reason: e.to_string(),
        })?;
        cfg.apply_env_overlay(&std::env::vars().collect())?;
        Ok(cfg)
    }

    /// Apply a `ZTAUTH_<SECTION>_<KEY>` overlay from an explicit variable
    /// map. Split out from [`Self::parse`] so tests can supply a
    /// deterministic map instead of depending on the real process
    /// environment.
    pub fn apply_env_overlay(
        &mut self,
        vars: &BTreeMap<String, String>,
    ) -> Result<(), ConfigError> {
        for (key, value) in vars {
            let Some(rest) = key.strip_prefix("ZTAUTH_") else {
                continue;
            };
            match rest {
                "OBJECTSTORE_BACKEND" => {
                    self.objectstore.backend = match value.to_lowercase().as_str() {
                        "memory" => ObjectStoreBackend::Memory,
                        "sled" => ObjectStoreBackend::Sled,
                        other => {
                            return Err(ConfigError::InvalidOverride {
                                var: key.clone(),
                                value: value.clone(),
                                reason: format!("unknown backend {other:?}, expected memory|sled"),
                            })
                        }
                    };
                }
                "OBJECTSTORE_PATH" => self.objectstore.path = value.clone(),
                "NOTP_DEFAULT_TIMEOUT_SECS" => {
                    self.notp.default_timeout_secs = parse_u64(key, value)?;
                }
                "PDP_DEADLINE_MS" => {
                    self.pdp.deadline_ms = parse_u64(key, value)?;
                }
                "TELEMETRY_FILTER" => self.telemetry.filter = value.clone(),
                "TELEMETRY_JSON" => {
                    self.telemetry.json = parse_bool(key, value)?;
                }
                _ => {}
            }
        }
        Ok(())
    }
}

fn parse_u64(var: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|e| ConfigError::InvalidOverride {
        var: var.to_string(),
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn parse_bool(var: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(ConfigError::InvalidOverride {
            var: var.to_string(),
            value: value.to_string(),
            reason: format!("expected a boolean, got {other:?}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_constants() {
        let cfg = ZtConfig::default();
        assert_eq!(cfg.notp.default_timeout_secs, 30);
        assert_eq!(cfg.objectstore.backend, ObjectStoreBackend::Memory);
    }

    #[test]
    fn parses_toml_and_fills_defaults() {
        let cfg = ZtConfig::parse(
            r#"
            [objectstore]
            backend = "sled"
            path = "/var/lib/ztauth/objects"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.objectstore.backend, ObjectStoreBackend::Sled);
        assert_eq!(cfg.objectstore.path, "/var/lib/ztauth/objects");
        assert_eq!(cfg.notp.default_timeout_secs, 30);
    }

    #[test]
    fn env_overlay_overrides_toml() {
        let mut cfg = ZtConfig::default();
        let mut vars = BTreeMap::new();
        vars.insert("ZTAUTH_NOTP_DEFAULT_TIMEOUT_SECS".to_string(), "90".to_string());
        vars.insert("ZTAUTH_TELEMETRY_JSON".to_string(), "true".to_string());
        vars.insert("UNRELATED_VAR".to_string(), "ignored".to_string());
        cfg.apply_env_overlay(&vars).unwrap();
        assert_eq!(cfg.notp.default_timeout_secs, 90);
        assert!(cfg.telemetry.json);
    }

    #[test]
    fn invalid_override_is_rejected() {
        let mut cfg = ZtConfig::default();
        let mut vars = BTreeMap::new();
        vars.insert(
            "ZTAUTH_OBJECTSTORE_BACKEND".to_string(),
            "rocksdb".to_string(),
        );
        let err = cfg.apply_env_overlay(&vars).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOverride { .. }));
    }

    #[test]
    fn load_missing_file_reports_not_found() {
        let err = ZtConfig::load(Path::new("/nonexistent/ztauth.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }

    #[test]
    fn load_reads_from_tempfile() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ztauth.toml");
        std::fs::write(&path, "[pdp]\ndeadline_ms = 1234\n").unwrap();
        let cfg = ZtConfig::load(&path).unwrap();
        assert_eq!(cfg.pdp.deadline_ms, 1234);
    }
}
