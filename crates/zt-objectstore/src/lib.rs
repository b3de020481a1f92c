// SPDX-License-Identifier: MIT OR Apache-2.0
//! Content-addressed key/value object store for the ZTAuth* core (`spec.md`
//! §4.1, L0-L1).
//!
//! This crate owns two things: the object wire codec (header framing, OID
//! computation, corruption detection — see [`codec`]) and the
//! [`ObjectStore`] trait plus its in-memory and optional `sled`-backed
//! implementations. Tree/commit binary decoding and policy-store assembly
//! live one layer up, in `zt-graph`.
#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Object wire codec: header framing, OID computation, corruption checks.
pub mod codec;

use std::collections::HashMap;
use std::sync::RwLock;

use thiserror::Error;
use tracing::debug;
use zt_core::Oid;

pub use codec::{
    build_object, decode_and_check, decode_object, encode_object, get_object_info, CodecError,
};

/// Errors raised by an [`ObjectStore`] implementation.
#[derive(Debug, Error)]
pub enum ObjectStoreError {
    /// No object is stored under the requested OID.
    #[error("object not found: {0}")]
    NotFound(Oid),
    /// The backend failed to read or write (I/O, serialization, etc.).
    #[error("object store backend error: {0}")]
    Backend(String),
}

impl From<ObjectStoreError> for zt_error::ZtError {
    fn from(e: ObjectStoreError) -> Self {
        match &e {
            ObjectStoreError::NotFound(oid) => {
                zt_error::ZtError::new(zt_error::ErrorCode::StorageNotFound, e.to_string())
                    .with_context("oid", oid.as_str())
            }
            ObjectStoreError::Backend(_) => {
                zt_error::ZtError::new(zt_error::ErrorCode::StorageGeneric, e.to_string())
            }
        }
    }
}

/// Content-addressed key/value store: `OID -> bytes` (`spec.md` §4.1).
///
/// `put` is idempotent — two writers of the same content produce the same
/// OID and the second write is a no-op (`spec.md` §8 property 1, §5: "many
/// readers, one writer per OID at a time... collision = no-op").
pub trait ObjectStore: Send + Sync {
    /// Compute the SHA256 OID of `bytes`, store it if not already present,
    /// and return the OID. Storing identical bytes twice is a no-op that
    /// returns the same OID both times.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectStoreError::Backend`] on a storage failure.
    fn put(&self, bytes: &[u8]) -> Result<Oid, ObjectStoreError>;

    /// Fetch the raw bytes stored under `oid`.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectStoreError::NotFound`] if no object is stored under
    /// `oid`, or [`ObjectStoreError::Backend`] on a storage failure.
    fn get(&self, oid: &Oid) -> Result<Vec<u8>, ObjectStoreError>;

    /// Report whether `oid` is present without fetching its bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectStoreError::Backend`] on a storage failure.
    fn has(&self, oid: &Oid) -> Result<bool, ObjectStoreError>;
}

/// An in-memory [`ObjectStore`] backed by a `HashMap` behind an `RwLock`.
///
/// The reference implementation: used by tests, the NOTP in-memory
/// transports, and anywhere durability isn't required.
#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    objects: RwLock<HashMap<Oid, Vec<u8>>>,
}

impl InMemoryObjectStore {
    /// Construct an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct objects currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects
            .read()
            .expect("object store lock poisoned")
            .len()
    }

    /// Whether the store holds no objects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn put(&self, bytes: &[u8]) -> Result<Oid, ObjectStoreError> {
        let oid = Oid::of(bytes);
        let mut guard = self
            .objects
            .write()
            .map_err(|e| ObjectStoreError::Backend(e.to_string()))?;
        guard.entry(oid.clone()).or_insert_with(|| bytes.to_vec());
        debug!(target: "zt.objectstore", oid = %oid, "object stored");
        Ok(oid)
    }

    fn get(&self, oid: &Oid) -> Result<Vec<u8>, ObjectStoreError> {
        let guard = self
            .objects
            .read()
            .map_err(|e| ObjectStoreError::Backend(e.to_string()))?;
        guard
            .get(oid)
            .cloned()
            .ok_or_else(|| ObjectStoreError::NotFound(oid.clone()))
    }

    fn has(&self, oid: &Oid) -> Result<bool, ObjectStoreError> {
        let guard = self
            .objects
            .read()
            .map_err(|e| ObjectStoreError::Backend(e.to_string()))?;
        Ok(guard.contains_key(oid))
    }
}

/// A durable, `sled`-backed [`ObjectStore`], keyed by the OID's raw 32 bytes.
///
/// Matches the recommended physical layout in `spec.md` §6: a single
/// key/value table `(oid BLOB PRIMARY KEY, bytes BLOB)`.
#[cfg(feature = "sled-backend")]
pub mod sled_backend {
    use super::{ObjectStore, ObjectStoreError, Oid};

    /// A durable object store backed by an embedded `sled` database.
    pub struct SledObjectStore {
        tree: sled::Db,
    }

    impl SledObjectStore {
        /// Open (or create) a sled database at `path`.
        ///
        /// # Errors
        ///
        /// Returns [`ObjectStoreError::Backend`] if the database cannot be
        /// opened.
        pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self, ObjectStoreError> {
            let tree = sled::open(path).map_err(|e| ObjectStoreError::Backend(e.to_string()))?;
            Ok(Self { tree })
        }
    }

    impl ObjectStore for SledObjectStore {
        fn put(&self, bytes: &[u8]) -> Result<Oid, ObjectStoreError> {
            let oid = Oid::of(bytes);
            let key = oid
                .to_bytes32()
                .map_err(|e| ObjectStoreError::Backend(e.to_string()))?;
            let _ = self
                .tree
                .compare_and_swap(key, None as Option<&[u8]>, Some(bytes))
                .map_err(|e| ObjectStoreError::Backend(e.to_string()))?;
            Ok(oid)
        }

        fn get(&self, oid: &Oid) -> Result<Vec<u8>, ObjectStoreError> {
            let key = oid
                .to_bytes32()
                .map_err(|e| ObjectStoreError::Backend(e.to_string()))?;
            self.tree
                .get(key)
                .map_err(|e| ObjectStoreError::Backend(e.to_string()))?
                .map(|ivec| ivec.to_vec())
                .ok_or_else(|| ObjectStoreError::NotFound(oid.clone()))
        }

        fn has(&self, oid: &Oid) -> Result<bool, ObjectStoreError> {
            let key = oid
                .to_bytes32()
                .map_err(|e| ObjectStoreError::Backend(e.to_string()))?;
            self.tree
                .contains_key(key)
                .map_err(|e| ObjectStoreError::Backend(e.to_string()))
        }
    }
}

#[cfg(feature = "sled-backend")]
pub use sled_backend::SledObjectStore;
