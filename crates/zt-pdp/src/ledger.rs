// SPDX-License-Identifier: MIT OR Apache-2.0
//! The ledger lookup collaborator (`spec.md` §4.4 step 1, §3: "An
//! out-of-scope table row"). The PDP core only ever needs "find the ledger
//! named by `(zoneID, policyStoreID)`" — everything else about how ledgers
//! are stored (SQLite/Postgres schema, CRUD, zone/tenant tables) is
//! explicitly out of scope (`spec.md` §1).

use async_trait::async_trait;
use zt_core::Ledger;

/// Errors a [`LedgerRepository`] may report. Anything beyond "lookup
/// failed" is the repository implementation's own concern; the PDP only
/// distinguishes "did I get exactly one row back".
#[derive(Debug, thiserror::Error)]
pub enum LedgerLookupError {
    /// The backing store could not be reached or returned a failure.
    #[error("ledger lookup failed: {0}")]
    Backend(String),
}

/// Resolves `(zone_id, policy_store_id)` to the matching ledger row(s).
/// Implementations are expected to return zero, one, or more than one
/// ledger; the PDP pipeline treats anything other than exactly one as a bad
/// request (`spec.md` §4.4 step 1, §8 scenario S4).
#[async_trait]
pub trait LedgerRepository: Send + Sync {
    /// Look up ledgers matching the given zone and policy-store id.
    async fn find_ledgers(
        &self,
        zone_id: i64,
        policy_store_id: &str,
    ) -> Result<Vec<Ledger>, LedgerLookupError>;
}

/// A fixed in-memory [`LedgerRepository`], useful for tests and for a
/// single-process `ztauthd` deployment that has no separate zone
/// administration service fronting it.
#[derive(Debug, Default, Clone)]
pub struct InMemoryLedgerRepository {
    ledgers: Vec<Ledger>,
}

impl InMemoryLedgerRepository {
    /// Build a repository over a fixed ledger list.
    #[must_use]
    pub fn new(ledgers: Vec<Ledger>) -> Self {
        Self { ledgers }
    }
}

#[async_trait]
impl LedgerRepository for InMemoryLedgerRepository {
    async fn find_ledgers(
        &self,
        zone_id: i64,
        policy_store_id: &str,
    ) -> Result<Vec<Ledger>, LedgerLookupError> {
        Ok(self
            .ledgers
            .iter()
            .filter(|l| l.zone_id == zone_id && l.name == policy_store_id)
            .cloned()
            .collect())
    }
}
