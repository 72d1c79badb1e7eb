//! In-memory roster storage for testing and development.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::RwLock;

use super::RosterStore;
use crate::error::StoreResult;
use crate::types::Company;

/// Rosters keyed by account id. Data is lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    rosters: RwLock<BTreeMap<String, Vec<Company>>>,
    writes: RwLock<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an account's roster.
    pub fn with_roster(self, account_id: impl Into<String>, companies: Vec<Company>) -> Self {
        self.rosters
            .write()
            .unwrap()
            .insert(account_id.into(), companies);
        self
    }

    /// Current roster of an account.
    pub fn roster(&self, account_id: &str) -> Vec<Company> {
        self.rosters
            .read()
            .unwrap()
            .get(account_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of `put_roster` calls so far.
    pub fn write_count(&self) -> usize {
        *self.writes.read().unwrap()
    }
}

#[async_trait]
impl RosterStore for MemoryStore {
    async fn get_roster(&self, account_id: &str) -> StoreResult<Vec<Company>> {
        Ok(self.roster(account_id))
    }

    async fn put_roster(&self, account_id: &str, companies: &[Company]) -> StoreResult<()> {
        self.rosters
            .write()
            .unwrap()
            .insert(account_id.to_string(), companies.to_vec());
        *self.writes.write().unwrap() += 1;
        Ok(())
    }

    async fn account_ids(&self) -> StoreResult<Vec<String>> {
        Ok(self.rosters.read().unwrap().keys().cloned().collect())
    }
}
