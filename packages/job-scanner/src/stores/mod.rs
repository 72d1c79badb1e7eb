//! Roster storage.
//!
//! Available backends:
//! - `MemoryStore` - In-memory storage for tests and development
//! - `PostgresStore` - the `users.companies` JSONB document

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::types::Company;

/// Per-account company rosters, read and written as a whole.
#[async_trait]
pub trait RosterStore: Send + Sync {
    /// All companies of an account. Unknown accounts have an empty roster.
    async fn get_roster(&self, account_id: &str) -> StoreResult<Vec<Company>>;

    /// Replace an account's roster.
    async fn put_roster(&self, account_id: &str, companies: &[Company]) -> StoreResult<()>;

    async fn account_ids(&self) -> StoreResult<Vec<String>>;
}
