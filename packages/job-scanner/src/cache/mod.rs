//! Key-value caches for cross-scan memoization.
//!
//! Two caches are used by the sources: domain → careers URL and
//! LinkedIn slug → jobs listing URL. Both are optimizations; a miss only
//! re-triggers resolution, so last-write-wins races are acceptable.

pub mod file;
pub mod memory;

pub use file::FileCache;
pub use memory::MemoryCache;

use async_trait::async_trait;

use crate::error::CacheResult;

#[async_trait]
pub trait KvCache: Send + Sync {
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    async fn put(&self, key: &str, value: &str) -> CacheResult<()>;
}
