//! Cache and persistent store collaborators.
//!
//! The permission model reads through a TTL cache and writes to a keyed
//! store. Both are traits so a deployment can back them with a real
//! key-value server or database; the in-process implementations here are
//! used by the binary and the tests.

pub mod cache;
pub mod store;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

pub use cache::MemoryCache;
pub use store::{JsonFileStore, MemoryStore};

/// Key-value cache with per-entry expiry.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Value stored under `key`, or `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key` for `ttl`.
    async fn setex(&self, key: &str, ttl: Duration, value: String) -> Result<()>;
}

/// A row type persisted in a [`Store`].
pub trait Record: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Table name. File-backed stores use it as the file stem.
    const TABLE: &'static str;

    /// Primary key of the row.
    fn key(&self) -> String;
}

/// Row predicate used by [`Store::first`] and [`Store::stream`].
pub type Filter<R> = Arc<dyn Fn(&R) -> bool + Send + Sync>;

/// Filter matching every row.
pub fn all_rows<R: Record>() -> Filter<R> {
    Arc::new(|_: &R| true)
}

/// Persistent table of `R` rows keyed by [`Record::key`].
#[async_trait]
pub trait Store<R: Record>: Send + Sync {
    /// Row with primary key `key`.
    async fn get(&self, key: &str) -> Result<Option<R>>;

    /// Insert or replace `row`, returning the stored row.
    async fn add(&self, row: R) -> Result<R>;

    /// First row (in key order) matching `filter`.
    async fn first(&self, filter: Filter<R>) -> Result<Option<R>>;

    /// Lazily yield every row matching `filter`, in key order.
    async fn stream(&self, filter: Filter<R>) -> Result<BoxStream<'static, R>>;
}
