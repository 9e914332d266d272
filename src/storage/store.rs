//! Store implementations.
//!
//! [`MemoryStore`] keeps rows in memory only. [`JsonFileStore`] also keeps
//! them in memory but persists the whole table as pretty-printed JSON at
//! `<dir>/<TABLE>.json` after every write.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::RwLock;
use tracing::debug;

use super::{Filter, Record, Store};
use crate::error::{AlbertoError, Result};

/// Rows keyed by primary key. `BTreeMap` gives a stable key order.
type Table<R> = BTreeMap<String, R>;

fn first_match<R: Record>(table: &Table<R>, filter: &Filter<R>) -> Option<R> {
    table.values().find(|&row| filter(row)).cloned()
}

fn matching<R: Record>(table: &Table<R>, filter: &Filter<R>) -> BoxStream<'static, R> {
    let rows: Vec<R> = table.values().filter(|&row| filter(row)).cloned().collect();
    stream::iter(rows).boxed()
}

/// Volatile in-memory store.
pub struct MemoryStore<R: Record> {
    rows: RwLock<Table<R>>,
}

impl<R: Record> MemoryStore<R> {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

impl<R: Record> Default for MemoryStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<R: Record> Store<R> for MemoryStore<R> {
    async fn get(&self, key: &str) -> Result<Option<R>> {
        Ok(self.rows.read().await.get(key).cloned())
    }

    async fn add(&self, row: R) -> Result<R> {
        self.rows.write().await.insert(row.key(), row.clone());
        Ok(row)
    }

    async fn first(&self, filter: Filter<R>) -> Result<Option<R>> {
        Ok(first_match(&*self.rows.read().await, &filter))
    }

    async fn stream(&self, filter: Filter<R>) -> Result<BoxStream<'static, R>> {
        Ok(matching(&*self.rows.read().await, &filter))
    }
}

/// Store persisted as one JSON file per table.
pub struct JsonFileStore<R: Record> {
    path: PathBuf,
    rows: RwLock<Table<R>>,
}

impl<R: Record> JsonFileStore<R> {
    /// Open the table under `dir`, loading existing rows if the file exists.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let path = dir.as_ref().join(format!("{}.json", R::TABLE));
        let rows = Self::load(&path).await?;
        debug!(table = R::TABLE, rows = rows.len(), path = %path.display(), "Opened store");
        Ok(Self {
            path,
            rows: RwLock::new(rows),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(path: &Path) -> Result<Table<R>> {
        if !path.exists() {
            return Ok(BTreeMap::new());
        }

        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            AlbertoError::Store(format!("Failed to read {}: {}", path.display(), e))
        })?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        let rows: Vec<R> = serde_json::from_str(&content).map_err(|e| {
            AlbertoError::Store(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        Ok(rows.into_iter().map(|row| (row.key(), row)).collect())
    }

    async fn save(&self, rows: &Table<R>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                AlbertoError::Store(format!(
                    "Failed to create store directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let rows: Vec<&R> = rows.values().collect();
        let json = serde_json::to_string_pretty(&rows)?;
        tokio::fs::write(&self.path, json).await.map_err(|e| {
            AlbertoError::Store(format!("Failed to write {}: {}", self.path.display(), e))
        })?;
        Ok(())
    }
}

#[async_trait]
impl<R: Record> Store<R> for JsonFileStore<R> {
    async fn get(&self, key: &str) -> Result<Option<R>> {
        Ok(self.rows.read().await.get(key).cloned())
    }

    /// The row becomes visible only once the table is written to disk.
    async fn add(&self, row: R) -> Result<R> {
        let mut rows = self.rows.write().await;
        let mut updated = rows.clone();
        updated.insert(row.key(), row.clone());
        self.save(&updated).await?;
        *rows = updated;
        Ok(row)
    }

    async fn first(&self, filter: Filter<R>) -> Result<Option<R>> {
        Ok(first_match(&*self.rows.read().await, &filter))
    }

    async fn stream(&self, filter: Filter<R>) -> Result<BoxStream<'static, R>> {
        Ok(matching(&*self.rows.read().await, &filter))
    }
}
