//! Stored permission levels.
//!
//! Each permission name maps to one integer level. Reads go through the
//! cache under `permissions:<fullname>` and fall back to the store; the
//! first read of an unknown name creates its row with the default level.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{AlbertoError, Result};
use crate::storage::{all_rows, Cache, Record, Store};

/// Persisted level of one permission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRow {
    /// Permission full name, e.g. `ban.kick`.
    pub permission: String,
    pub level: i64,
}

impl Record for PermissionRow {
    const TABLE: &'static str = "permissions";

    fn key(&self) -> String {
        self.permission.clone()
    }
}

/// Cache key of a permission.
pub fn cache_key(fullname: &str) -> String {
    format!("permissions:{}", fullname)
}

/// Write-through access to stored permission levels.
#[derive(Clone)]
pub struct PermissionModel {
    cache: Arc<dyn Cache>,
    store: Arc<dyn Store<PermissionRow>>,
    ttl: Duration,
}

impl PermissionModel {
    pub fn new(cache: Arc<dyn Cache>, store: Arc<dyn Store<PermissionRow>>, ttl: Duration) -> Self {
        Self { cache, store, ttl }
    }

    /// Stored level of `fullname`, creating it with `default` if absent.
    ///
    /// # Errors
    /// `AlbertoError::Cache` if the cached value is not an integer, plus any
    /// cache or store failure.
    pub async fn get(&self, fullname: &str, default: i64) -> Result<i64> {
        let key = cache_key(fullname);
        if let Some(cached) = self.cache.get(&key).await? {
            return cached.trim().parse::<i64>().map_err(|_| {
                AlbertoError::Cache(format!("Invalid cached level '{}' for {}", cached, key))
            });
        }

        let level = match self.store.get(fullname).await? {
            Some(row) => row.level,
            None => {
                info!(permission = %fullname, level = default, "Creating permission with default level");
                self.store
                    .add(PermissionRow {
                        permission: fullname.to_string(),
                        level: default,
                    })
                    .await?
                    .level
            }
        };

        self.cache.setex(&key, self.ttl, level.to_string()).await?;
        debug!(permission = %fullname, level, "Cached permission level");
        Ok(level)
    }

    /// Store `level` for `fullname`, then refresh the cache.
    pub async fn set(&self, fullname: &str, level: i64) -> Result<()> {
        self.store
            .add(PermissionRow {
                permission: fullname.to_string(),
                level,
            })
            .await?;
        self.cache
            .setex(&cache_key(fullname), self.ttl, level.to_string())
            .await?;
        info!(permission = %fullname, level, "Permission level updated");
        Ok(())
    }

    /// Every stored row, sorted by permission name.
    pub async fn all(&self) -> Result<Vec<PermissionRow>> {
        let mut rows: Vec<PermissionRow> = self.store.stream(all_rows()).await?.collect().await;
        rows.sort_by(|a, b| a.permission.cmp(&b.permission));
        Ok(rows)
    }
}
