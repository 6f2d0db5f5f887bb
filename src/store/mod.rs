//! Task record storage with pluggable backends.
//!
//! Supports:
//! - `memory`: In-memory storage (non-persistent, for testing)
//! - `sqlite`: Local SQLite database
//! - `supabase`: The project's `todos` table through PostgREST
//!
//! Every operation is scoped to an owner id. Backends never return or modify
//! a record on behalf of someone other than its owner.

mod memory;
mod sqlite;
mod supabase;

pub use memory::InMemoryTaskStore;
pub use sqlite::SqliteTaskStore;
pub use supabase::SupabaseTaskStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

use crate::config::Config;

/// Task record identifier (assigned by the store).
pub type TaskId = i64;

/// A persisted task record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: TaskId,
    pub title: String,
    pub is_done: bool,
    pub owner_id: String,
    pub inserted_at: DateTime<Utc>,
}

/// Creation request for a task record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewTaskRecord {
    pub title: String,
    pub is_done: bool,
    pub owner_id: String,
}

/// Task store trait - implemented by all storage backends.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Whether this store persists data across restarts.
    fn is_persistent(&self) -> bool;

    /// Insert records as one batch. Either all records are stored or none.
    async fn insert_batch(&self, records: &[NewTaskRecord]) -> Result<Vec<TaskRecord>, String>;

    /// List an owner's records, newest first.
    async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<TaskRecord>, String>;

    /// Set the completion flag. Returns `None` if the owner has no such record.
    async fn set_done(
        &self,
        owner_id: &str,
        id: TaskId,
        is_done: bool,
    ) -> Result<Option<TaskRecord>, String>;

    /// Delete a record. Returns `false` if the owner has no such record.
    async fn delete(&self, owner_id: &str, id: TaskId) -> Result<bool, String>;
}

pub type SharedTaskStore = Arc<dyn TaskStore>;

/// Task store type selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskStoreType {
    Memory,
    #[default]
    Sqlite,
    Supabase,
}

impl FromStr for TaskStoreType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "sqlite" | "db" => Ok(Self::Sqlite),
            "supabase" | "postgrest" => Ok(Self::Supabase),
            other => Err(format!("unknown task store '{}'", other)),
        }
    }
}

impl std::fmt::Display for TaskStoreType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::Sqlite => write!(f, "sqlite"),
            Self::Supabase => write!(f, "supabase"),
        }
    }
}

/// Create a task store from configuration.
pub async fn create_task_store(config: &Config) -> Result<SharedTaskStore, String> {
    match config.task_store {
        TaskStoreType::Memory => Ok(Arc::new(InMemoryTaskStore::new())),
        TaskStoreType::Sqlite => {
            let store = SqliteTaskStore::new(config.data_dir.clone()).await?;
            Ok(Arc::new(store))
        }
        TaskStoreType::Supabase => {
            let (url, key) = match (
                config.supabase.url.as_deref(),
                config.supabase.service_role_key.as_deref(),
            ) {
                (Some(url), Some(key)) => (url, key),
                _ => return Err("Supabase task store requires SUPABASE_URL and SUPABASE_SERVICE_ROLE_KEY".to_string()),
            };
            Ok(Arc::new(SupabaseTaskStore::new(url, key)))
        }
    }
}
