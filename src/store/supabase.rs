//! Supabase (PostgREST) task store over the `todos` table.
//!
//! Uses the service role key, which bypasses row level security, so every
//! query filters on `user_id` explicitly.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{NewTaskRecord, TaskId, TaskRecord, TaskStore};

const TABLE: &str = "todos";

/// Row shape of the `todos` table.
#[derive(Debug, Deserialize)]
struct DbTodo {
    id: TaskId,
    title: String,
    #[serde(default)]
    is_done: bool,
    user_id: String,
    inserted_at: DateTime<Utc>,
}

impl From<DbTodo> for TaskRecord {
    fn from(row: DbTodo) -> Self {
        TaskRecord {
            id: row.id,
            title: row.title,
            is_done: row.is_done,
            owner_id: row.user_id,
            inserted_at: row.inserted_at,
        }
    }
}

#[derive(Debug, Serialize)]
struct DbNewTodo<'a> {
    title: &'a str,
    is_done: bool,
    user_id: &'a str,
}

/// Supabase client for the `todos` table.
pub struct SupabaseTaskStore {
    client: Client,
    url: String,
    service_role_key: String,
}

impl SupabaseTaskStore {
    /// Create a new Supabase task store.
    pub fn new(url: &str, service_role_key: &str) -> Self {
        Self {
            client: Client::new(),
            url: url.trim_end_matches('/').to_string(),
            service_role_key: service_role_key.to_string(),
        }
    }

    /// Get the PostgREST URL for the table.
    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.url, TABLE)
    }

    fn owner_filter(owner_id: &str) -> String {
        format!("eq.{}", urlencoding::encode(owner_id))
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.service_role_key)
            .header("Authorization", format!("Bearer {}", self.service_role_key))
    }

    async fn read_rows(resp: reqwest::Response, action: &str) -> Result<Vec<DbTodo>, String> {
        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| format!("Failed to {}: {}", action, e))?;

        if !status.is_success() {
            return Err(format!("Failed to {}: {} - {}", action, status, text));
        }

        serde_json::from_str(&text).map_err(|e| format!("Failed to {}: {}", action, e))
    }
}

#[async_trait]
impl TaskStore for SupabaseTaskStore {
    fn is_persistent(&self) -> bool {
        true
    }

    async fn insert_batch(&self, records: &[NewTaskRecord]) -> Result<Vec<TaskRecord>, String> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let body: Vec<DbNewTodo<'_>> = records
            .iter()
            .map(|r| DbNewTodo {
                title: &r.title,
                is_done: r.is_done,
                user_id: &r.owner_id,
            })
            .collect();

        // A single bulk insert is one statement, so PostgREST applies it atomically.
        let resp = self
            .request(reqwest::Method::POST, self.table_url())
            .header("Content-Type", "application/json")
            .header("Prefer", "return=representation")
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("Failed to insert tasks: {}", e))?;

        let rows = Self::read_rows(resp, "insert tasks").await?;
        Ok(rows.into_iter().map(TaskRecord::from).collect())
    }

    async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<TaskRecord>, String> {
        let url = format!(
            "{}?select=*&user_id={}&order=inserted_at.desc,id.desc",
            self.table_url(),
            Self::owner_filter(owner_id)
        );
        let resp = self
            .request(reqwest::Method::GET, url)
            .send()
            .await
            .map_err(|e| format!("Failed to list tasks: {}", e))?;

        let rows = Self::read_rows(resp, "list tasks").await?;
        Ok(rows.into_iter().map(TaskRecord::from).collect())
    }

    async fn set_done(
        &self,
        owner_id: &str,
        id: TaskId,
        is_done: bool,
    ) -> Result<Option<TaskRecord>, String> {
        let url = format!(
            "{}?id=eq.{}&user_id={}",
            self.table_url(),
            id,
            Self::owner_filter(owner_id)
        );
        let resp = self
            .request(reqwest::Method::PATCH, url)
            .header("Content-Type", "application/json")
            .header("Prefer", "return=representation")
            .json(&serde_json::json!({ "is_done": is_done }))
            .send()
            .await
            .map_err(|e| format!("Failed to update task: {}", e))?;

        let rows = Self::read_rows(resp, "update task").await?;
        Ok(rows.into_iter().next().map(TaskRecord::from))
    }

    async fn delete(&self, owner_id: &str, id: TaskId) -> Result<bool, String> {
        let url = format!(
            "{}?id=eq.{}&user_id={}",
            self.table_url(),
            id,
            Self::owner_filter(owner_id)
        );
        let resp = self
            .request(reqwest::Method::DELETE, url)
            .header("Prefer", "return=representation")
            .send()
            .await
            .map_err(|e| format!("Failed to delete task: {}", e))?;

        let rows = Self::read_rows(resp, "delete task").await?;
        Ok(!rows.is_empty())
    }
}
