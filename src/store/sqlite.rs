//! SQLite-based task store.

use super::{NewTaskRecord, TaskId, TaskRecord, TaskStore};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

const SCHEMA: &str = r#"
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS todos (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    is_done INTEGER NOT NULL DEFAULT 0,
    owner_id TEXT NOT NULL,
    inserted_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_todos_owner_inserted ON todos(owner_id, inserted_at DESC);
"#;

const DB_FILE: &str = "todos.db";

type Row = (TaskId, String, bool, String, String);

pub struct SqliteTaskStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteTaskStore {
    pub async fn new(base_dir: PathBuf) -> Result<Self, String> {
        tokio::fs::create_dir_all(&base_dir)
            .await
            .map_err(|e| format!("Failed to create task store dir: {}", e))?;
        let db_path = base_dir.join(DB_FILE);

        // Open database in blocking task
        let conn = tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&db_path)
                .map_err(|e| format!("Failed to open SQLite database: {}", e))?;
            conn.execute_batch(SCHEMA)
                .map_err(|e| format!("Failed to run schema: {}", e))?;
            Ok::<_, String>(conn)
        })
        .await
        .map_err(|e| format!("Task join error: {}", e))??;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Row> {
        Ok((
            row.get(0)?,
            row.get(1)?,
            row.get::<_, i64>(2)? != 0,
            row.get(3)?,
            row.get(4)?,
        ))
    }

    fn into_record(row: Row) -> Result<TaskRecord, String> {
        let (id, title, is_done, owner_id, inserted_at) = row;
        let inserted_at = DateTime::parse_from_rfc3339(&inserted_at)
            .map_err(|e| format!("Invalid inserted_at for task {}: {}", id, e))?
            .with_timezone(&Utc);
        Ok(TaskRecord {
            id,
            title,
            is_done,
            owner_id,
            inserted_at,
        })
    }
}

#[async_trait]
impl TaskStore for SqliteTaskStore {
    fn is_persistent(&self) -> bool {
        true
    }

    async fn insert_batch(&self, records: &[NewTaskRecord]) -> Result<Vec<TaskRecord>, String> {
        let conn = Arc::clone(&self.conn);
        let records = records.to_vec();

        tokio::task::spawn_blocking(move || -> Result<Vec<TaskRecord>, String> {
            let mut conn = conn.blocking_lock();
            let tx = conn
                .transaction()
                .map_err(|e| format!("Failed to begin transaction: {}", e))?;
            let now = Utc::now();
            // Fixed-width timestamps keep lexical ORDER BY in line with time order
            let inserted_at = now.to_rfc3339_opts(SecondsFormat::Micros, true);
            let mut created = Vec::with_capacity(records.len());
            for record in records {
                tx.execute(
                    "INSERT INTO todos (title, is_done, owner_id, inserted_at) VALUES (?1, ?2, ?3, ?4)",
                    params![record.title, record.is_done as i64, record.owner_id, inserted_at],
                )
                .map_err(|e| format!("Failed to insert task: {}", e))?;
                created.push(TaskRecord {
                    id: tx.last_insert_rowid(),
                    title: record.title,
                    is_done: record.is_done,
                    owner_id: record.owner_id,
                    inserted_at: now,
                });
            }
            tx.commit()
                .map_err(|e| format!("Failed to commit tasks: {}", e))?;
            Ok(created)
        })
        .await
        .map_err(|e| format!("Task join error: {}", e))?
    }

    async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<TaskRecord>, String> {
        let conn = Arc::clone(&self.conn);
        let owner_id = owner_id.to_string();

        tokio::task::spawn_blocking(move || -> Result<Vec<TaskRecord>, String> {
            let conn = conn.blocking_lock();
            let mut stmt = conn
                .prepare(
                    "SELECT id, title, is_done, owner_id, inserted_at FROM todos
                     WHERE owner_id = ?1 ORDER BY inserted_at DESC, id DESC",
                )
                .map_err(|e| e.to_string())?;
            let rows = stmt
                .query_map(params![owner_id], Self::read_row)
                .map_err(|e| e.to_string())?
                .collect::<rusqlite::Result<Vec<Row>>>()
                .map_err(|e| e.to_string())?;
            rows.into_iter().map(Self::into_record).collect()
        })
        .await
        .map_err(|e| format!("Task join error: {}", e))?
    }

    async fn set_done(
        &self,
        owner_id: &str,
        id: TaskId,
        is_done: bool,
    ) -> Result<Option<TaskRecord>, String> {
        let conn = Arc::clone(&self.conn);
        let owner_id = owner_id.to_string();

        tokio::task::spawn_blocking(move || -> Result<Option<TaskRecord>, String> {
            let conn = conn.blocking_lock();
            let changed = conn
                .execute(
                    "UPDATE todos SET is_done = ?1 WHERE id = ?2 AND owner_id = ?3",
                    params![is_done as i64, id, owner_id],
                )
                .map_err(|e| format!("Failed to update task: {}", e))?;
            if changed == 0 {
                return Ok(None);
            }
            let row = conn
                .query_row(
                    "SELECT id, title, is_done, owner_id, inserted_at FROM todos WHERE id = ?1",
                    params![id],
                    Self::read_row,
                )
                .optional()
                .map_err(|e| e.to_string())?;
            row.map(Self::into_record).transpose()
        })
        .await
        .map_err(|e| format!("Task join error: {}", e))?
    }

    async fn delete(&self, owner_id: &str, id: TaskId) -> Result<bool, String> {
        let conn = Arc::clone(&self.conn);
        let owner_id = owner_id.to_string();

        tokio::task::spawn_blocking(move || -> Result<bool, String> {
            let conn = conn.blocking_lock();
            let deleted = conn
                .execute(
                    "DELETE FROM todos WHERE id = ?1 AND owner_id = ?2",
                    params![id, owner_id],
                )
                .map_err(|e| format!("Failed to delete task: {}", e))?;
            Ok(deleted > 0)
        })
        .await
        .map_err(|e| format!("Task join error: {}", e))?
    }
}
