//! In-memory task store (non-persistent).

use super::{NewTaskRecord, TaskId, TaskRecord, TaskStore};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Inner {
    next_id: TaskId,
    records: Vec<TaskRecord>,
}

#[derive(Clone, Default)]
pub struct InMemoryTaskStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    fn is_persistent(&self) -> bool {
        false
    }

    async fn insert_batch(&self, records: &[NewTaskRecord]) -> Result<Vec<TaskRecord>, String> {
        let mut inner = self.inner.write().await;
        let now = Utc::now();
        let mut created = Vec::with_capacity(records.len());
        for record in records {
            inner.next_id += 1;
            created.push(TaskRecord {
                id: inner.next_id,
                title: record.title.clone(),
                is_done: record.is_done,
                owner_id: record.owner_id.clone(),
                inserted_at: now,
            });
        }
        inner.records.extend(created.iter().cloned());
        Ok(created)
    }

    async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<TaskRecord>, String> {
        let mut records: Vec<TaskRecord> = self
            .inner
            .read()
            .await
            .records
            .iter()
            .filter(|r| r.owner_id == owner_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.inserted_at.cmp(&a.inserted_at).then(b.id.cmp(&a.id)));
        Ok(records)
    }

    async fn set_done(
        &self,
        owner_id: &str,
        id: TaskId,
        is_done: bool,
    ) -> Result<Option<TaskRecord>, String> {
        let mut inner = self.inner.write().await;
        Ok(inner
            .records
            .iter_mut()
            .find(|r| r.id == id && r.owner_id == owner_id)
            .map(|r| {
                r.is_done = is_done;
                r.clone()
            }))
    }

    async fn delete(&self, owner_id: &str, id: TaskId) -> Result<bool, String> {
        let mut inner = self.inner.write().await;
        let before = inner.records.len();
        inner
            .records
            .retain(|r| !(r.id == id && r.owner_id == owner_id));
        Ok(inner.records.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_record(title: &str, owner: &str) -> NewTaskRecord {
        NewTaskRecord {
            title: title.to_string(),
            is_done: false,
            owner_id: owner.to_string(),
        }
    }

    #[tokio::test]
    async fn lists_newest_first_per_owner() {
        let store = InMemoryTaskStore::new();
        store
            .insert_batch(&[new_record("first", "alice"), new_record("second", "alice")])
            .await
            .expect("insert");
        store
            .insert_batch(&[new_record("other", "bob")])
            .await
            .expect("insert");

        let titles: Vec<String> = store
            .list_for_owner("alice")
            .await
            .expect("list")
            .into_iter()
            .map(|r| r.title)
            .collect();
        assert_eq!(titles, vec!["second", "first"]);
    }

    #[tokio::test]
    async fn owner_scoping_on_update_and_delete() {
        let store = InMemoryTaskStore::new();
        let created = store
            .insert_batch(&[new_record("mine", "alice")])
            .await
            .expect("insert");
        let id = created[0].id;

        assert_eq!(store.set_done("bob", id, true).await.expect("set"), None);
        assert!(!store.delete("bob", id).await.expect("delete"));

        let updated = store.set_done("alice", id, true).await.expect("set");
        assert!(updated.expect("record").is_done);
        assert!(store.delete("alice", id).await.expect("delete"));
        assert!(store.list_for_owner("alice").await.expect("list").is_empty());
    }
}
