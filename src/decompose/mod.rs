//! Text-to-tasks decomposition pipeline.
//!
//! Stages run in order and short-circuit on the first failure:
//! validate → build prompt → call model → parse/normalize → materialize.
//! Nothing retries. A run that fails before the materialize stage writes nothing.

mod error;
mod materialize;
mod normalize;
mod prompt;
mod validate;

pub use error::DecomposeError;
pub use materialize::materialize;
pub use normalize::{clamp_title, normalize_entries, parse_model_output, CandidateTask};
pub use prompt::{build_prompt, PROMPT_VERSION};
pub use validate::validate_input;

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::DecomposeLimits;
use crate::identity::RequesterId;
use crate::llm::{ModelClient, ModelInvocation};
use crate::store::{SharedTaskStore, TaskRecord};

/// A validated decomposition request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecompositionRequest {
    text: String,
    requester: RequesterId,
}

impl DecompositionRequest {
    /// Check authentication first, then the text.
    pub fn new(
        requester: Option<RequesterId>,
        raw_text: &str,
        limits: &DecomposeLimits,
    ) -> Result<Self, DecomposeError> {
        let requester = requester.ok_or_else(|| {
            DecomposeError::Unauthenticated("Missing Authorization header".to_string())
        })?;
        let text = validate_input(raw_text, limits.max_input_chars)?;
        Ok(Self {
            text: text.to_string(),
            requester,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn requester(&self) -> &RequesterId {
        &self.requester
    }
}

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct DecompositionOutcome {
    pub tasks: Vec<CandidateTask>,
    pub records: Vec<TaskRecord>,
    pub created: usize,
    pub raw_json: String,
}

/// Runs the pipeline against injected collaborators.
pub struct Decomposer {
    model: Option<Arc<dyn ModelClient>>,
    store: SharedTaskStore,
    limits: DecomposeLimits,
}

impl Decomposer {
    /// `model` is `None` when no API key is configured; runs then fail with
    /// `ConfigurationMissing` after input validation.
    pub fn new(
        model: Option<Arc<dyn ModelClient>>,
        store: SharedTaskStore,
        limits: DecomposeLimits,
    ) -> Self {
        Self {
            model,
            store,
            limits,
        }
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    /// Validate and run in one step.
    pub async fn run(
        &self,
        requester: Option<RequesterId>,
        raw_text: &str,
    ) -> Result<DecompositionOutcome, DecomposeError> {
        let request = DecompositionRequest::new(requester, raw_text, &self.limits)?;
        self.decompose(&request).await
    }

    /// Run the pipeline for an already validated request.
    pub async fn decompose(
        &self,
        request: &DecompositionRequest,
    ) -> Result<DecompositionOutcome, DecomposeError> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| DecomposeError::ConfigurationMissing("GEMINI_API_KEY".to_string()))?;

        let invocation = ModelInvocation::json(build_prompt(request.text(), &self.limits));
        info!(
            requester = %request.requester(),
            prompt_version = PROMPT_VERSION,
            input_chars = request.text().chars().count(),
            "Decomposing text into tasks"
        );

        let raw = model.generate(&invocation).await.map_err(|e| {
            warn!(requester = %request.requester(), "Model call failed: {}", e);
            DecomposeError::from(e)
        })?;
        debug!(raw_chars = raw.text.len(), "Model replied");

        let tasks = parse_model_output(&raw.text, &self.limits).map_err(|e| {
            warn!(requester = %request.requester(), "Model did not return a JSON array");
            e
        })?;

        let records = materialize(self.store.as_ref(), request.requester(), &tasks).await?;
        info!(
            requester = %request.requester(),
            prompt_version = PROMPT_VERSION,
            tasks = tasks.len(),
            created = records.len(),
            "Decomposition complete"
        );

        Ok(DecompositionOutcome {
            created: records.len(),
            tasks,
            records,
            raw_json: raw.text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ModelError, RawModelOutput};
    use crate::store::{InMemoryTaskStore, NewTaskRecord, TaskId, TaskStore};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Model double that replays a fixed reply and records prompts.
    struct ScriptedModel {
        reply: Result<String, ModelError>,
        calls: AtomicUsize,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        fn replying(text: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(text.to_string()),
                calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn failing(err: ModelError) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(err),
                calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ModelClient for ScriptedModel {
        async fn generate(
            &self,
            invocation: &ModelInvocation,
        ) -> Result<RawModelOutput, ModelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts
                .lock()
                .expect("prompts lock")
                .push(invocation.prompt().to_string());
            match &self.reply {
                Ok(text) => Ok(RawModelOutput::new(text.clone())),
                Err(e) => Err(e.clone()),
            }
        }
    }

    /// Store wrapper that counts batch inserts and can reject them.
    struct CountingStore {
        inner: InMemoryTaskStore,
        inserts: AtomicUsize,
        reject: bool,
    }

    impl CountingStore {
        fn new(reject: bool) -> Arc<Self> {
            Arc::new(Self {
                inner: InMemoryTaskStore::new(),
                inserts: AtomicUsize::new(0),
                reject,
            })
        }

        fn inserts(&self) -> usize {
            self.inserts.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TaskStore for CountingStore {
        fn is_persistent(&self) -> bool {
            false
        }

        async fn insert_batch(&self, records: &[NewTaskRecord]) -> Result<Vec<TaskRecord>, String> {
            self.inserts.fetch_add(1, Ordering::SeqCst);
            if self.reject {
                return Err("permission denied for table todos".to_string());
            }
            self.inner.insert_batch(records).await
        }

        async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<TaskRecord>, String> {
            self.inner.list_for_owner(owner_id).await
        }

        async fn set_done(
            &self,
            owner_id: &str,
            id: TaskId,
            is_done: bool,
        ) -> Result<Option<TaskRecord>, String> {
            self.inner.set_done(owner_id, id, is_done).await
        }

        async fn delete(&self, owner_id: &str, id: TaskId) -> Result<bool, String> {
            self.inner.delete(owner_id, id).await
        }
    }

    fn decomposer(model: &Arc<ScriptedModel>, store: &Arc<CountingStore>) -> Decomposer {
        let model: Arc<dyn ModelClient> = model.clone();
        let store: SharedTaskStore = store.clone();
        Decomposer::new(Some(model), store, DecomposeLimits::default())
    }

    fn user() -> Option<RequesterId> {
        RequesterId::new("user-1")
    }

    #[tokio::test]
    async fn scenario_a_creates_owned_tasks() {
        let model = ScriptedModel::replying(
            r#"[{"title":"Buy milk","is_done":false},{"title":"Call mom","is_done":false},{"title":"Pay rent","is_done":false}]"#,
        );
        let store = CountingStore::new(false);
        let pipeline = decomposer(&model, &store);

        let outcome = pipeline
            .run(user(), "buy milk, call mom, pay rent")
            .await
            .expect("decompose");

        assert_eq!(outcome.created, 3);
        let titles: Vec<&str> = outcome.tasks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["Buy milk", "Call mom", "Pay rent"]);
        assert!(outcome.tasks.iter().all(|t| !t.is_done));

        let stored = store.list_for_owner("user-1").await.expect("list");
        assert_eq!(stored.len(), 3);
        assert!(stored.iter().all(|r| r.owner_id == "user-1" && !r.is_done));
        assert_eq!(model.calls(), 1);
        assert_eq!(store.inserts(), 1);

        let prompt = model.prompts.lock().expect("prompts lock")[0].clone();
        assert!(prompt.contains("buy milk, call mom, pay rent"));
    }

    #[tokio::test]
    async fn scenario_b_non_json_reply_is_malformed() {
        let model = ScriptedModel::replying("not json");
        let store = CountingStore::new(false);
        let err = decomposer(&model, &store)
            .run(user(), "plan my week")
            .await
            .expect_err("should fail");

        assert_eq!(err.kind(), "malformed_model_output");
        assert_eq!(err.raw_model_output(), Some("not json"));
        assert_eq!(store.inserts(), 0);
    }

    #[tokio::test]
    async fn scenario_c_missing_requester_stops_before_prompt() {
        let model = ScriptedModel::replying("[]");
        let store = CountingStore::new(false);
        let err = decomposer(&model, &store)
            .run(None, "buy milk")
            .await
            .expect_err("should fail");

        assert!(matches!(err, DecomposeError::Unauthenticated(_)));
        assert_eq!(model.calls(), 0);
        assert_eq!(store.inserts(), 0);
    }

    #[tokio::test]
    async fn unauthenticated_wins_over_invalid_text() {
        let model = ScriptedModel::replying("[]");
        let store = CountingStore::new(false);
        let err = decomposer(&model, &store)
            .run(None, "")
            .await
            .expect_err("should fail");
        assert!(matches!(err, DecomposeError::Unauthenticated(_)));
    }

    #[tokio::test]
    async fn scenario_d_twenty_entries_capped_to_twelve() {
        let entries: Vec<_> = (1..=20)
            .map(|i| json!({ "title": format!("Step {}", i), "is_done": false }))
            .collect();
        let model = ScriptedModel::replying(&serde_json::Value::Array(entries).to_string());
        let store = CountingStore::new(false);

        let outcome = decomposer(&model, &store)
            .run(user(), "a long plan")
            .await
            .expect("decompose");

        assert_eq!(outcome.created, 12);
        assert_eq!(outcome.tasks.first().map(|t| t.title.as_str()), Some("Step 1"));
        assert_eq!(outcome.tasks.last().map(|t| t.title.as_str()), Some("Step 12"));
    }

    #[tokio::test]
    async fn scenario_e_upstream_failure_persists_nothing() {
        let model = ScriptedModel::failing(ModelError::upstream_http(
            500,
            r#"{"error":{"code":500,"message":"internal"}}"#.to_string(),
        ));
        let store = CountingStore::new(false);
        let err = decomposer(&model, &store)
            .run(user(), "buy milk")
            .await
            .expect_err("should fail");

        assert!(matches!(
            err,
            DecomposeError::UpstreamHttpFailure { status: 500, .. }
        ));
        assert_eq!(store.inserts(), 0);
        assert!(store.list_for_owner("user-1").await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn invalid_text_makes_no_model_call() {
        let model = ScriptedModel::replying("[]");
        let store = CountingStore::new(false);
        let pipeline = decomposer(&model, &store);

        let err = pipeline.run(user(), "   ").await.expect_err("empty");
        assert!(matches!(err, DecomposeError::EmptyInput));

        let err = pipeline
            .run(user(), &"x".repeat(4001))
            .await
            .expect_err("too long");
        assert!(matches!(err, DecomposeError::InputTooLong { .. }));

        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn missing_model_is_configuration_error_after_validation() {
        let store: SharedTaskStore = CountingStore::new(false);
        let pipeline = Decomposer::new(None, store, DecomposeLimits::default());

        let err = pipeline.run(user(), "").await.expect_err("empty first");
        assert!(matches!(err, DecomposeError::EmptyInput));

        let err = pipeline.run(user(), "buy milk").await.expect_err("no key");
        match err {
            DecomposeError::ConfigurationMissing(name) => assert_eq!(name, "GEMINI_API_KEY"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn empty_decomposition_skips_the_store() {
        let model = ScriptedModel::replying(r#"[{"title":"  "},{"title":""}]"#);
        let store = CountingStore::new(false);
        let outcome = decomposer(&model, &store)
            .run(user(), "hmm")
            .await
            .expect("decompose");

        assert_eq!(outcome.created, 0);
        assert!(outcome.tasks.is_empty());
        assert_eq!(store.inserts(), 0);
    }

    #[tokio::test]
    async fn store_rejection_is_persistence_failure() {
        let model = ScriptedModel::replying(r#"[{"title":"Buy milk"}]"#);
        let store = CountingStore::new(true);
        let err = decomposer(&model, &store)
            .run(user(), "buy milk")
            .await
            .expect_err("should fail");

        match err {
            DecomposeError::PersistenceFailure { detail } => {
                assert!(detail.contains("permission denied"))
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn raw_reply_is_returned_verbatim() {
        let reply = "[ {\"title\": \"  Water plants \"} ]";
        let model = ScriptedModel::replying(reply);
        let store = CountingStore::new(false);
        let outcome = decomposer(&model, &store)
            .run(user(), "water the plants")
            .await
            .expect("decompose");

        assert_eq!(outcome.raw_json, reply);
        assert_eq!(outcome.tasks[0].title, "Water plants");
    }
}
