//! Render hook owning every rendered post and its pending work

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::config::{SchedulerConfig, Settings};
use crate::dom::{Document, NodeId};
use crate::error::Result;
use crate::placeholder::{
    PlaceholderError, PlaceholderRegistry, PlaceholderResult, Placeholders, PostIdentifier,
    PostMetadata, PostPlaceholders, SubstitutionEngine,
};
use crate::store::ValueStore;
use crate::tasks::Scheduler;

/// Work queued for a rendered post
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeTask {
    /// Set the initial substituted state once rendering settles
    InitialPass { post: PostIdentifier },
    /// A debounced control change
    Change {
        post: PostIdentifier,
        key: String,
        value: String,
    },
}

impl RuntimeTask {
    pub fn post(&self) -> &PostIdentifier {
        match self {
            RuntimeTask::InitialPass { post } | RuntimeTask::Change { post, .. } => post,
        }
    }
}

/// Debounce slot: one pending change per control
type ChangeSlot = (PostIdentifier, String);

/// A post's document together with its placeholder state
#[derive(Debug)]
pub struct RenderedPost {
    pub document: Document,
    pub state: PostPlaceholders,
}

pub struct PlaceholderRuntime {
    store: ValueStore,
    engine: SubstitutionEngine,
    registry: PlaceholderRegistry,
    scheduler: Scheduler<ChangeSlot, RuntimeTask>,
    posts: HashMap<PostIdentifier, RenderedPost>,
    debounce: Duration,
    initial_pass_delay: Duration,
}

impl PlaceholderRuntime {
    pub fn new(
        store: ValueStore,
        engine: SubstitutionEngine,
        registry: PlaceholderRegistry,
        config: &SchedulerConfig,
    ) -> Self {
        Self {
            store,
            engine,
            registry,
            scheduler: Scheduler::new(),
            posts: HashMap::new(),
            debounce: Duration::from_millis(config.debounce_ms),
            initial_pass_delay: Duration::from_millis(config.initial_pass_delay_ms),
        }
    }

    pub fn from_settings(settings: &Settings, store: ValueStore) -> Result<Self> {
        let engine = SubstitutionEngine::from_config(&settings.engine)?;
        let registry = PlaceholderRegistry::new(settings.engine.default_delimiter.clone());
        Ok(Self::new(store, engine, registry, &settings.scheduler))
    }

    /// Drop expired persisted values; run once before the first render
    pub fn startup(&self) -> usize {
        let purged = self.store.purge_expired();
        tracing::info!(
            purged = purged,
            backend = self.store.backend().backend_type(),
            "Placeholder runtime started"
        );
        purged
    }

    /// Take ownership of a freshly rendered post.
    ///
    /// Posts rendered without metadata are not processed and `None` is
    /// returned. Rendering a post again replaces the previous instance.
    pub fn render(
        &mut self,
        metadata: Option<PostMetadata>,
        mut document: Document,
        now: Instant,
    ) -> PlaceholderResult<Option<PostIdentifier>> {
        let metadata = match metadata {
            Some(metadata) => metadata,
            None => {
                tracing::debug!("Skipping render without post metadata");
                return Ok(None);
            }
        };

        let post = PostIdentifier::new(metadata);
        if self.posts.contains_key(&post) {
            self.dispose(&post);
        }

        let mut state = PostPlaceholders::new(post.clone(), document.root());
        state.scan(&mut document, &self.registry, &self.store)?;

        if !state.placeholders().is_empty() {
            self.schedule_initial_pass(&post, now);
        }

        tracing::info!(
            post = %post,
            placeholders = state.placeholders().len(),
            "Post rendered"
        );
        self.posts.insert(post.clone(), RenderedPost { document, state });

        Ok(Some(post))
    }

    /// Pick up placeholder blocks added to an already rendered post
    pub fn rescan(&mut self, post: &PostIdentifier, now: Instant) -> PlaceholderResult<Vec<String>> {
        let rendered = match self.posts.get_mut(post) {
            Some(rendered) => rendered,
            None => {
                tracing::debug!(post = %post, "Rescan for unknown post ignored");
                return Ok(Vec::new());
            }
        };

        let added = rendered
            .state
            .scan(&mut rendered.document, &self.registry, &self.store)?;

        if !added.is_empty() {
            self.schedule_initial_pass(post, now);
        }
        Ok(added)
    }

    fn schedule_initial_pass(&mut self, post: &PostIdentifier, now: Instant) {
        self.scheduler.defer(
            self.initial_pass_delay,
            RuntimeTask::InitialPass { post: post.clone() },
            now,
        );
    }

    /// Queue a control change; rapid changes to one control coalesce.
    ///
    /// Returns `false` when the post is unknown.
    pub fn input(
        &mut self,
        post: &PostIdentifier,
        key: &str,
        value: impl Into<String>,
        now: Instant,
    ) -> bool {
        if !self.posts.contains_key(post) {
            tracing::debug!(post = %post, key = %key, "Input for unknown post ignored");
            return false;
        }

        let task = RuntimeTask::Change {
            post: post.clone(),
            key: key.to_string(),
            value: value.into(),
        };
        self.scheduler
            .debounce((post.clone(), key.to_string()), self.debounce, task, now);
        true
    }

    /// Tear down a post instance and cancel its pending work
    pub fn dispose(&mut self, post: &PostIdentifier) -> bool {
        let cancelled = self.scheduler.cancel_where(|task| task.post() == post);
        let removed = self.posts.remove(post).is_some();

        if removed {
            tracing::info!(post = %post, cancelled_tasks = cancelled, "Post disposed");
        }
        removed
    }

    /// Remove a subtree from a post's document, dropping its recorded content
    pub fn remove_node(&mut self, post: &PostIdentifier, node: NodeId) -> PlaceholderResult<usize> {
        let rendered = match self.posts.get_mut(post) {
            Some(rendered) => rendered,
            None => return Ok(0),
        };

        let removed = rendered.document.remove(node)?;
        Ok(rendered.state.forget(&removed))
    }

    /// Execute every task due at `now`, returning how many ran
    pub fn run_due(&mut self, now: Instant) -> usize {
        let tasks = self.scheduler.run_due(now);
        let mut ran = 0;

        for task in tasks {
            let post = task.post().clone();
            match self.execute(task) {
                Ok(true) => ran += 1,
                Ok(false) => {}
                Err(PlaceholderError::UnknownKey(key)) => {
                    tracing::warn!(post = %post, key = %key, "Change for unknown placeholder ignored");
                }
                Err(e) => {
                    tracing::warn!(post = %post, error = %e, "Placeholder task failed");
                }
            }
        }

        ran
    }

    fn execute(&mut self, task: RuntimeTask) -> PlaceholderResult<bool> {
        match task {
            RuntimeTask::InitialPass { post } => {
                let rendered = match self.posts.get_mut(&post) {
                    Some(rendered) => rendered,
                    None => return Ok(false),
                };

                let root = rendered.state.root();
                let document = &mut rendered.document;
                if !document.is_attached(root) || document.children(root).is_empty() {
                    tracing::debug!(post = %post, "Skipping initial pass for empty or detached post");
                    return Ok(false);
                }

                rendered.state.apply(document, &self.engine)?;
                Ok(true)
            }
            RuntimeTask::Change { post, key, value } => {
                let rendered = match self.posts.get_mut(&post) {
                    Some(rendered) => rendered,
                    None => return Ok(false),
                };

                rendered.state.handle_change(
                    &mut rendered.document,
                    &key,
                    &value,
                    &self.store,
                    &self.engine,
                )?;
                Ok(true)
            }
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }

    pub fn has_pending(&self) -> bool {
        !self.scheduler.is_empty()
    }

    pub fn document(&self, post: &PostIdentifier) -> Option<&Document> {
        self.posts.get(post).map(|rendered| &rendered.document)
    }

    /// Mutable access to a post's document, for growing it between scans.
    ///
    /// Detaching nodes must go through [`remove_node`](Self::remove_node).
    /// A subtree removed here leaves its original content recorded, and the
    /// next pass would still compute replacements for it.
    pub fn document_mut(&mut self, post: &PostIdentifier) -> Option<&mut Document> {
        self.posts.get_mut(post).map(|rendered| &mut rendered.document)
    }

    pub fn placeholders(&self, post: &PostIdentifier) -> Option<&Placeholders> {
        self.posts.get(post).map(|rendered| rendered.state.placeholders())
    }

    pub fn post_count(&self) -> usize {
        self.posts.len()
    }

    pub fn store(&self) -> &ValueStore {
        &self.store
    }
}

impl std::fmt::Debug for PlaceholderRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaceholderRuntime")
            .field("store", &self.store)
            .field("posts", &self.posts.len())
            .field("pending_tasks", &self.scheduler.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::dom::FixtureNode;
    use crate::store::MemoryBackend;
    use std::sync::Arc;

    const META: PostMetadata = PostMetadata {
        topic_id: 1,
        post_id: 2,
    };

    fn runtime() -> PlaceholderRuntime {
        let store = ValueStore::new(Arc::new(MemoryBackend::new()), &StoreConfig::default()).unwrap();
        PlaceholderRuntime::from_settings(&Settings::default(), store).unwrap()
    }

    fn post_document(body: &str) -> Document {
        Document::from_fixture(&FixtureNode::element(
            "div",
            &[],
            vec![
                FixtureNode::element(
                    "div",
                    &[
                        ("class", "d-wrap"),
                        ("data-wrap", "placeholder"),
                        ("data-key", "KEY"),
                        ("data-default", "foo"),
                    ],
                    vec![],
                ),
                FixtureNode::element("p", &[], vec![FixtureNode::text(body)]),
            ],
        ))
        .unwrap()
    }

    fn body_text(runtime: &PlaceholderRuntime, post: &PostIdentifier) -> String {
        let doc = runtime.document(post).unwrap();
        let p = doc.children(doc.root())[1];
        doc.text_content(p)
    }

    #[test]
    fn test_initial_pass_is_deferred() {
        let mut runtime = runtime();
        let start = Instant::now();
        let post = runtime
            .render(Some(META), post_document("=KEY="), start)
            .unwrap()
            .unwrap();

        assert_eq!(body_text(&runtime, &post), "=KEY=");
        assert_eq!(runtime.run_due(start + Duration::from_millis(499)), 0);
        assert_eq!(runtime.run_due(start + Duration::from_millis(500)), 1);
        assert_eq!(body_text(&runtime, &post), "foo");
        assert!(!runtime.has_pending());
    }

    #[test]
    fn test_input_is_debounced() {
        let mut runtime = runtime();
        let start = Instant::now();
        let post = runtime
            .render(Some(META), post_document("=KEY="), start)
            .unwrap()
            .unwrap();
        runtime.run_due(start + Duration::from_millis(500));

        let t = start + Duration::from_secs(1);
        runtime.input(&post, "KEY", "b", t);
        runtime.input(&post, "KEY", "ba", t + Duration::from_millis(50));
        runtime.input(&post, "KEY", "bar", t + Duration::from_millis(100));

        assert_eq!(runtime.run_due(t + Duration::from_millis(200)), 0);
        assert_eq!(runtime.run_due(t + Duration::from_millis(250)), 1);
        assert_eq!(body_text(&runtime, &post), "bar");
        assert_eq!(runtime.store().get("1-2-KEY"), Some("bar".to_string()));
    }

    #[test]
    fn test_render_without_metadata() {
        let mut runtime = runtime();
        let result = runtime
            .render(None, post_document("=KEY="), Instant::now())
            .unwrap();

        assert_eq!(result, None);
        assert_eq!(runtime.post_count(), 0);
        assert!(!runtime.has_pending());
    }

    #[test]
    fn test_dispose_cancels_pending_work() {
        let mut runtime = runtime();
        let start = Instant::now();
        let post = runtime
            .render(Some(META), post_document("=KEY="), start)
            .unwrap()
            .unwrap();
        runtime.input(&post, "KEY", "bar", start);

        assert!(runtime.dispose(&post));
        assert!(!runtime.has_pending());
        assert_eq!(runtime.run_due(start + Duration::from_secs(1)), 0);
        assert!(!runtime.input(&post, "KEY", "bar", start));
    }

    #[test]
    fn test_initial_pass_skipped_for_detached_root() {
        let mut runtime = runtime();
        let start = Instant::now();
        let post = runtime
            .render(Some(META), post_document("=KEY="), start)
            .unwrap()
            .unwrap();

        let root = runtime.document(&post).unwrap().root();
        runtime.remove_node(&post, root).unwrap();

        assert_eq!(runtime.run_due(start + Duration::from_millis(500)), 0);
    }

    #[test]
    fn test_remove_node_forgets_content() {
        let mut runtime = runtime();
        let start = Instant::now();
        let post = runtime
            .render(Some(META), post_document("=KEY="), start)
            .unwrap()
            .unwrap();
        runtime.run_due(start + Duration::from_millis(500));

        let doc = runtime.document(&post).unwrap();
        let p = doc.children(doc.root())[1];
        assert_eq!(runtime.remove_node(&post, p).unwrap(), 1);

        // Later passes run over what is left
        runtime.input(&post, "KEY", "bar".to_string(), start + Duration::from_millis(600));
        assert_eq!(runtime.run_due(start + Duration::from_millis(800)), 1);
        let doc = runtime.document(&post).unwrap();
        assert_eq!(doc.children(doc.root()).len(), 1);
    }

    #[test]
    fn test_rescan_picks_up_streamed_blocks() {
        let mut runtime = runtime();
        let start = Instant::now();
        let post = runtime
            .render(Some(META), post_document("=KEY= =MORE="), start)
            .unwrap()
            .unwrap();
        runtime.run_due(start + Duration::from_millis(500));

        let doc = runtime.document_mut(&post).unwrap();
        let block = doc.create_element("div");
        doc.set_attribute(block, "class", "d-wrap").unwrap();
        doc.set_data(block, "wrap", "placeholder").unwrap();
        doc.set_data(block, "key", "MORE").unwrap();
        doc.set_data(block, "default", "bar").unwrap();
        let root = doc.root();
        doc.append_child(root, block).unwrap();

        let t = start + Duration::from_secs(1);
        assert_eq!(runtime.rescan(&post, t).unwrap(), vec!["MORE".to_string()]);
        assert!(runtime.rescan(&post, t).unwrap().is_empty());

        runtime.run_due(t + Duration::from_millis(500));
        assert_eq!(body_text(&runtime, &post), "foo bar");
    }
}
