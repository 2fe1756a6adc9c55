mod classifier;
mod extractor;
mod textrank;

pub use classifier::LexiconClassifier;
pub use extractor::{CompositeEntityExtractor, EntityPattern, PatternEntityExtractor};
pub use textrank::TextRankSummarizer;

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::clause::Entity;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("Model call failed: {0}")]
    Failed(String),
    #[error("Model unavailable: {0}")]
    Unavailable(String),
    #[error("Model call timed out after {0} ms")]
    Timeout(u64),
    #[error("Nothing to process")]
    EmptyInput,
}

pub type ModelResult<T> = Result<T, ModelError>;

#[async_trait::async_trait]
pub trait EntityExtractor: Send + Sync {
    /// Entities in the order they occur in `text`.
    async fn extract(&self, text: &str) -> ModelResult<Vec<Entity>>;
}

#[async_trait::async_trait]
pub trait Classifier: Send + Sync {
    /// One of `Standard`, `Important`, `Risky`. Other labels are accepted and
    /// mapped to `Unknown` by the caller.
    async fn classify(&self, text: &str) -> ModelResult<String>;
}

#[async_trait::async_trait]
pub trait ExtractiveSummarizer: Send + Sync {
    /// Up to `k` representative sentences taken verbatim from `text`.
    async fn rank(&self, text: &str, k: usize) -> ModelResult<Vec<String>>;
}

/// The three collaborators, shared read-only between analyses. Defaults are
/// rule-based so analysis works without external model files.
#[derive(Clone)]
pub struct ModelSet {
    pub extractor: Arc<dyn EntityExtractor>,
    pub classifier: Arc<dyn Classifier>,
    pub summarizer: Arc<dyn ExtractiveSummarizer>,
}

impl ModelSet {
    #[must_use]
    pub fn new(
        extractor: Arc<dyn EntityExtractor>,
        classifier: Arc<dyn Classifier>,
        summarizer: Arc<dyn ExtractiveSummarizer>,
    ) -> Self {
        Self {
            extractor,
            classifier,
            summarizer,
        }
    }

    #[must_use]
    pub fn with_extractor(mut self, extractor: Arc<dyn EntityExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    #[must_use]
    pub fn with_classifier(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.classifier = classifier;
        self
    }

    #[must_use]
    pub fn with_summarizer(mut self, summarizer: Arc<dyn ExtractiveSummarizer>) -> Self {
        self.summarizer = summarizer;
        self
    }
}

impl Default for ModelSet {
    fn default() -> Self {
        Self::new(
            Arc::new(CompositeEntityExtractor::default()),
            Arc::new(LexiconClassifier::default()),
            Arc::new(TextRankSummarizer::default()),
        )
    }
}

impl std::fmt::Debug for ModelSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelSet").finish_non_exhaustive()
    }
}

static REGISTRY: RwLock<Option<Arc<ModelSet>>> = RwLock::const_new(None);

/// Returns the shared models, building the defaults on first use. Concurrent
/// first callers wait on the write lock and observe a single initialisation.
pub async fn shared() -> Arc<ModelSet> {
    if let Some(models) = REGISTRY.read().await.as_ref() {
        return Arc::clone(models);
    }

    let mut slot = REGISTRY.write().await;
    if let Some(models) = slot.as_ref() {
        return Arc::clone(models);
    }

    tracing::info!("Loading default model set");
    let models = Arc::new(ModelSet::default());
    *slot = Some(Arc::clone(&models));
    models
}

/// Replaces the shared models. Analyses already holding the previous set
/// keep using it.
pub async fn install(models: ModelSet) -> Arc<ModelSet> {
    let models = Arc::new(models);
    *REGISTRY.write().await = Some(Arc::clone(&models));
    models
}

/// Drops the shared models so the next [`shared`] call reloads them.
pub async fn reset() {
    *REGISTRY.write().await = None;
}
