use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::clause::{Clause, ClauseType, Entity, Warning, WarningStage};
use crate::config::AnalysisConfig;
use crate::models::{ModelError, ModelResult, ModelSet};

/// A value produced by a recoverable step, with the warning raised while
/// producing it. A degraded value is still usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enriched<T> {
    pub value: T,
    pub warning: Option<Warning>,
}

impl<T> Enriched<T> {
    #[must_use]
    pub fn ok(value: T) -> Self {
        Self {
            value,
            warning: None,
        }
    }

    #[must_use]
    pub fn degraded(value: T, warning: Warning) -> Self {
        Self {
            value,
            warning: Some(warning),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.warning.is_some()
    }

    pub fn into_parts(self) -> (T, Option<Warning>) {
        (self.value, self.warning)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichStats {
    pub clauses: usize,
    pub entity_failures: usize,
    pub classification_failures: usize,
}

#[derive(Debug, Default)]
struct ClauseOutcome {
    entities: Option<Enriched<Vec<Entity>>>,
    clause_type: Option<Enriched<ClauseType>>,
}

async fn bounded<T>(
    limit: Duration,
    call: impl Future<Output = ModelResult<T>>,
) -> ModelResult<T> {
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(ModelError::Timeout(
            u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
        )),
    }
}

/// Per-clause entity extraction and classification. A failed or timed-out
/// call degrades only that field of that clause and leaves a [`Warning`] on
/// it. Clause count and order never change.
#[derive(Debug, Clone)]
pub struct EnrichmentOrchestrator {
    models: Arc<ModelSet>,
    extract_entities: bool,
    classify_clauses: bool,
    entity_timeout: Duration,
    classify_timeout: Duration,
    concurrency: usize,
}

impl EnrichmentOrchestrator {
    #[must_use]
    pub fn new(models: Arc<ModelSet>) -> Self {
        Self::from_config(models, &AnalysisConfig::default())
    }

    #[must_use]
    pub fn from_config(models: Arc<ModelSet>, config: &AnalysisConfig) -> Self {
        Self {
            models,
            extract_entities: config.extract_entities,
            classify_clauses: config.classify_clauses,
            entity_timeout: config.entity_timeout(),
            classify_timeout: config.classify_timeout(),
            concurrency: config.concurrency.max(1),
        }
    }

    #[must_use]
    pub fn with_entities(mut self, enabled: bool) -> Self {
        self.extract_entities = enabled;
        self
    }

    #[must_use]
    pub fn with_classification(mut self, enabled: bool) -> Self {
        self.classify_clauses = enabled;
        self
    }

    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    #[must_use]
    pub fn with_timeouts(mut self, entity: Duration, classify: Duration) -> Self {
        self.entity_timeout = entity;
        self.classify_timeout = classify;
        self
    }

    /// Entities for one clause; empty plus a warning on failure.
    pub async fn entities_for(&self, index: usize, text: &str) -> Enriched<Vec<Entity>> {
        match bounded(self.entity_timeout, self.models.extractor.extract(text)).await {
            Ok(entities) => Enriched::ok(entities),
            Err(e) => {
                tracing::warn!("Entity extraction failed for clause {}: {}", index + 1, e);
                Enriched::degraded(
                    Vec::new(),
                    Warning::new(WarningStage::Entities, e.to_string()).for_clause(index),
                )
            }
        }
    }

    /// Type for one clause; `General` plus a warning on failure.
    pub async fn classify(&self, index: usize, text: &str) -> Enriched<ClauseType> {
        match bounded(self.classify_timeout, self.models.classifier.classify(text)).await {
            Ok(label) => {
                let clause_type = ClauseType::from_label(&label);
                if clause_type == ClauseType::Unknown {
                    tracing::debug!("Clause {} got unrecognised label {:?}", index + 1, label);
                }
                Enriched::ok(clause_type)
            }
            Err(e) => {
                tracing::warn!("Classification failed for clause {}: {}", index + 1, e);
                Enriched::degraded(
                    ClauseType::General,
                    Warning::new(WarningStage::Classification, e.to_string()).for_clause(index),
                )
            }
        }
    }

    async fn run_clause(&self, index: usize, text: &str) -> ClauseOutcome {
        let mut outcome = ClauseOutcome::default();
        if self.extract_entities {
            outcome.entities = Some(self.entities_for(index, text).await);
        }
        if self.classify_clauses {
            outcome.clause_type = Some(self.classify(index, text).await);
        }
        outcome
    }

    /// Enriches every clause in place.
    pub async fn enrich(&self, clauses: &mut [Clause]) -> EnrichStats {
        let mut stats = EnrichStats {
            clauses: clauses.len(),
            ..EnrichStats::default()
        };

        if !self.extract_entities && !self.classify_clauses {
            tracing::debug!("Enrichment disabled, leaving {} clauses as segmented", clauses.len());
            return stats;
        }

        if self.concurrency <= 1 || clauses.len() <= 1 {
            for clause in clauses.iter_mut() {
                let outcome = self.run_clause(clause.index, &clause.text).await;
                apply(clause, outcome, &mut stats);
            }
        } else {
            self.enrich_concurrently(clauses, &mut stats).await;
        }

        tracing::info!(
            "Enriched {} clauses ({} entity failures, {} classification failures)",
            stats.clauses,
            stats.entity_failures,
            stats.classification_failures
        );
        stats
    }

    async fn enrich_concurrently(&self, clauses: &mut [Clause], stats: &mut EnrichStats) {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        for (position, clause) in clauses.iter().enumerate() {
            let this = self.clone();
            let semaphore = Arc::clone(&semaphore);
            let index = clause.index;
            let text = clause.text.clone();

            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                (position, this.run_clause(index, &text).await)
            });
        }

        let mut outcomes: Vec<Option<ClauseOutcome>> = clauses.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((position, outcome)) => outcomes[position] = Some(outcome),
                Err(e) => tracing::warn!("Enrichment task aborted: {}", e),
            }
        }

        for (clause, outcome) in clauses.iter_mut().zip(outcomes) {
            let outcome = outcome.unwrap_or_else(|| self.aborted(clause.index));
            apply(clause, outcome, stats);
        }
    }

    fn aborted(&self, index: usize) -> ClauseOutcome {
        let warning = |stage| Warning::new(stage, "enrichment task aborted").for_clause(index);
        ClauseOutcome {
            entities: self
                .extract_entities
                .then(|| Enriched::degraded(Vec::new(), warning(WarningStage::Entities))),
            clause_type: self.classify_clauses.then(|| {
                Enriched::degraded(ClauseType::General, warning(WarningStage::Classification))
            }),
        }
    }
}

fn apply(clause: &mut Clause, outcome: ClauseOutcome, stats: &mut EnrichStats) {
    if let Some(enriched) = outcome.entities {
        let (entities, warning) = enriched.into_parts();
        clause.entities = entities;
        if let Some(warning) = warning {
            stats.entity_failures += 1;
            clause.push_warning(warning);
        }
    }

    if let Some(enriched) = outcome.clause_type {
        let (clause_type, warning) = enriched.into_parts();
        clause.clause_type = clause_type;
        if let Some(warning) = warning {
            stats.classification_failures += 1;
            clause.push_warning(warning);
        }
    }
}
