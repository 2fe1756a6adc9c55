use std::path::Path;
use std::sync::Arc;

use super::enrich::EnrichmentOrchestrator;
use super::normalizer::normalize;
use super::parser::{CompositeParser, DocumentFormat, ParsedDocument, Parser};
use super::segmenter::{ClauseSegmenter, SegmentStats};
use super::state::{AnalysisContext, AnalysisState};
use super::summary::Summarizer;
use crate::analysis::{AnalysisResult, AnalysisStats, TypeCounts};
use crate::clause::Clause;
use crate::config::AnalysisConfig;
use crate::models::{self, ModelSet};
use crate::{Error, Result};

/// Drives one document through load, segmentation, enrichment and
/// summarization. The pipeline itself holds no per-request state and can
/// serve any number of sequential requests.
pub struct AnalysisPipeline {
    parser: Box<dyn Parser>,
    models: Arc<ModelSet>,
    config: AnalysisConfig,
}

impl AnalysisPipeline {
    #[must_use]
    pub fn new() -> Self {
        Self {
            parser: Box::new(CompositeParser::default()),
            models: Arc::new(ModelSet::default()),
            config: AnalysisConfig::default(),
        }
    }

    /// Uses the process-wide models, loading them if this is the first
    /// request.
    pub async fn from_shared(config: AnalysisConfig) -> Self {
        Self::new()
            .with_models(models::shared().await)
            .with_config(config)
    }

    #[must_use]
    pub fn with_parser(mut self, parser: Box<dyn Parser>) -> Self {
        self.parser = parser;
        self
    }

    #[must_use]
    pub fn with_models(mut self, models: Arc<ModelSet>) -> Self {
        self.models = models;
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: AnalysisConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub async fn analyze_file(&self, path: &Path) -> Result<AnalysisResult> {
        let mut ctx = AnalysisContext::new(self.config.clone()).with_source(path);
        let document = self.load(&mut ctx, self.parser.parse_file(path).await)?;
        self.analyze_document(ctx, document).await
    }

    pub async fn analyze_text(&self, text: &str) -> Result<AnalysisResult> {
        let mut ctx = AnalysisContext::new(self.config.clone());
        let document = ParsedDocument::new(DocumentFormat::PlainText, text.to_string())
            .with_method("inline");
        ctx.advance(AnalysisState::Loaded)?;
        self.analyze_document(ctx, document).await
    }

    /// Load, normalize and segment only.
    pub async fn segment_file(&self, path: &Path) -> Result<Vec<Clause>> {
        let mut ctx = AnalysisContext::new(self.config.clone()).with_source(path);
        let document = self.load(&mut ctx, self.parser.parse_file(path).await)?;
        let (clauses, _) = self.segment(&mut ctx, &document)?;
        Ok(clauses)
    }

    fn load(
        &self,
        ctx: &mut AnalysisContext,
        parsed: super::parser::ParseResult<ParsedDocument>,
    ) -> Result<ParsedDocument> {
        match parsed {
            Ok(document) => {
                tracing::info!(
                    "Loaded {} document ({} chars, {})",
                    document.format,
                    document.full_text.len(),
                    document.method.as_deref().unwrap_or("direct")
                );
                ctx.advance(AnalysisState::Loaded)?;
                Ok(document)
            }
            Err(e) => {
                tracing::error!("Failed to load document: {}", e);
                ctx.fail(e.to_string())?;
                Err(e.into())
            }
        }
    }

    fn segment(
        &self,
        ctx: &mut AnalysisContext,
        document: &ParsedDocument,
    ) -> Result<(Vec<Clause>, SegmentStats)> {
        let normalized = normalize(&document.full_text);
        let segmenter = ClauseSegmenter::new(ctx.config().rules.clone());
        let (clauses, stats) = segmenter.segment_with_stats(&normalized);

        tracing::info!(
            "Segmented {} sections into {} candidates, {} merged, {} clauses",
            stats.sections,
            stats.candidates,
            stats.merged,
            stats.clauses
        );

        if clauses.is_empty() {
            let reason = "no valid clauses found in document";
            ctx.fail(reason)?;
            return Err(Error::Segmentation(reason.into()));
        }

        ctx.advance(AnalysisState::Segmented)?;
        Ok((clauses, stats))
    }

    async fn analyze_document(
        &self,
        mut ctx: AnalysisContext,
        document: ParsedDocument,
    ) -> Result<AnalysisResult> {
        let (mut clauses, segment_stats) = self.segment(&mut ctx, &document)?;

        let orchestrator = EnrichmentOrchestrator::from_config(Arc::clone(&self.models), ctx.config());
        let enrich_stats = orchestrator.enrich(&mut clauses).await;
        ctx.advance(AnalysisState::Enriched)?;

        let summarizer = Summarizer::from_config(Arc::clone(&self.models.summarizer), ctx.config());
        let (summary, summary_warning) = summarizer.summarize(&clauses).await.into_parts();
        ctx.advance(AnalysisState::Summarized)?;

        let elapsed_ms = u64::try_from(ctx.elapsed().as_millis()).unwrap_or(u64::MAX);
        let stats = AnalysisStats {
            clause_count: clauses.len(),
            sections: segment_stats.sections,
            merged_fragments: segment_stats.merged,
            entity_failures: enrich_stats.entity_failures,
            classification_failures: enrich_stats.classification_failures,
            type_counts: TypeCounts::from_clauses(&clauses),
            elapsed_ms,
        };

        let result = AnalysisResult {
            source: ctx.source().map(Path::to_path_buf).or(document.source),
            format: document.format,
            page_count: document.page_count,
            extraction: document.method,
            clauses,
            summary,
            warnings: summary_warning.into_iter().collect(),
            stats,
        };
        ctx.advance(AnalysisState::Complete)?;

        tracing::info!(
            "Analysis complete: {} clauses, {} warnings in {} ms",
            result.stats.clause_count,
            result.all_warnings().count(),
            elapsed_ms
        );
        Ok(result)
    }
}

impl Default for AnalysisPipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clause::{ClauseType, Entity, WarningStage};
    use crate::ingest::ParseError;
    use crate::models::{EntityExtractor, ExtractiveSummarizer, ModelError, ModelResult};
    use std::io::Write;

    const CONTRACT: &str = "MASTER SERVICES AGREEMENT\n\n\
        1.1 Term\n\
        This Agreement commences on January 1, 2024 and continues for two years. \
        Either party may renew it by written notice to the other party.\n\n\
        1.2 Fees\n\
        The Customer shall pay $5,000.00 per month within thirty (30) days of invoice.\n\
        - 2 -\n\
        1.3 Liability\n\
        The Supplier shall indemnify the Customer against all third-party claims.";

    struct FailingExtractor;

    #[async_trait::async_trait]
    impl EntityExtractor for FailingExtractor {
        async fn extract(&self, _text: &str) -> ModelResult<Vec<Entity>> {
            Err(ModelError::Unavailable("ner".into()))
        }
    }

    struct FailingRanker;

    #[async_trait::async_trait]
    impl ExtractiveSummarizer for FailingRanker {
        async fn rank(&self, _text: &str, _k: usize) -> ModelResult<Vec<String>> {
            Err(ModelError::Failed("ranker".into()))
        }
    }

    #[tokio::test]
    async fn test_analyze_text() {
        let pipeline = AnalysisPipeline::new();
        let result = pipeline.analyze_text(CONTRACT).await.unwrap();

        assert_eq!(result.stats.clause_count, result.clauses.len());
        assert_eq!(result.stats.sections, 4);
        assert!(result.clauses.iter().enumerate().all(|(i, c)| c.index == i));
        assert!(result.clauses[1].text.starts_with("1.1 Term: "));
        assert!(result.clauses.iter().all(|c| !c.text.contains("- 2 -")));

        let liability = result.clauses.last().unwrap();
        assert!(liability.text.starts_with("1.3 Liability: "));
        assert_eq!(liability.clause_type, ClauseType::Risky);

        let fees = result
            .clauses
            .iter()
            .find(|c| c.text.starts_with("1.2 Fees: "))
            .unwrap();
        assert!(fees.entities.iter().any(|e| e.label == "AMOUNT"));
        assert_eq!(fees.clause_type, ClauseType::Important);

        assert!(result.summary.starts_with("This summary outlines the key points"));
        assert!(!result.has_warnings());
        assert_eq!(result.stats.type_counts.total(), result.clauses.len());
    }

    #[tokio::test]
    async fn test_total_model_failure_still_produces_result() {
        let models = ModelSet::default()
            .with_extractor(Arc::new(FailingExtractor))
            .with_summarizer(Arc::new(FailingRanker));
        let pipeline = AnalysisPipeline::new().with_models(Arc::new(models));

        let result = pipeline.analyze_text(CONTRACT).await.unwrap();
        assert!(!result.clauses.is_empty());
        assert!(result.clauses.iter().all(|c| c.entities.is_empty()));
        assert_eq!(result.stats.entity_failures, result.clauses.len());
        assert_eq!(result.summary, crate::ingest::summary::FALLBACK);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].stage, WarningStage::Summary);
        assert_eq!(
            result.all_warnings().count(),
            result.clauses.len() + 1
        );
    }

    #[tokio::test]
    async fn test_disabled_stages() {
        let config = AnalysisConfig {
            extract_entities: false,
            classify_clauses: false,
            summarize: false,
            ..AnalysisConfig::default()
        };
        let pipeline = AnalysisPipeline::new().with_config(config);

        let result = pipeline.analyze_text(CONTRACT).await.unwrap();
        assert!(result.clauses.iter().all(|c| c.clause_type == ClauseType::General));
        assert!(result.clauses.iter().all(|c| c.entities.is_empty()));
        assert_eq!(result.summary, "Summary not requested.");
        assert!(!result.has_warnings());
    }

    #[tokio::test]
    async fn test_no_clauses_is_segmentation_error() {
        let pipeline = AnalysisPipeline::new();
        let err = pipeline.analyze_text("1.1\n\n42\n\nPage 3 of 9").await.unwrap_err();
        assert!(matches!(err, Error::Segmentation(_)));
    }

    #[tokio::test]
    async fn test_analyze_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("contract.TXT");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(CONTRACT.as_bytes())
            .unwrap();

        let pipeline = AnalysisPipeline::new();
        let result = pipeline.analyze_file(&path).await.unwrap();
        assert_eq!(result.source.as_deref(), Some(path.as_path()));
        assert_eq!(result.format, DocumentFormat::PlainText);
        assert_eq!(result.extraction.as_deref(), Some("txt:UTF-8"));

        let clauses = pipeline.segment_file(&path).await.unwrap();
        assert_eq!(clauses.len(), result.clauses.len());
        assert!(clauses.iter().all(|c| c.clause_type == ClauseType::General));
    }

    #[tokio::test]
    async fn test_load_errors_are_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.pdf");
        let unsupported = dir.path().join("contract.rtf");
        std::fs::write(&unsupported, "{\\rtf1 hello}").unwrap();

        let pipeline = AnalysisPipeline::new();
        let err = pipeline.analyze_file(&missing).await.unwrap_err();
        assert!(matches!(err, Error::Load(ParseError::NotFound(_))));

        let err = pipeline.analyze_file(&unsupported).await.unwrap_err();
        assert!(matches!(err, Error::Load(ParseError::UnsupportedFormat(_))));
    }

    #[tokio::test]
    async fn test_failed_request_does_not_affect_next() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.txt");
        let bad = dir.path().join("bad.txt");
        std::fs::write(&good, CONTRACT).unwrap();
        std::fs::write(&bad, "   ").unwrap();

        let pipeline = AnalysisPipeline::new();
        assert!(pipeline.analyze_file(&bad).await.is_err());

        let result = pipeline.analyze_file(&good).await.unwrap();
        assert_eq!(result.source.as_deref(), Some(good.as_path()));
        assert!(result.stats.clause_count > 0);
    }
}
