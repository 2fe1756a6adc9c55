use std::sync::Arc;
use std::time::Duration;

use super::enrich::Enriched;
use super::normalizer::scrub_summary;
use crate::clause::{Clause, Warning, WarningStage};
use crate::config::AnalysisConfig;
use crate::models::{ExtractiveSummarizer, ModelError};

pub const LEAD_IN: &str = "This summary outlines the key points of the document:";

/// Returned whenever a summary cannot be produced.
pub const FALLBACK: &str = "A summary could not be generated for this document. \
                            Review the clause list for its key points.";

pub const NOT_REQUESTED: &str = "Summary not requested.";

fn with_terminal_punctuation(sentence: &str) -> String {
    let trimmed = sentence.trim();
    if trimmed.ends_with(['.', '!', '?']) {
        trimmed.to_string()
    } else {
        format!("{trimmed}.")
    }
}

/// Document-level summary built from the ranked clause text. Never fails:
/// every error path yields [`FALLBACK`] with a warning.
pub struct Summarizer {
    ranker: Arc<dyn ExtractiveSummarizer>,
    sentences: usize,
    timeout: Duration,
    enabled: bool,
}

impl Summarizer {
    #[must_use]
    pub fn new(ranker: Arc<dyn ExtractiveSummarizer>) -> Self {
        Self::from_config(ranker, &AnalysisConfig::default())
    }

    #[must_use]
    pub fn from_config(ranker: Arc<dyn ExtractiveSummarizer>, config: &AnalysisConfig) -> Self {
        Self {
            ranker,
            sentences: config.summary_sentences.max(1),
            timeout: config.summary_timeout(),
            enabled: config.summarize,
        }
    }

    #[must_use]
    pub fn with_sentences(mut self, sentences: usize) -> Self {
        self.sentences = sentences.max(1);
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub async fn summarize(&self, clauses: &[Clause]) -> Enriched<String> {
        if !self.enabled {
            return Enriched::ok(NOT_REQUESTED.to_string());
        }

        let text = clauses
            .iter()
            .map(|c| c.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        match self.rank(&text).await {
            Ok(summary) => Enriched::ok(summary),
            Err(e) => {
                tracing::warn!("Summary generation failed, using fallback: {}", e);
                Enriched::degraded(
                    FALLBACK.to_string(),
                    Warning::new(WarningStage::Summary, e.to_string()),
                )
            }
        }
    }

    async fn rank(&self, text: &str) -> Result<String, ModelError> {
        if text.trim().is_empty() {
            return Err(ModelError::EmptyInput);
        }

        let ranked = tokio::time::timeout(self.timeout, self.ranker.rank(text, self.sentences))
            .await
            .map_err(|_| {
                ModelError::Timeout(u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX))
            })??;

        let body: Vec<String> = ranked
            .iter()
            .filter(|s| !s.trim().is_empty())
            .map(|s| with_terminal_punctuation(s))
            .collect();
        if body.is_empty() {
            return Err(ModelError::EmptyInput);
        }

        let summary = scrub_summary(&format!("{} {}", LEAD_IN, body.join(" ")));
        tracing::debug!("Summary built from {} sentences", body.len());
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ModelResult, TextRankSummarizer};

    struct FailingRanker;

    #[async_trait::async_trait]
    impl ExtractiveSummarizer for FailingRanker {
        async fn rank(&self, _text: &str, _k: usize) -> ModelResult<Vec<String>> {
            Err(ModelError::Unavailable("ranker offline".into()))
        }
    }

    struct FixedRanker(Vec<&'static str>);

    #[async_trait::async_trait]
    impl ExtractiveSummarizer for FixedRanker {
        async fn rank(&self, _text: &str, _k: usize) -> ModelResult<Vec<String>> {
            Ok(self.0.iter().map(|s| (*s).to_string()).collect())
        }
    }

    struct StuckRanker;

    #[async_trait::async_trait]
    impl ExtractiveSummarizer for StuckRanker {
        async fn rank(&self, _text: &str, _k: usize) -> ModelResult<Vec<String>> {
            std::future::pending().await
        }
    }

    fn clause(index: usize, text: &str) -> Clause {
        Clause::new(index, text.to_string())
    }

    #[tokio::test]
    async fn test_stitches_ranked_sentences() {
        let summarizer = Summarizer::new(Arc::new(FixedRanker(vec![
            "The fee is due monthly",
            "Either party may terminate on notice!",
        ])));
        let result = summarizer
            .summarize(&[clause(0, "The fee is due monthly and more text.")])
            .await;

        assert!(!result.is_degraded());
        assert_eq!(
            result.value,
            "This summary outlines the key points of the document: The fee is due monthly. \
             Either party may terminate on notice!"
        );
    }

    #[tokio::test]
    async fn test_scrubs_redactions_and_markers() {
        let summarizer = Summarizer::new(Arc::new(FixedRanker(vec![
            "The Confidential price is [*] [***] per unit.",
        ])));
        let result = summarizer.summarize(&[clause(0, "placeholder text")]).await;

        assert_eq!(
            result.value,
            "This summary outlines the key points of the document: The price is [REDACTED] per unit."
        );
    }

    #[tokio::test]
    async fn test_empty_input_uses_fallback() {
        let summarizer = Summarizer::new(Arc::new(TextRankSummarizer::default()));
        let result = summarizer.summarize(&[]).await;

        assert_eq!(result.value, FALLBACK);
        assert_eq!(result.warning.unwrap().stage, WarningStage::Summary);
    }

    #[tokio::test]
    async fn test_ranker_failure_is_deterministic() {
        let summarizer = Summarizer::new(Arc::new(FailingRanker));
        let clauses = [clause(0, "The Licensee shall pay all fees when due.")];

        let first = summarizer.summarize(&clauses).await;
        let second = summarizer.summarize(&clauses).await;
        assert_eq!(first, second);
        assert_eq!(first.value, FALLBACK);
        assert!(first.warning.unwrap().message.contains("ranker offline"));
    }

    #[tokio::test]
    async fn test_blank_ranking_uses_fallback() {
        let summarizer = Summarizer::new(Arc::new(FixedRanker(vec!["  "])));
        let result = summarizer.summarize(&[clause(0, "Some clause text here.")]).await;
        assert_eq!(result.value, FALLBACK);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_uses_fallback() {
        let summarizer =
            Summarizer::new(Arc::new(StuckRanker)).with_timeout(Duration::from_millis(10));
        let result = summarizer.summarize(&[clause(0, "Some clause text here.")]).await;

        assert_eq!(result.value, FALLBACK);
        assert_eq!(
            result.warning.unwrap().message,
            "Model call timed out after 10 ms"
        );
    }

    #[tokio::test]
    async fn test_disabled() {
        let summarizer = Summarizer::new(Arc::new(FailingRanker)).with_enabled(false);
        let result = summarizer.summarize(&[clause(0, "Some clause text here.")]).await;
        assert_eq!(result, Enriched::ok(NOT_REQUESTED.to_string()));
    }

    #[tokio::test]
    async fn test_textrank_summary_contains_source_sentences() {
        let summarizer = Summarizer::new(Arc::new(TextRankSummarizer::default())).with_sentences(1);
        let clauses = [
            clause(0, "The licence fee is payable monthly by the licensee."),
            clause(1, "Notices must be sent by registered post."),
            clause(2, "The licensee pays the licence fee to the licensor."),
        ];
        let result = summarizer.summarize(&clauses).await;

        assert!(!result.is_degraded());
        assert!(result.value.starts_with(LEAD_IN));
        assert!(clauses
            .iter()
            .any(|c| result.value.ends_with(c.text.as_str())));
    }
}
