use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::ingest::ClauseRules;

/// Settings for one analysis run. Every field has a default so partial
/// TOML files are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub rules: ClauseRules,
    /// Sentences requested from the extractive summarizer.
    pub summary_sentences: usize,
    pub extract_entities: bool,
    pub classify_clauses: bool,
    pub summarize: bool,
    pub entity_timeout_ms: u64,
    pub classify_timeout_ms: u64,
    pub summary_timeout_ms: u64,
    /// Clauses enriched at once. 1 keeps enrichment strictly sequential.
    pub concurrency: usize,
    /// Clause text longer than this is cut in display and export views.
    pub display_max_chars: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            rules: ClauseRules::default(),
            summary_sentences: 5,
            extract_entities: true,
            classify_clauses: true,
            summarize: true,
            entity_timeout_ms: 30_000,
            classify_timeout_ms: 30_000,
            summary_timeout_ms: 30_000,
            concurrency: 1,
            display_max_chars: 5000,
        }
    }
}

impl AnalysisConfig {
    /// Loads a TOML file; missing keys fall back to defaults.
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `LEGALLENS_*` environment overrides on top of `self`.
    #[must_use]
    pub fn with_env(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(n) = parse_var(&lookup, "LEGALLENS_SUMMARY_SENTENCES") {
            self.summary_sentences = n;
        }
        if let Some(n) = parse_var(&lookup, "LEGALLENS_CONCURRENCY") {
            self.concurrency = n;
        }
        if let Some(ms) = parse_var(&lookup, "LEGALLENS_MODEL_TIMEOUT_MS") {
            self.entity_timeout_ms = ms;
            self.classify_timeout_ms = ms;
            self.summary_timeout_ms = ms;
        }
        self
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.summary_sentences == 0 {
            return Err(crate::Error::Config(
                "summary_sentences must be at least 1".into(),
            ));
        }
        if self.concurrency == 0 {
            return Err(crate::Error::Config("concurrency must be at least 1".into()));
        }
        if self.rules.fragment_words <= self.rules.min_words {
            return Err(crate::Error::Config(format!(
                "rules.fragment_words ({}) must exceed rules.min_words ({})",
                self.rules.fragment_words, self.rules.min_words
            )));
        }
        Ok(())
    }

    pub fn entity_timeout(&self) -> Duration {
        Duration::from_millis(self.entity_timeout_ms)
    }

    pub fn classify_timeout(&self) -> Duration {
        Duration::from_millis(self.classify_timeout_ms)
    }

    pub fn summary_timeout(&self) -> Duration {
        Duration::from_millis(self.summary_timeout_ms)
    }
}

fn parse_var<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring unparseable {}={}", key, raw);
            None
        }
    }
}
