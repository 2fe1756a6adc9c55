use std::sync::Arc;

use super::{EntityExtractor, ModelResult};
use crate::clause::Entity;

pub struct EntityPattern {
    pub label: String,
    pub regex: regex::Regex,
}

impl EntityPattern {
    /// When the pattern has a capture group, the first group is the span
    /// text; otherwise the whole match is.
    pub fn new(label: impl Into<String>, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            label: label.into(),
            regex: regex::Regex::new(pattern)?,
        })
    }
}

const DEFAULT_PATTERNS: &[(&str, &str)] = &[
    (
        "DATE",
        r"\b(?:January|February|March|April|May|June|July|August|September|October|November|December)\s+\d{1,2}(?:st|nd|rd|th)?,?\s+\d{4}\b|\b\d{1,2}/\d{1,2}/\d{2,4}\b|\b\d{4}-\d{2}-\d{2}\b",
    ),
    (
        "AMOUNT",
        r"[$€£]\s?\d[\d,]*(?:\.\d+)?(?:\s(?:million|billion|thousand))?|\b(?:USD|EUR|GBP)\s?\d[\d,]*(?:\.\d+)?|\b\d[\d,]*(?:\.\d+)?\s(?:dollars|euros|pounds)\b",
    ),
    (
        "TERM",
        r"(?i)\b(?:(?:one|two|three|four|five|six|seven|eight|nine|ten|eleven|twelve|fifteen|twenty|thirty|forty-five|sixty|ninety)(?:\s+\(\d+\))?|\d+)\s+(?:business\s+|calendar\s+)?(?:days?|weeks?|months?|years?)\b",
    ),
    (
        "GOVERNING_LAW",
        r"\b[Ll]aws?\s+of\s+(?:the\s+)?(?:(?:State|Commonwealth|Province|Republic)\s+of\s+)?[A-Z][a-zA-Z]+(?:\s+[A-Z][a-zA-Z]+)*",
    ),
    (
        "PARTY",
        r#"\(\s*(?:the\s+)?["\x{201c}]([A-Z][A-Za-z ]+?)["\x{201d}]\s*\)"#,
    ),
    (
        "PARTY",
        r"\b[Tt]he\s+(Licensor|Licensee|Company|Supplier|Customer|Client|Contractor|Consultant|Buyer|Seller|Landlord|Tenant|Lessor|Lessee|Employer|Employee|Distributor|Vendor|Purchaser)\b",
    ),
];

/// Regex-driven entity tagging. Overlapping matches keep the earliest,
/// longest span.
pub struct PatternEntityExtractor {
    patterns: Vec<EntityPattern>,
}

impl PatternEntityExtractor {
    #[must_use]
    pub fn new() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_pattern(mut self, pattern: EntityPattern) -> Self {
        self.patterns.push(pattern);
        self
    }

    #[must_use]
    pub fn with_default_patterns() -> Self {
        let mut extractor = Self::new();

        for (label, pattern) in DEFAULT_PATTERNS {
            match EntityPattern::new(*label, pattern) {
                Ok(p) => extractor.patterns.push(p),
                Err(e) => tracing::warn!("Skipping {} pattern: {}", label, e),
            }
        }

        extractor
    }

    fn find_all(&self, text: &str) -> Vec<Entity> {
        let mut spans: Vec<(usize, usize, Entity)> = Vec::new();

        for pattern in &self.patterns {
            for caps in pattern.regex.captures_iter(text) {
                let Some(span) = caps.get(1).or_else(|| caps.get(0)) else {
                    continue;
                };
                let span_text = span.as_str().trim();
                if span_text.is_empty() {
                    continue;
                }
                spans.push((
                    span.start(),
                    span.end(),
                    Entity::new(span_text, pattern.label.clone()),
                ));
            }
        }

        spans.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));

        let mut entities = Vec::with_capacity(spans.len());
        let mut covered_until = 0;
        for (start, end, entity) in spans {
            if start < covered_until {
                continue;
            }
            covered_until = end;
            entities.push(entity);
        }

        entities
    }
}

impl Default for PatternEntityExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl EntityExtractor for PatternEntityExtractor {
    async fn extract(&self, text: &str) -> ModelResult<Vec<Entity>> {
        Ok(self.find_all(text))
    }
}

/// Runs several extractors in turn and concatenates their output, dropping
/// exact duplicates.
pub struct CompositeEntityExtractor {
    extractors: Vec<Arc<dyn EntityExtractor>>,
}

impl CompositeEntityExtractor {
    #[must_use]
    pub fn new() -> Self {
        Self {
            extractors: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_extractor(mut self, extractor: Arc<dyn EntityExtractor>) -> Self {
        self.extractors.push(extractor);
        self
    }

    pub fn add_extractor(&mut self, extractor: Arc<dyn EntityExtractor>) {
        self.extractors.push(extractor);
    }
}

impl Default for CompositeEntityExtractor {
    fn default() -> Self {
        Self::new().with_extractor(Arc::new(PatternEntityExtractor::with_default_patterns()))
    }
}

#[async_trait::async_trait]
impl EntityExtractor for CompositeEntityExtractor {
    async fn extract(&self, text: &str) -> ModelResult<Vec<Entity>> {
        let mut combined: Vec<Entity> = Vec::new();

        for extractor in &self.extractors {
            for entity in extractor.extract(text).await? {
                if !combined.contains(&entity) {
                    combined.push(entity);
                }
            }
        }

        Ok(combined)
    }
}
