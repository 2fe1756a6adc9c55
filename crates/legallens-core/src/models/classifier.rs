use super::{Classifier, ModelError, ModelResult};

const RISKY_TERMS: &[&str] = &[
    "indemnif",
    "liabilit",
    "liable",
    "terminat",
    "penalt",
    "damages",
    "breach",
    "waive",
    "exclusiv",
    "non-compet",
    "forfeit",
    "liquidated",
];

const IMPORTANT_TERMS: &[&str] = &[
    "shall",
    "must",
    "confidential",
    "payment",
    "governed",
    "renew",
    "audit",
    "notice",
    "warrant",
    "intellectual property",
];

/// Keyword-stem classifier. Risk vocabulary wins over obligation
/// vocabulary; anything else is `Standard`.
pub struct LexiconClassifier {
    risky: Vec<String>,
    important: Vec<String>,
}

impl LexiconClassifier {
    #[must_use]
    pub fn new() -> Self {
        Self {
            risky: RISKY_TERMS.iter().map(|t| (*t).to_string()).collect(),
            important: IMPORTANT_TERMS.iter().map(|t| (*t).to_string()).collect(),
        }
    }

    #[must_use]
    pub fn with_risky_term(mut self, term: impl Into<String>) -> Self {
        self.risky.push(term.into().to_lowercase());
        self
    }

    #[must_use]
    pub fn with_important_term(mut self, term: impl Into<String>) -> Self {
        self.important.push(term.into().to_lowercase());
        self
    }

    fn label_for(&self, lowered: &str) -> &'static str {
        if self.risky.iter().any(|t| lowered.contains(t.as_str())) {
            "Risky"
        } else if self.important.iter().any(|t| lowered.contains(t.as_str())) {
            "Important"
        } else {
            "Standard"
        }
    }
}

impl Default for LexiconClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Classifier for LexiconClassifier {
    async fn classify(&self, text: &str) -> ModelResult<String> {
        if text.trim().is_empty() {
            return Err(ModelError::EmptyInput);
        }
        Ok(self.label_for(&text.to_lowercase()).to_string())
    }
}
