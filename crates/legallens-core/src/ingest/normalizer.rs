use regex::Regex;
use std::sync::LazyLock;

pub const REDACTED: &str = "[REDACTED]";

const MAX_PASSES: usize = 32;

struct Rule {
    pattern: Regex,
    replacement: &'static str,
}

impl Rule {
    fn new(pattern: &str, replacement: &'static str) -> Self {
        Self {
            pattern: Regex::new(pattern).expect("valid normalizer pattern"),
            replacement,
        }
    }

    fn apply(&self, text: &str) -> String {
        self.pattern.replace_all(text, self.replacement).into_owned()
    }
}

static DOCUMENT_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        Rule::new(r"\r\n?", "\n"),
        // markup
        Rule::new(r"(?i)</?[a-z][^>]*>", ""),
        // confidentiality boilerplate
        Rule::new(r"(?i)\*?confidential treatment (?:has been )?requested\*?", ""),
        Rule::new(r"\b[A-Z][A-Za-z]*[ \t]+Confidential\b", ""),
        // redaction placeholders
        Rule::new(r"\[[ \t]*(?:\*+|REDACTED)[ \t]*\]", REDACTED),
        Rule::new(r"\[REDACTED\](?:[ \t]*\[REDACTED\])+", REDACTED),
        // page artifacts
        Rule::new(r"\x0c", "\n"),
        Rule::new(r"\n[ \t]*-[ \t]*\d+[ \t]*-[ \t]*\n?", "\n"),
        Rule::new(r"(?im)^[ \t]*page[ \t]+\d+(?:[ \t]+of[ \t]+\d+)?[ \t]*$", ""),
        // whitespace
        Rule::new(r"[ \t]{2,}", " "),
        Rule::new(r"[ \t]+\n", "\n"),
        Rule::new(r"\n{3,}", "\n\n"),
    ]
});

static INLINE_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        Rule::new(r"\[\s*(?:\*+|REDACTED)\s*\]", REDACTED),
        Rule::new(r"\[REDACTED\](?:\s*\[REDACTED\])+", REDACTED),
        Rule::new(r"\s+", " "),
    ]
});

static SUMMARY_MARKERS: LazyLock<Rule> =
    LazyLock::new(|| Rule::new(r"(?i)\b(?:confidential|proprietary)\b\s*", ""));

fn run_to_fixpoint(text: &str, rules: &[Rule]) -> String {
    let mut current = text.trim().to_string();

    for _ in 0..MAX_PASSES {
        let mut next = current.clone();
        for rule in rules {
            next = rule.apply(&next);
        }
        let next = next.trim().to_string();

        if next == current {
            return current;
        }
        current = next;
    }

    tracing::warn!("Normalization did not settle after {} passes", MAX_PASSES);
    current
}

/// Cleans raw extracted text while keeping line structure for section
/// detection. The rule set is re-applied until the text stops changing, so
/// the result is idempotent even when one rule exposes a match for another.
pub fn normalize(text: &str) -> String {
    run_to_fixpoint(text, &DOCUMENT_RULES)
}

/// Flat single-line form used for clause display text.
pub fn tidy_inline(text: &str) -> String {
    run_to_fixpoint(text, &INLINE_RULES)
}

/// Flat form for generated summaries: markers removed and terminal
/// punctuation guaranteed.
pub fn scrub_summary(text: &str) -> String {
    let without_markers = SUMMARY_MARKERS.apply(text);
    let mut cleaned = tidy_inline(&without_markers);

    if !cleaned.is_empty() && !cleaned.ends_with(['.', '!', '?']) {
        cleaned.push('.');
    }
    cleaned
}
