use serde::{Deserialize, Serialize};

/// Thresholds shared by every stage that decides whether a piece of text is a
/// usable clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClauseRules {
    /// A clause needs strictly more words than this.
    pub min_words: usize,
    /// Candidates with fewer words than this are merged with their neighbours.
    pub fragment_words: usize,
    /// Trailing characters that mark a candidate as unfinished.
    pub connectors: String,
    /// Display views hide clauses at or below this many characters.
    pub display_min_chars: usize,
    /// Display views hide clauses at or below this many words.
    pub display_min_words: usize,
}

impl Default for ClauseRules {
    fn default() -> Self {
        Self {
            min_words: 4,
            fragment_words: 8,
            connectors: ":;,".into(),
            display_min_chars: 30,
            display_min_words: 5,
        }
    }
}

impl ClauseRules {
    /// The canonical clause validity predicate.
    pub fn is_valid(&self, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }
        if word_count(text) <= self.min_words {
            return false;
        }
        // Text without a single letter is layout noise.
        text.chars().any(char::is_alphabetic)
    }

    pub fn ends_with_connector(&self, text: &str) -> bool {
        text.trim_end()
            .chars()
            .last()
            .is_some_and(|c| self.connectors.contains(c))
    }

    /// Fragments are buffered by the merge pass rather than emitted on their own.
    pub fn is_fragment(&self, text: &str) -> bool {
        self.ends_with_connector(text) || word_count(text) < self.fragment_words
    }

    pub fn is_displayable(&self, text: &str) -> bool {
        let text = text.trim();
        self.is_valid(text)
            && text.chars().count() > self.display_min_chars
            && word_count(text) > self.display_min_words
    }
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
