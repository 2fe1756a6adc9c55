use serde::{Deserialize, Serialize};

/// Risk classification of a clause. The set is closed: model labels that do
/// not map onto one of the first three variants become `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ClauseType {
    Standard,
    Important,
    Risky,
    Unknown,
    /// Not classified, either because the stage was skipped or it failed.
    #[default]
    General,
}

impl ClauseType {
    pub const ALL: [Self; 5] = [
        Self::Standard,
        Self::Important,
        Self::Risky,
        Self::Unknown,
        Self::General,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "Standard",
            Self::Important => "Important",
            Self::Risky => "Risky",
            Self::Unknown => "Unknown",
            Self::General => "General",
        }
    }

    /// Maps a classifier label onto the closed set.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "standard" => Self::Standard,
            "important" => Self::Important,
            "risky" => Self::Risky,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for ClauseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entity {
    pub text: String,
    pub label: String,
}

impl Entity {
    #[must_use]
    pub fn new(text: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningStage {
    Entities,
    Classification,
    Summary,
}

impl WarningStage {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Entities => "entity extraction",
            Self::Classification => "classification",
            Self::Summary => "summary",
        }
    }
}

/// A recoverable failure recorded next to the unit of work it affected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub stage: WarningStage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clause: Option<usize>,
    pub message: String,
}

impl Warning {
    #[must_use]
    pub fn new(stage: WarningStage, message: impl Into<String>) -> Self {
        Self {
            stage,
            clause: None,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn for_clause(mut self, index: usize) -> Self {
        self.clause = Some(index);
        self
    }
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.clause {
            Some(index) => write!(
                f,
                "{} failed for clause {}: {}",
                self.stage.as_str(),
                index + 1,
                self.message
            ),
            None => write!(f, "{} failed: {}", self.stage.as_str(), self.message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clause {
    /// Position in document order.
    pub index: usize,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(rename = "type")]
    pub clause_type: ClauseType,
    pub entities: Vec<Entity>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
}

impl Clause {
    #[must_use]
    pub fn new(index: usize, text: String) -> Self {
        Self {
            index,
            text,
            section: None,
            clause_type: ClauseType::General,
            entities: Vec::new(),
            warnings: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_section(mut self, section: Option<String>) -> Self {
        self.section = section;
        self
    }

    #[must_use]
    pub fn with_type(mut self, clause_type: ClauseType) -> Self {
        self.clause_type = clause_type;
        self
    }

    pub fn push_warning(&mut self, warning: Warning) {
        self.warnings.push(warning.for_clause(self.index));
    }

    /// Whitespace-flattened text cut at `max_chars`, with an ellipsis when cut.
    #[must_use]
    pub fn display_text(&self, max_chars: usize) -> String {
        let flat = crate::ingest::tidy_inline(&self.text);
        truncate_chars(&flat, max_chars)
    }
}

pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_label_is_case_insensitive() {
        assert_eq!(ClauseType::from_label("risky"), ClauseType::Risky);
        assert_eq!(ClauseType::from_label(" Important "), ClauseType::Important);
        assert_eq!(ClauseType::from_label("STANDARD"), ClauseType::Standard);
    }

    #[test]
    fn test_unrecognised_label_is_unknown() {
        assert_eq!(ClauseType::from_label("hazardous"), ClauseType::Unknown);
        assert_eq!(ClauseType::from_label(""), ClauseType::Unknown);
    }

    #[test]
    fn test_new_clause_is_general() {
        let clause = Clause::new(0, "The Supplier shall deliver the goods.".into());
        assert_eq!(clause.clause_type, ClauseType::General);
        assert!(clause.entities.is_empty());
    }

    #[test]
    fn test_warning_records_clause_index() {
        let mut clause = Clause::new(3, "text".into());
        clause.push_warning(Warning::new(WarningStage::Entities, "model offline"));
        assert_eq!(clause.warnings[0].clause, Some(3));
        assert_eq!(
            clause.warnings[0].to_string(),
            "entity extraction failed for clause 4: model offline"
        );
    }

    #[test]
    fn test_display_text_truncates() {
        let clause = Clause::new(0, "alpha   beta\ngamma".into());
        assert_eq!(clause.display_text(100), "alpha beta gamma");
        assert_eq!(clause.display_text(5), "alpha...");
    }

    #[test]
    fn test_serializes_type_field() {
        let clause = Clause::new(0, "x".into()).with_type(ClauseType::Risky);
        let json = serde_json::to_value(&clause).unwrap();
        assert_eq!(json["type"], "Risky");
        assert!(json.get("warnings").is_none());
    }
}
