use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::clause::{Clause, ClauseType, Warning};
use crate::ingest::{ClauseRules, DocumentFormat};

/// Longest clause text written to a CSV cell.
pub const CSV_CLAUSE_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TypeFilter {
    #[default]
    All,
    Standard,
    Important,
    Risky,
}

impl TypeFilter {
    pub const ALL: [Self; 4] = [Self::All, Self::Standard, Self::Important, Self::Risky];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "All",
            Self::Standard => "Standard",
            Self::Important => "Important",
            Self::Risky => "Risky",
        }
    }

    #[must_use]
    pub fn matches(&self, clause_type: ClauseType) -> bool {
        match self {
            Self::All => true,
            Self::Standard => clause_type == ClauseType::Standard,
            Self::Important => clause_type == ClauseType::Important,
            Self::Risky => clause_type == ClauseType::Risky,
        }
    }
}

impl FromStr for TypeFilter {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| crate::Error::InvalidFilter(s.to_string()))
    }
}

impl std::fmt::Display for TypeFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeCounts {
    pub standard: usize,
    pub important: usize,
    pub risky: usize,
    pub unknown: usize,
    pub general: usize,
}

impl TypeCounts {
    pub fn from_clauses<'a>(clauses: impl IntoIterator<Item = &'a Clause>) -> Self {
        let mut counts = Self::default();
        for clause in clauses {
            *counts.slot(clause.clause_type) += 1;
        }
        counts
    }

    fn slot(&mut self, clause_type: ClauseType) -> &mut usize {
        match clause_type {
            ClauseType::Standard => &mut self.standard,
            ClauseType::Important => &mut self.important,
            ClauseType::Risky => &mut self.risky,
            ClauseType::Unknown => &mut self.unknown,
            ClauseType::General => &mut self.general,
        }
    }

    #[must_use]
    pub fn get(&self, clause_type: ClauseType) -> usize {
        match clause_type {
            ClauseType::Standard => self.standard,
            ClauseType::Important => self.important,
            ClauseType::Risky => self.risky,
            ClauseType::Unknown => self.unknown,
            ClauseType::General => self.general,
        }
    }

    pub fn total(&self) -> usize {
        ClauseType::ALL.iter().map(|t| self.get(*t)).sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisStats {
    pub clause_count: usize,
    pub sections: usize,
    pub merged_fragments: usize,
    pub entity_failures: usize,
    pub classification_failures: usize,
    pub type_counts: TypeCounts,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub source: Option<PathBuf>,
    pub format: DocumentFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction: Option<String>,
    pub clauses: Vec<Clause>,
    pub summary: String,
    /// Document-level warnings. Clause-level ones stay on their clause.
    pub warnings: Vec<Warning>,
    pub stats: AnalysisStats,
}

impl AnalysisResult {
    /// Clauses of the requested type, in document order.
    pub fn filter(&self, filter: TypeFilter) -> Vec<&Clause> {
        self.clauses
            .iter()
            .filter(|c| filter.matches(c.clause_type))
            .collect()
    }

    pub fn type_counts(&self) -> TypeCounts {
        TypeCounts::from_clauses(&self.clauses)
    }

    /// Clauses long enough to be worth showing in a list view.
    pub fn displayable(&self, rules: &ClauseRules) -> Vec<&Clause> {
        self.clauses
            .iter()
            .filter(|c| rules.is_displayable(&c.text))
            .collect()
    }

    /// Every warning raised during the run: clause warnings in clause order,
    /// then document-level ones.
    pub fn all_warnings(&self) -> impl Iterator<Item = &Warning> {
        self.clauses
            .iter()
            .flat_map(|c| c.warnings.iter())
            .chain(self.warnings.iter())
    }

    pub fn has_warnings(&self) -> bool {
        self.all_warnings().next().is_some()
    }

    pub fn write_csv<W: Write>(&self, filter: TypeFilter, writer: W) -> crate::Result<()> {
        let mut csv = csv::Writer::from_writer(writer);
        csv.write_record(["Clause", "Type", "Entities"])?;

        for clause in self.filter(filter) {
            let entities = clause
                .entities
                .iter()
                .map(|e| e.text.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            csv.write_record([
                clause.display_text(CSV_CLAUSE_CHARS).as_str(),
                clause.clause_type.as_str(),
                entities.as_str(),
            ])?;
        }

        csv.flush()?;
        Ok(())
    }

    pub fn save_csv(&self, filter: TypeFilter, path: &Path) -> crate::Result<()> {
        let file = std::fs::File::create(path)?;
        self.write_csv(filter, std::io::BufWriter::new(file))?;
        tracing::info!("Wrote clause table to {}", path.display());
        Ok(())
    }

    /// Plain-text summary export.
    pub fn summary_text(&self) -> String {
        let mut text = String::new();
        if let Some(source) = &self.source {
            text.push_str(&format!("Summary of {}\n\n", source.display()));
        }
        text.push_str(&self.summary);
        text.push('\n');
        text
    }

    pub fn save_summary(&self, path: &Path) -> crate::Result<()> {
        std::fs::write(path, self.summary_text())?;
        tracing::info!("Wrote summary to {}", path.display());
        Ok(())
    }

    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clause::{Entity, WarningStage};

    fn result_with(types: &[ClauseType]) -> AnalysisResult {
        let clauses = types
            .iter()
            .enumerate()
            .map(|(i, t)| {
                Clause::new(i, format!("Clause {i} requires the parties to act in good faith."))
                    .with_type(*t)
            })
            .collect::<Vec<_>>();

        AnalysisResult {
            source: Some(PathBuf::from("contract.txt")),
            format: DocumentFormat::PlainText,
            page_count: None,
            extraction: None,
            stats: AnalysisStats {
                clause_count: clauses.len(),
                type_counts: TypeCounts::from_clauses(&clauses),
                ..AnalysisStats::default()
            },
            clauses,
            summary: "This summary outlines the key points of the document: Be fair.".into(),
            warnings: Vec::new(),
        }
    }

    #[test]
    fn test_filter_parsing() {
        assert_eq!("risky".parse::<TypeFilter>().unwrap(), TypeFilter::Risky);
        assert_eq!(" ALL ".parse::<TypeFilter>().unwrap(), TypeFilter::All);
        assert!(matches!(
            "hazardous".parse::<TypeFilter>(),
            Err(crate::Error::InvalidFilter(_))
        ));
    }

    #[test]
    fn test_all_standard_filtered_by_risky_is_empty() {
        let result = result_with(&[ClauseType::Standard; 4]);
        assert!(result.filter(TypeFilter::Risky).is_empty());

        let all: Vec<&Clause> = result.filter(TypeFilter::All);
        let expected: Vec<&Clause> = result.clauses.iter().collect();
        assert_eq!(all, expected);
    }

    #[test]
    fn test_filter_keeps_document_order() {
        let result = result_with(&[
            ClauseType::Risky,
            ClauseType::Standard,
            ClauseType::Risky,
            ClauseType::General,
        ]);
        let indices: Vec<usize> = result.filter(TypeFilter::Risky).iter().map(|c| c.index).collect();
        assert_eq!(indices, vec![0, 2]);
    }

    #[test]
    fn test_type_counts() {
        let result = result_with(&[
            ClauseType::Risky,
            ClauseType::Unknown,
            ClauseType::Risky,
            ClauseType::General,
        ]);
        let counts = result.type_counts();
        assert_eq!(counts.get(ClauseType::Risky), 2);
        assert_eq!(counts.unknown, 1);
        assert_eq!(counts.general, 1);
        assert_eq!(counts.standard, 0);
        assert_eq!(counts.total(), 4);
    }

    #[test]
    fn test_displayable_hides_short_clauses() {
        let mut result = result_with(&[ClauseType::Standard; 2]);
        result.clauses[1].text = "Fees apply to all orders.".into();

        let shown = result.displayable(&ClauseRules::default());
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].index, 0);
    }

    #[test]
    fn test_csv_export() {
        let mut result = result_with(&[ClauseType::Risky, ClauseType::Standard]);
        result.clauses[0].entities = vec![
            Entity::new("Licensee", "PARTY"),
            Entity::new("thirty (30) days", "TERM"),
        ];
        result.clauses[0].text = "word ".repeat(60);

        let mut out = Vec::new();
        result.write_csv(TypeFilter::Risky, &mut out).unwrap();

        let mut reader = csv::Reader::from_reader(out.as_slice());
        let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(headers, vec!["Clause", "Type", "Entities"]);

        let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][0].chars().count(), CSV_CLAUSE_CHARS + 3);
        assert!(rows[0][0].ends_with("..."));
        assert_eq!(&rows[0][1], "Risky");
        assert_eq!(&rows[0][2], "Licensee, thirty (30) days");
    }

    #[test]
    fn test_warnings_and_json() {
        let mut result = result_with(&[ClauseType::General]);
        result.clauses[0].push_warning(Warning::new(WarningStage::Classification, "offline"));
        result
            .warnings
            .push(Warning::new(WarningStage::Summary, "ranker offline"));

        let stages: Vec<WarningStage> = result.all_warnings().map(|w| w.stage).collect();
        assert_eq!(stages, vec![WarningStage::Classification, WarningStage::Summary]);

        let json: serde_json::Value = serde_json::from_str(&result.to_json().unwrap()).unwrap();
        assert_eq!(json["clauses"][0]["type"], "General");
        assert_eq!(json["warnings"][0]["stage"], "summary");
        assert_eq!(json["format"], "plain_text");
    }

    #[test]
    fn test_summary_text() {
        let result = result_with(&[]);
        assert_eq!(
            result.summary_text(),
            "Summary of contract.txt\n\nThis summary outlines the key points of the document: Be fair.\n"
        );
    }
}
