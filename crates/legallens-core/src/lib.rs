pub mod analysis;
pub mod clause;
pub mod config;
pub mod error;
pub mod ingest;
pub mod models;

pub use analysis::{AnalysisResult, AnalysisStats, TypeCounts, TypeFilter};
pub use clause::{Clause, ClauseType, Entity, Warning, WarningStage};
pub use config::AnalysisConfig;
pub use error::{Error, Result};
pub use ingest::{AnalysisPipeline, AnalysisState, DocumentFormat, ParseError};
pub use models::{ModelError, ModelSet};
