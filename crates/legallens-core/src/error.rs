use thiserror::Error;

use crate::ingest::{AnalysisState, ParseError};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Load(#[from] ParseError),

    #[error("Segmentation failed: {0}")]
    Segmentation(String),

    #[error("Invalid pipeline transition: {from} -> {to}")]
    InvalidTransition {
        from: AnalysisState,
        to: AnalysisState,
    },

    #[error("Invalid clause filter: {0}")]
    InvalidFilter(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Export failed: {0}")]
    Export(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Remediation text for blocking errors, when there is something the
    /// user can do about it.
    #[must_use]
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Load(e) => e.hint(),
            _ => None,
        }
    }
}

impl From<csv::Error> for Error {
    fn from(e: csv::Error) -> Self {
        Self::Export(e.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Self::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
