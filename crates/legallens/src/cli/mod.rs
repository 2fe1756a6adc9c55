pub mod analyze;
pub mod segment;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use legallens_core::AnalysisConfig;

#[derive(Parser)]
#[command(name = "lens", about = "Clause-level contract analysis", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Segment, enrich and summarize a contract (PDF, DOCX or TXT)
    Analyze {
        /// Contract file
        path: PathBuf,
        /// Only list clauses of this type: all, standard, important, risky
        #[arg(long, default_value = "all")]
        filter: String,
        /// Skip entity extraction
        #[arg(long = "no-entities")]
        no_entities: bool,
        /// Skip clause classification
        #[arg(long = "no-classify")]
        no_classify: bool,
        /// Skip the document summary
        #[arg(long = "no-summary")]
        no_summary: bool,
        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
        /// Write the (filtered) clause table as CSV
        #[arg(long = "csv", value_name = "OUT")]
        csv: Option<PathBuf>,
        /// Write the summary as plain text
        #[arg(long = "summary-out", value_name = "OUT")]
        summary_out: Option<PathBuf>,
        /// TOML settings file
        #[arg(long, value_name = "TOML")]
        config: Option<PathBuf>,
    },
    /// Print the normalized clause list without enrichment
    Segment {
        /// Contract file
        path: PathBuf,
        /// TOML settings file
        #[arg(long, value_name = "TOML")]
        config: Option<PathBuf>,
    },
}

/// Defaults, then the settings file, then `LEGALLENS_*` variables.
pub fn load_config(path: Option<&Path>) -> Result<AnalysisConfig> {
    let config = match path {
        Some(path) => AnalysisConfig::from_file(path)
            .with_context(|| format!("reading settings from {}", path.display()))?,
        None => AnalysisConfig::default(),
    };
    let config = config.with_env();
    config.validate()?;
    Ok(config)
}
