use std::path::Path;

use anyhow::Result;
use legallens_core::AnalysisPipeline;

use super::load_config;

pub async fn run(path: &Path, config: Option<&Path>) -> Result<()> {
    let config = load_config(config)?;
    let max_chars = config.display_max_chars;
    let pipeline = AnalysisPipeline::new().with_config(config);

    let clauses = pipeline.segment_file(path).await?;
    for clause in &clauses {
        println!("[{}] {}", clause.index + 1, clause.display_text(max_chars));
    }
    eprintln!("{} clauses", clauses.len());

    Ok(())
}
