use std::path::{Path, PathBuf};

use anyhow::Result;
use legallens_core::{AnalysisPipeline, AnalysisResult, ClauseType, TypeFilter};

use super::load_config;

pub struct AnalyzeArgs {
    pub path: PathBuf,
    pub filter: String,
    pub no_entities: bool,
    pub no_classify: bool,
    pub no_summary: bool,
    pub json: bool,
    pub csv: Option<PathBuf>,
    pub summary_out: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

pub async fn run(args: AnalyzeArgs) -> Result<()> {
    let filter: TypeFilter = args.filter.parse()?;

    let mut config = load_config(args.config.as_deref())?;
    if args.no_entities {
        config.extract_entities = false;
    }
    if args.no_classify {
        config.classify_clauses = false;
    }
    if args.no_summary {
        config.summarize = false;
    }
    tracing::debug!("Effective settings: {:?}", config);
    let max_chars = config.display_max_chars;
    let rules = config.rules.clone();

    let pipeline = AnalysisPipeline::from_shared(config).await;
    let result = pipeline.analyze_file(&args.path).await?;

    if args.json {
        println!("{}", result.to_json()?);
        for warning in result.all_warnings() {
            eprintln!("Warning: {warning}");
        }
    } else {
        print_report(&result, filter, &rules, max_chars);
    }

    if let Some(out) = &args.csv {
        result.save_csv(filter, out)?;
        eprintln!("Clause table written to {}", out.display());
    }
    if let Some(out) = &args.summary_out {
        result.save_summary(out)?;
        eprintln!("Summary written to {}", out.display());
    }

    Ok(())
}

fn print_report(
    result: &AnalysisResult,
    filter: TypeFilter,
    rules: &legallens_core::ingest::ClauseRules,
    max_chars: usize,
) {
    let name = result
        .source
        .as_deref()
        .and_then(Path::file_name)
        .map_or_else(|| "document".into(), |n| n.to_string_lossy().into_owned());
    println!(
        "{} ({}, {} clauses)",
        name, result.format, result.stats.clause_count
    );
    println!();

    let shown: Vec<_> = result
        .filter(filter)
        .into_iter()
        .filter(|c| rules.is_displayable(&c.text))
        .collect();
    if shown.is_empty() {
        println!("No {} clauses.", filter.as_str().to_lowercase());
    }
    for clause in shown {
        println!(
            "[{}] {:<9} {}",
            clause.index + 1,
            clause.clause_type,
            clause.display_text(max_chars)
        );
        if !clause.entities.is_empty() {
            let entities = clause
                .entities
                .iter()
                .map(|e| format!("{} ({})", e.text, e.label))
                .collect::<Vec<_>>()
                .join(", ");
            println!("    Entities: {entities}");
        }
    }

    let counts = result.type_counts();
    let distribution = ClauseType::ALL
        .iter()
        .map(|t| format!("{} {}", t, counts.get(*t)))
        .collect::<Vec<_>>()
        .join(", ");
    println!();
    println!("Types: {distribution}");
    println!();
    println!("Summary:");
    println!("{}", result.summary);

    if result.has_warnings() {
        println!();
        println!("Warnings:");
        for warning in result.all_warnings() {
            println!("  {warning}");
        }
    }
}
