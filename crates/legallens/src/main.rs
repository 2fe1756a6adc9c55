mod cli;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use cli::analyze::AnalyzeArgs;
use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match dispatch(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(&e);
            ExitCode::FAILURE
        }
    }
}

async fn dispatch(command: Commands) -> Result<()> {
    match command {
        Commands::Analyze {
            path,
            filter,
            no_entities,
            no_classify,
            no_summary,
            json,
            csv,
            summary_out,
            config,
        } => {
            cli::analyze::run(AnalyzeArgs {
                path,
                filter,
                no_entities,
                no_classify,
                no_summary,
                json,
                csv,
                summary_out,
                config,
            })
            .await
        }
        Commands::Segment { path, config } => cli::segment::run(&path, config.as_deref()).await,
    }
}

/// One blocking message, plus a remediation hint when there is one.
fn report(error: &anyhow::Error) {
    eprintln!("Error: {error:#}");
    if let Some(hint) = error
        .downcast_ref::<legallens_core::Error>()
        .and_then(legallens_core::Error::hint)
    {
        eprintln!("Hint: {hint}");
    }
}
