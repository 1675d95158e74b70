use std::process::ExitCode;

use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use exprmerge::app::{Pipeline, RunOptions};
use exprmerge::config::ConfigLoader;
use exprmerge::correct::SystemCorrectionRunner;
use exprmerge::domain::{Tool, Unit};
use exprmerge::error::MergeError;
use exprmerge::layout::Layout;
use exprmerge::quant::SystemNormalizer;
use exprmerge::translate::Translator;

#[derive(Parser)]
#[command(name = "exprmerge")]
#[command(about = "Merge per-sample expression quantifications into a batch-corrected matrix")]
#[command(version, author)]
struct Cli {
    /// Tissue cluster to process (matched by name prefix).
    cluster: String,

    #[arg(long, value_enum)]
    tool: Tool,

    #[arg(long, value_enum)]
    unit: Unit,

    /// Run the external batch-effect correction before splitting.
    #[arg(long)]
    correct: bool,

    #[arg(long, default_value = "exprmerge.json")]
    config: String,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(merge) = report.downcast_ref::<MergeError>() {
            return ExitCode::from(map_exit_code(merge));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &MergeError) -> u8 {
    match error {
        MergeError::ClusterNotFound(_)
        | MergeError::AmbiguousCluster { .. }
        | MergeError::ConfigRead(_)
        | MergeError::ConfigParse(_) => 2,
        MergeError::Normalization(_) | MergeError::Correction { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ConfigLoader::resolve(&cli.config)?;
    let cluster = ConfigLoader::select_cluster(&config, &cli.cluster)?;

    let layout = Layout::new(&config.work_dir)?;
    let translator = Translator::load(&config.translation_table)?;
    let pipeline = Pipeline::new(
        layout,
        translator,
        SystemNormalizer::new(&config.normalize_cmd),
        SystemCorrectionRunner::new(&config.correct_cmd),
        &config.correct_cmd,
    );

    let summary = pipeline.run(
        &cluster,
        RunOptions {
            tool: cli.tool,
            unit: cli.unit,
            correct: cli.correct,
        },
    )?;

    let json = serde_json::to_string_pretty(&summary).into_diagnostic()?;
    println!("{json}");
    Ok(())
}
