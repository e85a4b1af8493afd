use crate::cli::PredictArgs;
use crate::config::build_predict_config;
use crate::error::Result;
use crate::home::PackageHome;
use crate::utils::progress::CliProgressHandler;
use esmfold::{
    engine::{progress::ProgressReporter, runner::SystemShell},
    workflows,
};
use tracing::{info, warn};

pub async fn run(args: PredictArgs) -> Result<()> {
    let home = PackageHome::new()?;
    info!("Merging configuration from file and CLI arguments...");
    let app = build_predict_config(&args, home.path())?;

    if !app.environment.script_path.is_file() {
        warn!(
            "Inference script not found at {:?}. Run 'esmfold install' first.",
            app.environment.script_path
        );
    }

    let runner = SystemShell::new(app.environment.shell.clone());
    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!(
        "Predicting '{}' ({} residues) with {}...",
        app.sequence.name(),
        app.sequence.len(),
        app.prediction.model
    );

    let output = tokio::task::block_in_place(|| {
        workflows::predict::run(
            &app.sequence,
            &app.output_dir,
            &app.prediction,
            &app.environment,
            &runner,
            &reporter,
        )
    })?;

    println!("✓ Raw prediction written to: {}", output.pdb_path.display());
    println!("✓ Annotated structure written to: {}", output.cif_path.display());
    if let Some(summary) = output.scores.summary() {
        println!("  ESMFoldScore: {}", summary);
    }

    if let Some(csv_path) = &app.scores_csv {
        super::write_scores_csv(&output.scores, csv_path)?;
        println!("✓ Scores written to: {}", csv_path.display());
    }
    Ok(())
}
