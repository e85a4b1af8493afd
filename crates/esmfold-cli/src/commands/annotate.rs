use crate::cli::AnnotateArgs;
use crate::error::Result;
use esmfold::{core::scores::ScoreOptions, workflows};
use tracing::info;

pub async fn run(args: AnnotateArgs) -> Result<()> {
    let defaults = ScoreOptions::default();
    let options = ScoreOptions {
        source: args.score_source.unwrap_or(defaults.source),
        reduction: args.reduction.unwrap_or(defaults.reduction),
        duplicates: args.duplicates.unwrap_or(defaults.duplicates),
    };
    info!("Annotating {:?} with {:?}", &args.input, options);

    let annotation = tokio::task::block_in_place(|| {
        workflows::annotate::run(&args.input, &args.output, &options)
    })?;

    println!("✓ Annotated structure written to: {}", args.output.display());
    if let Some(summary) = annotation.scores.summary() {
        println!("  ESMFoldScore: {}", summary);
    }

    if let Some(csv_path) = &args.scores_csv {
        super::write_scores_csv(&annotation.scores, csv_path)?;
        println!("✓ Scores written to: {}", csv_path.display());
    }
    Ok(())
}
