use crate::cli::ScoresArgs;
use crate::error::Result;
use esmfold::core::scores::{DuplicatePolicy, ScoreMap};
use esmfold::workflows::annotate;
use std::io::Write;

pub async fn run(args: ScoresArgs) -> Result<()> {
    let scores = annotate::read_scores(&args.input, DuplicatePolicy::Reject)?;

    if let Some(csv_path) = &args.csv {
        super::write_scores_csv(&scores, csv_path)?;
        println!("✓ {} score(s) written to: {}", scores.len(), csv_path.display());
        return Ok(());
    }

    let stdout = std::io::stdout();
    print_table(&scores, &mut stdout.lock())?;
    Ok(())
}

fn print_table<W: Write>(scores: &ScoreMap, out: &mut W) -> Result<()> {
    writeln!(out, "{:<10} {:>8}", "Residue", "Score")?;
    for (key, value) in scores.iter() {
        writeln!(out, "{:<10} {:>8.2}", key.to_string(), value)?;
    }
    match scores.summary() {
        Some(summary) => writeln!(out, "\n{}", summary)?,
        None => writeln!(out, "\nNo ESMFoldScore rows found.")?,
    }
    Ok(())
}
