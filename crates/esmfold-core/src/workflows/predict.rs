use crate::core::models::structure::Structure;
use crate::core::scores::ScoreMap;
use crate::core::sequence::Sequence;
use crate::engine::config::{EnvironmentConfig, PredictionConfig};
use crate::engine::error::EngineError;
use crate::engine::inference::InferenceRequest;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::runner::CommandRunner;
use crate::workflows::annotate;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

/// Result of a prediction run.
#[derive(Debug, Clone)]
pub struct StructureOutput {
    /// Raw PDB written by the inference script.
    pub pdb_path: PathBuf,
    /// mmCIF file carrying the `ESMFoldScore` attributes.
    pub cif_path: PathBuf,
    pub structure: Structure,
    pub scores: ScoreMap,
}

/// Runs the inference script for `sequence` and returns the PDB it wrote.
///
/// The output directory is created if needed and passed to the script as an
/// absolute path, since the script runs from the ESM checkout. A PDB already at
/// the expected path is removed before the script starts.
///
/// # Errors
///
/// [`EngineError::CommandFailed`] if the script exits unsuccessfully and
/// [`EngineError::MissingPrediction`] if it succeeds without writing the PDB.
#[instrument(skip_all, name = "predict_step", fields(sequence = %sequence.name()))]
pub fn predict_step(
    sequence: &Sequence,
    output_dir: &Path,
    config: &PredictionConfig,
    env: &EnvironmentConfig,
    runner: &dyn CommandRunner,
    reporter: &ProgressReporter,
) -> Result<PathBuf, EngineError> {
    config.validate()?;
    fs::create_dir_all(output_dir).map_err(|e| EngineError::io(output_dir, e))?;
    let output_dir = std::path::absolute(output_dir).map_err(|e| EngineError::io(output_dir, e))?;

    let request = InferenceRequest::new(sequence, &output_dir, config);
    reporter.report(Progress::PhaseStart { name: "Inference" });
    info!(
        residues = sequence.len(),
        model = %config.model,
        gpu = config.gpu_id,
        chunk_size = config.chunk_size,
        num_recycles = config.num_recycles,
        "Running ESMFold."
    );
    let pdb_path = request.expected_output();
    if pdb_path.exists() {
        warn!(path = %pdb_path.display(), "Removing PDB left over from an earlier run.");
        fs::remove_file(&pdb_path).map_err(|e| EngineError::io(&pdb_path, e))?;
    }

    runner.run(&request.shell_command(env))?;

    if !pdb_path.is_file() {
        return Err(EngineError::MissingPrediction { path: pdb_path });
    }
    reporter.report(Progress::PhaseFinish);
    Ok(pdb_path)
}

/// Annotates the predicted PDB and collects the final output.
#[instrument(skip_all, name = "create_output_step", fields(pdb = %pdb_path.display()))]
pub fn create_output_step(
    pdb_path: &Path,
    output_dir: &Path,
    config: &PredictionConfig,
    reporter: &ProgressReporter,
) -> Result<StructureOutput, EngineError> {
    reporter.report(Progress::PhaseStart { name: "Annotation" });
    let cif_path = output_dir.join(&config.annotated_file_name);
    let annotation = annotate::run(pdb_path, &cif_path, &config.score)?;
    reporter.report(Progress::PhaseFinish);

    Ok(StructureOutput {
        pdb_path: pdb_path.to_path_buf(),
        cif_path,
        structure: annotation.structure,
        scores: annotation.scores,
    })
}

/// Predicts the structure of `sequence` and writes the annotated result to `output_dir`.
#[instrument(skip_all, name = "prediction_workflow")]
pub fn run(
    sequence: &Sequence,
    output_dir: &Path,
    config: &PredictionConfig,
    env: &EnvironmentConfig,
    runner: &dyn CommandRunner,
    reporter: &ProgressReporter,
) -> Result<StructureOutput, EngineError> {
    let pdb_path = predict_step(sequence, output_dir, config, env, runner, reporter)?;
    let output = create_output_step(&pdb_path, output_dir, config, reporter)?;

    let predicted: String = output
        .structure
        .chains_iter()
        .filter_map(|(chain_id, _)| output.structure.sequence(chain_id))
        .collect();
    debug!(sequence = %predicted, "Predicted residues.");
    if predicted.len() != sequence.len() {
        warn!(
            expected = sequence.len(),
            predicted = predicted.len(),
            "Predicted residue count differs from the input sequence."
        );
    }
    info!(
        residues = output.scores.len(),
        "Prediction written to {}.",
        output.cif_path.display()
    );
    Ok(output)
}
