use crate::core::sequence::Sequence;
use crate::engine::config::{EnvironmentConfig, EsmModel, PredictionConfig};
use crate::engine::error::EngineError;
use crate::engine::runner::{ShellCommand, shell_quote};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const SCRIPT_FILE_NAME: &str = "run_esmfold.py";

const SCRIPT_SOURCE: &str = include_str!("../../scripts/run_esmfold.py");

/// The Python entry point that loads ESMFold and writes `<output dir>/<name>.pdb`.
pub struct InferenceScript;

impl InferenceScript {
    pub fn source() -> &'static str {
        SCRIPT_SOURCE
    }

    /// Writes the script to `path`, creating parent directories.
    pub fn install(path: &Path) -> Result<(), EngineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| EngineError::io(parent, e))?;
        }
        fs::write(path, SCRIPT_SOURCE).map_err(|e| EngineError::io(path, e))?;
        debug!(path = %path.display(), "Inference script written.");
        Ok(())
    }
}

/// Arguments of one inference script invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferenceRequest {
    pub sequence: String,
    /// Output name; the script writes `<name>.pdb`.
    pub name: String,
    pub output_dir: PathBuf,
    pub model: EsmModel,
    pub gpu_id: u32,
    pub chunk_size: u32,
    pub num_recycles: u32,
}

impl InferenceRequest {
    pub fn new(sequence: &Sequence, output_dir: impl Into<PathBuf>, config: &PredictionConfig) -> Self {
        Self {
            sequence: sequence.residues().to_string(),
            name: sequence.file_stem(),
            output_dir: output_dir.into(),
            model: config.model,
            gpu_id: config.gpu_id,
            chunk_size: config.chunk_size,
            num_recycles: config.num_recycles,
        }
    }

    /// `-i <seq> -o <name> -od <dir> -m <model> -g <gpu> -cs <chunk> -nr <recycles>`.
    pub fn to_args(&self) -> Vec<String> {
        vec![
            "-i".to_string(),
            self.sequence.clone(),
            "-o".to_string(),
            self.name.clone(),
            "-od".to_string(),
            self.output_dir.display().to_string(),
            "-m".to_string(),
            self.model.as_str().to_string(),
            "-g".to_string(),
            self.gpu_id.to_string(),
            "-cs".to_string(),
            self.chunk_size.to_string(),
            "-nr".to_string(),
            self.num_recycles.to_string(),
        ]
    }

    pub fn expected_output(&self) -> PathBuf {
        self.output_dir.join(format!("{}.pdb", self.name))
    }

    /// Activates the environment and runs the script from the ESM checkout.
    pub fn shell_command(&self, env: &EnvironmentConfig) -> ShellCommand {
        let args: Vec<String> = self.to_args().iter().map(|a| shell_quote(a)).collect();
        let script = format!(
            "{} && {} {} {}",
            env.activation_command(),
            shell_quote(&env.python),
            shell_quote(&env.script_path.display().to_string()),
            args.join(" ")
        );
        ShellCommand::new(script).in_dir(env.repository_dir())
    }
}
