use crate::core::scores::ScoreOptions;
use crate::engine::environment::PackageSpec;
use crate::engine::inference::SCRIPT_FILE_NAME;
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::fmt;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_CHUNK_SIZE: u32 = 128;
pub const CHUNK_SIZE_RANGE: RangeInclusive<u32> = 1..=4096;
pub const DEFAULT_NUM_RECYCLES: u32 = 4;
pub const NUM_RECYCLES_RANGE: RangeInclusive<u32> = 0..=64;
pub const DEFAULT_ANNOTATED_FILE_NAME: &str = "outputStructureESMFold.cif";
pub const DEFAULT_CONDA_HOOK: &str = "eval \"$(conda shell.bash hook)\" && ";

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Invalid value for '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Unknown model '{0}'. Available models: esmfold_v1")]
    UnknownModel(String),
}

/// Pretrained ESMFold checkpoints the inference script can load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EsmModel {
    #[default]
    #[serde(rename = "esmfold_v1")]
    EsmfoldV1,
}

impl EsmModel {
    pub const ALL: [EsmModel; 1] = [EsmModel::EsmfoldV1];

    pub fn as_str(&self) -> &'static str {
        match self {
            EsmModel::EsmfoldV1 => "esmfold_v1",
        }
    }
}

impl fmt::Display for EsmModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EsmModel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|model| model.as_str() == s.trim())
            .ok_or_else(|| ConfigError::UnknownModel(s.to_string()))
    }
}

/// Parameters of one prediction run.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionConfig {
    pub model: EsmModel,
    /// CUDA device index passed to the inference script.
    pub gpu_id: u32,
    /// Axial attention chunk size; lower values trade speed for memory.
    pub chunk_size: u32,
    pub num_recycles: u32,
    pub score: ScoreOptions,
    /// File name of the annotated mmCIF inside the output directory.
    pub annotated_file_name: String,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            model: EsmModel::default(),
            gpu_id: 0,
            chunk_size: DEFAULT_CHUNK_SIZE,
            num_recycles: DEFAULT_NUM_RECYCLES,
            score: ScoreOptions::default(),
            annotated_file_name: DEFAULT_ANNOTATED_FILE_NAME.to_string(),
        }
    }
}

impl PredictionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !CHUNK_SIZE_RANGE.contains(&self.chunk_size) {
            return Err(ConfigError::InvalidParameter {
                name: "chunk_size",
                reason: format!(
                    "{} is outside {}..={}",
                    self.chunk_size,
                    CHUNK_SIZE_RANGE.start(),
                    CHUNK_SIZE_RANGE.end()
                ),
            });
        }
        if !NUM_RECYCLES_RANGE.contains(&self.num_recycles) {
            return Err(ConfigError::InvalidParameter {
                name: "num_recycles",
                reason: format!(
                    "{} is outside {}..={}",
                    self.num_recycles,
                    NUM_RECYCLES_RANGE.start(),
                    NUM_RECYCLES_RANGE.end()
                ),
            });
        }
        let file_name = self.annotated_file_name.trim();
        if file_name.is_empty() {
            return Err(ConfigError::InvalidParameter {
                name: "annotated_file_name",
                reason: "must not be empty".to_string(),
            });
        }
        if Path::new(file_name).file_name() != Some(OsStr::new(file_name)) {
            return Err(ConfigError::InvalidParameter {
                name: "annotated_file_name",
                reason: format!("'{}' must be a plain file name", file_name),
            });
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct PredictionConfigBuilder {
    model: Option<EsmModel>,
    gpu_id: Option<u32>,
    chunk_size: Option<u32>,
    num_recycles: Option<u32>,
    score: Option<ScoreOptions>,
    annotated_file_name: Option<String>,
}

impl PredictionConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn model(mut self, model: EsmModel) -> Self {
        self.model = Some(model);
        self
    }
    pub fn gpu_id(mut self, gpu_id: u32) -> Self {
        self.gpu_id = Some(gpu_id);
        self
    }
    pub fn chunk_size(mut self, chunk_size: u32) -> Self {
        self.chunk_size = Some(chunk_size);
        self
    }
    pub fn num_recycles(mut self, num_recycles: u32) -> Self {
        self.num_recycles = Some(num_recycles);
        self
    }
    pub fn score(mut self, score: ScoreOptions) -> Self {
        self.score = Some(score);
        self
    }
    pub fn annotated_file_name(mut self, name: impl Into<String>) -> Self {
        self.annotated_file_name = Some(name.into());
        self
    }

    /// Fills unset fields with defaults and validates the result.
    pub fn build(self) -> Result<PredictionConfig, ConfigError> {
        let defaults = PredictionConfig::default();
        let config = PredictionConfig {
            model: self.model.unwrap_or(defaults.model),
            gpu_id: self.gpu_id.unwrap_or(defaults.gpu_id),
            chunk_size: self.chunk_size.unwrap_or(defaults.chunk_size),
            num_recycles: self.num_recycles.unwrap_or(defaults.num_recycles),
            score: self.score.unwrap_or(defaults.score),
            annotated_file_name: self
                .annotated_file_name
                .unwrap_or(defaults.annotated_file_name),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Where the ESMFold environment lives and how to enter it.
///
/// The library never looks this up on its own; callers resolve the package
/// home and pass it in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentConfig {
    pub home: PathBuf,
    pub env_name: String,
    /// Shell prefix that makes `conda activate` available, ending in `&& `.
    pub conda_hook: String,
    pub python: String,
    pub script_path: PathBuf,
    /// Program used to run shell command lines with `-c`.
    pub shell: String,
}

impl EnvironmentConfig {
    pub fn new(home: impl Into<PathBuf>, package: &PackageSpec) -> Self {
        let home = home.into();
        Self {
            script_path: home.join("scripts").join(SCRIPT_FILE_NAME),
            home,
            env_name: package.env_name(),
            conda_hook: DEFAULT_CONDA_HOOK.to_string(),
            python: "python".to_string(),
            shell: "bash".to_string(),
        }
    }

    pub fn with_conda_hook(mut self, hook: impl Into<String>) -> Self {
        self.conda_hook = hook.into();
        self
    }

    pub fn with_python(mut self, python: impl Into<String>) -> Self {
        self.python = python.into();
        self
    }

    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    pub fn with_script_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.script_path = path.into();
        self
    }

    /// `<conda hook>conda activate <env>`.
    pub fn activation_command(&self) -> String {
        format!("{}conda activate {}", self.conda_hook, self.env_name)
    }

    /// Checkout of the ESM repository; inference runs from here.
    pub fn repository_dir(&self) -> PathBuf {
        self.home.join("esm")
    }
}
