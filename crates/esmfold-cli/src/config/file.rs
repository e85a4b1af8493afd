use crate::error::{CliError, Result};
use esmfold::core::scores::{DuplicatePolicy, ScoreReduction, ScoreSource};
use esmfold::engine::config::EsmModel;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileConfig {
    pub prediction: Option<FilePredictionConfig>,
    pub scores: Option<FileScoreConfig>,
    pub environment: Option<FileEnvironmentConfig>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FilePredictionConfig {
    pub model: Option<EsmModel>,
    pub gpu: Option<u32>,
    pub chunk_size: Option<u32>,
    pub num_recycles: Option<u32>,
    pub annotated_file_name: Option<String>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileScoreConfig {
    pub source: Option<ScoreSource>,
    pub reduction: Option<ScoreReduction>,
    pub duplicates: Option<DuplicatePolicy>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileEnvironmentConfig {
    pub conda_hook: Option<String>,
    pub python: Option<String>,
    pub shell: Option<String>,
    pub script_path: Option<PathBuf>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Reading configuration file {:?}", path);
        let content = std::fs::read_to_string(path).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }
}
