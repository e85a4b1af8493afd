use crate::error::{CliError, Result};
use esmfold::core::scores::ScoreMap;
use std::path::Path;

pub mod annotate;
pub mod env;
pub mod install;
pub mod predict;
pub mod scores;

fn write_scores_csv(scores: &ScoreMap, path: &Path) -> Result<()> {
    scores
        .write_csv_path(path)
        .map_err(|e| CliError::FileWriting {
            path: path.to_path_buf(),
            source: e.into(),
        })
}
