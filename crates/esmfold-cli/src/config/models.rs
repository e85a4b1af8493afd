use esmfold::core::sequence::Sequence;
use esmfold::engine::config::{EnvironmentConfig, PredictionConfig};
use std::path::PathBuf;

/// Everything `predict` needs, fully merged and validated.
pub struct PredictAppConfig {
    pub sequence: Sequence,
    pub output_dir: PathBuf,
    pub prediction: PredictionConfig,
    pub environment: EnvironmentConfig,
    pub scores_csv: Option<PathBuf>,
}
