use esmfold::core::scores::ScoreOptions;
use esmfold::engine::config::{
    DEFAULT_ANNOTATED_FILE_NAME, DEFAULT_CHUNK_SIZE, DEFAULT_CONDA_HOOK, DEFAULT_NUM_RECYCLES,
    EsmModel,
};

pub struct DefaultsConfig {
    pub model: EsmModel,
    pub gpu: u32,
    pub chunk_size: u32,
    pub num_recycles: u32,
    pub annotated_file_name: String,
    pub score: ScoreOptions,
    pub conda_hook: String,
    pub python: String,
    pub shell: String,
    pub sequence_name: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            model: EsmModel::EsmfoldV1,
            gpu: 0,
            chunk_size: DEFAULT_CHUNK_SIZE,
            num_recycles: DEFAULT_NUM_RECYCLES,
            annotated_file_name: DEFAULT_ANNOTATED_FILE_NAME.to_string(),
            score: ScoreOptions::default(),
            conda_hook: DEFAULT_CONDA_HOOK.to_string(),
            python: "python".to_string(),
            shell: "bash".to_string(),
            sequence_name: "sequence".to_string(),
        }
    }
}
