use crate::core::io::cif::CifError;
use crate::core::io::pdb::PdbError;
use crate::core::scores::ScoreError;
use crate::core::sequence::SequenceError;
use crate::engine::config::ConfigError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid sequence: {0}")]
    Sequence(#[from] SequenceError),

    #[error("Failed to read PDB file {}: {source}", path.display())]
    Pdb {
        path: PathBuf,
        #[source]
        source: PdbError,
    },

    #[error("Failed to process mmCIF file {}: {source}", path.display())]
    Cif {
        path: PathBuf,
        #[source]
        source: CifError,
    },

    #[error("Score annotation failed: {source}")]
    Score {
        #[from]
        source: ScoreError,
    },

    #[error("Failed to start command `{command}`: {source}")]
    CommandSpawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("Command `{command}` {}", describe_exit(.code))]
    CommandFailed { command: String, code: Option<i32> },

    #[error("Prediction output not found: {}", path.display())]
    MissingPrediction { path: PathBuf },

    #[error("Invalid install manifest: {0}")]
    Manifest(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exited with status {}", code),
        None => "was terminated by a signal".to_string(),
    }
}

impl EngineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
