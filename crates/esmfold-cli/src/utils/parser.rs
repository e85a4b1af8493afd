use esmfold::core::scores::{DuplicatePolicy, ScoreReduction, ScoreSource};
use esmfold::engine::config::EsmModel;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unknown model '{0}'. Expected 'esmfold_v1'.")]
    UnknownModel(String),

    #[error("Invalid score source '{0}'. Expected 'b-factor' or 'occupancy'.")]
    InvalidScoreSource(String),

    #[error("Invalid score reduction '{0}'. Expected 'first-atom' or 'mean'.")]
    InvalidScoreReduction(String),

    #[error("Invalid duplicate policy '{0}'. Expected 'reject', 'first-wins' or 'last-wins'.")]
    InvalidDuplicatePolicy(String),
}

pub fn parse_model(value: &str) -> Result<EsmModel, ParseError> {
    value
        .parse()
        .map_err(|_| ParseError::UnknownModel(value.to_string()))
}

pub fn parse_score_source(value: &str) -> Result<ScoreSource, ParseError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "b-factor" | "bfactor" => Ok(ScoreSource::BFactor),
        "occupancy" => Ok(ScoreSource::Occupancy),
        _ => Err(ParseError::InvalidScoreSource(value.to_string())),
    }
}

pub fn parse_score_reduction(value: &str) -> Result<ScoreReduction, ParseError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "first-atom" => Ok(ScoreReduction::FirstAtom),
        "mean" => Ok(ScoreReduction::Mean),
        _ => Err(ParseError::InvalidScoreReduction(value.to_string())),
    }
}

pub fn parse_duplicate_policy(value: &str) -> Result<DuplicatePolicy, ParseError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "reject" => Ok(DuplicatePolicy::Reject),
        "first-wins" => Ok(DuplicatePolicy::FirstWins),
        "last-wins" => Ok(DuplicatePolicy::LastWins),
        _ => Err(ParseError::InvalidDuplicatePolicy(value.to_string())),
    }
}
