//! # Workflows Module
//!
//! Top-level entry points of the library. Each workflow validates its inputs,
//! reports progress and returns a typed result or an [`EngineError`](crate::engine::error::EngineError).
//!
//! - **Install** ([`install`]) - Clone ESM, build the conda environment and install the inference script
//! - **Predict** ([`predict`]) - Run inference for one sequence and annotate the prediction
//! - **Annotate** ([`annotate`]) - Turn a predicted PDB into an mmCIF file with `ESMFoldScore` attributes

pub mod annotate;
pub mod install;
pub mod predict;
