//! # ESMFold Runner Core Library
//!
//! Installs the ESMFold structure predictor into a conda environment, runs it
//! on amino-acid sequences and turns its PDB output into an mmCIF file whose
//! residues carry the model's per-residue confidence as `ESMFoldScore`.
//!
//! ## Architecture
//!
//! - **[`core`]: Data.** Structure models, PDB and mmCIF I/O, sequences and score maps.
//!   Nothing here touches processes or global state.
//!
//! - **[`engine`]: Plumbing.** Prediction configuration, the injected environment
//!   description, the pinned install plan, the inference request and the
//!   [`CommandRunner`](engine::runner::CommandRunner) that executes shell commands.
//!
//! - **[`workflows`]: The Public API.** `install`, `predict` and `annotate`, each a
//!   single call that ties the layers together.

pub mod core;
pub mod engine;
pub mod workflows;
