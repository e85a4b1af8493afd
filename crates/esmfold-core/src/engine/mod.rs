//! # Engine Module
//!
//! Stateful plumbing between the pure data in [`crate::core`] and the outside
//! world: the prediction configuration, the description of the ESMFold
//! environment, the install plan, the inference request and the shell runner
//! that executes them.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Prediction parameters, validation and the injected environment description
//! - **Environment** ([`environment`]) - Package naming, the pinned install manifest and the install plan
//! - **Inference** ([`inference`]) - The bundled inference script and its typed arguments
//! - **Execution** ([`runner`]) - The `CommandRunner` seam and its system shell implementation
//! - **Progress Monitoring** ([`progress`]) - Callback-based progress events
//! - **Error Handling** ([`error`]) - Engine-level error taxonomy

pub mod config;
pub mod environment;
pub mod error;
pub mod inference;
pub mod progress;
pub mod runner;
