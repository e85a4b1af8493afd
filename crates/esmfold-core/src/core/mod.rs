//! # Core Module
//!
//! Stateless building blocks shared by the engine and the workflows.
//!
//! ## Architecture
//!
//! - **Structure Representation** ([`models`]) - Atoms, residues, chains and structures
//! - **File I/O** ([`io`]) - PDB and mmCIF readers and writers
//! - **Input Sequences** ([`sequence`]) - Amino-acid sequences and FASTA parsing
//! - **Confidence Scores** ([`scores`]) - Per-residue score extraction, annotation and export

pub mod io;
pub mod models;
pub mod scores;
pub mod sequence;
