//! # Core Models Module
//!
//! Data structures describing a predicted protein structure: atoms, residues,
//! chains and the `Structure` that owns them.
//!
//! ## Key Components
//!
//! - [`atom`] - Individual atom with coordinates, occupancy and B-factor
//! - [`residue`] - Residue identity (number, insertion code, name) and its atoms
//! - [`chain`] - Ordered residues of one chain
//! - [`structure`] - Complete structure with stable ids and lookup maps
//! - [`builder`] - Incremental construction used by the file readers
//! - [`ids`] - Unique identifier types for atoms, residues, and chains
//!
//! ## Usage
//!
//! ```ignore
//! use esmfold::core::models::{atom::Atom, structure::Structure};
//!
//! let mut structure = Structure::new();
//! let chain_id = structure.add_chain('A');
//! let residue_id = structure.add_residue(chain_id, 1, None, "MET").unwrap();
//!
//! let atom = Atom::new("CA", residue_id, Point3::new(0.0, 0.0, 0.0));
//! structure.add_atom_to_residue(residue_id, atom);
//! ```

pub mod atom;
pub mod builder;
pub mod chain;
pub mod ids;
pub mod residue;
pub mod structure;
