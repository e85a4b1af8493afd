//! Provides input/output functionality for structure file formats.
//!
//! ESMFold writes its prediction as a PDB file; the annotated result is written
//! as mmCIF so that per-residue attributes can travel with the coordinates.
//! Both formats implement the [`traits::StructureFile`] interface.

pub mod cif;
pub mod pdb;
pub mod traits;
