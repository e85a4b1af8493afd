use super::atom::Atom;
use super::ids::{ChainId, ResidueId};
use super::structure::Structure;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("a residue was started before any chain")]
    NoCurrentChain,
    #[error("an atom was added before any residue")]
    NoCurrentResidue,
}

/// Incremental builder used by the file readers.
///
/// Readers call `start_chain`/`start_residue` whenever the chain identifier or
/// residue identity changes on a record, then `add_atom` for each atom line.
/// Every `start_residue` opens a new residue, so a residue identifier that
/// reappears later in a file is kept apart from the first one.
#[derive(Debug, Default)]
pub struct StructureBuilder {
    structure: Structure,
    current_chain: Option<ChainId>,
    current_residue: Option<ResidueId>,
}

impl StructureBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_chain(&mut self, id: char) -> &mut Self {
        self.current_chain = Some(self.structure.add_chain(id));
        self.current_residue = None;
        self
    }

    pub fn start_residue(
        &mut self,
        number: isize,
        insertion_code: Option<char>,
        name: &str,
    ) -> Result<&mut Self, BuildError> {
        let chain_id = self.current_chain.ok_or(BuildError::NoCurrentChain)?;
        if self
            .structure
            .find_residue(chain_id, number, insertion_code)
            .is_some()
        {
            warn!(
                residue = number,
                insertion_code = ?insertion_code,
                name,
                "Residue identifier appears again; keeping it as a separate residue."
            );
        }
        self.current_residue =
            self.structure
                .push_residue(chain_id, number, insertion_code, name);
        match self.current_residue {
            Some(_) => Ok(self),
            None => Err(BuildError::NoCurrentChain),
        }
    }

    pub fn add_atom(&mut self, atom: Atom) -> Result<&mut Self, BuildError> {
        let residue_id = self.current_residue.ok_or(BuildError::NoCurrentResidue)?;
        self.structure
            .add_atom_to_residue(residue_id, atom)
            .ok_or(BuildError::NoCurrentResidue)?;
        Ok(self)
    }

    pub fn is_empty(&self) -> bool {
        self.structure.is_empty()
    }

    pub fn build(self) -> Structure {
        self.structure
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    fn atom(name: &str) -> Atom {
        Atom::new(name, ResidueId::default(), Point3::origin())
    }

    #[test]
    fn builds_chains_residues_and_atoms_in_order() {
        let mut builder = StructureBuilder::new();
        builder.start_chain('A');
        builder.start_residue(1, None, "MET").unwrap();
        builder.add_atom(atom("N")).unwrap();
        builder.add_atom(atom("CA")).unwrap();
        builder.start_residue(2, None, "LYS").unwrap();
        builder.add_atom(atom("CA")).unwrap();

        let structure = builder.build();
        assert_eq!(structure.chain_count(), 1);
        assert_eq!(structure.residue_count(), 2);
        assert_eq!(structure.atom_count(), 3);
    }

    #[test]
    fn reappearing_residue_identifier_opens_a_separate_residue() {
        let mut builder = StructureBuilder::new();
        builder.start_chain('A');
        builder.start_residue(1, None, "MET").unwrap();
        builder.add_atom(atom("CA")).unwrap();
        builder.start_residue(2, None, "LYS").unwrap();
        builder.add_atom(atom("CA")).unwrap();
        builder.start_residue(1, None, "GLY").unwrap();
        builder.add_atom(atom("CA")).unwrap();

        let structure = builder.build();
        assert_eq!(structure.residue_count(), 3);
        let names: Vec<&str> = structure
            .residues_in_order()
            .map(|(_, _, residue)| residue.name.as_str())
            .collect();
        assert_eq!(names, vec!["MET", "LYS", "GLY"]);
        assert!(
            structure
                .residues_in_order()
                .all(|(_, _, residue)| residue.atoms().len() == 1)
        );

        let chain_id = structure.find_chain_by_id('A').unwrap();
        let first = structure.find_residue(chain_id, 1, None).unwrap();
        assert_eq!(structure.residue(first).unwrap().name, "MET");
    }

    #[test]
    fn residue_without_chain_is_rejected() {
        let mut builder = StructureBuilder::new();
        let err = builder.start_residue(1, None, "ALA").unwrap_err();
        assert_eq!(err, BuildError::NoCurrentChain);
    }

    #[test]
    fn atom_without_residue_is_rejected() {
        let mut builder = StructureBuilder::new();
        builder.start_chain('A');
        let err = builder.add_atom(atom("CA")).unwrap_err();
        assert_eq!(err, BuildError::NoCurrentResidue);
    }

    #[test]
    fn restarting_a_chain_resets_the_current_residue() {
        let mut builder = StructureBuilder::new();
        builder.start_chain('A');
        builder.start_residue(1, None, "ALA").unwrap();
        builder.start_chain('B');
        assert!(builder.add_atom(atom("CA")).is_err());
    }
}
