use super::atom::Atom;
use super::chain::Chain;
use super::ids::{AtomId, ChainId, ResidueId};
use super::residue::Residue;
use slotmap::SlotMap;
use std::collections::HashMap;

/// Residue lookup key: chain, residue number and insertion code.
type ResidueLookupKey = (ChainId, isize, Option<char>);

/// A parsed atomic structure: chains of residues of atoms.
///
/// Storage follows a slot-map layout so atoms, residues and chains can refer
/// to each other through stable ids. Chains keep the order in which they were
/// first added and each chain keeps its residues in file order, which is the
/// order every writer and the score extraction walk.
#[derive(Debug, Clone, Default)]
pub struct Structure {
    /// Primary storage for atoms.
    atoms: SlotMap<AtomId, Atom>,
    /// Primary storage for residues.
    residues: SlotMap<ResidueId, Residue>,
    /// Primary storage for chains.
    chains: SlotMap<ChainId, Chain>,
    /// Chains in first-seen order.
    chain_order: Vec<ChainId>,
    /// Lookup map for finding residues by chain, number and insertion code.
    residue_id_map: HashMap<ResidueLookupKey, ResidueId>,
    /// Lookup map for finding chains by their single-character identifier.
    chain_id_map: HashMap<char, ChainId>,
}

impl Structure {
    /// Creates a new, empty structure.
    pub fn new() -> Self {
        Self::default()
    }

    /// Retrieves an atom by its ID.
    pub fn atom(&self, id: AtomId) -> Option<&Atom> {
        self.atoms.get(id)
    }

    /// Retrieves a mutable reference to an atom by its ID.
    pub fn atom_mut(&mut self, id: AtomId) -> Option<&mut Atom> {
        self.atoms.get_mut(id)
    }

    /// Returns an iterator over all atoms in storage order.
    pub fn atoms_iter(&self) -> impl Iterator<Item = (AtomId, &Atom)> {
        self.atoms.iter()
    }

    /// Retrieves a residue by its ID.
    pub fn residue(&self, id: ResidueId) -> Option<&Residue> {
        self.residues.get(id)
    }

    /// Retrieves a chain by its ID.
    pub fn chain(&self, id: ChainId) -> Option<&Chain> {
        self.chains.get(id)
    }

    /// Returns an iterator over all chains in first-seen order.
    pub fn chains_iter(&self) -> impl Iterator<Item = (ChainId, &Chain)> {
        self.chain_order
            .iter()
            .filter_map(|&id| self.chains.get(id).map(|chain| (id, chain)))
    }

    /// Walks every residue in chain order, then file order within the chain.
    ///
    /// # Return
    ///
    /// An iterator yielding `(&Chain, ResidueId, &Residue)` triples.
    pub fn residues_in_order(&self) -> impl Iterator<Item = (&Chain, ResidueId, &Residue)> {
        self.chains_iter().flat_map(move |(_, chain)| {
            chain.residues().iter().filter_map(move |&residue_id| {
                self.residues
                    .get(residue_id)
                    .map(|residue| (chain, residue_id, residue))
            })
        })
    }

    /// Walks every atom in chain, residue and then file order.
    pub fn atoms_in_order(&self) -> impl Iterator<Item = (&Chain, &Residue, &Atom)> {
        self.residues_in_order()
            .flat_map(move |(chain, _, residue)| {
                residue
                    .atoms()
                    .iter()
                    .filter_map(move |&atom_id| {
                        self.atoms.get(atom_id).map(|atom| (chain, residue, atom))
                    })
            })
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn residue_count(&self) -> usize {
        self.residues.len()
    }

    pub fn chain_count(&self) -> usize {
        self.chain_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// Finds a chain ID by its single-character identifier.
    pub fn find_chain_by_id(&self, id: char) -> Option<ChainId> {
        self.chain_id_map.get(&id).copied()
    }

    /// Finds a residue ID by chain, residue number and insertion code.
    pub fn find_residue(
        &self,
        chain_id: ChainId,
        residue_number: isize,
        insertion_code: Option<char>,
    ) -> Option<ResidueId> {
        self.residue_id_map
            .get(&(chain_id, residue_number, insertion_code))
            .copied()
    }

    /// Adds a new chain or returns the existing one with the same identifier.
    pub fn add_chain(&mut self, id: char) -> ChainId {
        if let Some(&existing) = self.chain_id_map.get(&id) {
            return existing;
        }
        let chain_id = self.chains.insert(Chain::new(id));
        self.chain_id_map.insert(id, chain_id);
        self.chain_order.push(chain_id);
        chain_id
    }

    /// Adds a new residue to a chain or returns the existing one.
    ///
    /// A residue is identified by its chain, number and insertion code; adding
    /// the same triple twice returns the first residue.
    ///
    /// # Return
    ///
    /// Returns `None` if the chain does not exist.
    pub fn add_residue(
        &mut self,
        chain_id: ChainId,
        residue_number: isize,
        insertion_code: Option<char>,
        name: &str,
    ) -> Option<ResidueId> {
        let chain = self.chains.get_mut(chain_id)?;
        let key = (chain_id, residue_number, insertion_code);

        if let Some(&existing) = self.residue_id_map.get(&key) {
            return Some(existing);
        }

        let residue_id = self.residues.insert(Residue::new(
            residue_number,
            insertion_code,
            name,
            chain_id,
        ));
        self.residue_id_map.insert(key, residue_id);
        chain.residues.push(residue_id);
        Some(residue_id)
    }

    /// Appends a residue to a chain even when its key is already taken.
    ///
    /// Lookups by key keep resolving to the first residue with that key.
    ///
    /// # Return
    ///
    /// Returns `None` if the chain does not exist.
    pub(crate) fn push_residue(
        &mut self,
        chain_id: ChainId,
        residue_number: isize,
        insertion_code: Option<char>,
        name: &str,
    ) -> Option<ResidueId> {
        let chain = self.chains.get_mut(chain_id)?;
        let residue_id = self.residues.insert(Residue::new(
            residue_number,
            insertion_code,
            name,
            chain_id,
        ));
        self.residue_id_map
            .entry((chain_id, residue_number, insertion_code))
            .or_insert(residue_id);
        chain.residues.push(residue_id);
        Some(residue_id)
    }

    /// Adds an atom to a residue.
    ///
    /// # Return
    ///
    /// Returns `None` if the residue does not exist.
    pub fn add_atom_to_residue(&mut self, residue_id: ResidueId, mut atom: Atom) -> Option<AtomId> {
        if !self.residues.contains_key(residue_id) {
            return None;
        }
        atom.residue_id = residue_id;
        let name = atom.name.clone();
        let atom_id = self.atoms.insert(atom);
        self.residues.get_mut(residue_id)?.add_atom(&name, atom_id);
        Some(atom_id)
    }

    /// Returns the one-letter sequence of a chain.
    pub fn sequence(&self, chain_id: ChainId) -> Option<String> {
        let chain = self.chains.get(chain_id)?;
        Some(
            chain
                .residues()
                .iter()
                .filter_map(|&id| self.residues.get(id))
                .map(Residue::one_letter_code)
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    fn atom(name: &str, b_factor: f64) -> Atom {
        let mut atom = Atom::new(name, ResidueId::default(), Point3::origin());
        atom.b_factor = b_factor;
        atom
    }

    fn two_chain_structure() -> Structure {
        let mut structure = Structure::new();
        let chain_b = structure.add_chain('B');
        let chain_a = structure.add_chain('A');

        let b1 = structure.add_residue(chain_b, 1, None, "MET").unwrap();
        structure.add_atom_to_residue(b1, atom("N", 90.0)).unwrap();
        structure.add_atom_to_residue(b1, atom("CA", 90.0)).unwrap();

        let a7 = structure.add_residue(chain_a, 7, None, "GLY").unwrap();
        structure.add_atom_to_residue(a7, atom("CA", 50.0)).unwrap();
        let a5 = structure.add_residue(chain_a, 5, None, "TRP").unwrap();
        structure.add_atom_to_residue(a5, atom("CA", 40.0)).unwrap();
        structure
    }

    #[test]
    fn structure_creation_and_access() {
        let structure = two_chain_structure();
        assert_eq!(structure.chain_count(), 2);
        assert_eq!(structure.residue_count(), 3);
        assert_eq!(structure.atom_count(), 4);
        assert!(!structure.is_empty());

        let chain_a = structure.find_chain_by_id('A').unwrap();
        let residue_id = structure.find_residue(chain_a, 7, None).unwrap();
        assert_eq!(structure.residue(residue_id).unwrap().name, "GLY");
        assert!(structure.find_residue(chain_a, 7, Some('A')).is_none());
    }

    #[test]
    fn residues_in_order_follows_chain_then_file_order() {
        let structure = two_chain_structure();
        let order: Vec<(char, isize)> = structure
            .residues_in_order()
            .map(|(chain, _, residue)| (chain.id, residue.number))
            .collect();
        assert_eq!(order, vec![('B', 1), ('A', 7), ('A', 5)]);
    }

    #[test]
    fn atoms_in_order_visits_every_atom_once() {
        let structure = two_chain_structure();
        let names: Vec<&str> = structure
            .atoms_in_order()
            .map(|(_, _, atom)| atom.name.as_str())
            .collect();
        assert_eq!(names, vec!["N", "CA", "CA", "CA"]);
    }

    #[test]
    fn add_chain_and_residue_are_idempotent() {
        let mut structure = Structure::new();
        let first = structure.add_chain('A');
        let second = structure.add_chain('A');
        assert_eq!(first, second);

        let r1 = structure.add_residue(first, 1, None, "ALA").unwrap();
        let r2 = structure.add_residue(first, 1, None, "ALA").unwrap();
        assert_eq!(r1, r2);
        assert_eq!(structure.chain(first).unwrap().len(), 1);
    }

    #[test]
    fn insertion_codes_create_distinct_residues() {
        let mut structure = Structure::new();
        let chain = structure.add_chain('A');
        let plain = structure.add_residue(chain, 52, None, "ALA").unwrap();
        let inserted = structure.add_residue(chain, 52, Some('A'), "GLY").unwrap();
        assert_ne!(plain, inserted);
        assert_eq!(structure.residue_count(), 2);
    }

    #[test]
    fn add_to_missing_parents_returns_none() {
        let mut structure = Structure::new();
        assert!(structure
            .add_residue(ChainId::default(), 1, None, "ALA")
            .is_none());
        assert!(structure
            .add_atom_to_residue(ResidueId::default(), atom("CA", 0.0))
            .is_none());
    }

    #[test]
    fn sequence_uses_one_letter_codes() {
        let structure = two_chain_structure();
        let chain_a = structure.find_chain_by_id('A').unwrap();
        assert_eq!(structure.sequence(chain_a).unwrap(), "GW");
    }
}
