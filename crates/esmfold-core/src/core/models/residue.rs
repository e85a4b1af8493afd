use super::ids::{AtomId, ChainId};
use phf::phf_map;
use std::collections::HashMap;

/// Three-letter residue names mapped to their one-letter codes.
///
/// Covers the twenty standard amino acids plus the ambiguity and rare codes
/// ESMFold accepts in its input alphabet (`ASX`, `GLX`, `SEC`, `PYL`, `UNK`).
static ONE_LETTER_CODES: phf::Map<&'static str, char> = phf_map! {
    "ALA" => 'A',
    "ARG" => 'R',
    "ASN" => 'N',
    "ASP" => 'D',
    "CYS" => 'C',
    "GLN" => 'Q',
    "GLU" => 'E',
    "GLY" => 'G',
    "HIS" => 'H',
    "ILE" => 'I',
    "LEU" => 'L',
    "LYS" => 'K',
    "MET" => 'M',
    "PHE" => 'F',
    "PRO" => 'P',
    "SER" => 'S',
    "THR" => 'T',
    "TRP" => 'W',
    "TYR" => 'Y',
    "VAL" => 'V',
    "ASX" => 'B',
    "GLX" => 'Z',
    "SEC" => 'U',
    "PYL" => 'O',
    "UNK" => 'X',
};

/// Returns the one-letter code for a residue name, or `'X'` when it is unknown.
pub fn one_letter_code(residue_name: &str) -> char {
    ONE_LETTER_CODES
        .get(residue_name.trim().to_ascii_uppercase().as_str())
        .copied()
        .unwrap_or('X')
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Residue {
    pub number: isize,                      // Residue sequence number from source file
    pub insertion_code: Option<char>,       // PDB insertion code, if any
    pub name: String,                       // Name of the residue (e.g., "ALA", "GLY")
    pub chain_id: ChainId,                  // ID of the parent chain
    pub(crate) atoms: Vec<AtomId>,          // Atoms belonging to this residue, in file order
    atom_name_map: HashMap<String, AtomId>, // Map from atom name to its stable ID
}

impl Residue {
    pub(crate) fn new(
        number: isize,
        insertion_code: Option<char>,
        name: &str,
        chain_id: ChainId,
    ) -> Self {
        Self {
            number,
            insertion_code,
            name: name.to_string(),
            chain_id,
            atoms: Vec::new(),
            atom_name_map: HashMap::new(),
        }
    }

    pub(crate) fn add_atom(&mut self, atom_name: &str, atom_id: AtomId) {
        self.atoms.push(atom_id);
        self.atom_name_map
            .entry(atom_name.to_string())
            .or_insert(atom_id);
    }

    pub fn atoms(&self) -> &[AtomId] {
        &self.atoms
    }

    pub fn get_atom_id_by_name(&self, name: &str) -> Option<AtomId> {
        self.atom_name_map.get(name).copied()
    }

    pub fn one_letter_code(&self) -> char {
        one_letter_code(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::KeyData;

    fn dummy_atom_id(n: u64) -> AtomId {
        AtomId::from(KeyData::from_ffi(n))
    }

    fn dummy_chain_id(n: u64) -> ChainId {
        ChainId::from(KeyData::from_ffi(n))
    }

    #[test]
    fn new_residue_initializes_fields_correctly() {
        let chain_id = dummy_chain_id(1);
        let residue = Residue::new(10, None, "GLY", chain_id);
        assert_eq!(residue.number, 10);
        assert_eq!(residue.insertion_code, None);
        assert_eq!(residue.name, "GLY");
        assert_eq!(residue.chain_id, chain_id);
        assert!(residue.atoms().is_empty());
        assert!(residue.get_atom_id_by_name("CA").is_none());
    }

    #[test]
    fn add_atom_adds_atom_and_maps_name() {
        let mut residue = Residue::new(5, None, "ALA", dummy_chain_id(2));
        let atom_id = dummy_atom_id(42);
        residue.add_atom("CA", atom_id);
        assert_eq!(residue.atoms(), &[atom_id]);
        assert_eq!(residue.get_atom_id_by_name("CA"), Some(atom_id));
    }

    #[test]
    fn alternate_locations_keep_first_name_mapping() {
        let mut residue = Residue::new(7, None, "SER", dummy_chain_id(3));
        let first = dummy_atom_id(1);
        let second = dummy_atom_id(2);
        residue.add_atom("OG", first);
        residue.add_atom("OG", second);
        assert_eq!(residue.atoms(), &[first, second]);
        assert_eq!(residue.get_atom_id_by_name("OG"), Some(first));
    }

    #[test]
    fn one_letter_code_maps_standard_and_rare_residues() {
        assert_eq!(one_letter_code("ALA"), 'A');
        assert_eq!(one_letter_code("trp"), 'W');
        assert_eq!(one_letter_code("SEC"), 'U');
        assert_eq!(one_letter_code("PYL"), 'O');
        assert_eq!(one_letter_code("HOH"), 'X');
    }

    #[test]
    fn residue_reports_its_one_letter_code() {
        let residue = Residue::new(1, Some('A'), "LYS", dummy_chain_id(4));
        assert_eq!(residue.one_letter_code(), 'K');
    }
}
