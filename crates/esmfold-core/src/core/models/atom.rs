use super::ids::ResidueId;
use nalgebra::Point3;

/// Represents an atom of a predicted structure with the per-atom fields a
/// PDB or mmCIF record carries.
///
/// ESMFold stores its per-residue confidence (pLDDT) in the B-factor column,
/// repeated over every atom of the residue, so `b_factor` is the field the
/// score extraction reads by default.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// Serial number from the source file.
    pub serial: usize,
    /// The name of the atom (e.g., "CA", "N", "O").
    pub name: String,
    /// The ID of the parent residue this atom belongs to.
    pub residue_id: ResidueId,
    /// Chemical element symbol (e.g., "C", "SE").
    pub element: String,
    /// Alternate location indicator, if any.
    pub alt_loc: Option<char>,
    /// The 3D coordinates of the atom in Angstroms.
    pub position: Point3<f64>,
    /// Occupancy column.
    pub occupancy: f64,
    /// Temperature factor column; holds the confidence score for predictions.
    pub b_factor: f64,
    /// Whether the atom came from a `HETATM` record.
    pub hetero: bool,
}

impl Atom {
    /// Creates a new `Atom` with default values for most fields.
    ///
    /// The element is inferred from the atom name, occupancy defaults to 1.0
    /// and the B-factor to 0.0.
    ///
    /// # Arguments
    ///
    /// * `name` - The name of the atom.
    /// * `residue_id` - The ID of the residue this atom belongs to.
    /// * `position` - The 3D coordinates of the atom.
    pub fn new(name: &str, residue_id: ResidueId, position: Point3<f64>) -> Self {
        Self {
            serial: 0,
            name: name.to_string(),
            residue_id,
            element: infer_element(name),
            alt_loc: None,
            position,
            occupancy: 1.0,
            b_factor: 0.0,
            hetero: false,
        }
    }
}

/// Infers an element symbol from an atom name by taking its first letter.
///
/// Protein atom names always start with the element letter (`CA` is carbon,
/// `OG1` is oxygen), which is all a predicted model contains.
pub fn infer_element(atom_name: &str) -> String {
    atom_name
        .trim()
        .chars()
        .find(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_uppercase().to_string())
        .unwrap_or_default()
}
