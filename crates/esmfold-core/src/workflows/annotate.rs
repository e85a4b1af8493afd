use crate::core::io::cif::{CifFile, CifMetadata};
use crate::core::io::pdb::PdbFile;
use crate::core::io::traits::StructureFile;
use crate::core::models::structure::Structure;
use crate::core::scores::{self, DuplicatePolicy, ScoreMap, ScoreOptions};
use crate::engine::error::EngineError;
use std::fs;
use std::path::Path;
use tracing::{info, instrument};

/// A parsed prediction and the scores written alongside it.
#[derive(Debug, Clone)]
pub struct Annotation {
    pub structure: Structure,
    pub scores: ScoreMap,
}

/// Reads a predicted PDB, extracts per-residue confidence and writes an mmCIF
/// file carrying it as `ESMFoldScore` residue attributes.
///
/// # Errors
///
/// Returns [`EngineError::MissingPrediction`] if `pdb_path` does not exist.
#[instrument(skip_all, name = "annotate_workflow", fields(pdb = %pdb_path.display()))]
pub fn run(pdb_path: &Path, cif_path: &Path, options: &ScoreOptions) -> Result<Annotation, EngineError> {
    if !pdb_path.is_file() {
        return Err(EngineError::MissingPrediction {
            path: pdb_path.to_path_buf(),
        });
    }

    let (structure, _) = PdbFile::read_from_path(pdb_path).map_err(|source| EngineError::Pdb {
        path: pdb_path.to_path_buf(),
        source,
    })?;
    info!(
        chains = structure.chain_count(),
        residues = structure.residue_count(),
        atoms = structure.atom_count(),
        "Prediction loaded."
    );

    let scores = scores::extract_scores(&structure, options)?;
    if let Some(summary) = scores.summary() {
        info!("Confidence: {}", summary);
    }

    let data_name = pdb_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "prediction".to_string());
    let mut metadata = CifMetadata::new(data_name);
    scores::annotate(&structure, &scores, &mut metadata)?;

    if let Some(parent) = cif_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| EngineError::io(parent, e))?;
    }
    CifFile::write_to_path(&structure, &metadata, cif_path).map_err(|source| EngineError::Cif {
        path: cif_path.to_path_buf(),
        source,
    })?;
    info!(path = %cif_path.display(), "Annotated structure written.");

    Ok(Annotation { structure, scores })
}

/// Reads the `ESMFoldScore` attributes back from an annotated mmCIF file.
pub fn read_scores(cif_path: &Path, policy: DuplicatePolicy) -> Result<ScoreMap, EngineError> {
    let (_, metadata) = CifFile::read_from_path(cif_path).map_err(|source| EngineError::Cif {
        path: cif_path.to_path_buf(),
        source,
    })?;
    Ok(ScoreMap::from_attributes(&metadata.attributes, policy)?)
}
