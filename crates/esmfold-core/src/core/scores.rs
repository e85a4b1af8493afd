use crate::core::io::cif::{CifMetadata, StructureAttribute};
use crate::core::models::residue::Residue;
use crate::core::models::structure::Structure;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, warn};

/// Attribute name under which per-residue confidence is stored.
pub const SCORE_ATTRIBUTE: &str = "ESMFoldScore";
/// Recipient kind of per-residue attributes.
pub const RESIDUE_RECIPIENT: &str = "residues";

const MAX_LISTED_KEYS: usize = 5;

#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("Structure contains no residues with atoms")]
    EmptyStructure,
    #[error("Residue {key} was scored more than once")]
    DuplicateResidue { key: ResidueKey },
    #[error(
        "Score keys do not match the structure residues (missing: {}, unexpected: {})",
        list_keys(.missing),
        list_keys(.unexpected)
    )]
    KeyMismatch {
        missing: Vec<ResidueKey>,
        unexpected: Vec<ResidueKey>,
    },
    #[error("Invalid residue key '{0}' (expected <chain>:<number>[insertion code])")]
    InvalidKey(String),
    #[error("Invalid score '{value}' for residue {key}")]
    InvalidValue { key: String, value: String },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

fn list_keys(keys: &[ResidueKey]) -> String {
    if keys.is_empty() {
        return "none".to_string();
    }
    let mut listed: Vec<String> = keys
        .iter()
        .take(MAX_LISTED_KEYS)
        .map(ToString::to_string)
        .collect();
    if keys.len() > MAX_LISTED_KEYS {
        listed.push(format!("and {} more", keys.len() - MAX_LISTED_KEYS));
    }
    listed.join(", ")
}

/// Identifies a residue as `<chain>:<number>` plus an optional insertion code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResidueKey {
    pub chain: char,
    pub number: isize,
    pub insertion_code: Option<char>,
}

impl ResidueKey {
    pub fn new(chain: char, number: isize, insertion_code: Option<char>) -> Self {
        Self {
            chain,
            number,
            insertion_code,
        }
    }

    pub fn of(chain: char, residue: &Residue) -> Self {
        Self::new(chain, residue.number, residue.insertion_code)
    }
}

impl fmt::Display for ResidueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.chain, self.number)?;
        if let Some(code) = self.insertion_code {
            write!(f, "{}", code)?;
        }
        Ok(())
    }
}

impl FromStr for ResidueKey {
    type Err = ScoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ScoreError::InvalidKey(s.to_string());
        let (chain, rest) = s.split_once(':').ok_or_else(invalid)?;
        let mut chain_chars = chain.chars();
        let chain = match (chain_chars.next(), chain_chars.next()) {
            (Some(c), None) => c,
            _ => return Err(invalid()),
        };
        let (number, insertion_code) = match rest.chars().last() {
            Some(last) if last.is_ascii_alphabetic() => (&rest[..rest.len() - 1], Some(last)),
            _ => (rest, None),
        };
        let number = number.parse().map_err(|_| invalid())?;
        Ok(Self::new(chain, number, insertion_code))
    }
}

/// Atom field the confidence is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScoreSource {
    /// ESMFold stores pLDDT in the B-factor column.
    #[default]
    BFactor,
    Occupancy,
}

/// How the per-atom values of one residue become a single score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScoreReduction {
    #[default]
    FirstAtom,
    Mean,
}

/// What to do when the same residue key is scored twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    #[default]
    Reject,
    FirstWins,
    LastWins,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ScoreOptions {
    pub source: ScoreSource,
    pub reduction: ScoreReduction,
    pub duplicates: DuplicatePolicy,
}

/// Per-residue confidence values in residue order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreMap {
    entries: Vec<(ResidueKey, f64)>,
    index: HashMap<ResidueKey, usize>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreSummary {
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

impl fmt::Display for ScoreSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} residues, mean {:.2}, min {:.2}, max {:.2}",
            self.count, self.mean, self.min, self.max
        )
    }
}

#[derive(Serialize)]
struct CsvRow {
    chain: char,
    residue: isize,
    insertion_code: Option<char>,
    score: String,
}

/// Shortest round-tripping text of a score, shared by the mmCIF and CSV writers.
fn score_text(value: f64) -> String {
    value.to_string()
}

impl ScoreMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a score, resolving an already present key with `policy`.
    ///
    /// Under `LastWins` the key keeps its original position and takes the new value.
    pub fn insert(
        &mut self,
        key: ResidueKey,
        value: f64,
        policy: DuplicatePolicy,
    ) -> Result<(), ScoreError> {
        match self.index.get(&key) {
            None => {
                self.index.insert(key, self.entries.len());
                self.entries.push((key, value));
            }
            Some(&position) => match policy {
                DuplicatePolicy::Reject => return Err(ScoreError::DuplicateResidue { key }),
                DuplicatePolicy::FirstWins => {
                    debug!(%key, "Ignoring repeated score for residue.");
                }
                DuplicatePolicy::LastWins => {
                    debug!(%key, "Replacing score for residue.");
                    self.entries[position].1 = value;
                }
            },
        }
        Ok(())
    }

    pub fn get(&self, key: &ResidueKey) -> Option<f64> {
        self.index.get(key).map(|&position| self.entries[position].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ResidueKey, f64)> {
        self.entries.iter().map(|(key, value)| (key, *value))
    }

    pub fn keys(&self) -> impl Iterator<Item = &ResidueKey> {
        self.entries.iter().map(|(key, _)| key)
    }

    pub fn summary(&self) -> Option<ScoreSummary> {
        if self.entries.is_empty() {
            return None;
        }
        let values = self.entries.iter().map(|(_, value)| *value);
        let sum: f64 = values.clone().sum();
        Some(ScoreSummary {
            count: self.entries.len(),
            mean: sum / self.entries.len() as f64,
            min: values.clone().fold(f64::INFINITY, f64::min),
            max: values.fold(f64::NEG_INFINITY, f64::max),
        })
    }

    /// One `ESMFoldScore residues <key> <value>` attribute per entry.
    pub fn to_attributes(&self) -> Vec<StructureAttribute> {
        self.iter()
            .map(|(key, value)| StructureAttribute {
                name: SCORE_ATTRIBUTE.to_string(),
                recipient: RESIDUE_RECIPIENT.to_string(),
                specifier: key.to_string(),
                value: score_text(value),
            })
            .collect()
    }

    /// Rebuilds a score map from the `ESMFoldScore` residue attributes of a file.
    pub fn from_attributes<'a>(
        attributes: impl IntoIterator<Item = &'a StructureAttribute>,
        policy: DuplicatePolicy,
    ) -> Result<Self, ScoreError> {
        let mut scores = Self::new();
        for attr in attributes
            .into_iter()
            .filter(|a| a.name == SCORE_ATTRIBUTE && a.recipient == RESIDUE_RECIPIENT)
        {
            let key: ResidueKey = attr.specifier.parse()?;
            let value: f64 = attr.value.parse().map_err(|_| ScoreError::InvalidValue {
                key: attr.specifier.clone(),
                value: attr.value.clone(),
            })?;
            scores.insert(key, value, policy)?;
        }
        Ok(scores)
    }

    /// Writes `chain,residue,insertion_code,score` rows with a header.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), ScoreError> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        for (key, score) in self.iter() {
            csv_writer.serialize(CsvRow {
                chain: key.chain,
                residue: key.number,
                insertion_code: key.insertion_code,
                score: score_text(score),
            })?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    pub fn write_csv_path<P: AsRef<Path>>(&self, path: P) -> Result<(), ScoreError> {
        self.write_csv(File::create(path)?)
    }
}

fn atom_value(structure: &Structure, residue: &Residue, source: ScoreSource) -> Vec<f64> {
    residue
        .atoms()
        .iter()
        .filter_map(|&id| structure.atom(id))
        .map(|atom| match source {
            ScoreSource::BFactor => atom.b_factor,
            ScoreSource::Occupancy => atom.occupancy,
        })
        .collect()
}

/// Reads one confidence value per residue, in chain then file order.
///
/// Residues without atoms carry no confidence and are skipped.
pub fn extract_scores(structure: &Structure, options: &ScoreOptions) -> Result<ScoreMap, ScoreError> {
    let mut scores = ScoreMap::new();
    for (chain, _, residue) in structure.residues_in_order() {
        let values = atom_value(structure, residue, options.source);
        let Some(&first) = values.first() else {
            warn!(chain = %chain.id, residue = residue.number, "Residue has no atoms; skipping.");
            continue;
        };
        let key = ResidueKey::of(chain.id, residue);
        let score = match options.reduction {
            ScoreReduction::FirstAtom => {
                if values.iter().any(|&v| v != first) {
                    debug!(%key, "Atom confidences differ within residue; using the first atom.");
                }
                first
            }
            ScoreReduction::Mean => values.iter().sum::<f64>() / values.len() as f64,
        };
        scores.insert(key, score, options.duplicates)?;
    }
    if scores.is_empty() {
        return Err(ScoreError::EmptyStructure);
    }
    Ok(scores)
}

/// Checks that `scores` covers every residue with atoms exactly once.
pub fn check_keys(structure: &Structure, scores: &ScoreMap) -> Result<(), ScoreError> {
    let expected: BTreeSet<ResidueKey> = structure
        .residues_in_order()
        .filter(|(_, _, residue)| !residue.atoms().is_empty())
        .map(|(chain, _, residue)| ResidueKey::of(chain.id, residue))
        .collect();
    let actual: BTreeSet<ResidueKey> = scores.keys().copied().collect();

    if expected == actual {
        return Ok(());
    }
    Err(ScoreError::KeyMismatch {
        missing: expected.difference(&actual).copied().collect(),
        unexpected: actual.difference(&expected).copied().collect(),
    })
}

/// Merges `scores` into `metadata` as `ESMFoldScore` residue attributes.
///
/// Existing `ESMFoldScore` rows are replaced; other attributes are kept.
pub fn annotate(
    structure: &Structure,
    scores: &ScoreMap,
    metadata: &mut CifMetadata,
) -> Result<(), ScoreError> {
    check_keys(structure, scores)?;
    metadata.attributes.retain(|attr| attr.name != SCORE_ATTRIBUTE);
    metadata.attributes.extend(scores.to_attributes());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::pdb::PdbFile;
    use crate::core::io::traits::StructureFile;
    use std::io::Cursor;

    const PDB: &str = "\
ATOM      1  N   MET A   1      -3.409  12.020  -7.063  1.00 81.17           N
ATOM      2  CA  MET A   1      -2.317  12.431  -6.167  0.90 81.17           C
ATOM      3  CA  LYS A   2       0.196   9.590  -6.819  0.80 64.20           C
ATOM      4  CB  LYS A   2       1.196   9.590  -6.819  0.60 60.20           C
ATOM      5  CA  GLY A   2A      2.196   9.590  -6.819  1.00 55.00           C
END
";

    fn structure() -> Structure {
        PdbFile::read_from(&mut Cursor::new(PDB)).unwrap().0
    }

    #[test]
    fn residue_key_formats_and_parses() {
        let plain = ResidueKey::new('A', 12, None);
        let inserted = ResidueKey::new('B', -3, Some('C'));
        assert_eq!(plain.to_string(), "A:12");
        assert_eq!(inserted.to_string(), "B:-3C");
        assert_eq!("A:12".parse::<ResidueKey>().unwrap(), plain);
        assert_eq!("B:-3C".parse::<ResidueKey>().unwrap(), inserted);
        assert!("AB:1".parse::<ResidueKey>().is_err());
        assert!("A1".parse::<ResidueKey>().is_err());
        assert!("A:".parse::<ResidueKey>().is_err());
    }

    #[test]
    fn extracts_first_atom_b_factor_per_residue_in_order() {
        let scores = extract_scores(&structure(), &ScoreOptions::default()).unwrap();
        let entries: Vec<(String, f64)> = scores.iter().map(|(k, v)| (k.to_string(), v)).collect();
        assert_eq!(
            entries,
            vec![
                ("A:1".to_string(), 81.17),
                ("A:2".to_string(), 64.2),
                ("A:2A".to_string(), 55.0)
            ]
        );
    }

    #[test]
    fn mean_reduction_and_occupancy_source_are_honoured() {
        let options = ScoreOptions {
            source: ScoreSource::Occupancy,
            reduction: ScoreReduction::Mean,
            ..Default::default()
        };
        let scores = extract_scores(&structure(), &options).unwrap();
        let lys = scores.get(&ResidueKey::new('A', 2, None)).unwrap();
        assert!((lys - 0.7).abs() < 1e-12);
        let met = scores.get(&ResidueKey::new('A', 1, None)).unwrap();
        assert!((met - 0.95).abs() < 1e-12);
    }

    #[test]
    fn extraction_is_deterministic() {
        let s = structure();
        let first = extract_scores(&s, &ScoreOptions::default()).unwrap();
        let second = extract_scores(&s, &ScoreOptions::default()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn empty_structure_is_an_error() {
        let err = extract_scores(&Structure::new(), &ScoreOptions::default()).unwrap_err();
        assert!(matches!(err, ScoreError::EmptyStructure));
    }

    const REPEATED_PDB: &str = "\
ATOM      1  CA  MET A   1      -2.317   9.590  -6.819  1.00 81.00           C
ATOM      2  CA  LYS A   2       0.196   9.590  -6.819  1.00 64.00           C
ATOM      3  CA  GLY A   1       3.800   9.590  -6.819  1.00 12.00           C
END
";

    #[test]
    fn repeated_residue_in_a_pdb_follows_the_duplicate_policy() {
        let structure = PdbFile::read_from(&mut Cursor::new(REPEATED_PDB)).unwrap().0;
        assert_eq!(structure.residue_count(), 3);
        assert_eq!(structure.atom_count(), 3);

        let err = extract_scores(&structure, &ScoreOptions::default()).unwrap_err();
        let key = ResidueKey::new('A', 1, None);
        assert!(matches!(err, ScoreError::DuplicateResidue { key: k } if k == key));

        let first = ScoreOptions {
            duplicates: DuplicatePolicy::FirstWins,
            ..Default::default()
        };
        let scores = extract_scores(&structure, &first).unwrap();
        let entries: Vec<(String, f64)> = scores.iter().map(|(k, v)| (k.to_string(), v)).collect();
        assert_eq!(entries, vec![("A:1".to_string(), 81.0), ("A:2".to_string(), 64.0)]);

        let last = ScoreOptions {
            duplicates: DuplicatePolicy::LastWins,
            ..Default::default()
        };
        let scores = extract_scores(&structure, &last).unwrap();
        assert_eq!(scores.get(&key), Some(12.0));
        assert_eq!(scores.len(), 2);

        let mut metadata = CifMetadata::default();
        annotate(&structure, &scores, &mut metadata).unwrap();
        assert_eq!(metadata.attributes.len(), 2);
    }

    #[test]
    fn duplicate_policies_resolve_repeated_keys() {
        let key = ResidueKey::new('A', 1, None);

        let mut reject = ScoreMap::new();
        reject.insert(key, 1.0, DuplicatePolicy::Reject).unwrap();
        let err = reject.insert(key, 2.0, DuplicatePolicy::Reject).unwrap_err();
        assert!(matches!(err, ScoreError::DuplicateResidue { key: k } if k == key));

        let mut first = ScoreMap::new();
        first.insert(key, 1.0, DuplicatePolicy::FirstWins).unwrap();
        first.insert(key, 2.0, DuplicatePolicy::FirstWins).unwrap();
        assert_eq!(first.get(&key), Some(1.0));

        let mut last = ScoreMap::new();
        last.insert(key, 1.0, DuplicatePolicy::LastWins).unwrap();
        last.insert(key, 2.0, DuplicatePolicy::LastWins).unwrap();
        assert_eq!(last.get(&key), Some(2.0));
        assert_eq!(last.len(), 1);
    }

    #[test]
    fn annotate_adds_one_attribute_per_residue_and_replaces_old_scores() {
        let s = structure();
        let scores = extract_scores(&s, &ScoreOptions::default()).unwrap();
        let mut metadata = CifMetadata::new("prediction");
        metadata.attributes.push(StructureAttribute {
            name: SCORE_ATTRIBUTE.into(),
            recipient: RESIDUE_RECIPIENT.into(),
            specifier: "A:99".into(),
            value: "1".into(),
        });
        metadata.attributes.push(StructureAttribute {
            name: "Other".into(),
            recipient: "chains".into(),
            specifier: "A".into(),
            value: "x".into(),
        });

        annotate(&s, &scores, &mut metadata).unwrap();

        let rows: Vec<(&str, &str)> = metadata
            .attributes_named(SCORE_ATTRIBUTE)
            .map(|a| (a.specifier.as_str(), a.value.as_str()))
            .collect();
        assert_eq!(rows, vec![("A:1", "81.17"), ("A:2", "64.2"), ("A:2A", "55")]);
        assert_eq!(metadata.attributes_named("Other").count(), 1);
    }

    #[test]
    fn annotate_rejects_mismatched_keys() {
        let s = structure();
        let mut scores = ScoreMap::new();
        scores
            .insert(ResidueKey::new('A', 1, None), 1.0, DuplicatePolicy::Reject)
            .unwrap();
        scores
            .insert(ResidueKey::new('B', 1, None), 1.0, DuplicatePolicy::Reject)
            .unwrap();

        let err = annotate(&s, &scores, &mut CifMetadata::default()).unwrap_err();
        match err {
            ScoreError::KeyMismatch {
                missing,
                unexpected,
            } => {
                assert_eq!(
                    missing,
                    vec![ResidueKey::new('A', 2, None), ResidueKey::new('A', 2, Some('A'))]
                );
                assert_eq!(unexpected, vec![ResidueKey::new('B', 1, None)]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn attributes_rebuild_the_score_map() {
        let scores = extract_scores(&structure(), &ScoreOptions::default()).unwrap();
        let attributes = scores.to_attributes();
        let rebuilt = ScoreMap::from_attributes(&attributes, DuplicatePolicy::Reject).unwrap();
        assert_eq!(rebuilt, scores);
    }

    #[test]
    fn non_numeric_attribute_value_is_rejected() {
        let attributes = vec![StructureAttribute {
            name: SCORE_ATTRIBUTE.into(),
            recipient: RESIDUE_RECIPIENT.into(),
            specifier: "A:1".into(),
            value: "high".into(),
        }];
        let err = ScoreMap::from_attributes(&attributes, DuplicatePolicy::Reject).unwrap_err();
        assert!(matches!(err, ScoreError::InvalidValue { .. }));
    }

    #[test]
    fn csv_and_attribute_values_use_the_same_text() {
        let scores = extract_scores(&structure(), &ScoreOptions::default()).unwrap();
        let mut buffer = Vec::new();
        scores.write_csv(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let csv_values: Vec<&str> = text
            .lines()
            .skip(1)
            .map(|line| line.rsplit(',').next().unwrap())
            .collect();
        let attribute_values: Vec<String> =
            scores.to_attributes().into_iter().map(|a| a.value).collect();
        assert_eq!(csv_values, attribute_values);
    }

    #[test]
    fn csv_export_lists_every_residue() {
        let scores = extract_scores(&structure(), &ScoreOptions::default()).unwrap();
        let mut buffer = Vec::new();
        scores.write_csv(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(
            text,
            "chain,residue,insertion_code,score\nA,1,,81.17\nA,2,,64.2\nA,2,A,55\n"
        );
    }

    #[test]
    fn summary_reports_count_mean_min_max() {
        let scores = extract_scores(&structure(), &ScoreOptions::default()).unwrap();
        let summary = scores.summary().unwrap();
        assert_eq!(summary.count, 3);
        assert_eq!(summary.min, 55.0);
        assert_eq!(summary.max, 81.17);
        assert!((summary.mean - (81.17 + 64.2 + 55.0) / 3.0).abs() < 1e-9);
        assert!(ScoreMap::new().summary().is_none());
    }
}
