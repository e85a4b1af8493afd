use crate::core::io::traits::StructureFile;
use crate::core::models::atom::{Atom, infer_element};
use crate::core::models::builder::{BuildError, StructureBuilder};
use crate::core::models::ids::ResidueId;
use crate::core::models::structure::Structure;
use nalgebra::Point3;
use std::io::{self, BufRead, Write};
use thiserror::Error;
use tracing::{debug, warn};

/// Minimum line length for an ATOM/HETATM record: everything up to the
/// z coordinate must be present.
const MIN_ATOM_RECORD_LEN: usize = 54;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PdbMetadata {
    /// Header records (HEADER, REMARK, PARENT, ...) in file order.
    pub header_lines: Vec<String>,
    /// Number of MODEL records encountered; zero when the file has none.
    pub model_count: usize,
}

#[derive(Debug, Error)]
pub enum PdbError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse { line: usize, kind: PdbParseErrorKind },
    #[error("Inconsistent record order on line {line}: {source}")]
    Build {
        line: usize,
        #[source]
        source: BuildError,
    },
    #[error("Missing required record: {0}")]
    MissingRecord(String),
}

#[derive(Debug, Error)]
pub enum PdbParseErrorKind {
    #[error("Invalid integer format in columns {columns} (value: '{value}')")]
    InvalidInt { columns: &'static str, value: String },
    #[error("Invalid float format in columns {columns} (value: '{value}')")]
    InvalidFloat { columns: &'static str, value: String },
    #[error("Required field in columns {columns} is empty")]
    MissingRequiredField { columns: &'static str },
    #[error("Line is too short for ATOM/HETATM record (must be at least 54 chars)")]
    LineTooShort,
}

fn slice_and_trim(line: &str, start: usize, end: usize) -> &str {
    line.get(start..end.min(line.len())).unwrap_or("").trim()
}

fn single_char(line: &str, index: usize) -> Option<char> {
    line.get(index..index + 1)
        .and_then(|s| s.chars().next())
        .filter(|c| !c.is_whitespace())
}

fn parse_int(
    line: &str,
    start: usize,
    end: usize,
    columns: &'static str,
    line_num: usize,
) -> Result<isize, PdbError> {
    let value = slice_and_trim(line, start, end);
    value.parse().map_err(|_| PdbError::Parse {
        line: line_num,
        kind: PdbParseErrorKind::InvalidInt {
            columns,
            value: value.into(),
        },
    })
}

fn parse_float(
    line: &str,
    start: usize,
    end: usize,
    columns: &'static str,
    line_num: usize,
) -> Result<f64, PdbError> {
    let value = slice_and_trim(line, start, end);
    value.parse().map_err(|_| PdbError::Parse {
        line: line_num,
        kind: PdbParseErrorKind::InvalidFloat {
            columns,
            value: value.into(),
        },
    })
}

fn parse_optional_float(
    line: &str,
    start: usize,
    end: usize,
    columns: &'static str,
    line_num: usize,
    default: f64,
) -> Result<f64, PdbError> {
    if slice_and_trim(line, start, end).is_empty() {
        Ok(default)
    } else {
        parse_float(line, start, end, columns, line_num)
    }
}

/// Identity of the residue an ATOM record belongs to.
#[derive(Debug, Clone, PartialEq)]
struct ResidueTag {
    number: isize,
    insertion_code: Option<char>,
    name: String,
}

/// Reader and writer for PDB coordinate files as written by ESMFold.
pub struct PdbFile;

impl StructureFile for PdbFile {
    type Metadata = PdbMetadata;
    type Error = PdbError;

    fn read_from(reader: &mut impl BufRead) -> Result<(Structure, Self::Metadata), Self::Error> {
        let mut builder = StructureBuilder::new();
        let mut metadata = PdbMetadata::default();

        let mut current_chain: Option<char> = None;
        let mut current_residue: Option<ResidueTag> = None;

        for (line_num, line_res) in reader.lines().enumerate() {
            let line = line_res?;
            let line_num = line_num + 1;
            let record_type = slice_and_trim(&line, 0, 6);

            match record_type {
                "ATOM" | "HETATM" => {
                    if metadata.model_count > 1 {
                        continue;
                    }
                    if line.len() < MIN_ATOM_RECORD_LEN {
                        return Err(PdbError::Parse {
                            line: line_num,
                            kind: PdbParseErrorKind::LineTooShort,
                        });
                    }

                    let name = slice_and_trim(&line, 12, 16);
                    if name.is_empty() {
                        return Err(PdbError::Parse {
                            line: line_num,
                            kind: PdbParseErrorKind::MissingRequiredField { columns: "13-16" },
                        });
                    }
                    let serial = parse_int(&line, 6, 11, "7-11", line_num)?;
                    let res_name = slice_and_trim(&line, 17, 20);
                    let chain_id = single_char(&line, 21).unwrap_or('A');
                    let res_seq = parse_int(&line, 22, 26, "23-26", line_num)?;
                    let insertion_code = single_char(&line, 26);
                    let x = parse_float(&line, 30, 38, "31-38", line_num)?;
                    let y = parse_float(&line, 38, 46, "39-46", line_num)?;
                    let z = parse_float(&line, 46, 54, "47-54", line_num)?;
                    let occupancy = parse_optional_float(&line, 54, 60, "55-60", line_num, 1.0)?;
                    let b_factor = parse_optional_float(&line, 60, 66, "61-66", line_num, 0.0)?;
                    let element = match slice_and_trim(&line, 76, 78) {
                        "" => infer_element(name),
                        symbol => symbol.to_ascii_uppercase(),
                    };

                    if current_chain != Some(chain_id) {
                        builder.start_chain(chain_id);
                        current_chain = Some(chain_id);
                        current_residue = None;
                    }
                    let tag = ResidueTag {
                        number: res_seq,
                        insertion_code,
                        name: res_name.to_string(),
                    };
                    if current_residue.as_ref() != Some(&tag) {
                        builder
                            .start_residue(tag.number, tag.insertion_code, &tag.name)
                            .map_err(|source| PdbError::Build {
                                line: line_num,
                                source,
                            })?;
                        current_residue = Some(tag);
                    }

                    let atom = Atom {
                        serial: serial.max(0) as usize,
                        name: name.to_string(),
                        residue_id: ResidueId::default(),
                        element,
                        alt_loc: single_char(&line, 16),
                        position: Point3::new(x, y, z),
                        occupancy,
                        b_factor,
                        hetero: record_type == "HETATM",
                    };
                    builder.add_atom(atom).map_err(|source| PdbError::Build {
                        line: line_num,
                        source,
                    })?;
                }
                "MODEL" => {
                    metadata.model_count += 1;
                    if metadata.model_count == 2 {
                        warn!(
                            "PDB contains more than one MODEL; only the first is read (line {}).",
                            line_num
                        );
                    }
                }
                "ENDMDL" | "TER" | "CONECT" | "MASTER" => {}
                "END" => break,
                "" => {
                    if !line.trim().is_empty() {
                        metadata.header_lines.push(line);
                    }
                }
                _ => metadata.header_lines.push(line),
            }
        }

        if builder.is_empty() {
            return Err(PdbError::MissingRecord("ATOM/HETATM records".into()));
        }
        let structure = builder.build();
        debug!(
            "Parsed PDB with {} chain(s), {} residue(s), {} atom(s).",
            structure.chain_count(),
            structure.residue_count(),
            structure.atom_count()
        );
        Ok((structure, metadata))
    }

    fn write_to(
        structure: &Structure,
        metadata: &Self::Metadata,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        for line in &metadata.header_lines {
            writeln!(writer, "{}", line)?;
        }

        let mut serial = 0usize;
        for (_, chain) in structure.chains_iter() {
            let mut last_residue = None;
            for &residue_id in chain.residues() {
                let Some(residue) = structure.residue(residue_id) else {
                    continue;
                };
                for &atom_id in residue.atoms() {
                    let Some(atom) = structure.atom(atom_id) else {
                        continue;
                    };
                    serial = if atom.serial > 0 { atom.serial } else { serial + 1 };
                    writeln!(
                        writer,
                        "{:<6}{:>5} {}{}{:>3} {}{:>4}{}   {:>8.3}{:>8.3}{:>8.3}{:>6.2}{:>6.2}          {:>2}",
                        if atom.hetero { "HETATM" } else { "ATOM" },
                        serial,
                        format_atom_name(&atom.name, &atom.element),
                        atom.alt_loc.unwrap_or(' '),
                        residue.name,
                        chain.id,
                        residue.number,
                        residue.insertion_code.unwrap_or(' '),
                        atom.position.x,
                        atom.position.y,
                        atom.position.z,
                        atom.occupancy,
                        atom.b_factor,
                        atom.element
                    )?;
                }
                last_residue = Some(residue);
            }
            if let Some(residue) = last_residue {
                serial += 1;
                writeln!(
                    writer,
                    "TER   {:>5}      {:>3} {}{:>4}{}",
                    serial,
                    residue.name,
                    chain.id,
                    residue.number,
                    residue.insertion_code.unwrap_or(' ')
                )?;
            }
        }

        writeln!(writer, "END")?;
        Ok(())
    }
}

/// Aligns an atom name inside its four-column field: one-letter elements
/// start in column 14 unless the name fills all four columns.
fn format_atom_name(name: &str, element: &str) -> String {
    if name.len() < 4 && element.len() == 1 {
        format!(" {:<3}", name)
    } else {
        format!("{:<4}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const ESMFOLD_PDB: &str = "\
PARENT N/A
ATOM      1  N   MET A   1      -3.409  12.020  -7.063  1.00 81.17           N
ATOM      2  CA  MET A   1      -2.317  12.431  -6.167  1.00 81.17           C
ATOM      3  C   MET A   1      -1.044  11.698  -6.584  1.00 81.17           C
ATOM      4  N   LYS A   2      -0.977  10.378  -6.427  1.00 64.20           N
ATOM      5  CA  LYS A   2       0.196   9.590  -6.819  1.00 64.20           C
TER       6      LYS A   2
END
";

    fn read(text: &str) -> Result<(Structure, PdbMetadata), PdbError> {
        PdbFile::read_from(&mut Cursor::new(text))
    }

    #[test]
    fn reads_esmfold_output_with_b_factors() {
        let (structure, metadata) = read(ESMFOLD_PDB).unwrap();
        assert_eq!(metadata.header_lines, vec!["PARENT N/A".to_string()]);
        assert_eq!(structure.chain_count(), 1);
        assert_eq!(structure.residue_count(), 2);
        assert_eq!(structure.atom_count(), 5);

        let residues: Vec<_> = structure.residues_in_order().collect();
        let (_, _, first) = residues[0];
        assert_eq!(first.name, "MET");
        let ca = structure
            .atom(first.get_atom_id_by_name("CA").unwrap())
            .unwrap();
        assert_eq!(ca.serial, 2);
        assert_eq!(ca.element, "C");
        assert!((ca.b_factor - 81.17).abs() < 1e-9);
        assert!((ca.position.x + 2.317).abs() < 1e-9);
    }

    #[test]
    fn missing_occupancy_and_element_fall_back_to_defaults() {
        let text = "ATOM      1  CA  GLY B  10       1.000   2.000   3.000\n";
        let (structure, _) = read(text).unwrap();
        let (_, _, atom) = structure.atoms_in_order().next().unwrap();
        assert_eq!(atom.occupancy, 1.0);
        assert_eq!(atom.b_factor, 0.0);
        assert_eq!(atom.element, "C");
    }

    #[test]
    fn short_atom_line_is_a_parse_error() {
        let err = read("ATOM      1  CA  GLY A   1       1.000\n").unwrap_err();
        assert!(matches!(
            err,
            PdbError::Parse {
                line: 1,
                kind: PdbParseErrorKind::LineTooShort
            }
        ));
    }

    #[test]
    fn invalid_coordinate_reports_columns() {
        let text = "ATOM      1  CA  GLY A   1       abcde   2.000   3.000  1.00 50.00           C\n";
        let err = read(text).unwrap_err();
        match err {
            PdbError::Parse {
                kind: PdbParseErrorKind::InvalidFloat { columns, .. },
                ..
            } => assert_eq!(columns, "31-38"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn file_without_atoms_is_rejected() {
        let err = read("HEADER    EMPTY\nEND\n").unwrap_err();
        assert!(matches!(err, PdbError::MissingRecord(_)));
    }

    #[test]
    fn only_the_first_model_is_read() {
        let text = "\
MODEL        1
ATOM      1  CA  GLY A   1       1.000   2.000   3.000  1.00 50.00           C
ENDMDL
MODEL        2
ATOM      1  CA  GLY A   1       9.000   9.000   9.000  1.00 10.00           C
ATOM      2  CA  ALA A   2       9.000   9.000   9.000  1.00 10.00           C
ENDMDL
END
";
        let (structure, metadata) = read(text).unwrap();
        assert_eq!(metadata.model_count, 2);
        assert_eq!(structure.atom_count(), 1);
    }

    #[test]
    fn insertion_codes_split_residues() {
        let text = "\
ATOM      1  CA  ALA A  52       1.000   2.000   3.000  1.00 50.00           C
ATOM      2  CA  GLY A  52A      1.000   2.000   3.000  1.00 40.00           C
";
        let (structure, _) = read(text).unwrap();
        let codes: Vec<_> = structure
            .residues_in_order()
            .map(|(_, _, r)| r.insertion_code)
            .collect();
        assert_eq!(codes, vec![None, Some('A')]);
    }

    #[test]
    fn written_records_read_back_identically() {
        let (structure, metadata) = read(ESMFOLD_PDB).unwrap();
        let mut buffer = Vec::new();
        PdbFile::write_to(&structure, &metadata, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        assert!(text.contains(
            "ATOM      2  CA  MET A   1      -2.317  12.431  -6.167  1.00 81.17           C"
        ));
        assert!(text.trim_end().ends_with("END"));

        let (reread, _) = read(&text).unwrap();
        let before: Vec<f64> = structure.atoms_in_order().map(|(_, _, a)| a.b_factor).collect();
        let after: Vec<f64> = reread.atoms_in_order().map(|(_, _, a)| a.b_factor).collect();
        assert_eq!(before, after);
    }
}
