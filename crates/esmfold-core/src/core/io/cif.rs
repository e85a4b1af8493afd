use crate::core::io::traits::StructureFile;
use crate::core::models::atom::{Atom, infer_element};
use crate::core::models::builder::{BuildError, StructureBuilder};
use crate::core::models::ids::ResidueId;
use crate::core::models::structure::Structure;
use nalgebra::Point3;
use std::io::{self, BufRead, Write};
use thiserror::Error;

/// Category holding custom per-object attributes.
pub const ATTRIBUTES_CATEGORY: &str = "_structure_attributes";

const ATTRIBUTE_COLUMNS: [&str; 4] = ["name", "recipient", "specifier", "value"];

const ATOM_SITE_COLUMNS: [&str; 20] = [
    "group_PDB",
    "id",
    "type_symbol",
    "label_atom_id",
    "label_alt_id",
    "label_comp_id",
    "label_asym_id",
    "label_entity_id",
    "label_seq_id",
    "pdbx_PDB_ins_code",
    "Cartn_x",
    "Cartn_y",
    "Cartn_z",
    "occupancy",
    "B_iso_or_equiv",
    "auth_seq_id",
    "auth_comp_id",
    "auth_asym_id",
    "auth_atom_id",
    "pdbx_PDB_model_num",
];

/// A named value attached to a structure element, e.g. one residue's score.
#[derive(Debug, Clone, PartialEq)]
pub struct StructureAttribute {
    /// Attribute name shared by all rows of one annotation (e.g. `ESMFoldScore`).
    pub name: String,
    /// Kind of element the value belongs to (`residues`, `atoms`, `chains`).
    pub recipient: String,
    /// Element selector, e.g. `A:12`.
    pub specifier: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CifMetadata {
    /// Name of the `data_` block and `_entry.id`.
    pub data_name: String,
    pub attributes: Vec<StructureAttribute>,
}

impl Default for CifMetadata {
    fn default() -> Self {
        Self {
            data_name: "structure".to_string(),
            attributes: Vec::new(),
        }
    }
}

impl CifMetadata {
    pub fn new(data_name: impl Into<String>) -> Self {
        Self {
            data_name: data_name.into(),
            attributes: Vec::new(),
        }
    }

    /// Attributes with the given name, in file order.
    pub fn attributes_named<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a StructureAttribute> + 'a {
        self.attributes.iter().filter(move |attr| attr.name == name)
    }
}

#[derive(Debug, Error)]
pub enum CifError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Syntax error on line {line}: {message}")]
    Syntax { line: usize, message: String },
    #[error("Missing category: {0}")]
    MissingCategory(String),
    #[error("Category '{category}' has no column '{column}'")]
    MissingColumn { category: String, column: String },
    #[error("Loop '{category}' has {values} values, not a multiple of its {columns} columns")]
    LoopArity {
        category: String,
        values: usize,
        columns: usize,
    },
    #[error("Invalid value '{value}' in {category}.{column} (row {row})")]
    InvalidValue {
        category: String,
        column: String,
        row: usize,
        value: String,
    },
    #[error("Inconsistent atom_site rows: {0}")]
    Build(#[from] BuildError),
}

/// One category of a data block: either a `loop_` or a run of single items.
#[derive(Debug, Clone, PartialEq)]
pub struct CifTable {
    pub category: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CifTable {
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    fn require_column(&self, column: &str) -> Result<usize, CifError> {
        self.column_index(column)
            .ok_or_else(|| CifError::MissingColumn {
                category: self.category.clone(),
                column: column.to_string(),
            })
    }
}

/// The parsed content of a single `data_` block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CifBlock {
    pub name: String,
    pub tables: Vec<CifTable>,
}

impl CifBlock {
    pub fn table(&self, category: &str) -> Option<&CifTable> {
        self.tables.iter().find(|t| t.category == category)
    }

    /// Parses the first data block of a CIF document.
    pub fn parse(reader: &mut impl BufRead) -> Result<Self, CifError> {
        let tokens = tokenize(reader)?;
        let mut block = CifBlock::default();
        let mut iter = tokens.into_iter().peekable();

        while let Some((line, token)) = iter.next() {
            match token {
                Token::Data(name) => {
                    if !block.name.is_empty() || !block.tables.is_empty() {
                        break;
                    }
                    block.name = name;
                }
                Token::Loop => {
                    let mut tags = Vec::new();
                    while let Some((_, Token::Tag(_))) = iter.peek() {
                        if let Some((_, Token::Tag(tag))) = iter.next() {
                            tags.push(tag);
                        }
                    }
                    let mut values = Vec::new();
                    while let Some((_, Token::Value(_))) = iter.peek() {
                        if let Some((_, Token::Value(value))) = iter.next() {
                            values.push(value);
                        }
                    }
                    let (category, columns) = split_tags(&tags, line)?;
                    if values.len() % columns.len() != 0 {
                        return Err(CifError::LoopArity {
                            category,
                            values: values.len(),
                            columns: columns.len(),
                        });
                    }
                    let rows = values
                        .chunks(columns.len())
                        .map(|chunk| chunk.to_vec())
                        .collect();
                    block.tables.push(CifTable {
                        category,
                        columns,
                        rows,
                    });
                }
                Token::Tag(tag) => {
                    let value = match iter.next() {
                        Some((_, Token::Value(value))) => value,
                        _ => {
                            return Err(CifError::Syntax {
                                line,
                                message: format!("tag '{}' has no value", tag),
                            });
                        }
                    };
                    let (category, column) = split_tag(&tag, line)?;
                    match block.tables.last_mut() {
                        Some(table) if table.category == category && table.rows.len() == 1 => {
                            table.columns.push(column);
                            table.rows[0].push(value);
                        }
                        _ => block.tables.push(CifTable {
                            category,
                            columns: vec![column],
                            rows: vec![vec![value]],
                        }),
                    }
                }
                Token::Value(value) => {
                    return Err(CifError::Syntax {
                        line,
                        message: format!("unexpected value '{}'", value),
                    });
                }
            }
        }
        Ok(block)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Data(String),
    Loop,
    Tag(String),
    Value(String),
}

fn tokenize(reader: &mut impl BufRead) -> Result<Vec<(usize, Token)>, CifError> {
    let mut tokens = Vec::new();
    let mut text_field: Option<(usize, String)> = None;

    for (line_num, line_res) in reader.lines().enumerate() {
        let line = line_res?;
        let line_num = line_num + 1;

        if let Some((start, mut buffer)) = text_field.take() {
            if line.starts_with(';') {
                tokens.push((start, Token::Value(buffer.trim_end().to_string())));
            } else {
                buffer.push_str(&line);
                buffer.push('\n');
                text_field = Some((start, buffer));
            }
            continue;
        }
        if let Some(rest) = line.strip_prefix(';') {
            text_field = Some((line_num, format!("{}\n", rest)));
            continue;
        }

        let chars: Vec<char> = line.chars().collect();
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            if c.is_whitespace() {
                i += 1;
                continue;
            }
            if c == '#' {
                break;
            }
            if c == '\'' || c == '"' {
                let quote = c;
                let start = i + 1;
                let mut end = start;
                loop {
                    if end >= chars.len() {
                        return Err(CifError::Syntax {
                            line: line_num,
                            message: "unterminated quoted string".to_string(),
                        });
                    }
                    if chars[end] == quote
                        && chars.get(end + 1).is_none_or(|next| next.is_whitespace())
                    {
                        break;
                    }
                    end += 1;
                }
                tokens.push((
                    line_num,
                    Token::Value(chars[start..end].iter().collect()),
                ));
                i = end + 1;
                continue;
            }

            let start = i;
            while i < chars.len() && !chars[i].is_whitespace() {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            let token = if word.eq_ignore_ascii_case("loop_") {
                Token::Loop
            } else if let Some(name) = word.strip_prefix("data_") {
                Token::Data(name.to_string())
            } else if word.starts_with('_') {
                Token::Tag(word)
            } else {
                Token::Value(word)
            };
            tokens.push((line_num, token));
        }
    }

    if let Some((start, _)) = text_field {
        return Err(CifError::Syntax {
            line: start,
            message: "unterminated text field".to_string(),
        });
    }
    Ok(tokens)
}

fn split_tag(tag: &str, line: usize) -> Result<(String, String), CifError> {
    tag.split_once('.')
        .map(|(category, column)| (category.to_string(), column.to_string()))
        .ok_or_else(|| CifError::Syntax {
            line,
            message: format!("tag '{}' has no category", tag),
        })
}

fn split_tags(tags: &[String], line: usize) -> Result<(String, Vec<String>), CifError> {
    let Some(first) = tags.first() else {
        return Err(CifError::Syntax {
            line,
            message: "loop_ without tags".to_string(),
        });
    };
    let (category, _) = split_tag(first, line)?;
    let mut columns = Vec::with_capacity(tags.len());
    for tag in tags {
        let (tag_category, column) = split_tag(tag, line)?;
        if tag_category != category {
            return Err(CifError::Syntax {
                line,
                message: format!("loop mixes categories '{}' and '{}'", category, tag_category),
            });
        }
        columns.push(column);
    }
    Ok((category, columns))
}

/// Formats a value as a CIF token, quoting it when needed.
pub fn cif_value(value: &str) -> String {
    if value.is_empty() {
        return "?".to_string();
    }
    let needs_quotes = value.chars().any(char::is_whitespace)
        || value.starts_with(['_', '#', '$', '\'', '"', '[', ']', ';'])
        || value.eq_ignore_ascii_case("loop_")
        || value.to_ascii_lowercase().starts_with("data_");
    if !needs_quotes {
        value.to_string()
    } else if value.contains('"') {
        format!("'{}'", value)
    } else {
        format!("\"{}\"", value)
    }
}

fn is_missing(value: &str) -> bool {
    value == "?" || value == "."
}

fn optional_char(value: &str) -> Option<char> {
    if is_missing(value) {
        None
    } else {
        value.chars().next()
    }
}

/// Reader and writer for mmCIF files carrying per-residue attributes.
pub struct CifFile;

struct AtomSiteColumns {
    group: usize,
    id: usize,
    type_symbol: Option<usize>,
    atom_name: usize,
    alt_id: Option<usize>,
    comp_id: usize,
    asym_id: usize,
    seq_id: usize,
    ins_code: Option<usize>,
    x: usize,
    y: usize,
    z: usize,
    occupancy: Option<usize>,
    b_factor: Option<usize>,
    model: Option<usize>,
}

impl AtomSiteColumns {
    fn locate(table: &CifTable) -> Result<Self, CifError> {
        let either = |preferred: &str, fallback: &str| {
            table
                .column_index(preferred)
                .map_or_else(|| table.require_column(fallback), Ok)
        };
        Ok(Self {
            group: table.require_column("group_PDB")?,
            id: table.require_column("id")?,
            type_symbol: table.column_index("type_symbol"),
            atom_name: either("auth_atom_id", "label_atom_id")?,
            alt_id: table.column_index("label_alt_id"),
            comp_id: either("auth_comp_id", "label_comp_id")?,
            asym_id: either("auth_asym_id", "label_asym_id")?,
            seq_id: either("auth_seq_id", "label_seq_id")?,
            ins_code: table.column_index("pdbx_PDB_ins_code"),
            x: table.require_column("Cartn_x")?,
            y: table.require_column("Cartn_y")?,
            z: table.require_column("Cartn_z")?,
            occupancy: table.column_index("occupancy"),
            b_factor: table.column_index("B_iso_or_equiv"),
            model: table.column_index("pdbx_PDB_model_num"),
        })
    }
}

fn parse_number<T: std::str::FromStr>(
    table: &CifTable,
    row: &[String],
    row_index: usize,
    column: usize,
) -> Result<T, CifError> {
    row[column].parse().map_err(|_| CifError::InvalidValue {
        category: table.category.clone(),
        column: table.columns[column].clone(),
        row: row_index + 1,
        value: row[column].clone(),
    })
}

fn parse_optional_number(
    table: &CifTable,
    row: &[String],
    row_index: usize,
    column: Option<usize>,
    default: f64,
) -> Result<f64, CifError> {
    match column {
        Some(c) if !is_missing(&row[c]) => parse_number(table, row, row_index, c),
        _ => Ok(default),
    }
}

impl StructureFile for CifFile {
    type Metadata = CifMetadata;
    type Error = CifError;

    fn read_from(reader: &mut impl BufRead) -> Result<(Structure, Self::Metadata), Self::Error> {
        let block = CifBlock::parse(reader)?;
        let atom_site = block
            .table("_atom_site")
            .ok_or_else(|| CifError::MissingCategory("_atom_site".to_string()))?;
        let cols = AtomSiteColumns::locate(atom_site)?;

        let mut builder = StructureBuilder::new();
        let mut current_chain: Option<char> = None;
        let mut current_residue: Option<(isize, Option<char>, String)> = None;
        let first_model = cols.model.and_then(|c| atom_site.rows.first().map(|r| r[c].clone()));

        for (row_index, row) in atom_site.rows.iter().enumerate() {
            if let (Some(c), Some(first)) = (cols.model, first_model.as_ref()) {
                if &row[c] != first {
                    continue;
                }
            }
            let chain_id = optional_char(&row[cols.asym_id]).unwrap_or('A');
            let number: isize = parse_number(atom_site, row, row_index, cols.seq_id)?;
            let insertion_code = cols.ins_code.and_then(|c| optional_char(&row[c]));
            let res_name = row[cols.comp_id].clone();

            if current_chain != Some(chain_id) {
                builder.start_chain(chain_id);
                current_chain = Some(chain_id);
                current_residue = None;
            }
            let tag = (number, insertion_code, res_name);
            if current_residue.as_ref() != Some(&tag) {
                builder.start_residue(tag.0, tag.1, &tag.2)?;
                current_residue = Some(tag);
            }

            let name = row[cols.atom_name].clone();
            let element = match cols.type_symbol.map(|c| row[c].as_str()) {
                Some(symbol) if !is_missing(symbol) => symbol.to_ascii_uppercase(),
                _ => infer_element(&name),
            };
            let serial: usize = parse_number(atom_site, row, row_index, cols.id)?;
            let atom = Atom {
                serial,
                element,
                alt_loc: cols.alt_id.and_then(|c| optional_char(&row[c])),
                position: Point3::new(
                    parse_number(atom_site, row, row_index, cols.x)?,
                    parse_number(atom_site, row, row_index, cols.y)?,
                    parse_number(atom_site, row, row_index, cols.z)?,
                ),
                occupancy: parse_optional_number(atom_site, row, row_index, cols.occupancy, 1.0)?,
                b_factor: parse_optional_number(atom_site, row, row_index, cols.b_factor, 0.0)?,
                hetero: row[cols.group] == "HETATM",
                residue_id: ResidueId::default(),
                name,
            };
            builder.add_atom(atom)?;
        }

        let mut metadata = CifMetadata::new(block.name.clone());
        if let Some(table) = block.table(ATTRIBUTES_CATEGORY) {
            let indices = ATTRIBUTE_COLUMNS
                .iter()
                .map(|column| table.require_column(column))
                .collect::<Result<Vec<_>, _>>()?;
            metadata.attributes = table
                .rows
                .iter()
                .map(|row| StructureAttribute {
                    name: row[indices[0]].clone(),
                    recipient: row[indices[1]].clone(),
                    specifier: row[indices[2]].clone(),
                    value: row[indices[3]].clone(),
                })
                .collect();
        }

        Ok((builder.build(), metadata))
    }

    fn write_to(
        structure: &Structure,
        metadata: &Self::Metadata,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        let data_name: String = metadata
            .data_name
            .chars()
            .map(|c| if c.is_whitespace() { '_' } else { c })
            .collect();
        writeln!(writer, "data_{}", data_name)?;
        writeln!(writer, "#")?;
        writeln!(writer, "_entry.id {}", cif_value(&data_name))?;
        writeln!(writer, "#")?;

        writeln!(writer, "loop_")?;
        for column in ATOM_SITE_COLUMNS {
            writeln!(writer, "_atom_site.{}", column)?;
        }
        let mut serial = 0usize;
        for (entity, (_, chain)) in structure.chains_iter().enumerate() {
            for (seq_index, &residue_id) in chain.residues().iter().enumerate() {
                let Some(residue) = structure.residue(residue_id) else {
                    continue;
                };
                let ins_code = residue
                    .insertion_code
                    .map_or_else(|| "?".to_string(), |c| c.to_string());
                for &atom_id in residue.atoms() {
                    let Some(atom) = structure.atom(atom_id) else {
                        continue;
                    };
                    serial = if atom.serial > 0 { atom.serial } else { serial + 1 };
                    let alt = atom.alt_loc.map_or_else(|| ".".to_string(), |c| c.to_string());
                    let name = cif_value(&atom.name);
                    let comp = cif_value(&residue.name);
                    writeln!(
                        writer,
                        "{} {} {} {} {} {} {} {} {} {} {:.3} {:.3} {:.3} {:.2} {} {} {} {} {} 1",
                        if atom.hetero { "HETATM" } else { "ATOM" },
                        serial,
                        cif_value(&atom.element),
                        name,
                        alt,
                        comp,
                        chain.id,
                        entity + 1,
                        seq_index + 1,
                        ins_code,
                        atom.position.x,
                        atom.position.y,
                        atom.position.z,
                        atom.occupancy,
                        atom.b_factor,
                        residue.number,
                        comp,
                        chain.id,
                        name,
                    )?;
                }
            }
        }
        writeln!(writer, "#")?;

        if !metadata.attributes.is_empty() {
            writeln!(writer, "loop_")?;
            for column in ATTRIBUTE_COLUMNS {
                writeln!(writer, "{}.{}", ATTRIBUTES_CATEGORY, column)?;
            }
            for attr in &metadata.attributes {
                writeln!(
                    writer,
                    "{} {} {} {}",
                    cif_value(&attr.name),
                    cif_value(&attr.recipient),
                    cif_value(&attr.specifier),
                    cif_value(&attr.value)
                )?;
            }
            writeln!(writer, "#")?;
        }
        Ok(())
    }
}
