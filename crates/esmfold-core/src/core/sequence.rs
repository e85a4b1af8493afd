use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SequenceError {
    #[error("Sequence '{name}' is empty")]
    Empty { name: String },
    #[error("Sequence '{name}' has invalid character '{character}' at position {position}")]
    InvalidCharacter {
        name: String,
        character: char,
        position: usize,
    },
    #[error("Sequence '{name}' starts with a gap character")]
    LeadingGap { name: String },
    #[error("Sequence name must not be empty")]
    EmptyName,
    #[error("FASTA input contains no record")]
    NoRecord,
    #[error("FASTA line {line} appears before the first '>' header")]
    MissingHeader { line: usize },
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// An amino-acid sequence submitted for prediction.
///
/// Residues are kept as given. Non-standard one-letter codes such as `B`, `J`,
/// `O`, `U`, `X` and `Z`, gap characters and `*` are accepted and passed to the
/// model untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    name: String,
    description: Option<String>,
    residues: String,
}

fn is_residue_char(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '*' || c == '-'
}

impl Sequence {
    /// Creates a sequence, dropping whitespace from `residues`.
    ///
    /// A leading `-` is rejected: the inference script would read the
    /// sequence argument as an option.
    pub fn new(name: impl Into<String>, residues: &str) -> Result<Self, SequenceError> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(SequenceError::EmptyName);
        }
        let residues: String = residues.chars().filter(|c| !c.is_whitespace()).collect();
        if residues.is_empty() {
            return Err(SequenceError::Empty { name });
        }
        if let Some((position, character)) =
            residues.chars().enumerate().find(|(_, c)| !is_residue_char(*c))
        {
            return Err(SequenceError::InvalidCharacter {
                name,
                character,
                position: position + 1,
            });
        }
        if residues.starts_with('-') {
            return Err(SequenceError::LeadingGap { name });
        }
        Ok(Self {
            name,
            description: None,
            residues,
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        let description = description.into();
        self.description = (!description.trim().is_empty()).then(|| description.trim().to_string());
        self
    }

    /// Reads the first record of a FASTA document.
    ///
    /// The header's first word becomes the name, the remainder the description.
    /// Blank lines and `;` comment lines are ignored.
    pub fn from_fasta(reader: impl BufRead) -> Result<Self, SequenceError> {
        let mut header: Option<String> = None;
        let mut residues = String::new();

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with(';') {
                continue;
            }
            if let Some(rest) = trimmed.strip_prefix('>') {
                if header.is_some() {
                    break;
                }
                header = Some(rest.trim().to_string());
                continue;
            }
            if header.is_none() {
                return Err(SequenceError::MissingHeader { line: index + 1 });
            }
            residues.push_str(trimmed);
        }

        let header = header.ok_or(SequenceError::NoRecord)?;
        let (name, description) = match header.split_once(char::is_whitespace) {
            Some((name, description)) => (name.to_string(), description.to_string()),
            None => (header.clone(), String::new()),
        };
        Ok(Self::new(name, &residues)?.with_description(description))
    }

    pub fn from_fasta_path<P: AsRef<Path>>(path: P) -> Result<Self, SequenceError> {
        let file = File::open(path)?;
        Self::from_fasta(BufReader::new(file))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn residues(&self) -> &str {
        &self.residues
    }

    pub fn len(&self) -> usize {
        self.residues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.residues.is_empty()
    }

    /// The name with every character outside `[A-Za-z0-9_.-]` replaced by `_`.
    pub fn file_stem(&self) -> String {
        self.name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ">{}", self.name)?;
        if let Some(description) = &self.description {
            write!(f, " {}", description)?;
        }
        write!(f, "\n{}", self.residues)
    }
}
