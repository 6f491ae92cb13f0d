use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

use regex::Regex;
use tracing::debug;

use crate::error::KiraError;
use crate::fs_util;

/// Protein identifier to sequence length, in residues.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequenceLengthIndex {
    lengths: HashMap<String, u64>,
}

impl SequenceLengthIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, length: u64) {
        self.lengths.insert(id.into(), length);
    }

    pub fn get(&self, id: &str) -> Option<u64> {
        self.lengths.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.lengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lengths.is_empty()
    }

    pub fn lengths(&self) -> impl Iterator<Item = u64> + '_ {
        self.lengths.values().copied()
    }
}

impl<S: Into<String>> FromIterator<(S, u64)> for SequenceLengthIndex {
    fn from_iter<I: IntoIterator<Item = (S, u64)>>(iter: I) -> Self {
        let mut index = Self::new();
        for (id, length) in iter {
            index.insert(id, length);
        }
        index
    }
}

pub trait SequenceService {
    fn sequence_lengths(&self, path: &Path) -> Result<SequenceLengthIndex, KiraError>;
}

/// Reads FASTA files, plain or gzip-compressed.
#[derive(Debug, Clone, Default)]
pub struct FastaSequenceService {
    id_pattern: Option<Regex>,
}

impl FastaSequenceService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses capture group 1 of `pattern`, matched against the header without `>`,
    /// as the identifier. Headers that do not match fall back to the default rule.
    pub fn with_id_pattern(pattern: Regex) -> Self {
        Self {
            id_pattern: Some(pattern),
        }
    }

    pub fn read(&self, reader: impl BufRead) -> std::io::Result<SequenceLengthIndex> {
        let mut index = SequenceLengthIndex::new();
        let mut current: Option<(String, u64)> = None;
        for line in reader.lines() {
            let line = line?;
            if let Some(header) = line.strip_prefix('>') {
                if let Some((id, length)) = current.take() {
                    index.insert(id, length);
                }
                current = Some((self.identifier(header), 0));
            } else if let Some((_, length)) = current.as_mut() {
                *length += line.chars().filter(|ch| !ch.is_whitespace()).count() as u64;
            }
        }
        if let Some((id, length)) = current {
            index.insert(id, length);
        }
        Ok(index)
    }

    fn identifier(&self, header: &str) -> String {
        if let Some(id) = self
            .id_pattern
            .as_ref()
            .and_then(|pattern| pattern.captures(header))
            .and_then(|caps| caps.get(1))
        {
            return id.as_str().to_string();
        }
        default_identifier(header)
    }
}

impl SequenceService for FastaSequenceService {
    fn sequence_lengths(&self, path: &Path) -> Result<SequenceLengthIndex, KiraError> {
        let fasta_err = |err: std::io::Error| KiraError::FastaRead {
            path: path.to_path_buf(),
            message: err.to_string(),
        };
        let reader = fs_util::open_text(path).map_err(fasta_err)?;
        let index = self.read(reader).map_err(fasta_err)?;
        debug!("read {} sequences from {}", index.len(), path.display());
        Ok(index)
    }
}

/// `sp|P69905|HBA_HUMAN ...` gives `P69905`; anything else gives its first word.
pub fn default_identifier(header: &str) -> String {
    let token = header.split_whitespace().next().unwrap_or("");
    let mut parts = token.split('|');
    match (parts.next(), parts.next()) {
        (Some("sp" | "tr"), Some(accession)) if !accession.is_empty() => accession.to_string(),
        _ => token.to_string(),
    }
}
