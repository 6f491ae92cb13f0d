use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum KiraError {
    #[error("missing config file {0}")]
    MissingConfig(PathBuf),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("config file already exists: {0}")]
    ConfigExists(PathBuf),

    #[error("invalid regular expression `{pattern}`: {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("invalid bait mapping: {0}")]
    InvalidBaitMapping(String),

    #[error("invalid column delimiter: {0:?}")]
    InvalidDelimiter(String),

    #[error("failed to read table {path}: {message}")]
    TableRead { path: PathBuf, message: String },

    #[error("column `{column}` not found in header of {path}")]
    MissingColumn { path: PathBuf, column: String },

    #[error("sample `{sample}` appears in more than one column of {path}")]
    DuplicateSample { path: PathBuf, sample: String },

    #[error("invalid number `{value}` in {path}, line {line}, column `{column}`")]
    InvalidNumber {
        path: PathBuf,
        line: u64,
        column: String,
        value: String,
    },

    #[error("no protein id in {path}, line {line}")]
    EmptyProteinIds { path: PathBuf, line: u64 },

    #[error("no protein groups in file {0}")]
    NoProteinGroups(PathBuf),

    #[error("failed to read FASTA file {path}: {message}")]
    FastaRead { path: PathBuf, message: String },

    #[error("could not write {path}: {message}")]
    Write { path: PathBuf, message: String },

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
