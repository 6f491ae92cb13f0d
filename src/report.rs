use std::fmt;

use camino::Utf8PathBuf;
use serde::Serialize;
use tracing::{info, warn};

/// Non-fatal conditions met while converting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConversionWarning {
    EmptyTable { path: String },
    NoSampleColumns { path: String },
    NoReferenceSequences,
    NoResolvableLengths,
}

impl fmt::Display for ConversionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionWarning::EmptyTable { path } => write!(f, "no protein groups in file {path}"),
            ConversionWarning::NoSampleColumns { path } => {
                write!(f, "no sample columns match the intensity mode in {path}")
            }
            ConversionWarning::NoReferenceSequences => {
                write!(f, "no FASTA file given, cannot find length of any proteins")
            }
            ConversionWarning::NoResolvableLengths => {
                write!(f, "cannot find length of any proteins")
            }
        }
    }
}

/// Collects what a conversion would otherwise only log, so callers can inspect it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConversionDiagnostics {
    pub warnings: Vec<ConversionWarning>,
    /// Preys whose length is the average fallback, with that length.
    pub fallback_lengths: Vec<FallbackLength>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FallbackLength {
    pub prey: String,
    pub length: u64,
}

impl ConversionDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, warning: ConversionWarning) {
        warn!("{warning}");
        self.warnings.push(warning);
    }

    pub fn fallback_length(&mut self, prey: &str, length: u64) {
        info!("using average length {length} for protein group {prey}");
        self.fallback_lengths.push(FallbackLength {
            prey: prey.to_string(),
            length,
        });
    }

    pub fn has_warning(&self, warning: &ConversionWarning) -> bool {
        self.warnings.contains(warning)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OutputFiles {
    pub bait: Utf8PathBuf,
    pub prey: Utf8PathBuf,
    pub interactions: Utf8PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversionReport {
    pub input: Utf8PathBuf,
    pub fasta: Option<Utf8PathBuf>,
    pub outputs: OutputFiles,
    pub written: bool,
    pub baits: usize,
    pub preys: usize,
    pub interactions: usize,
    pub average_length: u64,
    pub diagnostics: ConversionDiagnostics,
    pub converted_at: String,
}
