use std::fmt;

use clap::ValueEnum;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::KiraError;

/// Intensities whose absolute value is at or below this are "not detected".
pub const DELTA: f64 = 1e-10;

/// Separator of list-valued cells in the input and of joined ids in the output.
pub const ELEMENT_SEPARATOR: &str = ";";

/// Which family of MaxQuant sample columns feeds the interaction table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum IntensityMode {
    Lfq,
    Intensity,
    MsmsCount,
    Peptides,
    RazorUniquePeptides,
    UniquePeptides,
    SequenceCoverage,
}

impl IntensityMode {
    pub fn default_pattern(self) -> &'static str {
        match self {
            IntensityMode::Lfq => "LFQ intensity (.*)",
            IntensityMode::Intensity => "Intensity (.*)",
            IntensityMode::MsmsCount => "MS/MS count (.*)",
            IntensityMode::Peptides => "Peptides (.*)",
            IntensityMode::RazorUniquePeptides => r"Razor \+ unique peptides (.*)",
            IntensityMode::UniquePeptides => "Unique peptides (.*)",
            IntensityMode::SequenceCoverage => r"Sequence coverage (.*) \[%\]",
        }
    }
}

impl fmt::Display for IntensityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntensityMode::Lfq => write!(f, "lfq"),
            IntensityMode::Intensity => write!(f, "intensity"),
            IntensityMode::MsmsCount => write!(f, "msms-count"),
            IntensityMode::Peptides => write!(f, "peptides"),
            IntensityMode::RazorUniquePeptides => write!(f, "razor-unique-peptides"),
            IntensityMode::UniquePeptides => write!(f, "unique-peptides"),
            IntensityMode::SequenceCoverage => write!(f, "sequence-coverage"),
        }
    }
}

/// Per-sample values of one protein group, in column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Intensities(Vec<(String, f64)>);

impl Intensities {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, sample: impl Into<String>, value: f64) {
        self.0.push((sample.into(), value));
    }

    pub fn get(&self, sample: &str) -> Option<f64> {
        self.0
            .iter()
            .find(|(name, _)| name == sample)
            .map(|(_, value)| *value)
    }

    pub fn samples(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(name, value)| (name.as_str(), *value))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for Intensities {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(name, value)| (name.into(), value))
                .collect(),
        )
    }
}

/// One row of a MaxQuant protein groups table.
#[derive(Debug, Clone, PartialEq)]
pub struct ProteinGroup {
    pub protein_ids: Vec<String>,
    pub gene_names: Vec<String>,
    pub intensities: Intensities,
}

impl ProteinGroup {
    /// Canonical prey key: all protein ids joined with [`ELEMENT_SEPARATOR`].
    pub fn prey_id(&self) -> String {
        self.protein_ids.join(ELEMENT_SEPARATOR)
    }

    pub fn gene(&self) -> String {
        self.gene_names.join(ELEMENT_SEPARATOR)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sample {
    pub name: String,
    pub bait: String,
    pub control: bool,
}

impl Sample {
    pub fn type_code(&self) -> &'static str {
        if self.control { "C" } else { "T" }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prey {
    pub id: String,
    pub length: u64,
    pub gene: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Interaction {
    pub sample: Sample,
    pub prey_id: String,
    pub intensity: f64,
}

pub fn is_detected(value: f64) -> bool {
    value.abs() > DELTA
}

/// Compiles `pattern` so that it only matches a whole string.
pub fn whole_string_regex(pattern: &str) -> Result<Regex, KiraError> {
    Regex::new(&format!("^(?:{pattern})$")).map_err(|err| KiraError::InvalidPattern {
        pattern: pattern.to_string(),
        message: err.to_string(),
    })
}

/// Like [`whole_string_regex`], but also requires a first capture group.
pub fn capturing_regex(pattern: &str) -> Result<Regex, KiraError> {
    let regex = whole_string_regex(pattern)?;
    if regex.captures_len() < 2 {
        return Err(KiraError::InvalidPattern {
            pattern: pattern.to_string(),
            message: "expected a capture group".to_string(),
        });
    }
    Ok(regex)
}
