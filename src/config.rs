use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, de};

use crate::classify::{Classifier, MappingClassifier, PatternClassifier};
use crate::domain::IntensityMode;
use crate::error::KiraError;
use crate::maxquant::{GENE_NAMES_HEADER, PROTEIN_IDS_HEADER, TableLayout};

pub const CONFIG_FILE: &str = "kira-saint.json";
pub const DEFAULT_CONTROL: &str = ".*[Cc]ontrol.*";
pub const DEFAULT_BAIT: &str = r"(.*)_\d+";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub intensity: Option<IntensityMode>,
    #[serde(default)]
    pub delimiter: Option<String>,
    #[serde(default)]
    pub headers: HeaderConfig,
    #[serde(default)]
    pub samples: Option<SampleRules>,
    #[serde(default)]
    pub fasta: FastaConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct HeaderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protein_ids: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gene_names: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lfq: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intensity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msms_count: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peptides: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub razor_unique_peptides: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_peptides: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence_coverage: Option<String>,
}

impl HeaderConfig {
    pub fn sample_pattern(&self, mode: IntensityMode) -> &str {
        let configured = match mode {
            IntensityMode::Lfq => &self.lfq,
            IntensityMode::Intensity => &self.intensity,
            IntensityMode::MsmsCount => &self.msms_count,
            IntensityMode::Peptides => &self.peptides,
            IntensityMode::RazorUniquePeptides => &self.razor_unique_peptides,
            IntensityMode::UniquePeptides => &self.unique_peptides,
            IntensityMode::SequenceCoverage => &self.sequence_coverage,
        };
        configured
            .as_deref()
            .unwrap_or_else(|| mode.default_pattern())
    }

    fn with_defaults() -> Self {
        let pattern = |mode: IntensityMode| Some(mode.default_pattern().to_string());
        Self {
            protein_ids: Some(PROTEIN_IDS_HEADER.to_string()),
            gene_names: Some(GENE_NAMES_HEADER.to_string()),
            lfq: pattern(IntensityMode::Lfq),
            intensity: pattern(IntensityMode::Intensity),
            msms_count: pattern(IntensityMode::MsmsCount),
            peptides: pattern(IntensityMode::Peptides),
            razor_unique_peptides: pattern(IntensityMode::RazorUniquePeptides),
            unique_peptides: pattern(IntensityMode::UniquePeptides),
            sequence_coverage: pattern(IntensityMode::SequenceCoverage),
        }
    }
}

/// A `baits` key selects the explicit mapping, otherwise the pattern rules apply.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum SampleRules {
    Mapping {
        baits: BTreeMap<String, Vec<String>>,
        controls: Vec<String>,
    },
    Pattern {
        #[serde(skip_serializing_if = "Option::is_none")]
        control: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        bait: Option<String>,
    },
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSampleRules {
    #[serde(default)]
    baits: Option<BTreeMap<String, Vec<String>>>,
    #[serde(default)]
    controls: Option<Vec<String>>,
    #[serde(default)]
    control: Option<String>,
    #[serde(default)]
    bait: Option<String>,
}

impl TryFrom<RawSampleRules> for SampleRules {
    type Error = String;

    fn try_from(raw: RawSampleRules) -> Result<Self, Self::Error> {
        match raw.baits {
            Some(baits) => {
                if raw.control.is_some() || raw.bait.is_some() {
                    return Err("`baits` cannot be combined with `control` or `bait`".to_string());
                }
                Ok(SampleRules::Mapping {
                    baits,
                    controls: raw.controls.unwrap_or_default(),
                })
            }
            None if raw.controls.is_some() => Err("`controls` requires `baits`".to_string()),
            None => Ok(SampleRules::Pattern {
                control: raw.control,
                bait: raw.bait,
            }),
        }
    }
}

impl<'de> Deserialize<'de> for SampleRules {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawSampleRules::deserialize(deserializer)?;
        SampleRules::try_from(raw).map_err(de::Error::custom)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FastaConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_pattern: Option<String>,
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub intensity: Option<IntensityMode>,
    pub control: Option<String>,
    pub bait: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub intensity: IntensityMode,
    pub layout: TableLayout,
    pub classifier: Classifier,
    pub fasta_id_pattern: Option<Regex>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads `path`, or else `kira-saint.json` in the working directory, or else the
    /// user config file. Without any of them the defaults apply.
    pub fn resolve(
        path: Option<&str>,
        overrides: ConfigOverrides,
    ) -> Result<ResolvedConfig, KiraError> {
        let config = match Self::locate(path)? {
            Some(config_path) => Self::load(&config_path)?,
            None => Config::default(),
        };
        Self::resolve_config(config, overrides)
    }

    fn locate(path: Option<&str>) -> Result<Option<PathBuf>, KiraError> {
        if let Some(path) = path {
            let path = PathBuf::from(path);
            if !path.exists() {
                return Err(KiraError::MissingConfig(path));
            }
            return Ok(Some(path));
        }
        let local = PathBuf::from(CONFIG_FILE);
        if local.exists() {
            return Ok(Some(local));
        }
        Ok(user_config_path().filter(|path| path.exists()))
    }

    pub fn load(path: &Path) -> Result<Config, KiraError> {
        let content =
            fs::read_to_string(path).map_err(|_| KiraError::ConfigRead(path.to_path_buf()))?;
        serde_json::from_str(&content).map_err(|err| KiraError::ConfigParse(err.to_string()))
    }

    pub fn resolve_config(
        config: Config,
        overrides: ConfigOverrides,
    ) -> Result<ResolvedConfig, KiraError> {
        let schema_version = config.schema_version.unwrap_or(1);
        let intensity = overrides
            .intensity
            .or(config.intensity)
            .unwrap_or(IntensityMode::Lfq);
        let delimiter = parse_delimiter(config.delimiter.as_deref())?;

        let headers = &config.headers;
        let layout = TableLayout::new(
            headers.protein_ids.as_deref().unwrap_or(PROTEIN_IDS_HEADER),
            headers.gene_names.as_deref().unwrap_or(GENE_NAMES_HEADER),
            headers.sample_pattern(intensity),
            delimiter,
        )?;

        let pattern_override = overrides.control.is_some() || overrides.bait.is_some();
        let classifier = match config.samples {
            Some(SampleRules::Mapping { baits, controls }) if !pattern_override => {
                Classifier::Mapping(MappingClassifier::new(&baits, &controls)?)
            }
            Some(SampleRules::Pattern { control, bait }) => {
                Classifier::Pattern(PatternClassifier::new(
                    overrides
                        .control
                        .as_deref()
                        .or(control.as_deref())
                        .unwrap_or(DEFAULT_CONTROL),
                    overrides
                        .bait
                        .as_deref()
                        .or(bait.as_deref())
                        .unwrap_or(DEFAULT_BAIT),
                )?)
            }
            _ => Classifier::Pattern(PatternClassifier::new(
                overrides.control.as_deref().unwrap_or(DEFAULT_CONTROL),
                overrides.bait.as_deref().unwrap_or(DEFAULT_BAIT),
            )?),
        };

        let fasta_id_pattern = config
            .fasta
            .id_pattern
            .as_deref()
            .map(|pattern| {
                Regex::new(pattern).map_err(|err| KiraError::InvalidPattern {
                    pattern: pattern.to_string(),
                    message: err.to_string(),
                })
            })
            .transpose()?;

        Ok(ResolvedConfig {
            schema_version,
            intensity,
            layout,
            classifier,
            fasta_id_pattern,
        })
    }
}

/// The configuration `kira-saint init` writes.
pub fn default_config() -> Config {
    Config {
        schema_version: Some(1),
        intensity: Some(IntensityMode::Lfq),
        delimiter: Some("\t".to_string()),
        headers: HeaderConfig::with_defaults(),
        samples: Some(SampleRules::Pattern {
            control: Some(DEFAULT_CONTROL.to_string()),
            bait: Some(DEFAULT_BAIT.to_string()),
        }),
        fasta: FastaConfig::default(),
    }
}

pub fn user_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "kira-saint").map(|dirs| dirs.config_dir().join("config.json"))
}

fn parse_delimiter(value: Option<&str>) -> Result<u8, KiraError> {
    let Some(value) = value else {
        return Ok(b'\t');
    };
    let unescaped = match value {
        "\\t" | "tab" => "\t",
        other => other,
    };
    match unescaped.as_bytes() {
        [byte] if byte.is_ascii() => Ok(*byte),
        _ => Err(KiraError::InvalidDelimiter(value.to_string())),
    }
}
