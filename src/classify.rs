use std::collections::{BTreeMap, HashMap, HashSet};

use regex::Regex;

use crate::domain::{Sample, capturing_regex, whole_string_regex};
use crate::error::KiraError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub control: bool,
    pub bait: String,
}

pub trait SampleClassifier {
    fn classify(&self, sample: &str) -> Classification;

    fn sample(&self, name: &str) -> Sample {
        let Classification { control, bait } = self.classify(name);
        Sample {
            name: name.to_string(),
            bait,
            control,
        }
    }
}

/// Controls match `control`; other samples take group 1 of `bait` as their bait,
/// or their own name when `bait` does not match.
#[derive(Debug, Clone)]
pub struct PatternClassifier {
    control: Regex,
    bait: Regex,
}

impl PatternClassifier {
    pub fn new(control: &str, bait: &str) -> Result<Self, KiraError> {
        Ok(Self {
            control: whole_string_regex(control)?,
            bait: capturing_regex(bait)?,
        })
    }
}

impl SampleClassifier for PatternClassifier {
    fn classify(&self, sample: &str) -> Classification {
        if self.control.is_match(sample) {
            return Classification {
                control: true,
                bait: sample.to_string(),
            };
        }
        let bait = self
            .bait
            .captures(sample)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
            .unwrap_or(sample);
        Classification {
            control: false,
            bait: bait.to_string(),
        }
    }
}

/// Samples listed under a bait take that bait; samples listed in `controls` are
/// controls; anything else is its own non-control bait.
#[derive(Debug, Clone, Default)]
pub struct MappingClassifier {
    baits: HashMap<String, String>,
    controls: HashSet<String>,
}

impl MappingClassifier {
    pub fn new(
        baits: &BTreeMap<String, Vec<String>>,
        controls: &[String],
    ) -> Result<Self, KiraError> {
        let mut by_sample = HashMap::new();
        for (bait, samples) in baits {
            for sample in samples {
                if let Some(previous) = by_sample.insert(sample.clone(), bait.clone()) {
                    return Err(KiraError::InvalidBaitMapping(format!(
                        "sample {sample} is listed under both {previous} and {bait}"
                    )));
                }
            }
        }
        let controls = controls.iter().cloned().collect::<HashSet<_>>();
        if let Some(sample) = controls.iter().find(|sample| by_sample.contains_key(*sample)) {
            return Err(KiraError::InvalidBaitMapping(format!(
                "sample {sample} is listed both as a control and under a bait"
            )));
        }
        Ok(Self {
            baits: by_sample,
            controls,
        })
    }
}

impl SampleClassifier for MappingClassifier {
    fn classify(&self, sample: &str) -> Classification {
        let bait = self
            .baits
            .get(sample)
            .map(String::as_str)
            .unwrap_or(sample);
        Classification {
            control: self.controls.contains(sample),
            bait: bait.to_string(),
        }
    }
}

/// Strategy chosen by configuration.
#[derive(Debug, Clone)]
pub enum Classifier {
    Pattern(PatternClassifier),
    Mapping(MappingClassifier),
}

impl SampleClassifier for Classifier {
    fn classify(&self, sample: &str) -> Classification {
        match self {
            Classifier::Pattern(classifier) => classifier.classify(sample),
            Classifier::Mapping(classifier) => classifier.classify(sample),
        }
    }
}
