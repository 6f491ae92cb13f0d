use std::collections::HashMap;
use std::path::Path;
use std::time::{Duration, Instant};

use camino::Utf8PathBuf;
use chrono::Utc;
use tracing::info;

use crate::classify::SampleClassifier;
use crate::domain::{Interaction, Prey, ProteinGroup, Sample, is_detected};
use crate::error::KiraError;
use crate::fasta::{SequenceLengthIndex, SequenceService};
use crate::fs_util;
use crate::maxquant::ProteinGroupReader;
use crate::report::{ConversionDiagnostics, ConversionReport, ConversionWarning, OutputFiles};
use crate::saint::{
    BAIT_FILE, INTERACTIONS_FILE, PREY_FILE, SaintBaitWriter, SaintInteractionWriter,
    SaintPreyWriter,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct ConvertOptions {
    pub dry_run: bool,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

/// Rows of the three SAINT files, in output order.
#[derive(Debug, Clone, PartialEq)]
pub struct SaintTables {
    pub samples: Vec<Sample>,
    pub preys: Vec<Prey>,
    pub interactions: Vec<Interaction>,
    pub average_length: u64,
}

/// Builds the SAINT tables from parsed protein groups.
///
/// The bait table is derived from the first group's samples, so an empty `groups`
/// fails with [`KiraError::NoProteinGroups`]. `lengths` is `None` when no reference
/// sequences were given, in which case every prey gets length 0.
pub fn assemble<C: SampleClassifier + ?Sized>(
    table: &Path,
    groups: &[ProteinGroup],
    lengths: Option<&SequenceLengthIndex>,
    classifier: &C,
    diagnostics: &mut ConversionDiagnostics,
) -> Result<SaintTables, KiraError> {
    let Some(first) = groups.first() else {
        diagnostics.warn(ConversionWarning::EmptyTable {
            path: table.display().to_string(),
        });
        return Err(KiraError::NoProteinGroups(table.to_path_buf()));
    };

    let samples = first
        .intensities
        .samples()
        .map(|name| classifier.sample(name))
        .collect::<Vec<_>>();
    if samples.is_empty() {
        diagnostics.warn(ConversionWarning::NoSampleColumns {
            path: table.display().to_string(),
        });
    }

    let empty = SequenceLengthIndex::new();
    let average_length = match lengths {
        Some(index) => average_length(groups, index, diagnostics),
        None => {
            diagnostics.warn(ConversionWarning::NoReferenceSequences);
            0
        }
    };
    let index = lengths.unwrap_or(&empty);

    let preys = groups
        .iter()
        .map(|group| {
            let id = group.prey_id();
            let length = match group_length(group, index) {
                Some(length) => length,
                None => {
                    diagnostics.fallback_length(&id, average_length);
                    average_length
                }
            };
            Prey {
                id,
                length,
                gene: group.gene(),
            }
        })
        .collect::<Vec<_>>();

    let mut classified = samples
        .iter()
        .map(|sample| (sample.name.clone(), sample.clone()))
        .collect::<HashMap<_, _>>();
    let mut interactions = Vec::new();
    for group in groups {
        let prey_id = group.prey_id();
        for (name, intensity) in group.intensities.iter() {
            if !is_detected(intensity) {
                continue;
            }
            let sample = classified
                .entry(name.to_string())
                .or_insert_with(|| classifier.sample(name))
                .clone();
            interactions.push(Interaction {
                sample,
                prey_id: prey_id.clone(),
                intensity,
            });
        }
    }

    Ok(SaintTables {
        samples,
        preys,
        interactions,
        average_length,
    })
}

/// Longest resolved sequence among the group's proteins.
pub fn group_length(group: &ProteinGroup, index: &SequenceLengthIndex) -> Option<u64> {
    group
        .protein_ids
        .iter()
        .filter_map(|id| index.get(id))
        .max()
}

/// Mean length of the table's resolvable proteins, else of the whole index.
pub fn average_length(
    groups: &[ProteinGroup],
    index: &SequenceLengthIndex,
    diagnostics: &mut ConversionDiagnostics,
) -> u64 {
    let resolved = groups
        .iter()
        .flat_map(|group| group.protein_ids.iter())
        .filter_map(|id| index.get(id));
    let mut average = rounded_mean(resolved);
    if average == 0 {
        average = rounded_mean(index.lengths());
    }
    if average == 0 {
        diagnostics.warn(ConversionWarning::NoResolvableLengths);
    }
    average
}

fn rounded_mean(values: impl Iterator<Item = u64>) -> u64 {
    let (sum, count) = values.fold((0u128, 0u64), |(sum, count), value| {
        (sum + u128::from(value), count + 1)
    });
    if count == 0 {
        return 0;
    }
    (sum as f64 / count as f64).round() as u64
}

/// `bait.txt`, `prey.txt` and `interactions.txt` next to `table`.
pub fn output_files(table: &Path) -> Result<OutputFiles, KiraError> {
    let table = utf8_path(table)?;
    let sibling = |name: &str| match table.parent() {
        Some(parent) => parent.join(name),
        None => Utf8PathBuf::from(name),
    };
    Ok(OutputFiles {
        bait: sibling(BAIT_FILE),
        prey: sibling(PREY_FILE),
        interactions: sibling(INTERACTIONS_FILE),
    })
}

fn utf8_path(path: &Path) -> Result<Utf8PathBuf, KiraError> {
    Utf8PathBuf::from_path_buf(path.to_path_buf())
        .map_err(|path| KiraError::Filesystem(format!("non UTF-8 path {}", path.display())))
}

/// Writes each table to its own file. A failure aborts the remaining files.
pub fn write_tables(outputs: &OutputFiles, tables: &SaintTables) -> Result<(), KiraError> {
    fs_util::write_atomic(outputs.bait.as_std_path(), |out| {
        let mut writer = SaintBaitWriter::new(out);
        for sample in &tables.samples {
            writer.write_sample(sample)?;
        }
        Ok(())
    })?;
    fs_util::write_atomic(outputs.prey.as_std_path(), |out| {
        let mut writer = SaintPreyWriter::new(out);
        for prey in &tables.preys {
            writer.write_prey(prey)?;
        }
        Ok(())
    })?;
    fs_util::write_atomic(outputs.interactions.as_std_path(), |out| {
        let mut writer = SaintInteractionWriter::new(out);
        for interaction in &tables.interactions {
            writer.write_interaction(interaction)?;
        }
        Ok(())
    })
}

/// Converts MaxQuant protein groups files to SAINT input files.
#[derive(Clone)]
pub struct Converter<R: ProteinGroupReader, S: SequenceService, C: SampleClassifier> {
    reader: R,
    sequences: S,
    classifier: C,
}

impl<R: ProteinGroupReader, S: SequenceService, C: SampleClassifier> Converter<R, S, C> {
    pub fn new(reader: R, sequences: S, classifier: C) -> Self {
        Self {
            reader,
            sequences,
            classifier,
        }
    }

    pub fn sequences(&self) -> &S {
        &self.sequences
    }

    pub fn convert(
        &self,
        table: &Path,
        fasta: Option<&Path>,
        options: ConvertOptions,
        sink: &dyn ProgressSink,
    ) -> Result<ConversionReport, KiraError> {
        let started = Instant::now();
        let outputs = output_files(table)?;
        let mut diagnostics = ConversionDiagnostics::new();

        sink.event(ProgressEvent {
            message: format!("phase=Parse; reading {}", table.display()),
            elapsed: None,
        });
        let groups = self.reader.protein_groups(table)?;

        let lengths = match fasta {
            Some(path) => {
                sink.event(ProgressEvent {
                    message: format!("phase=Resolve; reading {}", path.display()),
                    elapsed: Some(started.elapsed()),
                });
                Some(self.sequences.sequence_lengths(path)?)
            }
            None => None,
        };

        let tables = assemble(
            table,
            &groups,
            lengths.as_ref(),
            &self.classifier,
            &mut diagnostics,
        )?;

        if options.dry_run {
            info!("dry run, not writing SAINT files");
        } else {
            sink.event(ProgressEvent {
                message: format!(
                    "phase=Write; {} baits, {} preys, {} interactions",
                    tables.samples.len(),
                    tables.preys.len(),
                    tables.interactions.len()
                ),
                elapsed: Some(started.elapsed()),
            });
            write_tables(&outputs, &tables)?;
        }

        sink.event(ProgressEvent {
            message: "phase=Done".to_string(),
            elapsed: Some(started.elapsed()),
        });

        Ok(ConversionReport {
            input: utf8_path(table)?,
            fasta: fasta.map(utf8_path).transpose()?,
            outputs,
            written: !options.dry_run,
            baits: tables.samples.len(),
            preys: tables.preys.len(),
            interactions: tables.interactions.len(),
            average_length: tables.average_length,
            diagnostics,
            converted_at: Utc::now().to_rfc3339(),
        })
    }
}
