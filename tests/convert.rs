use std::fs;
use std::path::Path;
use std::sync::Mutex;

use assert_matches::assert_matches;

use kira_saint::classify::PatternClassifier;
use kira_saint::convert::{ConvertOptions, Converter, assemble};
use kira_saint::domain::{Intensities, IntensityMode, ProteinGroup};
use kira_saint::error::KiraError;
use kira_saint::fasta::{FastaSequenceService, SequenceLengthIndex, SequenceService};
use kira_saint::maxquant::{MaxquantReader, ProteinGroupReader, TableLayout};
use kira_saint::output::JsonOutput;
use kira_saint::report::{ConversionDiagnostics, ConversionWarning};

struct MockReader {
    groups: Vec<ProteinGroup>,
}

impl ProteinGroupReader for MockReader {
    fn protein_groups(&self, _path: &Path) -> Result<Vec<ProteinGroup>, KiraError> {
        Ok(self.groups.clone())
    }
}

#[derive(Default)]
struct MockSequences {
    index: SequenceLengthIndex,
    calls: Mutex<usize>,
}

impl SequenceService for MockSequences {
    fn sequence_lengths(&self, _path: &Path) -> Result<SequenceLengthIndex, KiraError> {
        let mut guard = self.calls.lock().unwrap();
        *guard += 1;
        Ok(self.index.clone())
    }
}

fn group(ids: &[&str], genes: &[&str], values: &[(&str, f64)]) -> ProteinGroup {
    ProteinGroup {
        protein_ids: ids.iter().map(|id| id.to_string()).collect(),
        gene_names: genes.iter().map(|gene| gene.to_string()).collect(),
        intensities: values.iter().copied().collect::<Intensities>(),
    }
}

fn lfq_classifier() -> PatternClassifier {
    PatternClassifier::new("matches-nothing", "(.+)_LFQ").unwrap()
}

#[test]
fn single_group_scenario() {
    let groups = vec![group(
        &["P1", "P2"],
        &["G1"],
        &[("S1_LFQ", 5.2), ("S2_LFQ", 0.0)],
    )];
    let index: SequenceLengthIndex = [("P1", 100), ("P2", 200)].into_iter().collect();
    let mut diagnostics = ConversionDiagnostics::new();

    let tables = assemble(
        Path::new("proteinGroups.txt"),
        &groups,
        Some(&index),
        &lfq_classifier(),
        &mut diagnostics,
    )
    .unwrap();

    let baits = tables
        .samples
        .iter()
        .map(|sample| (sample.name.as_str(), sample.bait.as_str(), sample.type_code()))
        .collect::<Vec<_>>();
    assert_eq!(baits, vec![("S1_LFQ", "S1", "T"), ("S2_LFQ", "S2", "T")]);

    assert_eq!(tables.preys.len(), 1);
    assert_eq!(tables.preys[0].id, "P1;P2");
    assert_eq!(tables.preys[0].length, 200);
    assert_eq!(tables.preys[0].gene, "G1");

    assert_eq!(tables.interactions.len(), 1);
    assert_eq!(tables.interactions[0].sample.name, "S1_LFQ");
    assert_eq!(tables.interactions[0].sample.bait, "S1");
    assert_eq!(tables.interactions[0].prey_id, "P1;P2");
    assert_eq!(tables.interactions[0].intensity, 5.2);
    assert!(diagnostics.warnings.is_empty());
    assert!(diagnostics.fallback_lengths.is_empty());
}

#[test]
fn without_reference_sequences_lengths_are_zero_and_warned_once() {
    let groups = vec![
        group(&["P1"], &[], &[("S1_LFQ", 1.0)]),
        group(&["P2"], &[], &[("S1_LFQ", 2.0)]),
        group(&["P3"], &[], &[("S1_LFQ", 3.0)]),
    ];
    let mut diagnostics = ConversionDiagnostics::new();

    let tables = assemble(
        Path::new("proteinGroups.txt"),
        &groups,
        None,
        &lfq_classifier(),
        &mut diagnostics,
    )
    .unwrap();

    assert!(tables.preys.iter().all(|prey| prey.length == 0));
    assert_eq!(
        diagnostics.warnings,
        vec![ConversionWarning::NoReferenceSequences]
    );
    assert_eq!(diagnostics.fallback_lengths.len(), 3);
}

#[test]
fn unresolved_group_uses_average_of_resolved_proteins() {
    let groups = vec![
        group(&["P1"], &[], &[("S1_LFQ", 1.0)]),
        group(&["P2", "P3"], &[], &[("S1_LFQ", 1.0)]),
        group(&["UNKNOWN"], &[], &[("S1_LFQ", 1.0)]),
    ];
    let index: SequenceLengthIndex = [("P1", 100), ("P2", 150), ("P3", 301), ("P9", 9000)]
        .into_iter()
        .collect();
    let mut diagnostics = ConversionDiagnostics::new();

    let tables = assemble(
        Path::new("proteinGroups.txt"),
        &groups,
        Some(&index),
        &lfq_classifier(),
        &mut diagnostics,
    )
    .unwrap();

    // (100 + 150 + 301) / 3 = 183.67
    assert_eq!(tables.average_length, 184);
    let lengths = tables.preys.iter().map(|prey| prey.length).collect::<Vec<_>>();
    assert_eq!(lengths, vec![100, 301, 184]);
    assert_eq!(diagnostics.fallback_lengths.len(), 1);
    assert_eq!(diagnostics.fallback_lengths[0].prey, "UNKNOWN");
}

#[test]
fn interactions_bounded_by_groups_times_samples() {
    let groups = vec![
        group(&["P1"], &[], &[("A_LFQ", 1.0), ("B_LFQ", 0.0), ("C_LFQ", -2.0)]),
        group(&["P2"], &[], &[("A_LFQ", 1e-11), ("B_LFQ", 4.0), ("C_LFQ", 1e-9)]),
    ];
    let mut diagnostics = ConversionDiagnostics::new();
    let tables = assemble(
        Path::new("proteinGroups.txt"),
        &groups,
        None,
        &lfq_classifier(),
        &mut diagnostics,
    )
    .unwrap();

    assert!(tables.interactions.len() <= groups.len() * tables.samples.len());
    let rows = tables
        .interactions
        .iter()
        .map(|row| (row.prey_id.as_str(), row.sample.name.as_str()))
        .collect::<Vec<_>>();
    assert_eq!(
        rows,
        vec![("P1", "A_LFQ"), ("P1", "C_LFQ"), ("P2", "B_LFQ"), ("P2", "C_LFQ")]
    );
}

#[test]
fn no_protein_groups_is_fatal() {
    let mut diagnostics = ConversionDiagnostics::new();
    let err = assemble(
        Path::new("empty.txt"),
        &[],
        None,
        &lfq_classifier(),
        &mut diagnostics,
    )
    .unwrap_err();
    assert_matches!(err, KiraError::NoProteinGroups(_));
    assert_eq!(
        diagnostics.warnings,
        vec![ConversionWarning::EmptyTable {
            path: "empty.txt".to_string()
        }]
    );
}

#[test]
fn converter_skips_sequences_without_fasta() {
    let temp = tempfile::tempdir().unwrap();
    let table = temp.path().join("proteinGroups.txt");
    let converter = Converter::new(
        MockReader {
            groups: vec![group(&["P1"], &["G1"], &[("S1_LFQ", 5.0)])],
        },
        MockSequences::default(),
        lfq_classifier(),
    );

    let report = converter
        .convert(&table, None, ConvertOptions::default(), &JsonOutput)
        .unwrap();

    assert!(report.written);
    assert_eq!((report.baits, report.preys, report.interactions), (1, 1, 1));
    assert_eq!(*converter_calls(&converter), 0);
    assert_eq!(
        fs::read_to_string(temp.path().join("prey.txt")).unwrap(),
        "P1\t0\tG1\n"
    );
}

fn converter_calls(
    converter: &Converter<MockReader, MockSequences, PatternClassifier>,
) -> std::sync::MutexGuard<'_, usize> {
    converter.sequences().calls.lock().unwrap()
}

#[test]
fn dry_run_writes_nothing() {
    let temp = tempfile::tempdir().unwrap();
    let table = temp.path().join("proteinGroups.txt");
    let converter = Converter::new(
        MockReader {
            groups: vec![group(&["P1"], &[], &[("S1_LFQ", 5.0)])],
        },
        MockSequences::default(),
        lfq_classifier(),
    );

    let report = converter
        .convert(
            &table,
            Some(Path::new("db.fasta")),
            ConvertOptions { dry_run: true },
            &JsonOutput,
        )
        .unwrap();

    assert!(!report.written);
    assert_eq!(*converter_calls(&converter), 1);
    assert!(!temp.path().join("bait.txt").exists());
    assert!(!temp.path().join("prey.txt").exists());
    assert!(!temp.path().join("interactions.txt").exists());
}

const TABLE: &str = "\
Protein IDs\tMajority protein IDs\tGene names\tLFQ intensity Bait_1\tLFQ intensity Bait_2\tLFQ intensity Control_1
P1;P2\tP1\tG1;G2\t1200.5\t0\t15
P3\tP3\t\t0\t0\t0
UNK1\tUNK1\tG9\t7\t8.25\t0
";

const FASTA: &str = "\
>sp|P1|ONE_HUMAN first
MAAAAAAAAA
>sp|P2|TWO_HUMAN second
MAAAAAAAAA
MAAAAAAAAA
>sp|P3|THREE_HUMAN third
MAAAAA
";

#[test]
fn converts_files_on_disk() {
    let temp = tempfile::tempdir().unwrap();
    let table = temp.path().join("proteinGroups.txt");
    let fasta = temp.path().join("human.fasta");
    fs::write(&table, TABLE).unwrap();
    fs::write(&fasta, FASTA).unwrap();

    let converter = Converter::new(
        MaxquantReader::new(TableLayout::maxquant(IntensityMode::Lfq).unwrap()),
        FastaSequenceService::new(),
        PatternClassifier::new(".*Control.*", "(.*)_\\d+").unwrap(),
    );
    let report = converter
        .convert(
            &table,
            Some(fasta.as_path()),
            ConvertOptions::default(),
            &JsonOutput,
        )
        .unwrap();

    assert_eq!(
        fs::read_to_string(temp.path().join("bait.txt")).unwrap(),
        "Bait_1\tBait\tT\nBait_2\tBait\tT\nControl_1\tControl_1\tC\n"
    );
    // P1 = 10, P2 = 20, P3 = 6: average of resolved ids (10 + 20 + 6) / 3 = 12
    assert_eq!(
        fs::read_to_string(temp.path().join("prey.txt")).unwrap(),
        "P1;P2\t20\tG1;G2\nP3\t6\t\nUNK1\t12\tG9\n"
    );
    assert_eq!(
        fs::read_to_string(temp.path().join("interactions.txt")).unwrap(),
        "Bait_1\tBait\tP1;P2\t1200.5\n\
         Control_1\tControl_1\tP1;P2\t15\n\
         Bait_1\tBait\tUNK1\t7\n\
         Bait_2\tBait\tUNK1\t8.25\n"
    );
    assert_eq!(report.average_length, 12);
    assert!(report.diagnostics.warnings.is_empty());
}

#[test]
fn rerun_is_byte_identical() {
    let temp = tempfile::tempdir().unwrap();
    let table = temp.path().join("proteinGroups.txt");
    fs::write(&table, TABLE).unwrap();
    let converter = Converter::new(
        MaxquantReader::new(TableLayout::maxquant(IntensityMode::Lfq).unwrap()),
        FastaSequenceService::new(),
        PatternClassifier::new(".*Control.*", "(.*)_\\d+").unwrap(),
    );

    let read_all = || {
        ["bait.txt", "prey.txt", "interactions.txt"]
            .map(|name| fs::read(temp.path().join(name)).unwrap())
    };
    converter
        .convert(&table, None, ConvertOptions::default(), &JsonOutput)
        .unwrap();
    let first = read_all();
    converter
        .convert(&table, None, ConvertOptions::default(), &JsonOutput)
        .unwrap();
    assert_eq!(first, read_all());
}

#[test]
fn malformed_table_writes_nothing() {
    let temp = tempfile::tempdir().unwrap();
    let table = temp.path().join("proteinGroups.txt");
    fs::write(
        &table,
        "Protein IDs\tGene names\tLFQ intensity S1\nP1\tG1\t12\nP2\tG2\tn/a\n",
    )
    .unwrap();
    let converter = Converter::new(
        MaxquantReader::new(TableLayout::maxquant(IntensityMode::Lfq).unwrap()),
        FastaSequenceService::new(),
        lfq_classifier(),
    );

    let err = converter
        .convert(&table, None, ConvertOptions::default(), &JsonOutput)
        .unwrap_err();

    assert_matches!(err, KiraError::InvalidNumber { line: 3, .. });
    assert!(!temp.path().join("bait.txt").exists());
}

#[test]
fn missing_fasta_is_fatal() {
    let temp = tempfile::tempdir().unwrap();
    let table = temp.path().join("proteinGroups.txt");
    fs::write(&table, TABLE).unwrap();
    let converter = Converter::new(
        MaxquantReader::new(TableLayout::maxquant(IntensityMode::Lfq).unwrap()),
        FastaSequenceService::new(),
        lfq_classifier(),
    );

    let err = converter
        .convert(
            &table,
            Some(temp.path().join("missing.fasta").as_path()),
            ConvertOptions::default(),
            &JsonOutput,
        )
        .unwrap_err();
    assert_matches!(err, KiraError::FastaRead { .. });
}
