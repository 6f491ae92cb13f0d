use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};
use regex::Regex;
use tracing::info;

use crate::domain::{
    ELEMENT_SEPARATOR, Intensities, IntensityMode, ProteinGroup, capturing_regex,
};
use crate::error::KiraError;
use crate::fs_util;

pub const PROTEIN_IDS_HEADER: &str = "Protein IDs";
pub const GENE_NAMES_HEADER: &str = "Gene names";

/// Which columns of a protein groups table are read, and how it is split.
#[derive(Debug, Clone)]
pub struct TableLayout {
    protein_ids: String,
    gene_names: String,
    samples: Regex,
    delimiter: u8,
}

impl TableLayout {
    /// `sample_pattern` must match a whole header and capture the sample name in group 1.
    pub fn new(
        protein_ids: impl Into<String>,
        gene_names: impl Into<String>,
        sample_pattern: &str,
        delimiter: u8,
    ) -> Result<Self, KiraError> {
        Ok(Self {
            protein_ids: protein_ids.into(),
            gene_names: gene_names.into(),
            samples: capturing_regex(sample_pattern)?,
            delimiter,
        })
    }

    /// Default MaxQuant headers, tab separated.
    pub fn maxquant(mode: IntensityMode) -> Result<Self, KiraError> {
        Self::new(
            PROTEIN_IDS_HEADER,
            GENE_NAMES_HEADER,
            mode.default_pattern(),
            b'\t',
        )
    }

    fn columns(&self, path: &Path, headers: &StringRecord) -> Result<Columns, KiraError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|header| header.trim() == name)
                .ok_or_else(|| KiraError::MissingColumn {
                    path: path.to_path_buf(),
                    column: name.to_string(),
                })
        };
        let protein_ids = find(self.protein_ids.as_str())?;
        let gene_names = find(self.gene_names.as_str())?;

        let mut seen = HashSet::new();
        let mut samples = Vec::new();
        for (index, header) in headers.iter().enumerate() {
            let Some(sample) = self
                .samples
                .captures(header.trim())
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_string())
            else {
                continue;
            };
            if !seen.insert(sample.clone()) {
                return Err(KiraError::DuplicateSample {
                    path: path.to_path_buf(),
                    sample,
                });
            }
            samples.push(SampleColumn {
                index,
                header: header.to_string(),
                sample,
            });
        }

        Ok(Columns {
            protein_ids,
            gene_names,
            samples,
        })
    }
}

struct Columns {
    protein_ids: usize,
    gene_names: usize,
    samples: Vec<SampleColumn>,
}

struct SampleColumn {
    index: usize,
    header: String,
    sample: String,
}

pub trait ProteinGroupReader {
    fn protein_groups(&self, path: &Path) -> Result<Vec<ProteinGroup>, KiraError>;
}

#[derive(Debug, Clone)]
pub struct MaxquantReader {
    layout: TableLayout,
}

impl MaxquantReader {
    pub fn new(layout: TableLayout) -> Self {
        Self { layout }
    }

    /// Parses a whole table. `path` is only used to label errors.
    pub fn read(&self, path: &Path, input: impl Read) -> Result<Vec<ProteinGroup>, KiraError> {
        let table_err = |err: csv::Error| KiraError::TableRead {
            path: path.to_path_buf(),
            message: err.to_string(),
        };
        let mut reader = ReaderBuilder::new()
            .delimiter(self.layout.delimiter)
            .has_headers(true)
            .quoting(false)
            .from_reader(input);

        let headers = reader.headers().map_err(table_err)?.clone();
        let columns = self.layout.columns(path, &headers)?;

        let mut groups = Vec::new();
        for (index, record) in reader.records().enumerate() {
            let record = record.map_err(table_err)?;
            let line = record
                .position()
                .map(|pos| pos.line())
                .unwrap_or(index as u64 + 2);
            groups.push(parse_group(path, line, &record, &columns)?);
        }
        Ok(groups)
    }
}

impl ProteinGroupReader for MaxquantReader {
    fn protein_groups(&self, path: &Path) -> Result<Vec<ProteinGroup>, KiraError> {
        let input = fs_util::open_text(path).map_err(|err| KiraError::TableRead {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        let groups = self.read(path, input)?;
        info!("parsed {} protein groups from {}", groups.len(), path.display());
        Ok(groups)
    }
}

fn parse_group(
    path: &Path,
    line: u64,
    record: &StringRecord,
    columns: &Columns,
) -> Result<ProteinGroup, KiraError> {
    let protein_ids = split_list(record.get(columns.protein_ids).unwrap_or(""));
    if protein_ids.is_empty() {
        return Err(KiraError::EmptyProteinIds {
            path: path.to_path_buf(),
            line,
        });
    }
    let gene_names = split_list(record.get(columns.gene_names).unwrap_or(""));

    let mut intensities = Intensities::new();
    for column in &columns.samples {
        let cell = record.get(column.index).unwrap_or("").trim();
        let value = cell
            .parse::<f64>()
            .map_err(|_| KiraError::InvalidNumber {
                path: path.to_path_buf(),
                line,
                column: column.header.clone(),
                value: cell.to_string(),
            })?;
        intensities.push(column.sample.clone(), value);
    }

    Ok(ProteinGroup {
        protein_ids,
        gene_names,
        intensities,
    })
}

fn split_list(cell: &str) -> Vec<String> {
    cell.split(ELEMENT_SEPARATOR)
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    const TABLE: &str = "\
Protein IDs\tGene names\tIntensity S1\tLFQ intensity S1\tLFQ intensity S2\tMS/MS count S1
P1;P2\tG1\t10\t5.2\t0\t3
P3\t\t20\t1.5E+09\t0.25\t0
";

    fn reader(mode: IntensityMode) -> MaxquantReader {
        MaxquantReader::new(TableLayout::maxquant(mode).unwrap())
    }

    #[test]
    fn parses_groups_in_row_order() {
        let groups = reader(IntensityMode::Lfq)
            .read(Path::new("proteinGroups.txt"), TABLE.as_bytes())
            .unwrap();

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].protein_ids, vec!["P1", "P2"]);
        assert_eq!(groups[0].gene_names, vec!["G1"]);
        assert_eq!(
            groups[0].intensities.iter().collect::<Vec<_>>(),
            vec![("S1", 5.2), ("S2", 0.0)]
        );
        assert!(groups[1].gene_names.is_empty());
        assert_eq!(groups[1].intensities.get("S1"), Some(1.5e9));
    }

    #[test]
    fn mode_selects_columns() {
        let groups = reader(IntensityMode::Intensity)
            .read(Path::new("proteinGroups.txt"), TABLE.as_bytes())
            .unwrap();
        assert_eq!(groups[0].intensities.samples().collect::<Vec<_>>(), vec!["S1"]);
        assert_eq!(groups[0].intensities.get("S1"), Some(10.0));

        let groups = reader(IntensityMode::MsmsCount)
            .read(Path::new("proteinGroups.txt"), TABLE.as_bytes())
            .unwrap();
        assert_eq!(groups[1].intensities.get("S1"), Some(0.0));
    }

    #[test]
    fn malformed_number_is_fatal() {
        let table = "Protein IDs\tGene names\tLFQ intensity S1\nP1\tG1\tabc\n";
        let err = reader(IntensityMode::Lfq)
            .read(Path::new("groups.txt"), table.as_bytes())
            .unwrap_err();
        assert_matches!(
            err,
            KiraError::InvalidNumber { line: 2, ref column, ref value, .. }
                if column == "LFQ intensity S1" && value == "abc"
        );
    }

    #[test]
    fn missing_required_column() {
        let table = "Protein IDs\tLFQ intensity S1\nP1\t1\n";
        let err = reader(IntensityMode::Lfq)
            .read(Path::new("groups.txt"), table.as_bytes())
            .unwrap_err();
        assert_matches!(
            err,
            KiraError::MissingColumn { ref column, .. } if column == "Gene names"
        );
    }

    #[test]
    fn empty_protein_ids_rejected() {
        let table = "Protein IDs\tGene names\tLFQ intensity S1\n;\tG1\t1\n";
        let err = reader(IntensityMode::Lfq)
            .read(Path::new("groups.txt"), table.as_bytes())
            .unwrap_err();
        assert_matches!(err, KiraError::EmptyProteinIds { line: 2, .. });
    }

    #[test]
    fn duplicate_sample_rejected() {
        let layout = TableLayout::new(
            "Protein IDs",
            "Gene names",
            "(?:LFQ )?[Ii]ntensity (.*)",
            b'\t',
        )
        .unwrap();
        let err = MaxquantReader::new(layout)
            .read(Path::new("groups.txt"), TABLE.as_bytes())
            .unwrap_err();
        assert_matches!(err, KiraError::DuplicateSample { ref sample, .. } if sample == "S1");
    }

    #[test]
    fn header_only_table_has_no_groups() {
        let table = "Protein IDs\tGene names\tLFQ intensity S1\n";
        let groups = reader(IntensityMode::Lfq)
            .read(Path::new("groups.txt"), table.as_bytes())
            .unwrap();
        assert!(groups.is_empty());
    }

    #[test]
    fn list_cells_drop_blank_items() {
        let table = "Protein IDs\tGene names\tLFQ intensity S1\n P1 ;;P2\tG1;;G2;\t1\n";
        let groups = reader(IntensityMode::Lfq)
            .read(Path::new("groups.txt"), table.as_bytes())
            .unwrap();
        assert_eq!(groups[0].protein_ids, vec!["P1", "P2"]);
        assert_eq!(groups[0].gene(), "G1;G2");
    }

    #[test]
    fn custom_delimiter() {
        let layout =
            TableLayout::new("Protein IDs", "Gene names", "LFQ intensity (.*)", b',').unwrap();
        let table = "Protein IDs,Gene names,LFQ intensity A\nP1;P2,G1;G2,7\n";
        let groups = MaxquantReader::new(layout)
            .read(Path::new("groups.csv"), table.as_bytes())
            .unwrap();
        assert_eq!(groups[0].gene_names, vec!["G1", "G2"]);
        assert_eq!(groups[0].intensities.get("A"), Some(7.0));
    }
}
