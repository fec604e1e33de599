//! Delimited-table readers for counts, sample tables, control lists and
//! ranked gene tables
//!
//! Tab and comma delimiters are detected from the header line.

use std::fs;
use std::path::Path;

use ::csv::{ReaderBuilder, StringRecord, Trim};
use ndarray::Array2;

use crate::concordance::RankedGeneList;
use crate::data::{CountMatrix, Direction, NegativeControlSet, PositiveControl, SampleMetadata};
use crate::error::{Result, RuvError};

/// Column selection for a ranked gene table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedColumns {
    /// Gene identifier column (default: first column)
    pub id: Option<String>,
    /// Significance score column, lower is more significant
    pub score: String,
    /// Optional signed effect column
    pub effect: Option<String>,
}

impl Default for RankedColumns {
    fn default() -> Self {
        Self {
            id: None,
            score: "pvalue".to_string(),
            effect: None,
        }
    }
}

struct Table {
    headers: Vec<String>,
    records: Vec<StringRecord>,
}

impl Table {
    /// Index of a named column, or the first column when `name` is None
    fn column_index(&self, name: Option<&str>, path: &Path) -> Result<usize> {
        match name {
            None => Ok(0),
            Some(name) => self.headers.iter().position(|h| h == name).ok_or_else(|| RuvError::InvalidInput {
                reason: format!(
                    "column '{}' not found in {} (columns: {})",
                    name,
                    path.display(),
                    self.headers.join(", ")
                ),
            }),
        }
    }
}

fn detect_delimiter(header_line: &str) -> u8 {
    if header_line.contains('\t') {
        b'\t'
    } else {
        b','
    }
}

fn read_table(path: &Path) -> Result<Table> {
    let content = fs::read_to_string(path)?;
    let header_line = content.lines().find(|l| !l.trim().is_empty()).ok_or_else(|| RuvError::InvalidInput {
        reason: format!("{} is empty", path.display()),
    })?;

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(detect_delimiter(header_line))
        .trim(Trim::All)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    let mut records = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|f| f.is_empty()) {
            continue;
        }
        records.push(record);
    }

    log::debug!("Read {} rows x {} columns from {}", records.len(), headers.len(), path.display());
    Ok(Table { headers, records })
}

/// Parse a numeric cell; `NA`, `NaN` and empty cells become NaN
fn parse_number(value: &str, what: &str, row_id: &str) -> Result<f64> {
    match value {
        "" | "NA" | "NaN" | "nan" => Ok(f64::NAN),
        v => v.parse::<f64>().map_err(|_| RuvError::InvalidInput {
            reason: format!("invalid {} '{}' for '{}'", what, v, row_id),
        }),
    }
}

/// Read a genes x samples count table
///
/// Header row holds the sample IDs (the first header cell is ignored), the
/// first column holds the gene IDs.
pub fn read_count_matrix<P: AsRef<Path>>(path: P) -> Result<CountMatrix> {
    let path = path.as_ref();
    let table = read_table(path)?;
    if table.headers.len() < 2 {
        return Err(RuvError::InvalidInput {
            reason: format!("{} needs a gene column and at least one sample column", path.display()),
        });
    }

    let sample_ids: Vec<String> = table.headers[1..].to_vec();
    let n_samples = sample_ids.len();
    let mut gene_ids = Vec::with_capacity(table.records.len());
    let mut counts = Array2::zeros((table.records.len(), n_samples));

    for (i, record) in table.records.iter().enumerate() {
        let gene = record.get(0).unwrap_or_default().to_string();
        for j in 0..n_samples {
            let cell = record.get(j + 1).unwrap_or_default();
            let value = parse_number(cell, "count", &gene)?;
            counts[[i, j]] = value;
        }
        gene_ids.push(gene);
    }

    log::info!(
        "Loaded count table {}: {} genes x {} samples",
        path.display(),
        gene_ids.len(),
        n_samples
    );
    CountMatrix::new(counts, gene_ids, sample_ids)
}

/// Read a sample table: first column sample ID, remaining named categorical columns
pub fn read_sample_table<P: AsRef<Path>>(path: P) -> Result<SampleMetadata> {
    let path = path.as_ref();
    let table = read_table(path)?;
    if table.records.is_empty() {
        return Err(RuvError::InvalidInput {
            reason: format!("no samples found in {}", path.display()),
        });
    }

    let sample_ids: Vec<String> = table.records.iter().map(|r| r.get(0).unwrap_or_default().to_string()).collect();
    let mut metadata = SampleMetadata::new(sample_ids)?;
    for (c, name) in table.headers.iter().enumerate().skip(1) {
        let values = table.records.iter().map(|r| r.get(c).unwrap_or_default().to_string()).collect();
        metadata.add_column(name, values)?;
    }
    Ok(metadata)
}

/// Read negative-control gene IDs from `column` (default: first column)
pub fn read_negative_controls<P: AsRef<Path>>(path: P, column: Option<&str>) -> Result<NegativeControlSet> {
    let path = path.as_ref();
    let table = read_table(path)?;
    let col = table.column_index(column, path)?;
    let genes: Vec<String> = table
        .records
        .iter()
        .filter_map(|r| r.get(col))
        .filter(|g| !g.is_empty())
        .map(|g| g.to_string())
        .collect();
    log::info!("Loaded {} negative controls from {}", genes.len(), path.display());
    Ok(NegativeControlSet::new(genes))
}

/// Read positive controls with the expected direction from `direction_column`
///
/// Rows with an empty or `NA` direction are not controls for this comparison
/// and are skipped.
pub fn read_positive_controls<P: AsRef<Path>>(
    path: P,
    gene_column: Option<&str>,
    direction_column: &str,
) -> Result<Vec<PositiveControl>> {
    let path = path.as_ref();
    let table = read_table(path)?;
    let gene_col = table.column_index(gene_column, path)?;
    let dir_col = table.column_index(Some(direction_column), path)?;

    let mut controls = Vec::new();
    for record in &table.records {
        let gene = record.get(gene_col).unwrap_or_default();
        let label = record.get(dir_col).unwrap_or_default();
        if gene.is_empty() || label.is_empty() || label == "NA" {
            continue;
        }
        controls.push(PositiveControl {
            gene_id: gene.to_string(),
            direction: label.parse::<Direction>()?,
        });
    }
    log::info!(
        "Loaded {} positive controls ({}) from {}",
        controls.len(),
        direction_column,
        path.display()
    );
    Ok(controls)
}

/// Read a pre-computed differential expression table as a ranked list
pub fn read_ranked_list<P: AsRef<Path>>(path: P, columns: &RankedColumns) -> Result<RankedGeneList> {
    let path = path.as_ref();
    let table = read_table(path)?;
    let id_col = table.column_index(columns.id.as_deref(), path)?;
    let score_col = table.column_index(Some(columns.score.as_str()), path)?;
    let effect_col = columns
        .effect
        .as_deref()
        .map(|name| table.column_index(Some(name), path))
        .transpose()?;

    let mut ids = Vec::with_capacity(table.records.len());
    let mut scores = Vec::with_capacity(table.records.len());
    let mut effects = Vec::with_capacity(table.records.len());
    for record in &table.records {
        let id = record.get(id_col).unwrap_or_default().to_string();
        scores.push(parse_number(record.get(score_col).unwrap_or_default(), "score", &id)?);
        if let Some(c) = effect_col {
            effects.push(parse_number(record.get(c).unwrap_or_default(), "effect", &id)?);
        }
        ids.push(id);
    }

    match effect_col {
        Some(_) => RankedGeneList::with_effects(ids, scores, effects),
        None => RankedGeneList::new(ids, scores),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn file_with(lines: &[&str]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        file
    }

    #[test]
    fn test_read_count_matrix_tab() {
        let file = file_with(&["gene_id\ts1\ts2\ts3", "gene1\t100\t200\t150", "gene2\t50\t75\t60"]);
        let matrix = read_count_matrix(file.path()).unwrap();
        assert_eq!(matrix.n_genes(), 2);
        assert_eq!(matrix.n_samples(), 3);
        assert_eq!(matrix.counts()[[1, 2]], 60.0);
    }

    #[test]
    fn test_read_count_matrix_comma_quoted() {
        let file = file_with(&["\"\",\"s1\",\"s2\"", "\"g1\",1,2", "", "\"g2\",3,4"]);
        let matrix = read_count_matrix(file.path()).unwrap();
        assert_eq!(matrix.sample_ids(), &["s1".to_string(), "s2".to_string()]);
        assert_eq!(matrix.gene_ids(), &["g1".to_string(), "g2".to_string()]);
    }

    #[test]
    fn test_read_count_matrix_rejects_bad_cells() {
        let file = file_with(&["id,s1,s2", "g1,1,abc"]);
        assert!(matches!(read_count_matrix(file.path()), Err(RuvError::InvalidInput { .. })));

        let ragged = file_with(&["id,s1,s2", "g1,1"]);
        assert!(read_count_matrix(ragged.path()).is_err());
    }

    #[test]
    fn test_read_sample_table() {
        let file = file_with(&["sample\tcondition\tbatch", "a\tctl\tx", "b\ttrt\ty"]);
        let meta = read_sample_table(file.path()).unwrap();
        assert_eq!(meta.n_samples(), 2);
        assert_eq!(meta.column_names(), &["condition".to_string(), "batch".to_string()]);
        assert_eq!(meta.value("batch", 1).unwrap(), "y");
    }

    #[test]
    fn test_read_controls() {
        let file = file_with(&["gene,spikein", "g1,yes", "g2,yes", ",no"]);
        let controls = read_negative_controls(file.path(), None).unwrap();
        assert_eq!(controls.genes(), &["g1".to_string(), "g2".to_string()]);

        let pos = file_with(&["gene\tMAQC2\tOLM", "p1\tUP\tNA", "p2\tDOWN\tUP", "p3\t\tDOWN"]);
        let maqc = read_positive_controls(pos.path(), Some("gene"), "MAQC2").unwrap();
        assert_eq!(maqc.len(), 2);
        assert_eq!(maqc[1].direction, Direction::Down);
        let olm = read_positive_controls(pos.path(), None, "OLM").unwrap();
        assert_eq!(olm.iter().map(|p| p.gene_id.as_str()).collect::<Vec<_>>(), vec!["p2", "p3"]);
        assert!(read_positive_controls(pos.path(), None, "missing").is_err());
    }

    #[test]
    fn test_read_ranked_list() {
        let file = file_with(&[
            "id,log2FoldChange,pvalue",
            "a,1.0,0.5",
            "b,-2.0,NA",
            "c,0.3,0.001",
        ]);
        let columns = RankedColumns {
            id: Some("id".to_string()),
            score: "pvalue".to_string(),
            effect: Some("log2FoldChange".to_string()),
        };
        let list = read_ranked_list(file.path(), &columns).unwrap();
        assert_eq!(list.gene_ids(), &["c".to_string(), "a".to_string(), "b".to_string()]);
        assert_eq!(list.effects().unwrap()[0], 0.3);
    }
}
