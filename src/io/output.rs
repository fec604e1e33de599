//! Tab-separated and JSON output artifacts

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use ndarray::ArrayView2;
use serde::Serialize;

use crate::concordance::ConcordanceCurve;
use crate::data::{CountMatrix, ReplicateGroups, SampleMetadata};
use crate::diagnostics::{PcaResult, RleSummary};
use crate::error::{Result, RuvError};
use crate::normalization::{NormalizedMatrix, ScaledMatrix, UnwantedFactors};

fn create<P: AsRef<Path>>(path: P) -> Result<BufWriter<File>> {
    Ok(BufWriter::new(File::create(path)?))
}

/// Write a labelled matrix: one header row, one row per `row_ids` entry
pub fn write_matrix<P: AsRef<Path>>(
    path: P,
    corner: &str,
    row_ids: &[String],
    col_ids: &[String],
    values: ArrayView2<f64>,
) -> Result<()> {
    if values.dim() != (row_ids.len(), col_ids.len()) {
        return Err(RuvError::InvalidInput {
            reason: format!(
                "matrix is {:?} but {} row and {} column labels were given",
                values.dim(),
                row_ids.len(),
                col_ids.len()
            ),
        });
    }

    let mut out = create(path)?;
    writeln!(out, "{}\t{}", corner, col_ids.join("\t"))?;
    for (id, row) in row_ids.iter().zip(values.outer_iter()) {
        write!(out, "{}", id)?;
        for v in row.iter() {
            write!(out, "\t{}", v)?;
        }
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}

pub fn write_count_matrix<P: AsRef<Path>>(path: P, counts: &CountMatrix) -> Result<()> {
    write_matrix(path, "gene_id", counts.gene_ids(), counts.sample_ids(), counts.counts())
}

pub fn write_scaled_matrix<P: AsRef<Path>>(path: P, scaled: &ScaledMatrix) -> Result<()> {
    write_matrix(path, "gene_id", scaled.gene_ids(), scaled.sample_ids(), scaled.values())
}

/// `normalized.tsv`: genes x samples log2 expression
pub fn write_normalized<P: AsRef<Path>>(path: P, normalized: &NormalizedMatrix) -> Result<()> {
    write_matrix(path, "gene_id", normalized.gene_ids(), normalized.sample_ids(), normalized.values())
}

/// `factors.tsv`: samples x k loadings with columns `W_1..W_k`
pub fn write_factors<P: AsRef<Path>>(path: P, factors: &UnwantedFactors) -> Result<()> {
    write_matrix(path, "sample_id", factors.sample_ids(), &factors.names(), factors.values())
}

/// `replicates.tsv`: padded index table with -1 for absent entries
pub fn write_replicate_table<P: AsRef<Path>>(path: P, groups: &ReplicateGroups) -> Result<()> {
    let mut out = create(path)?;
    let header: Vec<String> = (1..=groups.width()).map(|i| format!("r{}", i)).collect();
    writeln!(out, "set\t{}", header.join("\t"))?;
    for (label, row) in groups.labels().iter().zip(groups.to_index_table()) {
        let cells: Vec<String> = row.iter().map(|i| i.to_string()).collect();
        writeln!(out, "{}\t{}", label, cells.join("\t"))?;
    }
    out.flush()?;
    Ok(())
}

/// `rle.tsv`: per-sample RLE median and quartiles
pub fn write_rle_summary<P: AsRef<Path>>(path: P, summary: &[RleSummary]) -> Result<()> {
    let mut out = create(path)?;
    writeln!(out, "sample_id\tlower_quartile\tmedian\tupper_quartile\tiqr")?;
    for s in summary {
        writeln!(
            out,
            "{}\t{:.6}\t{:.6}\t{:.6}\t{:.6}",
            s.sample_id, s.lower_quartile, s.median, s.upper_quartile, s.iqr
        )?;
    }
    out.flush()?;
    Ok(())
}

/// `pca.tsv`: sample scores; percent variance goes in the header as `PC1 (42.0%)`
pub fn write_pca<P: AsRef<Path>>(path: P, pca: &PcaResult) -> Result<()> {
    let columns: Vec<String> = pca
        .component_names()
        .iter()
        .zip(&pca.percent_variance)
        .map(|(name, pct)| format!("{} ({:.1}%)", name, pct))
        .collect();
    write_matrix(path, "sample_id", &pca.sample_ids, &columns, pca.scores.view())
}

/// `cat_<name>.tsv`: rank and concordance
pub fn write_concordance_curve<P: AsRef<Path>>(path: P, curve: &ConcordanceCurve) -> Result<()> {
    let mut out = create(path)?;
    writeln!(out, "rank\tconcordance")?;
    for p in &curve.points {
        writeln!(out, "{}\t{:.6}", p.rank, p.concordance)?;
    }
    out.flush()?;
    Ok(())
}

/// Several curves in long format: list, rank, concordance
pub fn write_concordance_curves<P: AsRef<Path>>(path: P, curves: &[ConcordanceCurve]) -> Result<()> {
    let mut out = create(path)?;
    writeln!(out, "list\trank\tconcordance")?;
    for curve in curves {
        for p in &curve.points {
            writeln!(out, "{}\t{}\t{:.6}", curve.name, p.rank, p.concordance)?;
        }
    }
    out.flush()?;
    Ok(())
}

/// Sample table with one column per metadata field
pub fn write_sample_table<P: AsRef<Path>>(path: P, metadata: &SampleMetadata) -> Result<()> {
    let mut out = create(path)?;
    let names = metadata.column_names();
    writeln!(out, "sample_id\t{}", names.join("\t"))?;
    for (i, id) in metadata.sample_ids().iter().enumerate() {
        let values = names
            .iter()
            .map(|n| metadata.value(n, i))
            .collect::<Result<Vec<&str>>>()?;
        writeln!(out, "{}\t{}", id, values.join("\t"))?;
    }
    out.flush()?;
    Ok(())
}

/// Single-column gene list with a header
pub fn write_gene_list<P: AsRef<Path>>(path: P, header: &str, genes: &[String]) -> Result<()> {
    let mut out = create(path)?;
    writeln!(out, "{}", header)?;
    for g in genes {
        writeln!(out, "{}", g)?;
    }
    out.flush()?;
    Ok(())
}

/// Pretty-printed JSON
pub fn write_json<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> Result<()> {
    let out = create(path)?;
    serde_json::to_writer_pretty(out, value)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concordance::ConcordancePoint;
    use crate::io::read_count_matrix;
    use ndarray::array;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_matrix_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("counts.tsv");
        let counts = CountMatrix::new(
            array![[1.0, 2.0], [30.0, 4.0]],
            vec!["g1".to_string(), "g2".to_string()],
            vec!["s1".to_string(), "s2".to_string()],
        )
        .unwrap();
        write_count_matrix(&path, &counts).unwrap();
        let back = read_count_matrix(&path).unwrap();
        assert_eq!(back.counts(), counts.counts());
        assert_eq!(back.gene_ids(), counts.gene_ids());
    }

    #[test]
    fn test_replicate_table_uses_sentinel() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("replicates.tsv");
        let groups = ReplicateGroups::from_sets(vec![vec![0, 1, 2], vec![3, 4]], 5).unwrap();
        write_replicate_table(&path, &groups).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "set\tr1\tr2\tr3\nset1\t0\t1\t2\nset2\t3\t4\t-1\n");
    }

    #[test]
    fn test_curve_and_json() {
        let dir = tempdir().unwrap();
        let curve = ConcordanceCurve {
            name: "uq".to_string(),
            points: vec![
                ConcordancePoint {
                    rank: 1,
                    concordance: 1.0,
                },
                ConcordancePoint {
                    rank: 2,
                    concordance: 0.5,
                },
            ],
        };
        write_concordance_curve(dir.path().join("cat.tsv"), &curve).unwrap();
        let text = fs::read_to_string(dir.path().join("cat.tsv")).unwrap();
        assert_eq!(text.lines().nth(2), Some("2\t0.500000"));

        write_json(dir.path().join("curve.json"), &curve).unwrap();
        let parsed: ConcordanceCurve =
            serde_json::from_str(&fs::read_to_string(dir.path().join("curve.json")).unwrap()).unwrap();
        assert_eq!(parsed, curve);
    }

    #[test]
    fn test_label_mismatch_rejected() {
        let dir = tempdir().unwrap();
        let err = write_matrix(dir.path().join("m.tsv"), "id", &["a".to_string()], &[], array![[1.0]].view());
        assert!(err.is_err());
    }
}
