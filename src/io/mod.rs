//! Reading input tables and writing analysis artifacts

mod csv;
mod output;

pub use self::csv::{
    read_count_matrix, read_negative_controls, read_positive_controls, read_ranked_list, read_sample_table,
    RankedColumns,
};
pub use output::{
    write_concordance_curve, write_concordance_curves, write_count_matrix, write_factors, write_gene_list,
    write_json, write_matrix, write_normalized, write_pca, write_replicate_table, write_rle_summary,
    write_sample_table, write_scaled_matrix,
};
