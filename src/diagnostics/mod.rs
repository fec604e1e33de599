//! Numeric diagnostics of normalization quality (RLE and PCA)

mod pca;
mod rle;

pub use pca::{principal_components, PcaResult};
pub use rle::{relative_log_expression, rle_summary, RleSummary};
