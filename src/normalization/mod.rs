//! Between-sample scaling and removal of unwanted variation

mod ruv;
mod scaling;

pub use ruv::{
    estimate_unwanted_variation, ruv_control_genes, ruv_replicates, NormalizedMatrix, RuvFit, RuvMethod,
    RuvParams, UnwantedFactors,
};
pub use scaling::{scale_normalize, ScaledMatrix, ScalingMethod};
