//! Agreement between independently produced gene rankings

mod cat;
mod ranked;

pub use cat::{
    compare_rankings, concordance_at_top, concordance_at_top_capped, positive_control_recovery,
    ConcordanceCurve, ConcordancePoint,
};
pub use ranked::RankedGeneList;
