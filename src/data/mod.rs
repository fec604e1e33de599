//! Data structures for count tables, sample annotations and control sets

mod controls;
mod count_matrix;
mod metadata;
mod replicates;

pub use controls::{Direction, NegativeControlSet, PositiveControl};
pub use count_matrix::CountMatrix;
pub use metadata::SampleMetadata;
pub use replicates::{ReplicateAssignment, ReplicateGroups, ABSENT_INDEX};
