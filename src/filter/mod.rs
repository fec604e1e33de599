//! Gene filtering prior to normalization

mod expression;

pub use expression::{filter_by_expression, FilterParams};
