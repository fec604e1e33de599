//! Negative and positive control gene sets

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, RuvError};

/// Genes assumed unaffected by the biological effect of interest
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NegativeControlSet {
    genes: Vec<String>,
}

impl NegativeControlSet {
    /// Create from gene identifiers; repeated identifiers are collapsed
    pub fn new<I, S>(genes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let genes = genes
            .into_iter()
            .map(Into::into)
            .filter(|g: &String| seen.insert(g.clone()))
            .collect();
        Self { genes }
    }

    /// Use every gene of a matrix as a negative control
    pub fn all_genes(gene_ids: &[String]) -> Self {
        Self::new(gene_ids.iter().cloned())
    }

    /// Number of control identifiers (before resolution)
    pub fn len(&self) -> usize {
        self.genes.len()
    }

    /// True when no identifiers were given
    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    /// Control identifiers
    pub fn genes(&self) -> &[String] {
        &self.genes
    }

    /// Row indices of the controls present in `gene_ids`, in matrix order
    ///
    /// Controls absent from the matrix are dropped without error.
    pub fn resolve(&self, gene_ids: &[String]) -> Vec<usize> {
        let wanted: HashSet<&str> = self.genes.iter().map(|g| g.as_str()).collect();
        let indices: Vec<usize> = gene_ids
            .iter()
            .enumerate()
            .filter(|(_, g)| wanted.contains(g.as_str()))
            .map(|(i, _)| i)
            .collect();

        let dropped = self.genes.len() - indices.len();
        if dropped > 0 {
            log::debug!(
                "{} of {} negative controls are not among the {} genes and were dropped",
                dropped,
                self.genes.len(),
                gene_ids.len()
            );
        }
        indices
    }
}

/// Expected direction of a positive control's change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    /// Whether a signed effect agrees with this direction
    pub fn agrees_with(self, effect: f64) -> bool {
        match self {
            Direction::Up => effect > 0.0,
            Direction::Down => effect < 0.0,
        }
    }
}

impl FromStr for Direction {
    type Err = RuvError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "UP" => Ok(Direction::Up),
            "DOWN" => Ok(Direction::Down),
            other => Err(RuvError::InvalidInput {
                reason: format!("unknown direction label '{}', expected UP or DOWN", other),
            }),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "UP"),
            Direction::Down => write!(f, "DOWN"),
        }
    }
}

/// A gene with a known expected direction of differential expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositiveControl {
    pub gene_id: String,
    pub direction: Direction,
}
