//! Taxon predicates shared by predicate-selected mass extinction (spec §4.5)
//! and predicate-selected pruning (spec §4.8).

use crate::matrix::{ContinuousMatrix, DiscreteMatrix};

#[derive(Debug, Clone)]
pub enum TraitPredicate {
    ContinuousAbove { col: String, threshold: f64 },
    ContinuousBelow { col: String, threshold: f64 },
    DiscreteEquals { col: String, state: String },
    DiscreteNotEquals { col: String, state: String },
}

impl TraitPredicate {
    pub fn test(&self, taxon: &str, continuous: &ContinuousMatrix, discrete: &DiscreteMatrix) -> bool {
        match self {
            Self::ContinuousAbove { col, threshold } => {
                continuous.get(taxon, col).map(|v| v > *threshold).unwrap_or(false)
            }
            Self::ContinuousBelow { col, threshold } => {
                continuous.get(taxon, col).map(|v| v < *threshold).unwrap_or(false)
            }
            Self::DiscreteEquals { col, state } => {
                discrete.get(taxon, col).map(|v| v == state).unwrap_or(false)
            }
            Self::DiscreteNotEquals { col, state } => {
                discrete.get(taxon, col).map(|v| v != state).unwrap_or(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn continuous_above_tests_strictly_greater() {
        let mut continuous = ContinuousMatrix::new();
        continuous.append_cols(&["size".to_string()]);
        continuous.add_row("sp1");
        continuous.set("sp1", "size", 5.0).unwrap();
        let discrete = DiscreteMatrix::new();
        let pred = TraitPredicate::ContinuousAbove { col: "size".to_string(), threshold: 4.0 };
        assert!(pred.test("sp1", &continuous, &discrete));
        let pred = TraitPredicate::ContinuousAbove { col: "size".to_string(), threshold: 5.0 };
        assert!(!pred.test("sp1", &continuous, &discrete));
    }

    #[test]
    fn discrete_equals_matches_state() {
        let continuous = ContinuousMatrix::new();
        let mut discrete = DiscreteMatrix::new();
        discrete.append_cols(&["habitat".to_string()]);
        discrete.add_row("sp1");
        discrete.set("sp1", "habitat", "forest").unwrap();
        let pred = TraitPredicate::DiscreteEquals { col: "habitat".to_string(), state: "forest".to_string() };
        assert!(pred.test("sp1", &continuous, &discrete));
        let pred = TraitPredicate::DiscreteNotEquals { col: "habitat".to_string(), state: "forest".to_string() };
        assert!(!pred.test("sp1", &continuous, &discrete));
    }
}
