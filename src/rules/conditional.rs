//! Conditional rules (spec §4.5): trait-evolution effects triggered by the
//! commit of some other rule, rather than carrying a wait of their own.
//!
//! Grounded on `original_source/src/CharEvolScheme.cpp`'s three trigger
//! shapes: speciational (fires on the two fresh daughters of a split),
//! terminal (fires once per elapsed edge), and gradual (fires on every
//! event, across every living leaf, for the elapsed `dt`).

use super::RuleKind;
use crate::error::EngineResult;
use crate::matrix::{ContinuousMatrix, DiscreteMatrix};
use crate::rng::Random;
use crate::schemes::Scheme;
use crate::tree::{NodeId, Tree};

#[derive(Debug, Clone)]
pub enum ConditionalRule {
    /// evolve a trait on a node's two fresh children right after it speciates
    Speciational { scheme: Scheme, symmetric: bool },
    /// evolve a trait on a leaf when an edge incident to it is about to end
    /// (any commit that touches the leaf: its own kill, or a sibling event)
    Terminal { scheme: Scheme },
    /// evolve a trait on every living leaf every event, scaled by elapsed `dt`
    Gradual { scheme: Scheme },
}

impl ConditionalRule {
    /// whether this conditional is interested in the outcome of `firing`
    pub fn is_triggered(&self, firing: RuleKind, speciated: Option<NodeId>) -> bool {
        match self {
            Self::Speciational { .. } => speciated.is_some(),
            Self::Terminal { .. } => matches!(firing, RuleKind::Local | RuleKind::Global),
            Self::Gradual { .. } => true,
        }
    }

    pub fn scheme(&self) -> &Scheme {
        match self {
            Self::Speciational { scheme, .. } | Self::Terminal { scheme } | Self::Gradual { scheme } => scheme,
        }
    }

    /// apply this conditional's effect; `subjects` are the nodes the firing
    /// rule reported, `dt` the elapsed wait for this event
    pub fn commit(
        &self,
        tree: &Tree,
        continuous: &mut ContinuousMatrix,
        discrete: &mut DiscreteMatrix,
        subjects: &[NodeId],
        speciated: Option<NodeId>,
        dt: f64,
        rng: &mut Random,
    ) -> EngineResult<()> {
        match self {
            Self::Speciational { scheme, symmetric } => {
                let Some(parent) = speciated else { return Ok(()) };
                let children = tree.children(parent);
                if children.len() != 2 {
                    return Ok(());
                }
                let (left, right) = (children[0], children[1]);
                scheme.evolve(tree, continuous, discrete, left, 1.0, rng)?;
                if *symmetric {
                    // mirror the same draw onto the sister rather than an
                    // independent one, so the pair starts equidistant from
                    // the parent's value
                    let name_left = tree.name(left)?.to_string();
                    let name_right = tree.name(right)?.to_string();
                    if let Some(col) = scheme.column() {
                        if let Ok(parent_value) = continuous.get(tree.name(parent)?, col) {
                            if let Ok(new_left) = continuous.get(&name_left, col) {
                                let delta = new_left - parent_value;
                                continuous.set(&name_right, col, parent_value - delta)?;
                            }
                        }
                    }
                } else {
                    scheme.evolve(tree, continuous, discrete, right, 1.0, rng)?;
                }
                Ok(())
            }
            Self::Terminal { scheme } => {
                for &leaf in subjects {
                    scheme.evolve(tree, continuous, discrete, leaf, dt, rng)?;
                }
                Ok(())
            }
            Self::Gradual { scheme } => {
                for leaf in tree.living_leaves() {
                    scheme.evolve(tree, continuous, discrete, leaf, dt, rng)?;
                }
                Ok(())
            }
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Speciational { symmetric, .. } => format!(
                "speciational trait evolution ({})",
                if *symmetric { "symmetric" } else { "asymmetric" }
            ),
            Self::Terminal { .. } => "terminal trait evolution".to_string(),
            Self::Gradual { .. } => "gradual trait evolution".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::ContinuousMatrix;

    #[test]
    fn gradual_is_always_triggered() {
        let rule = ConditionalRule::Gradual { scheme: Scheme::Null };
        assert!(rule.is_triggered(RuleKind::Global, None));
        assert!(rule.is_triggered(RuleKind::Local, Some(petgraph::graph::NodeIndex::new(0))));
    }

    #[test]
    fn speciational_only_triggers_on_a_split() {
        let rule = ConditionalRule::Speciational { scheme: Scheme::Null, symmetric: true };
        assert!(!rule.is_triggered(RuleKind::Local, None));
        assert!(rule.is_triggered(RuleKind::Local, Some(petgraph::graph::NodeIndex::new(0))));
    }

    #[test]
    fn symmetric_speciational_mirrors_around_parent_value() {
        let mut tree = Tree::seed();
        let root = tree.root();
        let mut continuous = ContinuousMatrix::new();
        continuous.append_cols(&["x".to_string()]);
        continuous.add_row(tree.name(root).unwrap());
        continuous.set(tree.name(root).unwrap(), "x", 1.0).unwrap();
        let (left, right) = tree.speciate(root).unwrap();
        continuous.add_row(tree.name(left).unwrap());
        continuous.add_row(tree.name(right).unwrap());
        continuous.set(tree.name(left).unwrap(), "x", 1.0).unwrap();
        continuous.set(tree.name(right).unwrap(), "x", 1.0).unwrap();
        let mut discrete = DiscreteMatrix::new();
        let scheme = Scheme::Brownian {
            col: "x".to_string(),
            mean: 0.5,
            stddev: 0.0,
            punctuational: true,
            bounds: crate::matrix::Bounds::new(None, None),
            policy: crate::matrix::BoundsPolicy::Truncate,
        };
        let rule = ConditionalRule::Speciational { scheme, symmetric: true };
        let mut rng = Random::new(3);
        rule.commit(&tree, &mut continuous, &mut discrete, &[], Some(root), 1.0, &mut rng)
            .unwrap();
        let left_v = continuous.get(tree.name(left).unwrap(), "x").unwrap();
        let right_v = continuous.get(tree.name(right).unwrap(), "x").unwrap();
        // zero stddev: deterministic shift of +0.5 on the left, mirrored to -0.5 on the right around parent (1.0)
        assert!((left_v - 1.5).abs() < 1e-9);
        assert!((right_v - 0.5).abs() < 1e-9);
    }
}
