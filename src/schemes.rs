//! Trait-evolution schemes (spec §4.4): the per-trait change kernels owned
//! by trait-evolution rules. Each scheme targets exactly one trait column.

use crate::error::{EngineError, EngineResult};
use crate::matrix::{Bounds, BoundsPolicy, ContinuousMatrix, DiscreteMatrix};
use crate::rng::Random;
use crate::tree::{NodeId, Tree};

#[derive(Debug, Clone)]
pub enum Scheme {
    Null,
    /// discrete, unranked: with probability `1 - exp(-rate*dt)`, jump to a
    /// uniformly-chosen different state (spec §4.4)
    Markov { col: String, rate: f64 },
    /// discrete, ranked: independent rise/fall probabilities; boundary
    /// states absorb the out-of-range move as a no-op
    RankedMarkov { col: String, p_rise: f64, p_fall: f64 },
    /// continuous, additive: `new = old + Normal(mean*dt, stddev*sqrt(dt))`,
    /// or `dt` fixed at 1 when `punctuational` (speciational jump, not
    /// proportional to elapsed time)
    Brownian {
        col: String,
        mean: f64,
        stddev: f64,
        punctuational: bool,
        bounds: Bounds,
        policy: BoundsPolicy,
    },
    /// continuous, multiplicative: the same kernel applied in log-space
    LogNormal {
        col: String,
        mean: f64,
        stddev: f64,
        punctuational: bool,
        bounds: Bounds,
        policy: BoundsPolicy,
    },
}

impl Scheme {
    pub fn ranked_markov(col: impl Into<String>, p_rise: f64, p_fall: f64) -> EngineResult<Self> {
        if p_rise + p_fall > 1.0 {
            return Err(EngineError::execution(
                "ranked markov scheme: p_rise + p_fall must not exceed 1",
            ));
        }
        Ok(Self::RankedMarkov {
            col: col.into(),
            p_rise,
            p_fall,
        })
    }

    pub fn column(&self) -> Option<&str> {
        match self {
            Self::Null => None,
            Self::Markov { col, .. }
            | Self::RankedMarkov { col, .. }
            | Self::Brownian { col, .. }
            | Self::LogNormal { col, .. } => Some(col.as_str()),
        }
    }

    /// apply this scheme's kernel to `leaf`'s trait over elapsed time `dt`
    pub fn evolve(
        &self,
        tree: &Tree,
        continuous: &mut ContinuousMatrix,
        discrete: &mut DiscreteMatrix,
        leaf: NodeId,
        dt: f64,
        rng: &mut Random,
    ) -> EngineResult<()> {
        let name = tree.name(leaf)?.to_string();
        match self {
            Self::Null => Ok(()),
            Self::Markov { col, rate } => {
                let old = discrete.get(&name, col)?.to_string();
                let states = discrete.states(col)?;
                if states.contains(&old) && states.len() > 1 {
                    let p = 1.0 - (-rate * dt).exp();
                    if rng.bernoulli(p) {
                        let options: Vec<String> = states.iter().map(str::to_string).collect();
                        let old_index = options.iter().position(|s| s == &old).expect("state is a member");
                        let choice = rng.discrete_uniform_excluding(options.len(), old_index);
                        discrete.set(&name, col, &options[choice])?;
                    }
                }
                Ok(())
            }
            Self::RankedMarkov { col, p_rise, p_fall } => {
                let old = discrete.get(&name, col)?.to_string();
                let states = discrete.states(col)?.clone();
                if states.contains(&old) {
                    let draw = rng.uniform();
                    let new = if draw <= *p_rise {
                        states.successor(&old)
                    } else if draw <= p_rise + p_fall {
                        states.predecessor(&old)
                    } else {
                        None
                    };
                    if let Some(new) = new {
                        discrete.set(&name, col, new)?;
                    }
                }
                Ok(())
            }
            Self::Brownian {
                col,
                mean,
                stddev,
                punctuational,
                bounds,
                policy,
            } => {
                let old = continuous.get(&name, col)?;
                let effective_dt = if *punctuational { 1.0 } else { dt };
                let draw = |rng: &mut Random| rng.gaussian(mean * effective_dt, stddev * effective_dt.sqrt());
                let delta = draw(rng);
                let proposed = old + delta;
                let new = bounds.apply(*policy, proposed, rng, |rng| old + draw(rng));
                continuous.set(&name, col, new)?;
                Ok(())
            }
            Self::LogNormal {
                col,
                mean,
                stddev,
                punctuational,
                bounds,
                policy,
            } => {
                let old = continuous.get(&name, col)?;
                let effective_dt = if *punctuational { 1.0 } else { dt };
                let draw = |rng: &mut Random| rng.gaussian(mean * effective_dt, stddev * effective_dt.sqrt());
                let delta = draw(rng);
                let proposed = (old.ln() + delta).exp();
                let new = bounds.apply(*policy, proposed, rng, |rng| (old.ln() + draw(rng)).exp());
                continuous.set(&name, col, new)?;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf_tree() -> (Tree, NodeId) {
        let tree = Tree::seed();
        let leaf = tree.root();
        (tree, leaf)
    }

    #[test]
    fn null_scheme_is_a_no_op() {
        let (tree, leaf) = leaf_tree();
        let mut continuous = ContinuousMatrix::new();
        let mut discrete = DiscreteMatrix::new();
        let mut rng = Random::new(1);
        Scheme::Null.evolve(&tree, &mut continuous, &mut discrete, leaf, 1.0, &mut rng).unwrap();
    }

    #[test]
    fn brownian_truncate_stays_in_bounds() {
        let (tree, leaf) = leaf_tree();
        let mut continuous = ContinuousMatrix::new();
        continuous.append_cols(&["x".to_string()]);
        continuous.add_row(tree.name(leaf).unwrap());
        continuous.set(tree.name(leaf).unwrap(), "x", 0.0).unwrap();
        let discrete_unused = DiscreteMatrix::new();
        let mut discrete = discrete_unused;
        let scheme = Scheme::Brownian {
            col: "x".to_string(),
            mean: 0.0,
            stddev: 100.0,
            punctuational: true,
            bounds: Bounds::new(Some(-1.0), Some(1.0)),
            policy: BoundsPolicy::Truncate,
        };
        let mut rng = Random::new(2);
        for _ in 0..20 {
            scheme.evolve(&tree, &mut continuous, &mut discrete, leaf, 1.0, &mut rng).unwrap();
            let v = continuous.get(tree.name(leaf).unwrap(), "x").unwrap();
            assert!((-1.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn ranked_markov_rejects_invalid_probabilities() {
        assert!(Scheme::ranked_markov("x", 0.7, 0.7).is_err());
        assert!(Scheme::ranked_markov("x", 0.5, 0.5).is_ok());
    }

    #[test]
    fn ranked_markov_boundary_move_is_no_op() {
        let (tree, leaf) = leaf_tree();
        let mut continuous = ContinuousMatrix::new();
        let mut discrete = DiscreteMatrix::new();
        discrete.append_cols(&["size".to_string()]);
        discrete.add_row(tree.name(leaf).unwrap());
        discrete.set(tree.name(leaf).unwrap(), "size", "small").unwrap();
        discrete.set(tree.name(leaf).unwrap(), "size", "small").unwrap();
        // only one state observed so far; successor/predecessor of the only
        // state is itself
        let scheme = Scheme::ranked_markov("size", 1.0, 0.0).unwrap();
        let mut rng = Random::new(4);
        scheme.evolve(&tree, &mut continuous, &mut discrete, leaf, 1.0, &mut rng).unwrap();
        assert_eq!(discrete.get(tree.name(leaf).unwrap(), "size").unwrap(), "small");
    }

    #[test]
    fn markov_scheme_only_changes_state_with_multiple_states() {
        let (tree, leaf) = leaf_tree();
        let mut continuous = ContinuousMatrix::new();
        let mut discrete = DiscreteMatrix::new();
        discrete.append_cols(&["size".to_string()]);
        discrete.add_row(tree.name(leaf).unwrap());
        discrete.set(tree.name(leaf).unwrap(), "size", "small").unwrap();
        let scheme = Scheme::Markov { col: "size".to_string(), rate: 1e6 };
        let mut rng = Random::new(6);
        scheme.evolve(&tree, &mut continuous, &mut discrete, leaf, 1.0, &mut rng).unwrap();
        // with only one observed state, there's nothing to transition to
        assert_eq!(discrete.get(tree.name(leaf).unwrap(), "size").unwrap(), "small");
    }
}
