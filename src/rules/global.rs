//! Global rules (spec §4.5): waits evaluated once per epoch step, not per leaf.
//!
//! Grounded on `original_source/src/EvolRule.cpp`'s `MassKillRule` family.

use super::predicate::TraitPredicate;
use super::{calc_wait_from_rate, RuleCommit, RuleContext};
use crate::error::EngineResult;
use crate::matrix::{ContinuousMatrix, DiscreteMatrix};
use crate::rates::tri_param;
use crate::rng::Random;
use crate::tree::Tree;

#[derive(Debug, Clone)]
pub enum GlobalRule {
    /// the metronome: fires on its own clock but changes nothing
    Null { rate: f64 },
    MassKillFixedNum { rate: f64, abs_num: usize },
    MassKillFraction { rate: f64, fraction: f64 },
    /// spec §9 open question: the source stores this probability in an
    /// integer field while comparing it to a `[0,1)` draw, almost certainly
    /// a bug; this crate uses a real-valued field
    MassKillProb { rate: f64, prob: f64 },
    MassKillPredicate { rate: f64, predicate: TraitPredicate },
    /// per-taxon kill probability from a tri-parameter curve over a
    /// continuous trait (`original_source/src/EvolRule.cpp`'s `MassKillTraitBiasedRule`)
    MassKillTraitBiased { rate: f64, col: String, a: f64, b: f64, c: f64 },
}

impl GlobalRule {
    pub fn rate(&self) -> f64 {
        match self {
            Self::Null { rate }
            | Self::MassKillFixedNum { rate, .. }
            | Self::MassKillFraction { rate, .. }
            | Self::MassKillProb { rate, .. }
            | Self::MassKillPredicate { rate, .. }
            | Self::MassKillTraitBiased { rate, .. } => *rate,
        }
    }

    pub fn calc_next_wait(&self, ctx: &RuleContext, rng: &mut Random) -> f64 {
        calc_wait_from_rate(self.rate(), ctx.time_grain, rng)
    }

    fn select_targets(
        &self,
        tree: &Tree,
        continuous: &ContinuousMatrix,
        discrete: &DiscreteMatrix,
        rng: &mut Random,
    ) -> Vec<crate::tree::NodeId> {
        let mut living = tree.living_leaves();
        match self {
            Self::Null { .. } => Vec::new(),
            Self::MassKillFixedNum { abs_num, .. } => {
                rng.shuffle(&mut living);
                living.truncate(*abs_num);
                living
            }
            Self::MassKillFraction { fraction, .. } => {
                let count = ((living.len() as f64) * fraction) as usize;
                rng.shuffle(&mut living);
                living.truncate(count);
                living
            }
            Self::MassKillProb { prob, .. } => living.into_iter().filter(|_| rng.bernoulli(*prob)).collect(),
            Self::MassKillPredicate { predicate, .. } => living
                .into_iter()
                .filter(|&n| {
                    let name = tree.name(n).unwrap_or("");
                    predicate.test(name, continuous, discrete)
                })
                .collect(),
            Self::MassKillTraitBiased { col, a, b, c, .. } => living
                .into_iter()
                .filter(|&n| {
                    let name = tree.name(n).unwrap_or("");
                    let value = continuous.get(name, col).unwrap_or(0.0);
                    let prob = tri_param(*a, *b, *c, value);
                    rng.bernoulli(prob)
                })
                .collect(),
        }
    }

    pub fn commit(
        &self,
        tree: &mut Tree,
        continuous: &ContinuousMatrix,
        discrete: &DiscreteMatrix,
        rng: &mut Random,
    ) -> EngineResult<RuleCommit> {
        let targets = self.select_targets(tree, continuous, discrete, rng);
        for &leaf in &targets {
            tree.kill_leaf(leaf)?;
        }
        Ok(RuleCommit {
            subjects: targets,
            speciated: None,
        })
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Null { rate } => format!("null rule (rate {rate})"),
            Self::MassKillFixedNum { abs_num, .. } => format!("mass extinction (kill {abs_num} species)"),
            Self::MassKillFraction { fraction, .. } => format!("mass extinction (kill {:.1}% of species)", fraction * 100.0),
            Self::MassKillProb { prob, .. } => format!("mass extinction (p={prob} per taxon)"),
            Self::MassKillPredicate { .. } => "mass extinction (predicate-selected)".to_string(),
            Self::MassKillTraitBiased { col, .. } => format!("mass extinction (trait-biased on {col})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn five_leaf_tree() -> Tree {
        let mut tree = Tree::seed();
        let root = tree.root();
        let (a, b) = tree.speciate(root).unwrap();
        let (c, _d) = tree.speciate(a).unwrap();
        tree.speciate(b).unwrap();
        tree.speciate(c).unwrap();
        tree
    }

    #[test]
    fn mass_kill_fixed_num_kills_exactly_n() {
        let mut tree = five_leaf_tree();
        assert_eq!(tree.count_living_leaves(), 5);
        let continuous = ContinuousMatrix::new();
        let discrete = DiscreteMatrix::new();
        let mut rng = Random::new(11);
        let rule = GlobalRule::MassKillFixedNum { rate: 1e6, abs_num: 3 };
        let commit = rule.commit(&mut tree, &continuous, &discrete, &mut rng).unwrap();
        assert_eq!(commit.subjects.len(), 3);
        assert_eq!(tree.count_nodes(), 9);
        assert_eq!(tree.count_living_leaves(), 2);
    }

    #[test]
    fn zero_rate_yields_sentinel_wait() {
        let tree = Tree::seed();
        let continuous = ContinuousMatrix::new();
        let discrete = DiscreteMatrix::new();
        let ctx = RuleContext { tree: &tree, continuous: &continuous, discrete: &discrete, time_grain: 1e-6 };
        let mut rng = Random::new(1);
        let rule = GlobalRule::Null { rate: 0.0 };
        assert_eq!(rule.calc_next_wait(&ctx, &mut rng), super::super::STATIONARY_WAIT);
    }

    #[test]
    fn next_wait_is_deterministic_given_seed_and_floored() {
        let tree = Tree::seed();
        let continuous = ContinuousMatrix::new();
        let discrete = DiscreteMatrix::new();
        let ctx = RuleContext { tree: &tree, continuous: &continuous, discrete: &discrete, time_grain: 0.01 };
        let rule = GlobalRule::Null { rate: 1.0 };
        let mut a = Random::new(5);
        let mut b = Random::new(5);
        let wait_a = rule.calc_next_wait(&ctx, &mut a);
        let wait_b = rule.calc_next_wait(&ctx, &mut b);
        assert_eq!(wait_a, wait_b);
        assert!(wait_a >= 0.01);
    }
}
