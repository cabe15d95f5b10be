//! Local rules (spec §4.5): waits evaluated once per living leaf.
//!
//! Grounded on `original_source/src/EvolRule.cpp`'s per-taxon speciation and
//! extinction rule variants.

use super::{calc_wait_from_rate, RuleCommit, RuleContext};
use crate::error::{EngineError, EngineResult};
use crate::rates::{NodeContext, RateFunction};
use crate::rng::Random;
use crate::tree::{NodeId, Tree};

#[derive(Debug, Clone)]
pub enum LocalRule {
    /// constant-rate speciation (`original_source/src/EvolRule.cpp`'s `MarkovSpRule`)
    MarkovSp { rate: f64 },
    /// logistic, diversity-dependent speciation: rate falls as the living
    /// leaf count approaches `capacity`
    LogisticSp { rate: f64, capacity: f64 },
    /// speciation withheld until a node has existed for `latency` time
    LatentSp { rate: f64, latency: f64 },
    /// speciation rate biased by node age via a tri-parameter curve
    AgeBiasedSp { a: f64, b: f64, c: f64 },
    /// speciation rate biased by a continuous trait via a tri-parameter curve
    CharBiasedSp { col: String, a: f64, b: f64, c: f64 },
    /// speciation rate from an arbitrary [`RateFunction`]
    RateFunctionSp { rate_fn: RateFunction },
    MarkovKill { rate: f64 },
    /// logistic, diversity-dependent extinction: rate rises as the living
    /// leaf count approaches `capacity`. The source's clamp is asymmetric
    /// with [`LocalRule::LogisticSp`] (spec §9 open question); preserved
    /// intentionally rather than "fixed" to match.
    LogisticKill { rate: f64, capacity: f64 },
    AgeBiasedKill { a: f64, b: f64, c: f64 },
    CharBiasedKill { col: String, a: f64, b: f64, c: f64 },
}

impl LocalRule {
    fn is_kill(&self) -> bool {
        matches!(
            self,
            Self::MarkovKill { .. }
                | Self::LogisticKill { .. }
                | Self::AgeBiasedKill { .. }
                | Self::CharBiasedKill { .. }
        )
    }

    fn effective_rate(&self, ctx: &RuleContext, leaf: NodeId) -> f64 {
        let living = ctx.tree.count_living_leaves() as f64;
        match self {
            Self::MarkovSp { rate } | Self::MarkovKill { rate } => *rate,
            Self::LogisticSp { rate, capacity } => (rate * (1.0 - living / capacity)).max(0.0),
            Self::LogisticKill { rate, capacity } => {
                // asymmetric by design (spec §9): speciation clamps to zero
                // above capacity, extinction instead saturates at `rate`
                (rate * (living / capacity)).max(0.0).min(*rate)
            }
            Self::LatentSp { rate, .. } => *rate,
            Self::AgeBiasedSp { a, b, c } | Self::AgeBiasedKill { a, b, c } => {
                crate::rates::tri_param(*a, *b, *c, ctx.tree.time_since_node_origin(leaf))
            }
            Self::CharBiasedSp { col, a, b, c } | Self::CharBiasedKill { col, a, b, c } => {
                let name = ctx.tree.name(leaf).unwrap_or("");
                let value = ctx.continuous.get(name, col).unwrap_or(0.0);
                crate::rates::tri_param(*a, *b, *c, value)
            }
            Self::RateFunctionSp { rate_fn } => {
                let node_ctx = NodeContext {
                    tree: ctx.tree,
                    continuous: ctx.continuous,
                    discrete: ctx.discrete,
                    node: leaf,
                    time_grain: ctx.time_grain,
                };
                rate_fn.rate(&node_ctx)
            }
        }
    }

    pub fn calc_next_wait(&self, leaf: NodeId, ctx: &RuleContext, rng: &mut Random) -> f64 {
        let rate = self.effective_rate(ctx, leaf).max(0.0);
        let wait = calc_wait_from_rate(rate, ctx.time_grain, rng);
        if let Self::LatentSp { latency, .. } = self {
            // latency hasn't elapsed yet: the wait is pushed out by whatever
            // remains of it, not zeroed out (`original_source/src/EvolRule.cpp:424-434`)
            wait + (latency - ctx.tree.edge_weight(leaf)).max(0.0)
        } else {
            wait
        }
    }

    /// apply this rule's effect to `leaf`: split it (speciation rules) or
    /// kill it (extinction rules); extinction on the root is refused since
    /// it would leave no living leaves at all (spec §4.5, §4.1)
    pub fn commit(&self, leaf: NodeId, tree: &mut Tree) -> EngineResult<RuleCommit> {
        if self.is_kill() {
            if tree.is_root(leaf) && tree.count_living_leaves() == 1 {
                return Err(EngineError::not_applicable(
                    "cannot kill the last living leaf",
                ));
            }
            tree.kill_leaf(leaf)?;
            Ok(RuleCommit {
                subjects: vec![leaf],
                speciated: None,
            })
        } else {
            tree.speciate(leaf)?;
            Ok(RuleCommit {
                subjects: vec![leaf],
                speciated: Some(leaf),
            })
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::MarkovSp { rate } => format!("speciation (rate {rate})"),
            Self::LogisticSp { capacity, .. } => format!("diversity-dependent speciation (capacity {capacity})"),
            Self::LatentSp { latency, .. } => format!("latent speciation (latency {latency})"),
            Self::AgeBiasedSp { .. } => "age-biased speciation".to_string(),
            Self::CharBiasedSp { col, .. } => format!("trait-biased speciation on {col}"),
            Self::RateFunctionSp { .. } => "speciation (custom rate function)".to_string(),
            Self::MarkovKill { rate } => format!("extinction (rate {rate})"),
            Self::LogisticKill { capacity, .. } => format!("diversity-dependent extinction (capacity {capacity})"),
            Self::AgeBiasedKill { .. } => "age-biased extinction".to_string(),
            Self::CharBiasedKill { col, .. } => format!("trait-biased extinction on {col}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::{ContinuousMatrix, DiscreteMatrix};

    fn ctx<'a>(tree: &'a Tree, continuous: &'a ContinuousMatrix, discrete: &'a DiscreteMatrix) -> RuleContext<'a> {
        RuleContext { tree, continuous, discrete, time_grain: 1e-6 }
    }

    #[test]
    fn markov_sp_commit_speciates_and_flags_the_event() {
        let mut tree = Tree::seed();
        let root = tree.root();
        let rule = LocalRule::MarkovSp { rate: 1.0 };
        let commit = rule.commit(root, &mut tree).unwrap();
        assert_eq!(commit.speciated, Some(root));
        assert!(tree.is_internal(root));
        assert_eq!(tree.count_leaves(), 2);
    }

    #[test]
    fn markov_kill_refuses_to_remove_last_leaf() {
        let mut tree = Tree::seed();
        let root = tree.root();
        let rule = LocalRule::MarkovKill { rate: 1.0 };
        let err = rule.commit(root, &mut tree).unwrap_err();
        assert!(err.is_not_applicable());
    }

    #[test]
    fn markov_kill_succeeds_with_siblings_present() {
        let mut tree = Tree::seed();
        let root = tree.root();
        let (a, b) = tree.speciate(root).unwrap();
        let rule = LocalRule::MarkovKill { rate: 1.0 };
        let commit = rule.commit(a, &mut tree).unwrap();
        assert_eq!(commit.subjects, vec![a]);
        assert!(tree.is_dead(a));
        assert!(tree.is_alive(b));
    }

    #[test]
    fn logistic_sp_rate_falls_to_zero_at_capacity() {
        let mut tree = Tree::seed();
        let root = tree.root();
        let (a, _b) = tree.speciate(root).unwrap();
        let continuous = ContinuousMatrix::new();
        let discrete = DiscreteMatrix::new();
        let context = ctx(&tree, &continuous, &discrete);
        let rule = LocalRule::LogisticSp { rate: 1.0, capacity: 2.0 };
        assert_eq!(rule.effective_rate(&context, a), 0.0);
    }

    #[test]
    fn logistic_kill_rate_saturates_at_base_rate_above_capacity() {
        let mut tree = Tree::seed();
        let root = tree.root();
        let (a, b) = tree.speciate(root).unwrap();
        tree.speciate(a).unwrap();
        tree.speciate(b).unwrap();
        let continuous = ContinuousMatrix::new();
        let discrete = DiscreteMatrix::new();
        let context = ctx(&tree, &continuous, &discrete);
        // 4 living leaves, capacity 2: raw rate would be rate * 2, clamped to rate
        let rule = LocalRule::LogisticKill { rate: 1.0, capacity: 2.0 };
        assert_eq!(rule.effective_rate(&context, a), 1.0);
    }

    #[test]
    fn latent_sp_pushes_wait_out_by_remaining_latency() {
        let mut tree = Tree::seed();
        let root = tree.root();
        let (a, _b) = tree.speciate(root).unwrap();
        let continuous = ContinuousMatrix::new();
        let discrete = DiscreteMatrix::new();
        let rule = LocalRule::LatentSp { rate: 1.0, latency: 5.0 };
        let bare = LocalRule::MarkovSp { rate: 1.0 };
        {
            // edge weight 0: at least the full remaining latency is added on
            // top of whatever the bare exponential draw would have been
            let context = ctx(&tree, &continuous, &discrete);
            let mut latent_rng = Random::new(11);
            let mut bare_rng = Random::new(11);
            let latent_wait = rule.calc_next_wait(a, &context, &mut latent_rng);
            let bare_wait = bare.calc_next_wait(a, &context, &mut bare_rng);
            assert!(latent_wait >= bare_wait + 5.0 - 1e-9);
        }
        tree.set_edge_weight(a, 10.0).unwrap();
        let context = ctx(&tree, &continuous, &discrete);
        // latency already elapsed: no offset beyond the bare exponential draw
        let mut latent_rng = Random::new(11);
        let mut bare_rng = Random::new(11);
        let latent_wait = rule.calc_next_wait(a, &context, &mut latent_rng);
        let bare_wait = bare.calc_next_wait(a, &context, &mut bare_rng);
        assert_eq!(latent_wait, bare_wait);
    }
}
