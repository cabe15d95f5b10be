//! Evolutionary rules (spec §4.5): the unit of simulated event. The three
//! families (global, local, conditional) are disjoint, modelled here as a
//! tagged enum rather than the source's dynamic-cast hierarchy (spec §9).

pub mod conditional;
pub mod global;
pub mod local;
pub mod predicate;

pub use conditional::ConditionalRule;
pub use global::GlobalRule;
pub use local::LocalRule;

use crate::matrix::{ContinuousMatrix, DiscreteMatrix};
use crate::rng::Random;
use crate::tree::{NodeId, Tree};

/// a read-only view of world state a rule's wait calculation may consult
pub struct RuleContext<'a> {
    pub tree: &'a Tree,
    pub continuous: &'a ContinuousMatrix,
    pub discrete: &'a DiscreteMatrix,
    pub time_grain: f64,
}

/// the sentinel wait used when a rule's rate is zero (spec §4.5, §9); large
/// enough that only a time-limit epoch predicate will ever stop the clock
pub const STATIONARY_WAIT: f64 = 1_000_000.0;

/// `-ln(U)/rate` floored at `time_grain`, or [`STATIONARY_WAIT`] when the
/// rate is non-positive (spec §4.5)
pub fn calc_wait_from_rate(rate: f64, time_grain: f64, rng: &mut Random) -> f64 {
    if rate <= 0.0 {
        STATIONARY_WAIT
    } else {
        rng.exponential_wait(rate).max(time_grain)
    }
}

/// what a rule's commit changed, for the epoch scheduler to act on (spec §4.6)
#[derive(Debug, Clone, Default)]
pub struct RuleCommit {
    /// the subject nodes handed to conditionals: the killed set for a
    /// mass-kill, the single firing leaf for a local rule, empty for the
    /// null rule
    pub subjects: Vec<NodeId>,
    /// set when this commit was a speciation: the node that split, so the
    /// epoch scheduler can clone trait rows onto its fresh children
    /// regardless of which rule performed the split
    pub speciated: Option<NodeId>,
}

/// the three disjoint rule families (spec §4.5)
#[derive(Debug, Clone)]
pub enum Rule {
    Global(GlobalRule),
    Local(LocalRule),
    Conditional(ConditionalRule),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    Global,
    Local,
    Conditional,
}

impl Rule {
    pub fn kind(&self) -> RuleKind {
        match self {
            Self::Global(_) => RuleKind::Global,
            Self::Local(_) => RuleKind::Local,
            Self::Conditional(_) => RuleKind::Conditional,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Global(rule) => rule.describe(),
            Self::Local(rule) => rule.describe(),
            Self::Conditional(rule) => rule.describe(),
        }
    }
}
