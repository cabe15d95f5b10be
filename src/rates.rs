//! Rate functions (spec §4.3): parameterised functions mapping a node's state
//! to an instantaneous rate.
//!
//! Formulas are grounded in `original_source/src/XRate.cpp`, the C++ engine
//! this crate was distilled from, since spec.md describes the shapes of
//! these curves but leaves exact constants to the source.

use crate::matrix::{ContinuousMatrix, DiscreteMatrix};
use crate::tree::{NodeId, Tree};
use std::collections::HashMap;

/// `sqrt(-ln(1/4))`, used to turn the normal rate's "inflexion" parameter
/// into a standard deviation (spec §4.3)
const INFLEXION_TO_STDDEV: f64 = 1.177_410_023;

/// which quantity a dependent rate function reads off a node
#[derive(Debug, Clone)]
pub enum DependentVariable {
    AgeSinceOrigin,
    ContinuousTrait(String),
    DiscreteTrait(String),
}

/// a read-only view of one node, handed to a rate function; mirrors the
/// subset of engine state a rate is allowed to depend on
pub struct NodeContext<'a> {
    pub tree: &'a Tree,
    pub continuous: &'a ContinuousMatrix,
    pub discrete: &'a DiscreteMatrix,
    pub node: NodeId,
    pub time_grain: f64,
}

impl NodeContext<'_> {
    fn dependent_value(&self, variable: &DependentVariable) -> f64 {
        match variable {
            DependentVariable::AgeSinceOrigin => self.tree.time_since_node_origin(self.node),
            DependentVariable::ContinuousTrait(col) => {
                let name = self.tree.name(self.node).unwrap_or("");
                self.continuous.get(name, col).unwrap_or(f64::NAN)
            }
            DependentVariable::DiscreteTrait(col) => {
                // only used by DiscreteLookup, which reads the state itself
                let _ = col;
                f64::NAN
            }
        }
    }
}

#[derive(Debug, Clone)]
pub enum RateKind {
    Constant(f64),
    Linear { slope: f64, intercept: f64 },
    TriParam { a: f64, b: f64, c: f64 },
    Log { base: f64 },
    Normal {
        peak_rate: f64,
        bg_rate: f64,
        mean: f64,
        inflexion: f64,
    },
    DiscreteLookup {
        table: HashMap<String, f64>,
        default: f64,
    },
}

/// `a*x^b + c`, with `x == 1.0` special-cased to `a + c` (source quirk: a
/// literal exponent of 1 short-circuits `pow`, `original_source/src/EvolRule.cpp`)
pub fn tri_param(a: f64, b: f64, c: f64, x: f64) -> f64 {
    if x == 1.0 {
        a + c
    } else {
        a * x.powf(b) + c
    }
}

/// `log_base(max(x, 1))`; the log of anything below 1 is undefined, so the
/// input is clamped first (spec §4.3)
pub fn log_rate(base: f64, x: f64) -> f64 {
    x.max(1.0).log(base)
}

/// a bell peaking at `peak_rate` when `x == mean`, asymptoting to `bg_rate`,
/// falling to half-height at `x == mean ± inflexion`.
///
/// Spec §4.3 writes this as `bg + (peak-bg)·φ(z)·(σ·√(2π))` where `φ` is the
/// standard normal density; the `σ·√(2π)` factor is exactly the density's own
/// normalising denominator, so it cancels and leaves the unnormalised kernel
/// `exp(-z²/2)`, which is what actually peaks at `peak_rate`.
pub fn normal_rate(peak_rate: f64, bg_rate: f64, mean: f64, inflexion: f64, x: f64) -> f64 {
    let stddev = inflexion / INFLEXION_TO_STDDEV;
    let z = (x - mean) / stddev;
    let scaling = peak_rate - bg_rate;
    (-0.5 * z * z).exp() * scaling + bg_rate
}

#[derive(Debug, Clone)]
pub struct RateFunction {
    pub kind: RateKind,
    pub dependent: DependentVariable,
}

impl RateFunction {
    pub fn constant(rate: f64) -> Self {
        Self {
            kind: RateKind::Constant(rate),
            dependent: DependentVariable::AgeSinceOrigin,
        }
    }

    /// the rate at `ctx.node`, clamped to `[0, 1/time_grain]` (spec §4.3)
    pub fn rate(&self, ctx: &NodeContext) -> f64 {
        let raw = match &self.kind {
            RateKind::Constant(rate) => *rate,
            RateKind::Linear { slope, intercept } => slope * ctx.dependent_value(&self.dependent) + intercept,
            RateKind::TriParam { a, b, c } => tri_param(*a, *b, *c, ctx.dependent_value(&self.dependent)),
            RateKind::Log { base } => log_rate(*base, ctx.dependent_value(&self.dependent)),
            RateKind::Normal { peak_rate, bg_rate, mean, inflexion } => {
                normal_rate(*peak_rate, *bg_rate, *mean, *inflexion, ctx.dependent_value(&self.dependent))
            }
            RateKind::DiscreteLookup { table, default } => {
                let col = match &self.dependent {
                    DependentVariable::DiscreteTrait(col) => col.as_str(),
                    _ => "",
                };
                let name = ctx.tree.name(ctx.node).unwrap_or("");
                let state = ctx.discrete.get(name, col).unwrap_or("?");
                *table.get(state).unwrap_or(default)
            }
        };
        raw.clamp(0.0, 1.0 / ctx.time_grain)
    }
}

impl crate::Arbitrary for RateFunction {
    fn random(rng: &mut crate::rng::Random) -> Self {
        let kind = match rng.discrete_uniform(4) {
            0 => RateKind::Constant(rng.uniform() * 2.0),
            1 => RateKind::Linear {
                slope: rng.uniform_range(-1.0, 1.0),
                intercept: rng.uniform(),
            },
            2 => RateKind::TriParam {
                a: rng.uniform(),
                b: rng.uniform_range(0.5, 2.0),
                c: rng.uniform(),
            },
            _ => RateKind::Normal {
                peak_rate: rng.uniform() * 2.0,
                bg_rate: rng.uniform() * 0.1,
                mean: rng.uniform_range(-5.0, 5.0),
                inflexion: rng.uniform() + 0.1,
            },
        };
        Self {
            kind,
            dependent: DependentVariable::AgeSinceOrigin,
        }
    }
}
