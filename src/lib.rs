//! Interactive engine for stochastic macroevolutionary simulation on phylogenetic trees.
//!
//! This crate is a library: it owns the simulation core (tree store, trait
//! matrices, rules, schemes, the epoch scheduler, and analyses) and exposes it
//! through [`engine::Engine`]. Everything outside the core — file formats,
//! console menus, the PRNG's internal algorithm — is the embedding
//! application's job; this crate only defines the seams (`Reporter`, the
//! Newick writer, `Random`) those collaborators plug into.

pub mod actions;
pub mod analysis;
pub mod engine;
pub mod epoch;
pub mod error;
pub mod matrix;
pub mod persist;
pub mod preferences;
pub mod rates;
pub mod report;
pub mod rng;
pub mod rules;
pub mod schemes;
pub mod tree;

pub use engine::Engine;
pub use error::{EngineError, EngineResult};

/// dimensional aliases, kept distinct from bare `f64` so signatures read clearly
pub type Time = f64;
pub type Rate = f64;
pub type Probability = f64;

/// trait for arbitrary/randomised construction, mainly for property tests
pub trait Arbitrary {
    fn random(rng: &mut rng::Random) -> Self;
}
