//! The random service (spec §4.3): sole source of stochasticity in the engine.
//!
//! Every draw funnels through [`Random`] so that a fixed seed makes a whole
//! simulation deterministic (spec §5, "Randomness as ordering"). The
//! underlying generator is `rand`'s `SmallRng`; everything above that
//! (Gaussian sampling via Box-Muller, shuffles, exponential waits) is part of
//! this crate's core, not delegated to an external library.

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;

pub struct Random {
    rng: SmallRng,
}

impl Random {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// uniform draw on `[0, 1)`
    pub fn uniform(&mut self) -> f64 {
        self.rng.random::<f64>()
    }

    /// uniform draw on `[lo, hi)`
    pub fn uniform_range(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.uniform()
    }

    /// discrete uniform draw on `0..n`, panics if `n == 0`
    pub fn discrete_uniform(&mut self, n: usize) -> usize {
        self.rng.random_range(0..n)
    }

    /// discrete uniform draw on `0..n` excluding `exclude`
    pub fn discrete_uniform_excluding(&mut self, n: usize, exclude: usize) -> usize {
        assert!(n > 1, "cannot draw excluding the only option");
        loop {
            let choice = self.discrete_uniform(n);
            if choice != exclude {
                return choice;
            }
        }
    }

    /// Gaussian draw via Box-Muller
    pub fn gaussian(&mut self, mean: f64, stddev: f64) -> f64 {
        let u1 = self.uniform().max(f64::MIN_POSITIVE);
        let u2 = self.uniform();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos();
        mean + stddev * z
    }

    pub fn bernoulli(&mut self, p: f64) -> bool {
        self.uniform() < p
    }

    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.rng);
    }

    /// `-ln(U(0,1)) / rate`, the wait until the next event of a Poisson
    /// process firing at `rate`. Callers are responsible for the `time_grain`
    /// floor (spec §4.5); a zero rate yields an infinite wait here.
    pub fn exponential_wait(&mut self, rate: f64) -> f64 {
        if rate <= 0.0 {
            return f64::INFINITY;
        }
        -self.uniform().max(f64::MIN_POSITIVE).ln() / rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_given_seed() {
        let mut a = Random::new(42);
        let mut b = Random::new(42);
        for _ in 0..16 {
            assert_eq!(a.uniform(), b.uniform());
        }
    }

    #[test]
    fn uniform_is_in_unit_interval() {
        let mut rng = Random::new(7);
        for _ in 0..1000 {
            let u = rng.uniform();
            assert!((0.0..1.0).contains(&u));
        }
    }

    #[test]
    fn discrete_uniform_excludes() {
        let mut rng = Random::new(3);
        for _ in 0..100 {
            assert_ne!(rng.discrete_uniform_excluding(3, 1), 1);
        }
    }

    #[test]
    fn exponential_wait_is_nonnegative() {
        let mut rng = Random::new(9);
        for _ in 0..100 {
            assert!(rng.exponential_wait(2.0) >= 0.0);
        }
    }
}
