//! Value bounds and the policy used to enforce them during continuous trait
//! evolution (spec §3, §4.4).

use crate::rng::Random;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundsPolicy {
    Ignore,
    Truncate,
    Replace,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Bounds {
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

impl Bounds {
    pub fn new(lower: Option<f64>, upper: Option<f64>) -> Self {
        Self { lower, upper }
    }

    pub fn contains(&self, v: f64) -> bool {
        self.lower.is_none_or(|lo| lo <= v) && self.upper.is_none_or(|hi| v <= hi)
    }

    pub fn clamp(&self, v: f64) -> f64 {
        let v = self.lower.map_or(v, |lo| v.max(lo));
        self.upper.map_or(v, |hi| v.min(hi))
    }

    /// apply `policy` to a proposed value; `redraw` produces a fresh proposal
    /// for the `Replace` policy, which keeps drawing until the result is
    /// in-bounds (spec §4.4)
    pub fn apply(&self, policy: BoundsPolicy, proposed: f64, rng: &mut Random, mut redraw: impl FnMut(&mut Random) -> f64) -> f64 {
        match policy {
            BoundsPolicy::Ignore => proposed,
            BoundsPolicy::Truncate => self.clamp(proposed),
            BoundsPolicy::Replace => {
                let mut value = proposed;
                let mut attempts = 0;
                while !self.contains(value) {
                    value = redraw(rng);
                    attempts += 1;
                    if attempts > 10_000 {
                        // bounds are unreachable from this kernel; fall back
                        // to truncation rather than loop forever
                        return self.clamp(value);
                    }
                }
                value
            }
        }
    }
}

impl crate::Arbitrary for Bounds {
    fn random(rng: &mut Random) -> Self {
        let lo = rng.uniform() * 10.0 - 5.0;
        let hi = lo + rng.uniform() * 10.0;
        match rng.discrete_uniform(3) {
            0 => Bounds::new(None, None),
            1 => Bounds::new(Some(lo), None),
            _ => Bounds::new(Some(lo), Some(hi)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Arbitrary;

    #[test]
    fn random_bounds_are_internally_consistent() {
        let mut rng = Random::new(7);
        for _ in 0..50 {
            let bounds = Bounds::random(&mut rng);
            if let (Some(lo), Some(hi)) = (bounds.lower, bounds.upper) {
                assert!(lo <= hi);
                assert!(bounds.contains(lo) && bounds.contains(hi));
            }
        }
    }

    #[test]
    fn unbounded_contains_everything() {
        let bounds = Bounds::default();
        assert!(bounds.contains(f64::MAX));
        assert!(bounds.contains(f64::MIN));
    }

    #[test]
    fn truncate_clamps_to_boundary() {
        let bounds = Bounds::new(Some(-5.0), Some(5.0));
        let mut rng = Random::new(1);
        assert_eq!(bounds.apply(BoundsPolicy::Truncate, 10.0, &mut rng, |_| 0.0), 5.0);
        assert_eq!(bounds.apply(BoundsPolicy::Truncate, -10.0, &mut rng, |_| 0.0), -5.0);
    }

    #[test]
    fn replace_redraws_until_in_bounds() {
        let bounds = Bounds::new(Some(0.0), Some(1.0));
        let mut rng = Random::new(2);
        let mut calls = 0;
        let result = bounds.apply(BoundsPolicy::Replace, 5.0, &mut rng, |_| {
            calls += 1;
            if calls < 3 {
                5.0
            } else {
                0.5
            }
        });
        assert_eq!(result, 0.5);
        assert_eq!(calls, 3);
    }
}
