//! Tree-shape analyses (spec §4.9), grounded on the imbalance-statistic
//! family declared in `Analysis.h` (`SlowinskiGuyerAnalysis`,
//! `ShaosNbarAnalysis`, `ShaosSigmaSqAnalysis`, `CollessCAnalysis`,
//! `B1Analysis`, `B2Analysis`, `StemminessAnalysis`, `UltrametricAnalysis`).

use super::Analysis;
use crate::engine::Engine;
use crate::error::{EngineError, EngineResult};
use crate::tree::{NodeId, Tree};

fn subtree_leaf_count(tree: &Tree, n: NodeId) -> usize {
    if tree.is_leaf(n) {
        1
    } else {
        tree.children(n).iter().map(|&c| subtree_leaf_count(tree, c)).sum()
    }
}

/// bifurcating internal nodes paired with their two children's subtended
/// leaf counts, in node-id order
fn bifurcating_splits(tree: &Tree) -> Vec<(usize, usize)> {
    tree.node_ids()
        .filter(|&n| tree.is_bifurcating(n))
        .map(|n| {
            let kids = tree.children(n);
            (subtree_leaf_count(tree, kids[0]), subtree_leaf_count(tree, kids[1]))
        })
        .collect()
}

/// Fusco's I (and its even-total correction I′), weighted across every
/// internal bifurcating node with at least 4 subtended tips (spec §4.9)
#[derive(Debug, Default)]
pub struct FuscoImbalance;

impl Analysis for FuscoImbalance {
    fn name(&self) -> String {
        "Fusco imbalance".to_string()
    }
    fn measure(&mut self, engine: &mut Engine) -> EngineResult<Vec<String>> {
        let tree = engine.trees.active()?;
        let mut weighted_sum = 0.0;
        let mut weight_total = 0.0;
        let mut nodes_tested = 0usize;
        for (c1, c2) in bifurcating_splits(tree) {
            let total = c1 + c2;
            if total < 4 {
                continue;
            }
            nodes_tested += 1;
            let big = c1.max(c2) as f64;
            let total_f = total as f64;
            let min_total = (total_f / 2.0).ceil();
            let max_total = total_f - 1.0;
            let i = if max_total > min_total {
                (big - min_total) / (max_total - min_total)
            } else {
                0.0
            };
            let even = total % 2 == 0;
            let i_prime = if even { i * (total_f - 1.0) / total_f } else { i };
            let weight = if !even {
                1.0
            } else if i > 0.0 {
                (total_f - 1.0) / total_f
            } else {
                2.0 * (total_f - 1.0) / total_f
            };
            weighted_sum += weight * i_prime;
            weight_total += weight;
        }
        if nodes_tested == 0 {
            return Err(EngineError::not_applicable("no internal node subtends >= 4 tips"));
        }
        let value = weighted_sum / weight_total;
        Ok(vec![self.name(), value.to_string(), "nodes tested".to_string(), nodes_tested.to_string()])
    }
}

/// Slowinski-Guyer test applied to every bifurcating internal node: flagged
/// when `big/total >= 0.9`, significant when `2*small/(total-1) <= 0.05` (spec §4.9)
#[derive(Debug, Default)]
pub struct SlowinskiGuyer;

impl Analysis for SlowinskiGuyer {
    fn name(&self) -> String {
        "Slowinski-Guyer test".to_string()
    }
    fn measure(&mut self, engine: &mut Engine) -> EngineResult<Vec<String>> {
        let tree = engine.trees.active()?;
        let splits = bifurcating_splits(tree);
        if splits.is_empty() {
            return Err(EngineError::not_applicable("no bifurcating internal nodes"));
        }
        let mut flagged = 0usize;
        let mut significant = 0usize;
        for (c1, c2) in &splits {
            let total = (c1 + c2) as f64;
            let big = (*c1).max(*c2) as f64;
            let small = (*c1).min(*c2) as f64;
            if total > 0.0 && big / total >= 0.9 {
                flagged += 1;
            }
            if total > 1.0 && 2.0 * small / (total - 1.0) <= 0.05 {
                significant += 1;
            }
        }
        Ok(vec![
            self.name(),
            "flagged".to_string(),
            flagged.to_string(),
            "significant".to_string(),
            significant.to_string(),
            "nodes tested".to_string(),
            splits.len().to_string(),
        ])
    }
}

fn mean_and_population_variance(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance)
}

/// edges from `n` up to the root (`original_source/SimpleTree.h`'s
/// `getHeight`: `0` at the root, else `1 + getHeight(parent)`)
fn root_depth(tree: &Tree, n: NodeId) -> usize {
    let mut depth = 0;
    let mut cur = n;
    while let Some(parent) = tree.parent(cur) {
        depth += 1;
        cur = parent;
    }
    depth
}

/// mean root-depth over every leaf (`original_source/src/Analysis.cpp`
/// `ShaosNbarAnalysis`: `sum(getHeight(leaf)) / numLeaves`, over every leaf,
/// not just bifurcating splits)
#[derive(Debug, Default)]
pub struct ShaoNbar;

impl Analysis for ShaoNbar {
    fn name(&self) -> String {
        "Shao & Sokal's N-bar imbalance".to_string()
    }
    fn measure(&mut self, engine: &mut Engine) -> EngineResult<Vec<String>> {
        let tree = engine.trees.active()?;
        if tree.count_nodes() <= 1 {
            return Err(EngineError::not_applicable("tree is too small"));
        }
        let leaves = tree.leaves();
        let sum_depth: usize = leaves.iter().map(|&n| root_depth(tree, n)).sum();
        let mean = sum_depth as f64 / leaves.len() as f64;
        Ok(vec![self.name(), mean.to_string()])
    }
}

/// population variance of every leaf's root-depth (`original_source/src/Analysis.cpp`
/// `ShaosSigmaSqAnalysis`)
#[derive(Debug, Default)]
pub struct ShaoSigmaSq;

impl Analysis for ShaoSigmaSq {
    fn name(&self) -> String {
        "Shao & Sokal's sigma-squared imbalance".to_string()
    }
    fn measure(&mut self, engine: &mut Engine) -> EngineResult<Vec<String>> {
        let tree = engine.trees.active()?;
        if tree.count_nodes() <= 1 {
            return Err(EngineError::not_applicable("tree is too small"));
        }
        let leaves = tree.leaves();
        let depths: Vec<f64> = leaves.iter().map(|&n| root_depth(tree, n) as f64).collect();
        let (_, variance) = mean_and_population_variance(&depths);
        Ok(vec![self.name(), variance.to_string()])
    }
}

/// Colless' C; N/A on any polytomy (spec §4.9)
#[derive(Debug, Default)]
pub struct CollessC;

impl Analysis for CollessC {
    fn name(&self) -> String {
        "Colless' C".to_string()
    }
    fn measure(&mut self, engine: &mut Engine) -> EngineResult<Vec<String>> {
        let tree = engine.trees.active()?;
        if tree.internal_nodes().iter().any(|&n| tree.count_children(n) > 2) {
            return Err(EngineError::not_applicable("tree contains a polytomy"));
        }
        let leaves = tree.count_leaves();
        if leaves < 3 {
            return Err(EngineError::not_applicable("fewer than 3 leaves"));
        }
        let raw: usize = bifurcating_splits(tree).iter().map(|(c1, c2)| c1.abs_diff(*c2)).sum();
        let normalized = 2.0 * raw as f64 / ((leaves - 1) * (leaves - 2)) as f64;
        Ok(vec![self.name(), normalized.to_string(), "raw sum".to_string(), raw.to_string()])
    }
}

/// `sum(1/height(n))` over non-root internal nodes (spec §4.9)
#[derive(Debug, Default)]
pub struct B1;

impl Analysis for B1 {
    fn name(&self) -> String {
        "B1".to_string()
    }
    fn measure(&mut self, engine: &mut Engine) -> EngineResult<Vec<String>> {
        let tree = engine.trees.active()?;
        let non_root_internal: Vec<NodeId> = tree.internal_nodes().into_iter().filter(|&n| !tree.is_root(n)).collect();
        if non_root_internal.is_empty() {
            return Err(EngineError::not_applicable("no non-root internal nodes"));
        }
        let value: f64 = non_root_internal.into_iter().map(|n| 1.0 / tree.height(n) as f64).sum();
        Ok(vec![self.name(), value.to_string()])
    }
}

fn leaf_reach_probability(tree: &Tree, leaf: NodeId) -> f64 {
    let mut p = 1.0;
    let mut cur = leaf;
    while let Some(parent) = tree.parent(cur) {
        p /= tree.count_children(parent) as f64;
        cur = parent;
    }
    p
}

/// Shannon entropy of the random-walk-from-root tip-reach probabilities (spec §4.9)
#[derive(Debug, Default)]
pub struct B2;

impl Analysis for B2 {
    fn name(&self) -> String {
        "B2".to_string()
    }
    fn measure(&mut self, engine: &mut Engine) -> EngineResult<Vec<String>> {
        let tree = engine.trees.active()?;
        let leaves = tree.leaves();
        if leaves.len() < 2 {
            return Err(EngineError::not_applicable("fewer than 2 leaves"));
        }
        let value: f64 = leaves
            .into_iter()
            .map(|leaf| leaf_reach_probability(tree, leaf))
            .map(|p| -p * p.log2())
            .sum();
        Ok(vec![self.name(), value.to_string()])
    }
}

/// mean over non-root internal nodes of `edge_weight / parent_age_from_root`,
/// where `parent_age_from_root = tree_age - time_from_node_to_root(parent)` (spec §4.9)
#[derive(Debug, Default)]
pub struct Stemminess;

impl Analysis for Stemminess {
    fn name(&self) -> String {
        "stemminess".to_string()
    }
    fn measure(&mut self, engine: &mut Engine) -> EngineResult<Vec<String>> {
        let tree = engine.trees.active()?;
        let age = tree.tree_age();
        let mut ratios = Vec::new();
        for n in tree.internal_nodes() {
            if tree.is_root(n) {
                continue;
            }
            let parent = tree.parent(n).expect("non-root has a parent");
            let parent_age = age - tree.time_from_node_to_root(parent);
            if parent_age > 0.0 {
                ratios.push(tree.edge_weight(n) / parent_age);
            }
        }
        if ratios.is_empty() {
            return Err(EngineError::not_applicable("no non-root internal node with positive parent age"));
        }
        let mean = ratios.iter().sum::<f64>() / ratios.len() as f64;
        Ok(vec![self.name(), mean.to_string()])
    }
}

/// internal branches / (leaves - 2) (spec §4.9)
#[derive(Debug, Default)]
pub struct Resolution;

impl Analysis for Resolution {
    fn name(&self) -> String {
        "resolution".to_string()
    }
    fn measure(&mut self, engine: &mut Engine) -> EngineResult<Vec<String>> {
        let tree = engine.trees.active()?;
        let leaves = tree.count_leaves();
        if leaves < 3 {
            return Err(EngineError::not_applicable("fewer than 3 leaves"));
        }
        let internal = tree.internal_nodes().len();
        let internal_branches = internal.saturating_sub(1);
        let value = internal_branches as f64 / (leaves as f64 - 2.0);
        Ok(vec![self.name(), value.to_string()])
    }
}

/// `true` if `(max_tip_to_root - min_tip_to_root) / max_tip_to_root < 0.001` (spec §4.9)
#[derive(Debug, Default)]
pub struct Ultrametric;

impl Analysis for Ultrametric {
    fn name(&self) -> String {
        "ultrametric".to_string()
    }
    fn measure(&mut self, engine: &mut Engine) -> EngineResult<Vec<String>> {
        let tree = engine.trees.active()?;
        let depths: Vec<f64> = tree.leaves().into_iter().map(|n| tree.time_from_node_to_root(n)).collect();
        if depths.is_empty() {
            return Err(EngineError::not_applicable("tree has no leaves"));
        }
        let max = depths.iter().cloned().fold(0.0, f64::max);
        let min = depths.iter().cloned().fold(f64::INFINITY, f64::min);
        let value = if max > 0.0 { (max - min) / max < 0.001 } else { true };
        Ok(vec![self.name(), value.to_string()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preferences::Preferences;
    use crate::report::RecordingReporter;

    fn balanced_four_tip_tree() -> Engine {
        let mut engine = Engine::new(Preferences::default(), Box::new(RecordingReporter::new()));
        engine.seed_tree();
        let root = engine.trees.active().unwrap().root();
        let (l, r) = engine.trees.active_mut().unwrap().speciate(root).unwrap();
        engine.trees.active_mut().unwrap().speciate(l).unwrap();
        engine.trees.active_mut().unwrap().speciate(r).unwrap();
        engine
    }

    #[test]
    fn fusco_is_zero_on_a_perfectly_balanced_four_tip_tree() {
        let mut engine = balanced_four_tip_tree();
        let row = FuscoImbalance.measure(&mut engine).unwrap();
        let value: f64 = row[1].parse().unwrap();
        assert!(value.abs() < 1e-9);
    }

    #[test]
    fn colless_c_is_zero_on_a_perfectly_balanced_tree() {
        let mut engine = balanced_four_tip_tree();
        let row = CollessC.measure(&mut engine).unwrap();
        let value: f64 = row[1].parse().unwrap();
        assert_eq!(value, 0.0);
    }

    #[test]
    fn colless_c_is_not_applicable_on_a_single_node_tree() {
        let mut engine = Engine::new(Preferences::default(), Box::new(RecordingReporter::new()));
        engine.seed_tree();
        assert!(CollessC.measure(&mut engine).is_err());
    }

    #[test]
    fn ultrametric_true_when_all_tips_at_equal_depth() {
        let mut engine = balanced_four_tip_tree();
        let row = Ultrametric.measure(&mut engine).unwrap();
        assert_eq!(row[1], "true");
    }

    #[test]
    fn shao_nbar_is_the_mean_leaf_root_depth() {
        let mut engine = balanced_four_tip_tree();
        let row = ShaoNbar.measure(&mut engine).unwrap();
        let value: f64 = row[1].parse().unwrap();
        assert!((value - 2.0).abs() < 1e-9);
    }

    #[test]
    fn shao_sigma_sq_is_zero_when_every_leaf_is_equally_deep() {
        let mut engine = balanced_four_tip_tree();
        let row = ShaoSigmaSq.measure(&mut engine).unwrap();
        let value: f64 = row[1].parse().unwrap();
        assert!(value.abs() < 1e-9);
    }

    #[test]
    fn shao_nbar_is_not_applicable_on_a_single_node_tree() {
        let mut engine = Engine::new(Preferences::default(), Box::new(RecordingReporter::new()));
        engine.seed_tree();
        assert!(ShaoNbar.measure(&mut engine).is_err());
    }

    #[test]
    fn resolution_not_applicable_below_three_leaves() {
        let mut engine = Engine::new(Preferences::default(), Box::new(RecordingReporter::new()));
        engine.seed_tree();
        let root = engine.trees.active().unwrap().root();
        engine.trees.active_mut().unwrap().speciate(root).unwrap();
        assert!(Resolution.measure(&mut engine).is_err());
    }
}
