//! Tree- and node-level summary analyses (spec §4.9), grounded on
//! `Analysis.h`'s whole-tree and per-node report classes.

use super::Analysis;
use crate::engine::Engine;
use crate::error::{EngineError, EngineResult};
use crate::rules::predicate::TraitPredicate;
use crate::tree::NodeId;

#[derive(Debug, Default)]
pub struct TreeInfo;

impl Analysis for TreeInfo {
    fn name(&self) -> String {
        "tree info".to_string()
    }
    fn measure(&mut self, engine: &mut Engine) -> EngineResult<Vec<String>> {
        let tree = engine.trees.active()?;
        let classification = if tree.count_leaves() == tree.count_living_leaves() {
            "neontological"
        } else {
            "paleontological"
        };
        Ok(vec![
            self.name(),
            "nodes".to_string(),
            tree.count_nodes().to_string(),
            "leaves".to_string(),
            tree.count_leaves().to_string(),
            "living leaves".to_string(),
            tree.count_living_leaves().to_string(),
            "internal".to_string(),
            tree.count_internal().to_string(),
            "classification".to_string(),
            classification.to_string(),
            "tree age".to_string(),
            tree.tree_age().to_string(),
            "phylogenetic age".to_string(),
            tree.phylo_age().to_string(),
        ])
    }
}

/// which nodes a [`NodeInfo`] analysis reports on
#[derive(Debug, Clone)]
pub enum NodeSelector {
    All,
    Tips,
    Alive,
    FirstKTipsByShuffle(usize),
    TipByTraitPredicate(TraitPredicate),
}

/// per-node metrics a [`NodeInfo`] analysis reports, in the order requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeMetric {
    Age,
    TimeToParent,
    ChildrenCount,
    SubtreeLeaves,
    SubtreeSize,
    SiblingsCount,
    Height,
    TimeToRoot,
}

fn subtree_counts(tree: &crate::tree::Tree, n: NodeId) -> (usize, usize) {
    if tree.is_leaf(n) {
        return (1, 1);
    }
    let mut leaves = 0;
    let mut size = 1;
    for c in tree.children(n) {
        let (l, s) = subtree_counts(tree, c);
        leaves += l;
        size += s;
    }
    (leaves, size)
}

#[derive(Debug)]
pub struct NodeInfo {
    pub selector: NodeSelector,
    pub metrics: Vec<NodeMetric>,
}

impl NodeInfo {
    pub fn new(selector: NodeSelector, metrics: Vec<NodeMetric>) -> Self {
        Self { selector, metrics }
    }
}

impl Analysis for NodeInfo {
    fn name(&self) -> String {
        "node info".to_string()
    }
    fn measure(&mut self, engine: &mut Engine) -> EngineResult<Vec<String>> {
        let selected: Vec<NodeId> = {
            let tree = engine.trees.active()?;
            match &self.selector {
                NodeSelector::All => tree.node_ids().collect(),
                NodeSelector::Tips => tree.leaves(),
                NodeSelector::Alive => tree.node_ids().filter(|&n| tree.is_alive(n)).collect(),
                NodeSelector::FirstKTipsByShuffle(k) => {
                    let shuffled = tree.shuffle_living_leaves(&mut engine.rng);
                    shuffled.into_iter().take(*k).collect()
                }
                NodeSelector::TipByTraitPredicate(pred) => tree
                    .leaves()
                    .into_iter()
                    .filter(|&n| {
                        tree.name(n)
                            .map(|name| pred.test(name, &engine.continuous, &engine.discrete))
                            .unwrap_or(false)
                    })
                    .collect(),
            }
        };
        if selected.is_empty() {
            return Err(EngineError::not_applicable("no node matched the selector"));
        }
        let tree = engine.trees.active()?;
        let mut row = vec![self.name()];
        for n in selected {
            let name = tree.name(n)?.to_string();
            row.push(name);
            for metric in &self.metrics {
                let value = match metric {
                    NodeMetric::Age => tree.time_since_node_origin(n),
                    NodeMetric::TimeToParent => tree.time_from_node_to_parent(n),
                    NodeMetric::ChildrenCount => tree.count_children(n) as f64,
                    NodeMetric::SubtreeLeaves => subtree_counts(tree, n).0 as f64,
                    NodeMetric::SubtreeSize => subtree_counts(tree, n).1 as f64,
                    NodeMetric::SiblingsCount => tree.count_siblings(n) as f64,
                    NodeMetric::Height => tree.height(n) as f64,
                    NodeMetric::TimeToRoot => tree.time_from_node_to_root(n),
                };
                row.push(value.to_string());
            }
        }
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preferences::Preferences;
    use crate::report::RecordingReporter;

    fn test_engine() -> Engine {
        let mut engine = Engine::new(Preferences::default(), Box::new(RecordingReporter::new()));
        engine.seed_tree();
        engine
    }

    #[test]
    fn tree_info_reports_neontological_when_nothing_has_died() {
        let mut engine = test_engine();
        let row = TreeInfo.measure(&mut engine).unwrap();
        assert!(row.contains(&"neontological".to_string()));
    }

    #[test]
    fn tree_info_reports_paleontological_once_a_leaf_is_dead() {
        let mut engine = test_engine();
        let root = engine.trees.active().unwrap().root();
        let (l, _) = engine.trees.active_mut().unwrap().speciate(root).unwrap();
        engine.trees.active_mut().unwrap().kill_leaf(l).unwrap();
        let row = TreeInfo.measure(&mut engine).unwrap();
        assert!(row.contains(&"paleontological".to_string()));
    }

    #[test]
    fn node_info_all_reports_every_node() {
        let mut engine = test_engine();
        let root = engine.trees.active().unwrap().root();
        engine.trees.active_mut().unwrap().speciate(root).unwrap();
        let mut analysis = NodeInfo::new(NodeSelector::All, vec![NodeMetric::ChildrenCount]);
        let row = analysis.measure(&mut engine).unwrap();
        assert_eq!(row.len(), 1 + 3 * 2);
    }

    #[test]
    fn node_info_is_not_applicable_when_selector_matches_nothing() {
        let mut engine = test_engine();
        let pred = TraitPredicate::ContinuousAbove { col: "size".to_string(), threshold: 0.0 };
        let mut analysis = NodeInfo::new(NodeSelector::TipByTraitPredicate(pred), vec![NodeMetric::Age]);
        assert!(analysis.measure(&mut engine).is_err());
    }
}
