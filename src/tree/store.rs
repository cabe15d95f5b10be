//! The tree store (spec §3, §4.1): a node-and-edge container for a single
//! rooted tree, plus an ordered sequence of such trees with a selected active
//! index.
//!
//! Parent/child references are integer node identifiers routed through a
//! central `petgraph::DiGraph`, never raw pointers (spec §9, "Ownership
//! graph") — this is what makes duplication and snapshotting cheap (`Clone`)
//! and keeps ids stable across structural edits. Nodes are never physically
//! removed from the graph (`petgraph::Graph::remove_node` swap-removes and
//! would renumber ids); `prune_branch`/`collapse_node` instead detach a
//! node's edges and tombstone it in `removed`, preserving "identifiers are
//! monotonically issued" (spec §3) for the lifetime of the tree.

use super::node::{NodeData, NodeId};
use crate::error::{EngineError, EngineResult};
use crate::preferences::CladeLabels;
use crate::rng::Random;
use petgraph::graph::DiGraph;
use petgraph::Direction;
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct Tree {
    graph: DiGraph<NodeData, ()>,
    root: NodeId,
    dead: HashSet<NodeId>,
    removed: HashSet<NodeId>,
}

impl Tree {
    /// seed a one-node tree (spec §3, "Seeding creates a one-node tree")
    pub fn seed() -> Self {
        let mut graph = DiGraph::new();
        let root = graph.add_node(NodeData::new("t0", 0.0));
        Self {
            graph,
            root,
            dead: HashSet::new(),
            removed: HashSet::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    fn present(&self, n: NodeId) -> bool {
        self.graph.node_weight(n).is_some() && !self.removed.contains(&n)
    }

    fn require_present(&self, n: NodeId) -> EngineResult<()> {
        if self.present(n) {
            Ok(())
        } else {
            Err(EngineError::index(format!("node {n:?} not present")))
        }
    }

    pub fn name(&self, n: NodeId) -> EngineResult<&str> {
        self.require_present(n)?;
        Ok(self.graph[n].name.as_str())
    }

    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.node_ids().find(|&n| self.graph[n].name == name)
    }

    pub fn set_name(&mut self, n: NodeId, name: impl Into<String>) -> EngineResult<()> {
        self.require_present(n)?;
        self.graph[n].name = name.into();
        Ok(())
    }

    /// edge weight to this node's parent; `0.0` on the root, whose own field
    /// is never meaningful (spec §4.1)
    pub fn edge_weight(&self, n: NodeId) -> f64 {
        if n == self.root {
            0.0
        } else {
            self.graph[n].edge_weight
        }
    }

    pub fn set_edge_weight(&mut self, n: NodeId, weight: f64) -> EngineResult<()> {
        self.require_present(n)?;
        self.graph[n].edge_weight = weight.max(0.0);
        Ok(())
    }

    /// nodes in ascending id order, skipping tombstoned nodes (spec §4.9:
    /// "iterate nodes in ID order for deterministic output")
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.graph
            .node_indices()
            .filter(move |n| !self.removed.contains(n))
    }

    pub fn parent(&self, n: NodeId) -> Option<NodeId> {
        self.graph
            .neighbors_directed(n, Direction::Incoming)
            .next()
    }

    /// children in insertion (birth) order; `petgraph` hands back edges in
    /// reverse insertion order, so this reverses them back
    pub fn children(&self, n: NodeId) -> Vec<NodeId> {
        let mut kids: Vec<NodeId> = self
            .graph
            .neighbors_directed(n, Direction::Outgoing)
            .collect();
        kids.reverse();
        kids
    }

    pub fn count_children(&self, n: NodeId) -> usize {
        self.graph.neighbors_directed(n, Direction::Outgoing).count()
    }

    pub fn count_siblings(&self, n: NodeId) -> usize {
        match self.parent(n) {
            Some(p) => self.count_children(p).saturating_sub(1),
            None => 0,
        }
    }

    pub fn is_root(&self, n: NodeId) -> bool {
        n == self.root
    }

    pub fn is_leaf(&self, n: NodeId) -> bool {
        self.count_children(n) == 0
    }

    pub fn is_internal(&self, n: NodeId) -> bool {
        !self.is_leaf(n)
    }

    pub fn is_bifurcating(&self, n: NodeId) -> bool {
        self.count_children(n) == 2
    }

    pub fn is_singleton(&self, n: NodeId) -> bool {
        self.count_children(n) == 1
    }

    pub fn is_dead(&self, n: NodeId) -> bool {
        self.dead.contains(&n)
    }

    pub fn is_alive(&self, n: NodeId) -> bool {
        !self.is_dead(n)
    }

    /// a "living leaf": a leaf not in the dead set (spec §3)
    pub fn is_living_leaf(&self, n: NodeId) -> bool {
        self.is_leaf(n) && self.is_alive(n)
    }

    pub fn is_ancestor_of(&self, ancestor: NodeId, descendant: NodeId) -> bool {
        let mut cur = descendant;
        loop {
            if cur == ancestor {
                return true;
            }
            match self.parent(cur) {
                Some(p) => cur = p,
                None => return false,
            }
        }
    }

    fn path_to_root(&self, n: NodeId) -> Vec<NodeId> {
        let mut path = vec![n];
        let mut cur = n;
        while let Some(p) = self.parent(cur) {
            path.push(p);
            cur = p;
        }
        path
    }

    /// weighted path distance between any two nodes, via their lowest common ancestor
    pub fn distance(&self, a: NodeId, b: NodeId) -> f64 {
        let path_a = self.path_to_root(a);
        let path_b: HashSet<NodeId> = self.path_to_root(b).into_iter().collect();
        let lca = path_a
            .iter()
            .find(|n| path_b.contains(n))
            .copied()
            .unwrap_or(self.root);
        let dist_up = |start: NodeId| -> f64 {
            let mut total = 0.0;
            let mut cur = start;
            while cur != lca {
                total += self.edge_weight(cur);
                cur = self.parent(cur).expect("lca unreachable");
            }
            total
        };
        dist_up(a) + dist_up(b)
    }

    /// topological height: edges to the deepest leaf in the subtree rooted at `n`
    pub fn height(&self, n: NodeId) -> usize {
        self.children(n)
            .iter()
            .map(|&c| 1 + self.height(c))
            .max()
            .unwrap_or(0)
    }

    pub fn time_from_node_to_parent(&self, n: NodeId) -> f64 {
        self.edge_weight(n)
    }

    /// time since this node came into being: identical to its own pendant
    /// edge weight, exposed separately because rate functions key off it by
    /// name (spec §4.3, dependent variable `age-since-origin`)
    pub fn time_since_node_origin(&self, n: NodeId) -> f64 {
        self.edge_weight(n)
    }

    pub fn time_from_node_to_root(&self, n: NodeId) -> f64 {
        let mut total = 0.0;
        let mut cur = n;
        while cur != self.root {
            total += self.edge_weight(cur);
            cur = self.parent(cur).expect("non-root node must have a parent");
        }
        total
    }

    pub fn count_nodes(&self) -> usize {
        self.node_ids().count()
    }

    pub fn count_leaves(&self) -> usize {
        self.node_ids().filter(|&n| self.is_leaf(n)).count()
    }

    pub fn count_living_leaves(&self) -> usize {
        self.node_ids().filter(|&n| self.is_living_leaf(n)).count()
    }

    pub fn count_internal(&self) -> usize {
        self.node_ids().filter(|&n| self.is_internal(n)).count()
    }

    pub fn leaves(&self) -> Vec<NodeId> {
        self.node_ids().filter(|&n| self.is_leaf(n)).collect()
    }

    pub fn living_leaves(&self) -> Vec<NodeId> {
        self.node_ids().filter(|&n| self.is_living_leaf(n)).collect()
    }

    pub fn internal_nodes(&self) -> Vec<NodeId> {
        self.node_ids().filter(|&n| self.is_internal(n)).collect()
    }

    /// max root-to-tip path length over all leaves (spec §4.1)
    pub fn tree_age(&self) -> f64 {
        self.leaves()
            .iter()
            .map(|&n| self.time_from_node_to_root(n))
            .fold(0.0, f64::max)
    }

    /// max root-to-tip path length over living leaves only
    pub fn phylo_age(&self) -> f64 {
        self.living_leaves()
            .iter()
            .map(|&n| self.time_from_node_to_root(n))
            .fold(0.0, f64::max)
    }

    pub fn has_lengths(&self) -> bool {
        self.node_ids().any(|n| !self.is_root(n) && self.edge_weight(n) > 0.0)
    }

    /// the set of (non-root) nodes on the spanning subtree connecting the
    /// living leaves to the root, i.e. every ancestor of a living leaf
    fn living_spanning_edges(&self) -> HashSet<NodeId> {
        let mut spanning = HashSet::new();
        for leaf in self.living_leaves() {
            let mut cur = leaf;
            loop {
                if cur == self.root || !spanning.insert(cur) {
                    break;
                }
                match self.parent(cur) {
                    Some(p) => cur = p,
                    None => break,
                }
            }
        }
        spanning
    }

    /// total edge weight spanning the living leaves (spec §4.1, Faith's PD);
    /// `None` ("not applicable") when the tree carries no lengths at all
    pub fn phylo_diversity(&self) -> Option<f64> {
        if !self.has_lengths() {
            return None;
        }
        Some(
            self.living_spanning_edges()
                .iter()
                .map(|&n| self.edge_weight(n))
                .sum(),
        )
    }

    /// `1 - prod(1 - edge_weight)` over the same spanning set, saturating at
    /// 1 for long distances (glossary: "genetic diversity")
    pub fn genetic_diversity(&self) -> Option<f64> {
        if !self.has_lengths() {
            return None;
        }
        let product: f64 = self
            .living_spanning_edges()
            .iter()
            .map(|&n| (1.0 - self.edge_weight(n)).max(0.0))
            .product();
        Some(1.0 - product)
    }

    /// split a living leaf into two children with fresh names; the leaf
    /// becomes internal with its own edge weight untouched and the two new
    /// children start at edge weight 0 (spec §4.1)
    pub fn speciate(&mut self, leaf: NodeId) -> EngineResult<(NodeId, NodeId)> {
        self.require_present(leaf)?;
        if !self.is_living_leaf(leaf) {
            return Err(EngineError::execution(format!(
                "speciate: node {leaf:?} is not a living leaf"
            )));
        }
        let left = self.graph.add_node(NodeData::new(format!("t{}", self.graph.node_count()), 0.0));
        self.graph.add_edge(leaf, left, ());
        let right = self.graph.add_node(NodeData::new(format!("t{}", self.graph.node_count()), 0.0));
        self.graph.add_edge(leaf, right, ());
        Ok((left, right))
    }

    pub fn kill_leaf(&mut self, leaf: NodeId) -> EngineResult<()> {
        self.require_present(leaf)?;
        if !self.is_leaf(leaf) {
            return Err(EngineError::execution(format!(
                "kill_leaf: node {leaf:?} is not a leaf"
            )));
        }
        self.dead.insert(leaf);
        Ok(())
    }

    /// advance every living leaf's pendant edge by `dt` (spec §4.1)
    pub fn age_all_leaves(&mut self, dt: f64) {
        let leaves = self.living_leaves();
        for leaf in leaves {
            self.graph[leaf].edge_weight += dt;
        }
    }

    fn detach_from_parent(&mut self, n: NodeId) {
        if let Some(edge) = self.graph.find_edge(self.parent(n).unwrap_or(n), n) {
            self.graph.remove_edge(edge);
        }
    }

    fn tombstone(&mut self, n: NodeId) {
        self.dead.remove(&n);
        self.removed.insert(n);
    }

    /// remove the leaf and walk up through any now-childless ancestors,
    /// stopping at the root or a node that still has other children (spec §4.1)
    pub fn prune_branch(&mut self, leaf: NodeId) -> EngineResult<()> {
        self.require_present(leaf)?;
        if !self.is_leaf(leaf) {
            return Err(EngineError::execution(format!(
                "prune_branch: node {leaf:?} is not a leaf"
            )));
        }
        if self.is_root(leaf) {
            return Err(EngineError::execution(
                "prune_branch: cannot prune the only remaining node",
            ));
        }
        let mut current = leaf;
        loop {
            let parent = self.parent(current);
            self.detach_from_parent(current);
            self.tombstone(current);
            match parent {
                Some(p) if !self.is_root(p) && self.count_children(p) == 0 => {
                    current = p;
                }
                _ => break,
            }
        }
        Ok(())
    }

    /// collapse a degree-1 internal node, attaching its sole child to its
    /// parent with summed edge weight (spec §4.1); collapsing the root
    /// promotes the child to be the new root
    pub fn collapse_node(&mut self, n: NodeId) -> EngineResult<()> {
        self.require_present(n)?;
        if !self.is_singleton(n) {
            return Err(EngineError::execution(format!(
                "collapse_node: node {n:?} is not a singleton"
            )));
        }
        let child = self.children(n)[0];
        if self.is_root(n) {
            self.detach_from_parent(child);
            self.graph[child].edge_weight = 0.0;
            self.tombstone(n);
            self.root = child;
            return Ok(());
        }
        let parent = self.parent(n).expect("non-root has a parent");
        let summed = self.edge_weight(n) + self.edge_weight(child);
        self.detach_from_parent(n);
        self.detach_from_parent(child);
        self.graph.add_edge(parent, child, ());
        self.graph[child].edge_weight = summed;
        self.tombstone(n);
        Ok(())
    }

    /// mark every non-leaf node dead (spec §4.8, `MakeNeontological`'s sibling op)
    pub fn make_internals_dead(&mut self) {
        let internals = self.internal_nodes();
        self.dead.extend(internals);
    }

    /// checks the invariants of spec §3; returns the first violation found
    pub fn consistency_check(&self) -> EngineResult<()> {
        let mut leaf_names = HashSet::new();
        for n in self.node_ids() {
            if self.is_leaf(n) {
                if !leaf_names.insert(self.graph[n].name.clone()) {
                    return Err(EngineError::execution(format!(
                        "duplicate leaf name {:?}",
                        self.graph[n].name
                    )));
                }
            }
            if self.edge_weight(n) < 0.0 {
                return Err(EngineError::execution(format!(
                    "node {n:?} has a negative edge weight"
                )));
            }
            // walking parent links from any node must terminate at the root
            let mut cur = n;
            let mut steps = 0;
            while cur != self.root {
                cur = self
                    .parent(cur)
                    .ok_or_else(|| EngineError::execution(format!("node {n:?} has no path to root")))?;
                steps += 1;
                if steps > self.graph.node_count() {
                    return Err(EngineError::execution(format!(
                        "node {n:?}'s parent chain does not terminate at the root"
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn label(&self, n: NodeId, convention: CladeLabels) -> EngineResult<String> {
        self.require_present(n)?;
        super::label::label(self, n, convention)
    }

    pub fn write_newick(&self, translator: Option<&std::collections::HashMap<String, String>>) -> String {
        super::newick::write_newick(self, translator)
    }

    pub fn shuffle_living_leaves(&self, rng: &mut Random) -> Vec<NodeId> {
        let mut leaves = self.living_leaves();
        rng.shuffle(&mut leaves);
        leaves
    }
}

/// an ordered sequence of trees with a selected active index (spec §3)
#[derive(Debug, Clone, Default)]
pub struct TreeStore {
    trees: Vec<Tree>,
    active: usize,
}

impl TreeStore {
    pub fn new() -> Self {
        Self {
            trees: Vec::new(),
            active: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    /// replace the store with a fresh one-node tree, selected as active
    pub fn seed(&mut self) -> usize {
        self.trees.push(Tree::seed());
        self.active = self.trees.len() - 1;
        self.active
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn set_active(&mut self, index: usize) -> EngineResult<()> {
        if index >= self.trees.len() {
            return Err(EngineError::index(format!(
                "tree index {index} out of range (have {})",
                self.trees.len()
            )));
        }
        self.active = index;
        Ok(())
    }

    pub fn active(&self) -> EngineResult<&Tree> {
        self.trees
            .get(self.active)
            .ok_or_else(|| EngineError::execution("no active tree: tree store is empty"))
    }

    pub fn active_mut(&mut self) -> EngineResult<&mut Tree> {
        let active = self.active;
        self.trees
            .get_mut(active)
            .ok_or_else(|| EngineError::execution("no active tree: tree store is empty"))
    }

    pub fn get(&self, index: usize) -> EngineResult<&Tree> {
        self.trees
            .get(index)
            .ok_or_else(|| EngineError::index(format!("tree index {index} out of range")))
    }

    pub fn get_mut(&mut self, index: usize) -> EngineResult<&mut Tree> {
        self.trees
            .get_mut(index)
            .ok_or_else(|| EngineError::index(format!("tree index {index} out of range")))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tree> {
        self.trees.iter()
    }

    pub fn duplicate_active(&mut self) -> EngineResult<usize> {
        let copy = self.active()?.clone();
        self.trees.push(copy);
        Ok(self.trees.len() - 1)
    }

    /// delete a tree, clamping the active index back into range (spec §3)
    pub fn delete(&mut self, index: usize) -> EngineResult<()> {
        if index >= self.trees.len() {
            return Err(EngineError::index(format!("tree index {index} out of range")));
        }
        self.trees.remove(index);
        if self.trees.is_empty() {
            self.active = 0;
        } else if self.active >= self.trees.len() {
            self.active = self.trees.len() - 1;
        } else if index < self.active {
            self.active -= 1;
        }
        Ok(())
    }
}
