//! The three node-labelling conventions (spec §4.1): phylogenetic (the
//! node's own inherited taxon name), CAIC (a binary path code from the
//! root), and series (a breadth-first integer). The active convention is a
//! process-wide [`crate::preferences::Preferences::clade_labels`] choice.

use super::node::NodeId;
use super::store::Tree;
use crate::error::EngineResult;
use crate::preferences::CladeLabels;
use std::collections::VecDeque;

pub fn label(tree: &Tree, n: NodeId, convention: CladeLabels) -> EngineResult<String> {
    match convention {
        CladeLabels::Phylo => Ok(tree.name(n)?.to_string()),
        CladeLabels::Caic => Ok(caic_code(tree, n)),
        CladeLabels::Series => Ok(series_number(tree, n).to_string()),
    }
}

/// the binary path from the root to `n`: each step down appends `'A'` for
/// the first child, `'B'` for the second, and so on (CAIC's convention for
/// naming a node by the route taken to reach it)
fn caic_code(tree: &Tree, n: NodeId) -> String {
    let mut steps = Vec::new();
    let mut cur = n;
    while !tree.is_root(cur) {
        let parent = tree.parent(cur).expect("non-root has a parent");
        let index = tree
            .children(parent)
            .iter()
            .position(|&c| c == cur)
            .expect("child must appear under its own parent");
        steps.push((b'A' + index as u8) as char);
        cur = parent;
    }
    steps.reverse();
    steps.into_iter().collect()
}

/// breadth-first integer position of `n`, root first at `0`
fn series_number(tree: &Tree, n: NodeId) -> usize {
    let mut queue = VecDeque::new();
    queue.push_back(tree.root());
    let mut index = 0;
    while let Some(cur) = queue.pop_front() {
        if cur == n {
            return index;
        }
        index += 1;
        for child in tree.children(cur) {
            queue.push_back(child);
        }
    }
    unreachable!("n must be reachable from the root")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caic_code_reflects_path_from_root() {
        let mut tree = Tree::seed();
        let root = tree.root();
        let (a, b) = tree.speciate(root).unwrap();
        assert_eq!(caic_code(&tree, a), "A");
        assert_eq!(caic_code(&tree, b), "B");
        let (aa, _ab) = tree.speciate(a).unwrap();
        assert_eq!(caic_code(&tree, aa), "AA");
    }

    #[test]
    fn series_number_is_breadth_first() {
        let mut tree = Tree::seed();
        let root = tree.root();
        let (a, b) = tree.speciate(root).unwrap();
        assert_eq!(series_number(&tree, root), 0);
        assert_eq!(series_number(&tree, a), 1);
        assert_eq!(series_number(&tree, b), 2);
    }

    #[test]
    fn phylo_label_is_the_node_name() {
        let tree = Tree::seed();
        let root = tree.root();
        assert_eq!(label(&tree, root, CladeLabels::Phylo).unwrap(), tree.name(root).unwrap());
    }
}
