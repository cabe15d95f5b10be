//! Newick structure serialisation (spec §4.1, §6). Writers for full Nexus or
//! CAIC files live outside this crate; the core only supplies this one
//! recursive builder plus the labelled matrix traversal data/writers consume.

use super::node::NodeId;
use super::store::Tree;
use std::collections::HashMap;
use std::fmt::Write as _;

/// render `tree` as a Newick string, optionally substituting leaf names
/// through a translation table (Nexus's `TRANSLATE` block)
pub fn write_newick(tree: &Tree, translator: Option<&HashMap<String, String>>) -> String {
    let mut out = String::new();
    write_node(tree, tree.root(), translator, &mut out);
    out.push(';');
    out
}

fn resolve_name<'a>(name: &'a str, translator: Option<&'a HashMap<String, String>>) -> &'a str {
    translator
        .and_then(|t| t.get(name))
        .map(String::as_str)
        .unwrap_or(name)
}

fn write_node(tree: &Tree, n: NodeId, translator: Option<&HashMap<String, String>>, out: &mut String) {
    let children = tree.children(n);
    if !children.is_empty() {
        out.push('(');
        for (i, &child) in children.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            write_node(tree, child, translator, out);
        }
        out.push(')');
    }
    let name = resolve_name(tree.name(n).unwrap_or(""), translator);
    out.push_str(name);
    if !tree.is_root(n) {
        let _ = write!(out, ":{}", tree.edge_weight(n));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_node_tree_is_a_bare_name() {
        let tree = Tree::seed();
        assert_eq!(write_newick(&tree, None), "t0;");
    }

    #[test]
    fn binary_tree_nests_children() {
        let mut tree = Tree::seed();
        let root = tree.root();
        tree.speciate(root).unwrap();
        let newick = write_newick(&tree, None);
        assert!(newick.starts_with('('));
        assert!(newick.ends_with(";"));
        assert!(newick.contains(','));
    }

    #[test]
    fn translation_table_substitutes_names() {
        let tree = Tree::seed();
        let mut translator = HashMap::new();
        translator.insert("t0".to_string(), "1".to_string());
        assert_eq!(write_newick(&tree, Some(&translator)), "1;");
    }
}
