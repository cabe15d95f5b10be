//! Action containers (spec §4.7): every action composes into a uniform
//! flattened addressing scheme (`deep_size`/`describe`/`delete_element`/
//! `depth`) used by UIs and persistence outside this crate.
//!
//! The source's dynamic-cast hierarchy (`isMacro`, `isAnalysis`, ...) becomes
//! a `kind()` accessor here (spec §9). Leaf types are numerous and
//! open-ended (system actions, epoch variants, analyses), so — per spec §9's
//! guidance for that shape — actions are `Box<dyn Action>` trait objects
//! rather than one closed enum.

pub mod container;
pub mod queue;
pub mod system;

use crate::engine::Engine;
use crate::error::EngineResult;

/// what a dynamic-cast check in the source would have asked (spec §9)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// a composite holding other actions (`RunOnce`, `RunN`, ...)
    Container,
    /// a system or manipulation action (spec §4.8)
    System,
    /// an epoch (spec §4.6)
    Epoch,
    /// an analysis (spec §4.9)
    Analysis,
}

/// the uniform action-tree interface (spec §3, "Action tree"; §4.7)
pub trait Action: std::fmt::Debug {
    fn execute(&mut self, engine: &mut Engine) -> EngineResult<()>;
    /// `1` for leaves, `1 + sum(child.deep_size())` for containers
    fn deep_size(&self) -> usize;
    fn describe(&self, index: usize) -> EngineResult<String>;
    /// `index == 0` (deleting self) is always rejected; the caller holding
    /// this action is responsible for removing it from its own parent
    fn delete_element(&mut self, index: usize) -> EngineResult<()>;
    fn depth(&self, index: usize) -> EngineResult<usize>;
    fn kind(&self) -> ActionKind;
    /// whether this action or anything in its subtree is an analysis (spec
    /// §4.7, `Queue::contains_analyses`); containers override this to
    /// recurse into their own children, leaves just report their own kind
    fn contains_analysis(&self) -> bool {
        self.kind() == ActionKind::Analysis
    }
}

/// `index == 0` addresses the node itself; `describe`/`delete_element`/
/// `depth` on a leaf only ever resolve that one index.
pub fn leaf_describe(index: usize, desc: impl FnOnce() -> String) -> EngineResult<String> {
    if index == 0 {
        Ok(desc())
    } else {
        Err(crate::error::EngineError::index(format!(
            "action index {index} out of range for a leaf action"
        )))
    }
}

pub fn leaf_delete(index: usize) -> EngineResult<()> {
    if index == 0 {
        Err(crate::error::EngineError::index(
            "cannot delete element 0 (the action addresses itself)",
        ))
    } else {
        Err(crate::error::EngineError::index(format!(
            "action index {index} out of range for a leaf action"
        )))
    }
}

pub fn leaf_depth(index: usize) -> EngineResult<usize> {
    if index == 0 {
        Ok(0)
    } else {
        Err(crate::error::EngineError::index(format!(
            "action index {index} out of range for a leaf action"
        )))
    }
}

/// the flattened walk's size: `1 + sum(child.deep_size())` (spec §4.7)
pub fn flat_deep_size(children: &[Box<dyn Action>]) -> usize {
    1 + children.iter().map(|c| c.deep_size()).sum::<usize>()
}

pub fn flat_describe(children: &[Box<dyn Action>], index: usize, self_desc: impl FnOnce() -> String) -> EngineResult<String> {
    if index == 0 {
        return Ok(self_desc());
    }
    let mut offset = 1;
    for child in children {
        let size = child.deep_size();
        if index < offset + size {
            return child.describe(index - offset);
        }
        offset += size;
    }
    Err(crate::error::EngineError::index(format!("action index {index} out of range")))
}

pub fn flat_depth(children: &[Box<dyn Action>], index: usize) -> EngineResult<usize> {
    if index == 0 {
        return Ok(0);
    }
    let mut offset = 1;
    for child in children {
        let size = child.deep_size();
        if index < offset + size {
            return Ok(1 + child.depth(index - offset)?);
        }
        offset += size;
    }
    Err(crate::error::EngineError::index(format!("action index {index} out of range")))
}

/// `index == 0` deletes the container itself, which is never valid from
/// inside its own method — the caller (its parent, or the queue) must strip
/// it from its own child list instead (spec §4.7)
pub fn flat_delete(children: &mut Vec<Box<dyn Action>>, index: usize) -> EngineResult<()> {
    if index == 0 {
        return Err(crate::error::EngineError::index(
            "cannot delete element 0 (the action addresses itself)",
        ));
    }
    let mut offset = 1;
    for i in 0..children.len() {
        let size = children[i].deep_size();
        if index < offset + size {
            let sub = index - offset;
            if sub == 0 {
                children.remove(i);
            } else {
                children[i].delete_element(sub)?;
            }
            return Ok(());
        }
        offset += size;
    }
    Err(crate::error::EngineError::index(format!("action index {index} out of range")))
}

/// whether any of `children` (recursively) is an analysis, for containers'
/// `contains_analysis` override
pub fn any_contains_analysis(children: &[Box<dyn Action>]) -> bool {
    children.iter().any(|c| c.contains_analysis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;

    #[derive(Debug)]
    struct Leaf;
    impl Action for Leaf {
        fn execute(&mut self, _engine: &mut Engine) -> EngineResult<()> {
            Ok(())
        }
        fn deep_size(&self) -> usize {
            1
        }
        fn describe(&self, index: usize) -> EngineResult<String> {
            leaf_describe(index, || "leaf".to_string())
        }
        fn delete_element(&mut self, index: usize) -> EngineResult<()> {
            leaf_delete(index)
        }
        fn depth(&self, index: usize) -> EngineResult<usize> {
            leaf_depth(index)
        }
        fn kind(&self) -> ActionKind {
            ActionKind::System
        }
    }

    #[test]
    fn flat_deep_size_counts_one_plus_children() {
        let children: Vec<Box<dyn Action>> = vec![Box::new(Leaf), Box::new(Leaf)];
        assert_eq!(flat_deep_size(&children), 3);
    }

    #[test]
    fn flat_delete_rejects_index_zero() {
        let mut children: Vec<Box<dyn Action>> = vec![Box::new(Leaf)];
        assert!(flat_delete(&mut children, 0).is_err());
    }

    #[test]
    fn flat_delete_removes_addressed_child() {
        let mut children: Vec<Box<dyn Action>> = vec![Box::new(Leaf), Box::new(Leaf)];
        flat_delete(&mut children, 1).unwrap();
        assert_eq!(children.len(), 1);
    }

    #[test]
    fn flat_depth_of_self_is_zero() {
        let children: Vec<Box<dyn Action>> = vec![Box::new(Leaf)];
        assert_eq!(flat_depth(&children, 0).unwrap(), 0);
        assert_eq!(flat_depth(&children, 1).unwrap(), 1);
    }
}
