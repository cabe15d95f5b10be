//! Composable action containers (spec §4.7).

use super::{any_contains_analysis, flat_deep_size, flat_delete, flat_depth, flat_describe, leaf_delete, leaf_depth, leaf_describe};
use super::{Action, ActionKind};
use crate::engine::Engine;
use crate::epoch::Epoch;
use crate::error::EngineResult;
use crate::report::ReportKind;

/// execute children in order (spec §4.7); also the shape the process-level
/// queue uses (`actions::queue::Queue`)
#[derive(Debug, Default)]
pub struct RunOnce {
    pub children: Vec<Box<dyn Action>>,
}

impl RunOnce {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn adopt(&mut self, action: Box<dyn Action>) {
        self.children.push(action);
    }
}

impl Action for RunOnce {
    fn execute(&mut self, engine: &mut Engine) -> EngineResult<()> {
        for child in &mut self.children {
            child.execute(engine)?;
        }
        Ok(())
    }

    fn deep_size(&self) -> usize {
        flat_deep_size(&self.children)
    }

    fn describe(&self, index: usize) -> EngineResult<String> {
        flat_describe(&self.children, index, || "run once".to_string())
    }

    fn delete_element(&mut self, index: usize) -> EngineResult<()> {
        flat_delete(&mut self.children, index)
    }

    fn depth(&self, index: usize) -> EngineResult<usize> {
        flat_depth(&self.children, index)
    }

    fn kind(&self) -> ActionKind {
        ActionKind::Container
    }

    fn contains_analysis(&self) -> bool {
        any_contains_analysis(&self.children)
    }
}

/// repeat the contained actions `k` times, pushing a `"run i of k"` reporter
/// prefix per iteration (spec §4.7)
#[derive(Debug)]
pub struct RunN {
    pub children: Vec<Box<dyn Action>>,
    pub k: usize,
}

impl RunN {
    pub fn new(k: usize) -> Self {
        Self { children: Vec::new(), k }
    }

    pub fn adopt(&mut self, action: Box<dyn Action>) {
        self.children.push(action);
    }
}

impl Action for RunN {
    fn execute(&mut self, engine: &mut Engine) -> EngineResult<()> {
        for i in 1..=self.k {
            engine.push_prefix(&format!("run {i} of {}", self.k));
            let result = (|| {
                for child in &mut self.children {
                    child.execute(engine)?;
                }
                Ok(())
            })();
            engine.pop_prefix();
            result?;
        }
        Ok(())
    }

    fn deep_size(&self) -> usize {
        flat_deep_size(&self.children)
    }

    fn describe(&self, index: usize) -> EngineResult<String> {
        flat_describe(&self.children, index, || format!("run {} times", self.k))
    }

    fn delete_element(&mut self, index: usize) -> EngineResult<()> {
        flat_delete(&mut self.children, index)
    }

    fn depth(&self, index: usize) -> EngineResult<usize> {
        flat_depth(&self.children, index)
    }

    fn kind(&self) -> ActionKind {
        ActionKind::Container
    }

    fn contains_analysis(&self) -> bool {
        any_contains_analysis(&self.children)
    }
}

/// snapshot all three stores on entry; restore them around every iteration
/// so each repeat starts from the same state (spec §4.7, §5)
#[derive(Debug)]
pub struct RunAndRestore {
    pub children: Vec<Box<dyn Action>>,
    pub k: usize,
}

impl RunAndRestore {
    pub fn new(k: usize) -> Self {
        Self { children: Vec::new(), k }
    }

    pub fn adopt(&mut self, action: Box<dyn Action>) {
        self.children.push(action);
    }
}

impl Action for RunAndRestore {
    fn execute(&mut self, engine: &mut Engine) -> EngineResult<()> {
        let snapshot = engine.snapshot();
        for i in 1..=self.k {
            engine.push_prefix(&format!("run {i} of {} (restored)", self.k));
            let result = (|| {
                for child in &mut self.children {
                    child.execute(engine)?;
                }
                Ok(())
            })();
            engine.pop_prefix();
            engine.restore(snapshot.clone());
            result?;
        }
        Ok(())
    }

    fn deep_size(&self) -> usize {
        flat_deep_size(&self.children)
    }

    fn describe(&self, index: usize) -> EngineResult<String> {
        flat_describe(&self.children, index, || format!("run and restore, {} times", self.k))
    }

    fn delete_element(&mut self, index: usize) -> EngineResult<()> {
        flat_delete(&mut self.children, index)
    }

    fn depth(&self, index: usize) -> EngineResult<usize> {
        flat_depth(&self.children, index)
    }

    fn kind(&self) -> ActionKind {
        ActionKind::Container
    }

    fn contains_analysis(&self) -> bool {
        any_contains_analysis(&self.children)
    }
}

/// for each tree in the store, set it active, execute the children, then
/// restore the original active index (spec §4.7)
#[derive(Debug, Default)]
pub struct TreeMacro {
    pub children: Vec<Box<dyn Action>>,
}

impl TreeMacro {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn adopt(&mut self, action: Box<dyn Action>) {
        self.children.push(action);
    }
}

impl Action for TreeMacro {
    fn execute(&mut self, engine: &mut Engine) -> EngineResult<()> {
        let original = engine.trees.active_index();
        let count = engine.trees.len();
        for index in 0..count {
            engine.trees.set_active(index)?;
            engine.push_prefix(&format!("tree {} of {count}", index + 1));
            let result = (|| {
                for child in &mut self.children {
                    child.execute(engine)?;
                }
                Ok(())
            })();
            engine.pop_prefix();
            result?;
        }
        if original < engine.trees.len() {
            engine.trees.set_active(original)?;
        }
        Ok(())
    }

    fn deep_size(&self) -> usize {
        flat_deep_size(&self.children)
    }

    fn describe(&self, index: usize) -> EngineResult<String> {
        flat_describe(&self.children, index, || "run over all trees".to_string())
    }

    fn delete_element(&mut self, index: usize) -> EngineResult<()> {
        flat_delete(&mut self.children, index)
    }

    fn depth(&self, index: usize) -> EngineResult<usize> {
        flat_depth(&self.children, index)
    }

    fn kind(&self) -> ActionKind {
        ActionKind::Container
    }

    fn contains_analysis(&self) -> bool {
        any_contains_analysis(&self.children)
    }
}

/// an epoch wrapped as a single action-tree leaf (spec §4.7: "EpochPopLimit
/// / EpochTimeLimit"); the epoch's own rules aren't part of the action tree,
/// so this action has `deep_size() == 1` regardless of how many rules it holds
#[derive(Debug)]
pub struct EpochAction {
    pub epoch: Epoch,
}

impl EpochAction {
    pub fn new(epoch: Epoch) -> Self {
        Self { epoch }
    }
}

impl Action for EpochAction {
    fn execute(&mut self, engine: &mut Engine) -> EngineResult<()> {
        engine.emit(ReportKind::Progress, "running epoch");
        self.epoch.execute(engine)
    }

    fn deep_size(&self) -> usize {
        1
    }

    fn describe(&self, index: usize) -> EngineResult<String> {
        leaf_describe(index, || format!("epoch ({} rules)", self.epoch.rules.len()))
    }

    fn delete_element(&mut self, index: usize) -> EngineResult<()> {
        leaf_delete(index)
    }

    fn depth(&self, index: usize) -> EngineResult<usize> {
        leaf_depth(index)
    }

    fn kind(&self) -> ActionKind {
        ActionKind::Epoch
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

    #[derive(Debug)]
    struct CountingAction(std::rc::Rc<std::cell::RefCell<usize>>);
    impl Action for CountingAction {
        fn execute(&mut self, _engine: &mut Engine) -> EngineResult<()> {
            *self.0.borrow_mut() += 1;
            Ok(())
        }
        fn deep_size(&self) -> usize {
            1
        }
        fn describe(&self, index: usize) -> EngineResult<String> {
            super::leaf_describe(index, || "count".to_string())
        }
        fn delete_element(&mut self, index: usize) -> EngineResult<()> {
            super::leaf_delete(index)
        }
        fn depth(&self, index: usize) -> EngineResult<usize> {
            super::leaf_depth(index)
        }
        fn kind(&self) -> ActionKind {
            ActionKind::System
        }
    }

    #[test]
    fn run_n_executes_children_k_times() {
        let mut engine = test_engine();
        let counter = std::rc::Rc::new(std::cell::RefCell::new(0));
        let mut run_n = RunN::new(3);
        run_n.adopt(Box::new(CountingAction(counter.clone())));
        run_n.execute(&mut engine).unwrap();
        assert_eq!(*counter.borrow(), 3);
    }

    #[test]
    fn run_and_restore_leaves_stores_unchanged() {
        let mut engine = test_engine();
        let root = engine.trees.active().unwrap().root();
        struct Speciate;
        impl std::fmt::Debug for Speciate {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "Speciate")
            }
        }
        impl Action for Speciate {
            fn execute(&mut self, engine: &mut Engine) -> EngineResult<()> {
                let root = engine.trees.active().unwrap().root();
                engine.trees.active_mut().unwrap().speciate(root)
            }
            fn deep_size(&self) -> usize {
                1
            }
            fn describe(&self, index: usize) -> EngineResult<String> {
                super::leaf_describe(index, || "speciate".to_string())
            }
            fn delete_element(&mut self, index: usize) -> EngineResult<()> {
                super::leaf_delete(index)
            }
            fn depth(&self, index: usize) -> EngineResult<usize> {
                super::leaf_depth(index)
            }
            fn kind(&self) -> ActionKind {
                ActionKind::System
            }
        }
        let nodes_before = engine.trees.active().unwrap().count_nodes();
        let mut run_and_restore = RunAndRestore::new(5);
        run_and_restore.adopt(Box::new(Speciate));
        run_and_restore.execute(&mut engine).unwrap();
        assert_eq!(engine.trees.active().unwrap().count_nodes(), nodes_before);
        assert!(engine.trees.active().unwrap().is_leaf(root));
    }

    #[test]
    fn tree_macro_restores_original_active_index() {
        let mut engine = test_engine();
        engine.trees.duplicate_active().unwrap();
        engine.trees.duplicate_active().unwrap();
        engine.trees.set_active(1).unwrap();
        let mut macro_action = TreeMacro::new();
        macro_action.execute(&mut engine).unwrap();
        assert_eq!(engine.trees.active_index(), 1);
    }

    #[test]
    fn deep_size_and_delete_flatten_across_nested_containers() {
        let mut outer = RunOnce::new();
        outer.adopt(Box::new(CountingAction(std::rc::Rc::new(std::cell::RefCell::new(0)))));
        let mut inner = RunN::new(2);
        inner.adopt(Box::new(CountingAction(std::rc::Rc::new(std::cell::RefCell::new(0)))));
        outer.adopt(Box::new(inner));
        // self(1) + leaf(1) + [runn(1) + leaf(1)] = 4
        assert_eq!(outer.deep_size(), 4);
        outer.delete_element(1).unwrap();
        assert_eq!(outer.deep_size(), 3);
    }
}
