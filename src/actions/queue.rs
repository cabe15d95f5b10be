//! The process-level queue (spec §4.7): "a process-level `RunOnce`."

use super::container::{RunAndRestore, RunN, TreeMacro};
use super::{Action, ActionKind};
use crate::engine::Engine;
use crate::error::EngineResult;

#[derive(Debug, Default)]
pub struct Queue {
    run_once: super::container::RunOnce,
}

impl Queue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn adopt(&mut self, action: Box<dyn Action>) {
        self.run_once.adopt(action);
    }

    pub fn run_once(&mut self, engine: &mut Engine) -> EngineResult<()> {
        self.run_once.execute(engine)
    }

    /// wrap the queue's current contents in a `TreeMacro` and run once
    pub fn run_trees(&mut self, engine: &mut Engine) -> EngineResult<()> {
        let mut macro_action = TreeMacro::new();
        for child in self.run_once.children.drain(..) {
            macro_action.adopt(child);
        }
        let result = macro_action.execute(engine);
        self.run_once.children = vec![Box::new(macro_action)];
        result
    }

    pub fn run_n(&mut self, k: usize, engine: &mut Engine) -> EngineResult<()> {
        let mut run_n = RunN::new(k);
        for child in self.run_once.children.drain(..) {
            run_n.adopt(child);
        }
        let result = run_n.execute(engine);
        self.run_once.children = vec![Box::new(run_n)];
        result
    }

    pub fn run_and_restore(&mut self, k: usize, engine: &mut Engine) -> EngineResult<()> {
        let mut run_and_restore = RunAndRestore::new(k);
        for child in self.run_once.children.drain(..) {
            run_and_restore.adopt(child);
        }
        let result = run_and_restore.execute(engine);
        self.run_once.children = vec![Box::new(run_and_restore)];
        result
    }

    pub fn delete_element(&mut self, index: usize) -> EngineResult<()> {
        if index == 0 {
            return Err(crate::error::EngineError::index("cannot delete the queue itself (index 0)"));
        }
        self.run_once.delete_element(index)
    }

    pub fn clear(&mut self) {
        self.run_once.children.clear();
    }

    pub fn describe(&self, index: usize) -> EngineResult<String> {
        self.run_once.describe(index)
    }

    pub fn depth(&self, index: usize) -> EngineResult<usize> {
        self.run_once.depth(index)
    }

    pub fn size(&self) -> usize {
        self.run_once.deep_size()
    }

    pub fn contains_analyses(&self) -> bool {
        self.run_once.contains_analysis()
    }

    pub fn kind(&self) -> ActionKind {
        self.run_once.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preferences::Preferences;
    use crate::report::RecordingReporter;

    #[derive(Debug)]
    struct NoOp;
    impl Action for NoOp {
        fn execute(&mut self, _engine: &mut Engine) -> EngineResult<()> {
            Ok(())
        }
        fn deep_size(&self) -> usize {
            1
        }
        fn describe(&self, index: usize) -> EngineResult<String> {
            super::super::leaf_describe(index, || "noop".to_string())
        }
        fn delete_element(&mut self, index: usize) -> EngineResult<()> {
            super::super::leaf_delete(index)
        }
        fn depth(&self, index: usize) -> EngineResult<usize> {
            super::super::leaf_depth(index)
        }
        fn kind(&self) -> ActionKind {
            ActionKind::System
        }
    }

    fn test_engine() -> Engine {
        let mut engine = Engine::new(Preferences::default(), Box::new(RecordingReporter::new()));
        engine.seed_tree();
        engine
    }

    #[test]
    fn size_reflects_adopted_children() {
        let mut queue = Queue::new();
        queue.adopt(Box::new(NoOp));
        queue.adopt(Box::new(NoOp));
        assert_eq!(queue.size(), 3);
    }

    #[test]
    fn delete_element_zero_is_rejected() {
        let mut queue = Queue::new();
        queue.adopt(Box::new(NoOp));
        assert!(queue.delete_element(0).is_err());
    }

    #[test]
    fn clear_empties_the_queue() {
        let mut queue = Queue::new();
        queue.adopt(Box::new(NoOp));
        queue.clear();
        assert_eq!(queue.size(), 1);
    }

    #[test]
    fn run_n_wraps_and_runs_existing_children() {
        let mut engine = test_engine();
        let mut queue = Queue::new();
        queue.adopt(Box::new(NoOp));
        queue.run_n(2, &mut engine).unwrap();
    }
}
