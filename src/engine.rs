//! The engine context (spec §9, "Global state"): the single value bundling
//! the three shared stores, the RNG, preferences, and the reporter sink that
//! the source instead reached via process-wide singletons. Every action's
//! `execute` takes `&mut Engine` rather than touching hidden globals.

use crate::actions::Action;
use crate::error::{EngineError, EngineResult};
use crate::matrix::{ContinuousMatrix, DiscreteMatrix};
use crate::persist::{NullSaveSink, SaveSink};
use crate::preferences::Preferences;
use crate::report::{ReportKind, Reporter};
use crate::rng::Random;
use crate::tree::TreeStore;

/// a deep copy of the three shared stores, used by `RunAndRestore`, epoch
/// `restart_if_dead`, and the jackknife/bootstrap resampling loop (spec §5)
#[derive(Debug, Clone)]
pub struct Snapshot {
    trees: TreeStore,
    continuous: ContinuousMatrix,
    discrete: DiscreteMatrix,
}

pub struct Engine {
    pub trees: TreeStore,
    pub continuous: ContinuousMatrix,
    pub discrete: DiscreteMatrix,
    pub rng: Random,
    pub preferences: Preferences,
    reporter: Box<dyn Reporter>,
    save_sink: Box<dyn SaveSink>,
}

impl Engine {
    pub fn new(preferences: Preferences, reporter: Box<dyn Reporter>) -> Self {
        let seed = preferences.rng_seed;
        Self {
            trees: TreeStore::new(),
            continuous: ContinuousMatrix::new(),
            discrete: DiscreteMatrix::new(),
            rng: Random::new(seed),
            preferences,
            reporter,
            save_sink: Box::new(NullSaveSink::default()),
        }
    }

    pub fn with_save_sink(mut self, sink: Box<dyn SaveSink>) -> Self {
        self.save_sink = sink;
        self
    }

    pub fn save_sink(&mut self) -> &mut dyn SaveSink {
        self.save_sink.as_mut()
    }

    /// replace the tree store with a fresh one-node tree, selected as active
    /// (spec §3, "Seeding creates a one-node tree")
    pub fn seed_tree(&mut self) -> usize {
        self.trees.seed()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            trees: self.trees.clone(),
            continuous: self.continuous.clone(),
            discrete: self.discrete.clone(),
        }
    }

    pub fn restore(&mut self, snapshot: Snapshot) {
        self.trees = snapshot.trees;
        self.continuous = snapshot.continuous;
        self.discrete = snapshot.discrete;
    }

    pub fn emit(&mut self, kind: ReportKind, text: &str) {
        self.reporter.emit(kind, text);
    }

    pub fn emit_row(&mut self, kind: ReportKind, values: &[String]) {
        self.reporter.emit_row(kind, values);
    }

    pub fn push_prefix(&mut self, prefix: &str) {
        self.reporter.push_prefix(prefix);
    }

    pub fn pop_prefix(&mut self) {
        self.reporter.pop_prefix();
    }

    pub fn reporter(&mut self) -> &mut dyn Reporter {
        self.reporter.as_mut()
    }

    /// run one action to completion against this context (spec §6, "execute an action")
    pub fn execute(&mut self, action: &mut dyn Action) -> EngineResult<()> {
        action.execute(self)
    }

    /// add a fresh trait column, blank-filled for every existing row (spec §4.2)
    pub fn add_continuous_column(&mut self, name: &str) {
        self.continuous.append_cols(std::slice::from_ref(&name.to_string()));
    }

    pub fn add_discrete_column(&mut self, name: &str) {
        self.discrete.append_cols(std::slice::from_ref(&name.to_string()));
    }

    pub fn delete_continuous_column(&mut self, name: &str) -> EngineResult<()> {
        if !self.continuous.columns().contains(&name.to_string()) {
            return Err(EngineError::index(format!("unknown continuous column {name:?}")));
        }
        let survivors: Vec<String> = self
            .continuous
            .columns()
            .iter()
            .filter(|c| c.as_str() != name)
            .cloned()
            .collect();
        let mut rebuilt = ContinuousMatrix::new();
        rebuilt.append_cols(&survivors);
        for row in self.continuous.row_names().to_vec() {
            rebuilt.add_row(&row);
            for col in &survivors {
                let value = self.continuous.get(&row, col).unwrap_or(f64::NAN);
                rebuilt.set(&row, col, value)?;
            }
        }
        self.continuous = rebuilt;
        Ok(())
    }

    /// import one taxon's trait row into both matrices, creating the row if absent
    pub fn import_trait_row(&mut self, taxon: &str) {
        self.continuous.add_row(taxon);
        self.discrete.add_row(taxon);
    }
}
