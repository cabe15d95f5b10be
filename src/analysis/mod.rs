//! Analyses (spec §4.9): leaves that read the tree and trait matrices and
//! push a record to the reporter rather than mutate anything.
//!
//! Each concrete analysis implements the small [`Analysis`] trait; the
//! generic [`AnalysisAction`] wrapper does the uniform part — building the
//! `"analyse: {name}"` prefix, folding a [`crate::error::EngineError::NotApplicable`]
//! into a normal analysis line instead of propagating it (spec §7, §9), and
//! satisfying [`crate::actions::Action`] so an analysis slots into any
//! container next to system actions and epochs.

pub mod diversity;
pub mod imbalance;
pub mod info;
pub mod resample;

use crate::actions::{leaf_delete, leaf_depth, leaf_describe, Action, ActionKind};
use crate::engine::Engine;
use crate::error::{EngineError, EngineResult};
use crate::report::ReportKind;

/// what a concrete analysis (Shannon diversity, Colless' C, tree info, ...)
/// must supply: a name for the reporter prefix and the row of values it
/// produces, or `Err(NotApplicable)` when its preconditions fail.
pub trait Analysis: std::fmt::Debug {
    fn name(&self) -> String;
    fn measure(&mut self, engine: &mut Engine) -> EngineResult<Vec<String>>;
}

#[derive(Debug)]
pub struct AnalysisAction<T: Analysis>(pub T);

impl<T: Analysis> AnalysisAction<T> {
    pub fn new(analysis: T) -> Self {
        Self(analysis)
    }
}

impl<T: Analysis> Action for AnalysisAction<T> {
    fn execute(&mut self, engine: &mut Engine) -> EngineResult<()> {
        engine.push_prefix(&format!("analyse: {}", self.0.name()));
        let result = self.0.measure(engine);
        engine.pop_prefix();
        match result {
            Ok(values) => {
                engine.emit_row(ReportKind::Analysis, &values);
                Ok(())
            }
            Err(EngineError::NotApplicable(reason)) => {
                engine.emit_row(ReportKind::Analysis, &[self.0.name(), format!("N/A ({reason})")]);
                Ok(())
            }
            Err(other) => Err(other),
        }
    }

    fn deep_size(&self) -> usize {
        1
    }

    fn describe(&self, index: usize) -> EngineResult<String> {
        leaf_describe(index, || format!("analyse: {}", self.0.name()))
    }

    fn delete_element(&mut self, index: usize) -> EngineResult<()> {
        leaf_delete(index)
    }

    fn depth(&self, index: usize) -> EngineResult<usize> {
        leaf_depth(index)
    }

    fn kind(&self) -> ActionKind {
        ActionKind::Analysis
    }
}

/// per-species abundances summed over the continuous matrix's site-trait
/// columns, restricted to taxa with positive total abundance (spec §4.9)
pub(crate) fn species_abundances(engine: &Engine) -> Vec<(String, f64)> {
    engine
        .continuous
        .row_names()
        .iter()
        .map(|name| (name.clone(), engine.continuous.total_abundance(name)))
        .filter(|(_, n)| *n > 0.0)
        .collect()
}
