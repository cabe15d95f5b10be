//! Persisted-state seam for save actions (spec §6).
//!
//! File formats are an external collaborator's job (spec §1, "deliberately
//! out of scope"); this crate only supplies the data a Nexus or CAIC writer
//! needs — Newick structure via [`crate::tree::Tree::write_newick`] and the
//! two labelled trait matrices — and calls out to a [`SaveSink`] the
//! embedding application provides. The core never opens a file itself.

use crate::matrix::{ContinuousMatrix, DiscreteMatrix};
use crate::preferences::Preferences;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveFormat {
    Nexus,
    Caic,
}

/// everything a Nexus/CAIC writer needs to serialise one tree-plus-data snapshot
pub struct SaveRequest<'a> {
    pub format: SaveFormat,
    pub base_name: &'a str,
    /// incremented once per `Save` commit (spec §4.8: "reps counter increments into the filename")
    pub rep: usize,
    pub newick: String,
    pub translator: Option<&'a HashMap<String, String>>,
    pub continuous: &'a ContinuousMatrix,
    pub discrete: &'a DiscreteMatrix,
    pub preferences: &'a Preferences,
}

/// the external collaborator that actually writes bytes to disk. Returns
/// `anyhow::Result` rather than `EngineResult`: I/O failures originate
/// outside the core (a missing directory, a full disk, a permissions error)
/// and the caller annotates them with save-specific context before folding
/// them into an [`crate::error::EngineError::File`].
pub trait SaveSink {
    fn save(&mut self, request: &SaveRequest) -> anyhow::Result<()>;
}

/// a `SaveSink` used when the embedding application hasn't wired up a real
/// writer yet (mainly tests): it does no I/O, it only counts invocations.
#[derive(Default)]
pub struct NullSaveSink {
    pub calls: usize,
}

impl SaveSink for NullSaveSink {
    fn save(&mut self, request: &SaveRequest) -> anyhow::Result<()> {
        log::debug!(
            "save (no-op sink): {:?} {}.{}",
            request.format,
            request.base_name,
            request.rep
        );
        self.calls += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_sink_counts_calls_without_erroring() {
        let mut sink = NullSaveSink::default();
        let continuous = ContinuousMatrix::new();
        let discrete = DiscreteMatrix::new();
        let prefs = Preferences::default();
        let request = SaveRequest {
            format: SaveFormat::Nexus,
            base_name: "run",
            rep: 1,
            newick: "t0;".to_string(),
            translator: None,
            continuous: &continuous,
            discrete: &discrete,
            preferences: &prefs,
        };
        sink.save(&request).unwrap();
        sink.save(&request).unwrap();
        assert_eq!(sink.calls, 2);
    }
}
