//! Engine-wide configuration (spec §6, "Preferences").
//!
//! A plain value bundled into [`crate::engine::Engine`] at construction; there
//! is no environment-variable or CLI parsing here — that belongs to the
//! out-of-scope console UI.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Loud,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Logging {
    Enabled,
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Case {
    Upper,
    Lower,
    Mixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisOut {
    AllScreen,
    AllFile,
    Normal,
}

/// the labelling convention used for serialising node names (spec §4.1)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CladeLabels {
    Phylo,
    Caic,
    Series,
}

/// which nodes are immune to extinction commits (spec §4.5, §6)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreserveNodes {
    None,
    Root,
    RootChildren,
}

#[derive(Debug, Clone, Copy)]
pub struct Preferences {
    pub verbosity: Verbosity,
    pub logging: Logging,
    pub case: Case,
    pub pad_numeric_output: bool,
    pub analysis_out: AnalysisOut,
    pub clade_labels: CladeLabels,
    pub write_translation: bool,
    pub write_taxa_block: bool,
    pub preserve_nodes: PreserveNodes,
    /// minimum representable inter-event time; floors all waits and bounds
    /// the maximum rate at `1 / time_grain` (spec §4.3, §4.5)
    pub time_grain: f64,
    pub rng_seed: u64,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            verbosity: Verbosity::Normal,
            logging: Logging::Disabled,
            case: Case::Mixed,
            pad_numeric_output: false,
            analysis_out: AnalysisOut::Normal,
            clade_labels: CladeLabels::Phylo,
            write_translation: true,
            write_taxa_block: true,
            preserve_nodes: PreserveNodes::Root,
            time_grain: 1e-6,
            rng_seed: 0,
        }
    }
}

impl Preferences {
    /// the rate ceiling implied by `time_grain` (spec §4.3)
    pub fn max_rate(&self) -> f64 {
        1.0 / self.time_grain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let prefs = Preferences::default();
        assert_eq!(prefs.time_grain, 1e-6);
        assert_eq!(prefs.rng_seed, 0);
        assert_eq!(prefs.clade_labels, CladeLabels::Phylo);
        assert_eq!(prefs.preserve_nodes, PreserveNodes::Root);
    }

    #[test]
    fn max_rate_is_inverse_of_time_grain() {
        let mut prefs = Preferences::default();
        prefs.time_grain = 0.5;
        assert_eq!(prefs.max_rate(), 2.0);
    }
}
