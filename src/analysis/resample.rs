//! Jackknife/bootstrap diversity re-estimation and site complementarity
//! (spec §4.9). Grounded on `original_source/src/Analysis.cpp`'s
//! `Jackknife{Genetic,Phylo}DivAnalysis` / `Bootstrap{Genetic,Phylo}DivAnalysis`:
//! both resample the site-abundance table, re-prune by abundance, and
//! re-measure genetic or phylogenetic diversity, reporting a mean and an
//! error term rather than a bare richness count.

use super::Analysis;
use crate::actions::system::{Prune, PruneSelector};
use crate::actions::Action;
use crate::engine::Engine;
use crate::error::{EngineError, EngineResult};
use crate::tree::Tree;

/// which of the tree's two distance-based diversity measures a resampling
/// analysis re-estimates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiversityKind {
    Genetic,
    Phylo,
}

impl DiversityKind {
    fn measure(self, tree: &Tree) -> Option<f64> {
        match self {
            Self::Genetic => tree.genetic_diversity(),
            Self::Phylo => tree.phylo_diversity(),
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Genetic => "GD",
            Self::Phylo => "PD",
        }
    }

    fn noun(self) -> &'static str {
        match self {
            Self::Genetic => "genetic",
            Self::Phylo => "phylogenetic",
        }
    }
}

/// prune the active tree by abundance and measure `kind`'s diversity on
/// what remains; shared by both the baseline and every resample iteration
fn prune_and_measure(engine: &mut Engine, kind: DiversityKind) -> EngineResult<Option<f64>> {
    Prune::new(PruneSelector::ByAbundance, true).execute(engine)?;
    Ok(kind.measure(engine.trees.active()?))
}

/// `sites`, `taxa` and the running total of abundance, read once per analysis
fn site_taxa_table(engine: &Engine) -> EngineResult<(Vec<String>, Vec<String>)> {
    let sites: Vec<String> = engine.continuous.list_site_traits().iter().map(|s| s.to_string()).collect();
    if sites.is_empty() {
        return Err(EngineError::not_applicable("no site-trait columns"));
    }
    Ok((sites, engine.continuous.row_names().to_vec()))
}

/// jackknife-1 estimate over sites of genetic or phylogenetic diversity:
/// for each taxon occurring at exactly one site with exactly one
/// individual there and nowhere else, zero that occurrence, re-prune, and
/// re-measure; the mean/error come from the spread of those re-measurements
#[derive(Debug)]
pub struct JackknifeDiversity {
    pub kind: DiversityKind,
}

impl JackknifeDiversity {
    pub fn new(kind: DiversityKind) -> Self {
        Self { kind }
    }
}

impl Analysis for JackknifeDiversity {
    fn name(&self) -> String {
        format!("jackknife estimate over sites of {} diversity", self.kind.noun())
    }

    fn measure(&mut self, engine: &mut Engine) -> EngineResult<Vec<String>> {
        let snapshot = engine.snapshot();
        let orig_div = prune_and_measure(engine, self.kind)?;
        engine.restore(snapshot.clone());
        let Some(orig_div) = orig_div else {
            return Err(EngineError::not_applicable("tree has no lengths"));
        };

        let (sites, taxa) = site_taxa_table(engine)?;

        let mut num_observations = 0.0f64;
        for site in &sites {
            for taxon in &taxa {
                num_observations += engine.continuous.get(taxon, site).unwrap_or(0.0).max(0.0);
            }
        }
        if num_observations <= 0.0 {
            return Err(EngineError::not_applicable("no taxon occurs at any site"));
        }

        let mut num_jackknifes = 0usize;
        let mut sum_diversity = 0.0;
        let mut total_sq_diffs = 0.0;
        for taxon in &taxa {
            let mut jackknifable = true;
            let mut zero_sites = 0usize;
            let mut jk_site: Option<&String> = None;
            for site in &sites {
                let abundance = engine.continuous.get(taxon, site).unwrap_or(0.0);
                if abundance >= 2.0 {
                    jackknifable = false;
                    break;
                } else if abundance == 1.0 {
                    if jk_site.is_some() {
                        jackknifable = false;
                        break;
                    }
                    jk_site = Some(site);
                } else if abundance <= 0.0 {
                    zero_sites += 1;
                } else {
                    jackknifable = false;
                    break;
                }
            }
            let (Some(site), true) = (jk_site, jackknifable && zero_sites + 1 == sites.len()) else {
                continue;
            };
            num_jackknifes += 1;
            engine.continuous.set(taxon, site, 0.0)?;
            let new_div = prune_and_measure(engine, self.kind)?;
            engine.restore(snapshot.clone());
            if let Some(new_div) = new_div {
                sum_diversity += new_div;
                let diff = orig_div - new_div;
                total_sq_diffs += diff * diff;
            }
        }

        if total_sq_diffs == 0.0 {
            return Err(EngineError::not_applicable("no appreciable jackknifed error"));
        }
        let mean = (sum_diversity + (num_observations - num_jackknifes as f64) * orig_div) / num_observations;
        let error = (total_sq_diffs * (num_observations - 1.0) / num_observations).sqrt();
        Ok(vec![
            self.name(),
            self.kind.label().to_string(),
            orig_div.to_string(),
            "jackknife estimate of mean".to_string(),
            mean.to_string(),
            "jackknife estimate of error".to_string(),
            error.to_string(),
            "number of samples".to_string(),
            num_observations.to_string(),
        ])
    }
}

/// bootstrap estimate over sites of genetic or phylogenetic diversity:
/// `reps` times, resample `num_observations` individuals with replacement
/// across the flattened (taxon, site) occurrence table, re-prune, and
/// re-measure
#[derive(Debug)]
pub struct BootstrapDiversity {
    pub kind: DiversityKind,
    pub reps: usize,
}

impl BootstrapDiversity {
    pub fn new(kind: DiversityKind, reps: usize) -> Self {
        Self { kind, reps }
    }
}

impl Analysis for BootstrapDiversity {
    fn name(&self) -> String {
        format!("bootstrap estimate over sites of {} diversity", self.kind.noun())
    }

    fn measure(&mut self, engine: &mut Engine) -> EngineResult<Vec<String>> {
        let snapshot = engine.snapshot();
        let orig_div = prune_and_measure(engine, self.kind)?;
        engine.restore(snapshot.clone());
        let Some(orig_div) = orig_div else {
            return Err(EngineError::not_applicable("tree has no lengths"));
        };

        let (sites, taxa) = site_taxa_table(engine)?;

        // flatten into a cumulative distribution over (taxon, site) pairs,
        // one entry per occupied cell, weighted by its abundance
        let mut entries: Vec<(String, String)> = Vec::new();
        let mut cumulative: Vec<f64> = Vec::new();
        let mut running = 0.0;
        for site in &sites {
            for taxon in &taxa {
                let n = engine.continuous.get(taxon, site).unwrap_or(0.0);
                if n > 0.0 {
                    running += n;
                    entries.push((taxon.clone(), site.clone()));
                    cumulative.push(running);
                }
            }
        }
        if entries.is_empty() {
            return Err(EngineError::not_applicable("no taxon occurs at any site"));
        }
        let num_observations = running;
        for c in cumulative.iter_mut() {
            *c /= num_observations;
        }
        *cumulative.last_mut().expect("entries is non-empty") = 1.0;

        if self.reps == 0 {
            return Err(EngineError::not_applicable("zero bootstrap reps requested"));
        }
        let num_samples = (num_observations.round() as usize).max(1);

        let mut sum_diversity = 0.0;
        let mut total_sq_diffs = 0.0;
        for _ in 0..self.reps {
            for site in &sites {
                for taxon in &taxa {
                    engine.continuous.set(taxon, site, 0.0)?;
                }
            }
            for _ in 0..num_samples {
                let choice = engine.rng.uniform();
                let idx = cumulative.iter().position(|&p| choice <= p).unwrap_or(entries.len() - 1);
                let (taxon, site) = &entries[idx];
                let current = engine.continuous.get(taxon, site).unwrap_or(0.0);
                engine.continuous.set(taxon, site, current + 1.0)?;
            }
            let new_div = prune_and_measure(engine, self.kind)?;
            engine.restore(snapshot.clone());
            if let Some(new_div) = new_div {
                sum_diversity += new_div;
                let diff = orig_div - new_div;
                total_sq_diffs += diff * diff;
            }
        }

        let reps_f = self.reps as f64;
        let mean = sum_diversity / reps_f;
        let error = total_sq_diffs.sqrt() / (reps_f - 1.0);
        Ok(vec![
            self.name(),
            self.kind.label().to_string(),
            orig_div.to_string(),
            "bootstrap estimate of mean".to_string(),
            mean.to_string(),
            "bootstrap estimate of std error".to_string(),
            error.to_string(),
        ])
    }
}

/// fraction of species occurring at exactly one site (spec §4.9)
#[derive(Debug, Default)]
pub struct SiteComplementarity;

fn occurrence_counts(engine: &Engine) -> EngineResult<Vec<usize>> {
    let sites = engine.continuous.list_site_traits();
    if sites.is_empty() {
        return Err(EngineError::not_applicable("no site-trait columns"));
    }
    let occurrences: Vec<usize> = engine
        .continuous
        .row_names()
        .iter()
        .map(|taxon| sites.iter().filter(|&&site| engine.continuous.get(taxon, site).unwrap_or(0.0) > 0.0).count())
        .filter(|&count| count > 0)
        .collect();
    if occurrences.is_empty() {
        return Err(EngineError::not_applicable("no taxon occurs at any site"));
    }
    Ok(occurrences)
}

impl Analysis for SiteComplementarity {
    fn name(&self) -> String {
        "site complementarity".to_string()
    }
    fn measure(&mut self, engine: &mut Engine) -> EngineResult<Vec<String>> {
        let occurrences = occurrence_counts(engine)?;
        let s_obs = occurrences.len() as f64;
        let q1 = occurrences.iter().filter(|&&c| c == 1).count() as f64;
        Ok(vec![self.name(), (q1 / s_obs).to_string()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preferences::Preferences;
    use crate::report::RecordingReporter;

    fn engine_with_sites(rows: &[(&str, &[f64])]) -> Engine {
        let mut engine = Engine::new(Preferences::default(), Box::new(RecordingReporter::new()));
        engine.seed_tree();
        let n_sites = rows.first().map(|(_, v)| v.len()).unwrap_or(0);
        for i in 0..n_sites {
            let col = format!("site{i}");
            engine.add_continuous_column(&col);
            engine.continuous.mark_site_trait(&col).unwrap();
        }
        let root = engine.trees.active().unwrap().root();
        let mut leaf = root;
        for (i, (name, values)) in rows.iter().enumerate() {
            if i + 1 < rows.len() {
                let (a, b) = engine.trees.active_mut().unwrap().speciate(leaf).unwrap();
                engine.trees.active_mut().unwrap().set_name(a, name).unwrap();
                engine.import_trait_row(name);
                leaf = b;
            } else {
                engine.trees.active_mut().unwrap().set_name(leaf, name).unwrap();
                engine.import_trait_row(name);
            }
            for (j, value) in values.iter().enumerate() {
                engine.continuous.set(name, &format!("site{j}"), *value).unwrap();
            }
        }
        engine
    }

    #[test]
    fn site_complementarity_is_fraction_of_singletons() {
        let mut engine = engine_with_sites(&[("a", &[1.0, 0.0]), ("b", &[1.0, 1.0]), ("c", &[0.0, 1.0])]);
        let row = SiteComplementarity.measure(&mut engine).unwrap();
        let value: f64 = row[1].parse().unwrap();
        assert!((value - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn no_site_columns_is_not_applicable() {
        let mut engine = Engine::new(Preferences::default(), Box::new(RecordingReporter::new()));
        engine.seed_tree();
        assert!(JackknifeDiversity::new(DiversityKind::Genetic).measure(&mut engine).is_err());
    }

    #[test]
    fn jackknife_reports_mean_and_error_over_lengthed_tree() {
        let mut engine = engine_with_sites(&[("a", &[1.0, 0.0]), ("b", &[1.0, 1.0]), ("c", &[0.0, 1.0])]);
        // give every branch a non-zero length so phylo/genetic diversity is defined
        let leaves = engine.trees.active().unwrap().node_ids().collect::<Vec<_>>();
        for n in leaves {
            if !engine.trees.active().unwrap().is_root(n) {
                engine.trees.active_mut().unwrap().set_edge_weight(n, 1.0).unwrap();
            }
        }
        let row = JackknifeDiversity::new(DiversityKind::Phylo).measure(&mut engine).unwrap();
        assert_eq!(row[0], "jackknife estimate over sites of phylogenetic diversity");
    }

    #[test]
    fn bootstrap_does_not_mutate_engine_state() {
        let mut engine = engine_with_sites(&[("a", &[1.0, 0.0]), ("b", &[1.0, 1.0]), ("c", &[0.0, 1.0])]);
        let leaves = engine.trees.active().unwrap().node_ids().collect::<Vec<_>>();
        for n in leaves {
            if !engine.trees.active().unwrap().is_root(n) {
                engine.trees.active_mut().unwrap().set_edge_weight(n, 1.0).unwrap();
            }
        }
        let before = engine.snapshot();
        let _ = BootstrapDiversity::new(DiversityKind::Genetic, 5).measure(&mut engine);
        let after = engine.snapshot();
        assert_eq!(format!("{before:?}"), format!("{after:?}"));
    }
}
