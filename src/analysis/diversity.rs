//! Diversity analyses (spec §4.9): `genetic_diversity`/`phylo_diversity` read
//! straight off the active tree; the rest are abundance-based indices over
//! the continuous matrix's site-trait columns, grounded on the
//! `*DiversityAnalysis` family (`Analysis.h`/`Analysis.cpp`).

use super::{species_abundances, Analysis};
use crate::engine::Engine;
use crate::error::{EngineError, EngineResult};

#[derive(Debug, Default)]
pub struct GeneticDiversity;

impl Analysis for GeneticDiversity {
    fn name(&self) -> String {
        "genetic diversity".to_string()
    }
    fn measure(&mut self, engine: &mut Engine) -> EngineResult<Vec<String>> {
        let value = engine
            .trees
            .active()?
            .genetic_diversity()
            .ok_or_else(|| EngineError::not_applicable("tree has no lengths"))?;
        Ok(vec![self.name(), value.to_string()])
    }
}

#[derive(Debug, Default)]
pub struct PhyloDiversity;

impl Analysis for PhyloDiversity {
    fn name(&self) -> String {
        "phylogenetic diversity".to_string()
    }
    fn measure(&mut self, engine: &mut Engine) -> EngineResult<Vec<String>> {
        let value = engine
            .trees
            .active()?
            .phylo_diversity()
            .ok_or_else(|| EngineError::not_applicable("tree has no lengths"))?;
        Ok(vec![self.name(), value.to_string()])
    }
}

/// `N` (total abundance), `S` (species count), and each species' proportion
/// `p_i = n_i / N`; shared by every abundance-based index below
fn abundance_summary(engine: &Engine) -> EngineResult<(f64, usize, Vec<f64>)> {
    let abundances = species_abundances(engine);
    if abundances.is_empty() {
        return Err(EngineError::not_applicable("no taxa with positive abundance"));
    }
    let total: f64 = abundances.iter().map(|(_, n)| n).sum();
    if total <= 0.0 {
        return Err(EngineError::not_applicable("total abundance is zero"));
    }
    let proportions: Vec<f64> = abundances.iter().map(|(_, n)| n / total).collect();
    Ok((total, abundances.len(), proportions))
}

#[derive(Debug, Default)]
pub struct ShannonWeiner;

impl Analysis for ShannonWeiner {
    fn name(&self) -> String {
        "Shannon-Weiner diversity".to_string()
    }
    fn measure(&mut self, engine: &mut Engine) -> EngineResult<Vec<String>> {
        let (_, species, proportions) = abundance_summary(engine)?;
        let h: f64 = -proportions.iter().map(|p| p * p.log2()).sum::<f64>();
        let evenness = if species > 1 { h / (species as f64).log2() } else { 0.0 };
        Ok(vec![self.name(), h.to_string(), "evenness".to_string(), evenness.to_string()])
    }
}

#[derive(Debug, Default)]
pub struct Simpson;

impl Analysis for Simpson {
    fn name(&self) -> String {
        "Simpson diversity".to_string()
    }
    fn measure(&mut self, engine: &mut Engine) -> EngineResult<Vec<String>> {
        let (_, _, proportions) = abundance_summary(engine)?;
        let value = 1.0 - proportions.iter().map(|p| p * p).sum::<f64>();
        Ok(vec![self.name(), value.to_string()])
    }
}

/// `ln(n!)` via Gosper's approximation, exact (zero) for `n <= 1`
fn ln_factorial_gosper(n: f64) -> f64 {
    if n <= 1.0 {
        return 0.0;
    }
    0.5 * (std::f64::consts::PI).ln() + n * n.ln() - n + 0.5 * (2.0 * n + 1.0 / 3.0).ln()
}

#[derive(Debug, Default)]
pub struct Brillouin;

impl Analysis for Brillouin {
    fn name(&self) -> String {
        "Brillouin diversity".to_string()
    }
    fn measure(&mut self, engine: &mut Engine) -> EngineResult<Vec<String>> {
        let abundances = species_abundances(engine);
        if abundances.is_empty() {
            return Err(EngineError::not_applicable("no taxa with positive abundance"));
        }
        let total: f64 = abundances.iter().map(|(_, n)| n).sum();
        if total <= 0.0 {
            return Err(EngineError::not_applicable("total abundance is zero"));
        }
        let sum_ln_factorials: f64 = abundances.iter().map(|(_, n)| ln_factorial_gosper(*n)).sum();
        let value = (ln_factorial_gosper(total) - sum_ln_factorials) / total;
        Ok(vec![self.name(), value.to_string()])
    }
}

#[derive(Debug, Default)]
pub struct Pie;

impl Analysis for Pie {
    fn name(&self) -> String {
        "PIE diversity".to_string()
    }
    fn measure(&mut self, engine: &mut Engine) -> EngineResult<Vec<String>> {
        let (_, species, proportions) = abundance_summary(engine)?;
        let s = species as f64;
        let value = (s / (s + 1.0)) * (1.0 - proportions.iter().map(|p| p * p).sum::<f64>());
        Ok(vec![self.name(), value.to_string()])
    }
}

#[derive(Debug, Default)]
pub struct Macintosh;

impl Analysis for Macintosh {
    fn name(&self) -> String {
        "Macintosh diversity".to_string()
    }
    fn measure(&mut self, engine: &mut Engine) -> EngineResult<Vec<String>> {
        let (_, _, proportions) = abundance_summary(engine)?;
        let value = proportions.iter().map(|p| p * p).sum::<f64>().sqrt();
        Ok(vec![self.name(), value.to_string()])
    }
}

#[derive(Debug, Default)]
pub struct Margelef;

impl Analysis for Margelef {
    fn name(&self) -> String {
        "Margelef diversity".to_string()
    }
    fn measure(&mut self, engine: &mut Engine) -> EngineResult<Vec<String>> {
        let (total, species, _) = abundance_summary(engine)?;
        if total <= 1.0 {
            return Err(EngineError::not_applicable("ln(N) is non-positive"));
        }
        let value = (species as f64 - 1.0) / total.ln();
        Ok(vec![self.name(), value.to_string()])
    }
}

#[derive(Debug, Default)]
pub struct Menhinick;

impl Analysis for Menhinick {
    fn name(&self) -> String {
        "Menhinick diversity".to_string()
    }
    fn measure(&mut self, engine: &mut Engine) -> EngineResult<Vec<String>> {
        let (total, species, _) = abundance_summary(engine)?;
        let value = species as f64 / total.sqrt();
        Ok(vec![self.name(), value.to_string()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preferences::Preferences;
    use crate::report::RecordingReporter;

    fn engine_with_abundances(values: &[(&str, f64)]) -> Engine {
        let mut engine = Engine::new(Preferences::default(), Box::new(RecordingReporter::new()));
        engine.seed_tree();
        engine.add_continuous_column("n");
        engine.continuous.mark_site_trait("n").unwrap();
        for (name, value) in values {
            engine.import_trait_row(name);
            engine.continuous.set(name, "n", *value).unwrap();
        }
        engine
    }

    #[test]
    fn shannon_weiner_is_zero_for_a_single_species() {
        let mut engine = engine_with_abundances(&[("sp1", 10.0)]);
        let mut analysis = ShannonWeiner;
        let row = analysis.measure(&mut engine).unwrap();
        assert_eq!(row[1], "0".to_string());
    }

    #[test]
    fn simpson_diversity_increases_with_evenness() {
        let mut even = engine_with_abundances(&[("a", 5.0), ("b", 5.0)]);
        let mut skewed = engine_with_abundances(&[("a", 9.0), ("b", 1.0)]);
        let even_val: f64 = Simpson.measure(&mut even).unwrap()[1].parse().unwrap();
        let skewed_val: f64 = Simpson.measure(&mut skewed).unwrap()[1].parse().unwrap();
        assert!(even_val > skewed_val);
    }

    #[test]
    fn no_abundance_data_is_not_applicable() {
        let mut engine = Engine::new(Preferences::default(), Box::new(RecordingReporter::new()));
        engine.seed_tree();
        assert!(Simpson.measure(&mut engine).is_err());
    }

    #[test]
    fn genetic_diversity_is_not_applicable_without_lengths() {
        let mut engine = Engine::new(Preferences::default(), Box::new(RecordingReporter::new()));
        engine.seed_tree();
        let root = engine.trees.active().unwrap().root();
        engine.trees.active_mut().unwrap().speciate(root).unwrap();
        assert!(GeneticDiversity.measure(&mut engine).is_err());
    }
}
