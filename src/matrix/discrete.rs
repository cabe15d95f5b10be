//! The discrete trait matrix (spec §3, §4.2): a matrix of state strings
//! labelled by taxon name and trait, with a per-column registry of observed
//! states. `"?"` and `"-"` are missing-data tokens, excluded from that
//! registry (spec §4.2).

use super::stateset::StateSet;
use crate::error::{EngineError, EngineResult};
use crate::rng::Random;
use std::collections::HashMap;

pub const MISSING_TOKENS: [&str; 2] = ["?", "-"];

pub fn is_missing(value: &str) -> bool {
    MISSING_TOKENS.contains(&value)
}

#[derive(Debug, Clone, Default)]
pub struct DiscreteMatrix {
    columns: Vec<String>,
    states: HashMap<String, StateSet>,
    row_order: Vec<String>,
    rows: HashMap<String, Vec<String>>,
}

impl DiscreteMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn row_names(&self) -> &[String] {
        &self.row_order
    }

    fn column_index(&self, col: &str) -> EngineResult<usize> {
        self.columns
            .iter()
            .position(|c| c == col)
            .ok_or_else(|| EngineError::index(format!("unknown discrete column {col:?}")))
    }

    pub fn append_cols(&mut self, names: &[String]) {
        for name in names {
            self.columns.push(name.clone());
            self.states.insert(name.clone(), StateSet::new());
        }
        for values in self.rows.values_mut() {
            values.resize(self.columns.len(), "?".to_string());
        }
    }

    pub fn resize(&mut self, rows: usize, cols: usize) {
        self.columns = (0..cols).map(|i| format!("c{i}")).collect();
        self.states = self.columns.iter().map(|c| (c.clone(), StateSet::new())).collect();
        let names: Vec<String> = (0..rows).map(|i| format!("t{i}")).collect();
        let mut new_rows = HashMap::new();
        for name in &names {
            let existing = self.rows.remove(name);
            let mut values = existing.unwrap_or_default();
            values.resize(cols, "?".to_string());
            new_rows.insert(name.clone(), values);
        }
        self.rows = new_rows;
        self.row_order = names;
    }

    pub fn add_row(&mut self, name: &str) {
        if !self.rows.contains_key(name) {
            self.rows
                .insert(name.to_string(), vec!["?".to_string(); self.columns.len()]);
            self.row_order.push(name.to_string());
        }
    }

    /// missing cells read as `"?"` (spec §4.2 supplement)
    pub fn get(&self, row: &str, col: &str) -> EngineResult<&str> {
        let idx = self.column_index(col)?;
        let row = self
            .rows
            .get(row)
            .ok_or_else(|| EngineError::index(format!("unknown taxon {row:?}")))?;
        Ok(row.get(idx).map(String::as_str).unwrap_or("?"))
    }

    pub fn set(&mut self, row: &str, col: &str, value: &str) -> EngineResult<()> {
        let idx = self.column_index(col)?;
        if !is_missing(value) {
            self.states.entry(col.to_string()).or_default().insert(value);
        }
        let row = self
            .rows
            .get_mut(row)
            .ok_or_else(|| EngineError::index(format!("unknown taxon {row:?}")))?;
        row[idx] = value.to_string();
        Ok(())
    }

    pub fn clone_row(&mut self, src: &str, dst: &str) -> EngineResult<()> {
        let values = self
            .rows
            .get(src)
            .ok_or_else(|| EngineError::index(format!("unknown taxon {src:?}")))?
            .clone();
        if !self.rows.contains_key(dst) {
            self.row_order.push(dst.to_string());
        }
        self.rows.insert(dst.to_string(), values);
        Ok(())
    }

    pub fn delete_row(&mut self, name: &str) -> EngineResult<()> {
        self.rows
            .remove(name)
            .ok_or_else(|| EngineError::index(format!("unknown taxon {name:?}")))?;
        self.row_order.retain(|r| r != name);
        Ok(())
    }

    pub fn states(&self, col: &str) -> EngineResult<&StateSet> {
        self.states
            .get(col)
            .ok_or_else(|| EngineError::index(format!("unknown discrete column {col:?}")))
    }

    pub fn shuffle_trait(&mut self, col: &str, rng: &mut Random) -> EngineResult<()> {
        let idx = self.column_index(col)?;
        let mut values: Vec<String> = self.row_order.iter().map(|r| self.rows[r][idx].clone()).collect();
        rng.shuffle(&mut values);
        for (row, value) in self.row_order.clone().into_iter().zip(values) {
            self.rows.get_mut(&row).unwrap()[idx] = value;
        }
        Ok(())
    }

    pub fn shuffle_all_traits(&mut self, rng: &mut Random) {
        for col in self.columns.clone() {
            self.shuffle_trait(&col, rng).expect("column just enumerated from self.columns");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_tokens_excluded_from_state_set() {
        let mut m = DiscreteMatrix::new();
        m.append_cols(&["color".to_string()]);
        m.add_row("sp1");
        m.add_row("sp2");
        m.set("sp1", "color", "red").unwrap();
        m.set("sp2", "color", "?").unwrap();
        let states = m.states("color").unwrap();
        assert!(states.contains("red"));
        assert!(!states.contains("?"));
        assert_eq!(states.len(), 1);
    }

    #[test]
    fn clone_row_duplicates_cells() {
        let mut m = DiscreteMatrix::new();
        m.append_cols(&["color".to_string()]);
        m.add_row("sp1");
        m.set("sp1", "color", "red").unwrap();
        m.clone_row("sp1", "sp2").unwrap();
        assert_eq!(m.get("sp2", "color").unwrap(), "red");
    }

    #[test]
    fn missing_cell_reads_as_question_mark() {
        let mut m = DiscreteMatrix::new();
        m.append_cols(&["color".to_string()]);
        m.add_row("sp1");
        assert_eq!(m.get("sp1", "color").unwrap(), "?");
    }
}
