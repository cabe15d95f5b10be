//! The continuous trait matrix (spec §3, §4.2): a rectangular matrix of
//! reals labelled by taxon name (row) and trait (column), with a tagged
//! subset used as site-abundance columns by the diversity analyses.

use crate::error::{EngineError, EngineResult};
use crate::rng::Random;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Default)]
pub struct ContinuousMatrix {
    columns: Vec<String>,
    site_traits: HashSet<String>,
    row_order: Vec<String>,
    rows: HashMap<String, Vec<f64>>,
}

impl ContinuousMatrix {
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
            .ok_or_else(|| EngineError::index(format!("unknown continuous column {col:?}")))
    }

    pub fn has_row(&self, name: &str) -> bool {
        self.rows.contains_key(name)
    }

    /// append `n` blank (`NAN`, i.e. "no data") columns, returning their names
    pub fn append_cols(&mut self, names: &[String]) {
        for name in names {
            self.columns.push(name.clone());
        }
        for values in self.rows.values_mut() {
            values.resize(self.columns.len(), f64::NAN);
        }
    }

    /// resize to exactly `rows` taxa (named `t0..`) and `cols` columns
    /// (named `c0..`), blank-filling any new cells (spec §4.2)
    pub fn resize(&mut self, rows: usize, cols: usize) {
        self.columns = (0..cols).map(|i| format!("c{i}")).collect();
        let names: Vec<String> = (0..rows).map(|i| format!("t{i}")).collect();
        let mut new_rows = HashMap::new();
        for name in &names {
            let existing = self.rows.remove(name);
            let mut values = existing.unwrap_or_default();
            values.resize(cols, f64::NAN);
            new_rows.insert(name.clone(), values);
        }
        self.rows = new_rows;
        self.row_order = names;
    }

    pub fn add_row(&mut self, name: &str) {
        if !self.rows.contains_key(name) {
            self.rows.insert(name.to_string(), vec![f64::NAN; self.columns.len()]);
            self.row_order.push(name.to_string());
        }
    }

    /// missing cells read as `NAN`; callers should test with `is_na`, not
    /// float equality (spec §4.2 supplement)
    pub fn get(&self, row: &str, col: &str) -> EngineResult<f64> {
        let idx = self.column_index(col)?;
        let row = self
            .rows
            .get(row)
            .ok_or_else(|| EngineError::index(format!("unknown taxon {row:?}")))?;
        Ok(*row.get(idx).unwrap_or(&f64::NAN))
    }

    pub fn set(&mut self, row: &str, col: &str, value: f64) -> EngineResult<()> {
        let idx = self.column_index(col)?;
        let row = self
            .rows
            .get_mut(row)
            .ok_or_else(|| EngineError::index(format!("unknown taxon {row:?}")))?;
        row[idx] = value;
        Ok(())
    }

    /// duplicate all cells of `src` onto a fresh row `dst` (speciation, spec §4.2)
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

    pub fn mark_site_trait(&mut self, col: &str) -> EngineResult<()> {
        self.column_index(col)?;
        self.site_traits.insert(col.to_string());
        Ok(())
    }

    pub fn is_site_trait(&self, col: &str) -> bool {
        self.site_traits.contains(col)
    }

    pub fn list_site_traits(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| self.site_traits.contains(*c))
            .map(String::as_str)
            .collect()
    }

    /// randomly permute a single column across rows: preserves the column's
    /// multiset of values but disturbs row pairing (spec §4.2)
    pub fn shuffle_trait(&mut self, col: &str, rng: &mut Random) -> EngineResult<()> {
        let idx = self.column_index(col)?;
        let mut values: Vec<f64> = self.row_order.iter().map(|r| self.rows[r][idx]).collect();
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

    /// total abundance for a taxon, summed over the site-abundance columns
    pub fn total_abundance(&self, row: &str) -> f64 {
        self.list_site_traits()
            .iter()
            .filter_map(|col| self.get(row, col).ok())
            .filter(|v| !v.is_nan())
            .sum()
    }
}

pub fn is_na(v: f64) -> bool {
    v.is_nan()
}
