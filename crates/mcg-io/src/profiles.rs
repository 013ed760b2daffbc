//! Named time-series shapes for availability and demand.
//!
//! Callers ask for a shape by key and required length and always receive an
//! array of exactly that length. Repetition and truncation happen here; the
//! assembly pipeline never resamples.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use indexmap::IndexMap;

use crate::record::RecordTable;

/// Columns in a profile CSV that index rows rather than carry values.
const INDEX_COLUMNS: &[&str] = &["snapshot", "time", "timestamp", "hour", ""];

pub trait ProfileSource {
    /// Shape stored under `key`, repeated or truncated to `len` values.
    fn shape(&self, key: &str, len: usize) -> Option<Vec<f64>>;

    fn contains(&self, key: &str) -> bool {
        self.shape(key, 1).is_some()
    }
}

/// In-memory profile collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileStore {
    profiles: IndexMap<String, Vec<f64>>,
}

impl ProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, values: Vec<f64>) {
        self.profiles.insert(key.into(), values);
    }

    pub fn with(mut self, key: impl Into<String>, values: Vec<f64>) -> Self {
        self.insert(key, values);
        self
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    pub fn raw(&self, key: &str) -> Option<&[f64]> {
        self.profiles.get(key).map(Vec::as_slice)
    }
}

impl ProfileSource for ProfileStore {
    fn shape(&self, key: &str, len: usize) -> Option<Vec<f64>> {
        let values = self.profiles.get(key)?;
        if values.is_empty() {
            return None;
        }
        Some(values.iter().copied().cycle().take(len).collect())
    }

    fn contains(&self, key: &str) -> bool {
        self.profiles.get(key).is_some_and(|v| !v.is_empty())
    }
}

/// Read a wide CSV where every non-index column is one profile.
///
/// Blank cells are read as `0.0`; any other unparsable cell is an error.
pub fn load_profiles_csv(path: &Path) -> Result<ProfileStore> {
    let table = RecordTable::read_csv(path)?;
    let keys: Vec<&String> = table
        .columns
        .iter()
        .filter(|c| !INDEX_COLUMNS.contains(&c.to_ascii_lowercase().as_str()))
        .collect();

    let mut store = ProfileStore::new();
    for key in keys {
        let mut values = Vec::with_capacity(table.len());
        for record in table.iter() {
            let value = match record.text(key) {
                None => 0.0,
                Some(cell) => cell.parse::<f64>().map_err(|_| {
                    anyhow!("non-numeric value '{cell}' in column '{key}' row {}", record.row())
                })?,
            };
            values.push(value);
        }
        store.insert(key.clone(), values);
    }
    Ok(store)
}

/// Load every `*.csv` in a directory into one store; later files override
/// earlier keys. Files are visited in name order.
pub fn load_profiles_dir(dir: &Path) -> Result<ProfileStore> {
    let mut paths: Vec<_> = std::fs::read_dir(dir)
        .with_context(|| format!("listing profiles in {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "csv"))
        .collect();
    paths.sort();

    let mut store = ProfileStore::new();
    for path in paths {
        let loaded = load_profiles_csv(&path)?;
        store.profiles.extend(loaded.profiles);
    }
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn shape_repeats_and_truncates() {
        let store = ProfileStore::new().with("solar", vec![0.0, 0.5, 1.0]);
        assert_eq!(store.shape("solar", 7).unwrap(), vec![0.0, 0.5, 1.0, 0.0, 0.5, 1.0, 0.0]);
        assert_eq!(store.shape("solar", 2).unwrap(), vec![0.0, 0.5]);
        assert!(store.shape("wind", 2).is_none());
    }

    #[test]
    fn empty_profiles_are_absent() {
        let store = ProfileStore::new().with("flat", Vec::new());
        assert!(!store.contains("flat"));
        assert!(store.shape("flat", 3).is_none());
    }

    #[test]
    fn csv_skips_index_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profiles.csv");
        fs::write(&path, "snapshot,solar,A_load\n0,0.0,1\n1,0.8,\n").unwrap();

        let store = load_profiles_csv(&path).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.raw("solar").unwrap(), &[0.0, 0.8]);
        assert_eq!(store.raw("A_load").unwrap(), &[1.0, 0.0]);
    }

    #[test]
    fn csv_rejects_text_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profiles.csv");
        fs::write(&path, "wind\n0.3\nhigh\n").unwrap();
        let err = load_profiles_csv(&path).unwrap_err();
        assert!(err.to_string().contains("row 2"));
    }

    #[test]
    fn directory_later_files_override() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.csv"), "wind\n0.1\n").unwrap();
        fs::write(dir.path().join("b.csv"), "wind\n0.9\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let store = load_profiles_dir(dir.path()).unwrap();
        assert_eq!(store.raw("wind").unwrap(), &[0.9]);
    }
}
