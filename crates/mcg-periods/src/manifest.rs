use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use mcg_core::CapacityMap;
use mcg_io::read_capacity_map;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::period::PeriodRecord;

pub const MANIFEST_FILE: &str = "sequence_manifest.json";
pub const CAPACITIES_FILE: &str = "capacities.json";
pub const FLOORS_FILE: &str = "floors.json";

#[derive(Debug, Serialize, Deserialize)]
pub struct SequenceManifest {
    pub created_at: DateTime<Utc>,
    pub years: Vec<i32>,
    pub optimal: usize,
    pub degraded: usize,
    /// Cumulative floors after the last period.
    pub floors: CapacityMap,
    pub periods: Vec<PeriodRecord>,
}

pub fn write_sequence_manifest(path: &Path, manifest: &SequenceManifest) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating manifest directory '{}'", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(manifest)
        .context("serializing sequence manifest to JSON")?;
    fs::write(path, json)
        .with_context(|| format!("writing sequence manifest '{}'", path.display()))?;
    Ok(())
}

pub fn load_sequence_manifest(path: &Path) -> Result<SequenceManifest> {
    let file = fs::File::open(path)
        .with_context(|| format!("opening sequence manifest '{}'", path.display()))?;
    serde_json::from_reader(file)
        .with_context(|| format!("parsing sequence manifest '{}'", path.display()))
}

/// Floors to resume a sequence after `year` from a persisted run under `root`.
///
/// Reads the cumulative `floors.json` of that year, falling back to the
/// period's own `capacities.json` for runs persisted without floors.
pub fn resume_floors(root: &Path, year: i32) -> Result<CapacityMap> {
    let dir = root.join(year.to_string());
    let floors = dir.join(FLOORS_FILE);
    if floors.is_file() {
        return read_capacity_map(&floors);
    }
    read_capacity_map(&dir.join(CAPACITIES_FILE))
        .with_context(|| format!("no persisted capacities for period {year}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::period::PeriodStatus;
    use mcg_core::{ComponentKind, Diagnostics};
    use mcg_io::write_capacity_map;
    use tempfile::NamedTempFile;

    fn record(year: i32) -> PeriodRecord {
        let mut solved = CapacityMap::new();
        solved.insert(ComponentKind::Generator, "DE_gas", 500.0);
        PeriodRecord {
            year,
            status: PeriodStatus::Optimal,
            objective: Some(12.5),
            solved_capacities: solved,
            floors_applied: 0,
            synthesized: vec!["DE_EL_backstop".into()],
            skipped: 0,
            solver_message: None,
            issues: Diagnostics::new(),
        }
    }

    #[test]
    fn manifest_writes_and_reads_back() {
        let rec = record(2030);
        let manifest = SequenceManifest {
            created_at: Utc::now(),
            years: vec![2030],
            optimal: 1,
            degraded: 0,
            floors: rec.solved_capacities.clone(),
            periods: vec![rec.clone()],
        };
        let tmp = NamedTempFile::new().unwrap();
        write_sequence_manifest(tmp.path(), &manifest).unwrap();
        let parsed = load_sequence_manifest(tmp.path()).unwrap();
        assert_eq!(parsed.years, vec![2030]);
        assert_eq!(parsed.periods, vec![rec]);
    }

    #[test]
    fn resume_prefers_cumulative_floors() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("2030");
        let mut solved = CapacityMap::new();
        solved.insert(ComponentKind::Generator, "DE_gas", 300.0);
        write_capacity_map(&solved, &dir.join(CAPACITIES_FILE)).unwrap();
        assert_eq!(
            resume_floors(tmp.path(), 2030).unwrap().get(ComponentKind::Generator, "DE_gas"),
            Some(300.0)
        );

        let mut floors = solved.clone();
        floors.insert(ComponentKind::Generator, "DE_gas", 500.0);
        write_capacity_map(&floors, &dir.join(FLOORS_FILE)).unwrap();
        assert_eq!(resume_floors(tmp.path(), 2030).unwrap(), floors);

        assert!(resume_floors(tmp.path(), 2040).is_err());
    }
}
