//! Per-period input tables and the time-axis descriptor.

use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDateTime;
use mcg_core::TimeAxis;
use tracing::debug;

use crate::record::RecordTable;

pub const BUSES_FILE: &str = "buses.csv";
pub const GENERATORS_FILE: &str = "generators.csv";
pub const LOADS_FILE: &str = "loads.csv";
pub const STORAGE_FILE: &str = "storage.csv";
pub const LINKS_FILE: &str = "links.csv";
pub const LINES_FILE: &str = "lines.csv";
pub const SCENARIO_FILE: &str = "scenario.csv";
pub const SNAPSHOTS_FILE: &str = "snapshots.csv";

const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Everything the tabular input collaborator supplies for one period.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputTables {
    pub buses: RecordTable,
    pub generators: RecordTable,
    pub loads: RecordTable,
    pub storage: RecordTable,
    pub links: RecordTable,
    pub lines: RecordTable,
    /// Optional per-year demand/capacity targets.
    pub scenario: Option<RecordTable>,
    pub time_axis: TimeAxis,
}

impl InputTables {
    pub fn new(time_axis: TimeAxis) -> Self {
        Self {
            buses: RecordTable::new("buses"),
            generators: RecordTable::new("generators"),
            loads: RecordTable::new("loads"),
            storage: RecordTable::new("storage"),
            links: RecordTable::new("links"),
            lines: RecordTable::new("lines"),
            scenario: None,
            time_axis,
        }
    }
}

/// Read one period's input directory.
///
/// `buses.csv` and `snapshots.csv` are mandatory; every other table is
/// treated as empty when its file is absent.
pub fn load_input_dir(dir: &Path) -> Result<InputTables> {
    if !dir.is_dir() {
        bail!("input directory {} does not exist", dir.display());
    }

    let snapshots = RecordTable::read_csv(&dir.join(SNAPSHOTS_FILE))?;
    let time_axis = time_axis_from_table(&snapshots)
        .with_context(|| format!("reading time axis from {}", dir.join(SNAPSHOTS_FILE).display()))?;

    let mut tables = InputTables::new(time_axis);
    tables.buses = RecordTable::read_csv(&dir.join(BUSES_FILE))?;
    tables.generators = read_optional(dir, GENERATORS_FILE)?.unwrap_or(tables.generators);
    tables.loads = read_optional(dir, LOADS_FILE)?.unwrap_or(tables.loads);
    tables.storage = read_optional(dir, STORAGE_FILE)?.unwrap_or(tables.storage);
    tables.links = read_optional(dir, LINKS_FILE)?.unwrap_or(tables.links);
    tables.lines = read_optional(dir, LINES_FILE)?.unwrap_or(tables.lines);
    tables.scenario = read_optional(dir, SCENARIO_FILE)?;

    debug!(
        dir = %dir.display(),
        buses = tables.buses.len(),
        generators = tables.generators.len(),
        loads = tables.loads.len(),
        links = tables.links.len(),
        steps = tables.time_axis.len(),
        "loaded input tables"
    );
    Ok(tables)
}

fn read_optional(dir: &Path, file: &str) -> Result<Option<RecordTable>> {
    let path = dir.join(file);
    if path.is_file() {
        RecordTable::read_csv(&path).map(Some)
    } else {
        Ok(None)
    }
}

pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime> {
    let value = value.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .ok_or_else(|| anyhow!("unrecognised timestamp '{value}'"))
}

/// Upper bound on the number of time steps of one period; every series of
/// the period is allocated at this length.
pub const MAX_TIME_STEPS: usize = 1_000_000;

fn bounded(axis: TimeAxis) -> Result<TimeAxis> {
    let steps = axis.len();
    if steps > MAX_TIME_STEPS {
        bail!(
            "time axis {} .. {} every {} min has {steps} steps, more than {MAX_TIME_STEPS}",
            axis.start,
            axis.end,
            axis.step_minutes
        );
    }
    Ok(axis)
}

/// Build a time axis from a snapshots table.
///
/// Two layouts are accepted: a single descriptor row with `start`, `end` and
/// `step_minutes` (or `step`) columns, or a list of timestamps in a `snapshot`
/// column, spaced evenly.
pub fn time_axis_from_table(table: &RecordTable) -> Result<TimeAxis> {
    if table.has_column("start") {
        let row = table
            .records
            .first()
            .ok_or_else(|| anyhow!("time axis descriptor has no rows"))?;
        let start = parse_timestamp(row.text("start").unwrap_or_default())?;
        let end = parse_timestamp(row.text("end").unwrap_or_default())?;
        let step = row
            .number("step_minutes")
            .or_else(|| row.number("step"))
            .unwrap_or(60.0);
        if !step.is_finite() || step < 1.0 || step.fract() != 0.0 {
            bail!("time axis step must be a whole number of minutes, got {step}");
        }
        if end < start {
            bail!("time axis {start} .. {end} with step {step} is empty");
        }
        return bounded(TimeAxis::new(start, end, step as i64));
    }

    if table.has_column("snapshot") {
        let stamps = table
            .iter()
            .filter_map(|r| r.text("snapshot"))
            .map(parse_timestamp)
            .collect::<Result<Vec<_>>>()?;
        let (first, last) = match (stamps.first(), stamps.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => bail!("snapshot list is empty"),
        };
        let step = match stamps.get(1) {
            Some(second) => (*second - first).num_minutes(),
            None => 60,
        };
        if step <= 0 {
            bail!("snapshots are not increasing");
        }
        return bounded(TimeAxis::new(first, last, step));
    }

    bail!("snapshots table needs either start/end/step_minutes or snapshot columns")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn descriptor_row_axis() {
        let table = RecordTable::from_rows(
            "snapshots",
            vec![vec![
                ("start", "2030-01-01 00:00"),
                ("end", "2030-01-01 23:00"),
                ("step_minutes", "60"),
            ]],
        );
        let axis = time_axis_from_table(&table).unwrap();
        assert_eq!(axis.len(), 24);
    }

    #[test]
    fn snapshot_list_axis() {
        let table = RecordTable::from_rows(
            "snapshots",
            vec![
                vec![("snapshot", "2030-01-01T00:00:00")],
                vec![("snapshot", "2030-01-01T00:30:00")],
                vec![("snapshot", "2030-01-01T01:00:00")],
            ],
        );
        let axis = time_axis_from_table(&table).unwrap();
        assert_eq!(axis.step_minutes, 30);
        assert_eq!(axis.len(), 3);
    }

    #[test]
    fn fractional_or_tiny_steps_are_rejected() {
        for step in ["0.5", "1.5", "0", "-15"] {
            let table = RecordTable::from_rows(
                "snapshots",
                vec![vec![
                    ("start", "2030-01-01 00:00"),
                    ("end", "2030-01-01 23:00"),
                    ("step_minutes", step),
                ]],
            );
            assert!(time_axis_from_table(&table).is_err(), "step {step} accepted");
        }
    }

    #[test]
    fn oversized_axis_is_rejected() {
        let table = RecordTable::from_rows(
            "snapshots",
            vec![vec![
                ("start", "2030-01-01 00:00"),
                ("end", "2040-01-01 00:00"),
                ("step_minutes", "1"),
            ]],
        );
        let err = time_axis_from_table(&table).unwrap_err();
        assert!(err.to_string().contains("steps"));

        let year_hourly = RecordTable::from_rows(
            "snapshots",
            vec![vec![
                ("start", "2030-01-01 00:00"),
                ("end", "2030-12-31 23:00"),
                ("step_minutes", "60"),
            ]],
        );
        assert_eq!(time_axis_from_table(&year_hourly).unwrap().len(), 8760);
    }

    #[test]
    fn reversed_axis_is_rejected() {
        let table = RecordTable::from_rows(
            "snapshots",
            vec![vec![("start", "2030-01-02 00:00"), ("end", "2030-01-01 00:00")]],
        );
        assert!(time_axis_from_table(&table).is_err());
    }

    #[test]
    fn load_input_dir_with_optional_tables_missing() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(SNAPSHOTS_FILE),
            "start,end,step_minutes\n2030-01-01 00:00,2030-01-01 03:00,60\n",
        )
        .unwrap();
        fs::write(dir.path().join(BUSES_FILE), "name,carrier\nA_EL,AC\n").unwrap();
        fs::write(dir.path().join(LOADS_FILE), "name,bus,p_set\nA_load,A_EL,5\n").unwrap();

        let tables = load_input_dir(dir.path()).unwrap();
        assert_eq!(tables.time_axis.len(), 4);
        assert_eq!(tables.buses.len(), 1);
        assert_eq!(tables.loads.len(), 1);
        assert!(tables.generators.is_empty());
        assert_eq!(tables.generators.name, "generators");
        assert!(tables.scenario.is_none());
    }

    #[test]
    fn missing_buses_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(SNAPSHOTS_FILE),
            "start,end\n2030-01-01 00:00,2030-01-01 03:00\n",
        )
        .unwrap();
        let err = load_input_dir(dir.path()).unwrap_err();
        assert!(format!("{err:#}").contains("buses.csv"));
    }
}
