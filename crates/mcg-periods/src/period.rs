use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use mcg_core::{CapacityMap, Diagnostics};
use mcg_io::{load_input_dir, InputTables};
use mcg_scenarios::{load_spec_from_path, resolve_year, targets_from_table, ResolvedYear};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// File holding a period's scenario targets next to its input tables.
pub const SCENARIO_SPEC_FILE: &str = "scenario.yaml";

/// Stages a period walks through. After `Carry` the sequencer either builds the
/// next year or finishes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PeriodStage {
    Build,
    Solve,
    Extract,
    Carry,
    Done,
}

impl PeriodStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodStage::Build => "build",
            PeriodStage::Solve => "solve",
            PeriodStage::Extract => "extract",
            PeriodStage::Carry => "carry",
            PeriodStage::Done => "done",
        }
    }

    /// Next stage. A failed solve still moves on to `Extract`.
    pub fn advance(self, more_periods: bool) -> PeriodStage {
        match self {
            PeriodStage::Build => PeriodStage::Solve,
            PeriodStage::Solve => PeriodStage::Extract,
            PeriodStage::Extract => PeriodStage::Carry,
            PeriodStage::Carry if more_periods => PeriodStage::Build,
            PeriodStage::Carry | PeriodStage::Done => PeriodStage::Done,
        }
    }
}

impl std::fmt::Display for PeriodStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw input of one simulated year.
#[derive(Debug, Clone)]
pub struct PeriodInput {
    pub year: i32,
    pub tables: InputTables,
    pub targets: Option<ResolvedYear>,
}

impl PeriodInput {
    pub fn new(year: i32, tables: InputTables) -> Self {
        Self {
            year,
            tables,
            targets: None,
        }
    }

    pub fn with_targets(mut self, targets: ResolvedYear) -> Self {
        self.targets = Some(targets);
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PeriodStatus {
    Optimal,
    /// The solver failed or could not run; the period's capacities are the
    /// pre-solve ones.
    Degraded,
}

/// Outcome of one period, as written to the sequence manifest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PeriodRecord {
    pub year: i32,
    pub status: PeriodStatus,
    pub objective: Option<f64>,
    /// Capacity of every extendable declared component after this period.
    pub solved_capacities: CapacityMap,
    /// Components whose lower bound was raised by carried floors.
    pub floors_applied: usize,
    /// Names of the fuel sources and backstops added for this period.
    pub synthesized: Vec<String>,
    /// Input records that could not be placed in the network.
    pub skipped: usize,
    pub solver_message: Option<String>,
    pub issues: Diagnostics,
}

impl PeriodRecord {
    pub fn is_degraded(&self) -> bool {
        self.status == PeriodStatus::Degraded
    }
}

/// Read one period's input directory and its targets for `year`.
///
/// Targets come from `scenario.yaml` when present, otherwise from a
/// `scenario.csv` table among the inputs.
pub fn load_period_dir(dir: &Path, year: i32) -> Result<PeriodInput> {
    let tables = load_input_dir(dir)?;

    let spec_path = dir.join(SCENARIO_SPEC_FILE);
    let set = if spec_path.is_file() {
        Some(load_spec_from_path(&spec_path)?)
    } else {
        tables
            .scenario
            .as_ref()
            .map(targets_from_table)
            .transpose()
            .with_context(|| format!("reading scenario table in {}", dir.display()))?
    };
    let targets = match set {
        Some(set) => resolve_year(&set, year)?,
        None => None,
    };
    debug!(dir = %dir.display(), year, targets = targets.is_some(), "loaded period input");

    Ok(PeriodInput {
        year,
        tables,
        targets,
    })
}

/// Read every year-named subdirectory of `root`, in ascending year order.
pub fn load_sequence_dir(root: &Path) -> Result<Vec<PeriodInput>> {
    let entries =
        fs::read_dir(root).with_context(|| format!("listing period directories in '{}'", root.display()))?;

    let mut years = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("reading entry in '{}'", root.display()))?;
        if !entry.path().is_dir() {
            continue;
        }
        if let Some(year) = entry.file_name().to_str().and_then(|name| name.parse::<i32>().ok()) {
            years.push((year, entry.path()));
        }
    }
    years.sort_by_key(|(year, _)| *year);

    years
        .into_iter()
        .map(|(year, path)| {
            load_period_dir(&path, year).with_context(|| format!("loading period {year}"))
        })
        .collect()
}
