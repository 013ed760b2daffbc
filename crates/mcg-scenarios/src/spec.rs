//! Per-year target documents.
//!
//! A [`ScenarioSet`] lists, for each year, demand targets keyed by
//! `(region, carrier)`, capacity targets keyed by `(region, technology)` and
//! single-load annual-total overrides. Documents come from YAML/JSON or from a
//! `scenario.csv` record table.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use mcg_assembly::rules::classify_carrier_label;
use mcg_core::{Carrier, Technology};
use mcg_io::RecordTable;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSet {
    pub version: Option<u32>,
    #[serde(default)]
    pub years: Vec<YearTargets>,
}

/// A raw `(region, group) → target` entry. `group` is a carrier label for
/// demand and a technology label for capacity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupTarget {
    pub region: String,
    pub group: String,
    pub target: f64,
}

/// Replace one load's annual total, keeping its shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadOverride {
    pub load: String,
    pub annual_total: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct YearTargets {
    pub year: i32,
    #[serde(default)]
    pub demand: Vec<GroupTarget>,
    #[serde(default)]
    pub capacity: Vec<GroupTarget>,
    #[serde(default)]
    pub loads: Vec<LoadOverride>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DemandTarget {
    pub region: String,
    pub carrier: Carrier,
    pub target: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CapacityTarget {
    pub region: String,
    pub technology: Technology,
    pub target: f64,
}

/// Validated targets for one year.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedYear {
    pub year: i32,
    pub demand: Vec<DemandTarget>,
    pub capacity: Vec<CapacityTarget>,
    pub loads: Vec<LoadOverride>,
}

impl ResolvedYear {
    pub fn is_empty(&self) -> bool {
        self.demand.is_empty() && self.capacity.is_empty() && self.loads.is_empty()
    }
}

pub fn load_spec_from_path(path: &Path) -> Result<ScenarioSet> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading scenario spec '{}'", path.display()))?;
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
            serde_yaml::from_str(&data).context("parsing scenario spec yaml")
        }
        Some(ext) if ext.eq_ignore_ascii_case("json") => {
            serde_json::from_str(&data).context("parsing scenario spec json")
        }
        _ => serde_yaml::from_str(&data)
            .or_else(|_| serde_json::from_str(&data))
            .context("parsing scenario spec"),
    }
}

/// Build a scenario set from rows with columns `year, kind, region, group,
/// target`. `kind` is `demand`, `capacity` or `load`; for `load` rows `group`
/// names the load and `target` is its annual total.
pub fn targets_from_table(table: &RecordTable) -> Result<ScenarioSet> {
    let mut set = ScenarioSet::default();
    for record in table.iter() {
        let row = record.row();
        let year = record
            .number("year")
            .ok_or_else(|| anyhow!("{} row {row}: missing or invalid year", table.name))?;
        let kind = record
            .text("kind")
            .ok_or_else(|| anyhow!("{} row {row}: missing kind", table.name))?;
        let group = record
            .text("group")
            .ok_or_else(|| anyhow!("{} row {row}: missing group", table.name))?
            .to_string();
        let target = record
            .number("target")
            .ok_or_else(|| anyhow!("{} row {row}: missing or invalid target", table.name))?;
        let region = record.text("region").unwrap_or_default().to_string();

        let year = year as i32;
        let entry = match set.years.iter().position(|y| y.year == year) {
            Some(idx) => &mut set.years[idx],
            None => {
                set.years.push(YearTargets {
                    year,
                    ..YearTargets::default()
                });
                let last = set.years.len() - 1;
                &mut set.years[last]
            }
        };
        match kind.to_ascii_lowercase().as_str() {
            "demand" => entry.demand.push(GroupTarget { region, group, target }),
            "capacity" => entry.capacity.push(GroupTarget { region, group, target }),
            "load" => entry.loads.push(LoadOverride {
                load: group,
                annual_total: target,
            }),
            other => bail!("{} row {row}: unknown target kind '{other}'", table.name),
        }
    }
    Ok(set)
}

fn check_target(year: i32, what: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        bail!("year {year}: target {value} for {what} must be finite and non-negative");
    }
    Ok(())
}

/// Validate the whole set: years are unique and every label and target is
/// usable.
pub fn validate(set: &ScenarioSet) -> Result<()> {
    let mut seen = HashSet::new();
    for entry in &set.years {
        if !seen.insert(entry.year) {
            bail!("duplicate year {} in scenario spec", entry.year);
        }
        resolve_entry(entry)?;
    }
    Ok(())
}

fn resolve_entry(entry: &YearTargets) -> Result<ResolvedYear> {
    let year = entry.year;
    let mut resolved = ResolvedYear {
        year,
        ..ResolvedYear::default()
    };
    for target in &entry.demand {
        let what = format!("demand {}/{}", target.region, target.group);
        check_target(year, &what, target.target)?;
        let carrier = classify_carrier_label(&target.group)
            .ok_or_else(|| anyhow!("year {year}: unknown carrier '{}' in {what}", target.group))?;
        resolved.demand.push(DemandTarget {
            region: target.region.trim().to_string(),
            carrier,
            target: target.target,
        });
    }
    for target in &entry.capacity {
        let what = format!("capacity {}/{}", target.region, target.group);
        check_target(year, &what, target.target)?;
        let technology = Technology::parse(&target.group)
            .ok_or_else(|| anyhow!("year {year}: unknown technology '{}' in {what}", target.group))?;
        resolved.capacity.push(CapacityTarget {
            region: target.region.trim().to_string(),
            technology,
            target: target.target,
        });
    }
    for load in &entry.loads {
        check_target(year, &format!("load {}", load.load), load.annual_total)?;
        resolved.loads.push(load.clone());
    }
    Ok(resolved)
}

/// Validated targets for `year`, or `None` when the set has no entry for it.
pub fn resolve_year(set: &ScenarioSet, year: i32) -> Result<Option<ResolvedYear>> {
    validate(set)?;
    set.years
        .iter()
        .find(|entry| entry.year == year)
        .map(resolve_entry)
        .transpose()
}
