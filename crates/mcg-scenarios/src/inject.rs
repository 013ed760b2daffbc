use mcg_assembly::rules::classify_demand;
use mcg_core::{region_of, Carrier, Diagnostics, IssueKind, Load, Network, Technology};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::spec::{CapacityTarget, DemandTarget, LoadOverride, ResolvedYear};

/// Scale factors this close to one leave the group untouched.
const UNIT_SCALE_TOLERANCE: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKind {
    Demand,
    Capacity,
}

/// Outcome of rescaling one group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupChange {
    pub kind: GroupKind,
    pub region: String,
    pub group: String,
    pub members: Vec<String>,
    pub before: f64,
    pub after: f64,
    /// `None` when the group was left unchanged.
    pub scale: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InjectionReport {
    pub year: i32,
    pub groups: Vec<GroupChange>,
    /// Loads whose annual total was replaced.
    pub overrides: Vec<String>,
}

impl InjectionReport {
    pub fn rescaled(&self) -> impl Iterator<Item = &GroupChange> {
        self.groups.iter().filter(|g| g.scale.is_some())
    }
}

/// Carrier used to group a load: the name convention first, the bus carrier
/// second.
pub fn demand_group(load: &Load) -> Option<(&str, Carrier)> {
    let carrier = classify_demand(&load.name).or(load.carrier)?;
    Some((region_of(&load.name), carrier))
}

fn load_quantity(load: &Load) -> f64 {
    if load.demand.is_empty() {
        load.declared_total.unwrap_or(0.0)
    } else {
        load.total()
    }
}

fn scale_load(load: &mut Load, scale: f64) {
    for value in load.demand.iter_mut() {
        *value *= scale;
    }
    if let Some(total) = load.declared_total.as_mut() {
        *total *= scale;
    }
}

/// Decide the scale for a group, or `None` for a no-op.
fn group_scale(sum: f64, target: f64, label: &str, diag: &mut Diagnostics) -> Option<f64> {
    if sum <= 0.0 {
        if target > 0.0 {
            warn!(group = label, target, "group total is zero, cannot rescale");
            diag.add_warning_with_entity(
                IssueKind::Scenario,
                &format!("group total is {sum}, cannot rescale to {target}"),
                label,
            );
        }
        return None;
    }
    let scale = target / sum;
    ((scale - 1.0).abs() > UNIT_SCALE_TOLERANCE).then_some(scale)
}

fn empty_group(label: &str, diag: &mut Diagnostics) {
    warn!(group = label, "no components match scenario group");
    diag.add_warning_with_entity(IssueKind::Scenario, "no components match scenario group", label);
}

/// Rescale every load of `(region, carrier)` so the group total equals the
/// target. Synthetic components are never loads, so all loads take part.
pub fn rescale_demand(network: &mut Network, target: &DemandTarget, diag: &mut Diagnostics) -> GroupChange {
    let label = format!("{}/{}", target.region, target.carrier);
    let members: Vec<String> = network
        .loads
        .values()
        .filter(|load| demand_group(load) == Some((target.region.as_str(), target.carrier)))
        .map(|load| load.name.clone())
        .collect();
    let before: f64 = members.iter().map(|name| load_quantity(&network.loads[name])).sum();
    let scale = if members.is_empty() {
        empty_group(&label, diag);
        None
    } else {
        group_scale(before, target.target, &label, diag)
    };
    if let Some(scale) = scale {
        for name in &members {
            if let Some(load) = network.loads.get_mut(name) {
                scale_load(load, scale);
            }
        }
        debug!(group = %label, before, target = target.target, scale, "demand group rescaled");
    }
    let after = members.iter().map(|name| load_quantity(&network.loads[name])).sum();

    GroupChange {
        kind: GroupKind::Demand,
        region: target.region.clone(),
        group: target.carrier.as_str().to_string(),
        members,
        before,
        after,
        scale,
    }
}

/// Rescale the nominal capacity of every non-synthetic generator of
/// `(region, technology)`.
pub fn rescale_capacity(network: &mut Network, target: &CapacityTarget, diag: &mut Diagnostics) -> GroupChange {
    let label = format!("{}/{}", target.region, target.technology);
    let in_group = |region: &str, technology: Technology| {
        region == target.region && technology == target.technology
    };
    let members: Vec<String> = network
        .generators
        .values()
        .filter(|g| !g.synthetic && in_group(region_of(&g.name), g.technology))
        .map(|g| g.name.clone())
        .collect();
    let nominal = |network: &Network| -> f64 {
        members
            .iter()
            .map(|name| network.generators[name].capacity.nominal)
            .sum()
    };
    let before = nominal(network);
    let scale = if members.is_empty() {
        empty_group(&label, diag);
        None
    } else {
        group_scale(before, target.target, &label, diag)
    };
    if let Some(scale) = scale {
        for name in &members {
            if let Some(generator) = network.generators.get_mut(name) {
                let capacity = &mut generator.capacity;
                capacity.nominal *= scale;
                capacity.min *= scale;
                if let Some(max) = capacity.max.as_mut() {
                    *max = max.max(capacity.nominal);
                }
            }
        }
        debug!(group = %label, before, target = target.target, scale, "capacity group rescaled");
    }
    let after = nominal(network);

    GroupChange {
        kind: GroupKind::Capacity,
        region: target.region.clone(),
        group: target.technology.as_str().to_string(),
        members,
        before,
        after,
        scale,
    }
}

/// Replace a load's annual total, keeping its shape. A load with no demand
/// so far gets a constant series.
pub fn apply_load_override(network: &mut Network, over: &LoadOverride, diag: &mut Diagnostics) -> bool {
    let steps = network.snapshot_count();
    let Some(load) = network.loads.get_mut(&over.load) else {
        warn!(load = %over.load, "override names an unknown load");
        diag.add_warning_with_entity(IssueKind::Scenario, "override names an unknown load", &over.load);
        return false;
    };

    let current = load.total();
    if current > 0.0 {
        let scale = over.annual_total / current;
        for value in load.demand.iter_mut() {
            *value *= scale;
        }
    } else if steps > 0 {
        load.demand = vec![over.annual_total / steps as f64; steps];
    }
    load.declared_total = Some(over.annual_total);
    true
}

/// Apply one year's targets: demand groups, capacity groups, then overrides.
pub fn apply_year(network: &mut Network, targets: &ResolvedYear, diag: &mut Diagnostics) -> InjectionReport {
    let mut report = InjectionReport {
        year: targets.year,
        ..InjectionReport::default()
    };
    for target in &targets.demand {
        report.groups.push(rescale_demand(network, target, diag));
    }
    for target in &targets.capacity {
        report.groups.push(rescale_capacity(network, target, diag));
    }
    for over in &targets.loads {
        if apply_load_override(network, over, diag) {
            report.overrides.push(over.load.clone());
        }
    }
    info!(
        year = targets.year,
        groups = report.groups.len(),
        rescaled = report.rescaled().count(),
        overrides = report.overrides.len(),
        "scenario targets applied"
    );
    report
}
