//! Feasibility guarantee.
//!
//! Fuel buses get an unconstrained zero-cost source. Demand buses get an
//! expensive extendable backstop generator, so the dispatch problem always
//! has a solution; the backstop cost keeps it unused whenever real supply can
//! serve the load. Synthesized names are derived from the bus name, which
//! makes a second pass over the same network a no-op.

use mcg_core::{
    Capacity, Carrier, Diagnostics, Generator, IssueKind, Network, SupplyGraph, Technology,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::FeasibilityConfig;

/// What one synthesis pass changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SynthesisReport {
    pub fuel_sources: Vec<String>,
    pub backstops: Vec<String>,
    /// Synthetic names that were already present and left alone.
    pub already_present: Vec<String>,
    /// Demand buses with no path from dispatchable supply before backstops.
    pub at_risk: Vec<String>,
    /// Components whose capacity bounds were repaired.
    pub corrected: Vec<String>,
}

impl SynthesisReport {
    pub fn synthesized(&self) -> impl Iterator<Item = &str> {
        self.fuel_sources
            .iter()
            .chain(&self.backstops)
            .map(String::as_str)
    }

    pub fn synthesized_count(&self) -> usize {
        self.fuel_sources.len() + self.backstops.len()
    }

    pub fn is_noop(&self) -> bool {
        self.synthesized_count() == 0 && self.corrected.is_empty()
    }
}

fn synthetic_generator(
    name: String,
    bus: &str,
    carrier: Option<Carrier>,
    capacity: Capacity,
    marginal_cost: f64,
    steps: usize,
) -> Generator {
    let mut generator = Generator::new(name, bus)
        .with_carrier(carrier)
        .with_capacity(capacity)
        .with_marginal_cost(marginal_cost);
    generator.technology = Technology::Other;
    generator.availability = vec![1.0; steps];
    generator.synthetic = true;
    generator
}

/// Add fuel sources and backstops, then sanitize every capacity bound.
pub fn guarantee_feasibility(
    network: &mut Network,
    config: &FeasibilityConfig,
    diag: &mut Diagnostics,
) -> SynthesisReport {
    let mut report = SynthesisReport::default();
    let steps = network.snapshot_count();

    let buses: Vec<(String, Option<Carrier>)> = network
        .buses
        .values()
        .map(|bus| (bus.name.clone(), bus.carrier))
        .collect();

    for (bus, carrier) in buses.iter().filter(|(_, c)| *c == Some(Carrier::Fuel)) {
        let name = format!("{bus}{}", config.fuel_source_suffix);
        if network.generators.contains_key(&name) {
            report.already_present.push(name);
            continue;
        }
        let capacity = Capacity::extendable(0.0, 0.0, None);
        network.add_generator(synthetic_generator(name.clone(), bus, *carrier, capacity, 0.0, steps));
        debug!(bus = %bus, generator = %name, "added fuel source");
        report.fuel_sources.push(name);
    }

    // Fuel sources count as supply when judging the demand buses.
    let supplied = SupplyGraph::from_network(network).supplied();
    for (bus, carrier) in buses {
        if carrier == Some(Carrier::Fuel) {
            continue;
        }
        if network.aggregate_demand(&bus) <= 0.0 {
            continue;
        }
        if !supplied.contains(&bus) {
            warn!(bus = %bus, "demand bus has no path from dispatchable supply");
            diag.add_warning_with_entity(
                IssueKind::StructuralInfeasibilityRisk,
                "demand bus has no path from dispatchable supply",
                &bus,
            );
            report.at_risk.push(bus.clone());
        }
        if !config.always_guarantee && SupplyGraph::from_network(network).is_supplied(&bus) {
            continue;
        }

        let name = format!("{bus}{}", config.backstop_suffix);
        if network.generators.contains_key(&name) {
            report.already_present.push(name);
            continue;
        }
        let capacity = Capacity::extendable(0.0, 0.0, Some(config.backstop_max_capacity));
        network.add_generator(synthetic_generator(
            name.clone(),
            &bus,
            carrier,
            capacity,
            config.backstop_marginal_cost,
            steps,
        ));
        debug!(bus = %bus, generator = %name, "added backstop");
        report.backstops.push(name);
    }

    report.corrected = sanitize_bounds(network, diag);
    info!(
        fuel_sources = report.fuel_sources.len(),
        backstops = report.backstops.len(),
        at_risk = report.at_risk.len(),
        corrected = report.corrected.len(),
        "feasibility guarantee applied"
    );
    report
}

/// Repair every capacity so that `0 <= min <= max` and the nominal value lies
/// inside the bounds. Returns the repaired component names.
pub fn sanitize_bounds(network: &mut Network, diag: &mut Diagnostics) -> Vec<String> {
    let mut corrected = Vec::new();
    for (kind, name, capacity) in network.capacities_mut() {
        let before = *capacity;
        if capacity.sanitize() {
            warn!(kind = %kind, name, before = %before, after = %capacity, "capacity bounds corrected");
            diag.add_warning_with_entity(
                IssueKind::BoundInconsistency,
                &format!("{kind} bounds {before} corrected to {capacity}"),
                name,
            );
            corrected.push(name.to_string());
        }
    }
    corrected
}
