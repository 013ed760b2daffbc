//! Record tables → network components.
//!
//! Runs canonicalization, rewrites bus references, then adds buses,
//! generators, loads, storage, links and lines in that order. A record whose
//! bus reference cannot be resolved is skipped with a diagnostic; every other
//! defect is repaired in place.

use mcg_core::{
    Bus, Capacity, Carrier, Efficiency, Generator, IssueKind, Line, Link, Load, Network, Storage,
};
use mcg_io::{InputTables, ProfileSource, Record};
use tracing::{debug, info};

use crate::builder::{BuildStats, NetworkBuilder};
use crate::canonical::{canonicalize, CanonicalMap};
use crate::config::AssemblyConfig;
use crate::ports::{assign_roles, default_marginal_cost, finalize_outputs, PortCandidate};
use crate::resolve::{NodeSet, Resolution, Resolver};
use crate::rules::{classify_carrier_label, classify_demand, classify_technology};
use mcg_core::Diagnostics;

/// Network with every declared component, before synthesis.
#[derive(Debug, Clone)]
pub struct Populated {
    pub network: Network,
    pub canonical: CanonicalMap,
    pub diagnostics: Diagnostics,
    pub stats: BuildStats,
}

/// Read `{prefix}_nom`, `{prefix}_nom_min`, `{prefix}_nom_max` and
/// `{prefix}_nom_extendable`. Bounds are left as declared; sanitation happens
/// after synthesis.
pub fn capacity_from(record: &Record, prefix: &str) -> Capacity {
    Capacity {
        nominal: record.number(&format!("{prefix}_nom")).unwrap_or(0.0),
        min: record.number(&format!("{prefix}_nom_min")).unwrap_or(0.0),
        max: record.number(&format!("{prefix}_nom_max")),
        extendable: record
            .flag(&format!("{prefix}_nom_extendable"))
            .unwrap_or(false),
    }
}

fn log_fallback(entity: &str, reference: &str, resolution: &Resolution) {
    if let Resolution::Fallback { name, strategy } = resolution {
        debug!(entity, reference, resolved = %name, strategy, "bus reference resolved by fallback");
    }
}

/// Resolve the bus of a single-bus component, skipping it when unresolved.
fn component_bus(
    builder: &mut NetworkBuilder,
    resolver: &Resolver,
    record: &Record,
    name: &str,
    prefer: Option<Carrier>,
) -> Option<String> {
    let reference = record.text("bus").unwrap_or_default();
    let resolution = match prefer {
        Some(carrier) => resolver.resolve_for_carrier(reference, carrier),
        None => resolver.resolve(reference, true),
    };
    match resolution.resolved() {
        Some(bus) => {
            log_fallback(name, reference, &resolution);
            Some(bus.to_string())
        }
        None => {
            builder.skip(
                IssueKind::UnresolvableReference,
                name,
                &format!("bus '{reference}' not found"),
            );
            None
        }
    }
}

fn add_buses(builder: &mut NetworkBuilder, tables: &InputTables, canonical: &CanonicalMap, config: &AssemblyConfig) {
    for (name, carrier) in canonical.carriers() {
        let record = canonical
            .source_row(name)
            .and_then(|row| tables.buses.records.get(row));
        let mut bus = Bus::new(name, carrier);
        bus.nominal_voltage = record
            .and_then(|r| r.number("v_nom"))
            .filter(|v| *v > 0.0)
            .unwrap_or(config.defaults.nominal_voltage);
        if carrier.is_none() {
            builder.note(IssueKind::InvalidRecord, name, "bus has no recognised carrier");
        }
        builder.add_bus(bus);
    }
}

fn availability(
    builder: &mut NetworkBuilder,
    record: &Record,
    generator: &Generator,
    profiles: &dyn ProfileSource,
    steps: usize,
) -> Vec<f64> {
    let declared = record.text("profile");
    let key = declared.or_else(|| generator.technology.default_profile_key());
    let series = key.and_then(|key| profiles.shape(key, steps));
    let mut series = match (series, declared) {
        (Some(series), _) => series,
        (None, Some(key)) => {
            builder.note(
                IssueKind::InvalidRecord,
                &generator.name,
                &format!("availability profile '{key}' not found, using 1.0"),
            );
            vec![1.0; steps]
        }
        (None, None) => vec![1.0; steps],
    };
    if series.iter().any(|v| !(0.0..=1.0).contains(v)) {
        builder.note(
            IssueKind::BoundInconsistency,
            &generator.name,
            "availability clamped to [0, 1]",
        );
        for v in series.iter_mut() {
            *v = if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) };
        }
    }
    series
}

fn add_generator(
    builder: &mut NetworkBuilder,
    resolver: &Resolver,
    record: &Record,
    profiles: &dyn ProfileSource,
    steps: usize,
) {
    let Some(name) = record.text("name") else {
        builder.skip_row("generators", record.row(), "row without a name");
        return;
    };
    let Some(bus) = component_bus(builder, resolver, record, name, None) else {
        return;
    };

    let mut generator = Generator::new(name, bus.as_str());
    generator.carrier = record
        .text("carrier")
        .and_then(classify_carrier_label)
        .or_else(|| resolver.carrier(&bus));
    generator.technology = classify_technology(name);
    generator.capacity = capacity_from(record, "p");
    generator.marginal_cost = record.number("marginal_cost").unwrap_or(0.0);
    generator.capital_cost = record.number("capital_cost").unwrap_or(0.0);
    generator.availability = availability(builder, record, &generator, profiles, steps);
    builder.add_generator(generator);
}

/// Demand series for a load, in order of preference: profile keyed by the
/// load name, `shape` scaled to `annual_total`, flat `annual_total`, flat
/// `p_set`, zeros.
pub fn demand_series(
    builder: &mut NetworkBuilder,
    record: &Record,
    name: &str,
    profiles: &dyn ProfileSource,
    steps: usize,
) -> Vec<f64> {
    if steps == 0 {
        return Vec::new();
    }
    if let Some(series) = profiles.shape(name, steps) {
        return series;
    }

    let annual_total = record.number("annual_total");
    if let Some(key) = record.text("shape") {
        match (profiles.shape(key, steps), annual_total) {
            (Some(shape), Some(total)) => {
                let sum: f64 = shape.iter().sum();
                if sum > 0.0 {
                    return shape.iter().map(|v| v / sum * total).collect();
                }
                builder.note(IssueKind::InvalidRecord, name, &format!("shape '{key}' sums to zero"));
            }
            (None, _) => {
                builder.note(IssueKind::InvalidRecord, name, &format!("shape '{key}' not found"));
            }
            (Some(_), None) => {}
        }
    }
    if let Some(total) = annual_total {
        return vec![total / steps as f64; steps];
    }
    if let Some(p_set) = record.number("p_set") {
        return vec![p_set; steps];
    }
    builder.note(IssueKind::InvalidRecord, name, "load has no demand data, using zero");
    vec![0.0; steps]
}

fn add_load(
    builder: &mut NetworkBuilder,
    resolver: &Resolver,
    record: &Record,
    profiles: &dyn ProfileSource,
    steps: usize,
) {
    let Some(name) = record.text("name") else {
        builder.skip_row("loads", record.row(), "row without a name");
        return;
    };
    let hint = classify_demand(name);
    let Some(bus) = component_bus(builder, resolver, record, name, hint) else {
        return;
    };
    let carrier = resolver.carrier(&bus);
    if let (Some(hint), Some(actual)) = (hint, carrier) {
        if hint != actual {
            builder.note(
                IssueKind::InvalidRecord,
                name,
                &format!("load name suggests {hint} but bus '{bus}' carries {actual}"),
            );
        }
    }

    let demand = demand_series(builder, record, name, profiles, steps);
    let mut load = Load::new(name, bus.as_str(), demand);
    load.carrier = carrier;
    load.declared_total = record.number("annual_total");
    builder.add_load(load);
}

fn unit_efficiency(builder: &mut NetworkBuilder, record: &Record, column: &str, name: &str) -> f64 {
    match record.number(column) {
        None => 1.0,
        Some(value) if value > 0.0 && value <= 1.0 => value,
        Some(value) => {
            builder.note(
                IssueKind::BoundInconsistency,
                name,
                &format!("{column} {value} outside (0, 1], reset to 1"),
            );
            1.0
        }
    }
}

fn add_storage(builder: &mut NetworkBuilder, resolver: &Resolver, record: &Record) {
    let Some(name) = record.text("name") else {
        builder.skip_row("storage", record.row(), "row without a name");
        return;
    };
    let Some(bus) = component_bus(builder, resolver, record, name, None) else {
        return;
    };

    let mut storage = Storage::new(name, bus.as_str());
    storage.carrier = resolver.carrier(&bus);
    storage.capacity = capacity_from(record, "e");
    storage.efficiency_store = unit_efficiency(builder, record, "efficiency_store", name);
    storage.efficiency_dispatch = unit_efficiency(builder, record, "efficiency_dispatch", name);
    storage.standing_loss = record
        .number("standing_loss")
        .unwrap_or(0.0)
        .clamp(0.0, 1.0);
    storage.cyclic = record.flag("cyclic").unwrap_or(true);
    storage.initial_soc = record.number("initial_soc").unwrap_or(0.0).max(0.0);
    storage.capital_cost = record.number("capital_cost").unwrap_or(0.0);
    builder.add_storage(storage);
}

fn efficiency_cell(record: &Record, column: &str, profiles: &dyn ProfileSource, steps: usize) -> Option<Efficiency> {
    if let Some(value) = record.number(column) {
        return Some(Efficiency::Fixed(value));
    }
    let key = record.text(column)?;
    profiles.shape(key, steps).map(Efficiency::Profile)
}

const LINK_SLOTS: [(&str, Option<&str>); 4] = [
    ("bus0", None),
    ("bus1", Some("efficiency")),
    ("bus2", Some("efficiency2")),
    ("bus3", Some("efficiency3")),
];

fn add_link(
    builder: &mut NetworkBuilder,
    resolver: &Resolver,
    record: &Record,
    profiles: &dyn ProfileSource,
    config: &AssemblyConfig,
    steps: usize,
) {
    let Some(name) = record.text("name") else {
        builder.skip_row("links", record.row(), "row without a name");
        return;
    };

    let mut ports = Vec::with_capacity(LINK_SLOTS.len());
    for (slot, (column, efficiency_column)) in LINK_SLOTS.iter().enumerate() {
        let Some(reference) = record.text(column) else {
            if slot < 2 {
                builder.skip(IssueKind::InvalidRecord, name, &format!("missing {column}"));
                return;
            }
            continue;
        };
        let resolution = resolver.resolve(reference, false);
        let Some(bus) = resolution.resolved() else {
            if slot < 2 {
                builder.skip(
                    IssueKind::UnresolvableReference,
                    name,
                    &format!("{column} '{reference}' not found"),
                );
                return;
            }
            builder.note(
                IssueKind::UnresolvableReference,
                name,
                &format!("{column} '{reference}' not found, port dropped"),
            );
            continue;
        };
        log_fallback(name, reference, &resolution);
        let efficiency = efficiency_column.and_then(|c| efficiency_cell(record, c, profiles, steps));
        ports.push(PortCandidate::new(bus, resolver.carrier(bus), efficiency));
    }

    let assignment = assign_roles(name, ports);
    let outputs = finalize_outputs(
        name,
        &assignment,
        config.defaults.max_efficiency,
        builder.diagnostics_mut(),
    );

    let mut link = Link::new(name, assignment.input.bus.as_str(), outputs);
    link.kind = assignment.kind;
    link.capacity = capacity_from(record, "p");
    link.marginal_cost = record
        .number("marginal_cost")
        .unwrap_or_else(|| default_marginal_cost(link.kind, &config.costs));
    link.capital_cost = record.number("capital_cost").unwrap_or(0.0);
    builder.add_link(link);
}

fn add_line(builder: &mut NetworkBuilder, resolver: &Resolver, record: &Record) {
    let Some(name) = record.text("name") else {
        builder.skip_row("lines", record.row(), "row without a name");
        return;
    };
    let mut ends = Vec::with_capacity(2);
    for column in ["bus0", "bus1"] {
        let reference = record.text(column).unwrap_or_default();
        let resolution = resolver.resolve(reference, true);
        match resolution.resolved() {
            Some(bus) => {
                log_fallback(name, reference, &resolution);
                ends.push(bus.to_string());
            }
            None => {
                builder.skip(
                    IssueKind::UnresolvableReference,
                    name,
                    &format!("{column} '{reference}' not found"),
                );
                return;
            }
        }
    }
    let electric = ends
        .iter()
        .all(|bus| resolver.carrier(bus) == Some(Carrier::Electricity));
    if !electric {
        builder.skip(IssueKind::Structure, name, "line endpoints are not both electricity buses");
        return;
    }

    let mut line = Line::new(name, ends[0].as_str(), ends[1].as_str());
    line.resistance = record.number("r").unwrap_or(0.0);
    line.reactance = record.number("x").unwrap_or(0.0);
    line.capacity = capacity_from(record, "s");
    builder.add_line(line);
}

/// Build every declared component from the input tables.
pub fn populate(tables: &InputTables, profiles: &dyn ProfileSource, config: &AssemblyConfig) -> Populated {
    let mut diag = Diagnostics::new();
    let canonical = canonicalize(&tables.buses, &mut diag);

    let mut builder = NetworkBuilder::new(tables.time_axis.clone());
    builder.diagnostics_mut().merge(diag);
    add_buses(&mut builder, tables, &canonical, config);

    let mut tables = tables.clone();
    canonical.apply_to_tables(&mut tables);
    let resolver = Resolver::new(NodeSet::from_canonical(&canonical));
    let steps = tables.time_axis.len();

    for record in tables.generators.iter() {
        add_generator(&mut builder, &resolver, record, profiles, steps);
    }
    for record in tables.loads.iter() {
        add_load(&mut builder, &resolver, record, profiles, steps);
    }
    for record in tables.storage.iter() {
        add_storage(&mut builder, &resolver, record);
    }
    for record in tables.links.iter() {
        add_link(&mut builder, &resolver, record, profiles, config, steps);
    }
    for record in tables.lines.iter() {
        add_line(&mut builder, &resolver, record);
    }

    let (network, diagnostics, stats) = builder.finish();
    info!(%stats, issues = %diagnostics.summary(), "populated network");
    Populated {
        network,
        canonical,
        diagnostics,
        stats,
    }
}
