//! # mcg-core: Multi-Carrier Network Model
//!
//! Provides the data structures shared by every stage of the network assembly
//! pipeline: buses for each energy carrier, the components attached to them, and
//! the conversion links and lines that connect them.
//!
//! ## Design Philosophy
//!
//! A [`Network`] is a set of **ordered tables keyed by component name**:
//! - **Buses**: balancing points for exactly one [`Carrier`]
//! - **Generators / Loads / Storage**: single-bus components
//! - **Links**: one input bus converted into one to three output buses
//! - **Lines**: passive electricity connections between two buses
//!
//! Tables use insertion order for iteration, so two runs over the same input
//! visit components in the same order. Names are the stable identifiers used for
//! lookups, persistence and multi-period carryover.
//!
//! ## Quick Start
//!
//! ```rust
//! use mcg_core::*;
//!
//! let mut network = Network::new(TimeAxis::hourly_steps(4));
//! network.add_bus(Bus::new("A_EL", Some(Carrier::Electricity)));
//! network.add_load(Load::constant("A_EL_load", "A_EL", 4, 10.0));
//! network.add_generator(
//!     Generator::new("A_EL_pv", "A_EL").with_capacity(Capacity::fixed(25.0)),
//! );
//!
//! assert_eq!(network.aggregate_demand("A_EL"), 40.0);
//! assert_eq!(network.generators_at_bus("A_EL").len(), 1);
//! ```
//!
//! ## Modules
//!
//! - [`capacity`] - capacity bounds and per-period capacity maps
//! - [`diagnostics`] - issue collection for recoverable data problems
//! - [`topology`] - supply reachability across lines and conversion links

use chrono::{Duration, NaiveDateTime};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub mod capacity;
pub mod diagnostics;
pub mod topology;

pub use capacity::{Capacity, CapacityMap, ComponentKind};
pub use diagnostics::{DiagnosticIssue, Diagnostics, IssueKind, Severity};
pub use topology::{island_count, supplied_buses, unsupplied_demand_buses, SupplyGraph};

/// Energy form balanced at a bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Carrier {
    Electricity,
    Heat,
    Hydrogen,
    Fuel,
}

impl Carrier {
    pub const ALL: [Carrier; 4] = [
        Carrier::Electricity,
        Carrier::Heat,
        Carrier::Hydrogen,
        Carrier::Fuel,
    ];

    /// Energy token used in canonical bus names (`{REGION}_{TOKEN}`).
    pub fn token(&self) -> &'static str {
        match self {
            Carrier::Electricity => "EL",
            Carrier::Heat => "H",
            Carrier::Hydrogen => "H2",
            Carrier::Fuel => "LNG",
        }
    }

    /// Parse a canonical energy token (case-insensitive, exact).
    pub fn from_token(token: &str) -> Option<Self> {
        Carrier::ALL
            .into_iter()
            .find(|carrier| carrier.token().eq_ignore_ascii_case(token.trim()))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Carrier::Electricity => "electricity",
            Carrier::Heat => "heat",
            Carrier::Hydrogen => "hydrogen",
            Carrier::Fuel => "fuel",
        }
    }
}

impl std::fmt::Display for Carrier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supply technology inferred from a generator's name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Technology {
    Solar,
    Wind,
    Nuclear,
    Chp,
    Hydro,
    Biomass,
    Coal,
    Gas,
    Oil,
    Other,
}

impl Default for Technology {
    fn default() -> Self {
        Technology::Other
    }
}

impl Technology {
    pub fn as_str(&self) -> &'static str {
        match self {
            Technology::Solar => "solar",
            Technology::Wind => "wind",
            Technology::Nuclear => "nuclear",
            Technology::Chp => "chp",
            Technology::Hydro => "hydro",
            Technology::Biomass => "biomass",
            Technology::Coal => "coal",
            Technology::Gas => "gas",
            Technology::Oil => "oil",
            Technology::Other => "other",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "solar" | "pv" => Some(Technology::Solar),
            "wind" => Some(Technology::Wind),
            "nuclear" => Some(Technology::Nuclear),
            "chp" => Some(Technology::Chp),
            "hydro" => Some(Technology::Hydro),
            "biomass" => Some(Technology::Biomass),
            "coal" => Some(Technology::Coal),
            "gas" => Some(Technology::Gas),
            "oil" => Some(Technology::Oil),
            "other" => Some(Technology::Other),
            _ => None,
        }
    }

    /// Availability profile looked up when a generator names none itself.
    pub fn default_profile_key(&self) -> Option<&'static str> {
        match self {
            Technology::Solar => Some("solar"),
            Technology::Wind => Some("wind"),
            _ => None,
        }
    }
}

impl std::fmt::Display for Technology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Simulation time axis. Both ends are inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeAxis {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub step_minutes: i64,
}

impl Default for TimeAxis {
    fn default() -> Self {
        Self {
            start: NaiveDateTime::default(),
            end: NaiveDateTime::default(),
            step_minutes: 60,
        }
    }
}

impl TimeAxis {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime, step_minutes: i64) -> Self {
        Self {
            start,
            end,
            step_minutes,
        }
    }

    /// Hourly axis with `steps` time steps starting at the Unix epoch.
    pub fn hourly_steps(steps: usize) -> Self {
        let start = NaiveDateTime::default();
        let end = start + Duration::hours(steps.saturating_sub(1) as i64);
        Self::new(start, end, 60)
    }

    /// Number of time steps on the axis (0 when the axis is empty or malformed).
    pub fn len(&self) -> usize {
        if self.step_minutes <= 0 || self.end < self.start {
            return 0;
        }
        let span = (self.end - self.start).num_minutes();
        (span / self.step_minutes) as usize + 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Duration of one step in hours.
    pub fn step_hours(&self) -> f64 {
        self.step_minutes as f64 / 60.0
    }
}

/// Balancing point for a single carrier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bus {
    pub name: String,
    /// First underscore-delimited token of the name.
    pub region: String,
    pub carrier: Option<Carrier>,
    /// Nominal voltage or pressure-equivalent scalar.
    pub nominal_voltage: f64,
}

impl Bus {
    pub fn new(name: impl Into<String>, carrier: Option<Carrier>) -> Self {
        let name = name.into();
        Self {
            region: region_of(&name).to_string(),
            name,
            carrier,
            nominal_voltage: 1.0,
        }
    }
}

/// First underscore-delimited token of a name, trimmed.
pub fn region_of(name: &str) -> &str {
    name.trim().split('_').next().unwrap_or_default()
}

/// Injection of one carrier at one bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generator {
    pub name: String,
    pub bus: String,
    pub carrier: Option<Carrier>,
    pub technology: Technology,
    pub capacity: Capacity,
    /// Fraction of nominal capacity available per time step.
    pub availability: Vec<f64>,
    pub marginal_cost: f64,
    pub capital_cost: f64,
    /// Backstop or fuel source injected by the assembly pipeline.
    #[serde(default)]
    pub synthetic: bool,
}

impl Generator {
    pub fn new(name: impl Into<String>, bus: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bus: bus.into(),
            carrier: None,
            technology: Technology::Other,
            capacity: Capacity::default(),
            availability: Vec::new(),
            marginal_cost: 0.0,
            capital_cost: 0.0,
            synthetic: false,
        }
    }

    pub fn with_capacity(mut self, capacity: Capacity) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_marginal_cost(mut self, cost: f64) -> Self {
        self.marginal_cost = cost;
        self
    }

    pub fn with_carrier(mut self, carrier: Option<Carrier>) -> Self {
        self.carrier = carrier;
        self
    }

    /// A generator can be dispatched if it has (or may build) capacity and is
    /// available in at least one time step. An empty profile means always available.
    pub fn is_dispatchable(&self) -> bool {
        let has_capacity = self.capacity.extendable || self.capacity.nominal > 0.0;
        let available =
            self.availability.is_empty() || self.availability.iter().any(|v| *v > 0.0);
        has_capacity && available
    }
}

/// Carrier draw at one bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Load {
    pub name: String,
    pub bus: String,
    pub carrier: Option<Carrier>,
    /// Demanded quantity per time step.
    pub demand: Vec<f64>,
    /// Annual total declared in the raw input, before a series was built.
    pub declared_total: Option<f64>,
}

impl Load {
    pub fn new(name: impl Into<String>, bus: impl Into<String>, demand: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            bus: bus.into(),
            carrier: None,
            demand,
            declared_total: None,
        }
    }

    /// Load with the same value in every one of `steps` time steps.
    pub fn constant(
        name: impl Into<String>,
        bus: impl Into<String>,
        steps: usize,
        value: f64,
    ) -> Self {
        Self::new(name, bus, vec![value; steps])
    }

    pub fn total(&self) -> f64 {
        self.demand.iter().sum()
    }
}

/// Carrier-specific energy storage at one bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Storage {
    pub name: String,
    pub bus: String,
    pub carrier: Option<Carrier>,
    /// Energy capacity.
    pub capacity: Capacity,
    pub efficiency_store: f64,
    pub efficiency_dispatch: f64,
    /// Fraction of stored energy lost per time step.
    pub standing_loss: f64,
    pub cyclic: bool,
    pub initial_soc: f64,
    pub capital_cost: f64,
}

impl Storage {
    pub fn new(name: impl Into<String>, bus: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bus: bus.into(),
            carrier: None,
            capacity: Capacity::default(),
            efficiency_store: 1.0,
            efficiency_dispatch: 1.0,
            standing_loss: 0.0,
            cyclic: true,
            initial_soc: 0.0,
            capital_cost: 0.0,
        }
    }
}

/// Conversion efficiency of a link output port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Efficiency {
    Fixed(f64),
    Profile(Vec<f64>),
}

impl Default for Efficiency {
    fn default() -> Self {
        Efficiency::Fixed(0.0)
    }
}

impl Efficiency {
    pub fn mean(&self) -> f64 {
        match self {
            Efficiency::Fixed(value) => *value,
            Efficiency::Profile(values) if values.is_empty() => 0.0,
            Efficiency::Profile(values) => values.iter().sum::<f64>() / values.len() as f64,
        }
    }

    pub fn is_positive(&self) -> bool {
        match self {
            Efficiency::Fixed(value) => *value > 0.0,
            Efficiency::Profile(values) => values.iter().any(|v| *v > 0.0),
        }
    }

    /// True when every value is a finite number.
    pub fn is_defined(&self) -> bool {
        match self {
            Efficiency::Fixed(value) => value.is_finite(),
            Efficiency::Profile(values) => values.iter().all(|v| v.is_finite()),
        }
    }

    pub fn values(&self) -> Vec<f64> {
        match self {
            Efficiency::Fixed(value) => vec![*value],
            Efficiency::Profile(values) => values.clone(),
        }
    }
}

/// Physical role classification of a conversion link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    Chp,
    Electrolyser,
    HeatPump,
    #[default]
    Generic,
}

impl LinkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkKind::Chp => "chp",
            LinkKind::Electrolyser => "electrolyser",
            LinkKind::HeatPump => "heat_pump",
            LinkKind::Generic => "generic",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkPort {
    pub bus: String,
    pub efficiency: Efficiency,
}

impl LinkPort {
    pub fn new(bus: impl Into<String>, efficiency: f64) -> Self {
        Self {
            bus: bus.into(),
            efficiency: Efficiency::Fixed(efficiency),
        }
    }
}

/// Device converting one input carrier into one to three output carriers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub name: String,
    pub kind: LinkKind,
    pub input: String,
    pub outputs: Vec<LinkPort>,
    /// Throughput capacity measured at the input port.
    pub capacity: Capacity,
    pub marginal_cost: f64,
    pub capital_cost: f64,
}

impl Link {
    pub fn new(name: impl Into<String>, input: impl Into<String>, outputs: Vec<LinkPort>) -> Self {
        Self {
            name: name.into(),
            kind: LinkKind::Generic,
            input: input.into(),
            outputs,
            capacity: Capacity::default(),
            marginal_cost: 0.0,
            capital_cost: 0.0,
        }
    }

    /// Port buses in storage order: input first, then outputs.
    pub fn port_buses(&self) -> Vec<&str> {
        std::iter::once(self.input.as_str())
            .chain(self.outputs.iter().map(|port| port.bus.as_str()))
            .collect()
    }

    pub fn outputs_to(&self, bus: &str) -> bool {
        self.outputs
            .iter()
            .any(|port| port.bus == bus && port.efficiency.is_positive())
    }
}

/// Passive electricity connection between two buses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub name: String,
    pub bus0: String,
    pub bus1: String,
    pub resistance: f64,
    pub reactance: f64,
    /// Thermal capacity limit.
    pub capacity: Capacity,
}

impl Line {
    pub fn new(name: impl Into<String>, bus0: impl Into<String>, bus1: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bus0: bus0.into(),
            bus1: bus1.into(),
            resistance: 0.0,
            reactance: 0.0,
            capacity: Capacity::default(),
        }
    }
}

/// The assembled multi-carrier network handed to a dispatch solver.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Network {
    pub time_axis: TimeAxis,
    pub buses: IndexMap<String, Bus>,
    pub generators: IndexMap<String, Generator>,
    pub loads: IndexMap<String, Load>,
    pub storage: IndexMap<String, Storage>,
    pub links: IndexMap<String, Link>,
    pub lines: IndexMap<String, Line>,
}

// Every add_* keeps the first component registered under a name; a second insert
// with the same name is refused so that names stay stable lookup keys.

impl Network {
    pub fn new(time_axis: TimeAxis) -> Self {
        Self {
            time_axis,
            ..Self::default()
        }
    }

    /// Number of time steps every series must have.
    pub fn snapshot_count(&self) -> usize {
        self.time_axis.len()
    }

    pub fn add_bus(&mut self, bus: Bus) -> bool {
        insert_new(&mut self.buses, bus.name.clone(), bus)
    }

    pub fn add_generator(&mut self, generator: Generator) -> bool {
        insert_new(&mut self.generators, generator.name.clone(), generator)
    }

    pub fn add_load(&mut self, load: Load) -> bool {
        insert_new(&mut self.loads, load.name.clone(), load)
    }

    pub fn add_storage(&mut self, storage: Storage) -> bool {
        insert_new(&mut self.storage, storage.name.clone(), storage)
    }

    pub fn add_link(&mut self, link: Link) -> bool {
        insert_new(&mut self.links, link.name.clone(), link)
    }

    pub fn add_line(&mut self, line: Line) -> bool {
        insert_new(&mut self.lines, line.name.clone(), line)
    }

    pub fn bus(&self, name: &str) -> Option<&Bus> {
        self.buses.get(name)
    }

    pub fn has_bus(&self, name: &str) -> bool {
        self.buses.contains_key(name)
    }

    pub fn bus_carrier(&self, name: &str) -> Option<Carrier> {
        self.buses.get(name).and_then(|bus| bus.carrier)
    }

    /// Find generators at a specific bus
    pub fn generators_at_bus(&self, bus: &str) -> Vec<&Generator> {
        self.generators.values().filter(|g| g.bus == bus).collect()
    }

    /// Find loads at a specific bus
    pub fn loads_at_bus(&self, bus: &str) -> Vec<&Load> {
        self.loads.values().filter(|l| l.bus == bus).collect()
    }

    /// Links delivering a positive share of their throughput into `bus`.
    pub fn inbound_links(&self, bus: &str) -> Vec<&Link> {
        self.links.values().filter(|link| link.outputs_to(bus)).collect()
    }

    /// Aggregate demand at a bus: the sum over all time steps of all attached
    /// loads. Falls back to declared annual totals when no attached load carries
    /// a series.
    pub fn aggregate_demand(&self, bus: &str) -> f64 {
        let loads = self.loads_at_bus(bus);
        if loads.iter().any(|load| !load.demand.is_empty()) {
            loads.iter().map(|load| load.total()).sum()
        } else {
            loads.iter().filter_map(|load| load.declared_total).sum()
        }
    }

    pub fn capacity(&self, kind: ComponentKind, name: &str) -> Option<&Capacity> {
        match kind {
            ComponentKind::Generator => self.generators.get(name).map(|c| &c.capacity),
            ComponentKind::Link => self.links.get(name).map(|c| &c.capacity),
            ComponentKind::Storage => self.storage.get(name).map(|c| &c.capacity),
            ComponentKind::Line => self.lines.get(name).map(|c| &c.capacity),
        }
    }

    pub fn capacity_mut(&mut self, kind: ComponentKind, name: &str) -> Option<&mut Capacity> {
        match kind {
            ComponentKind::Generator => self.generators.get_mut(name).map(|c| &mut c.capacity),
            ComponentKind::Link => self.links.get_mut(name).map(|c| &mut c.capacity),
            ComponentKind::Storage => self.storage.get_mut(name).map(|c| &mut c.capacity),
            ComponentKind::Line => self.lines.get_mut(name).map(|c| &mut c.capacity),
        }
    }

    /// Every capacity-bearing component, in table order.
    pub fn capacities(&self) -> impl Iterator<Item = (ComponentKind, &str, &Capacity)> {
        let gens = self
            .generators
            .values()
            .map(|c| (ComponentKind::Generator, c.name.as_str(), &c.capacity));
        let links = self
            .links
            .values()
            .map(|c| (ComponentKind::Link, c.name.as_str(), &c.capacity));
        let storage = self
            .storage
            .values()
            .map(|c| (ComponentKind::Storage, c.name.as_str(), &c.capacity));
        let lines = self
            .lines
            .values()
            .map(|c| (ComponentKind::Line, c.name.as_str(), &c.capacity));
        gens.chain(links).chain(storage).chain(lines)
    }

    /// Mutable counterpart of [`Network::capacities`].
    pub fn capacities_mut(&mut self) -> impl Iterator<Item = (ComponentKind, &str, &mut Capacity)> {
        let gens = self
            .generators
            .values_mut()
            .map(|c| (ComponentKind::Generator, c.name.as_str(), &mut c.capacity));
        let links = self
            .links
            .values_mut()
            .map(|c| (ComponentKind::Link, c.name.as_str(), &mut c.capacity));
        let storage = self
            .storage
            .values_mut()
            .map(|c| (ComponentKind::Storage, c.name.as_str(), &mut c.capacity));
        let lines = self
            .lines
            .values_mut()
            .map(|c| (ComponentKind::Line, c.name.as_str(), &mut c.capacity));
        gens.chain(links).chain(storage).chain(lines)
    }

    /// Compute basic statistics about the network
    pub fn stats(&self) -> NetworkStats {
        NetworkStats {
            num_buses: self.buses.len(),
            num_generators: self.generators.len(),
            num_synthetic: self.generators.values().filter(|g| g.synthetic).count(),
            num_loads: self.loads.len(),
            num_storage: self.storage.len(),
            num_links: self.links.len(),
            num_lines: self.lines.len(),
            total_demand: self.loads.values().map(Load::total).sum(),
            total_generation_capacity: self
                .generators
                .values()
                .filter(|g| !g.synthetic)
                .map(|g| g.capacity.nominal)
                .sum(),
        }
    }

    /// Validate network data for issues that would make a dispatch problem
    /// ill-posed. Populates the provided `Diagnostics`.
    pub fn validate_into(&self, diag: &mut Diagnostics) {
        if self.buses.is_empty() {
            diag.add_error(IssueKind::Structure, "Network has no buses");
            return;
        }

        let steps = self.snapshot_count();
        let dangling = |diag: &mut Diagnostics, owner: &str, bus: &str| {
            if !self.buses.contains_key(bus) {
                diag.add_error_with_entity(
                    IssueKind::UnresolvableReference,
                    &format!("references non-existent bus '{bus}'"),
                    owner,
                );
            }
        };

        for gen in self.generators.values() {
            dangling(diag, &gen.name, &gen.bus);
            if !gen.availability.is_empty() && gen.availability.len() != steps {
                diag.add_warning_with_entity(
                    IssueKind::InvalidRecord,
                    &format!(
                        "availability has {} steps, expected {steps}",
                        gen.availability.len()
                    ),
                    &gen.name,
                );
            }
        }
        for load in self.loads.values() {
            dangling(diag, &load.name, &load.bus);
            if load.demand.len() != steps {
                diag.add_warning_with_entity(
                    IssueKind::InvalidRecord,
                    &format!("demand has {} steps, expected {steps}", load.demand.len()),
                    &load.name,
                );
            }
        }
        for store in self.storage.values() {
            dangling(diag, &store.name, &store.bus);
        }
        for link in self.links.values() {
            for bus in link.port_buses() {
                dangling(diag, &link.name, bus);
            }
            if link.outputs.is_empty() {
                diag.add_error_with_entity(IssueKind::Structure, "link has no outputs", &link.name);
            }
            if link.outputs.iter().any(|port| !port.efficiency.is_defined()) {
                diag.add_error_with_entity(
                    IssueKind::IllPosedEfficiency,
                    "link has an undefined output efficiency",
                    &link.name,
                );
            }
        }
        for line in self.lines.values() {
            dangling(diag, &line.name, &line.bus0);
            dangling(diag, &line.name, &line.bus1);
            let electric = |bus: &str| self.bus_carrier(bus) == Some(Carrier::Electricity);
            if !electric(&line.bus0) || !electric(&line.bus1) {
                diag.add_warning_with_entity(
                    IssueKind::Structure,
                    "line endpoints are not both electricity buses",
                    &line.name,
                );
            }
        }
        for (kind, name, capacity) in self.capacities() {
            if !capacity.is_ordered() {
                diag.add_warning_with_entity(
                    IssueKind::BoundInconsistency,
                    &format!("{kind} capacity bounds are not ordered: {capacity}"),
                    name,
                );
            }
        }
    }
}

fn insert_new<T>(table: &mut IndexMap<String, T>, name: String, value: T) -> bool {
    if table.contains_key(&name) {
        return false;
    }
    table.insert(name, value);
    true
}

/// Statistics about a network's size and capacity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkStats {
    pub num_buses: usize,
    pub num_generators: usize,
    pub num_synthetic: usize,
    pub num_loads: usize,
    pub num_storage: usize,
    pub num_links: usize,
    pub num_lines: usize,
    pub total_demand: f64,
    /// Nominal capacity of declared (non-synthetic) generators.
    pub total_generation_capacity: f64,
}

impl std::fmt::Display for NetworkStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} buses, {} generators ({} synthetic), {} loads ({:.0} total), {} storage, {} links, {} lines",
            self.num_buses,
            self.num_generators,
            self.num_synthetic,
            self.num_loads,
            self.total_demand,
            self.num_storage,
            self.num_links,
            self.num_lines
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_bus_network() -> Network {
        let mut network = Network::new(TimeAxis::hourly_steps(3));
        network.add_bus(Bus::new("A_EL", Some(Carrier::Electricity)));
        network.add_bus(Bus::new("A_H", Some(Carrier::Heat)));
        network
    }

    #[test]
    fn carrier_tokens_round_trip() {
        for carrier in Carrier::ALL {
            assert_eq!(Carrier::from_token(carrier.token()), Some(carrier));
        }
        assert_eq!(Carrier::from_token("h2"), Some(Carrier::Hydrogen));
        assert_eq!(Carrier::from_token("gas"), None);
    }

    #[test]
    fn time_axis_counts_inclusive_steps() {
        assert_eq!(TimeAxis::hourly_steps(8760).len(), 8760);
        assert_eq!(TimeAxis::hourly_steps(1).len(), 1);

        let mut axis = TimeAxis::hourly_steps(4);
        axis.step_minutes = 0;
        assert!(axis.is_empty());
    }

    #[test]
    fn bus_region_is_first_token() {
        assert_eq!(Bus::new("DE_north_EL", None).region, "DE");
        assert_eq!(region_of("  FR_H "), "FR");
    }

    #[test]
    fn duplicate_names_are_refused() {
        let mut network = two_bus_network();
        assert!(!network.add_bus(Bus::new("A_EL", Some(Carrier::Heat))));
        assert_eq!(network.bus_carrier("A_EL"), Some(Carrier::Electricity));
    }

    #[test]
    fn aggregate_demand_falls_back_to_declared_totals() {
        let mut network = two_bus_network();
        network.add_load(Load::constant("l1", "A_EL", 3, 2.0));
        network.add_load(Load::constant("l2", "A_EL", 3, 1.0));
        assert_eq!(network.aggregate_demand("A_EL"), 9.0);

        let mut declared = Load::new("heat", "A_H", Vec::new());
        declared.declared_total = Some(120.0);
        network.add_load(declared);
        assert_eq!(network.aggregate_demand("A_H"), 120.0);
        assert_eq!(network.aggregate_demand("missing"), 0.0);
    }

    #[test]
    fn inbound_links_ignore_zero_efficiency_ports() {
        let mut network = two_bus_network();
        network.add_link(Link::new(
            "hp",
            "A_EL",
            vec![LinkPort::new("A_H", 3.0)],
        ));
        network.add_link(Link::new("dead", "A_EL", vec![LinkPort::new("A_H", 0.0)]));
        let inbound = network.inbound_links("A_H");
        assert_eq!(inbound.len(), 1);
        assert_eq!(inbound[0].name, "hp");
    }

    #[test]
    fn generator_dispatchability() {
        let idle = Generator::new("g", "A_EL");
        assert!(!idle.is_dispatchable());

        let built = Generator::new("g", "A_EL").with_capacity(Capacity::fixed(5.0));
        assert!(built.is_dispatchable());

        let mut dark = built.clone();
        dark.availability = vec![0.0; 3];
        assert!(!dark.is_dispatchable());

        let expandable = Generator::new("g", "A_EL").with_capacity(Capacity::extendable(0.0, 0.0, None));
        assert!(expandable.is_dispatchable());
    }

    #[test]
    fn stats_exclude_synthetic_capacity() {
        let mut network = two_bus_network();
        network.add_generator(Generator::new("real", "A_EL").with_capacity(Capacity::fixed(50.0)));
        let mut backstop =
            Generator::new("A_EL_backstop", "A_EL").with_capacity(Capacity::fixed(10.0));
        backstop.synthetic = true;
        network.add_generator(backstop);
        network.add_load(Load::constant("l", "A_EL", 3, 1.0));

        let stats = network.stats();
        assert_eq!(stats.num_generators, 2);
        assert_eq!(stats.num_synthetic, 1);
        assert!((stats.total_generation_capacity - 50.0).abs() < 1e-9);
        assert!((stats.total_demand - 3.0).abs() < 1e-9);
        assert!(stats.to_string().contains("1 synthetic"));
    }

    #[test]
    fn validation_reports_dangling_references_and_bad_lines() {
        let mut network = two_bus_network();
        network.add_generator(Generator::new("orphan", "B_EL"));
        network.add_line(Line::new("heat_line", "A_EL", "A_H"));

        let mut diag = Diagnostics::new();
        network.validate_into(&mut diag);
        assert_eq!(diag.issues_of_kind(IssueKind::UnresolvableReference).count(), 1);
        assert_eq!(diag.issues_of_kind(IssueKind::Structure).count(), 1);
    }

    #[test]
    fn validation_flags_undefined_efficiency() {
        let mut network = two_bus_network();
        network.add_link(Link::new(
            "broken",
            "A_EL",
            vec![LinkPort::new("A_H", f64::NAN)],
        ));
        let mut diag = Diagnostics::new();
        network.validate_into(&mut diag);
        assert!(diag.has_errors());
        assert_eq!(diag.issues_of_kind(IssueKind::IllPosedEfficiency).count(), 1);
    }

    #[test]
    fn empty_network_is_an_error() {
        let network = Network::default();
        let mut diag = Diagnostics::new();
        network.validate_into(&mut diag);
        assert!(diag.errors().any(|i| i.message.contains("no buses")));
    }

    #[test]
    fn network_serializes_to_json() {
        let mut network = two_bus_network();
        network.add_load(Load::constant("l", "A_EL", 3, 1.0));
        let json = serde_json::to_string(&network).unwrap();
        let parsed: Network = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, network);
    }
}
