//! Owned network builder used by one assembly pass.
//!
//! The builder owns the network under construction together with its
//! diagnostics, so every add/skip decision is recorded in one place.

use mcg_core::{Bus, Diagnostics, Generator, IssueKind, Line, Link, Load, Network, Storage, TimeAxis};
use serde::Serialize;
use tracing::warn;

/// Outcome of adding a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddResult {
    Added,
    /// A component with the same name exists; the earlier one is kept.
    Duplicate,
}

impl AddResult {
    pub fn is_added(&self) -> bool {
        matches!(self, AddResult::Added)
    }
}

/// Counts of accepted and rejected records.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BuildStats {
    pub buses: usize,
    pub generators: usize,
    pub loads: usize,
    pub storage: usize,
    pub links: usize,
    pub lines: usize,
    pub skipped: usize,
    pub duplicates: usize,
}

impl std::fmt::Display for BuildStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} buses, {} generators, {} loads, {} storage, {} links, {} lines | {} skipped, {} duplicates",
            self.buses,
            self.generators,
            self.loads,
            self.storage,
            self.links,
            self.lines,
            self.skipped,
            self.duplicates
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct NetworkBuilder {
    network: Network,
    diagnostics: Diagnostics,
    stats: BuildStats,
}

impl NetworkBuilder {
    pub fn new(time_axis: TimeAxis) -> Self {
        Self {
            network: Network::new(time_axis),
            ..Self::default()
        }
    }

    fn track(&mut self, added: bool, table: &str, name: &str) -> AddResult {
        if added {
            return AddResult::Added;
        }
        warn!(table, name, "duplicate component name, keeping the first");
        self.diagnostics.add_warning_with_entity(
            IssueKind::InvalidRecord,
            &format!("duplicate {table} name, keeping the first"),
            name,
        );
        self.stats.duplicates += 1;
        AddResult::Duplicate
    }

    pub fn add_bus(&mut self, bus: Bus) -> AddResult {
        let name = bus.name.clone();
        let added = self.network.add_bus(bus);
        self.stats.buses += added as usize;
        self.track(added, "bus", &name)
    }

    pub fn add_generator(&mut self, generator: Generator) -> AddResult {
        let name = generator.name.clone();
        let added = self.network.add_generator(generator);
        self.stats.generators += added as usize;
        self.track(added, "generator", &name)
    }

    pub fn add_load(&mut self, load: Load) -> AddResult {
        let name = load.name.clone();
        let added = self.network.add_load(load);
        self.stats.loads += added as usize;
        self.track(added, "load", &name)
    }

    pub fn add_storage(&mut self, storage: Storage) -> AddResult {
        let name = storage.name.clone();
        let added = self.network.add_storage(storage);
        self.stats.storage += added as usize;
        self.track(added, "storage", &name)
    }

    pub fn add_link(&mut self, link: Link) -> AddResult {
        let name = link.name.clone();
        let added = self.network.add_link(link);
        self.stats.links += added as usize;
        self.track(added, "link", &name)
    }

    pub fn add_line(&mut self, line: Line) -> AddResult {
        let name = line.name.clone();
        let added = self.network.add_line(line);
        self.stats.lines += added as usize;
        self.track(added, "line", &name)
    }

    /// Record a rejected component. The component is not added.
    pub fn skip(&mut self, kind: IssueKind, entity: &str, reason: &str) {
        warn!(entity, kind = %kind, "{reason}, component skipped");
        self.diagnostics
            .add_error_with_entity(kind, &format!("{reason}, component skipped"), entity);
        self.stats.skipped += 1;
    }

    /// Record a skipped row that has no usable name.
    pub fn skip_row(&mut self, table: &str, row: usize, reason: &str) {
        warn!(table, row, "{reason}");
        self.diagnostics
            .add_error_at_row(IssueKind::InvalidRecord, &format!("{table}: {reason}"), row);
        self.stats.skipped += 1;
    }

    /// Record a repair that let the component through.
    pub fn note(&mut self, kind: IssueKind, entity: &str, message: &str) {
        warn!(entity, kind = %kind, "{message}");
        self.diagnostics.add_warning_with_entity(kind, message, entity);
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn network_mut(&mut self) -> &mut Network {
        &mut self.network
    }

    pub fn diagnostics_mut(&mut self) -> &mut Diagnostics {
        &mut self.diagnostics
    }

    pub fn stats(&self) -> &BuildStats {
        &self.stats
    }

    pub fn finish(self) -> (Network, Diagnostics, BuildStats) {
        (self.network, self.diagnostics, self.stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcg_core::Carrier;

    #[test]
    fn duplicates_keep_first_and_are_counted() {
        let mut builder = NetworkBuilder::new(TimeAxis::hourly_steps(2));
        assert!(builder.add_bus(Bus::new("A_EL", Some(Carrier::Electricity))).is_added());
        assert_eq!(
            builder.add_bus(Bus::new("A_EL", Some(Carrier::Heat))),
            AddResult::Duplicate
        );

        let (network, diag, stats) = builder.finish();
        assert_eq!(network.bus_carrier("A_EL"), Some(Carrier::Electricity));
        assert_eq!(stats.buses, 1);
        assert_eq!(stats.duplicates, 1);
        assert_eq!(diag.warning_count(), 1);
    }

    #[test]
    fn skips_are_errors() {
        let mut builder = NetworkBuilder::new(TimeAxis::hourly_steps(2));
        builder.skip(IssueKind::UnresolvableReference, "XX_pv", "bus 'XX_EL' not found");
        builder.skip_row("loads", 4, "row without a name");
        builder.note(IssueKind::BoundInconsistency, "store", "efficiency reset to 1");

        let stats = builder.stats().clone();
        let (_, diag, _) = builder.finish();
        assert_eq!(stats.skipped, 2);
        assert_eq!(diag.error_count(), 2);
        assert_eq!(diag.warning_count(), 1);
        assert!(stats.to_string().contains("2 skipped"));
    }
}
