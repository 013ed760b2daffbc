//! Persisted period output: network tables and capacity maps.
//!
//! Network tables use the same column names the builder reads, so an exported
//! directory can be fed back in as input. Time series are written as wide
//! tables (`loads-p_set.csv`, `generators-p_max_pu.csv`) loadable with
//! [`crate::profiles::load_profiles_csv`].

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use mcg_core::{Capacity, CapacityMap, Network};

use crate::record::{Record, RecordTable};
use crate::tables::{BUSES_FILE, GENERATORS_FILE, LINES_FILE, LINKS_FILE, LOADS_FILE, STORAGE_FILE};

pub const LOAD_SERIES_FILE: &str = "loads-p_set.csv";
pub const AVAILABILITY_FILE: &str = "generators-p_max_pu.csv";

fn num(value: f64) -> String {
    value.to_string()
}

fn opt(value: Option<f64>) -> String {
    value.map(num).unwrap_or_default()
}

fn capacity_fields(record: &mut Record, prefix: &str, capacity: &Capacity) {
    record.set(format!("{prefix}_nom"), num(capacity.nominal));
    record.set(format!("{prefix}_nom_extendable"), capacity.extendable.to_string());
    record.set(format!("{prefix}_nom_min"), num(capacity.min));
    record.set(format!("{prefix}_nom_max"), opt(capacity.max));
}

/// Flatten a network into record tables, one per component kind.
pub fn network_tables(network: &Network) -> Vec<RecordTable> {
    let mut buses = RecordTable::new("buses");
    for (idx, bus) in network.buses.values().enumerate() {
        let mut r = Record::new(idx + 1);
        r.set("name", bus.name.as_str());
        r.set("carrier", bus.carrier.map(|c| c.as_str()).unwrap_or_default());
        r.set("v_nom", num(bus.nominal_voltage));
        buses.push(r);
    }

    let mut generators = RecordTable::new("generators");
    for (idx, gen) in network.generators.values().enumerate() {
        let mut r = Record::new(idx + 1);
        r.set("name", gen.name.as_str());
        r.set("bus", gen.bus.as_str());
        r.set("carrier", gen.carrier.map(|c| c.as_str()).unwrap_or_default());
        r.set("technology", gen.technology.as_str());
        capacity_fields(&mut r, "p", &gen.capacity);
        r.set("marginal_cost", num(gen.marginal_cost));
        r.set("capital_cost", num(gen.capital_cost));
        r.set("synthetic", gen.synthetic.to_string());
        generators.push(r);
    }

    let mut loads = RecordTable::new("loads");
    for (idx, load) in network.loads.values().enumerate() {
        let mut r = Record::new(idx + 1);
        r.set("name", load.name.as_str());
        r.set("bus", load.bus.as_str());
        r.set("carrier", load.carrier.map(|c| c.as_str()).unwrap_or_default());
        r.set("annual_total", num(load.total()));
        loads.push(r);
    }

    let mut storage = RecordTable::new("storage");
    for (idx, store) in network.storage.values().enumerate() {
        let mut r = Record::new(idx + 1);
        r.set("name", store.name.as_str());
        r.set("bus", store.bus.as_str());
        capacity_fields(&mut r, "e", &store.capacity);
        r.set("efficiency_store", num(store.efficiency_store));
        r.set("efficiency_dispatch", num(store.efficiency_dispatch));
        r.set("standing_loss", num(store.standing_loss));
        r.set("cyclic", store.cyclic.to_string());
        r.set("initial_soc", num(store.initial_soc));
        r.set("capital_cost", num(store.capital_cost));
        storage.push(r);
    }

    let mut links = RecordTable::new("links");
    for (idx, link) in network.links.values().enumerate() {
        let mut r = Record::new(idx + 1);
        r.set("name", link.name.as_str());
        r.set("kind", link.kind.as_str());
        r.set("bus0", link.input.as_str());
        for slot in 0..3 {
            let port = link.outputs.get(slot);
            let suffix = if slot == 0 { String::new() } else { (slot + 1).to_string() };
            r.set(
                format!("bus{}", slot + 1),
                port.map(|p| p.bus.clone()).unwrap_or_default(),
            );
            r.set(
                format!("efficiency{suffix}"),
                port.map(|p| num(p.efficiency.mean())).unwrap_or_default(),
            );
        }
        capacity_fields(&mut r, "p", &link.capacity);
        r.set("marginal_cost", num(link.marginal_cost));
        r.set("capital_cost", num(link.capital_cost));
        links.push(r);
    }

    let mut lines = RecordTable::new("lines");
    for (idx, line) in network.lines.values().enumerate() {
        let mut r = Record::new(idx + 1);
        r.set("name", line.name.as_str());
        r.set("bus0", line.bus0.as_str());
        r.set("bus1", line.bus1.as_str());
        r.set("r", num(line.resistance));
        r.set("x", num(line.reactance));
        r.set("s_nom", num(line.capacity.nominal));
        r.set("s_nom_extendable", line.capacity.extendable.to_string());
        r.set("s_nom_max", opt(line.capacity.max));
        lines.push(r);
    }

    vec![buses, generators, loads, storage, links, lines]
}

fn series_table<'a>(
    name: &str,
    steps: usize,
    columns: impl Iterator<Item = (&'a str, &'a [f64])>,
) -> RecordTable {
    let columns: Vec<_> = columns.collect();
    let mut table = RecordTable::new(name);
    table.columns.push("snapshot".to_string());
    table
        .columns
        .extend(columns.iter().map(|(key, _)| key.to_string()));
    for step in 0..steps {
        let mut r = Record::new(step + 1);
        r.set("snapshot", step.to_string());
        for (key, values) in &columns {
            r.set(*key, values.get(step).map(|v| num(*v)).unwrap_or_default());
        }
        table.records.push(r);
    }
    table
}

/// Write every network table plus the time-series tables into `dir`.
pub fn write_network_dir(network: &Network, dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    let files = [BUSES_FILE, GENERATORS_FILE, LOADS_FILE, STORAGE_FILE, LINKS_FILE, LINES_FILE];
    for (table, file) in network_tables(network).into_iter().zip(files) {
        table.write_csv(&dir.join(file))?;
    }

    let steps = network.snapshot_count();
    let demand = series_table(
        "loads-p_set",
        steps,
        network
            .loads
            .values()
            .map(|l| (l.name.as_str(), l.demand.as_slice())),
    );
    demand.write_csv(&dir.join(LOAD_SERIES_FILE))?;

    let availability = series_table(
        "generators-p_max_pu",
        steps,
        network
            .generators
            .values()
            .filter(|g| !g.availability.is_empty())
            .map(|g| (g.name.as_str(), g.availability.as_slice())),
    );
    availability.write_csv(&dir.join(AVAILABILITY_FILE))?;
    Ok(())
}

pub fn write_capacity_map(map: &CapacityMap, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(map)?;
    fs::write(path, json).with_context(|| format!("writing capacity map {}", path.display()))
}

pub fn read_capacity_map(path: &Path) -> Result<CapacityMap> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading capacity map {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("parsing capacity map {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiles::{load_profiles_csv, ProfileSource};
    use mcg_core::{Bus, Carrier, ComponentKind, Generator, Link, LinkPort, Load, TimeAxis};

    fn sample() -> Network {
        let mut network = Network::new(TimeAxis::hourly_steps(3));
        network.add_bus(Bus::new("A_EL", Some(Carrier::Electricity)));
        network.add_bus(Bus::new("A_H", Some(Carrier::Heat)));
        network.add_bus(Bus::new("A_LNG", Some(Carrier::Fuel)));
        let mut pv = Generator::new("A_pv", "A_EL").with_capacity(Capacity::extendable(5.0, 1.0, None));
        pv.availability = vec![0.0, 0.5, 1.0];
        network.add_generator(pv);
        network.add_load(Load::new("A_load", "A_EL", vec![1.0, 2.0, 3.0]));
        network.add_link(Link::new(
            "A_chp",
            "A_LNG",
            vec![LinkPort::new("A_EL", 0.4), LinkPort::new("A_H", 0.45)],
        ));
        network
    }

    #[test]
    fn tables_use_builder_columns() {
        let tables = network_tables(&sample());
        let links = &tables[4];
        let chp = &links.records[0];
        assert_eq!(chp.text("bus0"), Some("A_LNG"));
        assert_eq!(chp.text("bus2"), Some("A_H"));
        assert_eq!(chp.number("efficiency2"), Some(0.45));
        assert_eq!(chp.text("bus3"), None);

        let gens = &tables[1];
        assert_eq!(gens.records[0].number("p_nom_max"), None);
        assert_eq!(gens.records[0].flag("p_nom_extendable"), Some(true));
    }

    #[test]
    fn network_dir_contains_series() {
        let dir = tempfile::tempdir().unwrap();
        write_network_dir(&sample(), dir.path()).unwrap();

        for file in [BUSES_FILE, LINKS_FILE, LOAD_SERIES_FILE, AVAILABILITY_FILE] {
            assert!(dir.path().join(file).is_file(), "{file} missing");
        }
        let demand = load_profiles_csv(&dir.path().join(LOAD_SERIES_FILE)).unwrap();
        assert_eq!(demand.shape("A_load", 3).unwrap(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn capacity_map_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("2030").join("capacities.json");
        let mut map = CapacityMap::new();
        map.insert(ComponentKind::Generator, "A_pv", 500.0);
        map.insert(ComponentKind::Link, "A_chp", 12.5);

        write_capacity_map(&map, &path).unwrap();
        assert_eq!(read_capacity_map(&path).unwrap(), map);
    }

    #[test]
    fn unreadable_capacity_map_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capacities.json");
        fs::write(&path, "not json").unwrap();
        let err = read_capacity_map(&path).unwrap_err();
        assert!(err.to_string().contains("capacities.json"));
    }
}
