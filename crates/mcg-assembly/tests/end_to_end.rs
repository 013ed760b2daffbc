use mcg_assembly::canonical::canonicalize;
use mcg_assembly::{assemble, guarantee_feasibility, AssemblyConfig, FeasibilityConfig};
use mcg_core::{Carrier, Diagnostics, IssueKind, Network, SupplyGraph, TimeAxis};
use mcg_io::{InputTables, ProfileStore, RecordTable};

fn two_bus_inputs() -> InputTables {
    let mut tables = InputTables::new(TimeAxis::hourly_steps(8));
    tables.buses = RecordTable::from_rows(
        "buses",
        vec![
            vec![("name", "A_EL"), ("carrier", "AC")],
            vec![("name", "B_EL"), ("carrier", "AC")],
        ],
    );
    tables.loads = RecordTable::from_rows(
        "loads",
        vec![vec![("name", "A_demand"), ("bus", "A_EL"), ("annual_total", "1000")]],
    );
    tables
}

fn synthetic_at(network: &Network, bus: &str) -> Vec<String> {
    network
        .generators
        .values()
        .filter(|g| g.synthetic && g.bus == bus)
        .map(|g| g.name.clone())
        .collect()
}

#[test]
fn single_backstop_for_unsupplied_demand() {
    let tables = two_bus_inputs();
    let config = AssemblyConfig::default();
    let assembly = assemble(&tables, &ProfileStore::new(), &config);

    let backstops = synthetic_at(&assembly.network, "A_EL");
    assert_eq!(backstops, vec!["A_EL_backstop"]);
    assert!(synthetic_at(&assembly.network, "B_EL").is_empty());

    let backstop = &assembly.network.generators["A_EL_backstop"];
    assert!(backstop.capacity.extendable);
    assert!(backstop.marginal_cost >= 1e4);
    assert_eq!(assembly.network.aggregate_demand("A_EL"), 1000.0);
    assert_eq!(assembly.synthesis.at_risk, vec!["A_EL"]);
    assert_eq!(
        assembly
            .diagnostics
            .issues_of_kind(IssueKind::StructuralInfeasibilityRisk)
            .count(),
        1
    );

    let again = assemble(&tables, &ProfileStore::new(), &config);
    assert_eq!(synthetic_at(&again.network, "A_EL"), backstops);
    assert_eq!(again.network.generators.len(), assembly.network.generators.len());
}

#[test]
fn synthesis_on_assembled_network_is_a_noop() {
    let assembly = assemble(&two_bus_inputs(), &ProfileStore::new(), &AssemblyConfig::default());
    let mut network = assembly.network.clone();
    let mut diag = Diagnostics::new();
    let report = guarantee_feasibility(&mut network, &FeasibilityConfig::default(), &mut diag);

    assert_eq!(report.synthesized_count(), 0);
    assert_eq!(network.generators.len(), assembly.network.generators.len());
    assert!(diag.is_empty());
}

fn multi_carrier_inputs() -> InputTables {
    let mut tables = InputTables::new(TimeAxis::hourly_steps(4));
    tables.buses = RecordTable::from_rows(
        "buses",
        vec![
            vec![("name", "DE_Strom"), ("carrier", "AC")],
            vec![("name", "DE_Fernwaerme"), ("carrier", "heat")],
            vec![("name", "DE_Erdgas"), ("carrier", "gas")],
            vec![("name", "DE_H2"), ("carrier", "H2")],
            vec![("name", "NL_EL"), ("carrier", "")],
        ],
    );
    tables.generators = RecordTable::from_rows(
        "generators",
        vec![
            vec![("name", "NL_wind"), ("bus", "NL_EL"), ("p_nom", "200")],
            vec![("name", "DE_pv"), ("bus", "DE_Strom"), ("p_nom", "-3"), ("p_nom_max", "50")],
        ],
    );
    tables.loads = RecordTable::from_rows(
        "loads",
        vec![
            vec![("name", "DE_power"), ("bus", "DE_Strom"), ("p_set", "20")],
            vec![("name", "DE_heat"), ("bus", "DE_Strom"), ("p_set", "10")],
            vec![("name", "DE_hydrogen"), ("bus", "DE_x"), ("p_set", "2")],
        ],
    );
    tables.links = RecordTable::from_rows(
        "links",
        vec![
            vec![
                ("name", "DE_cogen"),
                ("bus0", "DE_Fernwaerme"),
                ("bus1", "DE_Erdgas"),
                ("bus2", "DE_Strom"),
                ("efficiency", "0.5"),
                ("efficiency2", "0.35"),
            ],
            vec![("name", "DE_electrolysis"), ("bus0", "DE_H2"), ("bus1", "DE_Strom"), ("efficiency", "1.7")],
            vec![("name", "DE_heat_pump"), ("bus0", "DE_EL"), ("bus1", "DE_H"), ("bus2", "XX_gone")],
        ],
    );
    tables.lines = RecordTable::from_rows(
        "lines",
        vec![vec![("name", "DE-NL"), ("bus0", "DE_EL"), ("bus1", "NL_EL"), ("s_nom", "100")]],
    );
    tables
}

#[test]
fn chp_ports_are_fuel_electricity_heat() {
    let assembly = assemble(&multi_carrier_inputs(), &ProfileStore::new(), &AssemblyConfig::default());
    let link = &assembly.network.links["DE_cogen"];
    assert_eq!(link.port_buses(), vec!["DE_LNG", "DE_EL", "DE_H"]);
    let carriers: Vec<_> = link
        .port_buses()
        .into_iter()
        .map(|bus| assembly.network.bus_carrier(bus))
        .collect();
    assert_eq!(
        carriers,
        vec![Some(Carrier::Fuel), Some(Carrier::Electricity), Some(Carrier::Heat)]
    );
}

#[test]
fn every_link_output_has_bounded_efficiency() {
    let assembly = assemble(&multi_carrier_inputs(), &ProfileStore::new(), &AssemblyConfig::default());
    assert_eq!(assembly.network.links.len(), 3);
    for link in assembly.network.links.values() {
        assert!(!link.outputs.is_empty(), "{}", link.name);
        for port in &link.outputs {
            assert!(port.efficiency.is_defined(), "{}", link.name);
            for value in port.efficiency.values() {
                assert!((0.0..=1.0).contains(&value), "{} {value}", link.name);
            }
        }
    }
    let electrolysis = &assembly.network.links["DE_electrolysis"];
    assert_eq!(electrolysis.input, "DE_EL");
    assert_eq!(electrolysis.outputs[0].bus, "DE_H2");
    assert_eq!(electrolysis.outputs[0].efficiency.mean(), 1.0);
}

#[test]
fn every_demand_bus_is_supplied_after_assembly() {
    for always_guarantee in [true, false] {
        let mut config = AssemblyConfig::default();
        config.feasibility.always_guarantee = always_guarantee;
        let assembly = assemble(&multi_carrier_inputs(), &ProfileStore::new(), &config);
        let network = &assembly.network;

        let graph = SupplyGraph::from_network(network);
        for bus in network.buses.keys() {
            if network.aggregate_demand(bus) > 0.0 {
                assert!(graph.is_supplied(bus), "{bus} unsupplied (guarantee {always_guarantee})");
            }
        }
    }
}

#[test]
fn loads_land_on_their_carrier_bus() {
    let assembly = assemble(&multi_carrier_inputs(), &ProfileStore::new(), &AssemblyConfig::default());
    let loads = &assembly.network.loads;
    assert_eq!(loads["DE_power"].bus, "DE_EL");
    assert_eq!(loads["DE_heat"].bus, "DE_H");
    assert_eq!(loads["DE_hydrogen"].bus, "DE_H2");
}

#[test]
fn repairs_are_reported_not_fatal() {
    let assembly = assemble(&multi_carrier_inputs(), &ProfileStore::new(), &AssemblyConfig::default());
    let diag = &assembly.diagnostics;

    // bus carrier recovered from the name's trailing token
    assert_eq!(assembly.network.bus_carrier("NL_EL"), Some(Carrier::Electricity));
    // negative nominal is raised to the lower bound
    let pv = assembly.network.generators["DE_pv"].capacity;
    assert!(pv.is_ordered());
    assert_eq!(pv.nominal, 0.0);
    assert!(assembly.synthesis.corrected.contains(&"DE_pv".to_string()));
    // dangling third port is dropped, the link kept
    assert!(diag.issues_for("DE_heat_pump").any(|i| i.kind == IssueKind::UnresolvableReference));
    assert!(diag.issues_for("DE_electrolysis").any(|i| i.kind == IssueKind::IllPosedEfficiency));
    assert!(!diag.has_errors());
}

#[test]
fn canonical_names_are_fixed_points() {
    let assembly = assemble(&multi_carrier_inputs(), &ProfileStore::new(), &AssemblyConfig::default());
    let rows: Vec<Vec<(&str, &str)>> = assembly
        .network
        .buses
        .values()
        .map(|bus| vec![("name", bus.name.as_str()), ("carrier", "")])
        .collect();
    let table = RecordTable::from_rows("buses", rows);
    let mut diag = Diagnostics::new();
    let again = canonicalize(&table, &mut diag);

    assert_eq!(again.renamed_count(), 0);
    assert!(again.conflicts.is_empty());
    let names: Vec<_> = again.names().collect();
    let original: Vec<_> = assembly.network.buses.keys().map(String::as_str).collect();
    assert_eq!(names, original);
}
