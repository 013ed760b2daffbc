use mcg_assembly::{assemble, AssemblyConfig};
use mcg_core::{Diagnostics, TimeAxis};
use mcg_io::{InputTables, ProfileStore, RecordTable};
use mcg_scenarios::{apply_year, resolve_year, targets_from_table};

fn inputs() -> InputTables {
    let mut tables = InputTables::new(TimeAxis::hourly_steps(4));
    tables.buses = RecordTable::from_rows(
        "buses",
        vec![
            vec![("name", "DE_Strom"), ("carrier", "AC")],
            vec![("name", "DE_Waerme"), ("carrier", "heat")],
        ],
    );
    tables.loads = RecordTable::from_rows(
        "loads",
        vec![
            vec![("name", "DE_el_a"), ("bus", "DE_Strom"), ("annual_total", "60")],
            vec![("name", "DE_el_b"), ("bus", "DE_Strom"), ("annual_total", "40")],
            vec![("name", "DE_heat"), ("bus", "DE_Strom"), ("annual_total", "8")],
        ],
    );
    tables.generators = RecordTable::from_rows(
        "generators",
        vec![vec![("name", "DE_wind_north"), ("bus", "DE_Strom"), ("p_nom", "50")]],
    );
    tables.scenario = Some(RecordTable::from_rows(
        "scenario",
        vec![
            vec![("year", "2030"), ("kind", "demand"), ("region", "DE"), ("group", "electricity"), ("target", "250")],
            vec![("year", "2030"), ("kind", "capacity"), ("region", "DE"), ("group", "wind"), ("target", "75")],
        ],
    ));
    tables
}

#[test]
fn scenario_table_rescales_assembled_network() {
    let tables = inputs();
    let mut assembly = assemble(&tables, &ProfileStore::new(), &AssemblyConfig::default());
    let set = targets_from_table(tables.scenario.as_ref().unwrap()).unwrap();
    let targets = resolve_year(&set, 2030).unwrap().unwrap();

    let mut diag = Diagnostics::new();
    let report = apply_year(&mut assembly.network, &targets, &mut diag);
    assert_eq!(report.rescaled().count(), 2);

    let loads = &assembly.network.loads;
    let a = loads["DE_el_a"].total();
    let b = loads["DE_el_b"].total();
    assert!((a + b - 250.0).abs() < 1e-9);
    assert!((a / (a + b) - 0.6).abs() < 1e-12);
    assert!((loads["DE_heat"].total() - 8.0).abs() < 1e-12);
    assert_eq!(assembly.network.generators["DE_wind_north"].capacity.nominal, 75.0);

    let again = apply_year(&mut assembly.network, &targets, &mut diag);
    assert_eq!(again.rescaled().count(), 0);
    assert!(diag.is_empty());
}
