use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use mcg_assembly::{guarantee_feasibility, populate, AssemblyConfig, BuildStats, Populated, SynthesisReport};
use mcg_core::{CapacityMap, ComponentKind, Diagnostics, IssueKind, Network};
use mcg_io::{write_capacity_map, write_network_dir, ProfileSource};
use mcg_scenarios::{apply_year, InjectionReport};
use mcg_solver_common::{DispatchSolution, DispatchSolver};
use tracing::{debug, info, warn};

use crate::manifest::{write_sequence_manifest, SequenceManifest, CAPACITIES_FILE, FLOORS_FILE, MANIFEST_FILE};
use crate::period::{PeriodInput, PeriodRecord, PeriodStage, PeriodStatus};

/// Runner settings for a carryover sequence.
#[derive(Debug, Clone, Default)]
pub struct SequenceConfig {
    pub assembly: AssemblyConfig,
    /// When set, every period's network and capacities are written below it.
    pub output_root: Option<PathBuf>,
}

/// Summary returned after the run.
#[derive(Debug, Clone)]
pub struct SequenceSummary {
    pub periods: Vec<PeriodRecord>,
    /// Cumulative floors after the last period.
    pub floors: CapacityMap,
    pub manifest_path: Option<PathBuf>,
}

impl SequenceSummary {
    pub fn degraded(&self) -> usize {
        self.periods.iter().filter(|p| p.is_degraded()).count()
    }
}

/// A period's network, ready to be handed to the solver.
#[derive(Debug, Clone)]
pub struct BuiltPeriod {
    pub network: Network,
    pub diagnostics: Diagnostics,
    pub stats: BuildStats,
    pub injection: Option<InjectionReport>,
    pub floors_applied: usize,
    pub synthesis: SynthesisReport,
}

pub fn run_sequence(
    inputs: &[PeriodInput],
    profiles: &dyn ProfileSource,
    solver: &dyn DispatchSolver,
    config: &SequenceConfig,
) -> Result<SequenceSummary> {
    run_sequence_from(inputs, profiles, solver, config, CapacityMap::new())
}

/// Run the periods in order starting from already carried `floors`, e.g.
/// those returned by [`crate::resume_floors`].
pub fn run_sequence_from(
    inputs: &[PeriodInput],
    profiles: &dyn ProfileSource,
    solver: &dyn DispatchSolver,
    config: &SequenceConfig,
    floors: CapacityMap,
) -> Result<SequenceSummary> {
    if let Some(pair) = inputs.windows(2).find(|w| w[0].year >= w[1].year) {
        bail!(
            "period years must be strictly increasing, found {} before {}",
            pair[0].year,
            pair[1].year
        );
    }
    if let Some(root) = &config.output_root {
        fs::create_dir_all(root)
            .with_context(|| format!("creating sequence output root '{}'", root.display()))?;
    }

    let mut carried = floors;
    let mut periods = Vec::with_capacity(inputs.len());
    let mut stage = PeriodStage::Build;

    for (index, input) in inputs.iter().enumerate() {
        let more = index + 1 < inputs.len();
        let year = input.year;

        debug!(year, %stage, floors = carried.len(), "period started");
        let mut built = build_period(input, profiles, &carried, &config.assembly);
        stage = stage.advance(more);

        debug!(year, %stage, solver = solver.name(), "handing network to solver");
        let (status, solution) = solve_period(solver, &built.network, year, &mut built.diagnostics);
        stage = stage.advance(more);

        let optimized = match status {
            PeriodStatus::Optimal => solution.as_ref().map(|s| &s.optimized),
            PeriodStatus::Degraded => None,
        };
        let solved = extract_capacities(&built.network, optimized);
        debug!(year, %stage, extracted = solved.len(), "capacities extracted");
        stage = stage.advance(more);

        carried.merge_max(&solved);
        debug!(year, %stage, floors = carried.len(), "floors carried forward");

        if let Some(root) = &config.output_root {
            persist_period(root, year, &built.network, &solved, &carried)?;
        }

        let record = PeriodRecord {
            year,
            status,
            objective: solution.as_ref().and_then(|s| s.objective),
            solved_capacities: solved,
            floors_applied: built.floors_applied,
            synthesized: built.synthesis.synthesized().map(str::to_string).collect(),
            skipped: built.stats.skipped,
            solver_message: solution.and_then(|s| s.message),
            issues: built.diagnostics,
        };
        info!(
            year,
            status = ?record.status,
            objective = ?record.objective,
            floors_applied = record.floors_applied,
            issues = %record.issues.summary(),
            "period finished"
        );
        periods.push(record);
        stage = stage.advance(more);
    }
    debug_assert!(inputs.is_empty() || stage == PeriodStage::Done);

    let manifest_path = match &config.output_root {
        Some(root) => {
            let path = root.join(MANIFEST_FILE);
            let degraded = periods.iter().filter(|p| p.is_degraded()).count();
            let manifest = SequenceManifest {
                created_at: Utc::now(),
                years: periods.iter().map(|p| p.year).collect(),
                optimal: periods.len() - degraded,
                degraded,
                floors: carried.clone(),
                periods: periods.clone(),
            };
            write_sequence_manifest(&path, &manifest)?;
            Some(path)
        }
        None => None,
    };

    Ok(SequenceSummary {
        periods,
        floors: carried,
        manifest_path,
    })
}

/// BUILD: populate, inject this year's targets, raise carried floors, then
/// synthesize feasibility guarantees.
pub fn build_period(
    input: &PeriodInput,
    profiles: &dyn ProfileSource,
    floors: &CapacityMap,
    config: &AssemblyConfig,
) -> BuiltPeriod {
    let Populated {
        mut network,
        mut diagnostics,
        stats,
        ..
    } = populate(&input.tables, profiles, config);

    let injection = input
        .targets
        .as_ref()
        .map(|targets| apply_year(&mut network, targets, &mut diagnostics));
    let floors_applied = apply_floors(&mut network, floors, &mut diagnostics);
    let synthesis = guarantee_feasibility(&mut network, &config.feasibility, &mut diagnostics);
    network.validate_into(&mut diagnostics);

    BuiltPeriod {
        network,
        diagnostics,
        stats,
        injection,
        floors_applied,
        synthesis,
    }
}

/// Raise each matching extendable component's lower bound to its carried
/// floor. Components absent from `network` are ignored; components declared
/// non-extendable keep their bounds and get a `BoundInconsistency` warning.
/// Returns how many bounds moved.
pub fn apply_floors(network: &mut Network, floors: &CapacityMap, diag: &mut Diagnostics) -> usize {
    let mut raised = 0;
    for (kind, name, capacity) in network.capacities_mut() {
        if let Some(floor) = floors.get(kind, name) {
            if !capacity.extendable {
                debug!(component = name, kind = %kind, floor, "floor not applied to fixed capacity");
                diag.add_warning_with_entity(
                    IssueKind::BoundInconsistency,
                    &format!(
                        "{kind} '{name}' is declared non-extendable; carried floor {floor} not applied"
                    ),
                    name,
                );
                continue;
            }
            if capacity.raise_floor(floor) {
                debug!(component = name, kind = %kind, floor, "capacity floor raised");
                raised += 1;
            }
        }
    }
    raised
}

/// EXTRACT: the capacity of every extendable declared component, taken from
/// `optimized` when it holds a usable value, else the pre-solve nominal.
pub fn extract_capacities(network: &Network, optimized: Option<&CapacityMap>) -> CapacityMap {
    let mut solved = CapacityMap::new();
    for (kind, name, capacity) in network.capacities() {
        if !capacity.extendable || is_synthetic(network, kind, name) {
            continue;
        }
        let value = optimized
            .and_then(|map| map.get(kind, name))
            .filter(|v| v.is_finite() && *v >= 0.0)
            .unwrap_or(capacity.nominal);
        solved.insert(kind, name, value);
    }
    solved
}

fn is_synthetic(network: &Network, kind: ComponentKind, name: &str) -> bool {
    kind == ComponentKind::Generator && network.generators.get(name).is_some_and(|g| g.synthetic)
}

/// SOLVE: any outcome other than an optimal solution degrades the period.
fn solve_period(
    solver: &dyn DispatchSolver,
    network: &Network,
    year: i32,
    diag: &mut Diagnostics,
) -> (PeriodStatus, Option<DispatchSolution>) {
    match solver.solve(network) {
        Ok(solution) if solution.is_optimal() => (PeriodStatus::Optimal, Some(solution)),
        Ok(solution) => {
            let message = format!(
                "solver {} reported {} for {year}; carrying pre-solve capacities",
                solver.name(),
                solution.status
            );
            warn!(year, status = %solution.status, partial = solution.optimized.len(), "{message}");
            diag.add_warning(IssueKind::SolverFailure, &message);
            (PeriodStatus::Degraded, Some(solution))
        }
        Err(err) => {
            let message = format!("solver {} failed for {year}: {err}", solver.name());
            warn!(year, error = %err, "solver failed; carrying pre-solve capacities");
            diag.add_warning(IssueKind::SolverFailure, &message);
            (PeriodStatus::Degraded, None)
        }
    }
}

fn persist_period(
    root: &Path,
    year: i32,
    network: &Network,
    solved: &CapacityMap,
    floors: &CapacityMap,
) -> Result<()> {
    let dir = root.join(year.to_string());
    write_network_dir(network, &dir.join("network"))
        .with_context(|| format!("persisting network of period {year}"))?;
    write_capacity_map(solved, &dir.join(CAPACITIES_FILE))?;
    write_capacity_map(floors, &dir.join(FLOORS_FILE))?;
    Ok(())
}
