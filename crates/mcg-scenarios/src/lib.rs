//! # mcg-scenarios: Per-Year Target Injection
//!
//! Maps exogenous yearly demand and capacity targets onto an assembled
//! network. Loads are grouped by `(region, carrier)`, generators by
//! `(region, technology)`; each group is rescaled by `target / current total`
//! so proportions inside the group survive. Applying the same targets twice
//! leaves the network unchanged the second time.
//!
//! ```rust,no_run
//! use mcg_scenarios::{apply_year, load_spec_from_path, resolve_year};
//! # fn run(network: &mut mcg_core::Network) -> anyhow::Result<()> {
//! let set = load_spec_from_path(std::path::Path::new("scenario.yaml"))?;
//! if let Some(targets) = resolve_year(&set, 2030)? {
//!     let mut diag = mcg_core::Diagnostics::new();
//!     let report = apply_year(network, &targets, &mut diag);
//!     println!("{} groups rescaled", report.rescaled().count());
//! }
//! # Ok(())
//! # }
//! ```

pub mod inject;
pub mod spec;

pub use inject::{
    apply_load_override, apply_year, demand_group, rescale_capacity, rescale_demand, GroupChange,
    GroupKind, InjectionReport,
};
pub use spec::{
    load_spec_from_path, resolve_year, targets_from_table, validate, CapacityTarget, DemandTarget,
    GroupTarget, LoadOverride, ResolvedYear, ScenarioSet, YearTargets,
};
