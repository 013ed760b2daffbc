//! # mcg-assembly: Network Assembly Engine
//!
//! Turns loosely-formatted input tables for one planning period into a
//! consistent multi-carrier network that a dispatch solver can always solve.
//!
//! ## Pipeline
//!
//! 1. [`canonical`] - bus names become `{region}_{carrier token}`
//! 2. [`resolve`] - component bus references are matched to canonical buses
//!    through an ordered list of fallback strategies
//! 3. [`populate`] - records become components; link ports get physical roles
//!    ([`ports`]) and unresolved components are skipped with a diagnostic
//! 4. [`synthesize`] - fuel sources, backstops and bound sanitation
//!
//! Classification tables live in [`rules`]; policy values in [`config`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mcg_assembly::{assemble, AssemblyConfig};
//! use mcg_io::{load_input_dir, load_profiles_csv};
//! use std::path::Path;
//!
//! fn main() -> anyhow::Result<()> {
//!     let tables = load_input_dir(Path::new("inputs/2030"))?;
//!     let profiles = load_profiles_csv(Path::new("inputs/profiles.csv"))?;
//!     let assembly = assemble(&tables, &profiles, &AssemblyConfig::default());
//!     println!("{}", assembly.network.stats());
//!     println!("{}", assembly.diagnostics.summary());
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod canonical;
pub mod config;
pub mod populate;
pub mod ports;
pub mod resolve;
pub mod rules;
pub mod synthesize;

pub use builder::{AddResult, BuildStats, NetworkBuilder};
pub use canonical::{canonicalize, CanonicalMap, Conflict};
pub use config::{load_config, AssemblyConfig, CostConfig, DefaultsConfig, FeasibilityConfig};
pub use populate::{populate, Populated};
pub use resolve::{NodeSet, Resolution, Resolver};
pub use synthesize::{guarantee_feasibility, sanitize_bounds, SynthesisReport};

use mcg_core::{Diagnostics, Network};
use mcg_io::{InputTables, ProfileSource};
use tracing::info;

/// Result of assembling one period.
#[derive(Debug, Clone)]
pub struct Assembly {
    pub network: Network,
    pub canonical: CanonicalMap,
    pub diagnostics: Diagnostics,
    pub synthesis: SynthesisReport,
    pub stats: BuildStats,
}

/// Run the whole pipeline. Never fails: every defect in the input ends up in
/// [`Assembly::diagnostics`].
pub fn assemble(tables: &InputTables, profiles: &dyn ProfileSource, config: &AssemblyConfig) -> Assembly {
    let Populated {
        mut network,
        canonical,
        mut diagnostics,
        stats,
    } = populate(tables, profiles, config);

    let synthesis = guarantee_feasibility(&mut network, &config.feasibility, &mut diagnostics);
    network.validate_into(&mut diagnostics);

    info!(
        network = %network.stats(),
        synthesized = synthesis.synthesized_count(),
        issues = %diagnostics.summary(),
        "assembly finished"
    );
    Assembly {
        network,
        canonical,
        diagnostics,
        synthesis,
        stats,
    }
}
