//! Multi-period carryover sequencing.
//!
//! Each simulated year is assembled, solved, and its optimized capacities are
//! installed as lower bounds on the next year's components. Years run strictly
//! in order: year `i + 1` cannot be built before year `i` has been extracted.

pub mod manifest;
pub mod period;
pub mod runner;

pub use manifest::{load_sequence_manifest, resume_floors, write_sequence_manifest, SequenceManifest};
pub use period::{load_period_dir, load_sequence_dir, PeriodInput, PeriodRecord, PeriodStage, PeriodStatus};
pub use runner::{
    apply_floors, build_period, extract_capacities, run_sequence, run_sequence_from, BuiltPeriod,
    SequenceConfig, SequenceSummary,
};
