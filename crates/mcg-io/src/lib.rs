//! # mcg-io: Tabular Input & Period Output
//!
//! File-facing collaborators of the assembly pipeline.
//!
//! ## Design Philosophy
//!
//! **Raw in, typed later**: input tables are kept as ordered field→string rows.
//! Interpretation (numbers, flags, carrier labels) is left to the assembly
//! stage so that a malformed cell becomes a diagnostic there instead of a load
//! failure here.
//!
//! **Only missing files are fatal**: an unreadable or absent mandatory table
//! is an `anyhow` error naming the path; everything else degrades.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mcg_io::{load_input_dir, load_profiles_csv};
//! use std::path::Path;
//!
//! fn main() -> anyhow::Result<()> {
//!     let tables = load_input_dir(Path::new("inputs/2030"))?;
//!     let profiles = load_profiles_csv(Path::new("inputs/profiles.csv"))?;
//!     println!("{} buses, {} steps", tables.buses.len(), tables.time_axis.len());
//!     println!("{} profiles", profiles.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`record`] - `Record` / `RecordTable` and CSV parsing
//! - [`tables`] - `InputTables` for one period and the time-axis descriptor
//! - [`profiles`] - `ProfileSource` shapes with repetition/truncation
//! - [`export`] - network directories and capacity-map JSON

pub mod export;
pub mod profiles;
pub mod record;
pub mod tables;

pub use export::{network_tables, read_capacity_map, write_capacity_map, write_network_dir};
pub use profiles::{load_profiles_csv, load_profiles_dir, ProfileSource, ProfileStore};
pub use record::{Record, RecordTable};
pub use tables::{load_input_dir, time_axis_from_table, InputTables};
