//! Bus identifier canonicalization.
//!
//! Every raw bus name is mapped to `{REGION}_{TOKEN}`, where the region is the
//! first underscore-delimited token of the raw name and the token comes from the
//! carrier label (falling back to the name's own trailing token or name
//! evidence). When two rows claim the same canonical name the earlier row keeps
//! it and the later row keeps its raw name.

use std::collections::HashMap;

use indexmap::IndexMap;
use mcg_core::{region_of, Carrier, DiagnosticIssue, Diagnostics, IssueKind, Severity};
use mcg_io::{InputTables, RecordTable};
use tracing::{debug, warn};

use crate::rules::{classify_carrier_label, classify_demand};

/// A rejected rename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub raw: String,
    pub target: String,
    /// Raw name of the row that already holds `target`.
    pub holder: String,
}

/// Result of canonicalizing a bus table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanonicalMap {
    /// Raw (trimmed) name → final name. Total over every accepted raw name.
    renames: IndexMap<String, String>,
    /// Final name → carrier, in bus-table order.
    carriers: IndexMap<String, Option<Carrier>>,
    /// Raw row index of each final name, for reading the remaining bus columns.
    rows: IndexMap<String, usize>,
    pub conflicts: Vec<Conflict>,
}

impl CanonicalMap {
    /// Final name for a raw reference, if the raw name was a bus row.
    pub fn rename(&self, raw: &str) -> Option<&str> {
        self.renames.get(raw.trim()).map(String::as_str)
    }

    /// Final name for a raw reference, or the trimmed reference itself.
    pub fn apply(&self, raw: &str) -> String {
        self.rename(raw)
            .map(str::to_string)
            .unwrap_or_else(|| raw.trim().to_string())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.carriers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.carriers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.carriers.is_empty()
    }

    pub fn carrier(&self, name: &str) -> Option<Carrier> {
        self.carriers.get(name).copied().flatten()
    }

    pub fn carriers(&self) -> impl Iterator<Item = (&str, Option<Carrier>)> {
        self.carriers.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Index of the source record in the bus table for a final name.
    pub fn source_row(&self, name: &str) -> Option<usize> {
        self.rows.get(name).copied()
    }

    /// Number of raw names that changed.
    pub fn renamed_count(&self) -> usize {
        self.renames.iter().filter(|(raw, fin)| raw != fin).count()
    }

    /// Rewrite every bus reference in the component tables.
    pub fn apply_to_tables(&self, tables: &mut InputTables) {
        self.apply_to_columns(&mut tables.generators, &["bus"]);
        self.apply_to_columns(&mut tables.loads, &["bus"]);
        self.apply_to_columns(&mut tables.storage, &["bus"]);
        self.apply_to_columns(&mut tables.links, &["bus0", "bus1", "bus2", "bus3"]);
        self.apply_to_columns(&mut tables.lines, &["bus0", "bus1"]);
    }

    fn apply_to_columns(&self, table: &mut RecordTable, columns: &[&str]) {
        for record in &mut table.records {
            for column in columns {
                let renamed = record
                    .text(column)
                    .and_then(|raw| self.rename(raw))
                    .map(str::to_string);
                if let Some(name) = renamed {
                    record.set(*column, name);
                }
            }
        }
    }
}

/// Canonical name for a raw bus name and its carrier.
pub fn canonical_name(raw: &str, carrier: Carrier) -> String {
    format!("{}_{}", region_of(raw), carrier.token())
}

/// Carrier of a bus row: the label if recognised, else the name's trailing
/// energy token, else carrier hints in the name.
pub fn bus_carrier(raw_name: &str, label: Option<&str>) -> Option<Carrier> {
    label
        .and_then(classify_carrier_label)
        .or_else(|| {
            raw_name
                .trim()
                .rsplit('_')
                .next()
                .and_then(Carrier::from_token)
        })
        .or_else(|| classify_demand(raw_name))
}

/// Canonicalize the `name`/`carrier` columns of a bus table.
pub fn canonicalize(buses: &RecordTable, diag: &mut Diagnostics) -> CanonicalMap {
    let mut map = CanonicalMap::default();
    // final name → raw name holding it
    let mut holders: HashMap<String, String> = HashMap::new();

    for (idx, record) in buses.iter().enumerate() {
        let Some(raw) = record.text("name") else {
            diag.add_error_at_row(IssueKind::InvalidRecord, "bus row without a name", record.row());
            continue;
        };
        if map.renames.contains_key(raw) {
            warn!(bus = raw, "duplicate bus row ignored");
            diag.add_warning_with_entity(IssueKind::InvalidRecord, "duplicate bus row ignored", raw);
            continue;
        }

        let carrier = bus_carrier(raw, record.text("carrier"));
        let target = match carrier {
            Some(carrier) if !region_of(raw).is_empty() => canonical_name(raw, carrier),
            _ => {
                debug!(bus = raw, "no carrier evidence, keeping raw name");
                raw.to_string()
            }
        };

        let final_name = match holders.get(&target) {
            None => target,
            Some(holder) => {
                warn!(bus = raw, target = %target, holder = %holder, "canonical name already taken");
                diag.add_warning_with_entity(
                    IssueKind::CanonicalizationConflict,
                    &format!("canonical name '{target}' already held by '{holder}', keeping raw name"),
                    raw,
                );
                map.conflicts.push(Conflict {
                    raw: raw.to_string(),
                    target: target.clone(),
                    holder: holder.clone(),
                });
                if let Some(other) = holders.get(raw) {
                    warn!(bus = raw, row = record.row(), holder = %other, "raw name also taken, bus dropped");
                    diag.add(
                        DiagnosticIssue::new(
                            Severity::Error,
                            IssueKind::CanonicalizationConflict,
                            format!(
                                "bus row {} dropped: raw name also taken by '{other}'; \
                                 references to '{raw}' now resolve to the bus of row '{other}'",
                                record.row()
                            ),
                        )
                        .with_row(record.row())
                        .with_entity(raw),
                    );
                    continue;
                }
                raw.to_string()
            }
        };

        holders.insert(final_name.clone(), raw.to_string());
        map.renames.insert(raw.to_string(), final_name.clone());
        map.carriers.insert(final_name.clone(), carrier);
        map.rows.insert(final_name, idx);
    }

    debug!(
        buses = map.len(),
        renamed = map.renamed_count(),
        conflicts = map.conflicts.len(),
        "canonicalized bus names"
    );
    map
}
