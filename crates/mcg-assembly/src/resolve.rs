//! Reference resolution against the canonical bus set.
//!
//! Candidate generation is an ordered list of [`Strategy`] functions combined
//! by [`first_non_empty`]. Candidates are produced from a sorted name set so a
//! given reference always resolves to the same bus.

use std::collections::BTreeMap;

use mcg_core::Carrier;

use crate::canonical::CanonicalMap;

/// Canonical bus names with their carriers, kept sorted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeSet {
    nodes: BTreeMap<String, Option<Carrier>>,
}

impl NodeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, carrier: Option<Carrier>) {
        self.nodes.insert(name.into(), carrier);
    }

    pub fn from_canonical(map: &CanonicalMap) -> Self {
        let mut set = Self::new();
        for (name, carrier) in map.carriers() {
            set.insert(name, carrier);
        }
        set
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn carrier(&self, name: &str) -> Option<Carrier> {
        self.nodes.get(name).copied().flatten()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// `(region, energy)` from the first and last underscore-delimited tokens.
pub fn split_reference(reference: &str) -> (&str, &str) {
    let reference = reference.trim();
    let region = reference.split('_').next().unwrap_or(reference);
    let energy = reference.rsplit('_').next().unwrap_or(reference);
    (region, energy)
}

pub type Strategy = fn(&str, &NodeSet) -> Vec<String>;

fn only_if_present(name: String, nodes: &NodeSet) -> Vec<String> {
    if nodes.contains(&name) {
        vec![name]
    } else {
        Vec::new()
    }
}

pub fn exact(reference: &str, nodes: &NodeSet) -> Vec<String> {
    only_if_present(reference.trim().to_string(), nodes)
}

pub fn region_energy(reference: &str, nodes: &NodeSet) -> Vec<String> {
    let (region, energy) = split_reference(reference);
    only_if_present(format!("{region}_{energy}"), nodes)
}

/// Handles references with the region written twice.
pub fn doubled_region(reference: &str, nodes: &NodeSet) -> Vec<String> {
    let (region, energy) = split_reference(reference);
    only_if_present(format!("{region}_{region}_{energy}"), nodes)
}

pub fn region_and_energy_affix(reference: &str, nodes: &NodeSet) -> Vec<String> {
    let (region, energy) = split_reference(reference);
    let prefix = format!("{region}_");
    let suffix = format!("_{energy}");
    nodes
        .names()
        .filter(|name| name.starts_with(&prefix) && name.ends_with(&suffix))
        .map(str::to_string)
        .collect()
}

pub fn region_prefix(reference: &str, nodes: &NodeSet) -> Vec<String> {
    let (region, _) = split_reference(reference);
    let prefix = format!("{region}_");
    nodes
        .names()
        .filter(|name| name.starts_with(&prefix))
        .map(str::to_string)
        .collect()
}

/// Resolution order; earlier strategies win.
pub static STRATEGIES: [(&str, Strategy); 5] = [
    ("exact", exact),
    ("region_energy", region_energy),
    ("doubled_region", doubled_region),
    ("region_and_energy_affix", region_and_energy_affix),
    ("region_prefix", region_prefix),
];

/// Run strategies in order and return the first non-empty candidate list.
pub fn first_non_empty<'s>(
    strategies: &'s [(&'s str, Strategy)],
    reference: &str,
    nodes: &NodeSet,
) -> Option<(&'s str, Vec<String>)> {
    strategies.iter().find_map(|(label, strategy)| {
        let candidates = strategy(reference, nodes);
        (!candidates.is_empty()).then_some((*label, candidates))
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Exact(String),
    Fallback { name: String, strategy: &'static str },
    /// Carries the trimmed reference unchanged.
    Unresolved(String),
}

impl Resolution {
    /// The resolved bus, or the untouched reference when unresolved.
    pub fn name(&self) -> &str {
        match self {
            Resolution::Exact(name) => name,
            Resolution::Fallback { name, .. } => name,
            Resolution::Unresolved(raw) => raw,
        }
    }

    pub fn resolved(&self) -> Option<&str> {
        match self {
            Resolution::Unresolved(_) => None,
            other => Some(other.name()),
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, Resolution::Unresolved(_))
    }
}

#[derive(Debug, Clone, Default)]
pub struct Resolver {
    nodes: NodeSet,
}

impl Resolver {
    pub fn new(nodes: NodeSet) -> Self {
        Self { nodes }
    }

    pub fn nodes(&self) -> &NodeSet {
        &self.nodes
    }

    pub fn carrier(&self, name: &str) -> Option<Carrier> {
        self.nodes.carrier(name)
    }

    /// Match `reference` to a bus. With `prefer_electric`, an electricity bus is
    /// chosen among several candidates; otherwise the first in name order.
    pub fn resolve(&self, reference: &str, prefer_electric: bool) -> Resolution {
        let reference = reference.trim();
        if reference.is_empty() {
            return Resolution::Unresolved(String::new());
        }
        let Some((strategy, candidates)) = first_non_empty(&STRATEGIES, reference, &self.nodes)
        else {
            return Resolution::Unresolved(reference.to_string());
        };

        let electric = || {
            candidates
                .iter()
                .find(|name| self.nodes.carrier(name) == Some(Carrier::Electricity))
        };
        let chosen = match (prefer_electric && candidates.len() > 1)
            .then(electric)
            .flatten()
        {
            Some(name) => name.clone(),
            None => candidates[0].clone(),
        };

        if strategy == "exact" {
            Resolution::Exact(chosen)
        } else {
            Resolution::Fallback {
                name: chosen,
                strategy,
            }
        }
    }

    /// Resolve and, when the result is not of `carrier`, try the same region's
    /// bus for that carrier.
    pub fn resolve_for_carrier(&self, reference: &str, carrier: Carrier) -> Resolution {
        let resolution = self.resolve(reference, carrier == Carrier::Electricity);
        let sibling = match resolution.resolved() {
            Some(name) if self.carrier(name) != Some(carrier) => {
                let (region, _) = split_reference(name);
                Some(format!("{region}_{}", carrier.token()))
                    .filter(|sibling| self.nodes.contains(sibling))
            }
            _ => None,
        };
        match sibling {
            Some(name) => Resolution::Fallback {
                name,
                strategy: "carrier_sibling",
            },
            None => resolution,
        }
    }
}
