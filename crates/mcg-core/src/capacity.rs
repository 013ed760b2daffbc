//! Capacity bounds and per-period capacity maps.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Installed or installable capacity of a component.
///
/// Well-formed bounds satisfy `0 <= min <= nominal <= max`. An absent `max`
/// means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Capacity {
    pub nominal: f64,
    #[serde(default)]
    pub min: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// The solver may choose any value within `[min, max]`.
    #[serde(default)]
    pub extendable: bool,
}

impl Capacity {
    pub fn fixed(nominal: f64) -> Self {
        Self {
            nominal,
            min: 0.0,
            max: None,
            extendable: false,
        }
    }

    pub fn extendable(nominal: f64, min: f64, max: Option<f64>) -> Self {
        Self {
            nominal,
            min,
            max,
            extendable: true,
        }
    }

    pub fn upper(&self) -> f64 {
        self.max.unwrap_or(f64::INFINITY)
    }

    pub fn is_ordered(&self) -> bool {
        self.nominal.is_finite()
            && self.min.is_finite()
            && self.max.map_or(true, f64::is_finite)
            && 0.0 <= self.min
            && self.min <= self.nominal
            && self.nominal <= self.upper()
    }

    /// Clamp bounds into `0 <= min <= nominal <= max`.
    ///
    /// Non-finite values are treated as absent. Returns `true` when anything changed.
    pub fn sanitize(&mut self) -> bool {
        let mut changed = false;

        if !self.min.is_finite() || self.min < 0.0 {
            self.min = 0.0;
            changed = true;
        }
        match self.max {
            Some(max) if !max.is_finite() => {
                self.max = None;
                changed = true;
            }
            Some(max) if max < self.min => {
                self.max = Some(self.min);
                changed = true;
            }
            _ => {}
        }
        if !self.nominal.is_finite() {
            self.nominal = self.min;
            changed = true;
        }
        let clamped = self.nominal.clamp(self.min, self.upper());
        if clamped != self.nominal {
            self.nominal = clamped;
            changed = true;
        }
        changed
    }

    /// Raise the lower bound to `floor`, pulling nominal and max up with it.
    ///
    /// Returns `true` when the floor was above the previous lower bound.
    pub fn raise_floor(&mut self, floor: f64) -> bool {
        if !floor.is_finite() || floor <= self.min {
            return false;
        }
        self.min = floor;
        if self.nominal < floor {
            self.nominal = floor;
        }
        if let Some(max) = self.max {
            if max < floor {
                self.max = Some(floor);
            }
        }
        true
    }
}

impl std::fmt::Display for Capacity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.max {
            Some(max) => write!(f, "[{} <= {} <= {}]", self.min, self.nominal, max),
            None => write!(f, "[{} <= {} <= inf]", self.min, self.nominal),
        }?;
        if self.extendable {
            write!(f, " extendable")?;
        }
        Ok(())
    }
}

/// Component tables that carry a capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    Generator,
    Link,
    Storage,
    Line,
}

impl ComponentKind {
    pub const ALL: [ComponentKind; 4] = [
        ComponentKind::Generator,
        ComponentKind::Link,
        ComponentKind::Storage,
        ComponentKind::Line,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKind::Generator => "generator",
            ComponentKind::Link => "link",
            ComponentKind::Storage => "storage",
            ComponentKind::Line => "line",
        }
    }
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capacities keyed by component name, one table per component kind.
///
/// Used both for a single period's solved capacities and for the cumulative
/// floors carried from period to period.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CapacityMap {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub generators: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub links: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub storage: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub lines: BTreeMap<String, f64>,
}

impl CapacityMap {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self, kind: ComponentKind) -> &BTreeMap<String, f64> {
        match kind {
            ComponentKind::Generator => &self.generators,
            ComponentKind::Link => &self.links,
            ComponentKind::Storage => &self.storage,
            ComponentKind::Line => &self.lines,
        }
    }

    fn table_mut(&mut self, kind: ComponentKind) -> &mut BTreeMap<String, f64> {
        match kind {
            ComponentKind::Generator => &mut self.generators,
            ComponentKind::Link => &mut self.links,
            ComponentKind::Storage => &mut self.storage,
            ComponentKind::Line => &mut self.lines,
        }
    }

    pub fn insert(&mut self, kind: ComponentKind, name: impl Into<String>, value: f64) {
        self.table_mut(kind).insert(name.into(), value);
    }

    pub fn get(&self, kind: ComponentKind, name: &str) -> Option<f64> {
        self.table(kind).get(name).copied()
    }

    pub fn len(&self) -> usize {
        ComponentKind::ALL
            .iter()
            .map(|kind| self.table(*kind).len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (ComponentKind, &str, f64)> {
        ComponentKind::ALL.into_iter().flat_map(move |kind| {
            self.table(kind)
                .iter()
                .map(move |(name, value)| (kind, name.as_str(), *value))
        })
    }

    /// Element-wise maximum with `other`. Entries only present in `other` are added.
    pub fn merge_max(&mut self, other: &CapacityMap) {
        for (kind, name, value) in other.iter() {
            if !value.is_finite() {
                continue;
            }
            let table = self.table_mut(kind);
            match table.get_mut(name) {
                Some(existing) if *existing >= value => {}
                Some(existing) => *existing = value,
                None => {
                    table.insert(name.to_string(), value);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_orders_bounds() {
        let mut cap = Capacity::extendable(5.0, 10.0, Some(4.0));
        assert!(cap.sanitize());
        assert_eq!(cap.min, 10.0);
        assert_eq!(cap.max, Some(10.0));
        assert_eq!(cap.nominal, 10.0);
        assert!(cap.is_ordered());
    }

    #[test]
    fn sanitize_clears_negative_and_non_finite() {
        let mut cap = Capacity::extendable(f64::NAN, -3.0, Some(f64::INFINITY));
        assert!(cap.sanitize());
        assert_eq!(cap.min, 0.0);
        assert_eq!(cap.max, None);
        assert_eq!(cap.nominal, 0.0);

        let mut nan_max = Capacity::extendable(1.0, 0.0, Some(f64::NAN));
        assert!(nan_max.sanitize());
        assert_eq!(nan_max.max, None);
    }

    #[test]
    fn sanitize_leaves_ordered_bounds_alone() {
        let mut cap = Capacity::extendable(5.0, 1.0, Some(8.0));
        assert!(!cap.sanitize());
        assert_eq!(cap, Capacity::extendable(5.0, 1.0, Some(8.0)));
    }

    #[test]
    fn raise_floor_pulls_nominal_and_max() {
        let mut cap = Capacity::extendable(2.0, 1.0, Some(3.0));
        assert!(cap.raise_floor(5.0));
        assert_eq!(cap.min, 5.0);
        assert_eq!(cap.nominal, 5.0);
        assert_eq!(cap.max, Some(5.0));

        assert!(!cap.raise_floor(4.0));
        assert!(!cap.raise_floor(f64::NAN));
        assert_eq!(cap.min, 5.0);
    }

    #[test]
    fn merge_max_is_elementwise() {
        let mut floors = CapacityMap::new();
        floors.insert(ComponentKind::Generator, "pv", 10.0);
        floors.insert(ComponentKind::Link, "chp", 4.0);

        let mut solved = CapacityMap::new();
        solved.insert(ComponentKind::Generator, "pv", 7.0);
        solved.insert(ComponentKind::Link, "chp", 6.0);
        solved.insert(ComponentKind::Storage, "battery", 2.0);

        floors.merge_max(&solved);
        assert_eq!(floors.get(ComponentKind::Generator, "pv"), Some(10.0));
        assert_eq!(floors.get(ComponentKind::Link, "chp"), Some(6.0));
        assert_eq!(floors.get(ComponentKind::Storage, "battery"), Some(2.0));
        assert_eq!(floors.len(), 3);
    }

    #[test]
    fn capacity_map_json_omits_empty_tables() {
        let mut map = CapacityMap::new();
        map.insert(ComponentKind::Line, "l1", 100.0);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"lines":{"l1":100.0}}"#);
        let parsed: CapacityMap = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, map);
    }
}
