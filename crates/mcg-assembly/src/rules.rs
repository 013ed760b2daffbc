//! Ordered token rule tables for classifying free-text labels and names.
//!
//! Each table is a list of [`TokenRule`]s checked in order; the first rule that
//! matches decides the classification. Text is lowercased and trimmed, then
//! split into tokens on `_`, `-`, `.`, `/` and whitespace.
//!
//! | Mode | Matches when |
//! |------|--------------|
//! | `Token` | a token equals the pattern |
//! | `Prefix` | a token starts with the pattern |
//! | `Contains` | the whole normalised text contains the pattern |

use std::sync::OnceLock;

use mcg_core::{Carrier, Technology};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    Token,
    Prefix,
    Contains,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TokenRule<T> {
    pub pattern: &'static str,
    pub mode: MatchMode,
    pub value: T,
}

impl<T> TokenRule<T> {
    pub const fn token(pattern: &'static str, value: T) -> Self {
        Self {
            pattern,
            mode: MatchMode::Token,
            value,
        }
    }

    pub const fn prefix(pattern: &'static str, value: T) -> Self {
        Self {
            pattern,
            mode: MatchMode::Prefix,
            value,
        }
    }

    pub const fn contains(pattern: &'static str, value: T) -> Self {
        Self {
            pattern,
            mode: MatchMode::Contains,
            value,
        }
    }

    fn matches(&self, text: &str, tokens: &[&str]) -> bool {
        match self.mode {
            MatchMode::Token => tokens.iter().any(|t| *t == self.pattern),
            MatchMode::Prefix => tokens.iter().any(|t| t.starts_with(self.pattern)),
            MatchMode::Contains => text.contains(self.pattern),
        }
    }
}

/// First-match-wins classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleTable<T> {
    rules: Vec<TokenRule<T>>,
}

impl<T: Clone> RuleTable<T> {
    pub fn new(rules: Vec<TokenRule<T>>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[TokenRule<T>] {
        &self.rules
    }

    pub fn classify(&self, text: &str) -> Option<T> {
        self.matching_rule(text).map(|rule| rule.value.clone())
    }

    /// The rule that decided the classification, for diagnostics.
    pub fn matching_rule(&self, text: &str) -> Option<&TokenRule<T>> {
        let normalised = text.trim().to_lowercase();
        if normalised.is_empty() {
            return None;
        }
        let tokens = tokenize(&normalised);
        self.rules
            .iter()
            .find(|rule| rule.matches(&normalised, &tokens))
    }
}

pub fn tokenize(text: &str) -> Vec<&str> {
    text.split(|c: char| c == '_' || c == '-' || c == '.' || c == '/' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Conversion-device markers found in link names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkMarker {
    Chp,
    Electrolysis,
    HeatPump,
}

/// Carrier labels on bus rows, in several spellings and languages.
pub fn carrier_labels() -> &'static RuleTable<Carrier> {
    static TABLE: OnceLock<RuleTable<Carrier>> = OnceLock::new();
    TABLE.get_or_init(|| {
        use Carrier::*;
        RuleTable::new(vec![
            TokenRule::token("h2", Hydrogen),
            TokenRule::prefix("hydrogen", Hydrogen),
            TokenRule::prefix("wasserstoff", Hydrogen),
            TokenRule::token("el", Electricity),
            TokenRule::token("ac", Electricity),
            TokenRule::token("dc", Electricity),
            TokenRule::token("power", Electricity),
            TokenRule::prefix("electric", Electricity),
            TokenRule::prefix("elektri", Electricity),
            TokenRule::prefix("strom", Electricity),
            TokenRule::token("h", Heat),
            TokenRule::prefix("heat", Heat),
            TokenRule::contains("wärme", Heat),
            TokenRule::contains("waerme", Heat),
            TokenRule::token("lng", Fuel),
            TokenRule::token("gas", Fuel),
            TokenRule::token("ch4", Fuel),
            TokenRule::prefix("fuel", Fuel),
            TokenRule::prefix("methane", Fuel),
            TokenRule::prefix("erdgas", Fuel),
            TokenRule::prefix("brennstoff", Fuel),
        ])
    })
}

/// Carrier hints embedded in demand component names.
pub fn demand_carriers() -> &'static RuleTable<Carrier> {
    static TABLE: OnceLock<RuleTable<Carrier>> = OnceLock::new();
    TABLE.get_or_init(|| {
        use Carrier::*;
        RuleTable::new(vec![
            TokenRule::token("h2", Hydrogen),
            TokenRule::contains("hydrogen", Hydrogen),
            TokenRule::contains("wasserstoff", Hydrogen),
            TokenRule::token("h", Heat),
            TokenRule::contains("heat", Heat),
            TokenRule::contains("wärme", Heat),
            TokenRule::contains("waerme", Heat),
            TokenRule::token("el", Electricity),
            TokenRule::contains("elec", Electricity),
            TokenRule::contains("strom", Electricity),
            TokenRule::token("power", Electricity),
        ])
    })
}

/// Supply technology from generator names.
pub fn technologies() -> &'static RuleTable<Technology> {
    static TABLE: OnceLock<RuleTable<Technology>> = OnceLock::new();
    TABLE.get_or_init(|| {
        use Technology::*;
        RuleTable::new(vec![
            TokenRule::token("pv", Solar),
            TokenRule::prefix("solar", Solar),
            TokenRule::prefix("photovolt", Solar),
            TokenRule::contains("wind", Wind),
            TokenRule::prefix("nuclear", Nuclear),
            TokenRule::prefix("kernkraft", Nuclear),
            TokenRule::token("chp", Chp),
            TokenRule::token("kwk", Chp),
            TokenRule::contains("cogeneration", Chp),
            TokenRule::token("hydro", Hydro),
            TokenRule::token("ror", Hydro),
            TokenRule::contains("wasserkraft", Hydro),
            TokenRule::prefix("biomass", Biomass),
            TokenRule::prefix("biogas", Biomass),
            TokenRule::prefix("coal", Coal),
            TokenRule::prefix("lignite", Coal),
            TokenRule::contains("kohle", Coal),
            TokenRule::token("gas", Gas),
            TokenRule::token("ccgt", Gas),
            TokenRule::token("ocgt", Gas),
            TokenRule::token("oil", Oil),
        ])
    })
}

/// Device-type markers in link names.
pub fn link_markers() -> &'static RuleTable<LinkMarker> {
    static TABLE: OnceLock<RuleTable<LinkMarker>> = OnceLock::new();
    TABLE.get_or_init(|| {
        use LinkMarker::*;
        RuleTable::new(vec![
            TokenRule::token("chp", Chp),
            TokenRule::token("kwk", Chp),
            TokenRule::contains("cogeneration", Chp),
            TokenRule::contains("electroly", Electrolysis),
            TokenRule::contains("elektroly", Electrolysis),
            TokenRule::token("ptg", Electrolysis),
            TokenRule::contains("power-to-gas", Electrolysis),
            TokenRule::contains("power_to_gas", Electrolysis),
            TokenRule::contains("heat pump", HeatPump),
            TokenRule::contains("heat_pump", HeatPump),
            TokenRule::contains("heatpump", HeatPump),
            TokenRule::contains("wärmepumpe", HeatPump),
            TokenRule::contains("waermepumpe", HeatPump),
            TokenRule::token("hp", HeatPump),
        ])
    })
}

pub fn classify_carrier_label(label: &str) -> Option<Carrier> {
    carrier_labels().classify(label)
}

pub fn classify_demand(name: &str) -> Option<Carrier> {
    demand_carriers().classify(name)
}

pub fn classify_technology(name: &str) -> Technology {
    technologies().classify(name).unwrap_or(Technology::Other)
}

pub fn link_marker(name: &str) -> Option<LinkMarker> {
    link_markers().classify(name)
}
