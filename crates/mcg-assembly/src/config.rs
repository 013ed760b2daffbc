//! Assembly configuration.
//!
//! Every section is `#[serde(default)]`, so a partial document only overrides
//! the values it names.
//!
//! ```toml
//! [feasibility]
//! always_guarantee = false
//! backstop_marginal_cost = 50000.0
//!
//! [costs]
//! chp = 8.0
//! ```

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblyConfig {
    pub feasibility: FeasibilityConfig,
    pub costs: CostConfig,
    pub defaults: DefaultsConfig,
}

/// Backstop synthesis policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeasibilityConfig {
    /// Synthesize a backstop at every demand bus, even when local supply exists.
    pub always_guarantee: bool,
    pub backstop_marginal_cost: f64,
    pub backstop_max_capacity: f64,
    pub backstop_suffix: String,
    pub fuel_source_suffix: String,
}

impl Default for FeasibilityConfig {
    fn default() -> Self {
        Self {
            always_guarantee: true,
            backstop_marginal_cost: 1e5,
            backstop_max_capacity: 1e9,
            backstop_suffix: "_backstop".to_string(),
            fuel_source_suffix: "_fuel_source".to_string(),
        }
    }
}

/// Marginal costs for heat-supplying links that declare none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostConfig {
    pub chp: f64,
    pub heat_pump: f64,
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            chp: 10.0,
            heat_pump: 20.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    pub nominal_voltage: f64,
    /// Upper clamp for link output efficiencies.
    pub max_efficiency: f64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            nominal_voltage: 1.0,
            max_efficiency: 1.0,
        }
    }
}

impl AssemblyConfig {
    pub fn validate(&self) -> Result<()> {
        let costs = &self.costs;
        let backstop = self.feasibility.backstop_marginal_cost;
        if !(costs.chp < costs.heat_pump && costs.heat_pump < backstop) {
            bail!(
                "heat supply costs must be ordered chp ({}) < heat_pump ({}) < backstop ({})",
                costs.chp,
                costs.heat_pump,
                backstop
            );
        }
        if !(self.feasibility.backstop_max_capacity > 0.0) {
            bail!("backstop_max_capacity must be positive");
        }
        if self.feasibility.backstop_suffix.is_empty() || self.feasibility.fuel_source_suffix.is_empty() {
            bail!("synthetic component suffixes must not be empty");
        }
        if !(self.defaults.max_efficiency > 0.0) {
            bail!("max_efficiency must be positive");
        }
        Ok(())
    }
}

/// Load a configuration document by extension (`.toml`, `.yaml`/`.yml`, `.json`)
/// and validate it.
pub fn load_config(path: &Path) -> Result<AssemblyConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading assembly config '{}'", path.display()))?;
    let config: AssemblyConfig = match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("toml") => {
            toml::from_str(&data).context("parsing assembly config toml")?
        }
        Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
            serde_yaml::from_str(&data).context("parsing assembly config yaml")?
        }
        Some(ext) if ext.eq_ignore_ascii_case("json") => {
            serde_json::from_str(&data).context("parsing assembly config json")?
        }
        _ => bail!("unsupported config format '{}'", path.display()),
    };
    config
        .validate()
        .with_context(|| format!("validating assembly config '{}'", path.display()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid_and_guarantee_is_on() {
        let config = AssemblyConfig::default();
        assert!(config.feasibility.always_guarantee);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("assembly.toml");
        fs::write(&path, "[feasibility]\nalways_guarantee = false\n").unwrap();

        let config = load_config(&path).unwrap();
        assert!(!config.feasibility.always_guarantee);
        assert_eq!(config.feasibility.backstop_suffix, "_backstop");
        assert_eq!(config.costs, CostConfig::default());
    }

    #[test]
    fn yaml_and_json_are_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = dir.path().join("assembly.yaml");
        fs::write(&yaml, "costs:\n  chp: 5.0\n").unwrap();
        assert_eq!(load_config(&yaml).unwrap().costs.chp, 5.0);

        let json = dir.path().join("assembly.json");
        fs::write(&json, r#"{"defaults": {"nominal_voltage": 110.0}}"#).unwrap();
        assert_eq!(load_config(&json).unwrap().defaults.nominal_voltage, 110.0);
    }

    #[test]
    fn misordered_costs_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("assembly.toml");
        fs::write(&path, "[costs]\nchp = 30.0\nheat_pump = 20.0\n").unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(format!("{err:#}").contains("chp"));

        let mut config = AssemblyConfig::default();
        config.feasibility.backstop_marginal_cost = 15.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_extension_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("assembly.ini");
        fs::write(&path, "").unwrap();
        assert!(load_config(&path).is_err());
    }
}
