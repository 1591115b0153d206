//! Tunable planning knobs, baked in from YAML at compile time (spec.md
//! §4.G, §4.H).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChainPlannerConfig {
    /// Safety bound on backward-walk depth; prevents cyclic corp graphs
    /// from looping forever.
    pub max_depth: usize,
    /// Mint value per terminal resource, keyed by its serde name (spec.md
    /// §4.G "mint value (a platform-economy constant)").
    pub mint_values: BTreeMap<String, f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BankConfig {
    pub target_roi: f64,
    pub base_lending_rate: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AiConfig {
    pub chain_planner: ChainPlannerConfig,
    pub bank: BankConfig,
}

pub const AI_DEFAULTS_YAML: &str = include_str!("../../../assets/data/ai_defaults.yaml");

impl AiConfig {
    pub fn from_default_yaml() -> Result<AiConfig, serde_yaml::Error> {
        serde_yaml::from_str(AI_DEFAULTS_YAML)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_yaml_parses() {
        let cfg = AiConfig::from_default_yaml().unwrap();
        assert!(cfg.chain_planner.max_depth > 0);
        assert!(cfg.bank.target_roi > 0.0);
        assert!(cfg.chain_planner.mint_values.contains_key("rcl_progress"));
    }
}
