//! Battle configuration with documented constants
//!
//! Every economy and pacing number the tick engine reads lives here.
//! Lane geometry and the tick cadence are fixed and live in
//! `battle::constants` instead.

use serde::{Deserialize, Serialize};

use crate::core::error::{Result, SimError};
use crate::core::types::{Millis, StageId};

/// Configuration for a battle session
///
/// Defaults reproduce the shipped game balance. A TOML file may override
/// any subset of fields; missing keys keep their default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleConfig {
    // === ALLY ECONOMY ===
    /// Ally currency at battle start before starting-budget upgrades
    pub initial_money: f64,

    /// Extra starting currency per starting-budget upgrade level above 1
    pub starting_budget_gain_per_level: f64,

    /// Income unit length in milliseconds
    ///
    /// Income rates below are "per money tick"; a tick delta of `dt`
    /// accrues `rate * dt / money_tick_interval_ms`.
    pub money_tick_interval_ms: Millis,

    /// Hard ceiling on the ally in-battle balance
    pub currency_cap: f64,

    /// Bank income per money tick at bank level 1
    pub bank_income_base: f64,

    /// Bank income added per bank level above 1
    pub bank_income_per_level: f64,

    /// Income multiplier per in-battle wallet level (index = level)
    pub wallet_multipliers: Vec<f64>,

    /// Cost to raise the wallet from level `i` to `i + 1`
    ///
    /// Must have the same length as `wallet_multipliers`. The last entry
    /// is never charged because the wallet caps at `len - 1`.
    pub wallet_upgrade_costs: Vec<f64>,

    // === HOSTILE ECONOMY ===
    /// Hostile currency at battle start
    pub hostile_initial_money: f64,

    /// Hostile income per money tick is `base + stage * per_stage`
    pub hostile_income_base: f64,
    pub hostile_income_per_stage: f64,

    // === PACING ===
    /// No hostile spawns until this much battle time has passed
    pub spawn_grace_ms: Millis,

    /// Ally hits on the hostile stronghold do nothing until this much
    /// battle time has passed (the attack cooldown is still consumed)
    pub stronghold_grace_ms: Millis,

    // === STAT GROWTH ===
    /// Fractional hp/damage gain per ally unit level above 1
    pub growth_rate: f64,

    /// Minimum unit level at which the alternate form can be fielded
    pub alt_form_level: u32,

    // === SPECIAL ATTACK ===
    pub special_cooldown_ms: Millis,
    pub special_base_damage: f64,
    pub special_damage_per_level: f64,

    /// Fraction of the special attack damage dealt to the hostile stronghold
    pub special_stronghold_fraction: f64,

    // === STRONGHOLDS ===
    /// Stronghold hp is `base + (stage - 1) * per_stage`
    pub stronghold_base_hp: f64,
    pub stronghold_hp_per_stage: f64,

    /// Extra ally stronghold hp per base-health upgrade level above 1
    pub ally_stronghold_gain_per_level: f64,

    // === LOG ===
    /// Number of lines the battle log ring buffer keeps
    pub battle_log_capacity: usize,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            initial_money: 50.0,
            starting_budget_gain_per_level: 55.0,
            money_tick_interval_ms: 100,
            currency_cap: 999_999.0,
            bank_income_base: 0.75,
            bank_income_per_level: 0.50,
            wallet_multipliers: vec![1.0, 1.8, 3.2, 5.5, 9.0, 15.0],
            wallet_upgrade_costs: vec![150.0, 450.0, 1200.0, 3000.0, 7500.0, 18000.0],

            hostile_initial_money: 50.0,
            hostile_income_base: 1.0,
            hostile_income_per_stage: 1.0,

            spawn_grace_ms: 5000,
            stronghold_grace_ms: 5000,

            growth_rate: 0.20,
            alt_form_level: 10,

            special_cooldown_ms: 30_000,
            special_base_damage: 50.0,
            special_damage_per_level: 50.0,
            special_stronghold_fraction: 0.5,

            stronghold_base_hp: 500.0,
            stronghold_hp_per_stage: 1000.0,
            ally_stronghold_gain_per_level: 500.0,

            battle_log_capacity: 10,
        }
    }
}

impl BattleConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a config from a TOML file
    pub fn load_from_toml(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_toml(&content)
    }

    /// Parse a config from a TOML string and validate it
    pub fn parse_toml(content: &str) -> Result<Self> {
        let config: BattleConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.wallet_multipliers.is_empty() {
            return Err(SimError::InvalidConfig(
                "wallet_multipliers must not be empty".into(),
            ));
        }

        if self.wallet_multipliers.len() != self.wallet_upgrade_costs.len() {
            return Err(SimError::InvalidConfig(format!(
                "wallet_multipliers ({}) and wallet_upgrade_costs ({}) differ in length",
                self.wallet_multipliers.len(),
                self.wallet_upgrade_costs.len()
            )));
        }

        if self.money_tick_interval_ms == 0 {
            return Err(SimError::InvalidConfig(
                "money_tick_interval_ms must be positive".into(),
            ));
        }

        if self.battle_log_capacity == 0 {
            return Err(SimError::InvalidConfig(
                "battle_log_capacity must be positive".into(),
            ));
        }

        if self.growth_rate < 0.0 {
            return Err(SimError::InvalidConfig("growth_rate must not be negative".into()));
        }

        Ok(())
    }

    /// Stronghold max hp for a stage (hostile side, and ally before upgrades)
    pub fn stronghold_hp(&self, stage: StageId) -> f64 {
        self.stronghold_base_hp + stage.saturating_sub(1) as f64 * self.stronghold_hp_per_stage
    }

    /// Ally starting currency for a starting-budget upgrade level
    pub fn starting_money(&self, starting_budget_level: u32) -> f64 {
        self.initial_money
            + starting_budget_level.saturating_sub(1) as f64 * self.starting_budget_gain_per_level
    }

    /// Highest reachable wallet level
    pub fn max_wallet_level(&self) -> usize {
        self.wallet_multipliers.len().saturating_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(BattleConfig::default().validate().is_ok());
    }

    #[test]
    fn test_stronghold_hp_scales_with_stage() {
        let config = BattleConfig::default();
        assert_eq!(config.stronghold_hp(1), 500.0);
        assert_eq!(config.stronghold_hp(6), 5500.0);
    }

    #[test]
    fn test_starting_money_per_budget_level() {
        let config = BattleConfig::default();
        assert_eq!(config.starting_money(1), 50.0);
        assert_eq!(config.starting_money(3), 160.0);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = BattleConfig::parse_toml("initial_money = 500.0\nspawn_grace_ms = 0\n")
            .expect("partial config should parse");
        assert_eq!(config.initial_money, 500.0);
        assert_eq!(config.spawn_grace_ms, 0);
        assert_eq!(config.growth_rate, 0.20);
    }

    #[test]
    fn test_mismatched_wallet_tables_rejected() {
        let result = BattleConfig::parse_toml("wallet_multipliers = [1.0, 2.0]\n");
        assert!(matches!(result, Err(SimError::InvalidConfig(_))));
    }

    #[test]
    fn test_max_wallet_level() {
        assert_eq!(BattleConfig::default().max_wallet_level(), 5);
    }
}
