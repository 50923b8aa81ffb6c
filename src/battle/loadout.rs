//! Per-battle snapshot of the player's persistent upgrades

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::battle::stats::LevelContext;
use crate::core::config::BattleConfig;

/// Everything the engine needs from the player's progress
///
/// Built from saved progress at battle start and never written back
/// during the battle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleLoadout {
    pub unit_levels: AHashMap<String, u32>,
    /// Alternate form preference per unit; missing entries prefer the alt form
    pub preferred_forms: AHashMap<String, bool>,
    pub bank_level: u32,
    pub cannon_level: u32,
    pub starting_budget_level: u32,
    pub base_health_level: u32,
    /// The stage has been cleared before (no first-clear bonus)
    pub stage_cleared: bool,
    /// The stage's boss bonus was already claimed
    pub boss_bonus_claimed: bool,
}

impl Default for BattleLoadout {
    fn default() -> Self {
        Self {
            unit_levels: AHashMap::new(),
            preferred_forms: AHashMap::new(),
            bank_level: 1,
            cannon_level: 1,
            starting_budget_level: 1,
            base_health_level: 1,
            stage_cleared: false,
            boss_bonus_claimed: false,
        }
    }
}

impl BattleLoadout {
    pub fn unit_level(&self, unit_id: &str) -> u32 {
        self.unit_levels.get(unit_id).copied().unwrap_or(1).max(1)
    }

    pub fn prefers_alt(&self, unit_id: &str) -> bool {
        self.preferred_forms.get(unit_id).copied().unwrap_or(true)
    }

    pub fn level_context(&self, unit_id: &str, config: &BattleConfig) -> LevelContext {
        LevelContext::new(self.unit_level(unit_id), self.prefers_alt(unit_id), config)
    }

    /// Ally income per money tick before the wallet multiplier
    pub fn bank_income(&self, config: &BattleConfig) -> f64 {
        config.bank_income_base
            + self.bank_level.saturating_sub(1) as f64 * config.bank_income_per_level
    }

    pub fn special_damage(&self, config: &BattleConfig) -> f64 {
        config.special_base_damage
            + self.cannon_level.saturating_sub(1) as f64 * config.special_damage_per_level
    }
}
