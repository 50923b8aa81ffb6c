//! Victory rewards

use serde::{Deserialize, Serialize};

use crate::core::types::StageId;

/// Reward tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardTable {
    pub coins_per_stage: f64,
    pub first_clear_multiplier: f64,
    /// Replaces the first-clear multiplier on boss stages
    pub boss_clear_multiplier: f64,
    pub xp_per_win: u32,
    pub boss_diamonds: u32,
    pub boss_stages: Vec<StageId>,
}

impl Default for RewardTable {
    fn default() -> Self {
        Self {
            coins_per_stage: 225.0,
            first_clear_multiplier: 3.25,
            boss_clear_multiplier: 5.5,
            xp_per_win: 100,
            boss_diamonds: 50,
            boss_stages: vec![10, 20],
        }
    }
}

impl RewardTable {
    pub fn is_boss_stage(&self, stage: StageId) -> bool {
        self.boss_stages.contains(&stage)
    }

    /// Reward for winning `stage`
    pub fn reward_for(&self, stage: StageId, first_clear: bool, boss_claimed: bool) -> RewardPayload {
        let boss_stage = self.is_boss_stage(stage);
        let multiplier = match (first_clear, boss_stage) {
            (true, true) => self.boss_clear_multiplier,
            (true, false) => self.first_clear_multiplier,
            (false, _) => 1.0,
        };
        let boss_first_clear = boss_stage && first_clear && !boss_claimed;
        RewardPayload {
            stage,
            coins: (stage as f64 * self.coins_per_stage * multiplier).floor() as u64,
            diamonds: if boss_first_clear { self.boss_diamonds } else { 0 },
            xp: self.xp_per_win,
            first_clear,
            boss_first_clear,
        }
    }
}

/// Emitted exactly once when the ally side wins outside sandbox mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardPayload {
    pub stage: StageId,
    pub coins: u64,
    pub diamonds: u32,
    pub xp: u32,
    pub first_clear: bool,
    pub boss_first_clear: bool,
}
