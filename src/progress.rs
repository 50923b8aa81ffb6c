//! Persistent player progress between battles
//!
//! The engine never writes progress during a battle. A finished battle
//! hands out a `RewardPayload`, which is folded in here and saved.

use std::fs;
use std::path::{Path, PathBuf};

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::battle::loadout::BattleLoadout;
use crate::battle::rewards::RewardPayload;
use crate::battle::stage::MAX_STAGE;
use crate::core::error::Result;
use crate::core::types::StageId;

/// XP needed to leave player level `level`
pub fn xp_to_level(level: u32) -> u32 {
    level * 150
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Progress {
    pub player_level: u32,
    pub xp: u32,
    pub coins: u64,
    pub diamonds: u32,
    pub unit_levels: AHashMap<String, u32>,
    pub preferred_forms: AHashMap<String, bool>,
    /// Unit ids available in the deploy bar
    pub lineup: Vec<String>,
    pub unlocked_stages: Vec<StageId>,
    pub claimed_boss_stages: Vec<StageId>,
    pub cannon_level: u32,
    pub bank_level: u32,
    pub starting_budget_level: u32,
    pub base_health_level: u32,
}

impl Default for Progress {
    fn default() -> Self {
        let mut unit_levels = AHashMap::new();
        unit_levels.insert("baby".to_string(), 1);
        Self {
            player_level: 1,
            xp: 0,
            coins: 0,
            diamonds: 0,
            unit_levels,
            preferred_forms: AHashMap::new(),
            lineup: vec!["baby".to_string()],
            unlocked_stages: vec![1],
            claimed_boss_stages: Vec::new(),
            cannon_level: 1,
            bank_level: 1,
            starting_budget_level: 1,
            base_health_level: 1,
        }
    }
}

impl Progress {
    pub fn is_unlocked(&self, stage: StageId) -> bool {
        self.unlocked_stages.contains(&stage)
    }

    /// A stage counts as cleared once the next one is unlocked
    pub fn is_cleared(&self, stage: StageId) -> bool {
        self.unlocked_stages.contains(&(stage + 1))
    }

    /// Snapshot of upgrades for one battle on `stage`
    pub fn loadout(&self, stage: StageId) -> BattleLoadout {
        BattleLoadout {
            unit_levels: self.unit_levels.clone(),
            preferred_forms: self.preferred_forms.clone(),
            bank_level: self.bank_level,
            cannon_level: self.cannon_level,
            starting_budget_level: self.starting_budget_level,
            base_health_level: self.base_health_level,
            stage_cleared: self.is_cleared(stage),
            boss_bonus_claimed: self.claimed_boss_stages.contains(&stage),
        }
    }

    /// Fold a victory into progress; returns true on a player level-up
    pub fn apply_reward(&mut self, reward: &RewardPayload) -> bool {
        self.coins += reward.coins;
        self.diamonds += reward.diamonds;

        let mut leveled = false;
        self.xp += reward.xp;
        while self.xp >= xp_to_level(self.player_level) {
            self.xp -= xp_to_level(self.player_level);
            self.player_level += 1;
            leveled = true;
        }

        let next = reward.stage + 1;
        if next <= MAX_STAGE && !self.is_unlocked(next) {
            self.unlocked_stages.push(next);
        }
        if reward.boss_first_clear && !self.claimed_boss_stages.contains(&reward.stage) {
            self.claimed_boss_stages.push(reward.stage);
        }

        info!(
            stage = reward.stage,
            coins = reward.coins,
            player_level = self.player_level,
            "Reward applied"
        );
        leveled
    }
}

/// Where progress lives between runs
pub trait ProgressStore {
    fn load(&self) -> Result<Progress>;
    fn save(&self, progress: &Progress) -> Result<()>;
}

/// Pretty-printed JSON file; a missing or corrupt file loads as fresh progress
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ProgressStore for JsonFileStore {
    fn load(&self) -> Result<Progress> {
        let json = match fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Progress::default()),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str(&json) {
            Ok(progress) => Ok(progress),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Unreadable progress, starting fresh");
                Ok(Progress::default())
            }
        }
    }

    fn save(&self, progress: &Progress) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(progress)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::rewards::RewardTable;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("lane_battle_{}_{}.json", name, std::process::id()))
    }

    #[test]
    fn test_win_unlocks_next_stage() {
        let mut progress = Progress::default();
        assert!(!progress.loadout(1).stage_cleared);

        let reward = RewardTable::default().reward_for(1, true, false);
        progress.apply_reward(&reward);
        assert!(progress.is_unlocked(2));
        assert!(progress.loadout(1).stage_cleared);
        assert_eq!(progress.coins, 731);
    }

    #[test]
    fn test_xp_level_up() {
        let mut progress = Progress::default();
        let reward = RewardTable::default().reward_for(1, false, false);
        assert!(!progress.apply_reward(&reward));
        assert!(progress.apply_reward(&reward));
        assert_eq!(progress.player_level, 2);
        assert_eq!(progress.xp, 50);
    }

    #[test]
    fn test_last_stage_unlocks_nothing() {
        let mut progress = Progress::default();
        let reward = RewardTable::default().reward_for(MAX_STAGE, true, false);
        progress.apply_reward(&reward);
        assert!(!progress.is_unlocked(MAX_STAGE + 1));
    }

    #[test]
    fn test_boss_bonus_claimed_once() {
        let mut progress = Progress::default();
        let reward = RewardTable::default().reward_for(10, true, false);
        progress.apply_reward(&reward);
        assert_eq!(progress.diamonds, 50);
        assert!(progress.loadout(10).boss_bonus_claimed);

        let loadout = progress.loadout(10);
        let replay = RewardTable::default().reward_for(10, !loadout.stage_cleared, loadout.boss_bonus_claimed);
        progress.apply_reward(&replay);
        assert_eq!(progress.diamonds, 50);
        assert_eq!(progress.claimed_boss_stages, vec![10]);
    }

    #[test]
    fn test_json_store_roundtrip() {
        let path = temp_path("roundtrip");
        let store = JsonFileStore::new(&path);
        let mut progress = Progress::default();
        progress.coins = 1234;
        progress.unit_levels.insert("tank".into(), 3);
        store.save(&progress).unwrap();

        assert_eq!(store.load().unwrap(), progress);
        fs::remove_file(path).ok();
    }

    #[test]
    fn test_json_store_missing_or_corrupt_is_fresh() {
        let path = temp_path("corrupt");
        let store = JsonFileStore::new(&path);
        assert_eq!(store.load().unwrap(), Progress::default());

        fs::write(&path, "{ not json").unwrap();
        assert_eq!(store.load().unwrap(), Progress::default());
        fs::remove_file(path).ok();
    }
}
