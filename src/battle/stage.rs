//! Stage catalog

use serde::Serialize;

use crate::core::types::StageId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageInfo {
    pub id: StageId,
    pub name: &'static str,
    pub subtitle: &'static str,
    pub boss: bool,
}

const fn stage(id: StageId, name: &'static str, subtitle: &'static str, boss: bool) -> StageInfo {
    StageInfo {
        id,
        name,
        subtitle,
        boss,
    }
}

pub const STAGES: &[StageInfo] = &[
    stage(1, "Intern Orientation", "The First Day", false),
    stage(2, "Coffee Run", "Caffeine Emergency", false),
    stage(3, "Quarterly Review", "Performance Metrics", false),
    stage(4, "Severance Package", "Aggressive Negotiations", false),
    stage(5, "The Rage", "Burnout Critical", false),
    stage(6, "Meat Shield", "Defensive Perimeter", false),
    stage(7, "Baller's Rise", "Executive Takeover", false),
    stage(8, "Bullet Hell", "Infinite Barrage", false),
    stage(9, "Nine of a Kinds", "Total Chaos", false),
    stage(10, "No Mercy!", "The Shotgunner", true),
    stage(11, "Fourth Puncher", "Productivity Hack", false),
    stage(12, "Puncher Bros", "Synergy Strike Team", false),
    stage(13, "Cake Thrower", "Sweet Surprise", false),
    stage(14, "Stunlocking", "Builder, Baller, Battler & Cake Thrower", false),
    stage(15, "Alley Ambush", "Nowhere to Run", false),
    stage(16, "Street Holdout", "Urban Blockade", false),
    stage(17, "Tactical Breach", "Modern Warfare", false),
    stage(18, "Suppression Fire", "Bullet Rain", false),
    stage(19, "Heavy Ordinance", "Explosive Entry", false),
    stage(20, "The Bulldozer", "Demolition Crew", true),
    stage(21, "Iron Curtain", "Three Waves", false),
];

pub const MAX_STAGE: StageId = 21;

pub fn stage_info(id: StageId) -> Option<&'static StageInfo> {
    STAGES.iter().find(|s| s.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_ids_are_contiguous() {
        for (i, info) in STAGES.iter().enumerate() {
            assert_eq!(info.id, i as StageId + 1);
        }
        assert_eq!(STAGES.len() as StageId, MAX_STAGE);
    }

    #[test]
    fn test_boss_stages() {
        let bosses: Vec<StageId> = STAGES.iter().filter(|s| s.boss).map(|s| s.id).collect();
        assert_eq!(bosses, vec![10, 20]);
        assert!(stage_info(22).is_none());
    }
}
