//! Boss phase state machine
//!
//! Bosses move through Opening -> Enraged -> LastStand as their hp drops.
//! The phase only ever moves forward. Entering LastStand runs a one-shot
//! script in the same tick: a partial heal, a wipe of every engaged ally
//! and a wave of reinforcements behind the boss.

use serde::{Deserialize, Serialize};

use crate::battle::constants::{
    BOSS_ENRAGED_COOLDOWN_MS, BOSS_ENRAGE_HP_FRACTION, BOSS_LAST_STAND_HEAL_FRACTION,
    BOSS_LAST_STAND_HP_FRACTION, BOSS_REINFORCEMENT_COUNT, BOSS_REINFORCEMENT_SPACING,
};
use crate::battle::stats::EffectiveStats;
use crate::battle::unit_type::OnHitEffect;
use crate::battle::units::{clamp_to_lane, UnitInstance};
use crate::core::types::{InstanceId, Millis};

/// Ordered boss phases; comparison follows progression
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum BossPhase {
    #[default]
    Opening,
    Enraged,
    LastStand,
}

/// Thresholds and script parameters for one boss
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BossPhaseProfile {
    /// Enraged below this fraction of max hp
    pub enrage_hp_fraction: f64,
    /// LastStand below this fraction of max hp
    pub last_stand_hp_fraction: f64,
    pub enraged_cooldown_ms: Millis,
    pub heal_fraction: f64,
    pub reinforcement_id: String,
    pub reinforcement_count: usize,
    pub reinforcement_spacing: f64,
}

impl Default for BossPhaseProfile {
    fn default() -> Self {
        Self {
            enrage_hp_fraction: BOSS_ENRAGE_HP_FRACTION,
            last_stand_hp_fraction: BOSS_LAST_STAND_HP_FRACTION,
            enraged_cooldown_ms: BOSS_ENRAGED_COOLDOWN_MS,
            heal_fraction: BOSS_LAST_STAND_HEAL_FRACTION,
            reinforcement_id: "e_battler".into(),
            reinforcement_count: BOSS_REINFORCEMENT_COUNT,
            reinforcement_spacing: BOSS_REINFORCEMENT_SPACING,
        }
    }
}

impl BossPhaseProfile {
    /// Phase implied by hp alone
    pub fn phase_for_hp(&self, hp: f64, max_hp: f64) -> BossPhase {
        if hp < max_hp * self.last_stand_hp_fraction {
            BossPhase::LastStand
        } else if hp < max_hp * self.enrage_hp_fraction {
            BossPhase::Enraged
        } else {
            BossPhase::Opening
        }
    }
}

/// Result of a phase check on one boss
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTransition {
    pub from: BossPhase,
    pub to: BossPhase,
}

impl PhaseTransition {
    /// True when this transition is the one that enters LastStand
    pub fn enters_last_stand(&self) -> bool {
        self.from < BossPhase::LastStand && self.to == BossPhase::LastStand
    }
}

/// Move the boss forward to the phase its hp implies, never backward
pub fn advance_phase(boss: &mut UnitInstance, profile: &BossPhaseProfile) -> Option<PhaseTransition> {
    let implied = profile.phase_for_hp(boss.hp, boss.max_hp);
    if implied <= boss.boss_phase {
        return None;
    }
    let transition = PhaseTransition {
        from: boss.boss_phase,
        to: implied,
    };
    boss.boss_phase = implied;
    Some(transition)
}

/// Adjust resolved stats for the boss's current phase
///
/// Enraged and LastStand attack on the short cooldown with a single target.
pub fn apply_phase_behavior(stats: &mut EffectiveStats, phase: BossPhase, profile: &BossPhaseProfile) {
    if phase == BossPhase::Opening {
        return;
    }
    stats.attack_cooldown_ms = profile.enraged_cooldown_ms;
    stats.effects
        .retain(|effect| !matches!(effect, OnHitEffect::Splash { .. }));
}

/// Whether the boss has dropped its ranged weapon (visual flag)
pub fn weapon_discarded(phase: BossPhase) -> bool {
    phase >= BossPhase::Enraged
}

/// Everything the LastStand script did
#[derive(Debug, Clone, PartialEq)]
pub struct LastStandOutcome {
    pub hp_after: f64,
    pub defeated: Vec<InstanceId>,
    /// Lane positions for reinforcement spawns
    pub reinforcement_positions: Vec<f64>,
}

/// Run the LastStand script
///
/// `boss_index` points into `units`. Every opposing unit within `range` of
/// the boss is defeated outright. Only call this on the transition that
/// enters LastStand.
pub fn execute_last_stand(
    units: &mut [UnitInstance],
    boss_index: usize,
    range: f64,
    profile: &BossPhaseProfile,
) -> LastStandOutcome {
    let (boss_x, boss_side) = {
        let boss = &mut units[boss_index];
        boss.hp = (boss.hp + boss.max_hp * profile.heal_fraction).min(boss.max_hp);
        (boss.x, boss.side)
    };
    let hp_after = units[boss_index].hp;

    let mut defeated = Vec::new();
    for unit in units.iter_mut() {
        if unit.side != boss_side && unit.is_alive() && (unit.x - boss_x).abs() <= range {
            unit.hp = 0.0;
            defeated.push(unit.id);
        }
    }

    // Behind the boss means further from the direction it travels
    let back = -boss_side.forward();
    let reinforcement_positions = (1..=profile.reinforcement_count)
        .map(|i| clamp_to_lane(boss_x + back * profile.reinforcement_spacing * i as f64))
        .collect();

    LastStandOutcome {
        hp_after,
        defeated,
        reinforcement_positions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Side;

    fn boss(hp: f64) -> UnitInstance {
        let mut unit = UnitInstance::new(InstanceId(1), "e_boss_shotgunner", Side::Hostile, 600.0, 1000.0);
        unit.hp = hp;
        unit
    }

    #[test]
    fn test_phase_for_hp_thresholds() {
        let profile = BossPhaseProfile::default();
        assert_eq!(profile.phase_for_hp(1000.0, 1000.0), BossPhase::Opening);
        assert_eq!(profile.phase_for_hp(500.0, 1000.0), BossPhase::Opening);
        assert_eq!(profile.phase_for_hp(499.0, 1000.0), BossPhase::Enraged);
        assert_eq!(profile.phase_for_hp(249.0, 1000.0), BossPhase::LastStand);
    }

    #[test]
    fn test_opening_can_jump_to_last_stand() {
        let profile = BossPhaseProfile::default();
        let mut unit = boss(100.0);
        let transition = advance_phase(&mut unit, &profile).unwrap();
        assert_eq!(transition.from, BossPhase::Opening);
        assert!(transition.enters_last_stand());
        assert_eq!(unit.boss_phase, BossPhase::LastStand);
    }

    #[test]
    fn test_phase_never_regresses_after_heal() {
        let profile = BossPhaseProfile::default();
        let mut unit = boss(400.0);
        advance_phase(&mut unit, &profile);
        assert_eq!(unit.boss_phase, BossPhase::Enraged);

        unit.hp = 1000.0;
        assert!(advance_phase(&mut unit, &profile).is_none());
        assert_eq!(unit.boss_phase, BossPhase::Enraged);
    }

    #[test]
    fn test_enraged_drops_splash_and_shortens_cooldown() {
        let profile = BossPhaseProfile::default();
        let mut stats = EffectiveStats {
            name: "Shotgunner".into(),
            alt_form: false,
            hp: 1000.0,
            damage: 10.0,
            speed: 1.0,
            range: 200.0,
            attack_cooldown_ms: 2500,
            cost: 0.0,
            spawn_cooldown_ms: 0,
            effects: vec![OnHitEffect::Splash { targets: 3 }],
            damage_taken: 1.0,
        };
        apply_phase_behavior(&mut stats, BossPhase::Opening, &profile);
        assert_eq!(stats.attack_cooldown_ms, 2500);

        apply_phase_behavior(&mut stats, BossPhase::Enraged, &profile);
        assert_eq!(stats.attack_cooldown_ms, 800);
        assert!(stats.effects.is_empty());
    }

    #[test]
    fn test_last_stand_heals_wipes_and_reinforces() {
        let profile = BossPhaseProfile::default();
        let mut units = vec![
            boss(200.0),
            UnitInstance::new(InstanceId(2), "tank", Side::Ally, 450.0, 900.0),
            UnitInstance::new(InstanceId(3), "pistoler", Side::Ally, 100.0, 185.0),
            UnitInstance::new(InstanceId(4), "e_battler", Side::Hostile, 590.0, 170.0),
        ];
        let outcome = execute_last_stand(&mut units, 0, 200.0, &profile);

        assert_eq!(units[0].hp, 500.0);
        assert_eq!(outcome.hp_after, 500.0);
        assert_eq!(outcome.defeated, vec![InstanceId(2)]);
        assert_eq!(units[1].hp, 0.0);
        assert!(units[2].is_alive());
        assert!(units[3].is_alive());
        assert_eq!(outcome.reinforcement_positions, vec![640.0, 680.0, 720.0]);
    }

    #[test]
    fn test_heal_capped_at_max_hp() {
        let profile = BossPhaseProfile::default();
        let mut units = vec![boss(900.0)];
        execute_last_stand(&mut units, 0, 100.0, &profile);
        assert_eq!(units[0].hp, 1000.0);
    }
}
