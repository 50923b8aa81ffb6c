//! Live unit instances on the lane

use serde::{Deserialize, Serialize};

use crate::battle::boss::BossPhase;
use crate::battle::constants::LANE_LENGTH;
use crate::core::types::{InstanceId, Millis, Side};

/// A stateful occurrence of a unit definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitInstance {
    pub id: InstanceId,
    pub definition_id: String,
    pub side: Side,
    /// Lane position, always within `[0, LANE_LENGTH]`
    pub x: f64,
    pub hp: f64,
    /// Hp at spawn, after level or stage scaling
    pub max_hp: f64,
    /// `None` until the first attack, so fresh units may strike immediately
    pub last_attack: Option<Millis>,
    /// Last summon or one-shot ability use
    pub last_ability: Option<Millis>,
    pub alt_form: bool,

    // Status
    pub stunned_until: Millis,
    /// Stacking-debuff hits taken
    pub debuff_stacks: u32,
    /// One-shot ability already used
    pub ability_spent: bool,
    pub boss_phase: BossPhase,
}

impl UnitInstance {
    pub fn new(id: InstanceId, definition_id: &str, side: Side, x: f64, hp: f64) -> Self {
        Self {
            id,
            definition_id: definition_id.to_string(),
            side,
            x: clamp_to_lane(x),
            hp,
            max_hp: hp,
            last_attack: None,
            last_ability: None,
            alt_form: false,
            stunned_until: 0,
            debuff_stacks: 0,
            ability_spent: false,
            boss_phase: BossPhase::Opening,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0.0
    }

    pub fn is_stunned(&self, now: Millis) -> bool {
        self.stunned_until > now
    }

    /// Cooldown check: strictly more than `cooldown_ms` since the last attack
    pub fn can_attack(&self, now: Millis, cooldown_ms: Millis) -> bool {
        match self.last_attack {
            None => true,
            Some(last) => now.saturating_sub(last) > cooldown_ms,
        }
    }

    /// Lane distance to the opposing stronghold
    pub fn distance_to_stronghold(&self) -> f64 {
        match self.side {
            Side::Ally => LANE_LENGTH - self.x,
            Side::Hostile => self.x,
        }
    }

    /// Move along the lane by a signed amount, clamped to lane bounds
    pub fn shift(&mut self, dx: f64) {
        self.x = clamp_to_lane(self.x + dx);
    }

    /// Extend the stun window; an earlier expiry never shortens it
    pub fn stun_until(&mut self, expiry: Millis) {
        self.stunned_until = self.stunned_until.max(expiry);
    }
}

pub fn clamp_to_lane(x: f64) -> f64 {
    x.clamp(0.0, LANE_LENGTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(side: Side, x: f64) -> UnitInstance {
        UnitInstance::new(InstanceId(1), "e_battler", side, x, 100.0)
    }

    #[test]
    fn test_new_unit_clamped() {
        assert_eq!(unit(Side::Hostile, 1200.0).x, LANE_LENGTH);
        assert_eq!(unit(Side::Ally, -5.0).x, 0.0);
    }

    #[test]
    fn test_can_attack_strictly_after_cooldown() {
        let mut u = unit(Side::Ally, 0.0);
        assert!(u.can_attack(0, 1000));
        u.last_attack = Some(500);
        assert!(!u.can_attack(1500, 1000));
        assert!(u.can_attack(1501, 1000));
    }

    #[test]
    fn test_stun_refresh_keeps_later_expiry() {
        let mut u = unit(Side::Hostile, 500.0);
        u.stun_until(3000);
        u.stun_until(2000);
        assert_eq!(u.stunned_until, 3000);
        assert!(u.is_stunned(2999));
        assert!(!u.is_stunned(3000));
    }

    #[test]
    fn test_distance_to_stronghold() {
        assert_eq!(unit(Side::Ally, 700.0).distance_to_stronghold(), 300.0);
        assert_eq!(unit(Side::Hostile, 700.0).distance_to_stronghold(), 700.0);
    }

    #[test]
    fn test_shift_clamps() {
        let mut u = unit(Side::Ally, 990.0);
        u.shift(50.0);
        assert_eq!(u.x, LANE_LENGTH);
        u.shift(-2000.0);
        assert_eq!(u.x, 0.0);
    }
}
