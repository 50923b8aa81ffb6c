//! Attack resolution and on-hit effects
//!
//! Every attack goes through [`resolve_attack`], which deals damage to the
//! chosen targets and then applies the attacker's effect list in order.
//! Effects never add units directly; summons come back as pending spawns
//! that the engine merges after the tick.

use crate::battle::unit_type::{OnHitEffect, StunScope, UnitRoster};
use crate::battle::units::UnitInstance;
use crate::core::types::{InstanceId, Millis, Side};

/// A unit waiting to be added to the lane once the tick completes
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSpawn {
    pub unit_id: String,
    pub side: Side,
    pub x: f64,
}

/// What a single attack did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttackOutcome {
    /// Damage dealt per target, in hit order
    pub hits: Vec<(InstanceId, f64)>,
    pub displaced: Vec<InstanceId>,
    pub stunned: Vec<InstanceId>,
    pub summons: Vec<PendingSpawn>,
}

/// Inputs for one attack
pub struct Attack<'a> {
    pub attacker: usize,
    /// Target chosen by the targeting rule
    pub primary: usize,
    /// Every live opposing unit in range, in list order
    pub candidates: &'a [usize],
    pub damage: f64,
    pub effects: &'a [OnHitEffect],
    pub now: Millis,
}

/// Stuns and displacement only land on mobile, non-boss units
pub fn is_control_immune(roster: &UnitRoster, unit: &UnitInstance) -> bool {
    match roster.get(&unit.definition_id) {
        Some(def) => def.traits.boss || def.is_stationary(),
        None => false,
    }
}

/// Incoming damage multiplier for the unit's active form
pub fn damage_taken(roster: &UnitRoster, unit: &UnitInstance) -> f64 {
    let Some(def) = roster.get(&unit.definition_id) else {
        return 1.0;
    };
    match (&def.alt_form, unit.alt_form) {
        (Some(form), true) => form.stats.damage_taken,
        _ => def.stats.damage_taken,
    }
}

/// Pick the units an attack hits
///
/// Splash takes the nearest N candidates (ties keep list order); otherwise
/// only the primary target is hit.
pub fn select_targets(units: &[UnitInstance], attack: &Attack) -> Vec<usize> {
    let splash = attack.effects.iter().find_map(|effect| match effect {
        OnHitEffect::Splash { targets } => Some(*targets),
        _ => None,
    });

    match splash {
        Some(count) if count > 1 => {
            let origin = units[attack.attacker].x;
            let mut ordered: Vec<usize> = attack.candidates.to_vec();
            ordered.sort_by(|&a, &b| {
                let da = (units[a].x - origin).abs();
                let db = (units[b].x - origin).abs();
                da.total_cmp(&db)
            });
            ordered.truncate(count);
            ordered
        }
        _ => vec![attack.primary],
    }
}

/// Deal damage and apply on-hit effects for one attack
pub fn resolve_attack(
    units: &mut [UnitInstance],
    roster: &UnitRoster,
    attack: &Attack,
) -> AttackOutcome {
    let mut outcome = AttackOutcome::default();
    let targets = select_targets(units, attack);

    let debuff = attack.effects.iter().find_map(|effect| match effect {
        OnHitEffect::StackingDebuff { per_stack, max_stacks } => Some((*per_stack, *max_stacks)),
        _ => None,
    });

    for &index in &targets {
        let multiplier = damage_taken(roster, &units[index]);
        let target = &mut units[index];
        let stack_bonus = match debuff {
            Some((per_stack, _)) => 1.0 + target.debuff_stacks as f64 * per_stack,
            None => 1.0,
        };
        let dealt = attack.damage * stack_bonus * multiplier;
        target.hp -= dealt;
        if let Some((_, max_stacks)) = debuff {
            target.debuff_stacks = (target.debuff_stacks + 1).min(max_stacks);
        }
        outcome.hits.push((target.id, dealt));
    }

    let (origin, side) = (units[attack.attacker].x, units[attack.attacker].side);

    for effect in attack.effects {
        match effect {
            OnHitEffect::Splash { .. } | OnHitEffect::StackingDebuff { .. } => {}
            OnHitEffect::Displace { distance } => {
                for &index in &targets {
                    if is_control_immune(roster, &units[index]) {
                        continue;
                    }
                    units[index].shift(side.forward() * distance);
                    outcome.displaced.push(units[index].id);
                }
            }
            OnHitEffect::Stun {
                duration_ms,
                scope,
                once,
            } => {
                if *once && units[attack.attacker].ability_spent {
                    continue;
                }
                let affected: Vec<usize> = match scope {
                    StunScope::Target => targets.clone(),
                    StunScope::InRange => attack.candidates.to_vec(),
                    StunScope::AllOpposing => (0..units.len())
                        .filter(|&i| units[i].side != side && units[i].is_alive())
                        .collect(),
                };
                let expiry = attack.now + duration_ms;
                for index in affected {
                    if is_control_immune(roster, &units[index]) {
                        continue;
                    }
                    units[index].stun_until(expiry);
                    outcome.stunned.push(units[index].id);
                }
                if *once {
                    let attacker = &mut units[attack.attacker];
                    attacker.ability_spent = true;
                    attacker.last_ability = Some(attack.now);
                }
            }
            OnHitEffect::Summon {
                unit_id,
                interval_ms,
                offset,
            } => {
                let attacker = &mut units[attack.attacker];
                let ready = match attacker.last_ability {
                    None => true,
                    Some(last) => attack.now.saturating_sub(last) >= *interval_ms,
                };
                if ready {
                    attacker.last_ability = Some(attack.now);
                    outcome.summons.push(PendingSpawn {
                        unit_id: unit_id.clone(),
                        side,
                        x: origin + side.forward() * offset,
                    });
                }
            }
        }
    }

    outcome
}
