//! Read-only view of a battle for renderers and the JSON runner

use serde::Serialize;

use crate::battle::boss::{weapon_discarded, BossPhase};
use crate::battle::execution::{Battle, CombatEngine};
use crate::battle::rewards::RewardPayload;
use crate::core::types::{InstanceId, Millis, Side, StageId};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitView {
    pub id: InstanceId,
    pub unit_id: String,
    pub name: String,
    pub side: Side,
    pub x: f64,
    pub hp: f64,
    pub max_hp: f64,
    pub alt_form: bool,
    pub stunned: bool,
    pub debuff_stacks: u32,
    /// Only set for units with a boss phase profile
    pub boss_phase: Option<BossPhase>,
    pub weapon_discarded: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BattleSnapshot {
    pub stage: StageId,
    pub sandbox: bool,
    pub paused: bool,
    pub elapsed: Millis,
    pub ally_stronghold_hp: f64,
    pub ally_stronghold_max_hp: f64,
    pub hostile_stronghold_hp: f64,
    pub hostile_stronghold_max_hp: f64,
    pub currency: f64,
    pub wallet_level: usize,
    /// None once the wallet is maxed
    pub wallet_upgrade_cost: Option<f64>,
    pub special_ready_in: Millis,
    pub units: Vec<UnitView>,
    pub log: Vec<String>,
    pub game_over: bool,
    pub winner: Option<Side>,
    pub reward: Option<RewardPayload>,
}

impl CombatEngine {
    pub fn snapshot(&self, battle: &Battle) -> BattleSnapshot {
        let state = &battle.state;
        let units = state
            .units
            .iter()
            .map(|unit| {
                let definition = self.roster.get(&unit.definition_id);
                let boss_phase = definition
                    .and_then(|def| def.traits.boss_phases.as_ref())
                    .map(|_| unit.boss_phase);
                let name = definition.map_or_else(
                    || unit.definition_id.clone(),
                    |def| match (&def.alt_form, unit.alt_form) {
                        (Some(alt), true) => alt.name.clone(),
                        _ => def.name.clone(),
                    },
                );
                UnitView {
                    id: unit.id,
                    unit_id: unit.definition_id.clone(),
                    name,
                    side: unit.side,
                    x: unit.x,
                    hp: unit.hp,
                    max_hp: unit.max_hp,
                    alt_form: unit.alt_form,
                    stunned: unit.is_stunned(state.elapsed),
                    debuff_stacks: unit.debuff_stacks,
                    boss_phase,
                    weapon_discarded: boss_phase.is_some_and(weapon_discarded),
                }
            })
            .collect();

        let wallet_upgrade_cost = if state.wallet_level < self.config.max_wallet_level() {
            self.config.wallet_upgrade_costs.get(state.wallet_level).copied()
        } else {
            None
        };

        BattleSnapshot {
            stage: state.stage,
            sandbox: state.sandbox,
            paused: state.paused,
            elapsed: state.elapsed,
            ally_stronghold_hp: state.ally_stronghold_hp,
            ally_stronghold_max_hp: state.ally_stronghold_max_hp,
            hostile_stronghold_hp: state.hostile_stronghold_hp,
            hostile_stronghold_max_hp: state.hostile_stronghold_max_hp,
            currency: state.currency,
            wallet_level: state.wallet_level,
            wallet_upgrade_cost,
            special_ready_in: state.special_ready_at.saturating_sub(state.elapsed),
            units,
            log: state.log.lines().cloned().collect(),
            game_over: state.game_over,
            winner: state.winner,
            reward: state.pending_reward.clone(),
        }
    }
}
