//! Player commands applied at tick boundaries
//!
//! Rejected commands change nothing. The reason is returned for callers
//! that care and logged at debug level.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::battle::constants::LANE_LENGTH;
use crate::battle::execution::{Battle, BattleEventLog, BattleEventType, BattleState, CombatEngine};
use crate::core::types::Side;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum BattleCommand {
    Deploy {
        side: Side,
        unit_id: String,
        #[serde(default)]
        lane_x: Option<f64>,
    },
    FireSpecialAttack,
    UpgradeWallet,
    /// Sandbox only: stop or resume hostile spawning
    SetPaused { paused: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    BattleOver,
    UnknownUnit,
    /// The unit belongs to the other roster
    WrongSide,
    OnCooldown,
    Unaffordable,
    NotSandbox,
    MaxLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Applied,
    Rejected(RejectReason),
}

impl CommandOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, CommandOutcome::Applied)
    }
}

impl CombatEngine {
    /// Apply one command between ticks
    pub fn apply_command(
        &self,
        battle: &mut Battle,
        command: &BattleCommand,
        events: &mut BattleEventLog,
    ) -> CommandOutcome {
        let state = &mut battle.state;
        let outcome = if state.is_finished() {
            CommandOutcome::Rejected(RejectReason::BattleOver)
        } else {
            match command {
                BattleCommand::Deploy {
                    side,
                    unit_id,
                    lane_x,
                } => self.deploy(state, *side, unit_id, *lane_x, events),
                BattleCommand::FireSpecialAttack => self.fire_special_attack(state, events),
                BattleCommand::UpgradeWallet => self.upgrade_wallet(state, events),
                BattleCommand::SetPaused { paused } => {
                    if state.sandbox {
                        state.paused = *paused;
                        CommandOutcome::Applied
                    } else {
                        CommandOutcome::Rejected(RejectReason::NotSandbox)
                    }
                }
            }
        };

        if let CommandOutcome::Rejected(reason) = outcome {
            debug!(?command, ?reason, "Command rejected");
        }
        outcome
    }

    fn deploy(
        &self,
        state: &mut BattleState,
        side: Side,
        unit_id: &str,
        lane_x: Option<f64>,
        events: &mut BattleEventLog,
    ) -> CommandOutcome {
        let Some(definition) = self.roster.get(unit_id) else {
            return CommandOutcome::Rejected(RejectReason::UnknownUnit);
        };
        if definition.side != side {
            return CommandOutcome::Rejected(RejectReason::WrongSide);
        }

        let x = match side {
            Side::Ally => {
                if let Some(&last) = state.deploy_times.get(unit_id) {
                    if state.elapsed.saturating_sub(last) < definition.spawn_cooldown_ms {
                        return CommandOutcome::Rejected(RejectReason::OnCooldown);
                    }
                }
                let cost = self.deploy_stats(state, definition).cost;
                if state.currency < cost {
                    return CommandOutcome::Rejected(RejectReason::Unaffordable);
                }
                state.currency -= cost;
                state.deploy_times.insert(unit_id.to_string(), state.elapsed);
                lane_x.unwrap_or(0.0)
            }
            // Sandbox deploys are free
            Side::Hostile => {
                if !state.sandbox {
                    return CommandOutcome::Rejected(RejectReason::NotSandbox);
                }
                lane_x.unwrap_or(LANE_LENGTH)
            }
        };

        if let Some(instance) = self.spawn_unit(state, unit_id, side, x) {
            events.push(
                BattleEventType::UnitDeployed {
                    instance,
                    unit_id: unit_id.to_string(),
                    side,
                },
                format!("{} deployed", definition.name),
                state.elapsed,
            );
        }
        CommandOutcome::Applied
    }

    fn fire_special_attack(&self, state: &mut BattleState, events: &mut BattleEventLog) -> CommandOutcome {
        if state.elapsed < state.special_ready_at {
            return CommandOutcome::Rejected(RejectReason::OnCooldown);
        }

        let damage = state.loadout.special_damage(&self.config);
        for unit in state.units.iter_mut().filter(|u| u.side == Side::Hostile) {
            unit.hp -= damage;
        }
        for unit in state.units.iter().filter(|u| !u.is_alive()) {
            events.push(
                BattleEventType::UnitDefeated {
                    instance: unit.id,
                    unit_id: unit.definition_id.clone(),
                    side: unit.side,
                },
                format!("{} defeated", unit.definition_id),
                state.elapsed,
            );
        }
        state.units.retain(|u| u.is_alive());

        let stronghold_damage = damage * self.config.special_stronghold_fraction;
        state.hostile_stronghold_hp = (state.hostile_stronghold_hp - stronghold_damage).max(0.0);
        state.special_ready_at = state.elapsed + self.config.special_cooldown_ms;

        state.log.push(format!("Special attack hits every hostile for {:.0}.", damage));
        events.push(
            BattleEventType::SpecialAttack { damage },
            format!("Special attack for {:.0}", damage),
            state.elapsed,
        );
        CommandOutcome::Applied
    }

    fn upgrade_wallet(&self, state: &mut BattleState, events: &mut BattleEventLog) -> CommandOutcome {
        if state.wallet_level >= self.config.max_wallet_level() {
            return CommandOutcome::Rejected(RejectReason::MaxLevel);
        }
        let Some(&cost) = self.config.wallet_upgrade_costs.get(state.wallet_level) else {
            return CommandOutcome::Rejected(RejectReason::MaxLevel);
        };
        if state.currency < cost {
            return CommandOutcome::Rejected(RejectReason::Unaffordable);
        }
        state.currency -= cost;
        state.wallet_level += 1;
        events.push(
            BattleEventType::WalletUpgraded {
                level: state.wallet_level,
            },
            format!("Wallet upgraded to level {}", state.wallet_level),
            state.elapsed,
        );
        CommandOutcome::Applied
    }
}
