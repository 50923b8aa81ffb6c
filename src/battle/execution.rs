//! Battle execution loop
//!
//! Each tick: cooldowns -> income -> spawn -> units -> cleanup -> terminal

use std::collections::VecDeque;

use ahash::AHashMap;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::battle::boss::{
    advance_phase, apply_phase_behavior, execute_last_stand, BossPhase, BossPhaseProfile,
};
use crate::battle::constants::{LANE_LENGTH, MELEE_RANGE, SPEED_REFERENCE_MS};
use crate::battle::effects::{resolve_attack, Attack, PendingSpawn};
use crate::battle::loadout::BattleLoadout;
use crate::battle::rewards::{RewardPayload, RewardTable};
use crate::battle::spawn::{SpawnContext, SpawnDirector, SpawnDirectorState};
use crate::battle::stage::stage_info;
use crate::battle::stats::{resolve, EffectiveStats, HostileScaling, LevelContext};
use crate::battle::unit_type::{UnitDefinition, UnitRoster};
use crate::battle::units::UnitInstance;
use crate::core::config::BattleConfig;
use crate::core::types::{InstanceId, Millis, Side, StageId};

/// Log entry for battle events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleEvent {
    pub at: Millis,
    pub event_type: BattleEventType,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BattleEventType {
    UnitDeployed { instance: InstanceId, unit_id: String, side: Side },
    UnitDefeated { instance: InstanceId, unit_id: String, side: Side },
    StrongholdDamaged { side: Side, amount: f64 },
    BossPhaseChanged { instance: InstanceId, from: BossPhase, to: BossPhase },
    LastStand { instance: InstanceId, defeated: usize, reinforcements: usize },
    SpecialAttack { damage: f64 },
    WalletUpgraded { level: usize },
    BattleEnded { winner: Side },
}

/// Events from a single tick or command
#[derive(Debug, Clone, Default)]
pub struct BattleEventLog {
    pub events: Vec<BattleEvent>,
}

impl BattleEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event_type: BattleEventType, description: String, at: Millis) {
        self.events.push(BattleEvent {
            at,
            event_type,
            description,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BattleEvent> {
        self.events.iter()
    }
}

/// Bounded battle log shown to the player, newest line first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleLog {
    lines: VecDeque<String>,
    capacity: usize,
}

impl BattleLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push_front(line.into());
        self.lines.truncate(self.capacity);
    }

    pub fn lines(&self) -> impl Iterator<Item = &String> {
        self.lines.iter()
    }

    pub fn latest(&self) -> Option<&String> {
        self.lines.front()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Complete battle state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleState {
    pub stage: StageId,
    pub sandbox: bool,
    /// Sandbox-only spawn pause
    pub paused: bool,

    // Strongholds
    pub ally_stronghold_hp: f64,
    pub ally_stronghold_max_hp: f64,
    pub hostile_stronghold_hp: f64,
    pub hostile_stronghold_max_hp: f64,

    /// Live units; list order drives targeting
    pub units: Vec<UnitInstance>,
    pub next_instance: InstanceId,

    // Ally economy
    pub currency: f64,
    pub wallet_level: usize,

    // Time
    pub elapsed: Millis,
    pub special_ready_at: Millis,
    /// Last ally deploy time per unit id
    pub deploy_times: AHashMap<String, Millis>,

    // Outcome
    pub game_over: bool,
    pub winner: Option<Side>,
    pub pending_reward: Option<RewardPayload>,

    pub log: BattleLog,
    pub loadout: BattleLoadout,
}

impl BattleState {
    pub fn is_finished(&self) -> bool {
        self.game_over
    }

    pub fn unit(&self, id: InstanceId) -> Option<&UnitInstance> {
        self.units.iter().find(|u| u.id == id)
    }

    pub fn count_side(&self, side: Side) -> usize {
        self.units.iter().filter(|u| u.side == side).count()
    }

    fn allocate_id(&mut self) -> InstanceId {
        let id = self.next_instance;
        self.next_instance = id.next();
        id
    }
}

/// Authoritative battle: engine state plus the spawn director's state
#[derive(Debug, Clone)]
pub struct Battle {
    pub state: BattleState,
    pub director: SpawnDirectorState,
}

/// Damage and spawns collected while units act, applied after all units
#[derive(Debug, Default)]
struct TickScratch {
    pending: Vec<PendingSpawn>,
    ally_stronghold_damage: f64,
    hostile_stronghold_damage: f64,
}

/// Static battle rules: config, roster, spawn policies, scaling, rewards
#[derive(Debug, Clone)]
pub struct CombatEngine {
    pub config: BattleConfig,
    pub roster: UnitRoster,
    pub director: SpawnDirector,
    pub scaling: HostileScaling,
    pub rewards: RewardTable,
}

impl Default for CombatEngine {
    fn default() -> Self {
        Self::new(BattleConfig::default(), UnitRoster::with_defaults())
    }
}

impl CombatEngine {
    pub fn new(config: BattleConfig, roster: UnitRoster) -> Self {
        Self {
            config,
            roster,
            director: SpawnDirector::with_defaults(),
            scaling: HostileScaling::default(),
            rewards: RewardTable::default(),
        }
    }

    pub fn with_director(mut self, director: SpawnDirector) -> Self {
        self.director = director;
        self
    }

    pub fn with_scaling(mut self, scaling: HostileScaling) -> Self {
        self.scaling = scaling;
        self
    }

    pub fn with_rewards(mut self, rewards: RewardTable) -> Self {
        self.rewards = rewards;
        self
    }

    /// Fresh battle and director state for a stage
    pub fn start_battle(&self, stage: StageId, sandbox: bool, loadout: BattleLoadout) -> Battle {
        let stronghold_hp = self.config.stronghold_hp(stage);
        let ally_bonus = loadout.base_health_level.saturating_sub(1) as f64
            * self.config.ally_stronghold_gain_per_level;
        let currency = self.config.starting_money(loadout.starting_budget_level);

        let mut log = BattleLog::new(self.config.battle_log_capacity);
        match stage_info(stage) {
            Some(info) => log.push(format!("Stage {}: {}. Deployment authorized.", stage, info.name)),
            None => log.push(format!("Stage {} initiated. Deployment authorized.", stage)),
        }

        info!(stage, sandbox, "Battle started");

        Battle {
            state: BattleState {
                stage,
                sandbox,
                paused: false,
                ally_stronghold_hp: stronghold_hp + ally_bonus,
                ally_stronghold_max_hp: stronghold_hp + ally_bonus,
                hostile_stronghold_hp: stronghold_hp,
                hostile_stronghold_max_hp: stronghold_hp,
                units: Vec::new(),
                next_instance: InstanceId(1),
                currency,
                wallet_level: 0,
                elapsed: 0,
                special_ready_at: 0,
                deploy_times: AHashMap::new(),
                game_over: false,
                winner: None,
                pending_reward: None,
                log,
                loadout,
            },
            director: SpawnDirectorState::new(self.config.hostile_initial_money),
        }
    }

    /// Level context for a unit id under the battle's loadout
    fn level_context(&self, state: &BattleState, definition: &UnitDefinition) -> LevelContext {
        match definition.side {
            Side::Ally => state.loadout.level_context(&definition.id, &self.config),
            Side::Hostile => LevelContext::base(&self.config),
        }
    }

    /// Stats for a new deployment of `definition`
    pub fn deploy_stats(&self, state: &BattleState, definition: &UnitDefinition) -> EffectiveStats {
        let ctx = self.level_context(state, definition);
        resolve(definition, &ctx, state.stage, &self.scaling)
    }

    /// Stats for a unit already on the lane, honoring the form it deployed in
    pub fn instance_stats(
        &self,
        state: &BattleState,
        definition: &UnitDefinition,
        unit: &UnitInstance,
    ) -> EffectiveStats {
        let mut ctx = self.level_context(state, definition);
        ctx.prefer_alt = unit.alt_form;
        resolve(definition, &ctx, state.stage, &self.scaling)
    }

    /// Build an instance without adding it to the lane
    fn make_instance(
        &self,
        state: &mut BattleState,
        definition: &UnitDefinition,
        side: Side,
        x: f64,
    ) -> UnitInstance {
        let stats = self.deploy_stats(state, definition);
        let id = state.allocate_id();
        let mut unit = UnitInstance::new(id, &definition.id, side, x, stats.hp);
        unit.alt_form = stats.alt_form;
        unit
    }

    /// Append a unit at `x`; unknown ids add nothing
    pub fn spawn_unit(
        &self,
        state: &mut BattleState,
        unit_id: &str,
        side: Side,
        x: f64,
    ) -> Option<InstanceId> {
        let Some(definition) = self.roster.get(unit_id) else {
            warn!(unit = unit_id, "Cannot spawn unknown unit");
            return None;
        };
        let unit = self.make_instance(state, definition, side, x);
        let id = unit.id;
        state.units.push(unit);
        Some(id)
    }

    /// Advance the battle by `dt` milliseconds
    pub fn advance<R: Rng + ?Sized>(
        &self,
        battle: &mut Battle,
        rng: &mut R,
        dt: Millis,
    ) -> BattleEventLog {
        let mut events = BattleEventLog::new();

        if battle.state.is_finished() {
            return events;
        }

        battle.state.elapsed += dt;

        // ===== PHASE 1: COOLDOWNS =====
        battle.director.decay(dt);

        // ===== PHASE 2: INCOME =====
        self.phase_income(battle, dt);

        // ===== PHASE 3: SPAWN =====
        self.phase_spawn(battle, rng, &mut events);

        // ===== PHASE 4: UNITS =====
        let mut scratch = TickScratch::default();
        self.phase_units(&mut battle.state, dt, &mut scratch, &mut events);

        // ===== PHASE 5: CLEANUP =====
        self.phase_cleanup(&mut battle.state, scratch, &mut events);

        events
    }

    fn phase_income(&self, battle: &mut Battle, dt: Millis) {
        let config = &self.config;
        let state = &mut battle.state;
        let money_ticks = dt as f64 / config.money_tick_interval_ms as f64;

        let multiplier = config
            .wallet_multipliers
            .get(state.wallet_level)
            .copied()
            .unwrap_or(1.0);
        let ally_rate = state.loadout.bank_income(config) * multiplier;
        state.currency = (state.currency + ally_rate * money_ticks).min(config.currency_cap);

        let hostile_rate =
            config.hostile_income_base + state.stage as f64 * config.hostile_income_per_stage;
        battle.director.currency += hostile_rate * money_ticks;
    }

    fn phase_spawn<R: Rng + ?Sized>(
        &self,
        battle: &mut Battle,
        rng: &mut R,
        events: &mut BattleEventLog,
    ) {
        let state = &mut battle.state;
        if state.elapsed <= self.config.spawn_grace_ms || state.paused {
            return;
        }

        let ctx = SpawnContext {
            stage: state.stage,
            elapsed: state.elapsed,
            units: &state.units,
            stronghold_hp: state.hostile_stronghold_hp,
            stronghold_max_hp: state.hostile_stronghold_max_hp,
            roster: &self.roster,
        };
        let Some(command) = self.director.evaluate(&ctx, &battle.director, rng) else {
            return;
        };

        let cost = self
            .roster
            .get(&command.unit_id)
            .map_or(0.0, |def| def.stats.cost);
        battle.director.apply(&command, cost);

        if let Some(instance) = self.spawn_unit(state, &command.unit_id, Side::Hostile, LANE_LENGTH) {
            events.push(
                BattleEventType::UnitDeployed {
                    instance,
                    unit_id: command.unit_id.clone(),
                    side: Side::Hostile,
                },
                format!("Hostile {} deployed", command.unit_id),
                state.elapsed,
            );
            if command.sets_boss_flag {
                let name = self
                    .roster
                    .get(&command.unit_id)
                    .map_or(command.unit_id.as_str(), |def| def.name.as_str());
                state.log.push(format!("WARNING: {} has entered the field!", name));
            }
        }
    }

    fn phase_units(
        &self,
        state: &mut BattleState,
        dt: Millis,
        scratch: &mut TickScratch,
        events: &mut BattleEventLog,
    ) {
        let now = state.elapsed;

        for i in 0..state.units.len() {
            let unit = &state.units[i];
            if !unit.is_alive() || unit.is_stunned(now) {
                continue;
            }
            let Some(definition) = self.roster.get(&unit.definition_id) else {
                warn!(
                    instance = unit.id.0,
                    unit = %unit.definition_id,
                    "Skipping unit with unknown definition"
                );
                continue;
            };
            if definition.traits.inert {
                continue;
            }

            let mut stats = self.instance_stats(state, definition, unit);

            if let Some(profile) = &definition.traits.boss_phases {
                self.run_boss_phases(state, i, stats.range, profile, scratch, events);
                apply_phase_behavior(&mut stats, state.units[i].boss_phase, profile);
            }

            let unit = &state.units[i];
            if let Some(enrage) = definition.traits.enrage {
                if unit.hp < unit.max_hp * enrage.hp_fraction {
                    stats.attack_cooldown_ms = enrage.attack_cooldown_ms;
                }
            }
            if definition.traits.melee_after_ability && unit.ability_spent {
                stats.range = MELEE_RANGE;
            }

            let candidates = find_candidates(&state.units, i, stats.range);
            let target = self.pick_target(&state.units, i, &candidates);
            let side = unit.side;
            let ready = unit.can_attack(now, stats.attack_cooldown_ms);
            let at_stronghold = unit.distance_to_stronghold() <= stats.range;

            if let Some(primary) = target {
                if ready {
                    state.units[i].last_attack = Some(now);
                    let attack = Attack {
                        attacker: i,
                        primary,
                        candidates: &candidates,
                        damage: stats.damage,
                        effects: &stats.effects,
                        now,
                    };
                    let outcome = resolve_attack(&mut state.units, &self.roster, &attack);
                    scratch.pending.extend(outcome.summons);
                }
            } else if at_stronghold {
                if ready {
                    state.units[i].last_attack = Some(now);
                    match side {
                        Side::Ally if now > self.config.stronghold_grace_ms => {
                            scratch.hostile_stronghold_damage += stats.damage;
                        }
                        Side::Ally => {}
                        Side::Hostile => scratch.ally_stronghold_damage += stats.damage,
                    }
                }
            } else {
                let step = stats.speed * dt as f64 / SPEED_REFERENCE_MS;
                state.units[i].shift(side.forward() * step);
            }
        }
    }

    /// Hostile attackers prefer a priority target; otherwise first in list order
    fn pick_target(&self, units: &[UnitInstance], attacker: usize, candidates: &[usize]) -> Option<usize> {
        if units[attacker].side == Side::Hostile {
            let priority = candidates.iter().copied().find(|&c| {
                self.roster
                    .get(&units[c].definition_id)
                    .is_some_and(|def| def.traits.priority_target)
            });
            if priority.is_some() {
                return priority;
            }
        }
        candidates.first().copied()
    }

    fn run_boss_phases(
        &self,
        state: &mut BattleState,
        index: usize,
        range: f64,
        profile: &BossPhaseProfile,
        scratch: &mut TickScratch,
        events: &mut BattleEventLog,
    ) {
        let now = state.elapsed;
        let Some(transition) = advance_phase(&mut state.units[index], profile) else {
            return;
        };
        let boss_id = state.units[index].id;
        debug!(
            instance = boss_id.0,
            from = ?transition.from,
            to = ?transition.to,
            "Boss phase transition"
        );
        events.push(
            BattleEventType::BossPhaseChanged {
                instance: boss_id,
                from: transition.from,
                to: transition.to,
            },
            format!("Boss entered {:?}", transition.to),
            now,
        );
        if transition.to >= BossPhase::Enraged && transition.from == BossPhase::Opening {
            state.log.push("The boss throws its weapon aside!");
        }

        if !transition.enters_last_stand() {
            return;
        }

        let outcome = execute_last_stand(&mut state.units, index, range, profile);
        let side = state.units[index].side;
        for x in &outcome.reinforcement_positions {
            scratch.pending.push(PendingSpawn {
                unit_id: profile.reinforcement_id.clone(),
                side,
                x: *x,
            });
        }
        state.log.push(format!(
            "LAST STAND! The boss wipes out {} units and calls reinforcements.",
            outcome.defeated.len()
        ));
        events.push(
            BattleEventType::LastStand {
                instance: boss_id,
                defeated: outcome.defeated.len(),
                reinforcements: outcome.reinforcement_positions.len(),
            },
            format!("Boss healed to {:.0}", outcome.hp_after),
            now,
        );
    }

    fn phase_cleanup(&self, state: &mut BattleState, scratch: TickScratch, events: &mut BattleEventLog) {
        let now = state.elapsed;

        for unit in state.units.iter().filter(|u| !u.is_alive()) {
            events.push(
                BattleEventType::UnitDefeated {
                    instance: unit.id,
                    unit_id: unit.definition_id.clone(),
                    side: unit.side,
                },
                format!("{} defeated", unit.definition_id),
                now,
            );
        }
        state.units.retain(|u| u.is_alive());

        for pending in scratch.pending {
            if let Some(instance) = self.spawn_unit(state, &pending.unit_id, pending.side, pending.x) {
                events.push(
                    BattleEventType::UnitDeployed {
                        instance,
                        unit_id: pending.unit_id.clone(),
                        side: pending.side,
                    },
                    format!("{} summoned", pending.unit_id),
                    now,
                );
            }
        }

        if scratch.ally_stronghold_damage > 0.0 {
            state.ally_stronghold_hp = (state.ally_stronghold_hp - scratch.ally_stronghold_damage).max(0.0);
            events.push(
                BattleEventType::StrongholdDamaged {
                    side: Side::Ally,
                    amount: scratch.ally_stronghold_damage,
                },
                format!("Ally stronghold hit for {:.1}", scratch.ally_stronghold_damage),
                now,
            );
        }
        if scratch.hostile_stronghold_damage > 0.0 {
            state.hostile_stronghold_hp =
                (state.hostile_stronghold_hp - scratch.hostile_stronghold_damage).max(0.0);
            events.push(
                BattleEventType::StrongholdDamaged {
                    side: Side::Hostile,
                    amount: scratch.hostile_stronghold_damage,
                },
                format!("Hostile stronghold hit for {:.1}", scratch.hostile_stronghold_damage),
                now,
            );
        }

        if let Some(winner) = check_battle_end(state) {
            self.end_battle(state, winner, events);
        }
    }

    /// Record the winner once and issue the reward on an ally win
    fn end_battle(&self, state: &mut BattleState, winner: Side, events: &mut BattleEventLog) {
        if state.game_over {
            return;
        }
        state.game_over = true;
        state.winner = Some(winner);

        match winner {
            Side::Ally => state.log.push("Hostile stronghold destroyed. Victory!"),
            Side::Hostile => state.log.push("Our stronghold has fallen."),
        }
        info!(stage = state.stage, winner = ?winner, elapsed = state.elapsed, "Battle ended");
        events.push(
            BattleEventType::BattleEnded { winner },
            format!("Battle ended: {:?} wins", winner),
            state.elapsed,
        );

        if winner == Side::Ally && !state.sandbox {
            state.pending_reward = Some(self.rewards.reward_for(
                state.stage,
                !state.loadout.stage_cleared,
                state.loadout.boss_bonus_claimed,
            ));
        }
    }
}

/// Live opposing units within `range` of the attacker, in list order
pub fn find_candidates(units: &[UnitInstance], attacker: usize, range: f64) -> Vec<usize> {
    let me = &units[attacker];
    units
        .iter()
        .enumerate()
        .filter(|(_, other)| other.side != me.side && other.is_alive())
        .filter(|(_, other)| (other.x - me.x).abs() <= range)
        .map(|(j, _)| j)
        .collect()
}

/// Winner implied by stronghold hp; the ally stronghold is checked first
pub fn check_battle_end(state: &BattleState) -> Option<Side> {
    if state.ally_stronghold_hp <= 0.0 {
        return Some(Side::Hostile);
    }
    if state.hostile_stronghold_hp <= 0.0 {
        return Some(Side::Ally);
    }
    None
}
