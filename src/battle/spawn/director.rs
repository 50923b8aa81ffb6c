//! Spawn director: decides at most one hostile spawn per tick

use ahash::AHashMap;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::battle::spawn::policy::{
    default_policies, BossPolicy, CompositionPolicy, PriorityRule, RollGroup, StagePolicy,
};
use crate::battle::unit_type::UnitRoster;
use crate::battle::units::UnitInstance;
use crate::core::error::Result;
use crate::core::types::{Millis, Side, StageId};

/// Read-only battlefield view handed to the director
pub struct SpawnContext<'a> {
    pub stage: StageId,
    pub elapsed: Millis,
    pub units: &'a [UnitInstance],
    pub stronghold_hp: f64,
    pub stronghold_max_hp: f64,
    pub roster: &'a UnitRoster,
}

/// Director-owned state, reset at battle start
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpawnDirectorState {
    /// Remaining cooldown per unit id; missing ids are ready
    pub cooldowns: AHashMap<String, Millis>,
    pub currency: f64,
    pub boss_spawned: bool,
}

impl SpawnDirectorState {
    pub fn new(currency: f64) -> Self {
        Self {
            cooldowns: AHashMap::new(),
            currency,
            boss_spawned: false,
        }
    }

    pub fn cooldown(&self, unit_id: &str) -> Millis {
        self.cooldowns.get(unit_id).copied().unwrap_or(0)
    }

    /// Count every cooldown down by `dt`, flooring at zero
    pub fn decay(&mut self, dt: Millis) {
        for remaining in self.cooldowns.values_mut() {
            *remaining = remaining.saturating_sub(dt);
        }
    }

    /// Record a granted command: cooldown, currency and boss flag
    pub fn apply(&mut self, command: &SpawnCommand, cost: f64) {
        self.cooldowns
            .insert(command.unit_id.clone(), command.cooldown_ms);
        if !command.cost_exempt {
            self.currency -= cost;
        }
        if command.sets_boss_flag {
            self.boss_spawned = true;
        }
    }
}

/// A granted spawn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnCommand {
    pub unit_id: String,
    pub cooldown_ms: Millis,
    pub sets_boss_flag: bool,
    pub cost_exempt: bool,
}

impl SpawnCommand {
    fn regular(unit_id: &str, cooldown_ms: Millis) -> Self {
        Self {
            unit_id: unit_id.to_string(),
            cooldown_ms,
            sets_boss_flag: false,
            cost_exempt: false,
        }
    }
}

/// Stage policy table plus evaluation
#[derive(Debug, Clone, Default)]
pub struct SpawnDirector {
    policies: AHashMap<StageId, Vec<StagePolicy>>,
}

#[derive(Deserialize)]
struct TomlStage {
    stage: StageId,
    policies: Vec<StagePolicy>,
}

#[derive(Deserialize)]
struct TomlPolicies {
    stages: Vec<TomlStage>,
}

impl SpawnDirector {
    /// Director with no stages; nothing ever spawns
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        Self {
            policies: default_policies(),
        }
    }

    pub fn set_policy(&mut self, stage: StageId, layers: Vec<StagePolicy>) {
        self.policies.insert(stage, layers);
    }

    pub fn policy(&self, stage: StageId) -> Option<&[StagePolicy]> {
        self.policies.get(&stage).map(Vec::as_slice)
    }

    /// Override stage policies from TOML (`[[stages]]` with `stage` and `policies`)
    pub fn parse_toml(&mut self, content: &str) -> Result<()> {
        let data: TomlPolicies = toml::from_str(content)?;
        for entry in data.stages {
            self.set_policy(entry.stage, entry.policies);
        }
        Ok(())
    }

    /// Decide at most one spawn for this tick
    ///
    /// Every returned command passes its cooldown and currency gate, except
    /// the cost-exempt boss spawn.
    pub fn evaluate<R: Rng + ?Sized>(
        &self,
        ctx: &SpawnContext,
        state: &SpawnDirectorState,
        rng: &mut R,
    ) -> Option<SpawnCommand> {
        let layers = self.policies.get(&ctx.stage)?;
        let command = layers
            .iter()
            .find_map(|layer| evaluate_layer(layer, ctx, state, rng));
        if let Some(command) = &command {
            debug!(
                stage = ctx.stage,
                unit = %command.unit_id,
                elapsed = ctx.elapsed,
                "Spawn director granted spawn"
            );
        }
        command
    }
}

/// Off cooldown and affordable
fn can_spawn(unit_id: &str, ctx: &SpawnContext, state: &SpawnDirectorState) -> bool {
    let Some(def) = ctx.roster.get(unit_id) else {
        return false;
    };
    state.cooldown(unit_id) == 0 && state.currency >= def.stats.cost
}

fn evaluate_layer<R: Rng + ?Sized>(
    layer: &StagePolicy,
    ctx: &SpawnContext,
    state: &SpawnDirectorState,
    rng: &mut R,
) -> Option<SpawnCommand> {
    match layer {
        StagePolicy::FlatProbability { groups } => roll_groups(groups, ctx, state, rng),
        StagePolicy::Priority { rules } => first_rule(rules, ctx, state),
        StagePolicy::Composition(policy) => compose(policy, ctx, state, rng),
        StagePolicy::Boss(policy) => boss(policy, ctx, state),
    }
}

fn roll_groups<R: Rng + ?Sized>(
    groups: &[RollGroup],
    ctx: &SpawnContext,
    state: &SpawnDirectorState,
    rng: &mut R,
) -> Option<SpawnCommand> {
    for group in groups {
        let chance: f64 = rng.gen();
        let hit = group
            .entries
            .iter()
            .find(|entry| chance < entry.threshold && can_spawn(&entry.unit_id, ctx, state));
        if let Some(entry) = hit {
            return Some(SpawnCommand::regular(&entry.unit_id, entry.cooldown_ms));
        }
    }
    None
}

fn first_rule(
    rules: &[PriorityRule],
    ctx: &SpawnContext,
    state: &SpawnDirectorState,
) -> Option<SpawnCommand> {
    rules
        .iter()
        .find(|rule| {
            rule.gate
                .is_open(ctx.elapsed, ctx.stronghold_hp, ctx.stronghold_max_hp)
                && can_spawn(&rule.unit_id, ctx, state)
        })
        .map(|rule| SpawnCommand::regular(&rule.unit_id, rule.cooldown_ms))
}

fn pick_uniform<R: Rng + ?Sized>(
    pool: &[String],
    ctx: &SpawnContext,
    state: &SpawnDirectorState,
    rng: &mut R,
) -> Option<SpawnCommand> {
    let available: Vec<&String> = pool
        .iter()
        .filter(|id| can_spawn(id, ctx, state))
        .collect();
    if available.is_empty() {
        return None;
    }
    let pick = available[rng.gen_range(0..available.len())];
    let cooldown = ctx.roster.get(pick).map_or(0, |def| def.spawn_cooldown_ms);
    Some(SpawnCommand::regular(pick, cooldown))
}

fn compose<R: Rng + ?Sized>(
    policy: &CompositionPolicy,
    ctx: &SpawnContext,
    state: &SpawnDirectorState,
    rng: &mut R,
) -> Option<SpawnCommand> {
    let frontliners = ctx
        .units
        .iter()
        .filter(|u| u.side == Side::Hostile && u.is_alive())
        .filter(|u| policy.frontline_roles.contains(&u.definition_id))
        .count();

    if frontliners < policy.frontline_floor {
        return pick_uniform(&policy.frontline, ctx, state, rng);
    }
    pick_uniform(&policy.backline, ctx, state, rng).or_else(|| {
        if state.currency > policy.surplus_threshold {
            pick_uniform(&policy.frontline, ctx, state, rng)
        } else {
            None
        }
    })
}

fn boss(policy: &BossPolicy, ctx: &SpawnContext, state: &SpawnDirectorState) -> Option<SpawnCommand> {
    if state.boss_spawned {
        return first_rule(&policy.support, ctx, state);
    }
    if ctx.elapsed > policy.delay_ms {
        let cost_exempt = ctx
            .roster
            .get(&policy.boss_id)
            .map_or(true, |def| def.traits.cost_exempt);
        return Some(SpawnCommand {
            unit_id: policy.boss_id.clone(),
            cooldown_ms: 0,
            sets_boss_flag: true,
            cost_exempt,
        });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::InstanceId;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn ctx<'a>(stage: StageId, elapsed: Millis, units: &'a [UnitInstance], roster: &'a UnitRoster) -> SpawnContext<'a> {
        SpawnContext {
            stage,
            elapsed,
            units,
            stronghold_hp: 5500.0,
            stronghold_max_hp: 5500.0,
            roster,
        }
    }

    #[test]
    fn test_decay_floors_at_zero() {
        let mut state = SpawnDirectorState::new(0.0);
        state.cooldowns.insert("e_battler".into(), 50);
        state.cooldowns.insert("e_baller".into(), 5000);
        state.decay(100);
        assert_eq!(state.cooldown("e_battler"), 0);
        assert_eq!(state.cooldown("e_baller"), 4900);
        assert_eq!(state.cooldown("e_unknown"), 0);
    }

    #[test]
    fn test_apply_debits_unless_exempt() {
        let mut state = SpawnDirectorState::new(500.0);
        state.apply(&SpawnCommand::regular("e_battler", 1500), 80.0);
        assert_eq!(state.currency, 420.0);
        assert_eq!(state.cooldown("e_battler"), 1500);

        let boss = SpawnCommand {
            unit_id: "e_boss_shotgunner".into(),
            cooldown_ms: 0,
            sets_boss_flag: true,
            cost_exempt: true,
        };
        state.apply(&boss, 9999.0);
        assert_eq!(state.currency, 420.0);
        assert!(state.boss_spawned);
    }

    #[test]
    fn test_priority_picks_first_affordable() {
        let roster = UnitRoster::with_defaults();
        let director = SpawnDirector::with_defaults();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut state = SpawnDirectorState::new(300.0);

        // Stage 7: baller (250) first
        let cmd = director.evaluate(&ctx(7, 6000, &[], &roster), &state, &mut rng).unwrap();
        assert_eq!(cmd, SpawnCommand::regular("e_baller", 8000));

        // Baller on cooldown: battler next
        state.cooldowns.insert("e_baller".into(), 100);
        let cmd = director.evaluate(&ctx(7, 6000, &[], &roster), &state, &mut rng).unwrap();
        assert_eq!(cmd.unit_id, "e_battler");
    }

    #[test]
    fn test_pressure_gate_on_stage_six() {
        let roster = UnitRoster::with_defaults();
        let director = SpawnDirector::with_defaults();
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut state = SpawnDirectorState::new(250.0);
        state.cooldowns.insert("e_battler".into(), 1000);
        state.cooldowns.insert("e_double_puncher".into(), 1000);

        // Pistoler gate closed: only the skirmish fallback could fire, and
        // both of its units are on cooldown
        assert!(director.evaluate(&ctx(6, 10_000, &[], &roster), &state, &mut rng).is_none());

        let mut pressured = ctx(6, 10_000, &[], &roster);
        pressured.stronghold_hp = 4000.0;
        let cmd = director.evaluate(&pressured, &state, &mut rng).unwrap();
        assert_eq!(cmd, SpawnCommand::regular("e_pistoler", 8000));
    }

    #[test]
    fn test_boss_waits_then_spawns_once() {
        let roster = UnitRoster::with_defaults();
        let director = SpawnDirector::with_defaults();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut state = SpawnDirectorState::new(0.0);

        assert!(director.evaluate(&ctx(10, 2000, &[], &roster), &state, &mut rng).is_none());

        let cmd = director.evaluate(&ctx(10, 2001, &[], &roster), &state, &mut rng).unwrap();
        assert_eq!(cmd.unit_id, "e_boss_shotgunner");
        assert!(cmd.sets_boss_flag && cmd.cost_exempt);

        state.apply(&cmd, 9999.0);
        assert!(director.evaluate(&ctx(10, 2034, &[], &roster), &state, &mut rng).is_none());

        state.currency = 1000.0;
        let cmd = director.evaluate(&ctx(10, 2067, &[], &roster), &state, &mut rng).unwrap();
        assert_eq!(cmd, SpawnCommand::regular("e_baller", 10_000));
    }

    #[test]
    fn test_composition_refills_frontline() {
        let roster = UnitRoster::with_defaults();
        let director = SpawnDirector::with_defaults();
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let state = SpawnDirectorState::new(1000.0);

        let cmd = director.evaluate(&ctx(9, 6000, &[], &roster), &state, &mut rng).unwrap();
        assert!(["e_battler", "e_double_puncher", "e_rage_battler"].contains(&cmd.unit_id.as_str()));
        let def = roster.get(&cmd.unit_id).unwrap();
        assert_eq!(cmd.cooldown_ms, def.spawn_cooldown_ms);
    }

    #[test]
    fn test_composition_builds_backline_when_frontline_full() {
        let roster = UnitRoster::with_defaults();
        let director = SpawnDirector::with_defaults();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let state = SpawnDirectorState::new(1000.0);
        let units: Vec<UnitInstance> = (0..4)
            .map(|i| UnitInstance::new(InstanceId(i), "e_wall", Side::Hostile, 900.0, 335.0))
            .collect();

        let cmd = director.evaluate(&ctx(9, 6000, &units, &roster), &state, &mut rng).unwrap();
        assert!(["e_baller", "e_pistoler", "e_builder"].contains(&cmd.unit_id.as_str()));
    }

    #[test]
    fn test_unknown_stage_never_spawns() {
        let roster = UnitRoster::with_defaults();
        let director = SpawnDirector::with_defaults();
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let state = SpawnDirectorState::new(1_000_000.0);
        assert!(director.evaluate(&ctx(99, 60_000, &[], &roster), &state, &mut rng).is_none());
    }

    #[test]
    fn test_parse_toml_overrides_stage() {
        let roster = UnitRoster::with_defaults();
        let mut director = SpawnDirector::with_defaults();
        director
            .parse_toml(
                r#"
                [[stages]]
                stage = 1

                [[stages.policies]]
                kind = "priority"
                rules = [{ unit_id = "e_enforcer", cooldown_ms = 9000 }]
                "#,
            )
            .expect("policy toml should parse");
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let state = SpawnDirectorState::new(500.0);
        let cmd = director.evaluate(&ctx(1, 6000, &[], &roster), &state, &mut rng).unwrap();
        assert_eq!(cmd, SpawnCommand::regular("e_enforcer", 9000));
    }
}
