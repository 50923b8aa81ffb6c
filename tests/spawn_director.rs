//! Spawn director integration tests

use lane_battle::battle::*;
use lane_battle::core::types::{InstanceId, Side, StageId};
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn hostile_deploys(events: &BattleEventLog) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match &e.event_type {
            BattleEventType::UnitDeployed {
                unit_id,
                side: Side::Hostile,
                ..
            } => Some(unit_id.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn test_boss_arrives_first_and_only_once() {
    let engine = CombatEngine::default();
    let mut battle = engine.start_battle(10, false, BattleLoadout::default());
    let mut rng = ChaCha8Rng::seed_from_u64(10);

    let mut spawned = Vec::new();
    for _ in 0..2400 {
        let events = engine.advance(&mut battle, &mut rng, TICK_INTERVAL_MS);
        spawned.extend(hostile_deploys(&events));
    }

    assert_eq!(spawned.first().map(String::as_str), Some("e_boss_shotgunner"));
    assert_eq!(spawned.iter().filter(|id| *id == "e_boss_shotgunner").count(), 1);
    assert!(battle.director.boss_spawned);
}

#[test]
fn test_boss_warning_logged() {
    let engine = CombatEngine::default();
    let mut battle = engine.start_battle(10, false, BattleLoadout::default());
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    while !battle.director.boss_spawned {
        engine.advance(&mut battle, &mut rng, TICK_INTERVAL_MS);
    }
    assert!(battle.state.elapsed > engine.config.spawn_grace_ms);
    let latest = battle.state.log.latest().cloned().unwrap_or_default();
    assert!(latest.starts_with("WARNING"));
}

#[test]
fn test_director_currency_never_negative_in_battle() {
    for stage in [2, 6, 9, 13, 17] {
        let engine = CombatEngine::default();
        let mut battle = engine.start_battle(stage, false, BattleLoadout::default());
        let mut rng = ChaCha8Rng::seed_from_u64(stage as u64);
        let mut spawns = 0;
        for _ in 0..1800 {
            let events = engine.advance(&mut battle, &mut rng, TICK_INTERVAL_MS);
            spawns += hostile_deploys(&events).len();
            assert!(battle.director.currency >= 0.0, "stage {} went negative", stage);
        }
        assert!(spawns > 0, "stage {} never spawned", stage);
    }
}

#[test]
fn test_hostiles_enter_at_far_end() {
    let engine = CombatEngine::default();
    let mut battle = engine.start_battle(7, false, BattleLoadout::default());
    battle.director.currency = 10_000.0;
    let mut rng = ChaCha8Rng::seed_from_u64(12);
    while battle.state.count_side(Side::Hostile) == 0 {
        engine.advance(&mut battle, &mut rng, TICK_INTERVAL_MS);
    }
    let hostile = battle
        .state
        .units
        .iter()
        .find(|u| u.side == Side::Hostile)
        .map(|u| u.x)
        .unwrap_or_default();
    // Spawned at the far end, then takes its first step in the same tick
    assert!(hostile <= LANE_LENGTH && hostile > LANE_LENGTH - 10.0);
}

#[test]
fn test_stage_one_battler_is_weakened() {
    let engine = CombatEngine::default();
    let mut battle = engine.start_battle(1, false, BattleLoadout::default());
    engine.spawn_unit(&mut battle.state, "e_battler", Side::Hostile, LANE_LENGTH);
    assert!((battle.state.units[0].max_hp - 127.5).abs() < 1e-9);

    let battler = engine.roster.get("e_battler").expect("default roster has battlers");
    assert!((engine.deploy_stats(&battle.state, battler).damage - 13.5).abs() < 1e-9);
}

fn any_stage() -> impl Strategy<Value = StageId> {
    1u32..=21
}

proptest! {
    #[test]
    fn prop_granted_spawns_pass_their_gate(
        stage in any_stage(),
        currency in 0.0f64..2500.0,
        elapsed in 0u64..240_000,
        seed in any::<u64>(),
        boss_spawned in any::<bool>(),
        cooling in prop::collection::vec((0usize..8, 0u64..20_000), 0..6),
        walls in 0usize..6,
    ) {
        let ids = [
            "e_battler", "e_double_puncher", "e_pistoler", "e_builder",
            "e_baller", "e_enforcer", "e_tactical_trooper", "e_rage_battler",
        ];
        let roster = UnitRoster::with_defaults();
        let director = SpawnDirector::with_defaults();
        let mut state = SpawnDirectorState::new(currency);
        state.boss_spawned = boss_spawned;
        for (i, remaining) in cooling {
            state.cooldowns.insert(ids[i].to_string(), remaining);
        }
        let units: Vec<UnitInstance> = (0..walls)
            .map(|i| UnitInstance::new(InstanceId(i as u32 + 1), "e_wall", Side::Hostile, 900.0, 335.0))
            .collect();
        let ctx = SpawnContext {
            stage,
            elapsed,
            units: &units,
            stronghold_hp: 1000.0,
            stronghold_max_hp: 2000.0,
            roster: &roster,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        if let Some(command) = director.evaluate(&ctx, &state, &mut rng) {
            let def = roster.get(&command.unit_id);
            prop_assert!(def.is_some());
            if command.cost_exempt {
                prop_assert!(command.sets_boss_flag);
                prop_assert!(!boss_spawned);
            } else {
                prop_assert_eq!(state.cooldown(&command.unit_id), 0);
                prop_assert!(state.currency >= def.map_or(f64::MAX, |d| d.stats.cost));
            }
        }
    }
}
