//! Battle system integration tests

use lane_battle::battle::*;
use lane_battle::core::config::BattleConfig;
use lane_battle::core::types::{Millis, Side};
use lane_battle::progress::Progress;
use proptest::prelude::*;

fn deploy(unit_id: &str) -> BattleCommand {
    BattleCommand::Deploy {
        side: Side::Ally,
        unit_id: unit_id.into(),
        lane_x: None,
    }
}

/// Run until the battle ends or `max_ms` of battle time passes
fn run_until_over(session: &mut BattleSession, max_ms: Millis) {
    let mut elapsed = 0;
    while session.is_running() && elapsed < max_ms {
        session.tick(TICK_INTERVAL_MS);
        elapsed += TICK_INTERVAL_MS;
    }
}

#[test]
fn test_full_battle_ally_victory_and_reward() {
    let config = BattleConfig {
        initial_money: 1000.0,
        ..BattleConfig::default()
    };
    let engine = CombatEngine::new(config, UnitRoster::with_defaults())
        .with_director(SpawnDirector::new());
    let mut session = BattleSession::new(engine, 11);
    let mut progress = Progress::default();

    session.start_battle(1, false, progress.loadout(1));
    session.enqueue(deploy("baby"));
    run_until_over(&mut session, 120_000);

    let snapshot = session.snapshot().expect("battle should exist");
    assert!(snapshot.game_over);
    assert_eq!(snapshot.winner, Some(Side::Ally));
    assert_eq!(snapshot.hostile_stronghold_hp, 0.0);
    assert!(snapshot.log.iter().any(|line| line.contains("Victory")));

    let reward = session.take_reward().expect("first clear pays out");
    assert_eq!(reward.coins, 731);
    assert!(reward.first_clear);
    assert!(session.take_reward().is_none());

    progress.apply_reward(&reward);
    assert!(progress.is_unlocked(2));
    assert_eq!(progress.coins, 731);
}

#[test]
fn test_hostile_victory_has_no_reward() {
    let config = BattleConfig {
        stronghold_base_hp: 100.0,
        stronghold_hp_per_stage: 0.0,
        ..BattleConfig::default()
    };
    let mut session = BattleSession::new(CombatEngine::new(config, UnitRoster::with_defaults()), 5);
    session.start_battle(2, false, BattleLoadout::default());
    run_until_over(&mut session, 180_000);

    let snapshot = session.snapshot().expect("battle should exist");
    assert_eq!(snapshot.winner, Some(Side::Hostile));
    assert_eq!(snapshot.ally_stronghold_hp, 0.0);
    assert!(snapshot.hostile_stronghold_hp > 0.0);
    assert!(session.take_reward().is_none());
}

#[test]
fn test_same_seed_same_battle() {
    let run = |seed: u64| {
        let mut session = BattleSession::new(CombatEngine::default(), seed);
        session.start_battle(9, false, BattleLoadout::default());
        for tick in 0..1500u32 {
            if tick % 150 == 0 {
                session.enqueue(deploy("baby"));
            }
            session.tick(TICK_INTERVAL_MS);
        }
        session.snapshot()
    };
    assert_eq!(run(77), run(77));
}

#[test]
fn test_rejected_deploy_changes_nothing() {
    let mut session = BattleSession::new(CombatEngine::default().with_director(SpawnDirector::new()), 1);
    session.start_battle(1, false, BattleLoadout::default());
    session.enqueue(deploy("tank"));
    let events = session.tick(TICK_INTERVAL_MS);

    let snapshot = session.snapshot().expect("battle should exist");
    assert!(snapshot.units.is_empty());
    assert!((snapshot.currency - 50.2475).abs() < 1e-9);
    assert!(events
        .iter()
        .all(|e| !matches!(e.event_type, BattleEventType::UnitDeployed { .. })));
}

#[test]
fn test_sandbox_hostile_deploy_and_pause() {
    let mut session = BattleSession::new(CombatEngine::default(), 3);
    session.start_battle(7, true, BattleLoadout::default());
    session.enqueue(BattleCommand::SetPaused { paused: true });
    session.enqueue(BattleCommand::Deploy {
        side: Side::Hostile,
        unit_id: "e_enforcer".into(),
        lane_x: Some(800.0),
    });
    for _ in 0..600 {
        session.tick(TICK_INTERVAL_MS);
    }

    let snapshot = session.snapshot().expect("battle should exist");
    let hostiles: Vec<_> = snapshot.units.iter().filter(|u| u.side == Side::Hostile).collect();
    assert_eq!(hostiles.len(), 1);
    assert_eq!(hostiles[0].unit_id, "e_enforcer");
}

#[test]
fn test_special_attack_clears_weak_hostiles() {
    let engine = CombatEngine::default().with_director(SpawnDirector::new());
    let mut session = BattleSession::new(engine, 2);
    session.start_battle(3, true, BattleLoadout {
        cannon_level: 5,
        ..BattleLoadout::default()
    });
    for unit in ["e_battler", "e_pistoler", "e_enforcer"] {
        session.enqueue(BattleCommand::Deploy {
            side: Side::Hostile,
            unit_id: unit.into(),
            lane_x: Some(900.0),
        });
    }
    session.tick(TICK_INTERVAL_MS);
    session.enqueue(BattleCommand::FireSpecialAttack);
    session.tick(TICK_INTERVAL_MS);

    let snapshot = session.snapshot().expect("battle should exist");
    let ids: Vec<_> = snapshot.units.iter().map(|u| u.unit_id.as_str()).collect();
    assert_eq!(ids, vec!["e_enforcer"]);
    assert_eq!(snapshot.hostile_stronghold_hp, 2500.0 - 125.0);
    assert_eq!(snapshot.special_ready_in, 30_000 - TICK_INTERVAL_MS);
}

#[test]
fn test_wallet_upgrade_raises_income() {
    let config = BattleConfig {
        initial_money: 150.0,
        ..BattleConfig::default()
    };
    let engine = CombatEngine::new(config, UnitRoster::with_defaults()).with_director(SpawnDirector::new());
    let mut session = BattleSession::new(engine, 4);
    session.start_battle(1, false, BattleLoadout::default());
    session.enqueue(BattleCommand::UpgradeWallet);
    session.tick(100);

    let snapshot = session.snapshot().expect("battle should exist");
    assert_eq!(snapshot.wallet_level, 1);
    assert!((snapshot.currency - 0.75 * 1.8).abs() < 1e-9);
    assert_eq!(snapshot.wallet_upgrade_cost, Some(450.0));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_units_stay_on_lane_and_one_winner(
        seed in any::<u64>(),
        stage in 1u32..=21,
        deploys in prop::collection::vec(0usize..4, 0..12),
    ) {
        let lineup = ["baby", "pistoler", "tank", "sworder"];
        let config = BattleConfig {
            initial_money: 5000.0,
            ..BattleConfig::default()
        };
        let mut session = BattleSession::new(CombatEngine::new(config, UnitRoster::with_defaults()), seed);
        session.start_battle(stage, false, BattleLoadout::default());

        let mut winner = None;
        for tick in 0..900usize {
            if tick % 60 == 0 {
                if let Some(&pick) = deploys.get(tick / 60) {
                    session.enqueue(deploy(lineup[pick]));
                }
            }
            session.tick(TICK_INTERVAL_MS);

            let snapshot = session.snapshot().expect("battle should exist");
            for unit in &snapshot.units {
                prop_assert!(unit.x >= 0.0 && unit.x <= LANE_LENGTH);
                prop_assert!(unit.hp > 0.0);
            }
            prop_assert!(snapshot.ally_stronghold_hp >= 0.0);
            prop_assert!(snapshot.hostile_stronghold_hp >= 0.0);
            if let Some(w) = winner {
                prop_assert_eq!(snapshot.winner, Some(w));
            }
            winner = snapshot.winner;
        }
    }
}
