//! Headless Battle Runner
//!
//! Runs one scripted battle against a stage's spawn director and outputs
//! the result as JSON. Identical arguments and seed give identical output.

use std::path::PathBuf;

use clap::Parser;
use lane_battle::battle::{
    BattleCommand, BattleEventType, BattleLoadout, BattleSession, CombatEngine, RewardPayload,
    UnitRoster, TICK_INTERVAL_MS,
};
use lane_battle::core::config::BattleConfig;
use lane_battle::core::error::{Result, SimError};
use lane_battle::core::types::{Millis, Side, StageId};
use serde::Serialize;

/// Headless Battle Runner - scripted deploys against a stage director
#[derive(Parser, Debug)]
#[command(name = "battle_runner")]
#[command(about = "Run a scripted lane battle and output the result")]
struct Args {
    /// Stage to fight
    #[arg(long, default_value_t = 1)]
    stage: StageId,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,

    /// Battle time limit in milliseconds
    #[arg(long, default_value_t = 300_000)]
    max_ms: Millis,

    /// Sandbox battle (no rewards)
    #[arg(long)]
    sandbox: bool,

    /// Scripted ally deploy as `<ms>:<unit_id>`; repeatable
    #[arg(long = "deploy", value_name = "MS:UNIT")]
    deploys: Vec<String>,

    /// Fire the special attack whenever it is ready
    #[arg(long)]
    auto_special: bool,

    /// Battle config overrides (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Replacement unit roster (TOML)
    #[arg(long)]
    roster: Option<PathBuf>,

    /// Player loadout (JSON)
    #[arg(long)]
    loadout: Option<PathBuf>,

    /// Output format: json or text
    #[arg(long, default_value = "json")]
    format: String,

    /// Print every battle event to stderr
    #[arg(long, short = 'v')]
    verbose: bool,
}

/// JSON output structure
#[derive(Serialize)]
struct BattleResult {
    stage: StageId,
    seed: u64,
    winner: Option<Side>,
    elapsed_ms: Millis,
    ticks: u64,
    ally_stronghold_hp: f64,
    hostile_stronghold_hp: f64,
    ally_deployed: usize,
    hostile_deployed: usize,
    units_defeated: usize,
    boss_transitions: usize,
    reward: Option<RewardPayload>,
    log: Vec<String>,
}

fn parse_deploy(entry: &str) -> Result<(Millis, String)> {
    let (at, unit) = entry
        .split_once(':')
        .ok_or_else(|| SimError::InvalidConfig(format!("deploy '{}' is not MS:UNIT", entry)))?;
    let at = at
        .trim()
        .parse::<Millis>()
        .map_err(|e| SimError::InvalidConfig(format!("deploy '{}': {}", entry, e)))?;
    Ok((at, unit.trim().to_string()))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    // Determine seed
    let seed = args.seed.unwrap_or_else(rand::random);

    let config = match &args.config {
        Some(path) => BattleConfig::load_from_toml(path)?,
        None => BattleConfig::default(),
    };
    let roster = match &args.roster {
        Some(path) => UnitRoster::load_from_toml(path)?,
        None => UnitRoster::with_defaults(),
    };
    let loadout: BattleLoadout = match &args.loadout {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => BattleLoadout::default(),
    };

    let mut script = args
        .deploys
        .iter()
        .map(|entry| parse_deploy(entry))
        .collect::<Result<Vec<_>>>()?;
    script.sort_by_key(|(at, _)| *at);
    let mut script = script.into_iter().peekable();

    let mut session = BattleSession::new(CombatEngine::new(config, roster), seed);
    session.start_battle(args.stage, args.sandbox, loadout);

    if args.verbose {
        eprintln!("=== Battle Started: stage {} (seed {}) ===", args.stage, seed);
    }

    let mut ticks = 0u64;
    let mut ally_deployed = 0;
    let mut hostile_deployed = 0;
    let mut units_defeated = 0;
    let mut boss_transitions = 0;
    let mut elapsed = 0;

    while session.is_running() && elapsed < args.max_ms {
        while let Some((_, unit_id)) = script.next_if(|(at, _)| *at <= elapsed) {
            session.enqueue(BattleCommand::Deploy {
                side: Side::Ally,
                unit_id,
                lane_x: None,
            });
        }
        if args.auto_special {
            let ready = session.snapshot().is_some_and(|s| s.special_ready_in == 0);
            if ready {
                session.enqueue(BattleCommand::FireSpecialAttack);
            }
        }

        let events = session.tick(TICK_INTERVAL_MS);
        ticks += 1;
        elapsed = session.battle().map_or(args.max_ms, |b| b.state.elapsed);

        for event in events.iter() {
            match &event.event_type {
                BattleEventType::UnitDeployed { side: Side::Ally, .. } => ally_deployed += 1,
                BattleEventType::UnitDeployed { side: Side::Hostile, .. } => hostile_deployed += 1,
                BattleEventType::UnitDefeated { .. } => units_defeated += 1,
                BattleEventType::BossPhaseChanged { .. } => boss_transitions += 1,
                _ => {}
            }
            if args.verbose {
                eprintln!("[{:>6}ms] {}", event.at, event.description);
            }
        }
    }

    let reward = session.take_reward();
    let Some(snapshot) = session.snapshot() else {
        return Err(SimError::InvalidConfig("battle was not started".into()));
    };

    let result = BattleResult {
        stage: args.stage,
        seed,
        winner: snapshot.winner,
        elapsed_ms: snapshot.elapsed,
        ticks,
        ally_stronghold_hp: snapshot.ally_stronghold_hp,
        hostile_stronghold_hp: snapshot.hostile_stronghold_hp,
        ally_deployed,
        hostile_deployed,
        units_defeated,
        boss_transitions,
        reward,
        log: snapshot.log,
    };

    match args.format.as_str() {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            println!("Battle Result");
            println!("=============");
            println!("Stage: {}", result.stage);
            match result.winner {
                Some(winner) => println!("Winner: {:?}", winner),
                None => println!("Winner: none (time limit)"),
            }
            println!("Elapsed: {:.1}s over {} ticks", result.elapsed_ms as f64 / 1000.0, result.ticks);
            println!(
                "Strongholds: ally {:.0}, hostile {:.0}",
                result.ally_stronghold_hp, result.hostile_stronghold_hp
            );
            println!(
                "Deployed: {} ally, {} hostile; {} defeated",
                result.ally_deployed, result.hostile_deployed, result.units_defeated
            );
            if let Some(reward) = &result.reward {
                println!("Reward: {} coins, {} diamonds, {} xp", reward.coins, reward.diamonds, reward.xp);
            }
        }
    }

    Ok(())
}
