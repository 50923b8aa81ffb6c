//! Lane Battle - Entry Point
//!
//! Interactive console over a battle session. Sets up the async runtime
//! for commentary, loads saved progress, and steps battles tick by tick.

use lane_battle::battle::{
    stage_info, BattleCommand, BattleSession, BattleSnapshot, CombatEngine, TICK_INTERVAL_MS,
    STAGES,
};
use lane_battle::core::error::Result;
use lane_battle::core::types::{Side, StageId};
use lane_battle::llm::client::CommentaryClient;
use lane_battle::progress::{JsonFileStore, Progress, ProgressStore};

use std::io::{self, Write};
use tokio::runtime::Runtime;

const DEFAULT_SAVE_PATH: &str = "lane_battle_progress.json";

fn main() -> Result<()> {
    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_env_filter("lane_battle=debug")
        .init();

    tracing::info!("Lane Battle starting...");

    // Commentary requests are spawned onto this runtime
    let rt = Runtime::new()?;
    let _guard = rt.enter();

    let store = JsonFileStore::new(
        std::env::var("LANE_BATTLE_SAVE").unwrap_or_else(|_| DEFAULT_SAVE_PATH.into()),
    );
    let mut progress = store.load()?;

    // Try to create LLM client (optional - works without it)
    let client = CommentaryClient::from_env().ok();
    if client.is_none() {
        tracing::warn!("LLM_API_KEY not set - using local commentary");
    }

    let mut session = BattleSession::with_commentary(CombatEngine::default(), rand::random(), client);

    println!("\n=== LANE BATTLE ===");
    println!("Hold your stronghold, push down the lane, break theirs.");
    println!();
    println!("Commands:");
    println!("  start <stage>    - Start a battle on an unlocked stage");
    println!("  sandbox <stage>  - Start a sandbox battle (no rewards)");
    println!("  deploy <unit>    - Deploy an ally unit");
    println!("  spawn <unit>     - Sandbox: deploy a hostile unit");
    println!("  fire / f         - Fire the special attack");
    println!("  wallet / w       - Upgrade the in-battle wallet");
    println!("  pause / resume   - Sandbox: toggle hostile spawning");
    println!("  tick / t         - Advance one tick");
    println!("  run <n>          - Advance n ticks");
    println!("  status / s       - Show detailed status");
    println!("  stages           - List stages");
    println!("  quit / q         - Exit");
    println!();

    loop {
        if let Some(snapshot) = session.snapshot() {
            display_status(&snapshot);
        }

        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();
        let (verb, arg) = match input.split_once(' ') {
            Some((verb, arg)) => (verb, arg.trim()),
            None => (input, ""),
        };

        match verb {
            "" => continue,
            "quit" | "q" => break,
            "stages" => list_stages(&progress),
            "start" | "sandbox" => {
                let sandbox = verb == "sandbox";
                match arg.parse::<StageId>() {
                    Ok(stage) if stage_info(stage).is_none() => println!("No such stage: {}", stage),
                    Ok(stage) if !sandbox && !progress.is_unlocked(stage) => {
                        println!("Stage {} is locked.", stage)
                    }
                    Ok(stage) => session.start_battle(stage, sandbox, progress.loadout(stage)),
                    Err(_) => println!("Usage: {} <stage>", verb),
                }
            }
            "deploy" | "d" | "spawn" if !arg.is_empty() => {
                let side = if verb == "spawn" { Side::Hostile } else { Side::Ally };
                session.enqueue(BattleCommand::Deploy {
                    side,
                    unit_id: arg.to_string(),
                    lane_x: None,
                });
                step(&mut session, &mut progress, &store, 1)?;
            }
            "fire" | "f" => {
                session.enqueue(BattleCommand::FireSpecialAttack);
                step(&mut session, &mut progress, &store, 1)?;
            }
            "wallet" | "w" => {
                session.enqueue(BattleCommand::UpgradeWallet);
                step(&mut session, &mut progress, &store, 1)?;
            }
            "pause" | "resume" => {
                session.enqueue(BattleCommand::SetPaused {
                    paused: verb == "pause",
                });
                step(&mut session, &mut progress, &store, 1)?;
            }
            "tick" | "t" => step(&mut session, &mut progress, &store, 1)?,
            "run" => match arg.parse::<u32>() {
                Ok(n) => step(&mut session, &mut progress, &store, n)?,
                Err(_) => println!("Usage: run <number>"),
            },
            "status" | "s" => match session.snapshot() {
                Some(snapshot) => display_detailed_status(&snapshot),
                None => println!("No battle running. Try: start 1"),
            },
            _ => println!("Unknown command. Available: start, sandbox, deploy, spawn, fire, wallet, tick, run, status, quit"),
        }
    }

    println!(
        "\nGoodbye! Player level {}, {} coins, {} stages unlocked.",
        progress.player_level,
        progress.coins,
        progress.unlocked_stages.len()
    );
    Ok(())
}

/// Advance up to `ticks` ticks, folding a victory reward into saved progress
fn step(
    session: &mut BattleSession,
    progress: &mut Progress,
    store: &JsonFileStore,
    ticks: u32,
) -> Result<()> {
    if session.battle().is_none() {
        println!("No battle running. Try: start 1");
        return Ok(());
    }
    for _ in 0..ticks {
        let events = session.tick(TICK_INTERVAL_MS);
        for event in events.iter() {
            tracing::debug!(at = event.at, "{}", event.description);
        }
        if !session.is_running() {
            break;
        }
    }

    if let Some(reward) = session.take_reward() {
        let leveled = progress.apply_reward(&reward);
        println!(
            "VICTORY! +{} coins, +{} diamonds, +{} xp{}",
            reward.coins,
            reward.diamonds,
            reward.xp,
            if leveled { " (level up!)" } else { "" }
        );
        store.save(progress)?;
    }
    Ok(())
}

fn list_stages(progress: &Progress) {
    for info in STAGES {
        let mark = if progress.is_cleared(info.id) {
            "cleared"
        } else if progress.is_unlocked(info.id) {
            "open"
        } else {
            "locked"
        };
        println!(
            "  {:>2}. {} - {}{} [{}]",
            info.id,
            info.name,
            info.subtitle,
            if info.boss { " (BOSS)" } else { "" },
            mark
        );
    }
}

/// Display a brief status summary
fn display_status(snapshot: &BattleSnapshot) {
    println!();
    println!(
        "--- Stage {} | {:.1}s | ${:.0} | Base {:.0}/{:.0} vs {:.0}/{:.0} ---",
        snapshot.stage,
        snapshot.elapsed as f64 / 1000.0,
        snapshot.currency,
        snapshot.ally_stronghold_hp,
        snapshot.ally_stronghold_max_hp,
        snapshot.hostile_stronghold_hp,
        snapshot.hostile_stronghold_max_hp,
    );
    if let Some(line) = snapshot.log.first() {
        println!("  {}", line);
    }
    if let Some(winner) = snapshot.winner {
        println!("  Battle over: {:?} wins", winner);
    }
}

/// Display every unit on the lane plus the battle log
fn display_detailed_status(snapshot: &BattleSnapshot) {
    println!();
    println!("=== STAGE {} ===", snapshot.stage);
    println!(
        "Wallet level {} (next: {}) | Special ready in {:.1}s",
        snapshot.wallet_level,
        snapshot
            .wallet_upgrade_cost
            .map_or_else(|| "max".to_string(), |c| format!("${:.0}", c)),
        snapshot.special_ready_in as f64 / 1000.0
    );
    for unit in &snapshot.units {
        let mut tags = Vec::new();
        if unit.stunned {
            tags.push("stunned".to_string());
        }
        if unit.debuff_stacks > 0 {
            tags.push(format!("{} stacks", unit.debuff_stacks));
        }
        if let Some(phase) = unit.boss_phase {
            tags.push(format!("{:?}", phase));
        }
        println!(
            "  [{:?}] {} at {:.0} - {:.0}/{:.0} hp {}",
            unit.side,
            unit.name,
            unit.x,
            unit.hp,
            unit.max_hp,
            tags.join(", ")
        );
    }
    println!("Log:");
    for line in &snapshot.log {
        println!("  {}", line);
    }
}
