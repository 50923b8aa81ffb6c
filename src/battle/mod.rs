//! Battle system - two strongholds, one lane, fixed ticks
//!
//! Allies deploy at x = 0 and walk toward the hostile stronghold at
//! `LANE_LENGTH`; hostiles spawn at the far end and walk back. Units stop
//! to fight anything in range and hit the enemy stronghold when the lane
//! ahead is clear.
//!
//! Key pieces:
//! - Stat resolver: level growth, alternate forms, stage scaling
//! - Spawn director: per-stage hostile policies over injected RNG
//! - Tick engine: income, spawning, unit actions, cleanup, terminal check
//! - Boss phases: Opening -> Enraged -> LastStand, forward only

pub mod boss;
pub mod commands;
pub mod constants;
pub mod effects;
pub mod execution;
pub mod loadout;
pub mod rewards;
pub mod session;
pub mod snapshot;
pub mod spawn;
pub mod stage;
pub mod stats;
pub mod unit_type;
pub mod units;

// Re-exports for convenient access
pub use boss::{
    advance_phase, apply_phase_behavior, execute_last_stand, weapon_discarded, BossPhase,
    BossPhaseProfile, LastStandOutcome, PhaseTransition,
};
pub use commands::{BattleCommand, CommandOutcome, RejectReason};
pub use constants::*;
pub use effects::{resolve_attack, Attack, AttackOutcome, PendingSpawn};
pub use execution::{
    check_battle_end, find_candidates, Battle, BattleEvent, BattleEventLog, BattleEventType,
    BattleLog, BattleState, CombatEngine,
};
pub use loadout::BattleLoadout;
pub use rewards::{RewardPayload, RewardTable};
pub use session::BattleSession;
pub use snapshot::{BattleSnapshot, UnitView};
pub use spawn::{SpawnCommand, SpawnContext, SpawnDirector, SpawnDirectorState, StagePolicy};
pub use stage::{stage_info, StageInfo, MAX_STAGE, STAGES};
pub use stats::{resolve, EffectiveStats, HostileScaling, LevelContext, ScalingRule};
pub use unit_type::{
    AltForm, OnHitEffect, StatBlock, StunScope, UnitDefinition, UnitRoster, UnitTraits,
};
pub use units::UnitInstance;
