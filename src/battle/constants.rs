//! Battle system constants - lane geometry and tick cadence
//!
//! Economy and pacing knobs live in `core::config::BattleConfig`.

use crate::core::types::Millis;

// Lane
pub const LANE_LENGTH: f64 = 1000.0;

// Time
/// Fixed wall-clock interval between scheduled ticks
pub const TICK_INTERVAL_MS: Millis = 33;

/// Speeds are authored as lane units per reference tick
pub const SPEED_REFERENCE_MS: f64 = TICK_INTERVAL_MS as f64;

// Summons
pub const DEFAULT_SUMMON_OFFSET: f64 = 35.0;

// Enrage (rage battler)
pub const ENRAGE_HP_FRACTION: f64 = 0.25;
pub const ENRAGE_ATTACK_COOLDOWN_MS: Millis = 300;

// Melee fallback after a one-shot ranged ability is spent
pub const MELEE_RANGE: f64 = 40.0;

// Boss phases
pub const BOSS_ENRAGE_HP_FRACTION: f64 = 0.50;
pub const BOSS_LAST_STAND_HP_FRACTION: f64 = 0.25;
pub const BOSS_ENRAGED_COOLDOWN_MS: Millis = 800;
pub const BOSS_LAST_STAND_HEAL_FRACTION: f64 = 0.30;
pub const BOSS_REINFORCEMENT_COUNT: usize = 3;
pub const BOSS_REINFORCEMENT_SPACING: f64 = 40.0;
pub const BOSS_OPENING_SPLASH_TARGETS: usize = 3;
