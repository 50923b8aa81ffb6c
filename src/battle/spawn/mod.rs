//! Hostile spawn direction
//!
//! Each stage fields its hostile roster through a hand-authored policy:
//! - flat probability rolls for the tutorial stages
//! - strict priority chains gated by cooldown, currency and time
//! - a composition policy that keeps a frontline alive
//! - boss stages that hold, drop one boss, then run a support chain

pub mod director;
pub mod policy;

pub use director::{SpawnCommand, SpawnContext, SpawnDirector, SpawnDirectorState};
pub use policy::{
    default_policies, BossPolicy, CompositionPolicy, Gate, PriorityRule, RollEntry, RollGroup,
    StagePolicy,
};
