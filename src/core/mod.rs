pub mod config;
pub mod error;
pub mod types;

pub use config::BattleConfig;
pub use types::{InstanceId, Millis, Side, StageId};
