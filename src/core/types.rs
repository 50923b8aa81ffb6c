//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};

/// Battle clock in milliseconds since the battle started
pub type Millis = u64;

/// Stage identifier (1-based, as shown on the operations map)
pub type StageId = u32;

/// Which roster a unit belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// Player roster, deploys at lane position 0
    Ally,
    /// Opposing roster, deploys at `LANE_LENGTH`
    Hostile,
}

impl Side {
    pub fn opponent(&self) -> Side {
        match self {
            Side::Ally => Side::Hostile,
            Side::Hostile => Side::Ally,
        }
    }

    /// Direction of travel along the lane (+1 toward the hostile stronghold)
    pub fn forward(&self) -> f64 {
        match self {
            Side::Ally => 1.0,
            Side::Hostile => -1.0,
        }
    }
}

/// Unique identifier for unit instances within one battle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceId(pub u32);

impl InstanceId {
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}
