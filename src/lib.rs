//! Lane Battle - Tick-Based Two-Lane Combat Simulator

pub mod battle;
pub mod core;
pub mod llm;
pub mod progress;
