//! LLM-backed battle commentary
//!
//! Commentary is decoration only: battle outcomes never depend on it.

pub mod client;
pub mod commentary;

pub use client::{ApiFormat, CommentaryClient};
pub use commentary::{Commentator, FALLBACK_COMMENTARY};
