//! Rank History Reconstruction Engine
//!
//! Rebuilds how a player's benchmark rank evolved over time from a local
//! archive of per-session score logs, replaying each observed date through
//! an external rank-calculator executable.

pub mod calculator;
pub mod dispatch;
pub mod engine;
pub mod models;
pub mod stats;

pub use calculator::protocol::BenchmarkQuery;
pub use engine::{HistoryEngine, Reconstruction};
pub use models::{EngineConfig, HistoryPoint, RunReport, ScoreOverride};
