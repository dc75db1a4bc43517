pub mod clock;
pub mod config;
pub mod error;
pub mod grade;
pub mod scanner;
pub mod scoring;
pub mod stats;
pub mod store;
pub mod telemetry;

pub use grade::Grade;
pub use scoring::{ScoreResult, ScoringApi, ScoringClient, ScoringError};
pub use stats::{compute_stats, Badge, Stats};
pub use store::{EcoStore, HistoryEvent, Settings, SettingsPatch};
