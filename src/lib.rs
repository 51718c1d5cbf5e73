pub mod config;
pub mod engine;
pub mod error;
pub mod output;
pub mod ranking;
pub mod scoring;
pub mod store;
pub mod telemetry;

pub use engine::{EngineSettings, FinalizeReport, RankingEngine, RewardRevision};
pub use error::EngineError;
