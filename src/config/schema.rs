use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::engine::{EngineSettings, DEFAULT_RANK_PASS_ATTEMPTS};
use crate::ranking::TieBreak;
use crate::scoring::RewardPolicy;

/// Main configuration.
///
/// Every field is optional; missing fields fall back to the defaults.
///
/// Example YAML:
/// ```yaml
/// reward_policy: extended
/// tie_break: earliest_registered
/// rank_pass_attempts: 5
/// store_path: /var/lib/dance-rank/rankings.json
/// log_level: debug
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Which placement table pays out rewards: "top_three" (default) or "extended"
    #[serde(default)]
    pub reward_policy: Option<RewardPolicy>,

    /// How dancers with equal totals are ordered: "earliest_registered" (default) or "dancer_id"
    #[serde(default)]
    pub tie_break: Option<TieBreak>,

    /// How many times a failed rank pass is retried from a fresh snapshot (default: 3)
    #[serde(default)]
    pub rank_pass_attempts: Option<u32>,

    /// Path to the JSON ranking store (default: ~/.config/dance-rank/rankings.json)
    #[serde(default)]
    pub store_path: Option<String>,

    /// Tracing filter directive, e.g. "info" or "dance_rank=debug" (default: info)
    #[serde(default)]
    pub log_level: Option<String>,
}

impl Config {
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            reward_policy: self.reward_policy.unwrap_or_default(),
            tie_break: self.tie_break.unwrap_or_default(),
            rank_pass_attempts: self.rank_pass_attempts.unwrap_or(DEFAULT_RANK_PASS_ATTEMPTS),
        }
    }

    pub fn store_path(&self) -> PathBuf {
        self.store_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(crate::store::get_store_path)
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }
}
