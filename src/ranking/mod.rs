pub mod aggregator;
pub mod assign;

pub use aggregator::RankingAggregator;
pub use assign::{assign_ranks, TieBreak};
