pub mod formatter;

pub use formatter::{
    format_competition_score, format_finalize_report, format_leaderboard, format_leaderboard_tsv,
    format_revisions, should_use_colors,
};
