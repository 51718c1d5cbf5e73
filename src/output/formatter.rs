use owo_colors::OwoColorize;
use std::io::IsTerminal;
use terminal_size::{terminal_size, Width};

use crate::engine::{FinalizeReport, RewardRevision};
use crate::scoring::{CompetitionScore, Grade};
use crate::store::{DancerId, DancerRecord};

/// Check if stdout is a TTY (for auto-detecting color support)
pub fn should_use_colors() -> bool {
    std::io::stdout().is_terminal()
}

fn paint_grade(grade: Grade, use_colors: bool) -> String {
    let letter = grade.to_string();
    if !use_colors {
        return letter;
    }
    match grade {
        Grade::S => letter.magenta().bold().to_string(),
        Grade::A => letter.green().bold().to_string(),
        Grade::B => letter.cyan().to_string(),
        Grade::C => letter.yellow().to_string(),
        Grade::D => letter.dimmed().to_string(),
    }
}

/// Multi-line competition score with per-metric breakdown
pub fn format_competition_score(score: &CompetitionScore, use_colors: bool) -> String {
    let mut lines = vec![format!(
        "Score: {}/80  Grade: {}",
        score.total_steps,
        paint_grade(score.grade, use_colors)
    )];
    for contribution in score.breakdown() {
        lines.push(format!(
            "  {:<13}{:>2}",
            format!("{}:", contribution.kind.label()),
            contribution.steps
        ));
    }
    lines.join("\n")
}

/// One line per reward write: "{dancer}  {rank}  {points} pts (was {old})"
pub fn format_revisions(revisions: &[RewardRevision], use_colors: bool) -> String {
    if revisions.is_empty() {
        return "No rewards written.".to_string();
    }

    revisions
        .iter()
        .map(|r| {
            let rank = r
                .rank
                .map(|rank| rank.to_string())
                .unwrap_or_else(|| "-".to_string());
            let change = match r.previous {
                Some(old) if old != r.awarded => format!(" (was {})", old),
                Some(_) => " (unchanged)".to_string(),
                None => String::new(),
            };
            if use_colors && r.changed() && r.previous.is_some() {
                format!("{:<16} {:>4}  {:>3} pts{}", r.dancer_id, rank, r.awarded, change.yellow())
            } else {
                format!("{:<16} {:>4}  {:>3} pts{}", r.dancer_id, rank, r.awarded, change)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_finalize_report(report: &FinalizeReport, use_colors: bool) -> String {
    format!(
        "{}\n{}\n\n{}\n\nRanked {} dancers.",
        report.competition_id,
        format_competition_score(&report.score, use_colors),
        format_revisions(&report.revisions, use_colors),
        report.ranks.len()
    )
}

/// Get terminal width, defaulting to None for pipes (unlimited)
fn get_terminal_width() -> Option<usize> {
    terminal_size().map(|(Width(w), _)| w as usize)
}

/// Truncate a name to fit available width, accounting for Unicode
fn truncate_name(name: &str, max_width: usize) -> String {
    let chars: Vec<char> = name.chars().collect();
    if chars.len() <= max_width {
        name.to_string()
    } else if max_width > 3 {
        format!("{}...", chars[..max_width - 3].iter().collect::<String>())
    } else {
        chars[..max_width].iter().collect()
    }
}

/// Format the leaderboard with columns: Rank, Points, Name, Id
/// No headers. Unranked dancers show "-" in the rank column.
pub fn format_leaderboard(rows: &[(&DancerId, &DancerRecord)], use_colors: bool) -> String {
    if rows.is_empty() {
        return "No dancers registered.".to_string();
    }

    let term_width = get_terminal_width();
    let rank_width = 4;
    let points_width = 6;
    let separator = "  ";

    rows.iter()
        .map(|(id, dancer)| {
            let rank_str = match dancer.rank {
                Some(rank) => format!("{:>width$}.", rank, width = rank_width - 1),
                None => format!("{:>width$}", "-", width = rank_width),
            };
            let points_str = format!("{:>width$}", dancer.total_points, width = points_width);
            let name = dancer.name.clone().unwrap_or_else(|| id.to_string());

            let fixed_width = rank_width + 1 + points_width + separator.len() * 2 + id.0.len();
            let name = match term_width {
                Some(width) if width > fixed_width + 10 => truncate_name(&name, width - fixed_width),
                Some(_) => truncate_name(&name, 20),
                None => name,
            };

            if use_colors {
                format!(
                    "{} {}{}{}{}{}",
                    rank_str.dimmed(),
                    points_str.bold(),
                    separator,
                    name,
                    separator,
                    id.0.cyan()
                )
            } else {
                format!(
                    "{} {}{}{}{}{}",
                    rank_str, points_str, separator, name, separator, id.0
                )
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Leaderboard as tab-separated values for scripting
/// Columns: rank, points, dancer_id, name (no headers, no colors)
pub fn format_leaderboard_tsv(rows: &[(&DancerId, &DancerRecord)]) -> String {
    rows.iter()
        .map(|(id, dancer)| {
            format!(
                "{}\t{}\t{}\t{}",
                dancer.rank.map(|r| r.to_string()).unwrap_or_default(),
                dancer.total_points,
                id,
                dancer.name.as_deref().unwrap_or("")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::{aggregate, CompetitionMetrics, Rank};
    use chrono::Utc;

    fn dancer(name: Option<&str>, points: u64, rank: Option<u32>) -> DancerRecord {
        DancerRecord {
            name: name.map(str::to_string),
            registered_at: Utc::now(),
            total_points: points,
            rank,
        }
    }

    fn sample_score() -> CompetitionScore {
        aggregate(&CompetitionMetrics {
            prize_amount: 1_000_000.0,
            judge_count: 3,
            participant_count: 120,
            edition_number: 2,
        })
        .unwrap()
    }

    #[test]
    fn test_format_competition_score() {
        let result = format_competition_score(&sample_score(), false);
        assert!(result.starts_with("Score: 45/80  Grade: C"));
        assert!(result.contains("Prize:"));
        assert!(result.contains("Participants:"));
        assert_eq!(result.lines().count(), 5);
    }

    #[test]
    fn test_format_revisions_shows_replaced_value() {
        let revisions = vec![
            RewardRevision {
                dancer_id: "ana".into(),
                rank: Some(Rank::new(1).unwrap()),
                previous: Some(45),
                awarded: 50,
            },
            RewardRevision {
                dancer_id: "eli".into(),
                rank: None,
                previous: None,
                awarded: 5,
            },
        ];
        let result = format_revisions(&revisions, false);
        let lines: Vec<&str> = result.lines().collect();
        assert!(lines[0].contains("#1"));
        assert!(lines[0].contains("50 pts (was 45)"));
        assert!(lines[1].contains("  -"));
        assert!(lines[1].ends_with("5 pts"));
    }

    #[test]
    fn test_format_revisions_empty() {
        assert_eq!(format_revisions(&[], false), "No rewards written.");
    }

    #[test]
    fn test_format_leaderboard_empty() {
        assert_eq!(format_leaderboard(&[], false), "No dancers registered.");
    }

    #[test]
    fn test_format_leaderboard_rows() {
        let ana_id = DancerId::from("ana");
        let ben_id = DancerId::from("ben");
        let ana = dancer(Some("Ana Lima"), 68, Some(1));
        let ben = dancer(None, 0, None);
        let rows = vec![(&ana_id, &ana), (&ben_id, &ben)];

        let result = format_leaderboard(&rows, false);
        let lines: Vec<&str> = result.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("  1."));
        assert!(lines[0].contains("68"));
        assert!(lines[0].contains("Ana Lima"));
        assert!(lines[0].ends_with("ana"));
        // Unnamed dancers fall back to their id
        assert!(lines[1].starts_with("   -"));
        assert!(lines[1].contains("ben  ben"));
    }

    #[test]
    fn test_format_leaderboard_tsv() {
        let ana_id = DancerId::from("ana");
        let ana = dancer(Some("Ana"), 68, Some(1));
        let result = format_leaderboard_tsv(&[(&ana_id, &ana)]);
        assert_eq!(result, "1\t68\tana\tAna");
    }

    #[test]
    fn test_truncate_name() {
        assert_eq!(truncate_name("Short", 20), "Short");
        assert_eq!(truncate_name("Anastasia Volochkova", 10), "Anastas...");
        assert_eq!(truncate_name("Anastasia", 3), "Ana");
    }
}
