use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use dance_rank::config::{load_config, validate_config, Config};
use dance_rank::output;
use dance_rank::scoring::{aggregate, reward_for_rank, CompetitionMetrics, Rank};
use dance_rank::store::{CompetitionId, DancerId, EntryStatus, FileStore, StoreError};
use dance_rank::{EngineError, RankingEngine};

const EXIT_SUCCESS: i32 = 0;
const EXIT_STORE: i32 = 2;
const EXIT_CONFIG: i32 = 4;
const EXIT_INPUT: i32 = 5;

#[derive(clap::Args, Debug)]
struct MetricArgs {
    /// Total prize money in currency units
    #[arg(long)]
    prize: f64,
    /// Number of judges
    #[arg(long)]
    judges: i64,
    /// Number of participants
    #[arg(long)]
    participants: i64,
    /// How many times the event has run (1 = inaugural)
    #[arg(long)]
    edition: i64,
}

impl MetricArgs {
    fn metrics(&self) -> CompetitionMetrics {
        CompetitionMetrics {
            prize_amount: self.prize,
            judge_count: self.judges,
            participant_count: self.participants,
            edition_number: self.edition,
        }
    }
}

#[derive(Subcommand, Debug)]
enum DancerCommand {
    /// Register a dancer
    Add {
        id: String,
        #[arg(long)]
        name: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum CompetitionCommand {
    /// Create a competition or update its metrics (issued rewards are kept)
    Set {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[command(flatten)]
        metrics: MetricArgs,
    },
}

#[derive(Subcommand, Debug)]
enum EntryCommand {
    /// Record a dancer's entry in a competition
    Add {
        competition: String,
        dancer: String,
        /// Finishing position (omit for entrants who competed without placing)
        #[arg(long)]
        rank: Option<i64>,
        /// The dancer signed up but did not compete
        #[arg(long, conflicts_with = "rank")]
        registered_only: bool,
    },
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Score a competition from raw metrics without touching the store
    Score {
        #[command(flatten)]
        metrics: MetricArgs,
    },
    /// Compute the reward for a placement without touching the store
    Reward {
        /// Competition total steps (20-80)
        #[arg(long)]
        total: u32,
        #[arg(long)]
        rank: i64,
    },
    #[command(subcommand)]
    Dancer(DancerCommand),
    #[command(subcommand)]
    Competition(CompetitionCommand),
    #[command(subcommand)]
    Entry(EntryCommand),
    /// Issue pending rewards for a competition and re-rank all dancers
    Finalize { competition: String },
    /// Recompute every reward of a competition from its current score and re-rank
    Reissue { competition: String },
    /// Recompute dancer totals (one dancer or everyone) and re-rank
    Recompute {
        #[arg(long)]
        dancer: Option<String>,
    },
    /// Show dancers by rank (default if no subcommand)
    Leaderboard {
        /// Tab-separated output for scripting
        #[arg(long)]
        tsv: bool,
    },
}

#[derive(Parser, Debug)]
#[command(name = "dance-rank")]
#[command(about = "Score dance competitions and rank dancers", long_about = None)]
#[command(version, allow_negative_numbers = true)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to config file (defaults to ~/.config/dance-rank/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

fn engine_exit_code(err: &EngineError) -> i32 {
    match err {
        EngineError::Scoring(_) | EngineError::InvalidCompetition { .. } => EXIT_INPUT,
        EngineError::Store(store) => store_exit_code(store),
        EngineError::RankPassExhausted { .. } => EXIT_STORE,
    }
}

fn store_exit_code(err: &StoreError) -> i32 {
    match err {
        StoreError::DancerNotFound(_)
        | StoreError::CompetitionNotFound(_)
        | StoreError::InvalidEntry(_) => EXIT_INPUT,
        _ => EXIT_STORE,
    }
}

fn exit_with(code: i32, err: impl Into<anyhow::Error>) -> ! {
    eprintln!("Error: {:#}", err.into());
    std::process::exit(code);
}

fn open_store(config: &Config) -> Arc<FileStore> {
    let store_path = config.store_path();
    match FileStore::open(&store_path)
        .with_context(|| format!("Failed to open ranking store at {}", store_path.display()))
    {
        Ok(store) => {
            tracing::debug!(store = %store.path().display(), "ranking store ready");
            Arc::new(store)
        }
        Err(e) => exit_with(EXIT_STORE, e),
    }
}

fn main() {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Leaderboard { tsv: false });

    // Load config
    let config_path = cli.config.map(PathBuf::from);
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {:#}", e);
            std::process::exit(EXIT_CONFIG);
        }
    };

    // Validate config at startup
    if let Err(errors) = validate_config(&config) {
        eprintln!("Config errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        std::process::exit(EXIT_CONFIG);
    }

    let log_level = if cli.verbose { "debug" } else { config.log_level() };
    if let Err(e) = dance_rank::telemetry::init(log_level) {
        eprintln!("Logging setup failed: {}", e);
        std::process::exit(EXIT_CONFIG);
    }

    let use_colors = output::should_use_colors();
    let settings = config.engine_settings();
    tracing::debug!(
        policy = settings.reward_policy.name(),
        tie_break = settings.tie_break.name(),
        attempts = settings.rank_pass_attempts,
        "engine settings"
    );

    match command {
        Commands::Score { metrics } => match aggregate(&metrics.metrics()) {
            Ok(score) => println!("{}", output::format_competition_score(&score, use_colors)),
            Err(e) => exit_with(EXIT_INPUT, e),
        },
        Commands::Reward { total, rank } => {
            match reward_for_rank(settings.reward_policy, total, rank) {
                Ok(points) => println!("{} pts ({})", points, settings.reward_policy.name()),
                Err(e) => exit_with(EXIT_INPUT, e),
            }
        }
        Commands::Dancer(DancerCommand::Add { id, name }) => {
            let store = open_store(&config);
            let dancer_id = DancerId(id);
            let result = store.update(|doc| {
                doc.register_dancer(dancer_id.clone(), name, Utc::now());
                Ok(())
            });
            if let Err(e) = result {
                exit_with(store_exit_code(&e), e);
            }
            println!("Registered dancer {}", dancer_id);
        }
        Commands::Competition(CompetitionCommand::Set { id, name, metrics }) => {
            let metrics = metrics.metrics();
            // Reject bad metrics before they reach the store
            let score = match aggregate(&metrics) {
                Ok(score) => score,
                Err(e) => exit_with(EXIT_INPUT, e),
            };
            let store = open_store(&config);
            let competition_id = CompetitionId(id);
            let result = store.update(|doc| {
                doc.set_competition(competition_id.clone(), name, metrics);
                Ok(())
            });
            if let Err(e) = result {
                exit_with(store_exit_code(&e), e);
            }
            println!("Saved competition {}", competition_id);
            println!("{}", output::format_competition_score(&score, use_colors));
        }
        Commands::Entry(EntryCommand::Add {
            competition,
            dancer,
            rank,
            registered_only,
        }) => {
            let rank = match rank.map(Rank::new).transpose() {
                Ok(rank) => rank,
                Err(e) => exit_with(EXIT_INPUT, e),
            };
            let status = if registered_only {
                EntryStatus::Registered
            } else {
                EntryStatus::Competed
            };
            let store = open_store(&config);
            let result = store.update(|doc| {
                doc.record_entry(
                    CompetitionId(competition.clone()),
                    DancerId(dancer.clone()),
                    rank,
                    status,
                )
            });
            if let Err(e) = result {
                exit_with(store_exit_code(&e), e);
            }
            println!("Recorded {} in {}", dancer, competition);
        }
        Commands::Finalize { competition } => {
            let engine = RankingEngine::new(open_store(&config), settings);
            match engine.finalize_competition(&CompetitionId(competition)) {
                Ok(report) => println!("{}", output::format_finalize_report(&report, use_colors)),
                Err(e) => exit_with(engine_exit_code(&e), e),
            }
        }
        Commands::Reissue { competition } => {
            let engine = RankingEngine::new(open_store(&config), settings);
            match engine.refinalize_competition(&CompetitionId(competition)) {
                Ok(report) => println!("{}", output::format_finalize_report(&report, use_colors)),
                Err(e) => exit_with(engine_exit_code(&e), e),
            }
        }
        Commands::Recompute { dancer } => {
            let store = open_store(&config);
            let dancers = match dancer {
                Some(id) => vec![DancerId(id)],
                None => match store.snapshot() {
                    Ok(doc) => doc.dancers.into_keys().collect(),
                    Err(e) => exit_with(store_exit_code(&e), e),
                },
            };
            let engine = RankingEngine::new(store, settings);
            for dancer_id in &dancers {
                match engine.recompute_dancer(dancer_id) {
                    Ok(total) => println!("{:<16} {:>6} pts", dancer_id, total),
                    Err(e) => exit_with(engine_exit_code(&e), e),
                }
            }
            match engine.recompute_all_ranks() {
                Ok(ranks) => println!("Ranked {} dancers.", ranks.len()),
                Err(e) => exit_with(engine_exit_code(&e), e),
            }
        }
        Commands::Leaderboard { tsv } => {
            let doc = match open_store(&config).snapshot() {
                Ok(doc) => doc,
                Err(e) => exit_with(store_exit_code(&e), e),
            };
            let rows = doc.leaderboard();
            if tsv {
                println!("{}", output::format_leaderboard_tsv(&rows));
            } else {
                println!("{}", output::format_leaderboard(&rows, use_colors));
            }
        }
    }

    std::process::exit(EXIT_SUCCESS);
}
