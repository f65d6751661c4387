use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use playwise::catalog::Catalog;
use playwise::config::{AppConfig, RatingPolicy};
use playwise::ingest;
use playwise::playlist::PlaylistEngine;
use playwise::shell::{Shell, ShellCommand};
use rand::SeedableRng;
use rand::rngs::StdRng;

#[derive(Parser)]
#[command(name = "playwise", version, about = "In-memory music catalog and playlist engine")]
struct Cli {
    /// CSV file with SongName, ArtistName, Duration_ms and Popularity columns
    #[arg(long, global = true)]
    csv: Option<PathBuf>,

    /// Seed for shuffles and random ratings
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Number of loaded tracks queued into the playlist
    #[arg(long, global = true)]
    limit: Option<usize>,

    /// How loaded tracks are rated
    #[arg(long, value_enum, global = true)]
    ratings: Option<RatingPolicy>,

    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive session (the default)
    Shell,

    #[command(flatten)]
    Run(ShellCommand),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load config file (optional, defaults if missing)
    let config = AppConfig::load();

    // CLI > config
    let csv_path = cli.csv.or(config.csv_path.clone());
    let seed = cli.seed.or(config.shuffle_seed);
    let limit = cli.limit.unwrap_or(config.playlist_limit);
    let policy = cli.ratings.unwrap_or(config.rating_policy);

    let mut records = match &csv_path {
        Some(path) => {
            ingest::load_csv(path)
                .with_context(|| format!("Failed to load {}", path.display()))?
                .records
        }
        None => {
            log::warn!("No CSV given (--csv or csv_path in config); starting with an empty catalog");
            Vec::new()
        }
    };

    if policy == RatingPolicy::Random {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        ingest::assign_random_ratings(&mut records, &mut rng);
    }

    let playlist = match seed {
        Some(seed) => PlaylistEngine::with_seed(seed),
        None => PlaylistEngine::new(),
    };
    let mut catalog = Catalog::new(playlist);
    catalog.load(records, limit);

    let mut shell = Shell::new(catalog, config.dashboard_size);
    let mut stdout = io::stdout().lock();

    match cli.command.unwrap_or(Commands::Shell) {
        Commands::Shell => {
            let stdin = io::stdin().lock();
            shell.run(stdin, &mut stdout).context("Shell session failed")?;
        }
        Commands::Run(command) => {
            shell.execute(command, &mut stdout)?;
        }
    }

    Ok(())
}
