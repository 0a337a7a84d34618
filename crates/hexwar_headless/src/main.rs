//! Headless hexwar match runner.
//!
//! Runs matches without graphics for balance testing, determinism checks
//! and quick terminal review.
//!
//! # Usage
//!
//! ```bash
//! # Play one match and print the metrics as JSON
//! cargo run -p hexwar_headless -- run --seed 7
//!
//! # Run a batch of seeds in parallel
//! cargo run -p hexwar_headless -- batch --count 200 --output results/
//!
//! # Replay a seed several times and compare final state hashes
//! cargo run -p hexwar_headless -- verify --seed 12345 --runs 5
//!
//! # Watch the arena as ASCII art
//! cargo run -p hexwar_headless -- show --seconds 30
//! ```
//!
//! Logs go to stderr; results go to stdout or the output directory.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use hexwar_core::config::WorldConfig;
use hexwar_core::world::{WorldSystem, TICK_RATE};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hexwar_headless::{
    ascii::{render_world, AsciiConfig},
    batch::{run_batch, BatchConfig},
    match_config::MatchConfig,
    runner::{verify_seed, MatchRunner},
};

#[derive(Parser)]
#[command(name = "hexwar_headless")]
#[command(about = "Headless hex territory match runner")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Built-in arena sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum MapPreset {
    Small,
    Standard,
    Large,
}

impl MapPreset {
    fn world(self) -> WorldConfig {
        match self {
            MapPreset::Small => WorldConfig::small(),
            MapPreset::Standard => WorldConfig::default(),
            MapPreset::Large => WorldConfig::large(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Play a single match and print its metrics
    Run {
        /// Match file (RON); overrides --map
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Random seed
        #[arg(long)]
        seed: Option<u64>,

        /// Arena preset used when no match file is given
        #[arg(short, long, value_enum, default_value = "standard")]
        map: MapPreset,

        /// Game-time limit in seconds
        #[arg(long)]
        max_seconds: Option<u32>,

        /// Write the metrics JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run many seeds in parallel
    Batch {
        /// Match file (RON); overrides --map
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Arena preset used when no match file is given
        #[arg(short, long, value_enum, default_value = "standard")]
        map: MapPreset,

        /// Number of matches to run
        #[arg(short = 'n', long, default_value = "100")]
        count: u32,

        /// Maximum parallel matches (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: u32,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        /// Starting random seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Game-time limit in seconds
        #[arg(long)]
        max_seconds: Option<u32>,
    },

    /// Verify determinism by running the same seed multiple times
    Verify {
        /// Match file (RON); overrides --map
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Arena preset used when no match file is given
        #[arg(short, long, value_enum, default_value = "small")]
        map: MapPreset,

        /// Seed to verify
        #[arg(long, default_value = "12345")]
        seed: u64,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: u32,

        /// Game-time limit in seconds
        #[arg(long, default_value = "120")]
        max_seconds: u32,
    },

    /// Play a match and print the arena as ASCII art
    Show {
        /// Match file (RON); overrides --map
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Arena preset used when no match file is given
        #[arg(short, long, value_enum, default_value = "standard")]
        map: MapPreset,

        /// Random seed
        #[arg(long)]
        seed: Option<u64>,

        /// Game seconds to simulate before drawing
        #[arg(short, long, default_value = "30")]
        seconds: u32,

        /// Also draw every N seconds along the way (0 = final frame only)
        #[arg(long, default_value = "0")]
        every: u32,

        /// Width of ASCII output
        #[arg(long, default_value = "80")]
        width: usize,

        /// Height of ASCII output
        #[arg(long, default_value = "30")]
        height: usize,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(log_level))
        .init();

    let result = match cli.command {
        Some(Commands::Run {
            config,
            seed,
            map,
            max_seconds,
            output,
        }) => cmd_run(config, seed, map, max_seconds, output),
        Some(Commands::Batch {
            config,
            map,
            count,
            parallel,
            output,
            seed,
            max_seconds,
        }) => cmd_batch(config, map, count, parallel, output, seed, max_seconds),
        Some(Commands::Verify {
            config,
            map,
            seed,
            runs,
            max_seconds,
        }) => cmd_verify(config, map, seed, runs, max_seconds),
        Some(Commands::Show {
            config,
            map,
            seed,
            seconds,
            every,
            width,
            height,
            no_color,
        }) => cmd_show(
            config,
            map,
            seed,
            seconds,
            every,
            AsciiConfig {
                width,
                height,
                show_legend: true,
                use_color: !no_color,
            },
        ),
        None => cmd_run(None, None, MapPreset::Standard, None, None),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!("{message}");
            ExitCode::FAILURE
        }
    }
}

/// Match file if given, otherwise the preset.
fn load_match(path: Option<PathBuf>, map: MapPreset) -> Result<MatchConfig, String> {
    match path {
        Some(path) => MatchConfig::load(&path).map_err(|e| e.to_string()),
        None => Ok(MatchConfig {
            name: format!("{map:?}").to_lowercase(),
            world: map.world(),
            ..MatchConfig::default()
        }),
    }
}

/// Play a single match
fn cmd_run(
    config: Option<PathBuf>,
    seed: Option<u64>,
    map: MapPreset,
    max_seconds: Option<u32>,
    output: Option<PathBuf>,
) -> Result<(), String> {
    let mut game = load_match(config, map)?;
    if let Some(seed) = seed {
        game = game.with_seed(seed);
    }
    if let Some(seconds) = max_seconds {
        game = game.with_max_seconds(seconds);
    }

    let report = MatchRunner::new(game)
        .with_progress(u64::from(TICK_RATE) * 10)
        .run()
        .map_err(|e| format!("failed to start match: {e}"))?;

    match output {
        Some(path) => {
            report
                .metrics
                .save(&path)
                .map_err(|e| format!("failed to write {}: {e}", path.display()))?;
            info!(path = %path.display(), "metrics written");
        }
        None => {
            let json = serde_json::to_string_pretty(&report.metrics).map_err(|e| e.to_string())?;
            println!("{json}");
        }
    }
    Ok(())
}

/// Run many seeds for balance testing
fn cmd_batch(
    config: Option<PathBuf>,
    map: MapPreset,
    count: u32,
    parallel: u32,
    output: PathBuf,
    seed: u64,
    max_seconds: Option<u32>,
) -> Result<(), String> {
    let mut game = load_match(config, map)?;
    if let Some(seconds) = max_seconds {
        game = game.with_max_seconds(seconds);
    }

    let batch = BatchConfig::new(game, count)
        .with_output(output)
        .with_seed(seed)
        .with_parallel(parallel);
    let results = run_batch(batch);
    let path = results
        .write_to_output()
        .map_err(|e| format!("failed to write results: {e}"))?;

    let summary = &results.summary;
    println!("Matches:      {}", summary.total_matches);
    println!(
        "Team 1 wins:  {} ({:.1}%)",
        summary.wins[0],
        summary.win_rate(hexwar_core::team::TeamId::One) * 100.0
    );
    println!(
        "Team 2 wins:  {} ({:.1}%)",
        summary.wins[1],
        summary.win_rate(hexwar_core::team::TeamId::Two) * 100.0
    );
    println!("Draws:        {}", summary.draws);
    for (condition, n) in &summary.by_condition {
        println!("  {condition:<12} {n}");
    }
    println!("Mean length:  {:.1}s", summary.mean_duration_secs);
    println!("Results:      {}", path.display());

    if results.errors.is_empty() {
        Ok(())
    } else {
        Err(format!("{} matches failed", results.errors.len()))
    }
}

/// Replay a seed and compare final hashes
fn cmd_verify(config: Option<PathBuf>, map: MapPreset, seed: u64, runs: u32, max_seconds: u32) -> Result<(), String> {
    let game = load_match(config, map)?.with_max_seconds(max_seconds);
    let report = verify_seed(&game, seed, runs.max(2)).map_err(|e| e.to_string())?;

    for (i, (hash, ticks)) in report.hashes.iter().zip(&report.ticks).enumerate() {
        println!("run {i}: ticks={ticks} hash={hash:016x}");
    }
    if report.is_deterministic() {
        println!("seed {seed}: deterministic");
        Ok(())
    } else {
        Err(format!("seed {seed}: runs diverged"))
    }
}

/// Simulate and draw
fn cmd_show(
    config: Option<PathBuf>,
    map: MapPreset,
    seed: Option<u64>,
    seconds: u32,
    every: u32,
    ascii: AsciiConfig,
) -> Result<(), String> {
    let mut game = load_match(config, map)?;
    if let Some(seed) = seed {
        game = game.with_seed(seed);
    }
    let mut world = WorldSystem::new(game.world).map_err(|e| e.to_string())?;

    let total = u64::from(seconds) * u64::from(TICK_RATE);
    let frame_every = u64::from(every) * u64::from(TICK_RATE);
    while world.get_tick() < total && !world.is_game_over() {
        world.tick();
        if frame_every > 0 && world.get_tick() % frame_every == 0 {
            println!("{}", render_world(&world, &ascii));
        }
    }
    println!("{}", render_world(&world, &ascii));
    Ok(())
}
