//! JumpIN' Solver
//!
//! Solves levels from files, directories, or the built-in pack and prints
//! the shortest path for each.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use jumpin_core::{default_levels, load_dir, Goal, LayoutError, Level, LevelError};
use jumpin_solver::{ConfigError, Solver, SolverConfig};
use thiserror::Error;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(about = "Find shortest solutions for JumpIN' levels")]
struct Cli {
    /// Level files or directories of `*.json` levels. Defaults to the built-in pack.
    paths: Vec<PathBuf>,

    /// Solver settings (TOML).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override `max_states` from the config.
    #[arg(long)]
    max_states: Option<usize>,

    /// Replay each solution to check it reaches the goal; print only pass/fail.
    #[arg(long)]
    verify: bool,

    /// Print search statistics after each level.
    #[arg(long)]
    stats: bool,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Level(#[from] LevelError),

    #[error("built-in levels are invalid: {0}")]
    Layout(#[from] LayoutError),

    #[error("failed to install Ctrl-C handler: {0}")]
    Signal(#[from] ctrlc::Error),
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match run(Cli::parse()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn load_levels(paths: &[PathBuf]) -> Result<Vec<Level>, CliError> {
    if paths.is_empty() {
        return Ok(default_levels()?);
    }
    let mut levels = Vec::new();
    for path in paths {
        if path.is_dir() {
            levels.extend(load_dir(path)?);
        } else {
            levels.push(Level::load(path)?);
        }
    }
    Ok(levels)
}

/// Returns whether every level was solved.
fn run(cli: Cli) -> Result<bool, CliError> {
    let mut config = match &cli.config {
        Some(path) => SolverConfig::load(path)?,
        None => SolverConfig::default(),
    };
    if let Some(max_states) = cli.max_states {
        config = config.with_max_states(max_states);
        config.validate()?;
    }

    // Set up SIGINT handler for graceful shutdown
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    let levels = load_levels(&cli.paths)?;
    info!(levels = levels.len(), max_states = config.max_states, "starting");

    let mut solver = Solver::with_config(config);
    let mut all_solved = true;

    for level in &levels {
        if !running.load(Ordering::SeqCst) {
            println!("\nInterrupted.");
            return Ok(false);
        }

        let start = Instant::now();
        let path = solver.solve(&level.board, &level.goal, &running);
        let elapsed = start.elapsed();

        match path {
            Some(path) if cli.verify => {
                let mut board = level.board.clone();
                let replayed = path.iter().all(|&mov| board.apply(mov));
                let ok = replayed && level.goal.is_reached(&board);
                println!(
                    "{:<12} {} ({} moves)",
                    level.name(),
                    if ok { "ok" } else { "FAILED" },
                    path.len()
                );
                all_solved &= ok;
            }
            Some(path) => {
                println!("Level {}", level.name());
                println!("{}", level.board);
                println!(
                    "Solved in {} moves ({:.3}s)",
                    path.len(),
                    elapsed.as_secs_f64()
                );
                for (i, mov) in path.iter().enumerate() {
                    println!("  {:>2}. {}", i + 1, mov);
                }
                println!();
            }
            None => {
                println!("{:<12} unsolved: {}", level.name(), solver.stats.outcome);
                all_solved = false;
            }
        }

        if cli.stats {
            solver.stats.print_summary();
            println!();
        }
    }

    Ok(all_solved)
}
