//! Solver statistics tracking.

use std::fmt;
use std::mem::size_of;
use std::time::Instant;

use jumpin_core::{Board, Move, StateKey};
use tracing::info;

/// Format bytes as human-readable string.
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Rough footprint of the search: one parent entry per discovered state plus
/// one queued board per frontier state.
pub fn estimate_memory(discovered: usize, frontier: usize) -> u64 {
    let parent_entry = size_of::<StateKey>() + size_of::<Option<(StateKey, Move)>>();
    let queue_entry = size_of::<(Board, StateKey, u32)>();
    (discovered * parent_entry + frontier * queue_entry) as u64
}

/// How the last search ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchOutcome {
    #[default]
    NotStarted,
    /// A path to the goal was found.
    Solved,
    /// The start board already satisfies the goal.
    AlreadySolved,
    /// Every reachable state was visited without reaching the goal.
    Exhausted,
    /// `max_states` was hit.
    StateLimit,
    /// The running flag was cleared.
    Cancelled,
}

impl fmt::Display for SearchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SearchOutcome::NotStarted => "not started",
            SearchOutcome::Solved => "solved",
            SearchOutcome::AlreadySolved => "already solved",
            SearchOutcome::Exhausted => "no solution",
            SearchOutcome::StateLimit => "state limit reached",
            SearchOutcome::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Statistics collected during a search.
#[derive(Debug, Default, Clone)]
pub struct SolverStats {
    /// States popped from the frontier and expanded
    pub states_expanded: u64,

    /// Distinct states seen (including the start)
    pub states_discovered: u64,

    /// Successors dropped because their state was already seen
    pub duplicates: u64,

    /// Moves generated across all expansions
    pub moves_generated: u64,

    /// Deepest BFS layer reached
    pub max_depth: u32,

    /// Length of the path found, if any
    pub solution_length: Option<usize>,

    pub outcome: SearchOutcome,

    /// For rate calculation
    start_time: Option<Instant>,
    last_log_time: Option<Instant>,
    last_log_expanded: u64,
}

impl SolverStats {
    pub fn new() -> Self {
        Self {
            start_time: Some(Instant::now()),
            last_log_time: Some(Instant::now()),
            ..Default::default()
        }
    }

    /// Get current expansions per second
    pub fn states_per_sec(&self) -> f64 {
        if let Some(start) = self.start_time {
            let elapsed = start.elapsed().as_secs_f64();
            if elapsed > 0.0 {
                return self.states_expanded as f64 / elapsed;
            }
        }
        0.0
    }

    /// Check if we should log progress
    pub fn should_log(&self, interval_secs: u64) -> bool {
        if let Some(last) = self.last_log_time {
            last.elapsed().as_secs() >= interval_secs
        } else {
            true
        }
    }

    /// Log progress and reset log timer
    pub fn log_progress(&mut self, frontier: usize) {
        let now = Instant::now();
        let elapsed_total = self.start_time.map(|s| s.elapsed().as_secs()).unwrap_or(0);

        // Calculate rate since last log
        let rate = if let Some(last) = self.last_log_time {
            let elapsed = last.elapsed().as_secs_f64();
            let expanded = self.states_expanded - self.last_log_expanded;
            if elapsed > 0.0 {
                expanded as f64 / elapsed
            } else {
                0.0
            }
        } else {
            self.states_per_sec()
        };

        let mem = estimate_memory(self.states_discovered as usize, frontier);

        info!(
            elapsed = %format!(
                "{:02}:{:02}:{:02}",
                elapsed_total / 3600,
                (elapsed_total % 3600) / 60,
                elapsed_total % 60
            ),
            expanded = self.states_expanded,
            discovered = self.states_discovered,
            frontier,
            depth = self.max_depth,
            rate = %format!("{:.0}/s", rate),
            mem = %format_bytes(mem),
            "search progress"
        );

        self.last_log_time = Some(now);
        self.last_log_expanded = self.states_expanded;
    }

    /// Print final summary
    pub fn print_summary(&self) {
        println!("Outcome: {}", self.outcome);
        if let Some(len) = self.solution_length {
            println!("Solution length: {}", len);
        }
        println!("States expanded: {}", self.states_expanded);
        println!("States discovered: {}", self.states_discovered);
        println!("Duplicate successors: {}", self.duplicates);
        println!("Moves generated: {}", self.moves_generated);
        println!("Max depth: {}", self.max_depth);
        println!(
            "Approx. memory: {}",
            format_bytes(estimate_memory(self.states_discovered as usize, 0))
        );

        if let Some(start) = self.start_time {
            let elapsed = start.elapsed().as_secs_f64();
            if elapsed > 0.0 {
                println!(
                    "Average rate: {:.0} states/sec",
                    self.states_expanded as f64 / elapsed
                );
            }
        }
    }
}
