//! Breadth-first shortest-path solver.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};

use jumpin_core::{Board, Goal, Move, StateKey};
use tracing::{debug, info, warn};

use crate::config::SolverConfig;
use crate::stats::{SearchOutcome, SolverStats};

/// Parent links: state -> (previous state, move that led here). None for the root.
type Parents = HashMap<StateKey, Option<(StateKey, Move)>>;

/// BFS solver over board states.
pub struct Solver {
    pub config: SolverConfig,
    /// Statistics from the most recent search
    pub stats: SolverStats,
}

impl Solver {
    pub fn new() -> Self {
        Self::with_config(SolverConfig::default())
    }

    pub fn with_config(config: SolverConfig) -> Self {
        Self {
            config,
            stats: SolverStats::default(),
        }
    }

    /// Find a shortest move sequence from `board` to a state satisfying `goal`.
    ///
    /// Returns `Some(vec![])` if the board already satisfies the goal, and
    /// None if no solution exists, the state limit is hit, or `running` is
    /// cleared. `self.stats.outcome` says which. The caller's board is never
    /// modified.
    pub fn solve<G: Goal + ?Sized>(
        &mut self,
        board: &Board,
        goal: &G,
        running: &AtomicBool,
    ) -> Option<Vec<Move>> {
        self.stats = SolverStats::new();
        self.stats.states_discovered = 1;

        if goal.is_reached(board) {
            self.finish(SearchOutcome::AlreadySolved, Some(0));
            return Some(Vec::new());
        }

        let root = board.state_key();
        let mut parents: Parents = HashMap::new();
        parents.insert(root, None);

        let mut queue: VecDeque<(Board, StateKey, u32)> = VecDeque::new();
        queue.push_back((board.clone(), root, 0));

        while let Some((current, key, depth)) = queue.pop_front() {
            // Check for interrupt
            if !running.load(Ordering::Relaxed) {
                warn!(
                    board = board.name(),
                    expanded = self.stats.states_expanded,
                    "search cancelled"
                );
                self.finish(SearchOutcome::Cancelled, None);
                return None;
            }

            if self.stats.should_log(self.config.log_interval_secs) {
                self.stats.log_progress(queue.len());
            }

            self.stats.states_expanded += 1;
            let moves = current.all_moves();
            self.stats.moves_generated += moves.len() as u64;

            for mov in moves {
                let mut next = current.clone();
                if !next.apply(mov) {
                    continue;
                }
                let next_key = next.state_key();
                if parents.contains_key(&next_key) {
                    self.stats.duplicates += 1;
                    continue;
                }
                parents.insert(next_key, Some((key, mov)));
                self.stats.states_discovered += 1;
                self.stats.max_depth = self.stats.max_depth.max(depth + 1);

                if goal.is_reached(&next) {
                    let path = reconstruct(&parents, next_key);
                    self.finish(SearchOutcome::Solved, Some(path.len()));
                    return Some(path);
                }

                if parents.len() >= self.config.max_states {
                    warn!(
                        board = board.name(),
                        max_states = self.config.max_states,
                        "state limit reached"
                    );
                    self.finish(SearchOutcome::StateLimit, None);
                    return None;
                }

                queue.push_back((next, next_key, depth + 1));
            }
        }

        self.finish(SearchOutcome::Exhausted, None);
        None
    }

    /// First move of a shortest solution, if there is one.
    pub fn next_best_move<G: Goal + ?Sized>(
        &mut self,
        board: &Board,
        goal: &G,
        running: &AtomicBool,
    ) -> Option<Move> {
        self.solve(board, goal, running)?.first().copied()
    }

    fn finish(&mut self, outcome: SearchOutcome, solution_length: Option<usize>) {
        self.stats.outcome = outcome;
        self.stats.solution_length = solution_length;
        match outcome {
            SearchOutcome::Solved | SearchOutcome::AlreadySolved => debug!(
                %outcome,
                moves = ?solution_length,
                discovered = self.stats.states_discovered,
                "search finished"
            ),
            _ => info!(
                %outcome,
                discovered = self.stats.states_discovered,
                "search finished without a path"
            ),
        }
    }
}

impl Default for Solver {
    fn default() -> Self {
        Self::new()
    }
}

/// Walk parent links back to the root.
fn reconstruct(parents: &Parents, mut key: StateKey) -> Vec<Move> {
    let mut path = Vec::new();
    while let Some(Some((parent, mov))) = parents.get(&key) {
        path.push(*mov);
        key = *parent;
    }
    path.reverse();
    path
}

/// One-shot hint with the default configuration.
pub fn next_best_move<G: Goal + ?Sized>(board: &Board, goal: &G) -> Option<Move> {
    let running = AtomicBool::new(true);
    Solver::new().next_best_move(board, goal, &running)
}
