//! Shortest-path solver for JumpIN' boards.
//!
//! Explores board states breadth-first, keyed by [`jumpin_core::StateKey`],
//! so the first goal state found is at minimum depth.

pub mod config;
pub mod solver;
pub mod stats;

pub use config::{ConfigError, SolverConfig};
pub use solver::{next_best_move, Solver};
pub use stats::{SearchOutcome, SolverStats};
