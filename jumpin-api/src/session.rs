//! Play session: two-click move entry, undo/redo and level progression.

use std::collections::VecDeque;
use std::sync::atomic::AtomicBool;

use jumpin_core::{Board, Goal, GoalSpec, Level, Move, Piece};
use jumpin_solver::{Solver, SolverConfig};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

/// Default number of moves kept for undo and redo.
pub const DEFAULT_HISTORY_LIMIT: usize = 256;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("a session needs at least one level")]
    NoLevels,
}

/// Result of a click.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClickValidity {
    /// A piece was selected.
    Valid,
    /// The click was ignored.
    Invalid,
    /// The selected piece moved.
    ValidMovemade,
    /// A move was attempted and rejected; the selection stands.
    InvalidMovemade,
}

pub struct GameController {
    levels: Vec<Level>,
    /// 1-based index into `levels`
    current_level: usize,
    board: Board,
    goal: GoalSpec,
    /// First click awaiting a destination
    pending: Option<(u8, u8)>,
    /// Most recent first
    undo_stack: VecDeque<Move>,
    redo_stack: VecDeque<Move>,
    history_limit: usize,
    solver_config: SolverConfig,
}

impl GameController {
    /// Start a session on the first of `levels`.
    pub fn new(levels: Vec<Level>) -> Result<Self, SessionError> {
        let first = levels.first().ok_or(SessionError::NoLevels)?;
        let (board, goal) = (first.board.clone(), first.goal);
        Ok(Self {
            levels,
            current_level: 1,
            board,
            goal,
            pending: None,
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            solver_config: SolverConfig::default(),
        })
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self.undo_stack.truncate(limit);
        self.redo_stack.truncate(limit);
        self
    }

    pub fn with_solver_config(mut self, config: SolverConfig) -> Self {
        self.solver_config = config;
        self
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn goal(&self) -> GoalSpec {
        self.goal
    }

    pub fn pending(&self) -> Option<(u8, u8)> {
        self.pending
    }

    /// Handle a click at (x, y).
    ///
    /// With nothing selected, a click on any movable piece selects it. With a
    /// selection, a click on an empty cell or on the other half of the
    /// selected fox tries to move there.
    pub fn register_click(&mut self, x: u8, y: u8) -> ClickValidity {
        let Some((sx, sy)) = self.pending else {
            return match self.board.piece(x, y) {
                Some(Piece::Mushroom) | None => ClickValidity::Invalid,
                Some(_) => {
                    self.pending = Some((x, y));
                    ClickValidity::Valid
                }
            };
        };

        let same_fox = match (self.board.piece(x, y), self.board.piece(sx, sy)) {
            (Some(Piece::Fox { id: a, .. }), Some(Piece::Fox { id: b, .. })) => a == b,
            _ => false,
        };
        if self.board.is_occupied(x, y) && !same_fox {
            return ClickValidity::Invalid;
        }

        let mov = Move::new(sx, sy, x, y);
        if self.board.apply(mov) {
            debug!(%mov, level = self.current_level, "move made");
            self.pending = None;
            self.redo_stack.clear();
            push_bounded(&mut self.undo_stack, mov, self.history_limit);
            ClickValidity::ValidMovemade
        } else {
            ClickValidity::InvalidMovemade
        }
    }

    pub fn possible_moves(&self, x: u8, y: u8) -> Vec<Move> {
        self.board.possible_moves(x, y)
    }

    pub fn clear_pending_position(&mut self) {
        self.pending = None;
    }

    /// Restore the current level's starting board.
    pub fn reset(&mut self) -> &Board {
        self.load_current();
        &self.board
    }

    /// First move of a shortest solution from the current board.
    pub fn next_best_move(&self) -> Option<Move> {
        let running = AtomicBool::new(true);
        Solver::with_config(self.solver_config).next_best_move(&self.board, &self.goal, &running)
    }

    /// Owned copies of what a hint search needs, for running it elsewhere.
    pub fn hint_snapshot(&self) -> (Board, GoalSpec, SolverConfig) {
        (self.board.clone(), self.goal, self.solver_config)
    }

    pub fn undo_move(&mut self) -> bool {
        let Some(mov) = self.undo_stack.pop_front() else {
            return false;
        };
        if !self.board.apply(mov.reverse()) {
            self.undo_stack.push_front(mov);
            return false;
        }
        self.pending = None;
        push_bounded(&mut self.redo_stack, mov, self.history_limit);
        true
    }

    pub fn redo_move(&mut self) -> bool {
        let Some(mov) = self.redo_stack.pop_front() else {
            return false;
        };
        if !self.board.apply(mov) {
            self.redo_stack.push_front(mov);
            return false;
        }
        self.pending = None;
        push_bounded(&mut self.undo_stack, mov, self.history_limit);
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn current_level(&self) -> usize {
        self.current_level
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub fn level_names(&self) -> Vec<String> {
        self.levels.iter().map(|l| l.name().to_string()).collect()
    }

    /// Advance to and load the next level. False if this is the last one.
    pub fn increment_level(&mut self) -> bool {
        if self.current_level >= self.levels.len() {
            return false;
        }
        self.current_level += 1;
        self.load_current();
        true
    }

    pub fn set_to_first_level(&mut self) {
        self.current_level = 1;
        self.load_current();
    }

    pub fn is_solved(&self) -> bool {
        self.goal.is_reached(&self.board)
    }

    fn load_current(&mut self) {
        let level = &self.levels[self.current_level - 1];
        self.board = level.board.clone();
        self.goal = level.goal;
        self.pending = None;
        self.undo_stack.clear();
        self.redo_stack.clear();
        info!(level = self.current_level, name = level.name(), "level loaded");
    }
}

fn push_bounded(stack: &mut VecDeque<Move>, mov: Move, limit: usize) {
    stack.push_front(mov);
    stack.truncate(limit);
}
