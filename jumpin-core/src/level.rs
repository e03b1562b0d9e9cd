//! Level files.
//!
//! A level is stored as JSON:
//!
//! ```text
//! {
//!   "name": "3",
//!   "goal": { "type": "rabbits_home" },
//!   "pieces": [ { "x": 2, "y": 0, "piece": { "type": "rabbit", "colour": "white" } }, ... ]
//! }
//! ```
//!
//! Files written by [`Level::save`] wrap that object as
//! `{ "level": { ... }, "checksum": <u64> }`, where the checksum is the xxhash64
//! of the compact JSON of `level`. Hand-written files may omit the wrapper.

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use xxhash_rust::xxh64::xxh64;

use crate::{Board, Goal, GoalSpec, LayoutError, Piece};

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("level i/o failed: {0}")]
    Io(#[from] io::Error),

    #[error("invalid level json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid level layout: {0}")]
    Layout(#[from] LayoutError),

    #[error("level checksum mismatch (stored {stored:#018x}, computed {computed:#018x})")]
    Checksum { stored: u64, computed: u64 },
}

/// One piece and where it stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedPiece {
    pub x: u8,
    pub y: u8,
    pub piece: Piece,
}

/// Serialized form of a level.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelFile {
    pub name: String,
    #[serde(default)]
    pub goal: GoalSpec,
    pub pieces: Vec<PlacedPiece>,
}

impl LevelFile {
    /// xxhash64 of the compact JSON encoding.
    pub fn digest(&self) -> Result<u64, LevelError> {
        let bytes = serde_json::to_vec(self)?;
        Ok(xxh64(&bytes, 0))
    }
}

/// On-disk wrapper written by [`Level::save`].
#[derive(Serialize, Deserialize)]
struct SignedLevel {
    level: LevelFile,
    checksum: u64,
}

/// A board together with the condition that wins it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Level {
    pub board: Board,
    pub goal: GoalSpec,
}

impl Level {
    pub fn new(board: Board, goal: GoalSpec) -> Self {
        Level { board, goal }
    }

    pub fn name(&self) -> &str {
        self.board.name()
    }

    pub fn is_won(&self) -> bool {
        self.goal.is_reached(&self.board)
    }

    pub fn to_file(&self) -> LevelFile {
        LevelFile {
            name: self.board.name().to_string(),
            goal: self.goal,
            pieces: self
                .board
                .pieces()
                .map(|(x, y, piece)| PlacedPiece { x, y, piece })
                .collect(),
        }
    }

    pub fn from_file(file: LevelFile) -> Result<Self, LevelError> {
        let board = Board::from_layout(
            file.name,
            file.pieces.into_iter().map(|p| (p.x, p.y, p.piece)),
        )?;
        Ok(Level::new(board, file.goal))
    }

    /// Parse a level, verifying the checksum when one is present.
    pub fn from_json(text: &str) -> Result<Self, LevelError> {
        // A top-level "level" key picks the signed form, so parse errors
        // report the field that is actually wrong.
        let value: serde_json::Value = serde_json::from_str(text)?;
        let file = if value.get("level").is_some() {
            let SignedLevel { level, checksum } = serde_json::from_value(value)?;
            let computed = level.digest()?;
            if computed != checksum {
                return Err(LevelError::Checksum {
                    stored: checksum,
                    computed,
                });
            }
            level
        } else {
            serde_json::from_value::<LevelFile>(value)?
        };
        Level::from_file(file)
    }

    /// Pretty JSON with a checksum over the level.
    pub fn to_json(&self) -> Result<String, LevelError> {
        let level = self.to_file();
        let checksum = level.digest()?;
        Ok(serde_json::to_string_pretty(&SignedLevel { level, checksum })?)
    }

    pub fn load(path: &Path) -> Result<Self, LevelError> {
        let text = fs::read_to_string(path)?;
        Level::from_json(&text)
    }

    pub fn save(&self, path: &Path) -> Result<(), LevelError> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

/// Load every `*.json` level in `dir`, ordered by file name.
///
/// Files that fail to load are logged and skipped.
pub fn load_dir(dir: &Path) -> Result<Vec<Level>, LevelError> {
    let mut paths: Vec<_> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    let mut levels = Vec::with_capacity(paths.len());
    for path in paths {
        match Level::load(&path) {
            Ok(level) => {
                debug!(path = %path.display(), name = level.name(), "loaded level");
                levels.push(level);
            }
            Err(e) => warn!(path = %path.display(), error = %e, "skipping level file"),
        }
    }
    Ok(levels)
}
