//! JumpIN' puzzle logic: foxes, rabbits and mushrooms on a 5x5 board.
//!
//! # Coordinates
//!
//! ```text
//! x = column (0-4, left to right)
//! y = row    (0-4, top to bottom)
//!
//! Holes (O) a rabbit must reach:
//!   O . . . O
//!   . . . . .
//!   . . O . .
//!   . . . . .
//!   O . . . O
//! ```
//!
//! # State Key Encoding (128-bit)
//!
//! ```text
//! Bits 0-124:   25 cells × 5 bits, row-major (cell i at bits 5i..5i+4)
//! Bits 125-127: Unused (zero)
//!
//! Cell code:
//!   0       empty
//!   1       mushroom
//!   2-4     rabbit (2 + colour: white, brown, grey)
//!   5-28    fox half (5 + id*4 + direction*2 + half)
//!             direction: 0 = horizontal, 1 = vertical
//!             half:      0 = head,       1 = tail
//! ```
//!
//! # Text Notation
//!
//! Boards parse from and print to five rows of five whitespace-separated
//! tokens: `.` empty, `M` mushroom, `R`/`Rb`/`Rg` white/brown/grey rabbit,
//! `FH<id>`/`FT<id>` fox head/tail. A fox's direction follows from where its
//! two halves sit.
//!
//! ```
//! use jumpin_core::{Board, Move};
//!
//! let mut board = Board::parse("demo", "
//!     . M R . .
//!     . . . . .
//!     . . . . .
//!     . FH0 FT0 . .
//!     . . . . .
//! ").unwrap();
//!
//! // The rabbit jumps the mushroom and lands in the corner hole.
//! assert!(board.apply(Move::new(2, 0, 0, 0)));
//! assert!(board.rabbits_home());
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod level;
pub mod levels;

pub use level::{load_dir, Level, LevelError, LevelFile, PlacedPiece};
pub use levels::default_levels;

/// Board side length.
pub const SIZE: usize = 5;

/// Number of cells on the board.
pub const CELLS: usize = SIZE * SIZE;

/// Fox ids run from 0 to `MAX_FOXES - 1`.
pub const MAX_FOXES: u8 = 6;

/// Hole cells as (x, y).
pub const HOLES: [(u8, u8); 5] = [(0, 0), (4, 0), (2, 2), (0, 4), (4, 4)];

/// Orthogonal unit steps in the order rabbit moves are generated: left, right, up, down.
const ORTHOGONAL: [(i8, i8); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

#[inline]
fn index(x: u8, y: u8) -> usize {
    y as usize * SIZE + x as usize
}

#[inline]
fn in_bounds(x: u8, y: u8) -> bool {
    (x as usize) < SIZE && (y as usize) < SIZE
}

/// Shift a cell by (dx, dy), returning None if the result leaves the board.
#[inline]
fn offset(x: u8, y: u8, dx: i8, dy: i8) -> Option<(u8, u8)> {
    let nx = x as i16 + dx as i16;
    let ny = y as i16 + dy as i16;
    if nx < 0 || ny < 0 || nx >= SIZE as i16 || ny >= SIZE as i16 {
        None
    } else {
        Some((nx as u8, ny as u8))
    }
}

/// Axis of a fox or of a move.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Horizontal,
    Vertical,
}

impl Direction {
    /// Unit step (dx, dy) toward higher coordinates along this axis.
    #[inline]
    pub fn step(self) -> (i8, i8) {
        match self {
            Direction::Horizontal => (1, 0),
            Direction::Vertical => (0, 1),
        }
    }
}

/// Which of a fox's two cells.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FoxHalf {
    Head,
    Tail,
}

impl FoxHalf {
    #[inline]
    pub fn other(self) -> FoxHalf {
        match self {
            FoxHalf::Head => FoxHalf::Tail,
            FoxHalf::Tail => FoxHalf::Head,
        }
    }
}

/// Rabbit colour. Cosmetic only.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Colour {
    #[default]
    White,
    Brown,
    Grey,
}

impl Colour {
    #[inline]
    fn from_index(idx: u8) -> Option<Colour> {
        match idx {
            0 => Some(Colour::White),
            1 => Some(Colour::Brown),
            2 => Some(Colour::Grey),
            _ => None,
        }
    }
}

/// Piece variant without its attributes.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PieceKind {
    Fox,
    Rabbit,
    Mushroom,
}

/// A move from one cell to another.
///
/// For a fox, the start is the clicked half and the end is where that half
/// lands; the other half shifts by the same offset.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Move {
    pub start_x: u8,
    pub start_y: u8,
    pub end_x: u8,
    pub end_y: u8,
}

impl Move {
    #[inline]
    pub const fn new(start_x: u8, start_y: u8, end_x: u8, end_y: u8) -> Move {
        Move {
            start_x,
            start_y,
            end_x,
            end_y,
        }
    }

    /// Horizontal if the move stays on its row, vertical otherwise.
    #[inline]
    pub fn direction(&self) -> Direction {
        if self.start_y == self.end_y {
            Direction::Horizontal
        } else {
            Direction::Vertical
        }
    }

    /// The same move with start and end swapped.
    #[inline]
    pub fn reverse(&self) -> Move {
        Move::new(self.end_x, self.end_y, self.start_x, self.start_y)
    }

    #[inline]
    pub fn start(&self) -> (u8, u8) {
        (self.start_x, self.start_y)
    }

    #[inline]
    pub fn end(&self) -> (u8, u8) {
        (self.end_x, self.end_y)
    }

    /// Signed (dx, dy) from start to end.
    #[inline]
    fn delta(&self) -> (i8, i8) {
        (
            self.end_x as i8 - self.start_x as i8,
            self.end_y as i8 - self.start_y as i8,
        )
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({},{})->({},{})",
            self.start_x, self.start_y, self.end_x, self.end_y
        )
    }
}

/// A piece on the board.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Piece {
    /// One half of a two-cell fox sliding along `direction`.
    Fox {
        direction: Direction,
        half: FoxHalf,
        id: u8,
    },
    /// Steps to an adjacent empty cell or jumps one neighbour.
    Rabbit {
        #[serde(default)]
        colour: Colour,
    },
    /// Immovable blocker.
    Mushroom,
}

impl Piece {
    #[inline]
    pub const fn fox(direction: Direction, half: FoxHalf, id: u8) -> Piece {
        Piece::Fox {
            direction,
            half,
            id,
        }
    }

    #[inline]
    pub const fn rabbit(colour: Colour) -> Piece {
        Piece::Rabbit { colour }
    }

    #[inline]
    pub fn kind(self) -> PieceKind {
        match self {
            Piece::Fox { .. } => PieceKind::Fox,
            Piece::Rabbit { .. } => PieceKind::Rabbit,
            Piece::Mushroom => PieceKind::Mushroom,
        }
    }

    /// The fox id, if this is a fox half.
    #[inline]
    pub fn fox_id(self) -> Option<u8> {
        match self {
            Piece::Fox { id, .. } => Some(id),
            _ => None,
        }
    }

    /// Whether the move's shape suits this piece. Occupancy is not checked.
    pub fn can_move(self, mov: Move) -> bool {
        if mov.start() == mov.end() {
            return false;
        }
        match self {
            Piece::Fox { direction, .. } => mov.direction() == direction,
            Piece::Rabbit { .. } => mov.start_x == mov.end_x || mov.start_y == mov.end_y,
            Piece::Mushroom => false,
        }
    }

    /// All legal moves for this piece standing at (x, y) on `board`.
    ///
    /// Returns an empty list if the piece is not actually at (x, y).
    pub fn possible_moves(self, board: &Board, x: u8, y: u8) -> Vec<Move> {
        if board.piece(x, y) != Some(self) {
            return Vec::new();
        }
        match self {
            Piece::Fox { direction, .. } => fox_moves(board, x, y, direction),
            Piece::Rabbit { .. } => rabbit_moves(board, x, y),
            Piece::Mushroom => Vec::new(),
        }
    }

    /// Apply `mov` to `board` if it is legal for this piece.
    ///
    /// Returns false and leaves the board untouched otherwise.
    pub fn apply(self, mov: Move, board: &mut Board) -> bool {
        if !self.can_move(mov) {
            return false;
        }
        if !self
            .possible_moves(board, mov.start_x, mov.start_y)
            .contains(&mov)
        {
            return false;
        }

        match self {
            Piece::Fox { .. } => {
                let Some((px, py)) = board.fox_partner(mov.start_x, mov.start_y) else {
                    return false;
                };
                let (dx, dy) = mov.delta();
                let Some((qx, qy)) = offset(px, py, dx, dy) else {
                    return false;
                };
                // Lift both halves first: the clicked half may land on its partner's cell.
                let partner = board.take(px, py);
                let moved = board.take(mov.start_x, mov.start_y);
                board.put(mov.end_x, mov.end_y, moved);
                board.put(qx, qy, partner);
                true
            }
            Piece::Rabbit { .. } => {
                let moved = board.take(mov.start_x, mov.start_y);
                board.put(mov.end_x, mov.end_y, moved);
                true
            }
            Piece::Mushroom => false,
        }
    }

    /// Two-letter tag: "FH"/"FT" for fox halves, "R" rabbit, "M" mushroom.
    pub fn short_name(self) -> &'static str {
        match self {
            Piece::Fox {
                half: FoxHalf::Head,
                ..
            } => "FH",
            Piece::Fox {
                half: FoxHalf::Tail,
                ..
            } => "FT",
            Piece::Rabbit { .. } => "R",
            Piece::Mushroom => "M",
        }
    }
}

/// Fox slides: both halves travel together through contiguous empty cells,
/// lower side first, nearest destination first.
fn fox_moves(board: &Board, x: u8, y: u8, direction: Direction) -> Vec<Move> {
    let Some(partner) = board.fox_partner(x, y) else {
        return Vec::new();
    };
    // Tuple order matches axis order for a collinear pair.
    let (lo, hi) = if partner < (x, y) {
        (partner, (x, y))
    } else {
        ((x, y), partner)
    };
    let (dx, dy) = direction.step();

    let mut moves = Vec::new();
    for (edge, sign) in [(lo, -1i8), (hi, 1i8)] {
        let mut dist = 1i8;
        while let Some((cx, cy)) = offset(edge.0, edge.1, dx * sign * dist, dy * sign * dist) {
            if board.is_occupied(cx, cy) {
                break;
            }
            if let Some((nx, ny)) = offset(x, y, dx * sign * dist, dy * sign * dist) {
                moves.push(Move::new(x, y, nx, ny));
            }
            dist += 1;
        }
    }
    moves
}

/// Rabbit moves: one step into an empty neighbour, or a jump over one
/// occupied neighbour onto the empty cell beyond it.
fn rabbit_moves(board: &Board, x: u8, y: u8) -> Vec<Move> {
    let mut moves = Vec::with_capacity(4);
    for (dx, dy) in ORTHOGONAL {
        let Some((nx, ny)) = offset(x, y, dx, dy) else {
            continue;
        };
        if !board.is_occupied(nx, ny) {
            moves.push(Move::new(x, y, nx, ny));
            continue;
        }
        if let Some((jx, jy)) = offset(x, y, 2 * dx, 2 * dy) {
            if !board.is_occupied(jx, jy) {
                moves.push(Move::new(x, y, jx, jy));
            }
        }
    }
    moves
}

/// Structural problems found while building a board.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("cell ({x}, {y}) is outside the board")]
    OutOfBounds { x: u8, y: u8 },

    #[error("cell ({x}, {y}) holds more than one piece")]
    Overlap { x: u8, y: u8 },

    #[error("fox id {id} is out of range (ids run from 0 to {max})", max = MAX_FOXES - 1)]
    FoxId { id: u8 },

    #[error("fox {id} is malformed: {reason}")]
    MalformedFox { id: u8, reason: &'static str },

    #[error("unrecognised token '{token}' at ({x}, {y})")]
    Token { token: String, x: u8, y: u8 },

    #[error("expected 5 rows of 5 tokens")]
    Shape,
}

/// Lossless packed form of a board's occupancy. Ignores the board name.
///
/// See module documentation for the encoding.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct StateKey(pub u128);

impl StateKey {
    /// Bits per cell.
    const CELL_BITS: u32 = 5;
    /// Mask for a single cell (0b11111).
    const CELL_MASK: u128 = 0b11111;
    const RABBIT_BASE: u128 = 2;
    const FOX_BASE: u128 = 5;

    fn encode(piece: Option<Piece>) -> u128 {
        match piece {
            None => 0,
            Some(Piece::Mushroom) => 1,
            Some(Piece::Rabbit { colour }) => Self::RABBIT_BASE + colour as u128,
            Some(Piece::Fox {
                direction,
                half,
                id,
            }) => Self::FOX_BASE + id as u128 * 4 + direction as u128 * 2 + half as u128,
        }
    }

    /// Decode one cell. The outer None marks an invalid code.
    fn decode(code: u128) -> Option<Option<Piece>> {
        match code {
            0 => Some(None),
            1 => Some(Some(Piece::Mushroom)),
            2..=4 => {
                Colour::from_index((code - Self::RABBIT_BASE) as u8).map(|c| Some(Piece::rabbit(c)))
            }
            _ => {
                let bits = code - Self::FOX_BASE;
                let id = (bits / 4) as u8;
                if id >= MAX_FOXES {
                    return None;
                }
                let direction = if (bits >> 1) & 1 == 0 {
                    Direction::Horizontal
                } else {
                    Direction::Vertical
                };
                let half = if bits & 1 == 0 {
                    FoxHalf::Head
                } else {
                    FoxHalf::Tail
                };
                Some(Some(Piece::fox(direction, half, id)))
            }
        }
    }

    /// Code of a single cell.
    #[inline]
    pub fn cell(self, x: u8, y: u8) -> u8 {
        ((self.0 >> (index(x, y) as u32 * Self::CELL_BITS)) & Self::CELL_MASK) as u8
    }
}

/// A named 5x5 grid of pieces.
///
/// Cloning copies the grid by value; clones never share state.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Board {
    name: String,
    cells: [Option<Piece>; CELLS],
}

impl Board {
    /// Create a board with no pieces.
    pub fn empty(name: impl Into<String>) -> Board {
        Board {
            name: name.into(),
            cells: [None; CELLS],
        }
    }

    /// Build a board from (x, y, piece) placements, checking bounds, overlap
    /// and that every fox is one head and one tail side by side along its
    /// direction.
    pub fn from_layout<I>(name: impl Into<String>, placements: I) -> Result<Board, LayoutError>
    where
        I: IntoIterator<Item = (u8, u8, Piece)>,
    {
        let mut board = Board::empty(name);
        for (x, y, piece) in placements {
            if !in_bounds(x, y) {
                return Err(LayoutError::OutOfBounds { x, y });
            }
            if board.is_occupied(x, y) {
                return Err(LayoutError::Overlap { x, y });
            }
            if let Some(id) = piece.fox_id() {
                if id >= MAX_FOXES {
                    return Err(LayoutError::FoxId { id });
                }
            }
            board.put(x, y, Some(piece));
        }
        board.validate_foxes()?;
        Ok(board)
    }

    /// Parse the text notation described in the crate documentation.
    pub fn parse(name: impl Into<String>, text: &str) -> Result<Board, LayoutError> {
        let rows: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        if rows.len() != SIZE {
            return Err(LayoutError::Shape);
        }

        let mut placements = Vec::new();
        let mut fox_cells: Vec<(u8, u8, FoxHalf, u8)> = Vec::new();

        for (y, row) in rows.iter().enumerate() {
            let tokens: Vec<&str> = row.split_whitespace().collect();
            if tokens.len() != SIZE {
                return Err(LayoutError::Shape);
            }
            for (x, token) in tokens.into_iter().enumerate() {
                let (x, y) = (x as u8, y as u8);
                match token {
                    "." => {}
                    "M" => placements.push((x, y, Piece::Mushroom)),
                    "R" => placements.push((x, y, Piece::rabbit(Colour::White))),
                    "Rb" => placements.push((x, y, Piece::rabbit(Colour::Brown))),
                    "Rg" => placements.push((x, y, Piece::rabbit(Colour::Grey))),
                    _ => {
                        let (half, id) = parse_fox_token(token).ok_or_else(|| LayoutError::Token {
                            token: token.to_string(),
                            x,
                            y,
                        })?;
                        fox_cells.push((x, y, half, id));
                    }
                }
            }
        }

        for &(x, y, half, id) in &fox_cells {
            let direction = fox_cells
                .iter()
                .find(|&&(ox, oy, _, oid)| oid == id && (ox, oy) != (x, y))
                .map(|&(_, oy, _, _)| {
                    if oy == y {
                        Direction::Horizontal
                    } else {
                        Direction::Vertical
                    }
                })
                .ok_or(LayoutError::MalformedFox {
                    id,
                    reason: "missing its other half",
                })?;
            placements.push((x, y, Piece::fox(direction, half, id)));
        }

        Board::from_layout(name, placements)
    }

    /// Rebuild a board from a state key. Returns None for keys no valid board produces.
    pub fn from_state_key(name: impl Into<String>, key: StateKey) -> Option<Board> {
        if key.0 >> (CELLS as u32 * StateKey::CELL_BITS) != 0 {
            return None;
        }
        let mut board = Board::empty(name);
        for (i, cell) in board.cells.iter_mut().enumerate() {
            let code = (key.0 >> (i as u32 * StateKey::CELL_BITS)) & StateKey::CELL_MASK;
            *cell = StateKey::decode(code)?;
        }
        board.validate_foxes().ok()?;
        Some(board)
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// The piece at (x, y). Off-board cells hold nothing.
    #[inline]
    pub fn piece(&self, x: u8, y: u8) -> Option<Piece> {
        if in_bounds(x, y) {
            self.cells[index(x, y)]
        } else {
            None
        }
    }

    #[inline]
    pub fn is_occupied(&self, x: u8, y: u8) -> bool {
        self.piece(x, y).is_some()
    }

    #[inline]
    pub fn is_hole(x: u8, y: u8) -> bool {
        HOLES.contains(&(x, y))
    }

    /// Occupied cells in row-major order.
    pub fn pieces(&self) -> impl Iterator<Item = (u8, u8, Piece)> + '_ {
        self.cells.iter().enumerate().filter_map(|(i, cell)| {
            cell.map(|piece| ((i % SIZE) as u8, (i / SIZE) as u8, piece))
        })
    }

    /// Legal moves for whatever stands at (x, y); empty if nothing does.
    pub fn possible_moves(&self, x: u8, y: u8) -> Vec<Move> {
        match self.piece(x, y) {
            Some(piece) => piece.possible_moves(self, x, y),
            None => Vec::new(),
        }
    }

    /// Every legal move on the board, generated once per piece: foxes from
    /// their head, rabbits from their cell. Row-major order.
    pub fn all_moves(&self) -> Vec<Move> {
        let mut moves = Vec::with_capacity(16);
        for (x, y, piece) in self.pieces() {
            match piece {
                Piece::Fox {
                    half: FoxHalf::Head,
                    ..
                }
                | Piece::Rabbit { .. } => moves.extend(piece.possible_moves(self, x, y)),
                _ => {}
            }
        }
        moves
    }

    /// Apply a move if it is legal for the piece at its start.
    ///
    /// Returns false and leaves the board untouched otherwise.
    pub fn apply(&mut self, mov: Move) -> bool {
        match self.piece(mov.start_x, mov.start_y) {
            Some(piece) => piece.apply(mov, self),
            None => false,
        }
    }

    /// The cell holding the other half of the fox at (x, y).
    pub fn fox_partner(&self, x: u8, y: u8) -> Option<(u8, u8)> {
        let Some(Piece::Fox {
            direction,
            half,
            id,
        }) = self.piece(x, y)
        else {
            return None;
        };
        let partner = Piece::fox(direction, half.other(), id);
        let (dx, dy) = direction.step();
        [1i8, -1]
            .into_iter()
            .filter_map(|sign| offset(x, y, dx * sign, dy * sign))
            .find(|&(px, py)| self.piece(px, py) == Some(partner))
    }

    /// True when every rabbit sits in a hole.
    pub fn rabbits_home(&self) -> bool {
        self.pieces()
            .filter(|&(_, _, piece)| piece.kind() == PieceKind::Rabbit)
            .all(|(x, y, _)| Board::is_hole(x, y))
    }

    /// Packed occupancy, independent of the name.
    pub fn state_key(&self) -> StateKey {
        let mut key = 0u128;
        for (i, cell) in self.cells.iter().enumerate() {
            key |= StateKey::encode(*cell) << (i as u32 * StateKey::CELL_BITS);
        }
        StateKey(key)
    }

    #[inline]
    fn put(&mut self, x: u8, y: u8, piece: Option<Piece>) {
        self.cells[index(x, y)] = piece;
    }

    #[inline]
    fn take(&mut self, x: u8, y: u8) -> Option<Piece> {
        self.cells[index(x, y)].take()
    }

    fn validate_foxes(&self) -> Result<(), LayoutError> {
        for id in 0..MAX_FOXES {
            let halves: Vec<(u8, u8, Direction, FoxHalf)> = self
                .pieces()
                .filter_map(|(x, y, piece)| match piece {
                    Piece::Fox {
                        direction,
                        half,
                        id: fid,
                    } if fid == id => Some((x, y, direction, half)),
                    _ => None,
                })
                .collect();
            match halves.as_slice() {
                [] => {}
                [(ax, ay, dir_a, half_a), (bx, by, dir_b, half_b)] => {
                    if dir_a != dir_b {
                        return Err(LayoutError::MalformedFox {
                            id,
                            reason: "halves disagree on direction",
                        });
                    }
                    if half_a == half_b {
                        return Err(LayoutError::MalformedFox {
                            id,
                            reason: "needs one head and one tail",
                        });
                    }
                    if self.fox_partner(*ax, *ay) != Some((*bx, *by)) {
                        return Err(LayoutError::MalformedFox {
                            id,
                            reason: "halves are not adjacent along its direction",
                        });
                    }
                }
                _ => {
                    return Err(LayoutError::MalformedFox {
                        id,
                        reason: "expected exactly two halves",
                    })
                }
            }
        }
        Ok(())
    }
}

impl Default for Board {
    fn default() -> Self {
        Board::empty("")
    }
}

fn parse_fox_token(token: &str) -> Option<(FoxHalf, u8)> {
    let (half, id) = if let Some(id) = token.strip_prefix("FH") {
        (FoxHalf::Head, id)
    } else if let Some(id) = token.strip_prefix("FT") {
        (FoxHalf::Tail, id)
    } else {
        return None;
    };
    Some((half, id.parse().ok()?))
}

fn cell_token(piece: Option<Piece>) -> String {
    match piece {
        None => ".".to_string(),
        Some(Piece::Rabbit {
            colour: Colour::White,
        }) => "R".to_string(),
        Some(Piece::Rabbit {
            colour: Colour::Brown,
        }) => "Rb".to_string(),
        Some(Piece::Rabbit {
            colour: Colour::Grey,
        }) => "Rg".to_string(),
        Some(piece @ Piece::Fox { id, .. }) => format!("{}{}", piece.short_name(), id),
        Some(piece) => piece.short_name().to_string(),
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in 0..SIZE as u8 {
            let row: Vec<String> = (0..SIZE as u8).map(|x| cell_token(self.piece(x, y))).collect();
            writeln!(f, "{}", row.join(" "))?;
        }
        Ok(())
    }
}

// ============================================================================
// GOALS
// ============================================================================

/// Win condition for a board.
pub trait Goal {
    fn is_reached(&self, board: &Board) -> bool;
}

impl<F> Goal for F
where
    F: Fn(&Board) -> bool,
{
    fn is_reached(&self, board: &Board) -> bool {
        self(board)
    }
}

/// Goals a level file can name.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GoalSpec {
    /// Every rabbit in a hole.
    #[default]
    RabbitsHome,
    /// The head of fox `id` at (x, y).
    FoxHeadAt { id: u8, x: u8, y: u8 },
}

impl Goal for GoalSpec {
    fn is_reached(&self, board: &Board) -> bool {
        match *self {
            GoalSpec::RabbitsHome => board.rabbits_home(),
            GoalSpec::FoxHeadAt { id, x, y } => matches!(
                board.piece(x, y),
                Some(Piece::Fox { half: FoxHalf::Head, id: fid, .. }) if fid == id
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(text: &str) -> Board {
        Board::parse("test", text).unwrap()
    }

    const FOX_ROW: &str = "
        . . . . .
        . FH0 FT0 . .
        . . . . .
        . . . . .
        . . . . .
    ";

    // ========== Move ==========

    #[test]
    fn test_move_direction() {
        assert_eq!(Move::new(0, 2, 4, 2).direction(), Direction::Horizontal);
        assert_eq!(Move::new(3, 0, 3, 1).direction(), Direction::Vertical);
        // Anything leaving the row counts as vertical.
        assert_eq!(Move::new(0, 0, 1, 1).direction(), Direction::Vertical);
    }

    #[test]
    fn test_move_reverse_twice_is_identity() {
        for a in 0..CELLS as u8 {
            for b in 0..CELLS as u8 {
                let mov = Move::new(a % 5, a / 5, b % 5, b / 5);
                assert_eq!(mov.reverse().reverse(), mov);
            }
        }
    }

    #[test]
    fn test_move_reverse_swaps_ends() {
        let mov = Move::new(1, 2, 3, 2);
        assert_eq!(mov.reverse(), Move::new(3, 2, 1, 2));
        assert_eq!(mov.reverse().start(), mov.end());
    }

    #[test]
    fn test_move_display() {
        assert_eq!(Move::new(1, 2, 3, 2).to_string(), "(1,2)->(3,2)");
    }

    // ========== Layout & Notation ==========

    #[test]
    fn test_parse_display_roundtrip() {
        let original = board(
            "
            M . R . M
            . . FH0 . .
            . . FT0 . Rb
            . . . FH1 FT1
            M . . Rg .
        ",
        );
        let reparsed = Board::parse("test", &original.to_string()).unwrap();
        assert_eq!(reparsed, original);
    }

    #[test]
    fn test_parse_infers_fox_direction() {
        let b = board(FOX_ROW);
        assert_eq!(
            b.piece(1, 1),
            Some(Piece::fox(Direction::Horizontal, FoxHalf::Head, 0))
        );
        assert_eq!(
            b.piece(2, 1),
            Some(Piece::fox(Direction::Horizontal, FoxHalf::Tail, 0))
        );

        let v = board(
            "
            . . . . .
            . . . FT3 .
            . . . FH3 .
            . . . . .
            . . . . .
        ",
        );
        assert_eq!(
            v.piece(3, 2),
            Some(Piece::fox(Direction::Vertical, FoxHalf::Head, 3))
        );
    }

    #[test]
    fn test_parse_rejects_bad_shape() {
        assert_eq!(Board::parse("x", ". . . . ."), Err(LayoutError::Shape));
        let short_row = ". . . .\n. . . . .\n. . . . .\n. . . . .\n. . . . .";
        assert_eq!(Board::parse("x", short_row), Err(LayoutError::Shape));
    }

    #[test]
    fn test_parse_rejects_unknown_token() {
        let text = ". . . . .\n. . X . .\n. . . . .\n. . . . .\n. . . . .";
        assert_eq!(
            Board::parse("x", text),
            Err(LayoutError::Token {
                token: "X".to_string(),
                x: 2,
                y: 1
            })
        );
    }

    #[test]
    fn test_parse_rejects_lonely_fox_half() {
        let text = ". . . . .\n. . FH0 . .\n. . . . .\n. . . . .\n. . . . .";
        assert!(matches!(
            Board::parse("x", text),
            Err(LayoutError::MalformedFox { id: 0, .. })
        ));
    }

    #[test]
    fn test_parse_rejects_diagonal_fox() {
        let text = ". . . . .\n. FH0 . . .\n. . FT0 . .\n. . . . .\n. . . . .";
        assert!(matches!(
            Board::parse("x", text),
            Err(LayoutError::MalformedFox { id: 0, .. })
        ));
    }

    #[test]
    fn test_layout_rejects_overlap_and_bounds() {
        let overlap = Board::from_layout("x", [(1, 1, Piece::Mushroom), (1, 1, Piece::Mushroom)]);
        assert_eq!(overlap, Err(LayoutError::Overlap { x: 1, y: 1 }));

        let outside = Board::from_layout("x", [(5, 0, Piece::Mushroom)]);
        assert_eq!(outside, Err(LayoutError::OutOfBounds { x: 5, y: 0 }));
    }

    #[test]
    fn test_layout_rejects_fox_id_out_of_range() {
        let result = Board::from_layout(
            "x",
            [
                (0, 1, Piece::fox(Direction::Horizontal, FoxHalf::Head, MAX_FOXES)),
                (1, 1, Piece::fox(Direction::Horizontal, FoxHalf::Tail, MAX_FOXES)),
            ],
        );
        assert_eq!(result, Err(LayoutError::FoxId { id: MAX_FOXES }));
    }

    #[test]
    fn test_layout_rejects_malformed_foxes() {
        let two_heads = Board::from_layout(
            "x",
            [
                (0, 1, Piece::fox(Direction::Horizontal, FoxHalf::Head, 0)),
                (1, 1, Piece::fox(Direction::Horizontal, FoxHalf::Head, 0)),
            ],
        );
        assert!(matches!(two_heads, Err(LayoutError::MalformedFox { id: 0, .. })));

        let mixed_direction = Board::from_layout(
            "x",
            [
                (0, 1, Piece::fox(Direction::Horizontal, FoxHalf::Head, 1)),
                (1, 1, Piece::fox(Direction::Vertical, FoxHalf::Tail, 1)),
            ],
        );
        assert!(matches!(
            mixed_direction,
            Err(LayoutError::MalformedFox { id: 1, .. })
        ));

        // Horizontal fox whose halves are stacked vertically.
        let wrong_axis = Board::from_layout(
            "x",
            [
                (2, 1, Piece::fox(Direction::Horizontal, FoxHalf::Head, 2)),
                (2, 2, Piece::fox(Direction::Horizontal, FoxHalf::Tail, 2)),
            ],
        );
        assert!(matches!(wrong_axis, Err(LayoutError::MalformedFox { id: 2, .. })));
    }

    #[test]
    fn test_empty_board() {
        let b = Board::empty("blank");
        assert_eq!(b.name(), "blank");
        assert_eq!(b.pieces().count(), 0);
        assert!(b.all_moves().is_empty());
        // No rabbits means nobody is out of a hole.
        assert!(b.rabbits_home());
    }

    #[test]
    fn test_piece_queries_off_board() {
        let b = board(FOX_ROW);
        assert_eq!(b.piece(5, 0), None);
        assert!(!b.is_occupied(0, 9));
        assert!(b.possible_moves(7, 7).is_empty());
    }

    // ========== Piece ==========

    #[test]
    fn test_short_names() {
        assert_eq!(Piece::fox(Direction::Vertical, FoxHalf::Head, 0).short_name(), "FH");
        assert_eq!(Piece::fox(Direction::Vertical, FoxHalf::Tail, 0).short_name(), "FT");
        assert_eq!(Piece::rabbit(Colour::Grey).short_name(), "R");
        assert_eq!(Piece::Mushroom.short_name(), "M");
    }

    #[test]
    fn test_piece_kind() {
        assert_eq!(Piece::Mushroom.kind(), PieceKind::Mushroom);
        assert_eq!(Piece::rabbit(Colour::White).kind(), PieceKind::Rabbit);
        assert_eq!(
            Piece::fox(Direction::Horizontal, FoxHalf::Tail, 4).kind(),
            PieceKind::Fox
        );
    }

    #[test]
    fn test_mushroom_never_moves() {
        let mushroom = Piece::Mushroom;
        let mut blank = Board::empty("");
        assert!(!mushroom.apply(Move::new(1, 2, 3, 4), &mut blank));

        let mut b = board(
            "
            M . . . .
            . . . . .
            . . M . .
            . . . . .
            . . . . .
        ",
        );
        let before = b.clone();
        for a in 0..CELLS as u8 {
            for c in 0..CELLS as u8 {
                let mov = Move::new(a % 5, a / 5, c % 5, c / 5);
                assert!(!mushroom.apply(mov, &mut b));
            }
        }
        assert!(!b.apply(Move::new(0, 0, 1, 0)));
        assert_eq!(b, before);
    }

    #[test]
    fn test_mushroom_has_no_moves() {
        let b = board(
            "
            . . . . .
            . . . . .
            . . M . .
            . . . . .
            . . . . .
        ",
        );
        assert!(b.possible_moves(2, 2).is_empty());
        assert!(!Piece::Mushroom.can_move(Move::new(2, 2, 2, 3)));
    }

    #[test]
    fn test_fox_can_move_only_along_axis() {
        let horizontal = Piece::fox(Direction::Horizontal, FoxHalf::Head, 0);
        assert!(horizontal.can_move(Move::new(1, 1, 3, 1)));
        assert!(!horizontal.can_move(Move::new(1, 1, 1, 3)));
        assert!(!horizontal.can_move(Move::new(1, 1, 1, 1)));

        let vertical = Piece::fox(Direction::Vertical, FoxHalf::Tail, 0);
        assert!(vertical.can_move(Move::new(2, 0, 2, 3)));
        assert!(!vertical.can_move(Move::new(2, 0, 4, 0)));
    }

    #[test]
    fn test_fox_moves_from_head() {
        let b = board(FOX_ROW);
        assert_eq!(
            b.possible_moves(1, 1),
            vec![
                Move::new(1, 1, 0, 1),
                Move::new(1, 1, 2, 1),
                Move::new(1, 1, 3, 1),
            ]
        );
    }

    #[test]
    fn test_fox_moves_from_tail() {
        let b = board(FOX_ROW);
        assert_eq!(
            b.possible_moves(2, 1),
            vec![
                Move::new(2, 1, 1, 1),
                Move::new(2, 1, 3, 1),
                Move::new(2, 1, 4, 1),
            ]
        );
    }

    #[test]
    fn test_fox_moves_blocked() {
        let b = board(
            "
            . . . . .
            R FH0 FT0 M .
            . . . . .
            . . . . .
            . . . . .
        ",
        );
        assert!(b.possible_moves(1, 1).is_empty());
        assert!(b.possible_moves(2, 1).is_empty());
    }

    #[test]
    fn test_fox_vertical_moves() {
        let b = board(
            "
            . . . . .
            . . . FH0 .
            . . . FT0 .
            . . . . .
            . . . M .
        ",
        );
        assert_eq!(
            b.possible_moves(3, 1),
            vec![Move::new(3, 1, 3, 0), Move::new(3, 1, 3, 2)]
        );
    }

    #[test]
    fn test_fox_moves_match_fox_direction() {
        let b = board(
            "
            . . . . M
            FH0 FT0 . FH1 .
            . . . FT1 .
            . R . . .
            . FH2 FT2 . .
        ",
        );
        for (x, y, piece) in b.pieces() {
            if let Piece::Fox { direction, .. } = piece {
                let moves = b.possible_moves(x, y);
                assert!(!moves.is_empty());
                for mov in moves {
                    assert_eq!(mov.direction(), direction, "fox at ({x},{y}) produced {mov}");
                    assert!(piece.can_move(mov));
                }
            }
        }
    }

    #[test]
    fn test_fox_apply_moves_both_halves() {
        let mut b = board(FOX_ROW);
        assert!(b.apply(Move::new(1, 1, 3, 1)));
        assert_eq!(b.piece(1, 1), None);
        assert_eq!(b.piece(2, 1), None);
        assert_eq!(
            b.piece(3, 1),
            Some(Piece::fox(Direction::Horizontal, FoxHalf::Head, 0))
        );
        assert_eq!(
            b.piece(4, 1),
            Some(Piece::fox(Direction::Horizontal, FoxHalf::Tail, 0))
        );
    }

    #[test]
    fn test_fox_apply_onto_own_half() {
        let mut b = board(FOX_ROW);
        assert!(b.apply(Move::new(1, 1, 2, 1)));
        assert_eq!(b.piece(1, 1), None);
        assert_eq!(b.fox_partner(2, 1), Some((3, 1)));
        assert_eq!(
            b.piece(2, 1),
            Some(Piece::fox(Direction::Horizontal, FoxHalf::Head, 0))
        );
    }

    #[test]
    fn test_fox_apply_from_tail() {
        let mut b = board(FOX_ROW);
        assert!(b.apply(Move::new(2, 1, 1, 1)));
        assert_eq!(b.fox_partner(0, 1), Some((1, 1)));
        assert_eq!(
            b.piece(1, 1),
            Some(Piece::fox(Direction::Horizontal, FoxHalf::Tail, 0))
        );
    }

    #[test]
    fn test_fox_apply_rejects_wrong_axis() {
        let mut b = board(FOX_ROW);
        let before = b.clone();
        assert!(!b.apply(Move::new(1, 1, 1, 3)));
        assert!(!b.apply(Move::new(1, 1, 4, 1))); // tail would leave the board
        assert_eq!(b, before);
    }

    #[test]
    fn test_rabbit_steps_and_jumps() {
        let b = board(
            "
            . . R . .
            . . M . .
            . M R . .
            . . . . .
            . . . . .
        ",
        );
        assert_eq!(
            b.possible_moves(2, 2),
            vec![
                Move::new(2, 2, 0, 2),
                Move::new(2, 2, 3, 2),
                Move::new(2, 2, 2, 3),
            ]
        );
    }

    #[test]
    fn test_rabbit_cannot_jump_off_board() {
        let b = board(
            "
            M R . . .
            . . . . .
            . . . . .
            . . . . .
            . . . . .
        ",
        );
        assert_eq!(
            b.possible_moves(1, 0),
            vec![Move::new(1, 0, 2, 0), Move::new(1, 0, 1, 1)]
        );
    }

    #[test]
    fn test_rabbit_cannot_jump_two_pieces() {
        let b = board(
            "
            . . . . .
            . . . . .
            R M M . .
            . . . . .
            . . . . .
        ",
        );
        assert_eq!(
            b.possible_moves(0, 2),
            vec![Move::new(0, 2, 0, 1), Move::new(0, 2, 0, 3)]
        );
    }

    #[test]
    fn test_rabbit_jumps_over_fox() {
        let mut b = board(
            "
            . . . . .
            . . . . .
            . . . . .
            . FH0 FT0 . .
            . R . . .
        ",
        );
        assert!(b.possible_moves(1, 4).contains(&Move::new(1, 4, 1, 2)));
        assert!(b.apply(Move::new(1, 4, 1, 2)));
        // The fox is untouched.
        assert_eq!(b.fox_partner(1, 3), Some((2, 3)));
    }

    #[test]
    fn test_rabbit_rejects_illegal_moves() {
        let mut b = board(
            "
            . . . . .
            . . . . .
            . . R . .
            . . . . .
            . . . . .
        ",
        );
        let before = b.clone();
        assert!(!b.apply(Move::new(2, 2, 3, 3))); // diagonal
        assert!(!b.apply(Move::new(2, 2, 4, 2))); // two steps with nothing to jump
        assert!(!b.apply(Move::new(0, 0, 1, 0))); // no piece at start
        assert!(!b.apply(Move::new(2, 2, 2, 2))); // standing still
        assert_eq!(b, before);
    }

    #[test]
    fn test_piece_apply_requires_matching_piece() {
        let mut b = board(
            "
            . . . . .
            . . . . .
            . . R . .
            . . . . .
            . . . . .
        ",
        );
        let brown = Piece::rabbit(Colour::Brown);
        assert!(!brown.apply(Move::new(2, 2, 2, 3), &mut b));
        assert!(Piece::rabbit(Colour::White).apply(Move::new(2, 2, 2, 3), &mut b));
    }

    // ========== Board ==========

    #[test]
    fn test_all_moves_uses_fox_heads_only() {
        let b = board(FOX_ROW);
        let moves = b.all_moves();
        assert_eq!(moves.len(), 3);
        assert!(moves.iter().all(|m| m.start() == (1, 1)));
    }

    #[test]
    fn test_every_move_reverses() {
        let start = board(
            "
            M . R . M
            . . FH0 . .
            . . FT0 . Rb
            . . . FH1 FT1
            M . . Rg .
        ",
        );
        for mov in start.all_moves() {
            let mut b = start.clone();
            assert!(b.apply(mov), "{mov} should be legal");
            assert_ne!(b, start);
            assert!(b.apply(mov.reverse()), "reverse of {mov} should be legal");
            assert_eq!(b, start, "reversing {mov} should restore the board");
        }
    }

    #[test]
    fn test_clone_is_independent() {
        let original = board(FOX_ROW);
        let mut copy = original.clone();
        assert!(copy.apply(Move::new(1, 1, 0, 1)));
        assert_ne!(copy, original);
        assert_eq!(
            original.piece(1, 1),
            Some(Piece::fox(Direction::Horizontal, FoxHalf::Head, 0))
        );
    }

    #[test]
    fn test_holes_and_rabbits_home() {
        assert!(Board::is_hole(0, 0));
        assert!(Board::is_hole(2, 2));
        assert!(!Board::is_hole(1, 0));

        let mut b = board(
            "
            R . . . .
            . . . . .
            . . . . .
            . . . . .
            . . . Rb .
        ",
        );
        assert!(!b.rabbits_home());
        assert!(b.apply(Move::new(3, 4, 4, 4)));
        assert!(b.rabbits_home());
    }

    // ========== State Key ==========

    #[test]
    fn test_state_key_ignores_name() {
        let a = Board::parse("a", FOX_ROW).unwrap();
        let b = Board::parse("b", FOX_ROW).unwrap();
        assert_ne!(a, b);
        assert_eq!(a.state_key(), b.state_key());
    }

    #[test]
    fn test_state_key_distinguishes_layouts() {
        let a = board(FOX_ROW);
        let mut b = a.clone();
        assert!(b.apply(Move::new(1, 1, 0, 1)));
        assert_ne!(a.state_key(), b.state_key());
    }

    #[test]
    fn test_state_key_roundtrip() {
        let original = board(
            "
            M . R . M
            . . FH0 . .
            . . FT0 . Rb
            . . . FH5 FT5
            M . . Rg .
        ",
        );
        let key = original.state_key();
        let decoded = Board::from_state_key("test", key).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_state_key_cell_codes() {
        let b = board(
            "
            . M R Rb Rg
            FH0 FT0 . . .
            . . . . .
            . . . . .
            . . . . .
        ",
        );
        let key = b.state_key();
        assert_eq!(key.cell(0, 0), 0);
        assert_eq!(key.cell(1, 0), 1);
        assert_eq!(key.cell(2, 0), 2);
        assert_eq!(key.cell(3, 0), 3);
        assert_eq!(key.cell(4, 0), 4);
        assert_eq!(key.cell(0, 1), 5);
        assert_eq!(key.cell(1, 1), 6);
    }

    #[test]
    fn test_state_key_rejects_garbage() {
        assert!(Board::from_state_key("x", StateKey(u128::MAX)).is_none());
        // A lone fox head is not a valid board.
        assert!(Board::from_state_key("x", StateKey(5)).is_none());
    }

    // ========== Goals ==========

    #[test]
    fn test_goal_spec_fox_head_at() {
        let mut b = board(FOX_ROW);
        let goal = GoalSpec::FoxHeadAt { id: 0, x: 3, y: 1 };
        assert!(!goal.is_reached(&b));
        assert!(b.apply(Move::new(1, 1, 3, 1)));
        assert!(goal.is_reached(&b));
        assert!(!GoalSpec::FoxHeadAt { id: 1, x: 3, y: 1 }.is_reached(&b));
    }

    #[test]
    fn test_closure_goal() {
        let b = board(FOX_ROW);
        let goal = |board: &Board| board.is_occupied(1, 1);
        assert!(goal.is_reached(&b));
    }

    // ========== Fuzz ==========

    #[test]
    fn test_random_walk_unwinds() {
        use rand::prelude::*;

        let mut rng = rand::rng();
        let start = board(
            "
            M . R . M
            . . FH0 . .
            . . FT0 . Rb
            . . . FH1 FT1
            M . . Rg .
        ",
        );

        for _ in 0..100 {
            let mut b = start.clone();
            let mut played = Vec::new();

            for _ in 0..20 {
                let moves = b.all_moves();
                if moves.is_empty() {
                    break;
                }
                let mov = moves[rng.random_range(0..moves.len())];
                assert!(b.apply(mov));
                played.push(mov);
            }

            for mov in played.iter().rev() {
                assert!(b.apply(mov.reverse()), "could not undo {mov}");
            }
            assert_eq!(b, start, "random walk did not unwind");
        }
    }
}
