//! Built-in level pack, easiest first.

use crate::{Board, GoalSpec, LayoutError, Level};

const LAYOUTS: [&str; 4] = [
    "
    . M R . .
    . . . . .
    . . . M .
    . FH0 FT0 . .
    . . . . .
    ",
    "
    M . R . M
    . . FH0 . .
    . . FT0 . .
    . . . . .
    M . . . M
    ",
    "
    . R Rb . .
    . . . . .
    FH0 FT0 . . .
    . . . . .
    . . . . M
    ",
    "
    M . R . M
    . . FH0 . .
    . . FT0 . .
    . . . FH1 FT1
    M . . Rg .
    ",
];

/// The built-in levels, named "1".."N" in play order.
pub fn default_levels() -> Result<Vec<Level>, LayoutError> {
    LAYOUTS
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let board = Board::parse((i + 1).to_string(), text)?;
            Ok(Level::new(board, GoalSpec::RabbitsHome))
        })
        .collect()
}
