//! Parsing of scripted swipe sequences such as `E,E,SE n`.

use delve_core::Direction;
use thiserror::Error;

/// Errors raised while parsing a swipe script.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub(crate) enum SwipeScriptError {
    /// A token is not a compass direction.
    #[error("unknown swipe direction `{token}` at position {position}")]
    UnknownDirection {
        /// Offending token.
        token: String,
        /// One-based position of the token in the script.
        position: usize,
    },
}

/// Parses compass abbreviations or names separated by commas or whitespace.
pub(crate) fn parse(script: &str) -> Result<Vec<Direction>, SwipeScriptError> {
    script
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .enumerate()
        .map(|(index, token)| {
            direction(token).ok_or_else(|| SwipeScriptError::UnknownDirection {
                token: token.to_owned(),
                position: index + 1,
            })
        })
        .collect()
}

fn direction(token: &str) -> Option<Direction> {
    let direction = match token.to_ascii_lowercase().as_str() {
        "n" | "north" => Direction::North,
        "ne" | "northeast" => Direction::NorthEast,
        "e" | "east" => Direction::East,
        "se" | "southeast" => Direction::SouthEast,
        "s" | "south" => Direction::South,
        "sw" | "southwest" => Direction::SouthWest,
        "w" | "west" => Direction::West,
        "nw" | "northwest" => Direction::NorthWest,
        _ => return None,
    };
    Some(direction)
}
