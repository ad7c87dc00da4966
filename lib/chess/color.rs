use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use shakmaty as sm;
use std::{ops::Not, str::FromStr};

/// The color of a chess piece, which also names the side to move.
#[derive(Debug, Display, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[derive(test_strategy::Arbitrary)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Color {
    #[display(fmt = "white")]
    White,
    #[display(fmt = "black")]
    Black,
}

impl Not for Color {
    type Output = Self;

    fn not(self) -> Self {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }
}

/// The reason why the string does not name a [`Color`].
#[derive(Debug, Display, Clone, Eq, PartialEq, Error)]
#[display(fmt = "`{}` is neither white nor black", _0)]
pub struct ParseColorError(#[error(not(source))] pub String);

impl FromStr for Color {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "white" | "w" => Ok(Color::White),
            "black" | "b" => Ok(Color::Black),
            _ => Err(ParseColorError(s.into())),
        }
    }
}

#[doc(hidden)]
impl From<sm::Color> for Color {
    fn from(c: sm::Color) -> Self {
        match c {
            sm::Color::White => Color::White,
            sm::Color::Black => Color::Black,
        }
    }
}

#[doc(hidden)]
impl From<Color> for sm::Color {
    fn from(c: Color) -> Self {
        match c {
            Color::White => sm::Color::White,
            Color::Black => sm::Color::Black,
        }
    }
}
