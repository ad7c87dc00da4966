use super::Position;
use derive_more::{DebugCustom, Display, Error};
use shakmaty as sm;
use std::str::FromStr;

/// A representation of the [Forsyth–Edwards Notation].
///
/// [Forsyth–Edwards Notation]: https://www.chessprogramming.org/Forsyth-Edwards_Notation
#[derive(DebugCustom, Display, Clone, Eq, PartialEq)]
#[debug(fmt = "Fen(\"{}\")", self)]
#[display(fmt = "{}", _0)]
pub struct Fen(sm::fen::Fen);

impl Fen {
    /// Whether this is the standard starting position.
    pub fn is_standard(&self) -> bool {
        *self == Fen::default()
    }
}

/// The standard starting position.
impl Default for Fen {
    fn default() -> Self {
        Position::default().into()
    }
}

/// The reason why the string is not valid FEN.
#[derive(Debug, Display, Clone, Error)]
#[display(fmt = "{}", _0)]
pub struct ParseFenError(#[error(not(source))] sm::fen::ParseFenError);

impl FromStr for Fen {
    type Err = ParseFenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Fen(s.parse().map_err(ParseFenError)?))
    }
}

impl From<Position> for Fen {
    fn from(pos: Position) -> Self {
        sm::Position::into_setup(sm::Chess::from(pos), sm::EnPassantMode::Legal).into()
    }
}

#[doc(hidden)]
impl From<sm::Setup> for Fen {
    fn from(setup: sm::Setup) -> Self {
        Fen(sm::fen::Fen(setup))
    }
}

#[doc(hidden)]
impl From<Fen> for sm::fen::Fen {
    fn from(fen: Fen) -> Self {
        fen.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_strategy::proptest;

    #[proptest]
    fn parsing_printed_fen_is_an_identity(pos: Position) {
        let fen = Fen::from(pos);
        assert_eq!(fen.to_string().parse::<Fen>().ok(), Some(fen));
    }

    #[proptest]
    fn parsing_invalid_fen_fails(
        #[by_ref] pos: Position,
        #[strategy(..=Fen::from(#pos.clone()).to_string().len())] n: usize,
        #[strategy("[^[:ascii:]]+")] r: String,
    ) {
        let fen = Fen::from(pos).to_string();
        assert!([&fen[..n], &r].concat().parse::<Fen>().is_err());
    }

    #[proptest]
    fn default_fen_is_the_standard_starting_position() {
        assert_eq!(
            Fen::default().to_string(),
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"
        );

        assert!(Fen::default().is_standard());
    }
}
