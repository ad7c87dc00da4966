use super::{Color, Fen, Outcome, San};
use derive_more::{DebugCustom, Display, Error};
use shakmaty as sm;
use std::{convert::TryFrom, num::NonZeroU32, str::FromStr};

use proptest::{prelude::*, sample::Selector};

/// Represents an illegal move in a given [`Position`].
#[derive(Debug, Display, Clone, Eq, PartialEq, Error)]
#[display(fmt = "move `{}` is illegal in position `{}`", _0, _1)]
pub struct IllegalMove(pub San, pub Position);

/// The current position on the chess board.
///
/// This type guarantees that it only holds valid positions.
#[derive(DebugCustom, Display, Default, Clone, Eq, PartialEq)]
#[derive(test_strategy::Arbitrary)]
#[debug(fmt = "Position(\"{}\")", self)]
#[display(fmt = "{}", "Fen::from(self.clone())")]
pub struct Position(
    #[strategy((0..128, any::<Selector>()).prop_map(|(moves, selector)| {
        let mut chess = sm::Chess::default();
        for _ in 0..moves {
            match selector.try_select(sm::Position::legal_moves(&chess)) {
                Some(m) => sm::Position::play_unchecked(&mut chess, &m),
                _ => break,
            }
        }
        chess
    }).no_shrink())]
    sm::Chess,
);

impl Position {
    /// The side to move.
    pub fn turn(&self) -> Color {
        sm::Position::turn(&self.0).into()
    }

    /// The number of halfmoves since the last capture or pawn advance.
    ///
    /// It resets to 0 whenever a piece is captured or a pawn is moved.
    pub fn halfmoves(&self) -> u32 {
        sm::Position::halfmoves(&self.0)
    }

    /// The current move number since the start of the game.
    ///
    /// It starts at 1, and is incremented after every move by black.
    pub fn fullmoves(&self) -> NonZeroU32 {
        sm::Position::fullmoves(&self.0)
    }

    /// Whether this position is a [checkmate].
    ///
    /// [checkmate]: https://www.chessprogramming.org/Checkmate
    pub fn is_checkmate(&self) -> bool {
        sm::Position::is_checkmate(&self.0)
    }

    /// Whether this position is a [stalemate].
    ///
    /// [stalemate]: https://www.chessprogramming.org/Stalemate
    pub fn is_stalemate(&self) -> bool {
        sm::Position::is_stalemate(&self.0)
    }

    /// Whether this position has [insufficient material].
    ///
    /// [insufficient material]: https://www.chessprogramming.org/Material#InsufficientMaterial
    pub fn is_material_insufficient(&self) -> bool {
        sm::Position::is_insufficient_material(&self.0)
    }

    /// The [`Outcome`] of the game if this position ends it.
    ///
    /// Repetitions depend on the history of the game and are not detected here.
    pub fn outcome(&self) -> Option<Outcome> {
        if self.is_checkmate() {
            Some(Outcome::Checkmate(!self.turn()))
        } else if self.is_material_insufficient() {
            Some(Outcome::DrawByInsufficientMaterial)
        } else if self.is_stalemate() {
            Some(Outcome::Stalemate)
        } else if self.halfmoves() >= 150 {
            Some(Outcome::DrawBy75MoveRule)
        } else {
            None
        }
    }

    /// Identifies positions that count as the same for the purposes of repetition.
    ///
    /// Two positions share a signature if they have the same piece placement,
    /// side to move, castling rights and en passant square.
    pub fn signature(&self) -> String {
        let fen = Fen::from(self.clone()).to_string();
        fen.split(' ').take(4).collect::<Vec<_>>().join(" ")
    }

    /// The legal moves in this position, in a stable order.
    pub fn moves(&self) -> impl ExactSizeIterator<Item = San> {
        let p = self.0.clone();
        sm::Position::legal_moves(&self.0)
            .into_iter()
            .map(move |vm| sm::san::SanPlus::from_move(p.clone(), &vm).into())
    }

    /// Play a move if legal in this position.
    ///
    /// Returns the move as it is canonically spelled in this position.
    pub fn play(&mut self, san: &San) -> Result<San, IllegalMove> {
        match sm::san::San::to_move(san.as_ref(), &self.0) {
            Ok(vm) if sm::Position::is_legal(&self.0, &vm) => {
                let san = sm::san::SanPlus::from_move(self.0.clone(), &vm).into();
                sm::Position::play_unchecked(&mut self.0, &vm);
                Ok(san)
            }

            _ => Err(IllegalMove(san.clone(), self.clone())),
        }
    }
}

/// The reason why the position represented by the FEN string is illegal.
#[derive(Debug, Display, Clone, Eq, PartialEq, Error)]
pub enum IllegalPosition {
    #[display(fmt = "at least one side has no king")]
    MissingKing,
    #[display(fmt = "at least one side has multiple kings")]
    TooManyKings,
    #[display(fmt = "there are pawns on the back-rank")]
    PawnsOnBackRank,
    #[display(fmt = "the player in check is not to move")]
    OppositeCheck,
    #[display(fmt = "invalid en passant square; wrong rank, occupied, or missing pushed pawn")]
    InvalidEnPassantSquare,
    #[display(fmt = "invalid castling rights")]
    InvalidCastlingRights,
    #[display(fmt = "no sequence of legal moves can reach this position")]
    Other,
}

#[doc(hidden)]
impl From<sm::PositionError<sm::Chess>> for IllegalPosition {
    fn from(e: sm::PositionError<sm::Chess>) -> Self {
        let kinds = e.kinds();

        if kinds.contains(sm::PositionErrorKinds::MISSING_KING) {
            IllegalPosition::MissingKing
        } else if kinds.contains(sm::PositionErrorKinds::TOO_MANY_KINGS) {
            IllegalPosition::TooManyKings
        } else if kinds.contains(sm::PositionErrorKinds::PAWNS_ON_BACKRANK) {
            IllegalPosition::PawnsOnBackRank
        } else if kinds.contains(sm::PositionErrorKinds::OPPOSITE_CHECK) {
            IllegalPosition::OppositeCheck
        } else if kinds.contains(sm::PositionErrorKinds::INVALID_EP_SQUARE) {
            IllegalPosition::InvalidEnPassantSquare
        } else if kinds.contains(sm::PositionErrorKinds::INVALID_CASTLING_RIGHTS) {
            IllegalPosition::InvalidCastlingRights
        } else {
            IllegalPosition::Other
        }
    }
}

impl TryFrom<Fen> for Position {
    type Error = IllegalPosition;

    fn try_from(fen: Fen) -> Result<Self, Self::Error> {
        let fen = sm::fen::Fen::from(fen);
        Ok(Position(fen.into_position(sm::CastlingMode::Standard)?))
    }
}

/// The reason why parsing [`Position`] from a FEN string failed.
#[derive(Debug, Display, Clone, Error)]
pub enum ParsePositionError {
    #[display(fmt = "failed to parse FEN")]
    InvalidFen(super::ParseFenError),
    #[display(fmt = "illegal FEN")]
    IllegalPosition(IllegalPosition),
}

impl FromStr for Position {
    type Err = ParsePositionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fen: Fen = s.parse().map_err(ParsePositionError::InvalidFen)?;
        fen.try_into().map_err(ParsePositionError::IllegalPosition)
    }
}

#[doc(hidden)]
impl From<Position> for sm::Chess {
    fn from(pos: Position) -> Self {
        pos.0
    }
}

#[doc(hidden)]
impl AsRef<sm::Chess> for Position {
    fn as_ref(&self) -> &sm::Chess {
        &self.0
    }
}
