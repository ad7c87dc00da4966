use crate::chess::{Color, Fen, IllegalMove, IllegalPosition, Outcome, Pgn, San, Tags};
use derive_more::{Display, Error, From};

mod standard;

pub use standard::*;

/// The reason why a game could not be exported.
#[derive(Debug, Display, Clone, Eq, PartialEq, Error, From)]
#[display(fmt = "failed to replay the game")]
pub struct ExportError(IllegalMove);

/// Trait for types that implement the rules of chess on behalf of a game session.
///
/// Implementations own the position exclusively, it can only be changed through this interface.
#[cfg_attr(test, mockall::automock)]
pub trait Rules {
    /// Discards the current game and sets up a new one from the given position.
    fn setup(&mut self, fen: Fen) -> Result<(), IllegalPosition>;

    /// The side to move.
    fn turn(&self) -> Color;

    /// The legal moves in the current position, in a stable order.
    fn moves(&self) -> Vec<San>;

    /// Plays a move if legal in the current position.
    ///
    /// Returns the move as it is canonically spelled.
    fn play(&mut self, san: &San) -> Result<San, IllegalMove>;

    /// Records the resignation of one of the sides.
    fn resign(&mut self, side: Color);

    /// `Some(Outcome)` if the game has ended or `None`.
    fn outcome(&self) -> Option<Outcome>;

    /// How many moves have been played since the game was set up.
    fn ply(&self) -> usize;

    /// Replays the game from its starting position into a [`Pgn`].
    fn export(&self, tags: Tags) -> Result<Pgn, ExportError>;
}
