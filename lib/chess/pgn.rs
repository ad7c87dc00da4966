use super::{Color, Fen, Outcome, Position, San};
use chrono::NaiveDate;
use std::fmt::{self, Display};

/// The result recorded for games that ended without an [`Outcome`].
pub const CANCELED: &str = "GAME CANCELED";

/// Descriptive tags attached to a [`Pgn`].
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Tags {
    pub event: String,
    pub site: String,
    pub date: NaiveDate,
    pub round: u32,
    pub white: String,
    pub black: String,
}

/// The description of a chess game.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Pgn {
    pub tags: Tags,
    pub start: Position,
    pub moves: Vec<San>,
    pub outcome: Option<Outcome>,
}

impl Pgn {
    /// The value of the `Result` tag.
    ///
    /// Games that ended without an [`Outcome`] are marked as [`CANCELED`].
    pub fn result(&self) -> &'static str {
        self.outcome.as_ref().map_or(CANCELED, Outcome::result)
    }

    /// The name under which the game is archived.
    pub fn file_name(&self) -> String {
        let date = self.tags.date.format("%d-%m-%Y");
        format!("game{}-{}.pgn", self.tags.round, date)
    }
}

/// Prints the [PGN] description of the game
///
/// [PGN]: https://www.chessprogramming.org/Portable_Game_Notation
impl Display for Pgn {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "[Event {:?}]", self.tags.event)?;
        writeln!(f, "[Site {:?}]", self.tags.site)?;
        writeln!(f, "[Date \"{}\"]", self.tags.date.format("%Y.%m.%d"))?;
        writeln!(f, "[Round \"{}\"]", self.tags.round)?;
        writeln!(f, "[White {:?}]", self.tags.white)?;
        writeln!(f, "[Black {:?}]", self.tags.black)?;
        writeln!(f, "[Result {:?}]", self.result())?;

        let fen = Fen::from(self.start.clone());
        if !fen.is_standard() {
            writeln!(f, "[SetUp \"1\"]")?;
            writeln!(f, "[FEN \"{}\"]", fen)?;
        }

        writeln!(f)?;

        let mut turn = self.start.turn();
        let mut number = self.start.fullmoves().get();

        for (i, san) in self.moves.iter().enumerate() {
            match turn {
                Color::White => write!(f, "{}. ", number)?,
                Color::Black if i == 0 => write!(f, "{}... ", number)?,
                Color::Black => {}
            }

            write!(f, "{} ", san)?;

            if turn == Color::Black {
                number = number.saturating_add(1);
            }

            turn = !turn;
        }

        match self.outcome {
            None => write!(f, "*"),
            Some(o) => write!(f, "{}", o.result()),
        }
    }
}
