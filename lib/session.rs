use crate::chess::{Color, Fen, IllegalPosition, Outcome, San};
use crate::rules::{ExportError, Rules};
use chrono::Local;
use derive_more::{Display, Error, From};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

mod pool;
mod recorder;
mod tally;
mod voter;

pub use pool::*;
pub use recorder::*;
pub use tally::*;
pub use voter::*;

/// The tags stamped into the record of every game.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[derive(test_strategy::Arbitrary)]
#[serde(default)]
pub struct Metadata {
    pub event: String,
    pub site: String,
    pub white: String,
    pub black: String,
}

impl Default for Metadata {
    fn default() -> Self {
        Metadata {
            event: "Crowd Chess".into(),
            site: "?".into(),
            white: "White team".into(),
            black: "Black team".into(),
        }
    }
}

/// The reason why a [`Session`] operation failed.
#[derive(Debug, Display, Clone, Eq, PartialEq, Error, From)]
pub enum SessionError {
    #[display(fmt = "a game is already in progress")]
    #[from(ignore)]
    AlreadyActive,

    #[display(fmt = "no game is in progress")]
    #[from(ignore)]
    NotActive,

    #[display(fmt = "the starting position is illegal")]
    IllegalPosition(IllegalPosition),

    #[display(fmt = "`{}` can't be played in the current position", _0)]
    #[from(ignore)]
    IllegalMove(#[error(not(source))] San),

    #[display(fmt = "the starting position is already over by {}", _0)]
    #[from(ignore)]
    Finished(#[error(not(source))] Outcome),

    #[display(fmt = "failed to record the game")]
    Record(ExportError),
}

/// What happened to the game after a move was played.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Advance {
    /// The game goes on.
    Continue,

    /// The move ended the game, which may have failed to be recorded.
    ///
    /// The session is idle either way.
    Over(Result<Record, ExportError>),
}

/// The result of [`Session::decide`].
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Decision {
    /// Nobody has voted yet.
    NoVotes,

    /// The moves that share the most votes, along with their votes.
    Tie(Vec<(San, usize)>),

    /// The move with the most votes was played.
    Played(San, Advance),
}

/// A game played by a crowd that votes on every move.
///
/// A session is either idle or has a game in progress.
/// While in progress, the legal moves are always those of the current position.
#[derive(Debug)]
pub struct Session<R: Rules> {
    rules: R,
    metadata: Metadata,
    round: u32,
    active: bool,
    moves: Vec<San>,
    pool: Pool,
}

impl<R: Rules> Session<R> {
    /// Constructs an idle session.
    pub fn new(rules: R, metadata: Metadata, round: u32) -> Self {
        Session {
            rules,
            metadata,
            round,
            active: false,
            moves: Vec::new(),
            pool: Pool::default(),
        }
    }

    /// Whether a game is in progress.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// The round of the current game, or of the next one if idle.
    pub fn round(&self) -> u32 {
        self.round
    }

    /// The tags stamped into every record.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// The rules of the game.
    pub fn rules(&self) -> &R {
        &self.rules
    }

    /// The legal moves in the current position.
    ///
    /// Empty if no game is in progress.
    pub fn legal_moves(&self) -> &[San] {
        &self.moves
    }

    /// The side to move, if a game is in progress.
    pub fn turn(&self) -> Option<Color> {
        self.active.then(|| self.rules.turn())
    }

    /// The vote of a participant, if any.
    pub fn vote(&self, voter: &Voter) -> Option<&San> {
        self.pool.get(voter)
    }

    /// The number of participants who have voted on the current move.
    pub fn total_votes(&self) -> usize {
        self.pool.len()
    }

    /// The votes for each legal move.
    pub fn tally(&self) -> Tally {
        Tally::new(&self.moves, &self.pool)
    }

    /// Starts a new game from the given position.
    #[instrument(level = "debug", skip(self), err)]
    pub fn start(&mut self, round: u32, fen: Fen) -> Result<(), SessionError> {
        if self.active {
            return Err(SessionError::AlreadyActive);
        }

        self.rules.setup(fen)?;

        if let Some(o) = self.rules.outcome() {
            return Err(SessionError::Finished(o));
        }

        self.round = round;
        self.pool.clear();
        self.refresh();
        self.active = true;

        info!(round, turn = %self.rules.turn(), "game started");

        Ok(())
    }

    /// Ends the game in progress and returns its [`Record`].
    ///
    /// The session becomes idle even if the game can't be recorded.
    #[instrument(level = "debug", skip(self), err)]
    pub fn end(&mut self) -> Result<Record, SessionError> {
        if !self.active {
            return Err(SessionError::NotActive);
        }

        Ok(self.finish()?)
    }

    /// Records the vote of a participant, replacing any previous one.
    ///
    /// Only legal moves are accepted, so no vote is accepted while idle.
    #[instrument(level = "trace", skip(self), err)]
    pub fn submit_vote(&mut self, voter: Voter, text: &str) -> Result<San, Rejected> {
        self.pool.submit(voter, text, &self.moves)
    }

    /// Plays a move and discards every vote.
    ///
    /// The move may be spelled without its check or checkmate suffix.
    /// If the move ends the game, the session becomes idle.
    #[instrument(level = "debug", skip(self), err)]
    pub fn apply(&mut self, san: &San) -> Result<Advance, SessionError> {
        if !self.active {
            return Err(SessionError::NotActive);
        }

        let legal = match self.moves.iter().find(|m| m.is_same_move(san)) {
            Some(m) => m.clone(),
            None => {
                error!(%san, "attempted to play a move that is not legal");
                return Err(SessionError::IllegalMove(san.clone()));
            }
        };

        let played = match self.rules.play(&legal) {
            Ok(m) => m,
            Err(e) => {
                error!(%san, "{}", e);
                return Err(SessionError::IllegalMove(san.clone()));
            }
        };

        self.pool.clear();
        self.refresh();

        info!(san = %played, ply = self.rules.ply(), "move played");

        match self.rules.outcome() {
            None => Ok(Advance::Continue),
            Some(o) => {
                info!(outcome = %o, "game ended");
                Ok(Advance::Over(self.finish()))
            }
        }
    }

    /// Plays the move with the most votes, unless several moves are tied.
    ///
    /// Votes are left untouched unless a move is played.
    #[instrument(level = "debug", skip(self), err)]
    pub fn decide(&mut self) -> Result<Decision, SessionError> {
        if !self.active {
            return Err(SessionError::NotActive);
        } else if self.pool.is_empty() {
            return Ok(Decision::NoVotes);
        }

        let tally = self.tally();
        match tally.resolve() {
            Resolution::Winner(san) => {
                let advance = self.apply(&san)?;
                Ok(Decision::Played(san, advance))
            }

            Resolution::Tie(ms) => Ok(Decision::Tie(
                ms.into_iter()
                    .map(|m| {
                        let n = tally.get(&m);
                        (m, n)
                    })
                    .collect(),
            )),
        }
    }

    /// Ends the game in progress by the resignation of one of the sides.
    #[instrument(level = "debug", skip(self), err)]
    pub fn resign(&mut self, side: Color) -> Result<Record, SessionError> {
        if !self.active {
            return Err(SessionError::NotActive);
        }

        self.rules.resign(side);
        info!(%side, "resigned");

        Ok(self.finish()?)
    }

    fn refresh(&mut self) {
        self.moves = self.rules.moves();
    }

    fn finish(&mut self) -> Result<Record, ExportError> {
        let date = Local::now().date_naive();
        let record = record(&self.rules, &self.metadata, self.round, date);

        self.active = false;
        self.pool.clear();
        self.moves.clear();
        self.round = self.round.saturating_add(1);

        match &record {
            Ok(r) => info!(round = r.round(), result = r.result(), "game recorded"),
            Err(e) => error!("{}", e),
        }

        record
    }
}
