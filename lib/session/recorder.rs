use super::Metadata;
use crate::chess::{Outcome, Pgn, Tags};
use crate::rules::{ExportError, Rules};
use chrono::NaiveDate;
use derive_more::{Deref, Display};
use tracing::instrument;

/// The record of a finished game.
///
/// Records are only ever produced by [`record`] and can't be changed afterwards.
#[derive(Debug, Display, Clone, Eq, PartialEq, Deref)]
pub struct Record(Pgn);

impl Record {
    /// How the game ended, or `None` if it was canceled.
    pub fn outcome(&self) -> Option<Outcome> {
        self.0.outcome
    }

    /// The round the game was played in.
    pub fn round(&self) -> u32 {
        self.0.tags.round
    }
}

/// Exports the game currently held by the [`Rules`] as a [`Record`].
///
/// The game in progress is left untouched.
#[instrument(level = "debug", skip(rules, metadata), err)]
pub fn record<R: Rules>(
    rules: &R,
    metadata: &Metadata,
    round: u32,
    date: NaiveDate,
) -> Result<Record, ExportError> {
    let tags = Tags {
        event: metadata.event.clone(),
        site: metadata.site.clone(),
        date,
        round,
        white: metadata.white.clone(),
        black: metadata.black.clone(),
    };

    Ok(Record(rules.export(tags)?))
}
