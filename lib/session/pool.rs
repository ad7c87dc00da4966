use super::Voter;
use crate::chess::San;
use derive_more::{Display, Error};
use std::collections::HashMap;

/// The reason why a vote was not accepted.
#[derive(Debug, Display, Clone, Eq, PartialEq, Error)]
pub enum Rejected {
    #[display(fmt = "`{}` is not a legal move", _0)]
    Illegal(#[error(not(source))] String),

    #[display(fmt = "`{}` could mean more than one legal move", _0)]
    Ambiguous(#[error(not(source))] String),
}

/// The latest vote of each participant.
///
/// Every vote in the pool is a legal move at the time it was cast.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct Pool(HashMap<Voter, San>);

impl Pool {
    /// The number of participants who have voted.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nobody has voted.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The vote of a participant, if any.
    pub fn get(&self, voter: &Voter) -> Option<&San> {
        self.0.get(voter)
    }

    /// An iterator over the votes in the pool, in no particular order.
    pub fn votes(&self) -> impl ExactSizeIterator<Item = &San> {
        self.0.values()
    }

    /// Discards every vote.
    pub fn clear(&mut self) {
        self.0.clear()
    }

    /// Records a vote for the move spelled by `text` if it is among the `legal` moves.
    ///
    /// The spelling is matched regardless of case, unless more than one legal move matches,
    /// in which case it must match exactly. A previous vote by the same participant is replaced.
    pub fn submit(&mut self, voter: Voter, text: &str, legal: &[San]) -> Result<San, Rejected> {
        let mut candidates = legal.iter().filter(|m| m.matches(text));

        let san = match (candidates.next(), candidates.next()) {
            (None, _) => return Err(Rejected::Illegal(text.into())),
            (Some(m), None) => m,
            (Some(_), Some(_)) => match legal.iter().find(|m| m.to_string() == text) {
                None => return Err(Rejected::Ambiguous(text.into())),
                Some(m) => m,
            },
        };

        self.0.insert(voter, san.clone());
        Ok(san.clone())
    }
}
