use super::Pool;
use crate::chess::San;

/// How the votes of a [`Tally`] resolve.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Resolution {
    /// A single move has strictly the most votes.
    Winner(San),

    /// The moves that share the most votes.
    ///
    /// If nobody voted, every legal move is tied at zero votes.
    Tie(Vec<San>),
}

/// The number of votes for each legal move, in the order of the legal moves.
///
/// Moves nobody voted for are counted with zero votes.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct Tally(Vec<(San, usize)>);

impl Tally {
    /// Counts the votes in the [`Pool`] for each of the `legal` moves.
    pub fn new(legal: &[San], pool: &Pool) -> Self {
        Tally(
            legal
                .iter()
                .map(|m| (m.clone(), pool.votes().filter(|&v| v == m).count()))
                .collect(),
        )
    }

    /// The total number of votes counted.
    pub fn total(&self) -> usize {
        self.0.iter().map(|(_, n)| n).sum()
    }

    /// The number of votes for a move.
    pub fn get(&self, san: &San) -> usize {
        self.0.iter().find(|(m, _)| m == san).map_or(0, |&(_, n)| n)
    }

    /// An iterator over the moves and their votes.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &(San, usize)> {
        self.0.iter()
    }

    /// The moves that received at least one vote, with their votes.
    pub fn voted(&self) -> impl Iterator<Item = &(San, usize)> {
        self.0.iter().filter(|(_, n)| *n > 0)
    }

    /// Decides whether a single move has the most votes or several moves are tied.
    pub fn resolve(&self) -> Resolution {
        let max = self.0.iter().map(|&(_, n)| n).max().unwrap_or(0);

        let mut leaders: Vec<_> = self
            .0
            .iter()
            .filter(|&&(_, n)| n == max)
            .map(|(m, _)| m.clone())
            .collect();

        if max > 0 && leaders.len() == 1 {
            Resolution::Winner(leaders.remove(0))
        } else {
            Resolution::Tie(leaders)
        }
    }
}
