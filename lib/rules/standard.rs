use super::{ExportError, Rules};
use crate::chess::{Color, Fen, IllegalMove, IllegalPosition, Outcome, Pgn, Position, San, Tags};
use tracing::instrument;

/// Standard chess rules.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Standard {
    start: Position,
    current: Position,
    history: Vec<San>,
    signatures: Vec<String>,
    resigned: Option<Color>,
}

impl Default for Standard {
    fn default() -> Self {
        Standard::new(Position::default())
    }
}

impl Standard {
    /// Sets up a new game from the given starting [`Position`].
    pub fn new(start: Position) -> Self {
        Standard {
            signatures: vec![start.signature()],
            current: start.clone(),
            start,
            history: Vec::new(),
            resigned: None,
        }
    }

    /// The current position.
    pub fn position(&self) -> &Position {
        &self.current
    }

    /// The moves played since the game was set up.
    pub fn history(&self) -> &[San] {
        &self.history
    }

    fn repetitions(&self) -> usize {
        let current = self.current.signature();
        self.signatures.iter().filter(|s| **s == current).count()
    }
}

impl Rules for Standard {
    #[instrument(level = "debug", skip(self), err)]
    fn setup(&mut self, fen: Fen) -> Result<(), IllegalPosition> {
        *self = Standard::new(fen.try_into()?);
        Ok(())
    }

    fn turn(&self) -> Color {
        self.current.turn()
    }

    fn moves(&self) -> Vec<San> {
        match self.resigned {
            Some(_) => Vec::new(),
            None => self.current.moves().collect(),
        }
    }

    #[instrument(level = "trace", skip(self), err)]
    fn play(&mut self, san: &San) -> Result<San, IllegalMove> {
        if self.resigned.is_some() {
            return Err(IllegalMove(san.clone(), self.current.clone()));
        }

        let san = self.current.play(san)?;
        self.signatures.push(self.current.signature());
        self.history.push(san.clone());
        Ok(san)
    }

    fn resign(&mut self, side: Color) {
        self.resigned.get_or_insert(side);
    }

    fn outcome(&self) -> Option<Outcome> {
        if let Some(side) = self.resigned {
            Some(Outcome::Resignation(side))
        } else if let Some(o) = self.current.outcome() {
            Some(o)
        } else if self.repetitions() >= 5 {
            Some(Outcome::DrawByFivefoldRepetition)
        } else {
            None
        }
    }

    fn ply(&self) -> usize {
        self.history.len()
    }

    #[instrument(level = "debug", skip(self), err)]
    fn export(&self, tags: Tags) -> Result<Pgn, ExportError> {
        let mut replay = self.start.clone();
        let mut moves = Vec::with_capacity(self.history.len());

        for san in &self.history {
            moves.push(replay.play(san)?);
        }

        Ok(Pgn {
            tags,
            start: self.start.clone(),
            moves,
            outcome: self.outcome(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use proptest::sample::Selector;
    use test_strategy::proptest;

    fn tags() -> Tags {
        Tags {
            event: "?".into(),
            site: "?".into(),
            date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            round: 1,
            white: "?".into(),
            black: "?".into(),
        }
    }

    fn playout(rules: &mut Standard, selector: &Selector, plies: usize) {
        for _ in 0..plies {
            match selector.try_select(rules.moves()) {
                Some(san) if rules.outcome().is_none() => {
                    rules.play(&san).unwrap();
                }
                _ => break,
            }
        }
    }

    #[proptest]
    fn setup_starts_a_new_game(pos: Position, selector: Selector) {
        let mut rules = Standard::default();
        playout(&mut rules, &selector, 10);

        rules.setup(pos.clone().into())?;
        assert_eq!(rules, Standard::new(pos));
        assert_eq!(rules.ply(), 0);
    }

    #[proptest]
    fn setup_fails_for_illegal_positions() {
        let mut rules = Standard::default();
        let fen = "8/8/8/8/8/8/8/8 w - - 0 1".parse()?;
        assert_eq!(rules.setup(fen), Err(IllegalPosition::MissingKing));
        assert_eq!(rules, Standard::default());
    }

    #[proptest]
    fn moves_are_the_legal_moves_of_the_current_position(pos: Position) {
        let rules = Standard::new(pos.clone());
        assert_eq!(rules.moves(), pos.moves().collect::<Vec<_>>());
        assert_eq!(rules.turn(), pos.turn());
    }

    #[proptest]
    fn playing_a_move_advances_the_position(pos: Position, selector: Selector) {
        let mut rules = Standard::new(pos.clone());

        if let Some(san) = selector.try_select(pos.moves()) {
            let mut next = pos.clone();
            next.play(&san)?;

            assert_eq!(rules.play(&san), Ok(san.clone()));
            assert_eq!(rules.position(), &next);
            assert_eq!(rules.history(), &[san]);
            assert_eq!(rules.ply(), 1);
        }
    }

    #[proptest]
    fn playing_an_illegal_move_fails(pos: Position, san: San) {
        let mut rules = Standard::new(pos.clone());
        let mut next = pos.clone();
        if next.play(&san).is_err() {
            assert!(rules.play(&san).is_err());
            assert_eq!(rules, Standard::new(pos));
        }
    }

    #[proptest]
    fn resigning_ends_the_game(pos: Position, c: Color, selector: Selector) {
        let mut rules = Standard::new(pos.clone());
        rules.resign(c);

        assert_eq!(rules.outcome(), Some(Outcome::Resignation(c)));
        assert_eq!(rules.moves(), vec![]);

        if let Some(san) = selector.try_select(pos.moves()) {
            assert!(rules.play(&san).is_err());
        }
    }

    #[proptest]
    fn fivefold_repetition_is_a_draw() {
        let mut rules = Standard::default();

        for _ in 0..4 {
            assert_eq!(rules.outcome(), None);
            for m in ["Nf3", "Nf6", "Ng1", "Ng8"] {
                rules.play(&m.parse()?)?;
            }
        }

        assert_eq!(rules.outcome(), Some(Outcome::DrawByFivefoldRepetition));
    }

    #[proptest]
    fn export_replays_the_game(pos: Position, selector: Selector) {
        let mut rules = Standard::new(pos.clone());
        playout(&mut rules, &selector, 20);

        let pgn = rules.export(tags())?;
        assert_eq!(pgn.start, pos);
        assert_eq!(pgn.moves, rules.history());
        assert_eq!(pgn.outcome, rules.outcome());
        assert_eq!(pgn.tags, tags());
    }

    #[proptest]
    fn export_does_not_change_the_game(pos: Position, selector: Selector) {
        let mut rules = Standard::new(pos);
        playout(&mut rules, &selector, 20);

        let before = rules.clone();
        rules.export(tags())?;

        assert_eq!(rules.ply(), before.ply());
        assert_eq!(rules.moves(), before.moves());
        assert_eq!(rules, before);
    }
}
