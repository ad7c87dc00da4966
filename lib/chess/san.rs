use derive_more::{DebugCustom, Display, Error};
use shakmaty as sm;
use std::str::FromStr;

use proptest::{prelude::*, sample::Selector};

/// A move in [standard algebraic notation], including its check or checkmate suffix.
///
/// [standard algebraic notation]: https://en.wikipedia.org/wiki/Algebraic_notation_(chess)
#[derive(DebugCustom, Display, Clone, Eq, PartialEq)]
#[derive(test_strategy::Arbitrary)]
#[debug(fmt = "San(\"{}\")", self)]
#[display(fmt = "{}", _0)]
pub struct San(
    #[strategy(
        (any::<crate::chess::Position>(), any::<Selector>()).prop_filter_map("end position", |(pos, selector)| {
            let m = selector.try_select(sm::Position::legal_moves(pos.as_ref()))?;
            Some(sm::san::SanPlus::from_move(pos.as_ref().clone(), &m))
        })
    )]
    sm::san::SanPlus,
);

impl San {
    /// Whether `text` spells this move, regardless of case.
    pub fn matches(&self, text: &str) -> bool {
        self.to_string().eq_ignore_ascii_case(text)
    }

    /// Whether both spell the same move, ignoring check and checkmate suffixes.
    pub fn is_same_move(&self, other: &San) -> bool {
        self.0.san == other.0.san
    }
}

/// The reason why the string is not valid SAN.
#[derive(Debug, Display, Clone, Error)]
#[display(fmt = "{}", _0)]
pub struct ParseSanError(#[error(not(source))] sm::san::ParseSanError);

impl FromStr for San {
    type Err = ParseSanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(San(s.parse().map_err(ParseSanError)?))
    }
}

#[doc(hidden)]
impl From<sm::san::SanPlus> for San {
    fn from(san: sm::san::SanPlus) -> Self {
        San(san)
    }
}

#[doc(hidden)]
impl AsRef<sm::san::San> for San {
    fn as_ref(&self) -> &sm::san::San {
        &self.0.san
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prop_assume;
    use test_strategy::proptest;

    #[proptest]
    fn parsing_printed_san_is_an_identity(san: San) {
        assert_eq!(san.to_string().parse().ok(), Some(san));
    }

    #[proptest]
    fn parsing_invalid_san_fails(
        #[by_ref]
        #[filter(#s.parse::<sm::san::SanPlus>().is_err())]
        s: String,
    ) {
        assert!(s.parse::<San>().is_err());
    }

    #[proptest]
    fn san_matches_its_own_text_regardless_of_case(san: San) {
        assert!(san.matches(&san.to_string()));
        assert!(san.matches(&san.to_string().to_lowercase()));
        assert!(san.matches(&san.to_string().to_uppercase()));
    }

    #[proptest]
    fn check_suffixes_do_not_change_the_move() {
        let mate: San = "Qh4#".parse()?;

        assert!(mate.is_same_move(&"Qh4".parse()?));
        assert!(mate.is_same_move(&"Qh4+".parse()?));
        assert!(!mate.is_same_move(&"Qh5#".parse()?));
        assert_ne!(mate, "Qh4".parse::<San>()?);
    }

    #[proptest]
    fn san_does_not_match_other_text(san: San, s: String) {
        prop_assume!(!s.eq_ignore_ascii_case(&san.to_string()));
        assert!(!san.matches(&s));
    }
}
