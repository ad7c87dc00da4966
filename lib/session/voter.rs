use derive_more::{Display, From};
use serde::{Deserialize, Serialize};

/// The identity of a participant who casts votes.
#[derive(
    Debug, Display, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, From, Serialize, Deserialize,
)]
#[derive(test_strategy::Arbitrary)]
#[serde(transparent)]
pub struct Voter(u64);
