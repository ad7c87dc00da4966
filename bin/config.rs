use anyhow::{Context, Error as Anyhow};
use derive_more::{Display, Error, From};
use lib::chess::Color;
use lib::session::{Metadata, Voter};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, collections::BTreeSet, io::ErrorKind, path::Path, path::PathBuf, str::FromStr};
use tokio::fs;
use tracing::instrument;

/// The reason why parsing the configuration failed.
#[derive(Debug, Display, Eq, PartialEq, Error, From)]
#[display(fmt = "failed to parse the configuration")]
pub struct ParseConfigError(ron::de::SpannedError);

/// The persistent state of the host.
#[derive(Debug, Display, Clone, Eq, PartialEq, Deserialize, Serialize)]
#[display(fmt = "{}", "ron::ser::to_string(self).unwrap_or_default()")]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// The round of the next game.
    pub round: u32,

    /// How many votes are needed before a move is decided.
    pub quorum: usize,

    pub metadata: Metadata,

    /// Where finished games are archived, if anywhere.
    pub archive: Option<PathBuf>,

    /// The side each voter plays for.
    ///
    /// If empty, anyone may vote for either side.
    pub teams: BTreeMap<Voter, Color>,

    /// The voters allowed to manage games.
    ///
    /// If empty, anyone may manage games.
    pub admins: BTreeSet<Voter>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            round: 1,
            quorum: 2,
            metadata: Metadata::default(),
            archive: Some("games".into()),
            teams: BTreeMap::new(),
            admins: BTreeSet::new(),
        }
    }
}

impl FromStr for Config {
    type Err = ParseConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(ron::de::from_str(s)?)
    }
}

impl Config {
    /// Reads the configuration from a file, falling back to the default if it doesn't exist.
    #[instrument(level = "debug", err)]
    pub async fn load(path: &Path) -> Result<Self, Anyhow> {
        match fs::read_to_string(path).await {
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Config::default()),
            Err(e) => Err(e).context(format!("failed to read `{}`", path.display())),
            Ok(s) => s.parse().context(format!("invalid `{}`", path.display())),
        }
    }

    /// Writes the configuration to a file.
    #[instrument(level = "debug", skip(self), err)]
    pub async fn save(&self, path: &Path) -> Result<(), Anyhow> {
        let s = ron::ser::to_string_pretty(self, Default::default())
            .context("failed to serialize the configuration")?;

        fs::write(path, s)
            .await
            .context(format!("failed to write `{}`", path.display()))
    }

    /// Whether the voter may vote for the given side.
    pub fn may_vote(&self, voter: &Voter, side: Color) -> bool {
        self.teams.is_empty() || self.teams.get(voter) == Some(&side)
    }

    /// Whether the voter may start and end games or change the quorum.
    pub fn is_admin(&self, voter: &Voter) -> bool {
        self.admins.is_empty() || self.admins.contains(voter)
    }
}
