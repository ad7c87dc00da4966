use crate::config::Config;
use crate::io::{Io, Pipe};
use anyhow::{Context, Error as Anyhow};
use clap::Parser;
use derive_more::{Display, Error, From};
use lib::chess::{Color, Fen, ParseColorError, ParseFenError, CANCELED};
use lib::rules::Standard;
use lib::session::{Advance, Decision, Record, Session, SessionError, Voter};
use std::{io::ErrorKind, num::NonZeroUsize, num::ParseIntError, path::PathBuf, str::FromStr};
use tokio::fs;
use tokio::io::{stdin, stdout};
use tracing::{error, info, instrument, warn};

/// Hosts crowd-voted games over a line-oriented text protocol.
///
/// Each line is a message of the form `<voter> <command> [args...]`.
#[derive(Debug, Parser)]
pub struct Host {
    /// Path to the configuration file.
    #[clap(short, long, default_value = "crowdchess.ron")]
    config: PathBuf,
}

impl Default for Host {
    fn default() -> Self {
        Host {
            config: "crowdchess.ron".into(),
        }
    }
}

impl Host {
    #[instrument(level = "trace", skip(self), err)]
    pub async fn execute(self) -> Result<(), Anyhow> {
        let config = Config::load(&self.config).await?;
        let io = Pipe::new(stdout(), stdin());
        Server::new(io, config, Some(self.config)).run().await
    }
}

/// The reason why parsing a [`Message`] failed.
#[derive(Debug, Display, Error, From)]
enum ParseMessageError {
    #[display(fmt = "expected `<voter> <command> [args...]`")]
    #[from(ignore)]
    Empty,

    #[display(fmt = "invalid voter")]
    #[from(ignore)]
    InvalidVoter(ParseIntError),

    #[display(fmt = "unknown command `{}`", _0)]
    #[from(ignore)]
    UnknownCommand(#[error(not(source))] String),

    #[display(fmt = "missing argument to `{}`", _0)]
    #[from(ignore)]
    MissingArgument(#[error(not(source))] &'static str),

    #[display(fmt = "invalid position")]
    InvalidFen(ParseFenError),

    #[display(fmt = "invalid side")]
    InvalidColor(ParseColorError),

    #[display(fmt = "invalid quorum")]
    #[from(ignore)]
    InvalidQuorum(ParseIntError),
}

#[derive(Debug, Clone, Eq, PartialEq)]
enum Command {
    Start(Option<Fen>),
    End,
    Resign(Color),
    Vote(String),
    Votes,
    Moves,
    Quorum(NonZeroUsize),
    Quit,
}

#[derive(Debug, Clone, Eq, PartialEq)]
struct Message {
    voter: Voter,
    command: Command,
}

impl FromStr for Message {
    type Err = ParseMessageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut tokens = s.split_whitespace();

        let voter = match tokens.next() {
            None => return Err(ParseMessageError::Empty),
            Some(v) => v.parse::<u64>().map_err(ParseMessageError::InvalidVoter)?,
        };

        let command = match tokens.next() {
            None => return Err(ParseMessageError::Empty),
            Some(c) => c.to_lowercase(),
        };

        let command = match command.as_str() {
            "start" => match tokens.collect::<Vec<_>>().join(" ") {
                fen if fen.is_empty() => Command::Start(None),
                fen => Command::Start(Some(fen.parse()?)),
            },

            "end" => Command::End,

            "resign" => match tokens.next() {
                None => return Err(ParseMessageError::MissingArgument("resign")),
                Some(c) => Command::Resign(c.parse()?),
            },

            "vote" => match tokens.next() {
                None => return Err(ParseMessageError::MissingArgument("vote")),
                Some(m) => Command::Vote(m.into()),
            },

            "votes" => Command::Votes,
            "moves" => Command::Moves,

            "quorum" => match tokens.next() {
                None => return Err(ParseMessageError::MissingArgument("quorum")),
                Some(n) => Command::Quorum(n.parse().map_err(ParseMessageError::InvalidQuorum)?),
            },

            "quit" => Command::Quit,
            unknown => return Err(ParseMessageError::UnknownCommand(unknown.into())),
        };

        Ok(Message {
            voter: voter.into(),
            command,
        })
    }
}

struct Server<T: Io> {
    io: T,
    config: Config,
    path: Option<PathBuf>,
    session: Session<Standard>,
}

impl<T: Io> Server<T> {
    fn new(io: T, config: Config, path: Option<PathBuf>) -> Self {
        let session = Session::new(Standard::default(), config.metadata.clone(), config.round);

        Server {
            io,
            config,
            path,
            session,
        }
    }

    async fn run(&mut self) -> Result<(), Anyhow> {
        loop {
            let line = match self.io.recv().await {
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => break Ok(()),
                r => r?,
            };

            if line.trim().is_empty() {
                continue;
            }

            match line.parse::<Message>() {
                Err(e) => {
                    warn!(%line, "{}", e);
                    self.send(format!("error: {}", e)).await?;
                }

                Ok(Message {
                    voter,
                    command: Command::Quit,
                }) if self.config.is_admin(&voter) => {
                    info!(%voter, "quit");
                    break Ok(());
                }

                Ok(msg) => self.handle(msg).await?,
            }

            self.io.flush().await?;
        }
    }

    #[instrument(level = "debug", skip(self), err)]
    async fn handle(&mut self, msg: Message) -> Result<(), Anyhow> {
        let Message { voter, command } = msg;

        match command {
            Command::Start(_) | Command::End | Command::Resign(_) | Command::Quorum(_) | Command::Quit
                if !self.config.is_admin(&voter) =>
            {
                warn!(%voter, "not allowed to manage games");
                self.send(format!("{}: only admins may do that", voter)).await?;
            }

            Command::Start(fen) => {
                let round = self.session.round();
                match self.session.start(round, fen.unwrap_or_default()) {
                    Err(e) => self.send(format!("{}: {}", voter, e)).await?,
                    Ok(()) => {
                        self.send(format!("game {} started", round)).await?;
                        self.moves().await?;
                    }
                }
            }

            Command::End => {
                let result = self.session.end();
                self.conclude(voter, result).await?;
            }

            Command::Resign(side) => {
                let result = self.session.resign(side);
                self.conclude(voter, result).await?;
            }

            Command::Vote(text) => self.vote(voter, &text).await?,

            Command::Votes => {
                if !self.session.is_active() {
                    self.send(SessionError::NotActive).await?;
                } else {
                    let tally = self.session.tally();
                    let votes: Vec<_> = tally
                        .voted()
                        .map(|(m, n)| format!("{} ({})", m, n))
                        .collect();

                    if votes.is_empty() {
                        self.send("nobody has voted yet").await?;
                    } else {
                        self.send(format!("votes: {}", votes.join(", "))).await?;
                    }
                }
            }

            Command::Moves => self.moves().await?,

            Command::Quorum(n) => {
                self.config.quorum = n.get();
                info!(quorum = n.get(), "quorum changed");
                self.send(format!("{} vote(s) required to play a move", n)).await?;
                self.save().await;

                if self.session.is_active() && self.session.total_votes() >= self.config.quorum {
                    self.decide().await?;
                }
            }

            Command::Quit => {}
        }

        Ok(())
    }

    async fn vote(&mut self, voter: Voter, text: &str) -> Result<(), Anyhow> {
        let side = match self.session.turn() {
            None => return self.send(SessionError::NotActive).await,
            Some(side) => side,
        };

        if !self.config.may_vote(&voter, side) {
            warn!(%voter, %side, "voted out of turn");
            return self.send(format!("{}: it's not your turn to play", voter)).await;
        }

        match self.session.submit_vote(voter, text) {
            Err(e) => {
                warn!(%voter, "{}", e);
                self.send(format!("{}: {}", voter, e)).await?;
            }

            Ok(san) => {
                self.send(format!("{} voted for {}", voter, san)).await?;
                if self.session.total_votes() >= self.config.quorum {
                    self.decide().await?;
                }
            }
        }

        Ok(())
    }

    async fn decide(&mut self) -> Result<(), Anyhow> {
        match self.session.decide() {
            Ok(Decision::NoVotes) => Ok(()),

            Ok(Decision::Tie(entries)) => {
                let tied: Vec<_> = entries
                    .iter()
                    .map(|(m, n)| format!("{} ({})", m, n))
                    .collect();

                self.send(format!("tie: {}", tied.join(", "))).await
            }

            Ok(Decision::Played(san, Advance::Continue)) => {
                self.send(format!("played {}", san)).await?;
                self.moves().await
            }

            Ok(Decision::Played(san, Advance::Over(record))) => {
                self.send(format!("played {}", san)).await?;
                if let Err(e) = &record {
                    error!("{}", e);
                }

                self.finish(record.ok()).await
            }

            Err(e) => {
                error!("{}", e);
                Ok(())
            }
        }
    }

    async fn conclude(
        &mut self,
        voter: Voter,
        result: Result<Record, SessionError>,
    ) -> Result<(), Anyhow> {
        match result {
            Ok(record) => self.finish(Some(record)).await,
            Err(SessionError::Record(e)) => {
                error!("{}", e);
                self.finish(None).await
            }

            Err(e) => self.send(format!("{}: {}", voter, e)).await,
        }
    }

    async fn finish(&mut self, record: Option<Record>) -> Result<(), Anyhow> {
        self.config.round = self.session.round();

        match record {
            None => self.send("game over, but it could not be recorded").await?,
            Some(record) => {
                match record.outcome() {
                    None => self.send(format!("game over: {}", CANCELED)).await?,
                    Some(o) => self.send(format!("game over: {}", o)).await?,
                }

                self.send(&record).await?;

                if let Err(e) = self.archive(&record).await {
                    error!("{:?}", e);
                }
            }
        }

        self.save().await;

        Ok(())
    }

    async fn moves(&mut self) -> Result<(), Anyhow> {
        match self.session.turn() {
            None => self.send(SessionError::NotActive).await,
            Some(side) => {
                let moves: Vec<_> = self
                    .session
                    .legal_moves()
                    .iter()
                    .map(ToString::to_string)
                    .collect();

                self.send(format!("{} to play: {}", side, moves.join(", ")))
                    .await
            }
        }
    }

    #[instrument(level = "debug", skip(self, record), err)]
    async fn archive(&self, record: &Record) -> Result<(), Anyhow> {
        if let Some(dir) = &self.config.archive {
            fs::create_dir_all(dir)
                .await
                .context(format!("failed to create `{}`", dir.display()))?;

            let path = dir.join(record.file_name());
            fs::write(&path, record.to_string())
                .await
                .context(format!("failed to write `{}`", path.display()))?;

            info!(path = %path.display(), "game archived");
        }

        Ok(())
    }

    async fn save(&self) {
        if let Some(path) = &self.path {
            if let Err(e) = self.config.save(path).await {
                error!("{:?}", e);
            }
        }
    }

    async fn send<D: ToString>(&mut self, msg: D) -> Result<(), Anyhow> {
        Ok(self.io.send(&msg.to_string()).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MockIo;
    use lib::chess::Position;
    use std::{env::temp_dir, future::ready};
    use test_strategy::proptest;
    use tokio::runtime;

    fn host(config: Config, input: &str) -> (Config, String) {
        let rt = runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .unwrap();

        let mut server = Server::new(Pipe::new(Vec::new(), input.as_bytes()), config, None);
        rt.block_on(server.run()).unwrap();

        let Server { io, config, .. } = server;
        (config, String::from_utf8(io.into_writer()).unwrap())
    }

    #[proptest]
    fn messages_are_parsed(v: u64) {
        assert_eq!(
            format!("{v} start").parse::<Message>()?,
            Message {
                voter: v.into(),
                command: Command::Start(None)
            }
        );

        assert_eq!(
            format!("{v} VOTE Nf3").parse::<Message>()?.command,
            Command::Vote("Nf3".into())
        );

        assert_eq!(
            format!("{v} resign black").parse::<Message>()?.command,
            Command::Resign(Color::Black)
        );

        assert_eq!(
            format!("{v} quorum 3").parse::<Message>()?.command,
            Command::Quorum(NonZeroUsize::new(3).unwrap())
        );
    }

    #[proptest]
    fn start_accepts_a_position(v: u64, pos: Position) {
        let fen = Fen::from(pos);
        assert_eq!(
            format!("{v} start {fen}").parse::<Message>()?.command,
            Command::Start(Some(fen))
        );
    }

    #[proptest]
    fn malformed_messages_are_rejected(v: u64) {
        assert!(matches!("".parse::<Message>(), Err(ParseMessageError::Empty)));
        assert!(matches!(
            "alice vote e4".parse::<Message>(),
            Err(ParseMessageError::InvalidVoter(_))
        ));

        assert!(matches!(
            format!("{v}").parse::<Message>(),
            Err(ParseMessageError::Empty)
        ));

        assert!(matches!(
            format!("{v} castle").parse::<Message>(),
            Err(ParseMessageError::UnknownCommand(_))
        ));

        assert!(matches!(
            format!("{v} vote").parse::<Message>(),
            Err(ParseMessageError::MissingArgument("vote"))
        ));

        assert!(matches!(
            format!("{v} resign grey").parse::<Message>(),
            Err(ParseMessageError::InvalidColor(_))
        ));

        assert!(matches!(
            format!("{v} quorum 0").parse::<Message>(),
            Err(ParseMessageError::InvalidQuorum(_))
        ));

        assert!(matches!(
            format!("{v} start not a fen").parse::<Message>(),
            Err(ParseMessageError::InvalidFen(_))
        ));
    }

    #[test]
    fn move_is_played_once_quorum_is_reached() {
        let (config, output) = host(
            Config::default(),
            "1 start\n1 vote e4\n1 votes\n2 vote E4\n3 votes\n",
        );

        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines[0], "game 1 started");
        assert!(lines[1].starts_with("white to play: "));
        assert_eq!(lines[2], "1 voted for e4");
        assert_eq!(lines[3], "votes: e4 (1)");
        assert_eq!(lines[4], "2 voted for e4");
        assert_eq!(lines[5], "played e4");
        assert!(lines[6].starts_with("black to play: "));
        assert!(lines[6].contains("e5"));
        assert_eq!(lines[7], "nobody has voted yet");
        assert_eq!(config.round, 1);
    }

    #[test]
    fn ties_are_reported_without_playing() {
        let (_, output) = host(Config::default(), "1 start\n1 vote e4\n2 vote d4\n3 moves\n");

        let tie = output.lines().find(|l| l.starts_with("tie: ")).unwrap();
        assert!(tie.contains("e4 (1)"));
        assert!(tie.contains("d4 (1)"));
        assert!(!output.contains("played"));
        assert!(output.lines().last().unwrap().starts_with("white to play: "));
    }

    #[test]
    fn checkmate_ends_the_game_and_advances_the_round() {
        let config = Config {
            round: 7,
            quorum: 1,
            archive: None,
            ..Config::default()
        };

        let (config, output) = host(
            config,
            "1 start\n1 vote f3\n2 vote e5\n1 vote g4\n2 vote Qh4#\n1 moves\n",
        );

        assert!(output.contains("played Qh4#"));
        assert!(output.contains("game over: checkmate by the black player"));
        assert!(output.contains("[Round \"7\"]"));
        assert!(output.contains("[Result \"0-1\"]"));
        assert!(output.lines().last().unwrap().contains("no game is in progress"));
        assert_eq!(config.round, 8);
    }

    #[test]
    fn ended_games_are_canceled_and_archived() {
        let dir = temp_dir().join(format!("crowdchess-archive-{}", std::process::id()));
        let config = Config {
            round: 3,
            archive: Some(dir.clone()),
            ..Config::default()
        };

        let (config, output) = host(config, "1 start\n1 end\n1 end\n");

        assert!(output.contains(&format!("game over: {}", CANCELED)));
        assert!(output.contains("1: no game is in progress"));
        assert_eq!(config.round, 4);

        let archived: Vec<_> = std::fs::read_dir(&dir).unwrap().collect();
        assert_eq!(archived.len(), 1);

        let path = archived[0].as_ref().unwrap().path();
        let pgn = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_dir_all(&dir).unwrap();

        assert!(path.to_string_lossy().contains("game3-"));
        assert!(pgn.contains("[Result \"GAME CANCELED\"]"));
    }

    #[test]
    fn resigning_ends_the_game() {
        let config = Config {
            archive: None,
            ..Config::default()
        };

        let (config, output) = host(config, "1 start\n1 resign white\n");

        assert!(output.contains("game over: white player resigned"));
        assert!(output.contains("[Result \"0-1\"]"));
        assert_eq!(config.round, 2);
    }

    #[proptest]
    fn voters_may_only_vote_for_their_own_side(
        #[filter(#w != Voter::from(0))] w: Voter,
        #[filter(#b != #w && #b != Voter::from(0))] b: Voter,
    ) {
        let config = Config {
            quorum: 1,
            teams: [(w, Color::White), (b, Color::Black)].into(),
            ..Config::default()
        };

        let (_, output) = host(config, &format!("0 start\n{b} vote e4\n0 vote e4\n{w} vote e4\n"));

        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines[2], format!("{b}: it's not your turn to play"));
        assert_eq!(lines[3], "0: it's not your turn to play");
        assert_eq!(lines[4], format!("{w} voted for e4"));
        assert_eq!(lines[5], "played e4");
    }

    #[proptest]
    fn only_admins_may_manage_games(a: Voter, #[filter(#v != #a)] v: Voter) {
        let config = Config {
            admins: [a].into(),
            ..Config::default()
        };

        let (_, output) = host(config, &format!("{v} start\n{v} quit\n{a} start\n{a} quit\n{v} start\n"));

        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines[0], format!("{v}: only admins may do that"));
        assert_eq!(lines[1], format!("{v}: only admins may do that"));
        assert_eq!(lines[2], "game 1 started");
        assert_eq!(lines.len(), 4);
    }

    #[proptest]
    fn lowering_the_quorum_decides_pending_votes(v: Voter) {
        let config = Config {
            quorum: 5,
            ..Config::default()
        };

        let (config, output) = host(config, &format!("{v} start\n{v} vote Nf3\n{v} quorum 1\n"));

        assert_eq!(config.quorum, 1);
        assert!(output.contains("1 vote(s) required to play a move"));
        assert!(output.contains("played Nf3"));
    }

    #[proptest]
    fn illegal_votes_are_reported(v: Voter, #[strategy("[a-z]{6}")] text: String) {
        let (_, output) = host(Config::default(), &format!("{v} start\n{v} vote {text}\n"));
        assert!(output.contains(&format!("{v}: `{text}` is not a legal move")));
    }

    #[test]
    fn malformed_lines_are_reported_and_ignored() {
        let (_, output) = host(Config::default(), "\nhello\n1 start\n");

        let lines: Vec<_> = output.lines().collect();
        assert!(lines[0].starts_with("error: "));
        assert_eq!(lines[1], "game 1 started");
    }

    #[test]
    fn starting_twice_is_reported() {
        let (_, output) = host(Config::default(), "1 start\n1 start\n");
        assert!(output.contains("1: a game is already in progress"));
    }

    #[test]
    fn io_failures_stop_the_host() {
        let rt = runtime::Builder::new_multi_thread().build().unwrap();
        let mut io = MockIo::new();

        io.expect_recv().returning(|| {
            Box::pin(ready(Err(std::io::Error::from(ErrorKind::BrokenPipe))))
        });

        let mut server = Server::new(io, Config::default(), None);
        assert!(rt.block_on(server.run()).is_err());
    }

    #[proptest]
    fn messages_are_flushed_after_each_line(v: Voter) {
        let rt = runtime::Builder::new_multi_thread().build()?;
        let mut io = MockIo::new();
        let mut lines = vec![format!("{v} moves")].into_iter();

        io.expect_recv().returning(move || {
            Box::pin(ready(lines.next().ok_or_else(|| ErrorKind::UnexpectedEof.into())))
        });

        io.expect_send()
            .once()
            .withf(|msg| msg == "no game is in progress")
            .returning(|_| Box::pin(ready(Ok(()))));

        io.expect_flush()
            .once()
            .returning(|| Box::pin(ready(Ok(()))));

        let mut server = Server::new(io, Config::default(), None);
        assert!(rt.block_on(server.run()).is_ok());
    }
}
