//! In-memory stand-ins for the provider, the database and the mailer.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::db::GameStore;
use crate::error::{AppError, Result};
use crate::notify::Notifier;
use crate::stats::StatsProvider;
use crate::types::{
    Game, GameId, Phase, PitcherSeasonStats, PlayerId, PreparedGame, RunReport, StatValue, TeamId,
};

/// Game with both probable pitchers announced as "Away Ace" / "Home Ace".
pub fn game(id: GameId, away: &str, home: &str) -> Game {
    Game {
        game_id: id,
        game_date: "2024-06-02".to_string(),
        home_id: 200 + id,
        home_name: home.to_string(),
        away_id: 300 + id,
        away_name: away.to_string(),
        winning_team: None,
        home_probable_pitcher: Some("Home Ace".to_string()),
        away_probable_pitcher: Some("Away Ace".to_string()),
    }
}

/// A season line from which every metric can be derived.
pub fn line() -> PitcherSeasonStats {
    let num = |v: f64| Some(StatValue::Number(v));
    let text = |v: &str| Some(StatValue::Text(v.to_string()));
    PitcherSeasonStats {
        era: text("3.21"),
        win_percentage: text(".600"),
        wins: num(6.0),
        losses: num(4.0),
        innings_pitched: text("72.1"),
        strike_outs: num(75.0),
        base_on_balls: num(22.0),
        batters_faced: num(300.0),
        hits: num(60.0),
        home_runs: num(7.0),
        at_bats: num(270.0),
        sac_flies: num(3.0),
        strikeouts_per_9: text("9.33"),
        walks_per_9: text("2.74"),
        whip: text("1.13"),
    }
}

#[derive(Default)]
pub struct FakeStats {
    schedules: HashMap<NaiveDate, Vec<Game>>,
    failing: HashSet<NaiveDate>,
    teams: HashMap<String, TeamId>,
    players: HashMap<String, PlayerId>,
    lines: HashMap<PlayerId, PitcherSeasonStats>,
}

impl FakeStats {
    pub fn with_schedule(mut self, date: NaiveDate, games: Vec<Game>) -> Self {
        self.schedules.insert(date, games);
        self
    }

    pub fn failing_schedule(mut self, date: NaiveDate) -> Self {
        self.failing.insert(date);
        self
    }

    pub fn with_team(mut self, name: &str, id: TeamId) -> Self {
        self.teams.insert(name.to_string(), id);
        self
    }

    pub fn with_pitcher(mut self, name: &str, id: PlayerId, stats: PitcherSeasonStats) -> Self {
        self.players.insert(name.to_string(), id);
        self.lines.insert(id, stats);
        self
    }
}

#[async_trait]
impl StatsProvider for FakeStats {
    async fn resolve_player(&self, name: &str) -> Result<Option<PlayerId>> {
        Ok(self.players.get(name).copied())
    }

    async fn season_pitching_stats(&self, player: PlayerId) -> Result<Option<PitcherSeasonStats>> {
        Ok(self.lines.get(&player).cloned())
    }

    async fn team_identifier(&self, team_name: &str) -> Result<Option<TeamId>> {
        Ok(self.teams.get(team_name).copied())
    }

    async fn daily_schedule(&self, date: NaiveDate) -> Result<Vec<Game>> {
        if self.failing.contains(&date) {
            return Err(AppError::Payload("schedule unavailable".to_string()));
        }
        Ok(self.schedules.get(&date).cloned().unwrap_or_default())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    Winner(GameId, Option<TeamId>),
    Insert(PreparedGame),
}

/// Records committed writes in order. `fail_on` makes the n-th insert
/// attempt (1-based) fail without committing; `fail_winner` does the same for
/// the update of one game.
#[derive(Default)]
pub struct FakeStore {
    writes: Mutex<Vec<Write>>,
    attempts: Mutex<usize>,
    fail_on: Option<usize>,
    fail_winner: Option<GameId>,
}

impl FakeStore {
    pub fn failing_insert(n: usize) -> Self {
        Self {
            fail_on: Some(n),
            ..Self::default()
        }
    }

    pub fn failing_winner(game_id: GameId) -> Self {
        Self {
            fail_winner: Some(game_id),
            ..Self::default()
        }
    }

    pub fn writes(&self) -> Vec<Write> {
        self.writes.lock().unwrap().clone()
    }

    pub fn inserts(&self) -> Vec<PreparedGame> {
        self.writes()
            .into_iter()
            .filter_map(|w| match w {
                Write::Insert(row) => Some(row),
                Write::Winner(..) => None,
            })
            .collect()
    }

    pub fn insert_attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }
}

#[async_trait]
impl GameStore for FakeStore {
    async fn set_winner(&self, game_id: GameId, winning_team: Option<TeamId>) -> Result<u64> {
        if self.fail_winner == Some(game_id) {
            return Err(sqlx::Error::Protocol("connection reset".to_string()).into());
        }
        self.writes
            .lock()
            .unwrap()
            .push(Write::Winner(game_id, winning_team));
        Ok(1)
    }

    async fn insert_game(&self, game: &PreparedGame) -> Result<u64> {
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            *attempts += 1;
            *attempts
        };
        if self.fail_on == Some(attempt) {
            return Err(sqlx::Error::Protocol("connection reset".to_string()).into());
        }
        self.writes.lock().unwrap().push(Write::Insert(game.clone()));
        Ok(1)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Success { updated: usize, prepared: usize },
    Error { phase: Phase, message: String },
}

#[derive(Default)]
pub struct FakeNotifier {
    sent: Mutex<Vec<Sent>>,
    fail: bool,
}

impl FakeNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    fn push(&self, sent: Sent) -> Result<()> {
        if self.fail {
            return Err(AppError::Io(std::io::Error::other("smtp relay refused")));
        }
        self.sent.lock().unwrap().push(sent);
        Ok(())
    }
}

#[async_trait]
impl Notifier for FakeNotifier {
    async fn send_success(&self, report: &RunReport) -> Result<()> {
        self.push(Sent::Success {
            updated: report.updated.len(),
            prepared: report.prepared.len(),
        })
    }

    async fn send_error(&self, phase: Phase, error: &str) -> Result<()> {
        self.push(Sent::Error {
            phase,
            message: error.to_string(),
        })
    }
}
