use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::config::{HTTP_TIMEOUT_SECS, MLB_SPORT_ID};
use crate::error::Result;
use crate::stats::payload::{
    parse_players, parse_schedule, parse_season_stats, parse_teams, PlayerEntry, TeamEntry,
};
use crate::stats::StatsProvider;
use crate::types::{Game, PitcherSeasonStats, PlayerId, TeamId};

/// HTTP client for the MLB Stats API.
///
/// The season roster and team list are fetched on first use and reused for
/// the rest of the run; schedules and stats are always fetched fresh.
pub struct StatsApi {
    client: reqwest::Client,
    base_url: String,
    season: i32,
    players: OnceCell<Vec<PlayerEntry>>,
    teams: OnceCell<Vec<TeamEntry>>,
}

impl StatsApi {
    pub fn new(base_url: &str, season: i32) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            season,
            players: OnceCell::new(),
            teams: OnceCell::new(),
        })
    }

    async fn get_text(&self, path: &str) -> Result<String> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "GET");
        let body = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(body)
    }

    async fn get_json(&self, path: &str) -> Result<serde_json::Value> {
        let body = self.get_text(path).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn players(&self) -> Result<&[PlayerEntry]> {
        let players = self
            .players
            .get_or_try_init(|| async {
                let v = self
                    .get_json(&format!(
                        "/api/v1/sports/{MLB_SPORT_ID}/players?season={}",
                        self.season
                    ))
                    .await?;
                let players = parse_players(&v)?;
                info!(season = self.season, count = players.len(), "Loaded player roster");
                Ok::<_, crate::error::AppError>(players)
            })
            .await?;
        Ok(players.as_slice())
    }

    async fn teams(&self) -> Result<&[TeamEntry]> {
        let teams = self
            .teams
            .get_or_try_init(|| async {
                let v = self
                    .get_json(&format!("/api/v1/teams?sportId={MLB_SPORT_ID}"))
                    .await?;
                parse_teams(&v)
            })
            .await?;
        Ok(teams.as_slice())
    }
}

#[async_trait]
impl StatsProvider for StatsApi {
    async fn resolve_player(&self, name: &str) -> Result<Option<PlayerId>> {
        if name.trim().is_empty() {
            return Ok(None);
        }
        let players = self.players().await?;
        Ok(players.iter().find(|p| p.matches(name)).map(|p| p.id))
    }

    async fn season_pitching_stats(&self, player: PlayerId) -> Result<Option<PitcherSeasonStats>> {
        let body = self
            .get_text(&format!(
                "/api/v1/people/{player}?hydrate=stats(group=[pitching],type=[season],sportId={MLB_SPORT_ID})"
            ))
            .await?;
        parse_season_stats(&body)
    }

    async fn team_identifier(&self, team_name: &str) -> Result<Option<TeamId>> {
        let teams = self.teams().await?;
        Ok(teams.iter().find(|t| t.matches(team_name)).map(|t| t.id))
    }

    async fn daily_schedule(&self, date: NaiveDate) -> Result<Vec<Game>> {
        let v = self
            .get_json(&format!(
                "/api/v1/schedule?sportId={MLB_SPORT_ID}&date={}&hydrate=probablePitcher",
                date.format("%m/%d/%Y")
            ))
            .await?;
        parse_schedule(&v)
    }
}
