//! Parsing of MLB Stats API response bodies into domain types.

use serde::Deserialize;
use tracing::warn;

use crate::error::{AppError, Result};
use crate::types::{Game, PitcherSeasonStats, PlayerId, TeamId};

/// Game states in which the provider's `isWinner` flags are final.
pub const FINAL_STATES: &[&str] = &["Final", "Game Over", "Completed Early"];

/// Name fields a player lookup is matched against.
const PLAYER_NAME_FIELDS: &[&str] = &[
    "fullName",
    "firstLastName",
    "lastFirstName",
    "nameFirstLast",
    "useName",
    "boxscoreName",
    "initLastName",
];

/// Name fields a team lookup is matched against.
const TEAM_NAME_FIELDS: &[&str] = &[
    "name",
    "teamName",
    "abbreviation",
    "shortName",
    "locationName",
    "clubName",
    "franchiseName",
    "fileCode",
    "teamCode",
];

/// A player from the season roster with lowercased searchable names.
#[derive(Debug, Clone)]
pub struct PlayerEntry {
    pub id: PlayerId,
    pub names: Vec<String>,
}

impl PlayerEntry {
    /// Every whitespace-separated token of the query must appear in one of the names.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        let mut tokens = query.split_whitespace().peekable();
        if tokens.peek().is_none() {
            return false;
        }
        tokens.all(|token| self.names.iter().any(|n| n.contains(token)))
    }
}

#[derive(Debug, Clone)]
pub struct TeamEntry {
    pub id: TeamId,
    pub names: Vec<String>,
}

impl TeamEntry {
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        !query.is_empty() && self.names.iter().any(|n| n.contains(&query))
    }
}

/// `/api/v1/schedule` → games in provider order.
pub fn parse_schedule(v: &serde_json::Value) -> Result<Vec<Game>> {
    if !v.is_object() {
        return Err(AppError::Payload("schedule response was not an object".to_string()));
    }
    let Some(dates) = v.get("dates") else {
        return Ok(Vec::new());
    };
    let dates = dates
        .as_array()
        .ok_or_else(|| AppError::Payload("schedule `dates` was not an array".to_string()))?;

    let mut games = Vec::new();
    for date in dates {
        let Some(items) = date.get("games").and_then(|g| g.as_array()) else {
            continue;
        };
        for item in items {
            match parse_game(item) {
                Some(game) => games.push(game),
                None => warn!(
                    game = %item.get("gamePk").map(|g| g.to_string()).unwrap_or_default(),
                    "Skipping schedule entry with missing team data"
                ),
            }
        }
    }
    Ok(games)
}

fn parse_game(v: &serde_json::Value) -> Option<Game> {
    let game_id = v.get("gamePk")?.as_i64()?;
    let home = v.get("teams")?.get("home")?;
    let away = v.get("teams")?.get("away")?;

    let team_id = |side: &serde_json::Value| side.get("team")?.get("id")?.as_i64();
    let team_name = |side: &serde_json::Value| {
        side.get("team")?
            .get("name")?
            .as_str()
            .map(|s| s.to_string())
    };
    let probable = |side: &serde_json::Value| {
        side.get("probablePitcher")
            .and_then(|p| p.get("fullName"))
            .and_then(|n| n.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    };

    let home_name = team_name(home)?;
    let away_name = team_name(away)?;

    let game_date = v
        .get("officialDate")
        .and_then(|d| d.as_str())
        .map(|s| s.to_string())
        .or_else(|| {
            v.get("gameDate")
                .and_then(|d| d.as_str())
                .map(|s| s.chars().take(10).collect())
        })
        .unwrap_or_default();

    let detailed_state = v
        .get("status")
        .and_then(|s| s.get("detailedState"))
        .and_then(|s| s.as_str())
        .unwrap_or("");
    let is_tie = v.get("isTie").and_then(|t| t.as_bool()).unwrap_or(false);
    let is_winner = |side: &serde_json::Value| {
        side.get("isWinner").and_then(|w| w.as_bool()).unwrap_or(false)
    };

    let winning_team = if FINAL_STATES.contains(&detailed_state) && !is_tie {
        if is_winner(away) {
            Some(away_name.clone())
        } else if is_winner(home) {
            Some(home_name.clone())
        } else {
            None
        }
    } else {
        None
    };

    Some(Game {
        game_id,
        game_date,
        home_id: team_id(home)?,
        home_name,
        away_id: team_id(away)?,
        away_name,
        winning_team,
        home_probable_pitcher: probable(home),
        away_probable_pitcher: probable(away),
    })
}

/// `/api/v1/sports/1/players` → searchable roster.
pub fn parse_players(v: &serde_json::Value) -> Result<Vec<PlayerEntry>> {
    let people = v
        .get("people")
        .and_then(|p| p.as_array())
        .ok_or_else(|| AppError::Payload("players response had no `people` array".to_string()))?;

    Ok(people
        .iter()
        .filter_map(|p| {
            Some(PlayerEntry {
                id: p.get("id")?.as_i64()?,
                names: searchable_names(p, PLAYER_NAME_FIELDS),
            })
        })
        .collect())
}

/// `/api/v1/teams` → searchable teams.
pub fn parse_teams(v: &serde_json::Value) -> Result<Vec<TeamEntry>> {
    let teams = v
        .get("teams")
        .and_then(|t| t.as_array())
        .ok_or_else(|| AppError::Payload("teams response had no `teams` array".to_string()))?;

    Ok(teams
        .iter()
        .filter_map(|t| {
            Some(TeamEntry {
                id: t.get("id")?.as_i64()?,
                names: searchable_names(t, TEAM_NAME_FIELDS),
            })
        })
        .collect())
}

fn searchable_names(v: &serde_json::Value, fields: &[&str]) -> Vec<String> {
    fields
        .iter()
        .filter_map(|f| v.get(*f).and_then(|n| n.as_str()))
        .map(|n| n.to_lowercase())
        .collect()
}

#[derive(Debug, Deserialize)]
struct PeopleResponse {
    #[serde(default)]
    people: Vec<Person>,
}

#[derive(Debug, Deserialize)]
struct Person {
    #[serde(default)]
    stats: Vec<StatGroup>,
}

#[derive(Debug, Deserialize)]
struct StatGroup {
    #[serde(default)]
    splits: Vec<StatSplit>,
}

#[derive(Debug, Deserialize)]
struct StatSplit {
    stat: PitcherSeasonStats,
}

/// `/api/v1/people/{id}?hydrate=stats(...)` → first season split, if any.
pub fn parse_season_stats(raw: &str) -> Result<Option<PitcherSeasonStats>> {
    let resp: PeopleResponse = serde_json::from_str(raw)?;
    Ok(resp
        .people
        .into_iter()
        .next()
        .and_then(|p| p.stats.into_iter().flat_map(|g| g.splits).next())
        .map(|s| s.stat))
}
