use std::time::Instant;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::log_keys;
use crate::error::{AppError, Result};
use crate::metrics::derive_metrics;
use crate::shipper::PhaseLog;
use crate::stats::StatsProvider;
use crate::types::{Game, GameId, PitcherLine, PreparedGame};
use crate::workflow::{millis, PhaseContext};

#[derive(Serialize)]
struct GamePrepared<'a> {
    game_id: GameId,
    away_team: &'a str,
    home_team: &'a str,
    game_date: &'a str,
}

/// Inserts one row per game scheduled on `date`, each committed on its own.
/// Stops at the first write failure; rows already written stay.
pub async fn prepare_games(
    ctx: &PhaseContext<'_>,
    date: NaiveDate,
    summary: &mut Vec<String>,
) -> Result<()> {
    let started = Instant::now();

    let games = ctx
        .stats
        .daily_schedule(date)
        .await
        .map_err(|e| AppError::ScheduleFetch {
            date: date.to_string(),
            source: Box::new(e),
        })?;
    info!(%date, games = games.len(), "Preparing today's games");

    let mut log = PhaseLog::new();
    let total = games.len();

    for (i, game) in games.iter().enumerate() {
        info!(game_id = game.game_id, "Preparing: {} of {total}...", i + 1);

        let row = build_row(ctx.stats, game).await;
        let rows = ctx.store.insert_game(&row).await?;

        summary.push(format!(
            "{} @ {}, game ID {}",
            game.away_name, game.home_name, game.game_id
        ));
        info!(
            game_id = game.game_id,
            rows,
            home_metrics = row.home_pitcher.metrics.available_count(),
            away_metrics = row.away_pitcher.metrics.available_count(),
            "{rows} record(s) inserted"
        );

        log.record(
            "game_prepared",
            &GamePrepared {
                game_id: game.game_id,
                away_team: &game.away_name,
                home_team: &game.home_name,
                game_date: &game.game_date,
            },
        )?;
    }

    ctx.shipper.ship(log_keys::PREPARED, &log).await?;

    info!(
        prepared = total,
        elapsed_ms = millis(started.elapsed()),
        "Finished preparing games"
    );
    Ok(())
}

pub async fn build_row(stats: &dyn StatsProvider, game: &Game) -> PreparedGame {
    let home_pitcher = pitcher_line(stats, game.home_probable_pitcher.as_deref()).await;
    let away_pitcher = pitcher_line(stats, game.away_probable_pitcher.as_deref()).await;

    PreparedGame {
        game_id: game.game_id,
        home_team_id: game.home_id,
        home_team_name: game.home_name.clone(),
        away_team_id: game.away_id,
        away_team_name: game.away_name.clone(),
        home_pitcher,
        away_pitcher,
    }
}

/// Resolves a probable pitcher and derives their metrics. Any lookup that
/// fails leaves the affected fields empty instead of failing the game.
pub async fn pitcher_line(stats: &dyn StatsProvider, name: Option<&str>) -> PitcherLine {
    let Some(name) = name else {
        return PitcherLine::default();
    };

    let id = match stats.resolve_player(name).await {
        Ok(Some(id)) => Some(id),
        Ok(None) => {
            warn!(pitcher = %name, "Unable to get an ID for pitcher");
            None
        }
        Err(e) => {
            warn!(pitcher = %name, "Player lookup failed: {e}");
            None
        }
    };

    let season = match id {
        Some(id) => match stats.season_pitching_stats(id).await {
            Ok(Some(s)) => Some(s),
            Ok(None) => {
                warn!(pitcher = %name, player_id = id, "No season pitching stats");
                None
            }
            Err(e) => {
                warn!(pitcher = %name, player_id = id, "Stats lookup failed: {e}");
                None
            }
        },
        None => None,
    };

    PitcherLine {
        name: Some(name.to_string()),
        id,
        metrics: derive_metrics(season.as_ref()),
    }
}
