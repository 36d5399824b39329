use std::time::Instant;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::log_keys;
use crate::error::{AppError, Result};
use crate::shipper::PhaseLog;
use crate::stats::StatsProvider;
use crate::types::{Game, GameId, TeamId};
use crate::workflow::{millis, PhaseContext};

#[derive(Serialize)]
struct GameUpdated<'a> {
    game_id: GameId,
    away_team: &'a str,
    home_team: &'a str,
    game_date: &'a str,
    winning_team: Option<TeamId>,
}

/// Writes the winner of every game played on `date` onto its existing row.
/// A schedule fetch failure fails the phase. A game's summary line is only
/// added once its update has committed, so the report never lists a game
/// whose write failed.
pub async fn update_games(
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
    info!(%date, games = games.len(), "Updating yesterday's games");

    let mut log = PhaseLog::new();
    let total = games.len();

    for (i, game) in games.iter().enumerate() {
        info!(game_id = game.game_id, "Updating: {} of {total}...", i + 1);

        let winner = resolve_winner(ctx.stats, game).await;
        let rows = ctx.store.set_winner(game.game_id, winner).await?;

        let winner_label = winner.map_or_else(|| "None".to_string(), |id| id.to_string());
        summary.push(format!(
            "Game ID {} had the winner set to {winner_label}.",
            game.game_id
        ));
        if rows == 0 {
            warn!(game_id = game.game_id, "No stored row matched this game");
        }
        info!(game_id = game.game_id, rows, winner = %winner_label, "{rows} record(s) updated");

        log.record(
            "game_updated",
            &GameUpdated {
                game_id: game.game_id,
                away_team: &game.away_name,
                home_team: &game.home_name,
                game_date: &game.game_date,
                winning_team: winner,
            },
        )?;
    }

    ctx.shipper.ship(log_keys::UPDATED, &log).await?;

    info!(
        updated = total,
        elapsed_ms = millis(started.elapsed()),
        "Finished updating games"
    );
    Ok(())
}

/// Ties, unfinished games and unknown team names all leave the winner empty.
pub async fn resolve_winner(stats: &dyn StatsProvider, game: &Game) -> Option<TeamId> {
    let name = game.winning_team.as_deref()?;
    match stats.team_identifier(name).await {
        Ok(Some(id)) => Some(id),
        Ok(None) => {
            warn!(game_id = game.game_id, team = %name, "No team id for winner, leaving it unset");
            None
        }
        Err(e) => {
            warn!(game_id = game.game_id, team = %name, "Team lookup failed: {e}");
            None
        }
    }
}
