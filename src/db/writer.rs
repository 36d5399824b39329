use async_trait::async_trait;
use sqlx::{Connection, PgConnection};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::db::models::{insert_game_sql, update_winner_sql};
use crate::db::GameStore;
use crate::error::Result;
use crate::types::{GameId, PitcherLine, PreparedGame, TeamId};

/// Writes game rows over one Postgres connection held for the whole run.
/// Every statement runs in its own transaction and is committed before the
/// call returns, so earlier rows survive a later failure.
pub struct PgGameStore {
    conn: Mutex<PgConnection>,
    table: String,
    update_sql: String,
    insert_sql: String,
}

impl PgGameStore {
    pub async fn connect(database_url: &str, table: &str) -> Result<Self> {
        let conn = PgConnection::connect(database_url).await?;
        info!(%table, "Database connection open");
        Ok(Self::new(conn, table))
    }

    pub fn new(conn: PgConnection, table: &str) -> Self {
        Self {
            conn: Mutex::new(conn),
            table: table.to_string(),
            update_sql: update_winner_sql(table),
            insert_sql: insert_game_sql(table),
        }
    }

    pub async fn close(self) -> Result<()> {
        self.conn.into_inner().close().await?;
        Ok(())
    }
}

#[async_trait]
impl GameStore for PgGameStore {
    async fn set_winner(&self, game_id: GameId, winning_team: Option<TeamId>) -> Result<u64> {
        let mut conn = self.conn.lock().await;
        let mut tx = conn.begin().await?;
        let done = sqlx::query(&self.update_sql)
            .bind(winning_team)
            .bind(game_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        debug!(game_id, rows = done.rows_affected(), table = %self.table, "winner committed");
        Ok(done.rows_affected())
    }

    async fn insert_game(&self, game: &PreparedGame) -> Result<u64> {
        let mut conn = self.conn.lock().await;
        let mut tx = conn.begin().await?;

        let query = sqlx::query(&self.insert_sql)
            .bind(game.game_id)
            .bind(game.home_team_id)
            .bind(&game.home_team_name)
            .bind(game.away_team_id)
            .bind(&game.away_team_name);
        let query = bind_pitcher_core(query, &game.home_pitcher);
        let query = bind_pitcher_core(query, &game.away_pitcher);
        let query = bind_pitcher_rates(query, &game.home_pitcher);
        let query = bind_pitcher_rates(query, &game.away_pitcher);

        let done = query.execute(&mut *tx).await?;
        tx.commit().await?;

        debug!(game_id = game.game_id, rows = done.rows_affected(), table = %self.table, "game committed");
        Ok(done.rows_affected())
    }
}

type PgQuery<'q> = sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>;

/// name, id, era, win%, wins, losses, innings
fn bind_pitcher_core<'q>(query: PgQuery<'q>, p: &'q PitcherLine) -> PgQuery<'q> {
    query
        .bind(p.name.as_deref())
        .bind(p.id)
        .bind(p.metrics.era)
        .bind(p.metrics.win_percentage)
        .bind(p.metrics.wins)
        .bind(p.metrics.losses)
        .bind(p.metrics.innings_pitched)
}

/// K/9, BB/9, K%-BB%, WHIP, BABIP
fn bind_pitcher_rates<'q>(query: PgQuery<'q>, p: &'q PitcherLine) -> PgQuery<'q> {
    query
        .bind(p.metrics.k_per_9)
        .bind(p.metrics.bb_per_9)
        .bind(p.metrics.k_bb_diff)
        .bind(p.metrics.whip)
        .bind(p.metrics.babip)
}
