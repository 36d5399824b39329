pub mod models;
pub mod writer;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{GameId, PreparedGame, TeamId};

pub use writer::PgGameStore;

/// The two statements the pipeline issues. Each call is committed before it
/// returns; there is no upsert, so inserting the same game twice writes two rows.
#[async_trait]
pub trait GameStore: Send + Sync {
    /// Sets `winning_team` on the existing row for `game_id`. Returns rows affected.
    async fn set_winner(&self, game_id: GameId, winning_team: Option<TeamId>) -> Result<u64>;

    /// Inserts one prepared game row. Returns rows affected.
    async fn insert_game(&self, game: &PreparedGame) -> Result<u64>;
}
