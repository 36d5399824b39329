pub mod client;
pub mod payload;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::Result;
use crate::types::{Game, PitcherSeasonStats, PlayerId, TeamId};

pub use client::StatsApi;

/// Read-only view of the stats provider. `Ok(None)` means the provider has no
/// match; `Err` means the request itself failed.
#[async_trait]
pub trait StatsProvider: Send + Sync {
    async fn resolve_player(&self, name: &str) -> Result<Option<PlayerId>>;

    async fn season_pitching_stats(&self, player: PlayerId) -> Result<Option<PitcherSeasonStats>>;

    async fn team_identifier(&self, team_name: &str) -> Result<Option<TeamId>>;

    /// All games for `date`, in provider order.
    async fn daily_schedule(&self, date: NaiveDate) -> Result<Vec<Game>>;
}
