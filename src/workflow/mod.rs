//! The daily run: update yesterday's results, prepare today's games, then
//! report. Phases run strictly in sequence and every game is written before
//! the next one is looked at.

pub mod prepare;
pub mod update;

#[cfg(test)]
mod testing;

use std::time::Duration;

use chrono::{Datelike, Days, Local, NaiveDate};
use tracing::{error, info};

use crate::config::Config;
use crate::db::{GameStore, PgGameStore};
use crate::error::Result;
use crate::notify::{Notifier, SmtpNotifier};
use crate::shipper::{run_timestamp, LogShipper};
use crate::stats::{StatsApi, StatsProvider};
use crate::types::{Phase, PhaseFailure, RunReport, RunState};

pub use prepare::prepare_games;
pub use update::update_games;

/// Calendar days the two phases work on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunDates {
    pub yesterday: NaiveDate,
    pub today: NaiveDate,
}

impl RunDates {
    pub fn around(today: NaiveDate) -> Self {
        Self {
            yesterday: today.checked_sub_days(Days::new(1)).unwrap_or(today),
            today,
        }
    }

    /// Local today/yesterday, either of which can be pinned for backfills.
    pub fn resolve(today: Option<NaiveDate>, yesterday: Option<NaiveDate>) -> Self {
        let base = Self::around(today.unwrap_or_else(|| Local::now().date_naive()));
        Self {
            yesterday: yesterday.unwrap_or(base.yesterday),
            today: base.today,
        }
    }
}

/// What a phase needs to do its work.
pub struct PhaseContext<'a> {
    pub stats: &'a dyn StatsProvider,
    pub store: &'a dyn GameStore,
    pub shipper: &'a LogShipper,
}

pub struct Pipeline<'a> {
    ctx: PhaseContext<'a>,
    notifier: &'a dyn Notifier,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        stats: &'a dyn StatsProvider,
        store: &'a dyn GameStore,
        shipper: &'a LogShipper,
        notifier: &'a dyn Notifier,
    ) -> Self {
        Self {
            ctx: PhaseContext { stats, store, shipper },
            notifier,
        }
    }

    /// Runs both phases and sends the notifications. Phase failures are
    /// captured in the report; only a notification failure is returned as `Err`.
    pub async fn run(&self, run_timestamp: String, dates: RunDates) -> Result<RunReport> {
        let mut report = RunReport::new(run_timestamp);

        transition(&mut report, RunState::Updating);
        if let Err(e) = update_games(&self.ctx, dates.yesterday, &mut report.updated).await {
            error!(phase = %Phase::Update, "Error occurred updating games: {e}");
            report.failures.push(PhaseFailure {
                phase: Phase::Update,
                message: e.to_string(),
            });
        }

        transition(&mut report, RunState::Preparing);
        if let Err(e) = prepare_games(&self.ctx, dates.today, &mut report.prepared).await {
            error!(phase = %Phase::Prepare, "Error occurred preparing games: {e}");
            report.failures.push(PhaseFailure {
                phase: Phase::Prepare,
                message: e.to_string(),
            });
        }

        transition(&mut report, RunState::Notifying);
        if report.succeeded() {
            self.notifier.send_success(&report).await?;
            transition(&mut report, RunState::Done);
        } else {
            for failure in &report.failures {
                self.notifier.send_error(failure.phase, &failure.message).await?;
            }
            transition(&mut report, RunState::ErrorReported);
        }

        Ok(report)
    }
}

/// Saturates instead of wrapping for absurdly long phases.
pub(crate) fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

fn transition(report: &mut RunReport, next: RunState) {
    info!(from = %report.state, to = %next, "Run state");
    report.state = next;
}

/// Opens every run-scoped resource from configuration, runs once, and
/// releases them. Startup failures (connection, credentials) are returned as `Err`.
pub async fn run_once(cfg: &Config, dates: RunDates) -> Result<RunReport> {
    let started = Local::now();
    let stamp = run_timestamp(&started);
    info!(run = %stamp, yesterday = %dates.yesterday, today = %dates.today, "Starting daily run");

    let stats = StatsApi::new(&cfg.stats_api_url, dates.today.year())?;
    let store = PgGameStore::connect(&cfg.database_url, &cfg.table_name).await?;
    let shipper = LogShipper::s3(&cfg.storage, stamp.clone())?;
    let notifier = SmtpNotifier::new(&cfg.email)?;

    let report = Pipeline::new(&stats, &store, &shipper, &notifier)
        .run(stamp, dates)
        .await;

    if let Err(e) = store.close().await {
        error!("Failed to close database connection: {e}");
    }
    report
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use object_store::memory::InMemory;
    use object_store::path::Path as ObjectStorePath;
    use object_store::ObjectStoreExt;

    use super::testing::{game, line, FakeNotifier, FakeStats, FakeStore, Sent, Write};
    use super::*;
    use crate::types::TriggerResponse;

    const STAMP: &str = "2024-06-02_05-00-00";

    fn dates() -> RunDates {
        RunDates::around(NaiveDate::from_ymd_opt(2024, 6, 2).unwrap())
    }

    async fn shipped_lines(store: &InMemory, suffix: &str) -> Option<Vec<serde_json::Value>> {
        let path = ObjectStorePath::from(format!("{STAMP}_{suffix}"));
        let bytes = store.get(&path).await.ok()?.bytes().await.ok()?;
        let text = String::from_utf8(bytes.to_vec()).ok()?;
        Some(text.lines().map(|l| serde_json::from_str(l).unwrap()).collect())
    }

    #[test]
    fn run_dates_default_to_previous_day() {
        let d = dates();
        assert_eq!(d.yesterday, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        let pinned = RunDates::resolve(
            Some(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()),
            Some(NaiveDate::from_ymd_opt(2024, 2, 20).unwrap()),
        );
        assert_eq!(pinned.today, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(pinned.yesterday, NaiveDate::from_ymd_opt(2024, 2, 20).unwrap());
        assert_eq!(
            RunDates::resolve(Some(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()), None).yesterday,
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
    }

    #[test]
    fn elapsed_millis_saturate() {
        assert_eq!(millis(Duration::from_millis(1_250)), 1_250);
        assert_eq!(millis(Duration::MAX), u64::MAX);
    }

    #[tokio::test]
    async fn failed_update_lists_only_committed_games() {
        let d = dates();
        let stats = FakeStats::default()
            .with_schedule(
                d.yesterday,
                vec![
                    game(1, "New York Yankees", "Boston Red Sox"),
                    game(2, "Texas Rangers", "Houston Astros"),
                    game(3, "Chicago Cubs", "St. Louis Cardinals"),
                ],
            )
            .with_schedule(d.today, vec![]);
        let store = FakeStore::failing_winner(2);
        let objects = Arc::new(InMemory::new());
        let shipper = LogShipper::new(objects.clone(), STAMP.to_string());
        let notifier = FakeNotifier::default();

        let report = Pipeline::new(&stats, &store, &shipper, &notifier)
            .run(STAMP.to_string(), d)
            .await
            .unwrap();

        assert_eq!(report.updated, vec!["Game ID 1 had the winner set to None.".to_string()]);
        assert_eq!(store.writes(), vec![Write::Winner(1, None)]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].phase, Phase::Update);
        assert!(shipped_lines(&objects, "updated_games").await.is_none());
    }

    #[tokio::test]
    async fn successful_run_sends_one_summary() {
        let d = dates();
        let mut finished = game(1, "New York Yankees", "Boston Red Sox");
        finished.winning_team = Some("New York Yankees".to_string());
        let stats = FakeStats::default()
            .with_schedule(d.yesterday, vec![finished])
            .with_schedule(d.today, vec![game(2, "Texas Rangers", "Houston Astros")])
            .with_team("New York Yankees", 147)
            .with_pitcher("Away Ace", 10, line())
            .with_pitcher("Home Ace", 11, line());
        let store = FakeStore::default();
        let objects = Arc::new(InMemory::new());
        let shipper = LogShipper::new(objects.clone(), STAMP.to_string());
        let notifier = FakeNotifier::default();

        let report = Pipeline::new(&stats, &store, &shipper, &notifier)
            .run(STAMP.to_string(), d)
            .await
            .unwrap();

        assert_eq!(report.state, RunState::Done);
        assert_eq!(TriggerResponse::from_report(&report), TriggerResponse::success());
        assert_eq!(report.updated, vec!["Game ID 1 had the winner set to 147.".to_string()]);
        assert_eq!(report.prepared, vec!["Texas Rangers @ Houston Astros, game ID 2".to_string()]);

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert!(matches!(&sent[0], Sent::Success { updated: 1, prepared: 1 }));

        let writes = store.writes();
        assert_eq!(writes[0], Write::Winner(1, Some(147)));
        match &writes[1] {
            Write::Insert(row) => {
                assert_eq!(row.home_pitcher.id, Some(11));
                assert_eq!(row.away_pitcher.id, Some(10));
                assert_eq!(row.home_pitcher.metrics.available_count(), 10);
            }
            other => panic!("expected insert, got {other:?}"),
        }

        let updated = shipped_lines(&objects, "updated_games").await.unwrap();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0]["event"], "game_updated");
        assert_eq!(updated[0]["winning_team"], 147);
        let prepared = shipped_lines(&objects, "prepared_games").await.unwrap();
        assert_eq!(prepared.len(), 1);
        assert_eq!(prepared[0]["event"], "game_prepared");
        assert_eq!(prepared[0]["home_team"], "Houston Astros");
    }

    #[tokio::test]
    async fn k_games_give_k_inserts_and_k_events() {
        let d = dates();
        let mut unresolved = game(3, "Seattle Mariners", "Oakland Athletics");
        unresolved.home_probable_pitcher = Some("Nobody Known".to_string());
        let mut unannounced = game(4, "Miami Marlins", "Atlanta Braves");
        unannounced.away_probable_pitcher = None;
        let stats = FakeStats::default()
            .with_schedule(d.yesterday, vec![])
            .with_schedule(
                d.today,
                vec![game(2, "Texas Rangers", "Houston Astros"), unresolved, unannounced],
            )
            .with_pitcher("Away Ace", 10, line())
            .with_pitcher("Home Ace", 11, line());
        let store = FakeStore::default();
        let objects = Arc::new(InMemory::new());
        let shipper = LogShipper::new(objects.clone(), STAMP.to_string());
        let notifier = FakeNotifier::default();

        let report = Pipeline::new(&stats, &store, &shipper, &notifier)
            .run(STAMP.to_string(), d)
            .await
            .unwrap();

        assert!(report.succeeded());
        let inserts = store.inserts();
        assert_eq!(inserts.len(), 3);
        assert_eq!(shipped_lines(&objects, "prepared_games").await.unwrap().len(), 3);

        // unresolved home pitcher: row written, that side empty, other side intact
        let row = &inserts[1];
        assert_eq!(row.game_id, 3);
        assert_eq!(row.home_pitcher.name.as_deref(), Some("Nobody Known"));
        assert_eq!(row.home_pitcher.id, None);
        assert_eq!(row.home_pitcher.metrics.available_count(), 0);
        assert_eq!(row.away_pitcher.metrics.available_count(), 10);

        // unannounced away pitcher
        let row = &inserts[2];
        assert_eq!(row.away_pitcher.name, None);
        assert_eq!(row.away_pitcher.metrics.available_count(), 0);
        assert_eq!(row.home_pitcher.id, Some(11));
    }

    #[tokio::test]
    async fn tie_and_unfinished_games_clear_the_winner() {
        let d = dates();
        let mut tie = game(5, "New York Mets", "Philadelphia Phillies");
        tie.winning_team = None;
        let mut unknown = game(6, "Chicago Cubs", "St. Louis Cardinals");
        unknown.winning_team = Some("Tie".to_string());
        let stats = FakeStats::default()
            .with_schedule(d.yesterday, vec![tie, unknown])
            .with_schedule(d.today, vec![]);
        let store = FakeStore::default();
        let shipper = LogShipper::new(Arc::new(InMemory::new()), STAMP.to_string());
        let notifier = FakeNotifier::default();

        let report = Pipeline::new(&stats, &store, &shipper, &notifier)
            .run(STAMP.to_string(), d)
            .await
            .unwrap();

        assert!(report.succeeded());
        assert_eq!(store.writes(), vec![Write::Winner(5, None), Write::Winner(6, None)]);
        assert_eq!(report.updated[0], "Game ID 5 had the winner set to None.");
        assert!(store.inserts().is_empty(), "update never creates rows");
    }

    #[tokio::test]
    async fn prepare_failure_keeps_earlier_rows_and_reports_once() {
        let d = dates();
        let today: Vec<_> = (1..=5)
            .map(|i| game(100 + i, "Away Club", "Home Club"))
            .collect();
        let stats = FakeStats::default()
            .with_schedule(d.yesterday, vec![])
            .with_schedule(d.today, today);
        let store = FakeStore::failing_insert(3);
        let objects = Arc::new(InMemory::new());
        let shipper = LogShipper::new(objects.clone(), STAMP.to_string());
        let notifier = FakeNotifier::default();

        let report = Pipeline::new(&stats, &store, &shipper, &notifier)
            .run(STAMP.to_string(), d)
            .await
            .unwrap();

        let committed: Vec<_> = store.inserts().iter().map(|r| r.game_id).collect();
        assert_eq!(committed, vec![101, 102]);
        assert_eq!(store.insert_attempts(), 3, "games 4 and 5 are never attempted");

        assert_eq!(report.state, RunState::ErrorReported);
        assert_eq!(TriggerResponse::from_report(&report).status_code, 400);
        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        match &sent[0] {
            Sent::Error { phase, message } => {
                assert_eq!(*phase, Phase::Prepare);
                assert!(message.contains("Database error"), "{message}");
            }
            other => panic!("expected error email, got {other:?}"),
        }
        assert!(shipped_lines(&objects, "prepared_games").await.is_none());
        assert!(shipped_lines(&objects, "updated_games").await.is_some());
    }

    #[tokio::test]
    async fn schedule_failure_fails_update_but_prepare_still_runs() {
        let d = dates();
        let stats = FakeStats::default()
            .with_schedule(d.today, vec![game(2, "Texas Rangers", "Houston Astros")])
            .failing_schedule(d.yesterday);
        let store = FakeStore::default();
        let shipper = LogShipper::new(Arc::new(InMemory::new()), STAMP.to_string());
        let notifier = FakeNotifier::default();

        let report = Pipeline::new(&stats, &store, &shipper, &notifier)
            .run(STAMP.to_string(), d)
            .await
            .unwrap();

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].phase, Phase::Update);
        assert!(report.failures[0].message.contains("Failed to fetch schedule for 2024-06-01"));
        assert_eq!(store.inserts().len(), 1);

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert!(matches!(&sent[0], Sent::Error { phase: Phase::Update, .. }));
        assert_eq!(TriggerResponse::from_report(&report), TriggerResponse::failure());
    }

    #[tokio::test]
    async fn both_phases_failing_send_two_error_emails() {
        let d = dates();
        let stats = FakeStats::default()
            .failing_schedule(d.yesterday)
            .failing_schedule(d.today);
        let store = FakeStore::default();
        let shipper = LogShipper::new(Arc::new(InMemory::new()), STAMP.to_string());
        let notifier = FakeNotifier::default();

        let report = Pipeline::new(&stats, &store, &shipper, &notifier)
            .run(STAMP.to_string(), d)
            .await
            .unwrap();

        let phases: Vec<_> = notifier
            .sent()
            .into_iter()
            .map(|s| match s {
                Sent::Error { phase, .. } => phase,
                Sent::Success { .. } => panic!("no success email on failure"),
            })
            .collect();
        assert_eq!(phases, vec![Phase::Update, Phase::Prepare]);
        assert_eq!(report.state, RunState::ErrorReported);
    }

    #[tokio::test]
    async fn preparing_the_same_day_twice_duplicates_rows() {
        let d = dates();
        let stats = FakeStats::default()
            .with_schedule(d.yesterday, vec![])
            .with_schedule(d.today, vec![game(2, "Texas Rangers", "Houston Astros")]);
        let store = FakeStore::default();
        let shipper = LogShipper::new(Arc::new(InMemory::new()), STAMP.to_string());
        let notifier = FakeNotifier::default();
        let pipeline = Pipeline::new(&stats, &store, &shipper, &notifier);

        pipeline.run(STAMP.to_string(), d).await.unwrap();
        pipeline.run(STAMP.to_string(), d).await.unwrap();

        let ids: Vec<_> = store.inserts().iter().map(|r| r.game_id).collect();
        assert_eq!(ids, vec![2, 2]);
    }

    #[tokio::test]
    async fn notification_failure_is_returned() {
        let d = dates();
        let stats = FakeStats::default()
            .with_schedule(d.yesterday, vec![])
            .with_schedule(d.today, vec![]);
        let store = FakeStore::default();
        let shipper = LogShipper::new(Arc::new(InMemory::new()), STAMP.to_string());
        let notifier = FakeNotifier::failing();

        let result = Pipeline::new(&stats, &store, &shipper, &notifier)
            .run(STAMP.to_string(), d)
            .await;
        assert!(result.is_err());
    }
}
