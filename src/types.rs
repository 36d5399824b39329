use serde::{Deserialize, Serialize};

pub type PlayerId = i64;
pub type TeamId = i64;
pub type GameId = i64;

// ---------------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------------

/// One scheduled game as reported by the provider for a calendar date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub game_id: GameId,
    pub game_date: String,
    pub home_id: TeamId,
    pub home_name: String,
    pub away_id: TeamId,
    pub away_name: String,
    /// Name of the winning team; only set once the game is final and not tied.
    pub winning_team: Option<String>,
    pub home_probable_pitcher: Option<String>,
    pub away_probable_pitcher: Option<String>,
}

// ---------------------------------------------------------------------------
// Pitcher stats
// ---------------------------------------------------------------------------

/// A raw stat field. The provider sends rates as strings ("3.45", ".571",
/// "-.--") and counts as numbers. Anything else is kept as `Other` so one
/// odd field only blanks the metrics that read it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatValue {
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

impl StatValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            StatValue::Number(n) if n.is_finite() => Some(*n),
            StatValue::Number(_) => None,
            StatValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            StatValue::Other(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            StatValue::Number(n) if n.fract() == 0.0 && n.is_finite() => Some(*n as i64),
            StatValue::Number(_) => None,
            StatValue::Text(s) => s.trim().parse::<i64>().ok(),
            StatValue::Other(_) => None,
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            StatValue::Number(n) => n.to_string(),
            StatValue::Text(s) => s.clone(),
            StatValue::Other(v) => v.to_string(),
        }
    }
}

/// Season pitching aggregate for one pitcher. Every field is optional because
/// the provider omits stats it has no data for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PitcherSeasonStats {
    pub era: Option<StatValue>,
    pub win_percentage: Option<StatValue>,
    pub wins: Option<StatValue>,
    pub losses: Option<StatValue>,
    pub innings_pitched: Option<StatValue>,
    pub strike_outs: Option<StatValue>,
    pub base_on_balls: Option<StatValue>,
    pub batters_faced: Option<StatValue>,
    pub hits: Option<StatValue>,
    pub home_runs: Option<StatValue>,
    pub at_bats: Option<StatValue>,
    pub sac_flies: Option<StatValue>,
    #[serde(rename = "strikeoutsPer9Inn")]
    pub strikeouts_per_9: Option<StatValue>,
    #[serde(rename = "walksPer9Inn")]
    pub walks_per_9: Option<StatValue>,
    pub whip: Option<StatValue>,
}

/// Metrics persisted per pitcher. `None` is stored as NULL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DerivedMetrics {
    pub era: Option<f64>,
    pub win_percentage: Option<f64>,
    pub wins: Option<i64>,
    pub losses: Option<i64>,
    pub innings_pitched: Option<f64>,
    pub k_per_9: Option<f64>,
    pub bb_per_9: Option<f64>,
    pub k_bb_diff: Option<f64>,
    pub whip: Option<f64>,
    pub babip: Option<f64>,
}

impl DerivedMetrics {
    pub fn available_count(&self) -> usize {
        [
            self.era.is_some(),
            self.win_percentage.is_some(),
            self.wins.is_some(),
            self.losses.is_some(),
            self.innings_pitched.is_some(),
            self.k_per_9.is_some(),
            self.bb_per_9.is_some(),
            self.k_bb_diff.is_some(),
            self.whip.is_some(),
            self.babip.is_some(),
        ]
        .into_iter()
        .filter(|v| *v)
        .count()
    }
}

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

/// One side's probable pitcher, resolved and derived.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PitcherLine {
    pub name: Option<String>,
    pub id: Option<PlayerId>,
    pub metrics: DerivedMetrics,
}

/// A fully-built row for the prepare phase INSERT.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreparedGame {
    pub game_id: GameId,
    pub home_team_id: TeamId,
    pub home_team_name: String,
    pub away_team_id: TeamId,
    pub away_team_name: String,
    pub home_pitcher: PitcherLine,
    pub away_pitcher: PitcherLine,
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Update,
    Prepare,
}

impl Phase {
    /// Name used in error reports.
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Update => "update_games",
            Phase::Prepare => "prepare_games",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Updating,
    Preparing,
    Notifying,
    Done,
    ErrorReported,
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunState::Idle => "idle",
            RunState::Updating => "updating",
            RunState::Preparing => "preparing",
            RunState::Notifying => "notifying",
            RunState::Done => "done",
            RunState::ErrorReported => "error_reported",
        };
        write!(f, "{s}")
    }
}

/// A phase that raised, with the error text that goes into the report email.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseFailure {
    pub phase: Phase,
    pub message: String,
}

/// Everything a run produced, handed to the notifier.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_timestamp: String,
    pub updated: Vec<String>,
    pub prepared: Vec<String>,
    pub failures: Vec<PhaseFailure>,
    pub state: RunState,
}

impl RunReport {
    pub fn new(run_timestamp: String) -> Self {
        Self {
            run_timestamp,
            updated: Vec::new(),
            prepared: Vec::new(),
            failures: Vec::new(),
            state: RunState::Idle,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Result handed back to the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriggerResponse {
    pub status_code: u16,
    pub message: String,
}

impl TriggerResponse {
    pub fn success() -> Self {
        Self {
            status_code: 200,
            message: "Script has successfully run. Check logs for further status updates."
                .to_string(),
        }
    }

    pub fn failure() -> Self {
        Self {
            status_code: 400,
            message: "There has been an error when running the script. Check logs for further status updates."
                .to_string(),
        }
    }

    pub fn from_report(report: &RunReport) -> Self {
        if report.succeeded() {
            Self::success()
        } else {
            Self::failure()
        }
    }
}
