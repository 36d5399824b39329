//! Pitcher metric derivation. Every function reads only the fields it needs
//! and returns `None` when one of them is missing or malformed, so a single
//! bad stat never takes down its siblings.

use crate::types::{DerivedMetrics, PitcherSeasonStats, StatValue};

/// Derive every persisted metric from a season payload.
/// Unavailable stats yield all-`None` metrics.
pub fn derive_metrics(stats: Option<&PitcherSeasonStats>) -> DerivedMetrics {
    let Some(s) = stats else {
        return DerivedMetrics::default();
    };

    DerivedMetrics {
        era: era(s),
        win_percentage: win_percentage(s),
        wins: wins(s),
        losses: losses(s),
        innings_pitched: innings_pitched(s),
        k_per_9: k_per_9(s),
        bb_per_9: bb_per_9(s),
        k_bb_diff: k_bb_diff(s),
        whip: whip(s),
        babip: babip(s),
    }
}

/// Earned run average, two decimals.
pub fn era(s: &PitcherSeasonStats) -> Option<f64> {
    number(&s.era).map(|v| round_to(v, 2))
}

/// Win percentage, three decimals. The provider sends "-.--" before a decision.
pub fn win_percentage(s: &PitcherSeasonStats) -> Option<f64> {
    number(&s.win_percentage).map(|v| round_to(v, 3))
}

pub fn wins(s: &PitcherSeasonStats) -> Option<i64> {
    integer(&s.wins)
}

pub fn losses(s: &PitcherSeasonStats) -> Option<i64> {
    integer(&s.losses)
}

pub fn innings_pitched(s: &PitcherSeasonStats) -> Option<f64> {
    s.innings_pitched
        .as_ref()
        .and_then(|v| normalize_innings(&v.as_text()))
}

/// Provider innings use `.1` / `.2` for one and two outs. The out count is
/// multiplied by 3 and glued back on: `"5.2"` → `5.6`, `"7.1"` → `7.3`.
/// Values without a fractional part are rejected.
pub fn normalize_innings(raw: &str) -> Option<f64> {
    let (whole, outs) = raw.trim().split_once('.')?;
    let outs = outs.parse::<u32>().ok()?.checked_mul(3)?;
    format!("{whole}.{outs}").parse::<f64>().ok()
}

pub fn k_per_9(s: &PitcherSeasonStats) -> Option<f64> {
    number(&s.strikeouts_per_9)
}

pub fn bb_per_9(s: &PitcherSeasonStats) -> Option<f64> {
    number(&s.walks_per_9)
}

/// Strikeout rate minus walk rate, as a ratio of batters faced.
pub fn k_bb_diff(s: &PitcherSeasonStats) -> Option<f64> {
    let strikeouts = number(&s.strike_outs)?;
    let walks = number(&s.base_on_balls)?;
    let batters_faced = number(&s.batters_faced)?;
    if batters_faced == 0.0 {
        return None;
    }
    Some(strikeouts / batters_faced - walks / batters_faced)
}

pub fn whip(s: &PitcherSeasonStats) -> Option<f64> {
    number(&s.whip)
}

/// (H - HR) / (AB - K - HR + SF)
pub fn babip(s: &PitcherSeasonStats) -> Option<f64> {
    let hits = number(&s.hits)?;
    let home_runs = number(&s.home_runs)?;
    let at_bats = number(&s.at_bats)?;
    let strikeouts = number(&s.strike_outs)?;
    let sac_flies = number(&s.sac_flies)?;

    let balls_in_play = at_bats - strikeouts - home_runs + sac_flies;
    if balls_in_play == 0.0 {
        return None;
    }
    Some((hits - home_runs) / balls_in_play)
}

fn number(field: &Option<StatValue>) -> Option<f64> {
    field.as_ref().and_then(StatValue::as_f64)
}

fn integer(field: &Option<StatValue>) -> Option<i64> {
    field.as_ref().and_then(StatValue::as_i64)
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
