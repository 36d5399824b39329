/// Column layout of the games table. The prepare phase writes all of these;
/// the update phase only touches `winning_team`.
pub const INSERT_COLUMNS: &[&str] = &[
    "game_id",
    "home_team_id",
    "home_team_name",
    "away_team_id",
    "away_team_name",
    "home_pitcher",
    "home_pitcher_id",
    "home_pitcher_era",
    "home_pitcher_win_percentage",
    "home_pitcher_wins",
    "home_pitcher_losses",
    "home_pitcher_innings_pitched",
    "away_pitcher",
    "away_pitcher_id",
    "away_pitcher_era",
    "away_pitcher_win_percentage",
    "away_pitcher_wins",
    "away_pitcher_losses",
    "away_pitcher_innings_pitched",
    "home_pitcher_k_nine",
    "home_pitcher_bb_nine",
    "home_pitcher_k_bb_diff",
    "home_pitcher_whip",
    "home_pitcher_babip",
    "away_pitcher_k_nine",
    "away_pitcher_bb_nine",
    "away_pitcher_k_bb_diff",
    "away_pitcher_whip",
    "away_pitcher_babip",
];

pub fn update_winner_sql(table: &str) -> String {
    format!("UPDATE {table} SET winning_team = $1 WHERE game_id = $2")
}

pub fn insert_game_sql(table: &str) -> String {
    let placeholders: Vec<String> = (1..=INSERT_COLUMNS.len()).map(|i| format!("${i}")).collect();
    format!(
        "INSERT INTO {table} ({}) VALUES ({})",
        INSERT_COLUMNS.join(", "),
        placeholders.join(", ")
    )
}
