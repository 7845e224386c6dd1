// Head-to-head records against each opponent.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::stats::averages::round1;
use crate::store::{DataType, StatRow};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpponentRecord {
    pub opponent: String,
    pub games: u32,
    pub wins: u32,
    pub losses: u32,
    pub avg_pts_for: f64,
    pub avg_pts_against: f64,
    pub avg_reb_for: f64,
    pub avg_ast_for: f64,
    /// `avg_pts_for - avg_pts_against`.
    pub pts_diff: f64,
}

/// One game's accumulated row totals against one opponent.
struct GameLine {
    date: chrono::NaiveDate,
    pts: u32,
    reb: u32,
    ast: u32,
    team_score: u32,
    opponent_score: u32,
}

/// Per-opponent record over the given rows, most-played opponents first,
/// name ascending among equals. Opponent-viewpoint rows are ignored so a
/// scouted game never counts as one of ours. The "for" averages sum the
/// players' rows per game; "against" comes off the final score.
pub fn opponent_stats(rows: &[StatRow]) -> Vec<OpponentRecord> {
    let mut games: BTreeMap<&str, Vec<GameLine>> = BTreeMap::new();
    for row in rows.iter().filter(|r| r.data_type == DataType::OurTeam) {
        let list = games.entry(row.opponent.as_str()).or_default();
        match list.iter_mut().find(|g| g.date == row.game_date) {
            Some(game) => {
                game.pts += row.pts;
                game.reb += row.reb;
                game.ast += row.ast;
            }
            None => list.push(GameLine {
                date: row.game_date,
                pts: row.pts,
                reb: row.reb,
                ast: row.ast,
                team_score: row.team_score,
                opponent_score: row.opponent_score,
            }),
        }
    }

    let mut records: Vec<OpponentRecord> = games
        .into_iter()
        .map(|(opponent, games)| {
            let n = games.len() as f64;
            let wins = games
                .iter()
                .filter(|g| g.team_score > g.opponent_score)
                .count() as u32;
            let losses = games
                .iter()
                .filter(|g| g.team_score < g.opponent_score)
                .count() as u32;
            let pts_for: f64 = games.iter().map(|g| g.pts as f64).sum();
            let reb_for: f64 = games.iter().map(|g| g.reb as f64).sum();
            let ast_for: f64 = games.iter().map(|g| g.ast as f64).sum();
            let pts_against: f64 = games.iter().map(|g| g.opponent_score as f64).sum();
            let avg_pts_for = round1(pts_for / n);
            let avg_pts_against = round1(pts_against / n);
            OpponentRecord {
                opponent: opponent.to_string(),
                games: games.len() as u32,
                wins,
                losses,
                avg_pts_for,
                avg_pts_against,
                avg_reb_for: round1(reb_for / n),
                avg_ast_for: round1(ast_for / n),
                pts_diff: round1(avg_pts_for - avg_pts_against),
            }
        })
        .collect();

    records.sort_by(|a, b| {
        b.games
            .cmp(&a.games)
            .then_with(|| a.opponent.cmp(&b.opponent))
    });
    records
}
