// Cross-season comparison for a single player.

use serde::Serialize;

use crate::stats::averages::{calculate_stats, PlayerAverages};
use crate::stats::contribution::contribution_score;
use crate::store::StatRow;

/// One season's line plus its contribution score.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SeasonLine {
    pub season: String,
    pub averages: PlayerAverages,
    pub contribution: f64,
}

/// Second-season-minus-first deltas for the headline averages.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatDelta {
    pub ppg: f64,
    pub rpg: f64,
    pub apg: f64,
    pub spg: f64,
    pub bpg: f64,
    pub topg: f64,
    pub contribution: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlayerComparison {
    pub first: SeasonLine,
    pub second: SeasonLine,
    pub delta: StatDelta,
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn season_line(season: &str, rows: &[StatRow]) -> SeasonLine {
    let averages = calculate_stats(rows);
    let contribution = contribution_score(&averages);
    SeasonLine {
        season: season.to_string(),
        averages,
        contribution,
    }
}

/// Compare one player's lines across two seasons. A season with no rows
/// contributes an all-zero line, so a newcomer's delta is just their current
/// numbers.
pub fn compare_seasons(
    first_season: &str,
    first_rows: &[StatRow],
    second_season: &str,
    second_rows: &[StatRow],
) -> PlayerComparison {
    let first = season_line(first_season, first_rows);
    let second = season_line(second_season, second_rows);

    let delta = StatDelta {
        ppg: round2(second.averages.ppg - first.averages.ppg),
        rpg: round2(second.averages.rpg - first.averages.rpg),
        apg: round2(second.averages.apg - first.averages.apg),
        spg: round2(second.averages.spg - first.averages.spg),
        bpg: round2(second.averages.bpg - first.averages.bpg),
        topg: round2(second.averages.topg - first.averages.topg),
        contribution: round2(second.contribution - first.contribution),
    };

    PlayerComparison {
        first,
        second,
        delta,
    }
}
