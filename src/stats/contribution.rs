// Contribution score: one number summarizing a player's all-around impact.

use crate::stats::averages::PlayerAverages;

// Weights are part of the public contract; the dashboard documents them.
pub const WEIGHT_PPG: f64 = 1.0;
pub const WEIGHT_RPG: f64 = 1.2;
pub const WEIGHT_APG: f64 = 1.5;
pub const WEIGHT_SPG: f64 = 3.0;
pub const WEIGHT_BPG: f64 = 3.0;
pub const WEIGHT_TOPG: f64 = -2.0;

/// Weighted combination of per-game averages, rounded to two decimals.
/// Turnovers subtract; a careless scorer can rank below a quiet defender.
pub fn contribution_score(avg: &PlayerAverages) -> f64 {
    let raw = WEIGHT_PPG * avg.ppg
        + WEIGHT_RPG * avg.rpg
        + WEIGHT_APG * avg.apg
        + WEIGHT_SPG * avg.spg
        + WEIGHT_BPG * avg.bpg
        + WEIGHT_TOPG * avg.topg;
    (raw * 100.0).round() / 100.0
}
