// Leaderboards over one or more seasons of rows.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::Serialize;

use crate::stats::averages::round1;
use crate::store::{DataType, StatRow};

/// The statistics a leaderboard can rank by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatKind {
    Points,
    Rebounds,
    Assists,
    Steals,
    Blocks,
    Turnovers,
}

impl StatKind {
    pub fn label(&self) -> &'static str {
        match self {
            StatKind::Points => "PTS",
            StatKind::Rebounds => "REB",
            StatKind::Assists => "AST",
            StatKind::Steals => "STL",
            StatKind::Blocks => "BLK",
            StatKind::Turnovers => "TO",
        }
    }

    fn value(&self, row: &StatRow) -> u32 {
        match self {
            StatKind::Points => row.pts,
            StatKind::Rebounds => row.reb,
            StatKind::Assists => row.ast,
            StatKind::Steals => row.stl,
            StatKind::Blocks => row.blk,
            StatKind::Turnovers => row.tov,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderEntry {
    pub player_name: String,
    pub games_played: u32,
    pub total: u32,
    pub avg: f64,
}

/// Rank players by per-game average of the given stat. Order is average
/// desc, then total desc, then name asc, so equal lines always list in the
/// same order.
pub fn get_leaders(rows: &[StatRow], stat: StatKind, n: usize) -> Vec<LeaderEntry> {
    let mut per_player: BTreeMap<&str, (u32, u32)> = BTreeMap::new();
    for row in rows.iter().filter(|r| r.data_type == DataType::OurTeam) {
        let entry = per_player.entry(row.player_name.as_str()).or_insert((0, 0));
        entry.0 += 1;
        entry.1 += stat.value(row);
    }

    let mut leaders: Vec<LeaderEntry> = per_player
        .into_iter()
        .map(|(name, (gp, total))| LeaderEntry {
            player_name: name.to_string(),
            games_played: gp,
            total,
            avg: round1(total as f64 / gp as f64),
        })
        .collect();

    leaders.sort_by(|a, b| {
        b.avg
            .partial_cmp(&a.avg)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.total.cmp(&a.total))
            .then_with(|| a.player_name.cmp(&b.player_name))
    });
    leaders.truncate(n);
    leaders
}
