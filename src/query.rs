// Read-only facade over the store and aggregators. This is the only surface
// the presentation layer touches; every function is total, so a name that
// matches nothing comes back as a zeroed record rather than an error.

use chrono::NaiveDate;
use serde::Serialize;

use crate::stats::averages::{calculate_stats, PlayerAverages};
use crate::stats::compare::{compare_seasons, PlayerComparison};
use crate::stats::contribution::contribution_score;
use crate::stats::leaders::{get_leaders, LeaderEntry, StatKind};
use crate::stats::opponents::{opponent_stats, OpponentRecord};
use crate::stats::team::{calculate_team_stats, season_overview, SeasonOverview, TeamTotals};
use crate::store::{DataType, GameRef, StatRow, Store};

// ---------------------------------------------------------------------------
// Bundled views
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize)]
pub struct PlayerData {
    pub player_name: String,
    /// Full row history, oldest game first.
    pub rows: Vec<StatRow>,
    pub averages: PlayerAverages,
    pub contribution: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SeasonData {
    pub season: String,
    pub overview: SeasonOverview,
    pub opponents: Vec<OpponentRecord>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GameData {
    pub date: Option<NaiveDate>,
    pub our_rows: Vec<StatRow>,
    pub opponent_rows: Vec<StatRow>,
    pub team: TeamTotals,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StatsSummary {
    pub seasons: Vec<String>,
    pub total_games: u32,
    pub total_players: u32,
    pub total_rows: u32,
}

// ---------------------------------------------------------------------------
// Facade
// ---------------------------------------------------------------------------

pub struct Query<'a> {
    store: &'a Store,
}

impl<'a> Query<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    pub fn seasons(&self) -> Vec<String> {
        self.store.seasons()
    }

    pub fn players(&self, season: Option<&str>) -> Vec<String> {
        self.store.players(season)
    }

    pub fn games(&self, season: Option<&str>) -> Vec<GameRef> {
        self.store
            .games()
            .into_iter()
            .filter(|g| season.map(|s| g.season == s).unwrap_or(true))
            .collect()
    }

    /// Leaderboard over one season, or all seasons when `None`.
    pub fn leaders(&self, season: Option<&str>, stat: StatKind, n: usize) -> Vec<LeaderEntry> {
        match season {
            Some(s) => get_leaders(&self.store.by_season(s), stat, n),
            None => get_leaders(self.store.rows(), stat, n),
        }
    }

    /// A player's history, averages, and contribution score. An unknown name
    /// yields an empty history with zeroed averages.
    pub fn get_player_data(&self, name: &str) -> PlayerData {
        let rows = self.store.by_player(name);
        let averages = calculate_stats(&rows);
        let contribution = contribution_score(&averages);
        PlayerData {
            player_name: name.to_string(),
            rows,
            averages,
            contribution,
        }
    }

    /// One player's lines in two seasons with second-minus-first deltas.
    pub fn compare_player(
        &self,
        name: &str,
        first_season: &str,
        second_season: &str,
    ) -> PlayerComparison {
        let rows = self.store.by_player(name);
        let first: Vec<StatRow> = rows
            .iter()
            .filter(|r| r.season == first_season)
            .cloned()
            .collect();
        let second: Vec<StatRow> = rows
            .iter()
            .filter(|r| r.season == second_season)
            .cloned()
            .collect();
        compare_seasons(first_season, &first, second_season, &second)
    }

    /// Season overview plus the per-opponent table.
    pub fn get_season_data(&self, season: &str) -> SeasonData {
        let rows = self.store.by_season(season);
        SeasonData {
            season: season.to_string(),
            overview: season_overview(&rows),
            opponents: opponent_stats(&rows),
        }
    }

    /// Both viewpoints of one date's game, with team totals over our rows.
    pub fn get_game_data(&self, date: NaiveDate) -> GameData {
        let rows = self.store.by_game(date);
        let (our_rows, opponent_rows): (Vec<StatRow>, Vec<StatRow>) = rows
            .into_iter()
            .partition(|r| r.data_type == DataType::OurTeam);
        let team = calculate_team_stats(&our_rows);
        GameData {
            date: (!our_rows.is_empty() || !opponent_rows.is_empty()).then_some(date),
            our_rows,
            opponent_rows,
            team,
        }
    }

    pub fn stats_summary(&self) -> StatsSummary {
        StatsSummary {
            seasons: self.store.seasons(),
            total_games: self.store.games().len() as u32,
            total_players: self.store.players(None).len() as u32,
            total_rows: self.store.len() as u32,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
