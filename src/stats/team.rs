// Team-level aggregation: one game's box totals and the season overview.

use serde::Serialize;

use crate::schema::coerce_percent;
use crate::stats::averages::round1;
use crate::store::{DataType, StatRow};

// ---------------------------------------------------------------------------
// Single-game team totals
// ---------------------------------------------------------------------------

/// Column sums over the players of one game, with percentages recomputed
/// from the summed makes and attempts.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TeamTotals {
    pub pts: u32,
    pub reb: u32,
    pub ast: u32,
    pub stl: u32,
    pub blk: u32,
    pub tov: u32,
    pub pf: u32,
    pub tpm: u32,
    pub tpa: u32,
    pub two_pm: u32,
    pub two_pa: u32,
    pub ftm: u32,
    pub fta: u32,
    pub fg_pct: f64,
    pub tp_pct: f64,
    pub two_pct: f64,
    pub ft_pct: f64,
}

pub fn calculate_team_stats(rows: &[StatRow]) -> TeamTotals {
    let sum = |f: fn(&StatRow) -> u32| rows.iter().map(f).sum::<u32>();

    let tpm = sum(|r| r.tpm);
    let tpa = sum(|r| r.tpa);
    let two_pm = sum(|r| r.two_pm);
    let two_pa = sum(|r| r.two_pa);
    let ftm = sum(|r| r.ftm);
    let fta = sum(|r| r.fta);

    TeamTotals {
        pts: sum(|r| r.pts),
        reb: sum(|r| r.reb),
        ast: sum(|r| r.ast),
        stl: sum(|r| r.stl),
        blk: sum(|r| r.blk),
        tov: sum(|r| r.tov),
        pf: sum(|r| r.pf),
        tpm,
        tpa,
        two_pm,
        two_pa,
        ftm,
        fta,
        fg_pct: round1(coerce_percent((tpm + two_pm) as f64, (tpa + two_pa) as f64)),
        tp_pct: round1(coerce_percent(tpm as f64, tpa as f64)),
        two_pct: round1(coerce_percent(two_pm as f64, two_pa as f64)),
        ft_pct: round1(coerce_percent(ftm as f64, fta as f64)),
    }
}

// ---------------------------------------------------------------------------
// Season overview
// ---------------------------------------------------------------------------

/// One season summarized at the team level. Only `OurTeam` rows contribute;
/// ties count as neither win nor loss. `avg_pts` averages the players'
/// summed PTS per game; `avg_pts_against` comes off the final score.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SeasonOverview {
    pub games: u32,
    pub players: u32,
    pub avg_pts: f64,
    pub avg_pts_against: f64,
    pub wins: u32,
    pub losses: u32,
    pub win_pct: f64,
}

pub fn season_overview(rows: &[StatRow]) -> SeasonOverview {
    let ours: Vec<&StatRow> = rows
        .iter()
        .filter(|r| r.data_type == DataType::OurTeam)
        .collect();
    if ours.is_empty() {
        return SeasonOverview::default();
    }

    // Collapse to distinct games, summing the rows' PTS per game; the other
    // game-level fields repeat on every row.
    let mut games: Vec<(&StatRow, u32)> = Vec::new();
    for &row in &ours {
        match games
            .iter_mut()
            .find(|(g, _)| g.game_date == row.game_date && g.opponent == row.opponent)
        {
            Some((_, pts)) => *pts += row.pts,
            None => games.push((row, row.pts)),
        }
    }

    let mut players: Vec<&str> = ours.iter().map(|r| r.player_name.as_str()).collect();
    players.sort();
    players.dedup();

    let n = games.len() as f64;
    let pts_for: f64 = games.iter().map(|(_, pts)| *pts as f64).sum();
    let pts_against: f64 = games.iter().map(|(g, _)| g.opponent_score as f64).sum();
    let wins = games
        .iter()
        .filter(|(g, _)| g.team_score > g.opponent_score)
        .count() as u32;
    let losses = games
        .iter()
        .filter(|(g, _)| g.team_score < g.opponent_score)
        .count() as u32;

    SeasonOverview {
        games: games.len() as u32,
        players: players.len() as u32,
        avg_pts: round1(pts_for / n),
        avg_pts_against: round1(pts_against / n),
        wins,
        losses,
        win_pct: round1(coerce_percent(wins as f64, games.len() as f64)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::sample_row;

    #[test]
    fn team_totals_sum_player_lines() {
        let rows = vec![
            sample_row("Sato", "2024-12-01", "Kaisei"),
            sample_row("Tanaka", "2024-12-01", "Kaisei"),
        ];
        let totals = calculate_team_stats(&rows);
        assert_eq!(totals.pts, 24);
        assert_eq!(totals.reb, 10);
        assert_eq!(totals.ast, 6);
        assert_eq!(totals.tpa, 10);
    }

    #[test]
    fn team_percentages_from_pooled_attempts() {
        let mut a = sample_row("Sato", "2024-12-01", "Kaisei");
        a.tpm = 3;
        a.tpa = 4;
        let mut b = sample_row("Tanaka", "2024-12-01", "Kaisei");
        b.tpm = 0;
        b.tpa = 6;

        let totals = calculate_team_stats(&[a, b]);
        // 3/10 pooled, not the 37.5 you get averaging 75 and 0.
        assert!((totals.tp_pct - 30.0).abs() < 1e-9);
    }

    #[test]
    fn empty_game_is_all_zero() {
        let totals = calculate_team_stats(&[]);
        assert_eq!(totals, TeamTotals::default());
    }

    #[test]
    fn overview_counts_games_players_and_record() {
        let mut rows = vec![
            sample_row("Sato", "2024-12-01", "Kaisei"), // 72-65 win
            sample_row("Tanaka", "2024-12-01", "Kaisei"),
        ];
        let mut loss1 = sample_row("Sato", "2024-12-08", "Nada");
        loss1.team_score = 50;
        loss1.opponent_score = 60;
        rows.push(loss1);

        let ov = season_overview(&rows);
        assert_eq!(ov.games, 2);
        assert_eq!(ov.players, 2);
        assert_eq!(ov.wins, 1);
        assert_eq!(ov.losses, 1);
        assert!((ov.win_pct - 50.0).abs() < 1e-9);
        // Game 1 rows sum to 24 pts, game 2 to 12.
        assert!((ov.avg_pts - 18.0).abs() < 1e-9);
        assert!((ov.avg_pts_against - 62.5).abs() < 1e-9);
    }

    #[test]
    fn overview_avg_pts_sums_rows_not_the_final_score() {
        // A sheet can omit bench players, so the rows' PTS and the recorded
        // final can disagree; the scoring average reads the rows.
        let mut row = sample_row("Sato", "2024-12-01", "Kaisei");
        row.pts = 10;
        row.team_score = 72;
        row.opponent_score = 65;

        let ov = season_overview(&[row]);
        assert!((ov.avg_pts - 10.0).abs() < 1e-9);
        // The win/loss record still reads the final score.
        assert_eq!(ov.wins, 1);
        assert!((ov.avg_pts_against - 65.0).abs() < 1e-9);
    }

    #[test]
    fn overview_ignores_opponent_viewpoint_rows() {
        let mut opp = sample_row("Yamada", "2024-12-01", "Seiko");
        opp.data_type = DataType::OpponentTeam;
        let rows = vec![sample_row("Sato", "2024-12-01", "Kaisei"), opp];

        let ov = season_overview(&rows);
        assert_eq!(ov.games, 1);
        assert_eq!(ov.players, 1);
    }

    #[test]
    fn overview_ties_count_neither_way() {
        let mut tie = sample_row("Sato", "2024-12-01", "Kaisei");
        tie.team_score = 60;
        tie.opponent_score = 60;

        let ov = season_overview(&[tie]);
        assert_eq!(ov.wins, 0);
        assert_eq!(ov.losses, 0);
        assert_eq!(ov.games, 1);
    }

    #[test]
    fn overview_empty_is_default() {
        assert_eq!(season_overview(&[]), SeasonOverview::default());
    }
}
