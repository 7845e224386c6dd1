// Per-player averages across a set of games.

use serde::Serialize;

use crate::schema::coerce_percent;
use crate::store::StatRow;

/// Per-game averages for one player. Percentages are recomputed from summed
/// makes and attempts, never averaged across games.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlayerAverages {
    pub games_played: u32,
    pub ppg: f64,
    pub rpg: f64,
    pub apg: f64,
    pub spg: f64,
    pub bpg: f64,
    pub topg: f64,
    pub pfpg: f64,
    /// Field goal percentage over all shots, twos and threes combined.
    pub fg_pct: f64,
    pub tp_pct: f64,
    pub two_pct: f64,
    pub ft_pct: f64,
}

/// Round to one decimal, the precision the dashboard displays.
pub(crate) fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Compute a player's averages over the given rows. Each row counts as one
/// game played.
pub fn calculate_stats(rows: &[StatRow]) -> PlayerAverages {
    if rows.is_empty() {
        return PlayerAverages::default();
    }

    let gp = rows.len() as f64;
    let sum = |f: fn(&StatRow) -> u32| rows.iter().map(|r| f(r) as f64).sum::<f64>();

    let pts = sum(|r| r.pts);
    let reb = sum(|r| r.reb);
    let ast = sum(|r| r.ast);
    let stl = sum(|r| r.stl);
    let blk = sum(|r| r.blk);
    let tov = sum(|r| r.tov);
    let pf = sum(|r| r.pf);

    let tpm = sum(|r| r.tpm);
    let tpa = sum(|r| r.tpa);
    let two_pm = sum(|r| r.two_pm);
    let two_pa = sum(|r| r.two_pa);
    let ftm = sum(|r| r.ftm);
    let fta = sum(|r| r.fta);

    PlayerAverages {
        games_played: rows.len() as u32,
        ppg: round1(pts / gp),
        rpg: round1(reb / gp),
        apg: round1(ast / gp),
        spg: round1(stl / gp),
        bpg: round1(blk / gp),
        topg: round1(tov / gp),
        pfpg: round1(pf / gp),
        fg_pct: round1(coerce_percent(tpm + two_pm, tpa + two_pa)),
        tp_pct: round1(coerce_percent(tpm, tpa)),
        two_pct: round1(coerce_percent(two_pm, two_pa)),
        ft_pct: round1(coerce_percent(ftm, fta)),
    }
}
