// CSV persistence layer for the statistics relation.
//
// The store holds every per-player per-game row in memory and persists the
// whole relation to a single CSV file (UTF-8 with BOM for spreadsheet
// compatibility) on every mutation. Writes go to a temp sibling file followed
// by an atomic rename, so a reader never observes a torn file. Cells are
// passed through the schema coercion functions on load, which is what makes
// the relation safe to aggregate over despite messy extractor output and
// historical scale drift in the percent columns.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::schema::{self, CANONICAL_COLUMNS};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to load stats file {path}: {source}")]
    Load {
        path: PathBuf,
        source: anyhow::Error,
    },

    #[error("failed to write stats file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Row enums
// ---------------------------------------------------------------------------

/// Game format code. Extending this set requires migrating stored rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameFormat {
    FourQuarters,
    TwoQuarters,
    Other,
}

impl GameFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameFormat::FourQuarters => "4Q",
            GameFormat::TwoQuarters => "2Q",
            GameFormat::Other => "Other",
        }
    }

    /// Parse a stored code. Unknown or empty input defaults to "4Q".
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "2Q" => GameFormat::TwoQuarters,
            "Other" => GameFormat::Other,
            _ => GameFormat::FourQuarters,
        }
    }
}

/// Whether a row records our team's box score or an opponent's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    OurTeam,
    OpponentTeam,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::OurTeam => "OurTeam",
            DataType::OpponentTeam => "OpponentTeam",
        }
    }

    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "OpponentTeam" => DataType::OpponentTeam,
            _ => DataType::OurTeam,
        }
    }
}

// ---------------------------------------------------------------------------
// StatRow
// ---------------------------------------------------------------------------

/// One player's line from one game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatRow {
    pub number: Option<u32>,
    pub player_name: String,
    pub gs: u32,
    pub pts: u32,
    pub tpm: u32,
    pub tpa: u32,
    pub two_pm: u32,
    pub two_pa: u32,
    pub ftm: u32,
    pub fta: u32,
    pub tp_pct: f64,
    pub two_pct: f64,
    pub ft_pct: f64,
    pub oreb: u32,
    pub dreb: u32,
    pub reb: u32,
    pub ast: u32,
    pub stl: u32,
    pub blk: u32,
    pub tov: u32,
    pub pf: u32,
    pub tf: u32,
    pub of: u32,
    pub fo: u32,
    pub dq: u32,
    pub dk: u32,
    pub minutes: String,
    pub game_date: NaiveDate,
    pub season: String,
    pub opponent: String,
    pub team_score: u32,
    pub opponent_score: u32,
    pub game_format: GameFormat,
    pub data_type: DataType,
    pub original_team: Option<String>,
    /// Unknown CSV columns, preserved round-trip.
    pub extra: BTreeMap<String, String>,
}

impl StatRow {
    /// The logical game key this row belongs to.
    pub fn game_key(&self) -> (NaiveDate, &str, DataType) {
        (self.game_date, self.opponent.as_str(), self.data_type)
    }

    /// Recompute the three percent columns from makes/attempts, overwriting
    /// whatever was stored or extracted.
    pub fn recompute_percents(&mut self) {
        self.tp_pct = schema::coerce_percent(self.tpm as f64, self.tpa as f64);
        self.two_pct = schema::coerce_percent(self.two_pm as f64, self.two_pa as f64);
        self.ft_pct = schema::coerce_percent(self.ftm as f64, self.fta as f64);
    }

    /// PTS implied by the recorded makes. The raw PTS stays authoritative
    /// when they disagree (scoresheets carry corrections the splits don't),
    /// but the mismatch is worth a diagnostic.
    pub fn implied_pts(&self) -> u32 {
        2 * self.two_pm + 3 * self.tpm + self.ftm
    }

    /// Build a row from one parsed CSV record, coercing every cell. Returns
    /// `None` for rows that cannot carry identity (empty player name or an
    /// unparseable game date).
    pub fn from_cells(
        index: &HashMap<String, usize>,
        record: &csv::StringRecord,
    ) -> Option<StatRow> {
        let cell = |name: &str| -> &str {
            index
                .get(name)
                .and_then(|&i| record.get(i))
                .unwrap_or("")
        };
        let num = |name: &str| -> u32 {
            let v = schema::coerce_number(cell(name));
            if v < 0.0 {
                0
            } else {
                v.round() as u32
            }
        };

        let player_name = cell("PlayerName").trim().to_string();
        if player_name.is_empty() {
            return None;
        }

        let date_cell = cell("GameDate").trim().to_string();
        let game_date = match NaiveDate::parse_from_str(&date_cell, "%Y-%m-%d") {
            Ok(d) => d,
            Err(_) => {
                warn!(player = %player_name, date = %date_cell, "skipping row with unparseable GameDate");
                return None;
            }
        };

        let number_cell = cell("No").trim().to_string();
        let number = if number_cell.is_empty() {
            None
        } else {
            Some(num("No"))
        };

        let original_team = {
            let v = cell("OriginalTeam").trim();
            if v.is_empty() {
                None
            } else {
                Some(v.to_string())
            }
        };

        // The starter marker arrives as "●" from some sheets; everything
        // non-zero normalizes to 1.
        let gs_cell = cell("GS").trim();
        let gs = if gs_cell == "\u{25cf}" || num("GS") > 0 { 1 } else { 0 };

        let mut extra = BTreeMap::new();
        for (name, &i) in index {
            if !CANONICAL_COLUMNS.contains(&name.as_str()) {
                if let Some(v) = record.get(i) {
                    extra.insert(name.clone(), v.to_string());
                }
            }
        }

        let mut row = StatRow {
            number,
            player_name,
            gs,
            pts: num("PTS"),
            tpm: num("3PM"),
            tpa: num("3PA"),
            two_pm: num("2PM"),
            two_pa: num("2PA"),
            ftm: num("FTM"),
            fta: num("FTA"),
            tp_pct: 0.0,
            two_pct: 0.0,
            ft_pct: 0.0,
            oreb: num("OR"),
            dreb: num("DR"),
            reb: num("TOT"),
            ast: num("AST"),
            stl: num("STL"),
            blk: num("BLK"),
            tov: num("TO"),
            pf: num("PF"),
            tf: num("TF"),
            of: num("OF"),
            fo: num("FO"),
            dq: num("DQ"),
            dk: num("DK"),
            minutes: schema::coerce_time(cell("MIN")),
            game_date,
            season: cell("Season").trim().to_string(),
            opponent: cell("Opponent").trim().to_string(),
            team_score: num("TeamScore"),
            opponent_score: num("OpponentScore"),
            game_format: GameFormat::parse(cell("GameFormat")),
            data_type: DataType::parse(cell("DataType")),
            original_team,
            extra,
        };

        row.recompute_percents();

        if row.pts != row.implied_pts() && (row.tpa + row.two_pa + row.fta) > 0 {
            warn!(
                player = %row.player_name,
                date = %row.game_date,
                pts = row.pts,
                implied = row.implied_pts(),
                "PTS disagrees with makes; keeping raw PTS"
            );
        }

        Some(row)
    }

    /// Serialize the row in canonical column order, followed by the given
    /// extra columns (blank where this row has no value for one).
    fn to_cells(&self, extra_columns: &[String]) -> Vec<String> {
        let mut cells = vec![
            self.number.map(|n| n.to_string()).unwrap_or_default(),
            self.player_name.clone(),
            self.gs.to_string(),
            self.pts.to_string(),
            self.tpm.to_string(),
            self.tpa.to_string(),
            self.two_pm.to_string(),
            self.two_pa.to_string(),
            self.ftm.to_string(),
            self.fta.to_string(),
            format!("{:.1}", self.tp_pct),
            format!("{:.1}", self.two_pct),
            format!("{:.1}", self.ft_pct),
            self.oreb.to_string(),
            self.dreb.to_string(),
            self.reb.to_string(),
            self.ast.to_string(),
            self.stl.to_string(),
            self.blk.to_string(),
            self.tov.to_string(),
            self.pf.to_string(),
            self.tf.to_string(),
            self.of.to_string(),
            self.fo.to_string(),
            self.dq.to_string(),
            self.dk.to_string(),
            self.minutes.clone(),
            self.game_date.format("%Y-%m-%d").to_string(),
            self.season.clone(),
            self.opponent.clone(),
            self.team_score.to_string(),
            self.opponent_score.to_string(),
            self.game_format.as_str().to_string(),
            self.data_type.as_str().to_string(),
            self.original_team.clone().unwrap_or_default(),
        ];
        for col in extra_columns {
            cells.push(self.extra.get(col).cloned().unwrap_or_default());
        }
        cells
    }
}

// ---------------------------------------------------------------------------
// Game reference
// ---------------------------------------------------------------------------

/// A logical game: one (GameDate, Opponent, DataType) key plus the
/// game-level fields every row sharing the key agrees on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameRef {
    pub date: NaiveDate,
    pub opponent: String,
    pub data_type: DataType,
    pub season: String,
    pub team_score: u32,
    pub opponent_score: u32,
    pub game_format: GameFormat,
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// The canonical relation of stat rows, backed by one CSV file.
#[derive(Debug)]
pub struct Store {
    path: PathBuf,
    rows: Vec<StatRow>,
    /// Unknown columns seen in the loaded file, in first-seen order, so they
    /// survive a round trip.
    extra_columns: Vec<String>,
}

impl Store {
    /// Load the store from `path`. A missing file initializes an empty
    /// relation; a present-but-unreadable file is a `StoreError::Load` (the
    /// caller should continue with an empty relation and avoid persisting
    /// until the user explicitly asks to).
    pub fn open(path: impl Into<PathBuf>) -> Result<Store, StoreError> {
        let path = path.into();
        if !path.exists() {
            return Ok(Store {
                path,
                rows: Vec::new(),
                extra_columns: Vec::new(),
            });
        }

        let text = std::fs::read_to_string(&path).map_err(|e| StoreError::Load {
            path: path.clone(),
            source: e.into(),
        })?;
        let (rows, extra_columns) =
            parse_relation(&text).map_err(|e| StoreError::Load {
                path: path.clone(),
                source: e,
            })?;

        Ok(Store {
            path,
            rows,
            extra_columns,
        })
    }

    /// An empty store persisted at `path` (used for degraded sessions and
    /// tests).
    pub fn empty(path: impl Into<PathBuf>) -> Store {
        Store {
            path: path.into(),
            rows: Vec::new(),
            extra_columns: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append rows. No deduplication happens here; the ingestion pipeline
    /// enforces key uniqueness before calling this.
    pub fn append(&mut self, rows: Vec<StatRow>) {
        self.rows.extend(rows);
    }

    /// Remove every row matching the game key. Omitting `data_type` removes
    /// both viewpoints of the game. Returns the number of rows removed.
    pub fn delete_game(
        &mut self,
        date: NaiveDate,
        opponent: &str,
        data_type: Option<DataType>,
    ) -> usize {
        let before = self.rows.len();
        self.rows.retain(|r| {
            !(r.game_date == date
                && r.opponent == opponent
                && data_type.map(|dt| r.data_type == dt).unwrap_or(true))
        });
        before - self.rows.len()
    }

    /// Persist the relation: write a temp sibling file, then atomically
    /// rename it over the canonical path. The canonical file is never
    /// truncated in place.
    pub fn persist(&self) -> Result<(), StoreError> {
        let write_err = |source: std::io::Error| StoreError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(write_err)?;
            }
        }

        let csv_err = |e: csv::Error| StoreError::Write {
            path: self.path.clone(),
            source: std::io::Error::other(e),
        };

        let tmp = self.path.with_extension("csv.tmp");
        {
            let mut buf: Vec<u8> = Vec::new();
            // UTF-8 BOM for spreadsheet compatibility.
            buf.extend_from_slice("\u{feff}".as_bytes());
            {
                let mut writer = csv::Writer::from_writer(&mut buf);
                let mut header: Vec<&str> = CANONICAL_COLUMNS.to_vec();
                for col in &self.extra_columns {
                    header.push(col.as_str());
                }
                writer.write_record(&header).map_err(csv_err)?;
                for row in &self.rows {
                    writer
                        .write_record(row.to_cells(&self.extra_columns))
                        .map_err(csv_err)?;
                }
                writer.flush().map_err(write_err)?;
            }
            std::fs::write(&tmp, &buf).map_err(write_err)?;
        }
        std::fs::rename(&tmp, &self.path).map_err(write_err)
    }

    // ------------------------------------------------------------------
    // Read accessors
    // ------------------------------------------------------------------

    pub fn rows(&self) -> &[StatRow] {
        &self.rows
    }

    pub fn by_season(&self, season: &str) -> Vec<StatRow> {
        self.rows
            .iter()
            .filter(|r| r.season == season)
            .cloned()
            .collect()
    }

    /// All rows for one of our players, sorted by game date ascending.
    /// Opponent-viewpoint rows are excluded, as in `players`: a scouted
    /// player who shares the name is a different person.
    pub fn by_player(&self, name: &str) -> Vec<StatRow> {
        let mut rows: Vec<StatRow> = self
            .rows
            .iter()
            .filter(|r| r.player_name == name && r.data_type == DataType::OurTeam)
            .cloned()
            .collect();
        rows.sort_by_key(|r| r.game_date);
        rows
    }

    pub fn by_game(&self, date: NaiveDate) -> Vec<StatRow> {
        self.rows
            .iter()
            .filter(|r| r.game_date == date)
            .cloned()
            .collect()
    }

    /// Distinct season labels, most recent first.
    pub fn seasons(&self) -> Vec<String> {
        let mut seasons: Vec<String> = self
            .rows
            .iter()
            .map(|r| r.season.clone())
            .filter(|s| !s.is_empty())
            .collect();
        seasons.sort();
        seasons.dedup();
        seasons.reverse();
        seasons
    }

    /// Distinct player names, alphabetical, optionally limited to a season.
    /// Opponent-viewpoint rows are excluded: those players are not ours.
    pub fn players(&self, season: Option<&str>) -> Vec<String> {
        let mut names: Vec<String> = self
            .rows
            .iter()
            .filter(|r| r.data_type == DataType::OurTeam)
            .filter(|r| season.map(|s| r.season == s).unwrap_or(true))
            .map(|r| r.player_name.clone())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Distinct games, newest first.
    pub fn games(&self) -> Vec<GameRef> {
        let mut seen: Vec<GameRef> = Vec::new();
        for row in &self.rows {
            let exists = seen.iter().any(|g| {
                g.date == row.game_date
                    && g.opponent == row.opponent
                    && g.data_type == row.data_type
            });
            if !exists {
                seen.push(GameRef {
                    date: row.game_date,
                    opponent: row.opponent.clone(),
                    data_type: row.data_type,
                    season: row.season.clone(),
                    team_score: row.team_score,
                    opponent_score: row.opponent_score,
                    game_format: row.game_format,
                });
            }
        }
        seen.sort_by(|a, b| b.date.cmp(&a.date));
        seen
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse the full relation text. Returns the rows plus any non-canonical
/// columns found in the header (in file order).
fn parse_relation(text: &str) -> Result<(Vec<StatRow>, Vec<String>), anyhow::Error> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut extra_columns: Vec<String> = Vec::new();
    for (i, name) in headers.iter().enumerate() {
        let name = name.trim();
        index.insert(name.to_string(), i);
        if !CANONICAL_COLUMNS.contains(&name) && !name.is_empty() {
            extra_columns.push(name.to_string());
        }
    }

    if !index.contains_key("PlayerName") {
        anyhow::bail!("header is missing the PlayerName column");
    }

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        if let Some(row) = StatRow::from_cells(&index, &record) {
            rows.push(row);
        }
    }

    Ok((rows, extra_columns))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    /// Helper: build a minimal row for a given player/game.
    pub(crate) fn sample_row(name: &str, d: &str, opponent: &str) -> StatRow {
        let mut row = StatRow {
            number: Some(4),
            player_name: name.to_string(),
            gs: 1,
            pts: 12,
            tpm: 2,
            tpa: 5,
            two_pm: 2,
            two_pa: 6,
            ftm: 2,
            fta: 3,
            tp_pct: 0.0,
            two_pct: 0.0,
            ft_pct: 0.0,
            oreb: 1,
            dreb: 4,
            reb: 5,
            ast: 3,
            stl: 1,
            blk: 0,
            tov: 2,
            pf: 2,
            tf: 0,
            of: 0,
            fo: 0,
            dq: 0,
            dk: 0,
            minutes: "24:30".to_string(),
            game_date: date(d),
            season: "2024-25".to_string(),
            opponent: opponent.to_string(),
            team_score: 72,
            opponent_score: 65,
            game_format: GameFormat::FourQuarters,
            data_type: DataType::OurTeam,
            original_team: None,
            extra: BTreeMap::new(),
        };
        row.recompute_percents();
        row
    }

    fn tmp_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "scorebook_store_{}_{}.csv",
            tag,
            std::process::id()
        ))
    }

    // ------------------------------------------------------------------
    // Parsing
    // ------------------------------------------------------------------

    #[test]
    fn parse_canonical_file() {
        let text = format!(
            "{}\n4,Sato,1,12,2,5,2,6,2,3,40.0,33.3,66.7,1,4,5,3,1,0,2,2,0,0,0,0,0,24:30,2024-12-01,2024-25,Kaisei,72,65,4Q,OurTeam,\n",
            schema::canonical_header()
        );
        let (rows, extra) = parse_relation(&text).unwrap();
        assert_eq!(rows.len(), 1);
        assert!(extra.is_empty());

        let r = &rows[0];
        assert_eq!(r.player_name, "Sato");
        assert_eq!(r.number, Some(4));
        assert_eq!(r.pts, 12);
        assert_eq!(r.reb, 5);
        assert_eq!(r.minutes, "24:30");
        assert_eq!(r.game_date, date("2024-12-01"));
        assert_eq!(r.game_format, GameFormat::FourQuarters);
        assert_eq!(r.data_type, DataType::OurTeam);
        assert!(r.original_team.is_none());
    }

    #[test]
    fn parse_strips_bom() {
        let text = format!(
            "\u{feff}{}\n4,Sato,1,12,2,5,2,6,2,3,40,33,66,1,4,5,3,1,0,2,2,0,0,0,0,0,24:30,2024-12-01,2024-25,Kaisei,72,65,4Q,OurTeam,\n",
            schema::canonical_header()
        );
        let (rows, _) = parse_relation(&text).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn parse_recomputes_percents_from_makes() {
        // Stored percents are fractional-scale garbage; read normalizes.
        let text = format!(
            "{}\n4,Sato,1,12,2,5,2,6,2,3,0.4,0.33,0.66,1,4,5,3,1,0,2,2,0,0,0,0,0,24:30,2024-12-01,2024-25,Kaisei,72,65,4Q,OurTeam,\n",
            schema::canonical_header()
        );
        let (rows, _) = parse_relation(&text).unwrap();
        assert!((rows[0].tp_pct - 40.0).abs() < 1e-9);
        assert!((rows[0].two_pct - 100.0 * 2.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn parse_skips_rows_without_identity() {
        let text = format!(
            "{}\n,,1,12,2,5,2,6,2,3,40,33,66,1,4,5,3,1,0,2,2,0,0,0,0,0,24:30,2024-12-01,2024-25,Kaisei,72,65,4Q,OurTeam,\n\
             4,Sato,1,12,2,5,2,6,2,3,40,33,66,1,4,5,3,1,0,2,2,0,0,0,0,0,24:30,not-a-date,2024-25,Kaisei,72,65,4Q,OurTeam,\n",
            schema::canonical_header()
        );
        let (rows, _) = parse_relation(&text).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn parse_preserves_unknown_columns() {
        let text = format!(
            "{},Notes\n4,Sato,1,12,2,5,2,6,2,3,40,33,66,1,4,5,3,1,0,2,2,0,0,0,0,0,24:30,2024-12-01,2024-25,Kaisei,72,65,4Q,OurTeam,,foul trouble\n",
            schema::canonical_header()
        );
        let (rows, extra) = parse_relation(&text).unwrap();
        assert_eq!(extra, vec!["Notes".to_string()]);
        assert_eq!(rows[0].extra.get("Notes").unwrap(), "foul trouble");
    }

    #[test]
    fn parse_missing_optional_columns_zero_filled() {
        // Only the required columns plus a date: everything else coerces to 0.
        let text = "No,PlayerName,PTS,GameDate,Season,Opponent\n7,Tanaka,9,2024-12-01,2024-25,Kaisei\n";
        let (rows, _) = parse_relation(text).unwrap();
        let r = &rows[0];
        assert_eq!(r.pts, 9);
        assert_eq!(r.tpm, 0);
        assert_eq!(r.reb, 0);
        assert_eq!(r.minutes, "00:00");
        assert_eq!(r.gs, 0);
    }

    #[test]
    fn parse_starter_dot_marker() {
        let text = "No,PlayerName,GS,PTS,GameDate\n7,Tanaka,\u{25cf},9,2024-12-01\n";
        let (rows, _) = parse_relation(text).unwrap();
        assert_eq!(rows[0].gs, 1);
    }

    #[test]
    fn parse_error_on_missing_player_column() {
        let text = "No,PTS\n7,9\n";
        assert!(parse_relation(text).is_err());
    }

    #[test]
    fn opponent_row_keeps_original_team() {
        let text = format!(
            "{}\n,Yamada,0,8,0,1,4,7,0,0,0,57.1,0,0,0,3,1,0,0,1,1,0,0,0,0,0,18:00,2024-12-01,2024-25,Seiko,65,72,4Q,OpponentTeam,Nada\n",
            schema::canonical_header()
        );
        let (rows, _) = parse_relation(&text).unwrap();
        assert_eq!(rows[0].data_type, DataType::OpponentTeam);
        assert_eq!(rows[0].original_team.as_deref(), Some("Nada"));
        assert_eq!(rows[0].number, None);
    }

    // ------------------------------------------------------------------
    // Round trip / persist
    // ------------------------------------------------------------------

    #[test]
    fn persist_and_reload_round_trip() {
        let path = tmp_path("roundtrip");
        let _ = std::fs::remove_file(&path);

        let mut store = Store::empty(&path);
        store.append(vec![
            sample_row("Sato", "2024-12-01", "Kaisei"),
            sample_row("Tanaka", "2024-12-01", "Kaisei"),
        ]);
        store.persist().unwrap();

        let reloaded = Store::open(&path).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.rows()[0], store.rows()[0]);
        assert_eq!(reloaded.rows()[1], store.rows()[1]);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn persist_writes_bom_and_header() {
        let path = tmp_path("bom");
        let _ = std::fs::remove_file(&path);

        let store = Store::empty(&path);
        store.persist().unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..3], "\u{feff}".as_bytes());
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("No,PlayerName,GS,PTS"));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn persist_leaves_no_temp_file() {
        let path = tmp_path("notmp");
        let _ = std::fs::remove_file(&path);

        let mut store = Store::empty(&path);
        store.append(vec![sample_row("Sato", "2024-12-01", "Kaisei")]);
        store.persist().unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("csv.tmp").exists());

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn persist_round_trips_extra_columns() {
        let path = tmp_path("extra");
        let _ = std::fs::remove_file(&path);

        let text = format!(
            "{},Notes\n4,Sato,1,12,2,5,2,6,2,3,40,33,66,1,4,5,3,1,0,2,2,0,0,0,0,0,24:30,2024-12-01,2024-25,Kaisei,72,65,4Q,OurTeam,,clutch\n",
            schema::canonical_header()
        );
        std::fs::write(&path, text).unwrap();

        let store = Store::open(&path).unwrap();
        store.persist().unwrap();

        let reloaded = Store::open(&path).unwrap();
        assert_eq!(reloaded.rows()[0].extra.get("Notes").unwrap(), "clutch");

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn persist_failure_reports_the_store_path() {
        // A directory squatting on the canonical path makes the final rename
        // fail; the error must name the store path, not a placeholder.
        let path = tmp_path("dirclash");
        let _ = std::fs::remove_dir_all(&path);
        let _ = std::fs::remove_file(&path);
        std::fs::create_dir_all(&path).unwrap();

        let store = Store::empty(&path);
        let err = store.persist().unwrap_err();
        match err {
            StoreError::Write { path: reported, .. } => assert_eq!(reported, path),
            other => panic!("expected Write error, got {other}"),
        }

        let _ = std::fs::remove_file(path.with_extension("csv.tmp"));
        let _ = std::fs::remove_dir_all(&path);
    }

    #[test]
    fn open_missing_file_is_empty() {
        let path = tmp_path("missing");
        let _ = std::fs::remove_file(&path);
        let store = Store::open(&path).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn open_unparseable_file_is_load_error() {
        let path = tmp_path("bad");
        std::fs::write(&path, "No,PTS\n7,9\n").unwrap();
        let err = Store::open(&path).unwrap_err();
        assert!(matches!(err, StoreError::Load { .. }));
        let _ = std::fs::remove_file(&path);
    }

    // ------------------------------------------------------------------
    // delete_game
    // ------------------------------------------------------------------

    #[test]
    fn delete_game_removes_all_matching_rows() {
        let mut store = Store::empty(tmp_path("del"));
        store.append(vec![
            sample_row("Sato", "2024-12-01", "Kaisei"),
            sample_row("Tanaka", "2024-12-01", "Kaisei"),
            sample_row("Sato", "2024-12-08", "Nada"),
        ]);

        let removed = store.delete_game(date("2024-12-01"), "Kaisei", None);
        assert_eq!(removed, 2);
        assert_eq!(store.len(), 1);
        assert_eq!(store.rows()[0].opponent, "Nada");
    }

    #[test]
    fn delete_game_respects_data_type() {
        let mut store = Store::empty(tmp_path("deldt"));
        let mut opp = sample_row("Yamada", "2024-12-01", "Kaisei");
        opp.data_type = DataType::OpponentTeam;
        store.append(vec![sample_row("Sato", "2024-12-01", "Kaisei"), opp]);

        let removed =
            store.delete_game(date("2024-12-01"), "Kaisei", Some(DataType::OpponentTeam));
        assert_eq!(removed, 1);
        assert_eq!(store.rows()[0].data_type, DataType::OurTeam);
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    fn populated_store() -> Store {
        let mut store = Store::empty(tmp_path("acc"));
        let mut r1 = sample_row("Sato", "2024-12-01", "Kaisei");
        r1.season = "2024-25".into();
        let mut r2 = sample_row("Tanaka", "2024-12-08", "Nada");
        r2.season = "2024-25".into();
        let mut r3 = sample_row("Sato", "2023-11-20", "Kaisei");
        r3.season = "2023-24".into();
        store.append(vec![r1, r2, r3]);
        store
    }

    #[test]
    fn seasons_descending() {
        let store = populated_store();
        assert_eq!(store.seasons(), vec!["2024-25", "2023-24"]);
    }

    #[test]
    fn players_alphabetical_and_deduped() {
        let store = populated_store();
        assert_eq!(store.players(None), vec!["Sato", "Tanaka"]);
        assert_eq!(store.players(Some("2023-24")), vec!["Sato"]);
    }

    #[test]
    fn players_excludes_opponent_viewpoint_rows() {
        let mut store = populated_store();
        let mut opp = sample_row("Yamada", "2024-12-01", "Seiko");
        opp.data_type = DataType::OpponentTeam;
        opp.original_team = Some("Nada".into());
        store.append(vec![opp]);

        assert!(!store.players(None).contains(&"Yamada".to_string()));
    }

    #[test]
    fn by_player_sorted_date_ascending() {
        let store = populated_store();
        let rows = store.by_player("Sato");
        assert_eq!(rows.len(), 2);
        assert!(rows[0].game_date < rows[1].game_date);
    }

    #[test]
    fn by_player_excludes_scouted_namesakes() {
        let mut store = populated_store();
        let mut opp = sample_row("Sato", "2024-12-05", "Seiko");
        opp.data_type = DataType::OpponentTeam;
        opp.original_team = Some("Nada".into());
        opp.pts = 40;
        store.append(vec![opp]);

        let rows = store.by_player("Sato");
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.data_type == DataType::OurTeam));
    }

    #[test]
    fn games_newest_first_and_deduped() {
        let mut store = populated_store();
        // Second row for an existing game must not create a second GameRef.
        store.append(vec![sample_row("Suzuki", "2024-12-01", "Kaisei")]);

        let games = store.games();
        assert_eq!(games.len(), 3);
        assert_eq!(games[0].date, date("2024-12-08"));
        assert_eq!(games[0].opponent, "Nada");
        assert_eq!(games[2].date, date("2023-11-20"));
    }

    #[test]
    fn implied_pts_matches_makes() {
        let row = sample_row("Sato", "2024-12-01", "Kaisei");
        // 2*2 + 3*2 + 2 = 12
        assert_eq!(row.implied_pts(), 12);
        assert_eq!(row.pts, row.implied_pts());
    }
}
