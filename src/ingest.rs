// Ingestion pipeline: extracted or hand-entered CSV text becomes validated
// rows in the store.
//
// extract -> parse -> coerce -> augment with game metadata -> recompute
// percents -> validate -> append -> persist. Manual entry joins at the parse
// step with the same validation, so both paths produce identical rows.

use std::collections::HashMap;

use chrono::NaiveDate;
use csv::StringRecord;
use thiserror::Error;
use tracing::{info, warn};

use crate::extract::{self, ExtractionError, VisionModel};
use crate::schema::REQUIRED_COLUMNS;
use crate::store::{DataType, GameFormat, StatRow, Store, StoreError};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum IngestionError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("no player rows to ingest")]
    NoRows,

    #[error("input is missing required columns: {columns}")]
    MissingColumns { columns: String },

    #[error("duplicate player rows for this game at batch indices {indices:?}")]
    DuplicatePlayers { indices: Vec<usize> },

    #[error("rows for the {date} game vs {opponent} disagree on game-level fields")]
    ConflictingGame { date: NaiveDate, opponent: String },

    #[error("season label `{label}` is not in the configured season list")]
    UnknownSeason { label: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

// ---------------------------------------------------------------------------
// Game metadata
// ---------------------------------------------------------------------------

/// Everything about the game that is not on the scoresheet itself. One
/// `GameMeta` is attached to every row of a batch.
#[derive(Debug, Clone)]
pub struct GameMeta {
    pub date: NaiveDate,
    pub season: String,
    /// The team whose players appear on the sheet faced this opponent. For
    /// an `OpponentTeam` sheet this is the scouted team's name.
    pub opponent: String,
    pub team_score: u32,
    pub opponent_score: u32,
    pub format: GameFormat,
    pub data_type: DataType,
}

// ---------------------------------------------------------------------------
// Pipeline entry points
// ---------------------------------------------------------------------------

/// Full pipeline for a photographed scoresheet: extract CSV text through the
/// vision model, then ingest it. Returns the number of rows persisted.
pub async fn ingest_box_score(
    model: &dyn VisionModel,
    image: &[u8],
    max_retries: u32,
    meta: &GameMeta,
    our_team: &str,
    allowed_seasons: &[String],
    store: &mut Store,
) -> Result<usize, IngestionError> {
    let text = extract::extract_csv(model, image, max_retries).await?;
    ingest_tabular(&text, meta, our_team, allowed_seasons, store)
}

/// Manual-entry pipeline: CSV text (extraction header subset) straight in.
pub fn ingest_tabular(
    text: &str,
    meta: &GameMeta,
    our_team: &str,
    allowed_seasons: &[String],
    store: &mut Store,
) -> Result<usize, IngestionError> {
    if !allowed_seasons.iter().any(|s| s == &meta.season) {
        return Err(IngestionError::UnknownSeason {
            label: meta.season.clone(),
        });
    }

    let rows = parse_tabular(text, meta, our_team)?;
    ingest_rows(rows, store)
}

/// Validate a batch against the store and persist it. Every row sharing a
/// game key must agree on the game-level fields (season, scores, format),
/// and the batch must carry no duplicate `(date, opponent, viewpoint,
/// player)` key, within itself or against already-stored rows.
pub fn ingest_rows(rows: Vec<StatRow>, store: &mut Store) -> Result<usize, IngestionError> {
    if rows.is_empty() {
        return Err(IngestionError::NoRows);
    }

    for (i, row) in rows.iter().enumerate() {
        let disagrees = |other: &StatRow| {
            other.game_key() == row.game_key()
                && (other.season != row.season
                    || other.team_score != row.team_score
                    || other.opponent_score != row.opponent_score
                    || other.game_format != row.game_format)
        };
        if rows[..i].iter().any(|r| disagrees(r)) || store.rows().iter().any(|r| disagrees(r)) {
            return Err(IngestionError::ConflictingGame {
                date: row.game_date,
                opponent: row.opponent.clone(),
            });
        }
    }

    let mut offending: Vec<usize> = Vec::new();
    for (i, row) in rows.iter().enumerate() {
        let key = (
            row.game_date,
            row.opponent.as_str(),
            row.data_type,
            row.player_name.as_str(),
        );
        let in_batch = rows[..i].iter().any(|r| {
            (r.game_date, r.opponent.as_str(), r.data_type, r.player_name.as_str()) == key
        });
        let in_store = store.rows().iter().any(|r| {
            (r.game_date, r.opponent.as_str(), r.data_type, r.player_name.as_str()) == key
        });
        if in_batch || in_store {
            offending.push(i);
        }
    }
    if !offending.is_empty() {
        return Err(IngestionError::DuplicatePlayers { indices: offending });
    }

    let count = rows.len();
    store.append(rows);
    store.persist()?;
    info!(count, "ingested rows");
    Ok(count)
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Rows that are aggregate lines or staff, not players. Matched
/// case-insensitively against the name cell.
const NON_PLAYER_NAMES: &[&str] = &["totals", "total", "team", "coach", "coaches"];

/// Parse extraction-shaped CSV text into full rows, attaching `meta` to each.
/// Cells go through schema coercion; percent columns are recomputed from
/// makes and attempts regardless of what the sheet said.
pub fn parse_tabular(
    text: &str,
    meta: &GameMeta,
    our_team: &str,
) -> Result<Vec<StatRow>, IngestionError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = match reader.headers() {
        Ok(h) => h.clone(),
        Err(_) => return Err(IngestionError::NoRows),
    };

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| !headers.iter().any(|h| h.trim() == **c))
        .copied()
        .collect();
    if !missing.is_empty() {
        return Err(IngestionError::MissingColumns {
            columns: missing.join(", "),
        });
    }

    // A sheet ingested from the opponent's viewpoint stores our name in the
    // Opponent column and keeps the true team in OriginalTeam.
    let (opponent, original_team) = match meta.data_type {
        DataType::OurTeam => (meta.opponent.clone(), String::new()),
        DataType::OpponentTeam => (our_team.to_string(), meta.opponent.clone()),
    };

    // Extend the header with the metadata columns, then reuse the store's
    // row builder so both paths coerce identically.
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut width = 0;
    for (i, name) in headers.iter().enumerate() {
        index.insert(name.trim().to_string(), i);
        width = i + 1;
    }
    let meta_cells = [
        ("GameDate", meta.date.format("%Y-%m-%d").to_string()),
        ("Season", meta.season.clone()),
        ("Opponent", opponent),
        ("TeamScore", meta.team_score.to_string()),
        ("OpponentScore", meta.opponent_score.to_string()),
        ("GameFormat", meta.format.as_str().to_string()),
        ("DataType", meta.data_type.as_str().to_string()),
        ("OriginalTeam", original_team),
    ];
    for (i, (name, _)) in meta_cells.iter().enumerate() {
        index.insert((*name).to_string(), width + i);
    }

    let name_col = index.get("PlayerName").copied();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "skipping unreadable extracted row");
                continue;
            }
        };

        let name = name_col
            .and_then(|i| record.get(i))
            .unwrap_or("")
            .trim()
            .to_lowercase();
        if NON_PLAYER_NAMES.contains(&name.as_str()) {
            warn!(row = %name, "dropping non-player row");
            continue;
        }

        let mut cells: Vec<String> = record.iter().map(|c| c.to_string()).collect();
        cells.resize(width, String::new());
        for (_, value) in &meta_cells {
            cells.push(value.clone());
        }

        let full = StringRecord::from(cells);
        if let Some(row) = StatRow::from_cells(&index, &full) {
            rows.push(row);
        }
    }

    if rows.is_empty() {
        return Err(IngestionError::NoRows);
    }
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
