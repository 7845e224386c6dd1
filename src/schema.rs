// Canonical column set and cell coercion.
//
// Every cell that enters the engine — whether from the persisted CSV, from
// vision-model output, or from manual entry — passes through the three total
// functions in this module. They never fail: unparseable input becomes zero
// (or "00:00") and a diagnostic is logged, so downstream aggregators always
// see normalized numeric values.

use tracing::debug;

// ---------------------------------------------------------------------------
// Canonical columns
// ---------------------------------------------------------------------------

/// The canonical column list of the persisted relation, in storage order.
pub const CANONICAL_COLUMNS: &[&str] = &[
    "No", "PlayerName", "GS", "PTS", "3PM", "3PA", "2PM", "2PA", "FTM", "FTA",
    "3P%", "2P%", "FT%", "OR", "DR", "TOT", "AST", "STL", "BLK", "TO", "PF",
    "TF", "OF", "FO", "DQ", "DK", "MIN", "GameDate", "Season", "Opponent",
    "TeamScore", "OpponentScore", "GameFormat", "DataType", "OriginalTeam",
];

/// The stat columns the vision model is asked to emit (game metadata columns
/// are attached by the ingestion pipeline, never extracted).
pub const EXTRACTION_COLUMNS: &[&str] = &[
    "No", "PlayerName", "GS", "PTS", "3PM", "3PA", "2PM", "2PA", "FTM", "FTA",
    "3P%", "2P%", "FT%", "OR", "DR", "TOT", "AST", "STL", "BLK", "TO", "PF",
    "TF", "OF", "FO", "DQ", "DK", "MIN",
];

/// Columns that must be present in extracted output for a block to be usable.
pub const REQUIRED_COLUMNS: &[&str] = &["No", "PlayerName", "PTS"];

/// The extraction header as a single CSV line.
pub fn extraction_header() -> String {
    EXTRACTION_COLUMNS.join(",")
}

/// The canonical header as a single CSV line.
pub fn canonical_header() -> String {
    CANONICAL_COLUMNS.join(",")
}

// ---------------------------------------------------------------------------
// Numeric coercion
// ---------------------------------------------------------------------------

/// Coerce an arbitrary cell to a number. Surrounding whitespace, thousands
/// separators, and a trailing `%` are stripped before parsing; anything that
/// still fails to parse (including empty cells) becomes 0.0.
pub fn coerce_number(raw: &str) -> f64 {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    let cleaned: String = trimmed
        .trim_end_matches('%')
        .chars()
        .filter(|c| *c != ',')
        .collect();
    match cleaned.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => {
            debug!(cell = raw, "unparseable cell coerced to 0");
            0.0
        }
    }
}

/// Compute a shooting percentage on the [0, 100] scale from makes/attempts.
///
/// Input sources mix conventions (0.43 vs 43.0 vs "43%"), so the result of
/// the division is normalized: a ratio at or below 1 is treated as a
/// fraction and scaled by 100; anything larger is assumed to already be in
/// percent form. Zero attempts collapse to 0.
pub fn coerce_percent(made: f64, attempted: f64) -> f64 {
    if attempted <= 0.0 {
        return 0.0;
    }
    let ratio = made / attempted;
    if !ratio.is_finite() {
        return 0.0;
    }
    if ratio <= 1.0 {
        ratio * 100.0
    } else {
        ratio
    }
}

// ---------------------------------------------------------------------------
// Time coercion
// ---------------------------------------------------------------------------

/// Coerce a playing-time cell to canonical "MM:SS" form.
///
/// Accepts "MM:SS" (re-padded), bare integer minutes, or missing/garbage
/// (which becomes "00:00").
pub fn coerce_time(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return "00:00".to_string();
    }

    if let Some((m, s)) = trimmed.split_once(':') {
        let minutes = m.trim().parse::<u32>().unwrap_or(0);
        let seconds = s.trim().parse::<u32>().unwrap_or(0).min(59);
        return format!("{minutes:02}:{seconds:02}");
    }

    // Bare number: interpret as whole minutes.
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => format!("{:02}:00", v.round() as u32),
        _ => {
            debug!(cell = raw, "unparseable time coerced to 00:00");
            "00:00".to_string()
        }
    }
}

/// Parse a canonical "MM:SS" string to total seconds. Tolerates the same
/// inputs as [`coerce_time`].
pub fn time_to_seconds(raw: &str) -> u32 {
    let canonical = coerce_time(raw);
    match canonical.split_once(':') {
        Some((m, s)) => {
            let minutes = m.parse::<u32>().unwrap_or(0);
            let seconds = s.parse::<u32>().unwrap_or(0);
            minutes * 60 + seconds
        }
        None => 0,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
