// Extraction instruction text plus the post-processing and validation
// applied to what the model sends back.

use crate::schema::{self, EXTRACTION_COLUMNS, REQUIRED_COLUMNS};

// ---------------------------------------------------------------------------
// Instruction
// ---------------------------------------------------------------------------

/// The instruction sent alongside the scoresheet image. Game metadata
/// (date, opponent, scores) is attached by the pipeline, never asked for.
pub fn build_extraction_prompt() -> String {
    format!(
        "Read the basketball box score in this image and output it as CSV.\n\
         \n\
         Output exactly this header line first, then one row per player:\n\
         {}\n\
         \n\
         Rules:\n\
         - Numbers only in numeric cells; write percentages as bare numbers (43.5, not 43.5% or 0.435).\n\
         - MIN is playing time in MM:SS form (e.g. 24:30). A blank time cell is 00:00.\n\
         - GS is 1 for starters, 0 otherwise. A filled circle or dot marker in the starter column means 1.\n\
         - An empty or illegible cell is 0.\n\
         - Skip team totals, TOTALS rows, coach rows, and any row that is not an individual player.\n\
         - Output only the CSV: no commentary, no markdown, no code fences.",
        schema::extraction_header()
    )
}

// ---------------------------------------------------------------------------
// Post-processing
// ---------------------------------------------------------------------------

/// Clean up raw model output: strip code fences and blank lines, and prepend
/// the extraction header when the model left it off.
pub fn postprocess(raw: &str) -> String {
    let mut lines: Vec<&str> = raw
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with("```"))
        .collect();

    if let Some(first) = lines.first() {
        if !first.starts_with("No,") {
            lines.insert(0, "");
        }
    }

    let mut out = String::new();
    for (i, line) in lines.iter().enumerate() {
        if i == 0 && line.is_empty() {
            out.push_str(&schema::extraction_header());
        } else {
            out.push_str(line);
        }
        out.push('\n');
    }
    out
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Check that cleaned output is a usable CSV block: header present with the
/// required columns, at least one data row, and every row as wide as the
/// header. Cells are counted with the same CSV parsing ingestion uses, so a
/// quoted name containing a comma counts as one cell. Returns the failure
/// reason for retry logging.
pub fn validate_tabular(text: &str) -> Result<(), String> {
    if text.trim().is_empty() {
        return Err("output is empty".to_string());
    }

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());

    let columns: Vec<String> = match reader.headers() {
        Ok(h) => h.iter().map(|c| c.trim().to_string()).collect(),
        Err(e) => return Err(format!("unreadable header: {e}")),
    };

    for required in REQUIRED_COLUMNS {
        if !columns.iter().any(|c| c.as_str() == *required) {
            return Err(format!("header is missing the {required} column"));
        }
    }

    // Tolerate a shorter header (some sheets omit trailing columns) but not
    // one wider than the full extraction set.
    if columns.len() > EXTRACTION_COLUMNS.len() {
        return Err(format!(
            "header has {} columns, expected at most {}",
            columns.len(),
            EXTRACTION_COLUMNS.len()
        ));
    }

    let mut row_count = 0;
    for (i, result) in reader.records().enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) => return Err(format!("row {} is unreadable: {e}", i + 1)),
        };
        if record.len() != columns.len() {
            return Err(format!(
                "row {} has {} cells, header has {}",
                i + 1,
                record.len(),
                columns.len()
            ));
        }
        row_count += 1;
    }

    if row_count == 0 {
        return Err("no player rows".to_string());
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
