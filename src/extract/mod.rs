// Box-score extraction: a vision model turns a photographed scoresheet into
// CSV text matching the extraction header.
//
// `VisionModel` is the seam the ingestion pipeline calls through; the real
// implementation is `ClaudeVision` in `client`, and tests substitute mocks.
// The driver here owns post-processing, validation, and the retry loop.

pub mod client;
pub mod prompt;

pub use client::{ClaudeVision, VisionClient};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("extraction is disabled: no API key configured")]
    Disabled,

    #[error("HTTP error calling the vision API: {0}")]
    Http(String),

    #[error("vision API call exceeded the deadline")]
    Timeout,

    #[error("vision model returned no text")]
    Empty,

    #[error("extracted output is not usable: {reason}")]
    Malformed { reason: String },

    #[error("vision API returned status {status}: {message}")]
    Api { status: u16, message: String },
}

// ---------------------------------------------------------------------------
// VisionModel seam
// ---------------------------------------------------------------------------

/// One call to a multimodal model: an image plus an instruction, raw text
/// back. Implementations own their own deadline.
#[async_trait]
pub trait VisionModel: Send + Sync {
    async fn extract(&self, image: &[u8], instruction: &str) -> Result<String, ExtractionError>;
}

// ---------------------------------------------------------------------------
// Extraction driver
// ---------------------------------------------------------------------------

/// Extract CSV text from a scoresheet image, retrying up to `max_retries`
/// additional times when the model times out or returns output that fails
/// tabular validation. Configuration and API errors fail immediately.
pub async fn extract_csv(
    model: &dyn VisionModel,
    image: &[u8],
    max_retries: u32,
) -> Result<String, ExtractionError> {
    let instruction = prompt::build_extraction_prompt();
    let attempts = max_retries + 1;
    let mut last_err = ExtractionError::Empty;

    for attempt in 1..=attempts {
        debug!(attempt, attempts, "extraction attempt");
        match model.extract(image, &instruction).await {
            Ok(raw) => {
                let text = prompt::postprocess(&raw);
                match prompt::validate_tabular(&text) {
                    Ok(()) => return Ok(text),
                    Err(reason) => {
                        warn!(attempt, %reason, "extracted output failed validation");
                        last_err = ExtractionError::Malformed { reason };
                    }
                }
            }
            Err(ExtractionError::Timeout) => {
                warn!(attempt, "vision call timed out");
                last_err = ExtractionError::Timeout;
            }
            Err(ExtractionError::Empty) => {
                warn!(attempt, "vision model returned nothing");
                last_err = ExtractionError::Empty;
            }
            // Not retryable: a bad key or dead network won't improve.
            Err(e) => return Err(e),
        }
    }

    Err(last_err)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
