// Claude vision client for the Anthropic Messages API.
//
// A single non-streaming request: one base64 image content block plus the
// extraction instruction, text back. The per-request deadline comes from the
// extraction config; a timeout counts as a failed attempt for the retry
// driver in `mod.rs`.

use base64::Engine;
use serde_json::Value;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::Config;
use crate::extract::{ExtractionError, VisionModel};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

// ---------------------------------------------------------------------------
// ClaudeVision
// ---------------------------------------------------------------------------

/// Low-level Claude vision client.
pub struct ClaudeVision {
    http: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    timeout: Duration,
}

impl ClaudeVision {
    pub fn new(api_key: String, model: String, max_tokens: u32, timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            model,
            max_tokens,
            timeout,
        }
    }

    async fn call(&self, image: &[u8], instruction: &str) -> Result<String, ExtractionError> {
        if self.api_key.is_empty() {
            return Err(ExtractionError::Disabled);
        }

        let encoded = base64::engine::general_purpose::STANDARD.encode(image);
        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": [{
                "role": "user",
                "content": [
                    {
                        "type": "image",
                        "source": {
                            "type": "base64",
                            "media_type": detect_media_type(image),
                            "data": encoded,
                        }
                    },
                    { "type": "text", "text": instruction }
                ]
            }]
        });

        let response = self
            .http
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ExtractionError::Timeout
                } else {
                    ExtractionError::Http(e.to_string())
                }
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            if e.is_timeout() {
                ExtractionError::Timeout
            } else {
                ExtractionError::Http(e.to_string())
            }
        })?;

        if !status.is_success() {
            let message =
                parse_error_message(&text).unwrap_or_else(|| "unknown API error".to_string());
            return Err(ExtractionError::Api {
                status: status.as_u16(),
                message,
            });
        }

        match parse_message_text(&text) {
            Some(content) if !content.trim().is_empty() => Ok(content),
            _ => Err(ExtractionError::Empty),
        }
    }
}

#[async_trait]
impl VisionModel for ClaudeVision {
    async fn extract(&self, image: &[u8], instruction: &str) -> Result<String, ExtractionError> {
        self.call(image, instruction).await
    }
}

// ---------------------------------------------------------------------------
// VisionClient wrapper
// ---------------------------------------------------------------------------

/// High-level wrapper that is either an active vision client or disabled.
pub enum VisionClient {
    /// The API is configured and ready.
    Active(ClaudeVision),
    /// No API key configured; extraction fails fast, manual entry still works.
    Disabled,
}

impl VisionClient {
    /// Build a `VisionClient` from the application config. Returns `Active`
    /// only when credentials carry a non-empty API key.
    pub fn from_config(config: &Config) -> Self {
        match &config.credentials.anthropic_api_key {
            Some(key) if !key.is_empty() => VisionClient::Active(ClaudeVision::new(
                key.clone(),
                config.extraction.model.clone(),
                config.extraction.max_tokens,
                Duration::from_secs(config.extraction.timeout_secs),
            )),
            _ => VisionClient::Disabled,
        }
    }
}

#[async_trait]
impl VisionModel for VisionClient {
    async fn extract(&self, image: &[u8], instruction: &str) -> Result<String, ExtractionError> {
        match self {
            VisionClient::Active(client) => client.extract(image, instruction).await,
            VisionClient::Disabled => Err(ExtractionError::Disabled),
        }
    }
}

// ---------------------------------------------------------------------------
// Response JSON parsing helpers
// ---------------------------------------------------------------------------

/// Extract the assistant text from a Messages API response.
///
/// Expected shape: `{ "content": [ { "type": "text", "text": "..." } ] }`.
/// Multiple text blocks are concatenated.
pub(crate) fn parse_message_text(data: &str) -> Option<String> {
    let v: Value = serde_json::from_str(data).ok()?;
    let blocks = v.get("content")?.as_array()?;
    let mut out = String::new();
    for block in blocks {
        if block.get("type").and_then(Value::as_str) == Some("text") {
            if let Some(text) = block.get("text").and_then(Value::as_str) {
                out.push_str(text);
            }
        }
    }
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

/// Extract `error.message` from an API error body.
///
/// Expected shape: `{ "error": { "type": "...", "message": "..." } }`
pub(crate) fn parse_error_message(data: &str) -> Option<String> {
    let v: Value = serde_json::from_str(data).ok()?;
    v.get("error")?
        .get("message")?
        .as_str()
        .map(|s| s.to_string())
}

/// Sniff the image media type from magic bytes. Phone photos are JPEG in
/// practice, so that is the fallback.
pub(crate) fn detect_media_type(image: &[u8]) -> &'static str {
    if image.starts_with(&[0x89, b'P', b'N', b'G']) {
        "image/png"
    } else if image.starts_with(b"GIF8") {
        "image/gif"
    } else if image.len() >= 12 && &image[0..4] == b"RIFF" && &image[8..12] == b"WEBP" {
        "image/webp"
    } else {
        "image/jpeg"
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- response JSON parsing tests --

    #[test]
    fn parse_single_text_block() {
        let data = r#"{
            "id": "msg_123",
            "type": "message",
            "role": "assistant",
            "content": [ { "type": "text", "text": "No,PlayerName,PTS" } ],
            "model": "claude-sonnet-4-5-20250929",
            "usage": { "input_tokens": 1200, "output_tokens": 300 }
        }"#;
        assert_eq!(
            parse_message_text(data),
            Some("No,PlayerName,PTS".to_string())
        );
    }

    #[test]
    fn parse_concatenates_multiple_text_blocks() {
        let data = r#"{
            "content": [
                { "type": "text", "text": "No,PlayerName" },
                { "type": "text", "text": ",PTS" }
            ]
        }"#;
        assert_eq!(parse_message_text(data), Some("No,PlayerName,PTS".to_string()));
    }

    #[test]
    fn parse_skips_non_text_blocks() {
        let data = r#"{
            "content": [
                { "type": "thinking", "thinking": "hmm" },
                { "type": "text", "text": "rows" }
            ]
        }"#;
        assert_eq!(parse_message_text(data), Some("rows".to_string()));
    }

    #[test]
    fn parse_empty_content_is_none() {
        assert_eq!(parse_message_text(r#"{ "content": [] }"#), None);
    }

    #[test]
    fn parse_invalid_json_is_none() {
        assert_eq!(parse_message_text("not json"), None);
    }

    #[test]
    fn parse_error_body() {
        let data = r#"{
            "type": "error",
            "error": { "type": "authentication_error", "message": "Invalid API key" }
        }"#;
        assert_eq!(parse_error_message(data), Some("Invalid API key".to_string()));
    }

    #[test]
    fn parse_error_body_missing_message() {
        assert_eq!(parse_error_message(r#"{ "error": {} }"#), None);
        assert_eq!(parse_error_message("{broken"), None);
    }

    // -- media type sniffing --

    #[test]
    fn detects_png() {
        assert_eq!(
            detect_media_type(&[0x89, b'P', b'N', b'G', 0x0d, 0x0a]),
            "image/png"
        );
    }

    #[test]
    fn detects_webp() {
        let mut bytes = b"RIFF\x00\x00\x00\x00WEBP".to_vec();
        bytes.extend_from_slice(&[0; 8]);
        assert_eq!(detect_media_type(&bytes), "image/webp");
    }

    #[test]
    fn falls_back_to_jpeg() {
        assert_eq!(detect_media_type(&[0xff, 0xd8, 0xff]), "image/jpeg");
        assert_eq!(detect_media_type(b"??"), "image/jpeg");
    }

    // -- disabled paths --

    #[tokio::test]
    async fn disabled_client_fails_fast() {
        let client = VisionClient::Disabled;
        let err = client.extract(b"img", "read this").await.unwrap_err();
        assert!(matches!(err, ExtractionError::Disabled));
    }

    #[tokio::test]
    async fn empty_api_key_fails_fast() {
        let client = ClaudeVision::new(
            String::new(),
            "model".to_string(),
            1000,
            Duration::from_secs(60),
        );
        let err = client.extract(b"img", "read this").await.unwrap_err();
        assert!(matches!(err, ExtractionError::Disabled));
    }

    // -- VisionClient::from_config --

    fn make_test_config(api_key: Option<String>) -> Config {
        use crate::config::*;

        Config {
            team: TeamConfig {
                name: "Meiko".to_string(),
            },
            data_path: "data/stats.csv".to_string(),
            seasons: vec!["2024-25".to_string()],
            formats: vec!["4Q".to_string()],
            extraction: ExtractionConfig {
                model: "claude-sonnet-4-5-20250929".to_string(),
                max_tokens: 4000,
                max_retries: 2,
                timeout_secs: 60,
            },
            auth: AuthConfig::default(),
            credentials: CredentialsConfig {
                anthropic_api_key: api_key,
            },
        }
    }

    #[test]
    fn from_config_with_api_key_returns_active() {
        let config = make_test_config(Some("sk-ant-test-key".to_string()));
        assert!(matches!(
            VisionClient::from_config(&config),
            VisionClient::Active(_)
        ));
    }

    #[test]
    fn from_config_without_api_key_returns_disabled() {
        let config = make_test_config(None);
        assert!(matches!(
            VisionClient::from_config(&config),
            VisionClient::Disabled
        ));
    }

    #[test]
    fn from_config_with_empty_api_key_returns_disabled() {
        let config = make_test_config(Some(String::new()));
        assert!(matches!(
            VisionClient::from_config(&config),
            VisionClient::Disabled
        ));
    }

    // -- integration-style test with a mock HTTP server --

    #[tokio::test]
    async fn mock_server_success_flow() {
        use tokio::io::AsyncWriteExt;
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server_task = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 65536];
            let _ = tokio::io::AsyncReadExt::read(&mut socket, &mut buf).await;

            let body = r#"{"content":[{"type":"text","text":"No,PlayerName,PTS\n4,Sato,12"}]}"#;
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\n\r\n{}",
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.flush().await.unwrap();
            tokio::time::sleep(Duration::from_millis(100)).await;
        });

        // Point a raw request at the mock server and reuse the client's
        // response handling helpers.
        let http = reqwest::Client::new();
        let response = http
            .post(format!("http://{addr}"))
            .header("content-type", "application/json")
            .body("{}")
            .send()
            .await
            .unwrap();
        assert!(response.status().is_success());
        let text = response.text().await.unwrap();
        let content = parse_message_text(&text).unwrap();
        assert!(content.starts_with("No,PlayerName,PTS"));

        let _ = server_task.await;
    }

    #[tokio::test]
    async fn mock_server_error_status() {
        use tokio::io::AsyncWriteExt;
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server_task = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 65536];
            let _ = tokio::io::AsyncReadExt::read(&mut socket, &mut buf).await;

            let body = r#"{"error":{"message":"Invalid API key","type":"authentication_error"}}"#;
            let response = format!(
                "HTTP/1.1 401 Unauthorized\r\ncontent-type: application/json\r\ncontent-length: {}\r\n\r\n{}",
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.flush().await.unwrap();
            tokio::time::sleep(Duration::from_millis(100)).await;
        });

        let http = reqwest::Client::new();
        let response = http
            .post(format!("http://{addr}"))
            .header("content-type", "application/json")
            .body("{}")
            .send()
            .await
            .unwrap();
        let status = response.status();
        assert_eq!(status.as_u16(), 401);
        let text = response.text().await.unwrap();
        assert_eq!(parse_error_message(&text).as_deref(), Some("Invalid API key"));

        let _ = server_task.await;
    }
}
