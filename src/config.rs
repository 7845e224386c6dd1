// Configuration loading and parsing (app.toml, credentials.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub team: TeamConfig,
    pub data_path: String,
    pub seasons: Vec<String>,
    pub formats: Vec<String>,
    pub extraction: ExtractionConfig,
    pub auth: AuthConfig,
    pub credentials: CredentialsConfig,
}

// ---------------------------------------------------------------------------
// app.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire app.toml file.
#[derive(Debug, Clone, Deserialize)]
struct AppFile {
    team: TeamConfig,
    data: DataSection,
    seasons: SeasonsSection,
    formats: FormatsSection,
    extraction: ExtractionConfig,
    #[serde(default)]
    auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TeamConfig {
    /// The viewing team's name. Opponent-sheet ingestion stores this as the
    /// row's `Opponent` and moves the true team name to `OriginalTeam`.
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
struct DataSection {
    path: String,
}

#[derive(Debug, Clone, Deserialize)]
struct SeasonsSection {
    labels: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct FormatsSection {
    codes: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionConfig {
    pub model: String,
    pub max_tokens: u32,
    /// Re-invocations after the first failed attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_max_retries() -> u32 {
    2
}

fn default_timeout_secs() -> u64 {
    60
}

/// Carried for the presentation layer; the engine never checks it.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AuthConfig {
    pub editor_password_hash: Option<String>,
}

// ---------------------------------------------------------------------------
// credentials.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CredentialsConfig {
    pub anthropic_api_key: Option<String>,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/app.toml` and (optionally)
/// `config/credentials.toml`, both relative to the given `base_dir`.
///
/// This is the lower-level loading primitive that does not auto-copy defaults.
/// Prefer `load_config()` which handles default initialization automatically.
pub(crate) fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    // --- app.toml (required) ---
    let app_path = config_dir.join("app.toml");
    let app_text = read_file(&app_path)?;
    let app_file: AppFile = toml::from_str(&app_text).map_err(|e| ConfigError::ParseError {
        path: app_path.clone(),
        source: e,
    })?;

    // --- credentials.toml (optional) ---
    let credentials_path = config_dir.join("credentials.toml");
    let credentials = if credentials_path.exists() {
        let cred_text = read_file(&credentials_path)?;
        toml::from_str(&cred_text).map_err(|e| ConfigError::ParseError {
            path: credentials_path.clone(),
            source: e,
        })?
    } else {
        CredentialsConfig::default()
    };

    let config = Config {
        team: app_file.team,
        data_path: app_file.data.path,
        seasons: app_file.seasons.labels,
        formats: app_file.formats.codes,
        extraction: app_file.extraction,
        auth: app_file.auth,
        credentials,
    };

    validate(&config)?;

    Ok(config)
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied. Skips `.example` files.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        // Without defaults/ we can still run, as long as config/ was set up
        // by hand. Both missing means the app cannot start.
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the project root or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let mut copied = Vec::new();

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };

        // Skip .example template files
        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }
        let target = config_dir.join(file_name);

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", path.display()),
                })?;
                std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                copied.push(target);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                // File already exists in config/, skip it
            }
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

/// Convenience wrapper: loads config relative to the current working
/// directory, falling back to the per-user config location when the working
/// directory carries neither `config/` nor `defaults/`.
/// Ensures default config files are copied before loading.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    let base = if cwd.join("config").exists() || cwd.join("defaults").exists() {
        cwd
    } else {
        user_base_dir().unwrap_or(cwd)
    };
    ensure_config_files(&base)?;
    load_config_from(&base)
}

/// Per-user fallback base directory (`~/.config/scorebook` on Linux).
fn user_base_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "scorebook")
        .map(|dirs| dirs.config_dir().to_path_buf())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.team.name.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "team.name".into(),
            message: "must not be empty".into(),
        });
    }

    if config.data_path.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "data.path".into(),
            message: "must not be empty".into(),
        });
    }

    if config.seasons.is_empty() {
        return Err(ConfigError::ValidationError {
            field: "seasons.labels".into(),
            message: "must list at least one season".into(),
        });
    }

    if config.formats.is_empty() {
        return Err(ConfigError::ValidationError {
            field: "formats.codes".into(),
            message: "must list at least one game format code".into(),
        });
    }

    if config.extraction.model.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "extraction.model".into(),
            message: "must not be empty".into(),
        });
    }

    if config.extraction.max_tokens == 0 {
        return Err(ConfigError::ValidationError {
            field: "extraction.max_tokens".into(),
            message: "must be greater than 0".into(),
        });
    }

    if config.extraction.timeout_secs == 0 {
        return Err(ConfigError::ValidationError {
            field: "extraction.timeout_secs".into(),
            message: "must be greater than 0".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
