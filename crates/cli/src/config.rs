//! `promptlog.toml` plus environment-held secrets.

use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use gemini_adapter::GeminiConfig;
use serde::Deserialize;
use sheets_adapter::SheetsConfig;
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "promptlog.toml";
pub const DEFAULT_TITLE: &str = "My AI Tool";
pub const DEFAULT_INSTRUCTION: &str =
    "You are a capable assistant. Answer the user's input precisely.";
pub const DEFAULT_WORKSHEET: &str = "Sheet1";
pub const DEFAULT_SQLITE_PATH: &str = "promptlog.db";

/// Fatal setup problems. No submission runs while one of these is present.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("environment variable {0} is not set")]
    MissingSecret(String),
    #[error("store.spreadsheet_id is required for the sheets backend")]
    MissingSpreadsheetId,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub title: String,
    /// Prepended to every prompt; empty or absent disables it.
    pub instruction: Option<String>,
    pub generation: GenerationSection,
    pub store: StoreSection,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            instruction: Some(DEFAULT_INSTRUCTION.to_string()),
            generation: GenerationSection::default(),
            store: StoreSection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GenerationSection {
    pub model: String,
    pub api_key_env: String,
    pub base_url: String,
    pub timeout_secs: Option<u64>,
}

impl Default for GenerationSection {
    fn default() -> Self {
        Self {
            model: gemini_adapter::DEFAULT_MODEL.to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            base_url: gemini_adapter::DEFAULT_BASE_URL.to_string(),
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Sheets,
    #[default]
    Sqlite,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct StoreSection {
    pub backend: Backend,
    pub worksheet: String,
    pub spreadsheet_id: Option<String>,
    pub access_token_env: String,
    pub base_url: String,
    pub path: String,
    pub timeout_secs: Option<u64>,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            worksheet: DEFAULT_WORKSHEET.to_string(),
            spreadsheet_id: None,
            access_token_env: "GOOGLE_SHEETS_TOKEN".to_string(),
            base_url: sheets_adapter::DEFAULT_BASE_URL.to_string(),
            path: DEFAULT_SQLITE_PATH.to_string(),
            timeout_secs: None,
        }
    }
}

/// Store wiring after secrets have been resolved.
#[derive(Debug, Clone)]
pub enum StoreTarget {
    Sheets(SheetsConfig),
    Sqlite { path: String, worksheet: String },
}

impl Config {
    pub fn parse(text: &str, path: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })
    }

    /// Loads `path`; a missing default file means all defaults, a missing
    /// explicitly named file is an error.
    pub fn load(path: &Path, explicit: bool) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        match fs::read_to_string(path) {
            Ok(text) => Self::parse(&text, &display),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !explicit => {
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Read {
                path: display,
                source,
            }),
        }
    }

    pub fn instruction(&self) -> Option<String> {
        self.instruction
            .as_ref()
            .filter(|s| !s.trim().is_empty())
            .cloned()
    }

    pub fn gemini(&self) -> Result<GeminiConfig, ConfigError> {
        self.gemini_with(|name| env::var(name).ok())
    }

    pub fn store_target(&self) -> Result<StoreTarget, ConfigError> {
        self.store_target_with(|name| env::var(name).ok())
    }

    fn gemini_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<GeminiConfig, ConfigError> {
        let section = &self.generation;
        let api_key = secret(&lookup, &section.api_key_env)?;
        let mut config = GeminiConfig::new(api_key);
        config.model = section.model.clone();
        config.base_url = section.base_url.clone();
        config.timeout = section.timeout_secs.map(Duration::from_secs);
        Ok(config)
    }

    fn store_target_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<StoreTarget, ConfigError> {
        let section = &self.store;
        match section.backend {
            Backend::Sqlite => Ok(StoreTarget::Sqlite {
                path: section.path.clone(),
                worksheet: section.worksheet.clone(),
            }),
            Backend::Sheets => {
                let spreadsheet_id = section
                    .spreadsheet_id
                    .clone()
                    .filter(|id| !id.trim().is_empty())
                    .ok_or(ConfigError::MissingSpreadsheetId)?;
                let token = secret(&lookup, &section.access_token_env)?;
                let mut config = SheetsConfig::new(spreadsheet_id, section.worksheet.clone(), token);
                config.base_url = section.base_url.clone();
                config.timeout = section.timeout_secs.map(Duration::from_secs);
                Ok(StoreTarget::Sheets(config))
            }
        }
    }
}

fn secret(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<String, ConfigError> {
    lookup(name)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingSecret(name.to_string()))
}
