use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScoutError {
    /// An expected control never showed up or did not reach the wanted state
    #[error("Navigation error on {control}: {detail}")]
    Navigation { control: String, detail: String },
    #[error("Region not found: {region} ({detail})")]
    RegionNotFound { region: String, detail: String },
    #[error("Timed out after {after_ms}ms waiting for {what}")]
    Timeout { what: String, after_ms: u64 },
    /// The browser or driver itself failed
    #[error("Session error during {action}: {detail}")]
    Session { action: String, detail: String },
    #[error("Config error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ScoutError {
    pub fn navigation(control: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Navigation {
            control: control.into(),
            detail: detail.into(),
        }
    }

    pub fn session(action: impl Into<String>, detail: impl ToString) -> Self {
        Self::Session {
            action: action.into(),
            detail: detail.to_string(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

pub type Result<T> = std::result::Result<T, ScoutError>;
