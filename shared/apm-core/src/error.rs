//! Error types for configuration loading

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ApmError>;

#[derive(Error, Debug)]
pub enum ApmError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Settings document {path} is invalid: {details}")]
    Settings { path: PathBuf, details: String },

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ApmError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG_ERROR",
            Self::Settings { .. } => "SETTINGS_ERROR",
            Self::Io { .. } => "IO_ERROR",
        }
    }
}
