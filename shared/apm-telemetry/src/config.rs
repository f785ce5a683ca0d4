//! Telemetry Configuration

use apm_core::Configuration;
use uuid::Uuid;

use crate::item::{AppMeta, Meta, SdkMeta, SessionMeta};

/// Process logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub log_level: String,
    pub json_logs: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl LogConfig {
    pub fn from_env() -> Self {
        Self {
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            json_logs: std::env::var("JSON_LOGS")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        }
    }
}

/// Everything a connector needs to set up a sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkConfig {
    pub url: String,
    pub app: AppMeta,
    pub session_id: String,
}

impl SinkConfig {
    /// Derive sink settings from the runtime configuration, opening a fresh session.
    pub fn from_configuration(config: &Configuration) -> Self {
        Self {
            url: config.telemetry().endpoint().to_string(),
            app: AppMeta {
                name: config.app_name().to_string(),
                version: config.app_version().to_string(),
                environment: config.environment().to_string(),
            },
            session_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn meta(&self) -> Meta {
        Meta {
            app: self.app.clone(),
            session: SessionMeta {
                id: self.session_id.clone(),
            },
            sdk: SdkMeta::default(),
        }
    }
}
