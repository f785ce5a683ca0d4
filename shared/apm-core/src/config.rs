//! Runtime configuration for the demo client
//!
//! The configuration is read once at startup from an optional JSON settings
//! document and environment variables, then frozen. Every field is extracted
//! independently: a missing or malformed value only resets that field to its
//! default.

use std::env;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{ApmError, Result};

pub const DEFAULT_APP_NAME: &str = "unnamed";
pub const DEFAULT_APP_VERSION: &str = "0.0.0";

/// Environment variable naming the JSON settings document.
pub const SETTINGS_FILE_ENV: &str = "APM_SETTINGS_FILE";

/// Environment variables and the settings keys they override.
const ENV_OVERRIDES: [(&str, &str); 5] = [
    ("ENVIRONMENT", "environment"),
    ("APP_NAME", "app_name"),
    ("APP_VERSION", "app_version"),
    ("APM_ENABLED", "apm.enabled"),
    ("APM_URL", "apm.url"),
];

/// Deployment environment the client runs in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Local,
    Development,
    /// Also accepted as `recette`
    Staging,
    Qualification,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Development => "development",
            Self::Staging => "staging",
            Self::Qualification => "qualification",
            Self::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = ApmError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "development" => Ok(Self::Development),
            "staging" | "recette" => Ok(Self::Staging),
            "qualification" => Ok(Self::Qualification),
            "production" => Ok(Self::Production),
            other => Err(ApmError::Config(format!("Unknown environment: {}", other))),
        }
    }
}

/// Telemetry switch and collector endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TelemetrySettings {
    enabled: bool,
    endpoint: String,
}

impl TelemetrySettings {
    pub fn new(enabled: bool, endpoint: impl Into<String>) -> Self {
        Self {
            enabled,
            endpoint: endpoint.into(),
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Immutable runtime configuration snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Configuration {
    environment: Environment,
    app_name: String,
    app_version: String,
    telemetry: TelemetrySettings,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            app_name: DEFAULT_APP_NAME.to_string(),
            app_version: DEFAULT_APP_VERSION.to_string(),
            telemetry: TelemetrySettings::default(),
        }
    }
}

impl Configuration {
    pub fn new(
        environment: Environment,
        app_name: impl Into<String>,
        app_version: impl Into<String>,
    ) -> Self {
        Self {
            environment,
            app_name: app_name.into(),
            app_version: app_version.into(),
            telemetry: TelemetrySettings::default(),
        }
    }

    pub fn with_telemetry(mut self, telemetry: TelemetrySettings) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn app_version(&self) -> &str {
        &self.app_version
    }

    pub fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    /// Load the configuration from the process environment.
    ///
    /// Never fails: an unreadable settings document is logged and skipped,
    /// and any absent field takes its default.
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from environment-style variables supplied by `lookup`.
    ///
    /// When `APM_SETTINGS_FILE` resolves, that document is read first and the
    /// variables override it field by field.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Map::new();

        if let Some(path) = lookup(SETTINGS_FILE_ENV) {
            match read_settings_file(Path::new(&path)) {
                Ok(document) => {
                    debug!(path = %path, keys = document.len(), "Loaded runtime settings document");
                    settings = document;
                }
                Err(e) => warn!(
                    code = e.error_code(),
                    error = %e,
                    "Ignoring runtime settings document"
                ),
            }
        }

        apply_env_overrides(&mut settings, lookup);
        Self::from_settings(&Value::Object(settings))
    }

    /// Build from a settings document, failing if it cannot be read or parsed.
    pub fn from_settings_file(path: &Path) -> Result<Self> {
        let document = read_settings_file(path)?;
        Ok(Self::from_settings(&Value::Object(document)))
    }

    /// Extract recognized keys from a settings object.
    ///
    /// Recognized keys are `environment`, `app_name`, `app_version` and the
    /// telemetry pair, given either nested (`{"apm": {"enabled", "url"}}`) or
    /// dotted (`"apm.enabled"`, `"apm.url"`). Dotted keys win over nested ones.
    /// Anything else is ignored.
    pub fn from_settings(settings: &Value) -> Self {
        let defaults = Self::default();

        let Some(map) = settings.as_object() else {
            warn!("Runtime settings are not an object, using defaults");
            return defaults;
        };

        let environment = map
            .get("environment")
            .and_then(coerce_environment)
            .unwrap_or(defaults.environment);
        let app_name = map
            .get("app_name")
            .and_then(coerce_string)
            .unwrap_or(defaults.app_name);
        let app_version = map
            .get("app_version")
            .and_then(coerce_string)
            .unwrap_or(defaults.app_version);
        let enabled = apm_field(map, "enabled")
            .and_then(coerce_bool)
            .unwrap_or(defaults.telemetry.enabled);
        let endpoint = apm_field(map, "url")
            .and_then(coerce_string)
            .unwrap_or(defaults.telemetry.endpoint);

        Self {
            environment,
            app_name,
            app_version,
            telemetry: TelemetrySettings { enabled, endpoint },
        }
    }
}

fn apply_env_overrides<F>(settings: &mut Map<String, Value>, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    for (var, key) in ENV_OVERRIDES {
        if let Some(value) = lookup(var) {
            settings.insert(key.to_string(), Value::String(value));
        }
    }
}

fn read_settings_file(path: &Path) -> Result<Map<String, Value>> {
    let raw = std::fs::read_to_string(path).map_err(|source| ApmError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let document: Value = serde_json::from_str(&raw).map_err(|e| ApmError::Settings {
        path: path.to_path_buf(),
        details: e.to_string(),
    })?;

    match document {
        Value::Object(map) => Ok(map),
        _ => Err(ApmError::Settings {
            path: path.to_path_buf(),
            details: "expected a JSON object at the top level".to_string(),
        }),
    }
}

fn apm_field<'a>(map: &'a Map<String, Value>, field: &str) -> Option<&'a Value> {
    map.get(&format!("apm.{}", field))
        .or_else(|| map.get("apm").and_then(|apm| apm.get(field)))
}

fn coerce_environment(value: &Value) -> Option<Environment> {
    let raw = value.as_str()?;
    match raw.parse() {
        Ok(environment) => Some(environment),
        Err(e) => {
            warn!(error = %e, "Falling back to the default environment");
            None
        }
    }
}

fn coerce_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(true),
            "false" | "0" | "no" | "off" => Some(false),
            _ => None,
        },
        _ => None,
    }
}
