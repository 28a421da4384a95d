use std::path::PathBuf;
use std::str::FromStr;

use symptom_flow::ArtifactPaths;
use symptom_flow::artifacts::{CLASS_NAMES_FILE, FEATURE_NAMES_FILE, MODEL_FILE};
use tracing::warn;

pub const DEFAULT_ARTIFACT_DIR: &str = "demos/artifacts";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_SESSION_IDLE_SECS: u32 = 30 * 60;
pub const DEFAULT_SESSION_SWEEP_SECS: u32 = 60;

/// Log output format, selected with `LOG_FORMAT`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub artifact_dir: PathBuf,
    pub model_file: String,
    pub class_names_file: String,
    pub feature_names_file: String,
    pub require_patient_identity: bool,
    pub host: String,
    pub port: u16,
    pub log_format: LogFormat,
    /// Sessions with no submit or reset for this long are dropped.
    pub session_idle_secs: u32,
    pub session_sweep_secs: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            artifact_dir: PathBuf::from(DEFAULT_ARTIFACT_DIR),
            model_file: MODEL_FILE.to_string(),
            class_names_file: CLASS_NAMES_FILE.to_string(),
            feature_names_file: FEATURE_NAMES_FILE.to_string(),
            require_patient_identity: true,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            log_format: LogFormat::default(),
            session_idle_secs: DEFAULT_SESSION_IDLE_SECS,
            session_sweep_secs: DEFAULT_SESSION_SWEEP_SECS,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ServiceConfig::from_env`] with an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            artifact_dir: lookup("ARTIFACT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.artifact_dir),
            model_file: lookup("MODEL_FILE").unwrap_or(defaults.model_file),
            class_names_file: lookup("CLASS_NAMES_FILE").unwrap_or(defaults.class_names_file),
            feature_names_file: lookup("FEATURE_NAMES_FILE")
                .unwrap_or(defaults.feature_names_file),
            require_patient_identity: parse_or_default(
                "REQUIRE_PATIENT_IDENTITY",
                lookup("REQUIRE_PATIENT_IDENTITY"),
                parse_bool,
                defaults.require_patient_identity,
            ),
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_or_default(
                "PORT",
                lookup("PORT"),
                |v| v.parse::<u16>().map_err(|e| e.to_string()),
                defaults.port,
            ),
            log_format: parse_or_default(
                "LOG_FORMAT",
                lookup("LOG_FORMAT"),
                LogFormat::from_str,
                defaults.log_format,
            ),
            session_idle_secs: parse_or_default(
                "SESSION_IDLE_SECS",
                lookup("SESSION_IDLE_SECS"),
                parse_positive_secs,
                defaults.session_idle_secs,
            ),
            session_sweep_secs: parse_or_default(
                "SESSION_SWEEP_SECS",
                lookup("SESSION_SWEEP_SECS"),
                parse_positive_secs,
                defaults.session_sweep_secs,
            ),
        }
    }

    pub fn artifact_paths(&self) -> ArtifactPaths {
        ArtifactPaths {
            model: self.artifact_dir.join(&self.model_file),
            class_names: self.artifact_dir.join(&self.class_names_file),
            feature_names: self.artifact_dir.join(&self.feature_names_file),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn session_idle_timeout(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::from(self.session_idle_secs))
    }

    pub fn session_sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(u64::from(self.session_sweep_secs))
    }
}

fn parse_bool(value: &str) -> Result<bool, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(format!("not a boolean: {other}")),
    }
}

fn parse_positive_secs(value: &str) -> Result<u32, String> {
    match value.trim().parse::<u32>() {
        Ok(0) => Err("must be at least one second".to_string()),
        Ok(secs) => Ok(secs),
        Err(e) => Err(e.to_string()),
    }
}

fn parse_or_default<T>(
    key: &str,
    raw: Option<String>,
    parse: impl Fn(&str) -> Result<T, String>,
    default: T,
) -> T {
    let Some(raw) = raw else {
        return default;
    };
    match parse(&raw) {
        Ok(value) => value,
        Err(e) => {
            warn!(key = key, value = %raw, error = %e, "Invalid configuration value, using default");
            default
        }
    }
}
