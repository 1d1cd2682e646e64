use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Settings {
    pub(super) runtime: RuntimeSettings,
    pub(super) backend: BackendSettings,
    pub(super) attempt: AttemptSettings,
    pub(super) telemetry: TelemetrySettings,
}

#[derive(Debug, Clone)]
pub struct BackendSettings {
    pub base_url: String,
    pub api_token: String,
    pub timeout_seconds: u64,
    pub connect_timeout_seconds: u64,
    pub max_load_retries: u32,
}

#[derive(Debug, Clone)]
pub struct AttemptSettings {
    /// Countdown recomputation cadence (1 Hz by default).
    pub countdown_tick_millis: u64,
    /// Quiet period before a free-text edit is flushed.
    pub text_debounce_millis: u64,
    /// How often the autosave loop checks for due text edits.
    pub autosave_poll_millis: u64,
    /// Cadence of time-spent delta flushes.
    pub time_sync_interval_seconds: u64,
    /// Manual submit is still accepted this long after the deadline.
    pub submit_grace_seconds: i64,
}

#[derive(Debug, Clone)]
pub struct TelemetrySettings {
    pub log_level: String,
    pub json: bool,
    pub prometheus_enabled: bool,
}

#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    pub environment: Environment,
    pub strict_config: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
    Staging,
    Test,
}

impl Environment {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Staging => "staging",
            Self::Test => "test",
        }
    }

    pub(super) fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
    #[error("missing required setting {0}")]
    MissingSetting(&'static str),
}
