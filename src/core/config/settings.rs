use super::parsing::{
    env_optional, env_or_default, parse_bool, parse_environment, parse_i64, parse_u32, parse_u64,
};
use super::types::{
    AttemptSettings, BackendSettings, ConfigError, RuntimeSettings, Settings, TelemetrySettings,
};

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment =
            parse_environment(env_optional("EXAMFLOW_ENV").or_else(|| env_optional("ENVIRONMENT")));
        let strict_config =
            env_optional("EXAMFLOW_STRICT_CONFIG").map(|value| parse_bool(&value)).unwrap_or(false)
                || environment.is_production();

        let base_url = env_or_default("BACKEND_BASE_URL", "http://localhost:8000/api/v1");
        let api_token = env_or_default("BACKEND_API_TOKEN", "");
        let timeout_seconds =
            parse_u64("BACKEND_TIMEOUT_SECONDS", env_or_default("BACKEND_TIMEOUT_SECONDS", "30"))?;
        let connect_timeout_seconds = parse_u64(
            "BACKEND_CONNECT_TIMEOUT_SECONDS",
            env_or_default("BACKEND_CONNECT_TIMEOUT_SECONDS", "10"),
        )?;
        let max_load_retries = parse_u32(
            "BACKEND_MAX_LOAD_RETRIES",
            env_or_default("BACKEND_MAX_LOAD_RETRIES", "3"),
        )?;

        let countdown_tick_millis = parse_u64(
            "COUNTDOWN_TICK_MILLIS",
            env_or_default("COUNTDOWN_TICK_MILLIS", "1000"),
        )?;
        let text_debounce_millis = parse_u64(
            "TEXT_DEBOUNCE_MILLIS",
            env_or_default("TEXT_DEBOUNCE_MILLIS", "2000"),
        )?;
        let autosave_poll_millis = parse_u64(
            "AUTOSAVE_POLL_MILLIS",
            env_or_default("AUTOSAVE_POLL_MILLIS", "250"),
        )?;
        let time_sync_interval_seconds = parse_u64(
            "TIME_SYNC_INTERVAL_SECONDS",
            env_or_default("TIME_SYNC_INTERVAL_SECONDS", "30"),
        )?;
        let submit_grace_seconds = parse_i64(
            "SUBMIT_GRACE_SECONDS",
            env_or_default("SUBMIT_GRACE_SECONDS", "300"),
        )?;

        let log_level = env_or_default("EXAMFLOW_LOG_LEVEL", "info");
        let json = env_optional("EXAMFLOW_LOG_JSON").map(|value| parse_bool(&value)).unwrap_or(false);
        let prometheus_enabled =
            env_optional("PROMETHEUS_ENABLED").map(|value| parse_bool(&value)).unwrap_or(false);

        let settings = Self {
            runtime: RuntimeSettings { environment, strict_config },
            backend: BackendSettings {
                base_url,
                api_token,
                timeout_seconds,
                connect_timeout_seconds,
                max_load_retries,
            },
            attempt: AttemptSettings {
                countdown_tick_millis,
                text_debounce_millis,
                autosave_poll_millis,
                time_sync_interval_seconds,
                submit_grace_seconds,
            },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Built-in defaults, no environment reads. For in-crate tests.
    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        use super::types::Environment;

        Self {
            runtime: RuntimeSettings { environment: Environment::Test, strict_config: false },
            backend: BackendSettings {
                base_url: "http://localhost:8000/api/v1".to_string(),
                api_token: String::new(),
                timeout_seconds: 30,
                connect_timeout_seconds: 10,
                max_load_retries: 3,
            },
            attempt: AttemptSettings {
                countdown_tick_millis: 1000,
                text_debounce_millis: 2000,
                autosave_poll_millis: 250,
                time_sync_interval_seconds: 30,
                submit_grace_seconds: 300,
            },
            telemetry: TelemetrySettings {
                log_level: "info".to_string(),
                json: false,
                prometheus_enabled: false,
            },
        }
    }

    pub fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    pub fn backend(&self) -> &BackendSettings {
        &self.backend
    }

    pub fn attempt(&self) -> &AttemptSettings {
        &self.attempt
    }

    pub fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.attempt.countdown_tick_millis == 0 {
            return Err(ConfigError::InvalidValue {
                field: "COUNTDOWN_TICK_MILLIS",
                value: "0".to_string(),
            });
        }
        if self.attempt.text_debounce_millis == 0 {
            return Err(ConfigError::InvalidValue {
                field: "TEXT_DEBOUNCE_MILLIS",
                value: "0".to_string(),
            });
        }
        if self.attempt.autosave_poll_millis == 0
            || self.attempt.autosave_poll_millis > self.attempt.text_debounce_millis
        {
            return Err(ConfigError::InvalidValue {
                field: "AUTOSAVE_POLL_MILLIS",
                value: self.attempt.autosave_poll_millis.to_string(),
            });
        }
        if self.attempt.time_sync_interval_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "TIME_SYNC_INTERVAL_SECONDS",
                value: "0".to_string(),
            });
        }
        if self.attempt.submit_grace_seconds < 0 {
            return Err(ConfigError::InvalidValue {
                field: "SUBMIT_GRACE_SECONDS",
                value: self.attempt.submit_grace_seconds.to_string(),
            });
        }
        if self.backend.timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "BACKEND_TIMEOUT_SECONDS",
                value: "0".to_string(),
            });
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if self.backend.base_url.is_empty() {
            return Err(ConfigError::MissingSetting("BACKEND_BASE_URL"));
        }
        if self.backend.api_token.is_empty() {
            return Err(ConfigError::MissingSetting("BACKEND_API_TOKEN"));
        }

        Ok(())
    }
}
