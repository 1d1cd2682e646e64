mod parsing;
mod settings;
mod types;

pub use types::{
    AttemptSettings, BackendSettings, ConfigError, Environment, RuntimeSettings, Settings,
    TelemetrySettings,
};
