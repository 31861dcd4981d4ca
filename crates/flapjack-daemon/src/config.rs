use crate::app_env::AppEnv;
use flapjack_models::MediumType;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub http: HttpSettings,
    pub processor: ProcessorSettings,
    pub notifier: NotifierSettings,
    #[serde(default)]
    pub gateways: HashMap<MediumType, GatewaySettings>,
}

#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    #[serde(default)]
    pub ca_path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HttpSettings {
    pub host: String,
    pub port: u16,
}

impl HttpSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Deserialize)]
pub struct ProcessorSettings {
    #[serde(with = "humantime_serde")]
    pub poll_interval: std::time::Duration,
    pub batch_size: i64,
    #[serde(with = "humantime_serde")]
    pub notification_poll_interval: std::time::Duration,
    /// Default hold-down before a first problem notification for a newly
    /// unhealthy check, absent a per-event override (spec.md §4.A/§6).
    #[serde(with = "humantime_serde")]
    pub initial_failure_delay: std::time::Duration,
    /// Default minimum interval between repeat problem notifications for a
    /// check still failing, absent a per-event override.
    #[serde(with = "humantime_serde")]
    pub repeat_failure_delay: std::time::Duration,
    /// How long a newly auto-created check is placed into unscheduled
    /// maintenance, giving its owner time to configure routing before it
    /// can page anyone.
    #[serde(with = "humantime_serde")]
    pub new_check_scheduled_maintenance_duration: std::time::Duration,
}

#[derive(Debug, Deserialize)]
pub struct NotifierSettings {
    pub concurrency_per_medium: usize,
    #[serde(with = "humantime_serde")]
    pub poll_interval: std::time::Duration,
    #[serde(with = "humantime_serde")]
    pub heartbeat_timeout: std::time::Duration,
    pub max_attempts: u32,
    #[serde(with = "humantime_serde")]
    pub min_backoff: std::time::Duration,
    #[serde(with = "humantime_serde")]
    pub max_backoff: std::time::Duration,
    /// How long to let in-flight deliveries finish after a shutdown signal
    /// before the process exits anyway.
    #[serde(with = "humantime_serde")]
    pub shutdown_grace: std::time::Duration,
}

#[derive(Debug, Deserialize)]
pub struct GatewaySettings {
    pub queue: String,
    #[serde(with = "humantime_serde")]
    pub timeout: std::time::Duration,
}

/// Loads settings from `config_dir/base.{yaml,...}`, layered with
/// `config_dir/{development,production,test}.{yaml,...}`, then overridden
/// by `FLAPJACK__`-prefixed environment variables (double underscore as the
/// nesting separator, e.g. `FLAPJACK__HTTP__PORT`). Called once from `main`
/// and threaded explicitly into every component from there; there is no
/// global settings singleton.
pub fn load_settings(config_dir: &Path, app_env: AppEnv) -> Result<Settings, config::ConfigError> {
    config::Config::builder()
        .add_source(config::File::from(config_dir.join("base")).required(true))
        .add_source(config::File::from(config_dir.join(app_env.as_str())).required(false))
        .add_source(
            config::Environment::with_prefix("FLAPJACK")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()
}
