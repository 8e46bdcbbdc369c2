use config::{Config, ConfigError, File};
use serde::Deserialize;
use strum::EnumString;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, strum::Display, EnumString)]
pub enum Environment {
    Test,
    Local,
    Development,
    Production,
}

#[derive(Deserialize, Debug)]
pub struct Settings {
    pub environment: Environment,
    #[serde(with = "humantime_serde")]
    pub commit_interval: std::time::Duration,
    pub broadcast_buffer_size: usize,
    pub history_capacity: usize,
    pub subscriber_queue_capacity: usize,
    pub api_address: Option<String>,
    pub api_token: Option<String>,
}

impl Settings {
    /// Loads `config/<environment>.yml` selected by `HARBORFLOW_ENVIRONMENT`
    /// (default `local`), with `HARBORFLOW`-prefixed environment variables
    /// overriding file values.
    pub fn new() -> Result<Self, ConfigError> {
        let environment = std::env::var("HARBORFLOW_ENVIRONMENT")
            .unwrap_or_else(|_| "local".to_string())
            .to_lowercase();

        Config::builder()
            .add_source(File::with_name(&format!("config/{environment}")).required(true))
            .add_source(config::Environment::with_prefix("HARBORFLOW").separator("__"))
            .build()?
            .try_deserialize()
    }
}
