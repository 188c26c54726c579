use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub redis: RedisSettings,
    pub application: ApplicationSettings,
    pub idempotency: IdempotencySettings,
}

#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub pool_size: u32,
}

#[derive(Debug, Deserialize)]
pub struct RedisSettings {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct ApplicationSettings {
    pub port: u16,
    pub log_level: String,
    pub log_format: String,
}

/// Idempotency tunables. Passed explicitly into the coordinator and
/// executor at construction time; decision logic never reads the process
/// environment.
#[derive(Debug, Clone, Deserialize)]
pub struct IdempotencySettings {
    pub header_name: String,
    pub key_prefix: String,
    pub ttl_hours: i64,
    pub cleanup_interval_secs: u64,
}

impl Default for IdempotencySettings {
    fn default() -> Self {
        Self {
            header_name: "Idempotency-Key".to_string(),
            key_prefix: "idem".to_string(),
            ttl_hours: 24,
            cleanup_interval_secs: 3600,
        }
    }
}

impl IdempotencySettings {
    pub fn ttl_seconds(&self) -> i64 {
        self.ttl_hours * 3600
    }
}

impl Settings {
    pub fn new() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"));

        builder.build()?.try_deserialize()
    }
}
