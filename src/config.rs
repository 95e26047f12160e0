use serde::Deserialize;
use std::env;
use std::path::Path;

use crate::services::datafusion::SessionConfig;

/// Environment variable naming an optional TOML/YAML/JSON config file
pub const CONFIG_FILE_ENV: &str = "SQL_GATEWAY_CONFIG";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub engine: EngineConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    pub batch_size: usize,
    /// 0 means one partition per CPU
    pub target_partitions: usize,
    /// sqlparser dialect name
    pub dialect: String,
    /// Initial `pipeline.name` session property
    pub pipeline_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub style: String,
}

/// Environment variable -> config key overrides
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("HOST", "server.host"),
    ("PORT", "server.port"),
    ("ENGINE_BATCH_SIZE", "engine.batch_size"),
    ("ENGINE_TARGET_PARTITIONS", "engine.target_partitions"),
    ("SQL_DIALECT", "engine.dialect"),
    ("PIPELINE_NAME", "engine.pipeline_name"),
    ("RUST_LOG", "logging.level"),
    ("RUST_LOG_STYLE", "logging.style"),
];

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        // Try to load from .env file
        let _ = dotenv::dotenv();

        let file = env::var(CONFIG_FILE_ENV).ok();
        Self::load(file.as_deref().map(Path::new), |key| env::var(key).ok())
    }

    /// Build the configuration from defaults, an optional file and overrides
    ///
    /// `lookup` resolves environment variables; later sources win.
    pub fn load(
        file: Option<&Path>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("engine.batch_size", 8192)?
            .set_default("engine.target_partitions", 0)?
            .set_default("engine.dialect", "generic")?
            .set_default("logging.level", "info")?
            .set_default("logging.style", "auto")?;

        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path));
        }

        for (var, key) in ENV_OVERRIDES {
            if let Some(value) = lookup(var) {
                builder = builder.set_override(*key, value)?;
            }
        }

        builder.build()?.try_deserialize()
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            batch_size: self.engine.batch_size,
            target_partitions: self.engine.target_partitions,
            ..SessionConfig::default()
        }
    }
}
