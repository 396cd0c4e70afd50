use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

use crate::core::matcher::{Matcher, DEFAULT_MAX_RESULTS, DEFAULT_PARALLEL_THRESHOLD};
use crate::core::scoring::DEFAULT_REASON_THRESHOLD;
use crate::models::ScoringWeights;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub matching: MatchingSettings,
    #[serde(default)]
    pub scoring: ScoringSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub acquire_timeout_secs: Option<u64>,
    pub idle_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    pub ttl_secs: Option<u64>,
    pub l1_cache_size: Option<u64>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            redis_url: default_redis_url(),
            ttl_secs: None,
            l1_cache_size: None,
        }
    }
}

fn default_true() -> bool { true }
fn default_redis_url() -> String { "redis://127.0.0.1:6379".to_string() }

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MatchingSettings {
    /// Matches returned when the caller gives no limit
    pub max_results: Option<usize>,
    /// Largest limit a caller may ask for
    pub max_limit: Option<usize>,
    /// Candidates loaded from the store per request
    pub candidate_pool: Option<i64>,
    pub parallel_threshold: Option<usize>,
}

impl MatchingSettings {
    pub fn max_results(&self) -> usize {
        self.max_results.unwrap_or(DEFAULT_MAX_RESULTS)
    }

    pub fn max_limit(&self) -> usize {
        self.max_limit.unwrap_or(100)
    }

    pub fn candidate_pool(&self) -> i64 {
        self.candidate_pool.unwrap_or(200)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScoringSettings {
    #[serde(default)]
    pub weights: WeightsConfig,
    #[serde(default = "default_reason_threshold")]
    pub reason_threshold: f64,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            weights: WeightsConfig::default(),
            reason_threshold: default_reason_threshold(),
        }
    }
}

fn default_reason_threshold() -> f64 { DEFAULT_REASON_THRESHOLD }

#[derive(Debug, Clone, Deserialize)]
pub struct WeightsConfig {
    #[serde(default = "default_species_weight")]
    pub species: f64,
    #[serde(default = "default_intent_weight")]
    pub intent: f64,
    #[serde(default = "default_size_weight")]
    pub size: f64,
    #[serde(default = "default_age_weight")]
    pub age: f64,
    #[serde(default = "default_personality_weight")]
    pub personality: f64,
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            species: default_species_weight(),
            intent: default_intent_weight(),
            size: default_size_weight(),
            age: default_age_weight(),
            personality: default_personality_weight(),
        }
    }
}

fn default_species_weight() -> f64 { 30.0 }
fn default_intent_weight() -> f64 { 25.0 }
fn default_size_weight() -> f64 { 15.0 }
fn default_age_weight() -> f64 { 15.0 }
fn default_personality_weight() -> f64 { 15.0 }

impl From<&WeightsConfig> for ScoringWeights {
    fn from(config: &WeightsConfig) -> Self {
        Self {
            species: config.species,
            intent: config.intent,
            size: config.size,
            age: config.age,
            personality: config.personality,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with PAWFECT__)
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., PAWFECT__SERVER__PORT -> server.port
            .add_source(environment())
            .build()?;

        substitute_env_vars(settings)?.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(environment())
            .build()?;

        settings.try_deserialize()
    }

    /// Build the matcher described by the scoring and matching sections
    pub fn matcher(&self) -> Matcher {
        Matcher::new(ScoringWeights::from(&self.scoring.weights))
            .with_reason_threshold(self.scoring.reason_threshold)
            .with_parallel_threshold(
                self.matching
                    .parallel_threshold
                    .unwrap_or(DEFAULT_PARALLEL_THRESHOLD),
            )
    }
}

fn environment() -> Environment {
    Environment::with_prefix("PAWFECT")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

/// Let the conventional `DATABASE_URL` variable override `database.url`
fn substitute_env_vars(settings: Config) -> Result<Config, ConfigError> {
    let mut builder = Config::builder().add_source(settings);

    if let Ok(database_url) = std::env::var("DATABASE_URL") {
        builder = builder.set_override("database.url", database_url)?;
    }

    builder.build()
}
