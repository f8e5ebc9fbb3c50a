use std::env;

use crate::common::constants::{
    DEFAULT_DATABASE_PATH, DEFAULT_FIELDS, DEFAULT_WEATHER_FIELDS_EXCLUDE,
};
use crate::common::error::{PipelineError, Result};

/// A configuration value that is comma-split into a list when a comma is
/// present and otherwise kept as the raw single value. The single-vs-list
/// distinction is part of the configuration contract and is preserved
/// rather than eagerly normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValue {
    Single(String),
    Many(Vec<String>),
}

impl ConfigValue {
    pub fn parse(raw: &str) -> Self {
        if raw.contains(',') {
            ConfigValue::Many(raw.split(',').map(|s| s.trim().to_string()).collect())
        } else {
            ConfigValue::Single(raw.to_string())
        }
    }

    /// Flatten into a list for stages that iterate regardless of shape.
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            ConfigValue::Single(value) => vec![value.clone()],
            ConfigValue::Many(values) => values.clone(),
        }
    }
}

/// How the dedup loader assigns record identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DedupPolicy {
    /// 1-based position within the loaded batch. Batch-relative, not a
    /// stable natural key; preserved from the observed reference behavior.
    #[default]
    BatchPosition,
    /// Hash of city+country+date_time, for deployments that want stable
    /// identities across reordered or resized batches.
    NaturalKey,
}

/// All configuration the pipeline needs, collected once at startup and
/// passed into components at construction.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_key: String,
    pub city_names: ConfigValue,
    pub country_names: ConfigValue,
    pub fields: ConfigValue,
    pub weather_fields_exclude: ConfigValue,
    pub database_path: String,
    pub dedup_policy: DedupPolicy,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let api_key = env::var("API_KEY")
            .map_err(|_| PipelineError::Config("API_KEY must be set".to_string()))?;
        let city_names = ConfigValue::parse(
            &env::var("CITY_NAMES")
                .map_err(|_| PipelineError::Config("CITY_NAMES must be set".to_string()))?,
        );
        let country_names = ConfigValue::parse(
            &env::var("COUNTRY_NAMES")
                .map_err(|_| PipelineError::Config("COUNTRY_NAMES must be set".to_string()))?,
        );
        let fields = ConfigValue::parse(
            &env::var("FIELDS").unwrap_or_else(|_| DEFAULT_FIELDS.to_string()),
        );
        let weather_fields_exclude = ConfigValue::parse(
            &env::var("WEATHER_FIELDS_EXCLUDE")
                .unwrap_or_else(|_| DEFAULT_WEATHER_FIELDS_EXCLUDE.to_string()),
        );
        let database_path =
            env::var("DATABASE_PATH").unwrap_or_else(|_| DEFAULT_DATABASE_PATH.to_string());
        let dedup_policy = match env::var("DEDUP_POLICY").ok().as_deref() {
            None | Some("batch-position") => DedupPolicy::BatchPosition,
            Some("natural-key") => DedupPolicy::NaturalKey,
            Some(other) => {
                return Err(PipelineError::Config(format!(
                    "Unknown DEDUP_POLICY '{other}'. Supported: batch-position, natural-key."
                )))
            }
        };

        Ok(Self {
            api_key,
            city_names,
            country_names,
            fields,
            weather_fields_exclude,
            database_path,
            dedup_policy,
        })
    }
}
