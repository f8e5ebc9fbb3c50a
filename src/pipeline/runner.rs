use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use serde::Serialize;
use tracing::{error, info, instrument};

use crate::apis::geocoding::GeocodingClient;
use crate::apis::one_call::OneCallClient;
use crate::apis::rest_countries::RestCountriesClient;
use crate::apis::{CityLookup, CountryLookup, WeatherLookup};
use crate::common::error::Result;
use crate::common::types::{CountryInput, StageReport};
use crate::config::{AppConfig, ConfigValue};
use crate::pipeline::fetch::WeatherFetcher;
use crate::pipeline::geo::GeoResolver;
use crate::pipeline::loader::DedupLoader;
use crate::pipeline::locate::{split_located_records, CityLocator};
use crate::pipeline::normalize::normalize_batch;
use crate::pipeline::storage::sqlite::SqliteStore;
use crate::pipeline::storage::WeatherStore;

/// Summary of one successful pipeline run.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub country_codes: Vec<String>,
    pub cities_located: usize,
    pub records_fetched: usize,
    pub records_loaded: usize,
    pub message: String,
}

/// What the scheduler sees: a summary, or the stage that halted the run
/// with its tagged report. Failure is a value, never an unwind.
#[derive(Debug)]
pub enum RunOutcome {
    Success(RunSummary),
    Failed {
        stage: &'static str,
        report: StageReport,
    },
}

/// Where the load stage gets its store. A database path is opened inside
/// the load stage and dropped with it, so no connection is held across the
/// earlier stages; a shared handle is for callers that manage the store
/// themselves.
enum LoadStore {
    Path(String),
    Shared(Arc<dyn WeatherStore>),
}

/// Sequences the five stages, threading each stage's full batch output into
/// the next. No stage is retried; a failure halts forward progress for the
/// run.
pub struct WeatherPipeline {
    country_lookup: Box<dyn CountryLookup>,
    city_lookup: Box<dyn CityLookup>,
    weather_lookup: Box<dyn WeatherLookup>,
    store: LoadStore,
    config: AppConfig,
}

impl WeatherPipeline {
    /// Wire the real lookup services from configuration. The SQLite store is
    /// opened per load call, not here.
    pub fn from_config(config: AppConfig) -> Result<Self> {
        Ok(Self::with_lookups(
            Box::new(RestCountriesClient::new()?),
            Box::new(GeocodingClient::new(config.api_key.clone())?),
            Box::new(OneCallClient::new(config.api_key.clone())?),
            config,
        ))
    }

    pub fn with_lookups(
        country_lookup: Box<dyn CountryLookup>,
        city_lookup: Box<dyn CityLookup>,
        weather_lookup: Box<dyn WeatherLookup>,
        config: AppConfig,
    ) -> Self {
        Self {
            country_lookup,
            city_lookup,
            weather_lookup,
            store: LoadStore::Path(config.database_path.clone()),
            config,
        }
    }

    pub fn with_components(
        country_lookup: Box<dyn CountryLookup>,
        city_lookup: Box<dyn CityLookup>,
        weather_lookup: Box<dyn WeatherLookup>,
        store: Arc<dyn WeatherStore>,
        config: AppConfig,
    ) -> Self {
        Self {
            country_lookup,
            city_lookup,
            weather_lookup,
            store: LoadStore::Shared(store),
            config,
        }
    }

    #[instrument(skip(self))]
    pub async fn run(&self) -> RunOutcome {
        counter!("weather_pipeline_runs_total").increment(1);
        let t_run = Instant::now();

        // Stage 1: country names -> country codes
        let countries = match &self.config.country_names {
            ConfigValue::Single(name) => CountryInput::Single(name.clone()),
            ConfigValue::Many(names) => CountryInput::Many(names.clone()),
        };
        let resolver = GeoResolver::new(self.country_lookup.as_ref());
        let codes = match resolver.resolve(&countries).await {
            Ok(codes) => codes,
            Err(e) => {
                return self.fail("geo_resolver", "Unable to resolve country codes", &e.to_string())
            }
        };
        if codes.is_empty() {
            return self.fail(
                "geo_resolver",
                "No country codes could be resolved",
                "empty resolution batch",
            );
        }
        info!("Resolved {} country codes", codes.len());

        // Stage 2: (code, city) pairs -> coordinates + identities
        let locator = CityLocator::new(self.city_lookup.as_ref());
        let fields = self.config.fields.to_vec();
        let located = match locator
            .locate_all(&codes, &self.config.city_names.to_vec(), &fields)
            .await
        {
            Ok(located) => located,
            Err(e) => {
                return self.fail(
                    "city_locator",
                    "Unable to get city coordinates from the API",
                    &e.to_string(),
                )
            }
        };
        let batch = match split_located_records(&located, &fields) {
            Ok(batch) => batch,
            Err(e) => {
                return self.fail(
                    "city_locator",
                    "Invalid keys in the weather records",
                    &e.to_string(),
                )
            }
        };
        info!("Located {} cities", batch.coordinates.len());

        // Stage 3: coordinates -> raw weather payloads (all-or-nothing)
        let fetcher = WeatherFetcher::new(self.weather_lookup.as_ref());
        let exclude = self.config.weather_fields_exclude.to_vec();
        let payloads = match fetcher
            .fetch_all(&batch.coordinates, &batch.identities, &exclude)
            .await
        {
            Ok(payloads) => payloads,
            Err(e) => {
                let message = format!(
                    "Unable to get weather information from the API (batch aborted after {} records)",
                    e.partial_count
                );
                return self.fail("weather_fetcher", &message, &e.reason.to_string());
            }
        };
        info!("Fetched {} raw weather payloads", payloads.len());

        // Stage 4: raw payloads -> flat records
        let records = match normalize_batch(&payloads) {
            Ok(records) => records,
            Err(e) => {
                return self.fail(
                    "normalizer",
                    "Weather payload is missing required fields",
                    &e.to_string(),
                )
            }
        };

        // Stage 5: deduplicated load. The store handle lives only within
        // this block and is released on every exit path.
        let load = match &self.store {
            LoadStore::Path(path) => {
                let store = match SqliteStore::open(path) {
                    Ok(store) => store,
                    Err(e) => {
                        return self.fail(
                            "loader",
                            "Unable to open the weather database",
                            &e.to_string(),
                        )
                    }
                };
                DedupLoader::new(&store, self.config.dedup_policy)
                    .load(&records)
                    .await
            }
            LoadStore::Shared(store) => DedupLoader::new(store.as_ref(), self.config.dedup_policy)
                .load(&records)
                .await,
        };
        let load = match load {
            Ok(load) => load,
            Err(e) => {
                return self.fail(
                    "loader",
                    "Unable to load weather records to the database",
                    &e.to_string(),
                )
            }
        };

        let duration = t_run.elapsed().as_secs_f64();
        histogram!("weather_pipeline_duration_seconds").record(duration);
        counter!("weather_records_loaded_total").increment(load.inserted as u64);
        info!("Pipeline run finished in {:.2}s", duration);

        RunOutcome::Success(RunSummary {
            country_codes: codes,
            cities_located: batch.identities.len(),
            records_fetched: load.records.len(),
            records_loaded: load.inserted,
            message: load.message,
        })
    }

    fn fail(&self, stage: &'static str, message: &str, raw_error: &str) -> RunOutcome {
        error!(
            status = "error",
            stage = stage,
            message = message,
            error = raw_error,
            "pipeline stage failed"
        );
        counter!("weather_pipeline_failures_total").increment(1);
        RunOutcome::Failed {
            stage,
            report: StageReport::error(message, raw_error),
        }
    }
}
