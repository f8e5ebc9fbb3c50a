//! Lookup service endpoints and request defaults shared across the pipeline.

// External lookup services
pub const COUNTRY_API_BASE: &str = "https://restcountries.com/v3.1";
pub const GEOCODING_API_BASE: &str = "http://api.openweathermap.org/geo/1.0";
pub const ONE_CALL_API_BASE: &str = "https://api.openweathermap.org/data/3.0";

/// Per-call HTTP timeout. A hung lookup call must not stall the whole run.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

// Configuration defaults, comma-split at load time
pub const DEFAULT_FIELDS: &str = "name,lat,lon,country,state";
pub const DEFAULT_WEATHER_FIELDS_EXCLUDE: &str = "minutely,hourly,daily,alerts";
pub const DEFAULT_DATABASE_PATH: &str = "weather.db";
