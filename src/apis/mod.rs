use serde_json::{Map, Value};

use crate::common::error::Result;
use crate::common::types::Coordinate;

pub mod geocoding;
pub mod one_call;
pub mod rest_countries;

/// Country name to ISO alpha-2 code lookup.
#[async_trait::async_trait]
pub trait CountryLookup: Send + Sync {
    async fn country_code(&self, country: &str) -> Result<String>;
}

/// (city, country code) to top geocoding match, restricted to the requested
/// field set. An empty map means the service had no match for the pair.
#[async_trait::async_trait]
pub trait CityLookup: Send + Sync {
    async fn locate(
        &self,
        city: &str,
        country_code: &str,
        fields: &[String],
    ) -> Result<Map<String, Value>>;
}

/// Coordinate to raw current-weather payload.
#[async_trait::async_trait]
pub trait WeatherLookup: Send + Sync {
    async fn current_weather(
        &self,
        coordinate: &Coordinate,
        exclude: &[String],
    ) -> Result<Map<String, Value>>;
}
