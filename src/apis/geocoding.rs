use std::time::Duration;

use reqwest::Client;
use serde_json::{Map, Value};
use tracing::debug;

use super::CityLookup;
use crate::common::constants::{GEOCODING_API_BASE, REQUEST_TIMEOUT_SECS};
use crate::common::error::Result;

/// Client for the geocoding service
/// (`GET /direct?q={city},{countryCode}&limit=1&appid={key}`).
pub struct GeocodingClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl GeocodingClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_base_url(GEOCODING_API_BASE, api_key)
    }

    pub fn with_base_url(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait::async_trait]
impl CityLookup for GeocodingClient {
    async fn locate(
        &self,
        city: &str,
        country_code: &str,
        fields: &[String],
    ) -> Result<Map<String, Value>> {
        let url = format!("{}/direct", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", format!("{city},{country_code}")),
                ("limit", "1".to_string()),
                ("appid", self.api_key.clone()),
            ])
            .send()
            .await?;
        let data: Vec<Value> = response.json().await?;

        // No match is not an error: the caller gets an empty mapping.
        // Fields absent from the top match default to null.
        let mut located = Map::new();
        if let Some(first) = data.first() {
            for field in fields {
                located.insert(
                    field.clone(),
                    first.get(field).cloned().unwrap_or(Value::Null),
                );
            }
        }

        debug!(
            "Geocoding lookup for {},{} returned {} fields",
            city,
            country_code,
            located.len()
        );
        Ok(located)
    }
}
