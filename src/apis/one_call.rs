use std::time::Duration;

use reqwest::Client;
use serde_json::{Map, Value};
use tracing::debug;

use super::WeatherLookup;
use crate::common::constants::{ONE_CALL_API_BASE, REQUEST_TIMEOUT_SECS};
use crate::common::error::Result;

/// Client for the current-weather service
/// (`GET /onecall?lat={lat}&lon={lon}&exclude={list}&appid={key}`).
pub struct OneCallClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl OneCallClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_base_url(ONE_CALL_API_BASE, api_key)
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
impl WeatherLookup for OneCallClient {
    async fn current_weather(
        &self,
        coordinate: &crate::common::types::Coordinate,
        exclude: &[String],
    ) -> Result<Map<String, Value>> {
        let url = format!("{}/onecall", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("lat", coordinate.latitude.to_string()),
                ("lon", coordinate.longitude.to_string()),
                ("exclude", exclude.join(",")),
                ("appid", self.api_key.clone()),
            ])
            .send()
            .await?;

        // The caller keeps every top-level key of the payload.
        let body: Map<String, Value> = response.json().await?;
        debug!(
            "One-call lookup for ({}, {}) returned {} top-level keys",
            coordinate.longitude,
            coordinate.latitude,
            body.len()
        );
        Ok(body)
    }
}
