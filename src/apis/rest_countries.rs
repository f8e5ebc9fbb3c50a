use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use super::CountryLookup;
use crate::common::constants::{COUNTRY_API_BASE, REQUEST_TIMEOUT_SECS};
use crate::common::error::{PipelineError, Result};

/// Client for the country lookup service (`GET /name/{countryName}`).
pub struct RestCountriesClient {
    client: Client,
    base_url: String,
}

impl RestCountriesClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(COUNTRY_API_BASE)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait::async_trait]
impl CountryLookup for RestCountriesClient {
    async fn country_code(&self, country: &str) -> Result<String> {
        let url = format!("{}/name/{}", self.base_url, country);
        let response = self.client.get(&url).send().await?;
        let data: Vec<Value> = response.json().await?;

        let first = data.first().ok_or_else(|| PipelineError::Api {
            message: format!("Country service returned no results for {country}"),
        })?;
        let code = first
            .get("cca2")
            .and_then(Value::as_str)
            .ok_or_else(|| PipelineError::MissingField("cca2".to_string()))?;

        debug!("Resolved country {} to code {}", country, code);
        Ok(code.to_string())
    }
}
