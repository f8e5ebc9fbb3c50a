use std::fmt;

use tracing::{error, info};

use crate::apis::WeatherLookup;
use crate::common::error::PipelineError;
use crate::common::types::{CityIdentity, Coordinate, RawWeatherPayload};

/// Batch fetch failure: the first bad call aborts the whole batch, and the
/// caller discards any successes accumulated before it. `partial_count`
/// records how far the batch progressed.
#[derive(Debug)]
pub struct FetchBatchError {
    pub reason: PipelineError,
    pub partial_count: usize,
}

impl fmt::Display for FetchBatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "weather batch aborted after {} records: {}",
            self.partial_count, self.reason
        )
    }
}

impl std::error::Error for FetchBatchError {}

/// Retrieves current-weather payloads for a batch of coordinates and stamps
/// each with the identity captured at geocoding time.
pub struct WeatherFetcher<'a> {
    lookup: &'a dyn WeatherLookup,
}

impl<'a> WeatherFetcher<'a> {
    pub fn new(lookup: &'a dyn WeatherLookup) -> Self {
        Self { lookup }
    }

    /// Fetch one payload per coordinate, in order. Identity pairing is
    /// positional: the counter advances only on successful calls, so a
    /// mid-batch failure aborts the entire batch rather than skipping.
    pub async fn fetch_all(
        &self,
        coordinates: &[Coordinate],
        identities: &[CityIdentity],
        exclude: &[String],
    ) -> Result<Vec<RawWeatherPayload>, FetchBatchError> {
        if coordinates.len() != identities.len() {
            return Err(FetchBatchError {
                reason: PipelineError::InvalidInput(format!(
                    "Coordinate and identity lists are misaligned: {} vs {}",
                    coordinates.len(),
                    identities.len()
                )),
                partial_count: 0,
            });
        }

        let mut payloads = Vec::with_capacity(coordinates.len());
        let mut record_counter = 0usize;

        for coordinate in coordinates {
            let body = match self.lookup.current_weather(coordinate, exclude).await {
                Ok(body) => body,
                Err(e) => {
                    error!(
                        status = "error",
                        message = format!(
                            "Unable to get weather information for ({}, {}) from the API",
                            coordinate.longitude, coordinate.latitude
                        )
                        .as_str(),
                        error = %e,
                        "weather batch aborted"
                    );
                    return Err(FetchBatchError {
                        reason: e,
                        partial_count: record_counter,
                    });
                }
            };

            let identity = identities[record_counter].clone();
            record_counter += 1;
            payloads.push(RawWeatherPayload { body, identity });
        }

        info!(
            status = "success",
            message = format!(
                "Current weather information for {} coordinates has been retrieved from the API",
                payloads.len()
            )
            .as_str(),
            "weather batch fetched"
        );
        Ok(payloads)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::error::Result;
    use serde_json::{json, Map, Value};

    struct FakeWeatherLookup {
        fail_at_latitude: Option<f64>,
    }

    #[async_trait::async_trait]
    impl WeatherLookup for FakeWeatherLookup {
        async fn current_weather(
            &self,
            coordinate: &Coordinate,
            _exclude: &[String],
        ) -> Result<Map<String, Value>> {
            if Some(coordinate.latitude) == self.fail_at_latitude {
                return Err(PipelineError::Api {
                    message: "service unavailable".to_string(),
                });
            }
            let mut body = Map::new();
            body.insert("lat".to_string(), json!(coordinate.latitude));
            body.insert("lon".to_string(), json!(coordinate.longitude));
            body.insert("timezone".to_string(), json!("Africa/Lagos"));
            Ok(body)
        }
    }

    fn batch() -> (Vec<Coordinate>, Vec<CityIdentity>) {
        let coordinates = vec![
            Coordinate {
                longitude: 3.39,
                latitude: 6.45,
            },
            Coordinate {
                longitude: 3.9,
                latitude: 7.38,
            },
        ];
        let identities = vec![
            CityIdentity {
                city: "Lagos".to_string(),
                country: "Nigeria".to_string(),
                state: String::new(),
            },
            CityIdentity {
                city: "Ibadan".to_string(),
                country: "Nigeria".to_string(),
                state: "Oyo".to_string(),
            },
        ];
        (coordinates, identities)
    }

    #[tokio::test]
    async fn stamps_identities_positionally() {
        let lookup = FakeWeatherLookup {
            fail_at_latitude: None,
        };
        let fetcher = WeatherFetcher::new(&lookup);
        let (coordinates, identities) = batch();

        let payloads = fetcher
            .fetch_all(&coordinates, &identities, &[])
            .await
            .unwrap();

        assert_eq!(payloads.len(), 2);
        assert_eq!(payloads[0].identity.city, "Lagos");
        assert_eq!(payloads[1].identity.city, "Ibadan");
        assert_eq!(payloads[1].body.get("lat"), Some(&json!(7.38)));
    }

    #[tokio::test]
    async fn first_failure_aborts_whole_batch() {
        let lookup = FakeWeatherLookup {
            fail_at_latitude: Some(7.38),
        };
        let fetcher = WeatherFetcher::new(&lookup);
        let (coordinates, identities) = batch();

        let err = fetcher
            .fetch_all(&coordinates, &identities, &[])
            .await
            .unwrap_err();

        assert_eq!(err.partial_count, 1);
        assert!(err.reason.to_string().contains("service unavailable"));
    }

    #[tokio::test]
    async fn misaligned_lists_are_rejected() {
        let lookup = FakeWeatherLookup {
            fail_at_latitude: None,
        };
        let fetcher = WeatherFetcher::new(&lookup);
        let (coordinates, mut identities) = batch();
        identities.pop();

        let err = fetcher
            .fetch_all(&coordinates, &identities, &[])
            .await
            .unwrap_err();
        assert_eq!(err.partial_count, 0);
        assert!(err.reason.to_string().contains("misaligned"));
    }
}
