use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Country names as configured: a single free-text name or a comma-split
/// list. Resolved once at the pipeline boundary so the stages never branch
/// on input shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CountryInput {
    Single(String),
    Many(Vec<String>),
}

impl CountryInput {
    /// The country names in configured order.
    pub fn names(&self) -> Vec<String> {
        match self {
            CountryInput::Single(name) => vec![name.clone()],
            CountryInput::Many(names) => names.clone(),
        }
    }
}

/// Descriptive identity of a city, captured from the geocoding response
/// before the weather call loses the original request context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CityIdentity {
    pub city: String,
    pub country: String,
    pub state: String,
}

/// Geographic position derived from a geocoding match, rounded to two
/// decimal places.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub longitude: f64,
    pub latitude: f64,
}

/// The unmodified weather-service response for one coordinate, plus the
/// re-attached identity of the city it was requested for. Pairing between
/// payloads and identities is positional.
#[derive(Debug, Clone)]
pub struct RawWeatherPayload {
    pub body: Map<String, Value>,
    pub identity: CityIdentity,
}

/// Flat, typed weather observation produced by the normalizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub city: String,
    pub country: String,
    pub state: String,
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: String,
    pub timezone_offset: i64,
    pub date_time: String,
    pub sunrise: i64,
    pub sunset: i64,
    pub temperature: f64,
    pub feels_like: f64,
    pub pressure: i64,
    pub humidity: i64,
    pub dew_point: f64,
    pub ultraviolet_index: f64,
    pub clouds: i64,
    pub visibility: i64,
    pub wind_speed: f64,
    pub wind_deg: i64,
    pub weather: String,
    pub description: String,
}

/// A weather row as stored: record fields plus the storage identity and
/// audit timestamps. Rows are created once and never updated by the
/// pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedWeather {
    pub id: i64,
    #[serde(flatten)]
    pub record: WeatherRecord,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Success,
    Error,
}

/// Uniform tagged result reported by every stage: written to the error log
/// sink and handed back to the scheduler instead of unwinding the process.
#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub status: StageStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StageReport {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: StageStatus::Success,
            message: message.into(),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            status: StageStatus::Error,
            message: message.into(),
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn country_input_single_yields_one_name() {
        let input = CountryInput::Single("nigeria".to_string());
        assert_eq!(input.names(), vec!["nigeria".to_string()]);
    }

    #[test]
    fn country_input_many_preserves_order() {
        let input = CountryInput::Many(vec!["nigeria".to_string(), "ghana".to_string()]);
        assert_eq!(
            input.names(),
            vec!["nigeria".to_string(), "ghana".to_string()]
        );
    }

    #[test]
    fn stage_report_error_carries_raw_error_text() {
        let report = StageReport::error("Unable to reach the API", "connection refused");
        assert_eq!(report.status, StageStatus::Error);
        assert_eq!(report.error.as_deref(), Some("connection refused"));
    }
}
