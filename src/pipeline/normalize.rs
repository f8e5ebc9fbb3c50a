use chrono::{Local, TimeZone};
use serde_json::{Map, Value};
use tracing::error;

use crate::common::error::{PipelineError, Result};
use crate::common::types::{RawWeatherPayload, WeatherRecord};

/// Reshape one raw weather payload into a flat record. Pure and total over
/// well-formed payloads; any missing key is a hard failure for the record,
/// unlike the geocoding stage which defaults absent fields.
pub fn normalize(payload: &RawWeatherPayload) -> Result<WeatherRecord> {
    let body = &payload.body;
    let current = body
        .get("current")
        .and_then(Value::as_object)
        .ok_or_else(|| PipelineError::MissingField("current".to_string()))?;

    let condition = current
        .get("weather")
        .and_then(Value::as_array)
        .ok_or_else(|| PipelineError::MissingField("current.weather".to_string()))?
        .first()
        .ok_or_else(|| PipelineError::MissingField("current.weather[0]".to_string()))?;

    Ok(WeatherRecord {
        city: payload.identity.city.clone(),
        country: payload.identity.country.clone(),
        state: payload.identity.state.clone(),
        latitude: require_f64(body, "lat")?,
        longitude: require_f64(body, "lon")?,
        timezone: require_str(body, "timezone")?,
        timezone_offset: require_i64(body, "timezone_offset")?,
        date_time: format_local_datetime(require_i64(current, "dt")?)?,
        sunrise: require_i64(current, "sunrise")?,
        sunset: require_i64(current, "sunset")?,
        temperature: require_f64(current, "temp")?,
        feels_like: require_f64(current, "feels_like")?,
        pressure: require_i64(current, "pressure")?,
        humidity: require_i64(current, "humidity")?,
        dew_point: require_f64(current, "dew_point")?,
        ultraviolet_index: require_f64(current, "uvi")?,
        clouds: require_i64(current, "clouds")?,
        visibility: require_i64(current, "visibility")?,
        wind_speed: require_f64(current, "wind_speed")?,
        wind_deg: require_i64(current, "wind_deg")?,
        weather: condition
            .get("main")
            .and_then(Value::as_str)
            .ok_or_else(|| PipelineError::MissingField("current.weather[0].main".to_string()))?
            .to_string(),
        description: condition
            .get("description")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                PipelineError::MissingField("current.weather[0].description".to_string())
            })?
            .to_string(),
    })
}

/// Normalize a whole batch, in order. The first malformed record is logged
/// and fails the stage.
pub fn normalize_batch(payloads: &[RawWeatherPayload]) -> Result<Vec<WeatherRecord>> {
    let mut records = Vec::with_capacity(payloads.len());
    for payload in payloads {
        match normalize(payload) {
            Ok(record) => records.push(record),
            Err(e) => {
                error!(
                    status = "error",
                    city = payload.identity.city.as_str(),
                    message = "Weather payload is missing required fields",
                    error = %e,
                    "normalization failed"
                );
                return Err(e);
            }
        }
    }
    Ok(records)
}

/// Format Unix epoch seconds as local wall-clock `YYYY-MM-DD HH:MM:SS`.
pub fn format_local_datetime(ts: i64) -> Result<String> {
    format_datetime(ts, &Local)
}

/// Zone-generic conversion core; tests pin a fixed zone for determinism.
pub fn format_datetime<Tz: TimeZone>(ts: i64, tz: &Tz) -> Result<String>
where
    Tz::Offset: std::fmt::Display,
{
    let dt = tz
        .timestamp_opt(ts, 0)
        .single()
        .ok_or_else(|| PipelineError::InvalidInput(format!("Invalid Unix timestamp {ts}")))?;
    Ok(dt.format("%Y-%m-%d %H:%M:%S").to_string())
}

fn require_f64(map: &Map<String, Value>, key: &str) -> Result<f64> {
    map.get(key)
        .and_then(Value::as_f64)
        .ok_or_else(|| PipelineError::MissingField(key.to_string()))
}

fn require_i64(map: &Map<String, Value>, key: &str) -> Result<i64> {
    map.get(key)
        .and_then(Value::as_i64)
        .ok_or_else(|| PipelineError::MissingField(key.to_string()))
}

fn require_str(map: &Map<String, Value>, key: &str) -> Result<String> {
    map.get(key)
        .and_then(Value::as_str)
        .map(|s| s.to_string())
        .ok_or_else(|| PipelineError::MissingField(key.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::CityIdentity;
    use chrono::Utc;
    use serde_json::json;

    pub(crate) fn lagos_payload() -> RawWeatherPayload {
        let body = json!({
            "lat": 6.45,
            "lon": 3.39,
            "timezone": "Africa/Lagos",
            "timezone_offset": 3600,
            "current": {
                "dt": 1700000000,
                "sunrise": 1699940400,
                "sunset": 1699983000,
                "temp": 303.15,
                "feels_like": 306.2,
                "pressure": 1011,
                "humidity": 70,
                "dew_point": 297.1,
                "uvi": 8.5,
                "clouds": 40,
                "visibility": 10000,
                "wind_speed": 3.6,
                "wind_deg": 210,
                "weather": [
                    { "main": "Clouds", "description": "scattered clouds" }
                ]
            }
        });
        let Value::Object(body) = body else {
            unreachable!()
        };
        RawWeatherPayload {
            body,
            identity: CityIdentity {
                city: "Lagos".to_string(),
                country: "Nigeria".to_string(),
                state: String::new(),
            },
        }
    }

    #[test]
    fn normalizes_full_payload() {
        let record = normalize(&lagos_payload()).unwrap();

        assert_eq!(record.city, "Lagos");
        assert_eq!(record.country, "Nigeria");
        assert_eq!(record.state, "");
        assert_eq!(record.latitude, 6.45);
        assert_eq!(record.longitude, 3.39);
        assert_eq!(record.timezone, "Africa/Lagos");
        assert_eq!(record.timezone_offset, 3600);
        assert_eq!(record.temperature, 303.15);
        assert_eq!(record.pressure, 1011);
        assert_eq!(record.ultraviolet_index, 8.5);
        assert_eq!(record.weather, "Clouds");
        assert_eq!(record.description, "scattered clouds");
    }

    #[test]
    fn missing_current_section_is_a_hard_failure() {
        let mut payload = lagos_payload();
        payload.body.remove("current");

        let err = normalize(&payload).unwrap_err();
        assert!(matches!(err, PipelineError::MissingField(ref f) if f == "current"));
    }

    #[test]
    fn missing_nested_key_names_the_field() {
        let mut payload = lagos_payload();
        payload
            .body
            .get_mut("current")
            .and_then(Value::as_object_mut)
            .unwrap()
            .remove("dew_point");

        let err = normalize(&payload).unwrap_err();
        assert!(matches!(err, PipelineError::MissingField(ref f) if f == "dew_point"));
    }

    #[test]
    fn empty_weather_condition_list_fails() {
        let mut payload = lagos_payload();
        payload
            .body
            .get_mut("current")
            .and_then(Value::as_object_mut)
            .unwrap()
            .insert("weather".to_string(), json!([]));

        let err = normalize(&payload).unwrap_err();
        assert!(err.to_string().contains("current.weather[0]"));
    }

    #[test]
    fn unix_timestamp_formats_deterministically_in_utc() {
        assert_eq!(
            format_datetime(1_700_000_000, &Utc).unwrap(),
            "2023-11-14 22:13:20"
        );
    }

    #[test]
    fn batch_normalization_preserves_order() {
        let mut second = lagos_payload();
        second.identity.city = "Ibadan".to_string();

        let records = normalize_batch(&[lagos_payload(), second]).unwrap();
        assert_eq!(records[0].city, "Lagos");
        assert_eq!(records[1].city, "Ibadan");
    }
}
