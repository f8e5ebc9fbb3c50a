use serde_json::{Map, Value};
use tracing::info;

use crate::apis::CityLookup;
use crate::common::capitalize;
use crate::common::error::{PipelineError, Result};
use crate::common::types::{CityIdentity, Coordinate};

/// Coordinates and identities split from the located records. Index `i` in
/// one list corresponds to index `i` in the other; downstream stages rely
/// on this pairing and must not reorder either list independently.
#[derive(Debug, Clone)]
pub struct LocatedBatch {
    pub coordinates: Vec<Coordinate>,
    pub identities: Vec<CityIdentity>,
}

/// Queries the geocoding service for every (country code, city) pair.
pub struct CityLocator<'a> {
    lookup: &'a dyn CityLookup,
}

impl<'a> CityLocator<'a> {
    pub fn new(lookup: &'a dyn CityLookup) -> Self {
        Self { lookup }
    }

    /// Locate every city under every resolved country code, keeping only
    /// non-empty matches. A service error aborts the stage; an empty match
    /// is silently dropped.
    pub async fn locate_all(
        &self,
        country_codes: &[String],
        city_names: &[String],
        fields: &[String],
    ) -> Result<Vec<Map<String, Value>>> {
        let city_names: Vec<String> = city_names.iter().map(|c| capitalize(c)).collect();

        let mut located = Vec::new();
        for code in country_codes {
            for city in &city_names {
                let entry = self.lookup.locate(city, code, fields).await?;
                if entry.is_empty() {
                    continue;
                }
                info!(
                    status = "success",
                    message = format!("Weather information for {city} retrieved successfully")
                        .as_str(),
                    "city located"
                );
                located.push(entry);
            }
        }
        Ok(located)
    }
}

/// Validate each located record against the requested field set, then split
/// the batch into positional coordinate and identity lists. Coordinates are
/// rounded to two decimal places here and nowhere else.
pub fn split_located_records(
    records: &[Map<String, Value>],
    fields: &[String],
) -> Result<LocatedBatch> {
    for record in records {
        let keys: Vec<&String> = record.keys().collect();
        if keys.len() != fields.len() || !fields.iter().all(|f| record.contains_key(f)) {
            return Err(PipelineError::InvalidInput(format!(
                "Invalid keys in the weather records. Expected keys are {fields:?}, got {keys:?}"
            )));
        }
    }

    let mut coordinates = Vec::with_capacity(records.len());
    let mut identities = Vec::with_capacity(records.len());
    for record in records {
        let longitude = record
            .get("lon")
            .and_then(Value::as_f64)
            .ok_or_else(|| PipelineError::MissingField("lon".to_string()))?;
        let latitude = record
            .get("lat")
            .and_then(Value::as_f64)
            .ok_or_else(|| PipelineError::MissingField("lat".to_string()))?;
        coordinates.push(Coordinate {
            longitude: round2(longitude),
            latitude: round2(latitude),
        });
        identities.push(CityIdentity {
            city: string_field(record, "name"),
            country: string_field(record, "country"),
            state: string_field(record, "state"),
        });
    }

    Ok(LocatedBatch {
        coordinates,
        identities,
    })
}

fn string_field(record: &Map<String, Value>, key: &str) -> String {
    record
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn requested_fields() -> Vec<String> {
        ["name", "lat", "lon", "country", "state"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn lagos_record() -> Map<String, Value> {
        let mut record = Map::new();
        record.insert("name".to_string(), json!("Lagos"));
        record.insert("lat".to_string(), json!(6.4550575));
        record.insert("lon".to_string(), json!(3.3941795));
        record.insert("country".to_string(), json!("Nigeria"));
        record.insert("state".to_string(), Value::Null);
        record
    }

    #[test]
    fn splits_into_paired_lists_with_rounding() {
        let batch = split_located_records(&[lagos_record()], &requested_fields()).unwrap();

        assert_eq!(batch.coordinates.len(), 1);
        assert_eq!(batch.identities.len(), 1);
        assert_eq!(batch.coordinates[0].longitude, 3.39);
        assert_eq!(batch.coordinates[0].latitude, 6.46);
        assert_eq!(
            batch.identities[0],
            CityIdentity {
                city: "Lagos".to_string(),
                country: "Nigeria".to_string(),
                state: String::new(),
            }
        );
    }

    #[test]
    fn rejects_unexpected_key_set() {
        let mut record = lagos_record();
        record.remove("state");
        record.insert("population".to_string(), json!(15_000_000));

        let err = split_located_records(&[record], &requested_fields()).unwrap_err();
        assert!(err.to_string().contains("Invalid keys"));
    }

    #[test]
    fn null_identity_fields_become_empty_strings() {
        let mut record = lagos_record();
        record.insert("state".to_string(), Value::Null);
        record.insert("country".to_string(), Value::Null);

        let batch = split_located_records(&[record], &requested_fields()).unwrap();
        assert_eq!(batch.identities[0].state, "");
        assert_eq!(batch.identities[0].country, "");
    }

    struct FakeCityLookup;

    #[async_trait::async_trait]
    impl CityLookup for FakeCityLookup {
        async fn locate(
            &self,
            city: &str,
            _country_code: &str,
            fields: &[String],
        ) -> crate::common::error::Result<Map<String, Value>> {
            // "Nowhere" has no geocoding match: empty mapping, not an error.
            if city == "Nowhere" {
                return Ok(Map::new());
            }
            let mut record = Map::new();
            for field in fields {
                let value = match field.as_str() {
                    "name" => json!(city),
                    "lat" => json!(6.4550575),
                    "lon" => json!(3.3941795),
                    "country" => json!("Nigeria"),
                    _ => Value::Null,
                };
                record.insert(field.clone(), value);
            }
            Ok(record)
        }
    }

    #[tokio::test]
    async fn empty_matches_are_dropped_without_error() {
        let locator = CityLocator::new(&FakeCityLookup);
        let located = locator
            .locate_all(
                &["NG".to_string()],
                &["lagos".to_string(), "nowhere".to_string()],
                &requested_fields(),
            )
            .await
            .unwrap();

        assert_eq!(located.len(), 1);
        assert_eq!(located[0].get("name"), Some(&json!("Lagos")));
    }
}
