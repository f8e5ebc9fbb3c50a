use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use tracing::{debug, info};

use super::WeatherStore;
use crate::common::error::{PipelineError, Result};
use crate::common::types::{PersistedWeather, WeatherRecord};

/// SQLite-backed weather store. The schema (22 record fields plus identity
/// and audit timestamps) is applied on open.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        info!("Opening weather database at {}", path.as_ref().display());
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(include_str!("../../../migrations/001_create_weather.sql"))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

#[async_trait]
impl WeatherStore for SqliteStore {
    async fn query_by_identities(&self, identities: &[i64]) -> Result<Vec<i64>> {
        if identities.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.conn.lock().unwrap();
        let placeholders = vec!["?"; identities.len()].join(", ");
        let sql = format!("SELECT id FROM weather WHERE id IN ({placeholders})");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(identities.iter()), |row| {
            row.get::<_, i64>(0)
        })?;

        let mut existing = Vec::new();
        for id in rows {
            existing.push(id?);
        }
        Ok(existing)
    }

    async fn insert_all(&self, batch: &[(i64, WeatherRecord)]) -> Result<usize> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        for (identity, r) in batch {
            tx.execute(
                "INSERT INTO weather (
                    id, city, country, state, latitude, longitude, timezone,
                    timezone_offset, date_time, sunrise, sunset, temperature,
                    feels_like, pressure, humidity, dew_point, ultraviolet_index,
                    clouds, visibility, wind_speed, wind_deg, weather, description
                 ) VALUES (
                    ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12,
                    ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23
                 )",
                params![
                    identity,
                    r.city,
                    r.country,
                    r.state,
                    r.latitude,
                    r.longitude,
                    r.timezone,
                    r.timezone_offset,
                    r.date_time,
                    r.sunrise,
                    r.sunset,
                    r.temperature,
                    r.feels_like,
                    r.pressure,
                    r.humidity,
                    r.dew_point,
                    r.ultraviolet_index,
                    r.clouds,
                    r.visibility,
                    r.wind_speed,
                    r.wind_deg,
                    r.weather,
                    r.description,
                ],
            )?;
            debug!("Staged weather row with identity {}", identity);
        }
        tx.commit()?;
        Ok(batch.len())
    }

    async fn get_by_identity(&self, identity: i64) -> Result<Option<PersistedWeather>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, city, country, state, latitude, longitude, timezone,
                    timezone_offset, date_time, sunrise, sunset, temperature,
                    feels_like, pressure, humidity, dew_point, ultraviolet_index,
                    clouds, visibility, wind_speed, wind_deg, weather, description,
                    created_at, updated_at
             FROM weather WHERE id = ?1",
        )?;
        let row = stmt
            .query_row(params![identity], |row| {
                Ok((
                    PersistedWeather {
                        id: row.get(0)?,
                        record: WeatherRecord {
                            city: row.get(1)?,
                            country: row.get(2)?,
                            state: row.get(3)?,
                            latitude: row.get(4)?,
                            longitude: row.get(5)?,
                            timezone: row.get(6)?,
                            timezone_offset: row.get(7)?,
                            date_time: row.get(8)?,
                            sunrise: row.get(9)?,
                            sunset: row.get(10)?,
                            temperature: row.get(11)?,
                            feels_like: row.get(12)?,
                            pressure: row.get(13)?,
                            humidity: row.get(14)?,
                            dew_point: row.get(15)?,
                            ultraviolet_index: row.get(16)?,
                            clouds: row.get(17)?,
                            visibility: row.get(18)?,
                            wind_speed: row.get(19)?,
                            wind_deg: row.get(20)?,
                            weather: row.get(21)?,
                            description: row.get(22)?,
                        },
                        created_at: Utc::now(),
                        updated_at: Utc::now(),
                    },
                    row.get::<_, String>(23)?,
                    row.get::<_, String>(24)?,
                ))
            })
            .optional()?;

        match row {
            Some((mut persisted, created_at, updated_at)) => {
                persisted.created_at = parse_sql_timestamp(&created_at)?;
                persisted.updated_at = parse_sql_timestamp(&updated_at)?;
                Ok(Some(persisted))
            }
            None => Ok(None),
        }
    }

    async fn count(&self) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM weather", [], |row| row.get(0))?;
        Ok(count)
    }
}

/// SQLite's CURRENT_TIMESTAMP is UTC in `YYYY-MM-DD HH:MM:SS` form.
fn parse_sql_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.and_utc())
        .map_err(|e| PipelineError::Database {
            message: format!("Unparseable audit timestamp '{raw}': {e}"),
        })
}
