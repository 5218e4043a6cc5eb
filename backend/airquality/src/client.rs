use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use dustline_core::BotError;

use crate::geo::haversine_km;
use crate::report::{self, AreaSummary, NamedStation, NearestStation};
use crate::wire::{Station, StationFeed};

/// Outbound request timeout for the station feed.
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// The feed is republished hourly; re-fetching more often than this only
/// hammers the origin.
const CACHE_TTL: Duration = Duration::from_secs(600);

/// Bangkok-area station ids used for the city-wide average.
pub const BANGKOK_STATIONS: &[&str] = &[
    "02t", "03t", "05t", "10t", "11t", "12t", "50t", "52t", "53t", "54t", "59t", "61t",
];

/// Station data source, as seen by the router and the broadcast service.
#[async_trait]
pub trait StationProvider: Send + Sync {
    /// Nearest station with a valid PM2.5 reading, or `None` when no
    /// station qualifies.
    async fn nearest_station(&self, lat: f64, lng: f64)
        -> Result<Option<NearestStation>, BotError>;

    /// Average PM2.5 over the Bangkok station list.
    async fn bangkok_average(&self) -> Result<Option<AreaSummary>, BotError>;
}

/// HTTP client for the Air4Thai feed with a short-lived in-memory cache.
pub struct Air4ThaiClient {
    http: reqwest::Client,
    url: String,
    cache_ttl: Duration,
    cache: Mutex<Option<(Instant, Arc<Vec<Station>>)>>,
}

impl Air4ThaiClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_cache_ttl(url, CACHE_TTL)
    }

    pub fn with_cache_ttl(url: impl Into<String>, cache_ttl: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            http,
            url: url.into(),
            cache_ttl,
            cache: Mutex::new(None),
        }
    }

    /// Fetch (or serve from cache) the full station list.
    pub async fn stations(&self) -> Result<Arc<Vec<Station>>, BotError> {
        let mut cache = self.cache.lock().await;
        if let Some((fetched_at, stations)) = cache.as_ref() {
            if fetched_at.elapsed() < self.cache_ttl {
                debug!(count = stations.len(), "Serving Air4Thai stations from cache");
                return Ok(Arc::clone(stations));
            }
        }

        let response = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|e| BotError::Upstream(format!("Air4Thai request failed: {e}")))?
            .error_for_status()
            .map_err(|e| BotError::Upstream(format!("Air4Thai returned an error status: {e}")))?;
        let feed: StationFeed = response
            .json()
            .await
            .map_err(|e| BotError::Upstream(format!("Air4Thai response was not valid JSON: {e}")))?;

        debug!(count = feed.stations.len(), "Fetched Air4Thai station feed");
        let stations = Arc::new(feed.stations);
        *cache = Some((Instant::now(), Arc::clone(&stations)));
        Ok(stations)
    }

    /// Free-text dust report: a named-station match when `location` is
    /// given, falling back to the Bangkok average, then the fixed
    /// unavailable text.
    pub async fn dust_report(&self, location: Option<&str>) -> String {
        let stations = match self.stations().await {
            Ok(stations) => stations,
            Err(e) => {
                warn!(error = %e, "Station feed unavailable for dust report");
                return report::unavailable_text().to_string();
            }
        };

        if let Some(query) = location {
            if let Some(text) =
                find_station(&stations, query).and_then(|s| report::station_report(&s))
            {
                return text;
            }
        }

        match bangkok_average_from(&stations) {
            Some(summary) => report::area_report(&summary),
            None => report::unavailable_text().to_string(),
        }
    }
}

#[async_trait]
impl StationProvider for Air4ThaiClient {
    async fn nearest_station(
        &self,
        lat: f64,
        lng: f64,
    ) -> Result<Option<NearestStation>, BotError> {
        let stations = self.stations().await.map_err(|e| {
            warn!(error = %e, "Station feed unavailable for nearest-station lookup");
            e
        })?;
        Ok(nearest_from(&stations, lat, lng))
    }

    async fn bangkok_average(&self) -> Result<Option<AreaSummary>, BotError> {
        let stations = self.stations().await?;
        Ok(bangkok_average_from(&stations))
    }
}

/// Pick the closest station that has both valid coordinates and a valid
/// PM2.5 reading.
pub fn nearest_from(stations: &[Station], lat: f64, lng: f64) -> Option<NearestStation> {
    let mut nearest: Option<NearestStation> = None;
    for station in stations {
        let Some((station_lat, station_lng)) = station.coords() else {
            continue;
        };
        let Some(pm25) = station.pm25() else {
            continue;
        };
        let distance_km = haversine_km(lat, lng, station_lat, station_lng);
        if nearest
            .as_ref()
            .map_or(true, |best| distance_km < best.distance_km)
        {
            nearest = Some(NearestStation {
                name: station.name_th.clone(),
                area: station.area_th.clone(),
                pm25,
                aqi: station.aqi(),
                updated_at: station.updated_at(),
                distance_km,
            });
        }
    }
    nearest
}

/// First station whose Thai name, English name, or area contains the
/// query (case-insensitive).
pub fn find_station(stations: &[Station], query: &str) -> Option<NamedStation> {
    let query = query.trim().to_lowercase();
    stations
        .iter()
        .find(|s| {
            s.name_th.to_lowercase().contains(&query)
                || s.name_en.to_lowercase().contains(&query)
                || s.area_th.to_lowercase().contains(&query)
        })
        .map(|s| NamedStation {
            name: s.name_th.clone(),
            area: s.area_th.clone(),
            pm25: s.pm25(),
            aqi: s.aqi(),
            updated_at: s.updated_at(),
        })
}

/// Mean/min/max PM2.5 over the Bangkok station list.
pub fn bangkok_average_from(stations: &[Station]) -> Option<AreaSummary> {
    let readings: Vec<f64> = stations
        .iter()
        .filter(|s| BANGKOK_STATIONS.contains(&s.station_id.as_str()))
        .filter_map(|s| s.pm25())
        .collect();
    if readings.is_empty() {
        return None;
    }

    let sum: f64 = readings.iter().sum();
    let min = readings.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = readings.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    Some(AreaSummary {
        area: "กรุงเทพมหานคร".to_string(),
        pm25_avg: sum / readings.len() as f64,
        station_count: readings.len(),
        min,
        max,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn station(id: &str, lat: f64, lng: f64, pm25: serde_json::Value) -> Station {
        serde_json::from_value(serde_json::json!({
            "stationID": id,
            "nameTH": format!("สถานี {}", id),
            "areaTH": "ทดสอบ",
            "lat": lat,
            "long": lng,
            "AQILast": { "date": "2026-01-15", "time": "11:00", "PM25": { "value": pm25 } }
        }))
        .unwrap()
    }

    #[test]
    fn test_nearest_picks_closest_valid_station() {
        let stations = vec![
            station("far", 18.79, 98.99, serde_json::json!(12.0)),
            station("near", 13.76, 100.50, serde_json::json!(38.0)),
        ];
        let nearest = nearest_from(&stations, 13.75, 100.5).unwrap();
        assert_eq!(nearest.name, "สถานี near");
        assert_eq!(nearest.pm25, 38.0);
        assert!(nearest.distance_km < 5.0);
    }

    #[test]
    fn test_nearest_skips_stations_without_valid_reading() {
        let stations = vec![
            // Closest station has no usable reading, next one wins.
            station("broken", 13.75, 100.50, serde_json::json!("-")),
            station("ok", 14.00, 100.60, serde_json::json!(22.0)),
        ];
        let nearest = nearest_from(&stations, 13.75, 100.5).unwrap();
        assert_eq!(nearest.name, "สถานี ok");
    }

    #[test]
    fn test_nearest_skips_zero_coordinates() {
        let stations = vec![
            station("nowhere", 0.0, 0.0, serde_json::json!(15.0)),
        ];
        assert!(nearest_from(&stations, 13.75, 100.5).is_none());
    }

    #[test]
    fn test_find_station_matches_name_and_area() {
        let stations = vec![
            station("02t", 13.73, 100.54, serde_json::json!(30.0)),
            station("61t", 18.79, 98.98, serde_json::json!("-")),
        ];

        // Thai name containment, first match wins.
        let found = find_station(&stations, "สถานี 02t").unwrap();
        assert_eq!(found.name, "สถานี 02t");
        assert_eq!(found.pm25, Some(30.0));

        // Area matches too, and an invalid reading surfaces as None.
        let found = find_station(&stations, "ทดสอบ").unwrap();
        assert_eq!(found.name, "สถานี 02t");
        let found = find_station(&stations, "61t").unwrap();
        assert_eq!(found.pm25, None);

        assert!(find_station(&stations, "เชียงราย").is_none());
    }

    #[test]
    fn test_find_station_is_case_insensitive() {
        let raw: Station = serde_json::from_value(serde_json::json!({
            "stationID": "05t",
            "nameTH": "แขวงบางนา",
            "nameEN": "Bangna",
            "areaTH": "เขตบางนา กรุงเทพฯ"
        }))
        .unwrap();
        let found = find_station(&[raw], "BANGNA").unwrap();
        assert_eq!(found.name, "แขวงบางนา");
    }

    #[test]
    fn test_bangkok_average_over_listed_stations_only() {
        let stations = vec![
            station("02t", 13.73, 100.54, serde_json::json!(30.0)),
            station("03t", 13.75, 100.49, serde_json::json!(50.0)),
            station("99t", 13.70, 100.50, serde_json::json!(500.0)), // not a Bangkok id
            station("05t", 13.76, 100.51, serde_json::json!("-")),   // invalid reading
        ];
        let summary = bangkok_average_from(&stations).unwrap();
        assert_eq!(summary.station_count, 2);
        assert!((summary.pm25_avg - 40.0).abs() < 1e-9);
        assert_eq!(summary.min, 30.0);
        assert_eq!(summary.max, 50.0);
    }

    #[test]
    fn test_bangkok_average_empty_when_no_readings() {
        assert!(bangkok_average_from(&[]).is_none());
    }
}
