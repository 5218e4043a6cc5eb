//! Wire types for the Air4Thai `getAQI_JSON.php` feed.
//!
//! The feed is loosely typed: coordinates and readings arrive as strings,
//! numbers, `"-"`, or are missing entirely. Everything numeric goes through
//! a tolerant deserializer and invalid values surface as `None`.

use serde::{Deserialize, Deserializer};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StationFeed {
    #[serde(default)]
    pub stations: Vec<Station>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Station {
    #[serde(rename = "stationID", default)]
    pub station_id: String,
    #[serde(rename = "nameTH", default)]
    pub name_th: String,
    #[serde(rename = "nameEN", default)]
    pub name_en: String,
    #[serde(rename = "areaTH", default)]
    pub area_th: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub lat: Option<f64>,
    #[serde(rename = "long", default, deserialize_with = "lenient_f64")]
    pub lng: Option<f64>,
    #[serde(rename = "AQILast", default)]
    pub aqi_last: Option<AqiLast>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AqiLast {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time: String,
    #[serde(rename = "PM25", default)]
    pub pm25: Option<Reading>,
    #[serde(rename = "AQI", default)]
    pub aqi: Option<AqiReading>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Reading {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AqiReading {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub aqi: Option<f64>,
}

impl Station {
    /// Valid PM2.5 reading, if any. Zero and negative readings mean the
    /// sensor reported nothing usable.
    pub fn pm25(&self) -> Option<f64> {
        let value = self.aqi_last.as_ref()?.pm25.as_ref()?.value?;
        (value > 0.0).then_some(value)
    }

    /// Station coordinates when both are present and non-zero.
    pub fn coords(&self) -> Option<(f64, f64)> {
        let (lat, lng) = (self.lat?, self.lng?);
        (lat != 0.0 && lng != 0.0).then_some((lat, lng))
    }

    pub fn aqi(&self) -> Option<f64> {
        self.aqi_last.as_ref()?.aqi.as_ref()?.aqi
    }

    /// "date time" of the latest reading, when the feed carries one.
    pub fn updated_at(&self) -> Option<String> {
        let last = self.aqi_last.as_ref()?;
        if last.date.is_empty() {
            return None;
        }
        Some(format!("{} {}", last.date, last.time).trim().to_string())
    }
}

/// Accept numbers, numeric strings, or anything else (as `None`).
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(f64),
        Text(String),
        Other(serde_json::Value),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Num(n)) => Some(n),
        Some(Raw::Text(s)) => s.trim().parse().ok(),
        _ => None,
    })
}
