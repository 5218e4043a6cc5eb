//! Air quality data for the Dustline bot.
//!
//! Fetches the Air4Thai station feed, picks the nearest station to a shared
//! location (haversine), computes the Bangkok-area average, and renders the
//! Thai report texts. Readings that are absent, unparsable, or not positive
//! are invalid and excluded from every computation.

pub mod aqi;
pub mod client;
pub mod geo;
pub mod report;
pub mod wire;

pub use aqi::{aqi_level, AqiLevel};
pub use client::{Air4ThaiClient, StationProvider};
pub use report::{AreaSummary, NamedStation, NearestStation};
pub use wire::{Station, StationFeed};
