//! Map markers from the events' geolocation enrichment.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use pulseboard_core::event::{Event, Location};

/// Coordinates are grouped at this many decimal places (about 11 m).
const COORD_PRECISION: f64 = 10_000.0;
const UNKNOWN_PLACE: &str = "Unknown location";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub count: usize,
    pub place: String,
    pub last_seen: Option<DateTime<Utc>>,
}

/// One marker per distinct (rounded) coordinate pair, busiest first.
///
/// Events without a location, or with coordinates out of range, are left out.
pub fn map_points(events: &[Event]) -> Vec<MapPoint> {
    let mut index: HashMap<(i64, i64), usize> = HashMap::new();
    let mut points: Vec<MapPoint> = Vec::new();

    for event in events {
        let Some(location) = event.location.as_ref() else {
            continue;
        };
        let Some(key) = grid_key(location) else {
            continue;
        };
        let seen = event.occurred_at().ok();

        match index.get(&key) {
            Some(&slot) => {
                let point = &mut points[slot];
                point.count += 1;
                point.last_seen = point.last_seen.max(seen);
            }
            None => {
                index.insert(key, points.len());
                points.push(MapPoint {
                    latitude: key.0 as f64 / COORD_PRECISION,
                    longitude: key.1 as f64 / COORD_PRECISION,
                    count: 1,
                    place: place_label(location),
                    last_seen: seen,
                });
            }
        }
    }

    points.sort_by(|a, b| b.count.cmp(&a.count));
    points
}

fn grid_key(location: &Location) -> Option<(i64, i64)> {
    let lat = location.latitude.filter(|v| (-90.0..=90.0).contains(v))?;
    let lon = location.longitude.filter(|v| (-180.0..=180.0).contains(v))?;
    Some((
        (lat * COORD_PRECISION).round() as i64,
        (lon * COORD_PRECISION).round() as i64,
    ))
}

/// `city, region, country`, skipping whatever is missing.
pub fn place_label(location: &Location) -> String {
    let parts: Vec<&str> = [&location.city, &location.region, &location.country]
        .into_iter()
        .filter_map(|part| part.as_deref())
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect();
    if parts.is_empty() {
        UNKNOWN_PLACE.to_string()
    } else {
        parts.join(", ")
    }
}
