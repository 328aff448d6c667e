//! Floor map lookup tables.
//!
//! Two CSV tables loaded once at startup and treated as read-only for the
//! process lifetime. A load failure degrades map enrichment to a no-op rather
//! than failing startup.

use anyhow::Result;
use std::path::Path;

use crate::model::Item;

/// A named floor plan.
#[derive(Debug, Clone)]
pub struct MapEntry {
    pub id: String,
    pub url: String,
    pub name: String,
}

/// Lookup rule matching a shelving location (and call number range) to a map.
#[derive(Debug, Clone)]
pub struct MapLookup {
    pub call_number_range: String,
    pub location: String,
    pub map_id: String,
}

#[derive(Debug, Default, Clone)]
pub struct MapTable {
    maps: Vec<MapEntry>,
    lookups: Vec<MapLookup>,
}

impl MapTable {
    /// Loads `maps.csv` (ID,URL,NAME) and `map_lookups.csv` (RANGE,LOCATION,MAP)
    /// from the data directory. Errors are logged and produce an empty table.
    pub fn load<P: AsRef<Path>>(data_dir: P) -> Self {
        let dir = data_dir.as_ref();
        tracing::info!(dir = %dir.display(), "initializing map lookups data");
        let maps = match read_maps(&dir.join("maps.csv")) {
            Ok(maps) => maps,
            Err(err) => {
                tracing::error!(%err, "unable to read maps data");
                return Self::default();
            }
        };
        let lookups = match read_lookups(&dir.join("map_lookups.csv")) {
            Ok(lookups) => lookups,
            Err(err) => {
                tracing::error!(%err, "unable to read map lookups data");
                return Self::default();
            }
        };
        tracing::info!(maps = maps.len(), lookups = lookups.len(), "map lookups initialized");
        Self { maps, lookups }
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty() && self.lookups.is_empty()
    }

    fn find(&self, id: &str) -> Option<&MapEntry> {
        self.maps.iter().find(|m| m.id == id)
    }

    /// Attaches map name/url to each item by its home location. Items without
    /// a matching lookup keep the "N/A" placeholder.
    pub fn annotate(&self, items: &mut [Item]) {
        for item in items {
            item.map.name = "N/A".to_string();
            let Some(lookup) = self
                .lookups
                .iter()
                .find(|lu| lu.location == item.home_location_id)
            else {
                continue;
            };

            // A wildcard range means the location alone selects the map.
            // TODO: call number range matching for non-wildcard lookups.
            if lookup.call_number_range == "*" {
                if let Some(entry) = self.find(&lookup.map_id) {
                    item.map.url = entry.url.clone();
                    item.map.name = entry.name.clone();
                }
            }
        }
    }
}

fn read_maps(path: &Path) -> Result<Vec<MapEntry>> {
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_path(path)?;
    let mut maps = Vec::new();
    for record in reader.records() {
        let record = record?;
        maps.push(MapEntry {
            id: record.get(0).unwrap_or_default().to_string(),
            url: record.get(1).unwrap_or_default().to_string(),
            name: record.get(2).unwrap_or_default().to_string(),
        });
    }
    Ok(maps)
}

fn read_lookups(path: &Path) -> Result<Vec<MapLookup>> {
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_path(path)?;
    let mut lookups = Vec::new();
    for record in reader.records() {
        let record = record?;
        lookups.push(MapLookup {
            call_number_range: record.get(0).unwrap_or_default().to_string(),
            location: record.get(1).unwrap_or_default().to_string(),
            map_id: record.get(2).unwrap_or_default().to_string(),
        });
    }
    Ok(lookups)
}
