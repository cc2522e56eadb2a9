//! Normalized TSV output and per-feature geometry files.

use csv::{QuoteStyle, WriterBuilder};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use super::NormalizedRecord;
use crate::error::{GeoError, Result};
use crate::models::{Feature, ResolvedPlace};

pub const OUTPUT_COLUMNS: [&str; 20] = [
    "observation_date",
    "report_date",
    "pathogen_species_ncbi_id",
    "pathogen_species_name",
    "pathogen_serotype",
    "host_species_ncbi_id",
    "host_species_name",
    "host_species_common_name",
    "host_domestication_status",
    "latitude",
    "longitude",
    "country",
    "admin_level_1",
    "locality",
    "country_osm_id",
    "admin_level_1_osm_id",
    "locality_osm_id",
    "original_record_source",
    "original_record_id",
    "original_record_location_description",
];

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn name(place: &Option<ResolvedPlace>) -> String {
    place.as_ref().map(|p| p.name.clone()).unwrap_or_default()
}

fn id(place: &Option<ResolvedPlace>) -> String {
    place
        .as_ref()
        .and_then(|p| p.id.as_ref())
        .map(|id| id.to_string())
        .unwrap_or_default()
}

impl NormalizedRecord {
    /// Output fields in [`OUTPUT_COLUMNS`] order; absent values are empty
    pub fn to_fields(&self) -> [String; 20] {
        let date = |d: &Option<chrono::NaiveDate>| {
            d.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default()
        };
        let number = |n: &Option<f64>| n.map(|n| n.to_string()).unwrap_or_default();
        let location = &self.location;

        [
            date(&self.observation_date),
            date(&self.report_date),
            text(&self.pathogen_species_ncbi_id),
            text(&self.pathogen_species_name),
            text(&self.pathogen_serotype),
            text(&self.host_species_ncbi_id),
            text(&self.host_species_name),
            text(&self.host_species_common_name),
            text(&self.host_domestication_status),
            number(&self.latitude),
            number(&self.longitude),
            name(&location.country),
            name(&location.admin_level_1),
            name(&location.locality),
            id(&location.country),
            id(&location.admin_level_1),
            id(&location.locality),
            self.original_record_source.clone(),
            text(&self.original_record_id),
            self.original_record_location_description.clone(),
        ]
    }
}

/// Write records as tab-separated values.
///
/// Fields holding a tab, newline or quote are quoted so every row keeps
/// its column count.
pub fn write_records<P: AsRef<Path>>(path: P, records: &[NormalizedRecord]) -> Result<()> {
    let path = path.as_ref();
    let mut writer = WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(QuoteStyle::Necessary)
        .from_path(path)?;

    writer.write_record(OUTPUT_COLUMNS)?;
    for record in records {
        writer.write_record(record.to_fields())?;
    }
    writer.flush().map_err(|e| GeoError::io(path, e))?;

    info!("Wrote {} records to {}", records.len(), path.display());
    Ok(())
}

/// Write `<id>.json` with bounding box and polygon for each feature
pub fn write_geometries<P: AsRef<Path>>(dir: P, features: &[Feature]) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).map_err(|e| GeoError::io(dir, e))?;

    let mut written = Vec::with_capacity(features.len());
    for feature in features {
        let path = dir.join(format!("{}.json", feature.id));
        let content = json!({
            "bounding_box": feature.bounding_box,
            "polygon": feature.polygon,
        });
        let body = serde_json::to_string_pretty(&content)?;
        fs::write(&path, body).map_err(|e| GeoError::io(&path, e))?;
        written.push(path);
    }

    info!("Wrote {} geometry files to {}", written.len(), dir.display());
    Ok(written)
}
