//! Source record adapters and the canonical output record.
//!
//! Each adapter reads its source's CSV export, maps columns into a
//! [`NormalizedRecord`] and pulls out the location field as a
//! [`LocationQuery`] for the matching resolver.

pub mod dates;
pub mod ecdc;
pub mod empresi;
pub mod genbank;
pub mod output;
pub mod sampling;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use std::path::Path;
use tracing::info;

use crate::error::Result;
use crate::models::{FeatureId, GeocodedLocation};
use crate::reference::ReferenceData;
use crate::resolve::{Coordinate, DataSource, FreeTextLocation};

pub use output::{write_geometries, write_records, OUTPUT_COLUMNS};
pub use sampling::{sample_rows, SamplingMode};

/// Location field of one source record, in the shape its resolver takes
#[derive(Debug, Clone, PartialEq)]
pub enum LocationQuery {
    Coordinate(Coordinate),
    FreeText(FreeTextLocation),
    Nuts(String),
    /// The record carries no usable location
    Missing,
}

/// Canonical output row shared by every source
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedRecord {
    pub observation_date: Option<NaiveDate>,
    pub report_date: Option<NaiveDate>,
    pub pathogen_species_ncbi_id: Option<String>,
    pub pathogen_species_name: Option<String>,
    /// JSON for EMPRES-i serotypes, free text otherwise
    pub pathogen_serotype: Option<String>,
    pub host_species_ncbi_id: Option<String>,
    pub host_species_name: Option<String>,
    pub host_species_common_name: Option<String>,
    pub host_domestication_status: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub location: GeocodedLocation,
    pub original_record_source: String,
    pub original_record_id: Option<String>,
    /// Source location fields as a JSON object
    pub original_record_location_description: String,
}

impl NormalizedRecord {
    /// Fill species columns from the synonym tables. Unknown synonyms
    /// leave the columns empty.
    pub fn join_species(
        &mut self,
        reference: &ReferenceData,
        host_synonym: Option<&str>,
        pathogen_synonym: Option<&str>,
    ) {
        if let Some(host) = host_synonym.and_then(|s| reference.host_species.get(s)) {
            self.host_species_ncbi_id = host.ncbi_id.clone();
            self.host_species_name = host.name.clone();
            self.host_species_common_name = host.common_name.clone();
        }
        if let Some(pathogen) = pathogen_synonym.and_then(|s| reference.pathogen_species.get(s)) {
            self.pathogen_species_ncbi_id = pathogen.ncbi_id.clone();
            self.pathogen_species_name = pathogen.name.clone();
        }
    }

    pub fn feature_ids(&self) -> impl Iterator<Item = &FeatureId> {
        self.location.feature_ids()
    }
}

/// A record mapped to the output schema, its location still unresolved
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRecord {
    pub record: NormalizedRecord,
    pub query: LocationQuery,
}

/// Read and map every row of a source export
pub fn read_source<P: AsRef<Path>>(
    source: DataSource,
    path: P,
    reference: &ReferenceData,
) -> Result<Vec<SourceRecord>> {
    let path = path.as_ref();
    let records = match source {
        DataSource::Empresi => read_rows::<empresi::EmpresiRow>(path)?
            .into_iter()
            .map(|row| empresi::map_row(row, reference))
            .collect(),
        DataSource::Genbank => read_rows::<genbank::GenbankRow>(path)?
            .into_iter()
            .map(genbank::map_row)
            .collect(),
        DataSource::Ecdc => ecdc::map_rows(read_rows(path)?, reference),
    };
    Ok(records)
}

/// Deserialize a comma-separated export with headers
pub(crate) fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    info!("Reading {}", path.display());
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    info!("Read {} rows", rows.len());
    Ok(rows)
}

/// Trimmed, non-empty value
pub(crate) fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
