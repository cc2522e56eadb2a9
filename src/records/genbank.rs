//! GenBank sequence metadata: located by free text.

use serde::Deserialize;
use serde_json::json;

use super::dates::parse_date;
use super::{present, LocationQuery, NormalizedRecord, SourceRecord};
use crate::resolve::{DataSource, FreeTextLocation};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GenbankRow {
    #[serde(rename = "Pathogen NCBI taxonomy ID")]
    pub pathogen_ncbi_id: Option<String>,
    #[serde(rename = "Pathogen species")]
    pub pathogen_species: Option<String>,
    #[serde(rename = "Pathogen serotype")]
    pub pathogen_serotype: Option<String>,
    #[serde(rename = "Pathogen isolate or strain")]
    pub pathogen_strain: Option<String>,
    #[serde(rename = "Host species Latin name")]
    pub host_species: Option<String>,
    #[serde(rename = "Host species NCBI taxonomy ID")]
    pub host_ncbi_id: Option<String>,
    #[serde(rename = "Date observed")]
    pub observation_date: Option<String>,
    #[serde(rename = "Geo text original")]
    pub location: Option<String>,
}

/// `{"country": ..., "areas": [...]}` from the raw `country[:areas]` text
fn location_description(location: &str) -> String {
    let (country, areas): (&str, Vec<&str>) = match location.split_once(':') {
        Some((country, areas)) => (country, areas.split(',').collect()),
        None => (location, Vec::new()),
    };
    json!({"country": country, "areas": areas}).to_string()
}

fn owned(value: &Option<String>) -> Option<String> {
    present(value).map(str::to_string)
}

pub fn map_row(row: GenbankRow) -> SourceRecord {
    let location = present(&row.location).unwrap_or_default();

    let record = NormalizedRecord {
        observation_date: present(&row.observation_date).and_then(parse_date),
        pathogen_species_ncbi_id: owned(&row.pathogen_ncbi_id),
        pathogen_species_name: owned(&row.pathogen_species),
        pathogen_serotype: owned(&row.pathogen_serotype),
        host_species_ncbi_id: owned(&row.host_ncbi_id),
        host_species_name: owned(&row.host_species),
        original_record_source: DataSource::Genbank.label().to_string(),
        original_record_location_description: location_description(location),
        ..NormalizedRecord::default()
    };

    let query = if location.is_empty() {
        LocationQuery::Missing
    } else {
        let mut text = FreeTextLocation::new(location);
        text.strain = owned(&row.pathogen_strain);
        LocationQuery::FreeText(text)
    };
    SourceRecord { record, query }
}
