//! EMPRES-i outbreak exports: located by coordinates.

use regex::Regex;
use serde::Deserialize;
use serde_json::json;
use std::sync::OnceLock;

use super::dates::parse_day_first;
use super::{present, LocationQuery, NormalizedRecord, SourceRecord};
use crate::reference::ReferenceData;
use crate::resolve::{Coordinate, DataSource};

fn serotype_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(H\d+)(N\d+) (\w+)$").unwrap())
}

fn whitespace() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").unwrap())
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EmpresiRow {
    #[serde(rename = "Event.ID")]
    pub event_id: Option<String>,
    #[serde(rename = "Disease")]
    pub disease: Option<String>,
    #[serde(rename = "Serotype")]
    pub serotype: Option<String>,
    #[serde(rename = "Region")]
    pub region: Option<String>,
    #[serde(rename = "Subregion")]
    pub subregion: Option<String>,
    #[serde(rename = "Country")]
    pub country: Option<String>,
    #[serde(rename = "Admin.level.1")]
    pub admin_level_1: Option<String>,
    #[serde(rename = "Locality")]
    pub locality: Option<String>,
    #[serde(rename = "Latitude")]
    pub latitude: Option<String>,
    #[serde(rename = "Longitude")]
    pub longitude: Option<String>,
    #[serde(rename = "Animal.type")]
    pub animal_type: Option<String>,
    #[serde(rename = "Species")]
    pub species: Option<String>,
    #[serde(rename = "Observation.date..dd.mm.yyyy.")]
    pub observation_date: Option<String>,
    #[serde(rename = "Report.date..dd.mm.yyyy.")]
    pub report_date: Option<String>,
}

/// `H5N1 HPAI` → `{"h_subtype":"H5","n_subtype":"N1","pathogenicity":"HPAI"}`
pub fn compile_serotype(serotype: &str) -> Option<String> {
    let serotype = whitespace().replace_all(serotype, " ");
    let captures = serotype_pattern().captures(serotype.trim())?;
    Some(
        json!({
            "h_subtype": &captures[1],
            "n_subtype": &captures[2],
            "pathogenicity": &captures[3],
        })
        .to_string(),
    )
}

fn location_description(row: &EmpresiRow) -> String {
    json!({
        "region": row.region,
        "subregion": row.subregion,
        "country": row.country,
        "admin_level_1": row.admin_level_1,
        "locality": row.locality,
    })
    .to_string()
}

fn coordinate(row: &EmpresiRow) -> Option<Coordinate> {
    let latitude = present(&row.latitude)?.parse::<f64>().ok()?;
    let longitude = present(&row.longitude)?.parse::<f64>().ok()?;
    Some(Coordinate::new(latitude, longitude))
}

pub fn map_row(row: EmpresiRow, reference: &ReferenceData) -> SourceRecord {
    let coordinate = coordinate(&row);
    let host_synonym = present(&row.species).map(str::to_lowercase);
    let pathogen_synonym = present(&row.serotype).and_then(|s| s.split_whitespace().next());

    let mut record = NormalizedRecord {
        observation_date: present(&row.observation_date).and_then(parse_day_first),
        report_date: present(&row.report_date).and_then(parse_day_first),
        pathogen_serotype: present(&row.serotype).and_then(compile_serotype),
        host_domestication_status: present(&row.animal_type).map(str::to_string),
        latitude: coordinate.map(|c| c.latitude),
        longitude: coordinate.map(|c| c.longitude),
        original_record_source: DataSource::Empresi.label().to_string(),
        original_record_id: present(&row.event_id).map(str::to_string),
        original_record_location_description: location_description(&row),
        ..NormalizedRecord::default()
    };
    record.join_species(reference, host_synonym.as_deref(), pathogen_synonym);

    let query = match coordinate {
        Some(coordinate) => LocationQuery::Coordinate(coordinate),
        None => LocationQuery::Missing,
    };
    SourceRecord { record, query }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::fixtures;
    use chrono::NaiveDate;

    fn reference() -> ReferenceData {
        let dir = tempfile::tempdir().unwrap();
        fixtures::write_reference_dir(dir.path());
        ReferenceData::load(dir.path()).unwrap()
    }

    #[test]
    fn test_compile_serotype() {
        assert_eq!(
            compile_serotype("H5N1  HPAI").as_deref(),
            Some(r#"{"h_subtype":"H5","n_subtype":"N1","pathogenicity":"HPAI"}"#)
        );
        assert_eq!(compile_serotype("H5N1"), None);
        assert_eq!(compile_serotype("West Nile"), None);
    }

    #[test]
    fn test_map_row() {
        let row = EmpresiRow {
            event_id: Some("287664".to_string()),
            serotype: Some("H5N1 HPAI".to_string()),
            country: Some("Viet Nam".to_string()),
            latitude: Some("12.92".to_string()),
            longitude: Some("108.27".to_string()),
            animal_type: Some("Domestic".to_string()),
            species: Some("Chicken".to_string()),
            observation_date: Some("03/02/2021".to_string()),
            report_date: Some("not a date".to_string()),
            ..EmpresiRow::default()
        };

        let SourceRecord { record, query } = map_row(row, &reference());
        assert_eq!(query, LocationQuery::Coordinate(Coordinate::new(12.92, 108.27)));
        assert_eq!(record.observation_date, NaiveDate::from_ymd_opt(2021, 2, 3));
        assert_eq!(record.report_date, None);
        assert_eq!(record.host_species_ncbi_id.as_deref(), Some("9031"));
        assert_eq!(record.pathogen_species_ncbi_id.as_deref(), Some("102793"));
        assert_eq!(record.original_record_source, "EMPRES-i");
        assert_eq!(record.original_record_id.as_deref(), Some("287664"));
        assert!(record
            .original_record_location_description
            .starts_with(r#"{"region":null,"subregion":null,"country":"Viet Nam""#));
    }

    #[test]
    fn test_missing_coordinates() {
        let row = EmpresiRow {
            latitude: Some("12.92".to_string()),
            longitude: Some("".to_string()),
            ..EmpresiRow::default()
        };
        let mapped = map_row(row, &reference());
        assert_eq!(mapped.query, LocationQuery::Missing);
        assert_eq!(mapped.record.latitude, None);
    }
}
