//! ECDC surveillance exports: located by NUTS code.

use chrono::NaiveDate;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::OnceLock;
use tracing::debug;

use super::dates::parse_date;
use super::{present, LocationQuery, NormalizedRecord, SourceRecord};
use crate::reference::ReferenceData;
use crate::resolve::DataSource;

/// Placeholders meaning "unknown" in place columns
const MISSING_VALUES: &[&str] = &["NULL", "UNK", "UNK_DJ"];

/// Only confirmed cases are kept
const CONFIRMED: &str = "CONF";

/// Every ECDC record is a human case
const HOST_SPECIES: &str = "human";

fn nuts_like() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Z]{2}").unwrap())
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EcdcRow {
    #[serde(rename = "Subject")]
    pub subject: Option<String>,
    #[serde(rename = "Classification")]
    pub classification: Option<String>,
    #[serde(rename = "DateOfDiagnosisISOdate")]
    pub date_of_diagnosis: Option<String>,
    #[serde(rename = "DateOfNotificationISOdate")]
    pub date_of_notification: Option<String>,
    #[serde(rename = "DateOfOnsetISOdate")]
    pub date_of_onset: Option<String>,
    #[serde(rename = "Imported")]
    pub imported: Option<String>,
    #[serde(rename = "PlaceOfInfection")]
    pub place_of_infection: Option<String>,
    #[serde(rename = "PlaceOfInfectionEVD")]
    pub place_of_infection_evd: Option<String>,
    #[serde(rename = "PlaceOfNotification")]
    pub place_of_notification: Option<String>,
    #[serde(rename = "ReportingCountry")]
    pub reporting_country: Option<String>,
    #[serde(rename = "EventID")]
    pub event_id: Option<String>,
    #[serde(rename = "DomesticationStatus")]
    pub domestication_status: Option<String>,
    #[serde(rename = "Latitude")]
    pub latitude: Option<String>,
    #[serde(rename = "Longitude")]
    pub longitude: Option<String>,
}

/// Place column value, with "unknown" placeholders treated as empty
fn place(value: &Option<String>) -> Option<&str> {
    present(value).filter(|v| !MISSING_VALUES.contains(v))
}

/// NUTS code to resolve: place of infection, then the EVD place, then
/// for domestic cases the place of notification and the reporting
/// country. Values that don't start like a NUTS code are dropped.
pub fn select_nuts_code(row: &EcdcRow) -> Option<&str> {
    let domestic = present(&row.imported) == Some("N");
    let code = place(&row.place_of_infection)
        .or_else(|| place(&row.place_of_infection_evd))
        .or_else(|| domestic.then(|| place(&row.place_of_notification)).flatten())
        .or_else(|| domestic.then(|| present(&row.reporting_country)).flatten())?;
    nuts_like().is_match(code).then_some(code)
}

/// Earliest of diagnosis and onset, else the notification date
pub fn observation_date(row: &EcdcRow) -> Option<NaiveDate> {
    let diagnosis = present(&row.date_of_diagnosis).and_then(parse_date);
    let onset = present(&row.date_of_onset).and_then(parse_date);
    diagnosis
        .into_iter()
        .chain(onset)
        .min()
        .or_else(|| present(&row.date_of_notification).and_then(parse_date))
}

fn location_description(row: &EcdcRow) -> String {
    let fields = [
        ("place_of_infection", place(&row.place_of_infection)),
        ("place_of_infection_evd", place(&row.place_of_infection_evd)),
        ("place_of_notification", place(&row.place_of_notification)),
        ("reporting_country", present(&row.reporting_country)),
    ];
    let map: Map<String, Value> = fields
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key.to_string(), Value::from(v))))
        .collect();
    Value::Object(map).to_string()
}

fn parse_coordinate(value: &Option<String>) -> Option<f64> {
    present(value).and_then(|v| v.parse().ok())
}

pub fn map_row(row: &EcdcRow, reference: &ReferenceData) -> SourceRecord {
    let mut record = NormalizedRecord {
        observation_date: observation_date(row),
        report_date: present(&row.date_of_notification).and_then(parse_date),
        host_domestication_status: present(&row.domestication_status).map(str::to_string),
        latitude: parse_coordinate(&row.latitude),
        longitude: parse_coordinate(&row.longitude),
        original_record_source: DataSource::Ecdc.label().to_string(),
        original_record_id: present(&row.event_id).map(str::to_string),
        original_record_location_description: location_description(row),
        ..NormalizedRecord::default()
    };
    record.join_species(reference, Some(HOST_SPECIES), present(&row.subject));

    let query = match select_nuts_code(row) {
        Some(code) => LocationQuery::Nuts(code.to_string()),
        None => LocationQuery::Missing,
    };
    SourceRecord { record, query }
}

/// Map confirmed cases that carry an observation date.
///
/// Rows whose country stays unresolved are dropped later, after
/// geocoding.
pub fn map_rows(rows: Vec<EcdcRow>, reference: &ReferenceData) -> Vec<SourceRecord> {
    let total = rows.len();
    let records: Vec<SourceRecord> = rows
        .iter()
        .filter(|row| present(&row.classification) == Some(CONFIRMED))
        .map(|row| map_row(row, reference))
        .filter(|mapped| mapped.record.observation_date.is_some())
        .collect();
    debug!("Kept {} of {} ECDC rows", records.len(), total);
    records
}
