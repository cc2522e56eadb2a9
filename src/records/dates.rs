//! Lenient date parsing for source exports. Unparseable dates become `None`.

use chrono::NaiveDate;

/// Full-date formats tried in order
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d-%b-%Y", "%d/%m/%Y", "%Y/%m/%d"];

/// Parse a `dd/mm/yyyy` date
pub fn parse_day_first(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%d/%m/%Y").ok()
}

/// Parse a date in any of the shapes the exports use.
///
/// Timestamps keep their date part. Partial dates (`2015-03`, `Mar-2015`,
/// `2015`) fall on the first day of the period.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    let value = value.split(['T', ' ']).next().unwrap_or(value);

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
        .or_else(|| NaiveDate::parse_from_str(&format!("{}-01", value), "%Y-%m-%d").ok())
        .or_else(|| NaiveDate::parse_from_str(&format!("01-{}", value), "%d-%b-%Y").ok())
        .or_else(|| {
            (value.len() == 4)
                .then(|| NaiveDate::parse_from_str(&format!("{}-01-01", value), "%Y-%m-%d").ok())
                .flatten()
        })
}
