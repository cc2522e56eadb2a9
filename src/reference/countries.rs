use csv::ReaderBuilder;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

use super::column_index;
use crate::error::Result;

/// Country spellings used by data sources and the gazetteer service that
/// `countries.csv` lacks
pub const COUNTRY_NAME_OVERRIDES: &[(&str, &str)] = &[
    ("Russia", "RU"),
    ("Bolivia", "BO"),
    ("Bonaire", "BQ"),
    ("Bosnia", "BA"),
    ("Iran", "IR"),
    ("North Korea", "KP"),
    ("North-Korea", "KP"),
    ("South Korea", "KR"),
    ("South-Korea", "KR"),
    ("Moldova", "MD"),
    ("Netherlands", "NL"),
    ("Palestine", "PS"),
    ("Taiwan", "TW"),
    ("Tanzania", "TZ"),
    ("United Kingdom", "GB"),
    ("UK", "GB"),
    ("United States", "US"),
    ("US", "US"),
    ("Venezuela", "VE"),
    ("Vietnam", "VN"),
];

/// Country name ↔ ISO 3166-1 alpha-2 code
#[derive(Debug, Clone, Default)]
pub struct CountryTable {
    codes_by_name: HashMap<String, String>,
    names_by_code: HashMap<String, String>,
}

impl CountryTable {
    /// Build from (name, code) pairs, then apply [`COUNTRY_NAME_OVERRIDES`].
    ///
    /// The inverse map keeps the first canonical name for each code, so
    /// override spellings never replace it.
    pub fn from_pairs<I, N, C>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (N, C)>,
        N: Into<String>,
        C: Into<String>,
    {
        let mut table = Self::default();
        for (name, code) in pairs {
            let (name, code) = (name.into(), code.into());
            if name.is_empty() || code.is_empty() {
                continue;
            }
            table
                .names_by_code
                .entry(code.clone())
                .or_insert_with(|| name.clone());
            table.codes_by_name.insert(name, code);
        }

        for (name, code) in COUNTRY_NAME_OVERRIDES {
            table
                .codes_by_name
                .insert(name.to_string(), code.to_string());
            table
                .names_by_code
                .entry(code.to_string())
                .or_insert_with(|| name.to_string());
        }

        table
    }

    /// Load `countries.csv` (`name` and `alpha_2` columns).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading countries from {}", path.display());

        let mut reader = ReaderBuilder::new().has_headers(true).from_path(path)?;
        let headers = reader.headers()?.clone();
        let name_idx = column_index(&headers, "name", path)?;
        let code_idx = column_index(&headers, "alpha_2", path)?;

        let mut pairs = Vec::new();
        for record in reader.records() {
            let record = record?;
            pairs.push((
                record[name_idx].trim().to_string(),
                record[code_idx].trim().to_string(),
            ));
        }

        let table = Self::from_pairs(pairs);
        info!("Loaded {} country names", table.codes_by_name.len());
        Ok(table)
    }

    pub fn code_for(&self, name: &str) -> Option<&str> {
        self.codes_by_name.get(name).map(String::as_str)
    }

    pub fn name_for(&self, code: &str) -> Option<&str> {
        self.names_by_code.get(code).map(String::as_str)
    }

    /// (name, code) pairs, overrides included
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.codes_by_name
            .iter()
            .map(|(name, code)| (name.as_str(), code.as_str()))
    }

    /// Distinct country codes, sorted
    pub fn codes(&self) -> Vec<&str> {
        let mut codes: Vec<&str> = self.names_by_code.keys().map(String::as_str).collect();
        codes.sort_unstable();
        codes
    }
}
