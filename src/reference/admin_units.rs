use csv::{ReaderBuilder, StringRecord};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

use super::column_index;
use crate::error::{GeoError, Result};
use crate::models::{AdminUnit, FeatureId, ResolvedPlace};

/// Separator between several NUTS codes on one unit
const NUTS_CODE_SEPARATOR: char = ';';

fn optional(record: &StringRecord, idx: usize) -> Option<String> {
    let value = record.get(idx)?.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Load `administrative_units.tsv`.
///
/// Columns used: `iso3166_1_code`, `exonym`, `endonym`, `nuts_code`
/// (`;`-separated), `osm_id` (`R123`-style) and `admin_level`.
pub fn load_admin_units<P: AsRef<Path>>(path: P) -> Result<Vec<AdminUnit>> {
    let path = path.as_ref();
    info!("Loading administrative units from {}", path.display());

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(b'\t')
        .quoting(false)
        .flexible(true)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    let country_idx = column_index(&headers, "iso3166_1_code", path)?;
    let exonym_idx = column_index(&headers, "exonym", path)?;
    let endonym_idx = column_index(&headers, "endonym", path)?;
    let nuts_idx = column_index(&headers, "nuts_code", path)?;
    let osm_idx = column_index(&headers, "osm_id", path)?;
    let level_idx = column_index(&headers, "admin_level", path)?;

    let mut units = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        let bad_value = |column: &str| GeoError::ReferenceData {
            path: path.to_path_buf(),
            message: format!("row {}: unusable {}", line + 2, column),
        };

        let Some(country_code) = optional(&record, country_idx) else {
            continue;
        };

        let osm_id = optional(&record, osm_idx)
            .and_then(|id| FeatureId::parse(&id).ok())
            .ok_or_else(|| bad_value("osm_id"))?;

        let admin_level = optional(&record, level_idx)
            .and_then(|level| level.parse::<f64>().ok())
            .filter(|level| level.fract() == 0.0 && (1.0..=15.0).contains(level))
            .map(|level| level as u8)
            .ok_or_else(|| bad_value("admin_level"))?;

        let nuts_codes = optional(&record, nuts_idx)
            .map(|codes| {
                codes
                    .split(NUTS_CODE_SEPARATOR)
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        units.push(AdminUnit {
            country_code,
            exonym: optional(&record, exonym_idx),
            endonym: optional(&record, endonym_idx),
            nuts_codes,
            admin_level,
            osm_id,
        });
    }

    info!("Loaded {} administrative units", units.len());
    Ok(units)
}

/// NUTS code → the administrative unit carrying it.
#[derive(Debug, Clone, Default)]
pub struct NutsIndex {
    units: HashMap<String, ResolvedPlace>,
}

impl NutsIndex {
    /// A code attached to several units maps to the last one listed.
    pub fn build(units: &[AdminUnit]) -> Self {
        let mut index = HashMap::new();
        for unit in units {
            let Some(name) = unit.display_name() else {
                continue;
            };
            for code in &unit.nuts_codes {
                index.insert(
                    code.clone(),
                    ResolvedPlace::new(name, Some(unit.osm_id.clone())),
                );
            }
        }
        Self { units: index }
    }

    pub fn get(&self, nuts_code: &str) -> Option<&ResolvedPlace> {
        self.units.get(nuts_code)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}
