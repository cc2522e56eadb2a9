//! Per-country choice of the boundary reported as admin-level-1.
//!
//! Countries in the NUTS scheme use the deepest NUTS level present in the
//! reference units and the coarsest OSM admin_level carrying it; other
//! countries use their coarsest sub-national boundary. A fixed override
//! table wins over both computations.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{GeoError, Result};
use crate::models::{AdminLevelPolicy, AdminUnit};

/// NUTS level assumed for a NUTS country with no coded units
pub const DEFAULT_NUTS_LEVEL: u8 = 3;

/// Country prefixes used by the NUTS scheme
pub const NUTS_COUNTRY_PREFIXES: &[&str] = &[
    "AT", "BE", "BG", "CY", "CZ", "DE", "DK", "EE", "EL", "ES", "FI", "FR", "HR", "HU", "IE",
    "IT", "LT", "LU", "LV", "MT", "NL", "PL", "PT", "RO", "SE", "SI", "SK", // EU27
    "CH", "IS", "LI", "NO", // EFTA
    "AL", "ME", "MK", "RS", "TR", // candidates
    "UK",
];

/// NUTS prefixes that differ from the ISO 3166-1 code.
///
/// Covers the cases observed in surveillance data; not exhaustive.
pub const NUTS_COUNTRY_EXCEPTIONS: &[(&str, &str)] = &[("EL", "GR"), ("UK", "GB")];

/// Countries whose reference units are too sparse, too coarse or
/// mis-scaled for the computed choice
const POLICY_OVERRIDES: &[(&str, AdminLevelPolicy)] = &[
    ("CN", policy(None, Some(4))),
    ("DE", policy(Some(1), Some(4))),
    ("ES", policy(Some(2), Some(4))),
    ("GB", policy(Some(1), Some(4))),
    ("ID", policy(None, Some(4))),
    ("IT", policy(Some(2), Some(4))),
    ("NL", policy(Some(2), Some(4))),
    ("PH", policy(None, Some(4))),
    ("RU", policy(None, Some(4))),
    ("US", policy(None, Some(4))),
    ("VN", policy(None, Some(4))),
];

const fn policy(nuts_level: Option<u8>, admin_level: Option<u8>) -> AdminLevelPolicy {
    AdminLevelPolicy {
        nuts_level,
        admin_level,
    }
}

/// ISO country code for a NUTS prefix (`EL` → `GR`)
pub fn nuts_country_code(prefix: &str) -> &str {
    NUTS_COUNTRY_EXCEPTIONS
        .iter()
        .find(|(nuts, _)| *nuts == prefix)
        .map(|(_, iso)| *iso)
        .unwrap_or(prefix)
}

/// Whether the country with this ISO code is covered by NUTS
pub fn is_nuts_country(country_code: &str) -> bool {
    NUTS_COUNTRY_PREFIXES
        .iter()
        .any(|prefix| nuts_country_code(prefix) == country_code)
}

fn override_for(country_code: &str) -> Option<AdminLevelPolicy> {
    POLICY_OVERRIDES
        .iter()
        .find(|(code, _)| *code == country_code)
        .map(|(_, policy)| *policy)
}

/// Row of `admin_level_1.csv`
#[derive(Debug, Deserialize)]
struct PolicyRecord {
    country_code: String,
    #[serde(alias = "NUTS_level")]
    nuts_level: Option<f64>,
    osm_level: Option<f64>,
}

#[derive(Debug, Serialize)]
struct PolicyRow<'a> {
    country_code: &'a str,
    nuts_level: Option<u8>,
    osm_level: Option<u8>,
}

/// Country code → admin-level-1 policy. Absent countries are unknown.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolicyTable {
    policies: BTreeMap<String, AdminLevelPolicy>,
}

impl PolicyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute the table for `country_codes` from the reference units.
    pub fn build<'a, I>(country_codes: I, units: &[AdminUnit]) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut table = Self::new();

        for code in country_codes {
            let country_units: Vec<&AdminUnit> =
                units.iter().filter(|u| u.country_code == code).collect();

            let computed = if country_units.is_empty() {
                None
            } else if is_nuts_country(code) {
                Some(nuts_policy(&country_units))
            } else {
                Some(policy(
                    None,
                    country_units.iter().map(|u| u.admin_level).min(),
                ))
            };

            let resolved = match (computed, override_for(code)) {
                (Some(computed), Some(fixed)) => Some(AdminLevelPolicy {
                    nuts_level: fixed.nuts_level.or(computed.nuts_level),
                    admin_level: fixed.admin_level.or(computed.admin_level),
                }),
                (None, fixed) => fixed,
                (computed, None) => computed,
            };

            if let Some(resolved) = resolved {
                debug!("Admin-level-1 policy for {}: {:?}", code, resolved);
                table.insert(code, resolved);
            }
        }

        info!("Built admin-level-1 policy for {} countries", table.len());
        table
    }

    pub fn insert(&mut self, country_code: &str, policy: AdminLevelPolicy) {
        self.policies.insert(country_code.to_string(), policy);
    }

    pub fn get(&self, country_code: &str) -> Option<&AdminLevelPolicy> {
        self.policies.get(country_code)
    }

    /// Target OSM admin_level, when known
    pub fn admin_level(&self, country_code: &str) -> Option<u8> {
        self.get(country_code).and_then(|p| p.admin_level)
    }

    /// Target NUTS level, when the country uses NUTS
    pub fn nuts_level(&self, country_code: &str) -> Option<u8> {
        self.get(country_code).and_then(|p| p.nuts_level)
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    /// Read `admin_level_1.csv` (`country_code,nuts_level,osm_level`).
    pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading admin-level-1 policy from {}", path.display());

        let mut reader = csv::Reader::from_path(path)?;
        let mut table = Self::new();

        for record in reader.deserialize::<PolicyRecord>() {
            let record = record?;
            let level = |value: Option<f64>, column: &str| -> Result<Option<u8>> {
                match value {
                    None => Ok(None),
                    Some(v) if v.fract() == 0.0 && (0.0..=u8::MAX as f64).contains(&v) => {
                        Ok(Some(v as u8))
                    }
                    Some(v) => Err(GeoError::ReferenceData {
                        path: path.to_path_buf(),
                        message: format!("{} {} for {} is not a level", column, v, record.country_code),
                    }),
                }
            };

            let policy = AdminLevelPolicy {
                nuts_level: level(record.nuts_level, "nuts_level")?,
                admin_level: level(record.osm_level, "osm_level")?,
            };
            if policy != AdminLevelPolicy::default() {
                table.insert(&record.country_code, policy);
            }
        }

        Ok(table)
    }

    /// Write the table as `admin_level_1.csv`, one row per country.
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut writer = csv::Writer::from_path(path)?;
        for (code, policy) in &self.policies {
            writer.serialize(PolicyRow {
                country_code: code,
                nuts_level: policy.nuts_level,
                osm_level: policy.admin_level,
            })?;
        }
        writer.flush().map_err(|e| GeoError::io(path, e))?;
        info!("Wrote {} policies to {}", self.len(), path.display());
        Ok(())
    }
}

fn nuts_policy(units: &[&AdminUnit]) -> AdminLevelPolicy {
    for nuts_level in [3u8, 2, 1] {
        let code_len = nuts_level as usize + 2;
        let admin_level = units
            .iter()
            .filter(|u| u.nuts_codes.iter().any(|c| c.len() == code_len))
            .map(|u| u.admin_level)
            .max();
        if admin_level.is_some() {
            return policy(Some(nuts_level), admin_level);
        }
    }

    policy(
        Some(DEFAULT_NUTS_LEVEL),
        units.iter().map(|u| u.admin_level).min(),
    )
}
