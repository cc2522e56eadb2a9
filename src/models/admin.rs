//! Administrative-unit types used by the local gazetteer and the policy table.

use serde::{Deserialize, Serialize};

use super::FeatureId;

/// One administrative boundary from the reference table.
#[derive(Debug, Clone, PartialEq)]
pub struct AdminUnit {
    /// ISO 3166-1 alpha-2 code of the owning country
    pub country_code: String,

    /// Name in English, when the boundary carries one
    pub exonym: Option<String>,

    /// Name in the local language
    pub endonym: Option<String>,

    /// NUTS codes attached to the boundary (some carry several)
    pub nuts_codes: Vec<String>,

    /// OSM admin_level
    pub admin_level: u8,

    pub osm_id: FeatureId,
}

impl AdminUnit {
    /// Preferred display name: exonym, else endonym
    pub fn display_name(&self) -> Option<&str> {
        self.exonym.as_deref().or(self.endonym.as_deref())
    }
}

/// A candidate name for an administrative unit.
///
/// Several entries exist per unit (native name, English name,
/// transliteration, synonym variants).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GazetteerEntry {
    pub country_code: String,
    pub name: String,
    pub admin_level: u8,
    pub osm_id: FeatureId,
}

impl GazetteerEntry {
    /// Lower-cased name used for token comparison
    pub fn match_key(&self) -> String {
        self.name.to_lowercase()
    }
}

/// Which boundary counts as admin-level-1 for one country.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminLevelPolicy {
    /// NUTS depth (1..=3) for countries in the NUTS scheme
    pub nuts_level: Option<u8>,

    /// OSM admin_level treated as admin-level-1
    pub admin_level: Option<u8>,
}
